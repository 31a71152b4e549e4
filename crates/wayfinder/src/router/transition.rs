// File: wayfinder/src/router/transition.rs
// Purpose: Transition diffing and the root-to-leaf activation chain

use crate::error::{ConfigurationError, NavigationError, TransitionError};
use crate::events::RouterEvent;
use crate::hooks::EnterContext;
use crate::state::{NavOptions, NavState, NavigationOutcome};

use super::Router;

impl Router {
    /// Runs one transition under the given id
    ///
    /// The id is checked against the live counter after every await
    /// point; a mismatch means a newer navigation superseded this one
    /// and the transition abandons itself without touching state.
    pub(crate) async fn run_transition(
        &self,
        from: Option<NavState>,
        to: NavState,
        options: NavOptions,
        id: u64,
    ) -> Result<NavigationOutcome, ConfigurationError> {
        let (intersection, to_deactivate, to_activate) =
            self.transition_path(from.as_ref(), &to, &options);
        tracing::debug!(
            route = %to.name,
            activate = ?to_activate,
            deactivate = ?to_deactivate,
            "transition started"
        );

        let mut running = to.clone();
        let mut passthrough: Option<serde_json::Value> = None;

        for name in &to_activate {
            let Some(chain) = self.tree.segments(name) else {
                continue;
            };
            let node_id = *chain.last().unwrap();

            let mut resolved = None;
            if let Some(hook) = &self.tree.node(node_id).pre_enter {
                let context = EnterContext {
                    to: running.clone(),
                    from: from.clone(),
                    options: options.clone(),
                    resolved: None,
                    passthrough: passthrough.clone(),
                };
                match hook(context).await {
                    Ok(value) => resolved = Some(value),
                    Err(err) => {
                        return self
                            .step_failure(err, from, to, options, to_activate.clone(), to_deactivate)
                            .await;
                    }
                }
                if self.is_stale(id) {
                    return Ok(self.cancelled(from, to));
                }
            }

            if let Some(hook) = &self.tree.node(node_id).on_enter {
                let context = EnterContext {
                    to: running.clone(),
                    from: from.clone(),
                    options: options.clone(),
                    resolved,
                    passthrough: passthrough.take(),
                };
                match hook(context).await {
                    Ok(outcome) => {
                        if let Some(state) = outcome.state {
                            running = state;
                        }
                        passthrough = outcome.passthrough;
                    }
                    Err(err) => {
                        return self
                            .step_failure(err, from, to, options, to_activate.clone(), to_deactivate)
                            .await;
                    }
                }
                if self.is_stale(id) {
                    return Ok(self.cancelled(from, to));
                }
            }
        }

        if self.is_stale(id) {
            return Ok(self.cancelled(from, to));
        }

        running.active_chain = intersection
            .iter()
            .chain(to_activate.iter())
            .cloned()
            .collect();

        // Commit is optimistic: re-check the counter under the lock so a
        // navigation that raced past the last await cannot be overwritten.
        {
            let mut current = self.current.lock().unwrap();
            if self.is_stale(id) {
                drop(current);
                return Ok(self.cancelled(from, to));
            }
            *current = Some(running.clone());
        }

        // Nodes active on both sides that were still re-activated (reload)
        // get their reload notification
        if let Some(from_state) = &from {
            for name in &to_activate {
                if from_state.active_chain.contains(name) {
                    self.events.emit_reload(name);
                }
            }
        }

        tracing::debug!(route = %running.name, "transition committed");
        self.events.emit(RouterEvent::TransitionSuccess {
            from_state: from.clone(),
            to_state: running.clone(),
            to_activate: to_activate.clone(),
            to_deactivate: to_deactivate.clone(),
            options,
        });

        Ok(NavigationOutcome::Success {
            from,
            to: running,
            to_activate,
            to_deactivate,
        })
    }

    /// Turns a step error into a redirect restart or an error outcome
    async fn step_failure(
        &self,
        err: TransitionError,
        from: Option<NavState>,
        to: NavState,
        options: NavOptions,
        to_activate: Vec<String>,
        to_deactivate: Vec<String>,
    ) -> Result<NavigationOutcome, ConfigurationError> {
        match err {
            TransitionError::Redirect { name, params } => {
                tracing::debug!(from = %to.name, redirect = %name, "transition redirected");
                self.events.emit(RouterEvent::TransitionRedirected {
                    from_state: from.clone(),
                    to_state: to.clone(),
                });
                // The redirect target must win the same-state check even
                // when it equals the current state
                let options = NavOptions {
                    force: true,
                    ..options
                };
                self.navigate_inner(name, params, options, true).await
            }
            TransitionError::Other(source) => {
                let message = source.to_string();
                tracing::warn!(route = %to.name, error = %message, "transition failed");
                self.events.emit(RouterEvent::TransitionUnknownError {
                    from_state: from.clone(),
                    to_state: to.clone(),
                    message: message.clone(),
                });
                Ok(NavigationOutcome::Error {
                    from,
                    to: Some(to),
                    to_activate,
                    to_deactivate,
                    error: NavigationError::TransitionUnknownError { message },
                })
            }
        }
    }

    fn cancelled(&self, from: Option<NavState>, to: NavState) -> NavigationOutcome {
        tracing::debug!(route = %to.name, "transition cancelled");
        self.events.emit(RouterEvent::TransitionCancelled {
            from_state: from.clone(),
            to_state: to.clone(),
        });
        NavigationOutcome::Error {
            from,
            to: Some(to),
            to_activate: Vec::new(),
            to_deactivate: Vec::new(),
            error: NavigationError::TransitionCancelled,
        }
    }

    /// Diffs two states into (intersection, to_deactivate, to_activate)
    ///
    /// The chains agree node by node while the segment names match, the
    /// node's owned param values are equal on both sides and, on a reload
    /// navigation, the node has not opted out of reloading. Deactivation
    /// runs leaf to root, activation root to leaf.
    fn transition_path(
        &self,
        from: Option<&NavState>,
        to: &NavState,
        options: &NavOptions,
    ) -> (Vec<String>, Vec<String>, Vec<String>) {
        let mut shared = 0usize;
        if let Some(from) = from {
            let max = from.active_chain.len().min(to.active_chain.len());
            while shared < max {
                let name = &from.active_chain[shared];
                if name != &to.active_chain[shared] {
                    break;
                }
                let Some(chain) = self.tree.segments(name) else {
                    break;
                };
                let node = self.tree.node(*chain.last().unwrap());
                if options.reload && !node.skip_reload {
                    break;
                }
                if let Some(pattern) = &node.pattern {
                    let owned = pattern
                        .url_params()
                        .iter()
                        .chain(pattern.splat_params())
                        .chain(pattern.matrix_params())
                        .chain(pattern.query_params());
                    let mut equal = true;
                    for param in owned {
                        if from.params.get(param) != to.params.get(param) {
                            equal = false;
                            break;
                        }
                    }
                    if !equal {
                        break;
                    }
                }
                shared += 1;
            }
        }

        let intersection = to.active_chain[..shared].to_vec();
        let to_deactivate = from
            .map(|from| {
                let mut names = from.active_chain[shared.min(from.active_chain.len())..].to_vec();
                names.reverse();
                names
            })
            .unwrap_or_default();
        let to_activate = to.active_chain[shared..].to_vec();
        (intersection, to_deactivate, to_activate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::{dotted_prefixes, RouterOptions};
    use crate::tree::RouteDefinition;
    use pretty_assertions::assert_eq;
    use wayfinder_path::{params, Params};

    fn demo_router() -> Router {
        let mut router = Router::new(RouterOptions::default());
        router
            .add_routes(vec![RouteDefinition::new("users", "/users")
                .with_child(
                    RouteDefinition::new("view", "/:id")
                        .with_child(RouteDefinition::new("photos", "/photos"))
                        .with_child(RouteDefinition::new("videos", "/videos")),
                )
                .with_child(RouteDefinition::new("list", "/list"))])
            .unwrap();
        router
    }

    fn state(name: &str, params: Params) -> NavState {
        NavState {
            name: name.to_string(),
            params,
            built_path: String::new(),
            active_chain: dotted_prefixes(name),
            meta: None,
        }
    }

    #[test]
    fn test_diff_sibling_leaves() {
        let router = demo_router();
        let from = state("users.view.photos", params([("id", "1")]));
        let to = state("users.view.videos", params([("id", "1")]));

        let (intersection, to_deactivate, to_activate) =
            router.transition_path(Some(&from), &to, &NavOptions::default());
        assert_eq!(intersection, vec!["users", "users.view"]);
        assert_eq!(to_deactivate, vec!["users.view.photos"]);
        assert_eq!(to_activate, vec!["users.view.videos"]);
    }

    #[test]
    fn test_diff_param_change_reactivates_subtree() {
        let router = demo_router();
        let from = state("users.view.photos", params([("id", "1")]));
        let to = state("users.view.photos", params([("id", "2")]));

        let (intersection, to_deactivate, to_activate) =
            router.transition_path(Some(&from), &to, &NavOptions::default());
        assert_eq!(intersection, vec!["users"]);
        assert_eq!(to_deactivate, vec!["users.view.photos", "users.view"]);
        assert_eq!(to_activate, vec!["users.view", "users.view.photos"]);
    }

    #[test]
    fn test_diff_initial_state_activates_whole_chain() {
        let router = demo_router();
        let to = state("users.view", params([("id", "1")]));

        let (intersection, to_deactivate, to_activate) =
            router.transition_path(None, &to, &NavOptions::default());
        assert!(intersection.is_empty());
        assert!(to_deactivate.is_empty());
        assert_eq!(to_activate, vec!["users", "users.view"]);
    }

    #[test]
    fn test_diff_reload_breaks_sharing() {
        let router = demo_router();
        let from = state("users.list", Params::new());
        let to = state("users.list", Params::new());

        let (intersection, to_deactivate, to_activate) =
            router.transition_path(Some(&from), &to, &NavOptions::reload());
        assert!(intersection.is_empty());
        assert_eq!(to_deactivate, vec!["users.list", "users"]);
        assert_eq!(to_activate, vec!["users", "users.list"]);
    }

    #[test]
    fn test_diff_skip_reload_keeps_node_shared() {
        let mut router = Router::new(RouterOptions::default());
        router
            .add_route(
                RouteDefinition::new("app", "/app")
                    .skip_reload()
                    .with_child(RouteDefinition::new("inbox", "/inbox")),
            )
            .unwrap();

        let from = state("app.inbox", Params::new());
        let to = state("app.inbox", Params::new());
        let (intersection, to_deactivate, to_activate) =
            router.transition_path(Some(&from), &to, &NavOptions::reload());
        assert_eq!(intersection, vec!["app"]);
        assert_eq!(to_deactivate, vec!["app.inbox"]);
        assert_eq!(to_activate, vec!["app.inbox"]);
    }
}
