// File: wayfinder/src/router/mod.rs
// Purpose: The navigation engine tying the route tree to async transitions

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use tokio::sync::broadcast;

use wayfinder_path::{ParamValue, Params, UrlParamsEncoding};

use crate::error::{ConfigurationError, NavigationError};
use crate::events::{EventBus, RouterEvent};
use crate::hooks::{EnterContext, EnterOutcome, HookResult};
use crate::state::{NavOptions, NavState, NavigationOutcome, StateMeta};
use crate::tree::matcher::{self, TreeMatchOptions};
use crate::tree::{BuildPathOptions, QueryParamsMode, RouteDefinition, RouteTree, TrailingSlashMode};

mod transition;

/// Caller-supplied rewrite applied to every navigation target before
/// resolution
pub type PreNavigateFn = Box<dyn Fn(&str, Params) -> (String, Params) + Send + Sync>;

/// Engine-wide options, fixed at construction
#[derive(Debug, Clone, Default)]
pub struct RouterOptions {
    /// Fallback target when a navigation target cannot be resolved
    pub default_route: Option<String>,
    /// Params handed to the default route on fallback
    pub default_params: Params,
    /// Takes precedence over `default_route`; receives the requested
    /// target under the `path` param
    pub not_found_route: Option<String>,
    pub case_sensitive: bool,
    pub strict_trailing_slash: bool,
    pub trailing_slash_mode: TrailingSlashMode,
    pub query_params_mode: QueryParamsMode,
    pub url_params_encoding: UrlParamsEncoding,
}

/// The navigation engine
///
/// Holds the route tree, the current committed state and a monotonic
/// transition counter. The counter is the sole cancellation token: every
/// navigation takes the next id and any in-flight transition whose id no
/// longer equals the counter is stale and must abandon itself.
pub struct Router {
    tree: RouteTree,
    options: RouterOptions,
    current: Mutex<Option<NavState>>,
    transition_counter: AtomicU64,
    started: AtomicBool,
    events: EventBus,
    pre_navigate: Option<PreNavigateFn>,
}

impl Router {
    pub fn new(options: RouterOptions) -> Self {
        Router {
            tree: RouteTree::with_encoding(options.url_params_encoding),
            options,
            current: Mutex::new(None),
            transition_counter: AtomicU64::new(0),
            started: AtomicBool::new(false),
            events: EventBus::new(),
            pre_navigate: None,
        }
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    pub fn add_route(&mut self, definition: RouteDefinition) -> Result<(), ConfigurationError> {
        self.tree.add(definition)?;
        Ok(())
    }

    pub fn add_routes(
        &mut self,
        definitions: impl IntoIterator<Item = RouteDefinition>,
    ) -> Result<(), ConfigurationError> {
        self.tree.add_all(definitions)
    }

    /// Registers the pre-entry step of a named route
    pub fn pre_enter<F, Fut>(&mut self, name: &str, hook: F) -> Result<(), ConfigurationError>
    where
        F: Fn(EnterContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult<serde_json::Value>> + Send + 'static,
    {
        let id = self.node_id(name)?;
        self.tree.node_mut(id).pre_enter = Some(Arc::new(move |ctx| Box::pin(hook(ctx))));
        Ok(())
    }

    /// Registers the on-enter step of a named route
    pub fn on_enter<F, Fut>(&mut self, name: &str, hook: F) -> Result<(), ConfigurationError>
    where
        F: Fn(EnterContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult<EnterOutcome>> + Send + 'static,
    {
        let id = self.node_id(name)?;
        self.tree.node_mut(id).on_enter = Some(Arc::new(move |ctx| Box::pin(hook(ctx))));
        Ok(())
    }

    /// Installs a rewrite applied to every target before resolution
    pub fn set_pre_navigate<F>(&mut self, hook: F)
    where
        F: Fn(&str, Params) -> (String, Params) + Send + Sync + 'static,
    {
        self.pre_navigate = Some(Box::new(hook));
    }

    fn node_id(&self, name: &str) -> Result<crate::tree::NodeId, ConfigurationError> {
        let chain = self
            .tree
            .segments(name)
            .ok_or_else(|| ConfigurationError::UnknownRoute {
                name: name.to_string(),
            })?;
        Ok(*chain.last().unwrap())
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Marks the engine started without navigating anywhere
    pub fn start(&self) -> Result<(), NavigationError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(NavigationError::AlreadyStarted);
        }
        tracing::info!("router started");
        self.events.emit(RouterEvent::Started);
        Ok(())
    }

    /// Starts the engine and navigates to an initial route
    pub async fn start_at(
        &self,
        name: &str,
        params: Params,
    ) -> Result<NavigationOutcome, ConfigurationError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(NavigationOutcome::failure(
                self.current_state(),
                NavigationError::AlreadyStarted,
            ));
        }
        tracing::info!(route = %name, "router started");
        self.events.emit(RouterEvent::Started);
        self.navigate(name, params, NavOptions::default()).await
    }

    /// Stops the engine, clearing state and invalidating in-flight work
    pub fn stop(&self) -> Result<(), NavigationError> {
        if !self.started.swap(false, Ordering::SeqCst) {
            return Err(NavigationError::NotStarted);
        }
        // Bumping the counter strands any transition still running
        self.transition_counter.fetch_add(1, Ordering::SeqCst);
        *self.current.lock().unwrap() = None;
        tracing::info!("router stopped");
        self.events.emit(RouterEvent::Stopped);
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// The last committed navigation state
    pub fn current_state(&self) -> Option<NavState> {
        self.current.lock().unwrap().clone()
    }

    /// Dotted names of the committed chain, root to leaf
    pub fn active_chain(&self) -> Vec<String> {
        self.current_state()
            .map(|state| state.active_chain)
            .unwrap_or_default()
    }

    /// Whether a route participates in the committed state
    ///
    /// Non-exact mode accepts ancestors of the current leaf; exact mode
    /// requires the leaf itself. Given params must agree with the
    /// committed ones in both modes.
    pub fn is_active(&self, name: &str, params: &Params, exact: bool) -> bool {
        let Some(current) = self.current_state() else {
            return false;
        };
        let name_matches = if exact {
            current.name == name
        } else {
            current.active_chain.iter().any(|n| n == name)
        };
        name_matches
            && params
                .iter()
                .all(|(key, value)| current.params.get(key) == Some(value))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RouterEvent> {
        self.events.subscribe()
    }

    pub fn subscribe_reload(&self, name: &str) -> broadcast::Receiver<()> {
        self.events.subscribe_reload(name)
    }

    // ------------------------------------------------------------------
    // Matching and building
    // ------------------------------------------------------------------

    /// Matches a full path into a bare navigation state
    ///
    /// The returned state carries no meta; it has not gone through a
    /// transition.
    pub fn match_path(&self, path: &str) -> Option<NavState> {
        let m = matcher::match_path(&self.tree, path, &self.tree_match_options())?;
        let leaf = *m.chain.last()?;
        let name = self.tree.full_name(leaf);
        let mut params = self.tree.default_params_for(&m.chain);
        params.extend(m.params);
        Some(NavState {
            active_chain: dotted_prefixes(&name),
            name,
            params,
            built_path: path.to_string(),
            meta: None,
        })
    }

    /// Builds a full path for a route name under the engine options
    pub fn build_path(&self, name: &str, params: &Params) -> Result<String, ConfigurationError> {
        self.tree.build_path(name, params, &self.build_path_options())
    }

    fn tree_match_options(&self) -> TreeMatchOptions {
        TreeMatchOptions {
            case_sensitive: self.options.case_sensitive,
            strict_trailing_slash: self.options.strict_trailing_slash,
            query_params_mode: self.options.query_params_mode,
        }
    }

    fn build_path_options(&self) -> BuildPathOptions {
        BuildPathOptions {
            trailing_slash_mode: self.options.trailing_slash_mode,
            query_params_mode: self.options.query_params_mode,
        }
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// Navigates to a named route
    ///
    /// Coded failures (not found, same state, cancellation, step errors)
    /// come back inside the outcome. `Err` is reserved for configuration
    /// problems such as a fallback route that is itself missing.
    pub async fn navigate(
        &self,
        name: &str,
        params: Params,
        options: NavOptions,
    ) -> Result<NavigationOutcome, ConfigurationError> {
        self.navigate_inner(name.to_string(), params, options, false)
            .await
    }

    /// Boxed recursion point shared by fallbacks and redirects
    pub(crate) fn navigate_inner(
        &self,
        name: String,
        params: Params,
        options: NavOptions,
        redirected: bool,
    ) -> BoxFuture<'_, Result<NavigationOutcome, ConfigurationError>> {
        Box::pin(async move {
            if !self.started.load(Ordering::SeqCst) {
                return Ok(NavigationOutcome::failure(
                    None,
                    NavigationError::NotStarted,
                ));
            }

            let from = self.current_state();
            let name = self.inherit_wildcards(&name, from.as_ref());
            let (name, params) = match &self.pre_navigate {
                Some(hook) => hook(&name, params),
                None => (name, params),
            };
            tracing::debug!(route = %name, redirected, "navigating");

            let to = match self.resolve(&name, &params) {
                Ok(state) => state,
                Err(err) => return self.fallback(from, name, err, redirected).await,
            };

            if !(options.force || options.reload) {
                if let Some(from_state) = &from {
                    if self.states_equal(from_state, &to) {
                        return Ok(NavigationOutcome::failure(
                            from,
                            NavigationError::SameStates,
                        ));
                    }
                }
            }

            let id = self.transition_counter.fetch_add(1, Ordering::SeqCst) + 1;
            let mut to = to;
            to.meta = Some(StateMeta {
                id,
                options: options.clone(),
                redirected,
            });

            self.run_transition(from, to, options, id).await
        })
    }

    /// Resolves a dotted name and explicit params into a target state
    fn resolve(&self, name: &str, params: &Params) -> Result<NavState, ConfigurationError> {
        let chain = self
            .tree
            .segments(name)
            .ok_or_else(|| ConfigurationError::UnknownRoute {
                name: name.to_string(),
            })?;
        // Explicit params win over route defaults
        let mut merged = self.tree.default_params_for(&chain);
        merged.extend(params.clone());
        let built_path = self
            .tree
            .build_path(name, &merged, &self.build_path_options())?;
        Ok(NavState {
            name: name.to_string(),
            params: merged,
            built_path,
            active_chain: dotted_prefixes(name),
            meta: None,
        })
    }

    /// Routes an unresolvable target to the configured fallback
    async fn fallback(
        &self,
        from: Option<NavState>,
        requested: String,
        err: ConfigurationError,
        redirected: bool,
    ) -> Result<NavigationOutcome, ConfigurationError> {
        // Fallbacks navigate with a fresh replace+reload option set; reload
        // keeps a repeated unknown target from short-circuiting as SameStates.
        let options = NavOptions {
            replace: true,
            reload: true,
            ..Default::default()
        };
        if let Some(not_found) = &self.options.not_found_route {
            if &requested == not_found {
                return Err(err);
            }
            tracing::debug!(route = %requested, fallback = %not_found, "target not found");
            let mut params = Params::new();
            params.insert("path".to_string(), ParamValue::from(requested.as_str()));
            return self
                .navigate_inner(not_found.clone(), params, options, redirected)
                .await;
        }
        if let Some(default) = &self.options.default_route {
            if &requested == default {
                return Err(err);
            }
            tracing::debug!(route = %requested, fallback = %default, "target not found");
            return self
                .navigate_inner(
                    default.clone(),
                    self.options.default_params.clone(),
                    options,
                    redirected,
                )
                .await;
        }
        Ok(NavigationOutcome::failure(
            from,
            NavigationError::RouteNotFound { name: requested },
        ))
    }

    /// Replaces `*` segments of a target name with the current state's
    /// segment at the same depth
    fn inherit_wildcards(&self, name: &str, from: Option<&NavState>) -> String {
        if !name.split('.').any(|segment| segment == "*") {
            return name.to_string();
        }
        let Some(from) = from else {
            return name.to_string();
        };
        let current: Vec<&str> = from.name.split('.').collect();
        name.split('.')
            .enumerate()
            .map(|(depth, segment)| {
                if segment == "*" {
                    current.get(depth).copied().unwrap_or(segment)
                } else {
                    segment
                }
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Same route and same owned param values; query params are ignored
    fn states_equal(&self, a: &NavState, b: &NavState) -> bool {
        if a.name != b.name {
            return false;
        }
        let Some(chain) = self.tree.segments(&a.name) else {
            return false;
        };
        for id in chain {
            let Some(pattern) = &self.tree.node(id).pattern else {
                continue;
            };
            let owned = pattern
                .url_params()
                .iter()
                .chain(pattern.splat_params())
                .chain(pattern.matrix_params());
            for name in owned {
                if a.params.get(name) != b.params.get(name) {
                    return false;
                }
            }
        }
        true
    }

    pub(crate) fn is_stale(&self, id: u64) -> bool {
        self.transition_counter.load(Ordering::SeqCst) != id
    }
}

/// Expands `a.b.c` into `[a, a.b, a.b.c]`
fn dotted_prefixes(name: &str) -> Vec<String> {
    let mut prefixes = Vec::new();
    let mut current = String::new();
    for segment in name.split('.') {
        if !current.is_empty() {
            current.push('.');
        }
        current.push_str(segment);
        prefixes.push(current.clone());
    }
    prefixes
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_dotted_prefixes() {
        assert_eq!(
            dotted_prefixes("users.view.tab"),
            vec!["users", "users.view", "users.view.tab"]
        );
        assert_eq!(dotted_prefixes("home"), vec!["home"]);
    }

    #[test]
    fn test_wildcard_inheritance() {
        let router = Router::new(RouterOptions::default());
        let from = NavState {
            name: "users.view.photos".to_string(),
            params: Params::new(),
            built_path: "/users/1/photos".to_string(),
            active_chain: dotted_prefixes("users.view.photos"),
            meta: None,
        };
        assert_eq!(
            router.inherit_wildcards("users.*.videos", Some(&from)),
            "users.view.videos"
        );
        assert_eq!(router.inherit_wildcards("users.*.videos", None), "users.*.videos");
        assert_eq!(router.inherit_wildcards("users.list", Some(&from)), "users.list");
    }
}
