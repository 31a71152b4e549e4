/// Navigation states and outcomes
use std::collections::HashMap;

use serde::Serialize;

use crate::error::NavigationError;
use wayfinder_path::Params;

/// Options accepted by `navigate`
///
/// `custom` keys are forwarded untouched to activation steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NavOptions {
    pub replace: bool,
    pub reload: bool,
    pub force: bool,
    pub custom: HashMap<String, serde_json::Value>,
}

impl NavOptions {
    pub fn reload() -> Self {
        NavOptions {
            reload: true,
            ..Default::default()
        }
    }

    pub fn force() -> Self {
        NavOptions {
            force: true,
            ..Default::default()
        }
    }

    pub fn replace() -> Self {
        NavOptions {
            replace: true,
            ..Default::default()
        }
    }
}

/// Bookkeeping attached to a resolved navigation state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateMeta {
    /// Transition id; monotonically increasing per engine instance and the
    /// sole cancellation token
    pub id: u64,
    pub options: NavOptions,
    pub redirected: bool,
}

/// One resolved navigation state
///
/// Immutable once produced; superseded wholesale by the next state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavState {
    /// Fully qualified dotted route name (`users.view`)
    pub name: String,
    pub params: Params,
    pub built_path: String,
    /// Accumulated dotted names root to leaf (`users`, `users.view`)
    pub active_chain: Vec<String>,
    /// Present on states produced by the engine; `None` on bare matches
    pub meta: Option<StateMeta>,
}

/// Outcome of one `navigate` call
#[derive(Debug, Clone, PartialEq)]
pub enum NavigationOutcome {
    Success {
        from: Option<NavState>,
        to: NavState,
        to_activate: Vec<String>,
        to_deactivate: Vec<String>,
    },
    Error {
        from: Option<NavState>,
        to: Option<NavState>,
        to_activate: Vec<String>,
        to_deactivate: Vec<String>,
        error: NavigationError,
    },
}

impl NavigationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, NavigationOutcome::Success { .. })
    }

    /// The committed state on success
    pub fn state(&self) -> Option<&NavState> {
        match self {
            NavigationOutcome::Success { to, .. } => Some(to),
            NavigationOutcome::Error { .. } => None,
        }
    }

    /// The navigation error, if any
    pub fn error(&self) -> Option<&NavigationError> {
        match self {
            NavigationOutcome::Success { .. } => None,
            NavigationOutcome::Error { error, .. } => Some(error),
        }
    }

    pub(crate) fn failure(from: Option<NavState>, error: NavigationError) -> Self {
        NavigationOutcome::Error {
            from,
            to: None,
            to_activate: Vec::new(),
            to_deactivate: Vec::new(),
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_accessors() {
        let outcome = NavigationOutcome::failure(None, NavigationError::NotStarted);
        assert!(!outcome.is_success());
        assert_eq!(outcome.error(), Some(&NavigationError::NotStarted));
        assert_eq!(outcome.state(), None);
    }
}
