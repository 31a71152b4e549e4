/// Error taxonomy for the route tree and the transition engine
///
/// Configuration and build problems are synchronous and fatal to the call
/// that caused them. Navigation problems are coded values returned inside
/// a structured outcome, never as `Err` - with one exception: a configured
/// not-found/default fallback route that is itself missing from the tree.
use thiserror::Error;

use wayfinder_path::{BuildError, Params, PathError};

/// Route tree setup errors; always fatal to the call
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error(transparent)]
    InvalidPath(#[from] PathError),
    #[error("route '{name}' conflicts with an existing sibling route")]
    DuplicateRoute { name: String },
    #[error("cannot add route '{name}': parent segment '{missing}' is not defined")]
    MissingParent { name: String, missing: String },
    #[error("'{name}' is not a valid dotted route name")]
    InvalidRouteName { name: String },
    #[error("route '{name}' is not defined")]
    UnknownRoute { name: String },
    #[error(transparent)]
    Build(#[from] BuildError),
}

/// Coded navigation errors carried inside [`NavigationOutcome::Error`]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NavigationError {
    #[error("router is not started")]
    NotStarted,
    #[error("router is already started")]
    AlreadyStarted,
    #[error("route '{name}' was not found")]
    RouteNotFound { name: String },
    #[error("navigation target equals the current state")]
    SameStates,
    #[error("transition was superseded by a newer navigation")]
    TransitionCancelled,
    #[error("transition redirected to '{name}'")]
    TransitionRedirected { name: String },
    #[error("transition failed: {message}")]
    TransitionUnknownError { message: String },
}

/// Errors surfaced by caller-supplied activation steps
///
/// A redirect is an internal control transfer: the engine catches it and
/// restarts navigation against the replacement target. Anything else is
/// wrapped and reported as `TransitionUnknownError`.
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("redirect to '{name}'")]
    Redirect { name: String, params: Params },
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl TransitionError {
    /// Redirect to another route, keeping the given params
    pub fn redirect(name: impl Into<String>, params: Params) -> Self {
        TransitionError::Redirect {
            name: name.into(),
            params,
        }
    }

    /// Wraps an arbitrary failure message
    pub fn other(message: impl Into<String>) -> Self {
        TransitionError::Other(message.into().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_error_messages() {
        let err = NavigationError::RouteNotFound {
            name: "users.view".to_string(),
        };
        assert_eq!(err.to_string(), "route 'users.view' was not found");
    }

    #[test]
    fn test_transition_error_other_wraps_message() {
        let err = TransitionError::other("boom");
        assert_eq!(err.to_string(), "boom");
    }
}
