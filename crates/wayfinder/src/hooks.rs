/// Per-node activation hooks
///
/// Each tree node may carry an optional pre-entry step and an optional
/// on-enter step. Absence means "skip this step", not an error. Steps run
/// strictly in root-to-leaf order; a later node always observes the
/// possibly-replaced state and pass-through from an earlier one.
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::TransitionError;
use crate::state::{NavOptions, NavState};

/// Result type for activation steps
pub type HookResult<T> = Result<T, TransitionError>;

/// Context handed to a node's activation steps
#[derive(Debug, Clone)]
pub struct EnterContext {
    /// The running target state, possibly replaced by an earlier step
    pub to: NavState,
    pub from: Option<NavState>,
    pub options: NavOptions,
    /// Result of this node's pre-entry step, if it has one
    pub resolved: Option<serde_json::Value>,
    /// Pass-through value produced by the previous node's on-enter step
    pub passthrough: Option<serde_json::Value>,
}

/// What an on-enter step hands back to the engine
#[derive(Debug, Clone, Default)]
pub struct EnterOutcome {
    /// Replacement for the running target state, when present
    pub state: Option<NavState>,
    /// Opaque value forwarded to the next node's step
    pub passthrough: Option<serde_json::Value>,
}

impl EnterOutcome {
    /// Keep the running state and clear the pass-through
    pub fn keep() -> Self {
        Self::default()
    }

    /// Keep the running state, forward a pass-through value
    pub fn forward(passthrough: serde_json::Value) -> Self {
        EnterOutcome {
            state: None,
            passthrough: Some(passthrough),
        }
    }

    /// Replace the running state
    pub fn replace(state: NavState) -> Self {
        EnterOutcome {
            state: Some(state),
            passthrough: None,
        }
    }
}

/// Boxed pre-entry step; its value is opaque to the engine
pub type PreEnterFn =
    Arc<dyn Fn(EnterContext) -> BoxFuture<'static, HookResult<serde_json::Value>> + Send + Sync>;

/// Boxed on-enter step
pub type OnEnterFn =
    Arc<dyn Fn(EnterContext) -> BoxFuture<'static, HookResult<EnterOutcome>> + Send + Sync>;
