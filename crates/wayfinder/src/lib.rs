//! # Wayfinder
//!
//! A hierarchical named-route resolver with an async transition engine.
//! Routes are declared as a tree of named nodes, each carrying a path
//! template from [`wayfinder_path`]; navigation targets are dotted names
//! (`users.view`), never raw paths. The engine diffs the current and the
//! target chain, runs per-node activation steps root to leaf, and commits
//! the new state only if no newer navigation superseded it meanwhile.
//!
//! ## Example
//!
//! ```
//! use wayfinder::{Router, RouterOptions, RouteDefinition};
//! use wayfinder_path::params;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut router = Router::new(RouterOptions::default());
//! router
//!     .add_route(
//!         RouteDefinition::new("users", "/users")
//!             .with_child(RouteDefinition::new("view", "/:id")),
//!     )
//!     .unwrap();
//!
//! router.start().unwrap();
//! let outcome = router
//!     .navigate("users.view", params([("id", "42")]), Default::default())
//!     .await
//!     .unwrap();
//! assert_eq!(outcome.state().unwrap().built_path, "/users/42");
//! # }
//! ```

// ============================================================================
// Module Declarations
// ============================================================================

pub mod error;
pub mod events;
pub mod hooks;
pub mod router;
pub mod state;
pub mod tree;

pub use error::{ConfigurationError, NavigationError, TransitionError};
pub use events::{EventBus, RouterEvent};
pub use hooks::{EnterContext, EnterOutcome, HookResult};
pub use router::{Router, RouterOptions};
pub use state::{NavOptions, NavState, NavigationOutcome, StateMeta};
pub use tree::{
    BuildPathOptions, NodeId, QueryParamsMode, RouteDefinition, RouteTree, TrailingSlashMode,
};

pub use wayfinder_path::{params, ParamValue, Params, UrlParamsEncoding};
