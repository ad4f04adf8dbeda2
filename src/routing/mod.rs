//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path (+ query)
//!     → router.rs (ordered scan of the route table)
//!     → matcher.rs (literal prefix match, strip rewrite)
//!     → Return: ResolvedRoute (backend URL) or None
//!
//! Route Compilation (at startup):
//!     RouteConfig[] (declaration order)
//!     → Compile matchers and rewrites
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Precedence is table order, checked for shadowing at config validation

pub mod matcher;
pub mod router;

pub use router::{ResolvedRoute, Route, RouteTable};
