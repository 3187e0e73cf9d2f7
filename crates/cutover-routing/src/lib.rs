//! cutover-routing — the router's configuration as the source of truth.
//!
//! The live routing file decides which slot serves traffic. Nothing else
//! is trusted for that answer, so an orchestrator restarted mid-flight
//! rediscovers the live slot by reading the file again.
//!
//! # Components
//!
//! - **`config`** — render and parse the upstream block
//! - **`registry`** — which slot is active / inactive
//! - **`router`** — validate and reload hooks for the external router
//! - **`switch`** — staged, validated, atomic cutover and its inverse

pub mod config;
pub mod error;
pub mod registry;
pub mod router;
pub mod switch;

pub use config::{RoutingTarget, RoutingTemplate, parse_routing};
pub use error::{ParseError, RollbackError, RoutingError, SwitchError};
pub use registry::EnvironmentRegistry;
pub use router::{CommandRouter, RouterControl, RouterFuture};
pub use switch::{SwitchReceipt, TrafficSwitch};
