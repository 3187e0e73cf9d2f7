//! cutover-rollout — the blue-green orchestrator.
//!
//! Sequences one run through discovery, install, the pre-switch health
//! and smoke gates, the traffic switch, and the post-switch health gate.
//! Failures before the switch abandon the new slot and leave routing
//! untouched; failures after it trigger the rollback manager.
//!
//! # Components
//!
//! - **`attempt`** — run record and phase state machine
//! - **`orchestrator`** — execute / settle sequencing
//! - **`rollback`** — undo a completed switch
//! - **`outcome`** — how a run ended and its exit code
//! - **`status`** — live view of both slots
//! - **`history`** — JSON-lines log of finished runs

pub mod attempt;
pub mod error;
pub mod history;
pub mod orchestrator;
pub mod outcome;
pub mod rollback;
pub mod status;

pub use attempt::{DeploymentAttempt, Phase, RunKind};
pub use error::{RolloutError, RolloutResult};
pub use orchestrator::{Dependencies, Orchestrator};
pub use outcome::DeployOutcome;
pub use rollback::RollbackManager;
pub use status::{SlotStatus, TierStatus};
