//! cutover-core — shared types for the cutover blue-green orchestrator.
//!
//! Holds the pieces every other crate needs: the two deployment slots and
//! their environments, the deployment artifact, the per-tier TOML
//! configuration, a bounded external command runner, and the run lock that
//! keeps a single orchestrator per tier.

pub mod artifact;
pub mod cancel;
pub mod command;
pub mod config;
pub mod duration;
pub mod lock;
pub mod slot;

pub use artifact::{ArtifactError, ArtifactKind, DeploymentArtifact};
pub use cancel::{CancelHandle, CancelSignal, cancel_pair};
pub use command::{CommandError, CommandOutput, Invocation, substitute};
pub use config::{
    ConfigError, CutoverConfig, HealthSettings, InstallSettings, ResolvedTier, RoutingSettings,
    SmokeSettings, SubCheckConfig, SupervisorSettings, TierConfig,
};
pub use duration::parse_duration;
pub use lock::{LockError, RunLock};
pub use slot::{Environment, Environments, Slot};

/// Seconds since the Unix epoch.
pub fn epoch_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
