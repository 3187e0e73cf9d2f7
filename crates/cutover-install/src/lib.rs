//! cutover-install — putting a build into the inactive slot.
//!
//! # Components
//!
//! - **`supervisor`** — the OS process supervisor seam (systemd), keeping
//!   a slot's service running independently of the orchestrator
//! - **`installer`** — stop, back up, extract, configure, start
//! - **`smoke`** — the external functional test suite gate

pub mod error;
pub mod installer;
pub mod smoke;
pub mod supervisor;

pub use error::{InstallError, InstallResult, SupervisorError};
pub use installer::{ArtifactInstaller, InstallReport};
pub use smoke::{CommandSmokeTests, SmokeFuture, SmokeOutcome, SmokeTests};
pub use supervisor::{Supervisor, SupervisorFuture, SystemdSupervisor};
