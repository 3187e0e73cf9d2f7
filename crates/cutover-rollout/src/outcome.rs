//! How a run ended, and the process exit code for each ending.
//!
//! Exit codes are part of the CLI contract: automation must be able to
//! tell "rolled back safely" (6) from "rollback failed" (7).

use std::fmt;

use serde::Serialize;

use cutover_core::Slot;

use crate::attempt::Phase;

pub const EXIT_SUCCESS: i32 = 0;
/// Usage, configuration, or unparseable routing state.
pub const EXIT_CONFIG: i32 = 1;
pub const EXIT_INSTALL_FAILED: i32 = 2;
pub const EXIT_PRE_SWITCH_UNHEALTHY: i32 = 3;
pub const EXIT_SMOKE_FAILED: i32 = 4;
pub const EXIT_SWITCH_REJECTED: i32 = 5;
pub const EXIT_ROLLED_BACK: i32 = 6;
pub const EXIT_ROLLBACK_FAILED: i32 = 7;
/// Another orchestrator holds the tier lock.
pub const EXIT_LOCK_HELD: i32 = 8;
pub const EXIT_CANCELLED: i32 = 9;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeployOutcome {
    /// Traffic moved to `active`; `retained` is stopped but kept on disk.
    Succeeded { active: Slot, retained: Option<Slot> },
    /// The live routing state could not be read, or there is nothing to
    /// act on.
    DiscoveryFailed { reason: String },
    InstallFailed { reason: String },
    PreSwitchUnhealthy { failing: Vec<String> },
    SmokeFailed { reason: String },
    /// The switch did not take effect; routing is as it was.
    SwitchRejected { reason: String },
    /// Stopped by a signal before traffic moved. The target slot is left
    /// as it was for inspection.
    Cancelled { phase: Phase },
    /// Traffic moved, then the run failed and traffic was moved back.
    RolledBack { reason: String, active: Option<Slot> },
    /// Routing can no longer be trusted. A human has to look.
    RollbackFailed { reason: String },
}

impl DeployOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            DeployOutcome::Succeeded { .. } => EXIT_SUCCESS,
            DeployOutcome::DiscoveryFailed { .. } => EXIT_CONFIG,
            DeployOutcome::InstallFailed { .. } => EXIT_INSTALL_FAILED,
            DeployOutcome::PreSwitchUnhealthy { .. } => EXIT_PRE_SWITCH_UNHEALTHY,
            DeployOutcome::SmokeFailed { .. } => EXIT_SMOKE_FAILED,
            DeployOutcome::SwitchRejected { .. } => EXIT_SWITCH_REJECTED,
            DeployOutcome::RolledBack { .. } => EXIT_ROLLED_BACK,
            DeployOutcome::RollbackFailed { .. } => EXIT_ROLLBACK_FAILED,
            DeployOutcome::Cancelled { .. } => EXIT_CANCELLED,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, DeployOutcome::Succeeded { .. })
    }
}

fn slot_or_none(slot: Option<Slot>) -> String {
    slot.map_or_else(|| "none".to_string(), |s| s.to_string())
}

impl fmt::Display for DeployOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployOutcome::Succeeded { active, retained } => write!(
                f,
                "succeeded; active: {active}, retained for rollback: {}",
                slot_or_none(*retained)
            ),
            DeployOutcome::DiscoveryFailed { reason } => write!(f, "aborted: {reason}"),
            DeployOutcome::InstallFailed { reason } => {
                write!(f, "install failed, active slot untouched: {reason}")
            }
            DeployOutcome::PreSwitchUnhealthy { failing } => write!(
                f,
                "new slot never became healthy, traffic not switched ({})",
                failing.join("; ")
            ),
            DeployOutcome::SmokeFailed { reason } => {
                write!(f, "smoke tests failed, traffic not switched: {reason}")
            }
            DeployOutcome::SwitchRejected { reason } => {
                write!(f, "traffic switch rejected, routing unchanged: {reason}")
            }
            DeployOutcome::Cancelled { phase } => write!(
                f,
                "cancelled during {phase:?}, traffic not switched; target slot left for inspection"
            ),
            DeployOutcome::RolledBack { reason, active } => write!(
                f,
                "rolled back after switch ({reason}); active: {}",
                slot_or_none(*active)
            ),
            DeployOutcome::RollbackFailed { reason } => write!(
                f,
                "ROLLBACK FAILED, routing state untrusted, manual intervention required: {reason}"
            ),
        }
    }
}
