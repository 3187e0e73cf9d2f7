//! One orchestration run and the phases it moves through.

use std::path::PathBuf;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::info;

use cutover_core::{Slot, epoch_secs};

use crate::outcome::DeployOutcome;

/// Orchestrator state.
///
/// ```text
/// Discovering → Deploying → PreSwitchHealthCheck → SmokeTesting → Switching
///     → PostSwitchHealthCheck → Finalizing → Completed
///
/// any phase after Deploying ──failure──→ [RollingBack →] Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Reading the live routing file to find the active slot.
    Discovering,
    /// Installing into (or, for a manual rollback, starting) the target.
    Deploying,
    PreSwitchHealthCheck,
    SmokeTesting,
    /// Rewriting and reloading the routing config.
    Switching,
    PostSwitchHealthCheck,
    /// Stopping the previously active slot, which is retained on disk.
    Finalizing,
    Completed,
    /// Reverting a completed switch.
    RollingBack,
    Failed,
}

/// What a run is doing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunKind {
    /// Install an artifact into the inactive slot and cut over to it.
    Deploy { artifact: PathBuf },
    /// Cut back over to the retained slot without installing anything.
    Rollback,
}

/// Record of a single run, written to the history log when it ends.
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentAttempt {
    pub id: String,
    pub tier: String,
    #[serde(flatten)]
    pub kind: RunKind,
    /// Slot being deployed to. Unknown until discovery succeeds.
    pub target: Option<Slot>,
    /// Slot that was live when the run began; the rollback target.
    pub source: Option<Slot>,
    pub started_at: u64,
    pub finished_at: Option<u64>,
    pub duration_ms: Option<u64>,
    pub phase: Phase,
    /// Every phase entered, in order.
    pub phases: Vec<Phase>,
    pub outcome: Option<DeployOutcome>,
    #[serde(skip)]
    started: Option<Instant>,
}

impl DeploymentAttempt {
    pub fn new(tier: &str, kind: RunKind) -> Self {
        let started_at = epoch_secs();
        Self {
            id: format!("{tier}-{started_at}"),
            tier: tier.to_string(),
            kind,
            target: None,
            source: None,
            started_at,
            finished_at: None,
            duration_ms: None,
            phase: Phase::Discovering,
            phases: vec![Phase::Discovering],
            outcome: None,
            started: Some(Instant::now()),
        }
    }

    /// Move to `phase`, logging the transition.
    pub fn enter(&mut self, phase: Phase) {
        info!(
            attempt = %self.id,
            from = ?self.phase,
            to = ?phase,
            "phase transition"
        );
        self.phase = phase;
        self.phases.push(phase);
    }

    pub fn visited(&self, phase: Phase) -> bool {
        self.phases.contains(&phase)
    }

    /// Record the final outcome and timing.
    pub fn finish(&mut self, outcome: DeployOutcome) {
        self.finished_at = Some(epoch_secs());
        self.duration_ms = self.started.map(|s| s.elapsed().as_millis() as u64);
        self.outcome = Some(outcome);
    }

    pub fn exit_code(&self) -> i32 {
        self.outcome.as_ref().map_or(1, DeployOutcome::exit_code)
    }

    /// Human-readable end-of-run summary.
    pub fn summary(&self) -> String {
        let what = match &self.kind {
            RunKind::Deploy { artifact } => format!("deploy of {}", artifact.display()),
            RunKind::Rollback => "manual rollback".to_string(),
        };
        let outcome = self
            .outcome
            .as_ref()
            .map_or_else(|| "did not finish".to_string(), |o| o.to_string());
        let mut summary = format!("[{}] {what} to tier {}: {outcome}", self.id, self.tier);
        if let Some(ms) = self.duration_ms {
            summary.push_str(&format!(" ({:.1}s)", ms as f64 / 1000.0));
        }
        summary
    }
}
