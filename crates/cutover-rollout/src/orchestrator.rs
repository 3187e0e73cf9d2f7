//! Orchestrator — sequences one blue-green run.
//!
//! A run is split in two halves. `execute` walks the happy path and stops
//! at the first failure. `settle` always runs afterwards and is the only
//! place cleanup happens, so a signal, a timeout, and a hard error all
//! take the same exit route:
//!
//! - failed before the switch: nothing moved, the new slot is abandoned
//!   (stopped, or left as-is when cancelled) and routing is untouched
//! - failed after the switch: the rollback manager restores routing
//! - succeeded: the previous slot is stopped and kept as rollback target

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, warn};

use cutover_core::{CancelSignal, DeploymentArtifact, Environment, ResolvedTier};
use cutover_health::{HealthProber, HealthSource, HttpHealthSource, ProbeOutcome};
use cutover_install::{
    ArtifactInstaller, CommandSmokeTests, SmokeOutcome, SmokeTests, Supervisor, SystemdSupervisor,
};
use cutover_routing::{
    CommandRouter, EnvironmentRegistry, RouterControl, RoutingTemplate, SwitchError,
    SwitchReceipt, TrafficSwitch,
};

use crate::attempt::{DeploymentAttempt, Phase, RunKind};
use crate::error::{RolloutError, RolloutResult};
use crate::history;
use crate::outcome::DeployOutcome;
use crate::rollback::RollbackManager;
use crate::status::{TierStatus, tier_status};

/// The side-effecting collaborators of a run.
pub struct Dependencies {
    pub supervisor: Arc<dyn Supervisor>,
    pub health: Arc<dyn HealthSource>,
    pub smoke: Arc<dyn SmokeTests>,
    pub router: Arc<dyn RouterControl>,
}

impl Dependencies {
    /// systemd, HTTP health checks, and the tier's smoke and router
    /// commands.
    pub fn for_tier(tier: &ResolvedTier) -> Self {
        let cfg = &tier.config;
        Self {
            supervisor: Arc::new(SystemdSupervisor::new(
                &cfg.service,
                &cfg.supervisor,
                tier.supervisor_command_timeout,
            )),
            health: Arc::new(HttpHealthSource::new(
                &cfg.health.path,
                cfg.health.checks.clone(),
                tier.health_request_timeout,
            )),
            smoke: Arc::new(CommandSmokeTests::new(
                cfg.smoke.command.clone(),
                &tier.name,
                cfg.smoke.working_dir.clone(),
                tier.smoke_timeout,
            )),
            router: Arc::new(CommandRouter::new(
                cfg.routing.validate_command.clone(),
                cfg.routing.reload_command.clone(),
                tier.routing_command_timeout,
            )),
        }
    }
}

/// Timing of the health gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct GateTimings {
    health_timeout: Duration,
    health_interval: Duration,
    /// Pause between the switch and the post-switch gate while in-flight
    /// connections drain onto the new path.
    settle_delay: Duration,
}

pub struct Orchestrator {
    tier: String,
    registry: EnvironmentRegistry,
    installer: ArtifactInstaller,
    supervisor: Arc<dyn Supervisor>,
    prober: HealthProber,
    smoke: Arc<dyn SmokeTests>,
    switch: Arc<TrafficSwitch>,
    rollback: RollbackManager,
    timings: GateTimings,
    history_file: Option<PathBuf>,
}

/// Why `execute` stopped.
#[derive(Debug, Error)]
enum Failure {
    #[error("{0}")]
    Discovery(String),
    #[error("{0}")]
    Install(String),
    #[error("health check timed out: {}", .0.join("; "))]
    Unhealthy(Vec<String>),
    #[error("{0}")]
    Smoke(String),
    #[error(transparent)]
    Switch(SwitchError),
    #[error("{0}")]
    PostSwitch(String),
    #[error("cancelled by signal")]
    Cancelled,
}

/// What `execute` got done before it stopped.
#[derive(Default)]
struct Progress {
    target: Option<Environment>,
    source: Option<Environment>,
    /// Present once the live routing file points at the target.
    receipt: Option<SwitchReceipt>,
}

impl Orchestrator {
    pub fn new(tier: &ResolvedTier, deps: Dependencies) -> RolloutResult<Self> {
        let routing = &tier.config.routing;
        let template = RoutingTemplate::load(&routing.upstream, routing.template.as_deref())
            .map_err(|source| RolloutError::Template {
                path: routing.template.clone().unwrap_or_default(),
                source,
            })?;
        let registry = EnvironmentRegistry::new(
            &routing.config_path,
            &routing.upstream,
            tier.environments.clone(),
        );
        let switch = Arc::new(TrafficSwitch::new(
            &routing.config_path,
            template,
            deps.router,
        ));

        Ok(Self {
            tier: tier.name.clone(),
            registry,
            installer: ArtifactInstaller::for_tier(tier, deps.supervisor.clone()),
            supervisor: deps.supervisor.clone(),
            prober: HealthProber::new(deps.health),
            smoke: deps.smoke,
            rollback: RollbackManager::new(switch.clone(), deps.supervisor),
            switch,
            timings: GateTimings {
                health_timeout: tier.health_timeout,
                health_interval: tier.health_interval,
                settle_delay: tier.settle_delay,
            },
            history_file: tier.config.history_file.clone(),
        })
    }

    /// Override the health gate timeout (the CLI `--timeout`).
    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.timings.health_timeout = timeout;
        self
    }

    pub async fn status(&self) -> RolloutResult<TierStatus> {
        tier_status(&self.tier, &self.registry, self.supervisor.as_ref()).await
    }

    /// Install `artifact` into the inactive slot and cut traffic over to it.
    pub async fn deploy(
        &self,
        artifact: &DeploymentArtifact,
        cancel: &CancelSignal,
    ) -> DeploymentAttempt {
        let kind = RunKind::Deploy {
            artifact: artifact.path.clone(),
        };
        self.run(kind, Some(artifact), cancel).await
    }

    /// Cut traffic back to the retained slot: start it, gate it on health,
    /// switch. Post-switch failure reverts exactly like a deployment.
    pub async fn rollback(&self, cancel: &CancelSignal) -> DeploymentAttempt {
        self.run(RunKind::Rollback, None, cancel).await
    }

    async fn run(
        &self,
        kind: RunKind,
        artifact: Option<&DeploymentArtifact>,
        cancel: &CancelSignal,
    ) -> DeploymentAttempt {
        let mut attempt = DeploymentAttempt::new(&self.tier, kind);
        let mut progress = Progress::default();
        info!(attempt = %attempt.id, tier = %self.tier, "run started");

        let result = self
            .execute(&mut attempt, &mut progress, artifact, cancel)
            .await;
        let outcome = self.settle(&mut attempt, progress, result).await;
        attempt.finish(outcome);

        match &attempt.outcome {
            Some(DeployOutcome::RollbackFailed { .. }) => {
                error!(attempt = %attempt.id, summary = %attempt.summary(), "run ended")
            }
            Some(o) if o.is_success() => {
                info!(attempt = %attempt.id, summary = %attempt.summary(), "run ended")
            }
            _ => warn!(attempt = %attempt.id, summary = %attempt.summary(), "run ended"),
        }

        if let Some(path) = &self.history_file {
            if let Err(e) = history::append(path, &attempt) {
                warn!(path = %path.display(), error = %e, "failed to append deployment history");
            }
        }
        attempt
    }

    async fn execute(
        &self,
        attempt: &mut DeploymentAttempt,
        progress: &mut Progress,
        artifact: Option<&DeploymentArtifact>,
        cancel: &CancelSignal,
    ) -> Result<(), Failure> {
        let source = self
            .registry
            .active()
            .map_err(|e| Failure::Discovery(e.to_string()))?;
        if artifact.is_none() && source.is_none() {
            return Err(Failure::Discovery(
                "no slot is live, nothing to roll back to".to_string(),
            ));
        }
        let target = self
            .registry
            .inactive()
            .map_err(|e| Failure::Discovery(e.to_string()))?;

        info!(
            active = %source.as_ref().map_or("none", |e| e.name()),
            target = %target.slot,
            port = target.port,
            "discovered slots"
        );
        attempt.source = source.as_ref().map(|e| e.slot);
        attempt.target = Some(target.slot);
        progress.source = source;
        progress.target = Some(target.clone());

        if cancel.is_cancelled() {
            return Err(Failure::Cancelled);
        }
        attempt.enter(Phase::Deploying);
        match artifact {
            Some(artifact) => {
                let report = self
                    .installer
                    .install(&target, artifact)
                    .await
                    .map_err(|e| Failure::Install(e.to_string()))?;
                let backup = report
                    .backup
                    .as_ref()
                    .map_or_else(|| "none".to_string(), |b| b.display().to_string());
                info!(
                    slot = %target.slot,
                    root = %report.root.display(),
                    %backup,
                    env_file = %report.env_file.display(),
                    "slot installed"
                );
            }
            None => self.start_retained(&target).await?,
        }

        if cancel.is_cancelled() {
            return Err(Failure::Cancelled);
        }
        attempt.enter(Phase::PreSwitchHealthCheck);
        self.gate(&target, cancel).await?;

        if artifact.is_some() {
            attempt.enter(Phase::SmokeTesting);
            let mut signal = cancel.clone();
            let outcome = tokio::select! {
                outcome = self.smoke.run(&target) => outcome,
                _ = signal.cancelled() => return Err(Failure::Cancelled),
            };
            if let SmokeOutcome::Fail { reason } = outcome {
                return Err(Failure::Smoke(reason));
            }
        }

        // Last point at which a signal leaves traffic where it is.
        if cancel.is_cancelled() {
            return Err(Failure::Cancelled);
        }
        attempt.enter(Phase::Switching);
        let receipt = self
            .switch
            .switch_to(&target)
            .await
            .map_err(Failure::Switch)?;
        progress.receipt = Some(receipt);

        match self.registry.active() {
            Ok(Some(live)) if live.slot == target.slot => {}
            Ok(live) => {
                return Err(Failure::PostSwitch(format!(
                    "routing reads back {} after switching to {}",
                    live.map_or("none", |e| e.name()),
                    target.slot
                )));
            }
            Err(e) => return Err(Failure::PostSwitch(e.to_string())),
        }

        let mut signal = cancel.clone();
        tokio::select! {
            _ = tokio::time::sleep(self.timings.settle_delay) => {}
            _ = signal.cancelled() => return Err(Failure::Cancelled),
        }

        attempt.enter(Phase::PostSwitchHealthCheck);
        self.gate(&target, cancel).await.map_err(|failure| match failure {
            Failure::Unhealthy(failing) => Failure::PostSwitch(format!(
                "post-switch health check timed out: {}",
                failing.join("; ")
            )),
            other => other,
        })
    }

    async fn settle(
        &self,
        attempt: &mut DeploymentAttempt,
        progress: Progress,
        result: Result<(), Failure>,
    ) -> DeployOutcome {
        let Progress {
            target,
            source,
            receipt,
        } = progress;

        let failure = match result {
            Ok(()) => {
                // `execute` only succeeds after discovering a target.
                let active = target.as_ref().map(|e| e.slot);
                attempt.enter(Phase::Finalizing);
                if let Some(previous) = &source {
                    if let Err(e) = self.supervisor.stop(previous).await {
                        warn!(
                            slot = %previous.slot,
                            error = %e,
                            "failed to stop previous slot; it no longer receives traffic"
                        );
                    }
                }
                attempt.enter(Phase::Completed);
                if let Some(active) = active {
                    return DeployOutcome::Succeeded {
                        active,
                        retained: source.map(|e| e.slot),
                    };
                }
                Failure::Discovery("run finished without a target".to_string())
            }
            Err(failure) => failure,
        };

        if let (Some(receipt), Some(failed)) = (&receipt, &target) {
            attempt.enter(Phase::RollingBack);
            let reason = failure.to_string();
            let outcome = match self
                .rollback
                .roll_back(receipt, failed, source.as_ref())
                .await
            {
                Ok(()) => DeployOutcome::RolledBack {
                    reason,
                    active: source.map(|e| e.slot),
                },
                Err(e) => DeployOutcome::RollbackFailed {
                    reason: format!("{reason}; rollback: {e}"),
                },
            };
            attempt.enter(Phase::Failed);
            return outcome;
        }

        let abandon = matches!(
            &failure,
            Failure::Unhealthy(_) | Failure::Smoke(_)
        ) || matches!(&failure, Failure::Switch(e) if !e.is_unrecoverable());
        if abandon {
            if let Some(target) = &target {
                info!(slot = %target.slot, "stopping abandoned slot");
                if let Err(e) = self.supervisor.stop(target).await {
                    warn!(slot = %target.slot, error = %e, "failed to stop abandoned slot");
                }
            }
        }

        let outcome = match failure {
            Failure::Discovery(reason) => DeployOutcome::DiscoveryFailed { reason },
            Failure::Install(reason) => DeployOutcome::InstallFailed { reason },
            Failure::Unhealthy(failing) => DeployOutcome::PreSwitchUnhealthy { failing },
            Failure::Smoke(reason) => DeployOutcome::SmokeFailed { reason },
            Failure::Switch(e) if e.is_unrecoverable() => DeployOutcome::RollbackFailed {
                reason: e.to_string(),
            },
            Failure::Switch(e) => DeployOutcome::SwitchRejected {
                reason: e.to_string(),
            },
            // Post-switch failures always carry a receipt and were
            // handled above.
            Failure::PostSwitch(reason) => DeployOutcome::RollbackFailed { reason },
            Failure::Cancelled => {
                info!(phase = ?attempt.phase, "cancelled before switch; target left for inspection");
                DeployOutcome::Cancelled {
                    phase: attempt.phase,
                }
            }
        };
        attempt.enter(Phase::Failed);
        outcome
    }

    /// Start the retained slot for a manual rollback.
    async fn start_retained(&self, target: &Environment) -> Result<(), Failure> {
        if !target.root.is_dir() {
            return Err(Failure::Install(format!(
                "retained slot {} has no installation at {}",
                target.slot,
                target.root.display()
            )));
        }
        let running = self
            .supervisor
            .is_running(target)
            .await
            .map_err(|e| Failure::Install(e.to_string()))?;
        if !running {
            self.supervisor
                .start(target)
                .await
                .map_err(|e| Failure::Install(e.to_string()))?;
        }
        Ok(())
    }

    async fn gate(&self, target: &Environment, cancel: &CancelSignal) -> Result<(), Failure> {
        let outcome = self
            .prober
            .wait_healthy(
                target,
                self.timings.health_timeout,
                self.timings.health_interval,
                cancel,
            )
            .await;
        match outcome {
            ProbeOutcome::Healthy { .. } => Ok(()),
            ProbeOutcome::TimedOut { last_failure, .. } => Err(Failure::Unhealthy(last_failure)),
            ProbeOutcome::Cancelled { .. } => Err(Failure::Cancelled),
        }
    }
}
