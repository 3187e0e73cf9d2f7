//! End-to-end runs of the orchestrator against a real routing file and
//! real slot directories, with the supervisor, health endpoint, smoke
//! suite and router replaced by in-memory doubles.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use cutover_core::{
    CancelHandle, CancelSignal, CutoverConfig, DeploymentArtifact, Environment, ResolvedTier,
    Slot, cancel_pair,
};
use cutover_health::{CheckResult, HealthReport, HealthSource, ProbeFuture};
use cutover_install::{SmokeFuture, SmokeOutcome, SmokeTests, Supervisor, SupervisorFuture};
use cutover_routing::{RouterControl, RouterFuture, parse_routing};
use cutover_rollout::{Dependencies, DeployOutcome, Orchestrator, Phase};

// ── Doubles ─────────────────────────────────────────────────────────

#[derive(Default)]
struct FakeSupervisor {
    running: Mutex<HashSet<String>>,
    log: Mutex<Vec<String>>,
}

impl FakeSupervisor {
    fn is_up(&self, unit: &str) -> bool {
        self.running.lock().unwrap().contains(unit)
    }

    fn mark_running(&self, unit: &str) {
        self.running.lock().unwrap().insert(unit.to_string());
    }

    fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

impl Supervisor for FakeSupervisor {
    fn configure<'a>(
        &'a self,
        env: &'a Environment,
        _start_script: &'a Path,
        _env_file: &'a Path,
    ) -> SupervisorFuture<'a, ()> {
        self.log.lock().unwrap().push(format!("configure {}", env.unit));
        Box::pin(async { Ok(()) })
    }

    fn start<'a>(&'a self, env: &'a Environment) -> SupervisorFuture<'a, ()> {
        self.log.lock().unwrap().push(format!("start {}", env.unit));
        self.mark_running(&env.unit);
        Box::pin(async { Ok(()) })
    }

    fn stop<'a>(&'a self, env: &'a Environment) -> SupervisorFuture<'a, ()> {
        self.log.lock().unwrap().push(format!("stop {}", env.unit));
        self.running.lock().unwrap().remove(&env.unit);
        Box::pin(async { Ok(()) })
    }

    fn is_running<'a>(&'a self, env: &'a Environment) -> SupervisorFuture<'a, bool> {
        let running = self.is_up(&env.unit);
        Box::pin(async move { Ok(running) })
    }
}

#[derive(Debug, Clone, Copy)]
enum Health {
    Always,
    Never,
    /// Healthy for the first `n` readings, then down for good.
    HealthyFor(u32),
}

#[derive(Default)]
struct FakeHealth {
    plans: Mutex<HashMap<Slot, Health>>,
    readings: Mutex<HashMap<Slot, u32>>,
    /// Fire a cancellation on the n-th reading of any slot.
    cancel_on: Mutex<Option<(u32, CancelHandle)>>,
    total: AtomicU32,
}

impl FakeHealth {
    fn set(&self, slot: Slot, plan: Health) {
        self.plans.lock().unwrap().insert(slot, plan);
    }
}

impl HealthSource for FakeHealth {
    fn probe<'a>(&'a self, env: &'a Environment) -> ProbeFuture<'a> {
        let total = self.total.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((n, handle)) = &*self.cancel_on.lock().unwrap() {
            if *n == total {
                handle.cancel();
            }
        }

        let reading = {
            let mut readings = self.readings.lock().unwrap();
            let count = readings.entry(env.slot).or_default();
            *count += 1;
            *count
        };
        let plan = self
            .plans
            .lock()
            .unwrap()
            .get(&env.slot)
            .copied()
            .unwrap_or(Health::Always);
        let healthy = match plan {
            Health::Always => true,
            Health::Never => false,
            Health::HealthyFor(n) => reading <= n,
        };

        Box::pin(async move {
            HealthReport {
                liveness: CheckResult::healthy("liveness"),
                sub_checks: vec![
                    CheckResult::healthy("memory"),
                    if healthy {
                        CheckResult::healthy("database")
                    } else {
                        CheckResult::unhealthy("database", "connected = false")
                    },
                ],
                expected_sub_checks: 2,
            }
        })
    }
}

struct FakeSmoke {
    fail: Mutex<Option<String>>,
    targets: Mutex<Vec<Slot>>,
}

impl SmokeTests for FakeSmoke {
    fn run<'a>(&'a self, env: &'a Environment) -> SmokeFuture<'a> {
        self.targets.lock().unwrap().push(env.slot);
        let outcome = match self.fail.lock().unwrap().clone() {
            Some(reason) => SmokeOutcome::Fail { reason },
            None => SmokeOutcome::Pass,
        };
        Box::pin(async move { outcome })
    }
}

/// Runs once, right after the n-th (1-based) reload is accepted.
type AfterReload = (u32, Box<dyn FnOnce() + Send>);

#[derive(Default)]
struct FakeRouter {
    reject_validate: Mutex<bool>,
    /// 1-based reload numbers that fail.
    failing_reloads: Mutex<Vec<u32>>,
    reloads: AtomicU32,
    cancel_on_reload: Mutex<Option<CancelHandle>>,
    after_reload: Mutex<Option<AfterReload>>,
}

impl RouterControl for FakeRouter {
    fn validate<'a>(&'a self, _staged: &'a Path) -> RouterFuture<'a> {
        let reject = *self.reject_validate.lock().unwrap();
        Box::pin(async move {
            if reject {
                Err("unknown directive \"upstraem\"".to_string())
            } else {
                Ok(())
            }
        })
    }

    fn reload(&self) -> RouterFuture<'_> {
        let n = self.reloads.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(handle) = self.cancel_on_reload.lock().unwrap().take() {
            handle.cancel();
        }
        let fail = self.failing_reloads.lock().unwrap().contains(&n);
        if !fail {
            let mut after = self.after_reload.lock().unwrap();
            if after.as_ref().is_some_and(|(at, _)| *at == n) {
                if let Some((_, hook)) = after.take() {
                    hook();
                }
            }
        }
        Box::pin(async move {
            if fail {
                Err(format!("reload {n} refused"))
            } else {
                Ok(())
            }
        })
    }
}

// ── Harness ─────────────────────────────────────────────────────────

struct Harness {
    dir: tempfile::TempDir,
    tier: ResolvedTier,
    supervisor: Arc<FakeSupervisor>,
    health: Arc<FakeHealth>,
    smoke: Arc<FakeSmoke>,
    router: Arc<FakeRouter>,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().display().to_string();
        let config = format!(
            r#"
[tiers.production]
service = "shop"
lock_file = "{root}/production.lock"
history_file = "{root}/history/production.jsonl"
settle_delay = "5s"

[tiers.production.routing]
config_path = "{root}/shop.conf"
upstream = "shop_backend"
reload_command = ["nginx", "-s", "reload"]

[tiers.production.slots.primary]
port = 3001
root = "{root}/slots/primary"
unit = "shop-primary"

[tiers.production.slots.secondary]
port = 3002
root = "{root}/slots/secondary"
unit = "shop-secondary"

[tiers.production.health]
timeout = "30s"
interval = "10s"

[tiers.production.smoke]
command = ["./smoke.sh", "{{url}}"]
"#
        );
        let path = dir.path().join("cutover.toml");
        std::fs::write(&path, config).unwrap();
        let tier = CutoverConfig::from_file(&path)
            .unwrap()
            .tier("production")
            .unwrap();

        Self {
            dir,
            tier,
            supervisor: Arc::new(FakeSupervisor::default()),
            health: Arc::new(FakeHealth::default()),
            smoke: Arc::new(FakeSmoke {
                fail: Mutex::new(None),
                targets: Mutex::new(Vec::new()),
            }),
            router: Arc::new(FakeRouter::default()),
        }
    }

    fn orchestrator(&self) -> Orchestrator {
        Orchestrator::new(
            &self.tier,
            Dependencies {
                supervisor: self.supervisor.clone(),
                health: self.health.clone(),
                smoke: self.smoke.clone(),
                router: self.router.clone(),
            },
        )
        .unwrap()
    }

    fn env(&self, slot: Slot) -> &Environment {
        self.tier.environments.get(slot)
    }

    fn routing_path(&self) -> PathBuf {
        self.dir.path().join("shop.conf")
    }

    fn routing(&self) -> Option<Vec<u8>> {
        std::fs::read(self.routing_path()).ok()
    }

    fn live_port(&self) -> Option<u16> {
        let contents = std::fs::read_to_string(self.routing_path()).ok()?;
        Some(parse_routing(&contents, "shop_backend").unwrap().port)
    }

    /// An existing deployment: `slot` installed, running and live.
    fn live_on(&self, slot: Slot) {
        let env = self.env(slot);
        std::fs::write(
            self.routing_path(),
            format!(
                "# hand-written\nupstream shop_backend {{\n    server 127.0.0.1:{};\n}}\n",
                env.port
            ),
        )
        .unwrap();
        self.installed(slot);
        self.supervisor.mark_running(&env.unit);
    }

    /// `slot` has a build on disk.
    fn installed(&self, slot: Slot) {
        let root = &self.env(slot).root;
        std::fs::create_dir_all(root).unwrap();
        std::fs::write(root.join("start.sh"), "#!/bin/sh\n").unwrap();
        std::fs::write(root.join("VERSION"), "v1").unwrap();
    }

    fn artifact(&self) -> DeploymentArtifact {
        let build = self.dir.path().join("build-v2");
        std::fs::create_dir_all(&build).unwrap();
        std::fs::write(build.join("start.sh"), "#!/bin/sh\nexec ./server\n").unwrap();
        std::fs::write(build.join("env.template"), "PORT={{PORT}}\n").unwrap();
        std::fs::write(build.join("VERSION"), "v2").unwrap();
        DeploymentArtifact::new(build, None)
    }

    fn history_lines(&self) -> Vec<serde_json::Value> {
        let path = self.dir.path().join("history").join("production.jsonl");
        std::fs::read_to_string(path)
            .unwrap_or_default()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }
}

// ── Scenarios ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn bootstrap_deploys_to_primary() {
    let h = Harness::new();
    assert!(h.routing().is_none());

    let attempt = h
        .orchestrator()
        .deploy(&h.artifact(), &CancelSignal::never())
        .await;

    assert_eq!(
        attempt.outcome,
        Some(DeployOutcome::Succeeded {
            active: Slot::Primary,
            retained: None
        })
    );
    assert_eq!(attempt.exit_code(), 0);
    assert_eq!(h.live_port(), Some(3001));
    assert!(h.supervisor.is_up("shop-primary"));

    let history = h.history_lines();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["outcome"]["status"], "succeeded");
    assert_eq!(history[0]["target"], "primary");
}

#[tokio::test(start_paused = true)]
async fn successful_cutover_retains_previous_slot() {
    let h = Harness::new();
    h.live_on(Slot::Primary);

    let attempt = h
        .orchestrator()
        .deploy(&h.artifact(), &CancelSignal::never())
        .await;

    assert_eq!(
        attempt.outcome,
        Some(DeployOutcome::Succeeded {
            active: Slot::Secondary,
            retained: Some(Slot::Primary)
        })
    );
    assert_eq!(
        attempt.phases,
        vec![
            Phase::Discovering,
            Phase::Deploying,
            Phase::PreSwitchHealthCheck,
            Phase::SmokeTesting,
            Phase::Switching,
            Phase::PostSwitchHealthCheck,
            Phase::Finalizing,
            Phase::Completed,
        ]
    );

    assert_eq!(h.live_port(), Some(3002));
    assert!(h.supervisor.is_up("shop-secondary"));
    assert!(!h.supervisor.is_up("shop-primary"));
    // Stopped, not deleted.
    let primary = &h.env(Slot::Primary).root;
    assert_eq!(std::fs::read_to_string(primary.join("VERSION")).unwrap(), "v1");

    let secondary = &h.env(Slot::Secondary).root;
    assert_eq!(std::fs::read_to_string(secondary.join("VERSION")).unwrap(), "v2");
    assert_eq!(*h.smoke.targets.lock().unwrap(), vec![Slot::Secondary]);
}

#[tokio::test(start_paused = true)]
async fn successive_deployments_alternate_slots() {
    let h = Harness::new();
    let orchestrator = h.orchestrator();
    let mut live = Vec::new();
    for _ in 0..3 {
        let attempt = orchestrator
            .deploy(&h.artifact(), &CancelSignal::never())
            .await;
        assert_eq!(attempt.exit_code(), 0);
        live.push(h.live_port().unwrap());
    }
    assert_eq!(live, vec![3001, 3002, 3001]);
    assert_eq!(h.history_lines().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn pre_switch_timeout_leaves_routing_untouched() {
    let h = Harness::new();
    h.live_on(Slot::Primary);
    h.health.set(Slot::Secondary, Health::Never);
    let before = h.routing();

    let started = tokio::time::Instant::now();
    let attempt = h
        .orchestrator()
        .deploy(&h.artifact(), &CancelSignal::never())
        .await;
    let elapsed = started.elapsed();

    assert_eq!(attempt.exit_code(), 3);
    assert!(matches!(
        attempt.outcome,
        Some(DeployOutcome::PreSwitchUnhealthy { ref failing }) if failing == &["database: connected = false"]
    ));
    assert!(elapsed.as_secs() >= 30 && elapsed.as_secs() <= 40, "{elapsed:?}");
    assert_eq!(h.routing(), before);
    assert!(!h.supervisor.is_up("shop-secondary"));
    assert!(h.supervisor.is_up("shop-primary"));
    assert!(!attempt.visited(Phase::Switching));
    assert!(!attempt.visited(Phase::RollingBack));
    assert!(h.smoke.targets.lock().unwrap().is_empty());
    assert_eq!(h.router.reloads.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn smoke_failure_abandons_new_slot() {
    let h = Harness::new();
    h.live_on(Slot::Primary);
    *h.smoke.fail.lock().unwrap() = Some("checkout flow: 500".to_string());
    let before = h.routing();

    let attempt = h
        .orchestrator()
        .deploy(&h.artifact(), &CancelSignal::never())
        .await;

    assert_eq!(attempt.exit_code(), 4);
    assert_eq!(h.routing(), before);
    assert!(!h.supervisor.is_up("shop-secondary"));
    assert!(h.supervisor.is_up("shop-primary"));
    assert_eq!(attempt.phase, Phase::Failed);
}

#[tokio::test(start_paused = true)]
async fn rejected_switch_keeps_routing() {
    let h = Harness::new();
    h.live_on(Slot::Primary);
    *h.router.reject_validate.lock().unwrap() = true;
    let before = h.routing();

    let attempt = h
        .orchestrator()
        .deploy(&h.artifact(), &CancelSignal::never())
        .await;

    assert_eq!(attempt.exit_code(), 5);
    assert_eq!(h.routing(), before);
    assert!(!h.supervisor.is_up("shop-secondary"));
    assert!(!attempt.visited(Phase::RollingBack));
    assert!(!h.dir.path().join("shop.conf.cutover-staging").exists());
}

#[tokio::test(start_paused = true)]
async fn post_switch_failure_rolls_back() {
    let h = Harness::new();
    h.live_on(Slot::Primary);
    // Passes the pre-switch gate, then falls over under live traffic.
    h.health.set(Slot::Secondary, Health::HealthyFor(1));
    let before = h.routing();

    let attempt = h
        .orchestrator()
        .deploy(&h.artifact(), &CancelSignal::never())
        .await;

    assert_eq!(attempt.exit_code(), 6);
    assert!(matches!(
        attempt.outcome,
        Some(DeployOutcome::RolledBack { active: Some(Slot::Primary), .. })
    ));
    assert_eq!(h.routing(), before);
    assert!(h.supervisor.is_up("shop-primary"));
    assert!(!h.supervisor.is_up("shop-secondary"));
    assert_eq!(
        &attempt.phases[attempt.phases.len() - 2..],
        &[Phase::RollingBack, Phase::Failed]
    );
    // Switch reload plus revert reload.
    assert_eq!(h.router.reloads.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn post_switch_failure_on_bootstrap_removes_routing() {
    let h = Harness::new();
    h.health.set(Slot::Primary, Health::HealthyFor(1));

    let attempt = h
        .orchestrator()
        .deploy(&h.artifact(), &CancelSignal::never())
        .await;

    assert_eq!(
        attempt.outcome.as_ref().map(DeployOutcome::exit_code),
        Some(6)
    );
    assert!(h.routing().is_none());
}

#[tokio::test(start_paused = true)]
async fn failed_revert_is_an_emergency() {
    let h = Harness::new();
    h.live_on(Slot::Primary);
    h.health.set(Slot::Secondary, Health::HealthyFor(1));
    // The switch reload succeeds; the reload after restoring fails.
    *h.router.failing_reloads.lock().unwrap() = vec![2];

    let attempt = h
        .orchestrator()
        .deploy(&h.artifact(), &CancelSignal::never())
        .await;

    assert_eq!(attempt.exit_code(), 7);
    assert!(matches!(
        attempt.outcome,
        Some(DeployOutcome::RollbackFailed { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn routing_changed_underneath_the_switch_rolls_back() {
    let h = Harness::new();
    h.live_on(Slot::Primary);
    let before = h.routing();
    // Something else rewrites the live file as the router reloads.
    let path = h.routing_path();
    *h.router.after_reload.lock().unwrap() = Some((
        1,
        Box::new(move || {
            std::fs::write(
                path,
                "# edited elsewhere\nupstream shop_backend {\n    server 127.0.0.1:3001;\n}\n",
            )
            .unwrap();
        }),
    ));

    let attempt = h
        .orchestrator()
        .deploy(&h.artifact(), &CancelSignal::never())
        .await;

    assert_eq!(attempt.exit_code(), 6);
    match &attempt.outcome {
        Some(DeployOutcome::RolledBack { reason, active }) => {
            assert!(reason.contains("reads back primary"), "{reason}");
            assert_eq!(*active, Some(Slot::Primary));
        }
        other => panic!("expected RolledBack, got {other:?}"),
    }
    assert!(!attempt.visited(Phase::PostSwitchHealthCheck));
    assert_eq!(h.routing(), before);
    assert!(h.supervisor.is_up("shop-primary"));
    assert!(!h.supervisor.is_up("shop-secondary"));
}

#[tokio::test(start_paused = true)]
async fn unwritable_routing_during_revert_is_an_emergency() {
    let h = Harness::new();
    h.live_on(Slot::Primary);
    h.health.set(Slot::Secondary, Health::HealthyFor(1));
    // Once live, the path the revert stages through is blocked.
    let staging = h.dir.path().join("shop.conf.cutover-staging");
    *h.router.after_reload.lock().unwrap() = Some((
        1,
        Box::new(move || std::fs::create_dir(staging).unwrap()),
    ));

    let attempt = h
        .orchestrator()
        .deploy(&h.artifact(), &CancelSignal::never())
        .await;

    assert_eq!(attempt.exit_code(), 7);
    match &attempt.outcome {
        Some(DeployOutcome::RollbackFailed { reason }) => {
            assert!(reason.contains("failed to restore routing config"), "{reason}");
        }
        other => panic!("expected RollbackFailed, got {other:?}"),
    }
    // Traffic is still on the failed slot and no restore reload happened.
    assert_eq!(h.live_port(), Some(3002));
    assert_eq!(h.router.reloads.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn unparseable_routing_aborts_without_side_effects() {
    let h = Harness::new();
    std::fs::write(h.routing_path(), "upstream shop_backend { }").unwrap();
    let before = h.routing();

    let attempt = h
        .orchestrator()
        .deploy(&h.artifact(), &CancelSignal::never())
        .await;

    assert_eq!(attempt.exit_code(), 1);
    assert!(matches!(
        attempt.outcome,
        Some(DeployOutcome::DiscoveryFailed { .. })
    ));
    assert_eq!(h.routing(), before);
    assert!(h.supervisor.log().is_empty());
    assert!(!h.env(Slot::Primary).root.exists());
}

#[tokio::test(start_paused = true)]
async fn install_failure_leaves_active_serving() {
    let h = Harness::new();
    h.live_on(Slot::Primary);
    let artifact = h.artifact();
    std::fs::remove_file(artifact.path.join("env.template")).unwrap();
    let before = h.routing();

    let attempt = h
        .orchestrator()
        .deploy(&artifact, &CancelSignal::never())
        .await;

    assert_eq!(attempt.exit_code(), 2);
    assert_eq!(h.routing(), before);
    assert!(h.supervisor.is_up("shop-primary"));
    assert!(
        !h.supervisor
            .log()
            .iter()
            .any(|call| call.ends_with("shop-primary"))
    );
}

#[tokio::test(start_paused = true)]
async fn cancel_before_switch_leaves_slot_for_inspection() {
    let h = Harness::new();
    h.live_on(Slot::Primary);
    h.health.set(Slot::Secondary, Health::Never);
    let (handle, signal) = cancel_pair();
    *h.health.cancel_on.lock().unwrap() = Some((2, handle));
    let before = h.routing();

    let attempt = h.orchestrator().deploy(&h.artifact(), &signal).await;

    assert_eq!(attempt.exit_code(), 9);
    assert_eq!(
        attempt.outcome,
        Some(DeployOutcome::Cancelled {
            phase: Phase::PreSwitchHealthCheck
        })
    );
    assert_eq!(h.routing(), before);
    // Neither stopped nor rolled back.
    assert!(h.supervisor.is_up("shop-secondary"));
    assert!(h.supervisor.is_up("shop-primary"));
}

#[tokio::test(start_paused = true)]
async fn cancel_after_switch_rolls_back() {
    let h = Harness::new();
    h.live_on(Slot::Primary);
    let (handle, signal) = cancel_pair();
    *h.router.cancel_on_reload.lock().unwrap() = Some(handle);
    let before = h.routing();

    let attempt = h.orchestrator().deploy(&h.artifact(), &signal).await;

    assert_eq!(attempt.exit_code(), 6);
    assert_eq!(h.routing(), before);
    assert!(h.supervisor.is_up("shop-primary"));
    assert!(!h.supervisor.is_up("shop-secondary"));
    assert!(!attempt.visited(Phase::PostSwitchHealthCheck));
}

#[tokio::test(start_paused = true)]
async fn manual_rollback_returns_to_retained_slot() {
    let h = Harness::new();
    h.live_on(Slot::Secondary);
    h.installed(Slot::Primary);
    assert!(!h.supervisor.is_up("shop-primary"));

    let attempt = h.orchestrator().rollback(&CancelSignal::never()).await;

    assert_eq!(
        attempt.outcome,
        Some(DeployOutcome::Succeeded {
            active: Slot::Primary,
            retained: Some(Slot::Secondary)
        })
    );
    assert_eq!(h.live_port(), Some(3001));
    assert!(h.supervisor.is_up("shop-primary"));
    assert!(!h.supervisor.is_up("shop-secondary"));
    assert!(!attempt.visited(Phase::SmokeTesting));
    assert!(h.smoke.targets.lock().unwrap().is_empty());
    assert!(
        !h.supervisor
            .log()
            .iter()
            .any(|call| call.starts_with("configure"))
    );
}

#[tokio::test(start_paused = true)]
async fn manual_rollback_needs_a_live_slot() {
    let h = Harness::new();
    let attempt = h.orchestrator().rollback(&CancelSignal::never()).await;
    assert_eq!(attempt.exit_code(), 1);
    assert!(h.routing().is_none());
}

#[tokio::test(start_paused = true)]
async fn manual_rollback_to_unhealthy_slot_is_refused() {
    let h = Harness::new();
    h.live_on(Slot::Secondary);
    h.installed(Slot::Primary);
    h.health.set(Slot::Primary, Health::Never);
    let before = h.routing();

    let attempt = h.orchestrator().rollback(&CancelSignal::never()).await;

    assert_eq!(attempt.exit_code(), 3);
    assert_eq!(h.routing(), before);
    assert!(!h.supervisor.is_up("shop-primary"));
    assert!(h.supervisor.is_up("shop-secondary"));
}

#[tokio::test(start_paused = true)]
async fn status_reports_live_slot_and_processes() {
    let h = Harness::new();
    h.live_on(Slot::Primary);

    let status = h.orchestrator().status().await.unwrap();

    assert_eq!(status.active, Some(Slot::Primary));
    assert_eq!(status.retained(), Some(Slot::Secondary));
    let primary = &status.slots[0];
    assert!(primary.active && primary.running && primary.installed);
    let secondary = &status.slots[1];
    assert!(!secondary.active && !secondary.running && !secondary.installed);
}
