//! Smoke test gate: the operator's functional suite, run against the
//! candidate slot directly on its own port before it takes traffic.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use cutover_core::{Environment, Invocation, substitute};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SmokeOutcome {
    Pass,
    Fail { reason: String },
}

impl SmokeOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, SmokeOutcome::Pass)
    }
}

pub type SmokeFuture<'a> = Pin<Box<dyn Future<Output = SmokeOutcome> + Send + 'a>>;

/// Runs the smoke suite against a slot. Any failure to run the suite is
/// itself a failed outcome.
pub trait SmokeTests: Send + Sync {
    fn run<'a>(&'a self, env: &'a Environment) -> SmokeFuture<'a>;
}

/// Smoke suite launched as an external command.
///
/// Arguments may use `{slot}`, `{port}`, `{url}` and `{tier}`. The same
/// values are exported as `CUTOVER_TARGET_SLOT`, `CUTOVER_TARGET_PORT`,
/// `CUTOVER_TARGET_URL` and `CUTOVER_TIER`.
#[derive(Debug, Clone)]
pub struct CommandSmokeTests {
    command: Vec<String>,
    tier: String,
    working_dir: Option<PathBuf>,
    timeout: Duration,
}

impl CommandSmokeTests {
    pub fn new(
        command: Vec<String>,
        tier: &str,
        working_dir: Option<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            command,
            tier: tier.to_string(),
            working_dir,
            timeout,
        }
    }

    fn invocation(&self, env: &Environment) -> Invocation {
        let url = env.base_url();
        let port = env.port.to_string();
        let argv = substitute(
            &self.command,
            &[
                ("slot", env.name()),
                ("port", &port),
                ("url", &url),
                ("tier", &self.tier),
            ],
        );
        let mut invocation = Invocation::new(argv)
            .env("CUTOVER_TARGET_SLOT", env.name())
            .env("CUTOVER_TARGET_PORT", port)
            .env("CUTOVER_TARGET_URL", url)
            .env("CUTOVER_TIER", self.tier.clone())
            .timeout(self.timeout);
        if let Some(dir) = &self.working_dir {
            invocation = invocation.current_dir(dir);
        }
        invocation
    }
}

impl SmokeTests for CommandSmokeTests {
    fn run<'a>(&'a self, env: &'a Environment) -> SmokeFuture<'a> {
        Box::pin(async move {
            info!(slot = %env.slot, url = %env.base_url(), "running smoke tests");
            let outcome = match self.invocation(env).run().await {
                Ok(output) if output.success() => SmokeOutcome::Pass,
                Ok(output) => SmokeOutcome::Fail {
                    reason: output.describe_failure(),
                },
                Err(e) => SmokeOutcome::Fail {
                    reason: e.to_string(),
                },
            };
            match &outcome {
                SmokeOutcome::Pass => info!(slot = %env.slot, "smoke tests passed"),
                SmokeOutcome::Fail { reason } => {
                    warn!(slot = %env.slot, reason = %reason, "smoke tests failed")
                }
            }
            outcome
        })
    }
}
