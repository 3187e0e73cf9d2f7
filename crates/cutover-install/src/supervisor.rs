//! Process supervisor seam.
//!
//! A slot's service must keep running (and be restarted on crash) after
//! the orchestrator exits, so it is handed to the OS supervisor rather
//! than spawned as a child. Production uses systemd; tests substitute an
//! in-memory implementation.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::Duration;

use tracing::{debug, info};

use cutover_core::{CommandOutput, Environment, Invocation, SupervisorSettings};

use crate::error::SupervisorError;

/// Boxed future returned by [`Supervisor`] methods.
pub type SupervisorFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, SupervisorError>> + Send + 'a>>;

/// Controls a slot's long-running service.
pub trait Supervisor: Send + Sync {
    /// Register the slot's service with auto-restart, pointing at the
    /// start script and rendered environment file.
    fn configure<'a>(
        &'a self,
        env: &'a Environment,
        start_script: &'a Path,
        env_file: &'a Path,
    ) -> SupervisorFuture<'a, ()>;

    fn start<'a>(&'a self, env: &'a Environment) -> SupervisorFuture<'a, ()>;

    /// Stop the service and wait until it is down. Stopping a service
    /// that is not running succeeds.
    fn stop<'a>(&'a self, env: &'a Environment) -> SupervisorFuture<'a, ()>;

    fn is_running<'a>(&'a self, env: &'a Environment) -> SupervisorFuture<'a, bool>;
}

/// systemd-backed supervisor driving `systemctl`.
#[derive(Debug, Clone)]
pub struct SystemdSupervisor {
    service: String,
    unit_dir: PathBuf,
    systemctl: String,
    timeout: Duration,
}

impl SystemdSupervisor {
    pub fn new(service: &str, settings: &SupervisorSettings, timeout: Duration) -> Self {
        Self {
            service: service.to_string(),
            unit_dir: settings.unit_dir.clone(),
            systemctl: settings.systemctl.clone(),
            timeout,
        }
    }

    pub fn unit_path(&self, env: &Environment) -> PathBuf {
        self.unit_dir.join(format!("{}.service", env.unit))
    }

    /// Contents of the unit file for a slot.
    pub fn render_unit(&self, env: &Environment, start_script: &Path, env_file: &Path) -> String {
        format!(
            "\
[Unit]
Description={service} ({slot} slot)
After=network.target

[Service]
Type=simple
WorkingDirectory={root}
EnvironmentFile={env_file}
ExecStart={start}
Restart=always
RestartSec=5

[Install]
WantedBy=multi-user.target
",
            service = self.service,
            slot = env.slot,
            root = env.root.display(),
            env_file = env_file.display(),
            start = start_script.display(),
        )
    }

    async fn systemctl(
        &self,
        action: &'static str,
        args: &[&str],
    ) -> Result<CommandOutput, SupervisorError> {
        let argv = std::iter::once(self.systemctl.as_str())
            .chain(args.iter().copied())
            .map(str::to_string)
            .collect::<Vec<_>>();
        debug!(action, command = %argv.join(" "), "systemctl");
        Ok(Invocation::new(argv).timeout(self.timeout).run().await?)
    }

    async fn systemctl_ok(&self, action: &'static str, unit: &str) -> Result<(), SupervisorError> {
        let output = self.systemctl(action, &[action, unit]).await?;
        if output.success() {
            Ok(())
        } else {
            Err(SupervisorError::Failed {
                action,
                unit: unit.to_string(),
                reason: output.describe_failure(),
            })
        }
    }
}

impl Supervisor for SystemdSupervisor {
    fn configure<'a>(
        &'a self,
        env: &'a Environment,
        start_script: &'a Path,
        env_file: &'a Path,
    ) -> SupervisorFuture<'a, ()> {
        Box::pin(async move {
            let path = self.unit_path(env);
            let unit = self.render_unit(env, start_script, env_file);
            tokio::fs::write(&path, unit)
                .await
                .map_err(|source| SupervisorError::UnitFile {
                    path: path.clone(),
                    source,
                })?;

            let reload = self.systemctl("daemon-reload", &["daemon-reload"]).await?;
            if !reload.success() {
                return Err(SupervisorError::Failed {
                    action: "daemon-reload",
                    unit: env.unit.clone(),
                    reason: reload.describe_failure(),
                });
            }
            self.systemctl_ok("enable", &env.unit).await?;
            info!(slot = %env.slot, unit = %env.unit, path = %path.display(), "unit configured");
            Ok(())
        })
    }

    fn start<'a>(&'a self, env: &'a Environment) -> SupervisorFuture<'a, ()> {
        Box::pin(async move {
            self.systemctl_ok("start", &env.unit).await?;
            info!(slot = %env.slot, unit = %env.unit, "service started");
            Ok(())
        })
    }

    fn stop<'a>(&'a self, env: &'a Environment) -> SupervisorFuture<'a, ()> {
        Box::pin(async move {
            if !self.is_running(env).await? {
                debug!(slot = %env.slot, unit = %env.unit, "service already stopped");
                return Ok(());
            }
            // `systemctl stop` blocks until the unit is inactive.
            self.systemctl_ok("stop", &env.unit).await?;
            info!(slot = %env.slot, unit = %env.unit, "service stopped");
            Ok(())
        })
    }

    fn is_running<'a>(&'a self, env: &'a Environment) -> SupervisorFuture<'a, bool> {
        Box::pin(async move {
            let output = self
                .systemctl("is-active", &["is-active", "--quiet", &env.unit])
                .await?;
            Ok(output.success())
        })
    }
}
