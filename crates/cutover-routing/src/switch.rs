//! Traffic switch controller.
//!
//! The only component that moves live traffic. A switch:
//!
//! 1. renders the new routing file into a staging path next to the live one
//! 2. parses it back and has the router validate it
//! 3. keeps a copy of the current live file for rollback
//! 4. renames the staged file over the live one (atomic on one filesystem)
//! 5. reloads the router
//!
//! If the reload is rejected the previous file is put back and the router
//! reloaded again, so a failed switch leaves routing as it was. `revert`
//! restores the exact pre-switch bytes (or removes the file when there
//! was none).

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};

use cutover_core::{Environment, Slot};

use crate::config::{RoutingTemplate, parse_routing};
use crate::error::{RollbackError, SwitchError};
use crate::router::RouterControl;

/// What a completed switch changed, kept for the rollback manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchReceipt {
    pub target: Slot,
    /// Live routing file contents before the switch; `None` on bootstrap.
    pub previous: Option<Vec<u8>>,
    /// On-disk copy of `previous`, retained for operators.
    pub backup_path: Option<PathBuf>,
}

pub struct TrafficSwitch {
    config_path: PathBuf,
    template: RoutingTemplate,
    router: Arc<dyn RouterControl>,
}

impl TrafficSwitch {
    pub fn new(
        config_path: impl Into<PathBuf>,
        template: RoutingTemplate,
        router: Arc<dyn RouterControl>,
    ) -> Self {
        Self {
            config_path: config_path.into(),
            template,
            router,
        }
    }

    fn staging_path(&self) -> PathBuf {
        sibling(&self.config_path, "cutover-staging")
    }

    fn backup_path(&self) -> PathBuf {
        sibling(&self.config_path, "cutover-previous")
    }

    /// Point all new connections at `env`.
    pub async fn switch_to(&self, env: &Environment) -> Result<SwitchReceipt, SwitchError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| SwitchError::Io { path, source }
        };

        let previous = read_optional(&self.config_path)
            .await
            .map_err(io_err(&self.config_path))?;

        // Stage and validate before touching the live path.
        let rendered = self.template.render(env);
        let target = parse_routing(&rendered, self.template.upstream())?;
        if target.port != env.port {
            return Err(SwitchError::WrongTarget {
                expected: env.port,
                found: target.port,
            });
        }

        let staging = self.staging_path();
        write_synced(&staging, rendered.as_bytes())
            .await
            .map_err(io_err(&staging))?;

        if let Err(reason) = self.router.validate(&staging).await {
            let _ = tokio::fs::remove_file(&staging).await;
            warn!(slot = %env.slot, %reason, "router rejected staged config");
            return Err(SwitchError::ValidationRejected(reason));
        }

        let backup_path = match &previous {
            Some(bytes) => {
                let backup = self.backup_path();
                write_synced(&backup, bytes)
                    .await
                    .map_err(io_err(&backup))?;
                Some(backup)
            }
            None => None,
        };

        tokio::fs::rename(&staging, &self.config_path)
            .await
            .map_err(io_err(&self.config_path))?;

        if let Err(reload) = self.router.reload().await {
            warn!(slot = %env.slot, %reload, "router reload failed; restoring previous config");
            return match self.restore(previous.as_deref()).await {
                Ok(()) => Err(SwitchError::ReloadRejected(reload)),
                Err(restore) => {
                    error!(%reload, %restore, "could not restore routing config");
                    Err(SwitchError::RestoreFailed {
                        reload,
                        restore: restore.to_string(),
                    })
                }
            };
        }

        info!(
            slot = %env.slot,
            port = env.port,
            path = %self.config_path.display(),
            "traffic switched"
        );

        Ok(SwitchReceipt {
            target: env.slot,
            previous,
            backup_path,
        })
    }

    /// Undo a completed switch.
    pub async fn revert(&self, receipt: &SwitchReceipt) -> Result<(), RollbackError> {
        warn!(
            from = %receipt.target,
            path = %self.config_path.display(),
            "reverting traffic switch"
        );
        self.restore(receipt.previous.as_deref()).await?;
        info!("routing config restored");
        Ok(())
    }

    /// Write `previous` back (or remove the live file) and reload.
    async fn restore(&self, previous: Option<&[u8]>) -> Result<(), RollbackError> {
        let write_err = |source| RollbackError::Write {
            path: self.config_path.clone(),
            source,
        };

        match previous {
            Some(bytes) => {
                let staging = self.staging_path();
                write_synced(&staging, bytes).await.map_err(write_err)?;
                tokio::fs::rename(&staging, &self.config_path)
                    .await
                    .map_err(write_err)?;
            }
            None => match tokio::fs::remove_file(&self.config_path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(write_err(e)),
            },
        }

        self.router.reload().await.map_err(RollbackError::Reload)
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

async fn read_optional(path: &Path) -> std::io::Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

async fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}
