//! Rollback manager: undo a completed traffic switch.

use std::sync::Arc;

use tracing::{error, info, warn};

use cutover_core::Environment;
use cutover_install::Supervisor;
use cutover_routing::{RollbackError, SwitchReceipt, TrafficSwitch};

pub struct RollbackManager {
    switch: Arc<TrafficSwitch>,
    supervisor: Arc<dyn Supervisor>,
}

impl RollbackManager {
    pub fn new(switch: Arc<TrafficSwitch>, supervisor: Arc<dyn Supervisor>) -> Self {
        Self { switch, supervisor }
    }

    /// Restore the pre-switch routing config, then stop the slot that
    /// failed.
    ///
    /// Only restoring routing can fail the rollback. The previous slot was
    /// never stopped during the run; if it is found down it is started
    /// again, and problems with either service are logged, not returned.
    pub async fn roll_back(
        &self,
        receipt: &SwitchReceipt,
        failed: &Environment,
        restore_to: Option<&Environment>,
    ) -> Result<(), RollbackError> {
        warn!(
            failed = %failed.slot,
            restore_to = %restore_to.map_or("none", |e| e.name()),
            "rolling back traffic switch"
        );

        if let Err(e) = self.switch.revert(receipt).await {
            error!(error = %e, "rollback failed; routing state cannot be trusted");
            return Err(e);
        }

        if let Some(previous) = restore_to {
            match self.supervisor.is_running(previous).await {
                Ok(true) => {}
                Ok(false) => {
                    warn!(slot = %previous.slot, "previous slot is not running; starting it");
                    if let Err(e) = self.supervisor.start(previous).await {
                        error!(slot = %previous.slot, error = %e, "failed to start previous slot");
                    }
                }
                Err(e) => warn!(slot = %previous.slot, error = %e, "could not query previous slot"),
            }
        }

        if let Err(e) = self.supervisor.stop(failed).await {
            warn!(slot = %failed.slot, error = %e, "failed to stop rolled-back slot");
        }

        info!(failed = %failed.slot, "rollback complete");
        Ok(())
    }
}
