//! Point-in-time view of a tier's two slots.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use cutover_core::Slot;
use cutover_install::Supervisor;
use cutover_routing::EnvironmentRegistry;

use crate::error::RolloutResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotStatus {
    pub slot: Slot,
    pub port: u16,
    pub root: PathBuf,
    pub installed: bool,
    pub running: bool,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierStatus {
    pub tier: String,
    pub active: Option<Slot>,
    pub slots: Vec<SlotStatus>,
}

impl TierStatus {
    /// The slot a manual rollback would switch to.
    pub fn retained(&self) -> Option<Slot> {
        self.active.map(Slot::other)
    }
}

impl fmt::Display for TierStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.active {
            Some(active) => writeln!(f, "tier {}: {active} is live", self.tier)?,
            None => writeln!(f, "tier {}: no slot is live (never deployed)", self.tier)?,
        }
        for slot in &self.slots {
            writeln!(
                f,
                "  {:<9} port {:<5} {:<7} {:<9} {}",
                slot.slot.as_str(),
                slot.port,
                if slot.running { "running" } else { "stopped" },
                if slot.active { "active" } else { "inactive" },
                if slot.installed {
                    slot.root.display().to_string()
                } else {
                    format!("{} (empty)", slot.root.display())
                },
            )?;
        }
        Ok(())
    }
}

/// Read the live slot from routing and ask the supervisor about each slot.
pub async fn tier_status(
    tier: &str,
    registry: &EnvironmentRegistry,
    supervisor: &dyn Supervisor,
) -> RolloutResult<TierStatus> {
    let active = registry.active()?.map(|env| env.slot);
    let mut slots = Vec::with_capacity(2);
    for env in registry.environments().iter() {
        slots.push(SlotStatus {
            slot: env.slot,
            port: env.port,
            root: env.root.clone(),
            installed: env.root.is_dir(),
            running: supervisor.is_running(env).await?,
            active: active == Some(env.slot),
        });
    }
    Ok(TierStatus {
        tier: tier.to_string(),
        active,
        slots,
    })
}
