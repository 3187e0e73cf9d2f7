pub mod deploy;
pub mod rollback;
pub mod status;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, anyhow};
use tracing::error;

use cutover_core::{CutoverConfig, LockError, ResolvedTier, RunLock, parse_duration};

pub fn load_tier(config: &Path, tier: &str) -> anyhow::Result<ResolvedTier> {
    let config = CutoverConfig::from_file(config)?;
    Ok(config.tier(tier)?)
}

/// Take the tier's run lock. `None` means another run holds it.
pub fn lock_tier(tier: &ResolvedTier) -> anyhow::Result<Option<RunLock>> {
    match RunLock::acquire(&tier.config.lock_file) {
        Ok(lock) => Ok(Some(lock)),
        Err(LockError::Held { path }) => {
            error!(tier = %tier.name, lock = %path.display(), "another cutover run is in progress");
            eprintln!(
                "another cutover run holds {} for tier {}",
                path.display(),
                tier.name
            );
            Ok(None)
        }
        Err(e) => Err(e).context("acquiring run lock"),
    }
}

pub fn parse_timeout(value: Option<&str>) -> anyhow::Result<Option<Duration>> {
    value
        .map(|v| parse_duration(v).ok_or_else(|| anyhow!("invalid --timeout {v:?} (try \"300s\" or \"5m\")")))
        .transpose()
}
