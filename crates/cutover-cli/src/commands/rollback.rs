use std::path::Path;

use cutover_rollout::outcome::EXIT_LOCK_HELD;
use cutover_rollout::{Dependencies, Orchestrator};

use super::{load_tier, lock_tier, parse_timeout};
use crate::signals;

pub async fn rollback(config: &Path, tier: &str, timeout: Option<&str>) -> anyhow::Result<i32> {
    let tier = load_tier(config, tier)?;
    let timeout = parse_timeout(timeout)?;
    let Some(_lock) = lock_tier(&tier)? else {
        return Ok(EXIT_LOCK_HELD);
    };

    let mut orchestrator = Orchestrator::new(&tier, Dependencies::for_tier(&tier))?;
    if let Some(timeout) = timeout {
        orchestrator = orchestrator.with_health_timeout(timeout);
    }

    let cancel = signals::install()?;
    let attempt = orchestrator.rollback(&cancel).await;

    println!("{}", attempt.summary());
    Ok(attempt.exit_code())
}
