use std::path::{Path, PathBuf};

use cutover_core::DeploymentArtifact;
use cutover_rollout::outcome::EXIT_LOCK_HELD;
use cutover_rollout::{Dependencies, Orchestrator};

use super::{load_tier, lock_tier, parse_timeout};
use crate::signals;

pub async fn deploy(
    config: &Path,
    tier: &str,
    artifact: PathBuf,
    timeout: Option<&str>,
    sha256: Option<String>,
) -> anyhow::Result<i32> {
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
    let artifact = DeploymentArtifact::new(artifact, sha256);
    let attempt = orchestrator.deploy(&artifact, &cancel).await;

    println!("{}", attempt.summary());
    Ok(attempt.exit_code())
}
