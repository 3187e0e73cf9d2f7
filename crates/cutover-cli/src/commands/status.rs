use std::path::Path;

use anyhow::bail;

use cutover_rollout::outcome::EXIT_SUCCESS;
use cutover_rollout::{Dependencies, Orchestrator};

use super::load_tier;

pub async fn status(config: &Path, tier: &str, format: &str) -> anyhow::Result<i32> {
    let tier = load_tier(config, tier)?;
    let orchestrator = Orchestrator::new(&tier, Dependencies::for_tier(&tier))?;
    let status = orchestrator.status().await?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&status)?),
        "text" => print!("{status}"),
        other => bail!("unknown format {other:?} (expected text or json)"),
    }
    Ok(EXIT_SUCCESS)
}
