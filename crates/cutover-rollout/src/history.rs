//! Append-only JSON-lines log of finished runs.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::attempt::DeploymentAttempt;

/// Append `attempt` as one JSON line, creating the file and its parent
/// directory if needed.
pub fn append(path: &Path, attempt: &DeploymentAttempt) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut line = serde_json::to_string(attempt).map_err(std::io::Error::other)?;
    line.push('\n');
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())
}
