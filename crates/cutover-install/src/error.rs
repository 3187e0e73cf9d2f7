//! Installer and supervisor error types.

use std::path::PathBuf;

use thiserror::Error;

use cutover_core::{ArtifactError, CommandError};

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("`{action}` on unit {unit} failed: {reason}")]
    Failed {
        action: &'static str,
        unit: String,
        reason: String,
    },

    #[error("failed to write unit file {}: {source}", path.display())]
    UnitFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Installation into a slot failed. The active slot is never involved.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("artifact verification did not complete: {0}")]
    Verify(String),

    #[error("supervisor: {0}")]
    Supervisor(#[from] SupervisorError),

    #[error("failed to back up {} to {}: {source}", from.display(), to.display())]
    Backup {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to extract artifact: {0}")]
    Extract(String),

    #[error("artifact is missing {0}")]
    MissingFile(String),

    #[error("I/O on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type InstallResult<T> = Result<T, InstallError>;
