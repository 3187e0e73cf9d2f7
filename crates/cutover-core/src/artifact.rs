//! The pre-built deployment artifact.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("unsupported artifact format: {} (expected .tar.gz, .tgz, .tar or a directory)", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("checksum mismatch for {}: expected {expected}, got {actual}", path.display())]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("checksum is only supported for archive artifacts: {}", .0.display())]
    ChecksumOnDirectory(PathBuf),

    #[error("failed to read artifact {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// How the artifact is laid out on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    TarGz,
    Tar,
    /// Already unpacked; copied as-is.
    Directory,
}

/// An immutable build handed to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentArtifact {
    pub path: PathBuf,
    /// Expected SHA-256 (hex) of the archive, if supplied.
    pub sha256: Option<String>,
}

impl DeploymentArtifact {
    pub fn new(path: impl Into<PathBuf>, sha256: Option<String>) -> Self {
        Self {
            path: path.into(),
            sha256: sha256.map(|s| s.trim().to_ascii_lowercase()),
        }
    }

    /// Classify the artifact by what is on disk.
    pub fn kind(&self) -> Result<ArtifactKind, ArtifactError> {
        if !self.path.exists() {
            return Err(ArtifactError::NotFound(self.path.clone()));
        }
        if self.path.is_dir() {
            return Ok(ArtifactKind::Directory);
        }
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Ok(ArtifactKind::TarGz)
        } else if name.ends_with(".tar") {
            Ok(ArtifactKind::Tar)
        } else {
            Err(ArtifactError::UnsupportedFormat(self.path.clone()))
        }
    }

    /// Verify the supplied checksum, if any.
    pub fn verify(&self) -> Result<ArtifactKind, ArtifactError> {
        let kind = self.kind()?;
        let Some(expected) = &self.sha256 else {
            return Ok(kind);
        };
        if kind == ArtifactKind::Directory {
            return Err(ArtifactError::ChecksumOnDirectory(self.path.clone()));
        }
        let actual = sha256_file(&self.path).map_err(|source| ArtifactError::Io {
            path: self.path.clone(),
            source,
        })?;
        if &actual != expected {
            return Err(ArtifactError::ChecksumMismatch {
                path: self.path.clone(),
                expected: expected.clone(),
                actual,
            });
        }
        Ok(kind)
    }
}

/// Compute the SHA-256 of a file and return the hex digest.
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}
