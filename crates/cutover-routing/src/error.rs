//! Routing error types.

use std::path::PathBuf;

use thiserror::Error;

/// Why a routing file could not be understood.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("no `upstream {0}` block")]
    MissingUpstream(String),

    #[error("upstream `{upstream}` has {count} servers, expected exactly one")]
    ServerCount { upstream: String, count: usize },

    #[error("invalid server address `{0}`")]
    InvalidAddress(String),
}

/// Reading the live routing state failed. Fatal for a run.
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("routing config {} is unparseable: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("routing config {} points at port {port}, which belongs to no slot", path.display())]
    UnknownPort { path: PathBuf, port: u16 },

    #[error("failed to read routing config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type RoutingResult<T> = Result<T, RoutingError>;

/// The traffic switch did not take effect. The live routing file is
/// unchanged unless the variant says otherwise.
#[derive(Debug, Error)]
pub enum SwitchError {
    #[error("routing file I/O on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("rendered routing config is invalid: {0}")]
    Render(#[from] ParseError),

    #[error("rendered routing config targets port {found}, expected {expected}")]
    WrongTarget { expected: u16, found: u16 },

    #[error("router rejected staged config: {0}")]
    ValidationRejected(String),

    #[error("router reload failed ({0}); previous config restored")]
    ReloadRejected(String),

    /// The reload failed and so did putting the old file back. Traffic
    /// may be pointed at the new slot with no trusted routing state.
    #[error("router reload failed ({reload}) and restoring the previous config failed ({restore})")]
    RestoreFailed { reload: String, restore: String },
}

impl SwitchError {
    /// Whether the live routing state can no longer be trusted.
    pub fn is_unrecoverable(&self) -> bool {
        matches!(self, SwitchError::RestoreFailed { .. })
    }
}

/// Reverting a completed switch failed. Requires a human.
#[derive(Debug, Error)]
pub enum RollbackError {
    #[error("failed to restore routing config {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("router reload after restore failed: {0}")]
    Reload(String),
}
