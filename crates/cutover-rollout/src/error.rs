//! Errors for operations outside a deployment run.
//!
//! A run itself never returns an error: every failure is folded into its
//! [`DeployOutcome`](crate::DeployOutcome).

use std::path::PathBuf;

use thiserror::Error;

use cutover_install::SupervisorError;
use cutover_routing::RoutingError;

#[derive(Debug, Error)]
pub enum RolloutError {
    #[error("failed to load routing template {}: {source}", path.display())]
    Template {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error("supervisor: {0}")]
    Supervisor(#[from] SupervisorError),
}

pub type RolloutResult<T> = Result<T, RolloutError>;
