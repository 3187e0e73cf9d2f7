//! Environment registry: which slot is live, derived from the router's
//! own configuration file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use cutover_core::{Environment, Environments, Slot};

use crate::config::parse_routing;
use crate::error::{RoutingError, RoutingResult};

#[derive(Debug, Clone)]
pub struct EnvironmentRegistry {
    config_path: PathBuf,
    upstream: String,
    environments: Environments,
}

impl EnvironmentRegistry {
    pub fn new(config_path: impl Into<PathBuf>, upstream: &str, environments: Environments) -> Self {
        Self {
            config_path: config_path.into(),
            upstream: upstream.to_string(),
            environments,
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn environments(&self) -> &Environments {
        &self.environments
    }

    /// The slot currently receiving traffic, or `None` before the first
    /// deployment (no routing file yet).
    pub fn active(&self) -> RoutingResult<Option<Environment>> {
        let contents = match std::fs::read_to_string(&self.config_path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.config_path.display(), "no routing config; bootstrap");
                return Ok(None);
            }
            Err(source) => {
                return Err(RoutingError::Io {
                    path: self.config_path.clone(),
                    source,
                });
            }
        };

        let target =
            parse_routing(&contents, &self.upstream).map_err(|source| RoutingError::ConfigRead {
                path: self.config_path.clone(),
                source,
            })?;

        let env = self
            .environments
            .by_port(target.port)
            .ok_or_else(|| RoutingError::UnknownPort {
                path: self.config_path.clone(),
                port: target.port,
            })?;

        Ok(Some(env.clone()))
    }

    /// The slot to deploy into: the complement of the active slot, or
    /// primary when nothing is active yet.
    pub fn inactive(&self) -> RoutingResult<Environment> {
        let slot = match self.active()? {
            Some(active) => active.slot.other(),
            None => Slot::Primary,
        };
        Ok(self.environments.get(slot).clone())
    }
}
