//! `cutover.toml` configuration parser.
//!
//! One file describes every tier (production, staging, ...) the host can
//! deploy. Each tier names its two slots, the routing file, the health
//! contract, the smoke suite and the supervisor.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::duration::parse_duration;
use crate::slot::{Environment, Environments, Slot};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("unknown tier `{0}`")]
    UnknownTier(String),

    #[error("tier `{tier}`: {reason}")]
    Invalid { tier: String, reason: String },

    #[error("tier `{tier}`: invalid duration for {field}: {value:?}")]
    InvalidDuration {
        tier: String,
        field: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CutoverConfig {
    pub tiers: BTreeMap<String, TierConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierConfig {
    /// Service name, used for templating and log context.
    pub service: String,
    /// Lock file guarding one orchestrator per tier.
    pub lock_file: PathBuf,
    /// Optional JSON-lines log of finished deployment attempts.
    pub history_file: Option<PathBuf>,
    /// Delay between the traffic switch and the post-switch health gate.
    #[serde(default = "default_settle_delay")]
    pub settle_delay: String,
    pub routing: RoutingSettings,
    pub slots: SlotsConfig,
    #[serde(default)]
    pub health: HealthSettings,
    pub smoke: SmokeSettings,
    #[serde(default)]
    pub supervisor: SupervisorSettings,
    #[serde(default)]
    pub install: InstallSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingSettings {
    /// Live routing configuration read by the router.
    pub config_path: PathBuf,
    /// Upstream block name inside the routing configuration.
    pub upstream: String,
    /// Address the router forwards to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Optional template replacing the built-in upstream block.
    pub template: Option<PathBuf>,
    /// Router syntax check; `{config}` is replaced by the staged file.
    pub validate_command: Option<Vec<String>>,
    /// Router reload (not restart).
    pub reload_command: Vec<String>,
    #[serde(default = "default_command_timeout")]
    pub command_timeout: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotsConfig {
    pub primary: SlotConfig,
    pub secondary: SlotConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotConfig {
    pub port: u16,
    pub root: PathBuf,
    pub unit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSettings {
    /// Base liveness path.
    #[serde(default = "default_health_path")]
    pub path: String,
    #[serde(default = "default_health_timeout")]
    pub timeout: String,
    #[serde(default = "default_health_interval")]
    pub interval: String,
    /// Per-request timeout for a single probe.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: String,
    #[serde(default = "default_sub_checks")]
    pub checks: Vec<SubCheckConfig>,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            path: default_health_path(),
            timeout: default_health_timeout(),
            interval: default_health_interval(),
            request_timeout: default_request_timeout(),
            checks: default_sub_checks(),
        }
    }
}

/// A named sub-resource of the health endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubCheckConfig {
    pub name: String,
    pub path: String,
    /// JSON pointer (`/status/ok`) or top-level field name of the boolean.
    pub field: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmokeSettings {
    /// Suite entry point; `{slot}`, `{port}`, `{url}` are substituted.
    pub command: Vec<String>,
    #[serde(default = "default_smoke_timeout")]
    pub timeout: String,
    pub working_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorSettings {
    #[serde(default = "default_unit_dir")]
    pub unit_dir: PathBuf,
    #[serde(default = "default_systemctl")]
    pub systemctl: String,
    #[serde(default = "default_command_timeout")]
    pub command_timeout: String,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            unit_dir: default_unit_dir(),
            systemctl: default_systemctl(),
            command_timeout: default_command_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallSettings {
    /// Start script the artifact must contain.
    #[serde(default = "default_start_script")]
    pub start_script: String,
    /// Environment template the artifact must contain.
    #[serde(default = "default_env_template")]
    pub env_template: String,
    /// Rendered environment file written next to the template.
    #[serde(default = "default_env_file")]
    pub env_file: String,
    #[serde(default = "default_extract_timeout")]
    pub extract_timeout: String,
}

impl Default for InstallSettings {
    fn default() -> Self {
        Self {
            start_script: default_start_script(),
            env_template: default_env_template(),
            env_file: default_env_file(),
            extract_timeout: default_extract_timeout(),
        }
    }
}

fn default_settle_delay() -> String {
    "5s".to_string()
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_command_timeout() -> String {
    "60s".to_string()
}
fn default_health_path() -> String {
    "/health".to_string()
}
fn default_health_timeout() -> String {
    "300s".to_string()
}
fn default_health_interval() -> String {
    "10s".to_string()
}
fn default_request_timeout() -> String {
    "5s".to_string()
}
fn default_sub_checks() -> Vec<SubCheckConfig> {
    vec![
        SubCheckConfig {
            name: "memory".to_string(),
            path: "/health/memory".to_string(),
            field: "healthy".to_string(),
        },
        SubCheckConfig {
            name: "workers".to_string(),
            path: "/health/workers".to_string(),
            field: "healthy".to_string(),
        },
        SubCheckConfig {
            name: "database".to_string(),
            path: "/health/database".to_string(),
            field: "connected".to_string(),
        },
    ]
}
fn default_smoke_timeout() -> String {
    "600s".to_string()
}
fn default_unit_dir() -> PathBuf {
    PathBuf::from("/etc/systemd/system")
}
fn default_systemctl() -> String {
    "systemctl".to_string()
}
fn default_start_script() -> String {
    "start.sh".to_string()
}
fn default_env_template() -> String {
    "env.template".to_string()
}
fn default_env_file() -> String {
    ".env".to_string()
}
fn default_extract_timeout() -> String {
    "300s".to_string()
}

impl CutoverConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: CutoverConfig =
            toml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        for (name, tier) in &config.tiers {
            tier.validate(name)?;
        }
        Ok(config)
    }

    /// Look up and resolve a tier by name.
    pub fn tier(&self, name: &str) -> Result<ResolvedTier, ConfigError> {
        let tier = self
            .tiers
            .get(name)
            .ok_or_else(|| ConfigError::UnknownTier(name.to_string()))?;
        tier.resolve(name)
    }
}

impl TierConfig {
    /// Reject configurations that would break the two-slot invariants.
    pub fn validate(&self, name: &str) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::Invalid {
            tier: name.to_string(),
            reason: reason.to_string(),
        };

        let (p, s) = (&self.slots.primary, &self.slots.secondary);
        if p.port == s.port {
            return Err(invalid("primary and secondary slots share a port"));
        }
        if p.root == s.root {
            return Err(invalid("primary and secondary slots share a root"));
        }
        if p.unit == s.unit {
            return Err(invalid("primary and secondary slots share a unit"));
        }
        if self.routing.reload_command.is_empty() {
            return Err(invalid("routing.reload_command is empty"));
        }
        if matches!(&self.routing.validate_command, Some(cmd) if cmd.is_empty()) {
            return Err(invalid("routing.validate_command is empty"));
        }
        if self.smoke.command.is_empty() {
            return Err(invalid("smoke.command is empty"));
        }
        if self.routing.upstream.trim().is_empty() {
            return Err(invalid("routing.upstream is empty"));
        }

        // Resolving parses every duration.
        self.resolve(name).map(|_| ())
    }

    /// Parse durations and bind slots to environments.
    pub fn resolve(&self, name: &str) -> Result<ResolvedTier, ConfigError> {
        let dur = |field: &'static str, value: &str| {
            parse_duration(value).ok_or_else(|| ConfigError::InvalidDuration {
                tier: name.to_string(),
                field,
                value: value.to_string(),
            })
        };

        let env = |slot: Slot, cfg: &SlotConfig| Environment {
            slot,
            host: self.routing.host.clone(),
            port: cfg.port,
            root: cfg.root.clone(),
            unit: cfg.unit.clone(),
        };

        Ok(ResolvedTier {
            name: name.to_string(),
            environments: Environments::new(
                env(Slot::Primary, &self.slots.primary),
                env(Slot::Secondary, &self.slots.secondary),
            ),
            settle_delay: dur("settle_delay", &self.settle_delay)?,
            routing_command_timeout: dur("routing.command_timeout", &self.routing.command_timeout)?,
            health_timeout: dur("health.timeout", &self.health.timeout)?,
            health_interval: dur("health.interval", &self.health.interval)?,
            health_request_timeout: dur("health.request_timeout", &self.health.request_timeout)?,
            smoke_timeout: dur("smoke.timeout", &self.smoke.timeout)?,
            supervisor_command_timeout: dur(
                "supervisor.command_timeout",
                &self.supervisor.command_timeout,
            )?,
            extract_timeout: dur("install.extract_timeout", &self.install.extract_timeout)?,
            config: self.clone(),
        })
    }
}

/// A tier with durations parsed and environments bound.
#[derive(Debug, Clone)]
pub struct ResolvedTier {
    pub name: String,
    pub environments: Environments,
    pub settle_delay: Duration,
    pub routing_command_timeout: Duration,
    pub health_timeout: Duration,
    pub health_interval: Duration,
    pub health_request_timeout: Duration,
    pub smoke_timeout: Duration,
    pub supervisor_command_timeout: Duration,
    pub extract_timeout: Duration,
    pub config: TierConfig,
}
