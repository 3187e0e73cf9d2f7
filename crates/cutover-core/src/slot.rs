//! Deployment slots and the environments bound to them.
//!
//! There are exactly two slots. Which one is live is never stored here;
//! the routing registry derives it from the live routing configuration.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One of the two fixed deployment targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Primary,
    Secondary,
}

impl Slot {
    /// Both slots, primary first.
    pub const ALL: [Slot; 2] = [Slot::Primary, Slot::Secondary];

    /// The complementary slot.
    pub fn other(self) -> Slot {
        match self {
            Slot::Primary => Slot::Secondary,
            Slot::Secondary => Slot::Primary,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Slot::Primary => "primary",
            Slot::Secondary => "secondary",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A slot bound to its concrete listen port, filesystem root and
/// supervisor unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub slot: Slot,
    /// Host the slot's service listens on (usually loopback).
    pub host: String,
    pub port: u16,
    /// Directory the artifact is extracted into.
    pub root: PathBuf,
    /// Supervisor handle (systemd unit name without suffix).
    pub unit: String,
}

impl Environment {
    pub fn name(&self) -> &'static str {
        self.slot.as_str()
    }

    /// `host:port` of the slot's own listener.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Base URL for requests that must hit this slot directly, bypassing
    /// the router.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.address())
    }
}

/// Both environments of a tier, addressable by slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environments {
    primary: Environment,
    secondary: Environment,
}

impl Environments {
    pub fn new(primary: Environment, secondary: Environment) -> Self {
        debug_assert_eq!(primary.slot, Slot::Primary);
        debug_assert_eq!(secondary.slot, Slot::Secondary);
        Self { primary, secondary }
    }

    pub fn get(&self, slot: Slot) -> &Environment {
        match slot {
            Slot::Primary => &self.primary,
            Slot::Secondary => &self.secondary,
        }
    }

    /// The environment listening on `port`, if any.
    pub fn by_port(&self, port: u16) -> Option<&Environment> {
        Slot::ALL
            .iter()
            .map(|s| self.get(*s))
            .find(|env| env.port == port)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Environment> {
        [&self.primary, &self.secondary].into_iter()
    }
}
