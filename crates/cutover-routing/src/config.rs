//! Routing configuration format.
//!
//! The router reads an nginx-style upstream block naming exactly one
//! backend:
//!
//! ```text
//! upstream storefront_backend {
//!     server 127.0.0.1:3002;
//! }
//! ```
//!
//! Operators may supply their own template as long as the rendered file
//! still contains that block with a single `server` line.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use cutover_core::Environment;

use crate::error::ParseError;

static UPSTREAM_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\bupstream\s+([A-Za-z0-9_.\-]+)\s*\{([^}]*)\}").expect("upstream regex")
});

static SERVER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*server\s+([^\s;]+)[^;\n]*;").expect("server regex"));

const BUILTIN_TEMPLATE: &str = "\
# Managed by cutover; rewritten on every traffic switch.
# slot: {{SLOT}}
upstream {{UPSTREAM}} {
    server {{HOST}}:{{PORT}};
}
";

/// The single backend a routing file sends traffic to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingTarget {
    pub host: String,
    pub port: u16,
}

/// Extract the target of `upstream` from routing file contents.
pub fn parse_routing(contents: &str, upstream: &str) -> Result<RoutingTarget, ParseError> {
    let body = UPSTREAM_BLOCK
        .captures_iter(contents)
        .find(|caps| &caps[1] == upstream)
        .map(|caps| caps.get(2).map_or("", |m| m.as_str()).to_string())
        .ok_or_else(|| ParseError::MissingUpstream(upstream.to_string()))?;

    let servers: Vec<&str> = SERVER_LINE
        .captures_iter(&body)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect();

    let [server] = servers.as_slice() else {
        return Err(ParseError::ServerCount {
            upstream: upstream.to_string(),
            count: servers.len(),
        });
    };

    let (host, port) = server
        .rsplit_once(':')
        .ok_or_else(|| ParseError::InvalidAddress(server.to_string()))?;
    let port = port
        .parse::<u16>()
        .map_err(|_| ParseError::InvalidAddress(server.to_string()))?;
    if host.is_empty() {
        return Err(ParseError::InvalidAddress(server.to_string()));
    }

    Ok(RoutingTarget {
        host: host.to_string(),
        port,
    })
}

/// Renders the routing file for a given slot.
#[derive(Debug, Clone)]
pub struct RoutingTemplate {
    upstream: String,
    template: String,
}

impl RoutingTemplate {
    /// The built-in upstream block.
    pub fn builtin(upstream: &str) -> Self {
        Self {
            upstream: upstream.to_string(),
            template: BUILTIN_TEMPLATE.to_string(),
        }
    }

    /// An operator-supplied template with `{{UPSTREAM}}`, `{{HOST}}`,
    /// `{{PORT}}` and `{{SLOT}}` placeholders.
    pub fn custom(upstream: &str, template: impl Into<String>) -> Self {
        Self {
            upstream: upstream.to_string(),
            template: template.into(),
        }
    }

    /// Load from an optional template file, falling back to the built-in.
    pub fn load(upstream: &str, template: Option<&Path>) -> std::io::Result<Self> {
        match template {
            Some(path) => Ok(Self::custom(upstream, std::fs::read_to_string(path)?)),
            None => Ok(Self::builtin(upstream)),
        }
    }

    pub fn upstream(&self) -> &str {
        &self.upstream
    }

    pub fn render(&self, env: &Environment) -> String {
        self.template
            .replace("{{UPSTREAM}}", &self.upstream)
            .replace("{{HOST}}", &env.host)
            .replace("{{PORT}}", &env.port.to_string())
            .replace("{{SLOT}}", env.slot.as_str())
    }
}
