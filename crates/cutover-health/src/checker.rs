//! Health probe logic.
//!
//! Performs HTTP requests against a slot's own listener (never through
//! the router) and folds the liveness and sub-check answers into a
//! [`HealthReport`].

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::BodyExt;
use serde::Serialize;
use tracing::debug;

use cutover_core::{Environment, SubCheckConfig};

/// Result of a single health probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeResult {
    /// Endpoint answered and reported healthy.
    Healthy,
    /// Endpoint answered but reported unhealthy (non-2xx or falsy field).
    Unhealthy,
    /// The probe could not be executed (connection error, timeout, bad body).
    Failed,
}

/// Outcome of one named check within a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub result: ProbeResult,
    pub detail: Option<String>,
}

impl CheckResult {
    pub fn healthy(name: &str) -> Self {
        Self {
            name: name.to_string(),
            result: ProbeResult::Healthy,
            detail: None,
        }
    }

    pub fn unhealthy(name: &str, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            result: ProbeResult::Unhealthy,
            detail: Some(detail.into()),
        }
    }

    pub fn failed(name: &str, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            result: ProbeResult::Failed,
            detail: Some(detail.into()),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.result == ProbeResult::Healthy
    }
}

/// Composite health of one slot at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub liveness: CheckResult,
    /// Empty when liveness failed; sub-checks are not queried then.
    pub sub_checks: Vec<CheckResult>,
    /// Number of sub-checks the report is expected to carry.
    pub expected_sub_checks: usize,
}

impl HealthReport {
    /// Healthy only if liveness and every expected sub-check passed.
    pub fn is_healthy(&self) -> bool {
        self.liveness.is_healthy()
            && self.sub_checks.len() == self.expected_sub_checks
            && self.sub_checks.iter().all(CheckResult::is_healthy)
    }

    /// Human-readable list of what is still failing.
    pub fn failing(&self) -> Vec<String> {
        if !self.liveness.is_healthy() {
            return vec![describe(&self.liveness)];
        }
        self.sub_checks
            .iter()
            .filter(|c| !c.is_healthy())
            .map(describe)
            .collect()
    }
}

fn describe(check: &CheckResult) -> String {
    match &check.detail {
        Some(detail) => format!("{}: {detail}", check.name),
        None => check.name.clone(),
    }
}

/// Boxed future returned by [`HealthSource::probe`].
pub type ProbeFuture<'a> = Pin<Box<dyn Future<Output = HealthReport> + Send + 'a>>;

/// Where health reports come from.
pub trait HealthSource: Send + Sync {
    /// Take one composite health reading of `env`. Never errors; an
    /// unreachable endpoint is reported as a failed liveness check.
    fn probe<'a>(&'a self, env: &'a Environment) -> ProbeFuture<'a>;
}

/// Probes the slot's HTTP health endpoints.
#[derive(Debug, Clone)]
pub struct HttpHealthSource {
    base_path: String,
    checks: Vec<SubCheckConfig>,
    request_timeout: Duration,
}

impl HttpHealthSource {
    pub fn new(base_path: &str, checks: Vec<SubCheckConfig>, request_timeout: Duration) -> Self {
        Self {
            base_path: base_path.to_string(),
            checks,
            request_timeout,
        }
    }

    async fn probe_env(&self, env: &Environment) -> HealthReport {
        let address = env.address();
        let liveness = match http_get(&address, &self.base_path, self.request_timeout).await {
            Ok(resp) if resp.is_success() => CheckResult::healthy("liveness"),
            Ok(resp) => CheckResult::unhealthy("liveness", format!("status {}", resp.status)),
            Err(e) => CheckResult::failed("liveness", e),
        };

        if !liveness.is_healthy() {
            return HealthReport {
                liveness,
                sub_checks: Vec::new(),
                expected_sub_checks: self.checks.len(),
            };
        }

        let mut sub_checks = Vec::with_capacity(self.checks.len());
        for check in &self.checks {
            sub_checks.push(self.run_sub_check(&address, check).await);
        }

        HealthReport {
            liveness,
            sub_checks,
            expected_sub_checks: self.checks.len(),
        }
    }

    async fn run_sub_check(&self, address: &str, check: &SubCheckConfig) -> CheckResult {
        let resp = match http_get(address, &check.path, self.request_timeout).await {
            Ok(resp) => resp,
            Err(e) => return CheckResult::failed(&check.name, e),
        };
        if !resp.is_success() {
            return CheckResult::unhealthy(&check.name, format!("status {}", resp.status));
        }
        let body: serde_json::Value = match serde_json::from_slice(&resp.body) {
            Ok(v) => v,
            Err(e) => return CheckResult::failed(&check.name, format!("invalid JSON: {e}")),
        };
        match lookup_field(&body, &check.field) {
            Some(v) if is_truthy(v) => CheckResult::healthy(&check.name),
            Some(v) => CheckResult::unhealthy(&check.name, format!("{} = {v}", check.field)),
            None => CheckResult::unhealthy(&check.name, format!("missing field {}", check.field)),
        }
    }
}

impl HealthSource for HttpHealthSource {
    fn probe<'a>(&'a self, env: &'a Environment) -> ProbeFuture<'a> {
        Box::pin(self.probe_env(env))
    }
}

/// Resolve `field` as a JSON pointer when it starts with `/`, otherwise
/// as a top-level key.
fn lookup_field<'v>(body: &'v serde_json::Value, field: &str) -> Option<&'v serde_json::Value> {
    if field.starts_with('/') {
        body.pointer(field)
    } else {
        body.get(field)
    }
}

/// Boolean-equivalent interpretation of a sub-check field.
fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        serde_json::Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "ok" | "up" | "pass" | "healthy" | "connected" | "yes"
        ),
        _ => false,
    }
}

/// Minimal response captured by [`http_get`].
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Perform a GET against `address` with an overall deadline.
///
/// Any transport problem (connect, handshake, timeout, body read) is
/// returned as an error string for the report.
pub async fn http_get(address: &str, path: &str, timeout: Duration) -> Result<HttpResponse, String> {
    let uri = format!("http://{address}{path}");

    let result = tokio::time::timeout(timeout, async {
        let stream = tokio::net::TcpStream::connect(address)
            .await
            .map_err(|e| format!("connect failed: {e}"))?;

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| format!("handshake failed: {e}"))?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            let _ = conn.await;
        });

        let req = http::Request::builder()
            .method("GET")
            .uri(path)
            .header("host", address)
            .header("user-agent", "cutover-health/0.1")
            .header("accept", "application/json")
            .body(http_body_util::Empty::<Bytes>::new())
            .map_err(|e| format!("invalid request: {e}"))?;

        let resp = sender
            .send_request(req)
            .await
            .map_err(|e| format!("request failed: {e}"))?;
        let status = resp.status().as_u16();
        let body = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| format!("body read failed: {e}"))?
            .to_bytes();

        Ok::<_, String>(HttpResponse { status, body })
    })
    .await;

    match result {
        Ok(Ok(resp)) => Ok(resp),
        Ok(Err(e)) => {
            debug!(error = %e, %uri, "health request failed");
            Err(e)
        }
        Err(_) => {
            debug!(%uri, "health request timed out");
            Err(format!("timed out after {timeout:?}"))
        }
    }
}
