//! cutover-health — health gating for deployment slots.
//!
//! A slot is healthy only when its base liveness endpoint answers 2xx and
//! every configured sub-check (memory, workers, database, ...) reports a
//! truthy field. Anything less, including an unreachable endpoint, counts
//! as "not yet healthy" and the prober keeps polling until its deadline.
//!
//! # Architecture
//!
//! ```text
//! HealthProber::wait_healthy(env, timeout, interval, cancel)
//!   └── loop every `interval` until healthy / deadline / cancel
//!       └── HealthSource::probe(env) → HealthReport
//!           └── HttpHealthSource
//!               ├── http_get(base path)   → liveness
//!               └── http_get(sub paths)   → field lookup per sub-check
//! ```

pub mod checker;
pub mod prober;

pub use checker::{
    CheckResult, HealthReport, HealthSource, HttpHealthSource, ProbeFuture, ProbeResult,
};
pub use prober::{HealthProber, ProbeOutcome};
