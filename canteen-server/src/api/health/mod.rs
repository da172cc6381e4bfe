//! Health Check API
//!
//! | Route | Auth | Payload |
//! |-------|------|---------|
//! | `GET /health` | none | liveness, status and version only |
//! | `GET /health/detailed` | none | storage and ledger checks, uptime |
//!
//! Both routes live outside `/api` so probes and load balancers can
//! reach them without a token.

use std::sync::OnceLock;
use std::time::{Instant, SystemTime};

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::core::ServerState;

/// Process start, recorded on the first health request
static START_TIME: OnceLock<SystemTime> = OnceLock::new();

fn get_uptime_seconds() -> u64 {
    let start = START_TIME.get_or_init(SystemTime::now);
    SystemTime::now()
        .duration_since(*start)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

pub fn router() -> Router<ServerState> {
    // Touch START_TIME at router build so uptime counts from boot,
    // not from the first probe.
    let _ = START_TIME.get_or_init(SystemTime::now);

    Router::new()
        .route("/health", get(health))
        .route("/health/detailed", get(detailed_health))
}

/// Liveness payload
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Readiness payload with per-dependency results
#[derive(Debug, Serialize)]
pub struct DetailedHealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub storage: CheckResult,
    pub ledger: CheckResult,
}

/// Outcome of a single dependency check
#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CheckResult {
    fn ok() -> Self {
        Self {
            status: "ok",
            latency_ms: None,
            message: None,
        }
    }

    fn ok_with_latency(latency_ms: u64) -> Self {
        Self {
            status: "ok",
            latency_ms: Some(latency_ms),
            message: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            latency_ms: None,
            message: Some(message.into()),
        }
    }
}

/// Liveness probe
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness probe: round-trips the database and inspects the ledger
pub async fn detailed_health(State(state): State<ServerState>) -> Json<DetailedHealthResponse> {
    let storage = check_storage(&state);
    let ledger = check_ledger(&state);

    let status = if storage.status == "ok" && ledger.status == "ok" {
        "healthy"
    } else {
        "degraded"
    };

    Json(DetailedHealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: get_uptime_seconds(),
        checks: HealthChecks { storage, ledger },
    })
}

/// Cheap read transaction, also reports its latency
fn check_storage(state: &ServerState) -> CheckResult {
    let started = Instant::now();
    match state.store.get_stats() {
        Ok(_) => CheckResult::ok_with_latency(started.elapsed().as_millis() as u64),
        Err(e) => CheckResult::error(e.to_string()),
    }
}

/// The ledger is in-process memory, so reachable means healthy. A meal
/// count below the hold count would mean restore ran out of order.
fn check_ledger(state: &ServerState) -> CheckResult {
    let meals = state.ledger.registered_meals();
    let holds = state.ledger.active_holds();
    if meals == 0 && holds > 0 {
        CheckResult::error(format!("{holds} holds with no registered meals"))
    } else {
        CheckResult::ok()
    }
}
