// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Health check response with individual component status.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Overall health status ("ok" or "degraded").
    pub status: String,
    /// Individual health checks and their results.
    pub checks: HealthChecks,
}

/// Individual health check results.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    /// Whether the service process is running.
    pub service: String,
    /// Profile database status.
    pub storage: String,
    /// JWKS (authentication keys) status.
    pub jwks: String,
    /// Number of signing keys currently cached.
    pub jwks_keys: usize,
}

/// Simple health check response for liveness probes.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

fn status_label(ok: bool, failure: &str) -> String {
    if ok { "ok" } else { failure }.to_string()
}

/// Signing keys are usable if cached, or if a fetch succeeds now.
async fn check_jwks(state: &AppState) -> bool {
    let resolver = state.verifier.resolver();
    resolver.is_cached() || resolver.warm().await
}

async fn check_storage(state: &AppState) -> bool {
    match state.profiles.health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Profile storage health check failed");
            false
        }
    }
}

/// Liveness probe handler.
///
/// Always returns 200 if the process is running.
/// Does not check dependencies - use readiness for that.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness probe handler.
///
/// Returns 200 only if signing keys and the profile store are available.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready", body = ReadyResponse),
        (status = 503, description = "Service is not ready", body = ReadyResponse)
    )
)]
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let jwks_ok = check_jwks(&state).await;
    let storage_ok = check_storage(&state).await;
    let all_ok = jwks_ok && storage_ok;
    let jwks_keys = state
        .verifier
        .resolver()
        .snapshot()
        .map_or(0, |set| set.len());

    let response = ReadyResponse {
        status: status_label(all_ok, "degraded"),
        checks: HealthChecks {
            service: "ok".to_string(),
            storage: status_label(storage_ok, "unavailable"),
            jwks: status_label(jwks_ok, "unavailable"),
            jwks_keys,
        },
    };

    let status = if all_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}
