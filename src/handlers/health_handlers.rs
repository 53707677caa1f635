//! Health & readiness handlers.
//!
//! - GET /healthz  -> liveness ("ok"), no I/O
//! - GET /readyz   -> SQLite connectivity + storage directory round-trip

use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::SqlitePool;
use std::{collections::BTreeMap, path::Path};
use tokio::fs;
use uuid::Uuid;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: &'static str,
    checks: BTreeMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}

impl CheckStatus {
    fn from_result(result: Result<(), String>) -> Self {
        match result {
            Ok(()) => Self { ok: true, error: None },
            Err(error) => Self {
                ok: false,
                error: Some(error),
            },
        }
    }
}

/// `GET /healthz`
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

/// `GET /readyz`
///
/// 200 when every check passes, 503 otherwise. The body lists each check.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let mut checks = BTreeMap::new();
    checks.insert(
        "sqlite",
        CheckStatus::from_result(check_sqlite(&state.storage.db).await),
    );
    checks.insert(
        "storage",
        CheckStatus::from_result(check_storage_dir(&state.storage.base_path).await),
    );

    let ready = checks.values().all(|check| check.ok);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let body = ReadyResponse {
        status: if ready { "ok" } else { "error" },
        checks,
    };
    (status, Json(body))
}

async fn check_sqlite(db: &SqlitePool) -> Result<(), String> {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(db).await {
        Ok(1) => Ok(()),
        Ok(v) => Err(format!("unexpected result: {}", v)),
        Err(e) => Err(format!("error: {}", e)),
    }
}

/// Write, read back and remove a probe file under `base_path`.
async fn check_storage_dir(base_path: &Path) -> Result<(), String> {
    fs::create_dir_all(base_path)
        .await
        .map_err(|e| format!("could not create storage dir: {}", e))?;

    let probe = base_path.join(format!(".readyz-{}", Uuid::new_v4()));
    let outcome = async {
        fs::write(&probe, b"readyz")
            .await
            .map_err(|e| format!("could not write probe file: {}", e))?;
        let bytes = fs::read(&probe)
            .await
            .map_err(|e| format!("could not read probe file: {}", e))?;
        if bytes != b"readyz" {
            return Err("probe file content mismatch".to_string());
        }
        Ok(())
    }
    .await;

    if let Err(e) = fs::remove_file(&probe).await {
        tracing::debug!("could not remove probe file {}: {}", probe.display(), e);
    }
    outcome
}
