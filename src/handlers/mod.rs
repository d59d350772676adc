pub mod biaya;
pub mod payment;
pub mod students;

use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct DbPoolStats {
    pub active_connections: u32,
    pub idle_connections: u32,
    pub max_connections: u32,
    pub usage_percent: f32,
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub db: String,
    pub db_pool: Option<DbPoolStats>,
    pub gateway_circuit: String,
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let (db_status, pool_stats) = match &state.db {
        Some(pool) => {
            let db_status = match sqlx::query("SELECT 1").execute(pool).await {
                Ok(_) => "connected",
                Err(_) => "disconnected",
            };

            let active_connections = pool.size();
            let max_connections = pool.options().get_max_connections();
            let stats = DbPoolStats {
                active_connections,
                idle_connections: pool.num_idle() as u32,
                max_connections,
                usage_percent: (active_connections as f32 / max_connections as f32) * 100.0,
            };
            (db_status, Some(stats))
        }
        None => ("in_memory", None),
    };

    let healthy = db_status != "disconnected";
    let health_response = HealthStatus {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        db: db_status.to_string(),
        db_pool: pool_stats,
        gateway_circuit: state.gateway.circuit_state(),
    };

    // 503 when the database is down
    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(health_response))
}
