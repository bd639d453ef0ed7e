//! 健康检查 API
//!
//! 包含 /health 端点

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

use crate::config::env::constants::VERSION;
use crate::state::AppState;

/// 健康检查响应
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    timestamp: String,
    uptime_secs: i64,
    theme_installed: bool,
}

/// 创建健康检查路由
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health_check))
}

/// 健康检查 - 返回状态、版本、运行时间和主题文件存在性
///
/// GET /health
/// 无需认证
async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let uptime_secs = (chrono::Utc::now() - state.started_at).num_seconds();

    Json(HealthResponse {
        status: "ok",
        service: "theme-agent",
        version: VERSION,
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime_secs,
        theme_installed: state.lifecycle.theme_files_present(),
    })
}
