//! 主题管理 API
//!
//! 包含 /api/theme/apply, /api/theme/current, /api/theme/info,
//! /api/theme/redownload 端点

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::middleware::RequireApiKey;
use crate::services::ApplyRequest;
use crate::state::AppState;

/// 主题安装请求体
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyThemeRequest {
    pub theme_id: String,
    pub theme_version: String,
    pub build_file_url: String,
    #[serde(default)]
    pub compatibility: Option<ThemeCompatibility>,
}

/// 主题兼容性声明
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeCompatibility {
    #[serde(default)]
    pub min_version: Option<String>,
}

/// 主题安装响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyThemeResponse {
    pub success: bool,
    pub message: String,
    pub is_update: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_version: Option<String>,
    pub new_version: String,
}

/// 当前主题响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentThemeResponse {
    pub current_theme_id: String,
    pub current_theme_version: String,
}

/// 目录信息
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryInfo {
    pub exists: bool,
    /// 目录内文件总字节数
    pub size: u64,
}

/// 主题目录诊断响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeInfoResponse {
    pub themes_dir: String,
    pub active: DirectoryInfo,
    pub backup: DirectoryInfo,
    pub theme_installed: bool,
}

/// 重新下载响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedownloadResponse {
    pub success: bool,
    pub message: String,
    pub theme_id: String,
    pub theme_name: String,
    pub version: String,
}

/// 创建主题管理路由
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/theme/apply", post(apply_theme))
        .route("/api/theme/current", get(current_theme))
        .route("/api/theme/info", get(theme_info))
        .route("/api/theme/redownload", post(redownload_theme))
}

/// 安装或更新主题
///
/// POST /api/theme/apply
/// 需要 API Key 认证
async fn apply_theme(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
    Json(request): Json<ApplyThemeRequest>,
) -> ApiResult<Json<ApplyThemeResponse>> {
    if request.theme_id.is_empty() {
        return Err(ApiError::bad_request("themeId is required"));
    }
    if request.theme_version.is_empty() {
        return Err(ApiError::bad_request("themeVersion is required"));
    }
    if request.build_file_url.is_empty() {
        return Err(ApiError::bad_request("buildFileUrl is required"));
    }

    let outcome = state
        .lifecycle
        .apply(&ApplyRequest {
            theme_id: request.theme_id,
            theme_version: request.theme_version,
            build_file_url: request.build_file_url,
            min_app_version: request.compatibility.and_then(|c| c.min_version),
        })
        .await?;

    let message = match &outcome.old_version {
        Some(old) => format!(
            "Theme updated successfully from {} to {}",
            old, outcome.new_version
        ),
        None => "Theme applied successfully".to_string(),
    };

    Ok(Json(ApplyThemeResponse {
        success: true,
        message,
        is_update: outcome.is_update,
        old_version: outcome.old_version,
        new_version: outcome.new_version,
    }))
}

/// 查询当前安装的主题
///
/// GET /api/theme/current
/// 无需认证。设置记录与磁盘不一致时（记录存在但文件丢失）会清掉陈旧记录。
async fn current_theme(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<CurrentThemeResponse>> {
    let mut settings = state
        .settings
        .get_or_create()
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;

    if settings.has_theme() && !state.lifecycle.theme_files_present() {
        warn!(
            theme_id = %settings.current_theme_id,
            "Theme record exists but files are missing, clearing record"
        );
        settings.clear_theme();
        if let Err(e) = state.settings.save(&settings).await {
            warn!(error = %e, "Failed to clear stale theme record");
        }
    }

    Ok(Json(CurrentThemeResponse {
        current_theme_id: settings.current_theme_id,
        current_theme_version: settings.current_theme_version,
    }))
}

/// 主题目录诊断
///
/// GET /api/theme/info
/// 无需认证
async fn theme_info(State(state): State<Arc<AppState>>) -> ApiResult<Json<ThemeInfoResponse>> {
    let active_dir = state.lifecycle.active_theme_dir().to_path_buf();
    let backup_dir = state.lifecycle.backup_dir();
    let themes_dir = state.config.themes_dir();

    let info = tokio::task::spawn_blocking(move || ThemeInfoResponse {
        themes_dir: themes_dir.display().to_string(),
        active: directory_info(&active_dir),
        backup: directory_info(&backup_dir),
        theme_installed: active_dir.join("index.html").exists(),
    })
    .await
    .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(Json(info))
}

/// 重新下载当前主题
///
/// POST /api/theme/redownload
/// 需要 API Key 认证
async fn redownload_theme(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<RedownloadResponse>> {
    let outcome = state.lifecycle.redownload().await?;

    Ok(Json(RedownloadResponse {
        success: true,
        message: format!("Theme {} redownloaded successfully", outcome.theme_name),
        theme_id: outcome.theme_id,
        theme_name: outcome.theme_name,
        version: outcome.version,
    }))
}

fn directory_info(dir: &Path) -> DirectoryInfo {
    DirectoryInfo {
        exists: dir.is_dir(),
        size: dir_size(dir),
    }
}

/// 目录内文件的总字节数，不可读的条目按 0 计
fn dir_size(dir: &Path) -> u64 {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };

    entries
        .filter_map(|e| e.ok())
        .map(|entry| {
            let path = entry.path();
            if path.is_dir() {
                dir_size(&path)
            } else {
                entry.metadata().map(|m| m.len()).unwrap_or(0)
            }
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_dir_size_counts_nested_files() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("a.txt"), "12345").unwrap();
        std::fs::write(dir.path().join("nested/b.txt"), "123").unwrap();

        assert_eq!(dir_size(dir.path()), 8);
    }

    #[test]
    fn test_dir_size_missing_directory_is_zero() {
        let dir = TempDir::new().unwrap();
        assert_eq!(dir_size(&dir.path().join("nope")), 0);
    }

    #[test]
    fn test_apply_request_accepts_camel_case() {
        let json = r#"{
            "themeId": "acme",
            "themeVersion": "1.0.0",
            "buildFileUrl": "https://store.example.com/build.zip",
            "compatibility": {"minVersion": "0.3.0"}
        }"#;

        let request: ApplyThemeRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.theme_id, "acme");
        assert_eq!(
            request.compatibility.unwrap().min_version.as_deref(),
            Some("0.3.0")
        );
    }

    #[test]
    fn test_apply_request_compatibility_optional() {
        let json = r#"{
            "themeId": "acme",
            "themeVersion": "1.0.0",
            "buildFileUrl": "https://store.example.com/build.zip"
        }"#;

        let request: ApplyThemeRequest = serde_json::from_str(json).unwrap();
        assert!(request.compatibility.is_none());
    }
}
