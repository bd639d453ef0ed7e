//! 统一错误处理
//!
//! `ThemeError` 是主题安装流水线的领域错误，`ApiError` 实现 `IntoResponse`
//! 供 HTTP 层使用，替代重复的 `(StatusCode, Json<ErrorResponse>)` 模式

use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// 主题安装流水线错误
#[derive(Debug, Error)]
pub enum ThemeError {
    /// 下载失败（网络错误或非 2xx 状态码）
    #[error("failed to download theme file: {0}")]
    Fetch(String),

    /// 压缩包内的路径穿越条目（安全检查）
    #[error("unsafe path in theme archive: {entry}")]
    PathTraversal { entry: String },

    /// 压缩包内找不到合格的构建目录
    #[error("no build directory found in theme package")]
    NoBuildDirectory,

    /// theme.json 不存在
    #[error("theme.json not found at {}", path.display())]
    ManifestNotFound { path: PathBuf },

    /// theme.json 不是合法 JSON
    #[error("failed to parse theme.json: {0}")]
    ManifestParse(#[from] serde_json::Error),

    /// theme.json 缺少必填字段或违反约束
    #[error("invalid theme manifest: {0}")]
    ManifestInvalid(String),

    /// 主题要求的最低版本高于当前运行版本
    #[error("theme requires version {required} or higher, current version is {current}")]
    IncompatibleVersion { required: String, current: String },

    /// 操作前置条件：当前没有已安装的主题
    #[error("no theme is currently installed")]
    NoThemeInstalled,

    /// 切换失败，包含原始错误和备份恢复结果
    #[error("theme swap failed: {source}")]
    Swap {
        #[source]
        source: Box<ThemeError>,
        /// 备份是否成功恢复到激活目录
        restored: bool,
    },

    /// 主题商店返回了语义错误（非 2xx、空结果、缺少构建文件等）
    #[error("theme store error: {0}")]
    Store(String),

    /// 设置存储读写失败
    #[error("settings store error: {0}")]
    Settings(String),

    /// 压缩包读取错误
    #[error("theme archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for ThemeError {
    fn from(e: reqwest::Error) -> Self {
        ThemeError::Fetch(e.to_string())
    }
}

/// 便捷类型别名
pub type ThemeResult<T> = Result<T, ThemeError>;

/// API 错误响应结构
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// 统一 API 错误类型
#[derive(Debug)]
pub enum ApiError {
    /// 401 - 未授权（API Key 无效或缺失）
    Unauthorized,
    /// 404 - 资源未找到
    NotFound(String),
    /// 400 - 请求无效
    BadRequest(String),
    /// 500 - 内部错误
    Internal(String),
}

impl ApiError {
    /// 创建未授权错误
    pub fn unauthorized() -> Self {
        Self::Unauthorized
    }

    /// 创建未找到错误
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    /// 创建请求无效错误
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl From<ThemeError> for ApiError {
    fn from(e: ThemeError) -> Self {
        match &e {
            ThemeError::IncompatibleVersion { .. }
            | ThemeError::NoThemeInstalled
            | ThemeError::ManifestInvalid(_) => ApiError::BadRequest(e.to_string()),
            _ => ApiError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Invalid or missing API key".to_string(),
            ),
            ApiError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("{} not found", resource),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
        };

        let body = ErrorResponse::new(error_type, message);
        (status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Unauthorized => write!(f, "Unauthorized"),
            ApiError::NotFound(r) => write!(f, "Not found: {}", r),
            ApiError::BadRequest(m) => write!(f, "Bad request: {}", m),
            ApiError::Internal(m) => write!(f, "Internal error: {}", m),
        }
    }
}

impl std::error::Error for ApiError {}

/// 便捷类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_new() {
        let resp = ErrorResponse::new("test_error", "Test message");
        assert_eq!(resp.error, "test_error");
        assert_eq!(resp.message, "Test message");
        assert!(resp.details.is_none());
    }

    #[test]
    fn test_error_response_with_details() {
        let resp = ErrorResponse::new("test_error", "Test message").with_details("Extra info");
        assert_eq!(resp.details, Some("Extra info".to_string()));
    }

    #[test]
    fn test_api_error_status_codes() {
        assert_eq!(
            ApiError::unauthorized().into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::not_found("theme").into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::bad_request("bad").into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::internal("boom").into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_theme_error_to_api_error() {
        let api: ApiError = ThemeError::NoThemeInstalled.into();
        assert!(matches!(api, ApiError::BadRequest(_)));

        let api: ApiError = ThemeError::NoBuildDirectory.into();
        assert!(matches!(api, ApiError::Internal(_)));

        let api: ApiError = ThemeError::IncompatibleVersion {
            required: "2.0.0".to_string(),
            current: "1.0.0".to_string(),
        }
        .into();
        assert!(matches!(api, ApiError::BadRequest(_)));
    }
}
