//! API Key 认证
//!
//! 改动主题的端点都要求 `x-api-key` header，只读端点不做认证

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::HeaderMap, request::Parts},
};
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::AppState;

/// API Key 认证 Extractor
///
/// 放在 handler 参数列表里即可生效：
///
/// ```ignore
/// async fn apply_theme(
///     _auth: RequireApiKey,
///     State(state): State<Arc<AppState>>,
///     Json(request): Json<ApplyThemeRequest>,
/// ) -> ApiResult<Json<ApplyThemeResponse>> {
///     // ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireApiKey;

#[async_trait]
impl FromRequestParts<Arc<AppState>> for RequireApiKey {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        verify_api_key(&parts.headers, &state.api_key)
    }
}

/// 校验 `x-api-key` header
pub fn verify_api_key(headers: &HeaderMap, expected_key: &str) -> Result<RequireApiKey, ApiError> {
    let provided_key = headers.get("x-api-key").and_then(|v| v.to_str().ok());

    match provided_key {
        Some(key) if key == expected_key => Ok(RequireApiKey),
        Some(_) => {
            tracing::warn!("Invalid API key provided");
            Err(ApiError::unauthorized())
        }
        None => {
            tracing::warn!("Missing x-api-key header");
            Err(ApiError::unauthorized())
        }
    }
}
