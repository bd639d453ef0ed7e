//! 应用全局状态
//!
//! 持有配置、存储和生命周期服务，通过 `Arc<AppState>` 在各 handler 间共享

use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::{EnvConfig, RuntimeConfig};
use crate::infra::{JsonSettingsStore, JsonStatusStore, SettingsStore, StatusStore};
use crate::services::ThemeLifecycleService;

/// 全局关闭信号
static GLOBAL_SHUTDOWN: OnceLock<CancellationToken> = OnceLock::new();

/// 获取全局关闭 token
pub fn get_shutdown_token() -> CancellationToken {
    GLOBAL_SHUTDOWN
        .get_or_init(CancellationToken::new)
        .clone()
}

/// 触发优雅关闭
pub fn trigger_shutdown() {
    get_shutdown_token().cancel();
}

/// 应用状态
pub struct AppState {
    /// API 密钥
    pub api_key: String,
    /// 环境配置
    pub config: EnvConfig,
    /// 启动时间
    pub started_at: DateTime<Utc>,
    /// 站点设置存储
    pub settings: Arc<dyn SettingsStore>,
    /// 状态与映射存储
    pub statuses: Arc<dyn StatusStore>,
    /// 主题生命周期服务
    pub lifecycle: ThemeLifecycleService,
}

impl AppState {
    /// 创建应用状态
    pub fn new(runtime: &RuntimeConfig) -> Self {
        let config = EnvConfig::from_env(runtime);

        info!(
            port = config.port,
            data_dir = %config.data_dir.display(),
            environment = ?config.environment,
            store = %config.theme_store.base_url,
            "Configuration loaded"
        );

        let settings: Arc<dyn SettingsStore> =
            Arc::new(JsonSettingsStore::new(&config.data_dir));
        let statuses: Arc<dyn StatusStore> = Arc::new(JsonStatusStore::new(&config.data_dir));
        let lifecycle =
            ThemeLifecycleService::new(&config, Arc::clone(&settings), Arc::clone(&statuses));

        Self {
            api_key: config.api_key.clone(),
            config,
            started_at: Utc::now(),
            settings,
            statuses,
            lifecycle,
        }
    }
}
