//! 站点设置持久化
//!
//! 激活主题的身份和版本保存在本地 JSON 文件中，
//! 写入采用临时文件 + 原子重命名，避免半写状态

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::domain::theme::SiteSettings;

/// 设置文件名
const SETTINGS_FILE_NAME: &str = "settings.json";

/// 设置存储能力
///
/// 生命周期服务通过这个 seam 注入存储，而不是访问全局状态
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// 读取设置，文件不存在时创建默认值
    async fn get_or_create(&self) -> anyhow::Result<SiteSettings>;

    /// 保存设置
    async fn save(&self, settings: &SiteSettings) -> anyhow::Result<()>;
}

/// 持久化的设置文件格式
#[derive(Clone, Debug, Serialize, Deserialize)]
struct PersistedSettings {
    /// 版本号（用于未来格式升级）
    version: u32,
    settings: SiteSettings,
    saved_at: DateTime<Utc>,
}

/// JSON 文件实现
pub struct JsonSettingsStore {
    path: PathBuf,
    cache: RwLock<Option<SiteSettings>>,
}

impl JsonSettingsStore {
    /// 创建存储，文件位于 `<data_dir>/settings.json`
    pub fn new(data_dir: &std::path::Path) -> Self {
        Self {
            path: data_dir.join(SETTINGS_FILE_NAME),
            cache: RwLock::new(None),
        }
    }

    async fn load_from_disk(&self) -> Option<SiteSettings> {
        if !self.path.exists() {
            return None;
        }

        match fs::read_to_string(&self.path).await {
            Ok(content) => match serde_json::from_str::<PersistedSettings>(&content) {
                Ok(persisted) => Some(persisted.settings),
                Err(e) => {
                    warn!(
                        path = %self.path.display(),
                        error = %e,
                        "Failed to parse settings file, using defaults"
                    );
                    None
                }
            },
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to read settings file"
                );
                None
            }
        }
    }

    async fn write_to_disk(&self, settings: &SiteSettings) -> anyhow::Result<()> {
        let temp_path = self.path.with_extension("json.tmp");

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let persisted = PersistedSettings {
            version: 1,
            settings: settings.clone(),
            saved_at: Utc::now(),
        };
        let content = serde_json::to_string_pretty(&persisted)?;

        // 写入临时文件后原子重命名
        fs::write(&temp_path, &content).await?;
        fs::rename(&temp_path, &self.path).await?;

        info!(
            path = %self.path.display(),
            theme_id = %settings.current_theme_id,
            "Saved site settings"
        );

        Ok(())
    }
}

#[async_trait]
impl SettingsStore for JsonSettingsStore {
    async fn get_or_create(&self) -> anyhow::Result<SiteSettings> {
        {
            let cache = self.cache.read().await;
            if let Some(settings) = cache.as_ref() {
                return Ok(settings.clone());
            }
        }

        let settings = self.load_from_disk().await.unwrap_or_default();
        *self.cache.write().await = Some(settings.clone());
        Ok(settings)
    }

    async fn save(&self, settings: &SiteSettings) -> anyhow::Result<()> {
        self.write_to_disk(settings).await?;
        *self.cache.write().await = Some(settings.clone());
        Ok(())
    }
}
