//! 主题商店 HTTP Client
//!
//! 封装与远程主题目录的所有 HTTP 交互，复用连接池

use reqwest::Client;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::env::constants::STORE_TIMEOUT_SECS;
use crate::config::{Environment, ThemeStoreConfig};
use crate::domain::theme::{ThemeStoreList, ThemeStoreRecord};
use crate::error::{ThemeError, ThemeResult};

/// 主题商店客户端
///
/// 封装所有与主题商店的 HTTP 交互，包括：
/// - 默认主题查询 (find_default_theme)
/// - 单条主题记录获取 (fetch_theme)
/// - 构建包 URL 推导 (build_file_url)
#[derive(Clone)]
pub struct ThemeStoreClient {
    client: Client,
    base_url: String,
    default_theme_name: String,
}

impl ThemeStoreClient {
    /// 创建新的主题商店客户端
    pub fn new(config: &ThemeStoreConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(STORE_TIMEOUT_SECS))
            .pool_max_idle_per_host(5)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: config.base_url.clone(),
            default_theme_name: config.default_theme_name.clone(),
        }
    }

    /// 查询默认主题的最新记录
    ///
    /// development 环境同时接受 approved 和 staging 提交，其余环境只接受 approved。
    /// 商店没有默认主题时返回 Ok(None)。
    pub async fn find_default_theme(
        &self,
        environment: Environment,
    ) -> ThemeResult<Option<ThemeStoreRecord>> {
        let filter = if environment.includes_staging() {
            format!(
                "(name='{}'%26%26(submission_status='approved'||submission_status='staging'))",
                self.default_theme_name
            )
        } else {
            format!(
                "(name='{}'%26%26submission_status='approved')",
                self.default_theme_name
            )
        };

        let url = format!(
            "{}/api/collections/themes/records?filter={}&sort=-created",
            self.base_url, filter
        );

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(ThemeError::Store(format!(
                "theme store returned status {}",
                response.status()
            )));
        }

        let list: ThemeStoreList = response
            .json()
            .await
            .map_err(|e| ThemeError::Store(format!("failed to decode store response: {}", e)))?;

        match list.items.into_iter().next() {
            Some(record) => {
                info!(
                    theme_id = %record.id,
                    version = %record.version,
                    submission_status = %record.submission_status,
                    "Found default theme in store"
                );
                Ok(Some(record))
            }
            None => {
                warn!(name = %self.default_theme_name, "No default theme found in store");
                Ok(None)
            }
        }
    }

    /// 获取单条主题记录
    pub async fn fetch_theme(&self, theme_id: &str) -> ThemeResult<ThemeStoreRecord> {
        let url = format!(
            "{}/api/collections/themes/records/{}",
            self.base_url, theme_id
        );

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(ThemeError::Store(format!(
                "theme store returned status {}",
                response.status()
            )));
        }

        let record: ThemeStoreRecord = response
            .json()
            .await
            .map_err(|e| ThemeError::Store(format!("failed to decode theme record: {}", e)))?;

        Ok(record)
    }

    /// 根据记录推导构建包下载 URL
    pub fn build_file_url(&self, record: &ThemeStoreRecord) -> ThemeResult<String> {
        if record.build_file.is_empty() {
            return Err(ThemeError::Store(format!(
                "theme {} has no build file",
                record.id
            )));
        }
        Ok(format!(
            "{}/api/files/themes/{}/{}",
            self.base_url, record.id, record.build_file
        ))
    }
}
