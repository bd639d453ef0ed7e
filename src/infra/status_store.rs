//! 状态定义与映射持久化
//!
//! 状态和映射保存在同一个 JSON 文件中，写入方式与设置存储一致

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::warn;

use crate::domain::status::{StatusCategoryMapping, StatusDefinition};

/// 状态文件名
const STATUS_FILE_NAME: &str = "statuses.json";

/// 状态与映射存储能力
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// 所有状态定义（按 order 排序）
    async fn list_statuses(&self) -> anyhow::Result<Vec<StatusDefinition>>;

    /// 创建状态定义
    async fn create_status(
        &self,
        display_name: &str,
        slug: &str,
        order: i32,
    ) -> anyhow::Result<StatusDefinition>;

    /// 查找某状态在某主题下的映射
    async fn find_mapping(
        &self,
        status_definition_id: u64,
        theme_id: &str,
    ) -> anyhow::Result<Option<StatusCategoryMapping>>;

    /// 创建映射；(status, theme) 已存在映射时保持原值不变
    async fn create_mapping(
        &self,
        status_definition_id: u64,
        theme_id: &str,
        category_id: &str,
    ) -> anyhow::Result<StatusCategoryMapping>;
}

/// 持久化文件格式
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct StatusFile {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default = "default_next_id")]
    next_id: u64,
    #[serde(default)]
    statuses: Vec<StatusDefinition>,
    #[serde(default)]
    mappings: Vec<StatusCategoryMapping>,
    #[serde(default)]
    saved_at: Option<DateTime<Utc>>,
}

fn default_version() -> u32 {
    1
}

fn default_next_id() -> u64 {
    1
}

/// JSON 文件实现
pub struct JsonStatusStore {
    path: PathBuf,
    state: RwLock<Option<StatusFile>>,
}

impl JsonStatusStore {
    /// 创建存储，文件位于 `<data_dir>/statuses.json`
    pub fn new(data_dir: &std::path::Path) -> Self {
        Self {
            path: data_dir.join(STATUS_FILE_NAME),
            state: RwLock::new(None),
        }
    }

    async fn load(&self) -> StatusFile {
        {
            let state = self.state.read().await;
            if let Some(file) = state.as_ref() {
                return file.clone();
            }
        }

        let loaded = if self.path.exists() {
            match fs::read_to_string(&self.path).await {
                Ok(content) => serde_json::from_str::<StatusFile>(&content).unwrap_or_else(|e| {
                    warn!(
                        path = %self.path.display(),
                        error = %e,
                        "Failed to parse status file, starting empty"
                    );
                    empty_file()
                }),
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "Failed to read status file");
                    empty_file()
                }
            }
        } else {
            empty_file()
        };

        *self.state.write().await = Some(loaded.clone());
        loaded
    }

    async fn persist(&self, mut file: StatusFile) -> anyhow::Result<()> {
        file.saved_at = Some(Utc::now());

        let temp_path = self.path.with_extension("json.tmp");
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(&file)?;
        fs::write(&temp_path, &content).await?;
        fs::rename(&temp_path, &self.path).await?;

        *self.state.write().await = Some(file);
        Ok(())
    }
}

fn empty_file() -> StatusFile {
    StatusFile {
        version: 1,
        next_id: 1,
        statuses: Vec::new(),
        mappings: Vec::new(),
        saved_at: None,
    }
}

#[async_trait]
impl StatusStore for JsonStatusStore {
    async fn list_statuses(&self) -> anyhow::Result<Vec<StatusDefinition>> {
        let mut statuses = self.load().await.statuses;
        statuses.sort_by_key(|s| s.order);
        Ok(statuses)
    }

    async fn create_status(
        &self,
        display_name: &str,
        slug: &str,
        order: i32,
    ) -> anyhow::Result<StatusDefinition> {
        let mut file = self.load().await;

        let status = StatusDefinition {
            id: file.next_id,
            display_name: display_name.to_string(),
            slug: slug.to_string(),
            order,
            is_reserved: false,
            created_at: Utc::now(),
        };

        file.next_id += 1;
        file.statuses.push(status.clone());
        self.persist(file).await?;

        Ok(status)
    }

    async fn find_mapping(
        &self,
        status_definition_id: u64,
        theme_id: &str,
    ) -> anyhow::Result<Option<StatusCategoryMapping>> {
        let file = self.load().await;
        Ok(file
            .mappings
            .iter()
            .find(|m| m.status_definition_id == status_definition_id && m.theme_id == theme_id)
            .cloned())
    }

    async fn create_mapping(
        &self,
        status_definition_id: u64,
        theme_id: &str,
        category_id: &str,
    ) -> anyhow::Result<StatusCategoryMapping> {
        let mut file = self.load().await;

        // 唯一性约束：(status, theme) 至多一条映射
        if let Some(existing) = file
            .mappings
            .iter()
            .find(|m| m.status_definition_id == status_definition_id && m.theme_id == theme_id)
        {
            return Ok(existing.clone());
        }

        let mapping = StatusCategoryMapping {
            status_definition_id,
            theme_id: theme_id.to_string(),
            category_id: category_id.to_string(),
            created_at: Utc::now(),
        };

        file.mappings.push(mapping.clone());
        self.persist(file).await?;

        Ok(mapping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_create_status_assigns_increasing_ids() {
        let dir = TempDir::new().unwrap();
        let store = JsonStatusStore::new(dir.path());

        let a = store.create_status("Feedback", "feedback", 0).await.unwrap();
        let b = store.create_status("Released", "released", 1).await.unwrap();
        assert!(b.id > a.id);

        let statuses = store.list_statuses().await.unwrap();
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].display_name, "Feedback");
    }

    #[tokio::test]
    async fn test_mapping_uniqueness_per_status_and_theme() {
        let dir = TempDir::new().unwrap();
        let store = JsonStatusStore::new(dir.path());

        let status = store.create_status("Feedback", "feedback", 0).await.unwrap();

        let first = store
            .create_mapping(status.id, "theme-a", "feedback")
            .await
            .unwrap();
        // 重复创建保持原值
        let second = store
            .create_mapping(status.id, "theme-a", "released")
            .await
            .unwrap();
        assert_eq!(second.category_id, first.category_id);

        // 另一个主题可以有自己的映射
        let other = store
            .create_mapping(status.id, "theme-b", "released")
            .await
            .unwrap();
        assert_eq!(other.category_id, "released");
    }

    #[tokio::test]
    async fn test_state_survives_reload() {
        let dir = TempDir::new().unwrap();

        {
            let store = JsonStatusStore::new(dir.path());
            let status = store.create_status("Backlog", "backlog", 0).await.unwrap();
            store
                .create_mapping(status.id, "theme-a", "proposed")
                .await
                .unwrap();
        }

        let store = JsonStatusStore::new(dir.path());
        let statuses = store.list_statuses().await.unwrap();
        assert_eq!(statuses.len(), 1);
        let mapping = store
            .find_mapping(statuses[0].id, "theme-a")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(mapping.category_id, "proposed");
    }
}
