//! 状态定义与状态-分类映射模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 用户自定义的工作流状态（独立于任何主题）
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatusDefinition {
    pub id: u64,
    pub display_name: String,
    pub slug: String,
    pub order: i32,
    #[serde(default)]
    pub is_reserved: bool,
    pub created_at: DateTime<Utc>,
}

/// 状态到主题分类的映射
///
/// 唯一性约束：同一个 (status_definition_id, theme_id) 至多一条映射
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatusCategoryMapping {
    pub status_definition_id: u64,
    pub theme_id: String,
    pub category_id: String,
    pub created_at: DateTime<Utc>,
}
