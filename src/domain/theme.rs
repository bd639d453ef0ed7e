//! 主题相关领域模型
//!
//! 包含 theme.json 清单结构、主题商店记录和持久化的站点设置

use serde::{Deserialize, Serialize};

/// 主题清单 (theme.json)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThemeManifest {
    pub id: String,
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    /// 设置分组
    #[serde(default)]
    pub settings: Vec<ThemeSettingGroup>,
    /// 主题声明的分类词汇表
    #[serde(default)]
    pub categories: Vec<ThemeCategory>,
}

/// 主题分类，用户状态会被映射到这些分类上
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThemeCategory {
    pub id: String,
    pub label: String,
    pub description: String,
    /// 是否允许多个状态映射到此分类
    #[serde(default)]
    pub multiple: bool,
    /// 展示顺序
    #[serde(default)]
    pub order: i32,
}

/// 设置分组
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThemeSettingGroup {
    pub group: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub settings: Vec<ThemeSetting>,
}

/// 单个可配置设置
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThemeSetting {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub setting_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ThemeSettingOption>,
    /// 嵌套设置（list 类型）
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<ThemeSetting>,
}

/// select 类型设置的选项
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThemeSettingOption {
    pub value: String,
    pub label: String,
}

/// 主题商店的主题记录
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThemeStoreRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub build_file: String,
    #[serde(default)]
    pub submission_status: String,
}

/// 主题商店列表响应
#[derive(Clone, Debug, Deserialize)]
pub struct ThemeStoreList {
    #[serde(default)]
    pub items: Vec<ThemeStoreRecord>,
}

/// 持久化的站点设置（激活主题身份的唯一事实来源）
///
/// 空字符串表示当前没有安装任何主题
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SiteSettings {
    #[serde(default)]
    pub current_theme_id: String,
    #[serde(default)]
    pub current_theme_version: String,
}

impl SiteSettings {
    /// 是否记录了已安装主题
    pub fn has_theme(&self) -> bool {
        !self.current_theme_id.is_empty()
    }

    /// 清除记录（主题文件丢失时）
    pub fn clear_theme(&mut self) {
        self.current_theme_id.clear();
        self.current_theme_version.clear();
    }
}
