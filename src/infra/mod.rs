//! 基础设施层
//!
//! 外部协作者：主题商店 HTTP 客户端、设置与状态的持久化存储

pub mod settings_store;
pub mod status_store;
pub mod theme_store;

pub use settings_store::{JsonSettingsStore, SettingsStore};
pub use status_store::{JsonStatusStore, StatusStore};
pub use theme_store::ThemeStoreClient;
