//! 主题安装流水线服务模块
//!
//! 下载 → 解压校验 → 目录切换 → 清单解析 → 映射维护

pub mod download;
pub mod extract;
pub mod lifecycle;
pub mod manifest;
pub mod mapping;
pub mod swap;

pub use lifecycle::{ApplyOutcome, ApplyRequest, RedownloadOutcome, ThemeLifecycleService};
pub use swap::DeploymentSwapper;
