//! 环境变量配置加载

use std::env;
use std::path::PathBuf;

/// 命令行运行时配置（覆盖环境变量）
#[derive(Clone, Debug, Default)]
pub struct RuntimeConfig {
    /// 监听端口覆盖
    pub port_override: Option<u16>,
    /// 数据目录覆盖
    pub data_dir_override: Option<PathBuf>,
}

/// 部署环境
///
/// `development` 环境允许安装 staging 状态的主题，其余一律按 production 处理
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// 从环境变量解析，未设置时默认 production
    pub fn from_env() -> Self {
        Self::parse(env::var("ENVIRONMENT").ok().as_deref())
    }

    /// 只有字面量 `development` 是开发环境，其余一律按 production 处理
    fn parse(value: Option<&str>) -> Self {
        match value {
            Some("development") => Environment::Development,
            _ => Environment::Production,
        }
    }

    /// development 环境是否包含 staging 提交
    pub fn includes_staging(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

/// 主题商店配置
#[derive(Clone, Debug)]
pub struct ThemeStoreConfig {
    /// 商店 API 基础 URL
    pub base_url: String,
    /// 默认主题的名称（首次启动时安装）
    pub default_theme_name: String,
}

impl ThemeStoreConfig {
    pub fn from_env() -> Self {
        let base_url = env::var("THEME_STORE_URL")
            .unwrap_or_else(|_| "https://api.shipshipship.io".to_string());
        let default_theme_name = env::var("THEME_STORE_DEFAULT_THEME")
            .unwrap_or_else(|_| "shipshipship-template-default".to_string());

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            default_theme_name,
        }
    }
}

/// 环境配置
#[derive(Clone, Debug)]
pub struct EnvConfig {
    /// API 密钥
    pub api_key: String,
    /// 服务监听端口
    pub port: u16,
    /// 数据目录（主题、设置、状态映射都保存在这里）
    pub data_dir: PathBuf,
    /// 部署环境
    pub environment: Environment,
    /// 主题商店配置
    pub theme_store: ThemeStoreConfig,
}

impl EnvConfig {
    /// 从环境变量加载配置，命令行参数优先
    pub fn from_env(runtime: &RuntimeConfig) -> Self {
        let api_key = env::var("THEME_AGENT_API_KEY")
            .unwrap_or_else(|_| "change-me-in-production".to_string());

        let port = runtime.port_override.unwrap_or_else(|| {
            env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8090)
        });

        let data_dir = runtime.data_dir_override.clone().unwrap_or_else(|| {
            env::var("THEME_AGENT_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data"))
        });

        Self {
            api_key,
            port,
            data_dir,
            environment: Environment::from_env(),
            theme_store: ThemeStoreConfig::from_env(),
        }
    }

    /// 主题根目录 (`<data>/themes`)
    pub fn themes_dir(&self) -> PathBuf {
        self.data_dir.join("themes")
    }

    /// 当前激活的主题目录 (`<data>/themes/current`)
    pub fn active_theme_dir(&self) -> PathBuf {
        self.themes_dir().join("current")
    }
}

/// 常量
pub mod constants {
    /// 版本号
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    /// 主题清单文件名
    pub const MANIFEST_FILE_NAME: &str = "theme.json";

    /// 主题商店 HTTP 超时（秒）
    pub const STORE_TIMEOUT_SECS: u64 = 30;

    /// 构建包下载超时（秒）
    pub const DOWNLOAD_TIMEOUT_SECS: u64 = 120;

    /// 首次启动安装默认主题的最大尝试次数
    pub const BOOTSTRAP_MAX_ATTEMPTS: u32 = 3;

    /// 首次重试前的等待（秒），之后按指数翻倍
    pub const BOOTSTRAP_BASE_DELAY_SECS: u64 = 2;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_from_value() {
        assert_eq!(
            Environment::parse(Some("development")),
            Environment::Development
        );
        assert!(Environment::Development.includes_staging());

        assert_eq!(Environment::parse(Some("staging")), Environment::Production);
        assert_eq!(Environment::parse(None), Environment::Production);
        assert!(!Environment::Production.includes_staging());
    }

    #[test]
    fn test_runtime_overrides() {
        let runtime = RuntimeConfig {
            port_override: Some(9100),
            data_dir_override: Some(PathBuf::from("/tmp/theme-agent-test")),
        };
        let config = EnvConfig::from_env(&runtime);
        assert_eq!(config.port, 9100);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/theme-agent-test"));
        assert_eq!(
            config.active_theme_dir(),
            PathBuf::from("/tmp/theme-agent-test/themes/current")
        );
    }
}
