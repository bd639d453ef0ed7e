//! 主题生命周期服务
//!
//! 编排完整的安装流水线：版本门禁 → 下载 → 切换 → 记录 → 映射维护。
//! 切换由单飞锁串行化，同一时刻最多一个切换在执行。

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::config::env::constants::{
    BOOTSTRAP_BASE_DELAY_SECS, BOOTSTRAP_MAX_ATTEMPTS, DOWNLOAD_TIMEOUT_SECS, VERSION,
};
use crate::config::{EnvConfig, Environment};
use crate::error::{ThemeError, ThemeResult};
use crate::infra::{SettingsStore, StatusStore, ThemeStoreClient};

use super::{download, manifest, mapping, DeploymentSwapper};

/// 主题安装请求
#[derive(Clone, Debug)]
pub struct ApplyRequest {
    pub theme_id: String,
    pub theme_version: String,
    pub build_file_url: String,
    /// 主题要求的最低运行版本，缺省表示不限
    pub min_app_version: Option<String>,
}

/// 安装结果
#[derive(Clone, Debug)]
pub struct ApplyOutcome {
    /// 是否是同一主题的版本更新
    pub is_update: bool,
    /// 更新前的版本（仅 is_update 时有值）
    pub old_version: Option<String>,
    pub new_version: String,
}

/// 重新下载结果
#[derive(Clone, Debug)]
pub struct RedownloadOutcome {
    pub theme_id: String,
    pub theme_name: String,
    pub version: String,
}

/// 主题生命周期服务
pub struct ThemeLifecycleService {
    swapper: Arc<DeploymentSwapper>,
    store: ThemeStoreClient,
    settings: Arc<dyn SettingsStore>,
    statuses: Arc<dyn StatusStore>,
    environment: Environment,
    download_client: reqwest::Client,
    /// 单飞锁：同一时刻只允许一个切换
    swap_lock: Mutex<()>,
}

impl ThemeLifecycleService {
    pub fn new(
        config: &EnvConfig,
        settings: Arc<dyn SettingsStore>,
        statuses: Arc<dyn StatusStore>,
    ) -> Self {
        let download_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .pool_max_idle_per_host(5)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            swapper: Arc::new(DeploymentSwapper::new(config.active_theme_dir())),
            store: ThemeStoreClient::new(&config.theme_store),
            settings,
            statuses,
            environment: config.environment,
            download_client,
            swap_lock: Mutex::new(()),
        }
    }

    /// 激活目录
    pub fn active_theme_dir(&self) -> &Path {
        self.swapper.active_dir()
    }

    /// 备份目录
    pub fn backup_dir(&self) -> std::path::PathBuf {
        self.swapper.backup_dir()
    }

    /// 激活目录里是否有可服务的主题文件
    ///
    /// 判据是入口文件 index.html 存在，目录存在但缺入口视同没有主题
    pub fn theme_files_present(&self) -> bool {
        self.swapper.active_dir().join("index.html").exists()
    }

    /// 安装或更新主题
    ///
    /// 失败时激活目录保持原状（切换层保证），已下载的临时文件总是被清理
    pub async fn apply(&self, request: &ApplyRequest) -> ThemeResult<ApplyOutcome> {
        if let Some(min) = request.min_app_version.as_deref() {
            if !min.is_empty() && !is_version_compatible(VERSION, min) {
                return Err(ThemeError::IncompatibleVersion {
                    required: min.to_string(),
                    current: VERSION.to_string(),
                });
            }
        }

        info!(
            theme_id = %request.theme_id,
            version = %request.theme_version,
            "Applying theme"
        );

        let archive_path =
            download::download_archive(&self.download_client, &request.build_file_url).await?;

        let swap_result = {
            let _guard = self.swap_lock.lock().await;
            let swapper = Arc::clone(&self.swapper);
            let archive = archive_path.clone();
            tokio::task::spawn_blocking(move || swapper.swap(&archive))
                .await
                .map_err(|e| {
                    ThemeError::Io(std::io::Error::new(std::io::ErrorKind::Other, e))
                })?
        };

        if let Err(e) = tokio::fs::remove_file(&archive_path).await {
            warn!(path = %archive_path.display(), error = %e, "Failed to remove theme archive");
        }
        swap_result?;

        // 切换已成功；记录和映射失败不回滚文件，只告警
        let outcome = self.record_applied_theme(request).await;
        self.refresh_mappings(&request.theme_id).await;

        info!(
            theme_id = %request.theme_id,
            version = %request.theme_version,
            is_update = outcome.is_update,
            "Theme applied"
        );
        Ok(outcome)
    }

    /// 把安装结果写进站点设置，失败时降级为告警
    async fn record_applied_theme(&self, request: &ApplyRequest) -> ApplyOutcome {
        let mut settings = match self.settings.get_or_create().await {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "Failed to load settings after theme swap");
                return ApplyOutcome {
                    is_update: false,
                    old_version: None,
                    new_version: request.theme_version.clone(),
                };
            }
        };

        let is_update = settings.current_theme_id == request.theme_id
            && !settings.current_theme_version.is_empty();
        let old_version = is_update.then(|| settings.current_theme_version.clone());

        settings.current_theme_id = request.theme_id.clone();
        settings.current_theme_version = request.theme_version.clone();

        if let Err(e) = self.settings.save(&settings).await {
            warn!(error = %e, "Failed to save settings after theme swap");
        }

        ApplyOutcome {
            is_update,
            old_version,
            new_version: request.theme_version.clone(),
        }
    }

    /// 按新主题的清单维护状态映射，失败时降级为告警
    async fn refresh_mappings(&self, theme_id: &str) {
        let manifest = match manifest::load_manifest(self.swapper.active_dir()) {
            Ok(m) => m,
            Err(e) => {
                warn!(theme_id = %theme_id, error = %e, "Theme manifest unavailable, skipping mappings");
                return;
            }
        };

        if let Err(e) = mapping::ensure_default_statuses(&self.statuses, theme_id, &manifest).await
        {
            warn!(theme_id = %theme_id, error = %e, "Failed to seed default statuses");
        }
        if let Err(e) = mapping::ensure_mappings(&self.statuses, theme_id, &manifest).await {
            warn!(theme_id = %theme_id, error = %e, "Failed to ensure status mappings");
        }
    }

    /// 按站点设置里记录的身份重新下载并安装主题
    pub async fn redownload(&self) -> ThemeResult<RedownloadOutcome> {
        let settings = self
            .settings
            .get_or_create()
            .await
            .map_err(|e| ThemeError::Settings(e.to_string()))?;

        if !settings.has_theme() {
            return Err(ThemeError::NoThemeInstalled);
        }

        let record = self.store.fetch_theme(&settings.current_theme_id).await?;
        let build_file_url = self.store.build_file_url(&record)?;

        // 版本以本地记录为准，记录缺失时退回商店版本
        let version = if settings.current_theme_version.is_empty() {
            record.version.clone()
        } else {
            settings.current_theme_version.clone()
        };

        self.apply(&ApplyRequest {
            theme_id: record.id.clone(),
            theme_version: version.clone(),
            build_file_url,
            min_app_version: None,
        })
        .await?;

        Ok(RedownloadOutcome {
            theme_id: record.id,
            theme_name: record.name,
            version,
        })
    }

    /// 启动引导
    ///
    /// 已有主题文件时只做状态对账；没有时从商店安装默认主题，
    /// 带退避重试。引导失败不应让进程退出，调用方告警即可。
    pub async fn bootstrap(&self) -> ThemeResult<()> {
        if self.theme_files_present() {
            self.reconcile_existing_theme().await;
            return Ok(());
        }

        // 文件丢了但设置还记着主题：清掉陈旧记录再重新安装
        if let Ok(mut settings) = self.settings.get_or_create().await {
            if settings.has_theme() {
                warn!(
                    theme_id = %settings.current_theme_id,
                    "Theme files missing, clearing stale record"
                );
                settings.clear_theme();
                if let Err(e) = self.settings.save(&settings).await {
                    warn!(error = %e, "Failed to clear stale theme record");
                }
            }
        }

        let mut last_error = None;
        let mut delay = Duration::from_secs(BOOTSTRAP_BASE_DELAY_SECS);
        for attempt in 1..=BOOTSTRAP_MAX_ATTEMPTS {
            if attempt > 1 {
                tokio::time::sleep(delay).await;
                delay *= 2;
            }

            match self.install_default_theme().await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(
                        attempt = attempt,
                        max_attempts = BOOTSTRAP_MAX_ATTEMPTS,
                        error = %e,
                        "Default theme installation failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        let err = last_error.unwrap_or_else(|| {
            ThemeError::Store("default theme installation failed".to_string())
        });
        error!(error = %err, "Bootstrap exhausted all attempts");
        Err(err)
    }

    /// 主题文件已在：补齐设置记录并对账状态映射
    async fn reconcile_existing_theme(&self) {
        let Ok(mut settings) = self.settings.get_or_create().await else {
            warn!("Failed to load settings during bootstrap");
            return;
        };

        if !settings.has_theme() {
            // 文件在而记录空（比如设置文件被删过），按清单补一条占位记录
            match manifest::load_manifest(self.swapper.active_dir()) {
                Ok(m) => {
                    settings.current_theme_id = "existing".to_string();
                    settings.current_theme_version = m.version.clone();
                }
                Err(_) => {
                    settings.current_theme_id = "existing".to_string();
                    settings.current_theme_version = "unknown".to_string();
                }
            }
            if let Err(e) = self.settings.save(&settings).await {
                warn!(error = %e, "Failed to record existing theme");
            }
        }

        if let Ok(m) = manifest::load_manifest(self.swapper.active_dir()) {
            if let Err(e) =
                mapping::ensure_mappings(&self.statuses, &settings.current_theme_id, &m).await
            {
                warn!(error = %e, "Failed to reconcile status mappings");
            }
        }

        info!(
            theme_id = %settings.current_theme_id,
            "Existing theme found, skipping bootstrap install"
        );
    }

    async fn install_default_theme(&self) -> ThemeResult<()> {
        let record = self
            .store
            .find_default_theme(self.environment)
            .await?
            .ok_or_else(|| {
                ThemeError::Store("no default theme found in theme store".to_string())
            })?;

        let build_file_url = self.store.build_file_url(&record)?;
        self.apply(&ApplyRequest {
            theme_id: record.id.clone(),
            theme_version: record.version.clone(),
            build_file_url,
            min_app_version: None,
        })
        .await?;

        info!(
            theme_id = %record.id,
            version = %record.version,
            "Default theme installed"
        );
        Ok(())
    }
}

/// 当前版本是否满足主题要求的最低版本
///
/// 两边都解析为三段数字再逐段比较，解析失败的段按 0 处理
pub fn is_version_compatible(current: &str, minimum: &str) -> bool {
    parse_version(current) >= parse_version(minimum)
}

/// 解析版本号为三段数字
///
/// 接受 `v` 前缀，每段取数字前缀（`0-beta` 按 0），不足三段补零
fn parse_version(version: &str) -> [u32; 3] {
    let trimmed = version.trim().trim_start_matches('v');
    let mut parts = [0u32; 3];

    for (index, part) in trimmed.split('.').take(3).enumerate() {
        let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
        parts[index] = digits.parse().unwrap_or(0);
    }

    parts
}
