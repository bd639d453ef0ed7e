//! Theme Agent - 主题安装与状态映射代理
//!
//! 从主题商店下载构建包，安全解压后原子切换到激活目录，
//! 并把用户自定义状态映射到主题声明的分类词汇表上

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod infra;
pub mod middleware;
pub mod services;
pub mod state;

use std::sync::Arc;

use tracing::{info, warn};

pub use config::RuntimeConfig;
use state::{get_shutdown_token, trigger_shutdown, AppState};

/// 初始化日志
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

/// 初始化并运行服务
pub async fn init_and_run(runtime: RuntimeConfig) -> anyhow::Result<()> {
    init_tracing();

    let state = Arc::new(AppState::new(&runtime));

    // 引导失败不阻止服务启动，之后可以通过 API 手动安装
    if let Err(e) = state.lifecycle.bootstrap().await {
        warn!(error = %e, "Theme bootstrap failed, continuing without theme");
    }

    let app = api::router(Arc::clone(&state));

    let addr = format!("0.0.0.0:{}", state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Theme agent listening");

    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            trigger_shutdown();
        }
    });

    let shutdown = get_shutdown_token();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("Theme agent stopped");
    Ok(())
}
