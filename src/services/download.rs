//! 主题构建包下载
//!
//! 把远程 ZIP 流式写入临时文件

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::error::{ThemeError, ThemeResult};

/// 下载构建包到临时文件，返回文件路径
///
/// 成功后临时文件归调用方所有，调用方必须在成功和失败两条路径上都删除它。
/// 非 2xx 状态码、网络错误和写盘错误都以 `Fetch` 失败，失败时临时文件已被清掉。
pub async fn download_archive(client: &reqwest::Client, url: &str) -> ThemeResult<PathBuf> {
    let mut response = client.get(url).send().await?;

    if !response.status().is_success() {
        return Err(ThemeError::Fetch(format!(
            "download failed with status {}",
            response.status()
        )));
    }

    let temp_path = std::env::temp_dir().join(format!(
        "theme-{}-{}.zip",
        std::process::id(),
        chrono::Utc::now().timestamp_millis()
    ));

    match stream_to_file(&mut response, &temp_path).await {
        Ok(size) => {
            info!(
                url = %url,
                path = %temp_path.display(),
                size = size,
                "Theme archive downloaded"
            );
            Ok(temp_path)
        }
        Err(e) => {
            // 半下载的文件对调用方没有意义，直接清掉
            let _ = fs::remove_file(&temp_path).await;
            Err(e)
        }
    }
}

async fn stream_to_file(response: &mut reqwest::Response, dest: &Path) -> ThemeResult<u64> {
    let mut file = fs::File::create(dest)
        .await
        .map_err(|e| ThemeError::Fetch(format!("failed to create temp file: {}", e)))?;

    let mut total: u64 = 0;
    while let Some(chunk) = response.chunk().await? {
        total += chunk.len() as u64;
        file.write_all(&chunk)
            .await
            .map_err(|e| ThemeError::Fetch(format!("failed to save file: {}", e)))?;
    }

    file.flush()
        .await
        .map_err(|e| ThemeError::Fetch(format!("failed to save file: {}", e)))?;

    Ok(total)
}
