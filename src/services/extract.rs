//! 安全解压与构建目录定位
//!
//! 压缩包先解压到隔离的 staging 目录，每个条目做路径穿越检查，
//! 然后按目录形状启发式定位真正的构建根

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use crate::error::{ThemeError, ThemeResult};

/// 合格构建目录的名称
const BUILD_DIR_NAMES: [&str; 2] = ["build", "dist"];

/// 完整静态构建的标志条目，命中任意一个即可
const BUILD_MARKERS: [&str; 3] = ["index.html", "_app", "assets"];

/// 把压缩包完整解压到 staging 目录
///
/// staging 目录总是先被清空（解压是破坏性替换，不做合并）。
/// 每个条目解析后的路径必须留在 staging 内部，否则以 `PathTraversal`
/// 失败且不会写任何越界文件。目录条目按记录的权限位创建。
pub fn unpack_archive(archive_path: &Path, staging_dir: &Path) -> ThemeResult<()> {
    if staging_dir.exists() {
        fs::remove_dir_all(staging_dir)?;
    }
    fs::create_dir_all(staging_dir)?;

    let file = fs::File::open(archive_path)?;
    let mut archive = ZipArchive::new(file)?;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;

        // 安全检查：enclosed_name 过滤 `..`、绝对路径和盘符前缀
        let Some(relative) = entry.enclosed_name() else {
            return Err(ThemeError::PathTraversal {
                entry: entry.name().to_string(),
            });
        };
        if relative.as_os_str().is_empty() {
            continue;
        }

        let target = staging_dir.join(&relative);
        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            set_unix_mode(&target, entry.unix_mode())?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = fs::File::create(&target)?;
            io::copy(&mut entry, &mut out)?;
            set_unix_mode(&target, entry.unix_mode())?;
        }
    }

    Ok(())
}

#[cfg(unix)]
fn set_unix_mode(path: &Path, mode: Option<u32>) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    if let Some(mode) = mode {
        if mode != 0 {
            fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn set_unix_mode(_path: &Path, _mode: Option<u32>) -> io::Result<()> {
    Ok(())
}

/// 在解压出的目录树里定位构建根
///
/// 深度优先字典序遍历，目录名是 `build`/`dist` 且包含标志条目即命中，
/// 命中后不再深入该子树。整棵树都不命中时回退检查 staging 根自身。
pub fn find_build_root(root: &Path) -> ThemeResult<PathBuf> {
    if let Some(found) = walk_for_build_dir(root)? {
        return Ok(found);
    }

    if has_build_markers(root) {
        return Ok(root.to_path_buf());
    }

    Err(ThemeError::NoBuildDirectory)
}

fn walk_for_build_dir(dir: &Path) -> ThemeResult<Option<PathBuf>> {
    let mut children: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    children.sort();

    for child in children {
        let name = child.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if BUILD_DIR_NAMES.contains(&name) && has_build_markers(&child) {
            return Ok(Some(child));
        }
        if let Some(found) = walk_for_build_dir(&child)? {
            return Ok(Some(found));
        }
    }

    Ok(None)
}

/// 目录是否包含完整静态构建的标志条目
pub fn has_build_markers(dir: &Path) -> bool {
    BUILD_MARKERS.iter().any(|marker| dir.join(marker).exists())
}

/// 递归复制 `src` 的内容到 `dst`（不含 `src` 目录本身）
///
/// `fs::copy` 会保留文件权限位
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;
    for item in fs::read_dir(src)? {
        let entry = item?;
        let source_path = entry.path();
        let dest_path = dst.join(entry.file_name());
        if source_path.is_dir() {
            copy_dir_recursive(&source_path, &dest_path)?;
        } else {
            fs::copy(&source_path, &dest_path)?;
        }
    }
    Ok(())
}
