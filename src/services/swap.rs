//! 部署目录切换
//!
//! 新构建先在激活目录旁边完整 staging，然后整目录 rename 进位：
//! 旧目录 rename 成备份，staging 目录 rename 成激活目录。
//! 激活目录在任何时刻要么是旧的完整构建，要么是新的完整构建，
//! 不存在半写状态。

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::error::{ThemeError, ThemeResult};

use super::extract;

/// 部署切换器
///
/// 切换期间独占激活目录和备份目录；调用方负责串行化并发切换
pub struct DeploymentSwapper {
    active_dir: PathBuf,
}

impl DeploymentSwapper {
    pub fn new(active_dir: PathBuf) -> Self {
        Self { active_dir }
    }

    /// 当前激活的部署目录
    pub fn active_dir(&self) -> &Path {
        &self.active_dir
    }

    /// 备份目录（激活目录的兄弟目录）
    pub fn backup_dir(&self) -> PathBuf {
        self.active_dir.with_file_name("backup")
    }

    /// 解压用的隔离目录
    fn unpack_dir(&self) -> PathBuf {
        self.sibling("_unpack")
    }

    /// 完整 staging 后等待进位的目录
    fn stage_dir(&self) -> PathBuf {
        self.sibling("_stage")
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let name = self
            .active_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "current".to_string());
        self.active_dir.with_file_name(format!("{}{}", name, suffix))
    }

    /// 把压缩包切换为激活部署
    ///
    /// 返回后激活目录要么是新主题，要么是完整恢复的旧主题。
    /// 两个 staging 目录在成功和失败路径上都会被清理。
    pub fn swap(&self, archive_path: &Path) -> ThemeResult<()> {
        let result = self.stage_and_promote(archive_path);

        remove_dir_best_effort(&self.unpack_dir());
        remove_dir_best_effort(&self.stage_dir());

        result
    }

    fn stage_and_promote(&self, archive_path: &Path) -> ThemeResult<()> {
        let unpack_dir = self.unpack_dir();
        let stage_dir = self.stage_dir();
        let backup_dir = self.backup_dir();

        if let Some(parent) = self.active_dir.parent() {
            fs::create_dir_all(parent)?;
        }

        // 1. 解压到隔离目录并定位构建根；失败时激活目录还未被碰过
        extract::unpack_archive(archive_path, &unpack_dir)?;
        let build_root = extract::find_build_root(&unpack_dir)?;

        // 2. 把构建根的内容 staging 成最终形态
        if stage_dir.exists() {
            fs::remove_dir_all(&stage_dir)?;
        }
        extract::copy_dir_recursive(&build_root, &stage_dir)?;

        // 3. 旧目录 rename 让位成备份，先丢掉上一次残留的备份
        if backup_dir.exists() {
            fs::remove_dir_all(&backup_dir)?;
        }
        let had_previous = self.active_dir.exists();
        if had_previous {
            fs::rename(&self.active_dir, &backup_dir)?;
        }

        // 4. staging 目录 rename 进位
        if let Err(e) = fs::rename(&stage_dir, &self.active_dir) {
            let restored = if had_previous {
                match fs::rename(&backup_dir, &self.active_dir) {
                    Ok(()) => true,
                    Err(restore_err) => {
                        // 恢复失败要上报，但不掩盖原始错误
                        error!(
                            error = %restore_err,
                            "Failed to restore backup after promotion failure"
                        );
                        false
                    }
                }
            } else {
                true
            };

            return Err(ThemeError::Swap {
                source: Box::new(ThemeError::Io(e)),
                restored,
            });
        }

        // 5. 成功后丢弃备份
        if had_previous {
            if let Err(e) = fs::remove_dir_all(&backup_dir) {
                warn!(error = %e, "Failed to remove backup directory");
            }
        }

        info!(active = %self.active_dir.display(), "Theme promoted to active directory");
        Ok(())
    }
}

fn remove_dir_best_effort(dir: &Path) {
    if dir.exists() {
        if let Err(e) = fs::remove_dir_all(dir) {
            warn!(dir = %dir.display(), error = %e, "Failed to clean up staging directory");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn make_zip(dir: &Path, name: &str, entries: &[(&str, &str)]) -> PathBuf {
        let path = dir.join(name);
        let file = fs::File::create(&path).unwrap();
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default();
        for (entry_name, content) in entries {
            zip.start_file(*entry_name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
        path
    }

    /// 目录内容快照（相对路径 -> 文件内容）
    fn snapshot(dir: &Path) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        collect(dir, dir, &mut out);
        out
    }

    fn collect(root: &Path, dir: &Path, out: &mut BTreeMap<String, String>) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                collect(root, &path, out);
            } else {
                let rel = path.strip_prefix(root).unwrap().to_string_lossy().to_string();
                out.insert(rel, fs::read_to_string(&path).unwrap());
            }
        }
    }

    #[test]
    fn test_swap_installs_build_contents_at_top_level() {
        let dir = TempDir::new().unwrap();
        let active = dir.path().join("themes").join("current");
        let swapper = DeploymentSwapper::new(active.clone());

        let archive = make_zip(
            dir.path(),
            "theme.zip",
            &[
                ("pkg/build/index.html", "<html>v1</html>"),
                ("pkg/build/assets/app.js", "js"),
                ("pkg/README.md", "not part of the build"),
            ],
        );

        swapper.swap(&archive).unwrap();

        // 构建根的内容落在激活目录顶层，不带 build 目录本身
        assert_eq!(
            fs::read_to_string(active.join("index.html")).unwrap(),
            "<html>v1</html>"
        );
        assert!(active.join("assets/app.js").exists());
        assert!(!active.join("pkg").exists());
        assert!(!active.join("README.md").exists());

        // 临时目录和备份都不残留
        assert!(!swapper.unpack_dir().exists());
        assert!(!swapper.stage_dir().exists());
        assert!(!swapper.backup_dir().exists());
    }

    #[test]
    fn test_swap_replaces_previous_theme_completely() {
        let dir = TempDir::new().unwrap();
        let active = dir.path().join("themes").join("current");
        let swapper = DeploymentSwapper::new(active.clone());

        let old = make_zip(
            dir.path(),
            "old.zip",
            &[
                ("build/index.html", "<html>old</html>"),
                ("build/old-only.css", "old"),
            ],
        );
        swapper.swap(&old).unwrap();

        let new = make_zip(dir.path(), "new.zip", &[("build/index.html", "<html>new</html>")]);
        swapper.swap(&new).unwrap();

        assert_eq!(
            fs::read_to_string(active.join("index.html")).unwrap(),
            "<html>new</html>"
        );
        // 旧文件不残留（破坏性替换）
        assert!(!active.join("old-only.css").exists());
        assert!(!swapper.backup_dir().exists());
    }

    #[test]
    fn test_failed_swap_leaves_active_directory_untouched() {
        let dir = TempDir::new().unwrap();
        let active = dir.path().join("themes").join("current");
        let swapper = DeploymentSwapper::new(active.clone());

        let good = make_zip(
            dir.path(),
            "good.zip",
            &[
                ("build/index.html", "<html>good</html>"),
                ("build/assets/app.js", "js"),
            ],
        );
        swapper.swap(&good).unwrap();
        let before = snapshot(&active);

        // 没有构建目录的包：解压成功但定位失败
        let bad = make_zip(dir.path(), "bad.zip", &[("src/main.ts", "code")]);
        let result = swapper.swap(&bad);
        assert!(matches!(result, Err(ThemeError::NoBuildDirectory)));

        // 激活目录与切换前逐字节一致
        assert_eq!(snapshot(&active), before);
        assert!(!swapper.unpack_dir().exists());
        assert!(!swapper.stage_dir().exists());
    }

    #[test]
    fn test_traversal_archive_fails_without_touching_active() {
        let dir = TempDir::new().unwrap();
        let active = dir.path().join("themes").join("current");
        let swapper = DeploymentSwapper::new(active.clone());

        let good = make_zip(dir.path(), "good.zip", &[("build/index.html", "<html>v1</html>")]);
        swapper.swap(&good).unwrap();
        let before = snapshot(&active);

        let evil = make_zip(
            dir.path(),
            "evil.zip",
            &[("../../outside.txt", "bad"), ("build/index.html", "x")],
        );
        let result = swapper.swap(&evil);
        assert!(matches!(result, Err(ThemeError::PathTraversal { .. })));
        assert_eq!(snapshot(&active), before);
    }

    #[test]
    fn test_swap_without_previous_theme() {
        let dir = TempDir::new().unwrap();
        let active = dir.path().join("themes").join("current");
        let swapper = DeploymentSwapper::new(active.clone());

        // 没有旧主题时备份步骤是 no-op
        assert!(!active.exists());
        let archive = make_zip(dir.path(), "theme.zip", &[("build/index.html", "<html></html>")]);
        swapper.swap(&archive).unwrap();

        assert!(active.join("index.html").exists());
        assert!(!swapper.backup_dir().exists());
    }

    #[test]
    fn test_swap_is_idempotent_on_identical_input() {
        let dir = TempDir::new().unwrap();
        let active = dir.path().join("themes").join("current");
        let swapper = DeploymentSwapper::new(active.clone());

        let archive = make_zip(
            dir.path(),
            "theme.zip",
            &[
                ("build/index.html", "<html>v1</html>"),
                ("build/assets/app.js", "js"),
            ],
        );

        swapper.swap(&archive).unwrap();
        let first = snapshot(&active);
        swapper.swap(&archive).unwrap();
        assert_eq!(snapshot(&active), first);
    }
}
