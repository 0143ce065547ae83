//! SavedVariables 文件定位
//!
//! 在 WoW 安装目录下查找插件写出的 `Puschelz.lua`：
//!
//! - `{root}/_retail_/WTF/Account/*/SavedVariables/Puschelz.lua`
//! - `{root}/WTF/Account/*/SavedVariables/Puschelz.lua`
//!
//! 多个账号都有文件时，取修改时间最新的一个。

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::utils::{dir_exists, file_exists, modified_time};

/// 插件 SavedVariables 文件名
pub const SAVED_VARIABLES_FILE: &str = "Puschelz.lua";

/// 相对 WoW 根目录的账号目录
const ACCOUNT_ROOTS: [&str; 2] = ["_retail_/WTF/Account", "WTF/Account"];

/// Windows 上的常见安装位置
const COMMON_WINDOWS_PATHS: [&str; 2] = [
    "C:\\Program Files (x86)\\World of Warcraft",
    "C:\\Program Files\\World of Warcraft",
];

/// 判断 WoW 根目录的标志条目
const WOW_ROOT_MARKERS: [&str; 4] = ["_retail_", "WTF", "Data", "Launcher.exe"];

// ═══════════════════════════════════════════════════════════════════
// SavedVariables 定位
// ═══════════════════════════════════════════════════════════════════

/// SavedVariables 文件定位器
pub trait SavedVariablesLocator: Send + Sync {
    /// 根据配置的 WoW 路径定位文件，找不到时返回 None
    fn locate(&self, wow_path: &str) -> Option<PathBuf>;
}

/// 基于目录约定的默认定位器
#[derive(Debug, Clone, Copy, Default)]
pub struct SavedVariablesResolver;

impl SavedVariablesResolver {
    /// 列出所有候选文件（未排序）
    pub fn candidates(root: &Path) -> Vec<PathBuf> {
        ACCOUNT_ROOTS
            .iter()
            .map(|relative| root.join(relative))
            .filter(|accounts| dir_exists(accounts))
            .flat_map(|accounts| {
                WalkDir::new(accounts)
                    .min_depth(1)
                    .max_depth(1)
                    .into_iter()
                    .filter_map(|entry| entry.ok())
                    .filter(|entry| entry.file_type().is_dir())
                    .map(|entry| {
                        entry
                            .path()
                            .join("SavedVariables")
                            .join(SAVED_VARIABLES_FILE)
                    })
                    .filter(|candidate| file_exists(candidate))
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

impl SavedVariablesLocator for SavedVariablesResolver {
    fn locate(&self, wow_path: &str) -> Option<PathBuf> {
        let normalized = wow_path.trim();
        if normalized.is_empty() {
            return None;
        }

        // 直接指向文件
        let direct = PathBuf::from(normalized);
        if normalized.ends_with(SAVED_VARIABLES_FILE) && file_exists(&direct) {
            return Some(direct);
        }

        let mut ranked: Vec<_> = Self::candidates(&direct)
            .into_iter()
            .map(|file| (modified_time(&file), file))
            .collect();

        // 最新的排在最前面
        ranked.sort_by(|a, b| b.0.cmp(&a.0));
        ranked.into_iter().next().map(|(_, file)| file)
    }
}

// ═══════════════════════════════════════════════════════════════════
// 安装路径检测
// ═══════════════════════════════════════════════════════════════════

/// WoW 安装路径检测器
pub trait InstallPathDetector: Send + Sync {
    fn detect(&self) -> Option<PathBuf>;
}

/// 探测常见安装位置
#[derive(Debug, Clone)]
pub struct CommonPathDetector {
    candidates: Vec<PathBuf>,
}

impl Default for CommonPathDetector {
    fn default() -> Self {
        let candidates = if cfg!(windows) {
            COMMON_WINDOWS_PATHS.iter().map(PathBuf::from).collect()
        } else {
            Vec::new()
        };
        Self { candidates }
    }
}

impl CommonPathDetector {
    pub fn with_candidates(candidates: Vec<PathBuf>) -> Self {
        Self { candidates }
    }
}

impl InstallPathDetector for CommonPathDetector {
    fn detect(&self) -> Option<PathBuf> {
        self.candidates
            .iter()
            .find(|candidate| looks_like_wow_root(candidate))
            .cloned()
    }
}

/// 目录中是否存在 WoW 根目录的标志条目
pub fn looks_like_wow_root(candidate: &Path) -> bool {
    dir_exists(candidate)
        && WOW_ROOT_MARKERS
            .iter()
            .any(|marker| candidate.join(marker).exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn create_saved_variables(root: &Path, relative: &str, account: &str) -> PathBuf {
        let dir = root.join(relative).join(account).join("SavedVariables");
        fs::create_dir_all(&dir).unwrap();
        let file = dir.join(SAVED_VARIABLES_FILE);
        fs::write(&file, "PuschelzDB = {}").unwrap();
        file
    }

    fn set_mtime(path: &Path, time: SystemTime) {
        let file = fs::OpenOptions::new().write(true).open(path).unwrap();
        file.set_modified(time).unwrap();
    }

    #[test]
    fn test_locate_picks_newest() {
        let temp = TempDir::new().unwrap();
        let older = create_saved_variables(temp.path(), "_retail_/WTF/Account", "ACCOUNT1");
        let newer = create_saved_variables(temp.path(), "WTF/Account", "ACCOUNT2");

        let now = SystemTime::now();
        set_mtime(&older, now - Duration::from_secs(3600));
        set_mtime(&newer, now);

        let resolver = SavedVariablesResolver;
        let root = temp.path().display().to_string();
        assert_eq!(resolver.locate(&root), Some(newer.clone()));

        set_mtime(&older, now + Duration::from_secs(60));
        assert_eq!(resolver.locate(&root), Some(older));
    }

    #[test]
    fn test_locate_direct_file() {
        let temp = TempDir::new().unwrap();
        let file = create_saved_variables(temp.path(), "WTF/Account", "A");

        let resolver = SavedVariablesResolver;
        assert_eq!(resolver.locate(&file.display().to_string()), Some(file));
    }

    #[test]
    fn test_locate_nothing() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("WTF/Account/EMPTY/SavedVariables")).unwrap();

        let resolver = SavedVariablesResolver;
        assert_eq!(resolver.locate(&temp.path().display().to_string()), None);
        assert_eq!(resolver.locate("   "), None);
    }

    #[test]
    fn test_common_path_detector() {
        let temp = TempDir::new().unwrap();
        let not_wow = temp.path().join("Games");
        let wow = temp.path().join("World of Warcraft");
        fs::create_dir_all(&not_wow).unwrap();
        fs::create_dir_all(wow.join("_retail_")).unwrap();

        let detector = CommonPathDetector::with_candidates(vec![not_wow, wow.clone()]);
        assert_eq!(detector.detect(), Some(wow));

        let none = CommonPathDetector::with_candidates(vec![temp.path().join("missing")]);
        assert_eq!(none.detect(), None);
    }
}
