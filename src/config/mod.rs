//! 同步配置
//!
//! `SyncConfig` 对应设置文件 `config.json`：
//!
//! ```json
//! { "endpointUrl": "https://puschelz.de", "apiToken": "pz_...", "wowPath": "C:/World of Warcraft" }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::locate::InstallPathDetector;
use crate::utils::{file_exists, read_json, write_json};

/// 默认同步站点
pub const DEFAULT_ENDPOINT_URL: &str = "https://puschelz.de";

/// 设置目录名（与桌面客户端共用）
const CONFIG_DIR_NAME: &str = "Puschelz Client";
const CONFIG_FILE_NAME: &str = "config.json";

fn default_endpoint_url() -> String {
    DEFAULT_ENDPOINT_URL.to_string()
}

/// 同步配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    #[serde(default = "default_endpoint_url")]
    pub endpoint_url: String,

    #[serde(default)]
    pub api_token: String,

    #[serde(default)]
    pub wow_path: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            endpoint_url: default_endpoint_url(),
            api_token: String::new(),
            wow_path: String::new(),
        }
    }
}

impl SyncConfig {
    /// 发送同步请求所需但缺失的设置
    pub fn missing_sync_settings(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.endpoint_url.trim().is_empty() {
            missing.push("endpoint URL");
        }
        if self.api_token.trim().is_empty() {
            missing.push("API token");
        }
        missing
    }

    /// 启动监听所需但缺失的设置（额外需要 WoW 路径）
    pub fn missing_settings(&self) -> Vec<&'static str> {
        let mut missing = self.missing_sync_settings();
        if self.wow_path.trim().is_empty() {
            missing.push("WoW path");
        }
        missing
    }

    /// 填充默认值：空的 endpoint 使用默认站点，空的 WoW 路径尝试自动检测
    ///
    /// 返回是否有字段被修改。
    pub fn apply_defaults(&mut self, detector: &dyn InstallPathDetector) -> bool {
        let mut changed = false;

        if self.endpoint_url.is_empty() {
            self.endpoint_url = default_endpoint_url();
            changed = true;
        }

        if self.wow_path.is_empty() {
            if let Some(detected) = detector.detect() {
                tracing::info!(path = %detected.display(), "detected WoW install path");
                self.wow_path = detected.display().to_string();
                changed = true;
            }
        }

        changed
    }

    /// 用于显示的 token（只保留前 4 个字符）
    pub fn masked_token(&self) -> String {
        mask_token(&self.api_token)
    }
}

/// 遮蔽 token，只保留前缀
pub fn mask_token(token: &str) -> String {
    let token = token.trim();
    if token.is_empty() {
        return "(not set)".to_string();
    }

    let prefix: String = token.chars().take(4).collect();
    if token.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{}****", prefix)
    }
}

// ═══════════════════════════════════════════════════════════════════
// 持久化
// ═══════════════════════════════════════════════════════════════════

/// 配置存储
pub trait ConfigStore: Send + Sync {
    /// 读取配置；文件不存在或损坏时返回默认值
    fn load(&self) -> Result<SyncConfig>;

    fn save(&self, config: &SyncConfig) -> Result<()>;
}

/// 基于 JSON 文件的配置存储
#[derive(Debug, Clone)]
pub struct JsonConfigStore {
    path: PathBuf,
}

impl JsonConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 默认位置：`<config_dir>/Puschelz Client/config.json`
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;
        Ok(config_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    pub fn at_default_location() -> Result<Self> {
        Ok(Self::new(Self::default_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for JsonConfigStore {
    fn load(&self) -> Result<SyncConfig> {
        if !file_exists(&self.path) {
            return Ok(SyncConfig::default());
        }

        match read_json(&self.path) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::warn!("{:#}; using default settings", e);
                Ok(SyncConfig::default())
            }
        }
    }

    fn save(&self, config: &SyncConfig) -> Result<()> {
        write_json(&self.path, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    struct FixedDetector(Option<PathBuf>);

    impl InstallPathDetector for FixedDetector {
        fn detect(&self) -> Option<PathBuf> {
            self.0.clone()
        }
    }

    #[test]
    fn test_missing_settings_lists_every_field() {
        let config = SyncConfig {
            endpoint_url: "  ".to_string(),
            api_token: String::new(),
            wow_path: String::new(),
        };
        assert_eq!(config.missing_sync_settings(), vec!["endpoint URL", "API token"]);
        assert_eq!(
            config.missing_settings(),
            vec!["endpoint URL", "API token", "WoW path"]
        );

        let complete = SyncConfig {
            api_token: "pz_abc".to_string(),
            wow_path: "C:/World of Warcraft".to_string(),
            ..SyncConfig::default()
        };
        assert!(complete.missing_settings().is_empty());
    }

    #[test]
    fn test_apply_defaults() {
        let mut config = SyncConfig {
            endpoint_url: String::new(),
            api_token: "pz_abc".to_string(),
            wow_path: String::new(),
        };
        let detector = FixedDetector(Some(PathBuf::from("/games/wow")));

        assert!(config.apply_defaults(&detector));
        assert_eq!(config.endpoint_url, DEFAULT_ENDPOINT_URL);
        assert_eq!(config.wow_path, PathBuf::from("/games/wow").display().to_string());

        // 已填写的字段不会被覆盖
        assert!(!config.apply_defaults(&FixedDetector(Some(PathBuf::from("/other")))));
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("pz_abcdef"), "pz_a****");
        assert_eq!(mask_token("abc"), "****");
        assert_eq!(mask_token(""), "(not set)");
    }

    #[test]
    fn test_store_round_trip() {
        let temp = TempDir::new().unwrap();
        let store = JsonConfigStore::new(temp.path().join("Puschelz Client/config.json"));

        let config = SyncConfig {
            endpoint_url: "https://puschelz.de".to_string(),
            api_token: "pz_abc".to_string(),
            wow_path: "C:/World of Warcraft".to_string(),
        };
        store.save(&config).unwrap();

        assert_eq!(store.load().unwrap(), config);

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"apiToken\": \"pz_abc\""));
    }

    #[test]
    fn test_store_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        let store = JsonConfigStore::new(&path);

        // 文件不存在
        assert_eq!(store.load().unwrap(), SyncConfig::default());

        // 字段缺失
        fs::write(&path, r#"{ "apiToken": "pz_partial" }"#).unwrap();
        let config = store.load().unwrap();
        assert_eq!(config.endpoint_url, DEFAULT_ENDPOINT_URL);
        assert_eq!(config.api_token, "pz_partial");

        // 文件损坏
        fs::write(&path, "not json").unwrap();
        assert_eq!(store.load().unwrap(), SyncConfig::default());
    }
}
