//! 同步流程
//!
//! 读取文件 → 指纹比对 → 解析 → 投影 → 发送 → 提交指纹

use std::path::Path;
use tracing::{debug, info};

use super::dispatcher::SyncDispatcher;
use super::error::SyncError;
use super::gate::ChangeGate;
use crate::config::SyncConfig;
use crate::schema::parse_saved_variables;

/// 一轮同步的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// 两个批次都已发送
    Synced,
    /// 内容与上次成功同步时相同，未发送
    Unchanged,
}

/// 同步服务
#[derive(Debug)]
pub struct SyncService {
    gate: ChangeGate,
    dispatcher: SyncDispatcher,
}

impl SyncService {
    pub fn new(dispatcher: SyncDispatcher) -> Self {
        Self {
            gate: ChangeGate::new(),
            dispatcher,
        }
    }

    /// 同步一个 SavedVariables 文件
    pub async fn sync_file(
        &mut self,
        path: &Path,
        config: &SyncConfig,
    ) -> Result<SyncOutcome, SyncError> {
        let missing = config.missing_sync_settings();
        if !missing.is_empty() {
            return Err(SyncError::config(missing));
        }

        let raw = tokio::fs::read(path).await.map_err(|source| SyncError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        if !self.gate.should_sync(&raw) {
            debug!(file = %path.display(), "content unchanged, skipping sync");
            return Ok(SyncOutcome::Unchanged);
        }

        let source = String::from_utf8_lossy(&raw);
        let db = parse_saved_variables(&source)?;

        self.dispatcher.dispatch(&db, config).await?;
        self.gate.commit(&raw);

        info!(
            file = %path.display(),
            tabs = db.guild_bank.tabs.len(),
            events = db.calendar.events.len(),
            "SavedVariables synced"
        );
        Ok(SyncOutcome::Synced)
    }

    /// 清除指纹，下一轮必定发送
    pub fn reset(&mut self) {
        self.gate.reset();
    }

    pub fn gate(&self) -> &ChangeGate {
        &self.gate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn service() -> SyncService {
        SyncService::new(SyncDispatcher::new().unwrap())
    }

    fn config() -> SyncConfig {
        SyncConfig {
            api_token: "pz_test".to_string(),
            ..SyncConfig::default()
        }
    }

    #[tokio::test]
    async fn test_missing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("Puschelz.lua");

        let err = service().sync_file(&path, &config()).await.unwrap_err();
        assert!(matches!(err, SyncError::Io { .. }));
    }

    #[tokio::test]
    async fn test_parse_failure_leaves_gate_open() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("Puschelz.lua");
        fs::write(&path, "-- nothing here").unwrap();

        let mut service = service();
        let err = service.sync_file(&path, &config()).await.unwrap_err();
        assert!(matches!(err, SyncError::Parse(_)));
        assert_eq!(service.gate().last_fingerprint(), None);
    }

    #[tokio::test]
    async fn test_settings_checked_before_reading() {
        let mut service = service();
        let err = service
            .sync_file(Path::new("/does/not/exist.lua"), &SyncConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Config { .. }));
    }
}
