//! 同步状态
//!
//! 当前状态保存在 [`StatusHub`] 中，每次变化同时广播快照给订阅者。

use chrono::{Local, TimeZone, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::broadcast;

use crate::sync::SyncOutcome;

/// 广播缓冲区大小，落后的订阅者会丢失较旧的快照
const STATUS_CHANNEL_CAPACITY: usize = 64;

/// 监听状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchState {
    #[default]
    Idle,
    Watching,
    Syncing,
    Error,
}

impl WatchState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchState::Idle => "idle",
            WatchState::Watching => "watching",
            WatchState::Syncing => "syncing",
            WatchState::Error => "error",
        }
    }
}

/// 状态快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub state: WatchState,
    pub detail: String,
    /// 上次成功同步时间（毫秒时间戳）
    pub last_synced_at: Option<i64>,
    pub watched_file: Option<PathBuf>,
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self {
            state: WatchState::Idle,
            detail: "Not watching".to_string(),
            last_synced_at: None,
            watched_file: None,
        }
    }
}

impl SyncStatus {
    /// 单行描述，例如 `Watching SavedVariables (last synced 20:15:03)`
    pub fn label(&self) -> String {
        let last_synced = self
            .last_synced_at
            .and_then(|ms| Local.timestamp_millis_opt(ms).single());

        match last_synced {
            Some(at) => format!("{} (last synced {})", self.detail, at.format("%H:%M:%S")),
            None => self.detail.clone(),
        }
    }
}

/// 状态中心
#[derive(Debug)]
pub struct StatusHub {
    current: Mutex<SyncStatus>,
    tx: broadcast::Sender<SyncStatus>,
}

impl Default for StatusHub {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        Self {
            current: Mutex::new(SyncStatus::default()),
            tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SyncStatus> {
        self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn current(&self) -> SyncStatus {
        self.lock().clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncStatus> {
        self.tx.subscribe()
    }

    /// 修改状态并广播新快照
    pub fn update(&self, apply: impl FnOnce(&mut SyncStatus)) -> SyncStatus {
        let snapshot = {
            let mut status = self.lock();
            apply(&mut status);
            status.clone()
        };
        // 没有订阅者时 send 会失败，忽略即可
        let _ = self.tx.send(snapshot.clone());
        snapshot
    }

    pub fn watching(&self, file: &Path) -> SyncStatus {
        self.update(|status| {
            status.state = WatchState::Watching;
            status.detail = "Watching SavedVariables".to_string();
            status.watched_file = Some(file.to_path_buf());
        })
    }

    pub fn syncing(&self, detail: &str) -> SyncStatus {
        self.update(|status| {
            status.state = WatchState::Syncing;
            status.detail = detail.to_string();
        })
    }

    pub fn synced(&self, outcome: SyncOutcome) -> SyncStatus {
        self.update(|status| {
            status.state = if status.watched_file.is_some() {
                WatchState::Watching
            } else {
                WatchState::Idle
            };
            match outcome {
                SyncOutcome::Synced => {
                    status.detail = "Last synced just now".to_string();
                    status.last_synced_at = Some(Utc::now().timestamp_millis());
                }
                SyncOutcome::Unchanged => {
                    status.detail = "No changes since last sync".to_string();
                }
            }
        })
    }

    pub fn error(&self, message: impl Into<String>) -> SyncStatus {
        let message = message.into();
        self.update(|status| {
            status.state = WatchState::Error;
            status.detail = message;
        })
    }

    /// 监听失败：记录错误并清除监听文件
    pub fn watch_failed(&self, message: impl Into<String>) -> SyncStatus {
        let message = message.into();
        self.update(|status| {
            status.state = WatchState::Error;
            status.detail = message;
            status.watched_file = None;
        })
    }

    pub fn idle(&self) -> SyncStatus {
        self.update(|status| {
            status.state = WatchState::Idle;
            status.detail = "Not watching".to_string();
            status.watched_file = None;
        })
    }
}
