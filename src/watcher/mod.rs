//! 文件监听模块
//!
//! 监听 SavedVariables 文件，变更经过防抖后触发同步，并广播状态变化。
//!
//! - debounce: 尾沿防抖循环
//! - status: 状态快照与广播

pub mod debounce;
pub mod status;

pub use debounce::{run_debounce, WatchEvent, DEBOUNCE_DELAY};
pub use status::{StatusHub, SyncStatus, WatchState};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::locate::SavedVariablesLocator;
use crate::sync::{SyncError, SyncOutcome, SyncService};

const INITIAL_SYNC: &str = "Initial sync";
const MANUAL_SYNC: &str = "Manual sync";
const CHANGE_SYNC: &str = "Detected SavedVariables change";

// ═══════════════════════════════════════════════════════════════════
// 错误
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Could not locate Puschelz.lua under the configured WoW path ({wow_path})")]
    FileNotFound { wow_path: String },

    #[error("File watcher error: {0}")]
    Notify(#[from] notify::Error),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

// ═══════════════════════════════════════════════════════════════════
// AddonWatcher
// ═══════════════════════════════════════════════════════════════════

/// 正在进行的监听
struct ActiveWatch {
    file: PathBuf,
    /// 持有 watcher，drop 即停止监听
    _watcher: RecommendedWatcher,
    shutdown: oneshot::Sender<()>,
}

/// SavedVariables 监听器
///
/// 同步服务放在 `tokio::sync::Mutex` 后面，手动同步和防抖触发的同步依次执行。
pub struct AddonWatcher {
    locator: Arc<dyn SavedVariablesLocator>,
    service: Arc<tokio::sync::Mutex<SyncService>>,
    status: Arc<StatusHub>,
    active: Mutex<Option<ActiveWatch>>,
    delay: Duration,
}

impl AddonWatcher {
    pub fn new(locator: Arc<dyn SavedVariablesLocator>, service: SyncService) -> Self {
        Self {
            locator,
            service: Arc::new(tokio::sync::Mutex::new(service)),
            status: Arc::new(StatusHub::new()),
            active: Mutex::new(None),
            delay: DEBOUNCE_DELAY,
        }
    }

    /// 自定义防抖延迟
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn active(&self) -> MutexGuard<'_, Option<ActiveWatch>> {
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 当前状态快照
    pub fn status(&self) -> SyncStatus {
        self.status.current()
    }

    /// 订阅状态变化
    pub fn subscribe(&self) -> broadcast::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    /// 正在监听的文件
    pub fn watched_file(&self) -> Option<PathBuf> {
        self.active().as_ref().map(|watch| watch.file.clone())
    }

    pub fn is_watching(&self) -> bool {
        self.active().is_some()
    }

    /// 开始监听
    ///
    /// 定位文件、注册监听并执行一次初始同步。初始同步失败只会发布 Error 状态，
    /// 监听本身保持有效。
    pub async fn start(&self, config: &SyncConfig) -> Result<PathBuf, WatchError> {
        let previous = self.teardown();

        let Some(file) = self.locator.locate(&config.wow_path) else {
            let err = WatchError::FileNotFound {
                wow_path: config.wow_path.clone(),
            };
            self.status.watch_failed(err.to_string());
            return Err(err);
        };

        if previous.as_deref() != Some(file.as_path()) {
            self.service.lock().await.reset();
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let watcher = match watch_file(&file, tx) {
            Ok(watcher) => watcher,
            Err(e) => {
                self.status.watch_failed(e.to_string());
                return Err(e);
            }
        };

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        self.spawn_debounce(rx, shutdown_rx, &file, config);

        *self.active() = Some(ActiveWatch {
            file: file.clone(),
            _watcher: watcher,
            shutdown: shutdown_tx,
        });

        info!(file = %file.display(), "watching SavedVariables");
        self.status.watching(&file);

        // 失败已经发布为 Error 状态
        let _ = run_sync(&self.service, &self.status, &file, config, INITIAL_SYNC).await;

        Ok(file)
    }

    /// 立即同步一次；未在监听时先定位文件
    pub async fn sync_now(&self, config: &SyncConfig) -> Result<SyncOutcome, WatchError> {
        let file = match self.watched_file() {
            Some(file) => file,
            None => self.locator.locate(&config.wow_path).ok_or_else(|| {
                let err = WatchError::FileNotFound {
                    wow_path: config.wow_path.clone(),
                };
                self.status.error(err.to_string());
                err
            })?,
        };

        let outcome = run_sync(&self.service, &self.status, &file, config, MANUAL_SYNC).await?;
        Ok(outcome)
    }

    /// 停止监听；已经停止时什么都不做
    ///
    /// 正在进行的同步请求不会被中断。
    pub fn stop(&self) {
        if let Some(file) = self.teardown() {
            info!(file = %file.display(), "stopped watching");
            self.status.idle();
        }
    }

    /// 取下当前监听并通知防抖任务退出，返回原来监听的文件
    fn teardown(&self) -> Option<PathBuf> {
        let watch = self.active().take()?;
        let _ = watch.shutdown.send(());
        Some(watch.file)
    }

    fn spawn_debounce(
        &self,
        events: mpsc::UnboundedReceiver<WatchEvent>,
        shutdown: oneshot::Receiver<()>,
        file: &Path,
        config: &SyncConfig,
    ) {
        let service = self.service.clone();
        let status = self.status.clone();
        let error_status = self.status.clone();
        let file = file.to_path_buf();
        let config = config.clone();

        tokio::spawn(run_debounce(
            events,
            shutdown,
            self.delay,
            move || {
                let service = service.clone();
                let status = status.clone();
                let file = file.clone();
                let config = config.clone();
                async move {
                    let _ = run_sync(&service, &status, &file, &config, CHANGE_SYNC).await;
                }
            },
            move |message| {
                warn!(error = %message, "file watcher error");
                error_status.error(format!("File watcher error: {}", message));
            },
        ));
    }
}

impl Drop for AddonWatcher {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// 执行一轮同步并发布状态
async fn run_sync(
    service: &tokio::sync::Mutex<SyncService>,
    status: &StatusHub,
    file: &Path,
    config: &SyncConfig,
    reason: &str,
) -> Result<SyncOutcome, SyncError> {
    let mut service = service.lock().await;
    status.syncing(reason);

    match service.sync_file(file, config).await {
        Ok(outcome) => {
            debug!(?outcome, reason, "sync finished");
            status.synced(outcome);
            Ok(outcome)
        }
        Err(e) => {
            warn!(error = %e, reason, "sync failed");
            status.error(e.to_string());
            Err(e)
        }
    }
}

/// 在文件所在目录上注册监听，只转发目标文件的事件
///
/// 监听目录而不是文件本身，游戏用替换方式写文件时也能收到事件。
fn watch_file(
    file: &Path,
    tx: mpsc::UnboundedSender<WatchEvent>,
) -> Result<RecommendedWatcher, WatchError> {
    let target = file.file_name().map(|name| name.to_os_string());
    let dir = file
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
        let event = match result {
            Ok(event) => event,
            Err(e) => {
                let _ = tx.send(WatchEvent::Error(e.to_string()));
                return;
            }
        };

        if matches!(event.kind, EventKind::Access(_)) {
            return;
        }

        let touches_target = event
            .paths
            .iter()
            .any(|path| path.file_name() == target.as_deref());
        if touches_target {
            let _ = tx.send(WatchEvent::Changed);
        }
    })?;

    watcher.watch(dir, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}
