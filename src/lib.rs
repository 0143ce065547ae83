// Puschelz Client - Library Root
//
// 监听 Puschelz 插件的 SavedVariables，解析后同步到公会网站

pub mod config;
pub mod locate;
pub mod lua;
pub mod schema;
pub mod sync;
pub mod utils;
pub mod watcher;

// 重新导出常用类型
pub use config::{ConfigStore, JsonConfigStore, SyncConfig};
pub use locate::{CommonPathDetector, SavedVariablesLocator, SavedVariablesResolver};
pub use schema::{parse_saved_variables, ParsedDatabase};
pub use sync::{SyncDispatcher, SyncError, SyncOutcome, SyncService};
pub use watcher::{AddonWatcher, SyncStatus, WatchError, WatchState};
