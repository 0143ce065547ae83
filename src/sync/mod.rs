//! 同步模块
//!
//! - gate: 内容指纹，未变化时跳过
//! - dispatcher: 发送 guildBank / calendar 两个批次
//! - service: 串起读取、解析、发送和提交

pub mod dispatcher;
pub mod error;
pub mod gate;
pub mod service;

// 重导出
pub use dispatcher::{resolve_sync_url, SyncBatch, SyncDispatcher, SYNC_PATH};
pub use error::SyncError;
pub use gate::ChangeGate;
pub use service::{SyncOutcome, SyncService};
