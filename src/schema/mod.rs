//! SavedVariables Schema
//!
//! 将解码后的 Lua 表投影为同步 API 使用的强类型记录。

pub mod models;
pub mod projector;

// 重导出
pub use models::*;
pub use projector::project;

use crate::lua::{decode_source, ParseError};

/// 解析 SavedVariables 源码为 [`ParsedDatabase`]
pub fn parse_saved_variables(source: &str) -> Result<ParsedDatabase, ParseError> {
    let decoded = decode_source(source)?;
    if !decoded.diagnostics.is_empty() {
        tracing::debug!(
            variable = %decoded.variable,
            dropped = decoded.diagnostics.len(),
            "SavedVariables decoded with diagnostics"
        );
    }
    Ok(project(&decoded.root))
}
