//! SavedVariables 解析错误

use thiserror::Error;

/// 解析失败（仅对当前这次尝试致命）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("no assignment found in SavedVariables source")]
    NoAssignment,

    #[error("SavedVariables payload not a table")]
    NotATable,

    #[error("Lua syntax error at line {line}, column {column}")]
    Syntax { line: usize, column: usize },

    #[error("failed to load Lua grammar: {0}")]
    Grammar(String),
}
