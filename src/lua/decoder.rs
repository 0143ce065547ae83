//! 字面量解码器
//!
//! 将 [`SyntaxNode`] 递归转换为 [`LuaValue`]。不支持的节点解码为 Nil，
//! 同时记录一条诊断，而不是直接报错。

use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::syntax::{SyntaxNode, TableField};
use super::value::{number_key, LuaValue};

/// 诊断原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticReason {
    /// 不支持的语法，解码为 nil
    Unsupported,
    /// 位置元素覆盖了同号的显式 key
    KeyOverwritten,
}

/// 解码过程中被丢弃的信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeDiagnostic {
    pub reason: DiagnosticReason,
    /// 节点类型（如 `identifier`、`unary not`），或被覆盖的 key
    pub kind: String,
    /// 源码行号（1-based），未知时为 None
    pub line: Option<usize>,
}

impl std::fmt::Display for DecodeDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.reason, self.line) {
            (DiagnosticReason::Unsupported, Some(line)) => {
                write!(f, "unsupported `{}` at line {} decoded as nil", self.kind, line)
            }
            (DiagnosticReason::Unsupported, None) => {
                write!(f, "unsupported `{}` decoded as nil", self.kind)
            }
            (DiagnosticReason::KeyOverwritten, _) => write!(
                f,
                "explicit key [{}] overwritten by positional value",
                self.kind
            ),
        }
    }
}

/// 字面量解码器
#[derive(Debug, Default)]
pub struct LiteralDecoder {
    diagnostics: Vec<DecodeDiagnostic>,
}

impl LiteralDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 解码单个节点
    pub fn decode(&mut self, node: &SyntaxNode) -> LuaValue {
        match node {
            SyntaxNode::Number(n) => LuaValue::Number(*n),
            SyntaxNode::Boolean(b) => LuaValue::Boolean(*b),
            SyntaxNode::String { value, raw } => LuaValue::String(match value {
                Some(value) => value.clone(),
                None => strip_quotes(raw).to_string(),
            }),
            SyntaxNode::Nil => LuaValue::Nil,
            SyntaxNode::Unary { operator, operand } => {
                let decoded = self.decode(operand);
                match (operator.as_str(), decoded) {
                    ("-", LuaValue::Number(n)) => LuaValue::Number(-n),
                    (op, other) => {
                        self.report(format!("unary {} on {}", op, other.type_name()), None);
                        LuaValue::Nil
                    }
                }
            }
            SyntaxNode::Table(fields) => self.decode_table(fields),
            SyntaxNode::Unsupported { kind, line } => {
                self.report(kind.clone(), Some(*line));
                LuaValue::Nil
            }
        }
    }

    /// 表构造器：全部为位置元素时是 Sequence，否则是 Mapping
    fn decode_table(&mut self, fields: &[TableField]) -> LuaValue {
        if fields
            .iter()
            .all(|field| matches!(field, TableField::Positional(_)))
        {
            let items = fields
                .iter()
                .filter_map(|field| match field {
                    TableField::Positional(value) => Some(self.decode(value)),
                    _ => None,
                })
                .collect();
            return LuaValue::Sequence(items);
        }

        let mut map = BTreeMap::new();
        let mut auto_index: u64 = 1;

        for field in fields {
            match field {
                TableField::Named { name, value } => {
                    let value = self.decode(value);
                    map.insert(name.clone(), value);
                }
                TableField::Keyed { key, value } => {
                    let key = match self.decode(key) {
                        LuaValue::Number(n) => number_key(n),
                        LuaValue::String(s) => s,
                        other => {
                            debug!(key_type = other.type_name(), "dropping table entry with non-literal key");
                            continue;
                        }
                    };
                    let value = self.decode(value);
                    map.insert(key, value);
                }
                TableField::Positional(value) => {
                    // 与 Lua 一致：位置元素覆盖同号的显式 key
                    let key = auto_index.to_string();
                    let value = self.decode(value);
                    if map.insert(key.clone(), value).is_some() {
                        self.push(DecodeDiagnostic {
                            reason: DiagnosticReason::KeyOverwritten,
                            kind: key,
                            line: None,
                        });
                    }
                    auto_index += 1;
                }
            }
        }

        LuaValue::Mapping(map)
    }

    fn report(&mut self, kind: String, line: Option<usize>) {
        self.push(DecodeDiagnostic {
            reason: DiagnosticReason::Unsupported,
            kind,
            line,
        });
    }

    fn push(&mut self, diagnostic: DecodeDiagnostic) {
        warn!("{}", diagnostic);
        self.diagnostics.push(diagnostic);
    }

    pub fn diagnostics(&self) -> &[DecodeDiagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<DecodeDiagnostic> {
        self.diagnostics
    }
}

/// 去掉一对匹配的首尾引号
fn strip_quotes(raw: &str) -> &str {
    const QUOTES: &[char] = &['"', '\''];
    let raw = raw.strip_prefix(QUOTES).unwrap_or(raw);
    raw.strip_suffix(QUOTES).unwrap_or(raw)
}
