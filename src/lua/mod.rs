//! SavedVariables 字面量解码
//!
//! 插件写出的 `Puschelz.lua` 只用到 Lua 的一小部分语法：
//! 数字、字符串、布尔、nil、一元负号以及嵌套表。
//!
//! 流程：tree-sitter 语法树 → [`SyntaxNode`] → [`LuaValue`]

pub mod decoder;
pub mod error;
pub mod syntax;
pub mod value;

pub use decoder::{DecodeDiagnostic, DiagnosticReason, LiteralDecoder};
pub use error::ParseError;
pub use syntax::{parse_chunk, SyntaxNode, TableField};
pub use value::LuaValue;

/// 解码结果
#[derive(Debug, Clone)]
pub struct DecodedSource {
    /// 被赋值的全局变量名（如 `PuschelzDB`）
    pub variable: String,
    /// 根表
    pub root: LuaValue,
    /// 被丢弃的语法
    pub diagnostics: Vec<DecodeDiagnostic>,
}

/// 解码 SavedVariables 源码
///
/// 取第一条顶层赋值语句，其右侧第一个表达式必须是表构造器。
pub fn decode_source(source: &str) -> Result<DecodedSource, ParseError> {
    let chunk = parse_chunk(source)?;
    let assignment = chunk
        .assignments
        .into_iter()
        .next()
        .ok_or(ParseError::NoAssignment)?;

    let table = match assignment.values.first() {
        Some(node @ SyntaxNode::Table(_)) => node,
        _ => return Err(ParseError::NotATable),
    };

    let mut decoder = LiteralDecoder::new();
    let root = decoder.decode(table);

    Ok(DecodedSource {
        variable: assignment.targets.into_iter().next().unwrap_or_default(),
        root,
        diagnostics: decoder.into_diagnostics(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_source() {
        let source = r#"
PuschelzDB = {
  ["schemaVersion"] = 13,
  player = { characterName = "Flauschi", realmName = 'Blackhand' },
  list = { "a", "b", -3 },
}
"#;
        let decoded = decode_source(source).unwrap();
        assert_eq!(decoded.variable, "PuschelzDB");
        assert!(decoded.diagnostics.is_empty());

        let root = &decoded.root;
        assert_eq!(root.get("schemaVersion"), Some(&LuaValue::Number(13.0)));
        assert_eq!(
            root.get("player").and_then(|p| p.get("realmName")),
            Some(&LuaValue::String("Blackhand".to_string()))
        );
        assert_eq!(
            root.get("list"),
            Some(&LuaValue::Sequence(vec![
                LuaValue::String("a".to_string()),
                LuaValue::String("b".to_string()),
                LuaValue::Number(-3.0),
            ]))
        );
    }

    #[test]
    fn test_no_assignment() {
        assert_eq!(decode_source("-- empty file\n").unwrap_err(), ParseError::NoAssignment);
        assert_eq!(decode_source("").unwrap_err(), ParseError::NoAssignment);
    }

    #[test]
    fn test_payload_not_a_table() {
        assert_eq!(decode_source("PuschelzDB = 5").unwrap_err(), ParseError::NotATable);
        assert_eq!(decode_source("PuschelzDB = nil").unwrap_err(), ParseError::NotATable);
    }

    #[test]
    fn test_first_assignment_wins() {
        let decoded = decode_source("A = { x = 1 }\nB = { x = 2 }\n").unwrap();
        assert_eq!(decoded.variable, "A");
        assert_eq!(decoded.root.get("x"), Some(&LuaValue::Number(1.0)));
    }

    #[test]
    fn test_unsupported_expressions_are_reported() {
        let decoded = decode_source("DB = { a = someGlobal, b = 1 }").unwrap();
        assert_eq!(decoded.root.get("a"), Some(&LuaValue::Nil));
        assert_eq!(decoded.root.get("b"), Some(&LuaValue::Number(1.0)));
        assert_eq!(decoded.diagnostics.len(), 1);
        assert_eq!(decoded.diagnostics[0].line, Some(1));
    }
}
