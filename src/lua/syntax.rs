//! Lua 语法树前端
//!
//! 使用 tree-sitter-lua 解析源码，再降级为一个封闭的节点枚举 [`SyntaxNode`]，
//! 解码器只需要对这个枚举做穷尽匹配。

use tree_sitter::{Language, Node, Parser, Tree};

use super::ParseError;

// ═══════════════════════════════════════════════════════════════════
// 节点定义
// ═══════════════════════════════════════════════════════════════════

/// 降级后的表达式节点
#[derive(Debug, Clone, PartialEq)]
pub enum SyntaxNode {
    Number(f64),
    Boolean(bool),
    /// `value` 是已经反转义的内容，`raw` 是原始 token（含引号）
    String { value: Option<String>, raw: String },
    Nil,
    Unary { operator: String, operand: Box<SyntaxNode> },
    Table(Vec<TableField>),
    /// 解码器不支持的语法（函数调用、变量引用、二元表达式等）
    Unsupported { kind: String, line: usize },
}

/// 表构造器中的字段
#[derive(Debug, Clone, PartialEq)]
pub enum TableField {
    /// `value`
    Positional(SyntaxNode),
    /// `name = value`
    Named { name: String, value: SyntaxNode },
    /// `[key] = value`
    Keyed { key: SyntaxNode, value: SyntaxNode },
}

/// 顶层赋值语句 `a, b = x, y`
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub targets: Vec<String>,
    pub values: Vec<SyntaxNode>,
    pub line: usize,
}

/// 整个文件中的顶层赋值
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chunk {
    pub assignments: Vec<Assignment>,
}

// ═══════════════════════════════════════════════════════════════════
// tree-sitter 辅助
// ═══════════════════════════════════════════════════════════════════

fn lua_language() -> Language {
    tree_sitter_lua::LANGUAGE.into()
}

/// 解析源代码为 Tree-sitter AST
pub fn parse_source(source: &str) -> Result<Tree, ParseError> {
    let mut parser = Parser::new();
    parser
        .set_language(&lua_language())
        .map_err(|e| ParseError::Grammar(e.to_string()))?;
    parser
        .parse(source, None)
        .ok_or_else(|| ParseError::Grammar("parser returned no tree".to_string()))
}

/// 提取节点的文本内容
fn node_text<'a>(node: &Node, source: &'a str) -> &'a str {
    &source[node.start_byte()..node.end_byte()]
}

/// 查找指定类型的子节点
fn find_child_by_kind<'a>(node: &Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find(|child| child.kind() == kind);
    found
}

/// 具名子节点（跳过注释）
fn named_children_without_comments<'a>(node: &Node<'a>) -> Vec<Node<'a>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

fn line_of(node: &Node) -> usize {
    node.start_position().row + 1
}

/// 第一个 ERROR / MISSING 节点的位置（1-based）
fn first_error_position(node: &Node) -> Option<(usize, usize)> {
    if node.is_error() || node.is_missing() {
        let position = node.start_position();
        return Some((position.row + 1, position.column + 1));
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() || child.is_missing() {
            if let Some(position) = first_error_position(&child) {
                return Some(position);
            }
        }
    }
    None
}

// ═══════════════════════════════════════════════════════════════════
// 降级
// ═══════════════════════════════════════════════════════════════════

/// 解析 Lua 源码并收集所有顶层赋值
pub fn parse_chunk(source: &str) -> Result<Chunk, ParseError> {
    let tree = parse_source(source)?;
    let root = tree.root_node();

    if root.has_error() {
        let (line, column) = first_error_position(&root).unwrap_or((1, 1));
        return Err(ParseError::Syntax { line, column });
    }

    let assignments = named_children_without_comments(&root)
        .iter()
        .filter(|statement| statement.kind() == "assignment_statement")
        .map(|statement| lower_assignment(statement, source))
        .collect();

    Ok(Chunk { assignments })
}

fn lower_assignment(node: &Node, source: &str) -> Assignment {
    let targets = find_child_by_kind(node, "variable_list")
        .map(|list| {
            named_children_without_comments(&list)
                .iter()
                .map(|target| node_text(target, source).to_string())
                .collect()
        })
        .unwrap_or_default();

    let values = find_child_by_kind(node, "expression_list")
        .map(|list| {
            named_children_without_comments(&list)
                .iter()
                .map(|value| lower_expression(value, source))
                .collect()
        })
        .unwrap_or_default();

    Assignment {
        targets,
        values,
        line: line_of(node),
    }
}

/// 将表达式节点降级为 [`SyntaxNode`]
pub fn lower_expression(node: &Node, source: &str) -> SyntaxNode {
    let text = node_text(node, source);

    match node.kind() {
        "number" => match parse_number(text) {
            Some(n) => SyntaxNode::Number(n),
            None => unsupported(node),
        },
        "true" => SyntaxNode::Boolean(true),
        "false" => SyntaxNode::Boolean(false),
        "nil" => SyntaxNode::Nil,
        "string" => SyntaxNode::String {
            value: string_value(text),
            raw: text.to_string(),
        },
        "unary_expression" => {
            let operator = node
                .child(0)
                .map(|op| node_text(&op, source).to_string())
                .unwrap_or_default();
            let operand = node
                .child_by_field_name("operand")
                .or_else(|| named_children_without_comments(node).pop());

            match operand {
                Some(operand) => SyntaxNode::Unary {
                    operator,
                    operand: Box::new(lower_expression(&operand, source)),
                },
                None => unsupported(node),
            }
        }
        "table_constructor" => {
            let mut fields = Vec::new();
            collect_fields(node, source, &mut fields);
            SyntaxNode::Table(fields)
        }
        _ => unsupported(node),
    }
}

fn unsupported(node: &Node) -> SyntaxNode {
    SyntaxNode::Unsupported {
        kind: node.kind().to_string(),
        line: line_of(node),
    }
}

/// 收集表构造器的字段（兼容 field_list 包装节点）
fn collect_fields(node: &Node, source: &str, fields: &mut Vec<TableField>) {
    for child in named_children_without_comments(node) {
        match child.kind() {
            "field" => fields.push(lower_field(&child, source)),
            "field_list" => collect_fields(&child, source, fields),
            _ => {}
        }
    }
}

fn lower_field(node: &Node, source: &str) -> TableField {
    let value = match node.child_by_field_name("value") {
        Some(value) => lower_expression(&value, source),
        None => unsupported(node),
    };

    let Some(name) = node.child_by_field_name("name") else {
        return TableField::Positional(value);
    };

    // `[expr] = value` 带方括号，`ident = value` 不带
    if find_child_by_kind(node, "[").is_some() {
        TableField::Keyed {
            key: lower_expression(&name, source),
            value,
        }
    } else {
        TableField::Named {
            name: node_text(&name, source).to_string(),
            value,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════
// 字面量
// ═══════════════════════════════════════════════════════════════════

/// 解析 Lua 数字字面量（十进制与十六进制整数）
pub fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();

    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        // 十六进制整数按 Lua 规则回绕
        if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let value = hex.chars().fold(0u64, |acc, c| {
            acc.wrapping_mul(16)
                .wrapping_add(u64::from(c.to_digit(16).unwrap_or(0)))
        });
        return Some(value as i64 as f64);
    }

    if !text.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return None;
    }
    text.parse::<f64>().ok()
}

/// 字符串 token 的实际内容；无法反转义时返回 None
pub fn string_value(raw: &str) -> Option<String> {
    let bytes = raw.as_bytes();
    let first = *bytes.first()?;

    match first {
        b'"' | b'\'' => {
            if raw.len() < 2 || bytes[raw.len() - 1] != first {
                return None;
            }
            unescape(&raw[1..raw.len() - 1])
        }
        b'[' => long_bracket_content(raw).map(str::to_string),
        _ => None,
    }
}

/// `[==[ ... ]==]` 的内容，去掉紧跟开括号的换行
fn long_bracket_content(raw: &str) -> Option<&str> {
    let level = raw[1..].bytes().take_while(|b| *b == b'=').count();
    let open_len = level + 2;
    let close = format!("]{}]", "=".repeat(level));

    if raw.as_bytes().get(level + 1) != Some(&b'[') || !raw.ends_with(&close) {
        return None;
    }
    if raw.len() < open_len + close.len() {
        return None;
    }

    let content = &raw[open_len..raw.len() - close.len()];
    let content = content
        .strip_prefix("\r\n")
        .or_else(|| content.strip_prefix('\n'))
        .unwrap_or(content);
    Some(content)
}

/// 处理 Lua 转义序列
fn unescape(body: &str) -> Option<String> {
    let bytes = body.as_bytes();
    let len = bytes.len();
    let mut out = Vec::with_capacity(len);
    let mut i = 0;

    while i < len {
        let b = bytes[i];
        if b != b'\\' {
            out.push(b);
            i += 1;
            continue;
        }

        let escaped = *bytes.get(i + 1)?;
        i += 2;

        match escaped {
            b'a' => out.push(0x07),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0c),
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'v' => out.push(0x0b),
            b'\\' | b'"' | b'\'' => out.push(escaped),
            b'\n' => {
                out.push(b'\n');
                if bytes.get(i) == Some(&b'\r') {
                    i += 1;
                }
            }
            b'\r' => {
                out.push(b'\n');
                if bytes.get(i) == Some(&b'\n') {
                    i += 1;
                }
            }
            b'x' => {
                let hex = body.get(i..i + 2)?;
                out.push(u8::from_str_radix(hex, 16).ok()?);
                i += 2;
            }
            b'z' => {
                while i < len && bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
            }
            b'u' => {
                if bytes.get(i) != Some(&b'{') {
                    return None;
                }
                let close = i + body[i..].find('}')?;
                let code = u32::from_str_radix(&body[i + 1..close], 16).ok()?;
                let ch = char::from_u32(code)?;
                let mut buf = [0u8; 4];
                out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                i = close + 1;
            }
            b'0'..=b'9' => {
                // \ddd 最多三位十进制
                let start = i - 1;
                let mut end = start;
                while end < len && end < start + 3 && bytes[end].is_ascii_digit() {
                    end += 1;
                }
                let code: u32 = body[start..end].parse().ok()?;
                out.push(u8::try_from(code).ok()?);
                i = end;
            }
            _ => return None,
        }
    }

    Some(match String::from_utf8(out) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })
}

// ═══════════════════════════════════════════════════════════════════
// 测试
// ═══════════════════════════════════════════════════════════════════
