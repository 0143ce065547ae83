//! 通用 Lua 值
//!
//! 解码器的中间表示：在 schema 投影之前不带任何类型信息。

use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// 解码后的 Lua 字面量
#[derive(Debug, Clone, PartialEq)]
pub enum LuaValue {
    Number(f64),
    Boolean(bool),
    String(String),
    Nil,
    /// 只包含位置元素的表 `{ a, b, c }`
    Sequence(Vec<LuaValue>),
    /// 含有显式 key 的表
    Mapping(BTreeMap<String, LuaValue>),
}

impl LuaValue {
    /// 按 key 取值（仅对 Mapping 有效）
    pub fn get(&self, key: &str) -> Option<&LuaValue> {
        match self {
            LuaValue::Mapping(map) => map.get(key),
            _ => None,
        }
    }

    /// 有限数值，否则 None
    pub fn as_number(&self) -> Option<f64> {
        match self {
            LuaValue::Number(n) if n.is_finite() => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            LuaValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[LuaValue]> {
        match self {
            LuaValue::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// 是否可以当作 Mapping 读取
    ///
    /// 空表 `{}` 在解码时会被识别为空 Sequence，这里同样视为空 Mapping。
    pub fn is_table_record(&self) -> bool {
        match self {
            LuaValue::Mapping(_) => true,
            LuaValue::Sequence(items) => items.is_empty(),
            _ => false,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, LuaValue::Nil)
    }

    /// 类型名（用于日志）
    pub fn type_name(&self) -> &'static str {
        match self {
            LuaValue::Number(_) => "number",
            LuaValue::Boolean(_) => "boolean",
            LuaValue::String(_) => "string",
            LuaValue::Nil => "nil",
            LuaValue::Sequence(_) => "sequence",
            LuaValue::Mapping(_) => "mapping",
        }
    }

    /// 转换为 JSON 值
    ///
    /// 整数形式的数字输出为 JSON 整数，非有限数字输出为 null。
    pub fn to_json(&self) -> Value {
        match self {
            LuaValue::Number(n) => number_to_json(*n),
            LuaValue::Boolean(b) => Value::Bool(*b),
            LuaValue::String(s) => Value::String(s.clone()),
            LuaValue::Nil => Value::Null,
            LuaValue::Sequence(items) => Value::Array(items.iter().map(LuaValue::to_json).collect()),
            LuaValue::Mapping(map) => {
                let object: Map<String, Value> = map
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect();
                Value::Object(object)
            }
        }
    }
}

/// 2^53，超过此值的整数无法被 f64 精确表示
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// 数字是否可以无损地作为 i64 输出
pub(crate) fn as_exact_integer(n: f64) -> Option<i64> {
    if n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        Some(n as i64)
    } else {
        None
    }
}

fn number_to_json(n: f64) -> Value {
    match as_exact_integer(n) {
        Some(i) => Value::Number(i.into()),
        None => Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null),
    }
}

/// 将数字格式化为表 key（整数不带小数点）
pub(crate) fn number_key(n: f64) -> String {
    match as_exact_integer(n) {
        Some(i) => i.to_string(),
        None => n.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_number_key() {
        assert_eq!(number_key(1.0), "1");
        assert_eq!(number_key(-3.0), "-3");
        assert_eq!(number_key(1.5), "1.5");
    }

    #[test]
    fn test_to_json() {
        let mut map = BTreeMap::new();
        map.insert("count".to_string(), LuaValue::Number(3.0));
        map.insert("ratio".to_string(), LuaValue::Number(0.25));
        map.insert(
            "names".to_string(),
            LuaValue::Sequence(vec![LuaValue::String("a".to_string()), LuaValue::Nil]),
        );
        let value = LuaValue::Mapping(map);

        assert_eq!(
            value.to_json(),
            json!({ "count": 3, "ratio": 0.25, "names": ["a", null] })
        );
    }

    #[test]
    fn test_accessors() {
        assert_eq!(LuaValue::Number(f64::INFINITY).as_number(), None);
        assert_eq!(LuaValue::String("x".to_string()).as_number(), None);
        assert_eq!(LuaValue::Number(2.0).as_str(), None);
        assert!(LuaValue::Sequence(vec![]).is_table_record());
        assert!(!LuaValue::Sequence(vec![LuaValue::Nil]).is_table_record());
        assert_eq!(LuaValue::Nil.get("x"), None);
    }
}
