//! SavedVariables 数据模型
//!
//! 定义 ParsedDatabase, GuildBankTab, CalendarEvent 等数据结构。
//! 字段名与同步 API 的 JSON 保持一致（camelCase）。

use serde::{Deserialize, Serialize, Serializer};

use crate::lua::value::as_exact_integer;

/// 整数值输出为 JSON 整数（`13` 而不是 `13.0`）
pub(crate) fn serialize_number<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match as_exact_integer(*value) {
        Some(i) => serializer.serialize_i64(i),
        None => serializer.serialize_f64(*value),
    }
}

/// 整个 SavedVariables 数据库
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedDatabase {
    #[serde(serialize_with = "serialize_number")]
    pub schema_version: f64,

    #[serde(serialize_with = "serialize_number")]
    pub updated_at: f64,

    /// 角色信息，原样透传不做校验
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<serde_json::Value>,

    pub guild_bank: GuildBank,

    pub calendar: Calendar,
}

/// 公会银行快照
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuildBank {
    #[serde(serialize_with = "serialize_number")]
    pub last_scanned_at: f64,
    pub tabs: Vec<GuildBankTab>,
}

/// 公会银行标签页
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuildBankTab {
    #[serde(serialize_with = "serialize_number")]
    pub tab_index: f64,
    pub tab_name: String,
    pub items: Vec<GuildBankItem>,
}

/// 公会银行格子
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuildBankItem {
    #[serde(serialize_with = "serialize_number")]
    pub slot_index: f64,
    #[serde(serialize_with = "serialize_number")]
    pub item_id: f64,
    pub item_name: String,
    pub item_icon: String,
    #[serde(serialize_with = "serialize_number")]
    pub quantity: f64,
}

/// 日历快照
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Calendar {
    #[serde(serialize_with = "serialize_number")]
    pub last_scanned_at: f64,
    pub events: Vec<CalendarEvent>,
}

/// 日历活动类型
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    #[default]
    Raid,
    World,
}

impl EventType {
    /// 只有字面量 "world" 映射为 World，其余一律 Raid
    pub fn from_source(value: Option<&str>) -> Self {
        match value {
            Some("world") => EventType::World,
            _ => EventType::Raid,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Raid => "raid",
            EventType::World => "world",
        }
    }
}

/// 日历活动
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    #[serde(serialize_with = "serialize_number")]
    pub wow_event_id: f64,
    pub title: String,
    pub event_type: EventType,
    #[serde(serialize_with = "serialize_number")]
    pub start_time: f64,
    #[serde(serialize_with = "serialize_number")]
    pub end_time: f64,
}
