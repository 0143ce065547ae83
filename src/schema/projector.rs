//! Schema 投影
//!
//! 将解码后的通用值宽松地投影为 [`ParsedDatabase`]：类型不符或缺失的字段
//! 取默认值（数字 0、字符串 ""），永远不会失败。

use super::models::{
    Calendar, CalendarEvent, EventType, GuildBank, GuildBankItem, GuildBankTab, ParsedDatabase,
};
use crate::lua::LuaValue;

fn as_number(value: Option<&LuaValue>) -> f64 {
    value.and_then(LuaValue::as_number).unwrap_or(0.0)
}

fn as_string(value: Option<&LuaValue>) -> String {
    value
        .and_then(LuaValue::as_str)
        .map(str::to_string)
        .unwrap_or_default()
}

/// 序列中可当作记录读取的元素；其他类型直接丢弃
fn records(value: Option<&LuaValue>) -> impl Iterator<Item = &LuaValue> {
    value
        .and_then(LuaValue::as_sequence)
        .unwrap_or_default()
        .iter()
        .filter(|entry| entry.is_table_record())
}

fn project_items(value: Option<&LuaValue>) -> Vec<GuildBankItem> {
    records(value)
        .map(|item| GuildBankItem {
            slot_index: as_number(item.get("slotIndex")),
            item_id: as_number(item.get("itemId")),
            item_name: as_string(item.get("itemName")),
            item_icon: as_string(item.get("itemIcon")),
            quantity: as_number(item.get("quantity")),
        })
        .collect()
}

fn project_tabs(value: Option<&LuaValue>) -> Vec<GuildBankTab> {
    records(value)
        .map(|tab| GuildBankTab {
            tab_index: as_number(tab.get("tabIndex")),
            tab_name: as_string(tab.get("tabName")),
            items: project_items(tab.get("items")),
        })
        .collect()
}

fn project_events(value: Option<&LuaValue>) -> Vec<CalendarEvent> {
    records(value)
        .map(|event| CalendarEvent {
            wow_event_id: as_number(event.get("wowEventId")),
            title: as_string(event.get("title")),
            event_type: EventType::from_source(event.get("eventType").and_then(LuaValue::as_str)),
            start_time: as_number(event.get("startTime")),
            end_time: as_number(event.get("endTime")),
        })
        .collect()
}

/// 投影根表
pub fn project(root: &LuaValue) -> ParsedDatabase {
    let guild_bank = root.get("guildBank");
    let calendar = root.get("calendar");

    ParsedDatabase {
        schema_version: as_number(root.get("schemaVersion")),
        updated_at: as_number(root.get("updatedAt")),
        player: root
            .get("player")
            .filter(|player| !player.is_nil())
            .map(LuaValue::to_json),
        guild_bank: GuildBank {
            last_scanned_at: as_number(guild_bank.and_then(|g| g.get("lastScannedAt"))),
            tabs: project_tabs(guild_bank.and_then(|g| g.get("tabs"))),
        },
        calendar: Calendar {
            last_scanned_at: as_number(calendar.and_then(|c| c.get("lastScannedAt"))),
            events: project_events(calendar.and_then(|c| c.get("events"))),
        },
    }
}
