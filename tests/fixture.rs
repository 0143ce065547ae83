//! 样例 SavedVariables 文件的端到端解析

use puschelz_client::lua::decode_source;
use puschelz_client::parse_saved_variables;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join(name)
}

#[test]
fn test_sample_matches_expected_json() {
    let source = fs::read_to_string(fixture("Puschelz.sample.lua")).unwrap();
    let expected: Value =
        serde_json::from_str(&fs::read_to_string(fixture("Puschelz.sample.json")).unwrap())
            .unwrap();

    let db = parse_saved_variables(&source).unwrap();
    assert_eq!(serde_json::to_value(&db).unwrap(), expected);
}

#[test]
fn test_sample_decodes_without_diagnostics() {
    let source = fs::read_to_string(fixture("Puschelz.sample.lua")).unwrap();
    let decoded = decode_source(&source).unwrap();

    assert_eq!(decoded.variable, "PuschelzDB");
    assert!(decoded.diagnostics.is_empty());
}

#[test]
fn test_minimal_addon_output() {
    let source = r#"
PuschelzDB = {
  schemaVersion = 13,
  updatedAt = 1739400000000,
  guildBank = {
    lastScannedAt = 1739400000000,
    tabs = {},
  },
  calendar = {
    lastScannedAt = 1739403600000,
    events = {},
  },
}
"#;

    let db = parse_saved_variables(source).unwrap();
    assert_eq!(db.schema_version, 13.0);
    assert_eq!(db.updated_at, 1739400000000.0);
    assert_eq!(db.guild_bank.last_scanned_at, 1739400000000.0);
    assert!(db.guild_bank.tabs.is_empty());
    assert_eq!(db.calendar.last_scanned_at, 1739403600000.0);
    assert!(db.calendar.events.is_empty());
    assert_eq!(db.player, None);
}
