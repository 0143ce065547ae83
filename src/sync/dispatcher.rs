//! 同步请求发送
//!
//! 每轮同步按顺序发送两个批次：先 `guildBank`，再 `calendar`。
//! 任一批次失败立即返回，后续批次不再发送。

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use tracing::debug;

use super::error::SyncError;
use crate::config::SyncConfig;
use crate::schema::{CalendarEvent, GuildBankTab, ParsedDatabase};

/// 插件同步 API 路径
pub const SYNC_PATH: &str = "/api/addon-sync";

/// 解析最终请求地址
///
/// 去掉末尾的 `/`；已经以 `/api/addon-sync` 结尾（不区分大小写）时原样使用，
/// 否则追加该路径。
pub fn resolve_sync_url(endpoint: &str) -> String {
    let base = endpoint.trim().trim_end_matches('/');
    if base.to_ascii_lowercase().ends_with(SYNC_PATH) {
        base.to_string()
    } else {
        format!("{}{}", base, SYNC_PATH)
    }
}

/// 单个同步批次，序列化为 `{"type": ..., "payload": {...}}`
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum SyncBatch<'a> {
    GuildBank { tabs: &'a [GuildBankTab] },
    Calendar { events: &'a [CalendarEvent] },
}

impl<'a> SyncBatch<'a> {
    /// 按发送顺序拆分数据库
    pub fn from_database(db: &'a ParsedDatabase) -> [SyncBatch<'a>; 2] {
        [
            SyncBatch::GuildBank {
                tabs: &db.guild_bank.tabs,
            },
            SyncBatch::Calendar {
                events: &db.calendar.events,
            },
        ]
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SyncBatch::GuildBank { .. } => "guildBank",
            SyncBatch::Calendar { .. } => "calendar",
        }
    }
}

/// 同步请求发送器
#[derive(Debug, Clone)]
pub struct SyncDispatcher {
    client: Client,
}

impl SyncDispatcher {
    pub fn new() -> Result<Self, SyncError> {
        let client = Client::builder()
            .user_agent(concat!("puschelz-client/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// 发送一轮同步
    pub async fn dispatch(&self, db: &ParsedDatabase, config: &SyncConfig) -> Result<(), SyncError> {
        let missing = config.missing_sync_settings();
        if !missing.is_empty() {
            return Err(SyncError::config(missing));
        }

        let url = resolve_sync_url(&config.endpoint_url);
        let token = config.api_token.trim();

        for batch in SyncBatch::from_database(db) {
            debug!(batch = batch.kind(), url = %url, "sending sync batch");

            let response = self
                .client
                .post(&url)
                .bearer_auth(token)
                .json(&batch)
                .send()
                .await?;

            check_response(response, &url, config).await?;
            debug!(batch = batch.kind(), "sync batch accepted");
        }

        Ok(())
    }
}

/// 按状态码和内容类型归类失败响应
async fn check_response(
    response: Response,
    url: &str,
    config: &SyncConfig,
) -> Result<(), SyncError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    if status == StatusCode::UNAUTHORIZED {
        return Err(SyncError::Auth {
            token_hint: config.masked_token(),
        });
    }

    let is_html = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_ascii_lowercase().contains("text/html"))
        .unwrap_or(false);

    if status == StatusCode::NOT_FOUND && is_html {
        return Err(SyncError::EndpointNotFound {
            url: url.to_string(),
        });
    }

    let body = response.text().await.unwrap_or_default();
    Err(SyncError::Http {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Calendar, EventType, GuildBank};
    use serde_json::json;

    #[test]
    fn test_resolve_sync_url() {
        assert_eq!(
            resolve_sync_url("https://h.example"),
            "https://h.example/api/addon-sync"
        );
        assert_eq!(
            resolve_sync_url("https://h.example/"),
            "https://h.example/api/addon-sync"
        );
        assert_eq!(
            resolve_sync_url("https://h.example/api/addon-sync"),
            "https://h.example/api/addon-sync"
        );
        assert_eq!(
            resolve_sync_url("https://h.example/API/Addon-Sync//"),
            "https://h.example/API/Addon-Sync"
        );
    }

    #[test]
    fn test_batch_shape() {
        let db = ParsedDatabase {
            guild_bank: GuildBank {
                last_scanned_at: 1.0,
                tabs: vec![GuildBankTab {
                    tab_index: 1.0,
                    tab_name: "Flasks".to_string(),
                    items: Vec::new(),
                }],
            },
            calendar: Calendar {
                last_scanned_at: 2.0,
                events: vec![CalendarEvent {
                    wow_event_id: 42.0,
                    title: "Raid Night".to_string(),
                    event_type: EventType::Raid,
                    start_time: 10.0,
                    end_time: 20.0,
                }],
            },
            ..ParsedDatabase::default()
        };

        let [guild_bank, calendar] = SyncBatch::from_database(&db);
        assert_eq!(guild_bank.kind(), "guildBank");
        assert_eq!(
            serde_json::to_value(&guild_bank).unwrap(),
            json!({
                "type": "guildBank",
                "payload": { "tabs": [{ "tabIndex": 1, "tabName": "Flasks", "items": [] }] }
            })
        );
        assert_eq!(
            serde_json::to_value(&calendar).unwrap(),
            json!({
                "type": "calendar",
                "payload": { "events": [{
                    "wowEventId": 42,
                    "title": "Raid Night",
                    "eventType": "raid",
                    "startTime": 10,
                    "endTime": 20
                }] }
            })
        );
    }

    #[tokio::test]
    async fn test_dispatch_requires_settings() {
        let dispatcher = SyncDispatcher::with_client(Client::new());
        let config = SyncConfig {
            endpoint_url: " ".to_string(),
            api_token: String::new(),
            wow_path: String::new(),
        };

        let err = dispatcher
            .dispatch(&ParsedDatabase::default(), &config)
            .await
            .unwrap_err();
        match err {
            SyncError::Config { missing } => {
                assert_eq!(missing, vec!["endpoint URL", "API token"])
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
