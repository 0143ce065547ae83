//! 同步错误类型

use std::path::PathBuf;
use thiserror::Error;

use crate::lua::ParseError;

/// 单次同步过程中可能出现的错误
#[derive(Debug, Error)]
pub enum SyncError {
    /// 缺少必需的设置
    #[error("Missing required settings: {}", missing.join(", "))]
    Config { missing: Vec<String> },

    /// 服务端拒绝了 token (401)
    #[error("Sync rejected (401): the API token {token_hint} is invalid or expired. Generate a new token and update the settings.")]
    Auth { token_hint: String },

    /// 返回 HTML 的 404，通常是 endpoint 填成了网站页面
    #[error("Sync endpoint not found (404) at {url}. Check the endpoint URL; it should point to the Puschelz site (e.g. https://puschelz.de) or its /api/addon-sync path.")]
    EndpointNotFound { url: String },

    /// 其他非 2xx 响应
    #[error("Sync failed ({status}): {body}")]
    Http { status: u16, body: String },

    #[error("Sync request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse SavedVariables: {0}")]
    Parse(#[from] ParseError),
}

impl SyncError {
    pub fn config<I, S>(missing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SyncError::Config {
            missing: missing.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = SyncError::config(["endpoint URL", "API token"]);
        assert_eq!(
            err.to_string(),
            "Missing required settings: endpoint URL, API token"
        );

        let err = SyncError::Http {
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "Sync failed (500): boom");

        let err = SyncError::EndpointNotFound {
            url: "https://example.com/api/addon-sync".to_string(),
        };
        assert!(err
            .to_string()
            .starts_with("Sync endpoint not found (404) at https://example.com/api/addon-sync"));

        let err = SyncError::Auth {
            token_hint: "pz_a****".to_string(),
        };
        assert!(err.to_string().contains("API token pz_a****"));
    }
}
