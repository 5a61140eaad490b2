//! # 外部错误到 `ConnectorError` 的转换

use super::ConnectorError;

impl From<reqwest::Error> for ConnectorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::decode_with_source("failed to decode response body", err);
        }
        let message = if err.is_timeout() {
            "request timed out".to_string()
        } else if err.is_connect() {
            "connection failed".to_string()
        } else {
            err.to_string()
        };
        Self::network_with_source(message, err)
    }
}

impl From<serde_json::Error> for ConnectorError {
    fn from(err: serde_json::Error) -> Self {
        Self::decode_with_source("invalid JSON", err)
    }
}

impl From<url::ParseError> for ConnectorError {
    fn from(err: url::ParseError) -> Self {
        Self::config_with_source("invalid URL", err)
    }
}

impl From<toml::de::Error> for ConnectorError {
    fn from(err: toml::de::Error) -> Self {
        Self::config_with_source("invalid TOML configuration", err)
    }
}

impl From<std::io::Error> for ConnectorError {
    fn from(err: std::io::Error) -> Self {
        Self::internal_with_source("I/O failure", err)
    }
}

impl From<tokio::task::JoinError> for ConnectorError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::internal_with_source("background task failed", err)
    }
}
