//! # 访问令牌

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::fmt;

use crate::error::{ConnectorError, Result};

/// 当前使用的令牌
///
/// 只由 [`AuthenticatedTransport`](super::AuthenticatedTransport) 持有，刷新时整体替换。
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    /// 绝对过期时间；`None` 表示未知，按过期处理
    pub expires_at: Option<DateTime<Utc>>,
}

impl Token {
    #[must_use]
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at,
        }
    }

    /// 外部提供的令牌对：不带过期时间，首次使用前强制刷新
    #[must_use]
    pub fn bootstrap(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self::new(access_token, refresh_token, None)
    }

    /// 由令牌接口响应构造新令牌
    ///
    /// 响应没有下发新的 refresh token 时沿用 `previous_refresh`。
    /// `expires_in` 超出时间范围时返回解码错误。
    pub fn from_response(
        response: TokenResponse,
        previous_refresh: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let expires_at = Duration::try_seconds(response.expires_in)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| {
                ConnectorError::decode(format!(
                    "token expires_in out of range: {}",
                    response.expires_in
                ))
            })?;

        let refresh_token = response
            .refresh_token
            .filter(|t| !t.is_empty())
            .or_else(|| previous_refresh.map(str::to_string))
            .unwrap_or_default();

        Ok(Self {
            access_token: response.access_token,
            refresh_token,
            expires_at: Some(expires_at),
        })
    }

    /// 令牌缺失、过期时间未知或已到期都视为过期
    #[must_use]
    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        if self.access_token.is_empty() {
            return true;
        }
        match self.expires_at {
            Some(expires_at) => expires_at <= now,
            None => true,
        }
    }

    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.is_stale_at(Utc::now())
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"***")
            .field("refresh_token", &"***")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// 令牌接口的响应体（刷新与授权码交换共用）
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// 有效期（秒）
    #[serde(default)]
    pub expires_in: i64,
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"***")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "***"))
            .field("expires_in", &self.expires_in)
            .finish()
    }
}
