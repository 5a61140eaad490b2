//! # 带认证的 HTTP 传输层
//!
//! 所有 API 调用共享一个 [`AuthenticatedTransport`]。令牌只在互斥锁内读取和刷新，
//! 并发请求遇到过期令牌时只会触发一次刷新，其余请求等待刷新结果。

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Method, Request, Response, StatusCode};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use url::Url;

use super::token::{Token, TokenResponse};
use crate::client::failure_message;
use crate::error::{ConnectorError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, lerror, linfo};

/// 发送一个已构造好的请求
#[async_trait]
pub trait HttpTransport: Send + Sync + fmt::Debug {
    async fn execute(&self, request: Request) -> Result<Response>;
}

#[async_trait]
impl HttpTransport for reqwest::Client {
    async fn execute(&self, request: Request) -> Result<Response> {
        Ok(reqwest::Client::execute(self, request).await?)
    }
}

/// 用 refresh token 换取新令牌
///
/// 直接使用底层传输发送，不经过 [`AuthenticatedTransport`]。
pub struct TokenRefresher {
    inner: Arc<dyn HttpTransport>,
    token_url: Url,
    client_id: String,
    client_secret: String,
}

impl fmt::Debug for TokenRefresher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRefresher")
            .field("token_url", &self.token_url.as_str())
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish_non_exhaustive()
    }
}

impl TokenRefresher {
    #[must_use]
    pub fn new(
        inner: Arc<dyn HttpTransport>,
        token_url: Url,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            inner,
            token_url,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// 执行一次刷新请求，参数全部放在查询串中
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse> {
        let mut url = self.token_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("client_secret", &self.client_secret)
            .append_pair("grant_type", "refresh_token")
            .append_pair("refresh_token", refresh_token);

        let response = self
            .inner
            .execute(Request::new(Method::POST, url))
            .await
            .map_err(|e| ConnectorError::token_refresh_with_source("token endpoint unreachable", e))?;

        let status = response.status();
        if status != StatusCode::OK {
            let message = failure_message(response).await;
            return Err(ConnectorError::token_refresh(message));
        }

        response.json::<TokenResponse>().await.map_err(|e| {
            ConnectorError::token_refresh_with_source("invalid token endpoint response", e)
        })
    }
}

/// 给请求附加 Bearer 令牌的传输装饰器
#[derive(Clone)]
pub struct AuthenticatedTransport {
    inner: Arc<dyn HttpTransport>,
    token: Arc<Mutex<Token>>,
    refresher: Arc<TokenRefresher>,
}

impl fmt::Debug for AuthenticatedTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatedTransport")
            .field("inner", &self.inner)
            .field("refresher", &self.refresher)
            .finish_non_exhaustive()
    }
}

impl AuthenticatedTransport {
    #[must_use]
    pub fn new(inner: Arc<dyn HttpTransport>, token: Token, refresher: TokenRefresher) -> Self {
        Self {
            inner,
            token: Arc::new(Mutex::new(token)),
            refresher: Arc::new(refresher),
        }
    }

    /// 当前令牌的副本
    pub async fn current_token(&self) -> Token {
        self.token.lock().await.clone()
    }

    /// 取得可用的访问令牌，过期时先刷新
    ///
    /// 刷新在独立任务中持锁执行：调用方被取消时刷新仍会完成，
    /// 等待同一把锁的其他请求直接拿到新令牌。
    pub async fn access_token(&self) -> Result<String> {
        let guard = Arc::clone(&self.token).lock_owned().await;
        if !guard.is_stale_at(Utc::now()) {
            return Ok(guard.access_token.clone());
        }

        let refresher = Arc::clone(&self.refresher);
        tokio::spawn(refresh_locked(guard, refresher))
            .await
            .map_err(|e| ConnectorError::internal_with_source("token refresh task failed", e))?
    }
}

async fn refresh_locked(
    mut guard: OwnedMutexGuard<Token>,
    refresher: Arc<TokenRefresher>,
) -> Result<String> {
    ldebug!(
        "system",
        LogStage::Authentication,
        LogComponent::Auth,
        "refresh_start",
        "访问令牌已过期，开始刷新"
    );

    let result = refresher.refresh(&guard.refresh_token).await.and_then(|response| {
        Token::from_response(response, Some(guard.refresh_token.as_str()), Utc::now())
            .map_err(|e| ConnectorError::token_refresh_with_source("invalid token lifetime", e))
    });
    match result {
        Ok(next) => {
            *guard = next;
            linfo!(
                "system",
                LogStage::Authentication,
                LogComponent::Auth,
                "refresh_success",
                &format!(
                    "访问令牌刷新成功，过期时间 {}",
                    guard
                        .expires_at
                        .map_or_else(|| "-".to_string(), |t| t.to_rfc3339())
                )
            );
            Ok(guard.access_token.clone())
        }
        Err(e) => {
            // 保留旧令牌，下一个请求会再次尝试刷新
            lerror!(
                "system",
                LogStage::Authentication,
                LogComponent::Auth,
                "refresh_fail",
                &format!("访问令牌刷新失败: {e}")
            );
            Err(e)
        }
    }
}

#[async_trait]
impl HttpTransport for AuthenticatedTransport {
    async fn execute(&self, mut request: Request) -> Result<Response> {
        let access_token = self.access_token().await?;
        let value = HeaderValue::from_str(&format!("Bearer {access_token}")).map_err(|e| {
            ConnectorError::internal_with_source("access token is not a valid header value", e)
        })?;
        request.headers_mut().insert(AUTHORIZATION, value);

        ldebug!(
            "system",
            LogStage::ExternalApi,
            LogComponent::Transport,
            "forward",
            &format!("{} {}", request.method(), request.url().path())
        );
        self.inner.execute(request).await
    }
}
