//! # 凭据策略
//!
//! 根据配置中存在的凭据字段选择令牌获取方式，并构造共享的 HTTP 传输。

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::code_flow::{CodeFlowCredentials, acquire_token};
use super::token::Token;
use super::transport::{AuthenticatedTransport, HttpTransport, TokenRefresher};
use super::USER_AGENT;
use crate::client::ApiEndpoints;
use crate::config::ArubaConfig;
use crate::error::{ConnectorError, Result};
use crate::linfo;
use crate::logging::{LogComponent, LogStage};

/// 令牌获取策略
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialStrategy {
    /// 不附加认证，直接使用底层客户端
    Anonymous,
    /// 外部提供的 access/refresh token 对
    RefreshFlow {
        client_id: String,
        client_secret: String,
        token: Token,
    },
    /// 交互式授权码流程
    CodeFlow {
        client_id: String,
        client_secret: String,
        credentials: CodeFlowCredentials,
    },
}

impl CredentialStrategy {
    /// 从已验证的配置中选择策略
    ///
    /// 两种模式都不完整时返回 `Anonymous`；两种都完整属于配置错误。
    pub fn from_config(config: &ArubaConfig) -> Result<Self> {
        match (config.has_refresh_flow(), config.has_code_flow()) {
            (true, true) => Err(ConnectorError::config(
                "ambiguous credentials: both refresh flow and code flow are configured",
            )),
            (true, false) => Ok(Self::RefreshFlow {
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
                token: Token::bootstrap(
                    config.access_token.clone().unwrap_or_default(),
                    config.refresh_token.clone().unwrap_or_default(),
                ),
            }),
            (false, true) => Ok(Self::CodeFlow {
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
                credentials: CodeFlowCredentials {
                    username: config.username.clone().unwrap_or_default(),
                    password: config.password.clone().unwrap_or_default(),
                    customer_id: config.customer_id.clone().unwrap_or_default(),
                },
            }),
            (false, false) => Ok(Self::Anonymous),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::RefreshFlow { .. } => "refresh_flow",
            Self::CodeFlow { .. } => "code_flow",
        }
    }

    /// 构造传输层；code flow 会在这里完成握手
    pub async fn build_transport(
        &self,
        endpoints: &ApiEndpoints,
        timeout: Duration,
    ) -> Result<Arc<dyn HttpTransport>> {
        let base = Arc::new(build_http_client(timeout)?);

        linfo!(
            "system",
            LogStage::Authentication,
            LogComponent::Auth,
            "build_transport",
            &format!("凭据策略: {}", self.name())
        );

        match self {
            Self::Anonymous => Ok(base as Arc<dyn HttpTransport>),
            Self::RefreshFlow {
                client_id,
                client_secret,
                token,
            } => {
                let refresher =
                    TokenRefresher::new(base.clone(), endpoints.token(), client_id, client_secret);
                Ok(Arc::new(AuthenticatedTransport::new(base, token.clone(), refresher)))
            }
            Self::CodeFlow {
                client_id,
                client_secret,
                credentials,
            } => {
                let token =
                    acquire_token(endpoints, client_id, client_secret, credentials, timeout).await?;
                let refresher =
                    TokenRefresher::new(base.clone(), endpoints.token(), client_id, client_secret);
                Ok(Arc::new(AuthenticatedTransport::new(base, token, refresher)))
            }
        }
    }
}

impl fmt::Debug for CredentialStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::RefreshFlow {
                client_id, token, ..
            } => f
                .debug_struct("RefreshFlow")
                .field("client_id", client_id)
                .field("token", token)
                .finish_non_exhaustive(),
            Self::CodeFlow {
                client_id,
                credentials,
                ..
            } => f
                .debug_struct("CodeFlow")
                .field("client_id", client_id)
                .field("credentials", credentials)
                .finish_non_exhaustive(),
        }
    }
}

/// 不带 cookie 的基础 HTTP 客户端
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| ConnectorError::internal_with_source("failed to build http client", e))
}
