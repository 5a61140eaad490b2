//! # 错误类型定义

use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

use crate::client::rate_limit::RateLimitSnapshot;

/// 交互式登录握手的步骤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandshakeStep {
    /// 第一步：提交用户名密码，获取 CSRF cookie
    Login,
    /// 第二步：用 CSRF token 换取授权码
    Authorization,
    /// 第三步：授权码换取访问令牌
    TokenExchange,
}

impl fmt::Display for HandshakeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Login => "login",
            Self::Authorization => "authorization",
            Self::TokenExchange => "token exchange",
        };
        f.write_str(name)
    }
}

/// 连接器主要错误类型
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// 配置相关错误（启动时检测，阻止连接器启动）
    #[error("configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 传输层/网络错误，原样向上传递
    #[error("network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 上游 API 返回非 2xx 响应
    #[error("api error ({status}): {message}")]
    Api {
        status: StatusCode,
        message: String,
        /// 失败响应携带的速率限制信息，供调用方作为 annotations 传递
        rate_limit: Option<RateLimitSnapshot>,
    },

    /// 令牌刷新失败
    #[error("failed to refresh token: {message}")]
    TokenRefresh {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 交互式登录握手失败，标明失败的步骤
    #[error("code flow {step} step failed: {message}")]
    Handshake {
        step: HandshakeStep,
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 解码错误（JSON、数字响应头、日期）
    #[error("decode error: {message}")]
    Decode {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 分页游标无法解析
    #[error("invalid page token: {message}")]
    Pagination {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 角色资源 profile 中的快照缺失或损坏
    #[error("invalid role profile: {message}")]
    Profile {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 系统内部错误
    #[error("internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 附加上下文的错误
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<ConnectorError>,
    },
}

impl ConnectorError {
    /// 创建配置错误
    pub fn config<T: Into<String>>(message: T) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的配置错误
    pub fn config_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建网络错误
    pub fn network<T: Into<String>>(message: T) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的网络错误
    pub fn network_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Network {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建 API 错误
    pub fn api<T: Into<String>>(
        status: StatusCode,
        message: T,
        rate_limit: Option<RateLimitSnapshot>,
    ) -> Self {
        Self::Api {
            status,
            message: message.into(),
            rate_limit,
        }
    }

    /// 创建令牌刷新错误
    pub fn token_refresh<T: Into<String>>(message: T) -> Self {
        Self::TokenRefresh {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的令牌刷新错误
    pub fn token_refresh_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::TokenRefresh {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建握手错误
    pub fn handshake<T: Into<String>>(step: HandshakeStep, message: T) -> Self {
        Self::Handshake {
            step,
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的握手错误
    pub fn handshake_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        step: HandshakeStep,
        message: T,
        source: E,
    ) -> Self {
        Self::Handshake {
            step,
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建解码错误
    pub fn decode<T: Into<String>>(message: T) -> Self {
        Self::Decode {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的解码错误
    pub fn decode_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Decode {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建分页错误
    pub fn pagination<T: Into<String>>(message: T) -> Self {
        Self::Pagination {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的分页错误
    pub fn pagination_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Pagination {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建 profile 错误
    pub fn profile<T: Into<String>>(message: T) -> Self {
        Self::Profile {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的 profile 错误
    pub fn profile_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Profile {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建内部错误
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的内部错误
    pub fn internal_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 剥离 `Context` 包装，返回最内层的错误
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// 错误携带的速率限制信息（仅 API 错误）
    #[must_use]
    pub fn rate_limit(&self) -> Option<&RateLimitSnapshot> {
        match self.root() {
            Self::Api { rate_limit, .. } => rate_limit.as_ref(),
            _ => None,
        }
    }

    /// 错误分类，用于日志级别和上层重试策略判断
    #[must_use]
    pub fn category(&self) -> super::ErrorCategory {
        match self.root() {
            Self::Config { .. }
            | Self::Pagination { .. }
            | Self::Profile { .. }
            | Self::Handshake { .. } => super::ErrorCategory::Client,
            Self::Api { status, .. } if status.is_client_error() => super::ErrorCategory::Client,
            _ => super::ErrorCategory::Server,
        }
    }
}
