//! # 应用配置结构定义

use serde::{Deserialize, Serialize};
use std::fmt;

/// 默认 API 网关（US West 5 区域）
pub const DEFAULT_BASE_HOST: &str = "apigw-uswest5.central.arubanetworks.com";

/// 应用主配置结构
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Aruba Central 连接与凭据
    pub aruba: ArubaConfig,
    /// 同步行为
    pub sync: SyncConfig,
    /// 日志配置
    pub logging: LoggingConfig,
}

/// Aruba Central 连接配置
///
/// 凭据二选一：`access_token + refresh_token`（refresh flow）或
/// `username + password + customer_id`（code flow）。
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArubaConfig {
    /// API 网关主机名；带 scheme 时原样使用
    pub base_host: String,
    /// OAuth 应用 client id
    pub client_id: String,
    /// OAuth 应用 client secret
    pub client_secret: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub customer_id: Option<String>,
}

impl Default for ArubaConfig {
    fn default() -> Self {
        Self {
            base_host: DEFAULT_BASE_HOST.to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            access_token: None,
            refresh_token: None,
            username: None,
            password: None,
            customer_id: None,
        }
    }
}

fn redact(value: Option<&String>) -> &'static str {
    match value {
        Some(v) if !v.is_empty() => "***",
        _ => "<unset>",
    }
}

impl fmt::Debug for ArubaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArubaConfig")
            .field("base_host", &self.base_host)
            .field("client_id", &self.client_id)
            .field("client_secret", &redact(Some(&self.client_secret)))
            .field("access_token", &redact(self.access_token.as_ref()))
            .field("refresh_token", &redact(self.refresh_token.as_ref()))
            .field("username", &self.username)
            .field("password", &redact(self.password.as_ref()))
            .field("customer_id", &self.customer_id)
            .finish()
    }
}

fn is_set(value: Option<&String>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

impl ArubaConfig {
    /// refresh flow 所需字段是否齐全
    #[must_use]
    pub fn has_refresh_flow(&self) -> bool {
        is_set(self.access_token.as_ref()) && is_set(self.refresh_token.as_ref())
    }

    /// code flow 所需字段是否齐全
    #[must_use]
    pub fn has_code_flow(&self) -> bool {
        is_set(self.username.as_ref())
            && is_set(self.password.as_ref())
            && is_set(self.customer_id.as_ref())
    }

    /// 是否设置了任意 refresh flow 字段
    #[must_use]
    pub fn any_refresh_flow_field(&self) -> bool {
        is_set(self.access_token.as_ref()) || is_set(self.refresh_token.as_ref())
    }

    /// 是否设置了任意 code flow 字段
    #[must_use]
    pub fn any_code_flow_field(&self) -> bool {
        is_set(self.username.as_ref())
            || is_set(self.password.as_ref())
            || is_set(self.customer_id.as_ref())
    }
}

/// 角色详情的获取方式，每个部署二选一
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleDetailSource {
    /// 从 List 时写入资源 profile 的快照中解码
    #[default]
    Profile,
    /// 每次调用角色详情接口重新获取
    Api,
}

impl std::str::FromStr for RoleDetailSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "profile" => Ok(Self::Profile),
            "api" => Ok(Self::Api),
            other => Err(format!("unknown role detail source: {other}")),
        }
    }
}

/// 同步行为配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// 角色权益/授权的推导来源
    pub role_detail_source: RoleDetailSource,
    /// 单次 HTTP 请求超时（秒）
    pub request_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            role_detail_source: RoleDetailSource::Profile,
            request_timeout_secs: 30,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
