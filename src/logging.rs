//! # 日志配置模块
//!
//! 提供日志系统初始化，以及带阶段/组件标签的结构化日志宏

use std::env;
use std::fmt;
use tracing_subscriber::{
    EnvFilter, Registry, fmt as tfmt, layer::SubscriberExt, reload, util::SubscriberInitExt,
};

use crate::error::{ConnectorError, Result};

/// 日志所处的处理阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStage {
    Startup,
    Configuration,
    Authentication,
    ExternalApi,
    Sync,
    Shutdown,
    Error,
}

impl fmt::Display for LogStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Startup => "startup",
            Self::Configuration => "configuration",
            Self::Authentication => "authentication",
            Self::ExternalApi => "external_api",
            Self::Sync => "sync",
            Self::Shutdown => "shutdown",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// 产生日志的组件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogComponent {
    Main,
    Config,
    Auth,
    Transport,
    Client,
    RateLimit,
    UserSync,
    RoleSync,
    GroupSync,
    Connector,
}

impl fmt::Display for LogComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Main => "main",
            Self::Config => "config",
            Self::Auth => "auth",
            Self::Transport => "transport",
            Self::Client => "client",
            Self::RateLimit => "rate_limit",
            Self::UserSync => "user_sync",
            Self::RoleSync => "role_sync",
            Self::GroupSync => "group_sync",
            Self::Connector => "connector",
        };
        f.write_str(s)
    }
}

/// debug 级别结构化日志
#[macro_export]
macro_rules! ldebug {
    ($request_id:expr, $stage:expr, $component:expr, $operation:expr, $message:expr $(,)?) => {
        ::tracing::debug!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            operation = $operation,
            "{}",
            $message
        )
    };
}

/// info 级别结构化日志
#[macro_export]
macro_rules! linfo {
    ($request_id:expr, $stage:expr, $component:expr, $operation:expr, $message:expr $(,)?) => {
        ::tracing::info!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            operation = $operation,
            "{}",
            $message
        )
    };
}

/// warn 级别结构化日志
#[macro_export]
macro_rules! lwarn {
    ($request_id:expr, $stage:expr, $component:expr, $operation:expr, $message:expr $(,)?) => {
        ::tracing::warn!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            operation = $operation,
            "{}",
            $message
        )
    };
}

/// error 级别结构化日志
#[macro_export]
macro_rules! lerror {
    ($request_id:expr, $stage:expr, $component:expr, $operation:expr, $message:expr $(,)?) => {
        ::tracing::error!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            operation = $operation,
            "{}",
            $message
        )
    };
}

/// 构造默认过滤规则：全局级别 + 本 crate 的 debug 输出，压低 HTTP 栈的噪音
#[must_use]
pub fn default_filter(level: &str) -> String {
    format!("{level},baton_aruba_central=debug,hyper=warn,reqwest=warn,cookie_store=warn")
}

/// 日志过滤规则句柄，配置加载后可以调整级别
#[derive(Debug, Clone)]
pub struct LogHandle {
    filter: reload::Handle<EnvFilter, Registry>,
    env_override: bool,
}

impl LogHandle {
    /// 按配置的级别替换过滤规则；设置了 `RUST_LOG` 时保持不变
    pub fn set_level(&self, level: &str) -> Result<()> {
        if self.env_override {
            return Ok(());
        }
        self.filter
            .reload(EnvFilter::new(default_filter(level)))
            .map_err(|e| ConnectorError::internal_with_source("failed to update log filter", e))
    }
}

/// `RUST_LOG` 优先，否则使用给定级别
fn build_filter(level: &str) -> (EnvFilter, bool) {
    match env::var("RUST_LOG") {
        Ok(directives) => (EnvFilter::new(directives), true),
        Err(_) => (EnvFilter::new(default_filter(level)), false),
    }
}

/// 初始化日志系统
///
/// 在加载配置之前调用，配置阶段的日志才有输出。已初始化时返回 `None`。
pub fn init_logging(log_level: Option<&str>) -> Option<LogHandle> {
    let (filter, env_override) = build_filter(log_level.unwrap_or("info"));
    let (filter_layer, handle) = reload::Layer::new(filter);

    let result = tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            tfmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init();

    if result.is_err() {
        tracing::debug!("日志系统已初始化，跳过重复初始化");
        return None;
    }

    Some(LogHandle {
        filter: handle,
        env_override,
    })
}
