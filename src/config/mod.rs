//! # 配置管理模块
//!
//! 处理配置加载、环境变量覆盖和启动前验证

mod app_config;
mod manager;

pub use app_config::{
    AppConfig, ArubaConfig, DEFAULT_BASE_HOST, LoggingConfig, RoleDetailSource, SyncConfig,
};
pub use manager::{ENV_PREFIX, apply_env_overrides, load_config};

use crate::client::ApiEndpoints;
use crate::error::{ConnectorError, Result};

/// 验证配置有效性
///
/// 连接器只有在恰好一种凭据模式完整时才允许启动。
pub fn validate_config(config: &AppConfig) -> Result<()> {
    let aruba = &config.aruba;

    if aruba.client_id.trim().is_empty() || aruba.client_secret.trim().is_empty() {
        return Err(ConnectorError::config(
            "aruba-central-client-id and aruba-central-client-secret are required",
        ));
    }

    let refresh_flow = aruba.has_refresh_flow();
    let code_flow = aruba.has_code_flow();

    match (refresh_flow, code_flow) {
        (false, false) => {
            return Err(ConnectorError::config(
                "either username, password, and customer-id or access-token and refresh-token are required",
            ));
        }
        (true, true) => {
            return Err(ConnectorError::config(
                "ambiguous credentials: both access-token/refresh-token and username/password/customer-id are set",
            ));
        }
        (true, false) if aruba.any_code_flow_field() => {
            return Err(ConnectorError::config(
                "ambiguous credentials: refresh token flow selected but code flow fields are also set",
            ));
        }
        (false, true) if aruba.any_refresh_flow_field() => {
            return Err(ConnectorError::config(
                "ambiguous credentials: code flow selected but access-token/refresh-token are also set",
            ));
        }
        _ => {}
    }

    crate::ensure_config!(
        config.sync.request_timeout_secs > 0,
        "request timeout must be greater than 0"
    );

    ApiEndpoints::from_base_host(&aruba.base_host)?;

    Ok(())
}
