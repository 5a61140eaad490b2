//! # 配置加载
//!
//! TOML 文件 + `BATON_*` 环境变量覆盖，最后统一验证

use std::env;
use std::path::Path;
use tracing::{debug, info, warn};

use super::{AppConfig, validate_config};
use crate::error::{ConnectorError, Result};

/// 环境变量前缀
pub const ENV_PREFIX: &str = "BATON_";

/// 加载配置
///
/// 提供路径时读取该 TOML 文件（文件必须存在），否则从默认值开始；
/// 然后应用进程环境变量覆盖并验证。
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let mut config = match path {
        Some(path) => load_config_file(path)?,
        None => {
            debug!("未指定配置文件，使用默认配置 + 环境变量");
            AppConfig::default()
        }
    };

    let applied = apply_env_overrides(&mut config, env::vars())?;
    info!("配置加载完成，环境变量覆盖: {} 个", applied);

    validate_config(&config)?;
    Ok(config)
}

/// 加载配置文件
fn load_config_file(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Err(ConnectorError::config(format!(
            "配置文件不存在: {}",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        ConnectorError::config_with_source(format!("读取配置文件失败: {}", path.display()), e)
    })?;

    toml::from_str(&content).map_err(|e| {
        ConnectorError::config_with_source(
            format!("TOML解析失败 - 配置文件: {}", path.display()),
            e,
        )
    })
}

/// 应用环境变量覆盖，返回生效的覆盖数量
///
/// 只处理 `BATON_` 前缀的变量；未知键记录警告后忽略。
pub fn apply_env_overrides<I>(config: &mut AppConfig, vars: I) -> Result<usize>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut applied = 0;

    for (key, value) in vars {
        let Some(name) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };

        let sensitive = name.contains("PASSWORD") || name.contains("SECRET") || name.contains("TOKEN");
        debug!(
            "应用环境变量覆盖: {} = {}",
            key,
            if sensitive { "***" } else { value.as_str() }
        );

        if apply_override(config, name, value)? {
            applied += 1;
        } else {
            warn!("未知的配置项，忽略环境变量覆盖: {}", key);
        }
    }

    Ok(applied)
}

fn apply_override(config: &mut AppConfig, name: &str, value: String) -> Result<bool> {
    let aruba = &mut config.aruba;
    match name {
        "API_BASE_HOST" => aruba.base_host = value,
        "ARUBA_CENTRAL_CLIENT_ID" => aruba.client_id = value,
        "ARUBA_CENTRAL_CLIENT_SECRET" => aruba.client_secret = value,
        "ACCESS_TOKEN" => aruba.access_token = Some(value),
        "REFRESH_TOKEN" => aruba.refresh_token = Some(value),
        "USERNAME" => aruba.username = Some(value),
        "PASSWORD" => aruba.password = Some(value),
        "CUSTOMER_ID" => aruba.customer_id = Some(value),
        "ROLE_DETAIL_SOURCE" => {
            config.sync.role_detail_source = value.parse().map_err(ConnectorError::config)?;
        }
        "REQUEST_TIMEOUT_SECS" => {
            config.sync.request_timeout_secs = value.parse().map_err(|e| {
                ConnectorError::config_with_source(format!("无效的请求超时: {value}"), e)
            })?;
        }
        "LOG_LEVEL" => config.logging.level = value,
        _ => return Ok(false),
    }
    Ok(true)
}
