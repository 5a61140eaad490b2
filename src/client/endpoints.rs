//! # 接口地址

use url::Url;

use crate::error::{ConnectorError, Result};

pub const USERS_ENDPOINT: &str = "/platform/rbac/v1/users";
pub const ROLES_ENDPOINT: &str = "/platform/rbac/v1/roles";
pub const GROUPS_ENDPOINT: &str = "/configuration/v2/groups";
/// 单个角色详情：`/platform/rbac/v1/apps/{app}/roles/{rolename}`
pub const ROLE_DETAIL_SEGMENTS: [&str; 5] = ["platform", "rbac", "v1", "apps", "nms"];

pub const LOGIN_ENDPOINT: &str = "/oauth2/authorize/central/api/login";
pub const AUTH_CODE_ENDPOINT: &str = "/oauth2/authorize/central/api";
pub const TOKEN_ENDPOINT: &str = "/oauth2/token";

/// 基于网关主机构造的全部接口地址
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoints {
    base: Url,
}

impl ApiEndpoints {
    /// 从主机名构造；不带 scheme 时默认 https
    pub fn from_base_host(base_host: &str) -> Result<Self> {
        let host = base_host.trim().trim_end_matches('/');
        if host.is_empty() {
            return Err(ConnectorError::config("api base host must not be empty"));
        }

        let raw = if host.contains("://") {
            host.to_string()
        } else {
            format!("https://{host}")
        };

        let base = Url::parse(&raw).map_err(|e| {
            ConnectorError::config_with_source(format!("invalid api base host: {base_host}"), e)
        })?;

        if base.host_str().is_none() || !matches!(base.scheme(), "http" | "https") {
            return Err(ConnectorError::config(format!(
                "api base host must be an http(s) host: {base_host}"
            )));
        }

        Ok(Self { base })
    }

    fn join(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        url.set_path(path);
        url.set_query(None);
        url.set_fragment(None);
        url
    }

    #[must_use]
    pub fn users(&self) -> Url {
        self.join(USERS_ENDPOINT)
    }

    #[must_use]
    pub fn roles(&self) -> Url {
        self.join(ROLES_ENDPOINT)
    }

    #[must_use]
    pub fn groups(&self) -> Url {
        self.join(GROUPS_ENDPOINT)
    }

    /// 角色详情地址，角色名按路径段编码
    pub fn role(&self, role_name: &str) -> Result<Url> {
        let mut url = self.join("/");
        url.path_segments_mut()
            .map_err(|()| ConnectorError::internal("api base url cannot carry a path"))?
            .clear()
            .extend(ROLE_DETAIL_SEGMENTS)
            .push("roles")
            .push(role_name);
        Ok(url)
    }

    #[must_use]
    pub fn login(&self) -> Url {
        self.join(LOGIN_ENDPOINT)
    }

    #[must_use]
    pub fn authorize(&self) -> Url {
        self.join(AUTH_CODE_ENDPOINT)
    }

    #[must_use]
    pub fn token(&self) -> Url {
        self.join(TOKEN_ENDPOINT)
    }
}
