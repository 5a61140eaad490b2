//! # Aruba Central API 客户端
//!
//! 三个分页列表接口 + 角色详情接口的请求构造。所有请求经过共享的
//! [`HttpTransport`]，每个响应都附带速率限制快照。

pub mod endpoints;
pub mod models;
pub mod rate_limit;

pub use endpoints::ApiEndpoints;
pub use models::{Application, Module, Role, RoleMember, User};
pub use rate_limit::{RateLimitSnapshot, RateLimitStatus, extract_rate_limit};

use reqwest::header::{ACCEPT, HeaderValue};
use reqwest::{Method, Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use url::Url;

use crate::auth::HttpTransport;
use crate::error::{ConnectorError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, lwarn};
use models::{ErrorResponse, GroupListResponse, ListResponse};

/// users/roles 接口需要的应用名参数
pub const APP_NAME: &str = "nms";

/// 把非 2xx 响应转换为错误描述
///
/// 响应体是上游错误格式时使用其中的信息，否则只报告状态码。
pub(crate) async fn failure_message(response: Response) -> String {
    let status = response.status();
    let body = response.text().await;
    describe_failure(status, body)
}

fn describe_failure<E: fmt::Display>(status: StatusCode, body: std::result::Result<String, E>) -> String {
    let body = match body {
        Ok(body) => body,
        Err(e) => {
            ldebug!(
                "system",
                LogStage::ExternalApi,
                LogComponent::Client,
                "error_body_unreadable",
                &format!("读取错误响应体失败 ({}): {e}", status.as_u16())
            );
            String::new()
        }
    };

    serde_json::from_str::<ErrorResponse>(&body).map_or_else(
        |_| format!("unexpected status code: {}", status.as_u16()),
        |e| e.message(),
    )
}

/// 偏移分页参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationVars {
    pub limit: u32,
    pub offset: u32,
}

impl PaginationVars {
    #[must_use]
    pub const fn new(limit: u32, offset: u32) -> Self {
        Self { limit, offset }
    }

    fn apply(&self, url: &mut Url) {
        url.query_pairs_mut()
            .append_pair("limit", &self.limit.to_string())
            .append_pair("offset", &self.offset.to_string());
    }
}

/// 一页列表结果
#[derive(Debug, Clone)]
pub struct ListResult<T> {
    pub items: Vec<T>,
    /// 所有页的总条目数
    pub total: u32,
    pub rate_limit: Option<RateLimitSnapshot>,
}

/// API 客户端
#[derive(Debug, Clone)]
pub struct ArubaClient {
    transport: Arc<dyn HttpTransport>,
    endpoints: ApiEndpoints,
}

impl ArubaClient {
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>, endpoints: ApiEndpoints) -> Self {
        Self {
            transport,
            endpoints,
        }
    }

    /// 列出用户
    pub async fn list_users(&self, page: PaginationVars) -> Result<ListResult<User>> {
        let mut url = self.endpoints.users();
        page.apply(&mut url);
        url.query_pairs_mut().append_pair("app_name", APP_NAME);

        let (body, rate_limit) = self.get_json::<ListResponse<User>>(url, "users").await?;
        Ok(ListResult {
            items: body.items,
            total: body.total,
            rate_limit,
        })
    }

    /// 列出角色
    pub async fn list_roles(&self, page: PaginationVars) -> Result<ListResult<Role>> {
        let mut url = self.endpoints.roles();
        page.apply(&mut url);
        url.query_pairs_mut().append_pair("app_name", APP_NAME);

        let (body, rate_limit) = self.get_json::<ListResponse<Role>>(url, "roles").await?;
        Ok(ListResult {
            items: body.items,
            total: body.total,
            rate_limit,
        })
    }

    /// 列出分组（展开配置分组的嵌套列表）
    pub async fn list_groups(&self, page: PaginationVars) -> Result<ListResult<String>> {
        let mut url = self.endpoints.groups();
        page.apply(&mut url);

        let (body, rate_limit) = self.get_json::<GroupListResponse>(url, "groups").await?;
        let total = body.total;
        Ok(ListResult {
            items: body.flatten(),
            total,
            rate_limit,
        })
    }

    /// 获取单个角色详情
    pub async fn get_role(&self, role_name: &str) -> Result<(Role, Option<RateLimitSnapshot>)> {
        let url = self.endpoints.role(role_name)?;
        self.get_json::<Role>(url, "role").await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        what: &str,
    ) -> Result<(T, Option<RateLimitSnapshot>)> {
        ldebug!(
            "system",
            LogStage::ExternalApi,
            LogComponent::Client,
            "api_request",
            &format!("GET {} ({what})", url.path())
        );

        let mut request = Request::new(Method::GET, url);
        request
            .headers_mut()
            .insert(ACCEPT, HeaderValue::from_static("application/json"));

        let response = self.transport.execute(request).await?;
        let status = response.status();
        let rate_limit = extract_rate_limit(status, response.headers());

        if !status.is_success() {
            let rate_limit = match rate_limit {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    lwarn!(
                        "system",
                        LogStage::ExternalApi,
                        LogComponent::RateLimit,
                        "rate_limit_parse_fail",
                        &format!("错误响应的速率限制头无法解析: {e}")
                    );
                    None
                }
            };
            let message = failure_message(response).await;
            lwarn!(
                "system",
                LogStage::ExternalApi,
                LogComponent::Client,
                "api_error",
                &format!("{what} 请求失败: {} {message}", status.as_u16())
            );
            return Err(ConnectorError::api(status, message, rate_limit));
        }

        let rate_limit = rate_limit?;
        if let Some(snapshot) = rate_limit.as_ref().filter(|s| s.is_over_limit()) {
            ldebug!(
                "system",
                LogStage::ExternalApi,
                LogComponent::RateLimit,
                "over_limit",
                &format!(
                    "{what} 配额已耗尽，重置时间 {}",
                    snapshot.reset_at.format("%Y-%m-%d %H:%M:%S UTC")
                )
            );
        }

        let bytes = response.bytes().await?;
        let data = serde_json::from_slice::<T>(&bytes).map_err(|e| {
            ConnectorError::decode_with_source(format!("failed to decode {what} response"), e)
        })?;

        Ok((data, rate_limit))
    }
}
