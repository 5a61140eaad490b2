//! 集成测试共用的 mock 服务与数据工厂

#![allow(dead_code)]

use baton_aruba_central::auth::{AuthenticatedTransport, HttpTransport, Token, TokenRefresher};
use baton_aruba_central::client::{ApiEndpoints, ArubaClient};
use chrono::{Duration, Utc};
use serde_json::{Value, json};
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CLIENT_ID: &str = "test-client";
pub const CLIENT_SECRET: &str = "test-secret";
pub const USERS_PATH: &str = "/platform/rbac/v1/users";
pub const ROLES_PATH: &str = "/platform/rbac/v1/roles";
pub const GROUPS_PATH: &str = "/configuration/v2/groups";
pub const TOKEN_PATH: &str = "/oauth2/token";
pub const LOGIN_PATH: &str = "/oauth2/authorize/central/api/login";
pub const AUTHORIZE_PATH: &str = "/oauth2/authorize/central/api";
pub const RESPONSE_DATE: &str = "Tue, 15 Oct 2024 13:45:10 GMT";

pub fn endpoints(server: &MockServer) -> ApiEndpoints {
    ApiEndpoints::from_base_host(&server.uri()).unwrap()
}

/// 不带认证的客户端
pub fn anonymous_client(server: &MockServer) -> ArubaClient {
    ArubaClient::new(Arc::new(reqwest::Client::new()), endpoints(server))
}

/// 带认证传输，初始令牌由调用方给出
pub fn authenticated_transport(server: &MockServer, token: Token) -> Arc<AuthenticatedTransport> {
    let inner: Arc<dyn HttpTransport> = Arc::new(reqwest::Client::new());
    let refresher = TokenRefresher::new(
        inner.clone(),
        endpoints(server).token(),
        CLIENT_ID,
        CLIENT_SECRET,
    );
    Arc::new(AuthenticatedTransport::new(inner, token, refresher))
}

pub fn authenticated_client(server: &MockServer, transport: Arc<AuthenticatedTransport>) -> ArubaClient {
    ArubaClient::new(transport, endpoints(server))
}

/// 一小时后过期的令牌
pub fn fresh_token(access_token: &str) -> Token {
    Token::new(access_token, "rt-fresh", Some(Utc::now() + Duration::hours(1)))
}

pub fn token_body(access_token: &str, refresh_token: &str, expires_in: i64) -> Value {
    json!({
        "access_token": access_token,
        "refresh_token": refresh_token,
        "expires_in": expires_in,
        "token_type": "bearer"
    })
}

pub fn error_body(error: &str, status_code: u16) -> Value {
    json!({ "error": error, "status_code": status_code })
}

/// 用户数据；每个元素是一个应用下的作用域分组
pub fn user_json(username: &str, first: &str, last: &str, scopes: &[&[&str]]) -> Value {
    let applications: Vec<Value> = scopes
        .iter()
        .enumerate()
        .map(|(i, groups)| {
            json!({
                "name": format!("app-{i}"),
                "info": [{ "role": "viewer", "scope": { "groups": groups } }]
            })
        })
        .collect();

    json!({
        "username": username,
        "name": { "firstname": first, "lastname": last },
        "applications": applications
    })
}

/// 两名成员、一个应用带一个模块的 Admin 角色
pub fn admin_role_json() -> Value {
    json!({
        "rolename": "Admin",
        "no_of_users": 2,
        "users": ["alice", "bob"],
        "applications": [{
            "appname": "nms",
            "permission": "write",
            "modules": [{ "module_name": "monitor", "permission": "read" }]
        }]
    })
}

pub fn list_body(items: Vec<Value>, total: usize) -> Value {
    json!({ "items": items, "total": total })
}

pub fn group_body(data: &[&[&str]], total: usize) -> Value {
    json!({ "data": data, "total": total })
}

/// 带健康配额头的 200 响应
pub fn ok_with_quota(body: Value) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_json(body)
        .insert_header("X-Ratelimit-Limit-second", "7")
        .insert_header("X-Ratelimit-Limit-day", "5000")
        .insert_header("X-Ratelimit-Remaining-second", "6")
        .insert_header("X-Ratelimit-Remaining-day", "4321")
        .insert_header("Date", RESPONSE_DATE)
}

/// 按 offset 挂载一页用户
pub async fn mount_users_page(server: &MockServer, offset: u32, users: Vec<Value>, total: usize) {
    Mock::given(method("GET"))
        .and(path(USERS_PATH))
        .and(query_param("limit", "50"))
        .and(query_param("offset", offset.to_string()))
        .and(query_param("app_name", "nms"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_body(users, total)))
        .mount(server)
        .await;
}
