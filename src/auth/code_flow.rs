//! # 交互式授权码流程
//!
//! 三步顺序请求：
//! 1. 用户名/密码登录，从 `X-CSRF-TOKEN` cookie 取得 CSRF 令牌
//! 2. 携带 CSRF 头提交 customer id，换取授权码
//! 3. 用授权码交换访问令牌
//!
//! 每次尝试使用新的 cookie jar，失败后下次从第一步重新开始。

use chrono::Utc;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::USER_AGENT;
use super::token::{Token, TokenResponse};
use crate::client::{ApiEndpoints, failure_message};
use crate::error::{ConnectorError, HandshakeStep, Result};
use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, linfo, lwarn};

/// CSRF cookie 名，同时作为第二步的请求头名
pub const CSRF_COOKIE: &str = "X-CSRF-TOKEN";

/// 登录凭据
#[derive(Clone, PartialEq, Eq)]
pub struct CodeFlowCredentials {
    pub username: String,
    pub password: String,
    pub customer_id: String,
}

impl fmt::Debug for CodeFlowCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodeFlowCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .field("customer_id", &self.customer_id)
            .finish()
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct AuthorizeRequest<'a> {
    customer_id: &'a str,
}

#[derive(Deserialize)]
struct AuthorizeResponse {
    #[serde(default)]
    auth_code: String,
}

#[derive(Serialize)]
struct CodeExchangeRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    grant_type: &'a str,
    code: &'a str,
}

/// 执行完整的三步握手，返回初始令牌
pub async fn acquire_token(
    endpoints: &ApiEndpoints,
    client_id: &str,
    client_secret: &str,
    credentials: &CodeFlowCredentials,
    timeout: Duration,
) -> Result<Token> {
    let jar = Arc::new(Jar::default());
    let client = Client::builder()
        .cookie_provider(Arc::clone(&jar))
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| ConnectorError::internal_with_source("failed to build login http client", e))?;

    let csrf_token = login(&client, &jar, endpoints, client_id, credentials).await?;
    let auth_code = authorize(&client, endpoints, client_id, &csrf_token, credentials).await?;
    let response = exchange_code(&client, endpoints, client_id, client_secret, &auth_code).await?;
    let token = Token::from_response(response, None, Utc::now()).map_err(|e| {
        ConnectorError::handshake_with_source(HandshakeStep::TokenExchange, "invalid token lifetime", e)
    })?;

    linfo!(
        "system",
        LogStage::Authentication,
        LogComponent::Auth,
        "code_flow_success",
        &format!("交互式登录完成: {}", credentials.username)
    );
    Ok(token)
}

async fn login(
    client: &Client,
    jar: &Jar,
    endpoints: &ApiEndpoints,
    client_id: &str,
    credentials: &CodeFlowCredentials,
) -> Result<String> {
    let mut url = endpoints.login();
    url.query_pairs_mut().append_pair("client_id", client_id);

    ldebug!(
        "system",
        LogStage::Authentication,
        LogComponent::Auth,
        "login",
        &format!("登录: {}", credentials.username)
    );

    let response = client
        .post(url.clone())
        .json(&LoginRequest {
            username: &credentials.username,
            password: &credentials.password,
        })
        .send()
        .await
        .map_err(|e| ConnectorError::handshake_with_source(HandshakeStep::Login, "request failed", e))?;

    ensure_success(HandshakeStep::Login, response).await?;

    csrf_from_jar(jar, &url).ok_or_else(|| {
        ConnectorError::handshake(
            HandshakeStep::Login,
            format!("response did not set the {CSRF_COOKIE} cookie"),
        )
    })
}

async fn authorize(
    client: &Client,
    endpoints: &ApiEndpoints,
    client_id: &str,
    csrf_token: &str,
    credentials: &CodeFlowCredentials,
) -> Result<String> {
    let mut url = endpoints.authorize();
    url.query_pairs_mut()
        .append_pair("client_id", client_id)
        .append_pair("response_type", "code")
        .append_pair("scope", "all");

    let response = client
        .post(url)
        .header(CSRF_COOKIE, csrf_token)
        .json(&AuthorizeRequest {
            customer_id: &credentials.customer_id,
        })
        .send()
        .await
        .map_err(|e| {
            ConnectorError::handshake_with_source(HandshakeStep::Authorization, "request failed", e)
        })?;

    let response = ensure_success(HandshakeStep::Authorization, response).await?;
    let body = response.json::<AuthorizeResponse>().await.map_err(|e| {
        ConnectorError::handshake_with_source(HandshakeStep::Authorization, "invalid response body", e)
    })?;

    if body.auth_code.is_empty() {
        return Err(ConnectorError::handshake(
            HandshakeStep::Authorization,
            "response did not contain an authorization code",
        ));
    }
    Ok(body.auth_code)
}

async fn exchange_code(
    client: &Client,
    endpoints: &ApiEndpoints,
    client_id: &str,
    client_secret: &str,
    auth_code: &str,
) -> Result<TokenResponse> {
    let response = client
        .post(endpoints.token())
        .json(&CodeExchangeRequest {
            client_id,
            client_secret,
            grant_type: "authorization_code",
            code: auth_code,
        })
        .send()
        .await
        .map_err(|e| {
            ConnectorError::handshake_with_source(HandshakeStep::TokenExchange, "request failed", e)
        })?;

    let response = ensure_success(HandshakeStep::TokenExchange, response).await?;
    response.json::<TokenResponse>().await.map_err(|e| {
        ConnectorError::handshake_with_source(HandshakeStep::TokenExchange, "invalid response body", e)
    })
}

/// 非 200 响应直接终止握手
async fn ensure_success(step: HandshakeStep, response: Response) -> Result<Response> {
    if response.status() == StatusCode::OK {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let message = failure_message(response).await;
    lwarn!(
        "system",
        LogStage::Authentication,
        LogComponent::Auth,
        "code_flow_fail",
        &format!("{step} 步骤失败: {status} {message}")
    );
    Err(ConnectorError::handshake(step, message))
}

/// 从 jar 中读取对 `url` 可见的 CSRF cookie
fn csrf_from_jar(jar: &Jar, url: &Url) -> Option<String> {
    let header = jar.cookies(url)?;
    let cookies = header.to_str().ok()?;
    find_cookie(cookies, CSRF_COOKIE)
}

fn find_cookie(cookies: &str, name: &str) -> Option<String> {
    cookies
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}
