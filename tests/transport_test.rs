//! 认证传输与令牌刷新集成测试

mod common;

use baton_aruba_central::ConnectorError;
use baton_aruba_central::auth::Token;
use baton_aruba_central::client::{PaginationVars, RateLimitStatus};
use common::*;
use futures::future::join_all;
use reqwest::StatusCode;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn refresh_mock() -> wiremock::MockBuilder {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(query_param("client_id", CLIENT_ID))
        .and(query_param("client_secret", CLIENT_SECRET))
        .and(query_param("grant_type", "refresh_token"))
        .and(query_param("refresh_token", "rt-0"))
}

async fn mount_users_for(server: &MockServer, access_token: &str, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(USERS_PATH))
        .and(header("Authorization", format!("Bearer {access_token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_body(
            vec![user_json("alice", "Alice", "Liddell", &[])],
            1,
        )))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn bootstrap_token_refreshes_before_first_request() {
    let server = MockServer::start().await;
    refresh_mock()
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("at-1", "rt-1", 7200)))
        .expect(1)
        .mount(&server)
        .await;
    mount_users_for(&server, "at-1", 2).await;

    let transport = authenticated_transport(&server, Token::bootstrap("at-0", "rt-0"));
    let client = authenticated_client(&server, transport.clone());

    client.list_users(PaginationVars::new(50, 0)).await.unwrap();
    client.list_users(PaginationVars::new(50, 0)).await.unwrap();

    let token = transport.current_token().await;
    assert_eq!(token.access_token, "at-1");
    assert_eq!(token.refresh_token, "rt-1");
    assert!(!token.is_stale());
}

#[tokio::test]
async fn concurrent_requests_share_one_refresh() {
    let server = MockServer::start().await;
    refresh_mock()
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_body("at-1", "rt-1", 7200))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_users_for(&server, "at-1", 10).await;

    let transport = authenticated_transport(&server, Token::bootstrap("at-0", "rt-0"));
    let client = authenticated_client(&server, transport);

    let results = join_all((0..10).map(|_| client.list_users(PaginationVars::new(50, 0)))).await;
    assert!(results.iter().all(Result::is_ok));
}

#[tokio::test]
async fn failed_refresh_is_retried_on_next_request() {
    let server = MockServer::start().await;
    refresh_mock()
        .respond_with(ResponseTemplate::new(400).set_body_json(error_body("invalid_grant", 400)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    refresh_mock()
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("at-1", "rt-1", 7200)))
        .expect(1)
        .mount(&server)
        .await;
    mount_users_for(&server, "at-1", 1).await;

    let transport = authenticated_transport(&server, Token::bootstrap("at-0", "rt-0"));
    let client = authenticated_client(&server, transport.clone());

    let err = client.list_users(PaginationVars::new(50, 0)).await.unwrap_err();
    assert!(matches!(err, ConnectorError::TokenRefresh { .. }));
    assert_eq!(
        err.to_string(),
        "failed to refresh token: error: invalid_grant, status code: 400"
    );
    // 失败后旧令牌保留
    assert_eq!(transport.current_token().await, Token::bootstrap("at-0", "rt-0"));

    client.list_users(PaginationVars::new(50, 0)).await.unwrap();
    assert_eq!(transport.current_token().await.access_token, "at-1");
}

#[tokio::test]
async fn oversized_refresh_lifetime_keeps_old_token() {
    let server = MockServer::start().await;
    refresh_mock()
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("at-1", "rt-1", i64::MAX)))
        .expect(1)
        .mount(&server)
        .await;

    let transport = authenticated_transport(&server, Token::bootstrap("at-0", "rt-0"));
    let client = authenticated_client(&server, transport.clone());

    let err = client.list_users(PaginationVars::new(50, 0)).await.unwrap_err();
    assert!(matches!(err, ConnectorError::TokenRefresh { .. }));
    assert_eq!(transport.current_token().await, Token::bootstrap("at-0", "rt-0"));
}

#[tokio::test]
async fn cancelled_caller_does_not_abort_refresh() {
    let server = MockServer::start().await;
    refresh_mock()
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_body("at-1", "rt-1", 7200))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_users_for(&server, "at-1", 1).await;

    let transport = authenticated_transport(&server, Token::bootstrap("at-0", "rt-0"));
    let client = authenticated_client(&server, transport.clone());

    let cancelled = tokio::time::timeout(
        Duration::from_millis(50),
        client.list_users(PaginationVars::new(50, 0)),
    )
    .await;
    assert!(cancelled.is_err());

    // 第二个请求等待仍在进行的刷新，不会再次刷新
    client.list_users(PaginationVars::new(50, 0)).await.unwrap();
    assert_eq!(transport.current_token().await.access_token, "at-1");
}

#[tokio::test]
async fn api_error_carries_message_and_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(USERS_PATH))
        .respond_with(
            ResponseTemplate::new(429)
                .set_body_json(error_body("Too many requests", 429))
                .insert_header("X-Ratelimit-Limit-second", "7")
                .insert_header("X-Ratelimit-Remaining-second", "0")
                .insert_header("X-Ratelimit-Remaining-day", "100"),
        )
        .mount(&server)
        .await;

    let transport = authenticated_transport(&server, fresh_token("at-live"));
    let client = authenticated_client(&server, transport);

    let err = client.list_users(PaginationVars::new(50, 0)).await.unwrap_err();
    match &err {
        ConnectorError::Api {
            status, message, ..
        } => {
            assert_eq!(*status, StatusCode::TOO_MANY_REQUESTS);
            assert_eq!(message, "error: Too many requests, status code: 429");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let snapshot = err.rate_limit().unwrap();
    assert_eq!(snapshot.status, RateLimitStatus::OverLimit);
    assert_eq!(snapshot.limit, 7);
}

#[tokio::test]
async fn successful_response_reports_day_quota() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(USERS_PATH))
        .respond_with(ok_with_quota(list_body(Vec::new(), 0)))
        .mount(&server)
        .await;

    let client = anonymous_client(&server);
    let result = client.list_users(PaginationVars::new(50, 0)).await.unwrap();

    let snapshot = result.rate_limit.unwrap();
    assert_eq!(snapshot.status, RateLimitStatus::Ok);
    assert_eq!(snapshot.limit, 5000);
    assert_eq!(snapshot.remaining, 4321);
    assert_eq!(snapshot.reset_at.to_rfc3339(), "2024-10-16T00:00:00+00:00");
}

#[tokio::test]
async fn malformed_quota_header_fails_call() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(USERS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(list_body(Vec::new(), 0))
                .insert_header("X-Ratelimit-Remaining-second", "many"),
        )
        .mount(&server)
        .await;

    let err = anonymous_client(&server)
        .list_users(PaginationVars::new(50, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectorError::Decode { .. }));
}
