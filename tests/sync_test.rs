//! 用户/分组/角色同步集成测试

mod common;

use baton_aruba_central::ConnectorError;
use baton_aruba_central::config::RoleDetailSource;
use baton_aruba_central::connector::{
    Connector, GroupSyncer, PageCursor, ResourceSyncer, RoleSyncer, UserSyncer, drain_pages,
};
use common::*;
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::Value;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn numbered_users(range: std::ops::Range<usize>) -> Vec<Value> {
    range
        .map(|i| user_json(&format!("user{i:03}"), "User", &i.to_string(), &[]))
        .collect()
}

async fn mount_roles(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(ROLES_PATH))
        .and(query_param("limit", "50"))
        .and(query_param("offset", "0"))
        .and(query_param("app_name", "nms"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_body(vec![admin_role_json()], 1)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn user_listing_walks_every_page() {
    let server = MockServer::start().await;
    mount_users_page(&server, 0, numbered_users(0..50), 60).await;
    mount_users_page(&server, 50, numbered_users(50..60), 60).await;

    let syncer = UserSyncer::new(anonymous_client(&server));

    let first = syncer.list("").await.unwrap();
    assert_eq!(first.items.len(), 50);
    assert!(first.has_more());
    assert_eq!(PageCursor::decode(&first.next_page_token, "user").unwrap().offset, 50);

    let second = syncer.list(&first.next_page_token).await.unwrap();
    assert_eq!(second.items.len(), 10);
    assert!(!second.has_more());

    let all = drain_pages("users", |token| {
        let syncer = &syncer;
        async move { syncer.list(&token).await }
    })
    .await
    .unwrap();
    assert_eq!(all.len(), 60);
    assert_eq!(all[59].id.resource, "user059");
}

#[tokio::test]
async fn users_have_no_entitlements() {
    let server = MockServer::start().await;
    let syncer = UserSyncer::new(anonymous_client(&server));
    let resource = baton_aruba_central::connector::users::user_resource(&Default::default());

    assert!(syncer.entitlements(&resource, "").await.unwrap().items.is_empty());
    assert!(syncer.grants(&resource, "").await.unwrap().items.is_empty());
    assert!(syncer.resource_type().skips_entitlements_and_grants());
}

#[tokio::test]
async fn group_listing_flattens_configuration_groups() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(GROUPS_PATH))
        .and(query_param("limit", "50"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(group_body(
            &[&["default"], &["eng", "ops"]],
            3,
        )))
        .mount(&server)
        .await;

    let page = GroupSyncer::new(anonymous_client(&server)).list("").await.unwrap();
    let names: Vec<&str> = page.items.iter().map(|r| r.id.resource.as_str()).collect();
    assert_eq!(names, vec!["default", "eng", "ops"]);
    assert!(!page.has_more());
}

#[tokio::test]
async fn group_grants_are_derived_from_user_scopes() {
    let server = MockServer::start().await;
    mount_users_page(
        &server,
        0,
        vec![
            user_json("alice", "Alice", "Liddell", &[&["eng", "ops"], &["eng"]]),
            user_json("bob", "Bob", "Builder", &[&["ops"]]),
            user_json("carol", "Carol", "Danvers", &[]),
        ],
        3,
    )
    .await;

    let syncer = GroupSyncer::new(anonymous_client(&server));
    let eng = baton_aruba_central::connector::groups::group_resource("eng");
    let ops = baton_aruba_central::connector::groups::group_resource("ops");
    let sales = baton_aruba_central::connector::groups::group_resource("sales");

    let principals = |grants: Vec<baton_aruba_central::connector::Grant>| -> Vec<String> {
        grants.into_iter().map(|g| g.principal.resource).collect()
    };

    assert_eq!(principals(syncer.grants(&eng, "").await.unwrap().items), vec!["alice"]);
    assert_eq!(principals(syncer.grants(&ops, "").await.unwrap().items), vec!["alice", "bob"]);
    assert!(syncer.grants(&sales, "").await.unwrap().items.is_empty());
}

#[tokio::test]
async fn group_grants_page_through_users() {
    let server = MockServer::start().await;
    let mut first_page = numbered_users(0..49);
    first_page.push(user_json("alice", "Alice", "Liddell", &[&["eng"]]));
    mount_users_page(&server, 0, first_page, 52).await;
    mount_users_page(
        &server,
        50,
        vec![
            user_json("bob", "Bob", "Builder", &[&["eng"]]),
            user_json("carol", "Carol", "Danvers", &[&["ops"]]),
        ],
        52,
    )
    .await;

    let syncer = GroupSyncer::new(anonymous_client(&server));
    let eng = baton_aruba_central::connector::groups::group_resource("eng");

    let grants = drain_pages("group grants", |token| {
        let syncer = &syncer;
        let eng = &eng;
        async move { syncer.grants(eng, &token).await }
    })
    .await
    .unwrap();

    let ids: Vec<&str> = grants.iter().map(|g| g.id.as_str()).collect();
    assert_eq!(ids, vec!["group:eng:member:user:alice", "group:eng:member:user:bob"]);
}

#[tokio::test]
async fn group_grants_reject_foreign_cursor() {
    let server = MockServer::start().await;
    let syncer = GroupSyncer::new(anonymous_client(&server));
    let eng = baton_aruba_central::connector::groups::group_resource("eng");
    let role_token = PageCursor::start("role").next_token(500).unwrap();

    let err = syncer.grants(&eng, &role_token).await.unwrap_err();
    assert!(matches!(err, ConnectorError::Pagination { .. }));
}

#[rstest]
#[case::profile_snapshot(RoleDetailSource::Profile, 0)]
#[case::role_detail_api(RoleDetailSource::Api, 2)]
#[tokio::test]
async fn role_scenario_yields_three_entitlements_and_six_grants(
    #[case] source: RoleDetailSource,
    #[case] detail_calls: u64,
) {
    let server = MockServer::start().await;
    mount_roles(&server).await;
    Mock::given(method("GET"))
        .and(path("/platform/rbac/v1/apps/nms/roles/Admin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(admin_role_json()))
        .expect(detail_calls)
        .mount(&server)
        .await;

    let syncer = RoleSyncer::new(anonymous_client(&server), source);
    let page = syncer.list("").await.unwrap();
    assert_eq!(page.items.len(), 1);
    let role = &page.items[0];
    assert_eq!(role.id.resource, "admin");
    assert_eq!(role.display_name, "Admin");

    let entitlements = syncer.entitlements(role, "").await.unwrap().items;
    let slugs: Vec<&str> = entitlements.iter().map(|e| e.slug.as_str()).collect();
    assert_eq!(slugs, vec!["member", "nms-write", "nms-write-monitor"]);

    let grants = syncer.grants(role, "").await.unwrap().items;
    let ids: Vec<&str> = grants.iter().map(|g| g.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "role:admin:member:user:alice",
            "role:admin:nms-write:user:alice",
            "role:admin:nms-write-monitor:user:alice",
            "role:admin:member:user:bob",
            "role:admin:nms-write:user:bob",
            "role:admin:nms-write-monitor:user:bob",
        ]
    );
}

#[tokio::test]
async fn role_detail_api_error_is_propagated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/platform/rbac/v1/apps/nms/roles/Admin"))
        .respond_with(ResponseTemplate::new(404).set_body_json(error_body("role not found", 404)))
        .mount(&server)
        .await;

    let syncer = RoleSyncer::new(anonymous_client(&server), RoleDetailSource::Api);
    let role = baton_aruba_central::connector::Resource::new("role", "admin", "Admin");

    let err = syncer.entitlements(&role, "").await.unwrap_err();
    assert!(matches!(err.root(), ConnectorError::Api { .. }));
    assert!(err.to_string().contains("role not found"));
}

#[tokio::test]
async fn full_sync_collects_every_resource_type() {
    let server = MockServer::start().await;
    mount_users_page(
        &server,
        0,
        vec![
            user_json("alice", "Alice", "Liddell", &[&["eng"]]),
            user_json("bob", "Bob", "Builder", &[&["ops"]]),
        ],
        2,
    )
    .await;
    mount_roles(&server).await;
    Mock::given(method("GET"))
        .and(path(GROUPS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(group_body(&[&["eng", "ops"]], 2)))
        .mount(&server)
        .await;

    let connector = Connector::from_client(anonymous_client(&server), RoleDetailSource::Profile);
    let snapshot = connector.sync_all().await.unwrap();

    let types: Vec<&str> = snapshot.resource_types.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(types, vec!["user", "role", "group"]);
    // 2 用户 + 1 角色 + 2 分组
    assert_eq!(snapshot.resources.len(), 5);
    // 角色 3 个 + 每个分组 1 个
    assert_eq!(snapshot.entitlements.len(), 5);
    // 角色 6 个 + 每个分组 1 个成员
    assert_eq!(snapshot.grants.len(), 8);

}

#[tokio::test]
async fn validate_requests_single_user() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(USERS_PATH))
        .and(query_param("limit", "1"))
        .and(query_param("offset", "0"))
        .respond_with(ok_with_quota(list_body(
            vec![user_json("alice", "Alice", "Liddell", &[])],
            40,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let connector = Connector::from_client(anonymous_client(&server), RoleDetailSource::Profile);
    let annotations = connector.validate().await.unwrap();
    assert_eq!(annotations.len(), 1);
    assert_eq!(connector.metadata().display_name, "ArubaCentral");
}

#[tokio::test]
async fn failing_list_aborts_sync() {
    let server = MockServer::start().await;
    mount_users_page(&server, 0, Vec::new(), 0).await;
    mount_roles(&server).await;
    Mock::given(method("GET"))
        .and(path(GROUPS_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let connector = Connector::from_client(anonymous_client(&server), RoleDetailSource::Profile);
    let err = connector.sync_all().await.unwrap_err();

    match err.root() {
        ConnectorError::Api { message, .. } => assert_eq!(message, "unexpected status code: 503"),
        other => panic!("unexpected error: {other:?}"),
    }
}
