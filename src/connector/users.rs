//! # 用户同步
//!
//! 用户只是叶子主体：列出并映射为资源，不产生权益和授权。

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::pagination::PageCursor;
use super::sync::ResourceSyncer;
use super::types::{Annotation, Entitlement, Grant, Resource, ResourceType, SyncPage, USER_TYPE};
use crate::client::{ArubaClient, User};
use crate::error::{Context, Result};
use crate::ldebug;
use crate::logging::{LogComponent, LogStage};

/// 用户资源
#[must_use]
pub fn user_resource(user: &User) -> Resource {
    let mut profile = Map::new();
    profile.insert("login".to_string(), Value::from(user.username.as_str()));
    profile.insert("first_name".to_string(), Value::from(user.name.first.as_str()));
    profile.insert("last_name".to_string(), Value::from(user.name.last.as_str()));

    let full_name = user.full_name();
    let display_name = if full_name.is_empty() {
        user.username.clone()
    } else {
        full_name
    };

    Resource::new(USER_TYPE, user.username.as_str(), display_name).with_profile(profile)
}

#[derive(Debug, Clone)]
pub struct UserSyncer {
    client: ArubaClient,
}

impl UserSyncer {
    #[must_use]
    pub fn new(client: ArubaClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceSyncer for UserSyncer {
    fn resource_type(&self) -> ResourceType {
        ResourceType::user()
    }

    async fn list(&self, page_token: &str) -> Result<SyncPage<Resource>> {
        let cursor = PageCursor::decode(page_token, USER_TYPE)?;
        let result = self
            .client
            .list_users(cursor.page())
            .await
            .context("failed to list users")?;

        ldebug!(
            "system",
            LogStage::Sync,
            LogComponent::UserSync,
            "list_page",
            &format!(
                "用户页 offset={} 条数={} 总数={}",
                cursor.offset,
                result.items.len(),
                result.total
            )
        );

        let resources = result.items.iter().map(user_resource).collect();
        let next = cursor.next_token(result.total)?;
        Ok(SyncPage::new(
            resources,
            next,
            Annotation::from_rate_limit(result.rate_limit),
        ))
    }

    async fn entitlements(&self, _resource: &Resource, _page_token: &str) -> Result<SyncPage<Entitlement>> {
        Ok(SyncPage::empty())
    }

    async fn grants(&self, _resource: &Resource, _page_token: &str) -> Result<SyncPage<Grant>> {
        Ok(SyncPage::empty())
    }
}
