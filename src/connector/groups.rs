//! # 分组同步
//!
//! 上游没有分组成员接口。分组授权通过重新分页扫描全部用户、
//! 逐个检查其应用作用域中的分组得到，每个分组的代价与用户数成正比。

use async_trait::async_trait;

use super::pagination::PageCursor;
use super::sync::ResourceSyncer;
use super::types::{
    Annotation, Entitlement, GROUP_TYPE, Grant, Resource, ResourceId, ResourceType, SyncPage,
    USER_TYPE,
};
use crate::client::ArubaClient;
use crate::error::{Context, Result};
use crate::ldebug;
use crate::logging::{LogComponent, LogStage};

/// 分组成员权益名
pub const GROUP_MEMBERSHIP_ENTITLEMENT: &str = "member";

#[must_use]
pub fn group_resource(name: &str) -> Resource {
    Resource::new(GROUP_TYPE, name, name)
}

/// 分组的成员权益
#[must_use]
pub fn group_membership_entitlement(resource: &Resource) -> Entitlement {
    Entitlement::assignment(resource, GROUP_MEMBERSHIP_ENTITLEMENT)
        .grantable_to(USER_TYPE)
        .with_display_name(format!(
            "{} {GROUP_MEMBERSHIP_ENTITLEMENT}",
            resource.display_name
        ))
        .with_description(format!(
            "{} group {GROUP_MEMBERSHIP_ENTITLEMENT} in Aruba Central",
            resource.display_name
        ))
}

#[derive(Debug, Clone)]
pub struct GroupSyncer {
    client: ArubaClient,
}

impl GroupSyncer {
    #[must_use]
    pub fn new(client: ArubaClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceSyncer for GroupSyncer {
    fn resource_type(&self) -> ResourceType {
        ResourceType::group()
    }

    async fn list(&self, page_token: &str) -> Result<SyncPage<Resource>> {
        let cursor = PageCursor::decode(page_token, GROUP_TYPE)?;
        let result = self
            .client
            .list_groups(cursor.page())
            .await
            .context("failed to list groups")?;

        let resources = result.items.iter().map(|name| group_resource(name)).collect();
        let next = cursor.next_token(result.total)?;
        Ok(SyncPage::new(
            resources,
            next,
            Annotation::from_rate_limit(result.rate_limit),
        ))
    }

    async fn entitlements(&self, resource: &Resource, _page_token: &str) -> Result<SyncPage<Entitlement>> {
        Ok(SyncPage::last(
            vec![group_membership_entitlement(resource)],
            Vec::new(),
        ))
    }

    /// 每次调用扫描一页用户，令牌是用户列表的游标
    async fn grants(&self, resource: &Resource, page_token: &str) -> Result<SyncPage<Grant>> {
        let cursor = PageCursor::decode(page_token, USER_TYPE)?;
        let result = self
            .client
            .list_users(cursor.page())
            .await
            .with_context(|| format!("failed to list users for group {}", resource.id.resource))?;

        let group = resource.id.resource.as_str();
        let grants: Vec<Grant> = result
            .items
            .iter()
            .filter(|user| user.contains_group(group))
            .map(|user| {
                Grant::new(
                    resource,
                    GROUP_MEMBERSHIP_ENTITLEMENT,
                    ResourceId::new(USER_TYPE, user.username.as_str()),
                )
            })
            .collect();

        ldebug!(
            "system",
            LogStage::Sync,
            LogComponent::GroupSync,
            "scan_users",
            &format!(
                "分组 {group} 扫描用户 offset={} 条数={} 命中={}",
                cursor.offset,
                result.items.len(),
                grants.len()
            )
        );

        let next = cursor.next_token(result.total)?;
        Ok(SyncPage::new(
            grants,
            next,
            Annotation::from_rate_limit(result.rate_limit),
        ))
    }
}
