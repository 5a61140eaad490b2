//! # 角色同步
//!
//! 角色的权益由其应用权限推导：
//! - 每个角色一个成员权益
//! - 每个 (应用, 权限级别) 一个 `{app}-{permission}` 权限权益
//! - 每个 (应用, 模块) 一个 `{app}-{permission}-{module}` 权限权益
//!
//! 每个成员获得全部权益的授权。角色详情来自 List 时写入的 profile 快照，
//! 或者每次调用角色详情接口重新获取，由 [`RoleDetailSource`] 决定。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::pagination::PageCursor;
use super::sync::ResourceSyncer;
use super::types::{
    Annotation, Entitlement, Grant, ROLE_TYPE, Resource, ResourceId, ResourceType, SyncPage,
    USER_TYPE,
};
use crate::client::{Application, ArubaClient, RateLimitSnapshot, Role, RoleMember};
use crate::config::RoleDetailSource;
use crate::error::{ConnectorError, Context, Result};
use crate::ldebug;
use crate::logging::{LogComponent, LogStage};

/// 角色成员权益名
pub const ROLE_MEMBERSHIP_ENTITLEMENT: &str = "member";

/// 角色名转资源 id：小写，空格换成 `-`
#[must_use]
pub fn slugify(name: &str) -> String {
    name.to_lowercase().replace(' ', "-")
}

/// 写入角色资源 profile 的快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleProfile {
    pub role_name: String,
    pub no_of_users: u32,
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub applications: Vec<Application>,
}

impl From<&Role> for RoleProfile {
    fn from(role: &Role) -> Self {
        Self {
            role_name: role.name.clone(),
            no_of_users: role.user_count,
            users: role.usernames().map(str::to_string).collect(),
            applications: role.applications.clone(),
        }
    }
}

impl From<RoleProfile> for Role {
    fn from(profile: RoleProfile) -> Self {
        Self {
            name: profile.role_name,
            users: profile.users.into_iter().map(RoleMember::Username).collect(),
            user_count: profile.no_of_users,
            permission: String::new(),
            applications: profile.applications,
        }
    }
}

/// 角色资源，profile 中带完整快照
pub fn role_resource(role: &Role) -> Result<Resource> {
    let profile = match serde_json::to_value(RoleProfile::from(role)) {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
            return Err(ConnectorError::internal(
                "role profile did not serialize to an object",
            ));
        }
        Err(e) => {
            return Err(ConnectorError::internal_with_source(
                "failed to serialize role profile",
                e,
            ));
        }
    };

    Ok(Resource::new(ROLE_TYPE, slugify(&role.name), role.name.as_str()).with_profile(profile))
}

/// 从资源 profile 还原角色详情
pub fn role_from_profile(resource: &Resource) -> Result<Role> {
    if resource.profile.is_empty() {
        return Err(ConnectorError::profile(format!(
            "role {} has no profile snapshot",
            resource.id.resource
        )));
    }

    let profile: RoleProfile = serde_json::from_value(Value::Object(resource.profile.clone()))
        .map_err(|e| {
            ConnectorError::profile_with_source(
                format!("invalid profile snapshot for role {}", resource.id.resource),
                e,
            )
        })?;
    Ok(profile.into())
}

/// 角色的全部权益，成员权益在前
#[must_use]
pub fn role_entitlements(resource: &Resource, role: &Role) -> Vec<Entitlement> {
    let mut entitlements = vec![
        Entitlement::assignment(resource, ROLE_MEMBERSHIP_ENTITLEMENT)
            .grantable_to(USER_TYPE)
            .with_display_name(format!("{} role membership", resource.display_name))
            .with_description(format!(
                "{} role membership in Aruba Central",
                resource.display_name
            )),
    ];

    for app in &role.applications {
        entitlements.push(
            Entitlement::permission(resource, app.entitlement_slug())
                .grantable_to(USER_TYPE)
                .with_display_name(format!("{} {} app permissions", app.name, app.permission))
                .with_description(format!(
                    "{} {} app permissions in Aruba Central",
                    app.name, app.permission
                )),
        );

        for module in &app.modules {
            entitlements.push(
                Entitlement::permission(resource, app.module_entitlement_slug(module))
                    .grantable_to(USER_TYPE)
                    .with_display_name(format!(
                        "{} {} {} module permissions",
                        app.name, module.name, module.permission
                    ))
                    .with_description(format!(
                        "{} {} {} module permissions in Aruba Central",
                        app.name, module.name, module.permission
                    )),
            );
        }
    }

    entitlements
}

/// 每个成员 × 每个权益
#[must_use]
pub fn role_grants(resource: &Resource, role: &Role) -> Vec<Grant> {
    if role.user_count == 0 {
        return Vec::new();
    }

    let mut slugs = vec![ROLE_MEMBERSHIP_ENTITLEMENT.to_string()];
    for app in &role.applications {
        slugs.push(app.entitlement_slug());
        slugs.extend(app.modules.iter().map(|m| app.module_entitlement_slug(m)));
    }

    role.usernames()
        .flat_map(|username| {
            let principal = ResourceId::new(USER_TYPE, username);
            slugs
                .iter()
                .map(move |slug| Grant::new(resource, slug, principal.clone()))
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct RoleSyncer {
    client: ArubaClient,
    detail_source: RoleDetailSource,
}

impl RoleSyncer {
    #[must_use]
    pub fn new(client: ArubaClient, detail_source: RoleDetailSource) -> Self {
        Self {
            client,
            detail_source,
        }
    }

    /// 按配置的来源取得角色详情
    async fn role_detail(&self, resource: &Resource) -> Result<(Role, Option<RateLimitSnapshot>)> {
        match self.detail_source {
            RoleDetailSource::Profile => Ok((role_from_profile(resource)?, None)),
            RoleDetailSource::Api => self
                .client
                .get_role(&resource.display_name)
                .await
                .with_context(|| format!("failed to get role details for {}", resource.display_name)),
        }
    }
}

#[async_trait]
impl ResourceSyncer for RoleSyncer {
    fn resource_type(&self) -> ResourceType {
        ResourceType::role()
    }

    async fn list(&self, page_token: &str) -> Result<SyncPage<Resource>> {
        let cursor = PageCursor::decode(page_token, ROLE_TYPE)?;
        let result = self
            .client
            .list_roles(cursor.page())
            .await
            .context("failed to list roles")?;

        let resources = result
            .items
            .iter()
            .map(role_resource)
            .collect::<Result<Vec<_>>>()?;
        let next = cursor.next_token(result.total)?;
        Ok(SyncPage::new(
            resources,
            next,
            Annotation::from_rate_limit(result.rate_limit),
        ))
    }

    async fn entitlements(&self, resource: &Resource, _page_token: &str) -> Result<SyncPage<Entitlement>> {
        let (role, rate_limit) = self.role_detail(resource).await?;
        let entitlements = role_entitlements(resource, &role);

        ldebug!(
            "system",
            LogStage::Sync,
            LogComponent::RoleSync,
            "entitlements",
            &format!(
                "角色 {} 权益数={} 来源={:?}",
                resource.display_name,
                entitlements.len(),
                self.detail_source
            )
        );

        Ok(SyncPage::last(
            entitlements,
            Annotation::from_rate_limit(rate_limit),
        ))
    }

    async fn grants(&self, resource: &Resource, _page_token: &str) -> Result<SyncPage<Grant>> {
        let (role, rate_limit) = self.role_detail(resource).await?;
        Ok(SyncPage::last(
            role_grants(resource, &role),
            Annotation::from_rate_limit(rate_limit),
        ))
    }
}
