//! # 同步输出的规范化类型
//!
//! 资源、权益、授权三元组，以及随每页结果返回的注解。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::client::RateLimitSnapshot;

pub const USER_TYPE: &str = "user";
pub const ROLE_TYPE: &str = "role";
pub const GROUP_TYPE: &str = "group";

/// 资源特征
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceTrait {
    User,
    Role,
    Group,
}

/// 随结果返回的附加元数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Annotation {
    /// 产生该页结果的响应的速率限制快照
    RateLimit(RateLimitSnapshot),
    /// 该资源类型没有权益和授权，不必调用
    SkipEntitlementsAndGrants,
}

impl Annotation {
    /// 有快照时生成单个速率限制注解
    #[must_use]
    pub fn from_rate_limit(snapshot: Option<RateLimitSnapshot>) -> Vec<Self> {
        snapshot.map(Self::RateLimit).into_iter().collect()
    }
}

/// 资源类型描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceType {
    pub id: String,
    pub display_name: String,
    pub traits: Vec<ResourceTrait>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
}

impl ResourceType {
    fn new(id: &str, display_name: &str, resource_trait: ResourceTrait) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            traits: vec![resource_trait],
            annotations: Vec::new(),
        }
    }

    /// 用户只作为授权的主体出现
    #[must_use]
    pub fn user() -> Self {
        let mut resource_type = Self::new(USER_TYPE, "User", ResourceTrait::User);
        resource_type
            .annotations
            .push(Annotation::SkipEntitlementsAndGrants);
        resource_type
    }

    #[must_use]
    pub fn role() -> Self {
        Self::new(ROLE_TYPE, "Role", ResourceTrait::Role)
    }

    #[must_use]
    pub fn group() -> Self {
        Self::new(GROUP_TYPE, "Group", ResourceTrait::Group)
    }

    #[must_use]
    pub fn skips_entitlements_and_grants(&self) -> bool {
        self.annotations
            .iter()
            .any(|a| matches!(a, Annotation::SkipEntitlementsAndGrants))
    }
}

/// 资源标识：类型 + 类型内唯一 id
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId {
    pub resource_type: String,
    pub resource: String,
}

impl ResourceId {
    #[must_use]
    pub fn new(resource_type: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            resource: resource.into(),
        }
    }
}

/// 同步得到的实体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub profile: Map<String, Value>,
}

impl Resource {
    #[must_use]
    pub fn new(
        resource_type: &str,
        resource: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            id: ResourceId::new(resource_type, resource),
            display_name: display_name.into(),
            profile: Map::new(),
        }
    }

    #[must_use]
    pub fn with_profile(mut self, profile: Map<String, Value>) -> Self {
        self.profile = profile;
        self
    }
}

/// 权益用途
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntitlementPurpose {
    /// 成员关系
    Assignment,
    /// 权限级别
    Permission,
}

/// `{type}:{resource}:{slug}`
#[must_use]
pub fn entitlement_id(resource: &ResourceId, slug: &str) -> String {
    format!("{}:{}:{}", resource.resource_type, resource.resource, slug)
}

/// 可授予其他资源的能力
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlement {
    pub id: String,
    pub resource: ResourceId,
    pub slug: String,
    pub purpose: EntitlementPurpose,
    pub display_name: String,
    pub description: String,
    pub grantable_to: Vec<String>,
}

impl Entitlement {
    #[must_use]
    pub fn new(resource: &Resource, slug: impl Into<String>, purpose: EntitlementPurpose) -> Self {
        let slug = slug.into();
        Self {
            id: entitlement_id(&resource.id, &slug),
            resource: resource.id.clone(),
            display_name: slug.clone(),
            slug,
            purpose,
            description: String::new(),
            grantable_to: Vec::new(),
        }
    }

    #[must_use]
    pub fn assignment(resource: &Resource, slug: impl Into<String>) -> Self {
        Self::new(resource, slug, EntitlementPurpose::Assignment)
    }

    #[must_use]
    pub fn permission(resource: &Resource, slug: impl Into<String>) -> Self {
        Self::new(resource, slug, EntitlementPurpose::Permission)
    }

    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn grantable_to(mut self, resource_type: &str) -> Self {
        self.grantable_to.push(resource_type.to_string());
        self
    }
}

/// 把资源上的某个权益授予一个主体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub id: String,
    pub entitlement_id: String,
    pub principal: ResourceId,
}

impl Grant {
    #[must_use]
    pub fn new(resource: &Resource, slug: &str, principal: ResourceId) -> Self {
        let entitlement_id = entitlement_id(&resource.id, slug);
        Self {
            id: format!(
                "{}:{}:{}",
                entitlement_id, principal.resource_type, principal.resource
            ),
            entitlement_id,
            principal,
        }
    }
}

/// 一页同步结果
#[derive(Debug, Clone, PartialEq)]
pub struct SyncPage<T> {
    pub items: Vec<T>,
    /// 为空表示没有更多页
    pub next_page_token: String,
    pub annotations: Vec<Annotation>,
}

impl<T> SyncPage<T> {
    #[must_use]
    pub fn new(items: Vec<T>, next_page_token: String, annotations: Vec<Annotation>) -> Self {
        Self {
            items,
            next_page_token,
            annotations,
        }
    }

    /// 单页即完整的结果
    #[must_use]
    pub fn last(items: Vec<T>, annotations: Vec<Annotation>) -> Self {
        Self::new(items, String::new(), annotations)
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::last(Vec::new(), Vec::new())
    }

    #[must_use]
    pub fn has_more(&self) -> bool {
        !self.next_page_token.is_empty()
    }

    /// 结果中携带的速率限制快照
    #[must_use]
    pub fn rate_limit(&self) -> Option<&RateLimitSnapshot> {
        self.annotations.iter().find_map(|a| match a {
            Annotation::RateLimit(snapshot) => Some(snapshot),
            Annotation::SkipEntitlementsAndGrants => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn entitlement_and_grant_ids() {
        let role = Resource::new(ROLE_TYPE, "admin", "Admin");
        let entitlement = Entitlement::permission(&role, "nms-write").grantable_to(USER_TYPE);
        let grant = Grant::new(&role, "nms-write", ResourceId::new(USER_TYPE, "alice"));

        assert_eq!(entitlement.id, "role:admin:nms-write");
        assert_eq!(entitlement.grantable_to, vec!["user".to_string()]);
        assert_eq!(grant.entitlement_id, entitlement.id);
        assert_eq!(grant.id, "role:admin:nms-write:user:alice");
    }

    #[test]
    fn only_users_skip_entitlements() {
        assert!(ResourceType::user().skips_entitlements_and_grants());
        assert!(!ResourceType::role().skips_entitlements_and_grants());
        assert!(!ResourceType::group().skips_entitlements_and_grants());
    }

    #[test]
    fn annotation_serialization_is_tagged() {
        let value = serde_json::to_value(Annotation::SkipEntitlementsAndGrants).unwrap();
        assert_eq!(value, serde_json::json!({"type": "skip_entitlements_and_grants"}));
    }

    #[test]
    fn terminal_page() {
        let page: SyncPage<Resource> = SyncPage::empty();
        assert!(!page.has_more());
        assert!(page.rate_limit().is_none());
    }
}
