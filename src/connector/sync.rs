//! # 同步驱动
//!
//! 每种资源类型一个 [`ResourceSyncer`]。驱动循环翻页直到令牌为空：
//! 先列出资源，再对每个资源取权益和授权（类型声明跳过的除外）。

use async_trait::async_trait;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use super::types::{Entitlement, Grant, Resource, ResourceType, SyncPage};
use crate::error::{ConnectorError, Context, Result};
use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, linfo, lwarn};

/// 单个资源类型的同步操作
#[async_trait]
pub trait ResourceSyncer: Send + Sync + std::fmt::Debug {
    fn resource_type(&self) -> ResourceType;

    /// 列出一页资源
    async fn list(&self, page_token: &str) -> Result<SyncPage<Resource>>;

    /// 资源上可授予的权益
    async fn entitlements(&self, resource: &Resource, page_token: &str) -> Result<SyncPage<Entitlement>>;

    /// 资源上已有的授权
    async fn grants(&self, resource: &Resource, page_token: &str) -> Result<SyncPage<Grant>>;
}

/// 一次完整同步的结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncSnapshot {
    pub resource_types: Vec<ResourceType>,
    pub resources: Vec<Resource>,
    pub entitlements: Vec<Entitlement>,
    pub grants: Vec<Grant>,
}

impl SyncSnapshot {
    fn merge(&mut self, other: Self) {
        self.resource_types.extend(other.resource_types);
        self.resources.extend(other.resources);
        self.entitlements.extend(other.entitlements);
        self.grants.extend(other.grants);
    }
}

/// 翻页直到令牌为空；令牌重复出现（包括循环）视为错误
pub async fn drain_pages<T, F, Fut>(what: &str, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<SyncPage<T>>>,
{
    let mut token = String::new();
    let mut seen = HashSet::new();
    let mut items = Vec::new();

    loop {
        let page = fetch(token.clone()).await?;
        if let Some(snapshot) = page.rate_limit().filter(|s| s.is_over_limit()) {
            lwarn!(
                "system",
                LogStage::Sync,
                LogComponent::RateLimit,
                "over_limit",
                &format!("{what}: 配额已耗尽 (limit={}, reset_at={})", snapshot.limit, snapshot.reset_at)
            );
        }

        items.extend(page.items);
        if page.next_page_token.is_empty() {
            return Ok(items);
        }
        if !seen.insert(page.next_page_token.clone()) {
            return Err(ConnectorError::pagination(format!(
                "{what}: page token repeated"
            )));
        }
        token = page.next_page_token;
    }
}

/// 同步一个资源类型的全部资源、权益与授权
pub async fn sync_resource_type(syncer: &dyn ResourceSyncer, request_id: &str) -> Result<SyncSnapshot> {
    let resource_type = syncer.resource_type();
    let type_id = resource_type.id.clone();

    let resources = drain_pages(&format!("{type_id} list"), |token| async move {
        syncer.list(&token).await
    })
    .await
    .with_context(|| format!("syncing {type_id} resources"))?;

    let mut snapshot = SyncSnapshot {
        resource_types: vec![resource_type.clone()],
        ..SyncSnapshot::default()
    };

    if !resource_type.skips_entitlements_and_grants() {
        for resource in &resources {
            let entitlements = drain_pages(&format!("{type_id} entitlements"), |token| async move {
                syncer.entitlements(resource, &token).await
            })
            .await
            .with_context(|| format!("syncing entitlements of {type_id} {}", resource.id.resource))?;

            let grants = drain_pages(&format!("{type_id} grants"), |token| async move {
                syncer.grants(resource, &token).await
            })
            .await
            .with_context(|| format!("syncing grants of {type_id} {}", resource.id.resource))?;

            ldebug!(
                request_id,
                LogStage::Sync,
                LogComponent::Connector,
                "resource_done",
                &format!(
                    "{type_id} {}: 权益 {} 授权 {}",
                    resource.id.resource,
                    entitlements.len(),
                    grants.len()
                )
            );
            snapshot.entitlements.extend(entitlements);
            snapshot.grants.extend(grants);
        }
    }

    linfo!(
        request_id,
        LogStage::Sync,
        LogComponent::Connector,
        "type_done",
        &format!(
            "{type_id} 同步完成: 资源 {} 权益 {} 授权 {}",
            resources.len(),
            snapshot.entitlements.len(),
            snapshot.grants.len()
        )
    );
    snapshot.resources = resources;
    Ok(snapshot)
}

/// 并发同步所有资源类型，结果按传入顺序合并
pub async fn sync_all_types(
    syncers: &[Arc<dyn ResourceSyncer>],
    request_id: &str,
) -> Result<SyncSnapshot> {
    let parts = try_join_all(
        syncers
            .iter()
            .map(|syncer| sync_resource_type(syncer.as_ref(), request_id)),
    )
    .await?;

    let mut snapshot = SyncSnapshot::default();
    for part in parts {
        snapshot.merge(part);
    }
    Ok(snapshot)
}
