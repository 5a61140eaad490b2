//! # 连接器
//!
//! 把用户、角色、分组三个同步器组装在一个共享的认证传输之上。

pub mod groups;
pub mod pagination;
pub mod roles;
pub mod sync;
pub mod types;
pub mod users;

pub use groups::GroupSyncer;
pub use pagination::{PAGE_SIZE, PageCursor};
pub use roles::{RoleSyncer, slugify};
pub use sync::{ResourceSyncer, SyncSnapshot, drain_pages, sync_all_types, sync_resource_type};
pub use types::{
    Annotation, Entitlement, EntitlementPurpose, Grant, Resource, ResourceId, ResourceTrait,
    ResourceType, SyncPage,
};
pub use users::UserSyncer;

use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::auth::CredentialStrategy;
use crate::client::{ApiEndpoints, ArubaClient, PaginationVars};
use crate::config::{AppConfig, RoleDetailSource};
use crate::error::{Context, Result};
use crate::logging::{LogComponent, LogStage};
use crate::{lerror, linfo};

/// 连接器元数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectorMetadata {
    pub display_name: &'static str,
    pub description: &'static str,
}

pub const METADATA: ConnectorMetadata = ConnectorMetadata {
    display_name: "ArubaCentral",
    description: "Connector syncing ArubaCentral users, roles and groups to Baton",
};

#[derive(Debug, Clone)]
pub struct Connector {
    client: ArubaClient,
    syncers: Vec<Arc<dyn ResourceSyncer>>,
}

impl Connector {
    /// 从配置构造：选择凭据策略、获取令牌并组装同步器
    pub async fn new(config: &AppConfig) -> Result<Self> {
        let endpoints = ApiEndpoints::from_base_host(&config.aruba.base_host)?;
        let strategy = CredentialStrategy::from_config(&config.aruba)?;
        let timeout = Duration::from_secs(config.sync.request_timeout_secs);

        let transport = strategy
            .build_transport(&endpoints, timeout)
            .await
            .context("failed to build authenticated transport")?;

        Ok(Self::from_client(
            ArubaClient::new(transport, endpoints),
            config.sync.role_detail_source,
        ))
    }

    #[must_use]
    pub fn from_client(client: ArubaClient, role_detail_source: RoleDetailSource) -> Self {
        let syncers: Vec<Arc<dyn ResourceSyncer>> = vec![
            Arc::new(UserSyncer::new(client.clone())),
            Arc::new(RoleSyncer::new(client.clone(), role_detail_source)),
            Arc::new(GroupSyncer::new(client.clone())),
        ];
        Self { client, syncers }
    }

    #[must_use]
    pub fn metadata(&self) -> ConnectorMetadata {
        METADATA
    }

    /// 连通性检查：取一个用户
    pub async fn validate(&self) -> Result<Vec<Annotation>> {
        let result = self
            .client
            .list_users(PaginationVars::new(1, 0))
            .await
            .context("failed to validate credentials")?;
        Ok(Annotation::from_rate_limit(result.rate_limit))
    }

    /// 完整同步所有资源类型
    pub async fn sync_all(&self) -> Result<SyncSnapshot> {
        let request_id = Uuid::new_v4().to_string();
        let started = Instant::now();

        linfo!(
            request_id,
            LogStage::Sync,
            LogComponent::Connector,
            "sync_start",
            &format!("开始同步 {} 个资源类型", self.syncers.len())
        );

        match sync_all_types(&self.syncers, &request_id).await {
            Ok(snapshot) => {
                linfo!(
                    request_id,
                    LogStage::Sync,
                    LogComponent::Connector,
                    "sync_done",
                    &format!(
                        "同步完成: 资源 {} 权益 {} 授权 {}，耗时 {}ms",
                        snapshot.resources.len(),
                        snapshot.entitlements.len(),
                        snapshot.grants.len(),
                        started.elapsed().as_millis()
                    )
                );
                Ok(snapshot)
            }
            Err(e) => {
                lerror!(
                    request_id,
                    LogStage::Sync,
                    LogComponent::Connector,
                    "sync_fail",
                    &format!("同步失败: {e}")
                );
                Err(e)
            }
        }
    }
}
