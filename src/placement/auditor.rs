use crate::channel::{ClusterAdmin, DocumentFilter};
use crate::config::PlacementConfig;
use crate::core::{
    CollectionClass, Namespace, Result, ShardDistribution, ShardKey, Zone, ZoneError,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Where the documents of one collection of a zone database ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionAudit {
    pub namespace: Namespace,
    pub class: CollectionClass,
    pub total: u64,
    /// Documents whose tenant belongs to the zone. Zero for common collections.
    pub in_zone: u64,
    pub foreign: u64,
    pub distribution: Vec<ShardDistribution>,
    /// Documents held by a shard other than the zone's shard.
    pub misplaced: u64,
}

impl CollectionAudit {
    pub fn is_clean(&self) -> bool {
        self.foreign == 0 && self.misplaced == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneAudit {
    pub zone: String,
    pub shard_id: String,
    pub collections: Vec<CollectionAudit>,
}

impl ZoneAudit {
    pub fn is_clean(&self) -> bool {
        self.collections.iter().all(CollectionAudit::is_clean)
    }
}

/// Read-only checks of where tenant documents live.
#[derive(Clone)]
pub struct PlacementAuditor {
    admin: ClusterAdmin,
    shard_key: ShardKey,
}

impl PlacementAuditor {
    pub fn new(admin: ClusterAdmin, shard_key: ShardKey) -> Self {
        Self { admin, shard_key }
    }

    /// Documents of `namespace` whose tenant field is one of `tenant_ids`.
    pub async fn count_in_zone(&self, namespace: &Namespace, tenant_ids: &[String]) -> Result<u64> {
        let filter = DocumentFilter::field_in(&self.shard_key.tenant_field, tenant_ids);
        self.admin.count_documents(namespace, filter).await
    }

    pub async fn count_all(&self, namespace: &Namespace) -> Result<u64> {
        self.admin
            .count_documents(namespace, DocumentFilter::All)
            .await
    }

    pub async fn distribution(&self, namespace: &Namespace) -> Result<Vec<ShardDistribution>> {
        self.admin.data_distribution(namespace).await
    }

    /// Audits every configured collection of the zone's database against `shard_id`.
    pub async fn audit_zone(
        &self,
        zone: &Zone,
        shard_id: &str,
        config: &PlacementConfig,
    ) -> Result<ZoneAudit> {
        let mut collections = Vec::new();

        for name in &config.common_collections {
            let namespace = Namespace::new(&zone.database_name, name);
            let total = self.count_all(&namespace).await?;
            info!(zone = %zone.name, namespace = %namespace, total, "common collection");
            collections.push(CollectionAudit {
                namespace,
                class: CollectionClass::Common,
                total,
                in_zone: 0,
                foreign: 0,
                distribution: Vec::new(),
                misplaced: 0,
            });
        }

        for name in &config.tenant_collections {
            let namespace = Namespace::new(&zone.database_name, name);
            let total = self.count_all(&namespace).await?;
            let in_zone = self.count_in_zone(&namespace, &zone.tenant_ids).await?;
            let distribution = match self.distribution(&namespace).await {
                Ok(distribution) => distribution,
                Err(ZoneError::CommandFailed { reason, .. }) => {
                    warn!(namespace = %namespace, "no distribution available: {}", reason);
                    Vec::new()
                }
                Err(err) => return Err(err),
            };
            let misplaced = distribution
                .iter()
                .filter(|d| d.shard_id != shard_id)
                .map(|d| d.documents)
                .sum();
            let audit = CollectionAudit {
                namespace,
                class: CollectionClass::TenantScoped,
                total,
                in_zone,
                foreign: total.saturating_sub(in_zone),
                distribution,
                misplaced,
            };
            if audit.is_clean() {
                info!(
                    zone = %zone.name,
                    namespace = %audit.namespace,
                    in_zone,
                    "tenant documents on zone shard"
                );
            } else {
                warn!(
                    zone = %zone.name,
                    namespace = %audit.namespace,
                    foreign = audit.foreign,
                    misplaced = audit.misplaced,
                    "tenant documents outside their zone"
                );
            }
            collections.push(audit);
        }

        Ok(ZoneAudit {
            zone: zone.name.clone(),
            shard_id: shard_id.to_string(),
            collections,
        })
    }
}
