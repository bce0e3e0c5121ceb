use super::report::{PlacementReport, SetupStep, StepOutcome};
use crate::channel::ClusterAdmin;
use crate::core::{Namespace, Result, RoutingRange, ShardKey, Zone};
use tracing::{info, warn};

/// Shards tenant-scoped collections and binds tenant key ranges to zones.
#[derive(Clone)]
pub struct RangeShardingController {
    admin: ClusterAdmin,
}

impl RangeShardingController {
    pub fn new(admin: ClusterAdmin) -> Self {
        Self { admin }
    }

    /// Shards `namespace` on the compound key; an already sharded collection is satisfied.
    pub async fn shard_collection(
        &self,
        zone: &str,
        namespace: &Namespace,
        key: &ShardKey,
    ) -> Result<PlacementReport> {
        let mut report = PlacementReport::new();
        let outcome: StepOutcome = self.admin.shard_collection(namespace, key).await?.into();
        match &outcome {
            StepOutcome::Failed(_) => {
                warn!(zone, namespace = %namespace, "shard collection {}", outcome)
            }
            StepOutcome::AlreadySatisfied => {
                info!(zone, namespace = %namespace, "collection already sharded")
            }
            _ => info!(zone, namespace = %namespace, "collection sharded"),
        }
        report.record(zone, SetupStep::ShardCollection, namespace.to_string(), outcome);
        Ok(report)
    }

    /// One range per tenant of `zone`, in tenant declaration order.
    pub fn routing_ranges(namespace: &Namespace, zone: &Zone) -> Vec<RoutingRange> {
        zone.tenant_ids
            .iter()
            .map(|tenant| {
                RoutingRange::for_tenant(namespace.clone(), tenant.as_str(), zone.name.as_str())
            })
            .collect()
    }

    /// Installs the tenant ranges of `zone` on `namespace`, with bounds keyed by
    /// `key`. A rejected range is logged and recorded, and the remaining ranges
    /// are still attempted.
    pub async fn install_ranges(
        &self,
        namespace: &Namespace,
        zone: &Zone,
        key: &ShardKey,
    ) -> Result<PlacementReport> {
        let mut report = PlacementReport::new();
        for range in Self::routing_ranges(namespace, zone) {
            let target = format!("{} [{}, {})", namespace, range.min, range.max);
            let outcome: StepOutcome = self.admin.update_zone_key_range(&range, key).await?.into();
            if outcome.is_failure() {
                warn!(zone = %zone.name, range = %target, "range skipped: {}", outcome);
            } else {
                info!(
                    zone = %zone.name,
                    tenant = %range.min.tenant,
                    namespace = %namespace,
                    "zone range installed"
                );
            }
            report.record(&zone.name, SetupStep::InstallRange, target, outcome);
        }
        Ok(report)
    }
}
