use super::report::{PlacementReport, SetupStep, StepOutcome};
use crate::channel::ClusterAdmin;
use crate::core::{Result, ZoneError, ZonePlan};
use tracing::{info, warn};

/// Makes the cluster's shard-to-zone associations match a [`ZonePlan`].
///
/// Only zones named in the plan are touched. Rejected commands are recorded in
/// the report and the reconciler moves on; an unreachable cluster aborts.
#[derive(Clone)]
pub struct ZoneReconciler {
    admin: ClusterAdmin,
}

impl ZoneReconciler {
    pub fn new(admin: ClusterAdmin) -> Self {
        Self { admin }
    }

    /// Associates each planned zone with its shard, then drops associations of
    /// the same zone with any other shard.
    pub async fn reconcile(&self, plan: &ZonePlan) -> Result<PlacementReport> {
        let mut report = PlacementReport::new();

        for assignment in plan.iter() {
            let outcome: StepOutcome = self
                .admin
                .add_shard_to_zone(&assignment.shard_id, &assignment.zone)
                .await?
                .into();
            match &outcome {
                StepOutcome::Applied => info!(
                    zone = %assignment.zone,
                    shard = %assignment.shard_id,
                    "associated shard with zone"
                ),
                StepOutcome::AlreadySatisfied => info!(
                    zone = %assignment.zone,
                    shard = %assignment.shard_id,
                    "shard already associated with zone"
                ),
                other => warn!(
                    zone = %assignment.zone,
                    shard = %assignment.shard_id,
                    "zone association {}",
                    other
                ),
            }
            report.record(
                &assignment.zone,
                SetupStep::AssociateZone,
                &assignment.shard_id,
                outcome,
            );
        }

        self.prune_stale(plan, &mut report).await?;
        Ok(report)
    }

    async fn prune_stale(&self, plan: &ZonePlan, report: &mut PlacementReport) -> Result<()> {
        let shards = match self.admin.list_shards().await {
            Ok(shards) => shards,
            Err(err @ ZoneError::Unavailable(_)) => return Err(err),
            Err(err) => {
                warn!(error = %err, "cannot read zone tags; stale associations kept");
                return Ok(());
            }
        };

        for shard in &shards {
            for zone in &shard.zones {
                let Some(planned) = plan.shard_for(zone) else {
                    continue;
                };
                if planned == shard.id {
                    continue;
                }
                let outcome: StepOutcome = self
                    .admin
                    .remove_shard_from_zone(&shard.id, zone)
                    .await?
                    .into();
                if outcome.is_failure() {
                    warn!(zone = %zone, shard = %shard.id, "stale association kept: {}", outcome);
                } else {
                    info!(zone = %zone, shard = %shard.id, "removed stale zone association");
                }
                report.record(zone, SetupStep::PruneZoneAssociation, &shard.id, outcome);
            }
        }
        Ok(())
    }

    /// Dissociates every planned zone from its shard and deletes the zone.
    ///
    /// Routing ranges bound to the zone are left in place.
    pub async fn remove(&self, plan: &ZonePlan) -> Result<PlacementReport> {
        let mut report = PlacementReport::new();

        for assignment in plan.iter() {
            let outcome: StepOutcome = self
                .admin
                .remove_shard_from_zone(&assignment.shard_id, &assignment.zone)
                .await?
                .into();
            if outcome.is_failure() {
                warn!(
                    zone = %assignment.zone,
                    shard = %assignment.shard_id,
                    "dissociation {}",
                    outcome
                );
            }
            report.record(
                &assignment.zone,
                SetupStep::DissociateZone,
                &assignment.shard_id,
                outcome,
            );

            let outcome: StepOutcome = self.admin.remove_zone(&assignment.zone).await?.into();
            match &outcome {
                StepOutcome::Failed(_) => {
                    warn!(zone = %assignment.zone, "zone removal {}", outcome)
                }
                _ => info!(zone = %assignment.zone, "zone removed"),
            }
            report.record(&assignment.zone, SetupStep::RemoveZone, &assignment.zone, outcome);
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::InMemoryCluster;
    use crate::core::ZoneAssignment;

    fn plan(pairs: &[(&str, &str)]) -> ZonePlan {
        ZonePlan::new(
            pairs
                .iter()
                .map(|(zone, shard)| ZoneAssignment {
                    zone: zone.to_string(),
                    shard_id: shard.to_string(),
                })
                .collect(),
        )
    }

    #[tokio::test]
    async fn second_reconcile_is_all_already_satisfied() {
        let cluster = InMemoryCluster::with_shards(["shardA", "shardB"]);
        let reconciler = ZoneReconciler::new(ClusterAdmin::from_channel(cluster.clone()));
        let plan = plan(&[("region1", "shardA"), ("region2", "shardB")]);

        let first = reconciler.reconcile(&plan).await.unwrap();
        assert_eq!(first.summary().applied, 2);

        let second = reconciler.reconcile(&plan).await.unwrap();
        assert!(
            second
                .records()
                .iter()
                .all(|r| r.outcome == StepOutcome::AlreadySatisfied)
        );
        assert_eq!(second.records().len(), 2);
    }

    #[tokio::test]
    async fn moved_zone_loses_its_old_shard() {
        let cluster = InMemoryCluster::with_shards(["shardA", "shardB"]);
        let admin = ClusterAdmin::from_channel(cluster.clone());
        admin.add_shard_to_zone("shardA", "region2").await.unwrap();
        admin.add_shard_to_zone("shardA", "legacy").await.unwrap();

        let reconciler = ZoneReconciler::new(admin);
        let report = reconciler
            .reconcile(&plan(&[("region2", "shardB")]))
            .await
            .unwrap();

        let tags = cluster.zone_tags().await;
        assert_eq!(tags["shardA"], vec!["legacy".to_string()]);
        assert_eq!(tags["shardB"], vec!["region2".to_string()]);
        assert_eq!(
            report.outcome_for("region2", SetupStep::PruneZoneAssociation),
            Some(&StepOutcome::Applied)
        );
    }

    #[tokio::test]
    async fn rejected_association_does_not_stop_other_zones() {
        let cluster = InMemoryCluster::with_shards(["shardA"]);
        let reconciler = ZoneReconciler::new(ClusterAdmin::from_channel(cluster.clone()));
        let report = reconciler
            .reconcile(&plan(&[("region1", "missing"), ("region2", "shardA")]))
            .await
            .unwrap();

        assert!(matches!(
            report.outcome_for("region1", SetupStep::AssociateZone),
            Some(StepOutcome::Failed(_))
        ));
        assert_eq!(
            report.outcome_for("region2", SetupStep::AssociateZone),
            Some(&StepOutcome::Applied)
        );
    }

    #[tokio::test]
    async fn remove_of_unknown_zones_is_satisfied() {
        let cluster = InMemoryCluster::with_shards(["shardA"]);
        let reconciler = ZoneReconciler::new(ClusterAdmin::from_channel(cluster));
        let report = reconciler
            .remove(&plan(&[("region1", "shardA")]))
            .await
            .unwrap();
        assert!(!report.has_failures());
        assert_eq!(report.summary().already_satisfied, 2);
    }

    #[tokio::test]
    async fn unreachable_cluster_aborts_reconcile() {
        let cluster = InMemoryCluster::with_shards(["shardA"]);
        cluster.set_available(false).await;
        let reconciler = ZoneReconciler::new(ClusterAdmin::from_channel(cluster));
        let err = reconciler
            .reconcile(&plan(&[("region1", "shardA")]))
            .await
            .unwrap_err();
        assert!(matches!(err, ZoneError::Unavailable(_)));
    }
}
