use super::report::{PlacementReport, SetupStep, StepOutcome};
use crate::channel::ClusterAdmin;
use crate::core::{Result, Zone};
use tracing::{error, info, warn};

/// Pins a zone's database to the zone's shard.
#[derive(Clone)]
pub struct DatabasePlacer {
    admin: ClusterAdmin,
}

impl DatabasePlacer {
    pub fn new(admin: ClusterAdmin) -> Self {
        Self { admin }
    }

    /// Enables sharding on the zone database and moves its primary to `shard_id`.
    ///
    /// Check [`PlacementReport::zone_succeeded`] before running collection steps
    /// for the zone: a failed primary move leaves the database on the wrong shard.
    pub async fn place(&self, zone: &Zone, shard_id: &str) -> Result<PlacementReport> {
        let mut report = PlacementReport::new();
        let database = zone.database_name.as_str();

        let outcome: StepOutcome = self.admin.enable_sharding(database).await?.into();
        match &outcome {
            StepOutcome::Failed(_) => {
                warn!(zone = %zone.name, database, "enable sharding {}", outcome)
            }
            StepOutcome::AlreadySatisfied => {
                info!(zone = %zone.name, database, "sharding already enabled")
            }
            _ => info!(zone = %zone.name, database, "enabled sharding"),
        }
        report.record(&zone.name, SetupStep::EnableSharding, database, outcome);

        let outcome: StepOutcome = self.admin.move_primary(database, shard_id).await?.into();
        if outcome.is_failure() {
            error!(
                zone = %zone.name,
                database,
                shard = shard_id,
                "primary move {}; collection steps for this zone will be skipped",
                outcome
            );
        } else {
            info!(zone = %zone.name, database, shard = shard_id, "database primary placed");
        }
        report.record(&zone.name, SetupStep::MovePrimary, database, outcome);

        Ok(report)
    }
}
