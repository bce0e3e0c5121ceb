use super::auditor::{PlacementAuditor, ZoneAudit};
use super::inventory::ClusterInventory;
use super::placer::DatabasePlacer;
use super::planner::{OverflowPolicy, ZoneAssignmentPlanner};
use super::ranges::RangeShardingController;
use super::reconciler::ZoneReconciler;
use super::report::{PlacementReport, SetupStep, StepOutcome};
use crate::channel::{ClusterAdmin, DatabaseInfo};
use crate::config::PlacementConfig;
use crate::core::{Namespace, Result, Shard, Zone, ZoneError, ZonePlan};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tracing::{Instrument, info, info_span, warn};

/// How far zone setup has progressed. Every stage can be re-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetupState {
    NotConfigured,
    ZonesCreated,
    DatabasesPlaced,
    CollectionsSharded,
    RangesInstalled,
}

impl SetupState {
    pub const ALL: [SetupState; 5] = [
        SetupState::NotConfigured,
        SetupState::ZonesCreated,
        SetupState::DatabasesPlaced,
        SetupState::CollectionsSharded,
        SetupState::RangesInstalled,
    ];

    pub fn next(self) -> Option<SetupState> {
        match self {
            Self::NotConfigured => Some(Self::ZonesCreated),
            Self::ZonesCreated => Some(Self::DatabasesPlaced),
            Self::DatabasesPlaced => Some(Self::CollectionsSharded),
            Self::CollectionsSharded => Some(Self::RangesInstalled),
            Self::RangesInstalled => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotConfigured => "not_configured",
            Self::ZonesCreated => "zones_created",
            Self::DatabasesPlaced => "databases_placed",
            Self::CollectionsSharded => "collections_sharded",
            Self::RangesInstalled => "ranges_installed",
        }
    }
}

impl fmt::Display for SetupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SetupState {
    type Err = ZoneError;

    fn from_str(raw: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == raw.trim())
            .ok_or_else(|| ZoneError::InvalidConfig(format!("unknown setup state '{}'", raw)))
    }
}

/// Outcome of a setup run.
#[derive(Debug, Clone)]
pub struct SetupRun {
    pub plan: ZonePlan,
    pub report: PlacementReport,
    /// Furthest state whose stages all finished without a failed step.
    pub reached: SetupState,
}

/// Configured vs. observed placement of one zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneStatus {
    pub zone: String,
    pub tenant_ids: Vec<String>,
    pub database: String,
    pub planned_shard: String,
    pub shard_host: Option<String>,
    /// Shards the cluster currently tags with this zone.
    pub tagged_shards: Vec<String>,
}

impl ZoneStatus {
    pub fn is_in_sync(&self) -> bool {
        self.tagged_shards == [self.planned_shard.clone()]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterInfo {
    pub shards: Vec<Shard>,
    pub databases: Vec<DatabaseInfo>,
}

/// Drives the whole placement procedure for a [`PlacementConfig`].
#[derive(Clone)]
pub struct ZoneSetup {
    admin: ClusterAdmin,
    config: PlacementConfig,
    planner: ZoneAssignmentPlanner,
}

impl ZoneSetup {
    pub fn new(admin: ClusterAdmin, config: PlacementConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            admin,
            config,
            planner: ZoneAssignmentPlanner::default(),
        })
    }

    pub fn with_overflow(mut self, policy: OverflowPolicy) -> Self {
        self.planner = ZoneAssignmentPlanner::new(policy);
        self
    }

    pub fn config(&self) -> &PlacementConfig {
        &self.config
    }

    pub fn admin(&self) -> &ClusterAdmin {
        &self.admin
    }

    pub fn inventory(&self) -> ClusterInventory {
        ClusterInventory::new(self.admin.clone(), self.config.excluded_shards.clone())
    }

    pub fn auditor(&self) -> PlacementAuditor {
        PlacementAuditor::new(self.admin.clone(), self.config.shard_key.clone())
    }

    pub async fn shards(&self) -> Result<Vec<Shard>> {
        self.inventory().list_shards().await
    }

    /// Reads the current shards and computes the zone plan.
    pub async fn plan(&self) -> Result<ZonePlan> {
        let shards = self.shards().await?;
        let plan = self.planner.plan(&shards, &self.config.zones())?;
        for assignment in plan.iter() {
            info!(zone = %assignment.zone, shard = %assignment.shard_id, "planned zone placement");
        }
        Ok(plan)
    }

    pub async fn run(&self) -> Result<SetupRun> {
        self.run_from(SetupState::NotConfigured).await
    }

    /// Runs every stage after `from`.
    pub async fn run_from(&self, from: SetupState) -> Result<SetupRun> {
        let plan = self.plan().await?;
        let zones = self.config.zones();
        let mut report = PlacementReport::new();
        let mut reached = from;
        // Zones whose database could not be placed; their collection steps are skipped.
        let mut blocked: BTreeSet<String> = BTreeSet::new();

        let mut stage = from.next();
        while let Some(current) = stage {
            let span = info_span!("stage", stage = %current);
            let stage_report = self
                .run_stage(current, &plan, &zones, &mut blocked)
                .instrument(span)
                .await?;
            if !stage_report.has_failures() && reached.next() == Some(current) {
                reached = current;
            }
            report.merge(stage_report);
            stage = current.next();
        }

        let summary = report.summary();
        info!(
            applied = summary.applied,
            already_satisfied = summary.already_satisfied,
            failed = summary.failed,
            skipped = summary.skipped,
            reached = %reached,
            "zone setup finished"
        );
        Ok(SetupRun {
            plan,
            report,
            reached,
        })
    }

    async fn run_stage(
        &self,
        stage: SetupState,
        plan: &ZonePlan,
        zones: &[Zone],
        blocked: &mut BTreeSet<String>,
    ) -> Result<PlacementReport> {
        match stage {
            SetupState::NotConfigured => Ok(PlacementReport::new()),
            SetupState::ZonesCreated => {
                ZoneReconciler::new(self.admin.clone()).reconcile(plan).await
            }
            SetupState::DatabasesPlaced => {
                let placer = DatabasePlacer::new(self.admin.clone());
                let mut report = PlacementReport::new();
                for zone in zones {
                    let Some(shard_id) = plan.shard_for(&zone.name) else {
                        continue;
                    };
                    let placed = placer
                        .place(zone, shard_id)
                        .instrument(info_span!("zone", zone = %zone.name))
                        .await?;
                    if !placed.zone_succeeded(&zone.name) {
                        blocked.insert(zone.name.clone());
                    }
                    report.merge(placed);
                }
                Ok(report)
            }
            SetupState::CollectionsSharded => {
                let controller = RangeShardingController::new(self.admin.clone());
                let mut report = PlacementReport::new();
                for zone in zones {
                    for namespace in self.tenant_namespaces(zone) {
                        if blocked.contains(&zone.name) {
                            skip(&mut report, zone, SetupStep::ShardCollection, &namespace);
                            continue;
                        }
                        report.merge(
                            controller
                                .shard_collection(&zone.name, &namespace, &self.config.shard_key)
                                .await?,
                        );
                    }
                }
                Ok(report)
            }
            SetupState::RangesInstalled => {
                let controller = RangeShardingController::new(self.admin.clone());
                let mut report = PlacementReport::new();
                for zone in zones {
                    for namespace in self.tenant_namespaces(zone) {
                        if blocked.contains(&zone.name) {
                            skip(&mut report, zone, SetupStep::InstallRange, &namespace);
                            continue;
                        }
                        report.merge(
                            controller
                                .install_ranges(&namespace, zone, &self.config.shard_key)
                                .await?,
                        );
                    }
                }
                Ok(report)
            }
        }
    }

    fn tenant_namespaces(&self, zone: &Zone) -> Vec<Namespace> {
        self.config
            .tenant_collections
            .iter()
            .map(|c| Namespace::new(&zone.database_name, c))
            .collect()
    }

    /// Configured zones next to the cluster's current zone tags.
    pub async fn status(&self) -> Result<Vec<ZoneStatus>> {
        let shards = self.shards().await?;
        let plan = self.planner.plan(&shards, &self.config.zones())?;

        Ok(self
            .config
            .zones()
            .into_iter()
            .map(|zone| {
                let planned_shard = plan.shard_for(&zone.name).unwrap_or_default().to_string();
                let shard_host = shards
                    .iter()
                    .find(|s| s.id == planned_shard)
                    .map(|s| s.host.clone());
                let tagged_shards = shards
                    .iter()
                    .filter(|s| s.serves_zone(&zone.name))
                    .map(|s| s.id.clone())
                    .collect();
                ZoneStatus {
                    zone: zone.name,
                    tenant_ids: zone.tenant_ids,
                    database: zone.database_name,
                    planned_shard,
                    shard_host,
                    tagged_shards,
                }
            })
            .collect())
    }

    /// Audits every zone against its planned shard.
    pub async fn verify(&self) -> Result<Vec<ZoneAudit>> {
        let plan = self.plan().await?;
        let auditor = self.auditor();
        let mut audits = Vec::new();
        for zone in self.config.zones() {
            let Some(shard_id) = plan.shard_for(&zone.name) else {
                continue;
            };
            audits.push(auditor.audit_zone(&zone, shard_id, &self.config).await?);
        }
        Ok(audits)
    }

    /// Removes the configured zones and, if asked, drops their databases.
    pub async fn cleanup(&self, drop_databases: bool) -> Result<PlacementReport> {
        let plan = self.plan().await?;
        let mut report = ZoneReconciler::new(self.admin.clone()).remove(&plan).await?;

        if drop_databases {
            for zone in self.config.zones() {
                let outcome: StepOutcome =
                    self.admin.drop_database(&zone.database_name).await?.into();
                if outcome.is_failure() {
                    warn!(zone = %zone.name, database = %zone.database_name, "drop {}", outcome);
                } else {
                    info!(zone = %zone.name, database = %zone.database_name, "database dropped");
                }
                report.record(&zone.name, SetupStep::DropDatabase, &zone.database_name, outcome);
            }
        }
        Ok(report)
    }

    pub async fn ping(&self) -> Result<()> {
        self.admin.ping().await
    }

    /// Every shard (excluded ones included) and every database.
    pub async fn cluster_info(&self) -> Result<ClusterInfo> {
        Ok(ClusterInfo {
            shards: self.admin.list_shards().await?,
            databases: self.admin.list_databases().await?,
        })
    }
}

fn skip(report: &mut PlacementReport, zone: &Zone, step: SetupStep, namespace: &Namespace) {
    warn!(zone = %zone.name, namespace = %namespace, "{} skipped", step);
    report.record(
        &zone.name,
        step,
        namespace.to_string(),
        StepOutcome::Skipped(format!("database of zone '{}' is not placed", zone.name)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_advance_in_order() {
        let mut state = SetupState::NotConfigured;
        let mut seen = vec![state];
        while let Some(next) = state.next() {
            assert!(next > state);
            seen.push(next);
            state = next;
        }
        assert_eq!(seen, SetupState::ALL.to_vec());
    }

    #[test]
    fn state_parses_from_its_name() {
        for state in SetupState::ALL {
            assert_eq!(state.as_str().parse::<SetupState>().unwrap(), state);
        }
        assert!("halfway".parse::<SetupState>().is_err());
    }
}
