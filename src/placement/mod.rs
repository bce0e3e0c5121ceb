//! Zone placement: discovering shards, planning zone homes and driving the
//! cluster until databases, collections and tenant ranges follow the plan.

pub mod auditor;
pub mod inventory;
pub mod placer;
pub mod planner;
pub mod ranges;
pub mod reconciler;
pub mod report;
pub mod setup;

pub use auditor::{CollectionAudit, PlacementAuditor, ZoneAudit};
pub use inventory::ClusterInventory;
pub use placer::DatabasePlacer;
pub use planner::{OverflowPolicy, ZoneAssignmentPlanner};
pub use ranges::RangeShardingController;
pub use reconciler::ZoneReconciler;
pub use report::{PlacementReport, ReportSummary, SetupStep, StepOutcome, StepRecord};
pub use setup::{ClusterInfo, SetupRun, SetupState, ZoneSetup, ZoneStatus};
