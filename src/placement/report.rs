use crate::channel::CommandOutcome;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of one setup step for one zone/collection/tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum StepOutcome {
    Applied,
    AlreadySatisfied,
    Failed(String),
    /// Not attempted because an earlier blocking step failed.
    Skipped(String),
}

impl StepOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Applied or already satisfied.
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::Applied | Self::AlreadySatisfied)
    }
}

impl From<CommandOutcome> for StepOutcome {
    fn from(outcome: CommandOutcome) -> Self {
        match outcome {
            CommandOutcome::Applied(_) => Self::Applied,
            CommandOutcome::AlreadyApplied => Self::AlreadySatisfied,
            CommandOutcome::Failed(reason) => Self::Failed(reason),
        }
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied => f.write_str("applied"),
            Self::AlreadySatisfied => f.write_str("already satisfied"),
            Self::Failed(reason) => write!(f, "failed: {}", reason),
            Self::Skipped(reason) => write!(f, "skipped: {}", reason),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetupStep {
    AssociateZone,
    PruneZoneAssociation,
    DissociateZone,
    RemoveZone,
    EnableSharding,
    MovePrimary,
    ShardCollection,
    InstallRange,
    DropDatabase,
}

impl fmt::Display for SetupStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::AssociateZone => "associate zone",
            Self::PruneZoneAssociation => "prune stale association",
            Self::DissociateZone => "dissociate zone",
            Self::RemoveZone => "remove zone",
            Self::EnableSharding => "enable sharding",
            Self::MovePrimary => "move primary",
            Self::ShardCollection => "shard collection",
            Self::InstallRange => "install range",
            Self::DropDatabase => "drop database",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub zone: String,
    pub step: SetupStep,
    /// What the step acted on: a shard, database, namespace or tenant range.
    pub target: String,
    pub outcome: StepOutcome,
}

/// Per-zone, per-step outcomes of a placement run.
///
/// Partial success is the normal case, so the report keeps every outcome
/// rather than collapsing into pass/fail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementReport {
    records: Vec<StepRecord>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub applied: usize,
    pub already_satisfied: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl PlacementReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        zone: impl Into<String>,
        step: SetupStep,
        target: impl Into<String>,
        outcome: StepOutcome,
    ) -> &StepOutcome {
        self.records.push(StepRecord {
            zone: zone.into(),
            step,
            target: target.into(),
            outcome,
        });
        &self.records[self.records.len() - 1].outcome
    }

    pub fn merge(&mut self, other: PlacementReport) {
        self.records.extend(other.records);
    }

    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepRecord> {
        self.records.iter().filter(|r| r.outcome.is_failure())
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    pub fn for_zone<'a>(&'a self, zone: &'a str) -> impl Iterator<Item = &'a StepRecord> + 'a {
        self.records.iter().filter(move |r| r.zone == zone)
    }

    pub fn for_step(&self, step: SetupStep) -> impl Iterator<Item = &StepRecord> {
        self.records.iter().filter(move |r| r.step == step)
    }

    /// Outcome of the first record matching zone and step.
    pub fn outcome_for(&self, zone: &str, step: SetupStep) -> Option<&StepOutcome> {
        self.records
            .iter()
            .find(|r| r.zone == zone && r.step == step)
            .map(|r| &r.outcome)
    }

    /// True when the zone has no failed or skipped step.
    pub fn zone_succeeded(&self, zone: &str) -> bool {
        self.for_zone(zone).all(|r| r.outcome.is_satisfied())
    }

    pub fn summary(&self) -> ReportSummary {
        let mut summary = ReportSummary::default();
        for record in &self.records {
            match record.outcome {
                StepOutcome::Applied => summary.applied += 1,
                StepOutcome::AlreadySatisfied => summary.already_satisfied += 1,
                StepOutcome::Failed(_) => summary.failed += 1,
                StepOutcome::Skipped(_) => summary.skipped += 1,
            }
        }
        summary
    }
}
