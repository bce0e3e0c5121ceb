use crate::core::{Result, Shard, Zone, ZoneAssignment, ZoneError, ZonePlan};
use serde::{Deserialize, Serialize};

/// What to do with zones beyond the number of shards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Every excess zone shares the last shard.
    #[default]
    PinLast,
    /// Excess zones wrap around the shard list.
    RoundRobin,
}

/// Maps ordered zones onto ordered shards.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZoneAssignmentPlanner {
    overflow: OverflowPolicy,
}

impl ZoneAssignmentPlanner {
    pub fn new(overflow: OverflowPolicy) -> Self {
        Self { overflow }
    }

    /// Zone `i` gets shard `i`; zones past the end of the shard list follow the
    /// overflow policy. Same inputs in the same order always give the same plan.
    pub fn plan(&self, shards: &[Shard], zones: &[Zone]) -> Result<ZonePlan> {
        if zones.is_empty() {
            return Err(ZoneError::InvalidConfig(
                "cannot plan placement without zones".to_string(),
            ));
        }
        let Some(last) = shards.last() else {
            return Err(ZoneError::InvalidConfig(
                "cannot plan placement without shards".to_string(),
            ));
        };

        let assignments = zones
            .iter()
            .enumerate()
            .map(|(idx, zone)| {
                let shard = match shards.get(idx) {
                    Some(shard) => shard,
                    None => match self.overflow {
                        OverflowPolicy::PinLast => last,
                        OverflowPolicy::RoundRobin => &shards[idx % shards.len()],
                    },
                };
                ZoneAssignment {
                    zone: zone.name.clone(),
                    shard_id: shard.id.clone(),
                }
            })
            .collect();
        Ok(ZonePlan::new(assignments))
    }
}

/// Plans with the default (`PinLast`) overflow policy.
pub fn plan(shards: &[Shard], zones: &[Zone]) -> Result<ZonePlan> {
    ZoneAssignmentPlanner::default().plan(shards, zones)
}
