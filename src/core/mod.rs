pub mod error;
pub mod types;

pub use error::{Result, ZoneError};
pub use types::{
    CollectionClass, DEFAULT_TENANT_FIELD, DEFAULT_ZONE_FIELD, KeyBound, Namespace, RangeKey,
    RoutingRange, Shard, ShardDistribution, ShardKey, Zone, ZoneAssignment, ZonePlan,
};
