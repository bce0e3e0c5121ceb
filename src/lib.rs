// ============================================================================
// zoneshard Library
// ============================================================================

pub mod channel;
pub mod config;
pub mod console;
pub mod core;
pub mod placement;
pub mod sample;

// Re-export main types for convenience
pub use core::{
    CollectionClass, KeyBound, Namespace, RangeKey, Result, RoutingRange, Shard, ShardKey, Zone,
    ZoneError, ZonePlan,
};
pub use config::{ChannelConfig, PlacementConfig, ZoneConfig};

// Re-export the admin channel API
pub use channel::{
    AdminChannel, AdminCommand, ClusterAdmin, CommandOutcome, CommandReply, HttpAdminChannel,
    InMemoryCluster, admin_router,
};

// Re-export the placement components
pub use placement::{
    ClusterInventory, DatabasePlacer, OverflowPolicy, PlacementAuditor, PlacementReport,
    RangeShardingController, SetupState, StepOutcome, ZoneAssignmentPlanner, ZoneReconciler,
    ZoneSetup,
};
pub use sample::{DataGenerator, SamplePopulator};

// ============================================================================
// Connection helpers
// ============================================================================

/// Builds a [`ClusterAdmin`] for an HTTP admin endpoint.
///
/// # Examples
///
/// ```
/// use zoneshard::{ChannelConfig, connect};
///
/// let admin = connect(&ChannelConfig::new("http://127.0.0.1:8080")).unwrap();
/// # let _ = admin;
/// ```
pub fn connect(config: &ChannelConfig) -> Result<ClusterAdmin> {
    Ok(ClusterAdmin::from_channel(HttpAdminChannel::new(config)?))
}

/// Builds a [`ClusterAdmin`] over a fresh in-memory cluster with the given shards.
///
/// The cluster handle is returned too, for inspection.
pub fn simulated(shard_ids: &[&str]) -> (ClusterAdmin, InMemoryCluster) {
    let cluster = InMemoryCluster::with_shards(shard_ids.iter().copied());
    (ClusterAdmin::from_channel(cluster.clone()), cluster)
}
