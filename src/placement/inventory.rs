use crate::channel::ClusterAdmin;
use crate::core::{Result, Shard, ZoneError};
use tracing::{info, warn};

/// Reads the physical shards available as placement targets.
#[derive(Clone)]
pub struct ClusterInventory {
    admin: ClusterAdmin,
    excluded: Vec<String>,
}

impl ClusterInventory {
    /// `excluded` shards (e.g. the embedded config shard) are never returned.
    pub fn new(admin: ClusterAdmin, excluded: Vec<String>) -> Self {
        Self { admin, excluded }
    }

    /// Lists shards in the order the cluster reports them.
    ///
    /// Fails with `Unavailable` when the cluster cannot be reached, rejects the
    /// listing, or has no usable shard.
    pub async fn list_shards(&self) -> Result<Vec<Shard>> {
        let shards = self.admin.list_shards().await.map_err(|err| match err {
            ZoneError::Unavailable(_) => err,
            other => ZoneError::Unavailable(format!("cannot list shards: {}", other)),
        })?;

        let total = shards.len();
        let shards: Vec<Shard> = shards
            .into_iter()
            .filter(|s| !self.excluded.iter().any(|e| e == &s.id))
            .collect();
        if shards.len() < total {
            info!(
                excluded = total - shards.len(),
                "ignoring shards that cannot host zone data"
            );
        }

        if shards.is_empty() {
            warn!("cluster reported no usable shards");
            return Err(ZoneError::Unavailable(
                "cluster reported no usable shards".to_string(),
            ));
        }

        info!(
            shards = ?shards.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
            "found cluster shards"
        );
        Ok(shards)
    }
}
