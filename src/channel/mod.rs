//! Administrative command channel to the cluster.
//!
//! `AdminChannel` is the transport seam: it delivers one `AdminCommand` and
//! hands back the raw `CommandReply`. `ClusterAdmin` wraps a channel with typed
//! helpers and routes every reply through [`classify`].

pub mod classify;
pub mod command;
pub mod http;
pub mod memory;
pub mod server;

pub use classify::{CommandOutcome, classify};
pub use command::{AdminCommand, CommandReply, DocumentFilter, WireReply};
pub use http::HttpAdminChannel;
pub use memory::InMemoryCluster;
pub use server::admin_router;

use crate::core::{Namespace, Result, RoutingRange, Shard, ShardDistribution, ShardKey, ZoneError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// Delivers administrative commands to a cluster, one at a time.
#[async_trait]
pub trait AdminChannel: Send + Sync {
    /// Runs a command.
    ///
    /// Returns `Err(ZoneError::Unavailable)` only when the command could not be
    /// delivered; a command the cluster rejected is `Ok(CommandReply::Failed)`.
    async fn run_command(&self, command: AdminCommand) -> Result<CommandReply>;
}

#[async_trait]
impl<T: AdminChannel + ?Sized> AdminChannel for Arc<T> {
    async fn run_command(&self, command: AdminCommand) -> Result<CommandReply> {
        (**self).run_command(command).await
    }
}

/// Database entry returned by `list_databases`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatabaseInfo {
    pub name: String,
    pub primary: String,
    pub sharding_enabled: bool,
    #[serde(default)]
    pub collections: Vec<String>,
}

#[derive(Deserialize)]
struct ShardListReply {
    shards: Vec<Shard>,
}

#[derive(Deserialize)]
struct DatabaseListReply {
    databases: Vec<DatabaseInfo>,
}

#[derive(Deserialize)]
struct CountReply {
    count: u64,
}

#[derive(Deserialize)]
struct InsertReply {
    inserted: u64,
}

#[derive(Deserialize)]
struct DistributionReply {
    shards: Vec<ShardDistribution>,
}

/// Typed front for an [`AdminChannel`].
#[derive(Clone)]
pub struct ClusterAdmin {
    channel: Arc<dyn AdminChannel>,
}

impl ClusterAdmin {
    pub fn new(channel: Arc<dyn AdminChannel>) -> Self {
        Self { channel }
    }

    pub fn from_channel(channel: impl AdminChannel + 'static) -> Self {
        Self::new(Arc::new(channel))
    }

    /// Sends a command and returns the reply untouched.
    pub async fn run(&self, command: AdminCommand) -> Result<CommandReply> {
        self.channel.run_command(command).await
    }

    /// Sends a mutating command and classifies its reply.
    pub async fn execute(&self, command: AdminCommand) -> Result<CommandOutcome> {
        let reply = self.channel.run_command(command.clone()).await?;
        Ok(classify(&command, reply))
    }

    /// Sends a read command and decodes its result; a rejected read is an error.
    pub async fn query<T: DeserializeOwned>(&self, command: AdminCommand) -> Result<T> {
        let name = command.name();
        match self.channel.run_command(command).await? {
            CommandReply::Ok(value) => {
                serde_json::from_value(value).map_err(|e| ZoneError::MalformedReply {
                    command: name.to_string(),
                    reason: e.to_string(),
                })
            }
            CommandReply::Failed(reason) => Err(ZoneError::CommandFailed {
                command: name.to_string(),
                reason,
            }),
        }
    }

    pub async fn ping(&self) -> Result<()> {
        self.query::<JsonValue>(AdminCommand::Ping).await.map(|_| ())
    }

    pub async fn list_shards(&self) -> Result<Vec<Shard>> {
        let reply: ShardListReply = self.query(AdminCommand::ListShards).await?;
        Ok(reply.shards)
    }

    pub async fn list_databases(&self) -> Result<Vec<DatabaseInfo>> {
        let reply: DatabaseListReply = self.query(AdminCommand::ListDatabases).await?;
        Ok(reply.databases)
    }

    pub async fn add_shard_to_zone(&self, shard_id: &str, zone: &str) -> Result<CommandOutcome> {
        self.execute(AdminCommand::AddShardToZone {
            shard_id: shard_id.to_string(),
            zone: zone.to_string(),
        })
        .await
    }

    pub async fn remove_shard_from_zone(
        &self,
        shard_id: &str,
        zone: &str,
    ) -> Result<CommandOutcome> {
        self.execute(AdminCommand::RemoveShardFromZone {
            shard_id: shard_id.to_string(),
            zone: zone.to_string(),
        })
        .await
    }

    pub async fn remove_zone(&self, zone: &str) -> Result<CommandOutcome> {
        self.execute(AdminCommand::RemoveZone {
            zone: zone.to_string(),
        })
        .await
    }

    pub async fn enable_sharding(&self, database: &str) -> Result<CommandOutcome> {
        self.execute(AdminCommand::EnableSharding {
            database: database.to_string(),
        })
        .await
    }

    pub async fn move_primary(&self, database: &str, shard_id: &str) -> Result<CommandOutcome> {
        self.execute(AdminCommand::MovePrimary {
            database: database.to_string(),
            shard_id: shard_id.to_string(),
        })
        .await
    }

    pub async fn shard_collection(
        &self,
        namespace: &Namespace,
        key: &ShardKey,
    ) -> Result<CommandOutcome> {
        self.execute(AdminCommand::ShardCollection {
            namespace: namespace.clone(),
            key: key.fields(),
        })
        .await
    }

    /// Binds `range` to its zone, encoding the bounds under `key`'s field names.
    pub async fn update_zone_key_range(
        &self,
        range: &RoutingRange,
        key: &ShardKey,
    ) -> Result<CommandOutcome> {
        self.execute(AdminCommand::UpdateZoneKeyRange {
            namespace: range.namespace.clone(),
            min: key.bound_document(&range.min),
            max: key.bound_document(&range.max),
            zone: range.zone.clone(),
        })
        .await
    }

    pub async fn insert_many(
        &self,
        namespace: &Namespace,
        documents: Vec<JsonValue>,
    ) -> Result<u64> {
        let reply: InsertReply = self
            .query(AdminCommand::InsertMany {
                namespace: namespace.clone(),
                documents,
            })
            .await?;
        Ok(reply.inserted)
    }

    pub async fn count_documents(
        &self,
        namespace: &Namespace,
        filter: DocumentFilter,
    ) -> Result<u64> {
        let reply: CountReply = self
            .query(AdminCommand::CountDocuments {
                namespace: namespace.clone(),
                filter,
            })
            .await?;
        Ok(reply.count)
    }

    pub async fn data_distribution(&self, namespace: &Namespace) -> Result<Vec<ShardDistribution>> {
        let reply: DistributionReply = self
            .query(AdminCommand::DataDistribution {
                namespace: namespace.clone(),
            })
            .await?;
        Ok(reply.shards)
    }

    pub async fn drop_database(&self, database: &str) -> Result<CommandOutcome> {
        self.execute(AdminCommand::DropDatabase {
            database: database.to_string(),
        })
        .await
    }
}
