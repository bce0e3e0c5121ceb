use super::AdminChannel;
use super::command::{AdminCommand, CommandReply, DocumentFilter};
use crate::core::{Namespace, Result, RoutingRange, Shard, ShardKey, ZoneError};
use async_trait::async_trait;
use serde_json::{Value as JsonValue, json};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;

// The simulated cluster is split into its state model and its command handlers.
include!("memory/state.rs");
include!("memory/commands.rs");

/// An in-process stand-in for a sharded cluster's router.
///
/// Keeps shards, zone tags, databases, zone key ranges and documents in memory
/// and places every document the way a zone-aware balancer would. Rejections
/// use the same wording style as a real router so that reply classification is
/// exercised end to end. Commands are serialized behind one lock.
#[derive(Clone, Default)]
pub struct InMemoryCluster {
    state: Arc<Mutex<ClusterState>>,
}

impl InMemoryCluster {
    /// Creates a cluster with the given shard ids, in order.
    pub fn with_shards(ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let state = ClusterState {
            shards: ids
                .into_iter()
                .map(|id| {
                    let id = id.into();
                    ShardRecord::new(id.clone(), default_host(&id))
                })
                .collect(),
            ..ClusterState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Takes the cluster on or offline; offline clusters fail every command as unavailable.
    pub async fn set_available(&self, available: bool) {
        self.state.lock().await.available = available;
    }

    /// Makes the next `command` (by name) fail with `message`. Faults queue up per command.
    pub async fn fail_next(&self, command: &str, message: impl Into<String>) {
        self.state
            .lock()
            .await
            .faults
            .entry(command.to_string())
            .or_default()
            .push_back(message.into());
    }

    /// Zone tags per shard id.
    pub async fn zone_tags(&self) -> BTreeMap<String, Vec<String>> {
        let state = self.state.lock().await;
        state
            .shards
            .iter()
            .map(|s| (s.id.clone(), s.zones.iter().cloned().collect()))
            .collect()
    }

    /// Names of every zone the cluster knows about.
    pub async fn zone_names(&self) -> Vec<String> {
        self.state.lock().await.zones.iter().cloned().collect()
    }

    /// Zone key ranges installed on a collection.
    pub async fn zone_ranges(&self, namespace: &Namespace) -> Vec<RoutingRange> {
        let state = self.state.lock().await;
        state
            .collection(namespace)
            .map(|c| c.ranges.clone())
            .unwrap_or_default()
    }

    pub async fn primary_of(&self, database: &str) -> Option<String> {
        let state = self.state.lock().await;
        state.databases.get(database).map(|db| db.primary.clone())
    }

    /// Documents of a collection held by one shard.
    pub async fn documents_on(&self, namespace: &Namespace, shard_id: &str) -> Vec<JsonValue> {
        let state = self.state.lock().await;
        state
            .collection(namespace)
            .map(|c| {
                c.documents
                    .iter()
                    .filter(|d| d.shard == shard_id)
                    .map(|d| d.body.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Names of all commands received so far, in arrival order.
    pub async fn command_log(&self) -> Vec<String> {
        self.state.lock().await.command_log.clone()
    }
}

#[async_trait]
impl AdminChannel for InMemoryCluster {
    async fn run_command(&self, command: AdminCommand) -> Result<CommandReply> {
        let mut state = self.state.lock().await;
        if !state.available {
            return Err(ZoneError::Unavailable(
                "cluster router is not reachable".to_string(),
            ));
        }
        state.command_log.push(command.name().to_string());
        if let Some(message) = state.take_fault(command.name()) {
            return Ok(CommandReply::Failed(message));
        }
        Ok(match state.apply(command) {
            Ok(result) => CommandReply::Ok(result),
            Err(message) => CommandReply::Failed(message),
        })
    }
}

fn default_host(shard_id: &str) -> String {
    format!("{0}/{0}-0.cluster.internal:27017", shard_id)
}
