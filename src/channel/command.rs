use crate::core::Namespace;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A named administrative command with structured arguments.
///
/// On the wire the variant name travels in the `command` field, e.g.
/// `{"command": "add_shard_to_zone", "shard_id": "shard00", "zone": "region1"}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum AdminCommand {
    Ping,
    ListShards,
    ListDatabases,
    AddShardToZone {
        shard_id: String,
        zone: String,
    },
    RemoveShardFromZone {
        shard_id: String,
        zone: String,
    },
    RemoveZone {
        zone: String,
    },
    EnableSharding {
        database: String,
    },
    MovePrimary {
        database: String,
        shard_id: String,
    },
    ShardCollection {
        namespace: Namespace,
        key: Vec<String>,
    },
    /// Binds `[min, max)` to `zone`. Bounds are documents keyed by the
    /// collection's shard key fields.
    UpdateZoneKeyRange {
        namespace: Namespace,
        min: JsonValue,
        max: JsonValue,
        zone: String,
    },
    InsertMany {
        namespace: Namespace,
        documents: Vec<JsonValue>,
    },
    CountDocuments {
        namespace: Namespace,
        #[serde(default)]
        filter: DocumentFilter,
    },
    DataDistribution {
        namespace: Namespace,
    },
    DropDatabase {
        database: String,
    },
}

impl AdminCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::ListShards => "list_shards",
            Self::ListDatabases => "list_databases",
            Self::AddShardToZone { .. } => "add_shard_to_zone",
            Self::RemoveShardFromZone { .. } => "remove_shard_from_zone",
            Self::RemoveZone { .. } => "remove_zone",
            Self::EnableSharding { .. } => "enable_sharding",
            Self::MovePrimary { .. } => "move_primary",
            Self::ShardCollection { .. } => "shard_collection",
            Self::UpdateZoneKeyRange { .. } => "update_zone_key_range",
            Self::InsertMany { .. } => "insert_many",
            Self::CountDocuments { .. } => "count_documents",
            Self::DataDistribution { .. } => "data_distribution",
            Self::DropDatabase { .. } => "drop_database",
        }
    }
}

/// Subset of query filters understood by `count_documents`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentFilter {
    #[default]
    All,
    /// `field` holds one of `values` (string comparison).
    In { field: String, values: Vec<String> },
}

impl DocumentFilter {
    pub fn field_in(
        field: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn matches(&self, document: &JsonValue) -> bool {
        match self {
            Self::All => true,
            Self::In { field, values } => document
                .get(field)
                .and_then(JsonValue::as_str)
                .is_some_and(|v| values.iter().any(|candidate| candidate == v)),
        }
    }
}

/// Raw reply of the cluster: a structured result or a human-readable failure.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandReply {
    Ok(JsonValue),
    Failed(String),
}

impl CommandReply {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// JSON envelope used by the HTTP transport: `{"ok": true, "result": ...}` or
/// `{"ok": false, "errmsg": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WireReply {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errmsg: Option<String>,
}

impl From<CommandReply> for WireReply {
    fn from(reply: CommandReply) -> Self {
        match reply {
            CommandReply::Ok(result) => Self {
                ok: true,
                result: Some(result),
                errmsg: None,
            },
            CommandReply::Failed(message) => Self {
                ok: false,
                result: None,
                errmsg: Some(message),
            },
        }
    }
}

impl From<WireReply> for CommandReply {
    fn from(wire: WireReply) -> Self {
        if wire.ok {
            Self::Ok(wire.result.unwrap_or(JsonValue::Null))
        } else {
            Self::Failed(
                wire.errmsg
                    .unwrap_or_else(|| "command failed without a message".to_string()),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{KeyBound, RangeKey, ShardKey};
    use serde_json::json;

    #[test]
    fn commands_are_tagged_by_name() {
        let cmd = AdminCommand::AddShardToZone {
            shard_id: "shard00".into(),
            zone: "region1".into(),
        };
        let encoded = serde_json::to_value(&cmd).unwrap();
        assert_eq!(
            encoded,
            json!({"command": "add_shard_to_zone", "shard_id": "shard00", "zone": "region1"})
        );
        assert_eq!(encoded["command"], cmd.name());

        let key = ShardKey::default();
        let range = AdminCommand::UpdateZoneKeyRange {
            namespace: Namespace::new("app_region1", "orders"),
            min: key.bound_document(&RangeKey::lower("CN")),
            max: key.bound_document(&RangeKey::upper("CN")),
            zone: "region1".into(),
        };
        let encoded = serde_json::to_value(&range).unwrap();
        assert_eq!(encoded["namespace"], "app_region1.orders");
        assert_eq!(encoded["max"]["zone_name"], json!({"$maxKey": 1}));
        let decoded: AdminCommand = serde_json::from_value(encoded).unwrap();
        match decoded {
            AdminCommand::UpdateZoneKeyRange { max, .. } => {
                assert_eq!(key.parse_bound(&max).map(|b| b.zone), Some(KeyBound::MaxKey))
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn in_filter_matches_string_fields_only() {
        let filter = DocumentFilter::field_in("tenant_id", ["CN", "TR"]);
        assert!(filter.matches(&json!({"tenant_id": "CN"})));
        assert!(!filter.matches(&json!({"tenant_id": "US"})));
        assert!(!filter.matches(&json!({"tenant_id": 7})));
        assert!(DocumentFilter::All.matches(&json!({})));
    }

    #[test]
    fn wire_reply_without_message_still_fails() {
        let reply: CommandReply = WireReply {
            ok: false,
            result: None,
            errmsg: None,
        }
        .into();
        assert!(matches!(reply, CommandReply::Failed(_)));
    }
}
