use super::{Result, ZoneError};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue, json};
use std::collections::BTreeMap;
use std::fmt;

pub const DEFAULT_TENANT_FIELD: &str = "tenant_id";
pub const DEFAULT_ZONE_FIELD: &str = "zone_name";

/// A physical placement target reported by the cluster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Shard {
    pub id: String,
    pub host: String,
    /// Zones the cluster currently associates with this shard.
    #[serde(default)]
    pub zones: Vec<String>,
}

impl Shard {
    pub fn new(id: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            host: host.into(),
            zones: Vec::new(),
        }
    }

    pub fn serves_zone(&self, zone: &str) -> bool {
        self.zones.iter().any(|z| z == zone)
    }
}

/// A logical placement unit: a named group of tenants sharing one database.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Zone {
    pub name: String,
    pub tenant_ids: Vec<String>,
    pub database_name: String,
}

impl Zone {
    /// Builds a zone, dropping duplicate tenant ids while keeping declaration order.
    pub fn new(
        name: impl Into<String>,
        tenant_ids: impl IntoIterator<Item = impl Into<String>>,
        database_name: impl Into<String>,
    ) -> Self {
        let mut unique: Vec<String> = Vec::new();
        for tenant in tenant_ids {
            let tenant = tenant.into();
            if !unique.contains(&tenant) {
                unique.push(tenant);
            }
        }
        Self {
            name: name.into(),
            tenant_ids: unique,
            database_name: database_name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CollectionClass {
    /// Reference data copied verbatim into every zone database.
    Common,
    /// Records routed by the compound `(tenant, zone)` key.
    TenantScoped,
}

/// Fully qualified collection name, `database.collection`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Namespace {
    pub database: String,
    pub collection: String,
}

impl Namespace {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw.split_once('.') {
            Some((database, collection)) if !database.is_empty() && !collection.is_empty() => {
                Ok(Self::new(database, collection))
            }
            _ => Err(ZoneError::InvalidConfig(format!(
                "namespace '{}' must look like 'database.collection'",
                raw
            ))),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

impl TryFrom<String> for Namespace {
    type Error = ZoneError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Namespace> for String {
    fn from(ns: Namespace) -> Self {
        ns.to_string()
    }
}

/// One component of a routing key bound.
///
/// `MaxKey` sorts after every string, which makes a range open-ended on the
/// upper side. The derived ordering relies on variant order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "KeyBoundRepr", into = "KeyBoundRepr")]
pub enum KeyBound {
    Str(String),
    MaxKey,
}

impl KeyBound {
    pub fn str(value: impl Into<String>) -> Self {
        Self::Str(value.into())
    }
}

impl fmt::Display for KeyBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(value) => write!(f, "{:?}", value),
            Self::MaxKey => f.write_str("MaxKey"),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum KeyBoundRepr {
    Str(String),
    Max(MaxKeyMarker),
}

#[derive(Serialize, Deserialize)]
struct MaxKeyMarker {
    #[serde(rename = "$maxKey")]
    max_key: u8,
}

impl From<KeyBoundRepr> for KeyBound {
    fn from(repr: KeyBoundRepr) -> Self {
        match repr {
            KeyBoundRepr::Str(value) => Self::Str(value),
            KeyBoundRepr::Max(_) => Self::MaxKey,
        }
    }
}

impl From<&KeyBound> for JsonValue {
    fn from(bound: &KeyBound) -> Self {
        match bound {
            KeyBound::Str(value) => JsonValue::String(value.clone()),
            KeyBound::MaxKey => json!({ "$maxKey": 1 }),
        }
    }
}

impl From<KeyBound> for KeyBoundRepr {
    fn from(bound: KeyBound) -> Self {
        match bound {
            KeyBound::Str(value) => Self::Str(value),
            KeyBound::MaxKey => Self::Max(MaxKeyMarker { max_key: 1 }),
        }
    }
}

/// A point in the compound `(tenant, zone)` key space, compared lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RangeKey {
    pub tenant: String,
    pub zone: KeyBound,
}

impl RangeKey {
    pub fn new(tenant: impl Into<String>, zone: KeyBound) -> Self {
        Self {
            tenant: tenant.into(),
            zone,
        }
    }

    /// `(tenant, "")`: the empty string sorts before any real zone name.
    pub fn lower(tenant: impl Into<String>) -> Self {
        Self::new(tenant, KeyBound::str(""))
    }

    /// `(tenant, MaxKey)`.
    pub fn upper(tenant: impl Into<String>) -> Self {
        Self::new(tenant, KeyBound::MaxKey)
    }
}

impl fmt::Display for RangeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:?}, {})", self.tenant, self.zone)
    }
}

/// Half-open key interval `[min, max)` bound to a zone for one collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoutingRange {
    pub namespace: Namespace,
    pub min: RangeKey,
    pub max: RangeKey,
    pub zone: String,
}

impl RoutingRange {
    /// The range covering every document of one tenant, whatever its zone field says.
    pub fn for_tenant(
        namespace: Namespace,
        tenant_id: impl Into<String>,
        zone: impl Into<String>,
    ) -> Self {
        let tenant_id = tenant_id.into();
        Self {
            namespace,
            min: RangeKey::lower(tenant_id.clone()),
            max: RangeKey::upper(tenant_id),
            zone: zone.into(),
        }
    }

    pub fn contains(&self, key: &RangeKey) -> bool {
        &self.min <= key && key < &self.max
    }

    pub fn overlaps(&self, other: &RoutingRange) -> bool {
        self.min < other.max && other.min < self.max
    }
}

/// Field names of the compound routing key, tenant first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShardKey {
    pub tenant_field: String,
    pub zone_field: String,
}

impl Default for ShardKey {
    fn default() -> Self {
        Self {
            tenant_field: DEFAULT_TENANT_FIELD.to_string(),
            zone_field: DEFAULT_ZONE_FIELD.to_string(),
        }
    }
}

impl ShardKey {
    pub fn fields(&self) -> Vec<String> {
        vec![self.tenant_field.clone(), self.zone_field.clone()]
    }

    /// Extracts the routing key of a document; missing or non-string fields read as "".
    pub fn key_for(&self, document: &JsonValue) -> RangeKey {
        let read = |field: &str| {
            document
                .get(field)
                .and_then(JsonValue::as_str)
                .unwrap_or_default()
                .to_string()
        };
        RangeKey::new(
            read(&self.tenant_field),
            KeyBound::Str(read(&self.zone_field)),
        )
    }

    /// Encodes a range bound as a document keyed by the shard key fields,
    /// e.g. `{"country": "CN", "region": {"$maxKey": 1}}`.
    pub fn bound_document(&self, bound: &RangeKey) -> JsonValue {
        let mut document = JsonMap::new();
        document.insert(
            self.tenant_field.clone(),
            JsonValue::String(bound.tenant.clone()),
        );
        document.insert(self.zone_field.clone(), JsonValue::from(&bound.zone));
        JsonValue::Object(document)
    }

    /// Reads a bound document back. It must name exactly the two key fields.
    pub fn parse_bound(&self, document: &JsonValue) -> Option<RangeKey> {
        let fields = document.as_object().filter(|fields| fields.len() == 2)?;
        let tenant = fields.get(&self.tenant_field)?.as_str()?;
        let zone: KeyBound = serde_json::from_value(fields.get(&self.zone_field)?.clone()).ok()?;
        Some(RangeKey::new(tenant, zone))
    }
}

/// Document count held by one shard for a collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShardDistribution {
    pub shard_id: String,
    pub documents: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ZoneAssignment {
    pub zone: String,
    pub shard_id: String,
}

/// Ordered zone -> shard mapping, in zone declaration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ZonePlan {
    assignments: Vec<ZoneAssignment>,
}

impl ZonePlan {
    pub fn new(assignments: Vec<ZoneAssignment>) -> Self {
        Self { assignments }
    }

    pub fn shard_for(&self, zone: &str) -> Option<&str> {
        self.assignments
            .iter()
            .find(|a| a.zone == zone)
            .map(|a| a.shard_id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ZoneAssignment> {
        self.assignments.iter()
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn contains_zone(&self, zone: &str) -> bool {
        self.shard_for(zone).is_some()
    }

    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.assignments
            .iter()
            .map(|a| (a.zone.clone(), a.shard_id.clone()))
            .collect()
    }
}
