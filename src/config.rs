use crate::core::{CollectionClass, Result, ShardKey, Zone, ZoneError};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

/// One zone as declared in the static placement configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ZoneConfig {
    pub name: String,
    pub tenant_ids: Vec<String>,
    /// Name of the database that holds this zone's data.
    pub database_prefix: String,
}

impl ZoneConfig {
    pub fn new(
        name: impl Into<String>,
        tenant_ids: impl IntoIterator<Item = impl Into<String>>,
        database_prefix: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            tenant_ids: tenant_ids.into_iter().map(Into::into).collect(),
            database_prefix: database_prefix.into(),
        }
    }

    pub fn to_zone(&self) -> Zone {
        Zone::new(
            self.name.clone(),
            self.tenant_ids.iter().cloned(),
            self.database_prefix.clone(),
        )
    }
}

/// Static placement configuration.
///
/// Declared once, validated on construction and never mutated afterwards.
/// Zone order matters: it drives positional shard assignment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlacementConfig {
    pub zones: Vec<ZoneConfig>,
    #[serde(default = "default_common_collections")]
    pub common_collections: Vec<String>,
    #[serde(default = "default_tenant_collections")]
    pub tenant_collections: Vec<String>,
    #[serde(default)]
    pub shard_key: ShardKey,
    /// Shards never used as placement targets (the embedded config shard).
    #[serde(default = "default_excluded_shards")]
    pub excluded_shards: Vec<String>,
    #[serde(default = "default_demo_data_size")]
    pub demo_data_size: usize,
}

fn default_common_collections() -> Vec<String> {
    vec!["users".into(), "products".into(), "categories".into()]
}

fn default_tenant_collections() -> Vec<String> {
    vec!["orders".into(), "transactions".into(), "logs".into()]
}

fn default_excluded_shards() -> Vec<String> {
    vec!["config".into()]
}

fn default_demo_data_size() -> usize {
    1000
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            zones: vec![
                ZoneConfig::new("region1", ["CN", "TR"], "app_region1"),
                ZoneConfig::new("region2", ["AE", "US", "EU", "GB"], "app_region2"),
            ],
            common_collections: default_common_collections(),
            tenant_collections: default_tenant_collections(),
            shard_key: ShardKey::default(),
            excluded_shards: default_excluded_shards(),
            demo_data_size: default_demo_data_size(),
        }
    }
}

impl PlacementConfig {
    /// Builds a config with the default collections around the given zones.
    pub fn with_zones(zones: Vec<ZoneConfig>) -> Result<Self> {
        let config = Self {
            zones,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|e| ZoneError::InvalidConfig(format!("cannot parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ZoneError::InvalidConfig(format!("cannot read '{}': {}", path.display(), e))
        })?;
        Self::from_json_str(&raw)
    }

    /// Checks that zones are non-empty, uniquely named, tenant-disjoint and
    /// backed by distinct databases, and that no collection is both common and
    /// tenant-scoped.
    pub fn validate(&self) -> Result<()> {
        if self.zones.is_empty() {
            return Err(ZoneError::InvalidConfig(
                "at least one zone must be configured".to_string(),
            ));
        }

        let mut names = HashSet::new();
        let mut databases = HashSet::new();
        let mut tenant_owner: HashMap<&str, &str> = HashMap::new();
        for zone in &self.zones {
            if zone.name.trim().is_empty() {
                return Err(ZoneError::InvalidConfig(
                    "zone name must not be empty".to_string(),
                ));
            }
            if !names.insert(zone.name.as_str()) {
                return Err(ZoneError::InvalidConfig(format!(
                    "zone '{}' is declared more than once",
                    zone.name
                )));
            }
            if zone.database_prefix.trim().is_empty() || zone.database_prefix.contains('.') {
                return Err(ZoneError::InvalidConfig(format!(
                    "zone '{}' has an invalid database name '{}'",
                    zone.name, zone.database_prefix
                )));
            }
            if !databases.insert(zone.database_prefix.as_str()) {
                return Err(ZoneError::InvalidConfig(format!(
                    "database '{}' is used by more than one zone",
                    zone.database_prefix
                )));
            }
            for tenant in &zone.tenant_ids {
                if tenant.trim().is_empty() {
                    return Err(ZoneError::InvalidConfig(format!(
                        "zone '{}' lists an empty tenant id",
                        zone.name
                    )));
                }
                if let Some(owner) = tenant_owner.insert(tenant.as_str(), zone.name.as_str()) {
                    if owner != zone.name {
                        return Err(ZoneError::InvalidConfig(format!(
                            "tenant '{}' belongs to both '{}' and '{}'",
                            tenant, owner, zone.name
                        )));
                    }
                }
            }
        }

        if self.shard_key.tenant_field.is_empty()
            || self.shard_key.zone_field.is_empty()
            || self.shard_key.tenant_field == self.shard_key.zone_field
        {
            return Err(ZoneError::InvalidConfig(
                "shard key needs two distinct, non-empty field names".to_string(),
            ));
        }

        let common: HashSet<&str> = self.common_collections.iter().map(String::as_str).collect();
        if let Some(clash) = self
            .tenant_collections
            .iter()
            .find(|c| common.contains(c.as_str()))
        {
            return Err(ZoneError::InvalidConfig(format!(
                "collection '{}' cannot be both common and tenant-scoped",
                clash
            )));
        }

        Ok(())
    }

    pub fn zones(&self) -> Vec<Zone> {
        self.zones.iter().map(ZoneConfig::to_zone).collect()
    }

    /// Zone owning a tenant id, if any.
    pub fn zone_for_tenant(&self, tenant_id: &str) -> Option<&ZoneConfig> {
        self.zones
            .iter()
            .find(|z| z.tenant_ids.iter().any(|t| t == tenant_id))
    }

    pub fn collection_class(&self, collection: &str) -> Option<CollectionClass> {
        if self.tenant_collections.iter().any(|c| c == collection) {
            Some(CollectionClass::TenantScoped)
        } else if self.common_collections.iter().any(|c| c == collection) {
            Some(CollectionClass::Common)
        } else {
            None
        }
    }
}

/// Connection settings for the admin channel.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Base URL of the admin endpoint, e.g. `http://127.0.0.1:27080`.
    pub endpoint: String,
    /// Per-request timeout applied by the transport.
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl ChannelConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            request_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Set request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}
