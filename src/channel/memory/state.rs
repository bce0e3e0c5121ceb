#[derive(Debug, Clone)]
struct ShardRecord {
    id: String,
    host: String,
    zones: BTreeSet<String>,
}

impl ShardRecord {
    fn new(id: String, host: String) -> Self {
        Self {
            id,
            host,
            zones: BTreeSet::new(),
        }
    }

    fn to_shard(&self) -> Shard {
        Shard {
            id: self.id.clone(),
            host: self.host.clone(),
            zones: self.zones.iter().cloned().collect(),
        }
    }
}

#[derive(Debug, Clone)]
struct StoredDocument {
    shard: String,
    body: JsonValue,
}

#[derive(Debug, Clone, Default)]
struct CollectionRecord {
    shard_key: Option<ShardKey>,
    ranges: Vec<RoutingRange>,
    documents: Vec<StoredDocument>,
}

#[derive(Debug, Clone)]
struct DatabaseRecord {
    primary: String,
    sharding_enabled: bool,
    collections: BTreeMap<String, CollectionRecord>,
}

impl DatabaseRecord {
    fn new(primary: String) -> Self {
        Self {
            primary,
            sharding_enabled: false,
            collections: BTreeMap::new(),
        }
    }
}

#[derive(Debug)]
struct ClusterState {
    available: bool,
    shards: Vec<ShardRecord>,
    /// Zones exist from their first shard association until removed.
    zones: BTreeSet<String>,
    databases: BTreeMap<String, DatabaseRecord>,
    faults: HashMap<String, VecDeque<String>>,
    command_log: Vec<String>,
}

impl Default for ClusterState {
    fn default() -> Self {
        Self {
            available: true,
            shards: Vec::new(),
            zones: BTreeSet::new(),
            databases: BTreeMap::new(),
            faults: HashMap::new(),
            command_log: Vec::new(),
        }
    }
}

impl ClusterState {
    fn shard(&self, id: &str) -> Option<&ShardRecord> {
        self.shards.iter().find(|s| s.id == id)
    }

    fn shard_mut(&mut self, id: &str) -> Option<&mut ShardRecord> {
        self.shards.iter_mut().find(|s| s.id == id)
    }

    fn collection(&self, namespace: &Namespace) -> Option<&CollectionRecord> {
        self.databases
            .get(&namespace.database)
            .and_then(|db| db.collections.get(&namespace.collection))
    }

    fn take_fault(&mut self, command: &str) -> Option<String> {
        let queue = self.faults.get_mut(command)?;
        let message = queue.pop_front();
        if queue.is_empty() {
            self.faults.remove(command);
        }
        message
    }

    /// First shard (in registration order) tagged with each zone.
    fn zone_homes(&self) -> HashMap<String, String> {
        let mut homes = HashMap::new();
        for shard in &self.shards {
            for zone in &shard.zones {
                homes.entry(zone.clone()).or_insert_with(|| shard.id.clone());
            }
        }
        homes
    }

    /// Primary for a newly created database: the first registered shard.
    fn default_primary(&self) -> std::result::Result<String, String> {
        self.shards
            .first()
            .map(|s| s.id.clone())
            .ok_or_else(|| "no shards are registered with the cluster".to_string())
    }

    fn ensure_database(&mut self, name: &str) -> std::result::Result<&mut DatabaseRecord, String> {
        validate_database_name(name)?;
        if !self.databases.contains_key(name) {
            let primary = self.default_primary()?;
            self.databases
                .insert(name.to_string(), DatabaseRecord::new(primary));
        }
        self.databases
            .get_mut(name)
            .ok_or_else(|| format!("database '{}' not found", name))
    }

    /// Re-places every document after a topology or range change.
    fn rebalance(&mut self) {
        let homes = self.zone_homes();
        for db in self.databases.values_mut() {
            for collection in db.collections.values_mut() {
                let CollectionRecord {
                    shard_key,
                    ranges,
                    documents,
                } = collection;
                for doc in documents.iter_mut() {
                    doc.shard =
                        route_document(shard_key.as_ref(), ranges, &homes, &db.primary, &doc.body);
                }
            }
        }
    }
}

/// Shard that should hold `body`: the home of the zone whose range contains the
/// document key, or the database primary when no range applies.
fn route_document(
    shard_key: Option<&ShardKey>,
    ranges: &[RoutingRange],
    homes: &HashMap<String, String>,
    primary: &str,
    body: &JsonValue,
) -> String {
    shard_key
        .map(|key| key.key_for(body))
        .and_then(|point| ranges.iter().find(|r| r.contains(&point)))
        .and_then(|range| homes.get(&range.zone))
        .cloned()
        .unwrap_or_else(|| primary.to_string())
}

fn validate_database_name(name: &str) -> std::result::Result<(), String> {
    if name.trim().is_empty() || name.contains('.') || name.contains(' ') {
        return Err(format!("invalid database name '{}'", name));
    }
    Ok(())
}
