type Handled = std::result::Result<JsonValue, String>;

impl ClusterState {
    fn apply(&mut self, command: AdminCommand) -> Handled {
        match command {
            AdminCommand::Ping => Ok(json!({ "pong": true })),
            AdminCommand::ListShards => Ok(json!({
                "shards": self.shards.iter().map(ShardRecord::to_shard).collect::<Vec<_>>()
            })),
            AdminCommand::ListDatabases => Ok(self.list_databases()),
            AdminCommand::AddShardToZone { shard_id, zone } => {
                self.add_shard_to_zone(&shard_id, &zone)
            }
            AdminCommand::RemoveShardFromZone { shard_id, zone } => {
                self.remove_shard_from_zone(&shard_id, &zone)
            }
            AdminCommand::RemoveZone { zone } => self.remove_zone(&zone),
            AdminCommand::EnableSharding { database } => self.enable_sharding(&database),
            AdminCommand::MovePrimary { database, shard_id } => {
                self.move_primary(&database, &shard_id)
            }
            AdminCommand::ShardCollection { namespace, key } => {
                self.shard_collection(&namespace, key)
            }
            AdminCommand::UpdateZoneKeyRange {
                namespace,
                min,
                max,
                zone,
            } => self.update_zone_key_range(&namespace, min, max, zone),
            AdminCommand::InsertMany {
                namespace,
                documents,
            } => self.insert_many(&namespace, documents),
            AdminCommand::CountDocuments { namespace, filter } => {
                Ok(json!({ "count": self.count_documents(&namespace, &filter) }))
            }
            AdminCommand::DataDistribution { namespace } => self.data_distribution(&namespace),
            AdminCommand::DropDatabase { database } => {
                let dropped = self.databases.remove(&database).is_some();
                Ok(json!({ "dropped": dropped }))
            }
        }
    }

    fn list_databases(&self) -> JsonValue {
        let databases: Vec<JsonValue> = self
            .databases
            .iter()
            .map(|(name, db)| {
                json!({
                    "name": name,
                    "primary": db.primary,
                    "sharding_enabled": db.sharding_enabled,
                    "collections": db.collections.keys().collect::<Vec<_>>(),
                })
            })
            .collect();
        json!({ "databases": databases })
    }

    fn add_shard_to_zone(&mut self, shard_id: &str, zone: &str) -> Handled {
        if zone.trim().is_empty() {
            return Err("zone name must not be empty".to_string());
        }
        let shard = self
            .shard_mut(shard_id)
            .ok_or_else(|| format!("ShardNotFound: shard '{}' does not exist", shard_id))?;
        if !shard.zones.insert(zone.to_string()) {
            return Err(format!(
                "shard '{}' is already in zone '{}'",
                shard_id, zone
            ));
        }
        self.zones.insert(zone.to_string());
        self.rebalance();
        Ok(json!({ "shard_id": shard_id, "zone": zone }))
    }

    fn remove_shard_from_zone(&mut self, shard_id: &str, zone: &str) -> Handled {
        let shard = self
            .shard_mut(shard_id)
            .ok_or_else(|| format!("ShardNotFound: shard '{}' does not exist", shard_id))?;
        if !shard.zones.remove(zone) {
            return Err(format!("shard '{}' is not in zone '{}'", shard_id, zone));
        }
        self.rebalance();
        Ok(json!({ "shard_id": shard_id, "zone": zone }))
    }

    fn remove_zone(&mut self, zone: &str) -> Handled {
        if !self.zones.contains(zone) {
            return Err(format!("zone '{}' not found", zone));
        }
        let holders: Vec<&str> = self
            .shards
            .iter()
            .filter(|s| s.zones.contains(zone))
            .map(|s| s.id.as_str())
            .collect();
        if !holders.is_empty() {
            return Err(format!(
                "zone '{}' is still assigned to shard(s) {}",
                zone,
                holders.join(", ")
            ));
        }
        self.zones.remove(zone);
        Ok(json!({ "zone": zone }))
    }

    fn enable_sharding(&mut self, database: &str) -> Handled {
        let db = self.ensure_database(database)?;
        if db.sharding_enabled {
            return Err(format!(
                "sharding already enabled for database '{}'",
                database
            ));
        }
        db.sharding_enabled = true;
        Ok(json!({ "database": database, "primary": db.primary }))
    }

    fn move_primary(&mut self, database: &str, shard_id: &str) -> Handled {
        if self.shard(shard_id).is_none() {
            return Err(format!("ShardNotFound: shard '{}' does not exist", shard_id));
        }
        let db = self
            .databases
            .get_mut(database)
            .ok_or_else(|| format!("database '{}' not found", database))?;
        if db.primary == shard_id {
            return Ok(json!({ "primary": shard_id, "moved": false }));
        }
        db.primary = shard_id.to_string();
        self.rebalance();
        Ok(json!({ "primary": shard_id, "moved": true }))
    }

    fn shard_collection(&mut self, namespace: &Namespace, key: Vec<String>) -> Handled {
        let [tenant_field, zone_field]: [String; 2] = key
            .try_into()
            .map_err(|_| "shard key must name exactly two fields".to_string())?;
        let db = self
            .databases
            .get_mut(&namespace.database)
            .filter(|db| db.sharding_enabled)
            .ok_or_else(|| {
                format!(
                    "sharding not enabled for database '{}'",
                    namespace.database
                )
            })?;
        let collection = db
            .collections
            .entry(namespace.collection.clone())
            .or_default();
        if collection.shard_key.is_some() {
            return Err(format!("collection '{}' is already sharded", namespace));
        }
        collection.shard_key = Some(ShardKey {
            tenant_field,
            zone_field,
        });
        self.rebalance();
        Ok(json!({ "namespace": namespace.to_string() }))
    }

    fn update_zone_key_range(
        &mut self,
        namespace: &Namespace,
        min: JsonValue,
        max: JsonValue,
        zone: String,
    ) -> Handled {
        let collection = self
            .databases
            .get_mut(&namespace.database)
            .and_then(|db| db.collections.get_mut(&namespace.collection))
            .ok_or_else(|| format!("namespace '{}' is not sharded", namespace))?;
        let shard_key = collection
            .shard_key
            .as_ref()
            .ok_or_else(|| format!("namespace '{}' is not sharded", namespace))?;
        let bound = |document: &JsonValue| {
            shard_key.parse_bound(document).ok_or_else(|| {
                format!(
                    "range bound {} must name exactly the shard key fields {:?}",
                    document,
                    shard_key.fields()
                )
            })
        };
        let (min, max) = (bound(&min)?, bound(&max)?);
        if min >= max {
            return Err(format!("range min {} must be less than max {}", min, max));
        }
        if !self.zones.contains(&zone) {
            return Err(format!("zone '{}' does not exist", zone));
        }

        let range = RoutingRange {
            namespace: namespace.clone(),
            min,
            max,
            zone,
        };
        if collection.ranges.contains(&range) {
            return Ok(json!({ "changed": false }));
        }
        if let Some(existing) = collection.ranges.iter().find(|r| r.overlaps(&range)) {
            return Err(format!(
                "range [{}, {}) overlaps an existing range bound to zone '{}'",
                range.min, range.max, existing.zone
            ));
        }
        collection.ranges.push(range);
        collection.ranges.sort_by(|a, b| a.min.cmp(&b.min));
        self.rebalance();
        Ok(json!({ "changed": true }))
    }

    fn insert_many(&mut self, namespace: &Namespace, documents: Vec<JsonValue>) -> Handled {
        if let Some(bad) = documents.iter().position(|d| !d.is_object()) {
            return Err(format!("document at position {} is not an object", bad));
        }
        let homes = self.zone_homes();
        let db = self.ensure_database(&namespace.database)?;
        let primary = db.primary.clone();
        let collection = db
            .collections
            .entry(namespace.collection.clone())
            .or_default();
        let inserted = documents.len();
        for body in documents {
            let shard = route_document(
                collection.shard_key.as_ref(),
                &collection.ranges,
                &homes,
                &primary,
                &body,
            );
            collection.documents.push(StoredDocument { shard, body });
        }
        Ok(json!({ "inserted": inserted }))
    }

    fn count_documents(&self, namespace: &Namespace, filter: &DocumentFilter) -> usize {
        self.collection(namespace)
            .map(|c| c.documents.iter().filter(|d| filter.matches(&d.body)).count())
            .unwrap_or(0)
    }

    fn data_distribution(&self, namespace: &Namespace) -> Handled {
        let collection = self
            .collection(namespace)
            .ok_or_else(|| format!("namespace '{}' not found", namespace))?;
        let shards: Vec<JsonValue> = self
            .shards
            .iter()
            .filter_map(|shard| {
                let documents = collection
                    .documents
                    .iter()
                    .filter(|d| d.shard == shard.id)
                    .count();
                (documents > 0).then(|| json!({ "shard_id": shard.id, "documents": documents }))
            })
            .collect();
        Ok(json!({ "shards": shards }))
    }
}
