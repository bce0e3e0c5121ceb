//! Sample records for exercising a zone setup.
//!
//! Common collections get the same records in every zone database; tenant
//! collections get records tagged with the shard key fields of their tenant.

use crate::channel::ClusterAdmin;
use crate::config::PlacementConfig;
use crate::core::{Namespace, Result, ShardKey, Zone};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue, json};
use std::collections::BTreeMap;
use tracing::info;
use uuid::Uuid;

pub const COMMON_USERS: usize = 50;
pub const COMMON_PRODUCTS: usize = 100;
pub const COMMON_CATEGORIES: usize = 20;

const CATEGORY_NAMES: [&str; 7] = [
    "Electronics",
    "Clothing",
    "Books",
    "Home",
    "Sports",
    "Automotive",
    "Health",
];
const ACTIONS: [&str; 6] = [
    "login",
    "logout",
    "view_product",
    "add_to_cart",
    "checkout",
    "payment",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub country: String,
    pub region: String,
    pub created_at: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
    pub preferences: JsonValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub product_id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: f64,
    pub currency: String,
    pub available_regions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub category_id: String,
    pub name: String,
    pub description: String,
    pub parent_category: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: String,
    pub quantity: u32,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub user_id: String,
    pub country: String,
    pub region: String,
    pub products: Vec<OrderLine>,
    pub total_amount: f64,
    pub currency: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub shipping_address: JsonValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: String,
    pub order_id: String,
    pub user_id: String,
    pub country: String,
    pub region: String,
    pub amount: f64,
    pub currency: String,
    pub payment_method: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Log {
    pub log_id: String,
    pub user_id: String,
    pub country: String,
    pub region: String,
    pub action: String,
    pub resource: String,
    pub details: JsonValue,
    pub ip_address: String,
    pub user_agent: String,
    pub created_at: DateTime<Utc>,
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Builds sample records. Choices that vary between records cycle on `index`.
#[derive(Debug, Clone, Default)]
pub struct DataGenerator {
    shard_key: ShardKey,
}

impl DataGenerator {
    pub fn new(shard_key: ShardKey) -> Self {
        Self { shard_key }
    }

    pub fn user(&self, country: &str, region: &str) -> User {
        let user_id = Uuid::new_v4().to_string();
        let username = format!("user_{}", short_id(&user_id));
        let language = if matches!(country, "US" | "GB") { "en" } else { "local" };
        let now = Utc::now();
        User {
            email: format!("{}@example.com", username),
            username,
            user_id,
            country: country.to_string(),
            region: region.to_string(),
            created_at: now,
            last_login: now,
            preferences: json!({
                "language": language,
                "timezone": "UTC",
                "notifications": true,
            }),
        }
    }

    pub fn product(&self, index: usize, regions: &[String]) -> Product {
        let product_id = Uuid::new_v4().to_string();
        let short = short_id(&product_id).to_string();
        let now = Utc::now();
        Product {
            name: format!("Product {}", short),
            description: format!("Description for product {}", short),
            category: CATEGORY_NAMES[index % 5].to_string(),
            price: 10.0 + (index % 1000) as f64 / 10.0,
            currency: "USD".to_string(),
            available_regions: regions.to_vec(),
            product_id,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn category(&self, index: usize) -> Category {
        let name = CATEGORY_NAMES[index % CATEGORY_NAMES.len()];
        Category {
            category_id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: format!("Category description for {}", name),
            parent_category: None,
            created_at: Utc::now(),
        }
    }

    pub fn order(&self, user_id: &str, country: &str, region: &str) -> Order {
        let now = Utc::now();
        Order {
            order_id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            country: country.to_string(),
            region: region.to_string(),
            products: vec![
                OrderLine {
                    product_id: Uuid::new_v4().to_string(),
                    quantity: 1,
                    price: 25.99,
                },
                OrderLine {
                    product_id: Uuid::new_v4().to_string(),
                    quantity: 2,
                    price: 15.50,
                },
            ],
            total_amount: 56.99,
            currency: "USD".to_string(),
            status: "pending".to_string(),
            created_at: now,
            updated_at: now,
            shipping_address: json!({
                "street": "123 Main St",
                "city": "Sample City",
                "country": country,
                "postal_code": "12345",
            }),
        }
    }

    pub fn transaction(&self, order: &Order) -> Transaction {
        let now = Utc::now();
        Transaction {
            transaction_id: Uuid::new_v4().to_string(),
            order_id: order.order_id.clone(),
            user_id: order.user_id.clone(),
            country: order.country.clone(),
            region: order.region.clone(),
            amount: order.total_amount,
            currency: order.currency.clone(),
            payment_method: "credit_card".to_string(),
            status: "completed".to_string(),
            created_at: now,
            processed_at: Some(now),
        }
    }

    pub fn log(&self, index: usize, user_id: &str, country: &str, region: &str) -> Log {
        Log {
            log_id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            country: country.to_string(),
            region: region.to_string(),
            action: ACTIONS[index % ACTIONS.len()].to_string(),
            resource: format!("resource_{}", index % 100),
            details: json!({ "session_id": Uuid::new_v4().to_string() }),
            ip_address: format!("192.168.1.{}", index % 255),
            user_agent: "Mozilla/5.0 (Demo Browser)".to_string(),
            created_at: Utc::now(),
        }
    }

    /// Serializes a tenant record and stamps the shard key fields on it.
    pub fn tenant_document<T: Serialize>(
        &self,
        record: &T,
        tenant_id: &str,
        zone: &str,
    ) -> Result<JsonValue> {
        let mut document = match serde_json::to_value(record)? {
            JsonValue::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("record".to_string(), other);
                map
            }
        };
        document.insert(self.shard_key.tenant_field.clone(), json!(tenant_id));
        document.insert(self.shard_key.zone_field.clone(), json!(zone));
        Ok(JsonValue::Object(document))
    }

    /// The documents of one tenant collection for one tenant.
    pub fn tenant_documents(
        &self,
        collection: &str,
        tenant_id: &str,
        zone: &str,
        count: usize,
    ) -> Result<Vec<JsonValue>> {
        (0..count)
            .map(|index| {
                let user_id = Uuid::new_v4().to_string();
                match collection {
                    "orders" => {
                        let order = self.order(&user_id, tenant_id, zone);
                        self.tenant_document(&order, tenant_id, zone)
                    }
                    "transactions" => {
                        let order = self.order(&user_id, tenant_id, zone);
                        self.tenant_document(&self.transaction(&order), tenant_id, zone)
                    }
                    "logs" => self.tenant_document(
                        &self.log(index, &user_id, tenant_id, zone),
                        tenant_id,
                        zone,
                    ),
                    _ => self.tenant_document(
                        &json!({ "user_id": user_id, "sequence": index, "created_at": Utc::now() }),
                        tenant_id,
                        zone,
                    ),
                }
            })
            .collect()
    }

    /// The documents of one common collection.
    pub fn common_documents(&self, collection: &str, regions: &[String]) -> Result<Vec<JsonValue>> {
        let documents = match collection {
            "users" => (0..COMMON_USERS)
                .map(|_| serde_json::to_value(self.user("GLOBAL", "global")))
                .collect::<std::result::Result<Vec<_>, _>>()?,
            "products" => (0..COMMON_PRODUCTS)
                .map(|i| serde_json::to_value(self.product(i, regions)))
                .collect::<std::result::Result<Vec<_>, _>>()?,
            "categories" => (0..COMMON_CATEGORIES)
                .map(|i| serde_json::to_value(self.category(i)))
                .collect::<std::result::Result<Vec<_>, _>>()?,
            _ => (0..COMMON_CATEGORIES)
                .map(|i| {
                    json!({ "name": format!("{}_{}", collection, i), "created_at": Utc::now() })
                })
                .collect(),
        };
        Ok(documents)
    }
}

/// Inserted document counts per namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulateSummary {
    pub inserted: BTreeMap<String, u64>,
}

impl PopulateSummary {
    pub fn total(&self) -> u64 {
        self.inserted.values().sum()
    }

    pub fn for_namespace(&self, namespace: &Namespace) -> u64 {
        self.inserted
            .get(&namespace.to_string())
            .copied()
            .unwrap_or(0)
    }
}

/// Writes generated data into every zone database.
#[derive(Clone)]
pub struct SamplePopulator {
    admin: ClusterAdmin,
    config: PlacementConfig,
    generator: DataGenerator,
}

impl SamplePopulator {
    pub fn new(admin: ClusterAdmin, config: PlacementConfig) -> Self {
        let generator = DataGenerator::new(config.shard_key.clone());
        Self {
            admin,
            config,
            generator,
        }
    }

    /// Records written per tenant and tenant collection of `zone`.
    pub fn per_tenant(&self, zone: &Zone) -> usize {
        if zone.tenant_ids.is_empty() {
            0
        } else {
            self.config.demo_data_size / zone.tenant_ids.len()
        }
    }

    pub async fn populate(&self) -> Result<PopulateSummary> {
        let mut summary = PopulateSummary::default();
        let zones = self.config.zones();
        let regions: Vec<String> = zones
            .iter()
            .flat_map(|z| z.tenant_ids.iter().cloned())
            .collect();

        // one common set, copied into each zone database
        let mut common = Vec::new();
        for collection in &self.config.common_collections {
            common.push((
                collection.as_str(),
                self.generator.common_documents(collection, &regions)?,
            ));
        }

        for zone in &zones {
            for (collection, documents) in &common {
                let namespace = Namespace::new(&zone.database_name, *collection);
                self.insert(&mut summary, &namespace, documents.clone()).await?;
            }

            let per_tenant = self.per_tenant(zone);
            for collection in &self.config.tenant_collections {
                let namespace = Namespace::new(&zone.database_name, collection);
                for tenant in &zone.tenant_ids {
                    let documents =
                        self.generator
                            .tenant_documents(collection, tenant, &zone.name, per_tenant)?;
                    self.insert(&mut summary, &namespace, documents).await?;
                }
            }
            info!(zone = %zone.name, per_tenant, "sample data written");
        }
        Ok(summary)
    }

    async fn insert(
        &self,
        summary: &mut PopulateSummary,
        namespace: &Namespace,
        documents: Vec<JsonValue>,
    ) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }
        let inserted = self.admin.insert_many(namespace, documents).await?;
        *summary.inserted.entry(namespace.to_string()).or_default() += inserted;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_documents_carry_shard_key_fields() {
        let generator = DataGenerator::default();
        let docs = generator.tenant_documents("orders", "CN", "region1", 3).unwrap();
        assert_eq!(docs.len(), 3);
        for doc in &docs {
            assert_eq!(doc["tenant_id"], "CN");
            assert_eq!(doc["zone_name"], "region1");
            assert_eq!(doc["country"], "CN");
            assert!(doc["order_id"].is_string());
        }
        let logs = generator.tenant_documents("logs", "TR", "region1", 2).unwrap();
        assert!(logs[0]["action"].is_string());
    }

    #[test]
    fn custom_shard_key_names_are_used() {
        let generator = DataGenerator::new(ShardKey {
            tenant_field: "country_code".into(),
            zone_field: "zone".into(),
        });
        let docs = generator.tenant_documents("transactions", "US", "region2", 1).unwrap();
        assert_eq!(docs[0]["country_code"], "US");
        assert_eq!(docs[0]["zone"], "region2");
        assert!(docs[0].get("tenant_id").is_none());
    }

    #[test]
    fn common_sets_have_fixed_sizes() {
        let generator = DataGenerator::default();
        let regions = vec!["CN".to_string()];
        assert_eq!(generator.common_documents("users", &regions).unwrap().len(), COMMON_USERS);
        assert_eq!(
            generator.common_documents("products", &regions).unwrap().len(),
            COMMON_PRODUCTS
        );
        assert_eq!(
            generator.common_documents("categories", &regions).unwrap().len(),
            COMMON_CATEGORIES
        );
    }
}
