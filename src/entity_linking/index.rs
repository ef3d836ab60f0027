//! Known-entity index for in-memory resolution
//!
//! The `EntityIndex` answers every lookup the resolver needs without touching
//! a collaborator: exact names, aliases, tokens for span scanning, and
//! attribute tags for descriptive references ("the cloud company").
//! It is built once from a catalog (built-in or JSON supplied) and is
//! read-only afterwards.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use super::normalize::normalize_entity_text;
use crate::error::ConfigError;

/// Canonical entity identifier (a lowercase slug such as `amazon`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Derive the canonical identifier from a display name.
    pub fn from_name(name: &str) -> Self {
        let slug = normalize_entity_text(name, true).replace(' ', "-");
        EntityId(slug)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single entity in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Canonical identifier; derived from the name when absent in a catalog file
    #[serde(default)]
    pub id: Option<EntityId>,

    /// Display name (original casing)
    pub canonical_name: String,

    /// Alternative literal names ("Facebook" for Meta)
    #[serde(default)]
    pub aliases: Vec<String>,

    /// Descriptive attribute tags ("cloud", "smartphones")
    #[serde(default)]
    pub attributes: Vec<String>,
}

impl EntityRecord {
    pub fn new(canonical_name: impl Into<String>) -> Self {
        Self {
            id: None,
            canonical_name: canonical_name.into(),
            aliases: Vec::new(),
            attributes: Vec::new(),
        }
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases.extend(aliases.iter().map(|a| a.to_string()));
        self
    }

    pub fn with_attributes(mut self, attributes: &[&str]) -> Self {
        self.attributes
            .extend(attributes.iter().map(|a| a.to_string()));
        self
    }

    /// Identifier for this record (explicit or derived from the name)
    pub fn entity_id(&self) -> EntityId {
        self.id
            .clone()
            .unwrap_or_else(|| EntityId::from_name(&self.canonical_name))
    }

    pub fn has_attribute(&self, attribute: &str) -> bool {
        self.attributes.iter().any(|a| a == attribute)
    }
}

/// Catalog file shape: `{ "entities": [ ... ] }`
#[derive(Debug, Deserialize)]
struct CatalogFile {
    entities: Vec<EntityRecord>,
}

/// In-memory entity index
#[derive(Debug, Clone, Default)]
pub struct EntityIndex {
    /// All entities, in catalog order
    entities: Vec<EntityRecord>,

    /// Position of each entity in `entities`
    positions: HashMap<EntityId, usize>,

    /// Normalized canonical name → entity
    name_index: HashMap<String, EntityId>,

    /// Normalized alias → candidate entities (bounded per alias)
    alias_index: HashMap<String, SmallVec<[EntityId; 4]>>,

    /// Attribute tag → entities carrying it
    attribute_index: HashMap<String, SmallVec<[EntityId; 8]>>,

    /// Longest name/alias length in tokens (bounds span scanning)
    max_name_tokens: usize,
}

impl EntityIndex {
    /// Build an index from catalog records. Later duplicates of an id are ignored.
    pub fn new(records: Vec<EntityRecord>) -> Self {
        let mut index = Self::default();
        for mut record in records {
            let id = record.entity_id();
            if index.positions.contains_key(&id) {
                tracing::warn!(entity = %id, "Duplicate entity id in catalog, skipping");
                continue;
            }
            record.id = Some(id.clone());
            index.insert_keys(&id, &record);
            index.positions.insert(id, index.entities.len());
            index.entities.push(record);
        }
        index
    }

    fn insert_keys(&mut self, id: &EntityId, record: &EntityRecord) {
        let name_norm = normalize_entity_text(&record.canonical_name, true);
        self.track_span(&name_norm);
        self.name_index.insert(name_norm, id.clone());

        for alias in &record.aliases {
            let alias_norm = normalize_entity_text(alias, true);
            if alias_norm.is_empty() {
                continue;
            }
            self.track_span(&alias_norm);
            let ids = self.alias_index.entry(alias_norm).or_default();
            if ids.len() < 4 && !ids.contains(id) {
                ids.push(id.clone());
            }
        }

        for attribute in &record.attributes {
            let ids = self.attribute_index.entry(attribute.clone()).or_default();
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
    }

    fn track_span(&mut self, norm: &str) {
        self.max_name_tokens = self.max_name_tokens.max(norm.split_whitespace().count());
    }

    /// Parse a JSON catalog: `{ "entities": [{ "canonical_name": ..., ... }] }`
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let catalog: CatalogFile = serde_json::from_str(json)?;
        if catalog.entities.is_empty() {
            return Err(ConfigError::Catalog("catalog contains no entities".into()));
        }
        Ok(Self::new(catalog.entities))
    }

    /// Load a JSON catalog from disk
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Get entity by id
    pub fn get(&self, id: &EntityId) -> Option<&EntityRecord> {
        self.positions.get(id).map(|&pos| &self.entities[pos])
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.positions.contains_key(id)
    }

    /// Display name for an id (falls back to the id itself)
    pub fn display_name(&self, id: &EntityId) -> String {
        self.get(id)
            .map(|r| r.canonical_name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Exact lookup by normalized canonical name
    pub fn lookup_by_name(&self, name_norm: &str) -> Option<&EntityId> {
        self.name_index.get(name_norm)
    }

    /// Exact lookup by normalized alias
    pub fn lookup_by_alias(&self, alias_norm: &str) -> Option<&SmallVec<[EntityId; 4]>> {
        self.alias_index.get(alias_norm)
    }

    /// Exact lookup by canonical name first, then alias
    pub fn lookup_exact(&self, norm: &str) -> Vec<EntityId> {
        if let Some(id) = self.lookup_by_name(norm) {
            return vec![id.clone()];
        }
        self.lookup_by_alias(norm)
            .map(|ids| ids.to_vec())
            .unwrap_or_default()
    }

    /// Entities carrying an attribute tag, in catalog order
    pub fn with_attribute(&self, attribute: &str) -> Vec<EntityId> {
        self.attribute_index
            .get(attribute)
            .map(|ids| ids.to_vec())
            .unwrap_or_default()
    }

    /// Every (normalized key, entity) pair usable for fuzzy comparison
    pub fn match_keys(&self) -> impl Iterator<Item = (&str, &EntityId)> {
        self.name_index
            .iter()
            .map(|(k, id)| (k.as_str(), id))
            .chain(
                self.alias_index
                    .iter()
                    .flat_map(|(k, ids)| ids.iter().map(move |id| (k.as_str(), id))),
            )
    }

    pub fn max_name_tokens(&self) -> usize {
        self.max_name_tokens
    }

    /// The built-in catalog of well-known companies
    pub fn builtin() -> Self {
        Self::new(builtin_catalog())
    }
}

/// Well-known companies with attribute tags used by descriptive references.
fn builtin_catalog() -> Vec<EntityRecord> {
    let rows: &[(&str, &[&str], &[&str])] = &[
        ("Apple", &["Apple Inc"], &["smartphones", "computers", "consumer_electronics"]),
        ("Microsoft", &["MSFT"], &["software", "cloud", "gaming", "operating_systems"]),
        ("Google", &["Alphabet"], &["search", "advertising", "email", "maps", "cloud"]),
        ("Amazon", &["AWS", "Amazon Web Services"], &["cloud", "ecommerce", "shopping"]),
        ("Tesla", &[], &["electric_vehicles", "automotive", "energy"]),
        ("Meta", &["Facebook", "Meta Platforms"], &["social_media", "advertising"]),
        ("Netflix", &[], &["streaming", "entertainment"]),
        ("Adobe", &[], &["software", "creative_tools"]),
        ("Salesforce", &[], &["software", "crm", "cloud"]),
        ("Oracle", &[], &["software", "databases", "cloud"]),
        ("IBM", &["International Business Machines"], &["it_services", "cloud"]),
        ("Intel", &[], &["semiconductors", "processors"]),
        ("AMD", &["Advanced Micro Devices"], &["semiconductors", "processors", "gpus"]),
        ("NVIDIA", &[], &["gpus", "semiconductors", "ai_hardware"]),
        ("Qualcomm", &[], &["semiconductors", "mobile_chips"]),
        ("Cisco", &[], &["networking"]),
        ("Dell", &["Dell Technologies"], &["computers", "hardware"]),
        ("HP", &["Hewlett-Packard"], &["computers", "printers", "hardware"]),
        ("Lenovo", &[], &["computers", "hardware"]),
        ("Samsung", &["Samsung Electronics"], &["smartphones", "consumer_electronics", "semiconductors"]),
        ("Sony", &[], &["consumer_electronics", "gaming", "entertainment"]),
        ("Infosys", &[], &["it_services", "indian_it", "consulting"]),
        ("TCS", &["Tata Consultancy Services"], &["it_services", "indian_it", "consulting"]),
        ("Wipro", &[], &["it_services", "indian_it"]),
        ("HCL Technologies", &["HCL"], &["it_services", "indian_it"]),
        ("Cognizant", &[], &["it_services", "consulting"]),
        ("Accenture", &[], &["consulting", "it_services"]),
        ("Twitter", &[], &["social_media"]),
        ("Snap", &["Snapchat"], &["social_media", "messaging"]),
        ("Pinterest", &[], &["social_media"]),
        ("LinkedIn", &[], &["social_media", "professional_network"]),
        ("Uber", &[], &["ride_hailing", "delivery"]),
        ("Lyft", &[], &["ride_hailing"]),
        ("Airbnb", &[], &["travel", "hospitality"]),
        ("Spotify", &[], &["music_streaming", "streaming"]),
        ("Zoom", &["Zoom Video Communications"], &["video_conferencing", "software"]),
        ("Slack", &[], &["messaging", "software"]),
        ("Dropbox", &[], &["file_storage", "cloud"]),
        ("PayPal", &[], &["payments", "fintech"]),
        ("Stripe", &[], &["payments", "fintech"]),
        ("Shopify", &[], &["ecommerce", "software"]),
        ("eBay", &[], &["ecommerce", "marketplace"]),
        ("Walmart", &[], &["retail", "shopping"]),
        ("Costco", &[], &["retail"]),
        ("Starbucks", &[], &["coffee", "food_service"]),
        ("Nike", &[], &["sportswear", "apparel"]),
        ("Adidas", &[], &["sportswear", "apparel"]),
        ("Coca-Cola", &["Coke"], &["beverages"]),
        ("PepsiCo", &["Pepsi"], &["beverages", "snacks"]),
        ("Pfizer", &[], &["pharmaceuticals"]),
        ("Moderna", &[], &["pharmaceuticals", "biotech"]),
        ("Boeing", &[], &["aerospace"]),
        ("Airbus", &[], &["aerospace"]),
        ("Ford", &["Ford Motor Company"], &["automotive"]),
        ("General Motors", &["GM"], &["automotive"]),
        ("Toyota", &[], &["automotive"]),
        ("Rivian", &[], &["electric_vehicles", "automotive"]),
        ("SpaceX", &[], &["aerospace", "space"]),
        ("Palantir", &[], &["data_analytics", "software"]),
        ("Snowflake", &[], &["data_analytics", "cloud"]),
        ("Databricks", &[], &["data_analytics", "cloud"]),
        ("MongoDB", &[], &["databases", "software"]),
        ("Atlassian", &[], &["software", "collaboration"]),
        ("ServiceNow", &[], &["software", "cloud"]),
        ("SAP", &[], &["software", "erp"]),
        ("GitHub", &[], &["developer_tools"]),
        ("OpenAI", &[], &["ai"]),
        ("Anthropic", &[], &["ai"]),
        ("Reliance", &["Reliance Industries"], &["conglomerate", "telecom"]),
        ("Flipkart", &[], &["ecommerce", "shopping"]),
        ("Zomato", &[], &["food_delivery", "delivery"]),
        ("Swiggy", &[], &["food_delivery", "delivery"]),
        ("Paytm", &[], &["payments", "fintech"]),
    ];

    rows.iter()
        .map(|(name, aliases, attributes)| {
            EntityRecord::new(*name)
                .with_aliases(aliases)
                .with_attributes(attributes)
        })
        .collect()
}
