use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::enrich;
use crate::normalize::normalize;

/// Prefix of ids minted locally before the remote store has confirmed an entry.
pub const PLACEHOLDER_PREFIX: &str = "local-";

/// Current layout of the persisted local record.
pub const STATE_VERSION: i64 = 2;

/// Where an entry stands relative to the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncState {
    /// Only known locally: no owner id, a failed call, or a change the
    /// server has not acknowledged.
    #[default]
    LocalOnly,
    /// A remote call for this entry is in flight.
    Syncing,
    /// Matches what the server last returned.
    Synced,
}

impl SyncState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SyncState::LocalOnly => "local-only",
            SyncState::Syncing => "syncing",
            SyncState::Synced => "synced",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PantryEntry {
    pub id: String,
    pub name: String,
    pub category: String,
    pub icon: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub quantity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub purchase_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub expiry_date: Option<String>,
    #[serde(default)]
    pub sync: SyncState,
}

impl PantryEntry {
    /// A locally minted entry awaiting a server id. `name` must already be canonical.
    #[must_use]
    pub fn placeholder(name: String, now: &str, sync: SyncState) -> Self {
        let e = enrich(&name);
        Self {
            id: format!("{PLACEHOLDER_PREFIX}{}", Uuid::new_v4()),
            name,
            category: e.category,
            icon: e.icon,
            created_at: now.to_string(),
            updated_at: now.to_string(),
            quantity: None,
            unit: None,
            purchase_date: None,
            expiry_date: None,
            sync,
        }
    }

    /// Adopt a server row as a synced local entry, filling display metadata the
    /// server did not store.
    #[must_use]
    pub fn from_record(record: PantryRecord) -> Self {
        let name = normalize(&record.name);
        let e = enrich(&name);
        Self {
            id: record.id,
            category: non_empty(record.category).unwrap_or(e.category),
            icon: non_empty(record.icon).unwrap_or(e.icon),
            name,
            created_at: record.created_at,
            updated_at: record.updated_at,
            quantity: record.quantity,
            unit: record.unit,
            purchase_date: record.purchase_date,
            expiry_date: record.expiry_date,
            sync: SyncState::Synced,
        }
    }

    /// Take the server's identity and bookkeeping fields for this entry.
    ///
    /// The local name is kept; returns `false` when the server's name differs
    /// from it, meaning the entry was edited while the call was in flight.
    pub fn absorb(&mut self, record: PantryRecord) -> bool {
        let agrees = normalize(&record.name) == self.name;
        self.id = record.id;
        if agrees {
            if let Some(category) = non_empty(record.category) {
                self.category = category;
            }
            if let Some(icon) = non_empty(record.icon) {
                self.icon = icon;
            }
        }
        if !record.created_at.is_empty() {
            self.created_at = record.created_at;
        }
        if !record.updated_at.is_empty() {
            self.updated_at = record.updated_at;
        }
        self.quantity = record.quantity.or(self.quantity);
        self.unit = record.unit.or(self.unit.take());
        self.purchase_date = record.purchase_date.or(self.purchase_date.take());
        self.expiry_date = record.expiry_date.or(self.expiry_date.take());
        self.sync = if agrees {
            SyncState::Synced
        } else {
            SyncState::LocalOnly
        };
        agrees
    }

    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        is_placeholder_id(&self.id)
    }

    #[must_use]
    pub fn to_new_entry(&self) -> NewPantryEntry {
        NewPantryEntry {
            name: self.name.clone(),
            category: Some(self.category.clone()),
            icon: Some(self.icon.clone()),
        }
    }
}

#[must_use]
pub fn is_placeholder_id(id: &str) -> bool {
    id.starts_with(PLACEHOLDER_PREFIX)
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}

/// A pantry row as returned by the remote store. Extra columns are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PantryRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub quantity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub purchase_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub expiry_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPantryEntry {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PantryUpdate {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestIdentity {
    pub id: String,
}

/// The single named record persisted by the local store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    pub version: i64,
    pub ingredients: Vec<String>,
    pub pantry: Vec<PantryEntry>,
    pub owner_id: Option<String>,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            ingredients: Vec::new(),
            pantry: Vec::new(),
            owner_id: None,
        }
    }
}

/// Validate a remote row before adopting it: id and name must not be empty.
pub fn validate_record(record: &PantryRecord) -> Result<()> {
    if record.id.trim().is_empty() {
        bail!("Pantry record id must not be empty");
    }
    if normalize(&record.name).is_empty() {
        bail!("Pantry record '{}' has an empty name", record.id);
    }
    Ok(())
}
