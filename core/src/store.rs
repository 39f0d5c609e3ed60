use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::Local;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Deserialize;
use tracing::debug;

use crate::catalog::enrich;
use crate::models::{
    PLACEHOLDER_PREFIX, PantryEntry, PersistedState, STATE_VERSION, SyncState, is_placeholder_id,
};
use crate::normalize::{normalize, same_name};
use crate::working::WorkingList;

/// Name of the single record holding pantry, working list and owner id.
pub const RECORD_NAME: &str = "pantry-storage";

/// In-memory pantry state backed by one named record in a SQLite file.
///
/// Mutators only touch memory; callers persist with [`LocalStore::save`].
pub struct LocalStore {
    conn: Connection,
    working: WorkingList,
    pantry: Vec<PantryEntry>,
    owner_id: Option<String>,
}

impl LocalStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open local store: {}", path.display()))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        migrate(&conn)?;
        let state = load(&conn)?.unwrap_or_default();
        Ok(Self {
            conn,
            working: WorkingList::from_raw(&state.ingredients),
            pantry: state.pantry,
            owner_id: state.owner_id,
        })
    }

    pub fn save(&self) -> Result<()> {
        let payload = serde_json::to_string(&self.snapshot())
            .context("Failed to encode pantry state")?;
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO local_records (name, version, payload, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(name) DO UPDATE SET version = excluded.version,
                 payload = excluded.payload, updated_at = excluded.updated_at",
            params![RECORD_NAME, STATE_VERSION, payload, now],
        )?;
        Ok(())
    }

    /// Drop everything, including the owner id.
    pub fn reset(&mut self) -> Result<()> {
        self.conn.execute(
            "DELETE FROM local_records WHERE name = ?1",
            params![RECORD_NAME],
        )?;
        self.working.clear();
        self.pantry.clear();
        self.owner_id = None;
        Ok(())
    }

    #[must_use]
    pub fn snapshot(&self) -> PersistedState {
        PersistedState {
            version: STATE_VERSION,
            ingredients: self.working.as_slice().to_vec(),
            pantry: self.pantry.clone(),
            owner_id: self.owner_id.clone(),
        }
    }

    #[must_use]
    pub fn working(&self) -> &WorkingList {
        &self.working
    }

    pub fn working_mut(&mut self) -> &mut WorkingList {
        &mut self.working
    }

    #[must_use]
    pub fn pantry(&self) -> &[PantryEntry] {
        &self.pantry
    }

    pub fn pantry_mut(&mut self) -> &mut Vec<PantryEntry> {
        &mut self.pantry
    }

    #[must_use]
    pub fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }

    pub fn set_owner_id(&mut self, id: String) {
        self.owner_id = Some(id);
    }

    #[must_use]
    pub fn find(&self, id: &str) -> Option<&PantryEntry> {
        self.pantry.iter().find(|e| e.id == id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut PantryEntry> {
        self.pantry.iter_mut().find(|e| e.id == id)
    }

    /// Whether an entry other than `except_id` already carries this name.
    #[must_use]
    pub fn name_taken(&self, name: &str, except_id: Option<&str>) -> bool {
        self.pantry
            .iter()
            .any(|e| Some(e.id.as_str()) != except_id && same_name(&e.name, name))
    }
}

fn migrate(conn: &Connection) -> Result<()> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if version < 1 {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS local_records (
                name TEXT PRIMARY KEY NOT NULL,
                version INTEGER NOT NULL,
                payload TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            PRAGMA user_version = 1;",
        )?;
    }

    Ok(())
}

fn load(conn: &Connection) -> Result<Option<PersistedState>> {
    let row: Option<(i64, String)> = conn
        .query_row(
            "SELECT version, payload FROM local_records WHERE name = ?1",
            params![RECORD_NAME],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let Some((column_version, payload)) = row else {
        return Ok(None);
    };
    let now = Local::now().to_rfc3339();
    decode_state(&payload, column_version, &now).map(Some)
}

// Lenient mirrors of `PersistedState` that accept every layout written so far.

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredState {
    #[serde(default)]
    version: Option<i64>,
    #[serde(default)]
    ingredients: Vec<String>,
    #[serde(default)]
    pantry: Vec<StoredEntry>,
    #[serde(default, alias = "owner_id")]
    owner_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredEntry {
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    icon: Option<String>,
    #[serde(default, alias = "created_at")]
    created_at: Option<String>,
    #[serde(default, alias = "updated_at")]
    updated_at: Option<String>,
    #[serde(default)]
    quantity: Option<f64>,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default, alias = "purchase_date")]
    purchase_date: Option<String>,
    #[serde(default, alias = "expiry_date")]
    expiry_date: Option<String>,
    #[serde(default)]
    sync: Option<SyncState>,
}

/// Decode a persisted payload of any known layout into the current one.
///
/// `fallback_version` applies when the payload predates the embedded
/// `version` field. Missing display fields are re-derived, missing
/// timestamps become `now`, names are re-normalized and repeats dropped.
pub fn decode_state(payload: &str, fallback_version: i64, now: &str) -> Result<PersistedState> {
    let stored: StoredState =
        serde_json::from_str(payload).context("Failed to decode persisted pantry state")?;
    let version = stored.version.unwrap_or(fallback_version);
    if version > STATE_VERSION {
        bail!(
            "Persisted pantry state has version {version}, newer than supported version {STATE_VERSION}"
        );
    }
    if version < STATE_VERSION {
        debug!(from = version, to = STATE_VERSION, "upgrading persisted pantry state");
    }

    let mut pantry: Vec<PantryEntry> = Vec::with_capacity(stored.pantry.len());
    for entry in stored.pantry {
        let name = normalize(&entry.name);
        if name.is_empty() || pantry.iter().any(|e| same_name(&e.name, &name)) {
            debug!(name = %entry.name, "dropping blank or repeated pantry entry on load");
            continue;
        }
        let id = entry
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| format!("{PLACEHOLDER_PREFIX}{}", uuid::Uuid::new_v4()));
        let derived = enrich(&name);
        let sync = match entry.sync {
            // A call that was in flight when the last session ended never resolved.
            Some(SyncState::Syncing) => SyncState::LocalOnly,
            Some(s) => s,
            None if is_placeholder_id(&id) => SyncState::LocalOnly,
            None => SyncState::Synced,
        };
        let created_at = entry.created_at.unwrap_or_else(|| now.to_string());
        pantry.push(PantryEntry {
            id,
            category: entry
                .category
                .filter(|c| !c.trim().is_empty())
                .unwrap_or(derived.category),
            icon: entry
                .icon
                .filter(|i| !i.trim().is_empty())
                .unwrap_or(derived.icon),
            name,
            updated_at: entry.updated_at.unwrap_or_else(|| created_at.clone()),
            created_at,
            quantity: entry.quantity,
            unit: entry.unit,
            purchase_date: entry.purchase_date,
            expiry_date: entry.expiry_date,
            sync,
        });
    }

    Ok(PersistedState {
        version: STATE_VERSION,
        ingredients: WorkingList::from_raw(&stored.ingredients)
            .as_slice()
            .to_vec(),
        pantry,
        owner_id: stored
            .owner_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty()),
    })
}
