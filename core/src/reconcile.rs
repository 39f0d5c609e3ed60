use std::sync::atomic::Ordering;

use anyhow::Result;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::models::{NewPantryEntry, PantryEntry, PantryRecord, SyncState, validate_record};
use crate::normalize::same_name;
use crate::service::PantryService;

/// Result of the startup reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum ReconcileOutcome {
    /// No owner id; nothing was fetched.
    Skipped,
    /// The remote list could not be fetched; the local cache stays as it was.
    FetchFailed,
    /// The remote pantry replaced the local one.
    AdoptedRemote { count: usize },
    /// Local entries were uploaded to an empty remote pantry.
    Migrated { count: usize },
    /// The upload failed; local entries are kept and not re-sent this session.
    MigrationFailed,
    /// A migration was already tried this session.
    MigrationAlreadyAttempted,
    /// Neither side has entries.
    Empty,
}

impl PantryService {
    /// Resolve the local pantry against the remote one. The server wins.
    ///
    /// A non-empty remote pantry replaces the local one outright. An empty
    /// remote pantry with local entries triggers a one-shot upload (at most
    /// once per session). Echoed rows give the uploaded entries their server
    /// ids; entries added or removed during the upload are left as they are.
    /// Failures are logged and leave the local pantry usable.
    pub async fn reconcile(&self) -> Result<ReconcileOutcome> {
        let Some(owner) = self.owner_id() else {
            debug!("no owner id, skipping reconciliation");
            return Ok(ReconcileOutcome::Skipped);
        };

        let rows = match self.remote.list_pantry(&owner).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(owner = %owner, error = %format!("{e:#}"), "failed to fetch remote pantry, keeping local cache");
                return Ok(ReconcileOutcome::FetchFailed);
            }
        };
        let rows = keep_valid(&owner, rows);

        if !rows.is_empty() {
            let adopted = adopt(rows);
            let count = adopted.len();
            self.write(|s| *s.pantry_mut() = adopted)?;
            info!(owner = %owner, count, "adopted remote pantry");
            return Ok(ReconcileOutcome::AdoptedRemote { count });
        }

        let sent: Vec<PantryEntry> = self.read(|s| s.pantry().to_vec());
        if sent.is_empty() {
            return Ok(ReconcileOutcome::Empty);
        }
        if self.migration_attempted.swap(true, Ordering::SeqCst) {
            debug!(owner = %owner, "migration already attempted this session");
            return Ok(ReconcileOutcome::MigrationAlreadyAttempted);
        }

        let upload: Vec<NewPantryEntry> = sent.iter().map(PantryEntry::to_new_entry).collect();
        let key = migration_key(&owner, &upload);
        self.write(|s| set_sync(s.pantry_mut(), &sent, SyncState::Syncing))?;
        let records = match self
            .remote
            .create_pantry_entries(&owner, &upload, Some(&key))
            .await
        {
            Ok(records) => keep_valid(&owner, records),
            Err(e) => {
                warn!(owner = %owner, error = %format!("{e:#}"), "pantry migration failed, keeping local pantry");
                self.write(|s| set_sync(s.pantry_mut(), &sent, SyncState::LocalOnly))?;
                return Ok(ReconcileOutcome::MigrationFailed);
            }
        };
        if records.is_empty() {
            warn!(owner = %owner, sent = upload.len(), "migration echoed no usable rows, keeping local pantry");
            self.write(|s| set_sync(s.pantry_mut(), &sent, SyncState::LocalOnly))?;
            return Ok(ReconcileOutcome::MigrationFailed);
        }

        let settled = self.settle_created(&owner, &sent, records).await?;
        let count = settled.matched;
        info!(owner = %owner, count, "migrated local pantry to remote");
        Ok(ReconcileOutcome::Migrated { count })
    }
}

/// Drop rows the server should never have returned, logging each one.
pub(crate) fn keep_valid(owner: &str, rows: Vec<PantryRecord>) -> Vec<PantryRecord> {
    rows.into_iter()
        .filter(|r| match validate_record(r) {
            Ok(()) => true,
            Err(e) => {
                warn!(owner = %owner, error = %e, "ignoring malformed remote pantry row");
                false
            }
        })
        .collect()
}

/// Turn remote rows into local entries, keeping the first of any
/// case-insensitive name repeats.
fn adopt(records: Vec<PantryRecord>) -> Vec<PantryEntry> {
    let mut out: Vec<PantryEntry> = Vec::with_capacity(records.len());
    for record in records {
        let entry = PantryEntry::from_record(record);
        if out.iter().any(|e| same_name(&e.name, &entry.name)) {
            debug!(id = %entry.id, name = %entry.name, "dropping repeated remote pantry name");
            continue;
        }
        out.push(entry);
    }
    out
}

/// Set the sync state of the entries in `pantry` that are also in `only`.
fn set_sync(pantry: &mut [PantryEntry], only: &[PantryEntry], sync: SyncState) {
    for e in pantry.iter_mut().filter(|e| only.iter().any(|o| o.id == e.id)) {
        e.sync = sync;
    }
}

/// Idempotency key for a migration upload.
///
/// Depends only on the owner and the set of names, so a later session
/// re-uploading the same local pantry presents the same key.
#[must_use]
pub fn migration_key(owner_id: &str, entries: &[NewPantryEntry]) -> String {
    let mut names: Vec<String> = entries.iter().map(|e| e.name.to_lowercase()).collect();
    names.sort();
    let mut hasher = Sha256::new();
    hasher.update(owner_id.as_bytes());
    for name in &names {
        hasher.update(b"\n");
        hasher.update(name.as_bytes());
    }
    format!("migrate-{:x}", hasher.finalize())
}
