use anyhow::Result;
use chrono::Local;
use tracing::{debug, warn};

use crate::catalog::enrich;
use crate::models::{NewPantryEntry, PantryEntry, PantryRecord, PantryUpdate, SyncState};
use crate::normalize::{normalize, same_name};
use crate::reconcile::keep_valid;
use crate::service::PantryService;
use crate::store::LocalStore;
use crate::working::WorkingList;

impl PantryService {
    // --- Working ingredient list (local only) ---

    /// Returns `true` if the name was added.
    pub fn add_ingredient(&self, raw: &str) -> Result<bool> {
        self.write(|s| s.working_mut().add(raw))
    }

    /// Returns `true` if the name was present.
    pub fn remove_ingredient(&self, raw: &str) -> Result<bool> {
        self.write(|s| s.working_mut().remove(raw))
    }

    pub fn set_ingredients<S: AsRef<str>>(&self, raw: &[S]) -> Result<()> {
        let list = WorkingList::from_raw(raw);
        self.write(|s| *s.working_mut() = list)
    }

    pub fn clear_ingredients(&self) -> Result<()> {
        self.write(|s| s.working_mut().clear())
    }

    // --- Pantry ---

    pub async fn add_to_pantry(&self, raw: &str) -> Result<Option<PantryEntry>> {
        let added = self.add_many_to_pantry(&[raw]).await?;
        Ok(added.into_iter().next())
    }

    /// Add every name not already in the pantry (case-insensitive), then
    /// create them remotely in one batch.
    ///
    /// Returns the entries that were added, with server ids when the create
    /// call succeeded. Names colliding with an existing entry, or with an
    /// earlier name in the same batch, are dropped.
    pub async fn add_many_to_pantry<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<PantryEntry>> {
        let now = Local::now().to_rfc3339();
        let (owner, placeholders) = self.write(|s| {
            let owner = s.owner_id().map(str::to_string);
            let sync = if owner.is_some() {
                SyncState::Syncing
            } else {
                SyncState::LocalOnly
            };
            let mut added = Vec::new();
            for raw in names {
                let name = normalize(raw.as_ref());
                if name.is_empty() {
                    continue;
                }
                if s.name_taken(&name, None) {
                    debug!(name = %name, "pantry already has this ingredient");
                    continue;
                }
                let entry = PantryEntry::placeholder(name, &now, sync);
                s.pantry_mut().push(entry.clone());
                added.push(entry);
            }
            (owner, added)
        })?;

        if placeholders.is_empty() {
            return Ok(placeholders);
        }
        let Some(owner) = owner else {
            debug!(count = placeholders.len(), "no owner id, pantry entries kept local");
            return Ok(placeholders);
        };

        let payload: Vec<NewPantryEntry> =
            placeholders.iter().map(PantryEntry::to_new_entry).collect();
        match self
            .remote
            .create_pantry_entries(&owner, &payload, None)
            .await
        {
            Ok(records) => Ok(self
                .settle_created(&owner, &placeholders, records)
                .await?
                .entries),
            Err(e) => {
                warn!(owner = %owner, count = placeholders.len(), error = %format!("{e:#}"), "failed to create pantry entries remotely");
                self.write(|s| {
                    placeholders
                        .iter()
                        .filter_map(|p| {
                            let entry = s.find_mut(&p.id)?;
                            entry.sync = SyncState::LocalOnly;
                            Some(entry.clone())
                        })
                        .collect()
                })
            }
        }
    }

    /// Rename an entry, re-deriving its category and icon.
    ///
    /// Returns `false` without changing anything when the name is blank, the
    /// id is unknown, or another entry already has the name.
    pub async fn update_pantry_item(&self, id: &str, raw: &str) -> Result<bool> {
        let name = normalize(raw);
        if name.is_empty() {
            return Ok(false);
        }
        let now = Local::now().to_rfc3339();
        let staged = self.write(|s| {
            if s.name_taken(&name, Some(id)) {
                debug!(id = %id, name = %name, "rename rejected, name already in pantry");
                return None;
            }
            let owner = s.owner_id().map(str::to_string);
            let entry = s.find_mut(id)?;
            let e = enrich(&name);
            entry.name.clone_from(&name);
            entry.category.clone_from(&e.category);
            entry.icon.clone_from(&e.icon);
            entry.updated_at = now;
            let owner = owner.filter(|_| !entry.is_placeholder());
            entry.sync = if owner.is_some() {
                SyncState::Syncing
            } else {
                SyncState::LocalOnly
            };
            Some((
                owner,
                PantryUpdate {
                    name: Some(name.clone()),
                    category: Some(e.category),
                    icon: Some(e.icon),
                },
            ))
        })?;

        let Some((owner, update)) = staged else {
            return Ok(false);
        };
        let Some(owner) = owner else {
            debug!(id = %id, "rename kept local");
            return Ok(true);
        };

        match self.remote.update_pantry_entry(&owner, id, &update).await {
            Ok(record) => {
                self.write(|s| {
                    if let Some(entry) = s.find_mut(id) {
                        if !entry.absorb(record) {
                            debug!(id = %id, "entry changed again while update was in flight");
                        }
                    }
                })?;
            }
            Err(e) => {
                warn!(owner = %owner, id = %id, error = %format!("{e:#}"), "failed to update pantry entry remotely");
                self.write(|s| {
                    if let Some(entry) = s.find_mut(id) {
                        entry.sync = SyncState::LocalOnly;
                    }
                })?;
            }
        }
        Ok(true)
    }

    /// Returns `true` if an entry was removed locally.
    pub async fn remove_pantry_item(&self, id: &str) -> Result<bool> {
        let (removed, owner) = self.write(|s| {
            let owner = s.owner_id().map(str::to_string);
            let pantry = s.pantry_mut();
            let removed = pantry
                .iter()
                .position(|e| e.id == id)
                .map(|i| pantry.remove(i));
            (removed, owner)
        })?;

        let Some(entry) = removed else {
            return Ok(false);
        };
        match owner {
            Some(owner) if !entry.is_placeholder() => {
                if let Err(e) = self.remote.delete_pantry_entry(&owner, id).await {
                    warn!(owner = %owner, id = %id, error = %format!("{e:#}"), "failed to delete pantry entry remotely");
                }
            }
            _ => debug!(id = %id, "removed local-only pantry entry"),
        }
        Ok(true)
    }

    pub async fn clear_pantry(&self) -> Result<()> {
        let owner = self.write(|s| {
            s.pantry_mut().clear();
            s.owner_id().map(str::to_string)
        })?;
        let Some(owner) = owner else {
            return Ok(());
        };
        if let Err(e) = self.remote.delete_all_pantry_entries(&owner).await {
            warn!(owner = %owner, error = %format!("{e:#}"), "failed to clear remote pantry");
        }
        Ok(())
    }
}

/// A create response matched against the entries that were sent.
pub(crate) struct Settled {
    /// Sent entries still in the pantry, with server ids where a row matched.
    pub(crate) entries: Vec<PantryEntry>,
    /// How many of the sent entries received a server row.
    pub(crate) matched: usize,
}

impl PantryService {
    /// Give the entries in `sent` the ids of the rows a create call returned,
    /// then delete rows whose entry was removed while the call was in flight.
    ///
    /// Entries added or removed since `sent` was taken are left alone.
    pub(crate) async fn settle_created(
        &self,
        owner: &str,
        sent: &[PantryEntry],
        records: Vec<PantryRecord>,
    ) -> Result<Settled> {
        let records = keep_valid(owner, records);
        let (settled, orphans) = self.write(|s| resolve_placeholders(s, sent, records))?;
        for id in orphans {
            if let Err(e) = self.remote.delete_pantry_entry(owner, &id).await {
                warn!(owner = %owner, id = %id, error = %format!("{e:#}"), "failed to delete orphaned pantry row");
            }
        }
        Ok(settled)
    }
}

/// Pair created rows with the entries they were sent for.
///
/// A row pairs with the sent entry of the same name. When every sent entry
/// got a row, rows the server renamed fill the remaining entries in order.
/// Sent entries left without a row become local-only. Returns the settled
/// entries and the server ids whose entry has since been removed locally.
fn resolve_placeholders(
    store: &mut LocalStore,
    sent: &[PantryEntry],
    records: Vec<PantryRecord>,
) -> (Settled, Vec<String>) {
    let whole_batch = records.len() == sent.len();
    let mut slots: Vec<Option<PantryRecord>> = vec![None; sent.len()];
    let mut renamed = Vec::new();
    for record in records {
        let name = normalize(&record.name);
        let free = (0..sent.len())
            .find(|&i| slots[i].is_none() && same_name(&sent[i].name, &name));
        match free {
            Some(i) => slots[i] = Some(record),
            None => renamed.push(record),
        }
    }
    if whole_batch {
        let mut rest = renamed.into_iter();
        for slot in slots.iter_mut().filter(|s| s.is_none()) {
            *slot = rest.next();
        }
    } else {
        for record in &renamed {
            debug!(id = %record.id, name = %record.name, "created row matches no pending entry");
        }
    }

    let mut settled = Settled {
        entries: Vec::new(),
        matched: 0,
    };
    let mut orphans = Vec::new();
    for (pending, slot) in sent.iter().zip(slots) {
        let Some(entry) = store.find_mut(&pending.id) else {
            if let Some(record) = slot {
                orphans.push(record.id);
            }
            continue;
        };
        match slot {
            Some(record) => {
                if !entry.absorb(record) {
                    debug!(id = %entry.id, "entry renamed while create was in flight");
                }
                settled.matched += 1;
            }
            None => entry.sync = SyncState::LocalOnly,
        }
        settled.entries.push(entry.clone());
    }
    (settled, orphans)
}
