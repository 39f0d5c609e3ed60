use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use serde::Serialize;

use crate::identity::IdentityGate;
use crate::models::PantryEntry;
use crate::reconcile::ReconcileOutcome;
use crate::remote::PantryRemote;
use crate::store::LocalStore;

/// The pantry state container handed to every consumer.
///
/// Owns the local store, the remote handle and the per-session flags.
/// Reads return clones; all writes go through the mutation pipeline and the
/// reconciler. The store lock is never held across an `.await`, so a remote
/// call in flight never blocks local reads or other optimistic updates.
pub struct PantryService {
    store: Mutex<LocalStore>,
    pub(crate) remote: Arc<dyn PantryRemote>,
    pub(crate) identity: IdentityGate,
    pub(crate) migration_attempted: AtomicBool,
}

/// What `init` did: which owner the session runs as and how startup
/// reconciliation went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub owner_id: Option<String>,
    pub outcome: ReconcileOutcome,
}

impl PantryService {
    pub fn new(store: LocalStore, remote: Arc<dyn PantryRemote>) -> Self {
        Self {
            store: Mutex::new(store),
            remote,
            identity: IdentityGate::default(),
            migration_attempted: AtomicBool::new(false),
        }
    }

    pub fn open(db_path: &Path, remote: Arc<dyn PantryRemote>) -> Result<Self> {
        Ok(Self::new(LocalStore::open(db_path)?, remote))
    }

    pub fn open_in_memory(remote: Arc<dyn PantryRemote>) -> Result<Self> {
        Ok(Self::new(LocalStore::open_in_memory()?, remote))
    }

    /// Startup: establish an owner id, then reconcile with the remote pantry.
    pub async fn init(&self) -> Result<SyncReport> {
        let owner_id = self.ensure_identity().await?;
        let outcome = self.reconcile().await?;
        Ok(SyncReport { owner_id, outcome })
    }

    // --- Read-only views ---

    #[must_use]
    pub fn pantry(&self) -> Vec<PantryEntry> {
        self.read(|s| s.pantry().to_vec())
    }

    #[must_use]
    pub fn ingredients(&self) -> Vec<String> {
        self.read(|s| s.working().as_slice().to_vec())
    }

    #[must_use]
    pub fn owner_id(&self) -> Option<String> {
        self.read(|s| s.owner_id().map(str::to_string))
    }

    #[must_use]
    pub fn pantry_item(&self, id: &str) -> Option<PantryEntry> {
        self.read(|s| s.find(id).cloned())
    }

    /// Forget all local data, including the owner id. Remote rows are untouched.
    pub async fn reset(&self) -> Result<()> {
        self.identity.forget().await;
        self.migration_attempted
            .store(false, std::sync::atomic::Ordering::SeqCst);
        let mut store = self.lock();
        store.reset()
    }

    // --- Store access ---

    fn lock(&self) -> MutexGuard<'_, LocalStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&LocalStore) -> R) -> R {
        f(&self.lock())
    }

    /// One read-modify-write step: apply `f`, then persist.
    pub(crate) fn write<R>(&self, f: impl FnOnce(&mut LocalStore) -> R) -> Result<R> {
        let mut store = self.lock();
        let out = f(&mut store);
        store.save()?;
        Ok(out)
    }
}
