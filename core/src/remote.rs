use anyhow::Result;
use async_trait::async_trait;

use crate::models::{GuestIdentity, NewPantryEntry, PantryRecord, PantryUpdate};

/// The remote per-owner pantry store and the guest identity issuer.
///
/// The CLI implements this over HTTP with reqwest; tests use an in-memory
/// fake. Every pantry operation is scoped to an owner id. Timeouts are the
/// implementation's concern.
#[async_trait]
pub trait PantryRemote: Send + Sync {
    async fn issue_guest_identity(&self) -> Result<GuestIdentity>;

    async fn list_pantry(&self, owner_id: &str) -> Result<Vec<PantryRecord>>;

    /// Insert a batch and return the stored rows, in request order.
    ///
    /// `idempotency_key`, when given, lets the server recognise a repeated
    /// upload of the same batch.
    async fn create_pantry_entries(
        &self,
        owner_id: &str,
        entries: &[NewPantryEntry],
        idempotency_key: Option<&str>,
    ) -> Result<Vec<PantryRecord>>;

    async fn update_pantry_entry(
        &self,
        owner_id: &str,
        id: &str,
        update: &PantryUpdate,
    ) -> Result<PantryRecord>;

    async fn delete_pantry_entry(&self, owner_id: &str, id: &str) -> Result<()>;

    async fn delete_all_pantry_entries(&self, owner_id: &str) -> Result<()>;
}
