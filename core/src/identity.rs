use anyhow::Result;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::service::PantryService;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    #[default]
    NotTried,
    Failed,
}

/// Serializes guest identity issuance: one request in flight at a time, and
/// after a failure no further requests for the rest of the session.
#[derive(Default)]
pub(crate) struct IdentityGate {
    attempt: Mutex<Attempt>,
}

impl IdentityGate {
    pub(crate) async fn forget(&self) {
        *self.attempt.lock().await = Attempt::NotTried;
    }
}

impl PantryService {
    /// Return the persisted owner id, requesting a guest identity if there is none.
    ///
    /// `Ok(None)` means the session runs local-only: the issuer failed (now or
    /// earlier in this session) and remote operations are skipped.
    pub async fn ensure_identity(&self) -> Result<Option<String>> {
        if let Some(id) = self.owner_id() {
            return Ok(Some(id));
        }

        let mut attempt = self.identity.attempt.lock().await;
        // Another caller may have finished issuing while we waited.
        if let Some(id) = self.owner_id() {
            return Ok(Some(id));
        }
        if *attempt == Attempt::Failed {
            debug!("guest identity unavailable this session, staying local-only");
            return Ok(None);
        }

        let issued = match self.remote.issue_guest_identity().await {
            Ok(guest) => {
                let id = guest.id.trim().to_string();
                if id.is_empty() {
                    warn!("identity service returned an empty owner id");
                    None
                } else {
                    Some(id)
                }
            }
            Err(e) => {
                warn!(error = %format!("{e:#}"), "guest identity request failed, continuing local-only");
                None
            }
        };

        let Some(id) = issued else {
            *attempt = Attempt::Failed;
            return Ok(None);
        };
        self.write(|s| s.set_owner_id(id.clone()))?;
        info!(owner = %id, "issued guest identity");
        Ok(Some(id))
    }
}
