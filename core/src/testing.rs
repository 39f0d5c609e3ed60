//! In-memory `PantryRemote` used by the engine tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use tokio::sync::Notify;

use crate::models::{GuestIdentity, NewPantryEntry, PantryRecord, PantryUpdate};
use crate::remote::PantryRemote;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    IssueIdentity,
    List(String),
    Create {
        owner: String,
        names: Vec<String>,
        key: Option<String>,
    },
    Update {
        owner: String,
        id: String,
        name: Option<String>,
    },
    Delete {
        owner: String,
        id: String,
    },
    DeleteAll(String),
}

#[derive(Default)]
struct Inner {
    rows: HashMap<String, Vec<PantryRecord>>,
    batches: HashMap<(String, String), Vec<PantryRecord>>,
    next_id: u64,
    calls: Vec<Call>,
}

type CreateHook = Box<dyn Fn(Vec<PantryRecord>) -> Vec<PantryRecord> + Send + Sync>;

#[derive(Default)]
pub(crate) struct MemoryRemote {
    inner: Mutex<Inner>,
    pub(crate) fail_identity: AtomicBool,
    pub(crate) fail_list: AtomicBool,
    pub(crate) fail_create: AtomicBool,
    pub(crate) fail_update: AtomicBool,
    pub(crate) fail_delete: AtomicBool,
    identity_gate: Mutex<Option<Arc<Notify>>>,
    create_gate: Mutex<Option<Arc<Notify>>>,
    delete_all_gate: Mutex<Option<Arc<Notify>>>,
    create_hook: Mutex<Option<CreateHook>>,
}

impl MemoryRemote {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn fail(flag: &AtomicBool, on: bool) {
        flag.store(on, Ordering::SeqCst);
    }

    /// Make the next identity request wait until the returned handle is notified.
    pub(crate) fn gate_identity(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.identity_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub(crate) fn gate_create(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.create_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub(crate) fn gate_delete_all(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.delete_all_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Rewrite what create calls return, without changing the stored rows.
    pub(crate) fn map_create_response(
        &self,
        f: impl Fn(Vec<PantryRecord>) -> Vec<PantryRecord> + Send + Sync + 'static,
    ) {
        *self.create_hook.lock().unwrap() = Some(Box::new(f));
    }

    pub(crate) fn seed(&self, owner: &str, names: &[&str]) -> Vec<PantryRecord> {
        let mut inner = self.inner.lock().unwrap();
        let mut out = Vec::new();
        for name in names {
            let rec = new_row(&mut inner, name, None, None);
            out.push(rec.clone());
            inner.rows.entry(owner.to_string()).or_default().push(rec);
        }
        out
    }

    pub(crate) fn seed_record(&self, owner: &str, record: PantryRecord) {
        let mut inner = self.inner.lock().unwrap();
        inner.rows.entry(owner.to_string()).or_default().push(record);
    }

    pub(crate) fn rows(&self, owner: &str) -> Vec<PantryRecord> {
        let inner = self.inner.lock().unwrap();
        inner.rows.get(owner).cloned().unwrap_or_default()
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub(crate) fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.inner.lock().unwrap().calls.push(call);
    }
}

fn new_row(
    inner: &mut Inner,
    name: &str,
    category: Option<String>,
    icon: Option<String>,
) -> PantryRecord {
    inner.next_id += 1;
    let now = chrono::Local::now().to_rfc3339();
    PantryRecord {
        id: format!("srv-{}", inner.next_id),
        name: name.to_string(),
        created_at: now.clone(),
        updated_at: now,
        category,
        icon,
        quantity: Some(1.0),
        unit: Some("个".to_string()),
        purchase_date: None,
        expiry_date: None,
    }
}

async fn pass(gate: &Mutex<Option<Arc<Notify>>>) {
    let gate = gate.lock().unwrap().take();
    if let Some(g) = gate {
        g.notified().await;
    }
}

#[async_trait]
impl PantryRemote for MemoryRemote {
    async fn issue_guest_identity(&self) -> Result<GuestIdentity> {
        self.record(Call::IssueIdentity);
        pass(&self.identity_gate).await;
        if self.fail_identity.load(Ordering::SeqCst) {
            bail!("identity service unavailable");
        }
        let n = {
            let mut inner = self.inner.lock().unwrap();
            inner.next_id += 1;
            inner.next_id
        };
        Ok(GuestIdentity {
            id: format!("guest-{n}"),
        })
    }

    async fn list_pantry(&self, owner_id: &str) -> Result<Vec<PantryRecord>> {
        self.record(Call::List(owner_id.to_string()));
        if self.fail_list.load(Ordering::SeqCst) {
            bail!("connection reset");
        }
        Ok(self.rows(owner_id))
    }

    async fn create_pantry_entries(
        &self,
        owner_id: &str,
        entries: &[NewPantryEntry],
        idempotency_key: Option<&str>,
    ) -> Result<Vec<PantryRecord>> {
        self.record(Call::Create {
            owner: owner_id.to_string(),
            names: entries.iter().map(|e| e.name.clone()).collect(),
            key: idempotency_key.map(str::to_string),
        });
        pass(&self.create_gate).await;
        if self.fail_create.load(Ordering::SeqCst) {
            bail!("insert failed");
        }
        let mut inner = self.inner.lock().unwrap();
        if let Some(key) = idempotency_key {
            let k = (owner_id.to_string(), key.to_string());
            if let Some(prev) = inner.batches.get(&k) {
                return Ok(prev.clone());
            }
        }
        let mut out = Vec::new();
        for e in entries {
            let rec = new_row(&mut inner, &e.name, e.category.clone(), e.icon.clone());
            out.push(rec);
        }
        inner
            .rows
            .entry(owner_id.to_string())
            .or_default()
            .extend(out.iter().cloned());
        if let Some(key) = idempotency_key {
            inner
                .batches
                .insert((owner_id.to_string(), key.to_string()), out.clone());
        }
        drop(inner);
        let hook = self.create_hook.lock().unwrap();
        Ok(match hook.as_ref() {
            Some(f) => f(out),
            None => out,
        })
    }

    async fn update_pantry_entry(
        &self,
        owner_id: &str,
        id: &str,
        update: &PantryUpdate,
    ) -> Result<PantryRecord> {
        self.record(Call::Update {
            owner: owner_id.to_string(),
            id: id.to_string(),
            name: update.name.clone(),
        });
        if self.fail_update.load(Ordering::SeqCst) {
            bail!("update failed");
        }
        let mut inner = self.inner.lock().unwrap();
        let row = inner
            .rows
            .get_mut(owner_id)
            .and_then(|rows| rows.iter_mut().find(|r| r.id == id))
            .ok_or_else(|| anyhow!("no row {id}"))?;
        if let Some(name) = &update.name {
            row.name.clone_from(name);
        }
        if update.category.is_some() {
            row.category.clone_from(&update.category);
        }
        if update.icon.is_some() {
            row.icon.clone_from(&update.icon);
        }
        row.updated_at = chrono::Local::now().to_rfc3339();
        Ok(row.clone())
    }

    async fn delete_pantry_entry(&self, owner_id: &str, id: &str) -> Result<()> {
        self.record(Call::Delete {
            owner: owner_id.to_string(),
            id: id.to_string(),
        });
        if self.fail_delete.load(Ordering::SeqCst) {
            bail!("delete failed");
        }
        let mut inner = self.inner.lock().unwrap();
        if let Some(rows) = inner.rows.get_mut(owner_id) {
            rows.retain(|r| r.id != id);
        }
        Ok(())
    }

    async fn delete_all_pantry_entries(&self, owner_id: &str) -> Result<()> {
        self.record(Call::DeleteAll(owner_id.to_string()));
        pass(&self.delete_all_gate).await;
        if self.fail_delete.load(Ordering::SeqCst) {
            bail!("delete failed");
        }
        self.inner.lock().unwrap().rows.remove(owner_id);
        Ok(())
    }
}
