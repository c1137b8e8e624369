//! In-process [`VersionStore`] backend.
//!
//! Committed state lives behind one short-lived mutex. Each unit of work
//! stages its writes privately and publishes them in one step on commit, so
//! an uncommitted or failed unit leaves no trace. Template locks are
//! per-template async mutexes held by the unit until it ends.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::OwnedMutexGuard;

use crate::error::CoreError;
use crate::snapshot::{NewSnapshot, Snapshot};
use crate::store::{TemplateRecord, UnitOfWork, VersionStore};
use crate::template::Template;
use crate::types::{DbId, Sequence};

/// Operation that can be made to fail once, for exercising rollback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FailurePoint {
    InsertSnapshot = 1,
    SaveTemplate = 2,
    Commit = 3,
}

const NO_FAILURE: u8 = 0;

#[derive(Debug, Default)]
struct Tables {
    templates: BTreeMap<DbId, Template>,
    snapshots: BTreeMap<DbId, Snapshot>,
    last_template_id: DbId,
    last_snapshot_id: DbId,
}

#[derive(Debug, Default)]
struct Shared {
    tables: Mutex<Tables>,
    locks: Mutex<HashMap<DbId, Arc<tokio::sync::Mutex<()>>>>,
    pending_failure: AtomicU8,
}

impl Shared {
    fn tables(&self) -> Result<MutexGuard<'_, Tables>, CoreError> {
        self.tables
            .lock()
            .map_err(|_| CoreError::Storage("Memory store tables poisoned".into()))
    }

    fn lock_handle(&self, id: DbId) -> Result<Arc<tokio::sync::Mutex<()>>, CoreError> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| CoreError::Storage("Memory store lock table poisoned".into()))?;
        Ok(Arc::clone(locks.entry(id).or_default()))
    }

    /// Drop the lock entries of templates that no longer exist.
    fn forget_locks(&self, ids: &[DbId]) -> Result<(), CoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| CoreError::Storage("Memory store lock table poisoned".into()))?;
        for id in ids {
            locks.remove(id);
        }
        Ok(())
    }

    #[cfg(test)]
    fn lock_entries(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or_default()
    }

    /// Consume a pending injected failure if it targets `point`.
    fn trip(&self, point: FailurePoint) -> Result<(), CoreError> {
        let tripped = self
            .pending_failure
            .compare_exchange(point as u8, NO_FAILURE, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if tripped {
            return Err(CoreError::Storage(format!("Injected failure at {point:?}")));
        }
        Ok(())
    }
}

/// Shared-handle in-memory store. Cloning yields another handle to the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next operation of the given kind fail with `CoreError::Storage`.
    pub fn inject_failure(&self, point: FailurePoint) {
        self.shared
            .pending_failure
            .store(point as u8, Ordering::Release);
    }

    /// Number of committed snapshots across all templates.
    pub fn snapshot_total(&self) -> Result<usize, CoreError> {
        Ok(self.shared.tables()?.snapshots.len())
    }
}

#[async_trait]
impl VersionStore for MemoryStore {
    type Unit = MemoryUnit;

    async fn begin(&self) -> Result<MemoryUnit, CoreError> {
        Ok(MemoryUnit {
            shared: Arc::clone(&self.shared),
            held: HashMap::new(),
            staged_templates: BTreeMap::new(),
            staged_snapshots: Vec::new(),
        })
    }
}

/// A unit of work against a [`MemoryStore`].
pub struct MemoryUnit {
    shared: Arc<Shared>,
    held: HashMap<DbId, OwnedMutexGuard<()>>,
    /// `None` marks a template deleted by this unit.
    staged_templates: BTreeMap<DbId, Option<Template>>,
    staged_snapshots: Vec<Snapshot>,
}

impl MemoryUnit {
    fn read_template(&self, id: DbId) -> Result<Option<Template>, CoreError> {
        if let Some(staged) = self.staged_templates.get(&id) {
            return Ok(staged.clone());
        }
        Ok(self.shared.tables()?.templates.get(&id).cloned())
    }

    fn deleted_here(&self, template_id: DbId) -> bool {
        matches!(self.staged_templates.get(&template_id), Some(None))
    }

    /// Committed and staged snapshots of a template, in no particular order.
    fn visible_snapshots(&self, template_id: DbId) -> Result<Vec<Snapshot>, CoreError> {
        if self.deleted_here(template_id) {
            return Ok(Vec::new());
        }
        let tables = self.shared.tables()?;
        let mut all: Vec<Snapshot> = tables
            .snapshots
            .values()
            .filter(|s| s.template_id == template_id)
            .cloned()
            .collect();
        all.extend(
            self.staged_snapshots
                .iter()
                .filter(|s| s.template_id == template_id)
                .cloned(),
        );
        Ok(all)
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnit {
    async fn find_template(&mut self, id: DbId) -> Result<Option<Template>, CoreError> {
        self.read_template(id)
    }

    async fn lock_template(&mut self, id: DbId) -> Result<Option<Template>, CoreError> {
        if !self.held.contains_key(&id) {
            let handle = self.shared.lock_handle(id)?;
            let guard = handle.lock_owned().await;
            self.held.insert(id, guard);
        }
        self.read_template(id)
    }

    async fn insert_template(&mut self, input: &TemplateRecord) -> Result<Template, CoreError> {
        let id = {
            let mut tables = self.shared.tables()?;
            tables.last_template_id += 1;
            tables.last_template_id
        };
        let template = Template {
            id,
            vault_id: input.vault_id,
            title: input.content.title.clone(),
            description: input.content.description.clone(),
            body: input.content.body.clone(),
            created_at: input.created_at,
            updated_at: input.created_at,
        };
        self.staged_templates.insert(id, Some(template.clone()));
        Ok(template)
    }

    async fn save_template(&mut self, template: &Template) -> Result<(), CoreError> {
        self.shared.trip(FailurePoint::SaveTemplate)?;
        if self.read_template(template.id)?.is_none() {
            return Err(CoreError::NotFound {
                entity: "Template",
                id: template.id,
            });
        }
        self.staged_templates
            .insert(template.id, Some(template.clone()));
        Ok(())
    }

    async fn delete_template(&mut self, id: DbId) -> Result<bool, CoreError> {
        if self.read_template(id)?.is_none() {
            return Ok(false);
        }
        self.staged_templates.insert(id, None);
        self.staged_snapshots.retain(|s| s.template_id != id);
        Ok(true)
    }

    async fn max_sequence(&mut self, template_id: DbId) -> Result<Sequence, CoreError> {
        Ok(self
            .visible_snapshots(template_id)?
            .iter()
            .map(|s| s.sequence)
            .max()
            .unwrap_or(0))
    }

    async fn insert_snapshot(&mut self, input: &NewSnapshot) -> Result<Snapshot, CoreError> {
        self.shared.trip(FailurePoint::InsertSnapshot)?;
        let taken = self
            .visible_snapshots(input.template_id)?
            .iter()
            .any(|s| s.sequence == input.sequence);
        if taken {
            return Err(CoreError::Storage(format!(
                "Sequence {} already exists for template {}",
                input.sequence, input.template_id
            )));
        }

        let id = {
            let mut tables = self.shared.tables()?;
            tables.last_snapshot_id += 1;
            tables.last_snapshot_id
        };
        let snapshot = Snapshot {
            id,
            template_id: input.template_id,
            title: input.content.title.clone(),
            description: input.content.description.clone(),
            body: input.content.body.clone(),
            sequence: input.sequence,
            origin: input.origin,
            created_at: input.created_at,
        };
        self.staged_snapshots.push(snapshot.clone());
        Ok(snapshot)
    }

    async fn list_snapshots(&mut self, template_id: DbId) -> Result<Vec<Snapshot>, CoreError> {
        let mut snapshots = self.visible_snapshots(template_id)?;
        snapshots.sort_by(|a, b| b.sequence.cmp(&a.sequence));
        Ok(snapshots)
    }

    async fn find_snapshot(
        &mut self,
        template_id: DbId,
        snapshot_id: DbId,
    ) -> Result<Option<Snapshot>, CoreError> {
        Ok(self
            .visible_snapshots(template_id)?
            .into_iter()
            .find(|s| s.id == snapshot_id))
    }

    async fn count_snapshots(&mut self, template_id: DbId) -> Result<i64, CoreError> {
        Ok(self.visible_snapshots(template_id)?.len() as i64)
    }

    async fn commit(self) -> Result<(), CoreError> {
        self.shared.trip(FailurePoint::Commit)?;

        let mut deleted = Vec::new();
        {
            let mut tables = self.shared.tables()?;
            for (id, staged) in self.staged_templates {
                match staged {
                    Some(template) => {
                        tables.templates.insert(id, template);
                    }
                    None => {
                        tables.templates.remove(&id);
                        tables.snapshots.retain(|_, s| s.template_id != id);
                        deleted.push(id);
                    }
                }
            }
            for snapshot in self.staged_snapshots {
                tables.snapshots.insert(snapshot.id, snapshot);
            }
        }
        self.shared.forget_locks(&deleted)?;
        // Template locks in `held` are released when `self` drops here.
        Ok(())
    }
}
