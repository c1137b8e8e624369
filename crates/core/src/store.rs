//! Storage seam for the version engine.
//!
//! A [`VersionStore`] hands out [`UnitOfWork`] values. Everything done through
//! one unit becomes visible together on [`UnitOfWork::commit`]; dropping a unit
//! without committing discards all of it.
//!
//! Implementations:
//! - `MemoryStore` (this crate): in-process, per-template async locks
//! - `PgVersionStore` (`promptvault-db`): PostgreSQL transactions with row locks

use async_trait::async_trait;

use crate::error::CoreError;
use crate::snapshot::{NewSnapshot, Snapshot};
use crate::template::{Template, TemplateContent};
use crate::types::{DbId, Sequence, Timestamp};

/// Input for inserting a template row.
#[derive(Debug, Clone)]
pub struct TemplateRecord {
    pub vault_id: DbId,
    pub content: TemplateContent,
    pub created_at: Timestamp,
}

/// Factory for atomic units of work.
#[async_trait]
pub trait VersionStore: Send + Sync {
    type Unit: UnitOfWork;

    /// Open a new unit of work.
    async fn begin(&self) -> Result<Self::Unit, CoreError>;
}

/// One atomic sequence of template and snapshot operations.
#[async_trait]
pub trait UnitOfWork: Send + 'static {
    // ── Template store ───────────────────────────────────────────────

    /// Read a template without taking a lock.
    async fn find_template(&mut self, id: DbId) -> Result<Option<Template>, CoreError>;

    /// Read a template and hold its lock until the unit ends.
    ///
    /// Concurrent units locking the same template are serialized here;
    /// units on different templates never wait on each other. Locking a
    /// template this unit already holds is a no-op read.
    async fn lock_template(&mut self, id: DbId) -> Result<Option<Template>, CoreError>;

    /// Insert a template, returning it with its assigned id.
    async fn insert_template(&mut self, input: &TemplateRecord) -> Result<Template, CoreError>;

    /// Persist a template's title, description, body and `updated_at`.
    async fn save_template(&mut self, template: &Template) -> Result<(), CoreError>;

    /// Delete a template and every snapshot it owns. Returns `false` if absent.
    async fn delete_template(&mut self, id: DbId) -> Result<bool, CoreError>;

    // ── Snapshot store ───────────────────────────────────────────────

    /// Highest snapshot sequence for a template, `0` if it has none.
    async fn max_sequence(&mut self, template_id: DbId) -> Result<Sequence, CoreError>;

    /// Insert a snapshot, returning it with its assigned id.
    async fn insert_snapshot(&mut self, input: &NewSnapshot) -> Result<Snapshot, CoreError>;

    /// All snapshots of a template, newest (highest sequence) first.
    async fn list_snapshots(&mut self, template_id: DbId) -> Result<Vec<Snapshot>, CoreError>;

    /// A snapshot by id, only if it belongs to `template_id`.
    async fn find_snapshot(
        &mut self,
        template_id: DbId,
        snapshot_id: DbId,
    ) -> Result<Option<Snapshot>, CoreError>;

    /// Number of snapshots a template owns.
    async fn count_snapshots(&mut self, template_id: DbId) -> Result<i64, CoreError>;

    // ── Completion ───────────────────────────────────────────────────

    /// Make every effect of this unit visible at once.
    async fn commit(self) -> Result<(), CoreError>;
}
