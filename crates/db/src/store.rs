//! PostgreSQL implementation of the version engine's storage seam.
//!
//! Each unit of work is one database transaction. `lock_template` takes a
//! `FOR UPDATE` row lock, so writers of the same template serialize there
//! while writers of different templates proceed in parallel. Dropping a
//! unit without committing rolls the transaction back.

use async_trait::async_trait;
use promptvault_core::error::CoreError;
use promptvault_core::snapshot::{NewSnapshot, Snapshot};
use promptvault_core::store::{TemplateRecord, UnitOfWork, VersionStore};
use promptvault_core::template::Template;
use promptvault_core::types::{DbId, Sequence};
use sqlx::{Postgres, Transaction};

use crate::repositories::{SnapshotRepo, TemplateRepo};
use crate::DbPool;

/// Postgres error code for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// Map a sqlx error into the core's storage failure.
///
/// A unique violation on a `uq_` constraint is reported as a conflict so the
/// caller can tell it apart from I/O errors; both remain retryable.
pub fn storage_error(err: sqlx::Error) -> CoreError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            let constraint = db_err.constraint().unwrap_or("unknown");
            if constraint.starts_with("uq_") {
                tracing::warn!(constraint, "Unique constraint conflict");
                return CoreError::Storage(format!(
                    "Conflict: duplicate value violates unique constraint {constraint}"
                ));
            }
        }
    }
    tracing::error!(error = %err, "Database error");
    CoreError::Storage(err.to_string())
}

/// [`VersionStore`] backed by a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgVersionStore {
    pool: DbPool,
}

impl PgVersionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VersionStore for PgVersionStore {
    type Unit = PgUnit;

    async fn begin(&self) -> Result<PgUnit, CoreError> {
        let tx = self.pool.begin().await.map_err(storage_error)?;
        Ok(PgUnit { tx })
    }
}

/// One transaction against the template tables.
pub struct PgUnit {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnit {
    async fn find_template(&mut self, id: DbId) -> Result<Option<Template>, CoreError> {
        let row = TemplateRepo::find_by_id(&mut self.tx, id)
            .await
            .map_err(storage_error)?;
        Ok(row.map(Template::from))
    }

    async fn lock_template(&mut self, id: DbId) -> Result<Option<Template>, CoreError> {
        let row = TemplateRepo::find_by_id_for_update(&mut self.tx, id)
            .await
            .map_err(storage_error)?;
        Ok(row.map(Template::from))
    }

    async fn insert_template(&mut self, input: &TemplateRecord) -> Result<Template, CoreError> {
        let row = TemplateRepo::create(&mut self.tx, input)
            .await
            .map_err(storage_error)?;
        Ok(row.into())
    }

    async fn save_template(&mut self, template: &Template) -> Result<(), CoreError> {
        let updated = TemplateRepo::update_content(
            &mut self.tx,
            template.id,
            &template.title,
            &template.description,
            &template.body,
            template.updated_at,
        )
        .await
        .map_err(storage_error)?;
        if !updated {
            return Err(CoreError::NotFound {
                entity: "Template",
                id: template.id,
            });
        }
        Ok(())
    }

    async fn delete_template(&mut self, id: DbId) -> Result<bool, CoreError> {
        TemplateRepo::delete(&mut self.tx, id)
            .await
            .map_err(storage_error)
    }

    async fn max_sequence(&mut self, template_id: DbId) -> Result<Sequence, CoreError> {
        SnapshotRepo::max_sequence(&mut self.tx, template_id)
            .await
            .map_err(storage_error)
    }

    async fn insert_snapshot(&mut self, input: &NewSnapshot) -> Result<Snapshot, CoreError> {
        SnapshotRepo::create(&mut self.tx, input)
            .await
            .map_err(storage_error)?
            .try_into()
    }

    async fn list_snapshots(&mut self, template_id: DbId) -> Result<Vec<Snapshot>, CoreError> {
        SnapshotRepo::list_by_template(&mut self.tx, template_id)
            .await
            .map_err(storage_error)?
            .into_iter()
            .map(Snapshot::try_from)
            .collect()
    }

    async fn find_snapshot(
        &mut self,
        template_id: DbId,
        snapshot_id: DbId,
    ) -> Result<Option<Snapshot>, CoreError> {
        SnapshotRepo::find_for_template(&mut self.tx, template_id, snapshot_id)
            .await
            .map_err(storage_error)?
            .map(Snapshot::try_from)
            .transpose()
    }

    async fn count_snapshots(&mut self, template_id: DbId) -> Result<i64, CoreError> {
        SnapshotRepo::count_for_template(&mut self.tx, template_id)
            .await
            .map_err(storage_error)
    }

    async fn commit(self) -> Result<(), CoreError> {
        self.tx.commit().await.map_err(storage_error)
    }
}
