//! Snapshot row model for the `prompt_template_snapshots` table.
//!
//! Snapshots are immutable; rows are only ever inserted or cascade-deleted.

use promptvault_core::error::CoreError;
use promptvault_core::snapshot::{Snapshot, SnapshotOrigin};
use promptvault_core::types::{DbId, Sequence, Timestamp};
use sqlx::FromRow;

/// A row from the `prompt_template_snapshots` table.
#[derive(Debug, Clone, FromRow)]
pub struct SnapshotRow {
    pub id: DbId,
    pub template_id: DbId,
    pub title: String,
    pub description: String,
    pub body: String,
    pub sequence: Sequence,
    pub origin: String,
    pub restored_from: Option<Sequence>,
    pub created_at: Timestamp,
}

impl TryFrom<SnapshotRow> for Snapshot {
    type Error = CoreError;

    fn try_from(row: SnapshotRow) -> Result<Self, Self::Error> {
        let origin = SnapshotOrigin::from_parts(&row.origin, row.restored_from).ok_or_else(|| {
            CoreError::Storage(format!(
                "Snapshot {} has invalid origin '{}' (restored_from: {:?})",
                row.id, row.origin, row.restored_from
            ))
        })?;

        Ok(Snapshot {
            id: row.id,
            template_id: row.template_id,
            title: row.title,
            description: row.description,
            body: row.body,
            sequence: row.sequence,
            origin,
            created_at: row.created_at,
        })
    }
}
