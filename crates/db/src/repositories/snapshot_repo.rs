//! Repository for the `prompt_template_snapshots` table.
//!
//! Snapshots are immutable; there is no update or single-row delete.

use promptvault_core::snapshot::NewSnapshot;
use promptvault_core::types::{DbId, Sequence};
use sqlx::PgConnection;

use crate::models::snapshot::SnapshotRow;

/// Column list for prompt_template_snapshots queries.
const COLUMNS: &str = "id, template_id, title, description, body, sequence, \
    origin, restored_from, created_at";

/// Provides insert and read operations for template snapshots.
pub struct SnapshotRepo;

impl SnapshotRepo {
    /// Insert a snapshot with a caller-allocated sequence number.
    ///
    /// A duplicate `(template_id, sequence)` fails on
    /// `uq_prompt_template_snapshots_template_sequence`.
    pub async fn create(
        conn: &mut PgConnection,
        input: &NewSnapshot,
    ) -> Result<SnapshotRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO prompt_template_snapshots
                (template_id, title, description, body, sequence, origin, restored_from, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SnapshotRow>(&query)
            .bind(input.template_id)
            .bind(&input.content.title)
            .bind(&input.content.description)
            .bind(&input.content.body)
            .bind(input.sequence)
            .bind(input.origin.as_str())
            .bind(input.origin.restored_from())
            .bind(input.created_at)
            .fetch_one(conn)
            .await
    }

    /// Highest sequence for a template (0 if it has no snapshots).
    pub async fn max_sequence(
        conn: &mut PgConnection,
        template_id: DbId,
    ) -> Result<Sequence, sqlx::Error> {
        let row: (Sequence,) = sqlx::query_as(
            "SELECT COALESCE(MAX(sequence), 0) FROM prompt_template_snapshots \
             WHERE template_id = $1",
        )
        .bind(template_id)
        .fetch_one(conn)
        .await?;
        Ok(row.0)
    }

    /// List all snapshots of a template, newest first.
    pub async fn list_by_template(
        conn: &mut PgConnection,
        template_id: DbId,
    ) -> Result<Vec<SnapshotRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM prompt_template_snapshots
             WHERE template_id = $1
             ORDER BY sequence DESC"
        );
        sqlx::query_as::<_, SnapshotRow>(&query)
            .bind(template_id)
            .fetch_all(conn)
            .await
    }

    /// Find a snapshot by id, scoped to the template that owns it.
    pub async fn find_for_template(
        conn: &mut PgConnection,
        template_id: DbId,
        id: DbId,
    ) -> Result<Option<SnapshotRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM prompt_template_snapshots
             WHERE id = $1 AND template_id = $2"
        );
        sqlx::query_as::<_, SnapshotRow>(&query)
            .bind(id)
            .bind(template_id)
            .fetch_optional(conn)
            .await
    }

    /// Count the snapshots of a template.
    pub async fn count_for_template(
        conn: &mut PgConnection,
        template_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM prompt_template_snapshots WHERE template_id = $1",
        )
        .bind(template_id)
        .fetch_one(conn)
        .await?;
        Ok(row.0)
    }
}
