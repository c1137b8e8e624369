//! Repository for the `prompt_templates` table.

use promptvault_core::store::TemplateRecord;
use promptvault_core::types::{DbId, Timestamp};
use sqlx::PgConnection;

use crate::models::template::TemplateRow;

/// Column list for prompt_templates queries.
const COLUMNS: &str = "id, vault_id, title, description, body, created_at, updated_at";

/// Provides CRUD operations for templates.
pub struct TemplateRepo;

impl TemplateRepo {
    /// Insert a new template. `updated_at` starts equal to `created_at`.
    pub async fn create(
        conn: &mut PgConnection,
        input: &TemplateRecord,
    ) -> Result<TemplateRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO prompt_templates
                (vault_id, title, description, body, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TemplateRow>(&query)
            .bind(input.vault_id)
            .bind(&input.content.title)
            .bind(&input.content.description)
            .bind(&input.content.body)
            .bind(input.created_at)
            .fetch_one(conn)
            .await
    }

    /// Find a template by its primary key.
    pub async fn find_by_id(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<TemplateRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM prompt_templates WHERE id = $1");
        sqlx::query_as::<_, TemplateRow>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Find a template and lock its row until the surrounding transaction ends.
    ///
    /// Snapshot sequences must only be allocated while this lock is held.
    pub async fn find_by_id_for_update(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<TemplateRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM prompt_templates WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, TemplateRow>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Overwrite the versioned fields. Returns `true` if a row was updated.
    pub async fn update_content(
        conn: &mut PgConnection,
        id: DbId,
        title: &str,
        description: &str,
        body: &str,
        updated_at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE prompt_templates
             SET title = $2, description = $3, body = $4, updated_at = $5
             WHERE id = $1",
        )
        .bind(id)
        .bind(title)
        .bind(description)
        .bind(body)
        .bind(updated_at)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a template; its snapshots go with it via `ON DELETE CASCADE`.
    /// Returns `true` if a row was removed.
    pub async fn delete(conn: &mut PgConnection, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM prompt_templates WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
