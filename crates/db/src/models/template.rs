//! Template row model for the `prompt_templates` table.

use promptvault_core::template::Template;
use promptvault_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `prompt_templates` table.
#[derive(Debug, Clone, FromRow)]
pub struct TemplateRow {
    pub id: DbId,
    pub vault_id: DbId,
    pub title: String,
    pub description: String,
    pub body: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<TemplateRow> for Template {
    fn from(row: TemplateRow) -> Self {
        Template {
            id: row.id,
            vault_id: row.vault_id,
            title: row.title,
            description: row.description,
            body: row.body,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
