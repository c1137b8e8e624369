//! Version engine: snapshot-before-mutate, version history, and restore.
//!
//! Every change to a template's title, description or body runs inside one
//! unit of work that (1) locks the template, (2) snapshots its current state
//! under the next sequence number, and (3) writes the change. Sequence
//! numbers are `max(existing, 0) + 1`, computed while the lock is held, so
//! they stay gap-free per template under concurrent callers.

use std::collections::HashMap;

use chrono::Utc;
use serde::Serialize;

use crate::diff::{diff_lines, DiffLine, DiffSummary};
use crate::error::CoreError;
use crate::snapshot::{NewSnapshot, Snapshot, SnapshotOrigin};
use crate::store::{TemplateRecord, UnitOfWork, VersionStore};
use crate::template::{NewTemplate, Template, TemplateChanges, TemplateContent};
use crate::types::DbId;
use crate::variables::{resolve, validate, VariableValidation};

const TEMPLATE: &str = "Template";
const SNAPSHOT: &str = "Snapshot";

// ---------------------------------------------------------------------------
// Read-side response types
// ---------------------------------------------------------------------------

/// Two snapshots of one template and the positional diff between their bodies.
#[derive(Debug, Clone, Serialize)]
pub struct VersionComparison {
    pub template_id: DbId,
    pub from: Snapshot,
    pub to: Snapshot,
    pub lines: Vec<DiffLine>,
    pub summary: DiffSummary,
}

/// A template body with supplied values substituted in.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedTemplate {
    pub template_id: DbId,
    pub resolved_body: String,
    pub validation: VariableValidation,
}

// ---------------------------------------------------------------------------
// Snapshot step
// ---------------------------------------------------------------------------

/// Record `current` as the next snapshot of `template_id` inside `uow`.
///
/// Locks the template (failing with `NotFound` if it does not exist), then
/// inserts the snapshot at `max_sequence + 1`. The caller's following
/// mutation must go through the same unit so both commit together.
pub async fn snapshot<U: UnitOfWork>(
    uow: &mut U,
    template_id: DbId,
    current: &TemplateContent,
    origin: SnapshotOrigin,
) -> Result<Snapshot, CoreError> {
    uow.lock_template(template_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: TEMPLATE,
            id: template_id,
        })?;

    let sequence = uow.max_sequence(template_id).await? + 1;
    let snapshot = uow
        .insert_snapshot(&NewSnapshot {
            template_id,
            content: current.clone(),
            sequence,
            origin,
            created_at: Utc::now(),
        })
        .await?;

    tracing::debug!(
        template_id,
        snapshot_id = snapshot.id,
        sequence,
        origin = %origin,
        "Snapshot recorded"
    );
    Ok(snapshot)
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Versioned template operations over a [`VersionStore`].
#[derive(Debug, Clone)]
pub struct VersionEngine<S> {
    store: S,
}

impl<S: VersionStore> VersionEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    // ── Template mutations ───────────────────────────────────────────

    /// Create a template together with its sequence-1 snapshot.
    pub async fn create_template(&self, input: &NewTemplate) -> Result<Template, CoreError> {
        let content = input.normalize()?;

        let mut uow = self.store.begin().await?;
        let template = uow
            .insert_template(&TemplateRecord {
                vault_id: input.vault_id,
                content,
                created_at: Utc::now(),
            })
            .await?;
        let initial = snapshot(
            &mut uow,
            template.id,
            &template.content(),
            SnapshotOrigin::Created,
        )
        .await?;
        uow.commit().await?;

        tracing::info!(
            template_id = template.id,
            vault_id = template.vault_id,
            sequence = initial.sequence,
            "Template created"
        );
        Ok(template)
    }

    /// Apply a partial update, snapshotting the prior state first.
    pub async fn update_template(
        &self,
        template_id: DbId,
        changes: &TemplateChanges,
    ) -> Result<Template, CoreError> {
        let changes = changes.normalize()?;

        let mut uow = self.store.begin().await?;
        let mut template = lock_existing(&mut uow, template_id).await?;
        let before = template.content();
        let preserved = snapshot(&mut uow, template_id, &before, SnapshotOrigin::Edited).await?;

        template.replace_content(changes.apply(before), Utc::now());
        uow.save_template(&template).await?;
        uow.commit().await?;

        tracing::info!(
            template_id,
            sequence = preserved.sequence,
            "Template updated"
        );
        Ok(template)
    }

    /// Delete a template and all of its snapshots.
    pub async fn delete_template(&self, template_id: DbId) -> Result<(), CoreError> {
        let mut uow = self.store.begin().await?;
        lock_existing(&mut uow, template_id).await?;
        if !uow.delete_template(template_id).await? {
            return Err(CoreError::NotFound {
                entity: TEMPLATE,
                id: template_id,
            });
        }
        uow.commit().await?;

        tracing::info!(template_id, "Template deleted");
        Ok(())
    }

    /// Restore a template to the content of one of its snapshots.
    ///
    /// The current state is preserved as a new highest-sequence snapshot
    /// before the overwrite; no snapshot is removed. The returned template
    /// keeps its id and `created_at`.
    pub async fn restore(
        &self,
        template_id: DbId,
        snapshot_id: DbId,
    ) -> Result<Template, CoreError> {
        let mut uow = self.store.begin().await?;
        let mut template = lock_existing(&mut uow, template_id).await?;

        // Every template gets sequence 1 at creation.
        if uow.max_sequence(template_id).await? < 1 {
            tracing::warn!(template_id, "Template has no snapshots");
            return Err(CoreError::Storage(format!(
                "Template {template_id} has no snapshots; its history is inconsistent"
            )));
        }

        let target = uow
            .find_snapshot(template_id, snapshot_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: SNAPSHOT,
                id: snapshot_id,
            })?;

        let preserved = snapshot(
            &mut uow,
            template_id,
            &template.content(),
            SnapshotOrigin::Restored {
                from_sequence: target.sequence,
            },
        )
        .await?;

        template.replace_content(target.content(), Utc::now());
        uow.save_template(&template).await?;
        uow.commit().await?;

        tracing::info!(
            template_id,
            restored_from = target.sequence,
            sequence = preserved.sequence,
            "Template restored"
        );
        Ok(template)
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub async fn get_template(&self, template_id: DbId) -> Result<Template, CoreError> {
        let mut uow = self.store.begin().await?;
        let template = find_existing(&mut uow, template_id).await?;
        uow.commit().await?;
        Ok(template)
    }

    /// All snapshots of a template, newest first.
    pub async fn list_versions(&self, template_id: DbId) -> Result<Vec<Snapshot>, CoreError> {
        let mut uow = self.store.begin().await?;
        find_existing(&mut uow, template_id).await?;
        let versions = uow.list_snapshots(template_id).await?;
        uow.commit().await?;

        tracing::debug!(template_id, count = versions.len(), "Listed versions");
        Ok(versions)
    }

    /// One snapshot, only if it belongs to `template_id`.
    pub async fn get_version(
        &self,
        template_id: DbId,
        snapshot_id: DbId,
    ) -> Result<Snapshot, CoreError> {
        let mut uow = self.store.begin().await?;
        let version = find_owned_snapshot(&mut uow, template_id, snapshot_id).await?;
        uow.commit().await?;

        tracing::debug!(
            template_id,
            snapshot_id,
            sequence = version.sequence,
            "Fetched version"
        );
        Ok(version)
    }

    pub async fn version_count(&self, template_id: DbId) -> Result<i64, CoreError> {
        let mut uow = self.store.begin().await?;
        find_existing(&mut uow, template_id).await?;
        let count = uow.count_snapshots(template_id).await?;
        uow.commit().await?;
        Ok(count)
    }

    /// Diff the bodies of two snapshots of the same template.
    pub async fn compare_versions(
        &self,
        template_id: DbId,
        from_id: DbId,
        to_id: DbId,
    ) -> Result<VersionComparison, CoreError> {
        let mut uow = self.store.begin().await?;
        let from = find_owned_snapshot(&mut uow, template_id, from_id).await?;
        let to = find_owned_snapshot(&mut uow, template_id, to_id).await?;
        uow.commit().await?;

        let lines = diff_lines(&from.body, &to.body);
        let summary = DiffSummary::from_lines(&lines);
        Ok(VersionComparison {
            template_id,
            from,
            to,
            lines,
            summary,
        })
    }

    /// Substitute `values` into the template's current body.
    pub async fn render_template(
        &self,
        template_id: DbId,
        values: &HashMap<String, String>,
    ) -> Result<RenderedTemplate, CoreError> {
        let template = self.get_template(template_id).await?;
        Ok(RenderedTemplate {
            template_id,
            resolved_body: resolve(&template.body, values),
            validation: validate(&template.body, values),
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn lock_existing<U: UnitOfWork>(
    uow: &mut U,
    template_id: DbId,
) -> Result<Template, CoreError> {
    uow.lock_template(template_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: TEMPLATE,
            id: template_id,
        })
}

async fn find_existing<U: UnitOfWork>(
    uow: &mut U,
    template_id: DbId,
) -> Result<Template, CoreError> {
    uow.find_template(template_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: TEMPLATE,
            id: template_id,
        })
}

async fn find_owned_snapshot<U: UnitOfWork>(
    uow: &mut U,
    template_id: DbId,
    snapshot_id: DbId,
) -> Result<Snapshot, CoreError> {
    find_existing(uow, template_id).await?;
    uow.find_snapshot(template_id, snapshot_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: SNAPSHOT,
            id: snapshot_id,
        })
}
