//! Template entity, content value type, and input validation.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum length for a template title in characters.
pub const MAX_TITLE_LENGTH: usize = 200;

/// Maximum length for a template description in characters.
pub const MAX_DESCRIPTION_LENGTH: usize = 1_000;

/// Maximum length for a template body in characters.
pub const MAX_BODY_LENGTH: usize = 100_000;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// The mutable, current state of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: DbId,
    /// Owning collection. Opaque to the versioning core.
    pub vault_id: DbId,
    pub title: String,
    pub description: String,
    pub body: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Template {
    /// The versioned fields of this template.
    pub fn content(&self) -> TemplateContent {
        TemplateContent {
            title: self.title.clone(),
            description: self.description.clone(),
            body: self.body.clone(),
        }
    }

    /// Overwrite the versioned fields and move the modification time.
    /// Identity and `created_at` are left alone.
    pub fn replace_content(&mut self, content: TemplateContent, now: Timestamp) {
        self.title = content.title;
        self.description = content.description;
        self.body = content.body;
        self.updated_at = now;
    }
}

/// The three fields captured by every snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateContent {
    pub title: String,
    pub description: String,
    pub body: String,
}

// ---------------------------------------------------------------------------
// Create / update DTOs
// ---------------------------------------------------------------------------

/// Input for creating a template.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTemplate {
    pub vault_id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub body: String,
}

impl NewTemplate {
    /// Validate and normalize into the content to store.
    ///
    /// Title and description are trimmed; the body is stored verbatim.
    pub fn normalize(&self) -> Result<TemplateContent, CoreError> {
        let title = self.title.trim().to_string();
        validate_title(&title)?;

        let description = self
            .description
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        validate_description(&description)?;

        if self.body.is_empty() {
            return Err(CoreError::Validation("Body must not be empty".into()));
        }
        validate_body(&self.body)?;

        Ok(TemplateContent {
            title,
            description,
            body: self.body.clone(),
        })
    }
}

/// Partial update of a template's versioned fields. `None` leaves a field as is.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub body: Option<String>,
}

impl TemplateChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.body.is_none()
    }

    /// Validate and normalize the change set.
    ///
    /// Rejects an empty change set: with nothing to change there is nothing
    /// to snapshot.
    pub fn normalize(&self) -> Result<TemplateChanges, CoreError> {
        if self.is_empty() {
            return Err(CoreError::Validation(
                "At least one of title, description or body must be provided".into(),
            ));
        }

        let title = match self.title.as_deref() {
            Some(t) => {
                let t = t.trim();
                validate_title(t)?;
                Some(t.to_string())
            }
            None => None,
        };

        let description = match self.description.as_deref() {
            Some(d) => {
                let d = d.trim();
                validate_description(d)?;
                Some(d.to_string())
            }
            None => None,
        };

        if let Some(ref b) = self.body {
            validate_body(b)?;
        }

        Ok(TemplateChanges {
            title,
            description,
            body: self.body.clone(),
        })
    }

    /// Apply the change set on top of existing content.
    pub fn apply(self, mut content: TemplateContent) -> TemplateContent {
        if let Some(title) = self.title {
            content.title = title;
        }
        if let Some(description) = self.description {
            content.description = description;
        }
        if let Some(body) = self.body {
            content.body = body;
        }
        content
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a template title (non-empty after trimming, within length limit).
pub fn validate_title(title: &str) -> Result<(), CoreError> {
    if title.trim().is_empty() {
        return Err(CoreError::Validation("Title must not be empty".into()));
    }
    let len = title.chars().count();
    if len > MAX_TITLE_LENGTH {
        return Err(CoreError::Validation(format!(
            "Title exceeds maximum length of {MAX_TITLE_LENGTH} characters (got {len})"
        )));
    }
    Ok(())
}

/// Validate a template description: length check only (can be empty).
pub fn validate_description(description: &str) -> Result<(), CoreError> {
    let len = description.chars().count();
    if len > MAX_DESCRIPTION_LENGTH {
        return Err(CoreError::Validation(format!(
            "Description exceeds maximum length of {MAX_DESCRIPTION_LENGTH} characters (got {len})"
        )));
    }
    Ok(())
}

/// Validate a template body: length check only.
pub fn validate_body(body: &str) -> Result<(), CoreError> {
    let len = body.chars().count();
    if len > MAX_BODY_LENGTH {
        return Err(CoreError::Validation(format!(
            "Body exceeds maximum length of {MAX_BODY_LENGTH} characters (got {len})"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
