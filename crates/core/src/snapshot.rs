//! Snapshot entity: an immutable, sequence-numbered copy of a template's content.

use serde::{Deserialize, Serialize};

use crate::template::TemplateContent;
use crate::types::{DbId, Sequence, Timestamp};

/// Why a snapshot was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SnapshotOrigin {
    /// Initial state, captured when the template was created (sequence 1).
    Created,
    /// State immediately before an update.
    Edited,
    /// State immediately before restoring the snapshot with `from_sequence`.
    Restored { from_sequence: Sequence },
}

impl SnapshotOrigin {
    /// Value stored in the `origin` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Edited => "edited",
            Self::Restored { .. } => "restored",
        }
    }

    /// The restored snapshot's sequence, for `Restored` origins.
    pub fn restored_from(&self) -> Option<Sequence> {
        match self {
            Self::Restored { from_sequence } => Some(*from_sequence),
            _ => None,
        }
    }

    /// Rebuild an origin from its stored column pair.
    ///
    /// Returns `None` for an unknown tag or a `restored` row without a
    /// source sequence.
    pub fn from_parts(origin: &str, restored_from: Option<Sequence>) -> Option<Self> {
        match (origin, restored_from) {
            ("created", None) => Some(Self::Created),
            ("edited", None) => Some(Self::Edited),
            ("restored", Some(from_sequence)) => Some(Self::Restored { from_sequence }),
            _ => None,
        }
    }
}

impl std::fmt::Display for SnapshotOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable historical copy of a template's title, description and body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: DbId,
    pub template_id: DbId,
    pub title: String,
    pub description: String,
    pub body: String,
    pub sequence: Sequence,
    pub origin: SnapshotOrigin,
    pub created_at: Timestamp,
}

impl Snapshot {
    pub fn content(&self) -> TemplateContent {
        TemplateContent {
            title: self.title.clone(),
            description: self.description.clone(),
            body: self.body.clone(),
        }
    }
}

/// Input for inserting a snapshot. The sequence is allocated by the engine.
#[derive(Debug, Clone)]
pub struct NewSnapshot {
    pub template_id: DbId,
    pub content: TemplateContent,
    pub sequence: Sequence,
    pub origin: SnapshotOrigin,
    pub created_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_parts_round_trip() {
        for origin in [
            SnapshotOrigin::Created,
            SnapshotOrigin::Edited,
            SnapshotOrigin::Restored { from_sequence: 3 },
        ] {
            assert_eq!(
                SnapshotOrigin::from_parts(origin.as_str(), origin.restored_from()),
                Some(origin)
            );
        }
    }

    #[test]
    fn inconsistent_origin_parts_rejected() {
        assert_eq!(SnapshotOrigin::from_parts("restored", None), None);
        assert_eq!(SnapshotOrigin::from_parts("edited", Some(2)), None);
        assert_eq!(SnapshotOrigin::from_parts("imported", None), None);
    }

    #[test]
    fn origin_serializes_as_tagged_variant() {
        let json = serde_json::to_value(SnapshotOrigin::Restored { from_sequence: 2 }).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "restored", "from_sequence": 2}));
    }
}
