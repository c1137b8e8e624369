use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// The unit of work could not commit, or stored data violates an
    /// invariant. Nothing from the failed call is visible afterwards.
    #[error("Storage failure: {0}")]
    Storage(String),
}

impl CoreError {
    /// Whether the caller may retry the operation unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_entity_and_id() {
        let err = CoreError::NotFound {
            entity: "Snapshot",
            id: 42,
        };
        assert_eq!(err.to_string(), "Entity not found: Snapshot with id 42");
    }

    #[test]
    fn only_storage_failures_are_retryable() {
        assert!(CoreError::Storage("deadlock detected".into()).is_retryable());
        assert!(!CoreError::Validation("empty title".into()).is_retryable());
        assert!(!CoreError::NotFound {
            entity: "Template",
            id: 1
        }
        .is_retryable());
    }
}
