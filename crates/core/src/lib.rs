//! Prompt Vault versioning core.
//!
//! Pure template-variable and diff utilities plus the version engine that
//! snapshots a template before every change. Storage is reached only through
//! the traits in [`store`]; this crate has no database dependency so it can be
//! shared by the repository layer and any CLI or worker tooling.

pub mod diff;
pub mod error;
pub mod memory;
pub mod snapshot;
pub mod store;
pub mod template;
pub mod types;
pub mod variables;
pub mod versioning;
