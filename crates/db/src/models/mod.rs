//! Database row structs.
//!
//! Each submodule contains a `FromRow` struct matching the table row and its
//! conversion into the corresponding `promptvault_core` entity.

pub mod snapshot;
pub mod template;
