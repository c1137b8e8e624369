//! Repository layer: one zero-sized struct per table.
//!
//! Every method takes a `&mut PgConnection` so it can run either on a pooled
//! connection or inside a transaction (`&mut *tx`).

mod snapshot_repo;
mod template_repo;

pub use snapshot_repo::SnapshotRepo;
pub use template_repo::TemplateRepo;
