//! Persistence collaborators

pub mod snapshot_db;

pub use snapshot_db::SnapshotDb;
