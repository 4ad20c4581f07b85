//! Persistence for applications, deployment/audit logs, port allocations,
//! backup metadata and the appliance singleton.
//!
//! A single sqlite connection guarded by a mutex, WAL mode, typed model
//! structs kept separate from the store object that persists them.

mod db;
mod errors;
pub mod models;

pub use db::Store;
pub use errors::{Result, StoreError};
