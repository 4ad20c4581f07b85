//! Backup metadata collaborator. Backup *execution* is out of scope;
//! this module only records and queries metadata so the Lifecycle
//! Manager can answer "does this application have backups" when making
//! retention decisions.

mod errors;

pub use errors::{BackupError, Result};

use std::sync::Arc;

use crate::store::models::{Backup, BackupMode, BackupStatus};
use crate::store::Store;

pub struct BackupRegistry {
    store: Arc<Store>,
}

impl BackupRegistry {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn record(
        &self,
        id: String,
        application_id: &str,
        size_bytes: u64,
        mode: BackupMode,
        compression: &str,
    ) -> Result<Backup> {
        let backup = Backup {
            id,
            application_id: application_id.to_string(),
            size_bytes,
            created_at: chrono::Utc::now(),
            status: BackupStatus::Complete,
            mode,
            compression: compression.to_string(),
        };
        self.store.insert_backup(&backup)?;
        Ok(backup)
    }

    pub fn has_backups(&self, application_id: &str) -> Result<bool> {
        Ok(!self.store.list_backups_for_application(application_id)?.is_empty())
    }

    pub fn list_for_application(&self, application_id: &str) -> Result<Vec<Backup>> {
        Ok(self.store.list_backups_for_application(application_id)?)
    }
}
