//! Access to the appliance singleton record.
//!
//! Threaded explicitly through `Arc<ApplianceHandle>` rather than a
//! module-level singleton, so tests can run multiple independent
//! appliances side by side.

use std::sync::Arc;

use tokio::sync::{OnceCell, RwLock};

use crate::store::models::ApplianceInfo;
use crate::store::Store;

use super::errors::{ApplianceError, Result};

/// Caches the current `ApplianceInfo`, refreshing from the store lazily
/// and on demand after a bootstrap or reconfiguration run.
pub struct ApplianceHandle {
    store: Arc<Store>,
    cached: OnceCell<RwLock<ApplianceInfo>>,
}

impl ApplianceHandle {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store, cached: OnceCell::new() }
    }

    /// Returns the current info, loading it from the store on first use.
    pub async fn get(&self) -> Result<ApplianceInfo> {
        let lock = self
            .cached
            .get_or_try_init(|| async {
                let info = self
                    .store
                    .load_appliance_info()?
                    .ok_or(ApplianceError::NotInitialized)?;
                Ok::<_, ApplianceError>(RwLock::new(info))
            })
            .await?;
        Ok(lock.read().await.clone())
    }

    /// Replaces the cached info after a fresh bootstrap run and persists it.
    pub async fn publish(&self, info: ApplianceInfo) -> Result<()> {
        self.store.save_appliance_info(&info)?;
        match self.cached.get() {
            Some(lock) => *lock.write().await = info,
            None => {
                let _ = self.cached.set(RwLock::new(info));
            }
        }
        Ok(())
    }

    /// Forces the next `get()` to re-read from the store.
    pub fn invalidate(&mut self) {
        self.cached = OnceCell::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::ApplianceInfo;

    fn sample_info() -> ApplianceInfo {
        ApplianceInfo {
            container_id: 100,
            wan_ip: None,
            lan_ip: "10.20.0.1".into(),
            bridge_name: "proximity-lan".into(),
            subnet: "10.20.0.0/24".into(),
            dhcp_range_start: "10.20.0.100".into(),
            dhcp_range_end: "10.20.0.250".into(),
            dns_domain: "prox.local".into(),
            dhcp_healthy: true,
            dns_healthy: true,
            nat_healthy: true,
            proxy_healthy: true,
        }
    }

    #[tokio::test]
    async fn get_fails_before_any_publish() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let handle = ApplianceHandle::new(store);
        assert!(matches!(handle.get().await, Err(ApplianceError::NotInitialized)));
    }

    #[tokio::test]
    async fn publish_then_get_roundtrips() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let handle = ApplianceHandle::new(store);
        handle.publish(sample_info()).await.unwrap();
        let info = handle.get().await.unwrap();
        assert_eq!(info.container_id, 100);
        assert!(info.proxy_healthy);
    }
}
