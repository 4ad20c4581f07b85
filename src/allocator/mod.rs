//! Resource Allocator (C3): container ids, public ports, and DHCP leases
//! with global uniqueness.
//!
//! Container-id and port allocation share a single in-process lock so
//! the scan-then-reserve sequence never races with itself.

mod container_id;
mod dhcp;
mod errors;
mod port;

pub use errors::{AllocatorError, Result};

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex as AsyncMutex;
use tokio::time::Instant;

use crate::config::Configuration;
use crate::executor::{Command, SshPool, Target};
use crate::hypervisor::HypervisorClient;
use crate::store::Store;

const MAX_ALLOCATION_RETRIES: u32 = 3;
const DHCP_LEASES_PATH: &str = "/var/lib/misc/dnsmasq.leases";
const DHCP_POLL_INTERVAL: Duration = Duration::from_secs(1);

pub struct Allocator {
    store: Arc<Store>,
    hypervisor: Arc<HypervisorClient>,
    ssh: Arc<SshPool>,
    container_id_range: (u32, u32),
    port_range: (u16, u16),
    lock: AsyncMutex<()>,
}

impl Allocator {
    pub fn new(config: &Configuration, store: Arc<Store>, hypervisor: Arc<HypervisorClient>, ssh: Arc<SshPool>) -> Self {
        Self {
            store,
            hypervisor,
            ssh,
            container_id_range: config.allocation.container_id_range,
            port_range: config.allocation.public_port_range,
            lock: AsyncMutex::new(()),
        }
    }

    /// Validates that the configured ranges don't shrink below existing
    /// allocations' high-water mark. Refuses to start rather than risk
    /// reassigning an id or port still in use.
    pub fn validate_ranges_against_existing(&self) -> Result<()> {
        if let Some(max_container_id) = self.store.max_allocated_container_id()? {
            if (max_container_id as u32) >= self.container_id_range.1 {
                return Err(AllocatorError::Other(format!(
                    "container_id_range upper bound {} is below the existing high-water mark {}",
                    self.container_id_range.1, max_container_id
                )));
            }
        }
        if let Some(max_port) = self.store.max_allocated_port()? {
            if max_port >= self.port_range.1 {
                return Err(AllocatorError::Other(format!(
                    "public_port_range upper bound {} is below the existing high-water mark {}",
                    self.port_range.1, max_port
                )));
            }
        }
        Ok(())
    }

    /// Consults the hypervisor's live container list plus the store's own
    /// active applications to avoid a race between "next id" and
    /// `create_lxc`. Retries internally on conflict before surfacing
    /// `AllocationConflict`.
    pub async fn allocate_container_id(&self, node: &str) -> Result<i64> {
        for _ in 0..MAX_ALLOCATION_RETRIES {
            let _guard = self.lock.lock().await;

            let mut used: HashSet<i64> = self
                .store
                .list_applications()?
                .into_iter()
                .filter_map(|app| app.container_id)
                .collect();

            // cross-check the hypervisor's own idea of "next free id" so an
            // id created by an external actor between polls isn't reused
            if let Ok(next_hint) = self.hypervisor.next_container_id().await {
                used.insert(next_hint - 1);
            }

            match container_id::next_free_container_id(self.container_id_range, &used) {
                Some(id) => return Ok(id),
                None => {
                    return Err(AllocatorError::ResourceExhausted(format!(
                        "no free container id in range {:?}",
                        self.container_id_range
                    )))
                }
            }
        }

        let _ = node;
        Err(AllocatorError::AllocationConflict(
            "container id allocation raced with another actor".into(),
        ))
    }

    /// Transactional insert into the PortAllocation table; retried
    /// internally on a unique-constraint conflict up to 3 times.
    pub async fn allocate_port(&self, application_id: &str) -> Result<u16> {
        for _ in 0..MAX_ALLOCATION_RETRIES {
            let _guard = self.lock.lock().await;

            let mut used = HashSet::new();
            for port in self.port_range.0..self.port_range.1 {
                if self.store.is_port_allocated(port)? {
                    used.insert(port);
                }
            }

            let candidate = port::next_free_port(self.port_range, &used).ok_or_else(|| {
                AllocatorError::ResourceExhausted(format!("no free port in range {:?}", self.port_range))
            })?;

            match self.store.insert_port_allocation(candidate, application_id) {
                Ok(()) => return Ok(candidate),
                Err(crate::store::StoreError::Conflict(_)) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(AllocatorError::AllocationConflict(
            "port allocation raced with another actor".into(),
        ))
    }

    /// Release is a store-level removal; freed ports are immediately
    /// reusable by a later allocation.
    pub fn release_port(&self, public_port: u16) -> Result<()> {
        self.store.release_port_allocation(public_port)?;
        Ok(())
    }

    /// Polls the appliance's dnsmasq lease file until `hostname` appears
    /// or `timeout` elapses. Deliberately unserialized: many containers
    /// can wait on their own leases concurrently.
    pub async fn wait_for_dhcp_lease(
        &self,
        appliance_host: &str,
        hostname: &str,
        timeout: Duration,
    ) -> Result<String> {
        let deadline = Instant::now() + timeout;
        loop {
            let output = self
                .ssh
                .run(
                    &Target::Host(appliance_host.to_string()),
                    &Command::new(
                        vec!["cat".to_string(), DHCP_LEASES_PATH.to_string()],
                        Duration::from_secs(10),
                    ),
                )
                .await
                .map_err(|e| AllocatorError::Other(e.to_string()))?;

            let leases = dhcp::parse_leases(&output.stdout);
            if let Some(lease) = dhcp::find_lease_by_hostname(&leases, hostname) {
                return Ok(lease.ip.clone());
            }

            if Instant::now() >= deadline {
                return Err(AllocatorError::DhcpLeaseTimeout);
            }
            tokio::time::sleep(DHCP_POLL_INTERVAL).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet as HS;

    #[test]
    fn container_id_scan_is_deterministic() {
        let used: HS<i64> = [200, 202].into_iter().collect();
        assert_eq!(container_id::next_free_container_id((200, 210), &used), Some(201));
    }
}
