//! Serializes all post-deploy operations on an application and owns its
//! state machine. One `Locker` per application, keyed in a `DashMap`, so
//! exactly one operation runs per application at a time while unrelated
//! applications proceed fully in parallel.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::{info, warn};

use crate::allocator::Allocator;
use crate::events::{Event, EventBus};
use crate::executor::{Command, SshPool, Target};
use crate::hypervisor::{ConfigUpdate, HypervisorClient};
use crate::proxy::VhostManager;
use crate::store::models::{Application, ApplicationState};
use crate::store::Store;
use crate::system::Locker;

use super::errors::{LifecycleError, Result};

const STACK_PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const STACK_PROBE_INTERVAL: Duration = Duration::from_secs(2);
const STACK_READY_BOUND: Duration = Duration::from_secs(120);

pub struct LifecycleManager {
    store: Arc<Store>,
    hypervisor: Arc<HypervisorClient>,
    ssh: Arc<SshPool>,
    allocator: Arc<Allocator>,
    proxy: Arc<VhostManager>,
    events: Arc<EventBus>,
    appliance_node: String,
    locks: DashMap<String, Arc<Locker>>,
}

impl LifecycleManager {
    pub fn new(
        store: Arc<Store>,
        hypervisor: Arc<HypervisorClient>,
        ssh: Arc<SshPool>,
        allocator: Arc<Allocator>,
        proxy: Arc<VhostManager>,
        events: Arc<EventBus>,
        appliance_node: String,
    ) -> Self {
        Self { store, hypervisor, ssh, allocator, proxy, events, appliance_node, locks: DashMap::new() }
    }

    fn lock_for(&self, application_id: &str) -> Arc<Locker> {
        self.locks.entry(application_id.to_string()).or_insert_with(|| Arc::new(Locker::new())).clone()
    }

    async fn transition(&self, app: &mut Application, state: ApplicationState) -> Result<()> {
        app.state = state;
        app.updated_at = chrono::Utc::now();
        self.store.update_application(app)?;
        self.events.publish_state(&app.id, state);
        Ok(())
    }

    fn require_state(&self, app: &Application, expected: &[ApplicationState]) -> Result<()> {
        if !expected.contains(&app.state) {
            return Err(LifecycleError::InvalidState {
                current: app.state.to_string(),
                expected: expected.iter().map(|s| s.to_string()).collect::<Vec<_>>().join("|"),
            });
        }
        Ok(())
    }

    pub async fn start(&self, application_id: &str) -> Result<Application> {
        let lock = self.lock_for(application_id);
        let _guard = lock.acquire().await?;

        let mut app = self.store.get_application(application_id)?;
        self.require_state(&app, &[ApplicationState::Stopped])?;

        let node = app.node.clone().ok_or_else(|| LifecycleError::NotFound(application_id.to_string()))?;
        let container_id = app.container_id.ok_or_else(|| LifecycleError::NotFound(application_id.to_string()))?;

        let task = self.hypervisor.start(&node, container_id).await?;
        self.hypervisor.wait_for_task(&task, Duration::from_secs(60)).await?;

        match self.wait_for_stack_reachable(&node, container_id).await {
            Ok(()) => {
                self.transition(&mut app, ApplicationState::Running).await?;
                Ok(app)
            }
            Err(e) => {
                warn!(application_id, "stack did not become reachable after start");
                app.error_message = Some(e.to_string());
                self.transition(&mut app, ApplicationState::Error).await?;
                Err(LifecycleError::StackNotReady)
            }
        }
    }

    pub async fn stop(&self, application_id: &str) -> Result<Application> {
        let lock = self.lock_for(application_id);
        let _guard = lock.acquire().await?;

        let mut app = self.store.get_application(application_id)?;
        self.require_state(&app, &[ApplicationState::Running])?;

        let node = app.node.clone().ok_or_else(|| LifecycleError::NotFound(application_id.to_string()))?;
        let container_id = app.container_id.ok_or_else(|| LifecycleError::NotFound(application_id.to_string()))?;

        let task = self.hypervisor.stop(&node, container_id).await?;
        self.hypervisor.wait_for_task(&task, Duration::from_secs(60)).await?;

        self.transition(&mut app, ApplicationState::Stopped).await?;
        Ok(app)
    }

    pub async fn restart(&self, application_id: &str) -> Result<Application> {
        let lock = self.lock_for(application_id);
        let _guard = lock.acquire().await?;

        let mut app = self.store.get_application(application_id)?;
        self.require_state(&app, &[ApplicationState::Running])?;
        self.transition(&mut app, ApplicationState::Restarting).await?;

        let node = app.node.clone().ok_or_else(|| LifecycleError::NotFound(application_id.to_string()))?;
        let container_id = app.container_id.ok_or_else(|| LifecycleError::NotFound(application_id.to_string()))?;

        let stop_task = self.hypervisor.stop(&node, container_id).await?;
        self.hypervisor.wait_for_task(&stop_task, Duration::from_secs(60)).await?;

        let start_task = self.hypervisor.start(&node, container_id).await?;
        if let Err(e) = self.hypervisor.wait_for_task(&start_task, Duration::from_secs(60)).await {
            app.error_message = Some(e.to_string());
            self.transition(&mut app, ApplicationState::Error).await?;
            return Err(e.into());
        }

        match self.wait_for_stack_reachable(&node, container_id).await {
            Ok(()) => {
                self.transition(&mut app, ApplicationState::Running).await?;
                Ok(app)
            }
            Err(_) => {
                app.error_message = Some("stack not reachable after restart".to_string());
                self.transition(&mut app, ApplicationState::Error).await?;
                Err(LifecycleError::StackNotReady)
            }
        }
    }

    pub async fn update_config(
        &self,
        application_id: &str,
        cpu_cores: Option<u32>,
        memory_mb: Option<u64>,
        disk_gb: Option<u64>,
    ) -> Result<Application> {
        if cpu_cores.is_none() && memory_mb.is_none() && disk_gb.is_none() {
            return Err(LifecycleError::EmptyUpdate);
        }

        let lock = self.lock_for(application_id);
        let _guard = lock.acquire().await?;

        let mut app = self.store.get_application(application_id)?;
        self.require_state(&app, &[ApplicationState::Running, ApplicationState::Stopped])?;

        let unchanged = cpu_cores.map_or(true, |v| v == app.resources.cpu_cores)
            && memory_mb.map_or(true, |v| v == app.resources.memory_mb)
            && disk_gb.map_or(true, |v| v == app.resources.disk_gb);
        if unchanged {
            return Ok(app);
        }

        let was_running = app.state == ApplicationState::Running;
        let prior_state = app.state;

        let node = app.node.clone().ok_or_else(|| LifecycleError::NotFound(application_id.to_string()))?;
        let container_id = app.container_id.ok_or_else(|| LifecycleError::NotFound(application_id.to_string()))?;

        self.transition(&mut app, ApplicationState::Updating).await?;

        if was_running {
            let stop_task = self.hypervisor.stop(&node, container_id).await?;
            self.hypervisor.wait_for_task(&stop_task, Duration::from_secs(60)).await?;
        }

        let update_result = self.apply_resource_update(&node, container_id, &mut app, cpu_cores, memory_mb, disk_gb).await;
        if let Err(e) = update_result {
            app.error_message = Some(e.to_string());
            self.transition(&mut app, ApplicationState::Error).await?;
            return Err(e);
        }

        if was_running {
            let start_task = self.hypervisor.start(&node, container_id).await?;
            match self.hypervisor.wait_for_task(&start_task, Duration::from_secs(60)).await {
                Ok(()) => {
                    self.transition(&mut app, prior_state).await?;
                }
                Err(_) => {
                    warn!(application_id, "restart after config update failed, retrying once");
                    let retry_task = self.hypervisor.start(&node, container_id).await?;
                    match self.hypervisor.wait_for_task(&retry_task, Duration::from_secs(60)).await {
                        Ok(()) => self.transition(&mut app, prior_state).await?,
                        Err(e) => {
                            app.error_message = Some(e.to_string());
                            self.transition(&mut app, ApplicationState::Error).await?;
                            return Err(e.into());
                        }
                    }
                }
            }
        } else {
            self.transition(&mut app, prior_state).await?;
        }

        Ok(app)
    }

    async fn apply_resource_update(
        &self,
        node: &str,
        container_id: i64,
        app: &mut Application,
        cpu_cores: Option<u32>,
        memory_mb: Option<u64>,
        disk_gb: Option<u64>,
    ) -> Result<()> {
        if cpu_cores.is_some() || memory_mb.is_some() {
            let update = ConfigUpdate { cpu_cores, memory_mb };
            self.hypervisor.update_config(node, container_id, &update).await?;
        }
        if let Some(disk_gb) = disk_gb {
            let task = self.hypervisor.resize_disk(node, container_id, disk_gb).await?;
            self.hypervisor.wait_for_task(&task, Duration::from_secs(60)).await?;
        }

        if let Some(cpu) = cpu_cores {
            app.resources.cpu_cores = cpu;
        }
        if let Some(mem) = memory_mb {
            app.resources.memory_mb = mem;
        }
        if let Some(disk) = disk_gb {
            app.resources.disk_gb = disk;
        }
        Ok(())
    }

    pub async fn clone_app(&self, application_id: &str, new_hostname: &str) -> Result<Application> {
        let lock = self.lock_for(application_id);
        let _guard = lock.acquire().await?;

        let source = self.store.get_application(application_id)?;
        self.require_state(&source, &[ApplicationState::Stopped, ApplicationState::Running])?;

        if self.store.find_application_by_hostname(new_hostname)?.is_some() {
            return Err(LifecycleError::HostnameConflict(new_hostname.to_string()));
        }

        let node = source.node.clone().ok_or_else(|| LifecycleError::NotFound(application_id.to_string()))?;
        let source_container_id = source.container_id.ok_or_else(|| LifecycleError::NotFound(application_id.to_string()))?;

        let new_container_id = self.allocator.allocate_container_id(&node).await?;
        let new_id = uuid::Uuid::new_v4().to_string();
        let new_public_port = self.allocator.allocate_port(&new_id).await?;

        let clone_task = self
            .hypervisor
            .clone_container(&node, source_container_id, new_container_id, new_hostname)
            .await?;
        self.hypervisor.wait_for_task(&clone_task, Duration::from_secs(180)).await?;

        let start_task = self.hypervisor.start(&node, new_container_id).await?;
        self.hypervisor.wait_for_task(&start_task, Duration::from_secs(60)).await?;

        let private_ip = self
            .allocator
            .wait_for_dhcp_lease(&self.appliance_node, new_hostname, Duration::from_secs(120))
            .await?;

        let backend_port = source.backend_port().unwrap_or(80);
        self.proxy.create_vhost(new_hostname, &private_ip, backend_port, new_public_port).await?;

        let mut clone = Application {
            id: new_id,
            catalog_id: source.catalog_id.clone(),
            hostname: new_hostname.to_string(),
            container_id: Some(new_container_id),
            node: Some(node),
            private_ip: Some(private_ip),
            public_port: Some(new_public_port),
            state: ApplicationState::Provisioning,
            resources: source.resources.clone(),
            ports: source.ports.clone(),
            volumes: source.volumes.clone(),
            environment: source.environment.clone(),
            owner: source.owner.clone(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
            error_message: None,
        };
        self.store.insert_application(&clone)?;
        self.transition(&mut clone, ApplicationState::Running).await?;
        Ok(clone)
    }

    pub async fn delete(&self, application_id: &str) -> Result<()> {
        let lock = self.lock_for(application_id);
        let _guard = lock.acquire().await?;

        let mut app = self.store.get_application(application_id)?;
        self.require_state(
            &app,
            &[
                ApplicationState::Running,
                ApplicationState::Stopped,
                ApplicationState::Error,
                ApplicationState::Provisioning,
            ],
        )?;
        self.transition(&mut app, ApplicationState::Deleting).await?;

        if let Err(e) = self.proxy.delete_vhost(&app.hostname).await {
            warn!(application_id, error = %e, "vhost delete failed during application delete");
        }

        if let (Some(node), Some(container_id)) = (app.node.clone(), app.container_id) {
            if let Ok(task) = self.hypervisor.stop(&node, container_id).await {
                let _ = self.hypervisor.wait_for_task(&task, Duration::from_secs(60)).await;
            }
            match self.hypervisor.destroy(&node, container_id).await {
                Ok(task) => {
                    if let Err(e) = self.hypervisor.wait_for_task(&task, Duration::from_secs(60)).await {
                        app.error_message = Some(e.to_string());
                        self.transition(&mut app, ApplicationState::Error).await?;
                        return Err(e.into());
                    }
                }
                Err(e) => {
                    app.error_message = Some(e.to_string());
                    self.transition(&mut app, ApplicationState::Error).await?;
                    return Err(e.into());
                }
            }
        }

        if let Some(public_port) = app.public_port {
            self.allocator.release_port(public_port)?;
        }

        self.store.delete_application(application_id)?;
        self.events.publish(Event::StateChange { application_id: application_id.to_string(), state: ApplicationState::Deleted });
        self.locks.remove(application_id);
        Ok(())
    }

    async fn wait_for_stack_reachable(&self, node: &str, container_id: i64) -> Result<()> {
        let deadline = tokio::time::Instant::now() + STACK_READY_BOUND;
        loop {
            let output = self
                .ssh
                .run(
                    &Target::Container { host: node.to_string(), container_id },
                    &Command::new(
                        vec!["docker".to_string(), "compose".to_string(), "ps".to_string(), "--status".to_string(), "running".to_string(), "-q".to_string()],
                        STACK_PROBE_TIMEOUT,
                    ),
                )
                .await;

            if let Ok(output) = output {
                if output.success() && !output.stdout.trim().is_empty() {
                    info!(node, container_id, "application stack reachable");
                    return Ok(());
                }
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(LifecycleError::StackNotReady);
            }
            tokio::time::sleep(STACK_PROBE_INTERVAL).await;
        }
    }
}
