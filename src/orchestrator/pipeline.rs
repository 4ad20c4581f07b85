//! Deployment pipeline (D1-D10): executes a single deployment end to end,
//! appending a `DeploymentLog` record per step and running compensating
//! actions in reverse from the last successful step on failure.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::allocator::Allocator;
use crate::catalog::CatalogStore;
use crate::executor::{Command, SshPool, Target};
use crate::hypervisor::{select_best_node, HypervisorClient, LxcSpec};
use crate::proxy::VhostManager;
use crate::store::models::{Application, ApplicationState, LogLevel, ResourceSpec};
use crate::store::Store;

use super::errors::{OrchestratorError, Result};
use super::request::{validate_hostname, DeployRequest};

const DHCP_WAIT_TIMEOUT: Duration = Duration::from_secs(120);
const CONTAINER_CREATE_TIMEOUT: Duration = Duration::from_secs(180);
const STACK_START_TIMEOUT: Duration = Duration::from_secs(300);
const IMAGE_PULL_TIMEOUT: Duration = Duration::from_secs(600);

pub struct Orchestrator {
    store: Arc<Store>,
    catalog: Arc<CatalogStore>,
    hypervisor: Arc<HypervisorClient>,
    ssh: Arc<SshPool>,
    allocator: Arc<Allocator>,
    proxy: Arc<VhostManager>,
    appliance_node: String,
    default_bridge: String,
    default_template: String,
}

/// Tracks how far the pipeline got, so a failure at step N compensates
/// exactly the steps that actually ran.
enum Checkpoint {
    None,
    Allocated { public_port: u16 },
    ContainerCreated { node: String, container_id: i64 },
    ContainerStarted { node: String, container_id: i64 },
    RuntimeInstalled { node: String, container_id: i64 },
    StackStarted { node: String, container_id: i64 },
    VhostCreated { node: String, container_id: i64, hostname: String },
}

impl Orchestrator {
    pub fn new(
        store: Arc<Store>,
        catalog: Arc<CatalogStore>,
        hypervisor: Arc<HypervisorClient>,
        ssh: Arc<SshPool>,
        allocator: Arc<Allocator>,
        proxy: Arc<VhostManager>,
        appliance_node: String,
        default_bridge: String,
        default_template: String,
    ) -> Self {
        Self { store, catalog, hypervisor, ssh, allocator, proxy, appliance_node, default_bridge, default_template }
    }

    pub async fn deploy(&self, request: DeployRequest, cancel: CancellationToken) -> Result<Application> {
        // D1: validate
        validate_hostname(&request.hostname)?;
        if self.store.find_application_by_hostname(&request.hostname)?.is_some() {
            return Err(OrchestratorError::HostnameConflict(request.hostname.clone()));
        }
        let catalog_entry = self.catalog.get(&request.catalog_id)?;

        // D2: resolve + merge
        let (resources, environment) = catalog_entry.merge(&request.config_overrides);

        // D3: select node
        let nodes = self.hypervisor.list_nodes().await?;
        let node = select_best_node(&nodes).ok_or(OrchestratorError::NoEligibleNode)?.name.clone();

        let application_id = Uuid::new_v4().to_string();
        let mut checkpoint = Checkpoint::None;

        let result = self
            .run_steps(&request, &catalog_entry.id, &resources, &environment, &node, &application_id, &mut checkpoint, &cancel)
            .await;

        match result {
            Ok(app) => Ok(app),
            Err(e) => {
                self.compensate(&checkpoint).await;
                self.finalize_failure(&application_id, &e, request.delete_on_failure).await;
                Err(e)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_steps(
        &self,
        request: &DeployRequest,
        catalog_id: &str,
        resources: &ResourceSpec,
        environment: &std::collections::HashMap<String, String>,
        node: &str,
        application_id: &str,
        checkpoint: &mut Checkpoint,
        cancel: &CancellationToken,
    ) -> Result<Application> {
        // D4: allocate + insert provisioning row
        let container_id = self.allocator.allocate_container_id(node).await?;
        let public_port = self.allocator.allocate_port(application_id).await?;

        let now = chrono::Utc::now();
        let mut app = Application {
            id: application_id.to_string(),
            catalog_id: catalog_id.to_string(),
            hostname: request.hostname.clone(),
            container_id: Some(container_id),
            node: Some(node.to_string()),
            private_ip: None,
            public_port: Some(public_port),
            state: ApplicationState::Provisioning,
            resources: resources.clone(),
            ports: std::collections::HashMap::new(),
            volumes: Vec::new(),
            environment: environment.clone(),
            owner: request.owner.clone(),
            created_at: now,
            updated_at: now,
            error_message: None,
        };
        self.store.insert_application(&app)?;
        self.log(application_id, LogLevel::Info, "D4", "allocated container id and port").ok();
        *checkpoint = Checkpoint::Allocated { public_port };
        self.check_cancelled(cancel)?;

        // D5: create_lxc
        let spec = LxcSpec {
            node: node.to_string(),
            container_id,
            hostname: request.hostname.clone(),
            template: self.default_template.clone(),
            cpu_cores: resources.cpu_cores,
            memory_mb: resources.memory_mb,
            disk_gb: resources.disk_gb,
            bridge: self.default_bridge.clone(),
            dhcp: true,
            static_ip: None,
        };
        let create_task = self.hypervisor.create_lxc(&spec).await.map_err(|e| self.step_failed("D5", e))?;
        self.hypervisor
            .wait_for_task(&create_task, CONTAINER_CREATE_TIMEOUT)
            .await
            .map_err(|e| self.step_failed("D5", e))?;
        self.log(application_id, LogLevel::Info, "D5", "container created").ok();
        *checkpoint = Checkpoint::ContainerCreated { node: node.to_string(), container_id };
        self.check_cancelled(cancel)?;

        // D6: start, wait for DHCP, record private ip
        let start_task = self.hypervisor.start(node, container_id).await.map_err(|e| self.step_failed("D6", e))?;
        self.hypervisor.wait_for_task(&start_task, Duration::from_secs(60)).await.map_err(|e| self.step_failed("D6", e))?;
        let private_ip = self
            .allocator
            .wait_for_dhcp_lease(&self.appliance_node, &request.hostname, DHCP_WAIT_TIMEOUT)
            .await
            .map_err(|e| OrchestratorError::StepFailed { step: "D6", message: e.to_string() })?;
        app.private_ip = Some(private_ip.clone());
        self.store.update_application(&app)?;
        self.log(application_id, LogLevel::Info, "D6", &format!("container running at {private_ip}")).ok();
        *checkpoint = Checkpoint::ContainerStarted { node: node.to_string(), container_id };
        self.check_cancelled(cancel)?;

        // D7: install container runtime
        self.install_runtime(node, container_id).await.map_err(|e| self.step_failed("D7", e))?;
        self.log(application_id, LogLevel::Info, "D7", "container runtime installed").ok();
        *checkpoint = Checkpoint::RuntimeInstalled { node: node.to_string(), container_id };
        self.check_cancelled(cancel)?;

        // D8: transfer compose manifest, pull images, start stack
        let catalog_entry = self.catalog.get(catalog_id)?;
        self.launch_stack(node, container_id, &catalog_entry.compose_manifest).await.map_err(|e| self.step_failed("D8", e))?;
        self.log(application_id, LogLevel::Info, "D8", "application stack started").ok();
        *checkpoint = Checkpoint::StackStarted { node: node.to_string(), container_id };
        self.check_cancelled(cancel)?;

        // D9: create vhost
        let backend_port = catalog_entry.required_ports.first().copied().unwrap_or(80);
        self.proxy
            .create_vhost(&request.hostname, &private_ip, backend_port, public_port)
            .await
            .map_err(|e| self.step_failed("D9", e))?;
        app.ports.insert(backend_port, public_port);
        self.log(application_id, LogLevel::Info, "D9", "reverse proxy vhost created").ok();
        *checkpoint = Checkpoint::VhostCreated { node: node.to_string(), container_id, hostname: request.hostname.clone() };

        // D10: transition to running
        app.state = ApplicationState::Running;
        app.updated_at = chrono::Utc::now();
        self.store.update_application(&app)?;
        self.log(application_id, LogLevel::Info, "D10", "deployment complete").ok();

        Ok(app)
    }

    fn step_failed<E: std::fmt::Display>(&self, step: &'static str, error: E) -> OrchestratorError {
        OrchestratorError::StepFailed { step, message: error.to_string() }
    }

    fn check_cancelled(&self, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(OrchestratorError::Cancelled);
        }
        Ok(())
    }

    fn log(&self, application_id: &str, level: LogLevel, step: &str, message: &str) -> Result<()> {
        self.store.append_deployment_log(application_id, level, step, message)?;
        Ok(())
    }

    async fn install_runtime(&self, node: &str, container_id: i64) -> std::result::Result<(), crate::executor::ExecutorError> {
        let target = Target::Container { host: node.to_string(), container_id };
        let install = Command::new(
            vec![
                "sh".to_string(),
                "-c".to_string(),
                "apt-get update && apt-get install -y docker.io docker-compose-plugin && systemctl enable --now docker".to_string(),
            ],
            Duration::from_secs(180),
        );
        let output = self.ssh.run(&target, &install).await?;
        if !output.success() {
            return Err(crate::executor::ExecutorError::CommandFailed { exit_code: output.exit_code, stderr: output.stderr });
        }

        let verify = Command::new(vec!["systemctl".to_string(), "is-active".to_string(), "docker".to_string()], Duration::from_secs(30));
        let output = self.ssh.run(&target, &verify).await?;
        if !output.success() {
            return Err(crate::executor::ExecutorError::CommandFailed { exit_code: output.exit_code, stderr: output.stderr });
        }
        Ok(())
    }

    async fn launch_stack(&self, node: &str, container_id: i64, compose_manifest: &str) -> std::result::Result<(), crate::executor::ExecutorError> {
        let target = Target::Container { host: node.to_string(), container_id };

        let write = Command::shell(
            format!("mkdir -p /opt/proximity && cat > /opt/proximity/docker-compose.yml << 'PROXIMITY_COMPOSE_EOF'\n{compose_manifest}PROXIMITY_COMPOSE_EOF"),
            Duration::from_secs(30),
        );
        let output = self.ssh.run(&target, &write).await?;
        if !output.success() {
            return Err(crate::executor::ExecutorError::CommandFailed { exit_code: output.exit_code, stderr: output.stderr });
        }

        let pull = Command::new(
            vec!["docker".to_string(), "compose".to_string(), "-f".to_string(), "/opt/proximity/docker-compose.yml".to_string(), "pull".to_string()],
            IMAGE_PULL_TIMEOUT,
        );
        let output = self.ssh.run(&target, &pull).await?;
        if !output.success() {
            return Err(crate::executor::ExecutorError::CommandFailed { exit_code: output.exit_code, stderr: output.stderr });
        }

        let up = Command::new(
            vec!["docker".to_string(), "compose".to_string(), "-f".to_string(), "/opt/proximity/docker-compose.yml".to_string(), "up".to_string(), "-d".to_string()],
            STACK_START_TIMEOUT,
        );
        let output = self.ssh.run(&target, &up).await?;
        if !output.success() {
            return Err(crate::executor::ExecutorError::CommandFailed { exit_code: output.exit_code, stderr: output.stderr });
        }

        let verify = Command::new(
            vec!["docker".to_string(), "compose".to_string(), "-f".to_string(), "/opt/proximity/docker-compose.yml".to_string(), "ps".to_string(), "--status".to_string(), "running".to_string(), "-q".to_string()],
            Duration::from_secs(30),
        );
        let output = self.ssh.run(&target, &verify).await?;
        if !output.success() || output.stdout.trim().is_empty() {
            return Err(crate::executor::ExecutorError::CommandFailed { exit_code: output.exit_code, stderr: output.stderr });
        }
        Ok(())
    }

    /// Runs compensating actions in reverse order from the last
    /// successful checkpoint. Best-effort: a compensation failure is
    /// logged but does not stop the rest of the rollback.
    async fn compensate(&self, checkpoint: &Checkpoint) {
        match checkpoint {
            Checkpoint::None => {}
            Checkpoint::Allocated { public_port } => {
                if let Err(e) = self.allocator.release_port(*public_port) {
                    warn!(error = %e, "failed to release port during rollback");
                }
            }
            Checkpoint::VhostCreated { node, container_id, hostname } => {
                if let Err(e) = self.proxy.delete_vhost(hostname).await {
                    warn!(error = %e, "failed to delete vhost during rollback");
                }
                self.destroy_container(node, *container_id).await;
            }
            Checkpoint::StackStarted { node, container_id }
            | Checkpoint::RuntimeInstalled { node, container_id }
            | Checkpoint::ContainerStarted { node, container_id }
            | Checkpoint::ContainerCreated { node, container_id } => {
                self.destroy_container(node, *container_id).await;
            }
        }
    }

    async fn destroy_container(&self, node: &str, container_id: i64) {
        if let Ok(task) = self.hypervisor.stop(node, container_id).await {
            let _ = self.hypervisor.wait_for_task(&task, Duration::from_secs(60)).await;
        }
        match self.hypervisor.destroy(node, container_id).await {
            Ok(task) => {
                if let Err(e) = self.hypervisor.wait_for_task(&task, Duration::from_secs(60)).await {
                    warn!(error = %e, node, container_id, "container destroy did not complete during rollback");
                }
            }
            Err(e) => warn!(error = %e, node, container_id, "container destroy call failed during rollback"),
        }
    }

    async fn finalize_failure(&self, application_id: &str, error: &OrchestratorError, delete_on_failure: bool) {
        self.log(application_id, LogLevel::Error, "rollback", &error.to_string()).ok();

        let app = match self.store.get_application(application_id) {
            Ok(app) => app,
            Err(_) => return,
        };

        if delete_on_failure {
            if let Some(public_port) = app.public_port {
                let _ = self.allocator.release_port(public_port);
            }
            if self.store.delete_application(application_id).is_ok() {
                info!(application_id, "deployment failure compensated and row deleted per request");
            }
            return;
        }

        let mut app = app;
        app.state = ApplicationState::Error;
        app.error_message = Some(error.to_string());
        app.updated_at = chrono::Utc::now();
        let _ = self.store.update_application(&app);
    }
}
