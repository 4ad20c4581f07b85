//! Main daemon command - loads configuration, wires every component, and
//! serves the HTTP API until shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use proximity_daemon::allocator::Allocator;
use proximity_daemon::api::{self, ApiState, JobQueue};
use proximity_daemon::appliance::{ApplianceHandle, Bootstrap};
use proximity_daemon::backup::BackupRegistry;
use proximity_daemon::catalog::CatalogStore;
use proximity_daemon::config::Configuration;
use proximity_daemon::events::EventBus;
use proximity_daemon::executor::{load_known_hosts, SshPool};
use proximity_daemon::hypervisor::HypervisorClient;
use proximity_daemon::lifecycle::LifecycleManager;
use proximity_daemon::orchestrator::Orchestrator;
use proximity_daemon::proxy::VhostManager;
use proximity_daemon::store::Store;

/// Run the main daemon
pub async fn run(config_path: &str) -> Result<()> {
    info!("Loading configuration from: {}", config_path);
    let config = Configuration::load(config_path)?;
    let config = Arc::new(config);

    info!("  API: {}:{}", config.api.host, config.api.port);
    info!("  Hypervisor: {}:{}", config.hypervisor.host, config.hypervisor.port);
    info!("  Appliance node: {} (container {})", config.appliance.node, config.appliance.container_id);

    let store = Arc::new(
        Store::open(&config.store.database_path)
            .with_context(|| format!("failed to open store at {}", config.store.database_path.display()))?,
    );

    let known_hosts = load_known_hosts(&config.ssh.known_hosts_path)
        .with_context(|| format!("failed to load known hosts from {}", config.ssh.known_hosts_path.display()))?;
    let ssh = Arc::new(SshPool::new(Arc::new(config.ssh.clone()), known_hosts));

    let hypervisor = Arc::new(HypervisorClient::new(&config.hypervisor)?);

    let allocator = Arc::new(Allocator::new(&config, store.clone(), hypervisor.clone(), ssh.clone()));
    allocator
        .validate_ranges_against_existing()
        .context("allocation range validation failed")?;

    let catalog = Arc::new(
        CatalogStore::load_from_dir(&config.catalog.directory)
            .with_context(|| format!("failed to load catalog from {}", config.catalog.directory.display()))?,
    );
    info!("Loaded {} catalog entries", catalog.list().len());

    let backups = Arc::new(BackupRegistry::new(store.clone()));

    let appliance_handle = Arc::new(ApplianceHandle::new(store.clone()));

    if appliance_handle.get().await.is_err() {
        info!("No appliance record found, bootstrapping network appliance...");
        let bootstrap = Bootstrap::new(
            config.clone(),
            store.clone(),
            hypervisor.clone(),
            ssh.clone(),
            config.appliance.node.clone(),
        );
        bootstrap.run().await.context("appliance bootstrap failed")?;
        info!("Appliance bootstrap complete");
    } else {
        info!("Appliance already initialized, skipping bootstrap");
    }

    let proxy = Arc::new(VhostManager::new(ssh.clone(), config.appliance.node.clone(), config.appliance.container_id));

    let events = Arc::new(EventBus::new());

    let orchestrator = Arc::new(Orchestrator::new(
        store.clone(),
        catalog.clone(),
        hypervisor.clone(),
        ssh.clone(),
        allocator.clone(),
        proxy.clone(),
        config.appliance.node.clone(),
        config.network.bridge_name.clone(),
        config.appliance.template.clone(),
    ));

    let lifecycle = Arc::new(LifecycleManager::new(
        store.clone(),
        hypervisor.clone(),
        ssh.clone(),
        allocator.clone(),
        proxy.clone(),
        events.clone(),
        config.appliance.node.clone(),
    ));

    let jobs = JobQueue::spawn();

    let state = ApiState {
        store: store.clone(),
        hypervisor: hypervisor.clone(),
        orchestrator,
        lifecycle,
        appliance: appliance_handle,
        backups,
        events,
        jobs,
    };

    let app = api::router(state);

    let bind_addr: SocketAddr = format!("{}:{}", config.api.host, config.api.port)
        .parse()
        .context("invalid bind address")?;

    info!("Starting HTTP server on {}", bind_addr);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Daemon stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        warn!("failed to install CTRL+C handler, shutdown signal unavailable");
        return;
    }
    warn!("received shutdown signal, stopping server...");
}
