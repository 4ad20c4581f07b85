//! Diagnostics command - checks connectivity to the hypervisor cluster
//! and reports the current appliance/store state.

use std::sync::Arc;

use anyhow::Result;

use proximity_daemon::appliance::ApplianceHandle;
use proximity_daemon::config::Configuration;
use proximity_daemon::hypervisor::HypervisorClient;
use proximity_daemon::store::Store;

/// Run diagnostics and display daemon/cluster information.
pub async fn run(config_path: &str) -> Result<()> {
    println!("Proximity Daemon Diagnostics");
    println!("============================\n");

    let config = Configuration::load(config_path)?;

    println!("Configuration:");
    println!("--------------");
    println!("  API: {}:{}", config.api.host, config.api.port);
    println!("  Hypervisor: {}:{}", config.hypervisor.host, config.hypervisor.port);
    println!("  Appliance node: {} (container {})", config.appliance.node, config.appliance.container_id);
    println!("  Store path: {}", config.store.database_path.display());

    println!("\nStore:");
    println!("------");
    let store = Store::open(&config.store.database_path);
    if let Ok(ref store) = store {
        match store.list_applications() {
            Ok(apps) => println!("  Reachable, {} active application(s)", apps.len()),
            Err(e) => println!("  Opened but failed to list applications: {e}"),
        }
    } else if let Err(ref e) = store {
        println!("  Error opening store: {e}");
    }

    println!("\nHypervisor cluster:");
    println!("-------------------");
    match HypervisorClient::new(&config.hypervisor) {
        Ok(client) => match client.list_nodes().await {
            Ok(nodes) => {
                if nodes.is_empty() {
                    println!("  Reachable, no nodes reported");
                } else {
                    for node in &nodes {
                        println!(
                            "  {:<12} online={:<5} cpu_load={:.2} mem={}/{} MiB",
                            node.name,
                            node.online,
                            node.cpu_load,
                            node.mem_used / 1024 / 1024,
                            node.mem_total / 1024 / 1024,
                        );
                    }
                }
            }
            Err(e) => println!("  Error listing nodes: {e}"),
        },
        Err(e) => println!("  Error building client: {e}"),
    }

    println!("\nNetwork appliance:");
    println!("------------------");
    match store {
        Ok(store) => {
            let handle = ApplianceHandle::new(Arc::new(store));
            match handle.get().await {
                Ok(info) => {
                    println!("  Container {} on bridge {}", info.container_id, info.bridge_name);
                    println!("  LAN: {}  Subnet: {}", info.lan_ip, info.subnet);
                    println!(
                        "  Health: dhcp={} dns={} nat={} proxy={}",
                        info.dhcp_healthy, info.dns_healthy, info.nat_healthy, info.proxy_healthy
                    );
                }
                Err(_) => println!("  Not yet bootstrapped"),
            }
        }
        Err(_) => println!("  Skipped (store already reported an error above)"),
    }

    println!("\nDiagnostics complete.");
    Ok(())
}
