//! Per-service health probes run inside the appliance container.

use std::collections::HashMap;
use std::time::Duration;

use crate::executor::{Command, SshPool, Target};

use super::errors::Result;

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Returns a service-name -> healthy map. Never fails the whole check
/// because one service is down; each probe is independent.
pub async fn verify_health(ssh: &SshPool, host: &str, container_id: i64) -> Result<HashMap<String, bool>> {
    let target = Target::Container { host: host.to_string(), container_id };
    let mut results = HashMap::new();

    for service in ["dnsmasq", "nftables"] {
        let healthy = probe_service_active(ssh, &target, service).await;
        results.insert(service.to_string(), healthy);
    }

    results.insert("proxy".to_string(), probe_proxy_listening(ssh, &target).await);
    results.insert("nat".to_string(), probe_ip_forward(ssh, &target).await);

    Ok(results)
}

async fn probe_service_active(ssh: &SshPool, target: &Target, service: &str) -> bool {
    let cmd = Command::new(vec!["systemctl".to_string(), "is-active".to_string(), service.to_string()], PROBE_TIMEOUT);
    matches!(ssh.run(target, &cmd).await, Ok(output) if output.success())
}

async fn probe_proxy_listening(ssh: &SshPool, target: &Target) -> bool {
    let cmd = Command::new(
        vec!["systemctl".to_string(), "is-active".to_string(), "proximity-proxy".to_string()],
        PROBE_TIMEOUT,
    );
    matches!(ssh.run(target, &cmd).await, Ok(output) if output.success())
}

async fn probe_ip_forward(ssh: &SshPool, target: &Target) -> bool {
    let cmd = Command::new(
        vec!["sysctl".to_string(), "-n".to_string(), "net.ipv4.ip_forward".to_string()],
        PROBE_TIMEOUT,
    );
    matches!(ssh.run(target, &cmd).await, Ok(output) if output.stdout.trim() == "1")
}
