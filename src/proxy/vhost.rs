//! Per-application reverse-proxy vhost files inside the appliance
//! container: atomic writes (write-to-temp, rename), validate-before-
//! reload, and a rollback-then-reload on a failed apply.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{error, warn};

use crate::executor::{Command, SshPool, Target};
use crate::system::Locker;

use super::errors::{ProxyError, Result};

const SITES_DIR: &str = "/etc/proximity-proxy/sites-enabled";
const RELOAD_TIMEOUT: Duration = Duration::from_secs(15);
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct VhostManager {
    ssh: std::sync::Arc<SshPool>,
    http: reqwest::Client,
    appliance_node: String,
    appliance_container_id: i64,
    reload_lock: Locker,
    degraded: AtomicBool,
}

impl VhostManager {
    pub fn new(ssh: std::sync::Arc<SshPool>, appliance_node: String, appliance_container_id: i64) -> Self {
        Self {
            ssh,
            http: reqwest::Client::builder()
                .timeout(PROBE_TIMEOUT)
                .danger_accept_invalid_certs(true)
                .build()
                .expect("reqwest client"),
            appliance_node,
            appliance_container_id,
            reload_lock: Locker::new(),
            degraded: AtomicBool::new(false),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    pub async fn create_vhost(
        &self,
        app_name: &str,
        backend_ip: &str,
        backend_port: u16,
        public_port: u16,
    ) -> Result<()> {
        self.refuse_if_degraded()?;
        let path = self.vhost_path(app_name);
        let content = render_vhost(app_name, backend_ip, backend_port, public_port);

        self.write_temp(&path, &content).await?;
        if let Err(e) = self.validate_config().await {
            self.remove_file(&format!("{path}.tmp")).await.ok();
            return Err(e);
        }
        self.rename_temp(&path).await?;

        match self.reload().await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(app_name, "vhost reload failed, deleting new file and rolling back");
                self.remove_file(&path).await.ok();
                self.reload_or_degrade(e).await
            }
        }
    }

    pub async fn update_vhost(
        &self,
        app_name: &str,
        backend_ip: &str,
        backend_port: u16,
        public_port: u16,
    ) -> Result<()> {
        self.refuse_if_degraded()?;
        let path = self.vhost_path(app_name);
        let previous = self.read_file(&path).await.ok();
        let content = render_vhost(app_name, backend_ip, backend_port, public_port);

        self.write_temp(&path, &content).await?;
        if let Err(e) = self.validate_config().await {
            self.remove_file(&format!("{path}.tmp")).await.ok();
            return Err(e);
        }
        self.rename_temp(&path).await?;

        match self.reload().await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(app_name, "vhost reload failed, restoring previous config");
                match previous {
                    Some(prior) => {
                        self.write_temp(&path, &prior).await.ok();
                        self.rename_temp(&path).await.ok();
                    }
                    None => {
                        self.remove_file(&path).await.ok();
                    }
                }
                self.reload_or_degrade(e).await
            }
        }
    }

    pub async fn delete_vhost(&self, app_name: &str) -> Result<()> {
        self.refuse_if_degraded()?;
        let path = self.vhost_path(app_name);
        self.remove_file(&path).await?;
        match self.reload().await {
            Ok(()) => Ok(()),
            Err(e) => self.reload_or_degrade(e).await,
        }
    }

    pub async fn list_vhosts(&self) -> Result<Vec<String>> {
        let output = self
            .ssh
            .run(&self.target(), &Command::new(vec!["ls".to_string(), SITES_DIR.to_string()], RELOAD_TIMEOUT))
            .await?;
        Ok(output
            .stdout
            .lines()
            .filter_map(|l| l.strip_suffix(".conf").map(|s| s.to_string()))
            .collect())
    }

    pub async fn verify_vhost_health(&self, public_port: u16) -> bool {
        let url = format!("http://{}:{}/", self.config_host(), public_port);
        match self.http.get(&url).send().await {
            Ok(resp) => resp.status().is_success() || resp.status().is_redirection(),
            Err(_) => false,
        }
    }

    fn config_host(&self) -> &str {
        &self.appliance_node
    }

    fn target(&self) -> Target {
        Target::Container { host: self.appliance_node.clone(), container_id: self.appliance_container_id }
    }

    fn vhost_path(&self, app_name: &str) -> String {
        format!("{SITES_DIR}/{app_name}.conf")
    }

    async fn write_temp(&self, path: &str, content: &str) -> Result<()> {
        let tmp = format!("{path}.tmp");
        let cmd = Command::shell(
            format!("cat > {tmp} << 'PROXIMITY_VHOST_EOF'\n{content}PROXIMITY_VHOST_EOF"),
            RELOAD_TIMEOUT,
        );
        let output = self.ssh.run(&self.target(), &cmd).await?;
        if !output.success() {
            return Err(ProxyError::ValidationFailed(output.stderr));
        }
        Ok(())
    }

    async fn rename_temp(&self, path: &str) -> Result<()> {
        let tmp = format!("{path}.tmp");
        let cmd = Command::new(vec!["mv".to_string(), tmp, path.to_string()], RELOAD_TIMEOUT);
        let output = self.ssh.run(&self.target(), &cmd).await?;
        if !output.success() {
            return Err(ProxyError::ValidationFailed(output.stderr));
        }
        Ok(())
    }

    async fn remove_file(&self, path: &str) -> Result<()> {
        let cmd = Command::new(vec!["rm".to_string(), "-f".to_string(), path.to_string()], RELOAD_TIMEOUT);
        self.ssh.run(&self.target(), &cmd).await?;
        Ok(())
    }

    async fn read_file(&self, path: &str) -> Result<String> {
        let cmd = Command::new(vec!["cat".to_string(), path.to_string()], RELOAD_TIMEOUT);
        let output = self.ssh.run(&self.target(), &cmd).await?;
        if !output.success() {
            return Err(ProxyError::NotFound(path.to_string()));
        }
        Ok(output.stdout)
    }

    async fn validate_config(&self) -> Result<()> {
        let cmd = Command::new(
            vec!["proximity-proxy".to_string(), "validate".to_string(), "/etc/proximity-proxy/Caddyfile".to_string()],
            RELOAD_TIMEOUT,
        );
        let output = self.ssh.run(&self.target(), &cmd).await?;
        if !output.success() {
            return Err(ProxyError::ValidationFailed(output.stderr));
        }
        Ok(())
    }

    /// Serializes reload against every other writer; a vhost change is
    /// only considered applied once this returns `Ok`.
    async fn reload(&self) -> Result<()> {
        let _guard = self.reload_lock.acquire().await.map_err(|e| ProxyError::ReloadFailed(e.to_string()))?;
        let cmd = Command::new(
            vec!["systemctl".to_string(), "reload".to_string(), "proximity-proxy".to_string()],
            RELOAD_TIMEOUT,
        );
        let output = self.ssh.run(&self.target(), &cmd).await?;
        if !output.success() {
            return Err(ProxyError::ReloadFailed(output.stderr));
        }
        Ok(())
    }

    async fn reload_or_degrade(&self, original: ProxyError) -> Result<()> {
        if self.reload().await.is_ok() {
            return Err(original);
        }
        error!("proxy rollback reload failed, entering degraded state");
        self.degraded.store(true, Ordering::SeqCst);
        Err(ProxyError::Degraded)
    }

    fn refuse_if_degraded(&self) -> Result<()> {
        if self.is_degraded() {
            return Err(ProxyError::Degraded);
        }
        Ok(())
    }

    /// Manual recovery entry point: clears the degraded flag so new
    /// operations are accepted again. Callers are expected to have fixed
    /// the underlying proxy engine state first.
    pub fn clear_degraded(&self) {
        self.degraded.store(false, Ordering::SeqCst);
    }
}

fn render_vhost(app_name: &str, backend_ip: &str, backend_port: u16, public_port: u16) -> String {
    format!(
        "# {app_name}\n:{public_port} {{\n    reverse_proxy {backend_ip}:{backend_port}\n    header -X-Frame-Options\n    header -Content-Security-Policy\n    log {{\n        output file /var/log/proximity-proxy/{app_name}.log\n    }}\n}}\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_vhost_contains_backend_and_public_port() {
        let content = render_vhost("web01", "10.20.0.101", 8080, 30001);
        assert!(content.contains(":30001"));
        assert!(content.contains("10.20.0.101:8080"));
        assert!(content.contains("web01"));
    }
}
