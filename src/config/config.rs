//! Process-level configuration.
//!
//! A TOML file loaded with `Configuration::load`: relative paths are
//! resolved against the config file's directory, required directories are
//! created eagerly, and every section falls back to sane defaults via
//! `serde(default)` when omitted.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

const PLACEHOLDER_CREDENTIAL: &str = "change_me_in_production";

#[derive(Debug, Clone, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    pub debug: bool,

    #[serde(default)]
    pub api: ApiConfiguration,

    pub hypervisor: HypervisorConfiguration,

    #[serde(default)]
    pub ssh: SshConfiguration,

    #[serde(default)]
    pub network: NetworkConfiguration,

    #[serde(default)]
    pub allocation: AllocationConfiguration,

    #[serde(default)]
    pub defaults: DefaultResourceConfiguration,

    #[serde(default)]
    pub appliance: ApplianceConfiguration,

    #[serde(default)]
    pub store: StoreConfiguration,

    #[serde(default)]
    pub catalog: CatalogConfiguration,
}

impl Configuration {
    /// Load configuration from a TOML file, resolving relative paths
    /// against the file's parent directory (or CWD if it has none), and
    /// creating required directories.
    pub fn load(path: &str) -> Result<Self> {
        let config_path = Path::new(path);
        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("failed to read config file: {path}"))?;

        let mut config: Configuration =
            toml::from_str(&content).with_context(|| "failed to parse configuration")?;

        let base_dir = config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

        config.store.resolve_paths(&base_dir);
        config.ssh.resolve_paths(&base_dir);
        config.catalog.resolve_paths(&base_dir);

        std::fs::create_dir_all(
            config
                .store
                .database_path
                .parent()
                .unwrap_or_else(|| Path::new(".")),
        )?;

        config.validate()?;
        Ok(config)
    }

    /// Rejects obviously-unrotated placeholder credentials.
    fn validate(&self) -> Result<()> {
        if self.hypervisor.token == PLACEHOLDER_CREDENTIAL {
            bail!("hypervisor.token is still the placeholder value; set a real credential");
        }
        if self.ssh.password.as_deref() == Some(PLACEHOLDER_CREDENTIAL) {
            bail!("ssh.password is still the placeholder value; set a real credential or use a key");
        }
        if self.allocation.container_id_range.0 >= self.allocation.container_id_range.1 {
            bail!("allocation.container_id_range must be a non-empty range");
        }
        if self.allocation.public_port_range.0 >= self.allocation.public_port_range.1 {
            bail!("allocation.public_port_range must be a non-empty range");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfiguration {
    #[serde(default = "default_api_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for ApiConfiguration {
    fn default() -> Self {
        Self { host: default_api_host(), port: default_api_port() }
    }
}

fn default_api_host() -> String {
    "0.0.0.0".into()
}

fn default_api_port() -> u16 {
    8080
}

/// Hypervisor (Proxmox VE) connection details.
#[derive(Clone, Deserialize)]
pub struct HypervisorConfiguration {
    pub host: String,
    #[serde(default = "default_hypervisor_port")]
    pub port: u16,
    pub user: String,
    /// API token secret, or password when `token_id` is absent.
    pub token: String,
    #[serde(default)]
    pub token_id: Option<String>,
    #[serde(default = "default_true")]
    pub verify_tls: bool,
    #[serde(default = "default_hypervisor_timeout")]
    pub request_timeout_secs: u64,
}

fn default_hypervisor_port() -> u16 {
    8006
}

fn default_hypervisor_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl std::fmt::Debug for HypervisorConfiguration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HypervisorConfiguration")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("token", &"<redacted>")
            .field("token_id", &self.token_id)
            .field("verify_tls", &self.verify_tls)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// SSH credentials for the Remote Executor.
#[derive(Clone, Deserialize)]
pub struct SshConfiguration {
    #[serde(default = "default_ssh_username")]
    pub username: String,
    #[serde(default)]
    pub key_path: Option<PathBuf>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_known_hosts_path")]
    pub known_hosts_path: PathBuf,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
    #[serde(default = "default_ssh_concurrency")]
    pub per_host_concurrency: usize,
}

impl std::fmt::Debug for SshConfiguration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshConfiguration")
            .field("username", &self.username)
            .field("key_path", &self.key_path)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("known_hosts_path", &self.known_hosts_path)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("command_timeout_secs", &self.command_timeout_secs)
            .field("per_host_concurrency", &self.per_host_concurrency)
            .finish()
    }
}

impl SshConfiguration {
    fn resolve_paths(&mut self, base_dir: &Path) {
        if let Some(key_path) = &self.key_path {
            if !key_path.is_absolute() {
                self.key_path = Some(base_dir.join(key_path));
            }
        }
        if !self.known_hosts_path.is_absolute() {
            self.known_hosts_path = base_dir.join(&self.known_hosts_path);
        }
    }
}

impl Default for SshConfiguration {
    fn default() -> Self {
        Self {
            username: default_ssh_username(),
            key_path: None,
            password: None,
            known_hosts_path: default_known_hosts_path(),
            connect_timeout_secs: default_connect_timeout(),
            command_timeout_secs: default_command_timeout(),
            per_host_concurrency: default_ssh_concurrency(),
        }
    }
}

fn default_ssh_username() -> String {
    "root".into()
}

fn default_known_hosts_path() -> PathBuf {
    PathBuf::from("known_hosts")
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_command_timeout() -> u64 {
    60
}

fn default_ssh_concurrency() -> usize {
    8
}

/// Application-bridge network parameters owned by the Network Appliance.
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfiguration {
    #[serde(default = "default_bridge_name")]
    pub bridge_name: String,
    #[serde(default = "default_subnet_cidr")]
    pub subnet_cidr: String,
    #[serde(default = "default_gateway_ip")]
    pub gateway_ip: String,
    #[serde(default = "default_dhcp_start")]
    pub dhcp_range_start: String,
    #[serde(default = "default_dhcp_end")]
    pub dhcp_range_end: String,
    #[serde(default = "default_dhcp_lease_hours")]
    pub dhcp_lease_hours: u32,
    #[serde(default = "default_dns_domain")]
    pub dns_domain: String,
}

impl Default for NetworkConfiguration {
    fn default() -> Self {
        Self {
            bridge_name: default_bridge_name(),
            subnet_cidr: default_subnet_cidr(),
            gateway_ip: default_gateway_ip(),
            dhcp_range_start: default_dhcp_start(),
            dhcp_range_end: default_dhcp_end(),
            dhcp_lease_hours: default_dhcp_lease_hours(),
            dns_domain: default_dns_domain(),
        }
    }
}

fn default_bridge_name() -> String {
    "proximity-lan".into()
}
fn default_subnet_cidr() -> String {
    "10.20.0.0/24".into()
}
fn default_gateway_ip() -> String {
    "10.20.0.1".into()
}
fn default_dhcp_start() -> String {
    "10.20.0.100".into()
}
fn default_dhcp_end() -> String {
    "10.20.0.250".into()
}
fn default_dhcp_lease_hours() -> u32 {
    12
}
fn default_dns_domain() -> String {
    "prox.local".into()
}

/// Container-id and public-port allocation ranges.
#[derive(Debug, Clone, Deserialize)]
pub struct AllocationConfiguration {
    #[serde(default = "default_container_id_range")]
    pub container_id_range: (u32, u32),
    #[serde(default = "default_public_port_range")]
    pub public_port_range: (u16, u16),
}

impl Default for AllocationConfiguration {
    fn default() -> Self {
        Self {
            container_id_range: default_container_id_range(),
            public_port_range: default_public_port_range(),
        }
    }
}

fn default_container_id_range() -> (u32, u32) {
    (200, 9999)
}
fn default_public_port_range() -> (u16, u16) {
    (30000, 40000)
}

/// Default resource spec applied when a catalog entry doesn't override it.
#[derive(Debug, Clone, Deserialize)]
pub struct DefaultResourceConfiguration {
    #[serde(default = "default_cpu_cores")]
    pub cpu_cores: u32,
    #[serde(default = "default_memory_mb")]
    pub memory_mb: u64,
    #[serde(default = "default_disk_gb")]
    pub disk_gb: u64,
}

impl Default for DefaultResourceConfiguration {
    fn default() -> Self {
        Self {
            cpu_cores: default_cpu_cores(),
            memory_mb: default_memory_mb(),
            disk_gb: default_disk_gb(),
        }
    }
}

fn default_cpu_cores() -> u32 {
    1
}
fn default_memory_mb() -> u64 {
    1024
}
fn default_disk_gb() -> u64 {
    8
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplianceConfiguration {
    #[serde(default = "default_appliance_container_id")]
    pub container_id: i64,
    /// Proxmox node the appliance container lives on.
    #[serde(default = "default_appliance_node")]
    pub node: String,
    /// LXC template used both for the appliance and application containers.
    #[serde(default = "default_template")]
    pub template: String,
}

impl Default for ApplianceConfiguration {
    fn default() -> Self {
        Self {
            container_id: default_appliance_container_id(),
            node: default_appliance_node(),
            template: default_template(),
        }
    }
}

fn default_appliance_container_id() -> i64 {
    100
}

fn default_appliance_node() -> String {
    "pve".into()
}

fn default_template() -> String {
    "local:vztmpl/debian-12-standard_12.2-1_amd64.tar.zst".into()
}

/// Catalog of deployable application templates, loaded from a directory
/// of TOML files at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfiguration {
    #[serde(default = "default_catalog_directory")]
    pub directory: PathBuf,
}

impl CatalogConfiguration {
    fn resolve_paths(&mut self, base_dir: &Path) {
        if !self.directory.is_absolute() {
            self.directory = base_dir.join(&self.directory);
        }
    }
}

impl Default for CatalogConfiguration {
    fn default() -> Self {
        Self { directory: default_catalog_directory() }
    }
}

fn default_catalog_directory() -> PathBuf {
    PathBuf::from("catalog")
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfiguration {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl StoreConfiguration {
    fn resolve_paths(&mut self, base_dir: &Path) {
        if !self.database_path.is_absolute() {
            self.database_path = base_dir.join(&self.database_path);
        }
    }
}

impl Default for StoreConfiguration {
    fn default() -> Self {
        Self { database_path: default_database_path() }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("proximity.sqlite3")
}

/// Reserved for catalog-entry resource overrides keyed by catalog id.
pub type OverheadOverrides = HashMap<String, u64>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_placeholder_hypervisor_token() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
            [hypervisor]
            host = "pve.example.com"
            user = "root@pam"
            token = "change_me_in_production"
            "#,
        )
        .unwrap();

        let err = Configuration::load(config_path.to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("placeholder"));
    }

    #[test]
    fn loads_with_defaults_when_valid() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
            [hypervisor]
            host = "pve.example.com"
            user = "root@pam"
            token = "s3cr3t"
            "#,
        )
        .unwrap();

        let config = Configuration::load(config_path.to_str().unwrap()).unwrap();
        assert_eq!(config.allocation.container_id_range, (200, 9999));
        assert_eq!(config.network.dns_domain, "prox.local");
        assert!(config.store.database_path.is_absolute());
    }

    #[test]
    fn rejects_inverted_allocation_ranges() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
            [hypervisor]
            host = "pve.example.com"
            user = "root@pam"
            token = "s3cr3t"

            [allocation]
            container_id_range = [9999, 200]
            "#,
        )
        .unwrap();

        let err = Configuration::load(config_path.to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("non-empty range"));
    }
}
