//! Typed records persisted by the store.
//!
//! `Application` carries first-class resource columns rather than a
//! mutated-in-place JSON blob; `environment` and `ports` are the only
//! JSON columns, and every write replaces the whole value rather than
//! patching it.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationState {
    Requested,
    Provisioning,
    Running,
    Stopped,
    Restarting,
    Updating,
    Cloning,
    Deleting,
    Error,
    Deleted,
}

impl ApplicationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ApplicationState::Deleted)
    }

    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }
}

impl std::fmt::Display for ApplicationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ApplicationState::Requested => "requested",
            ApplicationState::Provisioning => "provisioning",
            ApplicationState::Running => "running",
            ApplicationState::Stopped => "stopped",
            ApplicationState::Restarting => "restarting",
            ApplicationState::Updating => "updating",
            ApplicationState::Cloning => "cloning",
            ApplicationState::Deleting => "deleting",
            ApplicationState::Error => "error",
            ApplicationState::Deleted => "deleted",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceSpec {
    pub cpu_cores: u32,
    pub memory_mb: u64,
    pub disk_gb: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: String,
    pub catalog_id: String,
    pub hostname: String,
    pub container_id: Option<i64>,
    pub node: Option<String>,
    pub private_ip: Option<String>,
    pub public_port: Option<u16>,
    pub state: ApplicationState,
    pub resources: ResourceSpec,
    /// container-port -> published-port, stored as a single JSON column.
    pub ports: HashMap<u16, u16>,
    pub volumes: Vec<String>,
    /// name -> value, stored as a single JSON column.
    pub environment: HashMap<String, String>,
    pub owner: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub error_message: Option<String>,
}

impl Application {
    pub fn backend_port(&self) -> Option<u16> {
        self.ports.values().next().copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// Append-only step record attached to one application. Never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentLog {
    pub id: i64,
    pub application_id: String,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub step: String,
    pub message: String,
}

/// Append-only record of user-initiated operations, independent of
/// `DeploymentLog`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: i64,
    pub actor: String,
    pub action: String,
    pub target_application_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub source_ip: Option<String>,
    pub details: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortAllocationStatus {
    Allocated,
    Released,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortAllocation {
    pub public_port: u16,
    pub application_id: String,
    pub status: PortAllocationStatus,
    pub allocated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupStatus {
    Pending,
    Complete,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupMode {
    Full,
    Incremental,
}

/// Metadata-only record; the backup subsystem proper is an external
/// collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Backup {
    pub id: String,
    pub application_id: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub status: BackupStatus,
    pub mode: BackupMode,
    pub compression: String,
}

/// Singleton process-wide record, loaded on startup and refreshed on
/// demand. See `appliance::info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplianceInfo {
    pub container_id: i64,
    pub wan_ip: Option<String>,
    pub lan_ip: String,
    pub bridge_name: String,
    pub subnet: String,
    pub dhcp_range_start: String,
    pub dhcp_range_end: String,
    pub dns_domain: String,
    pub dhcp_healthy: bool,
    pub dns_healthy: bool,
    pub nat_healthy: bool,
    pub proxy_healthy: bool,
}
