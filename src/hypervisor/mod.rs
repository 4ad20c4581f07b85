//! Hypervisor Driver (C2): typed facade over the Proxmox VE HTTP API.

mod client;
mod errors;
mod types;

pub use client::{HypervisorClient, SharedHypervisorClient};
pub use errors::{HypervisorError, Result};
pub use types::{
    select_best_node, ConfigUpdate, ContainerStatus, LxcSpec, NodeStats, TaskHandle, TaskState,
    TemplateInfo,
};
