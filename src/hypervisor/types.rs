//! Wire-level types for the hypervisor HTTP API facade.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeStats {
    pub name: String,
    pub cpu_load: f64,
    pub mem_used: u64,
    pub mem_total: u64,
    pub online: bool,
}

impl NodeStats {
    /// `0.5·(1 − cpu_load) + 0.5·(1 − mem_used/mem_total)`; higher is
    /// better. Offline nodes are filtered out by the caller, never scored.
    pub fn score(&self) -> f64 {
        let mem_used_fraction = if self.mem_total == 0 {
            1.0
        } else {
            self.mem_used as f64 / self.mem_total as f64
        };
        0.5 * (1.0 - self.cpu_load) + 0.5 * (1.0 - mem_used_fraction)
    }
}

/// Pick the highest-scoring node, breaking ties by lexicographic name.
/// Offline nodes never qualify.
pub fn select_best_node(nodes: &[NodeStats]) -> Option<&NodeStats> {
    nodes
        .iter()
        .filter(|n| n.online)
        .max_by(|a, b| {
            a.score()
                .partial_cmp(&b.score())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.name.cmp(&a.name))
        })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LxcSpec {
    pub node: String,
    pub container_id: i64,
    pub hostname: String,
    pub template: String,
    pub cpu_cores: u32,
    pub memory_mb: u64,
    pub disk_gb: u64,
    pub bridge: String,
    pub dhcp: bool,
    pub static_ip: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigUpdate {
    pub cpu_cores: Option<u32>,
    pub memory_mb: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerStatus {
    Running,
    Stopped,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskHandle {
    pub task_id: String,
    pub node: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    Running,
    Success,
    Failed(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateInfo {
    pub node: String,
    pub name: String,
    pub volid: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_node_prefers_lower_load() {
        let nodes = vec![
            NodeStats { name: "pve2".into(), cpu_load: 0.8, mem_used: 8, mem_total: 16, online: true },
            NodeStats { name: "pve1".into(), cpu_load: 0.1, mem_used: 4, mem_total: 16, online: true },
        ];
        let best = select_best_node(&nodes).unwrap();
        assert_eq!(best.name, "pve1");
    }

    #[test]
    fn best_node_excludes_offline_nodes() {
        let nodes = vec![
            NodeStats { name: "pve1".into(), cpu_load: 0.0, mem_used: 0, mem_total: 16, online: false },
            NodeStats { name: "pve2".into(), cpu_load: 0.9, mem_used: 15, mem_total: 16, online: true },
        ];
        let best = select_best_node(&nodes).unwrap();
        assert_eq!(best.name, "pve2");
    }

    #[test]
    fn best_node_breaks_ties_lexicographically() {
        let nodes = vec![
            NodeStats { name: "pve2".into(), cpu_load: 0.5, mem_used: 8, mem_total: 16, online: true },
            NodeStats { name: "pve1".into(), cpu_load: 0.5, mem_used: 8, mem_total: 16, online: true },
        ];
        let best = select_best_node(&nodes).unwrap();
        assert_eq!(best.name, "pve1");
    }

    #[test]
    fn no_eligible_node_when_all_offline() {
        let nodes = vec![NodeStats { name: "pve1".into(), cpu_load: 0.0, mem_used: 0, mem_total: 16, online: false }];
        assert!(select_best_node(&nodes).is_none());
    }
}
