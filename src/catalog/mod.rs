//! Read-only catalog of deployable application templates.
//!
//! A catalog entry is an external collaborator: the core never mutates
//! it, only resolves an id to a full `CatalogEntry` and merges it with
//! caller-supplied overrides during deployment.

mod errors;
mod store;

pub use errors::{CatalogError, Result};
pub use store::CatalogStore;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::store::models::ResourceSpec;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub default_resources: ResourceSpec,
    /// Container-port numbers the application expects to publish.
    pub required_ports: Vec<u16>,
    pub default_environment: HashMap<String, String>,
    pub volumes: Vec<String>,
    /// Opaque compose manifest text, transferred and executed as-is
    /// inside the container.
    pub compose_manifest: String,
}

/// Resource and environment overrides supplied at deploy time, merged
/// over the catalog entry's defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigOverrides {
    pub cpu_cores: Option<u32>,
    pub memory_mb: Option<u64>,
    pub disk_gb: Option<u64>,
    pub environment: Option<HashMap<String, String>>,
}

impl CatalogEntry {
    /// Merges deploy-time overrides with catalog defaults. Overrides
    /// replace rather than merge per-field for resources; `environment`
    /// overrides are merged key-by-key over the defaults.
    pub fn merge(&self, overrides: &ConfigOverrides) -> (ResourceSpec, HashMap<String, String>) {
        let resources = ResourceSpec {
            cpu_cores: overrides.cpu_cores.unwrap_or(self.default_resources.cpu_cores),
            memory_mb: overrides.memory_mb.unwrap_or(self.default_resources.memory_mb),
            disk_gb: overrides.disk_gb.unwrap_or(self.default_resources.disk_gb),
        };

        let mut environment = self.default_environment.clone();
        if let Some(extra) = &overrides.environment {
            environment.extend(extra.clone());
        }

        (resources, environment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry() -> CatalogEntry {
        CatalogEntry {
            id: "nextcloud".into(),
            name: "Nextcloud".into(),
            description: "file sync and share".into(),
            category: "productivity".into(),
            default_resources: ResourceSpec { cpu_cores: 2, memory_mb: 2048, disk_gb: 20 },
            required_ports: vec![80],
            default_environment: [("TZ".to_string(), "UTC".to_string())].into_iter().collect(),
            volumes: vec!["data".into()],
            compose_manifest: "services:\n  app:\n    image: nextcloud\n".into(),
        }
    }

    #[test]
    fn merge_overrides_resources_and_extends_environment() {
        let entry = sample_entry();
        let overrides = ConfigOverrides {
            cpu_cores: Some(4),
            memory_mb: None,
            disk_gb: None,
            environment: Some([("FOO".to_string(), "bar".to_string())].into_iter().collect()),
        };
        let (resources, env) = entry.merge(&overrides);
        assert_eq!(resources.cpu_cores, 4);
        assert_eq!(resources.memory_mb, 2048);
        assert_eq!(env.get("TZ"), Some(&"UTC".to_string()));
        assert_eq!(env.get("FOO"), Some(&"bar".to_string()));
    }
}
