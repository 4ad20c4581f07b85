//! Loads catalog entries from a directory of TOML files at startup.
//! The catalog is read-only for the lifetime of the process; picking up
//! new entries requires a restart.

use std::path::Path;

use dashmap::DashMap;

use super::errors::{CatalogError, Result};
use super::CatalogEntry;

pub struct CatalogStore {
    entries: DashMap<String, CatalogEntry>,
}

impl CatalogStore {
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let entries = DashMap::new();
        if !dir.is_dir() {
            return Ok(Self { entries });
        }

        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                continue;
            }
            let content = std::fs::read_to_string(&path)?;
            let parsed: CatalogEntry = toml::from_str(&content)
                .map_err(|e| CatalogError::Parse(path.display().to_string(), e.to_string()))?;
            entries.insert(parsed.id.clone(), parsed);
        }

        Ok(Self { entries })
    }

    pub fn get(&self, id: &str) -> Result<CatalogEntry> {
        self.entries.get(id).map(|e| e.value().clone()).ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }

    pub fn list(&self) -> Vec<CatalogEntry> {
        self.entries.iter().map(|e| e.value().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_directory_yields_empty_catalog() {
        let store = CatalogStore::load_from_dir(Path::new("/nonexistent/path")).unwrap();
        assert!(store.list().is_empty());
    }

    #[test]
    fn loads_toml_entries_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("nextcloud.toml"),
            r#"
            id = "nextcloud"
            name = "Nextcloud"
            description = "file sync and share"
            category = "productivity"
            required_ports = [80]
            volumes = ["data"]
            compose_manifest = "services:\n  app:\n    image: nextcloud\n"

            [default_resources]
            cpu_cores = 2
            memory_mb = 2048
            disk_gb = 20

            [default_environment]
            TZ = "UTC"
            "#,
        )
        .unwrap();

        let store = CatalogStore::load_from_dir(dir.path()).unwrap();
        let entry = store.get("nextcloud").unwrap();
        assert_eq!(entry.name, "Nextcloud");
        assert_eq!(entry.required_ports, vec![80]);
    }
}
