//! SQLite-backed persistence for applications, logs, port allocations,
//! backup metadata, and the appliance singleton record.
//!
//! A single `Connection` guarded by a `parking_lot::Mutex`, with a
//! startup batch of `CREATE TABLE IF NOT EXISTS` statements. WAL mode is
//! enabled so readers don't block behind the writer.

use std::collections::HashMap;
use std::path::Path;

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use super::errors::{Result, StoreError};
use super::models::{
    Application, ApplianceInfo, ApplicationState, AuditLog, Backup, BackupMode, BackupStatus,
    DeploymentLog, LogLevel, PortAllocation, PortAllocationStatus, ResourceSpec,
};

pub struct Store {
    conn: Mutex<Connection>,
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS applications (
    id              TEXT PRIMARY KEY,
    catalog_id      TEXT NOT NULL,
    hostname        TEXT NOT NULL,
    container_id    INTEGER,
    node            TEXT,
    private_ip      TEXT,
    public_port     INTEGER,
    state           TEXT NOT NULL,
    cpu_cores       INTEGER NOT NULL,
    memory_mb       INTEGER NOT NULL,
    disk_gb         INTEGER NOT NULL,
    ports_json      TEXT NOT NULL,
    volumes_json    TEXT NOT NULL,
    environment_json TEXT NOT NULL,
    owner           TEXT NOT NULL,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    error_message   TEXT
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_applications_hostname_active
    ON applications(hostname) WHERE state != 'deleted';
CREATE UNIQUE INDEX IF NOT EXISTS idx_applications_node_container_active
    ON applications(node, container_id) WHERE state != 'deleted';
CREATE UNIQUE INDEX IF NOT EXISTS idx_applications_port_active
    ON applications(public_port) WHERE state != 'deleted';

CREATE TABLE IF NOT EXISTS deployment_logs (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    application_id  TEXT NOT NULL,
    timestamp       TEXT NOT NULL,
    level           TEXT NOT NULL,
    step            TEXT NOT NULL,
    message         TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_deployment_logs_app ON deployment_logs(application_id, id);

CREATE TABLE IF NOT EXISTS audit_logs (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    actor           TEXT NOT NULL,
    action          TEXT NOT NULL,
    target_application_id TEXT,
    timestamp       TEXT NOT NULL,
    source_ip       TEXT,
    details_json    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS port_allocations (
    public_port     INTEGER PRIMARY KEY,
    application_id  TEXT NOT NULL,
    status          TEXT NOT NULL,
    allocated_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS backups (
    id              TEXT PRIMARY KEY,
    application_id  TEXT NOT NULL,
    size_bytes      INTEGER NOT NULL,
    created_at      TEXT NOT NULL,
    status          TEXT NOT NULL,
    mode            TEXT NOT NULL,
    compression     TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_backups_app ON backups(application_id);

CREATE TABLE IF NOT EXISTS appliance_info (
    id              INTEGER PRIMARY KEY CHECK (id = 1),
    container_id    INTEGER NOT NULL,
    wan_ip          TEXT,
    lan_ip          TEXT NOT NULL,
    bridge_name     TEXT NOT NULL,
    subnet          TEXT NOT NULL,
    dhcp_range_start TEXT NOT NULL,
    dhcp_range_end  TEXT NOT NULL,
    dns_domain      TEXT NOT NULL,
    dhcp_healthy    INTEGER NOT NULL,
    dns_healthy     INTEGER NOT NULL,
    nat_healthy     INTEGER NOT NULL,
    proxy_healthy   INTEGER NOT NULL
);
"#;

impl Store {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    // ---------------------------------------------------------------
    // Applications
    // ---------------------------------------------------------------

    pub fn insert_application(&self, app: &Application) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO applications
                (id, catalog_id, hostname, container_id, node, private_ip, public_port,
                 state, cpu_cores, memory_mb, disk_gb, ports_json, volumes_json,
                 environment_json, owner, created_at, updated_at, error_message)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18)",
            params![
                app.id,
                app.catalog_id,
                app.hostname,
                app.container_id,
                app.node,
                app.private_ip,
                app.public_port,
                app.state.to_string(),
                app.resources.cpu_cores,
                app.resources.memory_mb,
                app.resources.disk_gb,
                serde_json::to_string(&app.ports)?,
                serde_json::to_string(&app.volumes)?,
                serde_json::to_string(&app.environment)?,
                app.owner,
                app.created_at.to_rfc3339(),
                app.updated_at.to_rfc3339(),
                app.error_message,
            ],
        )
        .map_err(map_unique_violation)?;
        Ok(())
    }

    /// Replaces the entire row, including a full reassignment of the
    /// `ports`/`environment` JSON columns — never an in-place patch.
    pub fn update_application(&self, app: &Application) -> Result<()> {
        let conn = self.conn.lock();
        let changed = conn
            .execute(
                "UPDATE applications SET
                    catalog_id=?2, hostname=?3, container_id=?4, node=?5, private_ip=?6,
                    public_port=?7, state=?8, cpu_cores=?9, memory_mb=?10, disk_gb=?11,
                    ports_json=?12, volumes_json=?13, environment_json=?14, owner=?15,
                    updated_at=?16, error_message=?17
                 WHERE id=?1",
                params![
                    app.id,
                    app.catalog_id,
                    app.hostname,
                    app.container_id,
                    app.node,
                    app.private_ip,
                    app.public_port,
                    app.state.to_string(),
                    app.resources.cpu_cores,
                    app.resources.memory_mb,
                    app.resources.disk_gb,
                    serde_json::to_string(&app.ports)?,
                    serde_json::to_string(&app.volumes)?,
                    serde_json::to_string(&app.environment)?,
                    app.owner,
                    app.updated_at.to_rfc3339(),
                    app.error_message,
                ],
            )
            .map_err(map_unique_violation)?;
        if changed == 0 {
            return Err(StoreError::NotFound(app.id.clone()));
        }
        Ok(())
    }

    pub fn get_application(&self, id: &str) -> Result<Application> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, catalog_id, hostname, container_id, node, private_ip, public_port,
                    state, cpu_cores, memory_mb, disk_gb, ports_json, volumes_json,
                    environment_json, owner, created_at, updated_at, error_message
             FROM applications WHERE id = ?1",
            params![id],
            row_to_application,
        )
        .optional()?
        .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    pub fn find_application_by_hostname(&self, hostname: &str) -> Result<Option<Application>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, catalog_id, hostname, container_id, node, private_ip, public_port,
                    state, cpu_cores, memory_mb, disk_gb, ports_json, volumes_json,
                    environment_json, owner, created_at, updated_at, error_message
             FROM applications WHERE hostname = ?1 AND state != 'deleted'",
            params![hostname],
            row_to_application,
        )
        .optional()
        .map_err(StoreError::from)
    }

    pub fn list_applications(&self) -> Result<Vec<Application>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, catalog_id, hostname, container_id, node, private_ip, public_port,
                    state, cpu_cores, memory_mb, disk_gb, ports_json, volumes_json,
                    environment_json, owner, created_at, updated_at, error_message
             FROM applications WHERE state != 'deleted' ORDER BY created_at",
        )?;
        let rows = stmt.query_map([], row_to_application)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
    }

    /// Hard-deletes the application row. Call site is responsible for
    /// releasing the port and vhost first, inside the same logical
    /// transaction scope.
    pub fn delete_application(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock();
        let changed = conn.execute("DELETE FROM applications WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    pub fn max_allocated_container_id(&self) -> Result<Option<i64>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT MAX(container_id) FROM applications WHERE state != 'deleted'",
            [],
            |row| row.get(0),
        )
        .map_err(StoreError::from)
    }

    // ---------------------------------------------------------------
    // Deployment logs (append-only, never mutated)
    // ---------------------------------------------------------------

    pub fn append_deployment_log(
        &self,
        application_id: &str,
        level: LogLevel,
        step: &str,
        message: &str,
    ) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO deployment_logs (application_id, timestamp, level, step, message)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                application_id,
                Utc::now().to_rfc3339(),
                level.to_string(),
                step,
                message
            ],
        )?;
        Ok(())
    }

    pub fn list_deployment_logs(&self, application_id: &str) -> Result<Vec<DeploymentLog>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, application_id, timestamp, level, step, message
             FROM deployment_logs WHERE application_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![application_id], |row| {
            Ok(DeploymentLog {
                id: row.get(0)?,
                application_id: row.get(1)?,
                timestamp: parse_dt(row.get::<_, String>(2)?),
                level: parse_level(row.get::<_, String>(3)?),
                step: row.get(4)?,
                message: row.get(5)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
    }

    // ---------------------------------------------------------------
    // Audit logs (append-only, independent of deployment logs)
    // ---------------------------------------------------------------

    pub fn append_audit_log(
        &self,
        actor: &str,
        action: &str,
        target_application_id: Option<&str>,
        source_ip: Option<&str>,
        details: serde_json::Value,
    ) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO audit_logs (actor, action, target_application_id, timestamp, source_ip, details_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                actor,
                action,
                target_application_id,
                Utc::now().to_rfc3339(),
                source_ip,
                serde_json::to_string(&details)?,
            ],
        )?;
        Ok(())
    }

    pub fn list_audit_logs(&self, target_application_id: Option<&str>) -> Result<Vec<AuditLog>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, actor, action, target_application_id, timestamp, source_ip, details_json
             FROM audit_logs
             WHERE (?1 IS NULL OR target_application_id = ?1)
             ORDER BY id",
        )?;
        let rows = stmt.query_map(params![target_application_id], |row| {
            let details_json: String = row.get(6)?;
            Ok(AuditLog {
                id: row.get(0)?,
                actor: row.get(1)?,
                action: row.get(2)?,
                target_application_id: row.get(3)?,
                timestamp: parse_dt(row.get::<_, String>(4)?),
                source_ip: row.get(5)?,
                details: serde_json::from_str(&details_json).unwrap_or(serde_json::Value::Null),
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
    }

    // ---------------------------------------------------------------
    // Port allocations — the Resource Allocator is the sole writer.
    // Released allocations are hard-deleted so the port is immediately reusable.
    // ---------------------------------------------------------------

    pub fn insert_port_allocation(&self, public_port: u16, application_id: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO port_allocations (public_port, application_id, status, allocated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                public_port,
                application_id,
                PortAllocationStatus::Allocated.to_string(),
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(map_unique_violation)?;
        Ok(())
    }

    pub fn release_port_allocation(&self, public_port: u16) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM port_allocations WHERE public_port = ?1",
            params![public_port],
        )?;
        Ok(())
    }

    pub fn is_port_allocated(&self, public_port: u16) -> Result<bool> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM port_allocations WHERE public_port = ?1 AND status = 'allocated'",
            params![public_port],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn max_allocated_port(&self) -> Result<Option<u16>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT MAX(public_port) FROM port_allocations WHERE status = 'allocated'",
            [],
            |row| row.get(0),
        )
        .map_err(StoreError::from)
    }

    // ---------------------------------------------------------------
    // Backups (metadata only)
    // ---------------------------------------------------------------

    pub fn insert_backup(&self, backup: &Backup) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO backups (id, application_id, size_bytes, created_at, status, mode, compression)
             VALUES (?1,?2,?3,?4,?5,?6,?7)",
            params![
                backup.id,
                backup.application_id,
                backup.size_bytes,
                backup.created_at.to_rfc3339(),
                status_str(backup.status),
                mode_str(backup.mode),
                backup.compression,
            ],
        )?;
        Ok(())
    }

    pub fn list_backups_for_application(&self, application_id: &str) -> Result<Vec<Backup>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, application_id, size_bytes, created_at, status, mode, compression
             FROM backups WHERE application_id = ?1 ORDER BY created_at",
        )?;
        let rows = stmt.query_map(params![application_id], |row| {
            Ok(Backup {
                id: row.get(0)?,
                application_id: row.get(1)?,
                size_bytes: row.get(2)?,
                created_at: parse_dt(row.get::<_, String>(3)?),
                status: parse_backup_status(row.get::<_, String>(4)?),
                mode: parse_backup_mode(row.get::<_, String>(5)?),
                compression: row.get(6)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
    }

    // ---------------------------------------------------------------
    // Appliance singleton
    // ---------------------------------------------------------------

    pub fn save_appliance_info(&self, info: &ApplianceInfo) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO appliance_info
                (id, container_id, wan_ip, lan_ip, bridge_name, subnet, dhcp_range_start,
                 dhcp_range_end, dns_domain, dhcp_healthy, dns_healthy, nat_healthy, proxy_healthy)
             VALUES (1,?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12)
             ON CONFLICT(id) DO UPDATE SET
                container_id=excluded.container_id, wan_ip=excluded.wan_ip,
                lan_ip=excluded.lan_ip, bridge_name=excluded.bridge_name,
                subnet=excluded.subnet, dhcp_range_start=excluded.dhcp_range_start,
                dhcp_range_end=excluded.dhcp_range_end, dns_domain=excluded.dns_domain,
                dhcp_healthy=excluded.dhcp_healthy, dns_healthy=excluded.dns_healthy,
                nat_healthy=excluded.nat_healthy, proxy_healthy=excluded.proxy_healthy",
            params![
                info.container_id,
                info.wan_ip,
                info.lan_ip,
                info.bridge_name,
                info.subnet,
                info.dhcp_range_start,
                info.dhcp_range_end,
                info.dns_domain,
                info.dhcp_healthy,
                info.dns_healthy,
                info.nat_healthy,
                info.proxy_healthy,
            ],
        )?;
        Ok(())
    }

    pub fn load_appliance_info(&self) -> Result<Option<ApplianceInfo>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT container_id, wan_ip, lan_ip, bridge_name, subnet, dhcp_range_start,
                    dhcp_range_end, dns_domain, dhcp_healthy, dns_healthy, nat_healthy, proxy_healthy
             FROM appliance_info WHERE id = 1",
            [],
            |row| {
                Ok(ApplianceInfo {
                    container_id: row.get(0)?,
                    wan_ip: row.get(1)?,
                    lan_ip: row.get(2)?,
                    bridge_name: row.get(3)?,
                    subnet: row.get(4)?,
                    dhcp_range_start: row.get(5)?,
                    dhcp_range_end: row.get(6)?,
                    dns_domain: row.get(7)?,
                    dhcp_healthy: row.get(8)?,
                    dns_healthy: row.get(9)?,
                    nat_healthy: row.get(10)?,
                    proxy_healthy: row.get(11)?,
                })
            },
        )
        .optional()
        .map_err(StoreError::from)
    }
}

fn map_unique_violation(e: rusqlite::Error) -> StoreError {
    if let rusqlite::Error::SqliteFailure(ref ffi, _) = e {
        if ffi.code == rusqlite::ErrorCode::ConstraintViolation {
            return StoreError::Conflict(e.to_string());
        }
    }
    StoreError::from(e)
}

fn row_to_application(row: &rusqlite::Row<'_>) -> rusqlite::Result<Application> {
    let ports_json: String = row.get(11)?;
    let volumes_json: String = row.get(12)?;
    let environment_json: String = row.get(13)?;
    Ok(Application {
        id: row.get(0)?,
        catalog_id: row.get(1)?,
        hostname: row.get(2)?,
        container_id: row.get(3)?,
        node: row.get(4)?,
        private_ip: row.get(5)?,
        public_port: row.get(6)?,
        state: parse_state(row.get::<_, String>(7)?),
        resources: ResourceSpec {
            cpu_cores: row.get(8)?,
            memory_mb: row.get(9)?,
            disk_gb: row.get(10)?,
        },
        ports: serde_json::from_str(&ports_json).unwrap_or_default(),
        volumes: serde_json::from_str(&volumes_json).unwrap_or_default(),
        environment: serde_json::from_str::<HashMap<String, String>>(&environment_json)
            .unwrap_or_default(),
        owner: row.get(14)?,
        created_at: parse_dt(row.get::<_, String>(15)?),
        updated_at: parse_dt(row.get::<_, String>(16)?),
        error_message: row.get(17)?,
    })
}

fn parse_dt(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_state(s: String) -> ApplicationState {
    match s.as_str() {
        "requested" => ApplicationState::Requested,
        "provisioning" => ApplicationState::Provisioning,
        "running" => ApplicationState::Running,
        "stopped" => ApplicationState::Stopped,
        "restarting" => ApplicationState::Restarting,
        "updating" => ApplicationState::Updating,
        "cloning" => ApplicationState::Cloning,
        "deleting" => ApplicationState::Deleting,
        "error" => ApplicationState::Error,
        _ => ApplicationState::Deleted,
    }
}

fn parse_level(s: String) -> LogLevel {
    match s.as_str() {
        "warn" => LogLevel::Warn,
        "error" => LogLevel::Error,
        _ => LogLevel::Info,
    }
}

fn status_str(s: BackupStatus) -> &'static str {
    match s {
        BackupStatus::Pending => "pending",
        BackupStatus::Complete => "complete",
        BackupStatus::Failed => "failed",
    }
}

fn mode_str(m: BackupMode) -> &'static str {
    match m {
        BackupMode::Full => "full",
        BackupMode::Incremental => "incremental",
    }
}

fn parse_backup_status(s: String) -> BackupStatus {
    match s.as_str() {
        "complete" => BackupStatus::Complete,
        "failed" => BackupStatus::Failed,
        _ => BackupStatus::Pending,
    }
}

fn parse_backup_mode(s: String) -> BackupMode {
    match s.as_str() {
        "incremental" => BackupMode::Incremental,
        _ => BackupMode::Full,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn sample_app(id: &str, hostname: &str) -> Application {
        let now = Utc::now();
        Application {
            id: id.to_string(),
            catalog_id: "nginx".to_string(),
            hostname: hostname.to_string(),
            container_id: Some(200),
            node: Some("pve1".to_string()),
            private_ip: None,
            public_port: Some(30000),
            state: ApplicationState::Provisioning,
            resources: ResourceSpec { cpu_cores: 1, memory_mb: 512, disk_gb: 4 },
            ports: HashMap::new(),
            volumes: Vec::new(),
            environment: HashMap::new(),
            owner: "user-1".to_string(),
            created_at: now,
            updated_at: now,
            error_message: None,
        }
    }

    #[test]
    fn insert_and_get_roundtrip() {
        let store = Store::open_in_memory().unwrap();
        let app = sample_app("app-1", "web01");
        store.insert_application(&app).unwrap();

        let fetched = store.get_application("app-1").unwrap();
        assert_eq!(fetched.hostname, "web01");
        assert_eq!(fetched.state, ApplicationState::Provisioning);
    }

    #[test]
    fn hostname_uniqueness_enforced_among_active() {
        let store = Store::open_in_memory().unwrap();
        store.insert_application(&sample_app("app-1", "web01")).unwrap();

        let mut dup = sample_app("app-2", "web01");
        dup.public_port = Some(30001);
        dup.container_id = Some(201);
        let err = store.insert_application(&dup).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn deleted_application_frees_hostname_and_port() {
        let store = Store::open_in_memory().unwrap();
        let mut app = sample_app("app-1", "web01");
        store.insert_application(&app).unwrap();

        app.state = ApplicationState::Deleted;
        store.update_application(&app).unwrap();
        store.delete_application("app-1").unwrap();

        assert!(store.find_application_by_hostname("web01").unwrap().is_none());
        assert!(store.get_application("app-1").is_err());
    }

    #[test]
    fn deployment_log_append_only_and_ordered() {
        let store = Store::open_in_memory().unwrap();
        store.insert_application(&sample_app("app-1", "web01")).unwrap();
        store.append_deployment_log("app-1", LogLevel::Info, "D1", "validated").unwrap();
        store.append_deployment_log("app-1", LogLevel::Info, "D2", "resolved catalog").unwrap();

        let logs = store.list_deployment_logs("app-1").unwrap();
        assert_eq!(logs.len(), 2);
        assert!(logs[0].id < logs[1].id);
        assert_eq!(logs[0].step, "D1");
    }

    #[test]
    fn port_allocation_release_frees_port_for_reuse() {
        let store = Store::open_in_memory().unwrap();
        store.insert_port_allocation(30000, "app-1").unwrap();
        assert!(store.is_port_allocated(30000).unwrap());

        store.release_port_allocation(30000).unwrap();
        assert!(!store.is_port_allocated(30000).unwrap());

        // freed port is immediately reusable by a different application
        store.insert_port_allocation(30000, "app-2").unwrap();
        assert!(store.is_port_allocated(30000).unwrap());
    }
}
