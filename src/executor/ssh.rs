//! SSH transport for the Remote Executor, built on `russh` as a client.
//!
//! Connections are pooled per host, concurrency is bounded by a per-host
//! semaphore (default 8), and host keys are checked against a
//! caller-supplied known-hosts set: an unrecognized or mismatched key is
//! always rejected, never trust-on-first-use.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use russh::client::{self, Handle};
use russh::ChannelMsg;
use russh_keys::key::PublicKey;
use tokio::sync::Semaphore;

use crate::config::SshConfiguration;

use super::errors::{ExecutorError, Result};
use super::quoting::pct_exec_argv;
use super::types::{Command, CommandOutput, Target};

/// Host identifier -> accepted public key fingerprint, loaded once at
/// startup from `SshConfiguration::known_hosts_path`.
pub type KnownHosts = HashMap<String, Vec<u8>>;

/// Parses a known-hosts file: one `host base64-encoded-key` pair per
/// line, blank lines and `#`-prefixed comments ignored. Missing file
/// yields an empty set, since a fresh install has trusted no hosts yet.
pub fn load_known_hosts(path: &std::path::Path) -> Result<KnownHosts> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(KnownHosts::new()),
        Err(e) => return Err(ExecutorError::InvalidArgument(format!("known_hosts: {e}"))),
    };

    let mut known_hosts = KnownHosts::new();
    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.splitn(2, char::is_whitespace);
        let host = parts.next().unwrap_or_default();
        let encoded_key = parts.next().unwrap_or_default().trim();
        if host.is_empty() || encoded_key.is_empty() {
            return Err(ExecutorError::InvalidArgument(format!("known_hosts: malformed entry on line {}", lineno + 1)));
        }
        use base64::Engine;
        let key = base64::engine::general_purpose::STANDARD
            .decode(encoded_key)
            .map_err(|e| ExecutorError::InvalidArgument(format!("known_hosts: invalid base64 on line {}: {e}", lineno + 1)))?;
        known_hosts.insert(host.to_string(), key);
    }
    Ok(known_hosts)
}

/// Builds the literal string sent to the remote `exec` channel. A shell
/// command against a container target is wrapped as
/// `pct exec <id> -- sh -c '<quoted>'` rather than rejected outright: the
/// whole shell string becomes one argv element, quoted the same way any
/// other argv element reaching `pct exec` would be.
fn build_exec_string(target: &Target, command: &Command) -> Result<String> {
    let (argv, join_raw) = match target {
        Target::Host(_) => (command.argv.clone(), command.shell),
        Target::Container { container_id, .. } => {
            if command.shell {
                let shell_command = command.argv.first().cloned().unwrap_or_default();
                (
                    vec![
                        "pct".to_string(),
                        "exec".to_string(),
                        container_id.to_string(),
                        "--".to_string(),
                        "sh".to_string(),
                        "-c".to_string(),
                        shell_command,
                    ],
                    false,
                )
            } else {
                (pct_exec_argv(*container_id, &command.argv)?, false)
            }
        }
    };

    Ok(if join_raw { argv.join(" ") } else { super::quoting::quote_argv(&argv) })
}

struct VerifyingHandler {
    host: String,
    known_hosts: Arc<KnownHosts>,
}

#[async_trait::async_trait]
impl client::Handler for VerifyingHandler {
    type Error = russh::Error;

    async fn check_server_key(&mut self, server_public_key: &PublicKey) -> std::result::Result<bool, Self::Error> {
        match self.known_hosts.get(&self.host) {
            Some(expected) => Ok(expected.as_slice() == server_public_key.public_key_bytes()),
            None => Ok(false),
        }
    }
}

struct HostPool {
    semaphore: Semaphore,
    handle: tokio::sync::Mutex<Option<Handle<VerifyingHandler>>>,
}

/// Connection pool and concurrency gate for SSH command execution,
/// keyed by hypervisor host identifier.
pub struct SshPool {
    config: Arc<SshConfiguration>,
    known_hosts: Arc<KnownHosts>,
    pools: DashMap<String, Arc<HostPool>>,
}

impl SshPool {
    pub fn new(config: Arc<SshConfiguration>, known_hosts: KnownHosts) -> Self {
        Self { config, known_hosts: Arc::new(known_hosts), pools: DashMap::new() }
    }

    fn pool_for(&self, host: &str) -> Arc<HostPool> {
        self.pools
            .entry(host.to_string())
            .or_insert_with(|| {
                Arc::new(HostPool {
                    semaphore: Semaphore::new(self.config.per_host_concurrency),
                    handle: tokio::sync::Mutex::new(None),
                })
            })
            .clone()
    }

    async fn connected_handle(&self, host: &str) -> Result<Handle<VerifyingHandler>> {
        let pool = self.pool_for(host);
        let mut guard = pool.handle.lock().await;
        if let Some(handle) = guard.as_ref() {
            // A dead session surfaces as a send error on first use; the
            // caller's run() treats that as SshUnavailable and the next
            // call through this path reconnects.
            return Ok(handle.clone());
        }

        let ssh_config = Arc::new(client::Config {
            connection_timeout: Some(Duration::from_secs(self.config.connect_timeout_secs)),
            ..Default::default()
        });
        let handler = VerifyingHandler { host: host.to_string(), known_hosts: self.known_hosts.clone() };

        let mut handle = client::connect(ssh_config, (host, 22), handler)
            .await
            .map_err(|e| ExecutorError::SshUnavailable(e.to_string()))?;

        let authenticated = match (&self.config.key_path, &self.config.password) {
            (Some(key_path), _) => {
                let key_pair = russh_keys::load_secret_key(key_path, None)
                    .map_err(|e| ExecutorError::SshUnavailable(format!("loading SSH key: {e}")))?;
                handle
                    .authenticate_publickey(&self.config.username, Arc::new(key_pair))
                    .await
                    .map_err(|e| ExecutorError::SshUnavailable(e.to_string()))?
            }
            (None, Some(password)) => handle
                .authenticate_password(&self.config.username, password)
                .await
                .map_err(|e| ExecutorError::SshUnavailable(e.to_string()))?,
            (None, None) => {
                return Err(ExecutorError::SshUnavailable(
                    "no SSH key or password configured".into(),
                ))
            }
        };

        if !authenticated {
            return Err(ExecutorError::SshUnavailable(format!("authentication rejected by {host}")));
        }

        *guard = Some(handle.clone());
        Ok(handle)
    }

    /// Execute a command against a target. Per-host concurrency is bounded
    /// by the pool's semaphore; retry is the caller's concern (the
    /// executor itself never retries).
    pub async fn run(&self, target: &Target, command: &Command) -> Result<CommandOutput> {
        let host = target.host().to_string();
        let pool = self.pool_for(&host);
        let _permit = pool
            .semaphore
            .acquire()
            .await
            .map_err(|_| ExecutorError::Cancelled)?;

        let exec_string = build_exec_string(target, command)?;

        let handle = self.connected_handle(&host).await?;
        let started = Instant::now();

        let run = async {
            let mut channel = handle
                .channel_open_session()
                .await
                .map_err(|e| ExecutorError::SshUnavailable(e.to_string()))?;
            channel
                .exec(true, exec_string.as_bytes())
                .await
                .map_err(|e| ExecutorError::SshUnavailable(e.to_string()))?;

            let mut stdout = Vec::new();
            let mut stderr = Vec::new();
            let mut exit_code: i32 = -1;

            loop {
                match channel.wait().await {
                    Some(ChannelMsg::Data { data }) => stdout.extend_from_slice(&data),
                    Some(ChannelMsg::ExtendedData { data, .. }) => stderr.extend_from_slice(&data),
                    Some(ChannelMsg::ExitStatus { exit_status }) => exit_code = exit_status as i32,
                    Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => break,
                    _ => {}
                }
            }

            Ok::<_, ExecutorError>((stdout, stderr, exit_code))
        };

        let (stdout, stderr, exit_code) = tokio::time::timeout(command.timeout, run)
            .await
            .map_err(|_| ExecutorError::CommandTimeout(command.timeout))??;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            exit_code,
            duration: started.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_is_created_lazily_per_host() {
        let config = Arc::new(SshConfiguration::default());
        let pool = SshPool::new(config, KnownHosts::new());
        assert_eq!(pool.pools.len(), 0);
        let _ = pool.pool_for("pve1");
        assert_eq!(pool.pools.len(), 1);
        let _ = pool.pool_for("pve1");
        assert_eq!(pool.pools.len(), 1, "same host reuses the same pool");
    }

    #[test]
    fn shell_command_against_container_wraps_as_pct_exec_sh_c() {
        let target = Target::Container { host: "pve1".to_string(), container_id: 200 };
        let command = Command::shell("cat > /etc/dnsmasq.conf << 'EOF'\ninterface=eth1\nEOF", Duration::from_secs(30));
        let exec_string = build_exec_string(&target, &command).unwrap();
        assert!(exec_string.starts_with("pct exec 200 -- sh -c "));
        assert!(exec_string.contains("interface=eth1"));
    }

    #[test]
    fn shell_command_against_host_is_sent_unwrapped() {
        let target = Target::Host("pve1".to_string());
        let command = Command::shell("echo hi", Duration::from_secs(30));
        let exec_string = build_exec_string(&target, &command).unwrap();
        assert_eq!(exec_string, "echo hi");
    }

    #[test]
    fn argv_command_against_container_still_uses_pct_exec() {
        let target = Target::Container { host: "pve1".to_string(), container_id: 200 };
        let command = Command::new(vec!["systemctl".to_string(), "status".to_string()], Duration::from_secs(10));
        let exec_string = build_exec_string(&target, &command).unwrap();
        assert_eq!(exec_string, "pct exec 200 -- systemctl status");
    }
}
