//! Types shared by the executor's public surface.

use std::time::Duration;

/// Where a command runs: on the hypervisor host itself, or inside one of
/// its containers via `pct exec`.
#[derive(Debug, Clone)]
pub enum Target {
    Host(String),
    Container { host: String, container_id: i64 },
}

impl Target {
    pub fn host(&self) -> &str {
        match self {
            Target::Host(h) => h,
            Target::Container { host, .. } => host,
        }
    }
}

/// A single command to execute, as an argv vector (never a raw shell
/// string) unless explicitly marked `shell`.
#[derive(Debug, Clone)]
pub struct Command {
    pub argv: Vec<String>,
    pub shell: bool,
    pub timeout: Duration,
}

impl Command {
    pub fn new(argv: Vec<String>, timeout: Duration) -> Self {
        Self { argv, shell: false, timeout }
    }

    /// Build from an already-quoted shell string. Callers must have
    /// quoted every interpolated value themselves.
    pub fn shell(command: impl Into<String>, timeout: Duration) -> Self {
        Self { argv: vec![command.into()], shell: true, timeout }
    }
}

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration: Duration,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}
