//! Remote Executor (C1): command execution on hypervisor hosts over SSH
//! and inside LXC containers via `pct exec`.

mod errors;
mod quoting;
mod ssh;
mod types;

pub use errors::{ExecutorError, Result};
pub use quoting::{pct_exec_argv, quote_argv};
pub use ssh::{load_known_hosts, KnownHosts, SshPool};
pub use types::{Command, CommandOutput, Target};
