//! Safe argv quoting for the container-exec contract.
//!
//! The executor never interpolates caller-supplied strings into a shell
//! command; every argv element is individually quoted with `shell-words`,
//! then wrapped in the hypervisor's `pct exec <vmid> -- <argv...>` form.

use super::errors::{ExecutorError, Result};

/// Quote a single argv vector into a shell-safe string, for the `shell=true`
/// variant or for logging. Callers executing via the non-shell path never
/// need this directly; it exists so the same quoting primitive backs both.
pub fn quote_argv(argv: &[String]) -> String {
    shell_words::join(argv.iter().map(|s| s.as_str()))
}

/// Build the argv for `pct exec <container_id> -- <argv...>`, rejecting
/// empty commands up front.
pub fn pct_exec_argv(container_id: i64, argv: &[String]) -> Result<Vec<String>> {
    if argv.is_empty() {
        return Err(ExecutorError::InvalidArgument("command argv must not be empty".into()));
    }
    let mut full = vec!["pct".to_string(), "exec".to_string(), container_id.to_string(), "--".to_string()];
    full.extend(argv.iter().cloned());
    Ok(full)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_argv_escapes_shell_metacharacters() {
        let argv = vec!["echo".to_string(), "$(rm -rf /)".to_string()];
        let quoted = quote_argv(&argv);
        assert!(quoted.contains("'$(rm -rf /)'"));
    }

    #[test]
    fn pct_exec_argv_rejects_empty_command() {
        let err = pct_exec_argv(200, &[]).unwrap_err();
        assert!(matches!(err, ExecutorError::InvalidArgument(_)));
    }

    #[test]
    fn pct_exec_argv_preserves_literal_hostname_with_metacharacters() {
        // A command-injection probe: the hostname must reach the remote
        // process as a single literal argument, never re-parsed by a shell.
        let argv = vec!["touch".to_string(), "/tmp/; rm -rf /".to_string()];
        let full = pct_exec_argv(200, &argv).unwrap();
        assert_eq!(full, vec!["pct", "exec", "200", "--", "touch", "/tmp/; rm -rf /"]);
    }
}
