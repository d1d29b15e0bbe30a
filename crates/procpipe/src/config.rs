//! Process configuration
//!
//! Options are resolved once at spawn time: every field the caller left
//! unset is taken from the process-wide [`Policy`] defaults, producing the
//! immutable snapshot stored on the handle.

use std::collections::HashMap;
use std::fs::File;
use std::path::PathBuf;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::codec::Encoding;
use crate::communicate::StdinSource;

/// Process-wide defaults
static DEFAULTS: Lazy<RwLock<Policy>> = Lazy::new(|| RwLock::new(Policy::default()));

/// Resolved policy of one process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    /// Reject a non-zero exit code
    pub check_exit_code: bool,
    /// Reject termination by a signal
    pub check_signal_code: bool,
    /// Decoding applied to captured output
    pub encoding: Encoding,
    /// Trim surrounding whitespace of textual output
    pub trim_output: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            check_exit_code: true,
            check_signal_code: true,
            encoding: Encoding::Utf8,
            trim_output: true,
        }
    }
}

/// Current process-wide defaults
pub fn defaults() -> Policy {
    *DEFAULTS.read()
}

/// Replace the process-wide defaults used by later spawns
pub fn set_defaults(policy: Policy) {
    *DEFAULTS.write() = policy;
}

/// Restore the built-in defaults
pub fn reset_defaults() {
    set_defaults(Policy::default());
}

/// Where a standard stream of the child goes
#[derive(Debug, Default)]
pub enum StdioConfig {
    /// Pipe to the parent, exposed on the handle
    #[default]
    Pipe,
    /// Connect to the null device
    Ignore,
    /// Share the parent's stream
    Inherit,
    /// Redirect to an open file or descriptor
    File(File),
}

impl StdioConfig {
    /// Whether the slot will be exposed as a stream handle
    pub fn is_piped(&self) -> bool {
        matches!(self, Self::Pipe)
    }

    pub(crate) fn into_stdio(self) -> std::process::Stdio {
        match self {
            Self::Pipe => std::process::Stdio::piped(),
            Self::Ignore => std::process::Stdio::null(),
            Self::Inherit => std::process::Stdio::inherit(),
            Self::File(file) => std::process::Stdio::from(file),
        }
    }
}

/// Caller-supplied options
///
/// Unset policy fields fall back to [`defaults()`]. `stdin` carries input
/// content for [`execute`](crate::execute); [`ProcessHandle::spawn`](crate::ProcessHandle::spawn)
/// only looks at `stdin_config`.
#[derive(Debug, Default)]
pub struct Options {
    /// Reject a non-zero exit code
    pub check_exit_code: Option<bool>,
    /// Reject termination by a signal
    pub check_signal_code: Option<bool>,
    /// Decoding applied to captured output
    pub encoding: Option<Encoding>,
    /// Trim surrounding whitespace of textual output
    pub trim_output: Option<bool>,
    /// Working directory (None = current dir)
    pub cwd: Option<PathBuf>,
    /// Environment variables (added to parent env)
    pub env: HashMap<String, String>,
    /// Start from an empty environment
    pub env_clear: bool,
    /// Input fed to the child by `execute`
    pub stdin: Option<StdinSource>,
    /// stdin slot used by `spawn`
    pub stdin_config: StdioConfig,
    /// stdout slot
    pub stdout: StdioConfig,
    /// stderr slot
    pub stderr: StdioConfig,
}

impl Options {
    /// Create options that defer everything to the defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable/disable the exit code check
    pub fn check_exit_code(mut self, check: bool) -> Self {
        self.check_exit_code = Some(check);
        self
    }

    /// Enable/disable the signal check
    pub fn check_signal_code(mut self, check: bool) -> Self {
        self.check_signal_code = Some(check);
        self
    }

    /// Set output encoding
    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    /// Enable/disable output trimming
    pub fn trim_output(mut self, trim: bool) -> Self {
        self.trim_output = Some(trim);
        self
    }

    /// Set working directory
    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Add environment variable
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Do not inherit the parent environment
    pub fn env_clear(mut self) -> Self {
        self.env_clear = true;
        self
    }

    /// Set input content
    pub fn stdin(mut self, input: impl Into<StdinSource>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Configure the stdin slot
    pub fn stdin_config(mut self, config: StdioConfig) -> Self {
        self.stdin_config = config;
        self
    }

    /// Configure the stdout slot
    pub fn stdout(mut self, config: StdioConfig) -> Self {
        self.stdout = config;
        self
    }

    /// Configure the stderr slot
    pub fn stderr(mut self, config: StdioConfig) -> Self {
        self.stderr = config;
        self
    }

    /// Overlay the caller's policy fields on the current defaults
    pub fn resolve(&self) -> Policy {
        let base = defaults();
        Policy {
            check_exit_code: self.check_exit_code.unwrap_or(base.check_exit_code),
            check_signal_code: self.check_signal_code.unwrap_or(base.check_signal_code),
            encoding: self.encoding.unwrap_or(base.encoding),
            trim_output: self.trim_output.unwrap_or(base.trim_output),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_default() {
        let policy = Policy::default();
        assert!(policy.check_exit_code);
        assert!(policy.check_signal_code);
        assert_eq!(policy.encoding, Encoding::Utf8);
        assert!(policy.trim_output);
    }

    #[test]
    fn test_explicit_fields_win() {
        let policy = Options::new()
            .check_exit_code(false)
            .check_signal_code(false)
            .encoding(Encoding::Raw)
            .trim_output(false)
            .resolve();

        assert_eq!(
            policy,
            Policy {
                check_exit_code: false,
                check_signal_code: false,
                encoding: Encoding::Raw,
                trim_output: false,
            }
        );
    }

    #[test]
    fn test_builder() {
        let options = Options::new()
            .cwd("/tmp")
            .env("KEY", "value")
            .env_clear()
            .stdin("input")
            .stdout(StdioConfig::Ignore);

        assert_eq!(options.cwd, Some(PathBuf::from("/tmp")));
        assert_eq!(options.env.get("KEY"), Some(&"value".to_string()));
        assert!(options.env_clear);
        assert!(options.stdin.is_some());
        assert!(options.stdin_config.is_piped());
        assert!(!options.stdout.is_piped());
    }

    #[test]
    fn test_policy_partial_deserialize() {
        let policy: Policy = serde_json::from_str(r#"{"trim_output": false}"#).unwrap();
        assert!(!policy.trim_output);
        assert!(policy.check_exit_code);
        assert_eq!(policy.encoding, Encoding::Utf8);
    }
}
