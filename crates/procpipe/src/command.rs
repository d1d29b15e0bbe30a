//! Command line normalization

use std::fmt;

use crate::error::{ProcessError, Result};

/// Shell used for flat string commands
pub const SHELL: &str = "/bin/sh";

/// A command as supplied by the caller.
///
/// A flat string is a shell command line and is handed to `/bin/sh -c`.
/// An argument vector goes to the OS verbatim, so quotes, whitespace and
/// metacharacters reach the child unmodified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandLine {
    /// Shell command line
    Shell(String),
    /// Program followed by its arguments
    Argv(Vec<String>),
}

impl CommandLine {
    /// Resolve into the argv passed to the OS
    pub fn to_argv(&self) -> Result<Vec<String>> {
        match self {
            Self::Shell(line) => {
                if line.trim().is_empty() {
                    return Err(ProcessError::InvalidConfig(
                        "command line is empty".to_string(),
                    ));
                }
                Ok(vec![SHELL.to_string(), "-c".to_string(), line.clone()])
            }
            Self::Argv(argv) => {
                if argv.first().map_or(true, |program| program.is_empty()) {
                    return Err(ProcessError::InvalidConfig(
                        "command vector must name a program".to_string(),
                    ));
                }
                Ok(argv.clone())
            }
        }
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shell(line) => f.write_str(line),
            Self::Argv(argv) => f.write_str(&argv.join(" ")),
        }
    }
}

impl From<&str> for CommandLine {
    fn from(line: &str) -> Self {
        Self::Shell(line.to_string())
    }
}

impl From<String> for CommandLine {
    fn from(line: String) -> Self {
        Self::Shell(line)
    }
}

impl From<Vec<String>> for CommandLine {
    fn from(argv: Vec<String>) -> Self {
        Self::Argv(argv)
    }
}

impl From<Vec<&str>> for CommandLine {
    fn from(argv: Vec<&str>) -> Self {
        Self::Argv(argv.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for CommandLine {
    fn from(argv: &[&str]) -> Self {
        Self::Argv(argv.iter().map(|arg| arg.to_string()).collect())
    }
}

impl From<&[String]> for CommandLine {
    fn from(argv: &[String]) -> Self {
        Self::Argv(argv.to_vec())
    }
}

impl<const N: usize> From<[&str; N]> for CommandLine {
    fn from(argv: [&str; N]) -> Self {
        Self::Argv(argv.iter().map(|arg| arg.to_string()).collect())
    }
}
