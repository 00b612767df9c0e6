//! Outgoing MI command construction.
//!
//! Commands are built from a fixed operation keyword plus pre-formatted
//! argument strings; [`MiCommand::render`] produces the newline-terminated
//! wire line. No correlation tokens are used: the protocol is strictly
//! request/response in issue order, one command in flight at a time.

use std::fmt;

/// One MI command, e.g. `-break-insert main`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiCommand {
    operation: String,
    args: Vec<String>,
}

impl MiCommand {
    /// Create a command for the given operation, named without the leading
    /// dash (`"exec-run"`, `"break-insert"`, ...).
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            args: Vec::new(),
        }
    }

    /// Append one pre-formatted argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// The complete wire line, including the terminating newline.
    pub fn render(&self) -> String {
        format!("{self}\n")
    }
}

impl fmt::Display for MiCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-{}", self.operation)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
