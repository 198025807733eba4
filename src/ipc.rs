use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::bindings::Binding;
use crate::scope::Scope;

/// Commands sent from CLI client to daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpcCommand {
    /// Trigger a switcher binding as if its keys had been pressed
    Switch(Binding),
    /// Query daemon status (for debugging)
    Status,
    /// Take over the switching bindings
    Enable,
    /// Hand the switching bindings back to Sway
    Disable,
    /// Shutdown the daemon gracefully
    Shutdown,
}

/// Response from daemon to CLI client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IpcResponse {
    /// Command executed successfully
    Ok,
    /// Error occurred
    Error(String),
    /// Status response
    Status {
        enabled: bool,
        switching: bool,
        scope: Option<Scope>,
        window_count: usize,
        current_index: Option<usize>,
    },
}

/// Get the path to the Unix socket
pub fn get_socket_path() -> Result<PathBuf> {
    let runtime_dir = dirs::runtime_dir()
        .or_else(dirs::cache_dir)
        .context("Could not determine runtime directory")?;

    Ok(runtime_dir.join("sway-coverswitch.sock"))
}

/// Error returned when parsing an invalid IpcCommand string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIpcCommandError;

impl fmt::Display for ParseIpcCommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid IPC command")
    }
}

impl std::error::Error for ParseIpcCommandError {}

impl FromStr for IpcCommand {
    type Err = ParseIpcCommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "status" => Ok(IpcCommand::Status),
            "enable" => Ok(IpcCommand::Enable),
            "disable" => Ok(IpcCommand::Disable),
            "shutdown" => Ok(IpcCommand::Shutdown),
            other => other
                .parse()
                .map(IpcCommand::Switch)
                .map_err(|_| ParseIpcCommandError),
        }
    }
}

impl fmt::Display for IpcCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IpcCommand::Switch(binding) => binding.name(),
            IpcCommand::Status => "status",
            IpcCommand::Enable => "enable",
            IpcCommand::Disable => "disable",
            IpcCommand::Shutdown => "shutdown",
        };
        write!(f, "{}", s)
    }
}
