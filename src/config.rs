use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::bindings::Binding;
use crate::ipc::IpcCommand;
use crate::manager::ManagerSettings;
use crate::scope::ScopeFilter;

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run as daemon (default if no command specified)
    Daemon,
    /// Trigger a switcher binding in the running daemon
    Switch {
        #[arg(value_enum)]
        binding: Binding,
    },
    /// Query daemon status
    Status,
    /// Let the daemon take over the switching bindings
    Enable,
    /// Hand the switching bindings back to Sway
    Disable,
    /// Shutdown the daemon
    Shutdown,
}

impl Command {
    /// The IPC command a client invocation sends, `None` for the daemon itself.
    pub fn ipc_command(&self) -> Option<IpcCommand> {
        match self {
            Command::Daemon => None,
            Command::Switch { binding } => Some(IpcCommand::Switch(*binding)),
            Command::Status => Some(IpcCommand::Status),
            Command::Enable => Some(IpcCommand::Enable),
            Command::Disable => Some(IpcCommand::Disable),
            Command::Shutdown => Some(IpcCommand::Shutdown),
        }
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "sway-coverswitch")]
#[command(about = "Alt-Tab window switcher daemon for Sway", long_about = None)]
pub struct Config {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Keyboard device to read (default: first device with Alt, Tab and Grave)
    #[arg(short, long)]
    pub device: Option<PathBuf>,

    /// Sway binding mode entered while switching, holding the keyboard grab
    #[arg(long, value_name = "NAME")]
    pub grab_mode: Option<String>,

    /// Delay before the switcher is revealed, in milliseconds
    #[arg(long, default_value_t = 150)]
    pub popup_delay_ms: u64,

    /// Include skip-taskbar (scratchpad) windows when switching between all windows
    #[arg(long)]
    pub show_skip_taskbar: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Config {
    pub fn parse() -> Self {
        <Config as Parser>::parse()
    }

    /// Get the command, defaulting to Daemon if none specified
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Daemon)
    }

    pub fn manager_settings(&self) -> ManagerSettings {
        ManagerSettings {
            popup_delay: Duration::from_millis(self.popup_delay_ms),
            filter: ScopeFilter {
                hide_skip_taskbar: !self.show_skip_taskbar,
            },
        }
    }
}
