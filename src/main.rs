mod bindings;
mod catalog;
mod config;
mod cursor;
mod daemon;
mod extension;
mod host;
mod input;
mod ipc;
mod keyboard_monitor;
mod manager;
mod presenter;
mod recency;
mod scope;
mod session;
mod socket_client;
mod socket_server;
mod sway_host;
mod timer;
mod window;

use anyhow::{Context, Result};
use config::Config;
use daemon::Daemon;
use extension::Extension;
use input::ModifierState;
use keyboard_monitor::KeyboardMonitor;
use presenter::StderrPresenter;
use std::fs;
use std::path::PathBuf;
use sway_host::SwayHost;
use timer::TimerQueue;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Get the path to the pidfile
fn get_pidfile_path() -> Result<PathBuf> {
    // Try to use XDG_RUNTIME_DIR, fall back to ~/.cache
    let runtime_dir = dirs::runtime_dir()
        .or_else(dirs::cache_dir)
        .context("Could not determine runtime directory")?;

    Ok(runtime_dir.join("sway-coverswitch.pid"))
}

/// Check if another instance is already running
fn check_pidfile() -> Result<()> {
    let pidfile = get_pidfile_path()?;

    if pidfile.exists() {
        let pid_str = fs::read_to_string(&pidfile).context("Failed to read pidfile")?;
        let pid: i32 = pid_str.trim().parse().context("Invalid PID in pidfile")?;

        if process_exists(pid) {
            anyhow::bail!(
                "Another instance of sway-coverswitch is already running (PID: {}). \
                 If this is incorrect, remove the pidfile at: {}",
                pid,
                pidfile.display()
            );
        }

        info!("Removing stale pidfile (PID {} not found)", pid);
        if let Err(e) = fs::remove_file(&pidfile) {
            warn!("Failed to remove stale pidfile: {}", e);
        }
    }

    Ok(())
}

/// Check if a process with the given PID exists
fn process_exists(pid: i32) -> bool {
    // Signal 0 only checks for existence; EPERM means it exists under another user
    let ret = unsafe { libc::kill(pid, 0) };
    ret == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

/// Create the pidfile
fn create_pidfile() -> Result<PidfileGuard> {
    let pidfile = get_pidfile_path()?;
    let pid = std::process::id();

    fs::write(&pidfile, pid.to_string()).context("Failed to write pidfile")?;

    info!("Created pidfile at {} with PID {}", pidfile.display(), pid);

    Ok(PidfileGuard { path: pidfile })
}

/// Guard that removes the pidfile when dropped
struct PidfileGuard {
    path: PathBuf,
}

impl Drop for PidfileGuard {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            error!("Failed to remove pidfile: {}", e);
        } else {
            info!("Removed pidfile at {}", self.path.display());
        }
    }
}

fn main() -> Result<()> {
    let config = Config::parse();

    let log_level = if config.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    // Everything but `daemon` talks to a running daemon
    if let Some(command) = config.command().ipc_command() {
        socket_client::send_command_and_exit(command);
    }

    info!("Starting sway-coverswitch daemon");

    check_pidfile()?;

    // Removed again when the guard is dropped
    let _pidfile_guard = create_pidfile()?;

    keyboard_monitor::check_permissions(config.device.as_deref())?;

    // All switcher state lives on one thread; see `Daemon::run`
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")?;

    runtime.block_on(run_daemon(config))
}

async fn run_daemon(config: Config) -> Result<()> {
    let (key_tx, key_rx) = mpsc::unbounded_channel();
    let (timeout_tx, timeout_rx) = mpsc::unbounded_channel();

    let modifiers = ModifierState::new();
    let keyboard_monitor = KeyboardMonitor::new(config.device.as_deref(), modifiers.clone())?;

    // Spawn keyboard monitoring in a dedicated blocking thread
    std::thread::spawn(move || {
        if let Err(e) = keyboard_monitor.monitor_blocking(key_tx) {
            error!("Keyboard monitor error: {}", e);
        }
    });

    let (ipc_rx, _socket_guard) = socket_server::start_server().await?;

    let host = SwayHost::new(
        config.grab_mode.clone(),
        modifiers,
        TimerQueue::new(timeout_tx),
    )?;

    let mut extension = Extension::new(config.manager_settings(), || {
        Box::new(StderrPresenter::new())
    });
    extension.enable();

    Daemon::new(host, extension)
        .run(key_rx, timeout_rx, ipc_rx)
        .await?;

    info!("Daemon exited normally");
    Ok(())
}
