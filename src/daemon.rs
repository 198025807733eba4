use anyhow::Result;
use futures_lite::stream::StreamExt;
use swayipc_async::{Connection, Event, EventType, WindowChange};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::bindings::KeyBindings;
use crate::extension::Extension;
use crate::host::{Host, TimeoutId};
use crate::input::{KeyEvent, KeyState};
use crate::ipc::{IpcCommand, IpcResponse};
use crate::socket_server::IpcRequest;
use crate::sway_host::SwayHost;
use crate::window::WindowId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WindowEvent {
    Focus(WindowId),
    New(WindowId),
    Close(WindowId),
}

pub struct Daemon<H: Host> {
    host: H,
    extension: Extension,
    bindings: KeyBindings,
}

impl<H: Host> Daemon<H> {
    pub fn new(host: H, extension: Extension) -> Self {
        Daemon {
            host,
            extension,
            bindings: KeyBindings::default(),
        }
    }

    fn handle_key_event(&mut self, event: KeyEvent) {
        let Some(manager) = self.extension.manager() else {
            return;
        };

        match event.state {
            KeyState::Pressed => {
                let action = self.bindings.lookup(event.key, event.mods);
                if manager.key_press(&mut self.host, &event, action) {
                    return;
                }

                if let Some(binding) = action {
                    debug!("Key binding {} triggered", binding);
                    if let Err(e) = manager.start_switcher(&mut self.host, binding, event.mods) {
                        error!("Failed to start {}: {}", binding, e);
                    }
                }
            }
            KeyState::Released => manager.key_release(&mut self.host),
        }
    }

    fn handle_window_event(&mut self, event: WindowEvent) {
        let Some(manager) = self.extension.manager() else {
            return;
        };

        match event {
            WindowEvent::Focus(window_id) => {
                debug!("Window {} focused, updating recency order", window_id);
                manager.focus_changed(&mut self.host);
            }
            WindowEvent::New(window_id) => manager.window_added(window_id),
            WindowEvent::Close(window_id) => {
                debug!("Window {} closed", window_id);
                manager.window_removed(&mut self.host, window_id);
            }
        }
    }

    fn handle_timeout(&mut self, id: TimeoutId) {
        if let Some(manager) = self.extension.manager() {
            manager.timeout_elapsed(id);
        }
    }

    /// Apply an IPC command. The flag is `false` when the daemon should exit.
    fn handle_ipc_command(&mut self, command: IpcCommand) -> (IpcResponse, bool) {
        info!("IPC command: {}", command);

        match command {
            IpcCommand::Switch(binding) => {
                let Some(manager) = self.extension.manager() else {
                    return (IpcResponse::Error("Switcher is disabled".to_string()), true);
                };
                // Modifiers held right now decide whether the session stays open
                let mask = self.host.modifier_state();
                match manager.start_switcher(&mut self.host, binding, mask) {
                    Ok(_) => (IpcResponse::Ok, true),
                    Err(e) => (IpcResponse::Error(format!("{:#}", e)), true),
                }
            }
            IpcCommand::Status => {
                let enabled = self.extension.is_enabled();
                let status = self.extension.manager().map(|m| m.status());
                let response = IpcResponse::Status {
                    enabled,
                    switching: status.as_ref().is_some_and(|s| s.switching),
                    scope: status.as_ref().and_then(|s| s.scope),
                    window_count: status.as_ref().map_or(0, |s| s.window_count),
                    current_index: status.and_then(|s| s.current_index),
                };
                (response, true)
            }
            IpcCommand::Enable => {
                self.extension.enable();
                (IpcResponse::Ok, true)
            }
            IpcCommand::Disable => {
                self.extension.disable(&mut self.host);
                (IpcResponse::Ok, true)
            }
            IpcCommand::Shutdown => {
                self.extension.disable(&mut self.host);
                (IpcResponse::Ok, false)
            }
        }
    }
}

impl Daemon<SwayHost> {
    /// Main event loop
    pub async fn run(
        mut self,
        mut key_rx: mpsc::UnboundedReceiver<KeyEvent>,
        mut timeout_rx: mpsc::UnboundedReceiver<TimeoutId>,
        mut ipc_rx: mpsc::UnboundedReceiver<IpcRequest>,
    ) -> Result<()> {
        info!("Starting daemon event loop");

        // Create channel for window events
        let (window_tx, mut window_rx) = mpsc::unbounded_channel();

        let sway_events = tokio::spawn(async move {
            if let Err(e) = monitor_sway_events(window_tx).await {
                error!("Sway event monitoring error: {}", e);
            }
        });

        loop {
            tokio::select! {
                Some(key_event) = key_rx.recv() => {
                    self.handle_key_event(key_event);
                }
                Some(window_event) = window_rx.recv() => {
                    self.handle_window_event(window_event);
                }
                Some(id) = timeout_rx.recv() => {
                    // Cancelled timeouts may still be in flight
                    if self.host.timeout_fired(id) {
                        self.handle_timeout(id);
                    }
                }
                Some((command, respond)) = ipc_rx.recv() => {
                    let (response, keep_running) = self.handle_ipc_command(command);
                    if respond.send(response).is_err() {
                        warn!("IPC client went away before the response");
                    }
                    if !keep_running {
                        info!("Shutdown requested");
                        break;
                    }
                }
                else => {
                    info!("All channels closed, shutting down");
                    break;
                }
            }
        }

        sway_events.abort();
        Ok(())
    }
}

/// Monitor Sway events for window changes
async fn monitor_sway_events(window_tx: mpsc::UnboundedSender<WindowEvent>) -> Result<()> {
    let subs = [EventType::Window];
    let mut events = Connection::new().await?.subscribe(&subs).await?;

    info!("Subscribed to Sway window events");

    while let Some(event) = events.next().await {
        let Event::Window(e) = event? else {
            continue;
        };
        debug!("Sway window event: {:?} for container {}", e.change, e.container.id);

        // Containers without a pid are not windows
        if e.container.pid.is_none() {
            continue;
        }

        let id = e.container.id;
        let window_event = match e.change {
            WindowChange::Focus => WindowEvent::Focus(id),
            WindowChange::New => WindowEvent::New(id),
            WindowChange::Close => WindowEvent::Close(id),
            _ => continue,
        };

        if window_tx.send(window_event).is_err() {
            warn!("Failed to send window event, receiver dropped");
            break;
        }
    }

    Ok(())
}
