use anyhow::{Context, Result};
use evdev::{Device, InputEventKind, Key};
use std::path::Path;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::input::{KeyEvent, KeyState, Keysym, ModifierState, timestamp_ms};

pub struct KeyboardMonitor {
    device: Device,
    modifiers: ModifierState,
}

impl KeyboardMonitor {
    /// Open the given keyboard device, or find one
    pub fn new(path: Option<&Path>, modifiers: ModifierState) -> Result<Self> {
        let device = open_device(path)?;

        info!("Using keyboard device: {:?}", device.name());

        Ok(KeyboardMonitor { device, modifiers })
    }

    /// Read key events, keep the shared modifier state current and send every
    /// key transition through the channel.
    /// This runs in a blocking thread and communicates via the channel
    pub fn monitor_blocking(mut self, tx: mpsc::UnboundedSender<KeyEvent>) -> Result<()> {
        info!("Starting keyboard monitoring");

        loop {
            match self.device.fetch_events() {
                Ok(events) => {
                    for event in events {
                        let InputEventKind::Key(key) = event.kind() else {
                            continue;
                        };
                        let Some((key, state)) = translate(key, event.value()) else {
                            continue;
                        };

                        let mods = self.modifiers.apply(key, state);
                        let key_event = KeyEvent {
                            key,
                            state,
                            mods,
                            time: timestamp_ms(event.timestamp()),
                        };

                        debug!("Key event: {:?}", key_event);
                        if tx.send(key_event).is_err() {
                            warn!("Failed to send key event, receiver dropped");
                            return Ok(());
                        }
                    }
                }
                Err(e) => {
                    if e.kind() == std::io::ErrorKind::WouldBlock {
                        // No events available, sleep briefly
                        std::thread::sleep(std::time::Duration::from_millis(10));
                    } else {
                        return Err(e.into());
                    }
                }
            }
        }
    }
}

fn open_device(path: Option<&Path>) -> Result<Device> {
    match path {
        Some(path) => Device::open(path)
            .with_context(|| format!("Failed to open keyboard device {}", path.display())),
        None => find_keyboard_device().context("Failed to find keyboard device"),
    }
}

/// Find a suitable keyboard device from /dev/input/event*
fn find_keyboard_device() -> Result<Device> {
    // Look for a device that supports the keys the default bindings use
    for (_, device) in evdev::enumerate() {
        if let Some(keys) = device.supported_keys()
            && keys.contains(Key::KEY_LEFTALT)
            && keys.contains(Key::KEY_TAB)
            && keys.contains(Key::KEY_GRAVE)
            && keys.contains(Key::KEY_LEFTSHIFT)
        {
            debug!("Found suitable keyboard: {:?}", device.name());
            return Ok(device);
        }
    }

    anyhow::bail!(
        "No suitable keyboard device found. Make sure you have permission to read /dev/input/event* devices."
    )
}

/// Map an evdev key and value to a switcher key transition.
///
/// Autorepeat (value 2) counts as another press for regular keys so a held
/// Tab keeps cycling; repeated modifiers carry no new information.
fn translate(key: Key, value: i32) -> Option<(Keysym, KeyState)> {
    let keysym = match key {
        Key::KEY_TAB => Keysym::Tab,
        Key::KEY_GRAVE => Keysym::Grave,
        Key::KEY_ESC => Keysym::Escape,
        Key::KEY_Q => Keysym::Q,
        Key::KEY_LEFTSHIFT | Key::KEY_RIGHTSHIFT => Keysym::Shift,
        Key::KEY_LEFTCTRL | Key::KEY_RIGHTCTRL => Keysym::Control,
        Key::KEY_LEFTALT | Key::KEY_RIGHTALT => Keysym::Alt,
        Key::KEY_LEFTMETA | Key::KEY_RIGHTMETA => Keysym::Super,
        other => Keysym::Other(other.code()),
    };

    let state = match value {
        0 => KeyState::Released,
        1 => KeyState::Pressed,
        2 if keysym.modifier().is_none() => KeyState::Pressed,
        _ => return None,
    };

    Some((keysym, state))
}

/// Check if the current user has permission to read keyboard devices
pub fn check_permissions(path: Option<&Path>) -> Result<()> {
    match open_device(path) {
        Ok(_) => {
            info!("Keyboard device access OK");
            Ok(())
        }
        Err(e) => {
            eprintln!("ERROR: Cannot access keyboard devices.");
            eprintln!("This daemon needs permission to read /dev/input/event* devices.");
            eprintln!("\nTo fix this, add your user to the 'input' group:");
            eprintln!("  sudo usermod -aG input $USER");
            eprintln!("  (then log out and log back in)");
            Err(e)
        }
    }
}
