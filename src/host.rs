//! Compositor abstraction.
//!
//! The switcher never talks to the compositor directly. Everything it needs,
//! from window enumeration to the modal grab and one-shot timers, goes through
//! this trait so the state machine can be driven by a mock in tests.

use anyhow::Result;
use std::time::Duration;

use crate::input::ModifierMask;
use crate::window::{Window, WindowId};

/// Handle of a pending one-shot timeout.
pub type TimeoutId = u64;

pub trait Host {
    /// Enumerate all manageable windows, in the compositor's enumeration order.
    fn list_windows(&mut self) -> Result<Vec<Window>>;

    /// The window currently holding input focus, if any
    fn focused_window(&mut self) -> Result<Option<WindowId>>;

    /// Name of the active workspace
    fn active_workspace(&mut self) -> Result<Option<String>>;

    /// Acquire the exclusive modal input grab.
    ///
    /// Returns `false` when another modal session already holds it or the
    /// compositor refuses.
    fn push_modal(&mut self) -> bool;

    /// Release the modal grab taken by `push_modal`.
    fn pop_modal(&mut self);

    /// Modifiers physically held right now.
    fn modifier_state(&self) -> ModifierMask;

    /// Raise and focus a window.
    fn activate_window(&mut self, window_id: WindowId) -> Result<()>;

    /// Ask a window to close, stamping the request with `time`.
    fn close_window(&mut self, window_id: WindowId, time: u32) -> Result<()>;

    /// Current event time in milliseconds.
    fn current_time(&self) -> u32;

    /// Schedule a one-shot timeout; its expiry is delivered back through the
    /// daemon event loop.
    fn add_timeout(&mut self, delay: Duration) -> TimeoutId;

    /// Cancel a pending timeout. Unknown or already-fired ids are ignored.
    fn remove_timeout(&mut self, id: TimeoutId);
}
