use anyhow::Result;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::bindings::Binding;
use crate::catalog::WindowCatalog;
use crate::host::{Host, TimeoutId};
use crate::input::{KeyEvent, ModifierMask};
use crate::presenter::Presenter;
use crate::recency::RecencyTracker;
use crate::scope::{Scope, ScopeFilter};
use crate::session::SwitchSession;
use crate::window::WindowId;

#[derive(Debug, Clone, Copy)]
pub struct ManagerSettings {
    pub popup_delay: Duration,
    pub filter: ScopeFilter,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        ManagerSettings {
            popup_delay: Duration::from_millis(150),
            filter: ScopeFilter::default(),
        }
    }
}

/// Snapshot of the switcher for status queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchStatus {
    pub switching: bool,
    pub scope: Option<Scope>,
    pub window_count: usize,
    pub current_index: Option<usize>,
}

/// Owns the recency order and the one live switching session.
///
/// Lives from extension enable to disable; every key-binding and window
/// notification is dispatched through it.
pub struct Manager {
    settings: ManagerSettings,
    tracker: RecencyTracker,
    session: Option<SwitchSession>,
    scope: Option<Scope>,
    presenter: Box<dyn Presenter>,
}

impl Manager {
    pub fn new(settings: ManagerSettings, presenter: Box<dyn Presenter>) -> Self {
        Manager {
            settings,
            tracker: RecencyTracker::new(),
            session: None,
            scope: None,
            presenter,
        }
    }

    #[cfg(test)]
    pub fn tracker(&self) -> &RecencyTracker {
        &self.tracker
    }

    #[cfg(test)]
    pub fn is_switching(&self) -> bool {
        self.session.is_some()
    }

    pub fn status(&self) -> SwitchStatus {
        match &self.session {
            Some(session) => SwitchStatus {
                switching: true,
                scope: self.scope,
                window_count: session.candidates().len(),
                current_index: session.selected_index(),
            },
            None => SwitchStatus {
                switching: false,
                scope: None,
                window_count: 0,
                current_index: None,
            },
        }
    }

    /// Entry point for a switcher key binding.
    ///
    /// Builds the candidate list for the binding's scope and starts a session
    /// on it. Returns `true` if a session is now waiting for key events.
    pub fn start_switcher<H: Host>(&mut self, host: &mut H, binding: Binding, mask: ModifierMask) -> Result<bool> {
        if self.session.is_some() {
            // The live session owns the grab, so a new one could never get it
            debug!("{} ignored, already switching", binding);
            return Ok(false);
        }

        let scope = binding.scope();
        let windows = WindowCatalog::snapshot(host, Some(&self.tracker))?;
        let live: HashSet<WindowId> = windows.iter().map(|w| w.id).collect();
        self.tracker.prune(&live);

        let focused = host.focused_window()?;
        let workspace = host.active_workspace()?;
        let candidates = self
            .settings
            .filter
            .apply(windows, scope, focused, workspace.as_deref());

        if candidates.is_empty() {
            info!("No windows to switch to for {}", binding);
            return Ok(false);
        }

        let start = focused.and_then(|id| candidates.iter().position(|w| w.id == id));
        info!(
            "Starting {} with {} windows (focused index {:?})",
            binding,
            candidates.len(),
            start
        );

        let mut session = SwitchSession::new(candidates, start);
        if session.show(host, mask, self.settings.popup_delay) {
            self.scope = Some(scope);
            self.session = Some(session);
            self.flush(None);
            Ok(true)
        } else {
            session.destroy(host);
            self.flush(Some(session));
            Ok(false)
        }
    }

    /// Key press while the manager is enabled. Returns `true` when a session
    /// consumed it.
    pub fn key_press<H: Host>(&mut self, host: &mut H, event: &KeyEvent, action: Option<Binding>) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        session.key_press(host, event, action);
        self.flush(None);
        true
    }

    pub fn key_release<H: Host>(&mut self, host: &mut H) {
        if let Some(session) = self.session.as_mut() {
            session.key_release(host);
            self.flush(None);
        }
    }

    pub fn timeout_elapsed(&mut self, id: TimeoutId) {
        if let Some(session) = self.session.as_mut() {
            session.reveal_elapsed(id);
            self.flush(None);
        }
    }

    /// Focus-change notification from the compositor.
    pub fn focus_changed<H: Host>(&mut self, host: &mut H) {
        if let Err(e) = self.tracker.focus_changed(host) {
            warn!("Failed to update recency order: {}", e);
        }
    }

    pub fn window_added(&mut self, window_id: WindowId) {
        self.tracker.window_added(window_id);
    }

    pub fn window_removed<H: Host>(&mut self, host: &mut H, window_id: WindowId) {
        self.tracker.window_removed(window_id);
        if let Some(session) = self.session.as_mut() {
            session.window_destroyed(host, window_id);
            self.flush(None);
        }
    }

    /// End any live session without touching a window.
    pub fn cancel<H: Host>(&mut self, host: &mut H) {
        if let Some(session) = self.session.as_mut() {
            session.destroy(host);
            self.flush(None);
        }
    }

    /// Forward queued intents to the presenter and drop the session once it
    /// is over. `finished` is a session that never made it into `self`.
    fn flush(&mut self, finished: Option<SwitchSession>) {
        if let Some(mut session) = finished {
            for intent in session.drain_intents() {
                self.presenter.present(&intent);
            }
            return;
        }

        let Some(session) = self.session.as_mut() else {
            return;
        };
        for intent in session.drain_intents() {
            self.presenter.present(&intent);
        }
        if !session.is_active() {
            debug!("Switching session over: {:?}", session.outcome());
            self.session = None;
            self.scope = None;
        }
    }
}
