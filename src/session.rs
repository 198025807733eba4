//! The switching session state machine.
//!
//! A session is created per invocation, takes the modal grab in `show`,
//! moves its cursor on key presses and ends with exactly one terminal action.
//! Presentation is decoupled: every transition queues an [`Intent`] that the
//! owner drains and hands to a presenter.

use std::collections::HashSet;
use std::mem;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::bindings::Binding;
use crate::cursor::SelectionCursor;
use crate::host::{Host, TimeoutId};
use crate::input::{KeyEvent, Keysym, ModifierMask, primary_modifier};
use crate::presenter::{Intent, TerminalAction};
use crate::window::{Window, WindowId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Active,
    Terminating,
    Destroyed,
}

pub struct SwitchSession {
    candidates: Vec<Window>,
    cursor: SelectionCursor,
    modifier_mask: ModifierMask,
    have_modal: bool,
    reveal_timeout: Option<TimeoutId>,
    destroyed_windows: HashSet<WindowId>,
    state: SessionState,
    outcome: Option<TerminalAction>,
    intents: Vec<Intent>,
}

impl SwitchSession {
    /// Create a session over a non-empty candidate list.
    ///
    /// `start` is the index of the focused window, or `None` when nothing is
    /// focused.
    pub fn new(candidates: Vec<Window>, start: Option<usize>) -> Self {
        let cursor = SelectionCursor::new(candidates.len(), start);
        SwitchSession {
            candidates,
            cursor,
            modifier_mask: ModifierMask::empty(),
            have_modal: false,
            reveal_timeout: None,
            destroyed_windows: HashSet::new(),
            state: SessionState::Created,
            outcome: None,
            intents: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    pub fn candidates(&self) -> &[Window] {
        &self.candidates
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.cursor.index()
    }

    pub fn selected(&self) -> Option<&Window> {
        self.cursor.index().and_then(|i| self.candidates.get(i))
    }

    /// Terminal action taken, once the session has ended.
    pub fn outcome(&self) -> Option<TerminalAction> {
        self.outcome
    }

    /// Take the intents queued since the last drain.
    pub fn drain_intents(&mut self) -> Vec<Intent> {
        mem::take(&mut self.intents)
    }

    /// Take the modal grab and start switching.
    ///
    /// Returns `true` while the session stays open waiting for key events.
    /// Returns `false` when the grab could not be acquired, or when the
    /// triggering modifier was already released and the session finished on
    /// the spot. Either way the caller should `destroy` it.
    pub fn show<H: Host>(&mut self, host: &mut H, mask: ModifierMask, popup_delay: Duration) -> bool {
        if self.state != SessionState::Created || self.candidates.is_empty() {
            return false;
        }
        if !host.push_modal() {
            debug!("Modal grab unavailable, not starting switcher");
            return false;
        }

        self.have_modal = true;
        self.state = SessionState::Active;
        self.modifier_mask = primary_modifier(mask);
        self.intents.push(Intent::Shown {
            windows: self.candidates.clone(),
        });

        // Entry always highlights the window after the focused one
        self.advance(false);

        // The modifier may have been released before the grab went through,
        // in which case no release event will ever reach us.
        if !host.modifier_state().intersects(self.modifier_mask) {
            debug!("Modifier released before grab, activating immediately");
            self.activate_selected(host);
            return false;
        }

        self.reveal_timeout = Some(host.add_timeout(popup_delay));
        true
    }

    /// Handle a key press while the grab is held.
    ///
    /// `action` is the switcher binding the press resolves to, if any.
    pub fn key_press<H: Host>(&mut self, host: &mut H, event: &KeyEvent, action: Option<Binding>) {
        if self.state != SessionState::Active {
            return;
        }

        match event.key {
            Keysym::Escape => self.finish(host, TerminalAction::Abort, None),
            Keysym::Q => self.remove_selected(host, event.time),
            _ => {
                if let Some(binding) = action {
                    self.advance(binding.is_backward());
                }
            }
        }
    }

    /// Handle a key release. Letting go of the primary modifier activates the
    /// selection; this is how nearly every session ends.
    pub fn key_release<H: Host>(&mut self, host: &mut H) {
        if self.state != SessionState::Active {
            return;
        }
        if !host.modifier_state().intersects(self.modifier_mask) {
            self.activate_selected(host);
        }
    }

    /// A timeout fired. Only the pending popup delay is of interest.
    pub fn reveal_elapsed(&mut self, id: TimeoutId) {
        if self.state == SessionState::Active && self.reveal_timeout == Some(id) {
            self.reveal_timeout = None;
            self.intents.push(Intent::Reveal);
        }
    }

    /// A window went away while the session was open.
    ///
    /// The candidate list is frozen, so the window stays in it but is treated
    /// as absent. Once every candidate is gone the session aborts.
    pub fn window_destroyed<H: Host>(&mut self, host: &mut H, window_id: WindowId) {
        if self.state != SessionState::Active {
            return;
        }
        let Some(index) = self.candidates.iter().position(|w| w.id == window_id) else {
            return;
        };
        if !self.destroyed_windows.insert(window_id) {
            return;
        }
        self.intents.push(Intent::PreviewLost { index });

        if self.destroyed_windows.len() == self.candidates.len() {
            debug!("Every candidate is gone, aborting switcher");
            self.finish(host, TerminalAction::Abort, None);
        }
    }

    /// Tear the session down: release the grab, cancel the popup delay and
    /// drop all per-session state. Calling it again is a no-op.
    pub fn destroy<H: Host>(&mut self, host: &mut H) {
        if self.state == SessionState::Destroyed {
            return;
        }
        let was_shown = self.state != SessionState::Created;

        if self.have_modal {
            host.pop_modal();
            self.have_modal = false;
        }
        if let Some(id) = self.reveal_timeout.take() {
            host.remove_timeout(id);
        }

        self.candidates.clear();
        self.destroyed_windows.clear();
        self.cursor = SelectionCursor::new(0, None);
        self.state = SessionState::Destroyed;

        if was_shown {
            let outcome = *self.outcome.get_or_insert(TerminalAction::Abort);
            self.intents.push(Intent::Ended(outcome));
        }
    }

    fn advance(&mut self, backward: bool) {
        if let Some(index) = self.cursor.step(backward) {
            self.intents.push(Intent::SelectionChanged { index });
        }
    }

    fn activate_selected<H: Host>(&mut self, host: &mut H) {
        let action = match self.selected() {
            Some(window) => TerminalAction::Activate(window.id),
            None => TerminalAction::Abort,
        };
        self.finish(host, action, None);
    }

    fn remove_selected<H: Host>(&mut self, host: &mut H, time: u32) {
        let action = match self.selected() {
            Some(window) => TerminalAction::Remove(window.id),
            None => TerminalAction::Abort,
        };
        self.finish(host, action, Some(time));
    }

    /// Run the terminal action, then tear down.
    ///
    /// Close requests are stamped with `event_time`, or the host's current
    /// time when the action wasn't triggered by an event.
    fn finish<H: Host>(&mut self, host: &mut H, action: TerminalAction, event_time: Option<u32>) {
        if self.state != SessionState::Active {
            return;
        }
        self.state = SessionState::Terminating;

        let action = match action {
            TerminalAction::Activate(id) | TerminalAction::Remove(id)
                if self.destroyed_windows.contains(&id) =>
            {
                debug!("Selected window {} is gone, nothing to do", id);
                TerminalAction::Abort
            }
            other => other,
        };

        match action {
            TerminalAction::Activate(id) => {
                info!("Activating window {}", id);
                if let Err(e) = host.activate_window(id) {
                    warn!("Failed to activate window {}: {}", id, e);
                }
            }
            TerminalAction::Remove(id) => {
                let time = event_time.unwrap_or_else(|| host.current_time());
                info!("Closing window {}", id);
                if let Err(e) = host.close_window(id, time) {
                    warn!("Failed to close window {}: {}", id, e);
                }
            }
            TerminalAction::Abort => {
                debug!("Switcher cancelled");
            }
        }

        self.outcome = Some(action);
        self.destroy(host);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::mock::{MockHost, make_window};
    use crate::input::KeyState;

    const DELAY: Duration = Duration::from_millis(150);

    fn abc() -> Vec<Window> {
        vec![
            make_window(1, "a", "1", 30),
            make_window(2, "b", "1", 20),
            make_window(3, "c", "1", 10),
        ]
    }

    fn alt_held(windows: Vec<Window>) -> MockHost {
        let mut host = MockHost::new(windows);
        host.modifiers = ModifierMask::ALT;
        host
    }

    fn press(key: Keysym, mods: ModifierMask, time: u32) -> KeyEvent {
        KeyEvent {
            key,
            state: KeyState::Pressed,
            mods,
            time,
        }
    }

    fn selected_id(session: &SwitchSession) -> Option<WindowId> {
        session.selected().map(|w| w.id)
    }

    #[test]
    fn test_show_from_no_selection_highlights_first() {
        let mut host = alt_held(abc());
        let mut session = SwitchSession::new(abc(), None);

        assert!(session.show(&mut host, ModifierMask::ALT, DELAY));
        assert!(session.is_active());
        assert!(host.modal);
        assert_eq!(session.selected_index(), Some(0));

        let tab = press(Keysym::Tab, ModifierMask::ALT, 5);
        for expected in [2, 3, 1] {
            session.key_press(&mut host, &tab, Some(Binding::SwitchWindows));
            assert_eq!(selected_id(&session), Some(expected));
        }
        assert_eq!(session.selected_index(), Some(0));
    }

    #[test]
    fn test_show_from_focused_highlights_next() {
        let mut host = alt_held(abc());
        let mut session = SwitchSession::new(abc(), Some(0));

        assert!(session.show(&mut host, ModifierMask::ALT, DELAY));
        assert_eq!(selected_id(&session), Some(2));
    }

    #[test]
    fn test_show_emits_shown_then_selection_and_arms_delay() {
        let mut host = alt_held(abc());
        let mut session = SwitchSession::new(abc(), Some(0));
        session.show(&mut host, ModifierMask::ALT, DELAY);

        let intents = session.drain_intents();
        assert_eq!(intents.len(), 2);
        assert!(matches!(&intents[0], Intent::Shown { windows } if windows.len() == 3));
        assert_eq!(intents[1], Intent::SelectionChanged { index: 1 });
        assert_eq!(host.timeouts, vec![(1, DELAY)]);

        session.reveal_elapsed(1);
        assert_eq!(session.drain_intents(), vec![Intent::Reveal]);
        session.reveal_elapsed(1);
        assert!(session.drain_intents().is_empty());
    }

    #[test]
    fn test_backward_binding_retreats() {
        let mut host = alt_held(abc());
        let mut session = SwitchSession::new(abc(), Some(0));
        session.show(&mut host, ModifierMask::ALT | ModifierMask::SHIFT, DELAY);
        assert_eq!(session.selected_index(), Some(1));

        let shift_tab = press(Keysym::Tab, ModifierMask::ALT | ModifierMask::SHIFT, 5);
        session.key_press(&mut host, &shift_tab, Some(Binding::SwitchWindowsBackward));
        assert_eq!(session.selected_index(), Some(0));
        session.key_press(&mut host, &shift_tab, Some(Binding::SwitchGroupBackward));
        assert_eq!(session.selected_index(), Some(2));
    }

    #[test]
    fn test_unbound_key_is_ignored() {
        let mut host = alt_held(abc());
        let mut session = SwitchSession::new(abc(), Some(0));
        session.show(&mut host, ModifierMask::ALT, DELAY);

        session.key_press(&mut host, &press(Keysym::Other(30), ModifierMask::ALT, 5), None);
        assert!(session.is_active());
        assert_eq!(session.selected_index(), Some(1));
    }

    #[test]
    fn test_modifier_release_activates_selection() {
        let mut host = alt_held(abc());
        let mut session = SwitchSession::new(abc(), Some(0));
        session.show(&mut host, ModifierMask::ALT, DELAY);

        // releasing an unrelated key keeps the session alive
        session.key_release(&mut host);
        assert!(session.is_active());

        host.modifiers = ModifierMask::empty();
        session.key_release(&mut host);

        assert_eq!(session.state(), SessionState::Destroyed);
        assert_eq!(session.outcome(), Some(TerminalAction::Activate(2)));
        assert_eq!(host.activated, vec![2]);
        assert!(!host.modal);
        assert_eq!(host.pending_timeouts(), Vec::<TimeoutId>::new());
    }

    #[test]
    fn test_only_primary_modifier_matters() {
        let mut host = MockHost::new(abc());
        host.modifiers = ModifierMask::ALT | ModifierMask::SHIFT;
        let mut session = SwitchSession::new(abc(), Some(0));
        session.show(&mut host, ModifierMask::ALT | ModifierMask::SHIFT, DELAY);

        host.modifiers = ModifierMask::ALT;
        session.key_release(&mut host);
        assert!(session.is_active());

        host.modifiers = ModifierMask::SHIFT;
        session.key_release(&mut host);
        assert_eq!(session.outcome(), Some(TerminalAction::Activate(2)));
    }

    #[test]
    fn test_modifier_released_before_grab_activates_immediately() {
        let mut host = MockHost::new(abc());
        let mut session = SwitchSession::new(abc(), Some(0));

        assert!(!session.show(&mut host, ModifierMask::ALT, DELAY));
        assert_eq!(session.state(), SessionState::Destroyed);
        assert_eq!(host.activated, vec![2]);
        assert!(!host.modal);
        assert!(host.timeouts.is_empty());

        // the caller destroys it again
        session.destroy(&mut host);
        assert_eq!(host.modal_pops, 1);
    }

    #[test]
    fn test_escape_aborts() {
        let mut host = alt_held(abc());
        let mut session = SwitchSession::new(abc(), Some(0));
        session.show(&mut host, ModifierMask::ALT, DELAY);

        session.key_press(&mut host, &press(Keysym::Escape, ModifierMask::ALT, 5), None);

        assert_eq!(session.outcome(), Some(TerminalAction::Abort));
        assert!(host.activated.is_empty());
        assert!(host.closed.is_empty());
        assert!(!host.modal);
    }

    #[test]
    fn test_remove_closes_selected_with_event_time_and_exits() {
        let mut host = alt_held(abc());
        host.time = 1;
        let mut session = SwitchSession::new(abc(), Some(0));
        session.show(&mut host, ModifierMask::ALT, DELAY);
        session.drain_intents();

        session.key_press(&mut host, &press(Keysym::Q, ModifierMask::ALT, 4242), None);

        assert_eq!(host.closed, vec![(2, 4242)]);
        assert!(host.activated.is_empty());
        assert_eq!(session.state(), SessionState::Destroyed);
        // no reselection after removal
        assert_eq!(
            session.drain_intents(),
            vec![Intent::Ended(TerminalAction::Remove(2))]
        );
    }

    #[test]
    fn test_exactly_one_terminal_action() {
        let mut host = alt_held(abc());
        let mut session = SwitchSession::new(abc(), Some(0));
        session.show(&mut host, ModifierMask::ALT, DELAY);

        session.key_press(&mut host, &press(Keysym::Q, ModifierMask::ALT, 1), None);
        host.modifiers = ModifierMask::empty();
        session.key_release(&mut host);
        session.key_press(&mut host, &press(Keysym::Escape, ModifierMask::empty(), 2), None);

        assert_eq!(host.closed.len(), 1);
        assert!(host.activated.is_empty());
        assert_eq!(session.outcome(), Some(TerminalAction::Remove(2)));
    }

    #[test]
    fn test_grab_failure_leaves_nothing_behind() {
        let mut host = alt_held(abc());
        host.refuse_grab = true;
        let mut session = SwitchSession::new(abc(), Some(0));

        assert!(!session.show(&mut host, ModifierMask::ALT, DELAY));
        session.destroy(&mut host);

        assert!(!host.modal);
        assert_eq!(host.modal_pops, 0);
        assert!(host.timeouts.is_empty());
        assert!(session.drain_intents().is_empty());

        host.refuse_grab = false;
        let mut retry = SwitchSession::new(abc(), Some(0));
        assert!(retry.show(&mut host, ModifierMask::ALT, DELAY));
        assert!(host.modal);
    }

    #[test]
    fn test_second_session_cannot_grab() {
        let mut host = alt_held(abc());
        let mut first = SwitchSession::new(abc(), Some(0));
        assert!(first.show(&mut host, ModifierMask::ALT, DELAY));

        let mut second = SwitchSession::new(abc(), Some(0));
        assert!(!second.show(&mut host, ModifierMask::ALT, DELAY));
        second.destroy(&mut host);

        // the first session still owns the grab
        assert!(host.modal);
        assert!(first.is_active());
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let mut host = alt_held(abc());
        let mut session = SwitchSession::new(abc(), Some(0));
        session.show(&mut host, ModifierMask::ALT, DELAY);
        session.drain_intents();

        session.destroy(&mut host);
        let pops = host.modal_pops;
        let removed = host.removed_timeouts.clone();
        let intents = session.drain_intents();

        session.destroy(&mut host);
        assert_eq!(host.modal_pops, pops);
        assert_eq!(host.removed_timeouts, removed);
        assert!(session.drain_intents().is_empty());
        assert_eq!(intents, vec![Intent::Ended(TerminalAction::Abort)]);
        assert!(session.candidates().is_empty());
        assert!(session.selected().is_none());
    }

    #[test]
    fn test_destroy_cancels_pending_delay() {
        let mut host = alt_held(abc());
        let mut session = SwitchSession::new(abc(), Some(0));
        session.show(&mut host, ModifierMask::ALT, DELAY);
        session.destroy(&mut host);

        assert_eq!(host.removed_timeouts, vec![1]);
        session.reveal_elapsed(1);
        assert!(!session.drain_intents().contains(&Intent::Reveal));
    }

    #[test]
    fn test_destroyed_selection_is_not_activated() {
        let mut host = alt_held(abc());
        let mut session = SwitchSession::new(abc(), Some(0));
        session.show(&mut host, ModifierMask::ALT, DELAY);
        session.drain_intents();

        session.window_destroyed(&mut host, 2);
        assert_eq!(session.drain_intents(), vec![Intent::PreviewLost { index: 1 }]);
        // repeated notifications are ignored
        session.window_destroyed(&mut host, 2);
        assert!(session.drain_intents().is_empty());

        host.modifiers = ModifierMask::empty();
        session.key_release(&mut host);
        assert!(host.activated.is_empty());
        assert_eq!(session.outcome(), Some(TerminalAction::Abort));
    }

    #[test]
    fn test_destroyed_candidate_can_be_skipped() {
        let mut host = alt_held(abc());
        let mut session = SwitchSession::new(abc(), Some(0));
        session.show(&mut host, ModifierMask::ALT, DELAY);

        session.window_destroyed(&mut host, 2);
        session.window_destroyed(&mut host, 99);
        session.key_press(
            &mut host,
            &press(Keysym::Tab, ModifierMask::ALT, 3),
            Some(Binding::SwitchWindows),
        );
        assert_eq!(session.candidates().len(), 3);

        host.modifiers = ModifierMask::empty();
        session.key_release(&mut host);
        assert_eq!(host.activated, vec![3]);
    }

    #[test]
    fn test_all_candidates_destroyed_aborts() {
        let mut host = alt_held(abc());
        let mut session = SwitchSession::new(abc(), Some(0));
        session.show(&mut host, ModifierMask::ALT, DELAY);

        for id in [1, 2, 3] {
            session.window_destroyed(&mut host, id);
        }
        assert_eq!(session.state(), SessionState::Destroyed);
        assert_eq!(session.outcome(), Some(TerminalAction::Abort));
        assert!(!host.modal);
    }

    #[test]
    fn test_activation_failure_still_tears_down() {
        let mut host = alt_held(vec![make_window(1, "a", "1", 1)]);
        // the host no longer knows window 2
        let mut session = SwitchSession::new(
            vec![make_window(1, "a", "1", 1), make_window(2, "b", "1", 0)],
            Some(0),
        );
        session.show(&mut host, ModifierMask::ALT, DELAY);

        host.modifiers = ModifierMask::empty();
        session.key_release(&mut host);
        assert!(host.activated.is_empty());
        assert!(!host.modal);
        assert_eq!(session.state(), SessionState::Destroyed);
    }

    #[test]
    fn test_events_before_show_are_ignored() {
        let mut host = alt_held(abc());
        let mut session = SwitchSession::new(abc(), Some(0));

        session.key_press(
            &mut host,
            &press(Keysym::Tab, ModifierMask::ALT, 1),
            Some(Binding::SwitchWindows),
        );
        session.key_release(&mut host);
        session.window_destroyed(&mut host, 1);
        assert_eq!(session.state(), SessionState::Created);
        assert_eq!(session.selected_index(), Some(0));
    }
}
