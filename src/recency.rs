//! Most-recently-focused window order, kept up to date from focus
//! notifications so invocations don't need to rebuild it.

use anyhow::Result;
use std::collections::HashSet;
use tracing::debug;

use crate::catalog::WindowCatalog;
use crate::host::Host;
use crate::window::WindowId;

#[derive(Debug, Default)]
pub struct RecencyTracker {
    order: Vec<WindowId>,
}

impl RecencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Window ids, most recently focused first.
    pub fn order(&self) -> &[WindowId] {
        &self.order
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Handle a focus-change notification.
    ///
    /// An empty tracker is first seeded from a cold catalog enumeration, then
    /// the focused window moves to the front.
    pub fn focus_changed<H: Host>(&mut self, host: &mut H) -> Result<()> {
        if self.order.is_empty() {
            self.rebuild(host)?;
        }

        if let Some(focused) = host.focused_window()? {
            self.promote(focused);
        }

        Ok(())
    }

    /// Replace the tracked order with a cold enumeration.
    pub fn rebuild<H: Host>(&mut self, host: &mut H) -> Result<()> {
        let windows = WindowCatalog::enumerate(host)?;
        let mut seen = HashSet::with_capacity(windows.len());
        self.order = windows
            .into_iter()
            .map(|w| w.id)
            .filter(|id| seen.insert(*id))
            .collect();
        debug!("Rebuilt recency order with {} windows", self.order.len());
        Ok(())
    }

    /// Move window to front of MRU list, inserting it if unknown.
    pub fn promote(&mut self, window_id: WindowId) {
        if let Some(pos) = self.order.iter().position(|id| *id == window_id) {
            self.order.remove(pos);
        }
        self.order.insert(0, window_id);
    }

    /// A new window appeared. It goes right behind the focused one until it
    /// gets focus itself.
    ///
    /// Nothing is recorded while the order is empty, so the next focus change
    /// still seeds it from a cold enumeration.
    pub fn window_added(&mut self, window_id: WindowId) {
        if self.order.is_empty() {
            return;
        }

        if !self.order.contains(&window_id) {
            let pos = self.order.len().min(1);
            self.order.insert(pos, window_id);
        }
    }

    /// A window was destroyed.
    pub fn window_removed(&mut self, window_id: WindowId) {
        self.order.retain(|id| *id != window_id);
    }

    /// Drop every tracked id that isn't in `live`.
    pub fn prune(&mut self, live: &HashSet<WindowId>) {
        self.order.retain(|id| live.contains(id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::mock::{MockHost, make_window};

    #[test]
    fn test_cold_rebuild_then_focus_moves_to_front() {
        // X is the most recent, so the committed most-recent-first order is [X, Y, Z]
        let mut host = MockHost::new(vec![
            make_window(3, "z", "1", 10),
            make_window(1, "x", "1", 30),
            make_window(2, "y", "1", 20),
        ]);
        let mut tracker = RecencyTracker::new();

        tracker.rebuild(&mut host).unwrap();
        assert_eq!(tracker.order(), &[1, 2, 3]);

        host.focused = Some(2);
        tracker.focus_changed(&mut host).unwrap();
        assert_eq!(tracker.order(), &[2, 1, 3]);
    }

    #[test]
    fn test_focus_on_empty_tracker_rebuilds_first() {
        let mut host = MockHost::new(vec![
            make_window(1, "x", "1", 30),
            make_window(2, "y", "1", 20),
            make_window(3, "z", "1", 10),
        ]);
        host.focused = Some(3);
        let mut tracker = RecencyTracker::new();

        tracker.focus_changed(&mut host).unwrap();
        assert_eq!(tracker.order(), &[3, 1, 2]);
    }

    #[test]
    fn test_focus_never_duplicates() {
        let mut host = MockHost::new(vec![
            make_window(1, "x", "1", 30),
            make_window(2, "y", "1", 20),
        ]);
        let mut tracker = RecencyTracker::new();

        for focused in [2, 1, 2, 2, 1] {
            host.focused = Some(focused);
            tracker.focus_changed(&mut host).unwrap();
            assert_eq!(tracker.order()[0], focused);
            assert_eq!(tracker.order().iter().filter(|id| **id == focused).count(), 1);
        }
        assert_eq!(tracker.order(), &[1, 2]);
    }

    #[test]
    fn test_focus_without_focused_window_keeps_order() {
        let mut host = MockHost::new(vec![
            make_window(1, "x", "1", 30),
            make_window(2, "y", "1", 20),
        ]);
        let mut tracker = RecencyTracker::new();
        tracker.focus_changed(&mut host).unwrap();
        assert_eq!(tracker.order(), &[1, 2]);
    }

    #[test]
    fn test_promote_unknown_window_inserts_at_front() {
        let mut tracker = RecencyTracker::new();
        tracker.promote(1);
        tracker.promote(2);
        assert_eq!(tracker.order(), &[2, 1]);
    }

    #[test]
    fn test_window_added_goes_behind_front() {
        let mut tracker = RecencyTracker::new();
        tracker.promote(5);
        tracker.promote(1);
        tracker.window_added(7);
        assert_eq!(tracker.order(), &[1, 7, 5]);

        tracker.window_added(5);
        assert_eq!(tracker.order(), &[1, 7, 5]);
    }

    #[test]
    fn test_window_added_to_empty_tracker_keeps_cold_rebuild() {
        let mut host = MockHost::new(vec![
            make_window(1, "x", "1", 30),
            make_window(2, "y", "1", 20),
            make_window(3, "z", "1", 10),
        ]);
        let mut tracker = RecencyTracker::new();

        tracker.window_added(4);
        assert!(tracker.is_empty());

        host.focused = Some(2);
        tracker.focus_changed(&mut host).unwrap();
        assert_eq!(tracker.order(), &[2, 1, 3]);
    }

    #[test]
    fn test_window_removed_and_prune() {
        let mut tracker = RecencyTracker::new();
        for id in [4, 3, 2, 1] {
            tracker.promote(id);
        }
        tracker.window_removed(2);
        assert_eq!(tracker.order(), &[1, 3, 4]);

        tracker.window_removed(42);
        assert_eq!(tracker.order(), &[1, 3, 4]);

        let live: HashSet<WindowId> = [1, 4].into_iter().collect();
        tracker.prune(&live);
        assert_eq!(tracker.order(), &[1, 4]);
    }
}
