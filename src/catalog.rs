use anyhow::Result;
use std::collections::HashMap;
use tracing::debug;

use crate::host::Host;
use crate::recency::RecencyTracker;
use crate::window::{Window, WindowId};

/// Produces the ordered window list a switching session starts from.
pub struct WindowCatalog;

impl WindowCatalog {
    /// Snapshot all manageable windows, most recently used first.
    ///
    /// Uses the tracker's maintained order when it has one, otherwise falls
    /// back to a cold enumeration sorted by recency timestamp.
    pub fn snapshot<H: Host>(host: &mut H, tracker: Option<&RecencyTracker>) -> Result<Vec<Window>> {
        let windows = host.list_windows()?;

        let ordered = match tracker {
            Some(tracker) if !tracker.is_empty() => order_by_tracker(tracker.order(), windows),
            _ => sort_by_recency(windows),
        };
        debug!("Catalog snapshot with {} windows", ordered.len());

        Ok(ordered)
    }

    /// Cold enumeration: every window, most recently used first.
    pub fn enumerate<H: Host>(host: &mut H) -> Result<Vec<Window>> {
        Ok(sort_by_recency(host.list_windows()?))
    }
}

/// Stable sort by descending recency timestamp. Windows with equal timestamps
/// keep their enumeration order.
#[must_use]
pub fn sort_by_recency(mut windows: Vec<Window>) -> Vec<Window> {
    windows.sort_by(|a, b| b.user_time.cmp(&a.user_time));
    windows
}

/// Order live windows by a tracked MRU order.
///
/// The resulting list has:
/// 1. Tracked windows that are still alive, in tracked order, with fresh data
/// 2. Windows the tracker has not seen yet, most recent first
///
/// Tracked ids with no live window are dropped, and duplicates never appear.
#[must_use]
fn order_by_tracker(order: &[WindowId], live: Vec<Window>) -> Vec<Window> {
    let mut live_by_id: HashMap<WindowId, Window> = HashMap::with_capacity(live.len());
    let mut enumeration = Vec::with_capacity(live.len());
    for window in live {
        if !live_by_id.contains_key(&window.id) {
            enumeration.push(window.id);
            live_by_id.insert(window.id, window);
        }
    }

    // Removing from the map as we go also drops repeated tracked ids.
    let mut result = Vec::with_capacity(live_by_id.len());
    for id in order {
        if let Some(window) = live_by_id.remove(id) {
            result.push(window);
        }
    }

    let untracked: Vec<Window> = enumeration
        .into_iter()
        .filter_map(|id| live_by_id.remove(&id))
        .collect();
    result.extend(sort_by_recency(untracked));

    result
}
