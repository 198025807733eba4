use anyhow::{Context, Result};
use std::borrow::Cow;
use std::time::{Duration, SystemTime};
use swayipc::{Connection, Node, NodeType, Workspace};
use tracing::{debug, warn};

use crate::host::{Host, TimeoutId};
use crate::input::{ModifierMask, ModifierState, timestamp_ms};
use crate::timer::TimerQueue;
use crate::window::{Window, WindowId};

/// Workspace Sway keeps scratchpad windows on.
const SCRATCHPAD_WORKSPACE: &str = "__i3_scratch";

impl Window {
    /// Build a window from a Sway node.
    ///
    /// Only actual windows (views) qualify, not containers: windows have a
    /// pid, containers don't.
    pub fn from_node(node: &Node, workspace: Option<&str>) -> Option<Self> {
        if !matches!(node.node_type, NodeType::Con | NodeType::FloatingCon) || node.pid.is_none() {
            return None;
        }

        // Extract WM_CLASS from X11/XWayland window properties
        let window_class = node
            .window_properties
            .as_ref()
            .and_then(|props| props.class.clone());

        Some(Window {
            id: node.id,
            title: node.name.clone().unwrap_or_default(),
            app_id: node.app_id.clone(),
            window_class,
            workspace: workspace.map(str::to_string),
            user_time: 0,
            skip_taskbar: workspace == Some(SCRATCHPAD_WORKSPACE),
        })
    }
}

/// [`Host`] backed by Sway IPC, the evdev modifier state and tokio timers.
pub struct SwayHost {
    connection: Connection,
    grab_mode: Option<String>,
    grabbed: bool,
    modifiers: ModifierState,
    timers: TimerQueue,
}

impl SwayHost {
    pub fn new(
        grab_mode: Option<String>,
        modifiers: ModifierState,
        timers: TimerQueue,
    ) -> Result<Self> {
        Ok(SwayHost {
            connection: Connection::new().context("Failed to connect to Sway IPC")?,
            grab_mode,
            grabbed: false,
            modifiers,
            timers,
        })
    }

    /// Forwarded from the daemon when a timeout expires. Returns `false` for
    /// timeouts cancelled after they had already fired.
    pub fn timeout_fired(&mut self, id: TimeoutId) -> bool {
        self.timers.fired(id)
    }

    /// Run a Sway command, failing if Sway rejected any part of it.
    fn run_command(&mut self, command: &str) -> Result<()> {
        for outcome in self.connection.run_command(command)? {
            outcome.with_context(|| format!("Sway rejected `{}`", command))?;
        }
        Ok(())
    }
}

impl Host for SwayHost {
    fn list_windows(&mut self) -> Result<Vec<Window>> {
        let tree = self.connection.get_tree()?;
        Ok(collect_windows(&tree))
    }

    fn focused_window(&mut self) -> Result<Option<WindowId>> {
        let tree = self.connection.get_tree()?;
        Ok(find_focused_window(&tree))
    }

    fn active_workspace(&mut self) -> Result<Option<String>> {
        let workspaces: Vec<Workspace> = self.connection.get_workspaces()?;
        Ok(workspaces.into_iter().find(|w| w.focused).map(|w| w.name))
    }

    fn push_modal(&mut self) -> bool {
        if self.grabbed {
            return false;
        }

        if let Some(mode) = self.grab_mode.clone() {
            match self.connection.get_binding_state() {
                Ok(current) if current == mode => {
                    debug!("Sway is already in binding mode {}", mode);
                    return false;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Failed to query Sway binding mode: {}", e);
                    return false;
                }
            }

            let command = format!("mode \"{}\"", mode);
            if let Err(e) = self.run_command(&command) {
                warn!("Failed to enter binding mode {}: {}", mode, e);
                return false;
            }
        }

        self.grabbed = true;
        true
    }

    fn pop_modal(&mut self) {
        if !self.grabbed {
            return;
        }
        self.grabbed = false;

        if self.grab_mode.is_some()
            && let Err(e) = self.run_command("mode default")
        {
            warn!("Failed to leave switcher binding mode: {}", e);
        }
    }

    fn modifier_state(&self) -> ModifierMask {
        self.modifiers.get()
    }

    fn activate_window(&mut self, window_id: WindowId) -> Result<()> {
        self.run_command(&format!("[con_id={}] focus", window_id))
    }

    fn close_window(&mut self, window_id: WindowId, time: u32) -> Result<()> {
        // Sway's kill takes no timestamp
        debug!("Closing window {} (request time {})", window_id, time);
        self.run_command(&format!("[con_id={}] kill", window_id))
    }

    fn current_time(&self) -> u32 {
        timestamp_ms(SystemTime::now())
    }

    fn add_timeout(&mut self, delay: Duration) -> TimeoutId {
        self.timers.add(delay)
    }

    fn remove_timeout(&mut self, id: TimeoutId) {
        self.timers.cancel(id);
    }
}

/// Collect all windows from a Sway node tree, most recently focused first.
///
/// Sway keeps no per-window user time, but every container lists its
/// children in focus order. Walking the tree along those lists visits windows
/// from most to least recently focused, and the visit rank becomes the
/// window's recency timestamp.
#[must_use]
pub fn collect_windows(tree: &Node) -> Vec<Window> {
    let mut windows = Vec::new();
    collect_in_focus_order(tree, Cow::Borrowed(""), &mut windows);

    let count = windows.len() as u64;
    for (rank, window) in windows.iter_mut().enumerate() {
        window.user_time = count - rank as u64;
    }
    windows
}

fn collect_in_focus_order<'a>(node: &'a Node, workspace: Cow<'a, str>, out: &mut Vec<Window>) {
    // Update workspace name if we encounter a workspace node
    let workspace: Cow<'a, str> = if node.node_type == NodeType::Workspace {
        node.name
            .as_deref()
            .map(Cow::Borrowed)
            .unwrap_or(workspace)
    } else {
        workspace
    };

    let ws = (!workspace.is_empty()).then_some(workspace.as_ref());
    if let Some(window) = Window::from_node(node, ws) {
        out.push(window);
    }

    for child in children_in_focus_order(node) {
        collect_in_focus_order(child, Cow::Borrowed(&workspace), out);
    }
}

/// Tiling and floating children, most recently focused first. Children
/// missing from the focus list keep their tree order at the end.
fn children_in_focus_order(node: &Node) -> Vec<&Node> {
    let mut children: Vec<&Node> = node.nodes.iter().chain(&node.floating_nodes).collect();
    children.sort_by_key(|child| {
        node.focus
            .iter()
            .position(|id| *id == child.id)
            .unwrap_or(usize::MAX)
    });
    children
}

/// Find the currently focused window in a Sway node tree.
#[must_use]
pub fn find_focused_window(node: &Node) -> Option<WindowId> {
    // A focused container is not a window; windows have a pid
    if matches!(node.node_type, NodeType::Con | NodeType::FloatingCon)
        && node.focused
        && node.pid.is_some()
    {
        return Some(node.id);
    }

    node.nodes
        .iter()
        .chain(&node.floating_nodes)
        .find_map(find_focused_window)
}
