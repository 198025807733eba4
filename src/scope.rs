use serde::{Deserialize, Serialize};

use crate::window::{Window, WindowId};

/// Which windows a switching session cycles through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Every window
    All,
    /// Windows on the active workspace
    Group,
    /// Windows of the focused application
    Panels,
}

/// Narrows a catalog snapshot to the candidates of one invocation.
#[derive(Debug, Clone, Copy)]
pub struct ScopeFilter {
    /// Drop skip-taskbar windows from the `All` scope too.
    pub hide_skip_taskbar: bool,
}

impl Default for ScopeFilter {
    fn default() -> Self {
        ScopeFilter {
            hide_skip_taskbar: true,
        }
    }
}

impl ScopeFilter {
    /// Filter `candidates` for `scope`, keeping their relative order.
    ///
    /// The same-application scope compares against the focused window, or the
    /// first candidate when nothing is focused. The result may be empty.
    pub fn apply(
        &self,
        candidates: Vec<Window>,
        scope: Scope,
        focused: Option<WindowId>,
        active_workspace: Option<&str>,
    ) -> Vec<Window> {
        match scope {
            Scope::All => {
                if self.hide_skip_taskbar {
                    candidates.into_iter().filter(|w| !w.skip_taskbar).collect()
                } else {
                    candidates
                }
            }
            Scope::Group => {
                let Some(active) = active_workspace else {
                    return Vec::new();
                };
                candidates
                    .into_iter()
                    .filter(|w| w.workspace.as_deref() == Some(active) && !w.skip_taskbar)
                    .collect()
            }
            Scope::Panels => {
                let reference = focused
                    .and_then(|id| candidates.iter().find(|w| w.id == id))
                    .or(candidates.first());
                let Some(reference) = reference else {
                    return Vec::new();
                };
                let identity = reference.app_identity().map(str::to_string);

                candidates
                    .into_iter()
                    .filter(|w| w.app_identity() == identity.as_deref() && !w.skip_taskbar)
                    .collect()
            }
        }
    }
}
