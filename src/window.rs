/// Compositor identifier of a window (a Sway container id).
pub type WindowId = i64;

/// Snapshot of a manageable window as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub id: WindowId,
    pub title: String,
    pub app_id: Option<String>,
    pub window_class: Option<String>, // WM_CLASS for X11 windows
    pub workspace: Option<String>,
    /// Recency timestamp; larger means more recently used.
    pub user_time: u64,
    pub skip_taskbar: bool,
}

impl Window {
    /// Application identity used by the same-application scope.
    ///
    /// Native Wayland windows carry an `app_id`, XWayland windows only a
    /// `WM_CLASS`.
    pub fn app_identity(&self) -> Option<&str> {
        self.app_id.as_deref().or(self.window_class.as_deref())
    }
}
