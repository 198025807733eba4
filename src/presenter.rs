//! Presentation side of a switching session.
//!
//! The state machine never draws anything. It emits [`Intent`]s and a
//! presenter turns them into whatever the user sees.

use tracing::info;

use crate::window::{Window, WindowId};

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalAction {
    /// The selected window was raised and focused.
    Activate(WindowId),
    /// The selected window was asked to close.
    Remove(WindowId),
    /// The session ended without touching any window.
    Abort,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// The session took the grab; build handles for these candidates.
    Shown { windows: Vec<Window> },
    /// The popup delay elapsed; the switcher may become visible.
    Reveal,
    SelectionChanged { index: usize },
    /// A candidate was destroyed while the session was open.
    PreviewLost { index: usize },
    /// The session is over; drop every handle.
    Ended(TerminalAction),
}

pub trait Presenter {
    fn present(&mut self, intent: &Intent);
}

/// Text presenter printing the candidate list to stderr once revealed.
#[derive(Debug, Default)]
pub struct StderrPresenter {
    windows: Vec<Window>,
    lost: Vec<usize>,
    selected: Option<usize>,
    revealed: bool,
}

impl StderrPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    fn print_switcher(&self) {
        eprintln!("\n=== Window Switcher ===");
        for (i, window) in self.windows.iter().enumerate() {
            let marker = if Some(i) == self.selected { ">>>" } else { "   " };
            let app_id = window.app_identity().unwrap_or("<unknown>");
            let gone = if self.lost.contains(&i) { " (closed)" } else { "" };
            eprintln!("{} [{}] {} - {}{}", marker, window.id, app_id, window.title, gone);
        }
        eprintln!("=======================\n");
    }
}

impl Presenter for StderrPresenter {
    fn present(&mut self, intent: &Intent) {
        match intent {
            Intent::Shown { windows } => {
                self.windows = windows.clone();
                self.lost.clear();
                self.selected = None;
                self.revealed = false;
            }
            Intent::Reveal => {
                self.revealed = true;
                self.print_switcher();
            }
            Intent::SelectionChanged { index } => {
                self.selected = Some(*index);
                if self.revealed {
                    self.print_switcher();
                }
            }
            Intent::PreviewLost { index } => {
                self.lost.push(*index);
                if self.revealed {
                    self.print_switcher();
                }
            }
            Intent::Ended(action) => {
                info!("Switcher closed: {:?}", action);
                self.windows.clear();
                self.lost.clear();
                self.selected = None;
                self.revealed = false;
            }
        }
    }
}
