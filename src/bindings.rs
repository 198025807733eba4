use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::input::{Keysym, ModifierMask};
use crate::scope::Scope;

/// Key bindings the switcher takes over from the compositor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum Binding {
    /// Switch between all windows
    SwitchWindows,
    /// Switch between windows on the current workspace
    SwitchGroup,
    /// Switch between windows of the focused application
    SwitchPanels,
    SwitchWindowsBackward,
    SwitchGroupBackward,
    SwitchPanelsBackward,
}

impl Binding {
    pub const ALL: [Binding; 6] = [
        Binding::SwitchWindows,
        Binding::SwitchGroup,
        Binding::SwitchPanels,
        Binding::SwitchWindowsBackward,
        Binding::SwitchGroupBackward,
        Binding::SwitchPanelsBackward,
    ];

    pub fn scope(self) -> Scope {
        match self {
            Binding::SwitchWindows | Binding::SwitchWindowsBackward => Scope::All,
            Binding::SwitchGroup | Binding::SwitchGroupBackward => Scope::Group,
            Binding::SwitchPanels | Binding::SwitchPanelsBackward => Scope::Panels,
        }
    }

    pub fn is_backward(self) -> bool {
        matches!(
            self,
            Binding::SwitchWindowsBackward
                | Binding::SwitchGroupBackward
                | Binding::SwitchPanelsBackward
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Binding::SwitchWindows => "switch_windows",
            Binding::SwitchGroup => "switch_group",
            Binding::SwitchPanels => "switch_panels",
            Binding::SwitchWindowsBackward => "switch_windows_backward",
            Binding::SwitchGroupBackward => "switch_group_backward",
            Binding::SwitchPanelsBackward => "switch_panels_backward",
        }
    }
}

/// Error returned when parsing an unknown binding name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseBindingError;

impl fmt::Display for ParseBindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid key binding name")
    }
}

impl std::error::Error for ParseBindingError {}

impl FromStr for Binding {
    type Err = ParseBindingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase().replace('-', "_");
        Binding::ALL
            .into_iter()
            .find(|b| b.name() == s)
            .ok_or(ParseBindingError)
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Maps key presses to switcher bindings, the way the compositor resolves a
/// key code plus modifier state to a keybinding action.
#[derive(Debug, Clone)]
pub struct KeyBindings {
    entries: Vec<(Keysym, ModifierMask, Binding)>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        let alt = ModifierMask::ALT;
        let alt_shift = ModifierMask::ALT | ModifierMask::SHIFT;
        let sup = ModifierMask::SUPER;
        let sup_shift = ModifierMask::SUPER | ModifierMask::SHIFT;

        KeyBindings {
            entries: vec![
                (Keysym::Tab, alt, Binding::SwitchWindows),
                (Keysym::Tab, alt_shift, Binding::SwitchWindowsBackward),
                (Keysym::Grave, alt, Binding::SwitchGroup),
                (Keysym::Grave, alt_shift, Binding::SwitchGroupBackward),
                (Keysym::Tab, sup, Binding::SwitchPanels),
                (Keysym::Tab, sup_shift, Binding::SwitchPanelsBackward),
            ],
        }
    }
}

impl KeyBindings {
    /// Resolve a key press. Modifiers must match exactly.
    pub fn lookup(&self, key: Keysym, mods: ModifierMask) -> Option<Binding> {
        self.entries
            .iter()
            .find(|(k, m, _)| *k == key && *m == mods)
            .map(|(_, _, binding)| *binding)
    }
}
