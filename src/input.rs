//! Keyboard input types shared by the keyboard monitor, the key bindings and
//! the switching session.

use bitflags::bitflags;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

bitflags! {
    /// Modifier keys, laid out like the X11/Clutter modifier bits so that the
    /// highest set bit is the "primary" modifier of a binding.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ModifierMask: u32 {
        const SHIFT = 1;
        const CONTROL = 1 << 2;
        const ALT = 1 << 3;
        const SUPER = 1 << 6;
    }
}

/// Returns the modifier that has to stay held to keep a switching session alive.
///
/// For `Alt+Shift+Tab` this is `Alt`: the highest set bit of the binding mask.
pub fn primary_modifier(mask: ModifierMask) -> ModifierMask {
    let bits = mask.bits();
    if bits == 0 {
        return ModifierMask::empty();
    }
    ModifierMask::from_bits_truncate(1 << (31 - bits.leading_zeros()))
}

/// Keys the switcher cares about. Everything else is carried as a raw code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keysym {
    Tab,
    Grave,
    Escape,
    Q,
    Shift,
    Control,
    Alt,
    Super,
    Other(u16),
}

impl Keysym {
    /// The modifier bit this key drives, if it is a modifier key.
    pub fn modifier(self) -> Option<ModifierMask> {
        match self {
            Keysym::Shift => Some(ModifierMask::SHIFT),
            Keysym::Control => Some(ModifierMask::CONTROL),
            Keysym::Alt => Some(ModifierMask::ALT),
            Keysym::Super => Some(ModifierMask::SUPER),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Pressed,
    Released,
}

/// A single key transition.
///
/// `mods` is the modifier state *after* this transition was applied and
/// `time` is the event timestamp in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Keysym,
    pub state: KeyState,
    pub mods: ModifierMask,
    pub time: u32,
}

/// Millisecond event timestamp, wrapping like X server time.
pub fn timestamp_ms(time: SystemTime) -> u32 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u32)
        .unwrap_or(0)
}

/// Live modifier state, written by the keyboard monitor thread and read by the
/// host when the switcher asks which modifiers are currently held.
#[derive(Debug, Clone, Default)]
pub struct ModifierState(Arc<AtomicU32>);

impl ModifierState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> ModifierMask {
        ModifierMask::from_bits_truncate(self.0.load(Ordering::Acquire))
    }

    /// Apply a key transition and return the resulting mask.
    pub fn apply(&self, key: Keysym, state: KeyState) -> ModifierMask {
        let Some(bit) = key.modifier() else {
            return self.get();
        };
        let previous = match state {
            KeyState::Pressed => self.0.fetch_or(bit.bits(), Ordering::AcqRel),
            KeyState::Released => self.0.fetch_and(!bit.bits(), Ordering::AcqRel),
        };
        let previous = ModifierMask::from_bits_truncate(previous);
        match state {
            KeyState::Pressed => previous | bit,
            KeyState::Released => previous - bit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_modifier_picks_highest_bit() {
        assert_eq!(primary_modifier(ModifierMask::ALT), ModifierMask::ALT);
        assert_eq!(
            primary_modifier(ModifierMask::ALT | ModifierMask::SHIFT),
            ModifierMask::ALT
        );
        assert_eq!(
            primary_modifier(ModifierMask::SUPER | ModifierMask::SHIFT),
            ModifierMask::SUPER
        );
        assert_eq!(primary_modifier(ModifierMask::empty()), ModifierMask::empty());
    }

    #[test]
    fn test_modifier_state_tracks_press_and_release() {
        let state = ModifierState::new();
        assert!(state.get().is_empty());

        let mods = state.apply(Keysym::Alt, KeyState::Pressed);
        assert_eq!(mods, ModifierMask::ALT);

        let mods = state.apply(Keysym::Shift, KeyState::Pressed);
        assert_eq!(mods, ModifierMask::ALT | ModifierMask::SHIFT);

        let mods = state.apply(Keysym::Alt, KeyState::Released);
        assert_eq!(mods, ModifierMask::SHIFT);
        assert_eq!(state.get(), ModifierMask::SHIFT);
    }

    #[test]
    fn test_modifier_state_ignores_regular_keys() {
        let state = ModifierState::new();
        state.apply(Keysym::Alt, KeyState::Pressed);
        assert_eq!(state.apply(Keysym::Tab, KeyState::Pressed), ModifierMask::ALT);
        assert_eq!(state.apply(Keysym::Tab, KeyState::Released), ModifierMask::ALT);
    }

    #[test]
    fn test_modifier_state_is_shared_between_clones() {
        let state = ModifierState::new();
        let reader = state.clone();
        state.apply(Keysym::Super, KeyState::Pressed);
        assert_eq!(reader.get(), ModifierMask::SUPER);
    }
}
