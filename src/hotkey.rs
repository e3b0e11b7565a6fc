//! Global toggle chord
//!
//! Uses the global-hotkey crate. Events arrive on its static receiver and are
//! drained from the event loop, so on Windows the chord only fires while the
//! winit message loop is pumping.

use crate::config::Shortcut;
use anyhow::{anyhow, Result};
use global_hotkey::{
    hotkey::{Code, HotKey, Modifiers},
    GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState,
};

fn to_hotkey_modifiers(shortcut: &Shortcut) -> Modifiers {
    let mut mods = Modifiers::empty();
    if shortcut.ctrl {
        mods |= Modifiers::CONTROL;
    }
    if shortcut.alt {
        mods |= Modifiers::ALT;
    }
    if shortcut.shift {
        mods |= Modifiers::SHIFT;
    }
    if shortcut.win {
        mods |= Modifiers::META;
    }
    mods
}

/// "T" -> KeyT, "7" -> Digit7, "F5" -> F5
fn string_to_code(key: &str) -> Option<Code> {
    let key = key.trim().to_uppercase();
    let name = match key.as_bytes() {
        [c] if c.is_ascii_uppercase() => format!("Key{}", key),
        [c] if c.is_ascii_digit() => format!("Digit{}", key),
        [b'F', rest @ ..] if !rest.is_empty() && rest.iter().all(u8::is_ascii_digit) => {
            match key[1..].parse::<u8>() {
                Ok(1..=12) => key.clone(),
                _ => return None,
            }
        }
        _ => return None,
    };
    name.parse::<Code>().ok()
}

/// Bare keys are refused; a system-wide grab of one key would steal it from
/// every other application
pub fn to_hotkey(shortcut: &Shortcut) -> Result<HotKey> {
    if !shortcut.is_valid() {
        return Err(anyhow!(
            "Shortcut {} needs at least one modifier",
            shortcut.display_text()
        ));
    }
    let code = string_to_code(&shortcut.key)
        .ok_or_else(|| anyhow!("Unsupported shortcut key: {:?}", shortcut.key))?;
    let mods = to_hotkey_modifiers(shortcut);
    Ok(HotKey::new((!mods.is_empty()).then_some(mods), code))
}

pub struct ToggleHotkey {
    manager: GlobalHotKeyManager,
    hotkey: Option<HotKey>,
}

impl ToggleHotkey {
    pub fn register(shortcut: &Shortcut) -> Result<Self> {
        let hotkey = to_hotkey(shortcut)?;
        let manager = GlobalHotKeyManager::new()
            .map_err(|e| anyhow!("Failed to create hotkey manager: {:?}", e))?;
        manager
            .register(hotkey)
            .map_err(|e| anyhow!("Failed to register {}: {:?}", shortcut.display_text(), e))?;
        tracing::info!("Registered toggle shortcut {}", shortcut.display_text());
        Ok(ToggleHotkey {
            manager,
            hotkey: Some(hotkey),
        })
    }

    /// Number of presses of the chord since the last poll
    pub fn poll(&self) -> usize {
        let Some(hotkey) = self.hotkey.as_ref() else {
            return 0;
        };
        GlobalHotKeyEvent::receiver()
            .try_iter()
            .filter(|event| event.id == hotkey.id() && event.state == HotKeyState::Pressed)
            .count()
    }

    /// Give the chord back to the system. Safe to call more than once.
    pub fn release(&mut self) {
        if let Some(hotkey) = self.hotkey.take() {
            match self.manager.unregister(hotkey) {
                Ok(()) => tracing::debug!("Toggle shortcut unregistered"),
                Err(e) => tracing::warn!("Failed to unregister toggle shortcut: {:?}", e),
            }
        }
    }
}

impl Drop for ToggleHotkey {
    fn drop(&mut self) {
        self.release();
    }
}
