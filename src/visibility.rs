//! Visibility Controller
//!
//! Shows or hides the overlay group as one unit. The Settings popover has its
//! own toggle and is only ever force-closed by the group toggle, never opened.

use crate::error::StoreError;
use crate::geometry::{Rect, WindowId, SETTINGS_HEIGHT, SETTINGS_WIDTH};
use crate::registry::WindowRegistry;
use crate::store::{DurableStore, KEY_IS_VISIBLE};

/// Windows shown together when the group becomes visible
pub const GROUP: [WindowId; 4] = [
    WindowId::Player,
    WindowId::Tank,
    WindowId::TankSelector,
    WindowId::SettingsCog,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Shown,
    Hidden,
}

impl Visibility {
    pub fn from_flag(visible: bool) -> Self {
        if visible {
            Visibility::Shown
        } else {
            Visibility::Hidden
        }
    }

    pub fn is_shown(self) -> bool {
        self == Visibility::Shown
    }

    fn flipped(self) -> Self {
        match self {
            Visibility::Shown => Visibility::Hidden,
            Visibility::Hidden => Visibility::Shown,
        }
    }
}

pub struct VisibilityController {
    state: Visibility,
    settings_open: bool,
}

impl VisibilityController {
    /// Restore the last persisted state, `Hidden` on first run
    pub fn restore(store: &DurableStore) -> Self {
        VisibilityController {
            state: Visibility::from_flag(store.get(KEY_IS_VISIBLE, false)),
            settings_open: false,
        }
    }

    pub fn state(&self) -> Visibility {
        self.state
    }

    pub fn settings_open(&self) -> bool {
        self.settings_open
    }

    /// Push the current state onto freshly created windows
    pub fn apply(&self, registry: &mut WindowRegistry) {
        if self.state.is_shown() {
            for id in GROUP {
                registry.show(id);
            }
        }
    }

    /// Flip the group. The new flag is on disk before this returns.
    pub fn toggle(
        &mut self,
        registry: &mut WindowRegistry,
        store: &DurableStore,
    ) -> Result<Visibility, StoreError> {
        self.state = self.state.flipped();
        match self.state {
            Visibility::Shown => {
                for id in GROUP {
                    registry.show(id);
                }
            }
            Visibility::Hidden => {
                for id in WindowId::ALL {
                    registry.hide(id);
                }
                self.settings_open = false;
            }
        }
        tracing::info!("Overlay {:?}", self.state);
        store.set(KEY_IS_VISIBLE, self.state.is_shown())?;
        Ok(self.state)
    }

    /// Open or close the Settings popover, re-centred on every open
    pub fn toggle_settings(&mut self, registry: &mut WindowRegistry, work_area: Rect) -> bool {
        if registry.is_destroyed(WindowId::Settings) {
            self.settings_open = false;
            return false;
        }
        self.settings_open = !self.settings_open;
        if self.settings_open {
            registry.set_bounds(
                WindowId::Settings,
                work_area.centered(SETTINGS_WIDTH, SETTINGS_HEIGHT),
            );
            registry.show(WindowId::Settings);
        } else {
            registry.hide(WindowId::Settings);
        }
        tracing::debug!("Settings open: {}", self.settings_open);
        self.settings_open
    }
}
