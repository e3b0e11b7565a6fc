//! System tray icon with the overlay's context menu
//!
//! Only desktops with a native tray get one. Elsewhere `TrayManager::new`
//! fails and the toggle hotkey is the only control.

/// What the user asked for through the tray
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayAction {
    Toggle,
    Save,
    Quit,
}

pub const TOOLTIP: &str = "TankWatch";

#[cfg(any(windows, target_os = "macos"))]
pub use native::TrayManager;

#[cfg(not(any(windows, target_os = "macos")))]
pub use unsupported::TrayManager;

#[cfg(any(windows, target_os = "macos"))]
mod native {
    use super::{TrayAction, TOOLTIP};
    use anyhow::{anyhow, Result};
    use std::path::PathBuf;
    use tray_icon::menu::{Menu, MenuEvent, MenuId, MenuItem, PredefinedMenuItem};
    use tray_icon::{Icon, MouseButton, MouseButtonState, TrayIcon, TrayIconBuilder, TrayIconEvent};

    const ICON_FILE: &str = "icon.png";
    const ICON_SIZE: u32 = 16;

    /// Load icon.png from next to the executable or the working directory
    fn load_app_icon() -> Result<Icon> {
        let paths_to_try = [
            std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|p| p.join(ICON_FILE))),
            Some(PathBuf::from(ICON_FILE)),
        ];

        for path in paths_to_try.into_iter().flatten() {
            if !path.exists() {
                continue;
            }
            let icon_data = std::fs::read(&path)
                .map_err(|e| anyhow!("Failed to read {}: {}", path.display(), e))?;
            let img = image::load_from_memory(&icon_data)
                .map_err(|e| anyhow!("Failed to decode icon: {}", e))?;
            let rgba = img
                .resize_exact(ICON_SIZE, ICON_SIZE, image::imageops::FilterType::Lanczos3)
                .to_rgba8();
            return Icon::from_rgba(rgba.into_raw(), ICON_SIZE, ICON_SIZE)
                .map_err(|e| anyhow!("Failed to create icon from image: {:?}", e));
        }

        // Fallback: orange square
        let icon_rgba: Vec<u8> = (0..ICON_SIZE * ICON_SIZE)
            .flat_map(|_| [0xF9, 0x9E, 0x1A, 0xFF])
            .collect();
        Icon::from_rgba(icon_rgba, ICON_SIZE, ICON_SIZE)
            .map_err(|e| anyhow!("Failed to create fallback icon: {:?}", e))
    }

    pub struct TrayManager {
        #[allow(dead_code)]
        tray_icon: TrayIcon,
        menu_item_toggle: MenuId,
        menu_item_save: MenuId,
        menu_item_quit: MenuId,
    }

    impl TrayManager {
        pub fn new() -> Result<Self> {
            tracing::info!("Creating tray icon");
            let icon = load_app_icon()?;

            let menu = Menu::new();
            let toggle_item = MenuItem::new("Show/Hide Overlay", true, None);
            let save_item = MenuItem::new("Save Positions", true, None);
            let separator = PredefinedMenuItem::separator();
            let quit_item = MenuItem::new("Quit", true, None);

            menu.append(&toggle_item)
                .map_err(|e| anyhow!("Failed to add toggle item: {}", e))?;
            menu.append(&save_item)
                .map_err(|e| anyhow!("Failed to add save item: {}", e))?;
            menu.append(&separator)
                .map_err(|e| anyhow!("Failed to add separator: {}", e))?;
            menu.append(&quit_item)
                .map_err(|e| anyhow!("Failed to add quit item: {}", e))?;

            let tray_icon = TrayIconBuilder::new()
                .with_tooltip(TOOLTIP)
                .with_icon(icon)
                .with_menu(Box::new(menu))
                .with_menu_on_left_click(false)
                .build()
                .map_err(|e| anyhow!("Failed to create tray icon: {}", e))?;

            tracing::info!("Tray icon created");
            Ok(Self {
                tray_icon,
                menu_item_toggle: toggle_item.id().clone(),
                menu_item_save: save_item.id().clone(),
                menu_item_quit: quit_item.id().clone(),
            })
        }

        fn action_for(&self, id: &MenuId) -> Option<TrayAction> {
            if *id == self.menu_item_toggle {
                Some(TrayAction::Toggle)
            } else if *id == self.menu_item_save {
                Some(TrayAction::Save)
            } else if *id == self.menu_item_quit {
                Some(TrayAction::Quit)
            } else {
                None
            }
        }

        /// Drain pending tray and menu events. A left click toggles.
        pub fn poll(&self) -> Vec<TrayAction> {
            let mut actions = Vec::new();

            while let Ok(event) = TrayIconEvent::receiver().try_recv() {
                if let TrayIconEvent::Click {
                    button: MouseButton::Left,
                    button_state: MouseButtonState::Up,
                    ..
                } = event
                {
                    actions.push(TrayAction::Toggle);
                }
            }

            while let Ok(event) = MenuEvent::receiver().try_recv() {
                match self.action_for(&event.id) {
                    Some(action) => actions.push(action),
                    None => tracing::debug!("Unknown menu event: {:?}", event.id),
                }
            }

            actions
        }
    }
}

#[cfg(not(any(windows, target_os = "macos")))]
mod unsupported {
    use super::TrayAction;
    use anyhow::{bail, Result};

    pub struct TrayManager;

    impl TrayManager {
        pub fn new() -> Result<Self> {
            bail!("No system tray on this platform")
        }

        pub fn poll(&self) -> Vec<TrayAction> {
            Vec::new()
        }
    }
}
