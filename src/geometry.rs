//! Window identities, screen rectangles and first-run layout

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Every overlay window the widget owns
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WindowId {
    Player,
    Tank,
    TankSelector,
    SettingsCog,
    Settings,
}

impl WindowId {
    pub const ALL: [WindowId; 5] = [
        WindowId::Player,
        WindowId::Tank,
        WindowId::TankSelector,
        WindowId::SettingsCog,
        WindowId::Settings,
    ];

    /// Windows whose geometry is persisted. Settings is ephemeral.
    pub const TRACKED: [WindowId; 4] = [
        WindowId::Player,
        WindowId::Tank,
        WindowId::TankSelector,
        WindowId::SettingsCog,
    ];

    pub fn is_tracked(self) -> bool {
        self != WindowId::Settings
    }

    pub fn title(self) -> &'static str {
        match self {
            WindowId::Player => "TankWatch - Player",
            WindowId::Tank => "TankWatch - Tank",
            WindowId::TankSelector => "TankWatch - Tank Selector",
            WindowId::SettingsCog => "TankWatch - Settings Cog",
            WindowId::Settings => "TankWatch - Settings",
        }
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WindowId::Player => "player",
            WindowId::Tank => "tank",
            WindowId::TankSelector => "tank-selector",
            WindowId::SettingsCog => "settings-cog",
            WindowId::Settings => "settings",
        };
        f.write_str(name)
    }
}

/// Screen-space rectangle in physical pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Rect { x, y, width, height }
    }

    /// Zero-sized rectangles are never valid window geometry
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Position a `width` x `height` rectangle in the middle of `self`
    pub fn centered(&self, width: u32, height: u32) -> Rect {
        let x = self.x + (self.width as i32 - width as i32) / 2;
        let y = self.y + (self.height as i32 - height as i32) / 2;
        Rect::new(x, y, width, height)
    }
}

/// Persisted geometry map, keyed by window id
pub type GeometryMap = BTreeMap<WindowId, Rect>;

pub const OVERLAY_WIDTH: u32 = 200;
pub const OVERLAY_HEIGHT: u32 = 100;
pub const SELECTOR_HEIGHT: u32 = 300;
pub const COG_SIZE: u32 = 40;
pub const SETTINGS_WIDTH: u32 = 400;
pub const SETTINGS_HEIGHT: u32 = 300;
const STACK_GAP: i32 = 10;

/// Hard-coded first-run position of a window inside the given work area
pub fn default_rect(id: WindowId, work_area: Rect) -> Rect {
    let right = work_area.x + work_area.width as i32 - OVERLAY_WIDTH as i32;
    let below = work_area.y + OVERLAY_HEIGHT as i32 + STACK_GAP;
    match id {
        WindowId::Player => Rect::new(work_area.x, work_area.y, OVERLAY_WIDTH, OVERLAY_HEIGHT),
        WindowId::Tank => Rect::new(right, work_area.y, OVERLAY_WIDTH, OVERLAY_HEIGHT),
        WindowId::TankSelector => Rect::new(right, below, OVERLAY_WIDTH, SELECTOR_HEIGHT),
        WindowId::SettingsCog => Rect::new(work_area.x, below, COG_SIZE, COG_SIZE),
        WindowId::Settings => work_area.centered(SETTINGS_WIDTH, SETTINGS_HEIGHT),
    }
}

/// Default geometry for every tracked window
pub fn default_layout(work_area: Rect) -> GeometryMap {
    WindowId::TRACKED
        .iter()
        .map(|&id| (id, default_rect(id, work_area)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_covers_tracked_windows() {
        let layout = default_layout(Rect::new(0, 0, 1920, 1040));
        assert_eq!(layout.len(), 4);
        assert!(!layout.contains_key(&WindowId::Settings));
        assert_eq!(layout[&WindowId::Player], Rect::new(0, 0, 200, 100));
        assert_eq!(layout[&WindowId::Tank], Rect::new(1720, 0, 200, 100));
    }

    #[test]
    fn test_default_layout_follows_work_area_origin() {
        let layout = default_layout(Rect::new(100, 50, 1280, 720));
        assert_eq!(layout[&WindowId::Player].x, 100);
        assert_eq!(layout[&WindowId::Player].y, 50);
        assert_eq!(layout[&WindowId::Tank].x, 100 + 1280 - 200);
        assert!(layout.values().all(Rect::is_valid));
    }

    #[test]
    fn test_centered() {
        let area = Rect::new(0, 0, 1000, 800);
        assert_eq!(area.centered(400, 300), Rect::new(300, 250, 400, 300));
    }

    #[test]
    fn test_window_id_serializes_as_map_key() {
        let layout = default_layout(Rect::new(0, 0, 800, 600));
        let json = serde_json::to_string(&layout).unwrap();
        assert!(json.contains("\"TankSelector\""));
        let back: GeometryMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, layout);
    }
}
