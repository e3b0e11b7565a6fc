//! Window Registry
//!
//! Owns the fixed set of overlay window handles. Window lifetime is controlled
//! by the platform, so every operation on a missing or destroyed window is a
//! silent no-op instead of an error.

use crate::geometry::{default_rect, GeometryMap, Rect, WindowId};
use anyhow::Result;
use std::collections::BTreeMap;

/// A platform window the registry can drive
pub trait OverlayWindow {
    fn show(&mut self);
    fn hide(&mut self);
    fn is_visible(&self) -> bool;
    /// Current outer bounds, `None` if the platform cannot report them
    fn bounds(&self) -> Option<Rect>;
    fn set_bounds(&mut self, rect: Rect);
    fn is_destroyed(&self) -> bool;
    /// Release the platform window
    fn destroy(&mut self);
}

/// How an overlay window must be created
#[derive(Debug, Clone, PartialEq)]
pub struct WindowOptions {
    pub id: WindowId,
    pub title: &'static str,
    pub bounds: Rect,
    pub frameless: bool,
    pub transparent: bool,
    /// Stay above fullscreen applications
    pub always_on_top: bool,
    pub all_workspaces: bool,
    pub visible: bool,
}

impl WindowOptions {
    pub fn overlay(id: WindowId, bounds: Rect) -> Self {
        WindowOptions {
            id,
            title: id.title(),
            bounds,
            frameless: true,
            transparent: true,
            always_on_top: true,
            all_workspaces: true,
            visible: false,
        }
    }
}

/// Creates platform windows for the registry
pub trait WindowFactory {
    fn create(&mut self, options: &WindowOptions) -> Result<Box<dyn OverlayWindow>>;
}

#[derive(Default)]
pub struct WindowRegistry {
    windows: BTreeMap<WindowId, Box<dyn OverlayWindow>>,
}

impl WindowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create every overlay window hidden, at its persisted or default position.
    /// A window the platform refuses to create is logged and left out.
    pub fn create_all(
        factory: &mut dyn WindowFactory,
        geometry: &GeometryMap,
        work_area: Rect,
    ) -> Self {
        let mut registry = WindowRegistry::new();
        for id in WindowId::ALL {
            let bounds = geometry
                .get(&id)
                .copied()
                .filter(|r| id.is_tracked() && r.is_valid())
                .unwrap_or_else(|| default_rect(id, work_area));

            match factory.create(&WindowOptions::overlay(id, bounds)) {
                Ok(window) => {
                    tracing::debug!("Created {} window at {:?}", id, bounds);
                    registry.insert(id, window);
                }
                Err(e) => tracing::error!("Failed to create {} window: {}", id, e),
            }
        }
        registry
    }

    pub fn insert(&mut self, id: WindowId, window: Box<dyn OverlayWindow>) {
        self.windows.insert(id, window);
    }

    fn live(&self, id: WindowId) -> Option<&dyn OverlayWindow> {
        self.windows
            .get(&id)
            .map(|w| w.as_ref())
            .filter(|w| !w.is_destroyed())
    }

    fn live_mut(&mut self, id: WindowId) -> Option<&mut Box<dyn OverlayWindow>> {
        self.windows.get_mut(&id).filter(|w| !w.is_destroyed())
    }

    pub fn show(&mut self, id: WindowId) {
        match self.live_mut(id) {
            Some(window) => window.show(),
            None => tracing::debug!("show({}) skipped: no live window", id),
        }
    }

    pub fn hide(&mut self, id: WindowId) {
        match self.live_mut(id) {
            Some(window) => window.hide(),
            None => tracing::debug!("hide({}) skipped: no live window", id),
        }
    }

    pub fn set_bounds(&mut self, id: WindowId, rect: Rect) {
        if let Some(window) = self.live_mut(id) {
            window.set_bounds(rect);
        }
    }

    pub fn bounds(&self, id: WindowId) -> Option<Rect> {
        self.live(id).and_then(|w| w.bounds())
    }

    pub fn is_visible(&self, id: WindowId) -> bool {
        self.live(id).is_some_and(|w| w.is_visible())
    }

    /// Missing windows count as destroyed
    pub fn is_destroyed(&self, id: WindowId) -> bool {
        self.live(id).is_none()
    }

    /// Drop the platform window behind `id`, if any
    pub fn destroy(&mut self, id: WindowId) {
        if let Some(mut window) = self.windows.remove(&id) {
            window.destroy();
            tracing::info!("{} window destroyed", id);
        }
    }

    pub fn live_ids(&self) -> Vec<WindowId> {
        WindowId::ALL
            .into_iter()
            .filter(|&id| !self.is_destroyed(id))
            .collect()
    }

    pub fn visible_ids(&self) -> Vec<WindowId> {
        WindowId::ALL
            .into_iter()
            .filter(|&id| self.is_visible(id))
            .collect()
    }

    pub fn all_destroyed(&self) -> bool {
        self.live_ids().is_empty()
    }
}
