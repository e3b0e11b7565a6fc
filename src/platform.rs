//! winit-backed overlay windows and screen queries
//!
//! Windows are created on the event loop thread before the loop starts and
//! are only touched from that thread afterwards.

use crate::context::Screen;
use crate::geometry::{Rect, WindowId};
use crate::registry::{OverlayWindow, WindowFactory, WindowOptions};
use anyhow::{Context, Result};
use std::collections::HashMap;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event_loop::EventLoopWindowTarget;
use winit::monitor::MonitorHandle;
use winit::window::{Window, WindowBuilder, WindowLevel};

/// Used when no monitor can be queried at all
const FALLBACK_WORK_AREA: Rect = Rect {
    x: 0,
    y: 0,
    width: 1920,
    height: 1080,
};

pub struct WinitOverlay {
    window: Option<Window>,
    visible: bool,
}

impl OverlayWindow for WinitOverlay {
    fn show(&mut self) {
        if let Some(ref window) = self.window {
            window.set_visible(true);
            self.visible = true;
        }
    }

    fn hide(&mut self) {
        if let Some(ref window) = self.window {
            window.set_visible(false);
            self.visible = false;
        }
    }

    fn is_visible(&self) -> bool {
        self.window
            .as_ref()
            .map(|w| w.is_visible().unwrap_or(self.visible))
            .unwrap_or(false)
    }

    fn bounds(&self) -> Option<Rect> {
        let window = self.window.as_ref()?;
        let position = window.outer_position().ok()?;
        let size = window.inner_size();
        Some(Rect::new(position.x, position.y, size.width, size.height))
    }

    fn set_bounds(&mut self, rect: Rect) {
        if let Some(ref window) = self.window {
            window.set_outer_position(PhysicalPosition::new(rect.x, rect.y));
            let _ = window.request_inner_size(PhysicalSize::new(rect.width, rect.height));
        }
    }

    fn is_destroyed(&self) -> bool {
        self.window.is_none()
    }

    fn destroy(&mut self) {
        self.window = None;
        self.visible = false;
    }
}

/// Builds overlay windows on the event loop and remembers which platform
/// window id belongs to which overlay
pub struct WinitWindowFactory<'a> {
    target: &'a EventLoopWindowTarget<()>,
    ids: HashMap<winit::window::WindowId, WindowId>,
    warned_workspaces: bool,
}

impl<'a> WinitWindowFactory<'a> {
    pub fn new(target: &'a EventLoopWindowTarget<()>) -> Self {
        WinitWindowFactory {
            target,
            ids: HashMap::new(),
            warned_workspaces: false,
        }
    }

    pub fn into_window_ids(self) -> HashMap<winit::window::WindowId, WindowId> {
        self.ids
    }
}

impl WindowFactory for WinitWindowFactory<'_> {
    fn create(&mut self, options: &WindowOptions) -> Result<Box<dyn OverlayWindow>> {
        let bounds = options.bounds;
        let mut builder = WindowBuilder::new()
            .with_title(options.title)
            .with_decorations(!options.frameless)
            .with_transparent(options.transparent)
            .with_visible(options.visible)
            .with_position(PhysicalPosition::new(bounds.x, bounds.y))
            .with_inner_size(PhysicalSize::new(bounds.width, bounds.height));

        if options.always_on_top {
            builder = builder.with_window_level(WindowLevel::AlwaysOnTop);
        }

        #[cfg(windows)]
        {
            use winit::platform::windows::WindowBuilderExtWindows;
            // Overlays are not taskbar applications
            builder = builder.with_skip_taskbar(true);
        }

        if options.all_workspaces && !self.warned_workspaces {
            tracing::warn!(
                "Overlays cannot be pinned to every virtual desktop here; they stay on the desktop they open on"
            );
            self.warned_workspaces = true;
        }

        let window = builder
            .build(self.target)
            .with_context(|| format!("Failed to build {} window", options.id))?;
        self.ids.insert(window.id(), options.id);

        Ok(Box::new(WinitOverlay {
            window: Some(window),
            visible: options.visible,
        }))
    }
}

/// The desktop the overlays live on
pub struct DesktopScreen {
    monitor: Option<MonitorHandle>,
}

impl DesktopScreen {
    pub fn new(target: &EventLoopWindowTarget<()>) -> Self {
        let monitor = target
            .primary_monitor()
            .or_else(|| target.available_monitors().next());
        if monitor.is_none() {
            tracing::warn!("No monitor reported, using {:?}", FALLBACK_WORK_AREA);
        }
        DesktopScreen { monitor }
    }

    fn monitor_area(&self) -> Option<Rect> {
        let monitor = self.monitor.as_ref()?;
        let position = monitor.position();
        let size = monitor.size();
        let area = Rect::new(position.x, position.y, size.width, size.height);
        area.is_valid().then_some(area)
    }
}

impl Screen for DesktopScreen {
    fn work_area(&self) -> Rect {
        system_work_area()
            .or_else(|| self.monitor_area())
            .unwrap_or(FALLBACK_WORK_AREA)
    }
}

/// Primary work area excluding the taskbar
#[cfg(windows)]
fn system_work_area() -> Option<Rect> {
    use windows::Win32::Foundation::RECT;
    use windows::Win32::UI::WindowsAndMessaging::{
        SystemParametersInfoW, SPI_GETWORKAREA, SYSTEM_PARAMETERS_INFO_UPDATE_FLAGS,
    };

    let mut rect = RECT::default();
    unsafe {
        let _ = SystemParametersInfoW(
            SPI_GETWORKAREA,
            0,
            Some(&mut rect as *mut RECT as *mut core::ffi::c_void),
            SYSTEM_PARAMETERS_INFO_UPDATE_FLAGS(0),
        );
    }

    // Untouched rect means the call failed
    if rect.right <= rect.left || rect.bottom <= rect.top {
        return None;
    }
    Some(Rect::new(
        rect.left,
        rect.top,
        (rect.right - rect.left) as u32,
        (rect.bottom - rect.top) as u32,
    ))
}

#[cfg(not(windows))]
fn system_work_area() -> Option<Rect> {
    None
}
