//! TankWatch - game stats overlay
//!
//! This process owns:
//! - The overlay windows and their persisted geometry/visibility
//! - The tray icon and the global toggle shortcut
//! - Stats fetches, fanned out to the windows that show them
//!
//! Window content is drawn by a separate renderer. A renderer attaches through
//! `AppContext::attach` with a `MessageSink` per window, and sends user input
//! back as JSON documents through `AppContext::handle_raw_message`. Until one
//! is attached, each window gets a channel inbox that is drained into the
//! debug log.

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use anyhow::{Context, Result};
use crossbeam::channel::{unbounded, Receiver};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tankwatch::catalog;
use tankwatch::config;
use tankwatch::context::AppContext;
use tankwatch::geometry::WindowId;
use tankwatch::hotkey::ToggleHotkey;
use tankwatch::messages::OutboundMessage;
use tankwatch::platform::{DesktopScreen, WinitWindowFactory};
use tankwatch::stats::HttpStatsClient;
use tankwatch::store::DurableStore;
use tankwatch::tray::{TrayAction, TrayManager};
use winit::event::{Event, StartCause, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};

/// How often tray, hotkey and fetch results are polled
const POLL_INTERVAL: Duration = Duration::from_millis(16);

/// Outbound documents waiting for a window's renderer
type Inbox = (WindowId, Receiver<OutboundMessage>);

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    tracing::info!("TankWatch starting...");

    let app_config = config::load_config();
    let data_dir = config::get_data_directory()?;
    tracing::info!("Data directory: {}", data_dir.display());

    let store = DurableStore::open(data_dir.join(config::STORE_FILE))
        .context("Failed to open store")?;
    let matchups = catalog::load_first_matchups(&app_config.matchup_candidates(&data_dir));
    let stats = HttpStatsClient::new(
        &app_config.stats_api_base_url,
        Duration::from_secs(app_config.request_timeout_secs),
    )
    .context("Failed to create stats client")?;

    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    let mut factory = WinitWindowFactory::new(&event_loop);
    let screen = DesktopScreen::new(&event_loop);
    let mut ctx = AppContext::start(store, &mut factory, Box::new(screen), Arc::new(stats), matchups)
        .context("Failed to restore overlay state")?;
    let window_ids = factory.into_window_ids();

    let inboxes: Vec<Inbox> = WindowId::ALL
        .into_iter()
        .map(|id| {
            let (tx, rx) = unbounded();
            ctx.attach(id, Box::new(tx));
            (id, rx)
        })
        .collect();
    ctx.announce();

    let mut hotkey = match ToggleHotkey::register(&app_config.toggle_shortcut) {
        Ok(hotkey) => Some(hotkey),
        Err(e) => {
            tracing::error!("Toggle shortcut unavailable: {}", e);
            None
        }
    };
    let mut tray: Option<TrayManager> = None;

    event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::WaitUntil(Instant::now() + POLL_INTERVAL));

        match event {
            Event::NewEvents(StartCause::Init) => {
                tray = match TrayManager::new() {
                    Ok(tray) => Some(tray),
                    Err(e) => {
                        tracing::warn!("Tray icon unavailable: {}", e);
                        None
                    }
                };
                tracing::info!(
                    "TankWatch started, toggle with {}",
                    app_config.toggle_shortcut.display_text()
                );
            }

            Event::WindowEvent { window_id, event } => {
                let Some(&id) = window_ids.get(&window_id) else {
                    return;
                };
                match event {
                    WindowEvent::Moved(_) | WindowEvent::Resized(_) => ctx.on_window_changed(id),
                    WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                        if ctx.on_window_destroyed(id) {
                            tracing::info!("All overlay windows closed");
                            quit(&mut ctx, &mut hotkey);
                            elwt.exit();
                        }
                    }
                    _ => {}
                }
            }

            Event::AboutToWait => {
                let actions = tray.as_ref().map(TrayManager::poll).unwrap_or_default();
                for action in actions {
                    match action {
                        TrayAction::Toggle => {
                            ctx.toggle();
                        }
                        TrayAction::Save => ctx.save(),
                        TrayAction::Quit => {
                            quit(&mut ctx, &mut hotkey);
                            elwt.exit();
                            return;
                        }
                    }
                }

                let presses = hotkey.as_ref().map(ToggleHotkey::poll).unwrap_or(0);
                for _ in 0..presses {
                    ctx.toggle();
                }

                ctx.poll_fetches();
                deliver(&inboxes);
            }

            Event::LoopExiting => quit(&mut ctx, &mut hotkey),

            _ => {}
        }
    })?;

    Ok(())
}

/// Flush geometry and release the shortcut. Runs once however often it is
/// reached.
fn quit(ctx: &mut AppContext, hotkey: &mut Option<ToggleHotkey>) {
    ctx.shutdown();
    if let Some(hotkey) = hotkey.as_mut() {
        hotkey.release();
    }
}

/// Drain the per-window inboxes. Without a renderer attached the documents
/// are only logged.
fn deliver(inboxes: &[Inbox]) {
    for (id, rx) in inboxes {
        for message in rx.try_iter() {
            match serde_json::to_string(&message) {
                Ok(json) => tracing::debug!("-> {} window: {}", id, json),
                Err(e) => tracing::warn!("Failed to encode {:?} for {} window: {}", message.kind(), id, e),
            }
        }
    }
}
