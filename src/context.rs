//! AppContext: everything the handlers need, built once at startup and passed
//! by reference to every event handler.
//!
//! All handlers run to completion on the event loop thread. Errors never leave
//! a handler; they are logged and the loop carries on.

use crate::broadcaster::StateBroadcaster;
use crate::bus::MessageSink;
use crate::catalog::MatchupTable;
use crate::error::StoreError;
use crate::geometry::{Rect, WindowId};
use crate::messages::InboundMessage;
use crate::persister::{FlushReason, GeometryPersister};
use crate::registry::{WindowFactory, WindowRegistry};
use crate::state::AppState;
use crate::stats::{FetchWorker, StatsSource};
use crate::store::DurableStore;
use crate::visibility::{Visibility, VisibilityController};
use std::sync::Arc;

/// Where the usable desktop area currently is
pub trait Screen {
    fn work_area(&self) -> Rect;
}

pub struct AppContext {
    store: DurableStore,
    registry: WindowRegistry,
    state: AppState,
    visibility: VisibilityController,
    broadcaster: StateBroadcaster,
    persister: GeometryPersister,
    screen: Box<dyn Screen>,
    shut_down: bool,
}

impl AppContext {
    /// Restore state, seed first-run defaults and create the windows in their
    /// persisted visibility. Windows must then be attached before `announce`.
    pub fn start(
        store: DurableStore,
        factory: &mut dyn WindowFactory,
        screen: Box<dyn Screen>,
        stats: Arc<dyn StatsSource>,
        matchups: MatchupTable,
    ) -> Result<Self, StoreError> {
        let work_area = screen.work_area();
        let mut state = AppState::load(&store, work_area)?;
        state.matchups = matchups;

        let mut registry = WindowRegistry::create_all(factory, &state.window_geometry, work_area);
        let visibility = VisibilityController::restore(&store);
        visibility.apply(&mut registry);
        state.is_visible = visibility.state().is_shown();

        let broadcaster = StateBroadcaster::new(store.clone(), FetchWorker::new(stats));
        tracing::info!(
            "Started with {} windows, overlay {:?}",
            registry.live_ids().len(),
            visibility.state()
        );

        Ok(AppContext {
            store,
            registry,
            state,
            visibility,
            broadcaster,
            persister: GeometryPersister::new(),
            screen,
            shut_down: false,
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn registry(&self) -> &WindowRegistry {
        &self.registry
    }

    pub fn store(&self) -> &DurableStore {
        &self.store
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility.state()
    }

    pub fn attach(&mut self, window: WindowId, sink: Box<dyn MessageSink>) {
        self.broadcaster.attach(window, sink);
    }

    /// Push last known username/hero into attached windows
    pub fn announce(&mut self) {
        self.broadcaster.announce(&self.state);
    }

    /// Raw document from a window; malformed documents change nothing
    pub fn handle_raw_message(&mut self, from: WindowId, json: &str) {
        match InboundMessage::parse(json) {
            Ok(message) => self.handle_message(from, message),
            Err(e) => tracing::warn!("Rejected message from {} window: {}", from, e),
        }
    }

    pub fn handle_message(&mut self, from: WindowId, message: InboundMessage) {
        tracing::debug!("{} window sent {:?}", from, message);
        let message = match message.validated() {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("Rejected message from {} window: {}", from, e);
                return;
            }
        };
        match message {
            InboundMessage::SubmitUsername { username } => self.set_username(&username),
            InboundMessage::SelectTank { hero } => self.set_selected_hero(&hero),
            InboundMessage::ToggleSettings => {
                self.toggle_settings();
            }
        }
    }

    pub fn set_username(&mut self, username: &str) {
        if let Err(e) = self.broadcaster.set_username(&mut self.state, username) {
            tracing::error!("Failed to persist username: {}", e);
        }
    }

    pub fn set_selected_hero(&mut self, hero: &str) {
        if let Err(e) = self.broadcaster.set_selected_hero(&mut self.state, hero) {
            tracing::error!("Failed to persist selected hero: {}", e);
        }
    }

    /// Show or hide the whole overlay group
    pub fn toggle(&mut self) -> Visibility {
        if let Err(e) = self.visibility.toggle(&mut self.registry, &self.store) {
            tracing::error!("Failed to persist visibility: {}", e);
        }
        self.state.is_visible = self.visibility.state().is_shown();
        self.visibility.state()
    }

    pub fn toggle_settings(&mut self) -> bool {
        let work_area = self.screen.work_area();
        self.visibility.toggle_settings(&mut self.registry, work_area)
    }

    /// A window was moved or resized by the user
    pub fn on_window_changed(&mut self, id: WindowId) {
        self.flush(FlushReason::WindowChanged(id));
    }

    /// The platform destroyed a window. Returns true once no window is left.
    pub fn on_window_destroyed(&mut self, id: WindowId) -> bool {
        self.registry.destroy(id);
        self.broadcaster.detach(id);
        self.registry.all_destroyed()
    }

    /// Explicit "save" from the tray menu
    pub fn save(&mut self) {
        self.flush(FlushReason::Save);
    }

    /// Deliver finished stats requests
    pub fn poll_fetches(&mut self) -> usize {
        self.broadcaster.poll(&mut self.state)
    }

    #[cfg(test)]
    pub fn wait_for_fetch(&mut self, timeout: std::time::Duration) -> bool {
        self.broadcaster.wait(&mut self.state, timeout)
    }

    /// Final geometry flush. Only the first call does any work.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.flush(FlushReason::Quit);
        self.shut_down = true;
        tracing::info!("Shutdown flush complete");
    }

    fn flush(&mut self, reason: FlushReason) {
        if let Err(e) = self
            .persister
            .flush(reason, &self.registry, &self.store, &mut self.state)
        {
            tracing::error!("Failed to persist window positions: {}", e);
        }
    }
}
