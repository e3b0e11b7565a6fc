//! State Broadcaster
//!
//! The single place cross-window fields change. Each setter writes the store
//! first and only then publishes, so a window reacting to the broadcast by
//! re-reading the store sees the new value.

use crate::bus::{default_interests, MessageBus, MessageSink};
use crate::catalog::HeroCatalog;
use crate::error::StoreError;
use crate::geometry::WindowId;
use crate::messages::OutboundMessage;
use crate::state::AppState;
use crate::stats::{normalize_player_id, FetchOutcome, FetchWorker};
use crate::store::{DurableStore, KEY_SELECTED_HERO, KEY_USERNAME};

pub struct StateBroadcaster {
    store: DurableStore,
    bus: MessageBus,
    fetcher: FetchWorker,
}

impl StateBroadcaster {
    pub fn new(store: DurableStore, fetcher: FetchWorker) -> Self {
        StateBroadcaster {
            store,
            bus: MessageBus::new(),
            fetcher,
        }
    }

    /// Subscribe `window` to the message kinds it displays
    pub fn attach(&mut self, window: WindowId, sink: Box<dyn MessageSink>) {
        self.bus.subscribe(window, default_interests(window), sink);
    }

    pub fn detach(&mut self, window: WindowId) {
        self.bus.unsubscribe(window);
    }

    pub fn set_username(&mut self, state: &mut AppState, username: &str) -> Result<(), StoreError> {
        self.store.set(KEY_USERNAME, username)?;
        state.username = Some(username.to_string());
        tracing::info!("Username set to {}", username);

        self.fetcher.fetch_player(normalize_player_id(username));
        self.bus.publish(&OutboundMessage::UpdateUsername {
            username: username.to_string(),
        });
        Ok(())
    }

    pub fn set_selected_hero(&mut self, state: &mut AppState, hero: &str) -> Result<(), StoreError> {
        self.store.set(KEY_SELECTED_HERO, hero)?;
        state.selected_hero = hero.to_string();
        tracing::info!("Selected hero set to {}", hero);

        self.bus.publish(&OutboundMessage::UpdateSelectedTank {
            hero: hero.to_string(),
        });
        Ok(())
    }

    /// Push the last known state into freshly attached windows and start the
    /// once-per-session hero list fetch
    pub fn announce(&mut self, state: &AppState) {
        self.bus.publish(&OutboundMessage::UpdateSelectedTank {
            hero: state.selected_hero.clone(),
        });
        if let Some(ref username) = state.username {
            self.bus.publish(&OutboundMessage::UpdateUsername {
                username: username.clone(),
            });
            self.fetcher.fetch_player(normalize_player_id(username));
        }
        match state.catalog {
            Some(ref catalog) => {
                self.bus.publish(&OutboundMessage::TankData(catalog.clone()));
            }
            None => self.fetcher.fetch_tank_heroes(),
        }
    }

    /// Deliver one finished request to the windows that depend on it
    pub fn complete(&mut self, state: &mut AppState, outcome: FetchOutcome) {
        match outcome {
            FetchOutcome::Player { player_id, result } => {
                let current = state.username.as_deref().map(normalize_player_id);
                if current.as_deref() != Some(player_id.as_str()) {
                    tracing::debug!("Dropping stale summary for {}", player_id);
                    return;
                }
                let message = match result {
                    Ok(payload) => OutboundMessage::PlayerData { payload },
                    Err(e) => {
                        tracing::warn!("Player summary for {} failed: {}", player_id, e);
                        OutboundMessage::PlayerDataError {
                            message: e.to_string(),
                        }
                    }
                };
                self.bus.publish(&message);
            }
            FetchOutcome::TankHeroes { result } => match result {
                Ok(heroes) => {
                    let catalog = HeroCatalog::merge(heroes, state.matchups.clone());
                    tracing::info!(
                        "Hero catalog ready: {} tanks, {} matchups",
                        catalog.heroes.len(),
                        catalog.matchups.len()
                    );
                    state.catalog = Some(catalog.clone());
                    self.bus.publish(&OutboundMessage::TankData(catalog));
                }
                Err(e) => {
                    tracing::warn!("Tank hero list failed: {}", e);
                    self.bus.publish(&OutboundMessage::TankDataError {
                        message: e.to_string(),
                    });
                }
            },
        }
    }

    /// Deliver every request that has finished so far
    pub fn poll(&mut self, state: &mut AppState) -> usize {
        let mut delivered = 0;
        while let Some(outcome) = self.fetcher.try_recv() {
            self.complete(state, outcome);
            delivered += 1;
        }
        delivered
    }

    /// Block until one request finishes, then deliver it
    #[cfg(test)]
    pub fn wait(&mut self, state: &mut AppState, timeout: std::time::Duration) -> bool {
        match self.fetcher.recv_timeout(timeout) {
            Some(outcome) => {
                self.complete(state, outcome);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{hero, Matchup};
    use crate::geometry::Rect;
    use crate::stats::fake::FakeStats;
    use crossbeam::channel::{unbounded, Receiver};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(5);

    /// Reads the store the moment a message arrives
    struct StoreReader {
        store: DurableStore,
        seen: Rc<RefCell<Vec<String>>>,
    }

    impl MessageSink for StoreReader {
        fn deliver(&self, message: &OutboundMessage) -> bool {
            let key = match message {
                OutboundMessage::UpdateSelectedTank { .. } => KEY_SELECTED_HERO,
                OutboundMessage::UpdateUsername { .. } => KEY_USERNAME,
                _ => return true,
            };
            let stored = self.store.get(key, String::new());
            self.seen.borrow_mut().push(stored);
            true
        }
    }

    fn store_reader(store: &DurableStore) -> (Box<StoreReader>, Rc<RefCell<Vec<String>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Box::new(StoreReader {
            store: store.clone(),
            seen: Rc::clone(&seen),
        });
        (sink, seen)
    }

    fn setup(stats: FakeStats) -> (tempfile::TempDir, DurableStore, AppState, StateBroadcaster) {
        let dir = tempfile::tempdir().unwrap();
        let store = DurableStore::open(dir.path().join("store.json")).unwrap();
        let state = AppState::load(&store, Rect::new(0, 0, 1920, 1040)).unwrap();
        let broadcaster = StateBroadcaster::new(store.clone(), FetchWorker::new(Arc::new(stats)));
        (dir, store, state, broadcaster)
    }

    fn attach(broadcaster: &mut StateBroadcaster, id: WindowId) -> Receiver<OutboundMessage> {
        let (tx, rx) = unbounded();
        broadcaster.attach(id, Box::new(tx));
        rx
    }

    #[test]
    fn test_store_written_before_broadcast() {
        let (_dir, store, mut state, mut broadcaster) = setup(FakeStats::default());
        let (sink, seen) = store_reader(&store);
        broadcaster.attach(WindowId::Tank, sink);

        broadcaster.set_selected_hero(&mut state, "Reinhardt").unwrap();

        assert_eq!(*seen.borrow(), vec!["Reinhardt".to_string()]);
        assert_eq!(state.selected_hero, "Reinhardt");
    }

    #[test]
    fn test_username_written_before_broadcast() {
        let (_dir, store, mut state, mut broadcaster) = setup(FakeStats::default());
        let (tank_sink, tank_seen) = store_reader(&store);
        let (cog_sink, cog_seen) = store_reader(&store);
        broadcaster.attach(WindowId::Tank, tank_sink);
        broadcaster.attach(WindowId::SettingsCog, cog_sink);

        broadcaster.set_username(&mut state, "Foo#1234").unwrap();

        assert_eq!(*tank_seen.borrow(), vec!["Foo#1234".to_string()]);
        assert_eq!(*cog_seen.borrow(), vec!["Foo#1234".to_string()]);
        assert_eq!(state.username.as_deref(), Some("Foo#1234"));
    }

    #[test]
    fn test_selected_hero_reaches_tank_and_selector() {
        let (_dir, _store, mut state, mut broadcaster) = setup(FakeStats::default());
        let tank = attach(&mut broadcaster, WindowId::Tank);
        let selector = attach(&mut broadcaster, WindowId::TankSelector);
        let cog = attach(&mut broadcaster, WindowId::SettingsCog);

        broadcaster.set_selected_hero(&mut state, "Sigma").unwrap();

        let expected = OutboundMessage::UpdateSelectedTank {
            hero: "Sigma".to_string(),
        };
        assert_eq!(tank.try_recv().unwrap(), expected);
        assert_eq!(selector.try_recv().unwrap(), expected);
        assert!(cog.try_recv().is_err());
    }

    #[test]
    fn test_username_fetch_failure_is_isolated() {
        let stats = FakeStats {
            fail_players: true,
            ..FakeStats::default()
        };
        let (_dir, store, mut state, mut broadcaster) = setup(stats);
        let player = attach(&mut broadcaster, WindowId::Player);
        let tank = attach(&mut broadcaster, WindowId::Tank);
        let cog = attach(&mut broadcaster, WindowId::SettingsCog);

        broadcaster.set_username(&mut state, "Foo#1234").unwrap();

        let update = OutboundMessage::UpdateUsername {
            username: "Foo#1234".to_string(),
        };
        assert_eq!(tank.try_recv().unwrap(), update);
        assert_eq!(cog.try_recv().unwrap(), update);
        assert_eq!(store.get_opt::<String>(KEY_USERNAME).as_deref(), Some("Foo#1234"));

        assert!(broadcaster.wait(&mut state, WAIT));
        match player.try_recv().unwrap() {
            OutboundMessage::PlayerDataError { message } => assert!(message.contains("404")),
            other => panic!("expected error signal, got {:?}", other),
        }
        assert!(tank.try_recv().is_err());
    }

    #[test]
    fn test_username_fetch_success_uses_normalized_id() {
        let stats = Arc::new(FakeStats::default());
        let dir = tempfile::tempdir().unwrap();
        let store = DurableStore::open(dir.path().join("store.json")).unwrap();
        let mut state = AppState::load(&store, Rect::new(0, 0, 800, 600)).unwrap();
        let mut broadcaster = StateBroadcaster::new(store, FetchWorker::new(stats.clone()));
        let player = attach(&mut broadcaster, WindowId::Player);

        broadcaster.set_username(&mut state, "Foo#1234").unwrap();
        assert!(broadcaster.wait(&mut state, WAIT));

        assert_eq!(*stats.requested.lock(), vec!["Foo-1234".to_string()]);
        match player.try_recv().unwrap() {
            OutboundMessage::PlayerData { payload } => assert_eq!(payload["username"], "Foo-1234"),
            other => panic!("expected player data, got {:?}", other),
        }
    }

    #[test]
    fn test_stale_player_result_is_dropped() {
        let (_dir, _store, mut state, mut broadcaster) = setup(FakeStats::default());
        let player = attach(&mut broadcaster, WindowId::Player);
        state.username = Some("New#1".to_string());

        broadcaster.complete(
            &mut state,
            FetchOutcome::Player {
                player_id: "Old-1".to_string(),
                result: Ok(serde_json::json!({})),
            },
        );
        assert!(player.try_recv().is_err());
    }

    #[test]
    fn test_announce_replays_state_and_fetches_heroes() {
        let stats = FakeStats {
            heroes: vec![hero("dva", "D.Va"), hero("reinhardt", "Reinhardt")],
            ..FakeStats::default()
        };
        let (_dir, _store, mut state, mut broadcaster) = setup(stats);
        state.username = Some("Foo#1234".to_string());
        state.matchups.insert("Dva".to_string(), Matchup::default());
        let tank = attach(&mut broadcaster, WindowId::Tank);
        let selector = attach(&mut broadcaster, WindowId::TankSelector);
        let player = attach(&mut broadcaster, WindowId::Player);

        broadcaster.announce(&state);
        assert!(matches!(tank.try_recv().unwrap(), OutboundMessage::UpdateSelectedTank { hero } if hero == "Dva"));
        assert!(matches!(tank.try_recv().unwrap(), OutboundMessage::UpdateUsername { .. }));

        assert!(broadcaster.wait(&mut state, WAIT));
        assert!(broadcaster.wait(&mut state, WAIT));

        let catalog = state.catalog.clone().expect("catalog cached");
        assert_eq!(catalog.heroes.len(), 2);
        assert!(catalog.matchups.contains_key("dva"));
        assert!(matches!(player.try_recv().unwrap(), OutboundMessage::PlayerData { .. }));
        assert!(selector.try_iter().any(|m| m == OutboundMessage::TankData(catalog.clone())));
    }

    #[test]
    fn test_tank_list_failure_signals_dependents() {
        let stats = FakeStats {
            fail_heroes: true,
            ..FakeStats::default()
        };
        let (_dir, _store, mut state, mut broadcaster) = setup(stats);
        let selector = attach(&mut broadcaster, WindowId::TankSelector);

        broadcaster.announce(&state);
        assert!(broadcaster.wait(&mut state, WAIT));

        let messages: Vec<_> = selector.try_iter().collect();
        assert!(messages
            .iter()
            .any(|m| matches!(m, OutboundMessage::TankDataError { .. })));
        assert!(state.catalog.is_none());
    }
}
