//! Internal message bus. Each window subscribes to the message kinds its
//! rendering needs; publishers never address windows directly.

use crate::geometry::WindowId;
use crate::messages::{MessageKind, OutboundMessage};
use crossbeam::channel::Sender;

/// Receiving end of a window subscription
pub trait MessageSink {
    /// Returns `false` once the receiving window is gone
    fn deliver(&self, message: &OutboundMessage) -> bool;
}

impl MessageSink for Sender<OutboundMessage> {
    fn deliver(&self, message: &OutboundMessage) -> bool {
        self.send(message.clone()).is_ok()
    }
}

/// Message kinds each window displays
pub fn default_interests(id: WindowId) -> &'static [MessageKind] {
    use MessageKind::*;
    match id {
        WindowId::Player => &[PlayerData, PlayerDataError],
        WindowId::Tank => &[UpdateUsername, UpdateSelectedTank, TankData, TankDataError],
        WindowId::TankSelector => &[UpdateSelectedTank, TankData, TankDataError],
        WindowId::SettingsCog => &[UpdateUsername],
        WindowId::Settings => &[],
    }
}

struct Subscription {
    window: WindowId,
    kinds: Vec<MessageKind>,
    sink: Box<dyn MessageSink>,
}

#[derive(Default)]
pub struct MessageBus {
    subscriptions: Vec<Subscription>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace any previous subscription of `window`
    pub fn subscribe(&mut self, window: WindowId, kinds: &[MessageKind], sink: Box<dyn MessageSink>) {
        self.unsubscribe(window);
        self.subscriptions.push(Subscription {
            window,
            kinds: kinds.to_vec(),
            sink,
        });
    }

    pub fn unsubscribe(&mut self, window: WindowId) {
        self.subscriptions.retain(|s| s.window != window);
    }

    #[cfg(test)]
    pub fn is_subscribed(&self, window: WindowId) -> bool {
        self.subscriptions.iter().any(|s| s.window == window)
    }

    /// Deliver to every interested window, returning the windows reached.
    /// Subscribers whose sink is gone are dropped.
    pub fn publish(&mut self, message: &OutboundMessage) -> Vec<WindowId> {
        let kind = message.kind();
        let mut reached = Vec::new();
        self.subscriptions.retain(|s| {
            if !s.kinds.contains(&kind) {
                return true;
            }
            if s.sink.deliver(message) {
                reached.push(s.window);
                true
            } else {
                tracing::debug!("{} window stopped listening, unsubscribing", s.window);
                false
            }
        });
        tracing::debug!("{:?} -> {:?}", kind, reached);
        reached
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel::unbounded;

    #[test]
    fn test_publish_reaches_only_interested_windows() {
        let mut bus = MessageBus::new();
        let (tank_tx, tank_rx) = unbounded();
        let (player_tx, player_rx) = unbounded();
        bus.subscribe(WindowId::Tank, default_interests(WindowId::Tank), Box::new(tank_tx));
        bus.subscribe(WindowId::Player, default_interests(WindowId::Player), Box::new(player_tx));

        let msg = OutboundMessage::UpdateUsername {
            username: "Foo#1234".to_string(),
        };
        assert_eq!(bus.publish(&msg), vec![WindowId::Tank]);
        assert_eq!(tank_rx.try_recv().unwrap(), msg);
        assert!(player_rx.try_recv().is_err());
    }

    #[test]
    fn test_closed_sink_is_dropped() {
        let mut bus = MessageBus::new();
        let (tx, rx) = unbounded();
        bus.subscribe(WindowId::SettingsCog, default_interests(WindowId::SettingsCog), Box::new(tx));
        drop(rx);

        let msg = OutboundMessage::UpdateUsername {
            username: "x".to_string(),
        };
        assert!(bus.publish(&msg).is_empty());
        assert!(!bus.is_subscribed(WindowId::SettingsCog));
    }

    #[test]
    fn test_resubscribe_replaces() {
        let mut bus = MessageBus::new();
        let (old_tx, old_rx) = unbounded();
        let (new_tx, new_rx) = unbounded();
        bus.subscribe(WindowId::Tank, &[MessageKind::UpdateSelectedTank], Box::new(old_tx));
        bus.subscribe(WindowId::Tank, &[MessageKind::UpdateSelectedTank], Box::new(new_tx));

        bus.publish(&OutboundMessage::UpdateSelectedTank {
            hero: "Orisa".to_string(),
        });
        assert!(old_rx.try_recv().is_err());
        assert!(new_rx.try_recv().is_ok());
    }

    #[test]
    fn test_settings_cog_and_tank_display_username() {
        let interested: Vec<WindowId> = WindowId::ALL
            .into_iter()
            .filter(|&id| default_interests(id).contains(&MessageKind::UpdateUsername))
            .collect();
        assert_eq!(interested, vec![WindowId::Tank, WindowId::SettingsCog]);
    }
}
