//! Typed messages crossing the window boundary.
//!
//! Windows talk to the core with [`InboundMessage`] documents and receive
//! [`OutboundMessage`] documents back. Both are JSON objects tagged by `kind`.

use crate::catalog::HeroCatalog;
use crate::error::MessageError;
use serde::{Deserialize, Serialize};

/// Window -> core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum InboundMessage {
    SubmitUsername { username: String },
    SelectTank { hero: String },
    ToggleSettings,
}

impl InboundMessage {
    /// Deserialize and validate a document sent by a window
    pub fn parse(json: &str) -> Result<Self, MessageError> {
        let message: InboundMessage = serde_json::from_str(json)?;
        message.validated()
    }

    /// Trim text fields and reject empty ones
    pub fn validated(self) -> Result<Self, MessageError> {
        match self {
            InboundMessage::SubmitUsername { username } => {
                let username = username.trim();
                if username.is_empty() {
                    return Err(MessageError::EmptyField("username"));
                }
                Ok(InboundMessage::SubmitUsername {
                    username: username.to_string(),
                })
            }
            InboundMessage::SelectTank { hero } => {
                let hero = hero.trim();
                if hero.is_empty() {
                    return Err(MessageError::EmptyField("hero"));
                }
                Ok(InboundMessage::SelectTank {
                    hero: hero.to_string(),
                })
            }
            InboundMessage::ToggleSettings => Ok(InboundMessage::ToggleSettings),
        }
    }
}

/// Core -> window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum OutboundMessage {
    UpdateUsername { username: String },
    UpdateSelectedTank { hero: String },
    /// Player summary, passed through verbatim
    PlayerData { payload: serde_json::Value },
    PlayerDataError { message: String },
    TankData(HeroCatalog),
    TankDataError { message: String },
}

/// Discriminant used for bus subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    UpdateUsername,
    UpdateSelectedTank,
    PlayerData,
    PlayerDataError,
    TankData,
    TankDataError,
}

impl OutboundMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            OutboundMessage::UpdateUsername { .. } => MessageKind::UpdateUsername,
            OutboundMessage::UpdateSelectedTank { .. } => MessageKind::UpdateSelectedTank,
            OutboundMessage::PlayerData { .. } => MessageKind::PlayerData,
            OutboundMessage::PlayerDataError { .. } => MessageKind::PlayerDataError,
            OutboundMessage::TankData(_) => MessageKind::TankData,
            OutboundMessage::TankDataError { .. } => MessageKind::TankDataError,
        }
    }
}
