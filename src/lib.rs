//! TankWatch Library
//!
//! State sync and persistence for the overlay windows: the durable store,
//! window registry, visibility, message fan-out and geometry persistence.
//! The winit/tray/hotkey glue in `platform`, `tray` and `hotkey` is driven by
//! the `tankwatch` binary.

pub mod broadcaster;
pub mod bus;
pub mod catalog;
pub mod config;
pub mod context;
pub mod error;
pub mod geometry;
pub mod hotkey;
pub mod messages;
pub mod persister;
pub mod platform;
pub mod registry;
pub mod state;
pub mod stats;
pub mod store;
pub mod tray;
pub mod visibility;
