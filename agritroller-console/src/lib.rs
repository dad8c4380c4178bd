//! AgriTroller operator console library.
//!
//! The core is the event stream client in [`stream`]: it keeps one logical
//! connection to the controller's `/ws/events` endpoint alive and folds every
//! inbound envelope into the [`wifi::WifiStore`] and the
//! [`notify::NotificationFeed`]. The terminal UI in [`app`] and [`ui`] only
//! reads what the stream publishes.

pub mod app;
pub mod config;
pub mod endpoint;
pub mod notify;
pub mod reconcile;
pub mod stream;
pub mod transport;
pub mod ui;
pub mod wifi;
