//! AgriTroller event bus.
//!
//! An in-memory fan-out bus behind the same `/api/ws/events` endpoint the
//! field controller exposes. Used as a local simulator for the console and
//! as the remote end in integration tests.

pub mod bus;
pub mod config;
pub mod server;
