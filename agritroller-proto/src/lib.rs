//! Wire types and codec for the AgriTroller event stream.

pub mod codec;
pub mod envelope;
pub mod notification;
pub mod wifi;
