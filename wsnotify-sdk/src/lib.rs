//! Shared event model for wsnotify.
//!
//! The [`objects`] module holds every type that crosses the wire: topics,
//! the event taxonomy, and the messages a client sends to manage its
//! subscriptions. The optional [`client`] module (behind the `client`
//! feature) is a small WebSocket consumer for those events.

#![forbid(unsafe_code)]

#[cfg(feature = "client")]
pub mod client;
pub mod objects;
