//! Event routing.
//!
//! # Event Flow
//!
//! 1. A domain action builds an event from `wsnotify_sdk::objects`.
//! 2. [`Publisher::publish`] checks the event's topic against the
//!    [`TopicRegistry`] and derives a [`SessionFilter`] from its scope.
//! 3. The [`Transport`] (normally the in-process [`Hub`]) queues the event
//!    for every matching [`Subscription`].
//!
//! Events are fire-and-forget: once accepted they are neither persisted
//! nor retracted.

pub mod hub;
pub mod publisher;
pub mod registry;
pub mod transport;

pub use hub::{DEFAULT_SUBSCRIBER_BUFFER, Hub, Subscription};
pub use publisher::{PublishError, Publisher};
pub use registry::TopicRegistry;
pub use transport::{Accepted, DeliveryError, SessionFilter, Transport};
