//! HTTP and WebSocket endpoints.
//!
//! - `/ws` - event stream for clients (see [`ws`])
//! - `/api/admin/*` - domain actions reported by backend services (see [`admin`])

pub mod admin;
mod extractors;
pub mod ws;
