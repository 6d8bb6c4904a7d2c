//! Personal tracker for fansub sites, manga titles and read chapters.
//!
//! The crate is layered the same way data flows through it:
//!
//! - [`session`]: who is signed in, injected into everything that is user scoped
//! - [`store`]: the storage boundary, backed by [`db::Database`] locally or by
//!   [`client::TrackerClient`] over HTTP
//! - [`registry`]: in-memory caches of the stored collections with the
//!   create/toggle/remove operations that keep them in step with storage
//! - [`api`]: the HTTP server that exposes a [`db::Database`] to remote clients

pub mod api;
pub mod client;
pub mod config;
pub mod registry;
pub mod render;
pub mod session;
pub mod store;

pub use tracker_core::{db, models};
