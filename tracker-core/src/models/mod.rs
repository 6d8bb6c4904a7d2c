//! Domain models for the manga tracker.
//!
//! # Core Concepts
//!
//! - [`User`]: The authenticated identity that owns sites and mangas.
//! - [`FansubSite`]: A source of chapter releases, a named URL.
//! - [`Manga`]: A tracked series tied to exactly one fansub site, with an
//!   active/paused flag.
//! - [`Chapter`]: A numbered installment of a manga with a read/unread status.
//!
//! Field names match the persisted record shapes, so the same types are used
//! for storage rows, HTTP bodies and in-memory caches.

mod chapter;
mod manga;
mod site;
mod user;

pub use chapter::*;
pub use manga::*;
pub use site::*;
pub use user::*;
