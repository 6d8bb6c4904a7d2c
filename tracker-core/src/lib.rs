//! Domain models and SQLite storage for the manga tracker.
//!
//! The [`db::Database`] is the authoritative store: it assigns ids and
//! timestamps and enforces the referential constraints between users, fansub
//! sites, mangas and chapters.

pub mod db;
pub mod models;
