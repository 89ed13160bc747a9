//! OpenMusic catalog core.
//!
//! Albums, songs and playlists behind a cache-aside view layer, with playlist
//! access resolved through an owner-then-collaborator chain.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
