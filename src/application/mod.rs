//! Catalog services: access resolution, collaborations, activity and the
//! album, song, playlist and export use cases.

pub mod access;
pub mod activity;
pub mod albums;
pub mod collaborations;
pub mod context;
pub mod error;
pub mod exports;
pub mod playlists;
pub mod repos;
pub mod songs;
