//! Goobers game server
//!
//! Authoritative simulation for a party platformer played on a shared screen.
//! Phones connect as controllers over WebSocket; the server runs physics,
//! bombs, trivia and level progression and publishes world snapshots for a
//! renderer.

pub mod app;
pub mod config;
pub mod game;
pub mod http;
pub mod util;
pub mod ws;
