//! Client for the Boom equalizer's remote control protocol.
//!
//! Discovery ([`mdns`]) finds servers advertising `_boom2._tcp` or
//! `_boom3._tcp`, a [`session::Session`] performs the handshake and carries
//! framed JSON ([`frame`]), and [`state::RemoteState`] holds the preset
//! snapshot used to build commands. [`client::Boom`] wires them together.

pub mod client;
pub mod config;
pub mod error;
pub mod frame;
pub mod mdns;
pub mod session;
pub mod state;

pub use client::Boom;
pub use error::{BoomError, Result};
pub use state::{PresetChange, RemoteState};
