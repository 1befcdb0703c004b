//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor thread (non-blocking accept, polls a shutdown flag)
//! - One thread per admitted connection
//! - Connections beyond `max_connections` get BUSY and are closed
//! - Commands routed through Engine

mod client;
mod connection;
mod server;

pub use client::Client;
pub use connection::Connection;
pub use server::Server;
