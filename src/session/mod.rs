//! Session establishment helpers
//!
//! Text-field extraction for the handshake exchange. Higher layers decide
//! what the extracted fields mean.

pub mod handshake;

pub use handshake::HandshakeResponse;
