use std::time::Duration;
use thiserror::Error;
use crate::session::SessionState;

pub type Result<T> = std::result::Result<T, BoomError>;

/// Errors surfaced by discovery, the connection session and the frame codec.
///
/// A missing preset is not an error: see [`crate::state::PresetChange::NotFound`].
#[derive(Debug, Error)]
pub enum BoomError {
    /// No Boom server (matching the filters, if any) showed up in time.
    #[error("no Boom host found within {waited:?}")]
    DiscoveryTimeout { waited: Duration },

    /// The server answered the handshake with something other than "Accepted".
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// A frame did not arrive completely before the read deadline.
    #[error("short read: expected {expected} bytes, received {received}")]
    ShortRead { expected: usize, received: usize },

    /// A request could not be serialized to JSON.
    #[error("failed to encode request: {0}")]
    Encoding(#[source] serde_json::Error),

    /// A request body does not fit the 32-bit length field.
    #[error("request body of {0} bytes exceeds the frame length limit")]
    FrameTooLarge(usize),

    /// A status frame was not the JSON shape we expect.
    #[error("invalid status message: {0}")]
    InvalidStatus(String),

    /// A command was issued before the handshake completed or after close.
    #[error("session is not connected (state: {0:?})")]
    NotConnected(SessionState),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("mDNS error: {0}")]
    Mdns(#[from] mdns_sd::Error),
}

impl BoomError {
    /// The server sent an empty handshake body, i.e. nobody approved the client
    pub fn no_response(client_name: &str) -> Self {
        Self::Handshake(format!(
            "no response received; is Boom Remote enabled, and was the connection from \"{}\" approved on the server?",
            client_name
        ))
    }

    pub fn rejected(reply: &str) -> Self {
        Self::Handshake(format!("rejected: {}", reply))
    }
}
