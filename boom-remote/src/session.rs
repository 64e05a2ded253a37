//! One remote control connection to a Boom server.
//!
//! ```text
//! Disconnected ──attach/connect──▶ Handshaking ──"Accepted"──▶ Accepted ──status──▶ Ready
//!                                      │
//!                                      └──empty or other reply──▶ Rejected
//! ```
//! Any I/O failure during the handshake, or [`Session::close`], ends in `Closed`.
//! There is no reconnect: a session is used for exactly one connection.
//!
//! Once accepted, the server pushes status messages without being asked and
//! never answers individual commands, so [`Session::send`] is fire-and-forget
//! and [`Session::recv_status`] is a separate, optional pull.

use std::time::Duration;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use boom_shared::protocol::{HANDSHAKE_ACCEPTED, HANDSHAKE_PREFIX};
use boom_shared::types::DiscoveredHost;
use crate::error::{BoomError, Result};
use crate::frame::{encode_request, read_frame, FrameRead};
use crate::state::RemoteState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Handshaking,
    Accepted,
    Ready,
    Rejected,
    Closed,
}

pub struct Session<S = TcpStream> {
    stream: Option<S>,
    client_name: String,
    state: SessionState,
    read_timeout: Duration,
    peer: Option<DiscoveredHost>,
}

impl<S> Session<S> {
    pub fn new(client_name: impl Into<String>, read_timeout: Duration) -> Self {
        Self {
            stream: None,
            client_name: client_name.into(),
            state: SessionState::Disconnected,
            read_timeout,
            peer: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Host this session connected to, if it went through [`Session::connect`]
    pub fn peer(&self) -> Option<&DiscoveredHost> {
        self.peer.as_ref()
    }
}

impl Session<TcpStream> {
    /// Open a TCP connection to `host` and run the handshake.
    ///
    /// The server shows an approval prompt for our client name; until someone
    /// accepts it the handshake reply stays empty.
    pub async fn connect(&mut self, host: &DiscoveredHost) -> Result<RemoteState> {
        tracing::info!("Connecting to {}", host);
        let stream = TcpStream::connect(host.socket_addr()).await?;
        self.peer = Some(host.clone());
        self.attach(stream).await
    }
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Run the handshake over an already open stream and return the first
    /// status snapshot.
    pub async fn attach(&mut self, stream: S) -> Result<RemoteState> {
        if self.state != SessionState::Disconnected {
            return Err(BoomError::Handshake(format!(
                "session already used (state: {:?})",
                self.state
            )));
        }

        self.stream = Some(stream);
        self.state = SessionState::Handshaking;

        let result = self.handshake().await;
        if result.is_err() {
            self.stream = None;
            if self.state != SessionState::Rejected {
                self.state = SessionState::Closed;
            }
        }
        result
    }

    async fn handshake(&mut self) -> Result<RemoteState> {
        let line = format!("{}{}\n", HANDSHAKE_PREFIX, self.client_name);
        let timeout = self.read_timeout;
        let stream = self.stream_mut()?;
        stream.write_all(line.as_bytes()).await?;
        stream.flush().await?;

        let reply = read_frame(stream, timeout).await?;
        let text = reply.text();
        if text != HANDSHAKE_ACCEPTED {
            self.state = SessionState::Rejected;
            if text.is_empty() {
                return Err(BoomError::no_response(&self.client_name));
            }
            return Err(BoomError::rejected(&text));
        }
        tracing::info!("Login result: {}", text);
        self.state = SessionState::Accepted;

        // From here on the server streams status messages non-stop; only the
        // first one is used to learn the presets.
        let state = self.read_status().await?;
        self.state = SessionState::Ready;
        Ok(state)
    }

    fn stream_mut(&mut self) -> Result<&mut S> {
        self.stream.as_mut().ok_or(BoomError::NotConnected(self.state))
    }

    async fn read_status(&mut self) -> Result<RemoteState> {
        let timeout = self.read_timeout;
        let frame = read_frame(self.stream_mut()?, timeout).await?.into_frame()?;
        RemoteState::parse(&frame.body)
    }

    /// Encode `request` and write it to the server. Nothing is read back.
    pub async fn send<T: Serialize + ?Sized>(&mut self, request: &T) -> Result<()> {
        if !matches!(self.state, SessionState::Accepted | SessionState::Ready) {
            return Err(BoomError::NotConnected(self.state));
        }
        let bytes = encode_request(request)?;
        let stream = self.stream_mut()?;
        stream.write_all(&bytes).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Read the next frame the server pushed, complete or short
    pub async fn recv_frame(&mut self) -> Result<FrameRead> {
        if self.state != SessionState::Ready {
            return Err(BoomError::NotConnected(self.state));
        }
        let timeout = self.read_timeout;
        Ok(read_frame(self.stream_mut()?, timeout).await?)
    }

    /// Read and parse the next status message
    pub async fn recv_status(&mut self) -> Result<RemoteState> {
        let frame = self.recv_frame().await?.into_frame()?;
        RemoteState::parse(&frame.body)
    }

    /// Shut the connection down. Calling it again is a no-op.
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            tracing::info!("Closing connection");
            if let Err(e) = stream.shutdown().await {
                tracing::debug!("Error shutting down connection: {}", e);
            }
            self.state = SessionState::Closed;
        }
    }
}

impl<S> Drop for Session<S> {
    fn drop(&mut self) {
        if self.stream.take().is_some() {
            tracing::info!("Closing connection");
        }
    }
}
