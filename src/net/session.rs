//! Peer session: one open channel plus the frame acceptance gate
//!
//! Every inbound frame must carry a valid integrity tag and a timestamp newer
//! than the last accepted one. Anything else is dropped without reaching the
//! game; the next tick resends full truth anyway.

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::Role;
use super::channel::{ChannelError, DataChannel};
use super::clock::{Clock, SystemClock};
use super::codec::{self, CodecError};

/// Session lifecycle. There is no reconnect state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Closed,
}

/// Errors surfaced to the caller. Inbound problems never are.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session is closed")]
    Closed,
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
    #[error("Failed to encode payload: {0}")]
    Encode(#[from] CodecError),
}

/// Frame counters for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub sent: u64,
    pub accepted: u64,
    pub stale: u64,
    pub corrupt: u64,
}

/// A session over one peer channel, receiving payloads of type `In`
pub struct Session<C, In> {
    channel: C,
    role: Role,
    clock: Box<dyn Clock>,
    state: SessionState,
    last_accepted: u64,
    last_sent: u64,
    on_receive: Option<Box<dyn FnMut(In)>>,
    stats: SessionStats,
}

impl<C: DataChannel, In: DeserializeOwned> Session<C, In> {
    pub fn new(channel: C, role: Role) -> Self {
        Self::with_clock(channel, role, Box::new(SystemClock))
    }

    pub fn with_clock(channel: C, role: Role, clock: Box<dyn Clock>) -> Self {
        let now = clock.now_ms();
        log::info!("Session opened as {role:?}");
        Self {
            channel,
            role,
            clock,
            state: SessionState::Open,
            last_accepted: now,
            last_sent: 0,
            on_receive: None,
            stats: SessionStats::default(),
        }
    }

    /// Register the handler invoked for every accepted payload
    pub fn on_receive(&mut self, handler: impl FnMut(In) + 'static) {
        self.on_receive = Some(Box::new(handler));
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Open only while both the session and its channel are
    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open && self.channel.is_open()
    }

    /// Fire-and-forget send of one payload
    pub fn send<T: Serialize>(&mut self, payload: &T) -> Result<(), SessionError> {
        if !self.is_open() {
            self.state = SessionState::Closed;
            return Err(SessionError::Closed);
        }

        // Keep our own timestamps strictly increasing within the same millisecond
        let timestamp = self.clock.now_ms().max(self.last_sent + 1);
        let bytes = codec::encode(payload, timestamp)?;

        if let Err(e) = self.channel.send(bytes) {
            log::warn!("Send failed, closing session: {e}");
            self.state = SessionState::Closed;
            return Err(e.into());
        }

        self.last_sent = timestamp;
        self.stats.sent += 1;
        Ok(())
    }

    /// Inbound handler for one raw message. Returns whether it was accepted.
    pub fn deliver(&mut self, bytes: &[u8]) -> bool {
        if self.state == SessionState::Closed {
            return false;
        }

        let frame = match codec::decode::<In>(bytes) {
            Ok(frame) => frame,
            Err(e) => {
                self.stats.corrupt += 1;
                log::debug!("Dropped corrupt frame ({} bytes): {e}", bytes.len());
                return false;
            }
        };

        if frame.timestamp <= self.last_accepted {
            self.stats.stale += 1;
            log::trace!(
                "Dropped stale frame {} (last accepted {})",
                frame.timestamp,
                self.last_accepted
            );
            return false;
        }

        self.last_accepted = frame.timestamp;
        self.stats.accepted += 1;
        if let Some(handler) = self.on_receive.as_mut() {
            handler(frame.payload);
        }
        true
    }

    /// Drain everything the channel has buffered. Returns accepted count.
    pub fn pump(&mut self) -> usize {
        let mut accepted = 0;
        while let Some(bytes) = self.channel.recv() {
            if self.deliver(&bytes) {
                accepted += 1;
            }
        }
        accepted
    }

    /// Close the underlying connection. Idempotent.
    pub fn disconnect(&mut self) {
        if self.state == SessionState::Open {
            log::info!("Session disconnected ({:?})", self.role);
        }
        self.state = SessionState::Closed;
        self.channel.close();
    }
}
