//! Netplay plumbing
//!
//! - `value`: truth/prediction pairs for replicated state
//! - `codec`: compressed, checksummed wire frames
//! - `session`: channel wrapper with the staleness gate
//! - `channel`: the channel trait and an in-process loopback
//! - `payload`: what each side sends per tick

pub mod channel;
pub mod clock;
pub mod codec;
pub mod payload;
pub mod session;
pub mod value;

pub use channel::{ChannelError, DataChannel, LinkConditions, LoopbackChannel};
pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{CodecError, Frame, decode, encode};
pub use payload::{ClientUpdate, HostUpdate, Point};
pub use session::{Session, SessionError, SessionState, SessionStats};
pub use value::{Extrapolate, NetNumber, NetValue, NetVector};

use serde::{Deserialize, Serialize};

use crate::sim::Side;

/// Which end of the connection this peer is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Runs the physics and owns scoring (host)
    Authority,
    /// Mirrors state and extrapolates (client)
    Dependent,
}

impl Role {
    /// Side whose paddle this peer controls
    pub fn local_side(self) -> Side {
        match self {
            Role::Authority => Side::Left,
            Role::Dependent => Side::Right,
        }
    }
}
