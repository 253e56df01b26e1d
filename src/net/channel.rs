//! Peer data channel abstraction
//!
//! The connection itself (offer exchange, ICE, etc.) is established elsewhere;
//! the session only needs a message pipe that can report whether it is open.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

/// Errors surfaced by a data channel
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel is not open")]
    NotOpen,
    #[error("Peer connection lost: {0}")]
    Lost(String),
}

/// An already-open, message based peer channel
pub trait DataChannel {
    /// Queue one message for the peer. Never blocks.
    fn send(&mut self, bytes: Vec<u8>) -> Result<(), ChannelError>;
    /// Next buffered inbound message, if any
    fn recv(&mut self) -> Option<Vec<u8>>;
    fn is_open(&self) -> bool;
    /// Tear down the connection. Safe to call more than once.
    fn close(&mut self);
}

/// Simulated link impairments for the loopback channel
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LinkConditions {
    /// Percent of messages silently dropped (0-100)
    pub drop_percent: u8,
    /// Percent of messages delivered ahead of the one queued before them (0-100)
    pub reorder_percent: u8,
}

#[derive(Debug)]
struct Link {
    /// Inbound queues indexed by endpoint
    queues: [VecDeque<Vec<u8>>; 2],
    open: bool,
    conditions: LinkConditions,
    rng: Pcg32,
}

/// In-process channel pair, used for local netplay and tests
#[derive(Debug, Clone)]
pub struct LoopbackChannel {
    link: Rc<RefCell<Link>>,
    index: usize,
}

impl LoopbackChannel {
    /// Two connected endpoints over a perfect link
    pub fn pair() -> (Self, Self) {
        Self::pair_with(LinkConditions::default(), 0)
    }

    /// Two connected endpoints over an impaired link
    pub fn pair_with(conditions: LinkConditions, seed: u64) -> (Self, Self) {
        let link = Rc::new(RefCell::new(Link {
            queues: [VecDeque::new(), VecDeque::new()],
            open: true,
            conditions,
            rng: Pcg32::seed_from_u64(seed),
        }));
        (
            Self {
                link: link.clone(),
                index: 0,
            },
            Self { link, index: 1 },
        )
    }

    /// Messages waiting for this endpoint
    pub fn pending(&self) -> usize {
        self.link.borrow().queues[self.index].len()
    }
}

impl DataChannel for LoopbackChannel {
    fn send(&mut self, bytes: Vec<u8>) -> Result<(), ChannelError> {
        let mut link = self.link.borrow_mut();
        if !link.open {
            return Err(ChannelError::NotOpen);
        }

        let conditions = link.conditions;
        if conditions.drop_percent > 0 && link.rng.random_range(0..100u8) < conditions.drop_percent {
            return Ok(());
        }
        let reorder = conditions.reorder_percent > 0
            && link.rng.random_range(0..100u8) < conditions.reorder_percent;

        let queue = &mut link.queues[1 - self.index];
        if reorder && !queue.is_empty() {
            let at = queue.len() - 1;
            queue.insert(at, bytes);
        } else {
            queue.push_back(bytes);
        }
        Ok(())
    }

    fn recv(&mut self) -> Option<Vec<u8>> {
        self.link.borrow_mut().queues[self.index].pop_front()
    }

    fn is_open(&self) -> bool {
        self.link.borrow().open
    }

    fn close(&mut self) {
        let mut link = self.link.borrow_mut();
        if link.open {
            link.open = false;
            link.queues.iter_mut().for_each(VecDeque::clear);
        }
    }
}
