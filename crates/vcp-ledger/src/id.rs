//! Monotonic UUID v7 event ids.
//!
//! Layout (RFC 9562 §5.7, method 3 for the sub-millisecond bits):
//!
//! ```text
//!  48 bits  unix_ts_ms
//!   4 bits  version (0b0111)
//!  12 bits  sub-millisecond fraction of the timestamp
//!   2 bits  variant (0b10)
//!  62 bits  random
//! ```
//!
//! When a fresh id would not sort after the previous one (same instant, or
//! the random tail happened to be smaller) the previous id is incremented
//! instead, carrying from the random bits into the fraction and then the
//! milliseconds.

use uuid::Uuid;

use vcp_contracts::event::EventId;

const RAND_B_MASK: u128 = (1 << 62) - 1;
const RAND_A_MASK: u128 = 0xfff;

fn compose(ms: u128, rand_a: u128, rand_b: u128) -> Uuid {
    let value = (ms << 80)
        | (0x7 << 76)
        | ((rand_a & RAND_A_MASK) << 64)
        | (0b10 << 62)
        | (rand_b & RAND_B_MASK);
    Uuid::from_u128(value)
}

/// Issues strictly increasing v7 ids.  Owned by the ledger's writer gate,
/// so it needs no locking of its own.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: Option<Uuid>,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint the next id for an event stamped `timestamp_ns`.
    pub fn next(&mut self, timestamp_ns: u64) -> EventId {
        let ms = u128::from(timestamp_ns / 1_000_000) & ((1 << 48) - 1);
        let fraction = u128::from(timestamp_ns % 1_000_000) * 4096 / 1_000_000;
        let candidate = compose(ms, fraction, u128::from(rand::random::<u64>()));

        let id = match self.last {
            Some(last) if candidate <= last => increment(last),
            _ => candidate,
        };
        self.last = Some(id);
        EventId(id)
    }
}

fn increment(last: Uuid) -> Uuid {
    let value = last.as_u128();
    let mut ms = value >> 80;
    let mut rand_a = (value >> 64) & RAND_A_MASK;
    let mut rand_b = value & RAND_B_MASK;

    if rand_b == RAND_B_MASK {
        rand_b = 0;
        if rand_a == RAND_A_MASK {
            rand_a = 0;
            ms += 1;
        } else {
            rand_a += 1;
        }
    } else {
        rand_b += 1;
    }
    compose(ms, rand_a, rand_b)
}
