//! # vcp-ledger
//!
//! Append-only, SHA-256 hash-chained ledger of VCP trading events.
//!
//! ## Overview
//!
//! Every appended event is sealed: the ledger assigns its id and timestamp,
//! hashes the canonical `{header, payload}`, links it to the previous
//! event through `prev_hash`, signs the hash and publishes the result in
//! one step.  Published events never change.  Batches of events are
//! registered here once the Merkle builder has sealed them, and the
//! anchor state of each batch is tracked alongside.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vcp_ledger::HashChainLedger;
//!
//! let ledger = HashChainLedger::new(Arc::new(SystemClock), Duration::from_secs(2));
//! let event = ledger.append(draft, &signer, None).await?;
//! ledger.verify_integrity()?;
//! ```

pub mod chain;
pub mod id;
mod index;
pub mod ledger;
pub mod store;

pub use chain::{event_hash_matches, hash_event_content, verify_chain, ChainCheckpoint};
pub use ledger::HashChainLedger;
pub use store::{BatchState, LedgerView, LocatedEvent};

// ── Tests ─────────────────────────────────────────────────────────────────────
