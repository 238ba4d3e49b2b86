//! # vcp-anchor
//!
//! Commits Merkle batch roots to an external, independently auditable
//! ledger and follows each commitment until it is confirmed.
//!
//! The external ledger is reached only through `vcp_core::traits::
//! AnchorClient`.  [`SimulatedAnchorClient`] is an in-memory chain for
//! tests and demonstrations.

pub mod coordinator;
pub mod retry;
pub mod simulated;

pub use coordinator::{AnchorCoordinator, TickReport};
pub use retry::RetryPolicy;
pub use simulated::SimulatedAnchorClient;

// ── Tests ─────────────────────────────────────────────────────────────────────
