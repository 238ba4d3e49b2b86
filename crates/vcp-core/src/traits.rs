//! Trait definitions at the ledger's external seams.
//!
//! - `EventSigner` — the originating node's signing key (local or HSM)
//! - `AnchorClient` — the external ledger that Merkle roots are written to
//! - `Clock`        — the nanosecond time source
//!
//! The ledger, Merkle builder and coordinator only ever talk to these
//! traits.  Calls through `EventSigner` and `AnchorClient` may block on
//! I/O; callers wrap every one of them in a bounded timeout.

use async_trait::async_trait;

use vcp_contracts::{anchor::TxStatus, error::VcpResult, event::SignAlgo};

/// Signs event hashes on behalf of the originating node.
#[async_trait]
pub trait EventSigner: Send + Sync {
    /// The algorithm recorded in `security.sign_algo`.
    fn algorithm(&self) -> SignAlgo;

    /// Hex-encoded public key recorded in `security.signer_key`.
    fn public_key_hex(&self) -> String;

    /// Sign the 32 raw bytes of an event hash.
    ///
    /// Return `VcpError::SignatureFailure` when the key material refuses to
    /// sign.  Implementations must not retry internally; the ledger bounds
    /// each call with a timeout and reports it to the caller.
    async fn sign(&self, digest: &[u8; 32]) -> VcpResult<Vec<u8>>;
}

/// The external, independently auditable ledger that roots are anchored in.
#[async_trait]
pub trait AnchorClient: Send + Sync {
    /// Network name recorded in anchor records (e.g. `"ethereum-mainnet"`).
    fn network(&self) -> &str;

    /// Submit a hex root hash and return the transaction hash.
    ///
    /// Failures should be `VcpError::AnchoringUnavailable`; the coordinator
    /// retries them with backoff.
    async fn submit(&self, root_hash: &str) -> VcpResult<String>;

    /// Report what the external ledger currently knows about `tx_hash`.
    async fn status(&self, tx_hash: &str) -> VcpResult<TxStatus>;
}

/// Nanosecond wall-clock source.
pub trait Clock: Send + Sync {
    /// Nanoseconds since the Unix epoch.
    fn now_ns(&self) -> u64;
}
