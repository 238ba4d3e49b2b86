//! # vcp-core
//!
//! The seams and shared machinery of the VCP event ledger.
//!
//! ## Overview
//!
//! - [`traits`]: `EventSigner`, `AnchorClient` and `Clock`, the only ways
//!   the ledger reaches outside the process.
//! - [`canonical`]: byte-stable serialization and SHA-256 helpers.  Every
//!   hash in the system is computed over canonical bytes.
//! - [`signer`]: the in-memory Ed25519 signer and offline verification.
//! - [`clock`]: system and manual clocks.
//! - [`config`]: TOML node configuration.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vcp_core::{canonical, config::NodeConfig, signer::Ed25519Signer};
//!
//! let config = NodeConfig::from_file(Path::new("vcp-node.toml"))?;
//! let signer = Ed25519Signer::generate();
//! let digest = canonical::canonical_sha256(&event_body)?;
//! ```

pub mod canonical;
pub mod clock;
pub mod config;
pub mod signer;
pub mod traits;

// ── Tests ─────────────────────────────────────────────────────────────────────
