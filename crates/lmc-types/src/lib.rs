//! Foundation types for Ledger Merkle Commitments (LMC).
//!
//! This crate provides the fixed-size value types shared by the Merkle tree
//! and the signing wallet in `lmc-crypto`.
//!
//! # Key Types
//!
//! - [`Digest`] — 32-byte hash output, printed as lowercase hex
//! - [`Address`] — Wallet address, the digest of a public key

pub mod address;
pub mod digest;
pub mod error;

pub use address::Address;
pub use digest::{Digest, DIGEST_LEN};
pub use error::TypeError;
