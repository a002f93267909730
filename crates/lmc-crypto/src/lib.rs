//! Cryptographic primitives for Ledger Merkle Commitments.
//!
//! Provides an injectable hash primitive (SHA-256 or BLAKE3), a binary Merkle
//! tree with fixed-length inclusion proofs and their verifier, and Ed25519
//! signing wallets whose addresses are derived with the same hash primitive.
//!
//! All crypto operations wrap established libraries — no custom cryptography.

pub mod config;
pub mod hasher;
pub mod merkle;
pub mod signer;
pub mod wallet;

pub use config::{ConfigError, CryptoConfig};
pub use hasher::{Blake3Hasher, HashAlgorithm, HashPrimitive, Sha256Hasher};
pub use merkle::{
    tree_height, verify_proof, MerkleError, MerkleProof, MerkleResult, MerkleTree, ProofStep,
    Side,
};
pub use signer::{Signature, SignatureError, SigningKey, VerifyingKey};
pub use wallet::{verify_with_key, Wallet};
