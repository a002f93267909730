use std::fmt;

use serde::{Deserialize, Serialize};

use crate::digest::Digest;
use crate::error::TypeError;

/// Wallet address: the digest of a public key's raw bytes.
///
/// The digest is computed by whichever hash primitive the wallet was built
/// with. An address only matches a tree leaf hashed by the same primitive.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(Digest);

impl Address {
    /// Wrap an already-computed public key digest.
    pub const fn from_digest(digest: Digest) -> Self {
        Self(digest)
    }

    /// The underlying digest.
    pub fn digest(&self) -> &Digest {
        &self.0
    }

    /// Full hex-encoded string.
    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }

    /// Parse from a hex string (64 hex characters).
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        Digest::from_hex(s).map(Self)
    }

    /// Leaf bytes committing `amount` to this address: `"<hex>:<amount>"`.
    pub fn balance_leaf(&self, amount: u64) -> Vec<u8> {
        format!("{}:{amount}", self.to_hex()).into_bytes()
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.0.short_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<Digest> for Address {
    fn from(digest: Digest) -> Self {
        Self(digest)
    }
}
