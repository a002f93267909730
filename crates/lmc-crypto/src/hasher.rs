use lmc_types::Digest;
use serde::{Deserialize, Serialize};
use sha2::Digest as _;

/// A deterministic one-way digest function with 32-byte output.
///
/// Trees and wallets take a `HashPrimitive` at construction instead of
/// calling a global helper, so the algorithm can be swapped without touching
/// either. Every byte sequence, including the empty one, is valid input.
pub trait HashPrimitive {
    /// Hash raw bytes.
    fn digest(&self, data: &[u8]) -> Digest;

    /// Hash the concatenation `left ‖ right`.
    ///
    /// Order-sensitive: `combine(a, b) != combine(b, a)` for `a != b`.
    fn combine(&self, left: &Digest, right: &Digest) -> Digest {
        self.digest(&[left.as_bytes().as_slice(), right.as_bytes().as_slice()].concat())
    }

    /// Which algorithm this primitive implements.
    fn algorithm(&self) -> HashAlgorithm;
}

/// SHA-256 hash primitive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Sha256Hasher;

impl HashPrimitive for Sha256Hasher {
    fn digest(&self, data: &[u8]) -> Digest {
        sha256_output(sha2::Sha256::digest(data).as_slice())
    }

    fn combine(&self, left: &Digest, right: &Digest) -> Digest {
        let mut hasher = sha2::Sha256::new();
        hasher.update(left.as_bytes());
        hasher.update(right.as_bytes());
        sha256_output(hasher.finalize().as_slice())
    }

    fn algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Sha256
    }
}

fn sha256_output(hash: &[u8]) -> Digest {
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(hash);
    Digest::from_hash(bytes)
}

/// BLAKE3 hash primitive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Blake3Hasher;

impl HashPrimitive for Blake3Hasher {
    fn digest(&self, data: &[u8]) -> Digest {
        Digest::from_hash(*blake3::hash(data).as_bytes())
    }

    fn combine(&self, left: &Digest, right: &Digest) -> Digest {
        let mut hasher = blake3::Hasher::new();
        hasher.update(left.as_bytes());
        hasher.update(right.as_bytes());
        Digest::from_hash(*hasher.finalize().as_bytes())
    }

    fn algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Blake3
    }
}

/// Hash algorithm selector, usable directly as a [`HashPrimitive`].
///
/// This is the form that appears in configuration files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Blake3,
}

impl HashPrimitive for HashAlgorithm {
    fn digest(&self, data: &[u8]) -> Digest {
        match self {
            Self::Sha256 => Sha256Hasher.digest(data),
            Self::Blake3 => Blake3Hasher.digest(data),
        }
    }

    fn combine(&self, left: &Digest, right: &Digest) -> Digest {
        match self {
            Self::Sha256 => Sha256Hasher.combine(left, right),
            Self::Blake3 => Blake3Hasher.combine(left, right),
        }
    }

    fn algorithm(&self) -> HashAlgorithm {
        *self
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sha256 => write!(f, "sha256"),
            Self::Blake3 => write!(f, "blake3"),
        }
    }
}
