use lmc_types::Address;
use tracing::debug;

use crate::hasher::{HashPrimitive, Sha256Hasher};
use crate::signer::{Signature, SigningKey, VerifyingKey};

/// A key pair that authorizes transactions, together with its address.
///
/// The address is derived with the wallet's hash primitive, so a wallet built
/// with the same primitive as a [`MerkleTree`](crate::MerkleTree) produces
/// addresses that can be committed to that tree as leaves.
pub struct Wallet<H: HashPrimitive = Sha256Hasher> {
    hasher: H,
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
    address: Address,
}

impl Wallet<Sha256Hasher> {
    /// Generate a wallet with a fresh random key, addressed with SHA-256.
    pub fn generate() -> Self {
        Self::generate_with(Sha256Hasher)
    }
}

impl<H: HashPrimitive> Wallet<H> {
    /// Generate a wallet with a fresh random key.
    pub fn generate_with(hasher: H) -> Self {
        Self::from_signing_key(hasher, SigningKey::generate())
    }

    /// Wrap an existing signing key.
    pub fn from_signing_key(hasher: H, signing_key: SigningKey) -> Self {
        let verifying_key = signing_key.verifying_key();
        let address = verifying_key.address_with(&hasher);
        debug!(
            address = %address.digest().short_hex(),
            algorithm = %hasher.algorithm(),
            "wallet loaded"
        );
        Self {
            hasher,
            signing_key,
            verifying_key,
            address,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// Sign raw transaction bytes.
    pub fn sign_transaction(&self, transaction: &[u8]) -> Signature {
        self.signing_key.sign(transaction)
    }

    /// Check a signature over `transaction` against this wallet's key.
    pub fn verify_signature(&self, transaction: &[u8], signature: &Signature) -> bool {
        verify_with_key(&self.verifying_key, transaction, signature)
    }
}

/// Check `signature` over `message` under `key`.
pub fn verify_with_key(key: &VerifyingKey, message: &[u8], signature: &Signature) -> bool {
    match key.verify(message, signature) {
        Ok(()) => true,
        Err(err) => {
            debug!(key = %key.to_hex(), %err, "signature rejected");
            false
        }
    }
}

impl<H: HashPrimitive> std::fmt::Debug for Wallet<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .field("verifying_key", &self.verifying_key)
            .field("signing_key", &self.signing_key)
            .finish()
    }
}
