//! Ed25519 co-signer for Solana transactions.

use ed25519_dalek::{Signer, SigningKey};
use std::fmt;
use web3_wallets_error::{Result, WalletsError};
use web3_wallets_traits::TransactionSigner;

/// Keypair passed as an extra signer to `send_tx`, e.g. a freshly created
/// account that must sign its own creation
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Keypair from a 32-byte secret seed
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Keypair from the 64-byte `secret || public` form Solana tools export
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 64 {
            return Err(WalletsError::FormatError(format!(
                "keypair must be 64 bytes, got {}",
                bytes.len()
            )));
        }
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&bytes[..32]);
        let keypair = Self::from_seed(&seed);
        if keypair.signing_key.verifying_key().as_bytes() != &bytes[32..] {
            return Err(WalletsError::FormatError(
                "public key does not match secret key".into(),
            ));
        }
        Ok(keypair)
    }

    /// Keypair from its base58 64-byte encoding
    pub fn from_base58(encoded: &str) -> Result<Self> {
        let bytes = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| WalletsError::FormatError(format!("invalid base58 keypair: {e}")))?;
        Self::from_bytes(&bytes)
    }

    /// Base58 public key
    pub fn pubkey(&self) -> String {
        bs58::encode(self.signing_key.verifying_key().as_bytes()).into_string()
    }
}

impl TransactionSigner for Keypair {
    fn public_key(&self) -> String {
        self.pubkey()
    }

    fn sign_message(&self, message: &[u8]) -> Vec<u8> {
        self.signing_key.sign(message).to_bytes().to_vec()
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("pubkey", &self.pubkey())
            .finish_non_exhaustive()
    }
}
