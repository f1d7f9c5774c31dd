// Aptos account addresses and local Ed25519 signers.

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::{Signature, Signer, SigningKey};
use serde::{Serialize, Serializer};
use sha3::{Digest, Sha3_256};

use crate::error::ChainError;

/// Authentication-key scheme byte for single Ed25519 keys.
const ED25519_SCHEME: u8 = 0x00;

/// AIP-80 prefix for Ed25519 private keys.
const AIP80_PREFIX: &str = "ed25519-priv-";

// ---------------------------------------------------------------------------
// AccountAddress
// ---------------------------------------------------------------------------

/// 32-byte account address. Displays in long form: `0x` plus 64 hex digits.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountAddress([u8; 32]);

impl AccountAddress {
    pub const ONE: AccountAddress = {
        let mut bytes = [0u8; 32];
        bytes[31] = 1;
        AccountAddress(bytes)
    };

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse `0x`-prefixed or bare hex. Short forms such as `0x1` are
    /// left-padded with zeros.
    pub fn from_hex(input: &str) -> Result<Self, ChainError> {
        let invalid = |reason: &str| ChainError::InvalidAddress {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = input.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if digits.is_empty() {
            return Err(invalid("empty"));
        }
        if digits.len() > 64 {
            return Err(invalid("longer than 32 bytes"));
        }

        let padded = format!("{digits:0>64}");
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(&padded, &mut bytes).map_err(|e| invalid(&e.to_string()))?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl FromStr for AccountAddress {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountAddress({})", self.to_hex())
    }
}

impl Serialize for AccountAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// LocalAccount
// ---------------------------------------------------------------------------

/// An Ed25519 key held in memory, with the address it authenticates.
#[derive(Clone)]
pub struct LocalAccount {
    key: SigningKey,
    address: AccountAddress,
}

impl LocalAccount {
    /// Accepts 32 bytes of hex, with or without `0x`, or the AIP-80
    /// `ed25519-priv-0x...` form.
    pub fn from_private_key(input: &str) -> Result<Self, ChainError> {
        let trimmed = input.trim();
        let trimmed = trimmed.strip_prefix(AIP80_PREFIX).unwrap_or(trimmed);
        let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);

        let mut secret = [0u8; 32];
        if digits.len() != 64 {
            return Err(ChainError::InvalidPrivateKey(format!(
                "expected 64 hex characters, got {}",
                digits.len()
            )));
        }
        hex::decode_to_slice(digits, &mut secret)
            .map_err(|e| ChainError::InvalidPrivateKey(e.to_string()))?;

        let key = SigningKey::from_bytes(&secret);
        let address = derive_address(&key.verifying_key().to_bytes());
        Ok(Self { key, address })
    }

    pub fn address(&self) -> AccountAddress {
        self.address
    }

    pub fn public_key_hex(&self) -> String {
        format!("0x{}", hex::encode(self.key.verifying_key().to_bytes()))
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        self.key.sign(message)
    }
}

impl fmt::Debug for LocalAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalAccount")
            .field("address", &self.address)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Address of a single-key Ed25519 account: `sha3_256(public_key || 0x00)`.
pub fn derive_address(public_key: &[u8; 32]) -> AccountAddress {
    let mut hasher = Sha3_256::new();
    hasher.update(public_key);
    hasher.update([ED25519_SCHEME]);
    AccountAddress(hasher.finalize().into())
}
