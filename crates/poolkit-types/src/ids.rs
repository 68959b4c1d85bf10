use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

macro_rules! impl_fixed_bytes_id {
    ($name:ident, $len:expr) => {
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name([u8; $len]);

        impl $name {
            pub const LEN: usize = $len;

            pub const fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            pub fn from_slice(bytes: &[u8]) -> Result<Self, ValidationError> {
                if bytes.len() != Self::LEN {
                    return Err(ValidationError::InvalidLength {
                        kind: stringify!($name),
                        expected: Self::LEN,
                        actual: bytes.len(),
                    });
                }
                let mut out = [0u8; Self::LEN];
                out.copy_from_slice(bytes);
                Ok(Self(out))
            }

            pub const fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            pub const fn into_inner(self) -> [u8; $len] {
                self.0
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(value: [u8; $len]) -> Self {
                Self::new(value)
            }
        }

        impl TryFrom<&[u8]> for $name {
            type Error = ValidationError;

            fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
                Self::from_slice(value)
            }
        }
    };
}

/// Hex-rendered 32-byte digests (pool ids, transaction hashes).
macro_rules! impl_hex_display {
    ($name:ident) => {
        impl $name {
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            pub fn from_hex(value: &str) -> Result<Self, ValidationError> {
                let bytes = hex::decode(value.trim())
                    .map_err(|err| ValidationError::InvalidHex(err.to_string()))?;
                Self::from_slice(&bytes)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_hex(s)
            }
        }
    };
}

impl_fixed_bytes_id!(PublicKey, 32);
impl_fixed_bytes_id!(PoolId, 32);
impl_fixed_bytes_id!(TxHash, 32);
impl_fixed_bytes_id!(NetworkId, 32);

impl_hex_display!(PoolId);
impl_hex_display!(TxHash);
impl_hex_display!(NetworkId);

impl PublicKey {
    /// Renders the key as a `G...` account id.
    pub fn to_strkey(&self) -> String {
        stellar_strkey::ed25519::PublicKey(self.0).to_string()
    }

    /// Parses a `G...` account id. Other strkey kinds (seeds, muxed
    /// accounts) are refused without echoing the input.
    pub fn from_strkey(value: &str) -> Result<Self, ValidationError> {
        stellar_strkey::ed25519::PublicKey::from_string(value.trim())
            .map(|key| Self(key.0))
            .map_err(|_| ValidationError::InvalidStrKey("expected a G... account id".to_string()))
    }

    /// Last four bytes, used as the signature hint on envelopes.
    pub fn signature_hint(&self) -> [u8; 4] {
        let mut hint = [0u8; 4];
        hint.copy_from_slice(&self.0[28..]);
        hint
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_strkey())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_strkey())
    }
}

impl FromStr for PublicKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_strkey(s)
    }
}

/// Account sequence number as reported by the ledger.
pub type SequenceNumber = i64;

#[cfg(test)]
mod tests {
    use super::{PoolId, PublicKey};

    #[test]
    fn pool_id_renders_as_plain_hex() {
        let id = PoolId::new([0xab; 32]);
        let text = id.to_string();
        assert_eq!(text.len(), 64);
        assert!(text.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(text.parse::<PoolId>().unwrap(), id);
    }

    #[test]
    fn pool_id_rejects_short_hex() {
        assert!("abcd".parse::<PoolId>().is_err());
        assert!("zz".repeat(32).parse::<PoolId>().is_err());
    }

    #[test]
    fn zero_key_matches_known_account_id() {
        let text = PublicKey::new([0; 32]).to_strkey();
        assert_eq!(text, "GAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAWHF");
        assert_eq!(PublicKey::from_strkey(&text).unwrap(), PublicKey::new([0; 32]));
    }

    #[test]
    fn from_strkey_rejects_seeds_and_bad_checksums() {
        let seed = "SAIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRDBNT";
        let err = PublicKey::from_strkey(seed).unwrap_err();
        assert!(!err.to_string().contains(seed));

        let mut account = PublicKey::new([0x7f; 32]).to_strkey();
        let last = account.pop().unwrap();
        account.push(if last == 'A' { 'B' } else { 'A' });
        assert!(PublicKey::from_strkey(&account).is_err());
    }

    #[test]
    fn public_key_hint_is_trailing_bytes() {
        let mut bytes = [0u8; 32];
        bytes[28..].copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(PublicKey::new(bytes).signature_hint(), [1, 2, 3, 4]);
    }
}
