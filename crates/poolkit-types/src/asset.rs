//! Assets and liquidity pool descriptors.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::ids::PublicKey;

/// Fee for constant-product pools, in basis points.
pub const LIQUIDITY_POOL_FEE_V18: i32 = 30;

/// Asset code: 1-12 ASCII alphanumerics. Codes up to four characters are
/// encoded as `alphanum4`, longer ones as `alphanum12`.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetCode(String);

impl AssetCode {
    pub const MAX_LEN: usize = 12;

    pub fn new(code: &str) -> Result<Self, ValidationError> {
        if code.is_empty()
            || code.len() > Self::MAX_LEN
            || !code.bytes().all(|b| b.is_ascii_alphanumeric())
        {
            return Err(ValidationError::InvalidAssetCode(code.to_string()));
        }
        Ok(Self(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_alphanum4(&self) -> bool {
        self.0.len() <= 4
    }

    /// Zero-padded code bytes: 4 bytes for `alphanum4`, 12 for `alphanum12`.
    pub fn padded(&self) -> Vec<u8> {
        let width = if self.is_alphanum4() { 4 } else { 12 };
        let mut out = vec![0u8; width];
        out[..self.0.len()].copy_from_slice(self.0.as_bytes());
        out
    }

    /// Inverse of [`AssetCode::padded`]; trailing zero bytes are stripped.
    pub fn from_padded(bytes: &[u8]) -> Result<Self, ValidationError> {
        let end = bytes.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
        let code = std::str::from_utf8(&bytes[..end])
            .map_err(|_| ValidationError::InvalidAssetCode(hex::encode(bytes)))?;
        Self::new(code)
    }
}

impl fmt::Display for AssetCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for AssetCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetCode({})", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Asset {
    Native,
    Credit { code: AssetCode, issuer: PublicKey },
}

impl Asset {
    pub fn credit(code: &str, issuer: PublicKey) -> Result<Self, ValidationError> {
        Ok(Self::Credit {
            code: AssetCode::new(code)?,
            issuer,
        })
    }

    /// Ledger asset type discriminant: 0 native, 1 alphanum4, 2 alphanum12.
    pub fn type_tag(&self) -> i32 {
        match self {
            Self::Native => 0,
            Self::Credit { code, .. } if code.is_alphanum4() => 1,
            Self::Credit { .. } => 2,
        }
    }
}

impl Ord for Asset {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Native, Self::Native) => Ordering::Equal,
            (Self::Native, Self::Credit { .. }) => Ordering::Less,
            (Self::Credit { .. }, Self::Native) => Ordering::Greater,
            (
                Self::Credit {
                    code: code_a,
                    issuer: issuer_a,
                },
                Self::Credit {
                    code: code_b,
                    issuer: issuer_b,
                },
            ) => self
                .type_tag()
                .cmp(&other.type_tag())
                .then_with(|| code_a.padded().cmp(&code_b.padded()))
                .then_with(|| issuer_a.cmp(issuer_b)),
        }
    }
}

impl PartialOrd for Asset {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => f.write_str("native"),
            Self::Credit { code, issuer } => write!(f, "{code}:{issuer}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PoolType {
    ConstantProduct,
}

impl PoolType {
    pub fn type_tag(&self) -> i32 {
        match self {
            Self::ConstantProduct => 0,
        }
    }
}

/// Pool parameters; the pool id is a pure function of these fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LiquidityPoolDescriptor {
    asset_a: Asset,
    asset_b: Asset,
    pool_type: PoolType,
    fee: i32,
}

impl LiquidityPoolDescriptor {
    /// Assets must already be in canonical order (`asset_a < asset_b`).
    pub fn new(
        asset_a: Asset,
        asset_b: Asset,
        pool_type: PoolType,
        fee: i32,
    ) -> Result<Self, ValidationError> {
        if asset_a >= asset_b {
            return Err(ValidationError::AssetOrder);
        }
        Ok(Self {
            asset_a,
            asset_b,
            pool_type,
            fee,
        })
    }

    pub fn constant_product(asset_a: Asset, asset_b: Asset) -> Result<Self, ValidationError> {
        Self::new(
            asset_a,
            asset_b,
            PoolType::ConstantProduct,
            LIQUIDITY_POOL_FEE_V18,
        )
    }

    pub fn asset_a(&self) -> &Asset {
        &self.asset_a
    }

    pub fn asset_b(&self) -> &Asset {
        &self.asset_b
    }

    pub fn pool_type(&self) -> PoolType {
        self.pool_type
    }

    pub fn fee(&self) -> i32 {
        self.fee
    }
}
