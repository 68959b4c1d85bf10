//! Conversions between the value types in `poolkit-types` and their
//! `stellar_xdr::curr` counterparts.

use poolkit_types::{
    Asset, AssetCode, LiquidityPoolDescriptor, PoolId, PoolType, Price, PublicKey,
    ValidationError,
};
use stellar_xdr::curr as xdr;

use crate::codec::XdrError;

/// Domain value to its XDR form.
pub trait ToXdr {
    type Xdr;

    fn to_xdr_value(&self) -> Self::Xdr;
}

/// XDR value back to the domain type, enforcing domain invariants.
pub trait FromXdr: Sized {
    type Xdr;

    fn from_xdr_value(value: &Self::Xdr) -> Result<Self, XdrError>;
}

impl ToXdr for PublicKey {
    type Xdr = xdr::AccountId;

    fn to_xdr_value(&self) -> xdr::AccountId {
        xdr::AccountId(xdr::PublicKey::PublicKeyTypeEd25519(xdr::Uint256(
            self.into_inner(),
        )))
    }
}

impl FromXdr for PublicKey {
    type Xdr = xdr::AccountId;

    fn from_xdr_value(value: &xdr::AccountId) -> Result<Self, XdrError> {
        let xdr::PublicKey::PublicKeyTypeEd25519(xdr::Uint256(bytes)) = &value.0;
        Ok(PublicKey::new(*bytes))
    }
}

/// Transaction and operation sources are `MuxedAccount`s; only the plain
/// ed25519 arm is produced.
pub fn muxed_account(key: &PublicKey) -> xdr::MuxedAccount {
    xdr::MuxedAccount::Ed25519(xdr::Uint256(key.into_inner()))
}

/// The underlying account of either muxed arm.
pub fn muxed_account_key(account: &xdr::MuxedAccount) -> PublicKey {
    match account {
        xdr::MuxedAccount::Ed25519(xdr::Uint256(bytes)) => PublicKey::new(*bytes),
        xdr::MuxedAccount::MuxedEd25519(muxed) => PublicKey::new(muxed.ed25519.0),
    }
}

impl ToXdr for PoolId {
    type Xdr = xdr::PoolId;

    fn to_xdr_value(&self) -> xdr::PoolId {
        xdr::PoolId(xdr::Hash(self.into_inner()))
    }
}

impl FromXdr for PoolId {
    type Xdr = xdr::PoolId;

    fn from_xdr_value(value: &xdr::PoolId) -> Result<Self, XdrError> {
        Ok(PoolId::new(value.0 .0))
    }
}

impl ToXdr for Price {
    type Xdr = xdr::Price;

    fn to_xdr_value(&self) -> xdr::Price {
        xdr::Price {
            n: self.n,
            d: self.d,
        }
    }
}

impl FromXdr for Price {
    type Xdr = xdr::Price;

    fn from_xdr_value(value: &xdr::Price) -> Result<Self, XdrError> {
        Ok(Price::new(value.n, value.d))
    }
}

fn padded_code<const N: usize>(code: &AssetCode) -> [u8; N] {
    let mut out = [0u8; N];
    let bytes = code.as_str().as_bytes();
    out[..bytes.len().min(N)].copy_from_slice(&bytes[..bytes.len().min(N)]);
    out
}

impl ToXdr for Asset {
    type Xdr = xdr::Asset;

    fn to_xdr_value(&self) -> xdr::Asset {
        match self {
            Asset::Native => xdr::Asset::Native,
            Asset::Credit { code, issuer } if code.is_alphanum4() => {
                xdr::Asset::CreditAlphanum4(xdr::AlphaNum4 {
                    asset_code: xdr::AssetCode4(padded_code(code)),
                    issuer: issuer.to_xdr_value(),
                })
            }
            Asset::Credit { code, issuer } => xdr::Asset::CreditAlphanum12(xdr::AlphaNum12 {
                asset_code: xdr::AssetCode12(padded_code(code)),
                issuer: issuer.to_xdr_value(),
            }),
        }
    }
}

impl FromXdr for Asset {
    type Xdr = xdr::Asset;

    fn from_xdr_value(value: &xdr::Asset) -> Result<Self, XdrError> {
        match value {
            xdr::Asset::Native => Ok(Asset::Native),
            xdr::Asset::CreditAlphanum4(credit) => Ok(Asset::Credit {
                code: AssetCode::from_padded(&credit.asset_code.0)?,
                issuer: PublicKey::from_xdr_value(&credit.issuer)?,
            }),
            xdr::Asset::CreditAlphanum12(credit) => {
                let code = AssetCode::from_padded(&credit.asset_code.0)?;
                // Short codes have exactly one encoding.
                if code.is_alphanum4() {
                    return Err(ValidationError::InvalidAssetCode(code.to_string()).into());
                }
                Ok(Asset::Credit {
                    code,
                    issuer: PublicKey::from_xdr_value(&credit.issuer)?,
                })
            }
        }
    }
}

/// `LiquidityPoolParameters`, the preimage of the pool id.
impl ToXdr for LiquidityPoolDescriptor {
    type Xdr = xdr::LiquidityPoolParameters;

    fn to_xdr_value(&self) -> xdr::LiquidityPoolParameters {
        match self.pool_type() {
            PoolType::ConstantProduct => xdr::LiquidityPoolParameters::LiquidityPoolConstantProduct(
                xdr::LiquidityPoolConstantProductParameters {
                    asset_a: self.asset_a().to_xdr_value(),
                    asset_b: self.asset_b().to_xdr_value(),
                    fee: self.fee(),
                },
            ),
        }
    }
}

impl FromXdr for LiquidityPoolDescriptor {
    type Xdr = xdr::LiquidityPoolParameters;

    fn from_xdr_value(value: &xdr::LiquidityPoolParameters) -> Result<Self, XdrError> {
        let xdr::LiquidityPoolParameters::LiquidityPoolConstantProduct(params) = value;
        Ok(LiquidityPoolDescriptor::new(
            Asset::from_xdr_value(&params.asset_a)?,
            Asset::from_xdr_value(&params.asset_b)?,
            PoolType::ConstantProduct,
            params.fee,
        )?)
    }
}

/// Decoded `ChangeTrustAsset`: a plain asset or a pool share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrustLine {
    Asset(Asset),
    PoolShare(LiquidityPoolDescriptor),
}

impl ToXdr for TrustLine {
    type Xdr = xdr::ChangeTrustAsset;

    fn to_xdr_value(&self) -> xdr::ChangeTrustAsset {
        match self {
            TrustLine::Asset(asset) => match asset.to_xdr_value() {
                xdr::Asset::Native => xdr::ChangeTrustAsset::Native,
                xdr::Asset::CreditAlphanum4(credit) => xdr::ChangeTrustAsset::CreditAlphanum4(credit),
                xdr::Asset::CreditAlphanum12(credit) => {
                    xdr::ChangeTrustAsset::CreditAlphanum12(credit)
                }
            },
            TrustLine::PoolShare(descriptor) => {
                xdr::ChangeTrustAsset::PoolShare(descriptor.to_xdr_value())
            }
        }
    }
}

impl FromXdr for TrustLine {
    type Xdr = xdr::ChangeTrustAsset;

    fn from_xdr_value(value: &xdr::ChangeTrustAsset) -> Result<Self, XdrError> {
        let asset = match value {
            xdr::ChangeTrustAsset::Native => xdr::Asset::Native,
            xdr::ChangeTrustAsset::CreditAlphanum4(credit) => {
                xdr::Asset::CreditAlphanum4(credit.clone())
            }
            xdr::ChangeTrustAsset::CreditAlphanum12(credit) => {
                xdr::Asset::CreditAlphanum12(credit.clone())
            }
            xdr::ChangeTrustAsset::PoolShare(params) => {
                return Ok(TrustLine::PoolShare(LiquidityPoolDescriptor::from_xdr_value(
                    params,
                )?))
            }
        };
        Ok(TrustLine::Asset(Asset::from_xdr_value(&asset)?))
    }
}

#[cfg(test)]
mod tests {
    use poolkit_types::{Asset, LiquidityPoolDescriptor, PublicKey};
    use stellar_xdr::curr as xdr;

    use super::{muxed_account, muxed_account_key, FromXdr, ToXdr, TrustLine};
    use crate::codec::encode;

    #[test]
    fn native_asset_is_a_bare_discriminant() {
        assert_eq!(encode(&Asset::Native.to_xdr_value()).unwrap(), vec![0, 0, 0, 0]);
    }

    #[test]
    fn alphanum4_asset_layout() {
        let issuer = PublicKey::new([0x11; 32]);
        let asset = Asset::credit("FOO", issuer).unwrap();
        let bytes = encode(&asset.to_xdr_value()).unwrap();
        assert_eq!(bytes.len(), 4 + 4 + 4 + 32);
        assert_eq!(&bytes[..4], &[0, 0, 0, 1]);
        assert_eq!(&bytes[4..8], b"FOO\0");
        assert_eq!(&bytes[12..], &[0x11; 32]);
        assert_eq!(Asset::from_xdr_value(&asset.to_xdr_value()).unwrap(), asset);
    }

    #[test]
    fn pool_parameters_layout() {
        let issuer = PublicKey::new([0x22; 32]);
        let custom = Asset::credit("LONGASSET", issuer).unwrap();
        let descriptor = LiquidityPoolDescriptor::constant_product(Asset::Native, custom).unwrap();
        let bytes = encode(&descriptor.to_xdr_value()).unwrap();
        // type + native + (tag + 12-byte code + account id) + fee
        assert_eq!(bytes.len(), 4 + 4 + (4 + 12 + 36) + 4);
        assert_eq!(&bytes[bytes.len() - 4..], &[0, 0, 0, 30]);
        assert_eq!(
            LiquidityPoolDescriptor::from_xdr_value(&descriptor.to_xdr_value()).unwrap(),
            descriptor
        );
    }

    #[test]
    fn out_of_order_pool_assets_are_refused() {
        let issuer = PublicKey::new([0x22; 32]);
        let custom = Asset::credit("FOO", issuer).unwrap();
        let params = xdr::LiquidityPoolParameters::LiquidityPoolConstantProduct(
            xdr::LiquidityPoolConstantProductParameters {
                asset_a: custom.to_xdr_value(),
                asset_b: Asset::Native.to_xdr_value(),
                fee: 30,
            },
        );
        assert!(LiquidityPoolDescriptor::from_xdr_value(&params).is_err());
    }

    #[test]
    fn short_code_in_alphanum12_is_refused() {
        let issuer = PublicKey::new([0x22; 32]);
        let mut code = [0u8; 12];
        code[..3].copy_from_slice(b"FOO");
        let asset = xdr::Asset::CreditAlphanum12(xdr::AlphaNum12 {
            asset_code: xdr::AssetCode12(code),
            issuer: issuer.to_xdr_value(),
        });
        assert!(Asset::from_xdr_value(&asset).is_err());
    }

    #[test]
    fn trust_lines_map_to_change_trust_arms() {
        let issuer = PublicKey::new([0x33; 32]);
        let descriptor = LiquidityPoolDescriptor::constant_product(
            Asset::Native,
            Asset::credit("FOO", issuer).unwrap(),
        )
        .unwrap();
        let line = TrustLine::PoolShare(descriptor);
        let value = line.to_xdr_value();
        assert!(matches!(value, xdr::ChangeTrustAsset::PoolShare(_)));
        assert_eq!(TrustLine::from_xdr_value(&value).unwrap(), line);

        let credit = TrustLine::Asset(Asset::credit("BARBAZ", issuer).unwrap());
        assert!(matches!(
            credit.to_xdr_value(),
            xdr::ChangeTrustAsset::CreditAlphanum12(_)
        ));
    }

    #[test]
    fn muxed_source_resolves_to_its_account() {
        let key = PublicKey::new([0x44; 32]);
        assert_eq!(muxed_account_key(&muxed_account(&key)), key);
        let muxed = xdr::MuxedAccount::MuxedEd25519(xdr::MuxedAccountMed25519 {
            id: 7,
            ed25519: xdr::Uint256(key.into_inner()),
        });
        assert_eq!(muxed_account_key(&muxed), key);
    }
}
