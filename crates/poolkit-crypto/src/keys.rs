use std::fmt;

use ed25519_dalek::{Signature, Signer as DalekSigner, SigningKey, Verifier as DalekVerifier, VerifyingKey};
use poolkit_types::{CryptoError, PublicKey, ValidationError};
use rand::rngs::OsRng;

/// Session keypair. The secret never appears in `Debug` output.
#[derive(Clone)]
pub struct Keypair {
    public_key: PublicKey,
    signing_key: SigningKey,
}

impl Keypair {
    pub fn new(signing_key: SigningKey) -> Self {
        Self {
            public_key: PublicKey::new(signing_key.verifying_key().to_bytes()),
            signing_key,
        }
    }

    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self::new(SigningKey::from_bytes(&seed))
    }

    /// Parses an `S...` secret seed.
    pub fn from_secret_seed(secret: &str) -> Result<Self, ValidationError> {
        stellar_strkey::ed25519::PrivateKey::from_string(secret.trim())
            .map(|seed| Self::from_seed(seed.0))
            .map_err(|_| ValidationError::InvalidStrKey("expected an S... secret seed".to_string()))
    }

    pub fn random() -> Self {
        Self::new(SigningKey::generate(&mut OsRng))
    }

    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }

    /// `S...` rendering of the seed.
    pub fn secret_seed(&self) -> String {
        stellar_strkey::ed25519::PrivateKey(self.signing_key.to_bytes()).to_string()
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

pub fn verify_signature(
    public_key: &PublicKey,
    message: &[u8],
    signature: &[u8],
) -> Result<(), CryptoError> {
    let verify_key = VerifyingKey::from_bytes(public_key.as_bytes())
        .map_err(|err| CryptoError::InvalidPublicKey(err.to_string()))?;
    let signature: [u8; 64] = signature
        .try_into()
        .map_err(|_| CryptoError::InvalidLength {
            kind: "signature",
            expected: 64,
            actual: signature.len(),
        })?;
    verify_key
        .verify(message, &Signature::from_bytes(&signature))
        .map_err(|_| CryptoError::InvalidSignature)
}

/// Source of session keypairs.
pub trait KeyManager {
    fn generate(&self) -> Keypair;
}

/// Draws keys from the operating system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsKeyManager;

impl KeyManager for OsKeyManager {
    fn generate(&self) -> Keypair {
        Keypair::random()
    }
}
