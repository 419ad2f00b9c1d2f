use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// The key material is not base64 after stripping the PEM armour.
    #[error("Private key is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The decoded bytes are not an unencrypted PKCS#8 RSA key.
    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    /// Passphrase-protected keys are not supported.
    #[error("Encrypted private keys are not supported")]
    EncryptedKey,

    /// Account or user identifier missing.
    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("Failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}
