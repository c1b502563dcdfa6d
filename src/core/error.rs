use thiserror::Error;

/// Failures surfaced by the signing subsystem.
///
/// There are no retries and no partial outputs: every variant aborts the
/// signing call that produced it.
#[derive(Debug, Error)]
pub enum SignError {
    /// The package template is not a valid archive, or an entry inside it
    /// cannot be used.
    #[error("invalid package template: {0}")]
    Format(String),

    /// The signing identity could not be loaded, or certificate and private
    /// key do not belong together. Raised at load time, before any signing
    /// attempt.
    #[error("signing identity: {0}")]
    Credential(String),

    /// The signature primitive itself failed. Never downgraded to an
    /// unsigned package.
    #[error("signature generation: {0}")]
    Crypto(String),

    #[error("archive i/o: {0}")]
    Io(#[from] std::io::Error),
}

impl From<zip::result::ZipError> for SignError {
    fn from(err: zip::result::ZipError) -> Self {
        SignError::Format(err.to_string())
    }
}
