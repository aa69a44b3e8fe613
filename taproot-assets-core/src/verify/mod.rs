//! Verification routines for Taproot Assets proofs.

/// Ownership challenge witness helpers.
pub mod challenge;
/// Commitment leaf encodings.
pub mod encoding;
/// Meta reveal verification helpers.
pub mod meta_reveal;
/// MS-SMT proof helpers.
pub mod mssmt;
/// Proof verification helpers.
pub mod proof;
/// Verified asset state.
pub mod snapshot;
/// Taproot proof verification helpers.
pub mod taproot_proof;
/// Anchor transaction verification helpers.
pub mod tx;
/// Script validation engine boundary.
pub mod vm;

/// Result type for verification helpers.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors returned by verification helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Meta reveal verification failed.
    MetaReveal(meta_reveal::Error),
    /// Proof verification failed.
    Proof(proof::Error),
    /// Taproot proof verification failed.
    TaprootProof(taproot_proof::Error),
    /// Anchor transaction verification failed.
    Tx(tx::Error),
}

impl From<meta_reveal::Error> for Error {
    fn from(err: meta_reveal::Error) -> Self {
        Self::MetaReveal(err)
    }
}

impl From<proof::Error> for Error {
    /// Converts a proof error into a verification error.
    fn from(err: proof::Error) -> Self {
        Self::Proof(err)
    }
}

impl From<taproot_proof::Error> for Error {
    /// Converts a taproot proof error into a verification error.
    fn from(err: taproot_proof::Error) -> Self {
        Self::TaprootProof(err)
    }
}

impl From<tx::Error> for Error {
    /// Converts a transaction error into a verification error.
    fn from(err: tx::Error) -> Self {
        Self::Tx(err)
    }
}

impl core::fmt::Display for Error {
    /// Formats the error for display.
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::MetaReveal(err) => core::fmt::Display::fmt(err, f),
            Error::Proof(err) => core::fmt::Display::fmt(err, f),
            Error::TaprootProof(err) => core::fmt::Display::fmt(err, f),
            Error::Tx(err) => core::fmt::Display::fmt(err, f),
        }
    }
}

impl core::error::Error for Error {}
