use thiserror::Error;

/// Errors raised while decoding a proof file container.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The file does not start with the proof file magic.
    #[error("invalid proof file magic bytes")]
    InvalidMagic,

    /// The file declares a version this crate does not know.
    #[error("unknown proof file version {0}")]
    UnknownVersion(u32),

    /// The file ends inside a field.
    #[error("unexpected end of proof file")]
    UnexpectedEof,

    /// Bytes follow the last proof.
    #[error("proof file has {0} trailing bytes")]
    TrailingBytes(usize),

    /// The declared proof count is above the accepted maximum.
    #[error("proof count {0} exceeds the maximum number of proofs")]
    TooManyProofs(u64),

    /// A declared proof length is above the accepted maximum.
    #[error("proof length {0} exceeds the maximum proof size")]
    ProofTooLarge(u64),

    /// The stored checksum of a proof does not chain from the previous one.
    #[error("checksum mismatch for proof at index {index}")]
    ChecksumMismatch {
        /// Position of the proof in the file.
        index: usize,
    },

    /// A BigSize value is not in its shortest encoding.
    #[error("non-canonical BigSize encoding")]
    NonCanonicalBigSize,
}
