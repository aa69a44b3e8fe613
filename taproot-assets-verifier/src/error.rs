use taproot_assets_core::verify::tx::HeaderError;
use taproot_assets_core::verify::vm::EngineError;
use taproot_assets_core::verify::{self, meta_reveal, proof, tx};
use thiserror::Error;

use crate::codec::CodecError;

/// Broad category of a verification failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A derived output key does not match the anchor output, or a
    /// commitment proof is otherwise unusable.
    InvalidTaprootProof,
    /// A taproot output of the anchor transaction lacks an exclusion proof.
    MissingExclusionProofs,
    /// A split asset comes without a proof for its split root.
    MissingSplitRootProof,
    /// The anchor transaction is not provably part of its block.
    InvalidMerkleProof,
    /// The header verifier does not know the block header.
    HeaderInvalid,
    /// The header verifier failed to answer.
    HeaderCheckFailed,
    /// A genesis asset with a meta hash comes without a meta reveal.
    MetaRevealRequired,
    /// A non-genesis asset comes with a meta reveal.
    UnexpectedMetaReveal,
    /// The meta reveal does not hash to the declared meta hash.
    MetaRevealMismatch,
    /// A proof does not continue from the previous one.
    BrokenChainLinkage,
    /// A nested input proof file failed verification.
    InputsInvalid,
    /// The script validation engine rejected the transition.
    TransitionRejected,
    /// Verification was cancelled.
    Cancelled,
    /// The proof file, or an input proof file nested in it, could not be
    /// decoded or holds no proofs.
    Malformed,
}

/// Errors returned while verifying a single proof.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProofError {
    /// The header verifier rejected the block header.
    #[error("block header invalid: {0}")]
    Header(#[source] HeaderError),
    /// A check on the proof itself failed.
    #[error(transparent)]
    Verify(#[from] verify::Error),
    /// A proof file of an additional input failed verification.
    #[error("input proof file {input} invalid: {source}")]
    InputsInvalid {
        /// Position of the failing file among the proof's additional inputs.
        input: usize,
        /// Why the file failed.
        source: Box<Error>,
    },
    /// The script validation engine rejected the transition.
    #[error("transition rejected: {0}")]
    TransitionRejected(#[source] EngineError),
    /// Verification was cancelled.
    #[error("verification cancelled")]
    Cancelled,
}

impl ProofError {
    /// Returns the category of the failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProofError::Header(HeaderError::UnknownHeader) => ErrorKind::HeaderInvalid,
            ProofError::Header(HeaderError::Backend(_)) => ErrorKind::HeaderCheckFailed,
            ProofError::Verify(err) => verify_kind(err),
            // Undecodable input bytes are part of the file carrying them.
            ProofError::InputsInvalid { source, .. } if source.kind() == ErrorKind::Malformed => {
                ErrorKind::Malformed
            }
            ProofError::InputsInvalid { .. } => ErrorKind::InputsInvalid,
            ProofError::TransitionRejected(_) => ErrorKind::TransitionRejected,
            ProofError::Cancelled => ErrorKind::Cancelled,
        }
    }
}

fn verify_kind(err: &verify::Error) -> ErrorKind {
    match err {
        verify::Error::Tx(
            tx::Error::PrevOutMismatch { .. } | tx::Error::AnchorTxMissingPrevOut { .. },
        ) => ErrorKind::BrokenChainLinkage,
        verify::Error::Tx(
            tx::Error::InvalidMerkleProofShape { .. } | tx::Error::InvalidTxMerkleProof,
        ) => ErrorKind::InvalidMerkleProof,
        verify::Error::Proof(proof::Error::MissingSplitRootProof) => {
            ErrorKind::MissingSplitRootProof
        }
        verify::Error::Proof(proof::Error::MissingExclusionProofs { .. }) => {
            ErrorKind::MissingExclusionProofs
        }
        verify::Error::Proof(_) | verify::Error::TaprootProof(_) => {
            ErrorKind::InvalidTaprootProof
        }
        verify::Error::MetaReveal(meta_reveal::Error::MetaRevealRequired) => {
            ErrorKind::MetaRevealRequired
        }
        verify::Error::MetaReveal(meta_reveal::Error::UnexpectedMetaReveal) => {
            ErrorKind::UnexpectedMetaReveal
        }
        verify::Error::MetaReveal(meta_reveal::Error::MetaRevealMismatch { .. }) => {
            ErrorKind::MetaRevealMismatch
        }
    }
}

/// Errors returned by proof file verification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The proof file could not be decoded.
    #[error("decode proof file: {0}")]
    Decode(#[from] CodecError),
    /// The proof file holds no proofs.
    #[error("proof file is empty")]
    EmptyFile,
    /// The proof at `index` failed verification.
    #[error("proof {index}: {source}")]
    Proof {
        /// Position of the failing proof in the file.
        index: usize,
        /// Why the proof failed.
        source: ProofError,
    },
    /// Verification was cancelled.
    #[error("verification cancelled")]
    Cancelled,
}

impl Error {
    /// Returns the category of the failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Decode(_) | Error::EmptyFile => ErrorKind::Malformed,
            Error::Proof { source, .. } => source.kind(),
            Error::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub(crate) fn at(index: usize, source: ProofError) -> Self {
        match source {
            ProofError::Cancelled => Error::Cancelled,
            source => Error::Proof { index, source },
        }
    }
}
