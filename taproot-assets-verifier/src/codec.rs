//! Decode boundary between proof file bytes and [`ProofFile`]s.
//!
//! The container layout lives in [`taproot_assets_types::file`]; the
//! encoding of each record inside it is up to a [`ProofCodec`]. Input proof
//! files embedded in a record stay encoded here and are decoded only when
//! the transition spending them is verified.

use bincode::config::standard;
use taproot_assets_types::error::Error as ContainerError;
use taproot_assets_types::file::File;
use taproot_assets_types::proof::{FileVersion, Proof, ProofFile};
use thiserror::Error;

/// Errors raised while encoding or decoding proof files.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The container around the records is malformed.
    #[error("proof file container: {0}")]
    Container(#[from] ContainerError),
    /// A record could not be decoded.
    #[error("decode proof record: {0}")]
    Decode(String),
    /// A record could not be encoded.
    #[error("encode proof record: {0}")]
    Encode(String),
    /// A record decoded without consuming all of its bytes.
    #[error("{0} trailing bytes after proof record")]
    TrailingBytes(usize),
    /// An input proof file sits deeper below the top-level file than the
    /// configured limit.
    #[error("input proof files nested deeper than {limit} levels")]
    NestingTooDeep {
        /// Deepest nesting level accepted.
        limit: usize,
    },
    /// The record at `index` failed to decode.
    #[error("proof record {index}: {source}")]
    Record {
        /// Position of the record in the file.
        index: usize,
        /// Underlying error.
        source: Box<CodecError>,
    },
}

/// Encodes and decodes single proof records.
pub trait ProofCodec {
    /// Decodes one record.
    fn decode(&self, bytes: &[u8]) -> Result<Proof, CodecError>;

    /// Encodes one record.
    fn encode(&self, proof: &Proof) -> Result<Vec<u8>, CodecError>;
}

/// Record codec using bincode over the serde model.
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeCodec;

impl ProofCodec for BincodeCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Proof, CodecError> {
        let (proof, read): (Proof, usize) = bincode::serde::decode_from_slice(bytes, standard())
            .map_err(|err| CodecError::Decode(err.to_string()))?;
        if read != bytes.len() {
            return Err(CodecError::TrailingBytes(bytes.len() - read));
        }
        Ok(proof)
    }

    fn encode(&self, proof: &Proof) -> Result<Vec<u8>, CodecError> {
        bincode::serde::encode_to_vec(proof, standard())
            .map_err(|err| CodecError::Encode(err.to_string()))
    }
}

/// Encodes a proof file into container bytes.
pub fn encode_file<C: ProofCodec + ?Sized>(
    codec: &C,
    file: &ProofFile,
) -> Result<Vec<u8>, CodecError> {
    let records = file
        .proofs
        .iter()
        .map(|proof| codec.encode(proof))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(File::new(file.version, records).to_bytes())
}

/// Decodes container bytes into a proof file, checking the checksum chain
/// before any record is decoded.
pub fn decode_file<C: ProofCodec + ?Sized>(codec: &C, bytes: &[u8]) -> Result<ProofFile, CodecError> {
    let file = File::from_bytes(bytes)?;
    let proofs = file
        .proofs
        .iter()
        .enumerate()
        .map(|(index, hashed)| {
            codec
                .decode(&hashed.proof_bytes)
                .map_err(|err| CodecError::Record {
                    index,
                    source: Box::new(err),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ProofFile {
        version: FileVersion::V0,
        proofs,
    })
}
