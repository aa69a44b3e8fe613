//! Proof file container.
//!
//! ```text
//! magic "TAPF" | version (u32 BE) | count (BigSize)
//!     | { len (BigSize) | proof bytes | checksum (32) } * count
//! ```
//!
//! Each checksum chains over the previous one:
//! `checksum_i = sha256(checksum_{i-1} || proof_bytes_i)`, starting from 32
//! zero bytes.

use alloc::vec::Vec;

use bitcoin::hashes::{Hash, HashEngine, sha256::Hash as Sha256Hash};

use crate::error::Error;
use crate::proof::FileVersion;

/// Magic prefix of an encoded proof file.
pub const FILE_MAGIC: [u8; 4] = *b"TAPF";
/// Upper bound on the number of proofs in one file.
pub const FILE_MAX_NUM_PROOFS: u64 = 420_000;
/// Upper bound on the size of a single encoded proof.
pub const FILE_MAX_PROOF_SIZE: u64 = 500 * 1024 * 1024;

/// A raw proof with its chained checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashedProof {
    /// Encoded proof record.
    pub proof_bytes: Vec<u8>,
    /// Checksum over the previous checksum and `proof_bytes`.
    pub hash: [u8; 32],
}

/// Encoded proof file with still-opaque proof records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    pub version: u32,
    pub proofs: Vec<HashedProof>,
}

impl File {
    /// Builds a file from raw proofs, computing the checksum chain.
    pub fn new(version: FileVersion, raw_proofs: Vec<Vec<u8>>) -> Self {
        let mut file = File {
            version: version as u32,
            proofs: Vec::with_capacity(raw_proofs.len()),
        };
        for proof_bytes in raw_proofs {
            file.append_proof(proof_bytes);
        }
        file
    }

    /// Appends a raw proof, extending the checksum chain.
    pub fn append_proof(&mut self, proof_bytes: Vec<u8>) {
        let prev = self.last_hash();
        let hash = hash_proof(&proof_bytes, &prev);
        self.proofs.push(HashedProof { proof_bytes, hash });
    }

    /// Returns the checksum of the last proof, or zero for an empty file.
    pub fn last_hash(&self) -> [u8; 32] {
        self.proofs.last().map_or([0u8; 32], |proof| proof.hash)
    }

    /// Serializes the file into its container encoding.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&FILE_MAGIC);
        out.extend_from_slice(&self.version.to_be_bytes());
        encode_bigsize(self.proofs.len() as u64, &mut out);
        for proof in &self.proofs {
            encode_bigsize(proof.proof_bytes.len() as u64, &mut out);
            out.extend_from_slice(&proof.proof_bytes);
            out.extend_from_slice(&proof.hash);
        }
        out
    }

    /// Parses a container and checks its checksum chain.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let mut reader = Reader { bytes, pos: 0 };

        if reader.take(FILE_MAGIC.len())? != FILE_MAGIC {
            return Err(Error::InvalidMagic);
        }
        let version = u32::from_be_bytes(reader.take_array()?);
        if version != FileVersion::V0 as u32 {
            return Err(Error::UnknownVersion(version));
        }

        let count = reader.bigsize()?;
        if count > FILE_MAX_NUM_PROOFS {
            return Err(Error::TooManyProofs(count));
        }

        let mut prev = [0u8; 32];
        let mut proofs = Vec::with_capacity(count as usize);
        for index in 0..count as usize {
            let len = reader.bigsize()?;
            if len > FILE_MAX_PROOF_SIZE {
                return Err(Error::ProofTooLarge(len));
            }
            let proof_bytes = reader.take(len as usize)?.to_vec();
            let hash: [u8; 32] = reader.take_array()?;
            if hash_proof(&proof_bytes, &prev) != hash {
                return Err(Error::ChecksumMismatch { index });
            }
            prev = hash;
            proofs.push(HashedProof { proof_bytes, hash });
        }

        let remaining = reader.bytes.len() - reader.pos;
        if remaining != 0 {
            return Err(Error::TrailingBytes(remaining));
        }

        Ok(File { version, proofs })
    }
}

/// Returns sha256(prev_hash || proof_bytes).
pub fn hash_proof(proof_bytes: &[u8], prev_hash: &[u8; 32]) -> [u8; 32] {
    let mut engine = Sha256Hash::engine();
    engine.input(prev_hash);
    engine.input(proof_bytes);
    Sha256Hash::from_engine(engine).to_byte_array()
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], Error> {
        let end = self.pos.checked_add(len).ok_or(Error::UnexpectedEof)?;
        let slice = self.bytes.get(self.pos..end).ok_or(Error::UnexpectedEof)?;
        self.pos = end;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn bigsize(&mut self) -> Result<u64, Error> {
        let first = self.take_array::<1>()?[0];
        let (value, min) = match first {
            0xFD => (u16::from_be_bytes(self.take_array()?) as u64, 0xFD),
            0xFE => (u32::from_be_bytes(self.take_array()?) as u64, 0x1_0000),
            0xFF => (u64::from_be_bytes(self.take_array()?), 0x1_0000_0000),
            _ => return Ok(first as u64),
        };
        if value < min {
            return Err(Error::NonCanonicalBigSize);
        }
        Ok(value)
    }
}

/// Encodes a BigSize varint into the provided buffer.
pub fn encode_bigsize(value: u64, out: &mut Vec<u8>) {
    match value {
        0..=0xFC => out.push(value as u8),
        0xFD..=0xFFFF => {
            out.push(0xFD);
            out.extend_from_slice(&(value as u16).to_be_bytes());
        }
        0x1_0000..=0xFFFF_FFFF => {
            out.push(0xFE);
            out.extend_from_slice(&(value as u32).to_be_bytes());
        }
        _ => {
            out.push(0xFF);
            out.extend_from_slice(&value.to_be_bytes());
        }
    }
}
