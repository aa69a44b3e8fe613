//! Meta reveal verification helpers.

use alloc::vec::Vec;

use bitcoin::hashes::{Hash, sha256::Hash as Sha256Hash};
use taproot_assets_types::asset::Asset;
use taproot_assets_types::proof::MetaReveal;

use crate::verify::encoding::TlvWriter;

/// TLV type for the meta reveal encoding field.
const META_REVEAL_ENCODING_TYPE: u64 = 0;
/// TLV type for the meta reveal data field.
const META_REVEAL_DATA_TYPE: u64 = 2;

/// Errors returned by meta reveal verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A meta reveal was attached to an asset that is not a genesis asset.
    UnexpectedMetaReveal,
    /// A genesis asset commits to a meta hash but carries no reveal.
    MetaRevealRequired,
    /// The reveal does not hash to the meta hash in the asset genesis.
    MetaRevealMismatch {
        /// Hash of the attached reveal.
        revealed: [u8; 32],
        /// Meta hash declared in the asset genesis.
        declared: [u8; 32],
    },
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::UnexpectedMetaReveal => write!(f, "non-genesis asset with meta reveal"),
            Error::MetaRevealRequired => write!(f, "meta reveal required"),
            Error::MetaRevealMismatch { revealed, declared } => {
                write!(f, "meta hash mismatch: revealed ")?;
                write_hex(f, revealed)?;
                write!(f, ", declared ")?;
                write_hex(f, declared)
            }
        }
    }
}

impl core::error::Error for Error {}

fn write_hex(f: &mut core::fmt::Formatter<'_>, bytes: &[u8]) -> core::fmt::Result {
    bytes.iter().try_for_each(|byte| write!(f, "{:02x}", byte))
}

/// SHA-256 hashing interface used by meta reveal verification.
pub trait Sha256Hasher {
    /// Returns the SHA-256 digest of the provided bytes.
    fn hash(&self, data: &[u8]) -> [u8; 32];
}

/// Default SHA-256 hasher backed by `bitcoin::hashes`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BitcoinSha256Hasher;

impl Sha256Hasher for BitcoinSha256Hasher {
    /// Hashes the input using `bitcoin::hashes::sha256`.
    fn hash(&self, data: &[u8]) -> [u8; 32] {
        Sha256Hash::hash(data).to_byte_array()
    }
}

/// What has to happen with the meta reveal of a proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaCheck {
    /// Nothing to check.
    Skip,
    /// The reveal must hash to the declared meta hash.
    Validate,
    /// The proof is invalid as is.
    Reject(Error),
}

/// Classifies a proof by whether it carries a reveal, whether the asset
/// declares a meta hash and whether the asset is a genesis asset.
pub fn classify(has_reveal: bool, has_meta_hash: bool, is_genesis: bool) -> MetaCheck {
    match (has_reveal, has_meta_hash, is_genesis) {
        (true, _, false) => MetaCheck::Reject(Error::UnexpectedMetaReveal),
        (false, true, true) => MetaCheck::Reject(Error::MetaRevealRequired),
        (true, true, true) => MetaCheck::Validate,
        _ => MetaCheck::Skip,
    }
}

/// Checks the meta reveal attached to a proof of `asset`.
pub fn verify_meta_reveal(asset: &Asset, reveal: Option<&MetaReveal>) -> Result<(), Error> {
    let check = classify(
        reveal.is_some(),
        asset.genesis.has_meta_hash(),
        asset.has_genesis_witness(),
    );
    match (check, reveal) {
        (MetaCheck::Reject(err), _) => Err(err),
        (MetaCheck::Validate, Some(reveal)) => validate_meta(reveal, &asset.genesis.meta_hash),
        _ => Ok(()),
    }
}

/// Requires the reveal to hash to `declared`.
pub fn validate_meta(reveal: &MetaReveal, declared: &[u8; 32]) -> Result<(), Error> {
    let revealed = meta_hash(reveal);
    if revealed != *declared {
        return Err(Error::MetaRevealMismatch {
            revealed,
            declared: *declared,
        });
    }
    Ok(())
}

/// Returns the hash a genesis commits to for this reveal.
pub fn meta_hash(reveal: &MetaReveal) -> [u8; 32] {
    meta_hash_with_hasher(reveal, &BitcoinSha256Hasher)
}

/// Returns the meta hash using the supplied hasher.
pub fn meta_hash_with_hasher<H: Sha256Hasher>(reveal: &MetaReveal, hasher: &H) -> [u8; 32] {
    hasher.hash(&encode_meta_reveal(reveal))
}

/// Encodes a meta reveal as a TLV byte stream.
fn encode_meta_reveal(meta: &MetaReveal) -> Vec<u8> {
    let mut tlv = TlvWriter::new();
    tlv.record(META_REVEAL_ENCODING_TYPE, &[meta.meta_type as u8])
        .record(META_REVEAL_DATA_TYPE, &meta.data);
    for (tlv_type, value) in &meta.unknown_odd_types {
        tlv.record(*tlv_type, value);
    }
    tlv.into_bytes()
}
