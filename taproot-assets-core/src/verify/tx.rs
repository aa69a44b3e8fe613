//! Anchor transaction verification helpers.

use alloc::string::String;
use alloc::vec::Vec;

use bitcoin::block::Header;
use bitcoin::hashes::{Hash, sha256d::Hash as Sha256dHash};
use bitcoin::{OutPoint, Transaction, TxMerkleNode};
use taproot_assets_types::proof::{Proof, TxMerkleProof};
use thiserror::Error;

/// Errors returned by anchor transaction verification helpers.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The proof does not continue from the outpoint the previous proof
    /// anchored its asset at.
    #[error("prev out {actual} does not match previous anchor {expected}")]
    PrevOutMismatch {
        /// Outpoint the previous proof anchored its asset at.
        expected: OutPoint,
        /// Outpoint this proof claims to spend.
        actual: OutPoint,
    },
    /// The anchor transaction does not spend the claimed previous outpoint.
    #[error("anchor tx missing prev out {prev_out}")]
    AnchorTxMissingPrevOut {
        /// The outpoint the proof claims is spent.
        prev_out: OutPoint,
    },
    /// The merkle proof node and bit counts do not match.
    #[error("merkle proof shape mismatch: nodes={nodes}, bits={bits}")]
    InvalidMerkleProofShape {
        /// Number of merkle proof nodes.
        nodes: usize,
        /// Number of merkle proof bits.
        bits: usize,
    },
    /// The merkle proof does not match the expected root.
    #[error("invalid transaction merkle proof")]
    InvalidTxMerkleProof,
}

/// Errors a [`HeaderVerifier`] reports.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeaderError {
    /// The header is not part of the chain known to the verifier.
    #[error("unknown block header")]
    UnknownHeader,
    /// The verifier could not answer, e.g. because its backend is down.
    #[error("header backend failure: {0}")]
    Backend(String),
}

/// Trait for hashing Merkle node pairs.
pub trait MerkleHasher {
    /// Hashes a left/right node pair into its parent.
    fn hash_nodes(&self, left: [u8; 32], right: [u8; 32]) -> [u8; 32];
}

/// Bitcoin merkle hasher using double-SHA-256.
#[derive(Debug, Clone, Copy, Default)]
pub struct BitcoinMerkleHasher;

impl MerkleHasher for BitcoinMerkleHasher {
    /// Hashes a node pair with double-SHA-256.
    fn hash_nodes(&self, left: [u8; 32], right: [u8; 32]) -> [u8; 32] {
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(&left);
        buf[32..].copy_from_slice(&right);
        Sha256dHash::hash(&buf).to_byte_array()
    }
}

/// Trait for verifying a block header at a given height.
pub trait HeaderVerifier {
    /// Checks that the header is part of the chain at the provided height.
    fn verify_header(&self, header: &Header, height: u32) -> Result<(), HeaderError>;
}

impl<F> HeaderVerifier for F
where
    F: Fn(&Header, u32) -> Result<(), HeaderError>,
{
    fn verify_header(&self, header: &Header, height: u32) -> Result<(), HeaderError> {
        self(header, height)
    }
}

/// Checks that a proof continues from where the previous proof left its
/// asset. The first proof of a chain has nothing to link to.
pub fn verify_prev_out_linkage(prev_anchor: Option<&OutPoint>, proof: &Proof) -> Result<(), Error> {
    match prev_anchor {
        Some(expected) if *expected != proof.prev_out => Err(Error::PrevOutMismatch {
            expected: *expected,
            actual: proof.prev_out,
        }),
        _ => Ok(()),
    }
}

/// Checks that the anchor transaction spends the proof's previous outpoint.
pub fn verify_anchor_spend(proof: &Proof) -> Result<(), Error> {
    if !tx_spends_prev_out(&proof.anchor_tx, &proof.prev_out) {
        return Err(Error::AnchorTxMissingPrevOut {
            prev_out: proof.prev_out,
        });
    }
    Ok(())
}

/// Verifies a merkle proof for the given transaction and merkle root.
pub fn verify_tx_merkle_proof(
    tx: &Transaction,
    proof: &TxMerkleProof,
    merkle_root: TxMerkleNode,
) -> Result<(), Error> {
    let nodes: Vec<[u8; 32]> = proof
        .nodes
        .iter()
        .map(|node| node.to_byte_array())
        .collect();
    verify_tx_merkle_proof_with_hasher(
        tx.compute_txid().to_byte_array(),
        &nodes,
        &proof.bits,
        merkle_root.to_byte_array(),
        &BitcoinMerkleHasher,
    )
}

/// Verifies a merkle proof using a caller-provided node hasher.
pub fn verify_tx_merkle_proof_with_hasher<H: MerkleHasher>(
    txid: [u8; 32],
    nodes: &[[u8; 32]],
    bits: &[bool],
    merkle_root: [u8; 32],
    hasher: &H,
) -> Result<(), Error> {
    if nodes.len() != bits.len() {
        return Err(Error::InvalidMerkleProofShape {
            nodes: nodes.len(),
            bits: bits.len(),
        });
    }

    let mut current = txid;
    for (node, is_right) in nodes.iter().zip(bits.iter()) {
        let (left, right) = if *is_right {
            (current, *node)
        } else {
            (*node, current)
        };
        current = hasher.hash_nodes(left, right);
    }

    if current == merkle_root {
        Ok(())
    } else {
        Err(Error::InvalidTxMerkleProof)
    }
}

/// Returns the position of the proven transaction within its block.
///
/// A `false` bit puts the proven branch on the right, so it sets the
/// matching bit of the index.
pub fn tx_index(proof: &TxMerkleProof) -> u32 {
    proof
        .bits
        .iter()
        .take(32)
        .enumerate()
        .filter(|(_, is_right)| !**is_right)
        .fold(0, |index, (depth, _)| index | (1 << depth))
}

/// Returns true if the transaction spends the specified outpoint.
pub fn tx_spends_prev_out(tx: &Transaction, prev_out: &OutPoint) -> bool {
    tx.input
        .iter()
        .any(|input| input.previous_output == *prev_out)
}
