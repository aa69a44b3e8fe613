//! MS-SMT hashing and proof walking.

use alloc::vec::Vec;

use bitcoin::hashes::{Hash, HashEngine, sha256::Hash as Sha256Hash};
use taproot_assets_types::mssmt::{MSSMT_TREE_LEVELS, MssmtNode, MssmtProof};
use thiserror::Error;

/// Errors returned while walking an MS-SMT proof.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// MS-SMT proof length is invalid.
    #[error("invalid mssmt proof length {actual}, expected {expected}")]
    InvalidProofLength {
        /// Expected proof length.
        expected: usize,
        /// Actual proof length.
        actual: usize,
    },
    /// MS-SMT sum overflowed while hashing.
    #[error("mssmt sum overflow")]
    SumOverflow,
}

/// MS-SMT root data along with its immediate children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MssmtRoot {
    /// Root hash of the MS-SMT.
    pub root_hash: [u8; 32],
    /// Root sum of the MS-SMT.
    pub root_sum: u64,
    /// Root left child hash.
    pub left_hash: [u8; 32],
    /// Root right child hash.
    pub right_hash: [u8; 32],
}

/// Builds an MS-SMT leaf from bytes and a sum.
pub fn leaf_node(value: &[u8], sum: u64) -> MssmtNode {
    let mut engine = Sha256Hash::engine();
    engine.input(value);
    engine.input(&sum.to_be_bytes());
    MssmtNode {
        hash: Sha256Hash::from_engine(engine),
        sum,
    }
}

/// Builds an MS-SMT branch from two child nodes.
pub fn branch_node(left: &MssmtNode, right: &MssmtNode) -> Result<MssmtNode, Error> {
    let sum = left.sum.checked_add(right.sum).ok_or(Error::SumOverflow)?;

    let mut engine = Sha256Hash::engine();
    engine.input(left.hash.as_byte_array());
    engine.input(right.hash.as_byte_array());
    engine.input(&sum.to_be_bytes());
    Ok(MssmtNode {
        hash: Sha256Hash::from_engine(engine),
        sum,
    })
}

/// Returns the empty MS-SMT nodes indexed by depth, root first and the empty
/// leaf last.
pub fn empty_nodes() -> Vec<MssmtNode> {
    let mut nodes = Vec::with_capacity(MSSMT_TREE_LEVELS + 1);
    nodes.resize_with(MSSMT_TREE_LEVELS + 1, MssmtNode::zero);

    nodes[MSSMT_TREE_LEVELS] = leaf_node(&[], 0);
    for depth in (0..MSSMT_TREE_LEVELS).rev() {
        let child = &nodes[depth + 1];
        let mut engine = Sha256Hash::engine();
        engine.input(child.hash.as_byte_array());
        engine.input(child.hash.as_byte_array());
        engine.input(&0u64.to_be_bytes());
        nodes[depth] = MssmtNode {
            hash: Sha256Hash::from_engine(engine),
            sum: 0,
        };
    }

    nodes
}

/// Returns the bit of `key` that picks the branch taken below `depth`.
pub fn bit_index(depth: usize, key: &[u8; 32]) -> u8 {
    (key[depth / 8] >> (depth % 8)) & 1
}

/// Computes the MS-SMT root for a leaf at `key` and its proof.
pub fn root_from_proof(
    key: [u8; 32],
    leaf: MssmtNode,
    proof: &MssmtProof,
) -> Result<MssmtRoot, Error> {
    let nodes = normalize_nodes(&proof.nodes)?;
    let mut current = leaf;
    let mut root_left = [0u8; 32];
    let mut root_right = [0u8; 32];

    for depth in (0..MSSMT_TREE_LEVELS).rev() {
        let sibling = &nodes[MSSMT_TREE_LEVELS - 1 - depth];
        let (left, right) = if bit_index(depth, &key) == 0 {
            (&current, sibling)
        } else {
            (sibling, &current)
        };

        if depth == 0 {
            root_left = left.hash.to_byte_array();
            root_right = right.hash.to_byte_array();
        }

        current = branch_node(left, right)?;
    }

    Ok(MssmtRoot {
        root_hash: current.hash.to_byte_array(),
        root_sum: current.sum,
        left_hash: root_left,
        right_hash: root_right,
    })
}

/// Normalizes MS-SMT proof nodes, expanding zero placeholders into the empty
/// subtree of matching height.
pub(crate) fn normalize_nodes(nodes: &[MssmtNode]) -> Result<Vec<MssmtNode>, Error> {
    if nodes.len() != MSSMT_TREE_LEVELS {
        return Err(Error::InvalidProofLength {
            expected: MSSMT_TREE_LEVELS,
            actual: nodes.len(),
        });
    }

    let empty = empty_nodes();
    Ok(nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| {
            if node.is_zero() {
                empty[MSSMT_TREE_LEVELS - idx].clone()
            } else {
                node.clone()
            }
        })
        .collect())
}
