use alloc::vec::Vec;
use bitcoin::hashes::{Hash, sha256::Hash as Sha256Hash};
use serde::{Deserialize, Serialize};

/// Number of levels in an MS-SMT.
pub const MSSMT_TREE_LEVELS: usize = 256;

/// Represents a node in an MS-SMT (Merkle Sum Sparse Merkle Tree).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MssmtNode {
    /// The hash of the node.
    pub hash: Sha256Hash,
    /// The sum of the node.
    pub sum: u64,
}

impl MssmtNode {
    /// The zero placeholder standing in for an empty subtree in a proof.
    pub fn zero() -> Self {
        MssmtNode {
            hash: Sha256Hash::all_zeros(),
            sum: 0,
        }
    }

    /// Returns true if the node is the zero placeholder.
    pub fn is_zero(&self) -> bool {
        self.hash == Sha256Hash::all_zeros() && self.sum == 0
    }
}

/// Represents a merkle proof for a MS-SMT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MssmtProof {
    /// Siblings that should be hashed with the leaf and its parents to arrive
    /// at the root, ordered from the leaf level up.
    pub nodes: Vec<MssmtNode>,
}

impl MssmtProof {
    /// A proof whose siblings are all empty subtrees.
    pub fn empty() -> Self {
        let mut nodes = Vec::with_capacity(MSSMT_TREE_LEVELS);
        nodes.resize_with(MSSMT_TREE_LEVELS, MssmtNode::zero);
        MssmtProof { nodes }
    }
}
