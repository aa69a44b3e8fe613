use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::asset::AssetVersion;
use crate::mssmt::MssmtProof;

/// Denotes the structure of the Taproot Asset commitment MS-SMT and the procedure
/// for building a TapLeaf from a Taproot Asset commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TapCommitmentVersion {
    /// Initial Taproot Asset Commitment version. Uses legacy TapLeaf format, ONLY commits to V0 assets.
    V0 = 0,
    /// Used by Taproot Asset Commitments that commit to V0 or V1 assets. Uses legacy TapLeaf format.
    V1 = 1,
    /// Used by Taproot Asset Commitments that commit to V0 or V1 assets. Uses V1 TapLeaf format.
    V2 = 2,
}

impl TapCommitmentVersion {
    /// Returns true if two versions may appear side by side in one anchor
    /// transaction.
    pub fn is_similar(self, other: TapCommitmentVersion) -> bool {
        match self {
            TapCommitmentVersion::V2 => other == TapCommitmentVersion::V2,
            TapCommitmentVersion::V0 | TapCommitmentVersion::V1 => {
                matches!(other, TapCommitmentVersion::V0 | TapCommitmentVersion::V1)
            }
        }
    }
}

/// Type of tapscript sibling preimage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TapscriptPreimageType {
    /// Pre-image that's a leaf script.
    LeafPreimage = 0,
    /// Pre-image that's a branch (64-bytes of two child pre-images).
    BranchPreimage = 1,
}

/// Wraps a pre-image byte slice with a type byte that self identifies what type of pre-image it is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapscriptPreimage {
    /// The pre-image itself. This will be 64 bytes if representing a TapBranch,
    /// or any size under 4 MBytes if representing a TapLeaf.
    pub sibling_preimage: Vec<u8>,
    /// The type of the pre-image.
    pub sibling_type: TapscriptPreimageType,
}

/// Proof of an asset's location within its asset commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetProof {
    /// Path from the asset leaf to the asset commitment root.
    pub proof: MssmtProof,
    /// Version of the asset commitment.
    pub version: AssetVersion,
    /// Key of the asset commitment within the TapCommitment tree.
    pub tap_key: [u8; 32],
}

/// Proof of an asset commitment's location within the TapCommitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaprootAssetProof {
    /// Path from the asset commitment leaf to the TapCommitment root.
    pub proof: MssmtProof,
    /// Version of the TapCommitment.
    pub version: TapCommitmentVersion,
}

/// Two-level merkle proof from an asset leaf to the TapCommitment root.
///
/// Without an asset proof the TapCommitment holds no asset commitment for the
/// asset's tap key at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// Proof of the asset within its asset commitment, if one exists.
    pub asset_proof: Option<AssetProof>,
    /// Proof of the asset commitment within the TapCommitment.
    pub taproot_asset_proof: TaprootAssetProof,
}
