//! Taproot proof verification helpers.
//!
//! A [`TaprootProof`] is turned into the set of taproot output keys it could
//! commit to, which are then compared against the anchor output key.

use alloc::vec::Vec;

use bitcoin::hashes::{Hash, HashEngine, sha256::Hash as Sha256Hash};
use bitcoin::secp256k1::PublicKey as SecpPublicKey;
use bitcoin::taproot::{LeafVersion, TapNodeHash};
use bitcoin::{Script, ScriptBuf, Transaction};
use serde::{Deserialize, Serialize};
use taproot_assets_types::asset::{Asset, SerializedKey};
use taproot_assets_types::commitment::{
    TapCommitmentVersion, TapscriptPreimage, TapscriptPreimageType,
};
use taproot_assets_types::mssmt::MssmtNode;
use taproot_assets_types::proof::{CommitmentProof, TaprootProof, TaprootProofKind, TapscriptProof};
use thiserror::Error;

use crate::verify::encoding::{asset_commitment_leaf, asset_leaf};
use crate::verify::mssmt;
use crate::{OpsError, TaprootOps};

/// Errors returned by taproot proof verification.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The proof points past the outputs of the anchor transaction.
    #[error("invalid taproot output index {output_index} for {output_count} outputs")]
    InvalidTaprootOutputIndex {
        /// Index requested in the anchor transaction outputs.
        output_index: u32,
        /// Total number of outputs in the anchor transaction.
        output_count: usize,
    },
    /// The anchor output is not a segwit v1 output.
    #[error("script pubkey is not a Taproot v1 witness program")]
    InvalidTaprootWitnessProgram,
    /// A commitment proof lacks the asset proof needed to place the asset
    /// in its asset commitment.
    #[error("missing asset proof")]
    MissingAssetProof,
    /// A tapscript proof can only show that an output holds no commitment.
    #[error("tapscript proof cannot prove asset inclusion")]
    TapscriptInclusionProof,
    /// A tapscript proof has no preimages and is not flagged BIP-86.
    #[error("invalid tapscript proof")]
    InvalidTapscriptProof,
    /// None of the derived keys is the anchor output key.
    #[error("invalid taproot proof")]
    InvalidTaprootProof,
    /// A tapscript preimage holds no bytes.
    #[error("empty tapscript preimage")]
    EmptyTapscriptPreimage,
    /// A branch preimage is not exactly two node hashes long.
    #[error("invalid tapscript preimage length {actual}, expected {expected}")]
    InvalidTapscriptPreimageLength {
        /// Length a branch preimage must have.
        expected: usize,
        /// Length of the preimage given.
        actual: usize,
    },
    /// A leaf preimage is not a tapscript leaf.
    #[error("invalid tapleaf script version")]
    InvalidTapLeafScriptVersion,
    /// A leaf preimage script is out of bounds or disagrees with its length
    /// prefix.
    #[error("invalid tapleaf script length")]
    InvalidTapLeafScriptLength,
    /// A sibling preimage hides a second Taproot Asset commitment.
    #[error("tapscript preimage is a taproot asset commitment")]
    TapscriptPreimageIsTapCommitment,
    /// The asset script key is not a valid public key.
    #[error("invalid asset script key")]
    InvalidAssetScriptKey,
    /// The asset group key is not a valid public key.
    #[error("invalid asset group key")]
    InvalidAssetGroupKey,
    /// Walking an MS-SMT proof failed.
    #[error(transparent)]
    Mssmt(#[from] mssmt::Error),
    /// The taproot backend rejected a key or tweak.
    #[error(transparent)]
    Ops(#[from] OpsError),
}

/// Length in bytes of a Taproot Asset commitment leaf script.
const TAPROOT_ASSET_COMMITMENT_SCRIPT_SIZE: usize = 1 + 32 + 32 + 8;
/// Marker tag for legacy Taproot Asset commitment leaves.
const TAPROOT_ASSETS_MARKER_TAG: &str = "taproot-assets";
/// Marker tag for V2 Taproot Asset commitment leaves.
const TAPROOT_ASSETS_V2_TAG: &str = "taproot-assets:194243";
/// Length in bytes of a TapBranch preimage without tag.
const TAP_BRANCH_PREIMAGE_LEN: usize = 64;
/// Maximum tapscript size accepted for leaf preimages.
const MAX_TAPLEAF_SCRIPT_SIZE: usize = 4_000_000;

/// Minimal TapCommitment representation derived during verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapCommitment {
    /// Taproot Asset commitment version.
    pub version: TapCommitmentVersion,
    /// Root hash of the TapCommitment MS-SMT.
    pub root_hash: [u8; 32],
    /// Root sum of the TapCommitment MS-SMT.
    pub root_sum: u64,
}

impl TapCommitment {
    /// Returns the tapscript leaf script for this commitment.
    pub fn tap_leaf_script(&self) -> Vec<u8> {
        let mut script = Vec::with_capacity(TAPROOT_ASSET_COMMITMENT_SCRIPT_SIZE);
        match self.version {
            TapCommitmentVersion::V0 | TapCommitmentVersion::V1 => {
                script.push(self.version as u8);
                script.extend_from_slice(&taproot_assets_marker());
                script.extend_from_slice(&self.root_hash);
                script.extend_from_slice(&self.root_sum.to_be_bytes());
            }
            TapCommitmentVersion::V2 => {
                script.extend_from_slice(&taproot_assets_v2_tag());
                script.push(self.version as u8);
                script.extend_from_slice(&self.root_hash);
                script.extend_from_slice(&self.root_sum.to_be_bytes());
            }
        }

        script
    }

    /// Returns the TapNodeHash for this commitment leaf.
    pub fn tap_leaf_hash(&self) -> TapNodeHash {
        let script = ScriptBuf::from_bytes(self.tap_leaf_script());
        TapNodeHash::from_script(script.as_script(), LeafVersion::TapScript)
    }

    /// Returns the tapscript root for this commitment and optional sibling.
    pub fn tapscript_root(
        &self,
        sibling: Option<&TapscriptPreimage>,
    ) -> Result<TapNodeHash, Error> {
        let commitment_hash = self.tap_leaf_hash();
        Ok(match sibling {
            Some(preimage) => {
                TapNodeHash::from_node_hashes(commitment_hash, tapscript_preimage_hash(preimage)?)
            }
            None => commitment_hash,
        })
    }

    /// Returns the V0 commitment with the same root.
    fn downgrade(&self) -> TapCommitment {
        TapCommitment {
            version: TapCommitmentVersion::V0,
            root_hash: self.root_hash,
            root_sum: self.root_sum,
        }
    }
}

/// A candidate output key together with the commitment it was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedKey {
    /// The derived taproot output key.
    pub output_key: SerializedKey,
    /// The commitment behind the key. `None` for tapscript proofs.
    pub commitment: Option<TapCommitment>,
}

/// The way a taproot proof is turned into output keys.
enum Derivation<'a> {
    /// The asset is present in the commitment.
    Inclusion(&'a CommitmentProof),
    /// The output has a commitment that does not contain the asset.
    CommitmentExclusion(&'a CommitmentProof),
    /// The output has no commitment at all.
    TapscriptExclusion(&'a TapscriptProof),
}

impl<'a> Derivation<'a> {
    fn select(proof: &'a TaprootProof, inclusion: bool) -> Result<Self, Error> {
        match (&proof.kind, inclusion) {
            (TaprootProofKind::Commitment(commitment), true) => Ok(Self::Inclusion(commitment)),
            (TaprootProofKind::Commitment(commitment), false) => {
                Ok(Self::CommitmentExclusion(commitment))
            }
            (TaprootProofKind::Tapscript(_), true) => Err(Error::TapscriptInclusionProof),
            (TaprootProofKind::Tapscript(tapscript), false) => {
                Ok(Self::TapscriptExclusion(tapscript))
            }
        }
    }
}

/// Extracts the taproot output key from an anchor transaction output.
pub fn extract_taproot_key(anchor_tx: &Transaction, output_index: u32) -> Result<[u8; 32], Error> {
    let output_count = anchor_tx.output.len();
    let output =
        anchor_tx
            .output
            .get(output_index as usize)
            .ok_or(Error::InvalidTaprootOutputIndex {
                output_index,
                output_count,
            })?;

    extract_taproot_key_from_script(output.script_pubkey.as_script())
}

/// Extracts the x-only taproot output key from a script pubkey.
pub fn extract_taproot_key_from_script(script: &Script) -> Result<[u8; 32], Error> {
    if !script.is_p2tr() {
        return Err(Error::InvalidTaprootWitnessProgram);
    }

    let mut key_bytes = [0u8; 32];
    key_bytes.copy_from_slice(&script.as_bytes()[2..34]);
    Ok(key_bytes)
}

/// Derives every output key the proof could commit to.
///
/// Commitment proofs yield the key for the declared commitment version first
/// and the key for the V0 downgrade second. Tapscript proofs yield a single
/// key with no commitment.
pub fn derive_output_keys<O: TaprootOps>(
    ops: &O,
    proof: &TaprootProof,
    asset: &Asset,
    inclusion: bool,
) -> Result<Vec<DerivedKey>, Error> {
    let internal_key = &proof.internal_key;
    match Derivation::select(proof, inclusion)? {
        Derivation::Inclusion(commitment_proof) => {
            let asset = asset.without_split_commitment();
            let tap_commitment = commitment_through_asset_tree(
                commitment_proof,
                asset_commitment_key(&asset)?,
                asset_leaf(&asset)?,
            )?;
            derive_commitment_keys(ops, &tap_commitment, internal_key, commitment_proof)
        }
        Derivation::CommitmentExclusion(commitment_proof) => {
            // The asset's slot is empty: in its asset tree when the group
            // has a commitment here, in the tap tree otherwise.
            let empty = mssmt::leaf_node(&[], 0);
            let tap_commitment = match commitment_proof.proof.asset_proof {
                Some(_) => commitment_through_asset_tree(
                    commitment_proof,
                    asset_commitment_key(asset)?,
                    empty,
                )?,
                None => tap_commitment_from(commitment_proof, tap_commitment_key(asset)?, empty)?,
            };
            derive_commitment_keys(ops, &tap_commitment, internal_key, commitment_proof)
        }
        Derivation::TapscriptExclusion(tapscript_proof) => {
            let output_key = derive_taproot_key_from_tapscript(ops, internal_key, tapscript_proof)?;
            Ok(alloc::vec![DerivedKey {
                output_key,
                commitment: None,
            }])
        }
    }
}

/// Derives the proof's candidate keys and matches them against the anchor
/// output it points at. Returns the matched commitment, if any.
pub fn derive_and_compare<O: TaprootOps>(
    ops: &O,
    anchor_tx: &Transaction,
    proof: &TaprootProof,
    asset: &Asset,
    inclusion: bool,
) -> Result<Option<TapCommitment>, Error> {
    let expected = extract_taproot_key(anchor_tx, proof.output_index)?;
    derive_output_keys(ops, proof, asset, inclusion)?
        .into_iter()
        .find(|derived| derived.output_key.x_only() == expected)
        .map(|derived| derived.commitment)
        .ok_or(Error::InvalidTaprootProof)
}

/// Derives the declared and downgraded keys for a TapCommitment.
fn derive_commitment_keys<O: TaprootOps>(
    ops: &O,
    commitment: &TapCommitment,
    internal_key: &SerializedKey,
    commitment_proof: &CommitmentProof,
) -> Result<Vec<DerivedKey>, Error> {
    let sibling = commitment_proof.tap_sibling_preimage.as_ref();
    let mut keys = Vec::with_capacity(2);
    for candidate in [commitment.clone(), commitment.downgrade()] {
        let output_key = derive_taproot_key_from_commitment(ops, &candidate, internal_key, sibling)?;
        keys.push(DerivedKey {
            output_key,
            commitment: Some(candidate),
        });
    }
    Ok(keys)
}

/// Derives a taproot output key from a commitment and sibling preimage.
pub fn derive_taproot_key_from_commitment<O: TaprootOps>(
    ops: &O,
    commitment: &TapCommitment,
    internal_key: &SerializedKey,
    sibling: Option<&TapscriptPreimage>,
) -> Result<SerializedKey, Error> {
    let internal_pubkey = ops.parse_internal_key(internal_key)?;
    let tapscript_root = commitment.tapscript_root(sibling)?;
    let output_key =
        ops.taproot_output_key(&internal_pubkey, Some(tapscript_root.to_byte_array()))?;
    Ok(output_key)
}

/// Derives a taproot output key from a tapscript proof.
fn derive_taproot_key_from_tapscript<O: TaprootOps>(
    ops: &O,
    internal_key: &SerializedKey,
    proof: &TapscriptProof,
) -> Result<SerializedKey, Error> {
    use TapscriptPreimageType::{BranchPreimage, LeafPreimage};

    let internal_pubkey = ops.parse_internal_key(internal_key)?;
    let non_empty =
        |p: &Option<TapscriptPreimage>| p.clone().filter(|p| !p.sibling_preimage.is_empty());

    let tapscript_root = match (non_empty(&proof.tap_preimage1), non_empty(&proof.tap_preimage2)) {
        (Some(left), Some(right))
            if !(left.sibling_type == BranchPreimage && right.sibling_type == LeafPreimage) =>
        {
            let left = tapscript_preimage_hash(&left)?;
            let right = tapscript_preimage_hash(&right)?;
            Some(TapNodeHash::from_node_hashes(left, right).to_byte_array())
        }
        (Some(leaf), None) if leaf.sibling_type == LeafPreimage => {
            Some(tapscript_preimage_hash(&leaf)?.to_byte_array())
        }
        _ if proof.bip86 => None,
        _ => return Err(Error::InvalidTapscriptProof),
    };

    let output_key = ops.taproot_output_key(&internal_pubkey, tapscript_root)?;
    Ok(output_key)
}

/// Computes the tap hash for a tapscript preimage.
pub fn tapscript_preimage_hash(preimage: &TapscriptPreimage) -> Result<TapNodeHash, Error> {
    if preimage.sibling_preimage.is_empty() {
        return Err(Error::EmptyTapscriptPreimage);
    }

    match preimage.sibling_type {
        TapscriptPreimageType::LeafPreimage => {
            let (leaf_version, script) = decode_tapleaf_preimage(&preimage.sibling_preimage)?;
            if is_taproot_asset_commitment_script(&script) {
                return Err(Error::TapscriptPreimageIsTapCommitment);
            }
            let script = ScriptBuf::from_bytes(script);
            Ok(TapNodeHash::from_script(script.as_script(), leaf_version))
        }
        TapscriptPreimageType::BranchPreimage => {
            let actual = preimage.sibling_preimage.len();
            if actual != TAP_BRANCH_PREIMAGE_LEN {
                return Err(Error::InvalidTapscriptPreimageLength {
                    expected: TAP_BRANCH_PREIMAGE_LEN,
                    actual,
                });
            }

            let mut left = [0u8; 32];
            left.copy_from_slice(&preimage.sibling_preimage[..32]);
            let mut right = [0u8; 32];
            right.copy_from_slice(&preimage.sibling_preimage[32..]);

            Ok(TapNodeHash::from_node_hashes(
                TapNodeHash::from_byte_array(left),
                TapNodeHash::from_byte_array(right),
            ))
        }
    }
}

/// Decodes a tapleaf preimage into a leaf version and script.
fn decode_tapleaf_preimage(preimage: &[u8]) -> Result<(LeafVersion, Vec<u8>), Error> {
    if preimage.len() < 2 {
        return Err(Error::InvalidTapLeafScriptLength);
    }

    let leaf_version =
        LeafVersion::from_consensus(preimage[0]).map_err(|_| Error::InvalidTapLeafScriptVersion)?;
    if leaf_version != LeafVersion::TapScript {
        return Err(Error::InvalidTapLeafScriptVersion);
    }
    let (script_len, len_len) = decode_compact_size(&preimage[1..])?;
    let script_start = 1 + len_len;
    let script_len = usize::try_from(script_len).map_err(|_| Error::InvalidTapLeafScriptLength)?;
    let script_end = script_start
        .checked_add(script_len)
        .ok_or(Error::InvalidTapLeafScriptLength)?;
    if script_end != preimage.len() {
        return Err(Error::InvalidTapLeafScriptLength);
    }

    let script = preimage[script_start..script_end].to_vec();
    if script.is_empty() || script.len() >= MAX_TAPLEAF_SCRIPT_SIZE {
        return Err(Error::InvalidTapLeafScriptLength);
    }

    Ok((leaf_version, script))
}

/// Decodes a Bitcoin compact size integer from a byte slice.
fn decode_compact_size(bytes: &[u8]) -> Result<(u64, usize), Error> {
    let first = *bytes.first().ok_or(Error::InvalidTapLeafScriptLength)?;
    let width = match first {
        0..=0xFC => return Ok((first as u64, 1)),
        0xFD => 2,
        0xFE => 4,
        0xFF => 8,
    };

    let payload = bytes
        .get(1..1 + width)
        .ok_or(Error::InvalidTapLeafScriptLength)?;
    let mut le = [0u8; 8];
    le[..width].copy_from_slice(payload);
    Ok((u64::from_le_bytes(le), 1 + width))
}

/// Returns true if the script matches the Taproot Asset commitment pattern.
fn is_taproot_asset_commitment_script(script: &[u8]) -> bool {
    if script.len() != TAPROOT_ASSET_COMMITMENT_SCRIPT_SIZE {
        return false;
    }

    match script[0] {
        v if v == TapCommitmentVersion::V0 as u8 || v == TapCommitmentVersion::V1 as u8 => {
            script[1..33] == taproot_assets_marker()
        }
        _ => script[..32] == taproot_assets_v2_tag(),
    }
}

/// Returns the Taproot Asset marker for V0 and V1 commitments.
fn taproot_assets_marker() -> [u8; 32] {
    Sha256Hash::hash(TAPROOT_ASSETS_MARKER_TAG.as_bytes()).to_byte_array()
}

/// Returns the Taproot Asset marker for V2 commitments.
fn taproot_assets_v2_tag() -> [u8; 32] {
    Sha256Hash::hash(TAPROOT_ASSETS_V2_TAG.as_bytes()).to_byte_array()
}

/// Recomputes the tap commitment a commitment proof ends in, starting from
/// `leaf` at `asset_key` in the asset tree.
fn commitment_through_asset_tree(
    commitment_proof: &CommitmentProof,
    asset_key: [u8; 32],
    leaf: MssmtNode,
) -> Result<TapCommitment, Error> {
    let asset_proof = commitment_proof
        .proof
        .asset_proof
        .as_ref()
        .ok_or(Error::MissingAssetProof)?;
    let asset_root = mssmt::root_from_proof(asset_key, leaf, &asset_proof.proof)?;
    let commitment_leaf =
        asset_commitment_leaf(asset_proof.tap_key, asset_proof.version, &asset_root);
    tap_commitment_from(commitment_proof, asset_proof.tap_key, commitment_leaf)
}

/// Recomputes the tap commitment from `leaf` at `tap_key` in the tap tree.
fn tap_commitment_from(
    commitment_proof: &CommitmentProof,
    tap_key: [u8; 32],
    leaf: MssmtNode,
) -> Result<TapCommitment, Error> {
    let tap_proof = &commitment_proof.proof.taproot_asset_proof;
    let root = mssmt::root_from_proof(tap_key, leaf, &tap_proof.proof)?;
    Ok(TapCommitment {
        version: tap_proof.version,
        root_hash: root.root_hash,
        root_sum: root.root_sum,
    })
}

/// Computes the taproot asset commitment key for an asset.
pub fn tap_commitment_key(asset: &Asset) -> Result<[u8; 32], Error> {
    match &asset.group_key {
        Some(group) => {
            let pubkey = SecpPublicKey::from_slice(&group.group_pub_key.bytes)
                .map_err(|_| Error::InvalidAssetGroupKey)?;
            let (xonly, _) = pubkey.x_only_public_key();
            Ok(Sha256Hash::hash(&xonly.serialize()).to_byte_array())
        }
        None => Ok(asset.genesis.id().to_byte_array()),
    }
}

/// Computes the asset commitment key for an asset.
pub fn asset_commitment_key(asset: &Asset) -> Result<[u8; 32], Error> {
    let script_key = SecpPublicKey::from_slice(&asset.script_key.bytes)
        .map_err(|_| Error::InvalidAssetScriptKey)?;
    let (xonly, _) = script_key.x_only_public_key();

    if asset.group_key.is_none() {
        return Ok(Sha256Hash::hash(&xonly.serialize()).to_byte_array());
    }

    let mut engine = Sha256Hash::engine();
    engine.input(asset.genesis.id().as_byte_array());
    engine.input(&xonly.serialize());
    Ok(Sha256Hash::from_engine(engine).to_byte_array())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v2_leaf_script_is_tagged() {
        let commitment = TapCommitment {
            version: TapCommitmentVersion::V2,
            root_hash: [7; 32],
            root_sum: 10,
        };
        let script = commitment.tap_leaf_script();
        assert_eq!(script.len(), TAPROOT_ASSET_COMMITMENT_SCRIPT_SIZE);
        assert_eq!(script[..32], taproot_assets_v2_tag());
        assert_eq!(script[32], 2);
        assert!(is_taproot_asset_commitment_script(&script));

        let legacy = commitment.downgrade().tap_leaf_script();
        assert_eq!(legacy[0], 0);
        assert_eq!(legacy[1..33], taproot_assets_marker());
        assert!(is_taproot_asset_commitment_script(&legacy));
    }

    #[test]
    fn commitment_leaf_cannot_be_a_sibling() {
        let commitment = TapCommitment {
            version: TapCommitmentVersion::V1,
            root_hash: [1; 32],
            root_sum: 1,
        };
        let script = commitment.tap_leaf_script();
        let mut preimage = alloc::vec![LeafVersion::TapScript.to_consensus(), script.len() as u8];
        preimage.extend_from_slice(&script);

        let sibling = TapscriptPreimage {
            sibling_preimage: preimage,
            sibling_type: TapscriptPreimageType::LeafPreimage,
        };
        assert_eq!(
            tapscript_preimage_hash(&sibling),
            Err(Error::TapscriptPreimageIsTapCommitment)
        );
    }

    #[test]
    fn branch_preimage_length_is_checked() {
        let sibling = TapscriptPreimage {
            sibling_preimage: alloc::vec![0u8; 63],
            sibling_type: TapscriptPreimageType::BranchPreimage,
        };
        assert_eq!(
            tapscript_preimage_hash(&sibling),
            Err(Error::InvalidTapscriptPreimageLength {
                expected: 64,
                actual: 63,
            })
        );
    }

    #[test]
    fn compact_size_widths() {
        assert_eq!(decode_compact_size(&[0x10]), Ok((0x10, 1)));
        assert_eq!(decode_compact_size(&[0xFD, 0x34, 0x12]), Ok((0x1234, 3)));
        assert_eq!(
            decode_compact_size(&[0xFE, 0x01, 0x00]),
            Err(Error::InvalidTapLeafScriptLength)
        );
    }
}
