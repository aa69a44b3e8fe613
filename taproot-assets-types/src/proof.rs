// --- Proof structures ---

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use bitcoin::block::Header;
use bitcoin::{OutPoint, Transaction, TxMerkleNode, Witness};
use serde::{Deserialize, Serialize};

use crate::asset::{Asset, SerializedKey};
use crate::commitment::TapscriptPreimage;

/// Encoding of the data carried by a meta reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MetaType {
    /// Opaque bytes with no enforced structure.
    Opaque = 0,
    /// A JSON document.
    Json = 1,
}

/// The metadata preimage whose hash a genesis asset commits to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaReveal {
    /// The encoding of `data`.
    pub meta_type: MetaType,
    /// The raw metadata.
    pub data: Vec<u8>,
    /// Odd TLV records that are carried through into the hash unchanged.
    pub unknown_odd_types: BTreeMap<u64, Vec<u8>>,
}

/// Represents a full commitment proof for an asset. It can either prove inclusion or exclusion of
/// an asset within a Taproot Asset commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentProof {
    /// The underlying merkle proof structure from the commitment module.
    pub proof: crate::commitment::Proof,

    /// TapSiblingPreimage is an optional preimage of a tap node used to
    /// hash together with the Taproot Asset commitment leaf node to arrive
    /// at the tapscript root of the expected output.
    pub tap_sibling_preimage: Option<TapscriptPreimage>,
}

/// TapscriptProof represents a proof of a Taproot output not including a
/// Taproot Asset commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapscriptProof {
    /// TapPreimage1 is the preimage for a TapNode at depth 0 or 1.
    pub tap_preimage1: Option<TapscriptPreimage>,

    /// TapPreimage2, if specified, is the pair preimage for TapPreimage1 at
    /// depth 1.
    pub tap_preimage2: Option<TapscriptPreimage>,

    /// Bip86 indicates this is a normal BIP-0086 wallet output.
    pub bip86: bool,
}

/// What a [`TaprootProof`] reveals about the tapscript tree of its output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaprootProofKind {
    /// The output commits to a Taproot Asset commitment. Proves inclusion, or
    /// exclusion of an asset from that commitment.
    Commitment(CommitmentProof),
    /// The output carries no Taproot Asset commitment at all.
    Tapscript(TapscriptProof),
}

/// TaprootProof represents a proof that reveals the partial contents to a
/// tapscript tree within a taproot output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaprootProof {
    /// OutputIndex is the index of the output for which the proof applies.
    pub output_index: u32,

    /// InternalKey is the internal key of the taproot output at OutputIndex.
    pub internal_key: SerializedKey,

    /// The commitment or tapscript proof for the output.
    pub kind: TaprootProofKind,
}

impl TaprootProof {
    /// Returns the commitment proof, if this proof carries one.
    pub fn commitment_proof(&self) -> Option<&CommitmentProof> {
        match &self.kind {
            TaprootProofKind::Commitment(proof) => Some(proof),
            TaprootProofKind::Tapscript(_) => None,
        }
    }
}

/// A merkle proof that a transaction is included in a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxMerkleProof {
    /// The list of sibling hashes along the merkle path from the transaction
    /// up to the root.
    pub nodes: Vec<TxMerkleNode>,

    /// Direction bits: `true` means the sibling in `nodes` sits on the right.
    pub bits: Vec<bool>,
}

/// One link in a provenance chain: an asset state transition anchored in a
/// block, with everything needed to check it against the previous link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// The outpoint spent by the anchor transaction. For the genesis link this
    /// is the genesis point.
    pub prev_out: OutPoint,

    /// The header of the block containing the anchor transaction.
    pub block_header: Header,

    /// The height of the block containing the anchor transaction.
    pub block_height: u32,

    /// The transaction anchoring the resulting asset.
    pub anchor_tx: Transaction,

    /// The merkle proof for AnchorTx used to prove its inclusion within
    /// BlockHeader.
    pub tx_merkle_proof: TxMerkleProof,

    /// The asset referenced in the proof. This is the resulting asset after its
    /// state transition.
    pub asset: Asset,

    /// The TaprootProof proving the new inclusion of the resulting asset
    /// within AnchorTx.
    pub inclusion_proof: TaprootProof,

    /// The set of TaprootProofs proving the exclusion of the resulting asset
    /// from all other Taproot outputs within AnchorTx.
    pub exclusion_proofs: Vec<TaprootProof>,

    /// An optional TaprootProof needed if this asset is the result of a split.
    /// SplitRootProof proves inclusion of the root asset of the split.
    pub split_root_proof: Option<TaprootProof>,

    /// The reveal meta data associated with the proof, if available.
    /// This field is optional and can only be specified if the asset
    /// above is a genesis asset.
    pub meta_reveal: Option<MetaReveal>,

    /// Full provenance for every additional input the transition spends,
    /// one encoded proof file per input. The files are decoded one nesting
    /// level at a time while the transition is verified.
    pub additional_inputs: Vec<Vec<u8>>,

    /// ChallengeWitness is an optional virtual transaction witness that serves
    /// as an ownership proof for the asset. If this is set, then it is a
    /// valid transfer witness for a 1-input, 1-output virtual transaction that
    /// spends the asset in this proof and sends it to the NUMS key, to prove
    /// that the creator of the proof is able to produce a valid signature to
    /// spend the asset.
    pub challenge_witness: Option<Witness>,
}

impl Proof {
    /// Returns the outpoint the resulting asset is anchored at.
    pub fn out_point(&self) -> OutPoint {
        OutPoint {
            txid: self.anchor_tx.compute_txid(),
            vout: self.inclusion_proof.output_index,
        }
    }
}

/// Version of the proof file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum FileVersion {
    V0 = 0,
}

/// A decoded provenance chain, genesis first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofFile {
    /// Format version the file was encoded with.
    pub version: FileVersion,
    /// Proofs in chain order.
    pub proofs: Vec<Proof>,
}

impl ProofFile {
    /// Creates a version 0 file from proofs in chain order.
    pub fn new(proofs: Vec<Proof>) -> Self {
        ProofFile {
            version: FileVersion::V0,
            proofs,
        }
    }

    /// Returns the most recent proof in the chain.
    pub fn last_proof(&self) -> Option<&Proof> {
        self.proofs.last()
    }
}
