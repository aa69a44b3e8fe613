//! Verified asset state handed from one proof of a chain to the next.
//!
//! The last snapshot of a chain is the result of verifying a proof file.

use bitcoin::{BlockHash, OutPoint, Transaction};
use serde::{Deserialize, Serialize};
use taproot_assets_types::asset::{Asset, PrevId, SerializedKey};
use taproot_assets_types::commitment::TapscriptPreimage;
use taproot_assets_types::proof::MetaReveal;

use crate::verify::taproot_proof::TapCommitment;

/// The verified state of an asset at one link of its provenance chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSnapshot {
    /// The resulting asset.
    pub asset: Asset,
    /// The outpoint the asset is anchored at.
    pub out_point: OutPoint,
    /// Hash of the block containing the anchor transaction.
    pub anchor_block_hash: BlockHash,
    /// Height of the block containing the anchor transaction.
    pub anchor_block_height: u32,
    /// Position of the anchor transaction within its block.
    pub anchor_tx_index: u32,
    /// The anchor transaction.
    pub anchor_tx: Transaction,
    /// Anchor output index holding the asset.
    pub output_index: u32,
    /// Internal key of the anchor output.
    pub internal_key: SerializedKey,
    /// The commitment the asset was proven to be included in.
    pub script_root: TapCommitment,
    /// Tapscript sibling hashed next to the commitment leaf, if any.
    pub tapscript_sibling: Option<TapscriptPreimage>,
    /// Whether the asset is the output of a split.
    pub split_asset: bool,
    /// The meta reveal of a genesis asset.
    pub meta_reveal: Option<MetaReveal>,
}

impl AssetSnapshot {
    /// Returns the identity a later transition spends this asset under.
    pub fn prev_id(&self) -> PrevId {
        PrevId::for_asset(self.out_point, &self.asset)
    }
}
