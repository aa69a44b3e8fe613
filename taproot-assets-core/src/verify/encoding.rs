//! TLV encodings hashed into commitment trees.
//!
//! An asset is committed to as the TLV stream of its fields. For version 1
//! assets the stream leaves out transaction witnesses, so signing a
//! transfer does not move the asset's leaf.

use alloc::vec::Vec;

use bitcoin::hashes::{Hash, HashEngine, sha256::Hash as Sha256Hash};
use bitcoin::{OutPoint, Witness};
use taproot_assets_types::asset::{Asset, AssetVersion, GenesisInfo, PrevWitness, SplitCommitment};
use taproot_assets_types::file::encode_bigsize;
use taproot_assets_types::mssmt::{MSSMT_TREE_LEVELS, MssmtNode, MssmtProof};

use crate::verify::mssmt::{self, MssmtRoot};

/// Record types of an asset leaf.
mod asset_field {
    pub const VERSION: u64 = 0;
    pub const GENESIS: u64 = 2;
    pub const TYPE: u64 = 4;
    pub const AMOUNT: u64 = 6;
    pub const LOCK_TIME: u64 = 7;
    pub const RELATIVE_LOCK_TIME: u64 = 9;
    pub const PREV_WITNESS: u64 = 11;
    pub const SPLIT_COMMITMENT_ROOT: u64 = 13;
    pub const SCRIPT_VERSION: u64 = 14;
    pub const SCRIPT_KEY: u64 = 16;
    pub const GROUP_KEY: u64 = 17;
}

/// Record types of a previous-input witness.
mod witness_field {
    pub const PREV_ID: u64 = 1;
    pub const TX_WITNESS: u64 = 3;
    pub const SPLIT_COMMITMENT: u64 = 5;
}

/// Append-only byte stream of TLV records and their building blocks.
#[derive(Debug, Default)]
pub(crate) struct TlvWriter {
    buf: Vec<u8>,
}

impl TlvWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn bigsize(&mut self, value: u64) -> &mut Self {
        encode_bigsize(value, &mut self.buf);
        self
    }

    pub(crate) fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Writes `bytes` behind their BigSize length.
    pub(crate) fn var_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.bigsize(bytes.len() as u64).raw(bytes)
    }

    /// Writes one `type | length | value` record.
    pub(crate) fn record(&mut self, tlv_type: u64, value: &[u8]) -> &mut Self {
        self.bigsize(tlv_type).var_bytes(value)
    }

    fn out_point(&mut self, out_point: &OutPoint) -> &mut Self {
        self.raw(&out_point.txid.to_byte_array())
            .raw(&out_point.vout.to_be_bytes())
    }

    fn node(&mut self, node: &MssmtNode) -> &mut Self {
        self.raw(node.hash.as_byte_array())
            .raw(&node.sum.to_be_bytes())
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Runs `write` against a fresh writer and returns what it wrote.
fn written(write: impl FnOnce(&mut TlvWriter)) -> Vec<u8> {
    let mut tlv = TlvWriter::new();
    write(&mut tlv);
    tlv.into_bytes()
}

/// Returns the leaf an asset occupies in its asset commitment tree.
pub fn asset_leaf(asset: &Asset) -> Result<MssmtNode, mssmt::Error> {
    let with_tx_witness = asset.version == AssetVersion::V0;
    let bytes = encode_asset(asset, with_tx_witness)?;
    Ok(mssmt::leaf_node(&bytes, asset.amount))
}

/// Returns the leaf an asset commitment occupies in the tap commitment tree.
///
/// leaf = version || sha256(tap_key || left || right || sum) || sum
pub fn asset_commitment_leaf(tap_key: [u8; 32], version: AssetVersion, root: &MssmtRoot) -> MssmtNode {
    let mut engine = Sha256Hash::engine();
    engine.input(&tap_key);
    engine.input(&root.left_hash);
    engine.input(&root.right_hash);
    engine.input(&root.root_sum.to_be_bytes());
    let commitment = Sha256Hash::from_engine(engine);

    let leaf = written(|tlv| {
        tlv.raw(&[version as u8])
            .raw(commitment.as_byte_array())
            .raw(&root.root_sum.to_be_bytes());
    });
    mssmt::leaf_node(&leaf, root.root_sum)
}

fn encode_asset(asset: &Asset, with_tx_witness: bool) -> Result<Vec<u8>, mssmt::Error> {
    let prev_witnesses = if asset.prev_witnesses.is_empty() {
        None
    } else {
        let mut list = TlvWriter::new();
        list.bigsize(asset.prev_witnesses.len() as u64);
        for witness in &asset.prev_witnesses {
            list.var_bytes(&encode_prev_witness(witness, with_tx_witness)?);
        }
        Some(list.into_bytes())
    };

    let bigsize = |value: u64| written(|tlv| {
        tlv.bigsize(value);
    });

    let mut tlv = TlvWriter::new();
    tlv.record(asset_field::VERSION, &[asset.version as u8])
        .record(asset_field::GENESIS, &encode_genesis(&asset.genesis))
        .record(asset_field::TYPE, &[asset.genesis.asset_type.as_byte()])
        .record(asset_field::AMOUNT, &bigsize(asset.amount));
    if asset.lock_time > 0 {
        tlv.record(asset_field::LOCK_TIME, &bigsize(asset.lock_time));
    }
    if asset.relative_lock_time > 0 {
        tlv.record(asset_field::RELATIVE_LOCK_TIME, &bigsize(asset.relative_lock_time));
    }
    if let Some(witnesses) = prev_witnesses {
        tlv.record(asset_field::PREV_WITNESS, &witnesses);
    }
    if let Some(root) = &asset.split_commitment_root {
        tlv.record(asset_field::SPLIT_COMMITMENT_ROOT, &written(|w| {
            w.node(root);
        }));
    }
    tlv.record(asset_field::SCRIPT_VERSION, &asset.script_version.to_be_bytes())
        .record(asset_field::SCRIPT_KEY, &asset.script_key.bytes);
    if let Some(group) = &asset.group_key {
        tlv.record(asset_field::GROUP_KEY, &group.group_pub_key.bytes);
    }

    Ok(tlv.into_bytes())
}

fn encode_genesis(genesis: &GenesisInfo) -> Vec<u8> {
    written(|tlv| {
        tlv.out_point(&genesis.genesis_point)
            .var_bytes(genesis.name.as_bytes())
            .raw(&genesis.meta_hash)
            .raw(&genesis.output_index.to_be_bytes())
            .raw(&[genesis.asset_type.as_byte()]);
    })
}

fn encode_prev_witness(witness: &PrevWitness, with_tx_witness: bool) -> Result<Vec<u8>, mssmt::Error> {
    let mut tlv = TlvWriter::new();
    if let Some(prev_id) = &witness.prev_id {
        let id = written(|w| {
            w.out_point(&prev_id.out_point)
                .raw(prev_id.asset_id.as_byte_array())
                .raw(&prev_id.script_key.bytes);
        });
        tlv.record(witness_field::PREV_ID, &id);
    }
    if with_tx_witness && !witness.tx_witness.is_empty() {
        tlv.record(witness_field::TX_WITNESS, &encode_tx_witness(&witness.tx_witness));
    }
    if let Some(split) = &witness.split_commitment {
        tlv.record(witness_field::SPLIT_COMMITMENT, &encode_split_commitment(split)?);
    }
    Ok(tlv.into_bytes())
}

fn encode_tx_witness(witness: &Witness) -> Vec<u8> {
    written(|tlv| {
        tlv.bigsize(witness.len() as u64);
        for item in witness.iter() {
            tlv.var_bytes(item);
        }
    })
}

fn encode_split_commitment(split: &SplitCommitment) -> Result<Vec<u8>, mssmt::Error> {
    let proof = encode_compressed_proof(&split.proof)?;
    let root_asset = encode_asset(&split.root_asset, true)?;
    Ok(written(|tlv| {
        tlv.var_bytes(&proof).var_bytes(&root_asset);
    }))
}

/// Encodes a proof as the count of non-empty siblings, those siblings and a
/// bitmap flagging the empty ones, leaf level first.
fn encode_compressed_proof(proof: &MssmtProof) -> Result<Vec<u8>, mssmt::Error> {
    let nodes = mssmt::normalize_nodes(&proof.nodes)?;
    let empty = mssmt::empty_nodes();

    let mut bitmap = alloc::vec![0u8; MSSMT_TREE_LEVELS / 8];
    let mut explicit = Vec::new();
    for (idx, node) in nodes.iter().enumerate() {
        if *node == empty[MSSMT_TREE_LEVELS - idx] {
            bitmap[idx / 8] |= 1 << (idx % 8);
        } else {
            explicit.push(node);
        }
    }

    Ok(written(|tlv| {
        // Never more than MSSMT_TREE_LEVELS entries.
        tlv.raw(&(explicit.len() as u16).to_be_bytes());
        for node in explicit {
            tlv.node(node);
        }
        tlv.raw(&bitmap);
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_are_type_length_value() {
        let bytes = written(|tlv| {
            tlv.record(2, b"ab").record(0xFD, &[]);
        });
        assert_eq!(bytes, alloc::vec![2, 2, b'a', b'b', 0xFD, 0x00, 0xFD, 0]);
    }

    #[test]
    fn all_empty_proof_compresses_to_bitmap() {
        let proof = MssmtProof {
            nodes: alloc::vec![MssmtNode::zero(); MSSMT_TREE_LEVELS],
        };
        let bytes = encode_compressed_proof(&proof).unwrap();
        assert_eq!(bytes.len(), 2 + MSSMT_TREE_LEVELS / 8);
        assert_eq!(&bytes[..2], &[0, 0]);
        assert!(bytes[2..].iter().all(|byte| *byte == 0xFF));
    }
}
