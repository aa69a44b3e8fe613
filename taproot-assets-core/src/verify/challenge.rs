//! Ownership challenge witnesses.
//!
//! A challenge witness proves control over an asset's script key by
//! authorizing a virtual 1-in/1-out spend of the asset to the NUMS key.

use alloc::vec;

use bitcoin::hashes::Hash;
use bitcoin::{Network, OutPoint, Witness};
use taproot_assets_types::asset::{Asset, InputSet, PrevId, PrevWitness, SerializedKey};

use crate::verify::vm::{EngineError, TransitionEngine};

/// NUMS key that challenge packets send the asset to.
pub const NUMS_COMPRESSED_KEY: SerializedKey = SerializedKey {
    bytes: [
        0x02, 0x7c, 0x79, 0xb9, 0xb2, 0x6e, 0x46, 0x38, 0x95, 0xee, 0xf5, 0x67, 0x9d, 0x85, 0x58,
        0x94, 0x2c, 0x86, 0xc4, 0xad, 0x22, 0x33, 0xad, 0xef, 0x01, 0xbc, 0x3e, 0x6d, 0x54, 0x0b,
        0x36, 0x53, 0xfe,
    ],
};

/// The single input of an ownership packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualInput {
    /// Identity the owned asset is spent under.
    pub prev_id: PrevId,
    /// The owned asset.
    pub asset: Asset,
}

/// The single output of an ownership packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualOutput {
    /// Anchor output the asset would be sent to.
    pub anchor_output_index: u32,
    /// The asset sent to the NUMS key.
    pub asset: Asset,
}

/// A virtual transaction that spends an owned asset to the NUMS key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipPacket {
    /// Chain parameters the packet is built for.
    pub network: Network,
    /// The spent asset.
    pub input: VirtualInput,
    /// The resulting asset.
    pub output: VirtualOutput,
}

impl OwnershipPacket {
    /// Installs `witness` as the tx witness of the output's first witness.
    pub fn with_witness(mut self, witness: &Witness) -> Self {
        if let Some(prev) = self.output.asset.prev_witnesses.first_mut() {
            prev.tx_witness = witness.clone();
        }
        self
    }

    /// Returns the input set the output asset spends.
    pub fn input_set(&self) -> InputSet {
        InputSet::from([(self.input.prev_id, self.input.asset.clone())])
    }
}

/// Builds the ownership packet for `asset`.
pub fn ownership_proof_packet(asset: &Asset, network: Network) -> OwnershipPacket {
    let prev_id = PrevId {
        out_point: OutPoint {
            txid: bitcoin::Txid::all_zeros(),
            vout: 0,
        },
        asset_id: asset.genesis.id(),
        script_key: asset.script_key,
    };

    let mut output = asset.clone();
    output.script_key = NUMS_COMPRESSED_KEY;
    output.split_commitment_root = None;
    output.prev_witnesses = vec![PrevWitness {
        prev_id: Some(prev_id),
        tx_witness: Witness::new(),
        split_commitment: None,
    }];

    OwnershipPacket {
        network,
        input: VirtualInput {
            prev_id,
            asset: asset.clone(),
        },
        output: VirtualOutput {
            anchor_output_index: 0,
            asset: output,
        },
    }
}

/// Validates a challenge witness for `asset` and reports whether the asset
/// carries a split commitment witness.
pub fn verify_challenge_witness<E: TransitionEngine + ?Sized>(
    engine: &E,
    asset: &Asset,
    witness: &Witness,
    network: Network,
) -> Result<bool, EngineError> {
    let packet = ownership_proof_packet(asset, network).with_witness(witness);
    engine.execute(&packet.output.asset, None, &packet.input_set())?;
    Ok(asset.has_split_commitment_witness())
}
