#![allow(dead_code)]

use std::sync::{Arc, Mutex, Once};

use anyhow::Result;
use bitcoin::absolute::LockTime;
use bitcoin::block::{Header, Version as BlockVersion};
use bitcoin::hashes::Hash;
use bitcoin::key::TweakedPublicKey;
use bitcoin::secp256k1::{PublicKey, Secp256k1, SecretKey, XOnlyPublicKey};
use bitcoin::transaction::Version;
use bitcoin::{
    Amount, BlockHash, CompactTarget, OutPoint, ScriptBuf, Sequence, TapNodeHash, Transaction,
    TxIn, TxMerkleNode, TxOut, Txid, Witness,
};
use taproot_assets_core::TaprootOps;
use taproot_assets_core::verify::encoding::{asset_commitment_leaf, asset_leaf};
use taproot_assets_core::verify::mssmt::{self, bit_index, branch_node, empty_nodes};
use taproot_assets_core::verify::snapshot::AssetSnapshot;
use taproot_assets_core::verify::taproot_proof::{
    TapCommitment, asset_commitment_key, tap_commitment_key,
};
use taproot_assets_core::verify::tx::HeaderError;
use taproot_assets_core::verify::vm::{EngineError, SplitAsset, TransitionEngine};
use taproot_assets_types::asset::{
    Asset, AssetType, AssetVersion, GenesisInfo, InputSet, PrevId, PrevWitness, SerializedKey,
    SplitCommitment,
};
use taproot_assets_types::commitment::{
    AssetProof, Proof as CommitmentTreeProof, TapCommitmentVersion, TaprootAssetProof,
};
use taproot_assets_types::mssmt::{MSSMT_TREE_LEVELS, MssmtNode, MssmtProof};
use taproot_assets_types::proof::{
    CommitmentProof, MetaReveal, Proof, ProofFile, TaprootProof, TaprootProofKind, TapscriptProof,
    TxMerkleProof,
};
use taproot_assets_verifier::codec::encode_file;
use taproot_assets_verifier::{
    BincodeCodec, BitcoinTaprootOps, SharedHeaderVerifier, Verifier, VerifierConfig,
};

static INIT_LOGGER: Once = Once::new();

pub fn init_logger() {
    INIT_LOGGER.call_once(|| {
        env_logger::builder()
            .is_test(true)
            .filter_level(log::LevelFilter::Trace)
            .try_init()
            .ok();
    });
}

/// Witness byte the engine treats as a bad signature.
pub const BAD_SIGNATURE: u8 = 0x00;

pub fn key(n: u8) -> SerializedKey {
    let secp = Secp256k1::signing_only();
    let secret = SecretKey::from_slice(&[n; 32]).expect("valid secret");
    PublicKey::from_secret_key(&secp, &secret).into()
}

pub fn signature() -> Witness {
    let mut witness = Witness::new();
    witness.push([0x01; 64]);
    witness
}

pub fn bad_signature() -> Witness {
    let mut witness = Witness::new();
    witness.push([BAD_SIGNATURE]);
    witness
}

/// Fresh genesis asset. `n` picks the genesis point and the script key.
pub fn genesis_asset(name: &str, n: u8) -> Asset {
    Asset {
        version: AssetVersion::V0,
        genesis: GenesisInfo {
            genesis_point: OutPoint {
                txid: Txid::from_byte_array([n; 32]),
                vout: 0,
            },
            name: name.into(),
            meta_hash: [0; 32],
            output_index: 0,
            asset_type: AssetType::Normal,
        },
        amount: 100,
        lock_time: 0,
        relative_lock_time: 0,
        prev_witnesses: vec![PrevWitness::genesis()],
        split_commitment_root: None,
        script_version: 0,
        script_key: key(n),
        group_key: None,
    }
}

/// Moves `asset` to `script_key`, spending each of `inputs`.
pub fn transfer(asset: &Asset, script_key: u8, inputs: &[PrevId]) -> Asset {
    let mut next = asset.clone();
    next.script_key = key(script_key);
    next.prev_witnesses = inputs
        .iter()
        .map(|prev_id| PrevWitness {
            prev_id: Some(*prev_id),
            tx_witness: signature(),
            split_commitment: None,
        })
        .collect();
    next
}

/// Turns `root` into the root asset of a split and returns the split output
/// carrying `amount` under `script_key`.
pub fn split(root: &mut Asset, script_key: u8, amount: u64) -> Asset {
    root.amount -= amount;
    root.split_commitment_root = Some(mssmt::leaf_node(&[script_key], amount));

    let mut output = root.clone();
    output.amount = amount;
    output.script_key = key(script_key);
    output.split_commitment_root = None;
    output.prev_witnesses = vec![PrevWitness {
        prev_id: Some(PrevId::zero()),
        tx_witness: Witness::new(),
        split_commitment: Some(SplitCommitment {
            proof: MssmtProof::empty(),
            root_asset: Box::new(root.clone()),
        }),
    }];
    output
}

/// Returns the node at `depth` of a tree holding only `leaf` at `key`.
fn lone_leaf_node(key: &[u8; 32], leaf: MssmtNode, depth: usize) -> MssmtNode {
    let empty = empty_nodes();
    (depth..MSSMT_TREE_LEVELS).rev().fold(leaf, |current, level| {
        let sibling = &empty[level + 1];
        if bit_index(level, key) == 0 {
            branch_node(&current, sibling)
        } else {
            branch_node(sibling, &current)
        }
        .expect("no overflow")
    })
}

/// Proof that `absent` is empty in a tree holding only `leaf` at `present`.
fn absence_proof(present: &[u8; 32], leaf: MssmtNode, absent: &[u8; 32]) -> MssmtProof {
    let depth = (0..MSSMT_TREE_LEVELS)
        .find(|depth| bit_index(*depth, present) != bit_index(*depth, absent))
        .expect("distinct keys");
    let mut proof = MssmtProof::empty();
    proof.nodes[MSSMT_TREE_LEVELS - 1 - depth] = lone_leaf_node(present, leaf, depth + 1);
    proof
}

/// A TapCommitment holding only `asset`, with the proof of its inclusion.
pub fn commit(
    asset: &Asset,
    version: TapCommitmentVersion,
) -> Result<(TapCommitment, CommitmentProof)> {
    let asset = asset.without_split_commitment();
    let tap_key = tap_commitment_key(&asset)?;
    let asset_root = mssmt::root_from_proof(
        asset_commitment_key(&asset)?,
        asset_leaf(&asset)?,
        &MssmtProof::empty(),
    )?;
    let leaf = asset_commitment_leaf(tap_key, asset.version, &asset_root);
    let root = mssmt::root_from_proof(tap_key, leaf, &MssmtProof::empty())?;

    let commitment = TapCommitment {
        version,
        root_hash: root.root_hash,
        root_sum: root.root_sum,
    };
    let proof = CommitmentProof {
        proof: CommitmentTreeProof {
            asset_proof: Some(AssetProof {
                proof: MssmtProof::empty(),
                version: asset.version,
                tap_key,
            }),
            taproot_asset_proof: TaprootAssetProof {
                proof: MssmtProof::empty(),
                version,
            },
        },
        tap_sibling_preimage: None,
    };
    Ok((commitment, proof))
}

/// Proof that `excluded` is absent from the commitment holding only
/// `present`. Both assets share a tap key.
pub fn asset_exclusion(present: &Asset, excluded: &Asset) -> Result<CommitmentProof> {
    let present = present.without_split_commitment();
    let tap_key = tap_commitment_key(&present)?;
    let present_key = asset_commitment_key(&present)?;
    Ok(CommitmentProof {
        proof: CommitmentTreeProof {
            asset_proof: Some(AssetProof {
                proof: absence_proof(
                    &present_key,
                    asset_leaf(&present)?,
                    &asset_commitment_key(excluded)?,
                ),
                version: present.version,
                tap_key,
            }),
            taproot_asset_proof: TaprootAssetProof {
                proof: MssmtProof::empty(),
                version: TapCommitmentVersion::V2,
            },
        },
        tap_sibling_preimage: None,
    })
}

/// An empty commitment and the proof that it holds no asset commitment for
/// any tap key.
pub fn empty_commitment(version: TapCommitmentVersion) -> (TapCommitment, CommitmentProof) {
    let commitment = TapCommitment {
        version,
        root_hash: empty_nodes()[0].hash.to_byte_array(),
        root_sum: 0,
    };
    let proof = CommitmentProof {
        proof: CommitmentTreeProof {
            asset_proof: None,
            taproot_asset_proof: TaprootAssetProof {
                proof: MssmtProof::empty(),
                version,
            },
        },
        tap_sibling_preimage: None,
    };
    (commitment, proof)
}

pub fn output_key(internal: u8, root: Option<TapNodeHash>) -> Result<SerializedKey> {
    let ops = BitcoinTaprootOps::new();
    let internal = ops.parse_internal_key(&key(internal))?;
    Ok(ops.taproot_output_key(&internal, root.map(|root| root.to_byte_array()))?)
}

pub fn p2tr(key: &SerializedKey) -> Result<TxOut> {
    let xonly = XOnlyPublicKey::from_slice(&key.x_only())?;
    Ok(TxOut {
        value: Amount::from_sat(1_000),
        script_pubkey: ScriptBuf::new_p2tr_tweaked(TweakedPublicKey::dangerous_assume_tweaked(
            xonly,
        )),
    })
}

/// An anchor output together with the taproot proof that explains it.
pub struct Anchor {
    pub output: TxOut,
    pub internal_key: u8,
    pub kind: TaprootProofKind,
}

impl Anchor {
    pub fn commitment(internal_key: u8, commitment: &TapCommitment, proof: CommitmentProof) -> Result<Self> {
        Ok(Anchor {
            output: p2tr(&output_key(internal_key, Some(commitment.tap_leaf_hash()))?)?,
            internal_key,
            kind: TaprootProofKind::Commitment(proof),
        })
    }

    pub fn bip86(internal_key: u8) -> Result<Self> {
        Ok(Anchor {
            output: p2tr(&output_key(internal_key, None)?)?,
            internal_key,
            kind: TaprootProofKind::Tapscript(TapscriptProof {
                tap_preimage1: None,
                tap_preimage2: None,
                bip86: true,
            }),
        })
    }

    fn taproot_proof(&self, output_index: u32) -> TaprootProof {
        TaprootProof {
            output_index,
            internal_key: key(self.internal_key),
            kind: self.kind.clone(),
        }
    }
}

/// Builds a proof anchored in a block of its own.
pub struct ProofBuilder {
    asset: Asset,
    prev_out: OutPoint,
    extra_inputs: Vec<OutPoint>,
    height: u32,
    inclusion: Anchor,
    exclusions: Vec<Anchor>,
    split_root: Option<(Anchor, CommitmentProof)>,
    plain_outputs: Vec<TxOut>,
    meta_reveal: Option<MetaReveal>,
    additional_inputs: Vec<Vec<u8>>,
    challenge_witness: Option<Witness>,
}

impl ProofBuilder {
    /// Anchors `asset` in output 0 of a block at `height`.
    pub fn new(asset: Asset, prev_out: OutPoint, height: u32) -> Result<Self> {
        let (commitment, proof) = commit(&asset, TapCommitmentVersion::V2)?;
        let internal = height as u8 + 50;
        Ok(ProofBuilder {
            asset,
            prev_out,
            extra_inputs: Vec::new(),
            height,
            inclusion: Anchor::commitment(internal, &commitment, proof)?,
            exclusions: Vec::new(),
            split_root: None,
            plain_outputs: Vec::new(),
            meta_reveal: None,
            additional_inputs: Vec::new(),
            challenge_witness: None,
        })
    }

    /// Anchors a genesis asset, spending its genesis point.
    pub fn genesis(asset: Asset) -> Result<Self> {
        let prev_out = asset.genesis.genesis_point;
        Self::new(asset, prev_out, 1)
    }

    pub fn spending(mut self, out_point: OutPoint) -> Self {
        self.extra_inputs.push(out_point);
        self
    }

    /// Adds a taproot output after the inclusion and split root outputs.
    pub fn exclusion(mut self, anchor: Anchor) -> Self {
        self.exclusions.push(anchor);
        self
    }

    /// Anchors the split root asset in output 1. `exclusion` proves the
    /// proof's asset absent from that output.
    pub fn split_root(mut self, anchor: Anchor, exclusion: CommitmentProof) -> Self {
        self.split_root = Some((anchor, exclusion));
        self
    }

    pub fn plain_output(mut self, output: TxOut) -> Self {
        self.plain_outputs.push(output);
        self
    }

    pub fn meta_reveal(mut self, reveal: MetaReveal) -> Self {
        self.meta_reveal = Some(reveal);
        self
    }

    /// Embeds `file` as the provenance of an additional input.
    pub fn input_file(mut self, file: &ProofFile) -> Self {
        let bytes = encode_file(&BincodeCodec, file).expect("encodable input file");
        self.additional_inputs.push(bytes);
        self
    }

    pub fn challenge(mut self, witness: Witness) -> Self {
        self.challenge_witness = Some(witness);
        self
    }

    pub fn build(self) -> Proof {
        let mut output = vec![self.inclusion.output.clone()];
        let mut exclusion_proofs = Vec::new();
        let split_root_proof = self.split_root.as_ref().map(|(anchor, exclusion)| {
            let output_index = output.len() as u32;
            exclusion_proofs.push(TaprootProof {
                output_index,
                internal_key: key(anchor.internal_key),
                kind: TaprootProofKind::Commitment(exclusion.clone()),
            });
            output.push(anchor.output.clone());
            anchor.taproot_proof(output_index)
        });
        for anchor in &self.exclusions {
            exclusion_proofs.push(anchor.taproot_proof(output.len() as u32));
            output.push(anchor.output.clone());
        }
        output.extend(self.plain_outputs.iter().cloned());

        let input = std::iter::once(self.prev_out)
            .chain(self.extra_inputs.iter().copied())
            .map(|previous_output| TxIn {
                previous_output,
                script_sig: ScriptBuf::new(),
                sequence: Sequence::MAX,
                witness: Witness::new(),
            })
            .collect();
        let anchor_tx = Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input,
            output,
        };

        let mut proof = Proof {
            prev_out: self.prev_out,
            block_header: header(self.height, &anchor_tx),
            block_height: self.height,
            anchor_tx,
            tx_merkle_proof: TxMerkleProof {
                nodes: Vec::new(),
                bits: Vec::new(),
            },
            asset: self.asset,
            inclusion_proof: self.inclusion.taproot_proof(0),
            exclusion_proofs,
            split_root_proof,
            meta_reveal: self.meta_reveal,
            additional_inputs: self.additional_inputs,
            challenge_witness: self.challenge_witness,
        };
        reanchor(&mut proof);
        proof
    }
}

fn header(height: u32, anchor_tx: &Transaction) -> Header {
    Header {
        version: BlockVersion::ONE,
        prev_blockhash: BlockHash::all_zeros(),
        merkle_root: TxMerkleNode::from_byte_array(anchor_tx.compute_txid().to_byte_array()),
        time: 1_700_000_000 + height,
        bits: CompactTarget::from_consensus(0x207f_ffff),
        nonce: height,
    }
}

/// Puts the anchor tx of `proof` alone into its block again, after the tx
/// was modified.
pub fn reanchor(proof: &mut Proof) {
    proof.block_header.merkle_root =
        TxMerkleNode::from_byte_array(proof.anchor_tx.compute_txid().to_byte_array());
}

/// Flips one bit of the output key in output `index` of the anchor tx and
/// reanchors the proof.
pub fn flip_output_key(proof: &mut Proof, index: usize) {
    let mut script = proof.anchor_tx.output[index].script_pubkey.to_bytes();
    script[10] ^= 0x01;
    proof.anchor_tx.output[index].script_pubkey = ScriptBuf::from_bytes(script);
    reanchor(proof);
}

/// Outpoint under which the proven asset is spent next.
pub fn prev_id(proof: &Proof) -> PrevId {
    PrevId::for_asset(proof.out_point(), &proof.asset)
}

/// A two-proof chain: genesis of `name` and a transfer to another key.
pub fn two_step_chain(name: &str, n: u8) -> Result<ProofFile> {
    let genesis = ProofBuilder::genesis(genesis_asset(name, n))?.build();
    let moved = transfer(&genesis.asset, n.wrapping_add(100), &[prev_id(&genesis)]);
    let transfer = ProofBuilder::new(moved, genesis.out_point(), 2)?.build();
    Ok(ProofFile::new(vec![genesis, transfer]))
}

/// Script validation engine that accepts genesis witnesses and any witness
/// spending a known input with a good signature.
#[derive(Default)]
pub struct WitnessEngine {
    pub calls: Mutex<Vec<EngineCall>>,
}

#[derive(Debug, Clone)]
pub struct EngineCall {
    pub asset: Asset,
    pub split: Option<SplitAsset>,
    pub inputs: InputSet,
}

impl TransitionEngine for WitnessEngine {
    fn execute(
        &self,
        asset: &Asset,
        split: Option<&SplitAsset>,
        inputs: &InputSet,
    ) -> Result<(), EngineError> {
        self.calls.lock().expect("engine lock").push(EngineCall {
            asset: asset.clone(),
            split: split.cloned(),
            inputs: inputs.clone(),
        });

        for (index, witness) in asset.prev_witnesses.iter().enumerate() {
            let Some(prev_id) = witness.prev_id else {
                return Err(EngineError::InvalidWitness { index });
            };
            if prev_id.is_zero() {
                continue;
            }
            if !inputs.contains_key(&prev_id) {
                return Err(EngineError::MissingInput(prev_id));
            }
            if witness.tx_witness.iter().any(|item| item == [BAD_SIGNATURE]) {
                return Err(EngineError::InvalidWitness { index });
            }
        }
        Ok(())
    }
}

pub fn verifier(engine: Arc<WitnessEngine>, max_concurrency: usize) -> Verifier {
    Verifier::new(engine).with_config(VerifierConfig {
        max_concurrency,
        challenge_network: bitcoin::Network::Regtest,
        ..VerifierConfig::default()
    })
}

/// Header verifier that knows every header.
pub fn any_header() -> SharedHeaderVerifier {
    Arc::new(|_: &Header, _: u32| -> Result<(), HeaderError> { Ok(()) })
}

/// Header verifier that fails every header with `err`.
pub fn failing_headers(err: HeaderError) -> SharedHeaderVerifier {
    Arc::new(move |_: &Header, _: u32| -> Result<(), HeaderError> { Err(err.clone()) })
}

pub fn assert_anchored(snapshot: &AssetSnapshot, proof: &Proof) {
    assert_eq!(snapshot.asset, proof.asset);
    assert_eq!(snapshot.out_point, proof.out_point());
    assert_eq!(snapshot.anchor_block_height, proof.block_height);
    assert_eq!(snapshot.anchor_block_hash, proof.block_header.block_hash());
}
