use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use bitcoin::consensus::encode::serialize;
use bitcoin::hashes::{Hash, sha256::Hash as Sha256Hash};
use bitcoin::{OutPoint, Witness};
use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::mssmt::{MssmtNode, MssmtProof};

pub type AssetID = Sha256Hash;

/// Length in bytes of a compressed public key.
pub const COMPRESSED_KEY_LEN: usize = 33;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
/// The version of the Taproot Asset.
pub enum AssetVersion {
    /// V0 is the default asset version. This version will include
    /// the witness vector in the leaf for a tap commitment.
    V0 = 0,
    /// V1 is the asset version that leaves out the witness vector
    /// from the MS-SMT leaf encoding.
    V1 = 1,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
/// The type of the asset.
pub enum AssetType {
    /// Indicates that an asset is capable of being split/merged, with each of the
    /// units being fungible, even across a key asset ID boundary (assuming the
    /// key group is the same).
    Normal,
    /// Indicates that an asset is a collectible, meaning that each of the other
    /// items under the same key group are not fully fungible with each other.
    /// Collectibles also cannot be split or merged.
    Collectible,
}

impl AssetType {
    /// Returns the protocol byte for this asset type.
    pub fn as_byte(self) -> u8 {
        match self {
            AssetType::Normal => 0,
            AssetType::Collectible => 1,
        }
    }
}

/// A compressed secp256k1 public key in its 33-byte wire form.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SerializedKey {
    pub bytes: [u8; COMPRESSED_KEY_LEN],
}

impl SerializedKey {
    /// The all-zero key used by genesis witnesses.
    pub const ZERO: SerializedKey = SerializedKey {
        bytes: [0u8; COMPRESSED_KEY_LEN],
    };

    /// Returns the x-only part of the key, dropping the parity byte.
    pub fn x_only(&self) -> [u8; 32] {
        let mut xonly = [0u8; 32];
        xonly.copy_from_slice(&self.bytes[1..]);
        xonly
    }
}

impl From<bitcoin::secp256k1::PublicKey> for SerializedKey {
    fn from(key: bitcoin::secp256k1::PublicKey) -> Self {
        SerializedKey {
            bytes: key.serialize(),
        }
    }
}

impl fmt::Debug for SerializedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SerializedKey(")?;
        for byte in self.bytes {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, ")")
    }
}

impl Serialize for SerializedKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.bytes)
    }
}

impl<'de> Deserialize<'de> for SerializedKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct KeyVisitor;

        impl<'de> Visitor<'de> for KeyVisitor {
            type Value = SerializedKey;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{} key bytes", COMPRESSED_KEY_LEN)
            }

            fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
                let bytes: [u8; COMPRESSED_KEY_LEN] = v
                    .try_into()
                    .map_err(|_| E::invalid_length(v.len(), &self))?;
                Ok(SerializedKey { bytes })
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut bytes = [0u8; COMPRESSED_KEY_LEN];
                for (idx, byte) in bytes.iter_mut().enumerate() {
                    *byte = seq
                        .next_element()?
                        .ok_or_else(|| de::Error::invalid_length(idx, &self))?;
                }
                Ok(SerializedKey { bytes })
            }
        }

        deserializer.deserialize_bytes(KeyVisitor)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
/// Base genesis information for an asset. This information never changes.
pub struct GenesisInfo {
    /// The first outpoint of the transaction that created the asset (txid:vout).
    pub genesis_point: OutPoint,
    /// The name of the asset.
    pub name: String,
    /// The hash of the meta data for this genesis asset.
    pub meta_hash: [u8; 32],
    /// The index of the output that carries the unique Taproot Asset commitment in
    /// the genesis transaction.
    pub output_index: u32,
    /// The type of the asset.
    pub asset_type: AssetType,
}

impl GenesisInfo {
    /// Computes the asset ID committed to by this genesis.
    ///
    /// sha256(genesis_outpoint || sha256(name) || meta_hash || output_index || type)
    pub fn id(&self) -> AssetID {
        let outpoint_bytes = serialize(&self.genesis_point);
        let tag_hash = Sha256Hash::hash(self.name.as_bytes());

        let mut buf = Vec::with_capacity(outpoint_bytes.len() + 32 + 32 + 4 + 1);
        buf.extend_from_slice(&outpoint_bytes);
        buf.extend_from_slice(tag_hash.as_byte_array());
        buf.extend_from_slice(&self.meta_hash);
        buf.extend_from_slice(&self.output_index.to_be_bytes());
        buf.push(self.asset_type.as_byte());

        Sha256Hash::hash(&buf)
    }

    /// Returns true if the genesis commits to a non-zero meta hash.
    pub fn has_meta_hash(&self) -> bool {
        self.meta_hash != [0u8; 32]
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
/// Information related to the key group of an asset (if it exists).
pub struct GroupKey {
    /// The tweaked group key, which is derived based on the genesis point and also
    /// asset type.
    pub group_pub_key: SerializedKey,
}

/// Identifies a previous asset output spent by a state transition.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PrevId {
    /// The outpoint of the anchor output holding the previous asset.
    pub out_point: OutPoint,
    /// The asset ID of the previous asset.
    pub asset_id: AssetID,
    /// The script key of the previous asset.
    pub script_key: SerializedKey,
}

impl PrevId {
    /// Returns the all-zero PrevId used by genesis and split witnesses.
    pub fn zero() -> Self {
        PrevId {
            out_point: OutPoint {
                txid: bitcoin::Txid::all_zeros(),
                vout: 0,
            },
            asset_id: AssetID::all_zeros(),
            script_key: SerializedKey::ZERO,
        }
    }

    /// Returns the PrevId under which `asset`, anchored at `out_point`, is
    /// spent.
    pub fn for_asset(out_point: OutPoint, asset: &Asset) -> Self {
        PrevId {
            out_point,
            asset_id: asset.genesis.id(),
            script_key: asset.script_key,
        }
    }

    /// Returns true if this is the all-zero genesis reference.
    pub fn is_zero(&self) -> bool {
        *self == PrevId::zero()
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
/// Represents a commitment to a split of an asset.
///
/// A root asset never carries a split commitment witness itself. Decoding
/// rejects one, so split commitments nest at most one level deep.
pub struct SplitCommitment {
    /// Proof of the split asset's location in the split commitment tree.
    pub proof: MssmtProof,
    /// The root asset of the split commitment.
    pub root_asset: Box<Asset>,
}

impl<'de> Deserialize<'de> for SplitCommitment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = split_root::Commitment::deserialize(deserializer)?;
        Ok(wire.into())
    }
}

/// Decoding shapes of a split commitment. They mirror [`SplitCommitment`],
/// [`Asset`] and [`PrevWitness`] field for field, except that the root
/// asset's witnesses cannot hold another split commitment.
mod split_root {
    use super::*;

    #[derive(Deserialize)]
    #[serde(rename = "SplitCommitment")]
    pub(super) struct Commitment {
        proof: MssmtProof,
        root_asset: RootAsset,
    }

    #[derive(Deserialize)]
    #[serde(rename = "Asset")]
    struct RootAsset {
        version: AssetVersion,
        genesis: GenesisInfo,
        amount: u64,
        lock_time: u64,
        relative_lock_time: u64,
        prev_witnesses: Vec<RootWitness>,
        split_commitment_root: Option<MssmtNode>,
        script_version: u16,
        script_key: SerializedKey,
        group_key: Option<GroupKey>,
    }

    #[derive(Deserialize)]
    #[serde(rename = "PrevWitness")]
    struct RootWitness {
        prev_id: Option<PrevId>,
        tx_witness: Witness,
        split_commitment: Option<Nested>,
    }

    /// A split commitment inside a split root asset. It has no values.
    enum Nested {}

    impl<'de> Deserialize<'de> for Nested {
        fn deserialize<D: Deserializer<'de>>(_: D) -> Result<Self, D::Error> {
            Err(de::Error::custom("split root asset carries a split commitment"))
        }
    }

    impl From<Commitment> for SplitCommitment {
        fn from(wire: Commitment) -> Self {
            let root = wire.root_asset;
            let prev_witnesses = root
                .prev_witnesses
                .into_iter()
                .map(|witness| PrevWitness {
                    prev_id: witness.prev_id,
                    tx_witness: witness.tx_witness,
                    split_commitment: witness.split_commitment.map(|nested| match nested {}),
                })
                .collect();

            SplitCommitment {
                proof: wire.proof,
                root_asset: Box::new(Asset {
                    version: root.version,
                    genesis: root.genesis,
                    amount: root.amount,
                    lock_time: root.lock_time,
                    relative_lock_time: root.relative_lock_time,
                    prev_witnesses,
                    split_commitment_root: root.split_commitment_root,
                    script_version: root.script_version,
                    script_key: root.script_key,
                    group_key: root.group_key,
                }),
            }
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
/// Represents a previous witness.
pub struct PrevWitness {
    /// Previous input asset ID.
    pub prev_id: Option<PrevId>,
    /// Transaction witness.
    pub tx_witness: Witness,
    /// Split commitment.
    pub split_commitment: Option<SplitCommitment>,
}

impl PrevWitness {
    /// Returns the witness carried by a freshly minted asset.
    pub fn genesis() -> Self {
        PrevWitness {
            prev_id: Some(PrevId::zero()),
            tx_witness: Witness::new(),
            split_commitment: None,
        }
    }

    /// Returns true if the witness is a split commitment witness.
    pub fn is_split_commitment(&self) -> bool {
        self.prev_id.is_some() && self.tx_witness.is_empty() && self.split_commitment.is_some()
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
/// Represents a Taproot Asset.
pub struct Asset {
    /// The version of the Taproot Asset.
    pub version: AssetVersion,
    /// The base genesis information of an asset.
    pub genesis: GenesisInfo,
    /// The total amount of the asset stored in this Taproot Asset UTXO.
    pub amount: u64,
    /// An optional locktime, as with Bitcoin transactions.
    pub lock_time: u64,
    /// An optional relative lock time, same as Bitcoin transactions.
    pub relative_lock_time: u64,
    /// Previous witnesses for the asset.
    pub prev_witnesses: Vec<PrevWitness>,
    /// Root of the split commitment tree, set on the root asset of a split.
    pub split_commitment_root: Option<MssmtNode>,
    /// The version of the script, only version 0 is defined at present.
    pub script_version: u16,
    /// The script key of the asset, which can be spent under Taproot semantics.
    pub script_key: SerializedKey,
    /// The information related to the key group of an asset (if it exists).
    pub group_key: Option<GroupKey>,
}

impl Asset {
    /// Returns true if the asset carries exactly one split commitment witness.
    pub fn has_split_commitment_witness(&self) -> bool {
        self.prev_witnesses.len() == 1 && self.prev_witnesses[0].is_split_commitment()
    }

    /// Returns true if the asset has a plain genesis witness.
    pub fn has_genesis_witness(&self) -> bool {
        match self.prev_witnesses.as_slice() {
            [witness] => {
                witness.tx_witness.is_empty()
                    && witness.split_commitment.is_none()
                    && witness.prev_id.as_ref().is_some_and(PrevId::is_zero)
            }
            _ => false,
        }
    }

    /// Returns the root asset of the split this asset was created by, if any.
    pub fn split_root_asset(&self) -> Option<&Asset> {
        if !self.has_split_commitment_witness() {
            return None;
        }

        self.prev_witnesses[0]
            .split_commitment
            .as_ref()
            .map(|commitment| commitment.root_asset.as_ref())
    }

    /// Returns a copy of the asset without any split commitment witness.
    pub fn without_split_commitment(&self) -> Asset {
        let mut asset = self.clone();
        if asset.has_split_commitment_witness() {
            asset.prev_witnesses[0].split_commitment = None;
        }
        asset
    }
}

/// Previous asset states feeding one state transition, keyed by the identity
/// they are spent under.
pub type InputSet = BTreeMap<PrevId, Asset>;
