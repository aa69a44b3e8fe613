//! Boundary to the asset script validation engine.
//!
//! The engine decides whether the witnesses of an asset authorize spending
//! its inputs. Verification only decides what the engine is fed.

use alloc::string::String;

use serde::{Deserialize, Serialize};
use taproot_assets_types::asset::{Asset, InputSet, PrevId};
use thiserror::Error;

/// The split output of a transition whose root asset is being validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitAsset {
    /// The split asset as committed in its anchor output.
    pub asset: Asset,
    /// Anchor output index the split asset lives at.
    pub output_index: u32,
}

/// Errors reported by a [`TransitionEngine`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A witness spends an input that is not part of the input set.
    #[error("input {0:?} not found in input set")]
    MissingInput(PrevId),
    /// The witness at `index` does not authorize its spend.
    #[error("invalid witness at index {index}")]
    InvalidWitness {
        /// Position of the witness in `prev_witnesses`.
        index: usize,
    },
    /// The engine rejected the transition for another reason.
    #[error("transition rejected: {0}")]
    Rejected(String),
}

/// Validates state transitions.
pub trait TransitionEngine {
    /// Checks that `asset` is a valid spend of `inputs`. `split` is set when
    /// `asset` is the root of a split whose output `split.asset` is being
    /// proven.
    fn execute(
        &self,
        asset: &Asset,
        split: Option<&SplitAsset>,
        inputs: &InputSet,
    ) -> Result<(), EngineError>;
}
