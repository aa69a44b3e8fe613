//! Proof-level verification helpers.

use alloc::collections::BTreeSet;

use taproot_assets_types::commitment::TapCommitmentVersion;
use taproot_assets_types::proof::Proof;

use crate::TaprootOps;
use crate::verify::taproot_proof::{self, TapCommitment};

/// Proof verification stage used for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofStage {
    /// Inclusion proof verification stage.
    Inclusion,
    /// Exclusion proof verification stage.
    Exclusion,
    /// Split root proof verification stage.
    SplitRoot,
}

impl core::fmt::Display for ProofStage {
    /// Formats the stage for display.
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ProofStage::Inclusion => write!(f, "inclusion"),
            ProofStage::Exclusion => write!(f, "exclusion"),
            ProofStage::SplitRoot => write!(f, "split_root"),
        }
    }
}

/// Errors returned by proof verification helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Taproot proof verification failed at a specific stage.
    TaprootProof {
        /// Stage where verification failed.
        stage: ProofStage,
        /// Output the failing taproot proof points at.
        output_index: u32,
        /// Underlying taproot proof error.
        source: taproot_proof::Error,
    },
    /// Split root proof is missing for a split commitment asset.
    MissingSplitRootProof,
    /// Taproot outputs of the anchor transaction are left without an
    /// exclusion proof.
    MissingExclusionProofs {
        /// Lowest uncovered output index.
        output_index: u32,
        /// Number of uncovered outputs.
        missing: usize,
    },
    /// More than one exclusion proof covers the same output.
    DuplicateExclusionProof {
        /// The doubly covered output.
        output_index: u32,
    },
    /// Inclusion derivation matched a key without a commitment.
    MissingCommitmentProof,
    /// Mixed TapCommitment versions found across proofs.
    MixedCommitmentVersions {
        /// Version of the inclusion commitment.
        expected: TapCommitmentVersion,
        /// Incompatible version seen in an exclusion proof.
        actual: TapCommitmentVersion,
    },
}

impl core::fmt::Display for Error {
    /// Formats the error for display.
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::TaprootProof {
                stage,
                output_index,
                source,
            } => write!(
                f,
                "taproot proof {} error at output {}: {}",
                stage, output_index, source
            ),
            Error::MissingSplitRootProof => write!(f, "missing split root proof"),
            Error::MissingExclusionProofs {
                output_index,
                missing,
            } => write!(
                f,
                "missing exclusion proofs for {} outputs, first at {}",
                missing, output_index
            ),
            Error::DuplicateExclusionProof { output_index } => {
                write!(f, "duplicate exclusion proof for output {}", output_index)
            }
            Error::MissingCommitmentProof => write!(f, "missing commitment proof"),
            Error::MixedCommitmentVersions { expected, actual } => write!(
                f,
                "mixed commitment versions: {:?} next to {:?}",
                actual, expected
            ),
        }
    }
}

impl core::error::Error for Error {}

/// Verifies the inclusion proof for the resulting asset and returns the
/// commitment it is anchored in.
pub fn verify_inclusion_proof<O: TaprootOps>(
    ops: &O,
    proof: &Proof,
) -> Result<TapCommitment, Error> {
    taproot_proof::derive_and_compare(
        ops,
        &proof.anchor_tx,
        &proof.inclusion_proof,
        &proof.asset,
        true,
    )
    .map_err(|err| Error::TaprootProof {
        stage: ProofStage::Inclusion,
        output_index: proof.inclusion_proof.output_index,
        source: err,
    })?
    .ok_or(Error::MissingCommitmentProof)
}

/// Verifies the split root proof for split commitment assets. Assets without
/// a split commitment witness pass trivially.
pub fn verify_split_root_proof<O: TaprootOps>(ops: &O, proof: &Proof) -> Result<(), Error> {
    let Some(root_asset) = proof.asset.split_root_asset() else {
        return Ok(());
    };
    let split_proof = proof
        .split_root_proof
        .as_ref()
        .ok_or(Error::MissingSplitRootProof)?;

    taproot_proof::derive_and_compare(ops, &proof.anchor_tx, split_proof, root_asset, true)
        .map(|_| ())
        .map_err(|err| Error::TaprootProof {
            stage: ProofStage::SplitRoot,
            output_index: split_proof.output_index,
            source: err,
        })
}

/// Verifies that every taproot output other than the inclusion output is
/// covered by exactly one valid exclusion proof, and that every commitment
/// seen along the way is compatible with `inclusion_version`.
///
/// Returns the first commitment version observed in the exclusion proofs.
pub fn verify_exclusion_proofs<O: TaprootOps>(
    ops: &O,
    proof: &Proof,
    inclusion_version: TapCommitmentVersion,
) -> Result<Option<TapCommitmentVersion>, Error> {
    let mut uncovered: BTreeSet<u32> = proof
        .anchor_tx
        .output
        .iter()
        .enumerate()
        .filter(|(_, output)| output.script_pubkey.is_p2tr())
        .map(|(idx, _)| idx as u32)
        .filter(|idx| *idx != proof.inclusion_proof.output_index)
        .collect();

    let mut covered = BTreeSet::new();
    let mut first_version = None;
    for exclusion_proof in &proof.exclusion_proofs {
        let output_index = exclusion_proof.output_index;
        if !covered.insert(output_index) {
            return Err(Error::DuplicateExclusionProof { output_index });
        }

        let derived = taproot_proof::derive_and_compare(
            ops,
            &proof.anchor_tx,
            exclusion_proof,
            &proof.asset,
            false,
        )
        .map_err(|err| Error::TaprootProof {
            stage: ProofStage::Exclusion,
            output_index,
            source: err,
        })?;

        uncovered.remove(&output_index);

        if let Some(commitment) = derived {
            if !inclusion_version.is_similar(commitment.version) {
                return Err(Error::MixedCommitmentVersions {
                    expected: inclusion_version,
                    actual: commitment.version,
                });
            }
            first_version.get_or_insert(commitment.version);
        }
    }

    if let Some(&output_index) = uncovered.first() {
        return Err(Error::MissingExclusionProofs {
            output_index,
            missing: uncovered.len(),
        });
    }

    Ok(first_version)
}
