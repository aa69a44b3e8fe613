use log::trace;
use taproot_assets_core::verify::snapshot::AssetSnapshot;
use taproot_assets_core::verify::tx;
use taproot_assets_core::verify::{self, challenge, meta_reveal, proof as checks};
use taproot_assets_types::proof::Proof;
use tokio_util::sync::CancellationToken;

use crate::error::ProofError;
use crate::{SharedHeaderVerifier, Verifier};

impl Verifier {
    /// Verifies a single proof against the snapshot of the proof before it.
    ///
    /// `prev` is `None` for the first proof of a chain. Checks run in a fixed
    /// order and the first failing one is returned.
    pub async fn verify_proof(
        &self,
        proof: &Proof,
        prev: Option<&AssetSnapshot>,
        headers: &SharedHeaderVerifier,
        cancel: &CancellationToken,
    ) -> Result<AssetSnapshot, ProofError> {
        let ops = self.ops.as_ref();

        tx::verify_prev_out_linkage(prev.map(|snapshot| &snapshot.out_point), proof)
            .map_err(verify::Error::from)?;
        tx::verify_anchor_spend(proof).map_err(verify::Error::from)?;
        trace!("anchor of {} linked to {}", proof.out_point(), proof.prev_out);

        headers
            .verify_header(&proof.block_header, proof.block_height)
            .map_err(ProofError::Header)?;
        trace!("header at height {} accepted", proof.block_height);

        tx::verify_tx_merkle_proof(
            &proof.anchor_tx,
            &proof.tx_merkle_proof,
            proof.block_header.merkle_root,
        )
        .map_err(verify::Error::from)?;
        trace!("anchor tx included in block {}", proof.block_header.block_hash());

        let commitment =
            checks::verify_inclusion_proof(ops, proof).map_err(verify::Error::from)?;
        trace!(
            "inclusion proven at output {} with {:?} commitment",
            proof.inclusion_proof.output_index, commitment.version
        );

        checks::verify_split_root_proof(ops, proof).map_err(verify::Error::from)?;

        let exclusion_version = checks::verify_exclusion_proofs(ops, proof, commitment.version)
            .map_err(verify::Error::from)?;
        trace!(
            "{} exclusion proofs verified, commitment version {:?}",
            proof.exclusion_proofs.len(),
            exclusion_version
        );

        meta_reveal::verify_meta_reveal(&proof.asset, proof.meta_reveal.as_ref())
            .map_err(verify::Error::from)?;

        let split_asset = match (prev, proof.challenge_witness.as_ref()) {
            (None, Some(witness)) => {
                trace!("validating challenge witness");
                challenge::verify_challenge_witness(
                    self.engine.as_ref(),
                    &proof.asset,
                    witness,
                    self.config.challenge_network,
                )
                .map_err(ProofError::TransitionRejected)?
            }
            _ => self.validate_transition(proof, prev, headers, cancel).await?,
        };
        trace!("transition accepted, split: {}", split_asset);

        Ok(AssetSnapshot {
            asset: proof.asset.clone(),
            out_point: proof.out_point(),
            anchor_block_hash: proof.block_header.block_hash(),
            anchor_block_height: proof.block_height,
            anchor_tx_index: tx::tx_index(&proof.tx_merkle_proof),
            anchor_tx: proof.anchor_tx.clone(),
            output_index: proof.inclusion_proof.output_index,
            internal_key: proof.inclusion_proof.internal_key,
            script_root: commitment,
            tapscript_sibling: proof
                .inclusion_proof
                .commitment_proof()
                .and_then(|commitment_proof| commitment_proof.tap_sibling_preimage.clone()),
            split_asset,
            meta_reveal: proof.meta_reveal.clone(),
        })
    }
}
