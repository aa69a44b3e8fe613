use log::{debug, warn};
use taproot_assets_core::verify::snapshot::AssetSnapshot;
use taproot_assets_core::verify::vm::SplitAsset;
use taproot_assets_types::asset::InputSet;
use taproot_assets_types::proof::Proof;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::codec::{self, CodecError};
use crate::error::{Error, ProofError};
use crate::{SharedHeaderVerifier, Verifier};

type InputResult = (usize, Result<AssetSnapshot, Error>);

impl Verifier {
    /// Runs the script validation engine over the transition that created
    /// the proof's asset and reports whether the asset is a split output.
    ///
    /// For split outputs the root asset of the split is validated, with the
    /// split output passed alongside it.
    pub(crate) async fn validate_transition(
        &self,
        proof: &Proof,
        prev: Option<&AssetSnapshot>,
        headers: &SharedHeaderVerifier,
        cancel: &CancellationToken,
    ) -> Result<bool, ProofError> {
        let (target, split) = match proof.asset.split_root_asset() {
            Some(root_asset) => (
                root_asset,
                Some(SplitAsset {
                    asset: proof.asset.clone(),
                    output_index: proof.inclusion_proof.output_index,
                }),
            ),
            None => (&proof.asset, None),
        };

        let mut inputs = InputSet::new();
        if let Some(prev) = prev {
            inputs.insert(prev.prev_id(), prev.asset.clone());
        }
        if !proof.additional_inputs.is_empty() {
            self.verify_inputs(&proof.additional_inputs, &mut inputs, headers, cancel)
                .await?;
        }

        self.engine
            .execute(target, split.as_ref(), &inputs)
            .map_err(ProofError::TransitionRejected)?;

        Ok(split.is_some())
    }

    /// Decodes and verifies the input proof files of a transition and adds
    /// their resulting assets to `inputs`.
    ///
    /// At most `max_concurrency` files are verified at once. The first
    /// failure cancels the remaining workers.
    async fn verify_inputs(
        &self,
        files: &[Vec<u8>],
        inputs: &mut InputSet,
        headers: &SharedHeaderVerifier,
        cancel: &CancellationToken,
    ) -> Result<(), ProofError> {
        let limit = self.config.concurrency();
        debug!(
            "verifying {} input proof files at depth {} with up to {} workers",
            files.len(),
            self.depth + 1,
            limit
        );

        // Workers stop on the child token; the caller's token is never
        // cancelled from here.
        let token = cancel.child_token();
        let mut pending = files.iter().cloned().enumerate();
        let mut workers = JoinSet::new();
        for (index, bytes) in pending.by_ref().take(limit) {
            self.spawn_input(&mut workers, index, bytes, headers, &token);
        }

        while !workers.is_empty() {
            let joined = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    token.cancel();
                    debug!("input verification cancelled with {} workers running", workers.len());
                    return Err(ProofError::Cancelled);
                }
                joined = workers.join_next() => joined,
            };
            let Some(joined) = joined else {
                break;
            };

            let (index, result) = match joined {
                Ok(done) => done,
                Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                Err(_) => {
                    token.cancel();
                    return Err(ProofError::Cancelled);
                }
            };

            match result {
                Ok(snapshot) => {
                    let prev_id = snapshot.prev_id();
                    if inputs.insert(prev_id, snapshot.asset).is_some() {
                        warn!("input proof file {} repeats input {:?}", index, prev_id);
                    }
                }
                Err(Error::Cancelled) => {
                    token.cancel();
                    return Err(ProofError::Cancelled);
                }
                Err(err) => {
                    warn!("input proof file {} rejected: {}", index, err);
                    token.cancel();
                    return Err(ProofError::InputsInvalid {
                        input: index,
                        source: Box::new(err),
                    });
                }
            }

            if let Some((index, bytes)) = pending.next() {
                self.spawn_input(&mut workers, index, bytes, headers, &token);
            }
        }

        debug!("verified {} input proof files", files.len());
        Ok(())
    }

    fn spawn_input(
        &self,
        workers: &mut JoinSet<InputResult>,
        index: usize,
        bytes: Vec<u8>,
        headers: &SharedHeaderVerifier,
        token: &CancellationToken,
    ) {
        let mut verifier = self.clone();
        verifier.depth += 1;
        let headers = headers.clone();
        let token = token.clone();
        workers.spawn(async move {
            if token.is_cancelled() {
                return (index, Err(Error::Cancelled));
            }
            let limit = verifier.config.max_input_depth;
            if verifier.depth > limit {
                return (index, Err(CodecError::NestingTooDeep { limit }.into()));
            }
            let file = match codec::decode_file(verifier.codec.as_ref(), &bytes) {
                Ok(file) => file,
                Err(err) => return (index, Err(err.into())),
            };
            let result = verifier.verify_file(&file, &headers, &token).await;
            (index, result)
        });
    }
}
