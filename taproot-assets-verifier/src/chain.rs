use futures::FutureExt;
use futures::future::BoxFuture;
use log::{debug, warn};
use taproot_assets_core::verify::snapshot::AssetSnapshot;
use taproot_assets_types::proof::ProofFile;
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::{SharedHeaderVerifier, Verifier};

impl Verifier {
    /// Replays `file` in chain order and returns the snapshot of its last
    /// proof.
    ///
    /// Each proof is verified against the snapshot of the proof before it.
    /// The first failure ends the replay. `cancel` is checked before every
    /// proof and is passed down into input verification.
    pub fn verify_file<'a>(
        &'a self,
        file: &'a ProofFile,
        headers: &'a SharedHeaderVerifier,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<AssetSnapshot, Error>> {
        async move {
            if file.proofs.is_empty() {
                return Err(Error::EmptyFile);
            }
            debug!("verifying proof chain of {} proofs", file.proofs.len());

            let mut prev: Option<AssetSnapshot> = None;
            for (index, proof) in file.proofs.iter().enumerate() {
                if cancel.is_cancelled() {
                    debug!("proof chain cancelled before proof {}", index);
                    return Err(Error::Cancelled);
                }

                let snapshot = self
                    .verify_proof(proof, prev.as_ref(), headers, cancel)
                    .await
                    .map_err(|err| {
                        let err = Error::at(index, err);
                        if err != Error::Cancelled {
                            warn!("proof chain rejected: {}", err);
                        }
                        err
                    })?;
                prev = Some(snapshot);
            }

            let snapshot = prev.ok_or(Error::EmptyFile)?;
            debug!("proof chain verified, asset anchored at {}", snapshot.out_point);
            Ok(snapshot)
        }
        .boxed()
    }
}
