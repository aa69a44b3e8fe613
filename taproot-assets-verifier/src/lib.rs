//! Async proof-chain verification for Taproot Assets proof files.
//!
//! A [`Verifier`] replays a proof file record by record. Each record is
//! checked against the block it claims to be anchored in, against the
//! commitments in its anchor outputs and against the script validation
//! engine. Additional input files of a record are verified concurrently.

use std::fmt;
use std::sync::Arc;

use taproot_assets_core::verify::snapshot::AssetSnapshot;
use taproot_assets_core::verify::tx::HeaderVerifier;
use taproot_assets_core::verify::vm::TransitionEngine;
use taproot_assets_types::proof::ProofFile;
use tokio_util::sync::CancellationToken;

mod chain;
pub mod codec;
pub mod config;
pub mod error;
pub mod ops;
mod proof;
mod transition;

pub use codec::{BincodeCodec, CodecError, ProofCodec};
pub use config::VerifierConfig;
pub use error::{Error, ErrorKind, ProofError};
pub use ops::BitcoinTaprootOps;

/// Header verifier shared between concurrently verified input files.
pub type SharedHeaderVerifier = Arc<dyn HeaderVerifier + Send + Sync>;

/// Script validation engine shared between concurrently verified input files.
pub type SharedEngine = Arc<dyn TransitionEngine + Send + Sync>;

/// Verifies proof files.
///
/// Cloning is cheap; clones share the engine and codec.
#[derive(Clone)]
pub struct Verifier {
    ops: Arc<BitcoinTaprootOps>,
    engine: SharedEngine,
    codec: Arc<dyn ProofCodec + Send + Sync>,
    config: VerifierConfig,
    /// Nesting level of the files this handle verifies. Zero for the
    /// top-level file.
    depth: usize,
}

impl Verifier {
    /// Creates a verifier that validates transitions with `engine`, decodes
    /// records with [`BincodeCodec`] and uses the default configuration.
    pub fn new(engine: SharedEngine) -> Self {
        Self {
            ops: Arc::new(BitcoinTaprootOps::new()),
            engine,
            codec: Arc::new(BincodeCodec),
            config: VerifierConfig::default(),
            depth: 0,
        }
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, config: VerifierConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the record codec.
    pub fn with_codec<C>(mut self, codec: C) -> Self
    where
        C: ProofCodec + Send + Sync + 'static,
    {
        self.codec = Arc::new(codec);
        self
    }

    /// Returns the configuration in use.
    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Encodes `file` with the configured record codec.
    pub fn encode(&self, file: &ProofFile) -> Result<Vec<u8>, CodecError> {
        codec::encode_file(self.codec.as_ref(), file)
    }

    /// Decodes a serialized proof file and verifies it.
    pub async fn verify(
        &self,
        bytes: &[u8],
        headers: &SharedHeaderVerifier,
        cancel: &CancellationToken,
    ) -> Result<AssetSnapshot, Error> {
        let file = codec::decode_file(self.codec.as_ref(), bytes)?;
        self.verify_file(&file, headers, cancel).await
    }
}

impl fmt::Debug for Verifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Verifier")
            .field("config", &self.config)
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}
