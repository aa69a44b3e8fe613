use std::num::NonZeroUsize;

use bitcoin::Network;
use serde::{Deserialize, Serialize};

const DEFAULT_MAX_INPUT_DEPTH: usize = 64;

/// Tunables of a [`Verifier`](crate::Verifier).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Upper bound on input proof files verified at the same time for one
    /// state transition. Zero is treated as one.
    pub max_concurrency: usize,
    /// Network the ownership packet of a challenge witness is built for.
    pub challenge_network: Network,
    /// Deepest level of input proof files accepted below the top-level
    /// file. Inputs of the top-level file sit at level one.
    pub max_input_depth: usize,
}

impl VerifierConfig {
    /// Returns the effective worker count.
    pub fn concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            max_concurrency: std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            challenge_network: Network::Bitcoin,
            max_input_depth: DEFAULT_MAX_INPUT_DEPTH,
        }
    }
}
