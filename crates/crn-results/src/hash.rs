//! Content-based hashing for run IDs.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Identifies a run by its model description, simulator and parameters.
///
/// `model_text` should be a stable rendering of the model (e.g. its
/// reactions, one per line); `parameters` is hashed through its JSON form.
pub fn compute_run_id<P: Serialize>(model_text: &str, simulator: &str, parameters: &P) -> String {
    let mut hasher = Sha256::new();
    hasher.update(model_text.as_bytes());
    hasher.update(simulator.as_bytes());

    let params_json = serde_json::to_string(parameters).unwrap_or_default();
    hasher.update(params_json.as_bytes());

    let result = hasher.finalize();
    format!("{:x}", result)
}
