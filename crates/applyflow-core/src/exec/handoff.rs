//! Single-use JSON state-handoff file.
//!
//! Before exiting, the pipeline program may write its derived results to
//! `<state_dir>/pipeline_state_<run_id>.json`. The file is keyed by run id
//! so concurrent runs of the same job cannot race on the filename. Reading
//! it consumes it: the file is deleted after a successful parse and after
//! a failed one. A missing or malformed file is not an error.

use std::fs;
use std::path::{Path, PathBuf};

use log::warn;
use serde_json::Value;

use applyflow_commons::RunId;

/// Handoff file path for a run.
pub fn handoff_path(state_dir: &Path, run_id: &RunId) -> PathBuf {
    state_dir.join(format!("pipeline_state_{}.json", run_id))
}

/// Read, parse, and delete the handoff file. Returns `None` when the file
/// is missing or malformed.
pub fn take(state_dir: &Path, run_id: &RunId) -> Option<Value> {
    let path = handoff_path(state_dir, run_id);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!("Failed to read handoff file {}: {}", path.display(), e);
            return None;
        }
    };

    // Single-use contract: consume the file whether or not it parses
    if let Err(e) = fs::remove_file(&path) {
        warn!("Failed to delete handoff file {}: {}", path.display(), e);
    }

    match serde_json::from_str::<Value>(&content) {
        Ok(state) => Some(state),
        Err(e) => {
            warn!("Malformed handoff file {}: {}", path.display(), e);
            None
        }
    }
}
