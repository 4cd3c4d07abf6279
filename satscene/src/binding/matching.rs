//! Reader discovery for files given without a sensor.

use std::path::PathBuf;

use tracing::{debug, warn};

use super::ReaderBinding;
use crate::config::SceneConfig;
use crate::error::{SceneError, SceneResult};

/// Find the reader configurations for `files`.
///
/// Every `*.cfg` file in the configuration directory (except the sensor
/// lookup file) is read in sorted order, and each file is assigned to the
/// first configuration whose patterns match it. Assigned files leave the
/// pool, so no file is claimed twice. Scanning stops as soon as the pool is
/// empty.
///
/// Only configurations that claimed at least one file are returned.
///
/// # Errors
///
/// - configuration errors from any scanned file, unchanged
/// - `UnresolvedFiles` with exactly the files no configuration claimed
pub fn find_readers(config: &SceneConfig, files: Vec<PathBuf>) -> SceneResult<Vec<ReaderBinding>> {
    let mut pool = files;
    let mut bindings = Vec::new();

    let dir = glob::Pattern::escape(&config.config_dir.to_string_lossy());
    let expr = format!("{}/*.cfg", dir.trim_end_matches('/'));
    let entries = glob::glob(&expr).map_err(|source| SceneError::InvalidGlob {
        pattern: expr.clone(),
        source,
    })?;

    for entry in entries {
        if pool.is_empty() {
            break;
        }
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable configuration entry");
                continue;
            }
        };
        if path.file_name().and_then(|n| n.to_str()) == Some(config.lookup_filename.as_str()) {
            continue;
        }

        let mut binding = ReaderBinding::from_config_file(&path)?;
        if binding.assign_matching_files(&mut pool) > 0 {
            bindings.push(binding);
        } else {
            debug!(config = %path.display(), "Configuration claimed no files");
        }
    }

    if !pool.is_empty() {
        return Err(SceneError::UnresolvedFiles { files: pool });
    }
    Ok(bindings)
}
