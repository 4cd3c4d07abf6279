//! Error types for scene operations.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::geometry::ResampleError;
use crate::pattern::PatternError;
use crate::product::CompositeError;
use crate::reader::ReaderError;

/// Result type for scene operations.
pub type SceneResult<T> = Result<T, SceneError>;

/// Errors that can occur while binding, loading, computing or querying a scene.
#[derive(Debug, Error)]
pub enum SceneError {
    /// The sensor has no entry in the lookup file.
    #[error("no configuration file provided in {} for sensor '{sensor}'", lookup.display())]
    UnknownSensor { sensor: String, lookup: PathBuf },

    /// A configuration file could not be read or parsed as INI.
    #[error("failed to read configuration {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    /// A configuration file is structurally invalid.
    #[error("malformed config file {}: {reason}", path.display())]
    MalformedConfig { path: PathBuf, reason: String },

    /// A filename template could not be compiled or applied.
    #[error("invalid file pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: PatternError,
    },

    /// A glob expression built from a template was rejected.
    #[error("invalid glob '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    /// Scene metadata required by the operation is absent.
    #[error("scene metadata is missing '{0}'")]
    MissingMetadata(&'static str),

    /// Files were left over after scanning every known reader configuration.
    #[error("don't know how to open the following files: {}", display_paths(files))]
    UnresolvedFiles { files: Vec<PathBuf> },

    /// No reader factory is registered for a bound format.
    #[error("no reader registered for format '{0}'")]
    UnknownReaderFormat(String),

    /// A composite product depends on itself, directly or transitively.
    #[error("cyclic composite definition: {}", chain.join(" -> "))]
    CyclicProduct { chain: Vec<String> },

    /// A product name was registered twice.
    #[error("product '{0}' is already registered")]
    DuplicateProduct(String),

    /// No layer with the given uid is realized.
    #[error("no layer named '{0}'")]
    NotFound(String),

    /// No layer's spectral range contains the given wavelength.
    #[error("can't find any layer at {0}um")]
    NoLayerAtWavelength(f64),

    /// The operation is deliberately not supported on the layer map.
    #[error("operation not supported on scene layers: {0}")]
    Unsupported(&'static str),

    /// A reader plugin failed while loading.
    #[error("reader '{format}' failed: {source}")]
    Reader {
        format: String,
        #[source]
        source: ReaderError,
    },

    /// A composite product failed for a reason other than incompatible geometry.
    #[error("composite '{name}' failed: {source}")]
    Composite {
        name: String,
        #[source]
        source: CompositeError,
    },

    /// The resampling collaborator failed for a layer.
    #[error("resampling '{uid}' failed: {source}")]
    Resample {
        uid: String,
        #[source]
        source: ResampleError,
    },
}

impl SceneError {
    /// Whether this error belongs to the configuration class.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnknownSensor { .. }
                | Self::ConfigRead { .. }
                | Self::MalformedConfig { .. }
                | Self::InvalidPattern { .. }
                | Self::InvalidGlob { .. }
                | Self::MissingMetadata(_)
                | Self::UnknownReaderFormat(_)
                | Self::CyclicProduct { .. }
                | Self::DuplicateProduct(_)
        )
    }

    pub(crate) fn malformed(path: &Path, reason: impl Into<String>) -> Self {
        Self::MalformedConfig {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    let names: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
    format!("[{}]", names.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_files_display_lists_every_file() {
        let err = SceneError::UnresolvedFiles {
            files: vec![PathBuf::from("/data/a.h5"), PathBuf::from("b.h5")],
        };
        assert_eq!(
            err.to_string(),
            "don't know how to open the following files: [/data/a.h5, b.h5]"
        );
    }

    #[test]
    fn test_malformed_config_names_file() {
        let err = SceneError::malformed(Path::new("/etc/viirs.cfg"), "missing reader format");
        assert!(err.to_string().contains("/etc/viirs.cfg"));
        assert!(err.to_string().contains("missing reader format"));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_cyclic_product_display() {
        let err = SceneError::CyclicProduct {
            chain: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "cyclic composite definition: a -> b -> a");
    }

    #[test]
    fn test_lookup_errors_are_not_configuration() {
        assert!(!SceneError::NotFound("M05".into()).is_configuration());
        assert!(!SceneError::Unsupported("set").is_configuration());
    }
}
