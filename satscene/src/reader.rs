//! Reader plugin contract and the registry of reader factories.
//!
//! Readers turn raw files into layers. They are looked up by the dotted
//! `format` identifier of a reader configuration and constructed through a
//! factory registered at startup, so there is no name-based module loading.
//!
//! # Example
//!
//! ```ignore
//! let mut registry = ReaderRegistry::new();
//! registry.register("viirs_sdr.ViirsSdrReader", |binding| {
//!     Ok(Box::new(ViirsSdrReader::new(binding.config_path())?))
//! });
//! ```

use std::fmt;
use std::path::PathBuf;

use indexmap::{IndexMap, IndexSet};

use crate::binding::ReaderBinding;
use crate::error::{SceneError, SceneResult};
use crate::info::Info;
use crate::layer::LayerStore;

/// Error type returned by reader plugins.
pub type ReaderError = Box<dyn std::error::Error + Send + Sync>;

/// What a reader is asked to load.
#[derive(Debug, Clone, Copy)]
pub struct LoadRequest<'a> {
    /// Raw band names to load. Names the reader cannot supply are ignored.
    pub names: &'a IndexSet<String>,

    /// Files assigned to the reader's binding.
    pub filenames: &'a [PathBuf],

    /// Scene metadata (platform, time window, ...).
    pub info: &'a Info,
}

/// A reader plugin bound to one reader configuration.
pub trait Reader: Send {
    /// Format identifier of the reader.
    fn format(&self) -> &str;

    /// Load one layer per satisfiable name of `request` into `layers`.
    fn load(&mut self, request: &LoadRequest<'_>, layers: &mut LayerStore) -> Result<(), ReaderError>;
}

/// Constructs a reader for a binding.
pub type ReaderFactory =
    Box<dyn Fn(&ReaderBinding) -> Result<Box<dyn Reader>, ReaderError> + Send + Sync>;

/// Format identifier → reader factory.
#[derive(Default)]
pub struct ReaderRegistry {
    factories: IndexMap<String, ReaderFactory>,
}

impl ReaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for `format`, replacing any previous one.
    pub fn register<F>(&mut self, format: impl Into<String>, factory: F)
    where
        F: Fn(&ReaderBinding) -> Result<Box<dyn Reader>, ReaderError> + Send + Sync + 'static,
    {
        self.factories.insert(format.into(), Box::new(factory));
    }

    pub fn contains(&self, format: &str) -> bool {
        self.factories.contains_key(format)
    }

    /// Registered formats in registration order.
    pub fn formats(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Construct the reader for `binding`.
    ///
    /// # Errors
    ///
    /// - `UnknownReaderFormat` if no factory is registered for the format
    /// - `Reader` if the factory fails
    pub fn create(&self, binding: &ReaderBinding) -> SceneResult<Box<dyn Reader>> {
        let factory = self
            .factories
            .get(binding.format())
            .ok_or_else(|| SceneError::UnknownReaderFormat(binding.format().to_string()))?;
        factory(binding).map_err(|source| SceneError::Reader {
            format: binding.format().to_string(),
            source,
        })
    }
}

impl fmt::Debug for ReaderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.factories.keys()).finish()
    }
}
