//! Composite products and the per-scene product registry.
//!
//! A composite product is a named rule that builds one layer from other
//! named layers, its prerequisites. Prerequisites may be raw band names or
//! other product names; the registry decides which is which.
//!
//! Products are immutable once registered and are shared by `Arc`, so a
//! resampled scene can reuse the registry of its source.

mod builtin;
mod resolver;

pub use builtin::{viirs, DifferenceProduct, FnProduct, StackProduct};
pub use resolver::resolve_raw_names;

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use thiserror::Error;
use tracing::debug;

use crate::error::{SceneError, SceneResult};
use crate::layer::Layer;
use crate::scene::Scene;

/// Errors a composite product can report from [`CompositeProduct::evaluate`].
#[derive(Debug, Error)]
pub enum CompositeError {
    /// The inputs do not share a common spatial referencing.
    ///
    /// `Scene::compute` absorbs this: the inputs are flagged to survive
    /// eviction so the caller can resample and retry.
    #[error("incompatible geometry: {0}")]
    IncompatibleGeometry(String),

    /// A scene lookup failed inside the composite.
    #[error(transparent)]
    Lookup(Box<SceneError>),

    /// Any other failure of the composite's computation.
    #[error("{0}")]
    Failed(String),
}

impl From<SceneError> for CompositeError {
    fn from(e: SceneError) -> Self {
        CompositeError::Lookup(Box::new(e))
    }
}

/// A named rule producing one layer from its prerequisites.
///
/// # Contract
///
/// - `prerequisites` is fixed for the lifetime of the product; its order is
///   preserved during expansion.
/// - `evaluate` is only called once every prerequisite is realized in the
///   scene. It must not assume anything else is.
/// - The returned layer is stored under the product's registered name.
pub trait CompositeProduct: Send + Sync {
    /// Names of the layers this product is computed from.
    fn prerequisites(&self) -> &[String];

    /// Compute the product from the realized layers of `scene`.
    fn evaluate(&self, scene: &Scene) -> Result<Layer, CompositeError>;
}

/// Mapping from product name to composite definition.
#[derive(Clone, Default)]
pub struct ProductRegistry {
    products: IndexMap<String, Arc<dyn CompositeProduct>>,
}

impl ProductRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `product` under `name`.
    ///
    /// # Errors
    ///
    /// - `CyclicProduct` if the product lists itself as a prerequisite
    /// - `DuplicateProduct` if `name` is already registered
    pub fn register(
        &mut self,
        name: impl Into<String>,
        product: impl CompositeProduct + 'static,
    ) -> SceneResult<()> {
        self.register_shared(name, Arc::new(product))
    }

    /// Register an already shared product.
    pub fn register_shared(
        &mut self,
        name: impl Into<String>,
        product: Arc<dyn CompositeProduct>,
    ) -> SceneResult<()> {
        let name = name.into();
        if product.prerequisites().iter().any(|p| *p == name) {
            return Err(SceneError::CyclicProduct {
                chain: vec![name.clone(), name],
            });
        }
        if self.products.contains_key(&name) {
            return Err(SceneError::DuplicateProduct(name));
        }

        debug!(product = %name, prerequisites = ?product.prerequisites(), "Registered product");
        self.products.insert(name, product);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn CompositeProduct>> {
        self.products.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.products.contains_key(name)
    }

    /// Registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.products.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl fmt::Debug for ProductRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.products.iter().map(|(k, v)| (k, v.prerequisites())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let mut registry = ProductRegistry::new();
        registry.register("fog", viirs::fog()).unwrap();
        registry.register("true_color", viirs::true_color()).unwrap();

        assert!(registry.contains("fog"));
        assert!(!registry.contains("I04"));
        assert_eq!(registry.get("fog").unwrap().prerequisites(), &["I04", "I05"]);
        assert_eq!(
            registry.get("true_color").unwrap().prerequisites(),
            &["M02", "M04", "M05"]
        );
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["fog", "true_color"]);
    }

    #[test]
    fn test_self_reference_rejected() {
        let mut registry = ProductRegistry::new();
        let err = registry
            .register("fog", DifferenceProduct::new("fog", "fog", "I04"))
            .unwrap_err();
        assert!(matches!(err, SceneError::CyclicProduct { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = ProductRegistry::new();
        registry.register("fog", viirs::fog()).unwrap();
        let err = registry.register("fog", viirs::fog()).unwrap_err();
        assert!(matches!(err, SceneError::DuplicateProduct(name) if name == "fog"));
    }

    #[test]
    fn test_lookup_error_converts() {
        let err: CompositeError = SceneError::NotFound("I05".into()).into();
        assert_eq!(err.to_string(), "no layer named 'I05'");
    }
}
