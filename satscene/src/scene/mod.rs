//! The scene: realized layers, the wishlist, and the read → compute → unload
//! pipeline.
//!
//! # Lifecycle
//!
//! ```text
//! Empty ──build──► FilesBound ──read──► RawLoaded ──compute──► CompositesResolved
//!                                          ▲                           │
//!                                          └───────read (new wishlist)─┤
//!                                                                      ▼
//!                                                        unload ──► Evictable
//! ```
//!
//! Everything here is synchronous. A scene's layers, products and reader
//! bindings are private to it; derived scenes (see [`Scene::resample`]) get
//! their own copies.

mod builder;
mod pipeline;

pub use builder::SceneBuilder;
pub use pipeline::ComputeReport;

use std::fmt;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::binding::ReaderBinding;
use crate::config::SceneConfig;
use crate::error::{SceneError, SceneResult};
use crate::geometry::{Area, Resampler};
use crate::info::Info;
use crate::layer::{Layer, LayerKey, LayerStore};
use crate::product::{CompositeProduct, ProductRegistry};
use crate::reader::{Reader, ReaderRegistry};

/// Where a scene is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneState {
    /// No files bound and no layers.
    Empty,
    /// Reader bindings resolved; nothing read yet.
    FilesBound,
    /// Raw layers for the current wishlist were requested from the readers.
    RawLoaded,
    /// Composites for the current wishlist were evaluated.
    CompositesResolved,
    /// Layers outside the wishlist were evicted.
    Evictable,
}

/// A collection of layers built from one set of sensor files.
pub struct Scene {
    config: SceneConfig,
    info: Info,
    layers: LayerStore,
    products: ProductRegistry,
    bindings: IndexMap<String, ReaderBinding>,
    readers: IndexMap<String, Box<dyn Reader>>,
    reader_registry: Arc<ReaderRegistry>,
    wishlist: IndexSet<String>,
    state: SceneState,
}

impl Scene {
    /// Start building a scene.
    pub fn builder(config: SceneConfig) -> SceneBuilder {
        SceneBuilder::new(config)
    }

    fn empty(config: SceneConfig, info: Info, reader_registry: Arc<ReaderRegistry>) -> Self {
        Self {
            config,
            info,
            layers: LayerStore::new(),
            products: ProductRegistry::new(),
            bindings: IndexMap::new(),
            readers: IndexMap::new(),
            reader_registry,
            wishlist: IndexSet::new(),
            state: SceneState::Empty,
        }
    }

    /// Attach bindings, merging bindings of the same format.
    fn bind(&mut self, bindings: Vec<ReaderBinding>) {
        for binding in bindings {
            debug!(
                format = %binding.format(),
                files = binding.filenames().len(),
                config = %binding.config_path().display(),
                "Bound reader"
            );
            match self.bindings.get_mut(binding.format()) {
                Some(existing) => existing.absorb(binding),
                None => {
                    self.bindings.insert(binding.format().to_string(), binding);
                }
            }
        }
        if !self.bindings.is_empty() {
            self.state = SceneState::FilesBound;
        }
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn info(&self) -> &Info {
        &self.info
    }

    pub fn state(&self) -> SceneState {
        self.state
    }

    /// Names most recently passed to `read`.
    pub fn wishlist(&self) -> &IndexSet<String> {
        &self.wishlist
    }

    /// Reader bindings keyed by format.
    pub fn bindings(&self) -> impl Iterator<Item = &ReaderBinding> {
        self.bindings.values()
    }

    pub fn binding(&self, format: &str) -> Option<&ReaderBinding> {
        self.bindings.get(format)
    }

    /// The reader instantiated for `format`, once `read` has run.
    pub fn reader(&self, format: &str) -> Option<&dyn Reader> {
        self.readers.get(format).map(|r| r.as_ref())
    }

    pub fn layers(&self) -> &LayerStore {
        &self.layers
    }

    pub fn products(&self) -> &ProductRegistry {
        &self.products
    }

    /// Register a composite product for this scene.
    pub fn add_product(
        &mut self,
        name: impl Into<String>,
        product: impl CompositeProduct + 'static,
    ) -> SceneResult<()> {
        self.products.register(name, product)
    }

    /// Look up a layer by uid or by wavelength (in micrometres).
    ///
    /// ```ignore
    /// let m05 = scene.get("M05")?;
    /// let red = scene.get(0.67)?;
    /// ```
    pub fn get<'a>(&self, key: impl Into<LayerKey<'a>>) -> SceneResult<&Layer> {
        self.layers.lookup(key.into())
    }

    /// Replacing layers by key is not supported.
    pub fn set(&mut self, _uid: &str, _layer: Layer) -> SceneResult<()> {
        Err(SceneError::Unsupported("set"))
    }

    /// Removing layers by key is not supported; use [`Scene::unload`].
    pub fn delete(&mut self, _uid: &str) -> SceneResult<Layer> {
        Err(SceneError::Unsupported("delete"))
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.layers.contains(uid)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Realized layers that are on the wishlist.
    pub fn wishlist_layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers
            .iter()
            .filter(|layer| self.wishlist.contains(layer.uid()))
    }

    /// Resample realized layers onto `destination`, producing a new scene.
    ///
    /// The new scene copies this scene's metadata, wishlist and products but
    /// starts with its own layer map; `subset` restricts which layers are
    /// resampled. This scene is left untouched.
    pub fn resample(
        &self,
        destination: &Area,
        resampler: &dyn Resampler,
        subset: Option<&[&str]>,
    ) -> SceneResult<Scene> {
        let mut scene = Scene::empty(
            self.config.clone(),
            self.info.clone(),
            Arc::clone(&self.reader_registry),
        );
        scene.products = self.products.clone();
        scene.wishlist = self.wishlist.clone();

        for layer in self.layers.iter() {
            if subset.is_some_and(|subset| !subset.contains(&layer.uid())) {
                continue;
            }
            debug!(uid = %layer.uid(), destination = %destination, "Resampling layer");
            let mut resampled =
                resampler
                    .resample(layer, destination)
                    .map_err(|source| SceneError::Resample {
                        uid: layer.uid().to_string(),
                        source,
                    })?;
            resampled.set_uid(layer.uid());
            resampled.set_keep(layer.keep());
            scene.layers.insert(resampled);
        }

        if !scene.layers.is_empty() {
            scene.state = SceneState::RawLoaded;
        }
        Ok(scene)
    }

    #[cfg(test)]
    pub(crate) fn insert_layer(&mut self, layer: Layer) {
        self.layers.insert(layer);
    }
}

impl fmt::Display for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.layers.iter().map(|l| l.to_string()).collect();
        write!(f, "{}", lines.join("\n"))
    }
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("state", &self.state)
            .field("info", &self.info)
            .field("layers", &self.layers.uids().collect::<Vec<_>>())
            .field("products", &self.products)
            .field("bindings", &self.bindings.keys().collect::<Vec<_>>())
            .field("wishlist", &self.wishlist)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::ResampleError;
    use crate::info::keys;
    use crate::product::{viirs, CompositeError};

    fn scene() -> Scene {
        Scene::builder(SceneConfig::default())
            .platform("Suomi-NPP")
            .build()
            .unwrap()
    }

    fn swath() -> Area {
        Area::new("swath", 1, 2)
    }

    fn nearest(layer: &Layer, dest: &Area) -> Result<Layer, ResampleError> {
        let mut data = layer.data().to_vec();
        data.resize(dest.size(), 0.0);
        Ok(Layer::new("renamed-by-resampler", data).with_area(dest.clone()))
    }

    #[test]
    fn test_empty_scene() {
        let scene = scene();
        assert_eq!(scene.state(), SceneState::Empty);
        assert!(scene.is_empty());
        assert_eq!(scene.info().text(keys::PLATFORM), Some("Suomi-NPP"));
        assert_eq!(scene.bindings().count(), 0);
    }

    #[test]
    fn test_set_and_delete_are_refused() {
        let mut scene = scene();
        scene.insert_layer(Layer::new("M05", vec![1.0]));

        assert!(matches!(
            scene.set("M05", Layer::new("M05", vec![2.0])),
            Err(SceneError::Unsupported("set"))
        ));
        assert!(matches!(scene.delete("M05"), Err(SceneError::Unsupported("delete"))));
        assert_eq!(scene.get("M05").unwrap().data(), &[1.0]);
    }

    #[test]
    fn test_get_by_name_and_wavelength() {
        let mut scene = scene();
        scene.insert_layer(Layer::new("M05", vec![]).with_wavelength(0.662, 0.672, 0.682));
        scene.insert_layer(Layer::new("I01", vec![]).with_wavelength(0.6, 0.64, 0.68));

        assert_eq!(scene.get(0.67).unwrap().uid(), "M05");
        assert_eq!(scene.get("I01").unwrap().uid(), "I01");
        assert!(matches!(scene.get("M16"), Err(SceneError::NotFound(_))));
        assert!(matches!(scene.get(11.0), Err(SceneError::NoLayerAtWavelength(_))));
    }

    #[test]
    fn test_builtin_fog_difference() {
        let mut scene = scene();
        scene.insert_layer(Layer::new("I04", vec![1.0, 2.0]).with_area(swath()));
        scene.insert_layer(Layer::new("I05", vec![4.0, 4.0]).with_area(swath()));

        let fog = viirs::fog().evaluate(&scene).unwrap();
        assert_eq!(fog.uid(), "fog");
        assert_eq!(fog.data(), &[3.0, 2.0]);
        assert_eq!(fog.area(), Some(&swath()));
    }

    #[test]
    fn test_builtin_true_color_stack() {
        let mut scene = Scene::builder(SceneConfig::default())
            .start_time(
                chrono::NaiveDate::from_ymd_opt(2015, 3, 11)
                    .unwrap()
                    .and_hms_opt(11, 25, 11)
                    .unwrap(),
            )
            .build()
            .unwrap();
        for (uid, v) in [("M02", 2.0), ("M04", 4.0), ("M05", 5.0)] {
            scene.insert_layer(Layer::new(uid, vec![v; 2]).with_area(swath()));
        }

        let rgb = viirs::true_color().evaluate(&scene).unwrap();
        assert_eq!(rgb.data(), &[5.0, 5.0, 4.0, 4.0, 2.0, 2.0]);
        assert_eq!(rgb.info().text("mode"), Some("RGB"));
        assert!(rgb.info().time("time_slot").is_some());
    }

    #[test]
    fn test_builtin_detects_incompatible_geometry() {
        let mut scene = scene();
        scene.insert_layer(Layer::new("I04", vec![1.0, 2.0]).with_area(swath()));
        scene.insert_layer(Layer::new("I05", vec![4.0, 4.0]).with_area(Area::new("other", 1, 2)));

        assert!(matches!(
            viirs::fog().evaluate(&scene),
            Err(CompositeError::IncompatibleGeometry(_))
        ));
    }

    #[test]
    fn test_builtin_missing_input_is_a_lookup_error() {
        let mut scene = scene();
        scene.insert_layer(Layer::new("I04", vec![1.0]));
        assert!(matches!(
            viirs::fog().evaluate(&scene),
            Err(CompositeError::Lookup(_))
        ));
    }

    #[test]
    fn test_resample_copies_on_demand() {
        let mut scene = scene();
        scene.add_product("fog", viirs::fog()).unwrap();
        scene.insert_layer(Layer::new("I04", vec![1.0]).with_keep(true));
        scene.insert_layer(Layer::new("I05", vec![2.0]));
        scene.insert_layer(Layer::new("M16", vec![3.0]));

        let eurol = Area::new("eurol", 2, 2);
        let resampled = scene
            .resample(&eurol, &nearest, Some(&["I04", "I05"]))
            .unwrap();

        assert_eq!(resampled.layers().uids().collect::<Vec<_>>(), vec!["I04", "I05"]);
        assert_eq!(resampled.get("I04").unwrap().area(), Some(&eurol));
        assert_eq!(resampled.get("I04").unwrap().len(), 4);
        assert!(resampled.get("I04").unwrap().keep());
        assert!(resampled.products().contains("fog"));
        assert_eq!(resampled.info(), scene.info());
        assert_eq!(resampled.state(), SceneState::RawLoaded);

        // The source is untouched.
        assert_eq!(scene.len(), 3);
        assert_eq!(scene.get("I04").unwrap().area(), None);
    }

    #[test]
    fn test_resample_failure_names_layer() {
        let mut scene = scene();
        scene.insert_layer(Layer::new("I04", vec![1.0]));
        let failing = |_: &Layer, _: &Area| -> Result<Layer, ResampleError> { Err("no overlap".into()) };

        let err = scene.resample(&swath(), &failing, None).unwrap_err();
        assert_eq!(err.to_string(), "resampling 'I04' failed: no overlap");
    }

    #[test]
    fn test_display_lists_layers() {
        let mut scene = scene();
        scene.insert_layer(Layer::new("I04", vec![1.0]));
        scene.insert_layer(Layer::new("I05", vec![1.0, 2.0]));
        assert_eq!(scene.to_string(), "I04 (1 values)\nI05 (2 values)");
    }
}
