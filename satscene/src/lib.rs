//! satscene - Scene management for satellite sensor data
//!
//! A [`Scene`] is a named collection of data layers built from raw sensor
//! files. The library turns a wishlist of product names into the minimal set
//! of raw bands a reader has to load, evaluates composite products in
//! dependency order, and evicts intermediate layers once the wishlist is
//! satisfied.
//!
//! # Architecture
//!
//! ```text
//! filenames / sensor ──► binding ──► ReaderBinding(s)
//!                                        │
//! wishlist ──► product::resolve_raw_names ──► Reader::load ──► LayerStore
//!                                                                │
//!                           CompositeProduct::evaluate ◄─────────┤
//!                                                                │
//!                                        Scene::unload ◄─────────┘
//! ```
//!
//! Reader plugins, pixel math beyond the built-in composites, and
//! resampling algorithms are external collaborators plugged in through the
//! [`Reader`], [`CompositeProduct`] and [`Resampler`] traits.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use satscene::{product::viirs, LoadOptions, ReaderRegistry, Scene, SceneConfig};
//!
//! let mut registry = ReaderRegistry::new();
//! registry.register("viirs_sdr.ViirsSdrReader", |binding| Ok(Box::new(MyReader::new(binding))));
//!
//! let mut scene = Scene::builder(SceneConfig::from_env())
//!     .readers(Arc::new(registry))
//!     .filenames(files)
//!     .build()?;
//! scene.add_product("fog", viirs::fog())?;
//! scene.load(&["fog", "M16"], LoadOptions::default())?;
//! ```

pub mod binding;
pub mod config;
pub mod error;
pub mod geometry;
pub mod info;
pub mod layer;
pub mod pattern;
pub mod product;
pub mod reader;
pub mod scene;

pub use binding::ReaderBinding;
pub use config::{LoadOptions, SceneConfig, SensorLookup};
pub use error::{SceneError, SceneResult};
pub use geometry::{Area, Resampler};
pub use info::{Info, InfoValue};
pub use layer::{Layer, LayerKey, LayerStore, WavelengthRange};
pub use pattern::PatternTemplate;
pub use product::{CompositeError, CompositeProduct, ProductRegistry};
pub use reader::{LoadRequest, Reader, ReaderError, ReaderRegistry};
pub use scene::{ComputeReport, Scene, SceneBuilder, SceneState};
