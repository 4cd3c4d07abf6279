//! Layers (raw bands and computed products) and the per-scene layer store.

use std::fmt;

use indexmap::IndexMap;

use crate::error::{SceneError, SceneResult};
use crate::geometry::Area;
use crate::info::{Info, InfoValue};

/// Spectral range of a sensor band in micrometres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WavelengthRange {
    pub lo: f64,
    pub center: f64,
    pub hi: f64,
}

impl WavelengthRange {
    pub fn new(lo: f64, center: f64, hi: f64) -> Self {
        Self { lo, center, hi }
    }

    /// Whether `x` lies within `[lo, hi]`.
    pub fn contains(&self, x: f64) -> bool {
        self.lo <= x && x <= self.hi
    }

    /// Distance from `x` to the band centre.
    pub fn distance(&self, x: f64) -> f64 {
        (self.center - x).abs()
    }
}

/// One named unit of data held by a scene.
///
/// A layer exclusively owns its payload. Cloning a layer copies it.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    uid: String,
    wavelength_range: Option<WavelengthRange>,
    resolution: Option<f64>,
    area: Option<Area>,
    keep: bool,
    info: Info,
    data: Vec<f32>,
}

impl Layer {
    pub fn new(uid: impl Into<String>, data: Vec<f32>) -> Self {
        Self {
            uid: uid.into(),
            wavelength_range: None,
            resolution: None,
            area: None,
            keep: false,
            info: Info::new(),
            data,
        }
    }

    pub fn with_wavelength(mut self, lo: f64, center: f64, hi: f64) -> Self {
        self.wavelength_range = Some(WavelengthRange::new(lo, center, hi));
        self
    }

    pub fn with_resolution(mut self, resolution: f64) -> Self {
        self.resolution = Some(resolution);
        self
    }

    pub fn with_area(mut self, area: Area) -> Self {
        self.area = Some(area);
        self
    }

    pub fn with_keep(mut self, keep: bool) -> Self {
        self.keep = keep;
        self
    }

    pub fn with_info(mut self, key: impl Into<String>, value: impl Into<InfoValue>) -> Self {
        self.info.insert(key, value);
        self
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub(crate) fn set_uid(&mut self, uid: impl Into<String>) {
        self.uid = uid.into();
    }

    pub fn wavelength_range(&self) -> Option<WavelengthRange> {
        self.wavelength_range
    }

    pub fn resolution(&self) -> Option<f64> {
        self.resolution
    }

    pub fn area(&self) -> Option<&Area> {
        self.area.as_ref()
    }

    /// Whether the layer survives eviction regardless of the wishlist.
    pub fn keep(&self) -> bool {
        self.keep
    }

    pub fn set_keep(&mut self, keep: bool) {
        self.keep = keep;
    }

    pub fn info(&self) -> &Info {
        &self.info
    }

    pub fn info_mut(&mut self) -> &mut Info {
        &mut self.info
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uid)?;
        if let Some(wl) = self.wavelength_range {
            write!(f, " [{}, {}, {}]um", wl.lo, wl.center, wl.hi)?;
        }
        if let Some(res) = self.resolution {
            write!(f, " {}m", res)?;
        }
        if let Some(area) = &self.area {
            write!(f, " on {}", area)?;
        }
        write!(f, " ({} values", self.data.len())?;
        if self.keep {
            write!(f, ", keep")?;
        }
        write!(f, ")")
    }
}

/// Key for looking up a layer: by uid or by wavelength.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LayerKey<'a> {
    Name(&'a str),
    Wavelength(f64),
}

impl<'a> From<&'a str> for LayerKey<'a> {
    fn from(name: &'a str) -> Self {
        LayerKey::Name(name)
    }
}

impl<'a> From<&'a String> for LayerKey<'a> {
    fn from(name: &'a String) -> Self {
        LayerKey::Name(name)
    }
}

impl From<f64> for LayerKey<'_> {
    fn from(wavelength: f64) -> Self {
        LayerKey::Wavelength(wavelength)
    }
}

/// Insertion-ordered map of realized layers keyed by uid.
#[derive(Debug, Clone, Default)]
pub struct LayerStore {
    layers: IndexMap<String, Layer>,
}

impl LayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a layer under its uid, replacing any previous layer with that uid.
    pub fn insert(&mut self, layer: Layer) -> Option<Layer> {
        self.layers.insert(layer.uid.clone(), layer)
    }

    pub fn get(&self, uid: &str) -> Option<&Layer> {
        self.layers.get(uid)
    }

    pub fn get_mut(&mut self, uid: &str) -> Option<&mut Layer> {
        self.layers.get_mut(uid)
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.layers.contains_key(uid)
    }

    /// Look up a layer by uid or by wavelength.
    pub fn lookup(&self, key: LayerKey<'_>) -> SceneResult<&Layer> {
        match key {
            LayerKey::Name(uid) => self
                .get(uid)
                .ok_or_else(|| SceneError::NotFound(uid.to_string())),
            LayerKey::Wavelength(x) => self.closest_to_wavelength(x),
        }
    }

    /// The layer whose band centre is closest to `x` among those whose range
    /// contains `x`. Equidistant candidates resolve to the first inserted.
    pub fn closest_to_wavelength(&self, x: f64) -> SceneResult<&Layer> {
        let mut best: Option<(&Layer, f64)> = None;
        for layer in self.layers.values() {
            let Some(range) = layer.wavelength_range.filter(|r| r.contains(x)) else {
                continue;
            };
            let distance = range.distance(x);
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((layer, distance));
            }
        }
        best.map(|(layer, _)| layer)
            .ok_or(SceneError::NoLayerAtWavelength(x))
    }

    /// Remove and return the layers for which `evict` returns true.
    pub(crate) fn evict_where(&mut self, mut evict: impl FnMut(&Layer) -> bool) -> Vec<Layer> {
        let uids: Vec<String> = self
            .layers
            .values()
            .filter(|layer| evict(layer))
            .map(|layer| layer.uid.clone())
            .collect();
        uids.iter()
            .filter_map(|uid| self.layers.shift_remove(uid))
            .collect()
    }

    pub fn uids(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.values()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl IntoIterator for LayerStore {
    type Item = Layer;
    type IntoIter = indexmap::map::IntoValues<String, Layer>;

    fn into_iter(self) -> Self::IntoIter {
        self.layers.into_values()
    }
}
