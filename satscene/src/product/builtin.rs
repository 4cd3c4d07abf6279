//! Built-in composite products.

use crate::info::{keys, Info, InfoValue};
use crate::layer::Layer;
use crate::scene::Scene;

use super::{CompositeError, CompositeProduct};

type EvaluateFn = dyn Fn(&Scene) -> Result<Layer, CompositeError> + Send + Sync;

/// Fail with `IncompatibleGeometry` unless all layers share area and size.
fn ensure_same_geometry(layers: &[&Layer]) -> Result<(), CompositeError> {
    let Some((first, rest)) = layers.split_first() else {
        return Ok(());
    };
    for layer in rest {
        if layer.area() != first.area() {
            return Err(CompositeError::IncompatibleGeometry(format!(
                "{} is on {}, {} is on {}",
                first.uid(),
                describe_area(first),
                layer.uid(),
                describe_area(layer)
            )));
        }
        if layer.len() != first.len() {
            return Err(CompositeError::IncompatibleGeometry(format!(
                "{} has {} values, {} has {}",
                first.uid(),
                first.len(),
                layer.uid(),
                layer.len()
            )));
        }
    }
    Ok(())
}

fn describe_area(layer: &Layer) -> String {
    layer
        .area()
        .map(|a| a.to_string())
        .unwrap_or_else(|| "no area".to_string())
}

/// Pixel-wise difference of two layers: `minuend - subtrahend`.
///
/// Prerequisites are declared as `[minuend, subtrahend]` unless reordered
/// with [`DifferenceProduct::with_prerequisites`].
#[derive(Debug, Clone)]
pub struct DifferenceProduct {
    uid: String,
    minuend: String,
    subtrahend: String,
    prerequisites: Vec<String>,
}

impl DifferenceProduct {
    pub fn new(
        uid: impl Into<String>,
        minuend: impl Into<String>,
        subtrahend: impl Into<String>,
    ) -> Self {
        let minuend = minuend.into();
        let subtrahend = subtrahend.into();
        Self {
            uid: uid.into(),
            prerequisites: vec![minuend.clone(), subtrahend.clone()],
            minuend,
            subtrahend,
        }
    }

    /// Declare the prerequisites in the given order. Expansion follows it;
    /// the arithmetic does not change.
    pub fn with_prerequisites<I, S>(mut self, prerequisites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prerequisites = prerequisites.into_iter().map(Into::into).collect();
        self
    }
}

impl CompositeProduct for DifferenceProduct {
    fn prerequisites(&self) -> &[String] {
        &self.prerequisites
    }

    fn evaluate(&self, scene: &Scene) -> Result<Layer, CompositeError> {
        let minuend = scene.get(&self.minuend)?;
        let subtrahend = scene.get(&self.subtrahend)?;
        ensure_same_geometry(&[minuend, subtrahend])?;

        let data = minuend
            .data()
            .iter()
            .zip(subtrahend.data())
            .map(|(a, b)| a - b)
            .collect();

        let mut layer = Layer::new(self.uid.clone(), data);
        if let Some(area) = minuend.area() {
            layer = layer.with_area(area.clone());
        }
        Ok(layer)
    }
}

/// Channels stacked band-sequentially into one multi-channel layer.
///
/// Channels are stacked in construction order, which is also the declared
/// prerequisite order unless [`StackProduct::with_prerequisites`] says
/// otherwise.
#[derive(Debug, Clone)]
pub struct StackProduct {
    uid: String,
    channels: Vec<String>,
    prerequisites: Vec<String>,
    info: Info,
}

impl StackProduct {
    pub fn new<I, S>(uid: impl Into<String>, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let channels: Vec<String> = channels.into_iter().map(Into::into).collect();
        Self {
            uid: uid.into(),
            prerequisites: channels.clone(),
            channels,
            info: Info::new(),
        }
    }

    /// Declare the prerequisites in the given order without changing the
    /// stacking order.
    pub fn with_prerequisites<I, S>(mut self, prerequisites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prerequisites = prerequisites.into_iter().map(Into::into).collect();
        self
    }

    /// Metadata copied onto every produced layer.
    pub fn with_info(mut self, key: impl Into<String>, value: impl Into<InfoValue>) -> Self {
        self.info.insert(key, value);
        self
    }
}

impl CompositeProduct for StackProduct {
    fn prerequisites(&self) -> &[String] {
        &self.prerequisites
    }

    fn evaluate(&self, scene: &Scene) -> Result<Layer, CompositeError> {
        let channels = self
            .channels
            .iter()
            .map(|name| scene.get(name))
            .collect::<Result<Vec<_>, _>>()?;
        ensure_same_geometry(&channels)?;

        let data = channels
            .iter()
            .flat_map(|c| c.data().iter().copied())
            .collect();

        let mut layer = Layer::new(self.uid.clone(), data)
            .with_info("channels", channels.len() as i64);
        if let Some(area) = channels.first().and_then(|c| c.area()) {
            layer = layer.with_area(area.clone());
        }
        if let Some(start) = scene.info().time(keys::START_TIME) {
            layer = layer.with_info("time_slot", start);
        }
        for (key, value) in self.info.iter() {
            layer = layer.with_info(key, value.clone());
        }
        Ok(layer)
    }
}

/// A product backed by a closure.
pub struct FnProduct {
    prerequisites: Vec<String>,
    evaluate: Box<EvaluateFn>,
}

impl FnProduct {
    pub fn new<F>(prerequisites: &[&str], evaluate: F) -> Self
    where
        F: Fn(&Scene) -> Result<Layer, CompositeError> + Send + Sync + 'static,
    {
        Self {
            prerequisites: prerequisites.iter().map(|s| s.to_string()).collect(),
            evaluate: Box::new(evaluate),
        }
    }
}

impl CompositeProduct for FnProduct {
    fn prerequisites(&self) -> &[String] {
        &self.prerequisites
    }

    fn evaluate(&self, scene: &Scene) -> Result<Layer, CompositeError> {
        (self.evaluate)(scene)
    }
}

impl std::fmt::Debug for FnProduct {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnProduct")
            .field("prerequisites", &self.prerequisites)
            .finish_non_exhaustive()
    }
}

/// VIIRS products.
pub mod viirs {
    use super::{DifferenceProduct, StackProduct};

    /// Fog: I05 minus I04, declared as `[I04, I05]`.
    pub fn fog() -> DifferenceProduct {
        DifferenceProduct::new("fog", "I05", "I04").with_prerequisites(["I04", "I05"])
    }

    /// True colour RGB stacked as M05, M04, M02, declared as `[M02, M04, M05]`.
    pub fn true_color() -> StackProduct {
        StackProduct::new("true_color", ["M05", "M04", "M02"])
            .with_prerequisites(["M02", "M04", "M05"])
            .with_info("mode", "RGB")
            .with_info("stretch", "log")
    }
}
