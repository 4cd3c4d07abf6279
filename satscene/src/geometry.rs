//! Spatial referencing and the resampling boundary.

use std::fmt;

use crate::layer::Layer;

/// Error type returned by resampling collaborators.
pub type ResampleError = Box<dyn std::error::Error + Send + Sync>;

/// Description of a grid a layer is referenced to.
///
/// Two layers can be combined pixel-by-pixel only when their areas are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Area {
    /// Area identifier (e.g. a swath id or a named projection such as "eurol").
    pub id: String,
    /// Number of rows in the grid.
    pub rows: usize,
    /// Number of columns in the grid.
    pub cols: usize,
}

impl Area {
    pub fn new(id: impl Into<String>, rows: usize, cols: usize) -> Self {
        Self {
            id: id.into(),
            rows,
            cols,
        }
    }

    /// Number of pixels in the grid.
    pub fn size(&self) -> usize {
        self.rows * self.cols
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}x{})", self.id, self.rows, self.cols)
    }
}

/// Geometry resampling collaborator.
///
/// Implementations project one layer onto `destination` and return the new
/// layer. The source layer is never modified.
pub trait Resampler {
    fn resample(&self, layer: &Layer, destination: &Area) -> Result<Layer, ResampleError>;
}

impl<F> Resampler for F
where
    F: Fn(&Layer, &Area) -> Result<Layer, ResampleError>,
{
    fn resample(&self, layer: &Layer, destination: &Area) -> Result<Layer, ResampleError> {
        self(layer, destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area_size_and_display() {
        let area = Area::new("eurol", 3, 4);
        assert_eq!(area.size(), 12);
        assert_eq!(area.to_string(), "eurol (3x4)");
    }

    #[test]
    fn test_closure_resampler() {
        let nearest = |layer: &Layer, dest: &Area| -> Result<Layer, ResampleError> {
            Ok(layer.clone().with_area(dest.clone()))
        };
        let layer = Layer::new("I04", vec![1.0; 4]).with_area(Area::new("swath", 2, 2));
        let out = nearest.resample(&layer, &Area::new("eurol", 2, 2)).unwrap();

        assert_eq!(out.area().map(|a| a.id.as_str()), Some("eurol"));
        assert_eq!(layer.area().map(|a| a.id.as_str()), Some("swath"));
    }
}
