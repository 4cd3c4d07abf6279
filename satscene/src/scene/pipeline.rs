//! Read, compute and unload.

use std::collections::HashSet;

use indexmap::map::Entry;
use tracing::{debug, info, warn};

use crate::config::LoadOptions;
use crate::error::{SceneError, SceneResult};
use crate::info::keys;
use crate::layer::LayerStore;
use crate::product::{resolve_raw_names, CompositeError};
use crate::reader::LoadRequest;

use super::{Scene, SceneState};

/// Outcome of a compute pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComputeReport {
    /// Products evaluated and stored, in evaluation order.
    pub computed: Vec<String>,

    /// Products whose inputs did not share a geometry. Their inputs were
    /// flagged `keep` so the scene can be resampled and computed again.
    pub deferred: Vec<String>,

    /// Products skipped because a prerequisite was never realized.
    pub unsatisfied: Vec<String>,
}

impl ComputeReport {
    /// Whether every requested product was realized.
    pub fn is_complete(&self) -> bool {
        self.deferred.is_empty() && self.unsatisfied.is_empty()
    }
}

#[derive(Default)]
struct ComputePass {
    report: ComputeReport,
    in_progress: Vec<String>,
    attempted: HashSet<String>,
}

impl Scene {
    /// Load the raw bands needed for `names`.
    ///
    /// Once `names` expands, it becomes the scene's wishlist and is recorded
    /// in the scene metadata. Layers already present are never overwritten,
    /// so reading again with an overlapping wishlist is harmless.
    ///
    /// # Errors
    ///
    /// - `CyclicProduct` if the wishlist cannot be expanded; the previous
    ///   wishlist is left in place
    /// - `UnknownReaderFormat` / `Reader` if a reader cannot be created or fails
    pub fn read<S: AsRef<str>>(&mut self, names: &[S]) -> SceneResult<()> {
        let raw = resolve_raw_names(&self.products, names)?;

        self.wishlist = names.iter().map(|n| n.as_ref().to_string()).collect();
        self.info.insert(
            keys::WISHLIST,
            self.wishlist.iter().cloned().collect::<Vec<_>>(),
        );

        if self.bindings.is_empty() {
            warn!(wishlist = ?self.wishlist, "No readers bound, nothing to read");
            return Ok(());
        }

        for (format, binding) in &self.bindings {
            let reader = match self.readers.entry(format.clone()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    debug!(format = %format, "Creating reader");
                    entry.insert(self.reader_registry.create(binding)?)
                }
            };

            let request = LoadRequest {
                names: &raw,
                filenames: binding.filenames(),
                info: &self.info,
            };
            let mut loaded = LayerStore::new();
            reader
                .load(&request, &mut loaded)
                .map_err(|source| SceneError::Reader {
                    format: format.clone(),
                    source,
                })?;

            let mut added = 0;
            for layer in loaded {
                if self.layers.contains(layer.uid()) {
                    debug!(uid = %layer.uid(), "Layer already loaded, keeping existing");
                    continue;
                }
                self.layers.insert(layer);
                added += 1;
            }
            debug!(format = %format, added, "Reader finished");
        }

        self.state = SceneState::RawLoaded;
        Ok(())
    }

    /// Evaluate every composite on the wishlist.
    pub fn compute(&mut self) -> SceneResult<ComputeReport> {
        let wishlist: Vec<String> = self.wishlist.iter().cloned().collect();
        self.compute_products(&wishlist)
    }

    /// Evaluate the composites named in `names`, prerequisites first.
    ///
    /// Names that are not registered products are ignored. A product is
    /// evaluated at most once per call, and never when its layer already
    /// exists. Products whose prerequisites are missing are skipped, and
    /// `IncompatibleGeometry` failures are recorded instead of raised; both
    /// end up in the returned report.
    ///
    /// # Errors
    ///
    /// - `CyclicProduct` if products depend on each other
    /// - `Composite` for any other product failure
    pub fn compute_products<S: AsRef<str>>(&mut self, names: &[S]) -> SceneResult<ComputeReport> {
        let mut pass = ComputePass::default();
        for name in names {
            self.compute_product(name.as_ref(), &mut pass)?;
        }

        let report = pass.report;
        info!(
            computed = report.computed.len(),
            deferred = report.deferred.len(),
            unsatisfied = report.unsatisfied.len(),
            "Compute pass finished"
        );
        self.state = SceneState::CompositesResolved;
        Ok(report)
    }

    fn compute_product(&mut self, name: &str, pass: &mut ComputePass) -> SceneResult<()> {
        let Some(product) = self.products.get(name).cloned() else {
            return Ok(());
        };
        if let Some(pos) = pass.in_progress.iter().position(|p| p == name) {
            let mut chain = pass.in_progress[pos..].to_vec();
            chain.push(name.to_string());
            return Err(SceneError::CyclicProduct { chain });
        }
        if self.layers.contains(name) || pass.attempted.contains(name) {
            return Ok(());
        }

        pass.in_progress.push(name.to_string());
        for prerequisite in product.prerequisites() {
            self.compute_product(prerequisite, pass)?;
        }
        pass.in_progress.pop();
        pass.attempted.insert(name.to_string());

        let missing: Vec<&String> = product
            .prerequisites()
            .iter()
            .filter(|p| !self.layers.contains(p))
            .collect();
        if !missing.is_empty() {
            warn!(product = name, missing = ?missing, "Skipping product with unavailable prerequisites");
            pass.report.unsatisfied.push(name.to_string());
            return Ok(());
        }

        debug!(product = name, "Evaluating product");
        match product.evaluate(self) {
            Ok(mut layer) => {
                layer.set_uid(name);
                self.layers.insert(layer);
                pass.report.computed.push(name.to_string());
            }
            Err(CompositeError::IncompatibleGeometry(reason)) => {
                for prerequisite in product.prerequisites() {
                    if let Some(layer) = self.layers.get_mut(prerequisite) {
                        layer.set_keep(true);
                    }
                }
                warn!(
                    product = name,
                    reason = %reason,
                    "Inputs do not share a geometry, keeping them for resampling"
                );
                pass.report.deferred.push(name.to_string());
            }
            Err(source) => {
                return Err(SceneError::Composite {
                    name: name.to_string(),
                    source,
                })
            }
        }
        Ok(())
    }

    /// Evict every layer that is neither on the wishlist nor flagged `keep`.
    ///
    /// Returns the number of layers evicted.
    pub fn unload(&mut self) -> usize {
        let wishlist = &self.wishlist;
        let evicted = self
            .layers
            .evict_where(|layer| !layer.keep() && !wishlist.contains(layer.uid()));

        for layer in &evicted {
            debug!(uid = %layer.uid(), "Evicted layer");
        }
        self.state = SceneState::Evictable;
        evicted.len()
    }

    /// `read`, then optionally `compute` and `unload`.
    pub fn load<S: AsRef<str>>(
        &mut self,
        names: &[S],
        options: LoadOptions,
    ) -> SceneResult<ComputeReport> {
        self.read(names)?;
        let report = if options.compute {
            self.compute()?
        } else {
            ComputeReport::default()
        };
        if options.unload {
            self.unload();
        }
        Ok(report)
    }
}
