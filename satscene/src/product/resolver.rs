//! Expansion of a wishlist into the raw band names a reader must load.

use std::collections::HashSet;

use indexmap::IndexSet;
use tracing::debug;

use super::ProductRegistry;
use crate::error::{SceneError, SceneResult};

/// Expand `wishlist` into raw (non-composite) names.
///
/// Every name registered as a product is replaced by its prerequisites,
/// transitively, until only unregistered names remain. Names keep the order
/// in which they are first reached.
///
/// # Errors
///
/// `CyclicProduct` with the offending chain if a product depends on itself
/// through other products.
pub fn resolve_raw_names<S: AsRef<str>>(
    registry: &ProductRegistry,
    wishlist: &[S],
) -> SceneResult<IndexSet<String>> {
    let mut raw = IndexSet::new();
    let mut expanded = HashSet::new();
    let mut path = Vec::new();

    for name in wishlist {
        expand(registry, name.as_ref(), &mut path, &mut expanded, &mut raw)?;
    }

    debug!(wishlist = wishlist.len(), raw = ?raw, "Resolved raw names");
    Ok(raw)
}

fn expand(
    registry: &ProductRegistry,
    name: &str,
    path: &mut Vec<String>,
    expanded: &mut HashSet<String>,
    raw: &mut IndexSet<String>,
) -> SceneResult<()> {
    let Some(product) = registry.get(name) else {
        raw.insert(name.to_string());
        return Ok(());
    };

    if let Some(pos) = path.iter().position(|p| p == name) {
        let mut chain = path[pos..].to_vec();
        chain.push(name.to_string());
        return Err(SceneError::CyclicProduct { chain });
    }
    if expanded.contains(name) {
        return Ok(());
    }

    path.push(name.to_string());
    for prerequisite in product.prerequisites() {
        expand(registry, prerequisite, path, expanded, raw)?;
    }
    path.pop();
    expanded.insert(name.to_string());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::{viirs, CompositeError, FnProduct};
    use proptest::prelude::*;

    fn product(prerequisites: &[&str]) -> FnProduct {
        FnProduct::new(prerequisites, |_| Err(CompositeError::Failed("unused".into())))
    }

    #[test]
    fn test_raw_names_pass_through() {
        let registry = ProductRegistry::new();
        let raw = resolve_raw_names(&registry, &["M05"]).unwrap();
        assert_eq!(raw.into_iter().collect::<Vec<_>>(), vec!["M05"]);
    }

    #[test]
    fn test_composites_expand_transitively() {
        let mut registry = ProductRegistry::new();
        registry.register("fog", viirs::fog()).unwrap();
        registry.register("night_fog", product(&["fog", "I01", "M16"])).unwrap();

        let raw = resolve_raw_names(&registry, &["night_fog", "M16", "true_color"]).unwrap();
        assert_eq!(
            raw.into_iter().collect::<Vec<_>>(),
            vec!["I04", "I05", "I01", "M16", "true_color"]
        );
    }

    #[test]
    fn test_diamond_expands_once() {
        let mut registry = ProductRegistry::new();
        registry.register("base", product(&["I04"])).unwrap();
        registry.register("left", product(&["base", "I01"])).unwrap();
        registry.register("right", product(&["base", "I02"])).unwrap();
        registry.register("top", product(&["left", "right"])).unwrap();

        let raw = resolve_raw_names(&registry, &["top"]).unwrap();
        assert_eq!(raw.into_iter().collect::<Vec<_>>(), vec!["I04", "I01", "I02"]);
    }

    #[test]
    fn test_cycle_is_reported() {
        let mut registry = ProductRegistry::new();
        registry.register("a", product(&["b", "I01"])).unwrap();
        registry.register("b", product(&["c"])).unwrap();
        registry.register("c", product(&["a"])).unwrap();

        let err = resolve_raw_names(&registry, &["a"]).unwrap_err();
        match err {
            SceneError::CyclicProduct { chain } => assert_eq!(chain, vec!["a", "b", "c", "a"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    proptest! {
        /// Products may only depend on lower-numbered products or raw bands,
        /// so the graph is acyclic; resolution must terminate with raw names only.
        #[test]
        fn prop_resolution_returns_only_raw_names(
            deps in prop::collection::vec(prop::collection::vec(0usize..12, 0..4), 1..8),
            wishlist in prop::collection::vec(0usize..12, 1..6),
        ) {
            let mut registry = ProductRegistry::new();
            for (i, prereqs) in deps.iter().enumerate() {
                let names: Vec<String> = prereqs
                    .iter()
                    .map(|&d| if d < i { format!("p{d}") } else { format!("B{d}") })
                    .collect();
                let refs: Vec<&str> = names.iter().map(String::as_str).collect();
                registry.register(format!("p{i}"), product(&refs)).unwrap();
            }
            let wishlist: Vec<String> = wishlist.iter().map(|i| format!("p{i}")).collect();

            let raw = resolve_raw_names(&registry, &wishlist).unwrap();
            for name in &raw {
                prop_assert!(!registry.contains(name));
            }
        }
    }
}
