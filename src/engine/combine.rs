use std::sync::Arc;

use rand::Rng;

use crate::registry::model::{LayerRegistry, TraitDef};

/// One chosen trait for one layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionEntry {
    pub layer: Arc<str>,
    pub trait_def: Arc<TraitDef>,
}

/// An ordered choice of one trait per participating layer, in registry (paint) order.
///
/// Produced fresh per generation; never persisted by the engine.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    entries: Vec<SelectionEntry>,
}

impl Selection {
    pub(crate) fn from_entries(entries: Vec<SelectionEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[SelectionEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `(layer, trait)` name pairs in paint order, for callers displaying what was selected.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|e| (&*e.layer, e.trait_def.name.as_str()))
    }
}

/// Draw one trait per layer with a uniform distribution over that layer's traits.
///
/// Layers with zero traits are skipped rather than failing: a layer contributing nothing simply
/// has no entry in the returned selection. The RNG is injected so callers can seed it for
/// deterministic output.
pub fn select_random<R: Rng + ?Sized>(registry: &LayerRegistry, rng: &mut R) -> Selection {
    let mut entries = Vec::with_capacity(registry.layers().len());
    for layer in registry.layers() {
        let traits = layer.traits();
        if traits.is_empty() {
            continue;
        }
        let idx = rng.gen_range(0..traits.len());
        entries.push(SelectionEntry {
            layer: layer.name_arc(),
            trait_def: traits[idx].clone(),
        });
    }
    Selection::from_entries(entries)
}

/// Lazy enumeration of the full Cartesian product of all layers' trait sets.
///
/// Layer order is the dimension order: combination index `i`, written in the mixed-radix system
/// of per-layer trait counts, selects one trait per layer with the last layer varying fastest.
/// The order is deterministic and reproducible for identical registry contents, and the iterator
/// is restartable by constructing a new one from the same registry.
///
/// An empty registry, or a registry containing any zero-trait layer, enumerates nothing.
#[derive(Clone, Debug)]
pub struct Combinations {
    layers: Vec<(Arc<str>, Vec<Arc<TraitDef>>)>,
    indices: Vec<usize>,
    remaining: u64,
}

impl Combinations {
    pub fn new(registry: &LayerRegistry) -> Self {
        let layers: Vec<(Arc<str>, Vec<Arc<TraitDef>>)> = registry
            .layers()
            .iter()
            .map(|l| (l.name_arc(), l.traits().to_vec()))
            .collect();
        let remaining = registry.total_combinations();
        let indices = vec![0; layers.len()];
        Self {
            layers,
            indices,
            remaining,
        }
    }

    fn current(&self) -> Selection {
        let entries = self
            .layers
            .iter()
            .zip(&self.indices)
            .map(|((name, traits), &i)| SelectionEntry {
                layer: name.clone(),
                trait_def: traits[i].clone(),
            })
            .collect();
        Selection::from_entries(entries)
    }

    /// Odometer step: increment the last dimension, carrying left.
    fn advance(&mut self) {
        for dim in (0..self.layers.len()).rev() {
            self.indices[dim] += 1;
            if self.indices[dim] < self.layers[dim].1.len() {
                return;
            }
            self.indices[dim] = 0;
        }
    }
}

impl Iterator for Combinations {
    type Item = Selection;

    fn next(&mut self) -> Option<Selection> {
        if self.remaining == 0 {
            return None;
        }
        let sel = self.current();
        self.advance();
        self.remaining -= 1;
        Some(sel)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = usize::try_from(self.remaining).ok();
        (n.unwrap_or(usize::MAX), n)
    }
}
