use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::Arc;

use crate::foundation::error::{StrataError, StrataResult};

/// Opaque image reference for one trait: a filesystem path or an in-memory byte buffer.
///
/// Equality and hashing identify the underlying asset: paths compare by value, in-memory buffers
/// by allocation identity. This is what the asset cache keys on.
#[derive(Clone, Debug)]
pub enum TraitSource {
    Path(PathBuf),
    Memory(Arc<Vec<u8>>),
}

impl TraitSource {
    pub fn path(p: impl Into<PathBuf>) -> Self {
        Self::Path(p.into())
    }

    pub fn memory(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Memory(Arc::new(bytes.into()))
    }

    /// Human-readable reference used in `AssetLoad` errors.
    pub fn describe(&self) -> String {
        match self {
            Self::Path(p) => p.display().to_string(),
            Self::Memory(bytes) => format!("<in-memory image, {} bytes>", bytes.len()),
        }
    }
}

impl PartialEq for TraitSource {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Path(a), Self::Path(b)) => a == b,
            (Self::Memory(a), Self::Memory(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for TraitSource {}

impl Hash for TraitSource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Path(p) => {
                state.write_u8(0);
                p.hash(state);
            }
            Self::Memory(bytes) => {
                state.write_u8(1);
                (Arc::as_ptr(bytes) as usize).hash(state);
            }
        }
    }
}

/// One selectable option within a layer. Immutable once registered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraitDef {
    pub name: String,
    pub source: TraitSource,
}

impl TraitDef {
    pub fn new(name: impl Into<String>, source: TraitSource) -> Self {
        Self {
            name: name.into(),
            source,
        }
    }
}

/// A named axis of visual variation, painted at a fixed stacking position.
#[derive(Clone, Debug)]
pub struct Layer {
    name: Arc<str>,
    traits: Vec<Arc<TraitDef>>,
}

impl Layer {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn name_arc(&self) -> Arc<str> {
        self.name.clone()
    }

    pub fn traits(&self) -> &[Arc<TraitDef>] {
        &self.traits
    }

    pub fn trait_count(&self) -> usize {
        self.traits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traits.is_empty()
    }
}

/// Ordered list of layers and their trait sets.
///
/// Registry order is paint order: the first layer is drawn first, at the bottom of the stack.
/// The registry is populated by the caller and read (never mutated) by the combination engine
/// and the compositor.
#[derive(Clone, Debug, Default)]
pub struct LayerRegistry {
    layers: Vec<Layer>,
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a layer with its trait set.
    ///
    /// Fails with a validation error if the layer name is empty or already present, or if two
    /// traits within the layer share a name. A layer with zero traits is accepted; it simply
    /// contributes nothing to selections and forces the combination count to 0.
    pub fn add_layer(
        &mut self,
        name: impl Into<String>,
        traits: impl IntoIterator<Item = TraitDef>,
    ) -> StrataResult<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(StrataError::validation("layer name must be non-empty"));
        }
        if self.layers.iter().any(|l| l.name() == name) {
            return Err(StrataError::validation(format!(
                "duplicate layer name '{name}'"
            )));
        }

        let traits: Vec<Arc<TraitDef>> = traits.into_iter().map(Arc::new).collect();
        for (i, t) in traits.iter().enumerate() {
            if t.name.trim().is_empty() {
                return Err(StrataError::validation(format!(
                    "layer '{name}' contains a trait with an empty name"
                )));
            }
            if traits[..i].iter().any(|prev| prev.name == t.name) {
                return Err(StrataError::validation(format!(
                    "duplicate trait name '{}' in layer '{name}'",
                    t.name
                )));
            }
        }

        self.layers.push(Layer {
            name: Arc::from(name),
            traits,
        });
        Ok(())
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Total size of the combination set: the product of every layer's trait count.
    ///
    /// An empty registry and a registry containing any zero-trait layer both yield 0. The
    /// product saturates at `u64::MAX` for absurdly large registries.
    pub fn total_combinations(&self) -> u64 {
        if self.layers.is_empty() {
            return 0;
        }
        self.layers
            .iter()
            .fold(1u64, |acc, l| acc.saturating_mul(l.trait_count() as u64))
    }
}
