use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::foundation::error::{StrataError, StrataResult};
use crate::registry::model::{LayerRegistry, TraitDef, TraitSource};

const DEFAULT_FILENAME_TEMPLATE: &str = "{layer}_{trait}.png";

/// JSON description of a registry: the typed configuration surface callers load layers from.
///
/// Trait sources come in two forms, matching the two ways collections are usually organized:
/// an explicit `source` path per trait, or a bare trait-name list expanded through the
/// manifest's `path_prefix` + `filename_template` (placeholders `{layer}` and `{trait}`).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub path_prefix: Option<String>,
    /// Template applied to `trait_names` entries. Defaults to `{layer}_{trait}.png`.
    #[serde(default)]
    pub filename_template: Option<String>,
    pub layers: Vec<LayerManifest>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LayerManifest {
    pub name: String,
    /// Traits with explicit image paths, relative to the assets root.
    #[serde(default)]
    pub traits: Vec<TraitManifest>,
    /// Trait names expanded through the manifest's path template.
    #[serde(default)]
    pub trait_names: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TraitManifest {
    pub name: String,
    pub source: String,
}

impl Manifest {
    pub fn from_json_str(json: &str) -> StrataResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| StrataError::validation(format!("manifest parse failed: {e}")))
    }

    pub fn from_json_reader(reader: impl std::io::Read) -> StrataResult<Self> {
        serde_json::from_reader(reader)
            .map_err(|e| StrataError::validation(format!("manifest parse failed: {e}")))
    }

    /// Resolve the manifest into a registry, joining every source against `assets_root`.
    pub fn resolve(&self, assets_root: &Path) -> StrataResult<LayerRegistry> {
        let template = self
            .filename_template
            .as_deref()
            .unwrap_or(DEFAULT_FILENAME_TEMPLATE);
        let prefix = self.path_prefix.as_deref().unwrap_or("");

        let mut registry = LayerRegistry::new();
        for layer in &self.layers {
            let mut traits = Vec::with_capacity(layer.traits.len() + layer.trait_names.len());
            for t in &layer.traits {
                traits.push(TraitDef::new(
                    t.name.clone(),
                    TraitSource::path(assets_root.join(&t.source)),
                ));
            }
            for name in &layer.trait_names {
                let rel = format!(
                    "{prefix}{}",
                    template
                        .replace("{layer}", &layer.name)
                        .replace("{trait}", name)
                );
                traits.push(TraitDef::new(
                    name.clone(),
                    TraitSource::path(assets_root.join(rel)),
                ));
            }
            registry.add_layer(layer.name.clone(), traits)?;
        }
        Ok(registry)
    }
}
