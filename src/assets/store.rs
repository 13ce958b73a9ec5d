use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::assets::decode::{PreparedImage, decode_image};
use crate::foundation::error::{StrataError, StrataResult};
use crate::registry::model::TraitSource;

/// Cache of decoded trait images keyed by source identity.
///
/// Traits are immutable once registered, so a source never needs re-decoding within a run. The
/// store holds decoded images at their native size; scaling to the output canvas happens per
/// render in the compositor.
#[derive(Debug, Default)]
pub struct AssetStore {
    cache: HashMap<TraitSource, Arc<PreparedImage>>,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the raw bytes behind a source. Read failures surface as `AssetLoad` naming the
    /// source reference.
    pub fn fetch_bytes(&self, source: &TraitSource) -> StrataResult<Arc<Vec<u8>>> {
        match source {
            TraitSource::Path(p) => std::fs::read(p).map(Arc::new).map_err(|e| {
                StrataError::asset_load(source.describe(), format!("read failed: {e}"))
            }),
            TraitSource::Memory(bytes) => Ok(bytes.clone()),
        }
    }

    pub fn get_cached(&self, source: &TraitSource) -> Option<Arc<PreparedImage>> {
        self.cache.get(source).cloned()
    }

    pub fn insert(&mut self, source: TraitSource, image: PreparedImage) -> Arc<PreparedImage> {
        let arc = Arc::new(image);
        self.cache.insert(source, arc.clone());
        arc
    }

    /// Load and decode one source, consulting the cache first.
    pub fn load(&mut self, source: &TraitSource) -> StrataResult<Arc<PreparedImage>> {
        if let Some(img) = self.get_cached(source) {
            return Ok(img);
        }
        debug!(source = %source.describe(), "decoding trait image");
        let bytes = self.fetch_bytes(source)?;
        let prepared = decode_image(&bytes, source)?;
        Ok(self.insert(source.clone(), prepared))
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
