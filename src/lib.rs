//! Strata generates composite avatar images by combining ordered image layers.
//!
//! The core pipeline is:
//!
//! - Populate a [`LayerRegistry`] with ordered layers and their named traits
//! - Pick one trait per layer ([`select_random`]) or enumerate the full Cartesian product
//!   ([`Combinations`])
//! - Composite each [`Selection`] into a flattened [`Raster`] with a [`Compositor`]
//! - Batch-export every combination into a zip archive with a [`BatchExporter`] streaming into
//!   an [`OutputSink`]
//!
//! Registry order is paint order: the first layer lands at the bottom of the stack.
#![forbid(unsafe_code)]

pub mod assets;
pub mod engine;
pub mod export;
pub mod foundation;
pub mod registry;
pub mod render;

pub use crate::foundation::core::Canvas;
pub use crate::foundation::error::{StrataError, StrataResult};

pub use crate::assets::decode::PreparedImage;
pub use crate::assets::store::AssetStore;
pub use crate::engine::combine::{Combinations, Selection, SelectionEntry, select_random};
pub use crate::export::filename::{FilenameAllocator, filename_of};
pub use crate::export::packager::{
    BatchExporter, BatchSummary, CancelToken, GeneratedOutput, InMemorySink, OutputSink, Phase,
    Progress, SinkConfig, SkippedCombination, ZipSink, package,
};
pub use crate::registry::manifest::{LayerManifest, Manifest, TraitManifest};
pub use crate::registry::model::{Layer, LayerRegistry, TraitDef, TraitSource};
pub use crate::render::compositor::{Compositor, Raster};
