use std::collections::HashSet;

use crate::engine::combine::Selection;

pub const OUTPUT_EXTENSION: &str = ".png";
const SEPARATOR: char = '_';

/// Base output filename for a selection: trait names joined by `_` in layer order, with the
/// `.png` extension. A pure function of the selection.
pub fn filename_of(selection: &Selection) -> String {
    let mut stem = String::new();
    for (i, (_, trait_name)) in selection.pairs().enumerate() {
        if i > 0 {
            stem.push(SEPARATOR);
        }
        stem.push_str(trait_name);
    }
    if stem.is_empty() {
        stem.push_str("untitled");
    }
    stem + OUTPUT_EXTENSION
}

/// Batch-scoped filename allocator.
///
/// Two distinct selections can share a base filename when two layers carry identically named
/// traits. The allocator disambiguates deterministically by appending the zero-padded sequential
/// index (padded to the batch total's digit count) whenever a name was already produced in this
/// batch.
#[derive(Debug)]
pub struct FilenameAllocator {
    seen: HashSet<String>,
    pad_width: usize,
}

impl FilenameAllocator {
    pub fn new(total: u64) -> Self {
        Self {
            seen: HashSet::new(),
            pad_width: total.max(1).to_string().len(),
        }
    }

    /// Reserve a collision-free filename for the output with the given 1-based sequential id.
    pub fn allocate(&mut self, selection: &Selection, sequential_id: u64) -> String {
        let mut candidate = filename_of(selection);
        while !self.seen.insert(candidate.clone()) {
            let stem = candidate
                .strip_suffix(OUTPUT_EXTENSION)
                .unwrap_or(&candidate)
                .to_string();
            candidate = format!(
                "{stem}{SEPARATOR}{sequential_id:0width$}{OUTPUT_EXTENSION}",
                width = self.pad_width
            );
        }
        candidate
    }
}
