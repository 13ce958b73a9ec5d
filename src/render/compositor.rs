use std::io::Cursor;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::instrument;

use crate::assets::decode::{PreparedImage, decode_image, unpremultiply_rgba8_in_place};
use crate::assets::store::AssetStore;
use crate::engine::combine::Selection;
use crate::foundation::core::Canvas;
use crate::foundation::error::{StrataError, StrataResult};
use crate::registry::model::TraitSource;
use crate::render::composite::over_in_place;

/// A flattened composite as straight-alpha RGBA8 pixels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Raster {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Straight (non-premultiplied) RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
}

impl Raster {
    /// Encode the raster as PNG bytes.
    pub fn encode_png(&self) -> StrataResult<Vec<u8>> {
        let img = image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| StrataError::validation("raster buffer does not match dimensions"))?;
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .map_err(|e| StrataError::packaging(format!("png encode failed: {e}")))?;
        Ok(buf)
    }
}

/// Renders selections onto an exclusively owned drawing surface.
///
/// One render is in flight at a time per compositor; the surface is reset at the start of every
/// [`Compositor::render`] call, so a failed render never corrupts the next one. Decoded trait
/// images are cached across renders in the embedded [`AssetStore`].
#[derive(Debug, Default)]
pub struct Compositor {
    store: AssetStore,
    /// Premultiplied RGBA8 working buffer.
    surface: Vec<u8>,
}

impl Compositor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Access the decoded-image cache (test and diagnostic use).
    pub fn assets(&self) -> &AssetStore {
        &self.store
    }

    /// Composite one selection onto a fresh canvas.
    ///
    /// Asset bytes for every entry are fetched first and cache misses are decoded jointly; the
    /// draw pass then walks the selection strictly in order, so load completion order never
    /// affects stacking. Each image is stretch-scaled to exactly `canvas` size and blended with
    /// full opacity. Any fetch or decode failure aborts this render with an `AssetLoad` error
    /// naming the trait's source; the partial composite is discarded.
    #[instrument(skip(self, selection), fields(layers = selection.len()))]
    pub fn render(&mut self, selection: &Selection, canvas: Canvas) -> StrataResult<Raster> {
        self.surface.clear();
        self.surface.resize(canvas.rgba8_len(), 0);

        let prepared = self.prepare_selection(selection)?;

        // Scaling is pure per-image work; run it jointly as well.
        let scaled = prepared
            .par_iter()
            .map(|img| scale_to_canvas(img, canvas))
            .collect::<StrataResult<Vec<Arc<Vec<u8>>>>>()?;

        // Paint order is selection order; later entries draw on top.
        for buf in &scaled {
            over_in_place(&mut self.surface, buf)?;
        }

        let mut data = self.surface.clone();
        unpremultiply_rgba8_in_place(&mut data);
        Ok(Raster {
            width: canvas.width,
            height: canvas.height,
            data,
        })
    }

    /// Resolve every entry of the selection to a decoded image, in selection order.
    fn prepare_selection(&mut self, selection: &Selection) -> StrataResult<Vec<Arc<PreparedImage>>> {
        let mut prepared: Vec<Option<Arc<PreparedImage>>> = vec![None; selection.len()];
        let mut misses: Vec<(usize, TraitSource, Arc<Vec<u8>>)> = Vec::new();

        for (i, entry) in selection.entries().iter().enumerate() {
            let source = &entry.trait_def.source;
            match self.store.get_cached(source) {
                Some(img) => prepared[i] = Some(img),
                None => {
                    let bytes = self.store.fetch_bytes(source)?;
                    misses.push((i, source.clone(), bytes));
                }
            }
        }

        let decoded: Vec<(usize, TraitSource, StrataResult<PreparedImage>)> = misses
            .into_par_iter()
            .map(|(i, source, bytes)| {
                let res = decode_image(&bytes, &source);
                (i, source, res)
            })
            .collect();

        for (i, source, res) in decoded {
            prepared[i] = Some(self.store.insert(source, res?));
        }

        prepared
            .into_iter()
            .map(|img| {
                img.ok_or_else(|| StrataError::validation("missing prepared image (bug)"))
            })
            .collect()
    }
}

/// Stretch (not crop) a decoded image to exactly the canvas size, preserving premultiplication.
fn scale_to_canvas(img: &PreparedImage, canvas: Canvas) -> StrataResult<Arc<Vec<u8>>> {
    if img.width == canvas.width && img.height == canvas.height {
        return Ok(img.rgba8_premul.clone());
    }

    let src = image::RgbaImage::from_raw(img.width, img.height, img.rgba8_premul.as_ref().clone())
        .ok_or_else(|| StrataError::validation("prepared image buffer does not match dimensions"))?;
    let resized = image::imageops::resize(
        &src,
        canvas.width,
        canvas.height,
        image::imageops::FilterType::Triangle,
    );
    Ok(Arc::new(resized.into_raw()))
}
