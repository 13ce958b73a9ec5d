use std::sync::Arc;

use crate::foundation::error::{StrataError, StrataResult};
use crate::registry::model::TraitSource;

/// Decoded trait image in premultiplied RGBA8 form, ready for compositing.
#[derive(Clone, Debug)]
pub struct PreparedImage {
    pub width: u32,
    pub height: u32,
    /// Premultiplied RGBA8, row-major, tightly packed.
    pub rgba8_premul: Arc<Vec<u8>>,
}

/// Decode image bytes into a [`PreparedImage`].
///
/// Decode failures are reported as `AssetLoad` naming the trait's source reference.
pub fn decode_image(bytes: &[u8], source: &TraitSource) -> StrataResult<PreparedImage> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| StrataError::asset_load(source.describe(), format!("decode failed: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(StrataError::asset_load(
            source.describe(),
            "decoded image has zero dimensions",
        ));
    }

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

pub(crate) fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

pub(crate) fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 || a == 255 {
            continue;
        }
        px[0] = ((px[0] as u16 * 255 + a / 2) / a).min(255) as u8;
        px[1] = ((px[1] as u16 * 255 + a / 2) / a).min(255) as u8;
        px[2] = ((px[2] as u16 * 255 + a / 2) / a).min(255) as u8;
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn png_bytes(width: u32, height: u32, rgba: Vec<u8>) -> Vec<u8> {
        let img = image::RgbaImage::from_raw(width, height, rgba).unwrap();
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn decode_image_png_dimensions_and_premul() {
        let buf = png_bytes(1, 1, vec![100u8, 50u8, 200u8, 128u8]);
        let src = TraitSource::memory(buf.clone());

        let prepared = decode_image(&buf, &src).unwrap();
        assert_eq!(prepared.width, 1);
        assert_eq!(prepared.height, 1);
        assert_eq!(
            prepared.rgba8_premul.as_slice(),
            &[
                ((100u16 * 128 + 127) / 255) as u8,
                ((50u16 * 128 + 127) / 255) as u8,
                ((200u16 * 128 + 127) / 255) as u8,
                128u8
            ]
        );
    }

    #[test]
    fn decode_failure_names_the_source() {
        let src = TraitSource::path("layers/broken.png");
        let err = decode_image(b"not an image", &src).unwrap_err();
        assert!(err.to_string().contains("layers/broken.png"));
    }

    #[test]
    fn premul_then_unpremul_preserves_opaque_and_transparent() {
        let mut px = vec![10u8, 20, 30, 255, 40, 50, 60, 0];
        premultiply_rgba8_in_place(&mut px);
        unpremultiply_rgba8_in_place(&mut px);
        assert_eq!(px, vec![10, 20, 30, 255, 0, 0, 0, 0]);
    }
}
