use crate::foundation::error::{StrataError, StrataResult};

pub type PremulRgba8 = [u8; 4];

/// Source-over blend of premultiplied RGBA8 pixels.
///
/// Fully opaque source pixels replace the destination; transparent source pixels leave it
/// untouched, which is what lets lower layers show through a trait's transparent regions.
pub fn over(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    if src[3] == 0 {
        return dst;
    }
    if src[3] == 255 {
        return src;
    }

    let inv = 255u16 - u16::from(src[3]);

    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = src[i].saturating_add(mul_div255(u16::from(dst[i]), inv));
    }
    out
}

/// Blend `src` over `dst` pixel-by-pixel, in place. Both buffers must be equal-length
/// premultiplied RGBA8.
pub fn over_in_place(dst: &mut [u8], src: &[u8]) -> StrataResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(StrataError::validation(
            "over_in_place expects equal-length rgba8 buffers",
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]]);
        d.copy_from_slice(&out);
    }
    Ok(())
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}
