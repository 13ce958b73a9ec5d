use crate::foundation::error::{StrataError, StrataResult};

/// Output canvas dimensions in pixels.
///
/// Every trait image is stretch-scaled to exactly this size before drawing, so the canvas fully
/// determines the output raster dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> StrataResult<Self> {
        if width == 0 || height == 0 {
            return Err(StrataError::validation("Canvas dimensions must be > 0"));
        }
        Ok(Self { width, height })
    }

    /// Byte length of a tightly packed RGBA8 buffer of this size.
    pub fn rgba8_len(self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canvas_rejects_zero_dimensions() {
        assert!(Canvas::new(0, 10).is_err());
        assert!(Canvas::new(10, 0).is_err());
        assert!(Canvas::new(10, 10).is_ok());
    }

    #[test]
    fn rgba8_len_is_w_h_4() {
        assert_eq!(Canvas::new(3, 2).unwrap().rgba8_len(), 24);
    }
}
