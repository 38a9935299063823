//! Camera frames as planar float tensors.

use std::path::Path;

use image::RgbImage;
use tracing::debug;

use crate::PlannerError;

/// Number of color channels in an [`ImageTensor`].
pub const CHANNELS: usize = 3;

/// An RGB frame laid out as a `[1, 3, H, W]` tensor with values in `[0, 1]`.
///
/// Storage is channel-major: all red values first, then green, then blue, each
/// plane in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    height: usize,
    width: usize,
    data: Vec<f32>,
}

impl ImageTensor {
    /// Load an image from disk and convert it to a tensor.
    ///
    /// # Errors
    ///
    /// Returns `PlannerError::ImageNotFound` if `path` does not exist and
    /// `PlannerError::ImageDecode` if the file cannot be decoded.
    pub fn load(path: &Path) -> Result<Self, PlannerError> {
        if !path.exists() {
            return Err(PlannerError::ImageNotFound(path.to_path_buf()));
        }
        let rgb = image::open(path)
            .map_err(|source| PlannerError::ImageDecode {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgb8();
        let tensor = Self::from_rgb(&rgb);
        debug!(path = %path.display(), shape = ?tensor.shape(), "Loaded image tensor");
        Ok(tensor)
    }

    /// Convert a decoded RGB image, scaling each 8-bit channel into `[0, 1]`.
    pub fn from_rgb(rgb: &RgbImage) -> Self {
        let width = rgb.width() as usize;
        let height = rgb.height() as usize;
        let plane = width * height;
        let mut data = vec![0.0f32; CHANNELS * plane];
        for (x, y, pixel) in rgb.enumerate_pixels() {
            let offset = y as usize * width + x as usize;
            for c in 0..CHANNELS {
                data[c * plane + offset] = f32::from(pixel[c]) / 255.0;
            }
        }
        ImageTensor {
            height,
            width,
            data,
        }
    }

    /// Tensor shape `[batch, channels, height, width]`.
    pub fn shape(&self) -> [usize; 4] {
        [1, CHANNELS, self.height, self.width]
    }

    /// Image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Raw channel-major data.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Value of channel `c` at row `y`, column `x`.
    pub fn get(&self, c: usize, y: usize, x: usize) -> Option<f32> {
        if c >= CHANNELS || y >= self.height || x >= self.width {
            return None;
        }
        self.data
            .get(c * self.height * self.width + y * self.width + x)
            .copied()
    }

    /// Mean Rec. 601 luma over the frame, `0` for an empty image.
    pub fn mean_luma(&self) -> f32 {
        let plane = self.height * self.width;
        if plane == 0 {
            return 0.0;
        }
        let (r, rest) = self.data.split_at(plane);
        let (g, b) = rest.split_at(plane);
        let sum: f32 = r
            .iter()
            .zip(g)
            .zip(b)
            .map(|((r, g), b)| 0.299 * r + 0.587 * g + 0.114 * b)
            .sum();
        sum / plane as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_from_rgb_layout() {
        let mut rgb = RgbImage::new(2, 1);
        rgb.put_pixel(0, 0, Rgb([255, 0, 0]));
        rgb.put_pixel(1, 0, Rgb([0, 255, 51]));
        let tensor = ImageTensor::from_rgb(&rgb);

        assert_eq!(tensor.shape(), [1, 3, 1, 2]);
        // R plane, then G plane, then B plane.
        assert_eq!(tensor.data(), &[1.0, 0.0, 0.0, 1.0, 0.0, 0.2]);
        assert_eq!(tensor.get(1, 0, 1), Some(1.0));
        assert_eq!(tensor.get(3, 0, 0), None);
        assert_eq!(tensor.get(0, 1, 0), None);
    }

    #[test]
    fn test_mean_luma() {
        let white = RgbImage::from_pixel(4, 3, Rgb([255, 255, 255]));
        assert!((ImageTensor::from_rgb(&white).mean_luma() - 1.0).abs() < 1e-5);

        let black = RgbImage::new(4, 3);
        assert_eq!(ImageTensor::from_rgb(&black).mean_luma(), 0.0);

        let empty = RgbImage::new(0, 0);
        assert_eq!(ImageTensor::from_rgb(&empty).mean_luma(), 0.0);
    }

    #[test]
    fn test_load_missing_file() {
        let path = Path::new("definitely/not/here/test_scene.jpg");
        let err = ImageTensor::load(path).unwrap_err();
        assert!(matches!(err, PlannerError::ImageNotFound(_)));
        assert!(err.to_string().starts_with("Image file not found"));
    }

    #[test]
    fn test_load_png_roundtrip() {
        let path = std::env::temp_dir().join(format!("ego-planner-tensor-{}.png", std::process::id()));
        RgbImage::from_pixel(3, 2, Rgb([0, 0, 255])).save(&path).unwrap();

        let tensor = ImageTensor::load(&path).unwrap();
        assert_eq!(tensor.shape(), [1, 3, 2, 3]);
        assert_eq!(tensor.get(2, 1, 2), Some(1.0));
        std::fs::remove_file(&path).unwrap();
    }
}
