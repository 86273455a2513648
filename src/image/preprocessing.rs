use image::{imageops, imageops::FilterType, Rgb, RgbImage};
use ndarray::Array4;

/// Gray used by YOLOv5 for letterbox padding.
const PAD_VALUE: u8 = 114;

/// Geometry of a letterbox resize, needed to map boxes back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub source_width: u32,
    pub source_height: u32,
}

impl Letterbox {
    pub fn new(source_width: u32, source_height: u32, target: u32) -> Self {
        let scale = (target as f32 / source_width as f32).min(target as f32 / source_height as f32);
        let (new_width, new_height) = Self::scaled_size(source_width, source_height, scale);

        Self {
            scale,
            pad_x: ((target - new_width) / 2) as f32,
            pad_y: ((target - new_height) / 2) as f32,
            source_width,
            source_height,
        }
    }

    fn scaled_size(width: u32, height: u32, scale: f32) -> (u32, u32) {
        (
            ((width as f32 * scale).round() as u32).max(1),
            ((height as f32 * scale).round() as u32).max(1),
        )
    }

    /// Map an x coordinate in model input space back to the source image.
    pub fn unmap_x(&self, x: f32) -> f32 {
        ((x - self.pad_x) / self.scale).clamp(0.0, self.source_width as f32)
    }

    /// Map a y coordinate in model input space back to the source image.
    pub fn unmap_y(&self, y: f32) -> f32 {
        ((y - self.pad_y) / self.scale).clamp(0.0, self.source_height as f32)
    }
}

pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// Aspect-preserving resize onto a padded `target`x`target` canvas,
    /// returned as an NCHW tensor scaled to [0, 1].
    pub fn letterbox(image: &RgbImage, target: u32) -> (Array4<f32>, Letterbox) {
        let letterbox = Letterbox::new(image.width(), image.height(), target);
        let (new_width, new_height) =
            Letterbox::scaled_size(image.width(), image.height(), letterbox.scale);

        let resized = imageops::resize(image, new_width, new_height, FilterType::Triangle);

        let mut canvas = RgbImage::from_pixel(target, target, Rgb([PAD_VALUE; 3]));
        let left = ((target - new_width) / 2) as i64;
        let top = ((target - new_height) / 2) as i64;
        imageops::overlay(&mut canvas, &resized, left, top);

        (Self::to_tensor(&canvas), letterbox)
    }

    fn to_tensor(image: &RgbImage) -> Array4<f32> {
        let (width, height) = image.dimensions();
        let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));

        for (x, y, pixel) in image.enumerate_pixels() {
            for c in 0..3 {
                tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
            }
        }

        tensor
    }
}
