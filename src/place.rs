//! Shared pixel canvas in the style of r/place.

use crate::persistent_state::write_atomically;
use anyhow::{anyhow, Result};
use image::{imageops::FilterType, ImageFormat, Rgb, RgbImage};
use std::{io::Cursor, path::Path};

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

pub struct Canvas {
    image: RgbImage,
}

impl Canvas {
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            image: RgbImage::from_pixel(width, height, BACKGROUND),
        }
    }

    /// Load the canvas at `path`, or start a blank one if there is none yet.  A stored canvas with
    /// different dimensions is cropped or padded to the requested size.
    pub async fn load_or_blank(path: &Path, width: u32, height: u32) -> Result<Self> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::blank(width, height))
            }
            Err(e) => {
                return Err(anyhow!(
                    "Could not read canvas at `{}`: {}",
                    path.to_string_lossy(),
                    e
                ))
            }
        };

        let stored = image::load_from_memory(&bytes)
            .map_err(|e| {
                anyhow!(
                    "Could not decode canvas at `{}`: {}",
                    path.to_string_lossy(),
                    e
                )
            })?
            .to_rgb8();

        let mut canvas = Self::blank(width, height);
        for (x, y, pixel) in stored.enumerate_pixels() {
            if x < width && y < height {
                canvas.image.put_pixel(x, y, *pixel);
            }
        }
        Ok(canvas)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        write_atomically(path, &encode_png(&self.image)?).await
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn get(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        self.image.get_pixel_checked(x, y).map(|pixel| pixel.0)
    }

    /// Returns false if the coordinates are outside the canvas.
    pub fn set(&mut self, x: u32, y: u32, color: [u8; 3]) -> bool {
        match self.image.get_pixel_mut_checked(x, y) {
            Some(pixel) => {
                *pixel = Rgb(color);
                true
            }
            None => false,
        }
    }

    /// PNG with every pixel blown up to a `scale`x`scale` square
    pub fn render(&self, scale: u32) -> Result<Vec<u8>> {
        let scaled = image::imageops::resize(
            &self.image,
            self.width() * scale,
            self.height() * scale,
            FilterType::Nearest,
        );
        encode_png(&scaled)
    }
}

fn encode_png(image: &RgbImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| anyhow!("Could not encode canvas: {}", e))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn set_inside_and_outside() {
        let mut canvas = Canvas::blank(4, 3);
        assert!(canvas.set(3, 2, [1, 2, 3]));
        assert!(!canvas.set(4, 0, [1, 2, 3]));
        assert!(!canvas.set(0, 3, [1, 2, 3]));
        assert_eq!(canvas.get(3, 2), Some([1, 2, 3]));
        assert_eq!(canvas.get(0, 0), Some([255, 255, 255]));
        assert_eq!(canvas.get(9, 9), None);
    }

    #[test]
    fn render_scales_pixels() {
        let mut canvas = Canvas::blank(2, 2);
        canvas.set(1, 0, [255, 0, 0]);

        let png = canvas.render(5).unwrap();
        let rendered = image::load_from_memory(&png).unwrap().to_rgb8();
        assert_eq!(rendered.dimensions(), (10, 10));
        assert_eq!(rendered.get_pixel(5, 0).0, [255, 0, 0]);
        assert_eq!(rendered.get_pixel(9, 4).0, [255, 0, 0]);
        assert_eq!(rendered.get_pixel(4, 4).0, [255, 255, 255]);
        assert_eq!(rendered.get_pixel(5, 5).0, [255, 255, 255]);
    }

    #[tokio::test]
    async fn saved_canvas_is_reloaded_and_resized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("place.png");

        let missing = Canvas::load_or_blank(&path, 3, 3).await.unwrap();
        assert_eq!((missing.width(), missing.height()), (3, 3));

        let mut canvas = Canvas::blank(3, 3);
        canvas.set(0, 0, [0, 0, 0]);
        canvas.set(2, 2, [10, 20, 30]);
        canvas.save(&path).await.unwrap();

        let same = Canvas::load_or_blank(&path, 3, 3).await.unwrap();
        assert_eq!(same.get(0, 0), Some([0, 0, 0]));
        assert_eq!(same.get(2, 2), Some([10, 20, 30]));

        let smaller = Canvas::load_or_blank(&path, 2, 4).await.unwrap();
        assert_eq!((smaller.width(), smaller.height()), (2, 4));
        assert_eq!(smaller.get(0, 0), Some([0, 0, 0]));
        assert_eq!(smaller.get(1, 3), Some([255, 255, 255]));
    }
}
