use std::path::{Path, PathBuf};

use image::RgbaImage;

use crate::{brush::Color, raster::Pixmap};

#[derive(Debug, thiserror::Error)]
#[error("failed to load background image '{}': {source}", .path.display())]
pub struct BackgroundError {
    pub path: PathBuf,
    pub source: image::ImageError,
}

/// What is painted beneath all strokes: a solid color, optionally covered by an image.
#[derive(Debug, Clone, PartialEq)]
pub struct Background {
    color: Color,
    image: Option<RgbaImage>,
}

impl Background {
    pub fn solid(color: Color) -> Self {
        Self { color, image: None }
    }

    pub fn with_image(color: Color, image: RgbaImage) -> Self {
        Self {
            color,
            image: Some(image),
        }
    }

    /// Decodes the image at `path` (any format enabled for the `image` crate).
    pub fn load(color: Color, path: &Path) -> Result<Self, BackgroundError> {
        let image = image::open(path)
            .map_err(|source| BackgroundError {
                path: path.to_owned(),
                source,
            })?
            .to_rgba8();
        log::debug!(
            "decoded background '{}' ({}x{})",
            path.display(),
            image.width(),
            image.height()
        );
        Ok(Self::with_image(color, image))
    }

    #[cfg(test)]
    pub fn image(&self) -> Option<&RgbaImage> {
        self.image.as_ref()
    }

    pub fn paint(&self, target: &mut Pixmap) {
        target.fill(self.color);
        if let Some(image) = &self.image {
            target.draw_image_cover(image);
        }
    }
}

impl Default for Background {
    fn default() -> Self {
        Self::solid(Color::WHITE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_reports_path() {
        let path = Path::new("definitely/not/here.png");
        let err = Background::load(Color::WHITE, path).unwrap_err();
        assert_eq!(err.path, path);
        assert!(err.to_string().contains("here.png"));
    }

    #[test]
    fn solid_paint_fills_everything() {
        let mut pm = Pixmap::new(3, 3, Color::TRANSPARENT);
        Background::solid(Color::rgb(1, 2, 3)).paint(&mut pm);
        assert!(pm.pixels().iter().all(|&p| p == Color::rgb(1, 2, 3)));
    }
}
