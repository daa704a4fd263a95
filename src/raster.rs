use image::RgbaImage;

use crate::{
    brush::Color,
    math::{dist_to_segment, vec2, Vec2f},
};

/// A row-major RGBA8 pixel buffer with the origin in the top left corner.
///
/// All drawing is done in software and is deterministic: identical inputs produce
/// bit-identical pixmaps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pixmap {
    width: u32,
    height: u32,
    pixels: Vec<Color>,
}

impl Pixmap {
    pub fn new(width: u32, height: u32, fill: Color) -> Self {
        Self {
            width,
            height,
            pixels: vec![fill; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    #[cfg(test)]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[self.index(x, y)])
    }

    /// Raw `[r, g, b, a]` bytes, row by row without padding.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    pub fn fill(&mut self, color: Color) {
        self.pixels.fill(color);
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Draws `image` scaled (preserving its aspect ratio) so that it covers the whole pixmap,
    /// centered, with the overflowing edges cropped.
    pub fn draw_image_cover(&mut self, image: &RgbaImage) {
        let (iw, ih) = image.dimensions();
        if iw == 0 || ih == 0 || self.pixels.is_empty() {
            return;
        }

        let scale = f32::max(
            self.width as f32 / iw as f32,
            self.height as f32 / ih as f32,
        );
        let offset_x = (self.width as f32 - iw as f32 * scale) * 0.5;
        let offset_y = (self.height as f32 - ih as f32 * scale) * 0.5;

        for y in 0..self.height {
            let sy = (((y as f32 + 0.5 - offset_y) / scale) as u32).min(ih - 1);
            for x in 0..self.width {
                let sx = (((x as f32 + 0.5 - offset_x) / scale) as u32).min(iw - 1);
                let [r, g, b, a] = image.get_pixel(sx, sy).0;
                let i = self.index(x, y);
                self.pixels[i] = blend(self.pixels[i], Color::rgba(r, g, b, a), 1.0);
            }
        }
    }

    /// Strokes the polyline through `points` with anti-aliased edges, round joins and round
    /// caps. A single point produces a dot of diameter `width`.
    ///
    /// The whole polyline is composited in one pass, so segments that overlap each other do
    /// not accumulate opacity.
    pub fn stroke_polyline(&mut self, points: &[Vec2f], width: f32, color: Color) {
        let Some(&first) = points.first() else { return };
        let radius = width.max(0.0) * 0.5;
        // Coverage falls off over one pixel centered on the geometric edge.
        let reach = radius + 0.5;

        let (mut min, mut max) = (first, first);
        for p in points {
            min = vec2(min.x().min(p.x()), min.y().min(p.y()));
            max = vec2(max.x().max(p.x()), max.y().max(p.y()));
        }
        let Some(bounds) = self.clip(min, max, reach) else {
            return;
        };

        let mut coverage = vec![0.0f32; bounds.width() * bounds.height()];
        let mut cover_segment = |a: Vec2f, b: Vec2f| {
            let seg_min = vec2(a.x().min(b.x()), a.y().min(b.y()));
            let seg_max = vec2(a.x().max(b.x()), a.y().max(b.y()));
            let Some(seg) = self.clip(seg_min, seg_max, reach) else {
                return;
            };
            for y in seg.y0..seg.y1 {
                for x in seg.x0..seg.x1 {
                    let center = vec2(x as f32 + 0.5, y as f32 + 0.5);
                    let cov = (reach - dist_to_segment(center, a, b)).clamp(0.0, 1.0);
                    let slot = &mut coverage[bounds.offset(x, y)];
                    *slot = slot.max(cov);
                }
            }
        };

        if points.len() == 1 {
            cover_segment(first, first);
        } else {
            for pair in points.windows(2) {
                cover_segment(pair[0], pair[1]);
            }
        }

        for y in bounds.y0..bounds.y1 {
            for x in bounds.x0..bounds.x1 {
                let cov = coverage[bounds.offset(x, y)];
                if cov > 0.0 {
                    let i = self.index(x, y);
                    self.pixels[i] = blend(self.pixels[i], color, cov);
                }
            }
        }
    }

    /// Pixel rectangle touched by the box `min..max` grown by `margin`, clipped to the pixmap.
    fn clip(&self, min: Vec2f, max: Vec2f, margin: f32) -> Option<Bounds> {
        let clamp = |v: f32, hi: u32| v.max(0.0).min(hi as f32) as u32;
        let bounds = Bounds {
            x0: clamp((min.x() - margin).floor(), self.width),
            y0: clamp((min.y() - margin).floor(), self.height),
            x1: clamp((max.x() + margin).ceil(), self.width),
            y1: clamp((max.y() + margin).ceil(), self.height),
        };
        (bounds.x0 < bounds.x1 && bounds.y0 < bounds.y1).then_some(bounds)
    }
}

/// Half-open pixel rectangle.
#[derive(Debug, Clone, Copy)]
struct Bounds {
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
}

impl Bounds {
    fn width(&self) -> usize {
        (self.x1 - self.x0) as usize
    }

    fn height(&self) -> usize {
        (self.y1 - self.y0) as usize
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y - self.y0) as usize * self.width() + (x - self.x0) as usize
    }
}

/// Source-over compositing of `src`, scaled by `coverage`, onto `dst` (straight alpha).
fn blend(dst: Color, src: Color, coverage: f32) -> Color {
    let sa = src.a as f32 / 255.0 * coverage;
    if sa >= 1.0 {
        return src;
    }
    if sa <= 0.0 {
        return dst;
    }
    let da = dst.a as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    let channel = |s: u8, d: u8| {
        let v = (s as f32 * sa + d as f32 * da * (1.0 - sa)) / out_a;
        v.round().clamp(0.0, 255.0) as u8
    };
    Color::rgba(
        channel(src.r, dst.r),
        channel(src.g, dst.g),
        channel(src.b, dst.b),
        (out_a * 255.0).round() as u8,
    )
}
