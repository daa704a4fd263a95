use crate::{
    brush::{BrushConfig, Color},
    math::Vec2f,
};

/// One continuous line from pointer-down to pointer-up.
///
/// Color and width are captured from the [`BrushConfig`] when the stroke starts and never
/// change afterwards. Only the surface that owns the in-progress stroke can append points.
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    points: Vec<Vec2f>,
    color: Color,
    width: f32,
}

impl Stroke {
    pub(crate) fn begin(start: Vec2f, brush: &BrushConfig) -> Self {
        Self {
            points: vec![start],
            color: brush.color,
            width: brush.width,
        }
    }

    /// Appends `point` unless it repeats the last recorded position.
    ///
    /// Returns whether the point was recorded.
    pub(crate) fn extend_to(&mut self, point: Vec2f) -> bool {
        if self.points.last() == Some(&point) {
            return false;
        }
        self.points.push(point);
        true
    }

    /// Points in view-space pixels, in the order they were drawn. Never empty.
    pub fn points(&self) -> &[Vec2f] {
        &self.points
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn width(&self) -> f32 {
        self.width
    }
}
