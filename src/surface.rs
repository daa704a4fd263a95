use std::mem;

use crate::{
    background::Background,
    brush::{BrushConfig, Color},
    math::Vec2f,
    raster::Pixmap,
    stroke::Stroke,
};

/// The drawing canvas: finished strokes, the stroke being drawn, the brush and the background.
///
/// Strokes are painted in the order they were finished, with the in-progress stroke on top.
#[derive(Debug, Default)]
pub struct DrawingSurface {
    brush: BrushConfig,
    background: Background,
    strokes: Vec<Stroke>,
    current: Option<Stroke>,
    needs_redraw: bool,
}

impl DrawingSurface {
    pub fn new(brush: BrushConfig, background: Background) -> Self {
        Self {
            brush,
            background,
            strokes: Vec::new(),
            current: None,
            needs_redraw: true,
        }
    }

    #[cfg(test)]
    pub fn brush(&self) -> &BrushConfig {
        &self.brush
    }

    #[cfg(test)]
    pub fn background(&self) -> &Background {
        &self.background
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn current_stroke(&self) -> Option<&Stroke> {
        self.current.as_ref()
    }

    /// Starts a new stroke at `pos` using the current brush.
    ///
    /// If a stroke is already in progress (a missed pointer-up), it is committed first.
    pub fn pointer_down(&mut self, pos: Vec2f) {
        if self.current.is_some() {
            log::debug!("pointer down while drawing, committing previous stroke");
            self.pointer_up();
        }
        self.current = Some(Stroke::begin(pos, &self.brush));
        self.needs_redraw = true;
    }

    /// Extends the in-progress stroke. Ignored when no stroke is in progress.
    pub fn pointer_move(&mut self, pos: Vec2f) {
        if let Some(stroke) = &mut self.current {
            if stroke.extend_to(pos) {
                self.needs_redraw = true;
            }
        }
    }

    /// Commits the in-progress stroke. Ignored when no stroke is in progress.
    pub fn pointer_up(&mut self) {
        if let Some(stroke) = self.current.take() {
            self.strokes.push(stroke);
            self.needs_redraw = true;
        }
    }

    /// Drops the in-progress stroke without committing it.
    pub fn pointer_cancel(&mut self) {
        if self.current.take().is_some() {
            self.needs_redraw = true;
        }
    }

    /// Removes the most recently finished stroke. Returns `false` if there was none.
    pub fn undo(&mut self) -> bool {
        let removed = self.strokes.pop().is_some();
        self.needs_redraw |= removed;
        removed
    }

    pub fn set_brush_width(&mut self, width: f32) {
        self.brush.width = width;
    }

    pub fn set_brush_color(&mut self, color: Color) {
        self.brush.color = color;
    }

    pub fn set_background(&mut self, background: Background) {
        self.background = background;
        self.needs_redraw = true;
    }

    /// Returns whether anything visible changed since the last call, and resets the flag.
    pub fn take_redraw(&mut self) -> bool {
        mem::take(&mut self.needs_redraw)
    }

    /// Paints background, finished strokes and the in-progress stroke into `target`.
    pub fn render(&self, target: &mut Pixmap) {
        self.background.paint(target);
        for stroke in self.strokes.iter().chain(self.current_stroke()) {
            target.stroke_polyline(stroke.points(), stroke.width(), stroke.color());
        }
    }

    /// Renders the current visual state into a new `width`x`height` pixmap.
    pub fn rasterize(&self, width: u32, height: u32) -> Pixmap {
        let mut pixmap = Pixmap::new(width, height, Color::TRANSPARENT);
        self.render(&mut pixmap);
        pixmap
    }
}

#[cfg(test)]
mod tests {
    use crate::math::vec2;

    use super::*;

    const RED: Color = Color::rgb(0xff, 0, 0);
    const BLUE: Color = Color::rgb(0, 0, 0xff);

    fn draw(surface: &mut DrawingSurface, points: &[(f32, f32)]) {
        let mut points = points.iter().map(|&(x, y)| vec2(x, y));
        surface.pointer_down(points.next().unwrap());
        for p in points {
            surface.pointer_move(p);
        }
        surface.pointer_up();
    }

    #[test]
    fn stroke_sequence_commits_exactly_one() {
        let mut surface = DrawingSurface::default();
        draw(&mut surface, &[(1.0, 1.0), (2.0, 2.0)]);
        assert_eq!(surface.strokes().len(), 1);

        draw(&mut surface, &[(5.0, 5.0), (6.0, 6.0), (7.0, 7.0)]);
        assert_eq!(surface.strokes().len(), 2);
        assert!(surface.current_stroke().is_none());
    }

    #[test]
    fn down_three_moves_up_records_four_points() {
        let mut surface = DrawingSurface::default();
        surface.set_brush_color(RED);
        surface.set_brush_width(10.0);

        surface.pointer_down(vec2(0.0, 0.0));
        surface.pointer_move(vec2(1.0, 0.0));
        surface.pointer_move(vec2(2.0, 1.0));
        surface.pointer_move(vec2(3.0, 3.0));
        assert_eq!(surface.current_stroke().unwrap().points().len(), 4);
        assert!(surface.strokes().is_empty());
        surface.pointer_up();

        let [stroke] = surface.strokes() else {
            panic!("expected one stroke, got {:?}", surface.strokes());
        };
        assert_eq!(stroke.points().len(), 4);
        assert_eq!(stroke.points()[3], vec2(3.0, 3.0));
        assert_eq!(stroke.color(), RED);
        assert_eq!(stroke.width(), 10.0);
    }

    #[test]
    fn repeated_positions_are_not_recorded() {
        let mut surface = DrawingSurface::default();
        surface.pointer_down(vec2(4.0, 4.0));
        surface.take_redraw();
        surface.pointer_move(vec2(4.0, 4.0));
        assert!(!surface.take_redraw());
        surface.pointer_up();
        assert_eq!(surface.strokes()[0].points().len(), 1);
    }

    #[test]
    fn undo_removes_tail_only() {
        let mut surface = DrawingSurface::default();
        assert!(!surface.undo());
        assert!(surface.strokes().is_empty());

        draw(&mut surface, &[(1.0, 1.0)]);
        draw(&mut surface, &[(2.0, 2.0)]);
        draw(&mut surface, &[(3.0, 3.0)]);
        assert!(surface.undo());
        assert_eq!(surface.strokes().len(), 2);
        assert_eq!(surface.strokes()[1].points(), &[vec2(2.0, 2.0)]);
    }

    #[test]
    fn undo_leaves_in_progress_stroke_alone() {
        let mut surface = DrawingSurface::default();
        draw(&mut surface, &[(1.0, 1.0)]);
        surface.pointer_down(vec2(9.0, 9.0));
        assert!(surface.undo());
        assert!(surface.strokes().is_empty());
        assert!(surface.current_stroke().is_some());
        surface.pointer_up();
        assert_eq!(surface.strokes().len(), 1);
    }

    #[test]
    fn brush_changes_only_affect_new_strokes() {
        let mut surface = DrawingSurface::default();
        surface.set_brush_color(RED);
        surface.set_brush_width(10.0);
        draw(&mut surface, &[(1.0, 1.0), (5.0, 5.0)]);

        surface.pointer_down(vec2(0.0, 0.0));
        surface.set_brush_color(BLUE);
        surface.set_brush_width(30.0);
        surface.pointer_up();

        for stroke in surface.strokes() {
            assert_eq!(stroke.color(), RED);
            assert_eq!(stroke.width(), 10.0);
        }
        draw(&mut surface, &[(2.0, 2.0)]);
        assert_eq!(surface.strokes()[2].color(), BLUE);
        assert_eq!(surface.strokes()[2].width(), 30.0);
    }

    #[test]
    fn stray_events_are_ignored() {
        let mut surface = DrawingSurface::default();
        surface.take_redraw();
        surface.pointer_move(vec2(1.0, 1.0));
        surface.pointer_up();
        surface.pointer_cancel();
        assert!(surface.strokes().is_empty());
        assert!(!surface.take_redraw());
    }

    #[test]
    fn down_while_drawing_commits_previous() {
        let mut surface = DrawingSurface::default();
        surface.pointer_down(vec2(1.0, 1.0));
        surface.pointer_move(vec2(2.0, 2.0));
        surface.pointer_down(vec2(8.0, 8.0));
        assert_eq!(surface.strokes().len(), 1);
        assert_eq!(surface.current_stroke().unwrap().points(), &[vec2(8.0, 8.0)]);
    }

    #[test]
    fn cancel_discards_in_progress_stroke() {
        let mut surface = DrawingSurface::default();
        surface.pointer_down(vec2(1.0, 1.0));
        surface.pointer_move(vec2(2.0, 2.0));
        surface.take_redraw();
        surface.pointer_cancel();
        assert!(surface.take_redraw());
        assert!(surface.strokes().is_empty());
        assert!(surface.current_stroke().is_none());
    }

    #[test]
    fn render_paints_in_order_and_respects_undo() {
        let mut surface = DrawingSurface::default();
        surface.set_brush_color(RED);
        surface.set_brush_width(10.0);
        draw(&mut surface, &[(10.0, 20.0), (50.0, 20.0)]);
        surface.set_brush_color(BLUE);
        surface.set_brush_width(20.0);
        draw(&mut surface, &[(30.0, 5.0), (30.0, 60.0)]);

        let both = surface.rasterize(64, 64);
        // B crosses A and was drawn later, so it wins.
        assert_eq!(both.pixel(30, 20), Some(BLUE));
        assert_eq!(both.pixel(12, 20), Some(RED));

        assert!(surface.undo());
        assert_eq!(surface.strokes().len(), 1);
        assert_eq!(surface.strokes()[0].color(), RED);

        let only_a = surface.rasterize(64, 64);
        assert_eq!(only_a.pixel(30, 20), Some(RED));
        assert_eq!(only_a.pixel(30, 50), Some(Color::WHITE));
        assert_eq!(only_a, {
            let mut expected = Pixmap::new(64, 64, Color::WHITE);
            expected.stroke_polyline(&[vec2(10.0, 20.0), vec2(50.0, 20.0)], 10.0, RED);
            expected
        });
    }

    #[test]
    fn in_progress_stroke_is_rendered_on_top() {
        let mut surface = DrawingSurface::default();
        surface.set_brush_color(RED);
        draw(&mut surface, &[(0.0, 10.0), (40.0, 10.0)]);
        surface.set_brush_color(BLUE);
        surface.pointer_down(vec2(20.0, 0.0));
        surface.pointer_move(vec2(20.0, 30.0));

        let pm = surface.rasterize(40, 40);
        assert_eq!(pm.pixel(20, 10), Some(BLUE));
        assert_eq!(pm.pixel(5, 10), Some(RED));
    }

    #[test]
    fn rendering_is_deterministic() {
        let mut surface = DrawingSurface::default();
        draw(&mut surface, &[(3.3, 7.1), (20.9, 13.4), (31.2, 2.2)]);
        surface.set_brush_color(Color::rgba(10, 200, 30, 0x7f));
        draw(&mut surface, &[(0.0, 31.0), (31.0, 0.0)]);
        surface.pointer_down(vec2(16.0, 16.0));

        assert_eq!(surface.rasterize(32, 32), surface.rasterize(32, 32));
    }

    #[test]
    fn empty_surface_rasterizes_to_white() {
        let surface = DrawingSurface::new(BrushConfig::default(), Background::solid(Color::WHITE));
        let pm = surface.rasterize(17, 9);
        assert_eq!((pm.width(), pm.height()), (17, 9));
        assert!(pm.pixels().iter().all(|&p| p == Color::WHITE));
    }
}
