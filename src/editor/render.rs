//! Rasterizes a scene into a single RGBA image at display resolution.

use std::ops::Range;

use image::{Rgba, RgbaImage};

use super::scene::SceneGraph;
use super::tools::{ArrowElement, Bounds, Color, Drawable, FreehandStroke, Point};
use crate::geometry::distance_to_segment;

/// Composites the background and every committed object, bottom to top.
/// `None` until a background is installed.
pub fn flatten_scene(scene: &SceneGraph) -> Option<RgbaImage> {
    let background = scene.background()?;
    let mut canvas = background.image().clone();
    for drawable in scene.drawables() {
        draw_drawable(&mut canvas, drawable);
    }
    Some(canvas)
}

pub fn draw_drawable(canvas: &mut RgbaImage, drawable: &Drawable) {
    match drawable {
        Drawable::Arrow(arrow) => draw_arrow(canvas, arrow),
        Drawable::Freehand(stroke) => draw_stroke(canvas, stroke),
    }
}

fn draw_arrow(canvas: &mut RgbaImage, arrow: &ArrowElement) {
    let Some(mut mask) = CoverageMask::covering(arrow.bounds(), canvas) else {
        return;
    };
    let head = arrow.head();
    let base = Point::new(
        (head.left.x + head.right.x) / 2.0,
        (head.left.y + head.right.y) / 2.0,
    );
    // Past the head base the round cap would poke out beside the tip.
    let shaft_end = if arrow.start.distance_to(base) < arrow.length() {
        base
    } else {
        arrow.start
    };

    mask.stroke_segment(arrow.start, shaft_end, arrow.style.width / 2.0);
    mask.fill_triangle(head.points());
    mask.blend_into(canvas, arrow.style.color);
}

fn draw_stroke(canvas: &mut RgbaImage, stroke: &FreehandStroke) {
    let Some(mut mask) = CoverageMask::covering(stroke.bounds(), canvas) else {
        return;
    };
    let half_width = stroke.style.width / 2.0;
    match stroke.points.as_slice() {
        [] => return,
        [only] => mask.stroke_segment(*only, *only, half_width),
        points => {
            for pair in points.windows(2) {
                mask.stroke_segment(pair[0], pair[1], half_width);
            }
        }
    }
    mask.blend_into(canvas, stroke.style.color);
}

/// Per-pixel coverage for one object, so overlapping segments blend once.
struct CoverageMask {
    left: u32,
    top: u32,
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl CoverageMask {
    fn covering(bounds: Bounds, canvas: &RgbaImage) -> Option<Self> {
        let bounds = bounds.expanded(1.0);
        let canvas_width = f64::from(canvas.width());
        let canvas_height = f64::from(canvas.height());
        let left = bounds.x.floor().clamp(0.0, canvas_width);
        let top = bounds.y.floor().clamp(0.0, canvas_height);
        let right = (bounds.x + bounds.width).ceil().clamp(0.0, canvas_width);
        let bottom = (bounds.y + bounds.height).ceil().clamp(0.0, canvas_height);
        if right <= left || bottom <= top {
            return None;
        }

        let width = (right - left) as u32;
        let height = (bottom - top) as u32;
        Some(Self {
            left: left as u32,
            top: top as u32,
            width,
            height,
            values: vec![0.0; width as usize * height as usize],
        })
    }

    /// Pixel columns and rows of the mask that `area` touches, as half-open ranges.
    fn span(&self, area: Bounds) -> Option<(Range<u32>, Range<u32>)> {
        let area = area.expanded(1.0);
        let clamp_to = |value: f64, origin: u32, extent: u32| {
            (value - f64::from(origin)).clamp(0.0, f64::from(extent)) as u32
        };
        let columns = clamp_to(area.x.floor(), self.left, self.width)
            ..clamp_to((area.x + area.width).ceil(), self.left, self.width);
        let rows = clamp_to(area.y.floor(), self.top, self.height)
            ..clamp_to((area.y + area.height).ceil(), self.top, self.height);
        (!columns.is_empty() && !rows.is_empty()).then_some((columns, rows))
    }

    /// Evaluates `coverage_at` only over the pixels `area` can reach.
    fn cover_with(&mut self, area: Bounds, coverage_at: impl Fn(Point) -> f64) {
        let Some((columns, rows)) = self.span(area) else {
            return;
        };
        for row in rows {
            for column in columns.clone() {
                let center = Point::new(
                    f64::from(self.left + column) + 0.5,
                    f64::from(self.top + row) + 0.5,
                );
                let coverage = coverage_at(center).clamp(0.0, 1.0) as f32;
                let slot = &mut self.values[(row * self.width + column) as usize];
                if coverage > *slot {
                    *slot = coverage;
                }
            }
        }
    }

    fn stroke_segment(&mut self, start: Point, end: Point, half_width: f64) {
        let Some(area) = Bounds::from_points([start, end]) else {
            return;
        };
        self.cover_with(area.expanded(half_width), |center| {
            half_width + 0.5 - distance_to_segment(center, start, end)
        });
    }

    fn fill_triangle(&mut self, corners: [Point; 3]) {
        let Some(area) = Bounds::from_points(corners) else {
            return;
        };
        let [a, b, c] = corners;
        self.cover_with(area, |center| {
            if point_in_triangle(center, a, b, c) {
                1.0
            } else {
                let edge = distance_to_segment(center, a, b)
                    .min(distance_to_segment(center, b, c))
                    .min(distance_to_segment(center, c, a));
                0.5 - edge
            }
        });
    }

    fn blend_into(&self, canvas: &mut RgbaImage, color: Color) {
        for row in 0..self.height {
            for column in 0..self.width {
                let coverage = self.values[(row * self.width + column) as usize];
                if coverage <= 0.0 {
                    continue;
                }
                let pixel = canvas.get_pixel_mut(self.left + column, self.top + row);
                *pixel = blend(*pixel, color, coverage);
            }
        }
    }
}

fn blend(under: Rgba<u8>, color: Color, coverage: f32) -> Rgba<u8> {
    let mix = |over: u8, base: u8| {
        (f32::from(over) * coverage + f32::from(base) * (1.0 - coverage)).round() as u8
    };
    let alpha = f32::from(under[3]) + (255.0 - f32::from(under[3])) * coverage;
    Rgba([
        mix(color.r, under[0]),
        mix(color.g, under[1]),
        mix(color.b, under[2]),
        alpha.round() as u8,
    ])
}

fn point_in_triangle(point: Point, a: Point, b: Point, c: Point) -> bool {
    let sign = |p1: Point, p2: Point, p3: Point| {
        (p1.x - p3.x) * (p2.y - p3.y) - (p2.x - p3.x) * (p1.y - p3.y)
    };
    let d1 = sign(point, a, b);
    let d2 = sign(point, b, c);
    let d3 = sign(point, c, a);
    let has_negative = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_positive = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_negative && has_positive)
}
