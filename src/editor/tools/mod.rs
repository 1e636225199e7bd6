mod arrow;
mod pen;

pub use crate::geometry::{Bounds, Color, Point};
pub use arrow::{arrow_commits, create_arrow, ArrowElement, ArrowHead, MIN_ARROW_LENGTH};
pub use pen::FreehandStroke;

pub const MIN_STROKE_WIDTH: f64 = 1.0;
pub const MAX_STROKE_WIDTH: f64 = 64.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolKind {
    #[default]
    Select,
    Freehand,
    Arrow,
}

impl ToolKind {
    /// Whether existing objects take part in selection and hit-testing while this tool is active.
    pub const fn objects_interactive(self) -> bool {
        matches!(self, Self::Select)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Freehand => "freehand",
            Self::Arrow => "arrow",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub color: Color,
    pub width: f64,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            color: Color::new(0xef, 0x44, 0x44),
            width: 4.0,
        }
    }
}

impl StrokeStyle {
    pub fn new(color: Color, width: f64) -> Self {
        let mut style = Self { color, width: 0.0 };
        style.set_width(width);
        style
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    pub fn set_width(&mut self, width: f64) {
        self.width = if width.is_finite() {
            width.clamp(MIN_STROKE_WIDTH, MAX_STROKE_WIDTH)
        } else {
            MIN_STROKE_WIDTH
        };
    }
}

/// One annotation primitive. Everything the scene graph can select, move or delete.
#[derive(Debug, Clone, PartialEq)]
pub enum Drawable {
    Arrow(ArrowElement),
    Freehand(FreehandStroke),
}

impl Drawable {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Arrow(_) => "arrow",
            Self::Freehand(_) => "freehand",
        }
    }

    pub fn style(&self) -> StrokeStyle {
        match self {
            Self::Arrow(arrow) => arrow.style,
            Self::Freehand(stroke) => stroke.style,
        }
    }

    pub fn bounds(&self) -> Bounds {
        match self {
            Self::Arrow(arrow) => arrow.bounds(),
            Self::Freehand(stroke) => stroke.bounds(),
        }
    }

    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        match self {
            Self::Arrow(arrow) => arrow.hit_test(point, tolerance),
            Self::Freehand(stroke) => stroke.hit_test(point, tolerance),
        }
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        match self {
            Self::Arrow(arrow) => arrow.translate(dx, dy),
            Self::Freehand(stroke) => stroke.translate(dx, dy),
        }
    }

    /// Scales geometry about `origin`. Stroke width is left alone.
    pub fn scale_about(&mut self, origin: Point, factor: f64) {
        let scale = |point: Point| {
            Point::new(
                origin.x + (point.x - origin.x) * factor,
                origin.y + (point.y - origin.y) * factor,
            )
        };
        match self {
            Self::Arrow(arrow) => {
                arrow.start = scale(arrow.start);
                arrow.end = scale(arrow.end);
            }
            Self::Freehand(stroke) => {
                for point in &mut stroke.points {
                    *point = scale(*point);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_select_keeps_objects_interactive() {
        assert!(ToolKind::Select.objects_interactive());
        assert!(!ToolKind::Freehand.objects_interactive());
        assert!(!ToolKind::Arrow.objects_interactive());
    }

    #[test]
    fn stroke_width_is_clamped_and_sanitized() {
        let mut style = StrokeStyle::default();
        style.set_width(0.0);
        assert_eq!(style.width, MIN_STROKE_WIDTH);
        style.set_width(500.0);
        assert_eq!(style.width, MAX_STROKE_WIDTH);
        style.set_width(f64::NAN);
        assert_eq!(style.width, MIN_STROKE_WIDTH);
    }

    #[test]
    fn scale_about_keeps_origin_fixed_and_width_unchanged() {
        let mut drawable = Drawable::Arrow(create_arrow(
            Point::new(0.0, 0.0),
            Point::new(20.0, 0.0),
            StrokeStyle::default(),
        ));
        drawable.scale_about(Point::new(10.0, 0.0), 2.0);
        let Drawable::Arrow(arrow) = drawable else {
            panic!("arrow should stay an arrow");
        };
        assert_eq!(arrow.start, Point::new(-10.0, 0.0));
        assert_eq!(arrow.end, Point::new(30.0, 0.0));
        assert_eq!(arrow.style.width, 4.0);
    }
}
