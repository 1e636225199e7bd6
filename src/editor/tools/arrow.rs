use super::{Bounds, Point, StrokeStyle};
use crate::geometry::distance_to_segment;

/// Arrows at or below this length in display pixels are never committed.
pub const MIN_ARROW_LENGTH: f64 = 10.0;

const HEAD_MIN_LENGTH: f64 = 10.0;
const HEAD_LENGTH_PER_WIDTH: f64 = 3.0;
const HEAD_HALF_ANGLE: f64 = std::f64::consts::FRAC_PI_6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrowHead {
    pub tip: Point,
    pub left: Point,
    pub right: Point,
}

impl ArrowHead {
    pub fn points(&self) -> [Point; 3] {
        [self.tip, self.left, self.right]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrowElement {
    pub start: Point,
    pub end: Point,
    pub style: StrokeStyle,
}

impl ArrowElement {
    pub fn length(&self) -> f64 {
        self.start.distance_to(self.end)
    }

    /// Triangle at `end`, opening back toward `start`. A zero-length arrow
    /// collapses the triangle onto the tip.
    pub fn head(&self) -> ArrowHead {
        let length = self.length();
        let tip = self.end;
        if length < f64::EPSILON {
            return ArrowHead {
                tip,
                left: tip,
                right: tip,
            };
        }

        let head_length = (self.style.width * HEAD_LENGTH_PER_WIDTH).max(HEAD_MIN_LENGTH);
        let angle = (self.end.y - self.start.y).atan2(self.end.x - self.start.x);
        let back = angle + std::f64::consts::PI;
        let corner = |rotation: f64| {
            Point::new(
                tip.x + head_length * (back + rotation).cos(),
                tip.y + head_length * (back + rotation).sin(),
            )
        };

        ArrowHead {
            tip,
            left: corner(HEAD_HALF_ANGLE),
            right: corner(-HEAD_HALF_ANGLE),
        }
    }

    pub fn bounds(&self) -> Bounds {
        let head = self.head();
        let outline = [self.start, head.tip, head.left, head.right];
        Bounds::from_points(outline)
            .unwrap_or(Bounds {
                x: self.start.x,
                y: self.start.y,
                width: 0.0,
                height: 0.0,
            })
            .expanded(self.style.width / 2.0)
    }

    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let reach = self.style.width / 2.0 + tolerance;
        if distance_to_segment(point, self.start, self.end) <= reach {
            return true;
        }
        let head = self.head();
        distance_to_segment(point, head.tip, head.left) <= reach
            || distance_to_segment(point, head.tip, head.right) <= reach
            || distance_to_segment(point, head.left, head.right) <= reach
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.start = self.start.offset(dx, dy);
        self.end = self.end.offset(dx, dy);
    }
}

/// Builds an arrow from two display-space points. Degenerate input still
/// yields an element; callers decide whether to commit it via [`arrow_commits`].
pub fn create_arrow(start: Point, end: Point, style: StrokeStyle) -> ArrowElement {
    ArrowElement { start, end, style }
}

pub fn arrow_commits(start: Point, end: Point) -> bool {
    start.distance_to(end) > MIN_ARROW_LENGTH
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Color;

    fn style(width: f64) -> StrokeStyle {
        StrokeStyle::new(Color::new(0xef, 0x44, 0x44), width)
    }

    #[test]
    fn commit_policy_requires_length_strictly_above_threshold() {
        let origin = Point::new(50.0, 50.0);
        assert!(!arrow_commits(origin, Point::new(52.0, 51.0)));
        assert!(!arrow_commits(origin, Point::new(60.0, 50.0)));
        assert!(arrow_commits(origin, Point::new(60.5, 50.0)));
        assert!(arrow_commits(Point::new(10.0, 10.0), Point::new(100.0, 100.0)));
    }

    #[test]
    fn head_points_back_along_the_shaft() {
        let arrow = create_arrow(Point::new(0.0, 0.0), Point::new(100.0, 0.0), style(4.0));
        let head = arrow.head();

        assert_eq!(head.tip, Point::new(100.0, 0.0));
        assert!(head.left.x < 100.0 && head.right.x < 100.0);
        assert!((head.left.y + head.right.y).abs() < 1e-9);
        let head_length = head.tip.distance_to(head.left);
        assert!((head_length - 12.0).abs() < 1e-9);
    }

    #[test]
    fn head_uses_minimum_length_for_thin_strokes() {
        let arrow = create_arrow(Point::new(0.0, 0.0), Point::new(0.0, 50.0), style(1.0));
        let head = arrow.head();
        assert!((head.tip.distance_to(head.right) - HEAD_MIN_LENGTH).abs() < 1e-9);
    }

    #[test]
    fn zero_length_arrow_collapses_head_without_nan() {
        let arrow = create_arrow(Point::new(5.0, 5.0), Point::new(5.0, 5.0), style(4.0));
        let head = arrow.head();
        assert!(head.points().iter().all(|point| point.is_finite()));
    }

    #[test]
    fn hit_test_covers_shaft_and_misses_far_points() {
        let arrow = create_arrow(Point::new(10.0, 10.0), Point::new(100.0, 10.0), style(4.0));
        assert!(arrow.hit_test(Point::new(50.0, 13.0), 2.0));
        assert!(!arrow.hit_test(Point::new(50.0, 40.0), 2.0));
    }
}
