use super::{Bounds, Point, StrokeStyle};
use crate::geometry::distance_to_segment;

#[derive(Debug, Clone, PartialEq)]
pub struct FreehandStroke {
    pub points: Vec<Point>,
    pub style: StrokeStyle,
}

impl FreehandStroke {
    pub fn new(start: Point, style: StrokeStyle) -> Self {
        Self {
            points: vec![start],
            style,
        }
    }

    pub fn from_points(points: Vec<Point>, style: StrokeStyle) -> Self {
        Self { points, style }
    }

    /// Skips a point identical to the last one; pointer hardware repeats them.
    pub fn append_point(&mut self, point: Point) {
        if self.points.last() != Some(&point) {
            self.points.push(point);
        }
    }

    pub fn is_committable(&self) -> bool {
        self.points.len() >= 2
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::from_points(self.points.iter().copied())
            .unwrap_or(Bounds {
                x: 0.0,
                y: 0.0,
                width: 0.0,
                height: 0.0,
            })
            .expanded(self.style.width / 2.0)
    }

    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let reach = self.style.width / 2.0 + tolerance;
        match self.points.as_slice() {
            [] => false,
            [only] => only.distance_to(point) <= reach,
            points => points
                .windows(2)
                .any(|pair| distance_to_segment(point, pair[0], pair[1]) <= reach),
        }
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        for point in &mut self.points {
            *point = point.offset(dx, dy);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Color;

    fn stroke(points: &[(f64, f64)]) -> FreehandStroke {
        FreehandStroke::from_points(
            points.iter().map(|&(x, y)| Point::new(x, y)).collect(),
            StrokeStyle::new(Color::new(0, 0, 0), 4.0),
        )
    }

    #[test]
    fn append_point_drops_repeated_samples() {
        let mut stroke = FreehandStroke::new(
            Point::new(1.0, 1.0),
            StrokeStyle::new(Color::new(0, 0, 0), 2.0),
        );
        stroke.append_point(Point::new(1.0, 1.0));
        assert!(!stroke.is_committable());

        stroke.append_point(Point::new(2.0, 3.0));
        assert_eq!(stroke.points.len(), 2);
        assert!(stroke.is_committable());
    }

    #[test]
    fn hit_test_walks_every_segment() {
        let stroke = stroke(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]);
        assert!(stroke.hit_test(Point::new(11.0, 6.0), 1.0));
        assert!(!stroke.hit_test(Point::new(0.0, 10.0), 1.0));
    }

    #[test]
    fn translate_moves_all_points_without_reshaping() {
        let mut stroke = stroke(&[(0.0, 0.0), (10.0, 5.0)]);
        stroke.translate(3.0, -2.0);
        assert_eq!(stroke.points, vec![Point::new(3.0, -2.0), Point::new(13.0, 3.0)]);
    }
}
