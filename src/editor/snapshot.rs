//! Engine-independent documents describing the annotation objects of a scene.
//!
//! A [`Snapshot`] is both the unit of undo/redo and the `annotation_data`
//! payload that gets persisted. Its JSON shape:
//!
//! ```json
//! {
//!   "version": 1,
//!   "objects": [
//!     { "type": "arrow", "start": { "x": 10.0, "y": 10.0 }, "end": { "x": 100.0, "y": 100.0 },
//!       "color": "#ef4444", "width": 4.0 },
//!     { "type": "freehand", "points": [{ "x": 1.0, "y": 2.0 }, { "x": 3.0, "y": 4.0 }],
//!       "color": "#000000", "width": 2.0 }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::scene::SceneGraph;
use super::tools::{
    create_arrow, Color, Drawable, FreehandStroke, Point, StrokeStyle, MAX_STROKE_WIDTH,
    MIN_STROKE_WIDTH,
};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("malformed annotation document: {0}")]
    Deserialization(#[from] serde_json::Error),
    #[error("object {index}: invalid color {value:?}")]
    InvalidColor { index: usize, value: String },
    #[error("object {index}: {reason}")]
    InvalidGeometry { index: usize, reason: &'static str },
    #[error("object {index}: freehand stroke has no points")]
    EmptyStroke { index: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectRecord {
    Arrow {
        start: Point,
        end: Point,
        color: String,
        width: f64,
    },
    Freehand {
        points: Vec<Point>,
        color: String,
        width: f64,
    },
}

impl ObjectRecord {
    fn from_drawable(drawable: &Drawable) -> Self {
        match drawable {
            Drawable::Arrow(arrow) => Self::Arrow {
                start: arrow.start,
                end: arrow.end,
                color: arrow.style.color.to_hex(),
                width: arrow.style.width,
            },
            Drawable::Freehand(stroke) => Self::Freehand {
                points: stroke.points.clone(),
                color: stroke.style.color.to_hex(),
                width: stroke.style.width,
            },
        }
    }

    fn to_drawable(&self, index: usize) -> Result<Drawable, SnapshotError> {
        match self {
            Self::Arrow {
                start,
                end,
                color,
                width,
            } => {
                if !start.is_finite() || !end.is_finite() {
                    return Err(SnapshotError::InvalidGeometry {
                        index,
                        reason: "arrow endpoints must be finite",
                    });
                }
                let style = parse_style(index, color, *width)?;
                Ok(Drawable::Arrow(create_arrow(*start, *end, style)))
            }
            Self::Freehand {
                points,
                color,
                width,
            } => {
                if points.is_empty() {
                    return Err(SnapshotError::EmptyStroke { index });
                }
                if !points.iter().all(|point| point.is_finite()) {
                    return Err(SnapshotError::InvalidGeometry {
                        index,
                        reason: "stroke points must be finite",
                    });
                }
                let style = parse_style(index, color, *width)?;
                Ok(Drawable::Freehand(FreehandStroke::from_points(
                    points.clone(),
                    style,
                )))
            }
        }
    }
}

fn parse_style(index: usize, color: &str, width: f64) -> Result<StrokeStyle, SnapshotError> {
    let parsed = color
        .parse::<Color>()
        .map_err(|_| SnapshotError::InvalidColor {
            index,
            value: color.to_string(),
        })?;
    if !(MIN_STROKE_WIDTH..=MAX_STROKE_WIDTH).contains(&width) {
        return Err(SnapshotError::InvalidGeometry {
            index,
            reason: "stroke width out of range",
        });
    }
    Ok(StrokeStyle::new(parsed, width))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default = "default_version")]
    pub version: u32,
    pub objects: Vec<ObjectRecord>,
}

fn default_version() -> u32 {
    SNAPSHOT_VERSION
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl Snapshot {
    pub const fn empty() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            objects: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn from_value(value: &serde_json::Value) -> Result<Self, SnapshotError> {
        Ok(Self::deserialize(value)?)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn to_value(&self) -> serde_json::Value {
        // Plain structs of strings and floats; serde_json only rejects non-string map keys.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Records every annotation object in z-order. Background, selection and ids are left out.
pub fn serialize_scene(scene: &SceneGraph) -> Snapshot {
    Snapshot {
        version: SNAPSHOT_VERSION,
        objects: scene.drawables().map(ObjectRecord::from_drawable).collect(),
    }
}

/// Rebuilds the drawables a snapshot describes, failing on the first invalid record.
pub fn decode_drawables(snapshot: &Snapshot) -> Result<Vec<Drawable>, SnapshotError> {
    snapshot
        .objects
        .iter()
        .enumerate()
        .map(|(index, record)| record.to_drawable(index))
        .collect()
}

/// Appends the snapshot's objects to `scene`. Callers wanting replacement clear first.
///
/// Every record is validated before anything is inserted, so a failing
/// snapshot leaves the scene as it was.
pub fn load_snapshot(scene: &mut SceneGraph, snapshot: &Snapshot) -> Result<usize, SnapshotError> {
    let drawables = decode_drawables(snapshot)?;
    let count = drawables.len();
    for drawable in drawables {
        scene.add(drawable);
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn populated_scene() -> SceneGraph {
        let mut scene = SceneGraph::new();
        scene.add(Drawable::Arrow(create_arrow(
            Point::new(10.0, 10.0),
            Point::new(100.0, 100.0),
            StrokeStyle::new(Color::new(0xef, 0x44, 0x44), 4.0),
        )));
        scene.add(Drawable::Freehand(FreehandStroke::from_points(
            vec![Point::new(1.0, 2.0), Point::new(3.5, 4.25), Point::new(8.0, 1.0)],
            StrokeStyle::new(Color::new(0x22, 0xc5, 0x5e), 2.5),
        )));
        scene.add(Drawable::Arrow(create_arrow(
            Point::new(200.0, 40.0),
            Point::new(150.0, 90.0),
            StrokeStyle::new(Color::new(0, 0, 0), 8.0),
        )));
        scene
    }

    #[test]
    fn round_trip_reproduces_objects_in_order() {
        let scene = populated_scene();
        let snapshot = serialize_scene(&scene);
        let raw = serde_json::to_string(&snapshot).expect("snapshot should encode");

        let parsed = Snapshot::from_json_str(&raw).expect("snapshot should decode");
        let mut restored = SceneGraph::new();
        let loaded = load_snapshot(&mut restored, &parsed).expect("snapshot should load");

        assert_eq!(loaded, 3);
        let original: Vec<_> = scene.drawables().cloned().collect();
        let reloaded: Vec<_> = restored.drawables().cloned().collect();
        assert_eq!(original, reloaded);
    }

    #[test]
    fn serialized_document_uses_tagged_plain_attributes() {
        let mut scene = SceneGraph::new();
        scene.add(Drawable::Arrow(create_arrow(
            Point::new(10.0, 10.0),
            Point::new(100.0, 100.0),
            StrokeStyle::new(Color::new(0xef, 0x44, 0x44), 4.0),
        )));

        let value = serialize_scene(&scene).to_value();
        assert_eq!(
            value,
            json!({
                "version": 1,
                "objects": [{
                    "type": "arrow",
                    "start": { "x": 10.0, "y": 10.0 },
                    "end": { "x": 100.0, "y": 100.0 },
                    "color": "#ef4444",
                    "width": 4.0
                }]
            })
        );
    }

    #[test]
    fn load_appends_to_non_empty_scene() {
        let mut scene = populated_scene();
        let snapshot = serialize_scene(&scene);
        load_snapshot(&mut scene, &snapshot).expect("snapshot should load");
        assert_eq!(scene.len(), 6);
    }

    #[test]
    fn unknown_type_tag_is_a_deserialization_error() {
        let value = json!({ "objects": [{ "type": "ellipse", "color": "#000000", "width": 1.0 }] });
        let err = Snapshot::from_value(&value).expect_err("unknown tag should fail");
        assert!(matches!(err, SnapshotError::Deserialization(_)));
    }

    #[test]
    fn missing_attribute_is_a_deserialization_error() {
        let value = json!({ "objects": [{ "type": "arrow", "start": { "x": 1.0, "y": 1.0 },
            "color": "#000000", "width": 1.0 }] });
        let err = Snapshot::from_value(&value).expect_err("missing end should fail");
        assert!(matches!(err, SnapshotError::Deserialization(_)));
    }

    #[test]
    fn version_defaults_when_absent() {
        let snapshot = Snapshot::from_value(&json!({ "objects": [] })).expect("should parse");
        assert_eq!(snapshot.version, SNAPSHOT_VERSION);
        assert!(snapshot.is_empty());
    }

    #[test]
    fn invalid_record_leaves_scene_untouched() {
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            objects: vec![
                ObjectRecord::Arrow {
                    start: Point::new(0.0, 0.0),
                    end: Point::new(50.0, 0.0),
                    color: "#000000".to_string(),
                    width: 2.0,
                },
                ObjectRecord::Freehand {
                    points: vec![Point::new(1.0, 1.0)],
                    color: "red".to_string(),
                    width: 2.0,
                },
            ],
        };

        let mut scene = SceneGraph::new();
        let err = load_snapshot(&mut scene, &snapshot).expect_err("bad color should fail");
        assert!(matches!(err, SnapshotError::InvalidColor { index: 1, .. }));
        assert!(scene.is_empty());
    }

    #[test]
    fn widths_at_range_edges_survive_and_outside_are_rejected() {
        let record = |width: f64| {
            json!({ "objects": [{ "type": "arrow", "start": { "x": 0.0, "y": 0.0 },
                "end": { "x": 50.0, "y": 0.0 }, "color": "#000000", "width": width }] })
        };

        for width in [MIN_STROKE_WIDTH, MAX_STROKE_WIDTH] {
            let snapshot = Snapshot::from_value(&record(width)).expect("should parse");
            let mut scene = SceneGraph::new();
            load_snapshot(&mut scene, &snapshot).expect("edge width should load");
            assert_eq!(serialize_scene(&scene), snapshot);
        }

        for width in [0.5, 100.0] {
            let snapshot = Snapshot::from_value(&record(width)).expect("should parse");
            let mut scene = SceneGraph::new();
            assert!(matches!(
                load_snapshot(&mut scene, &snapshot),
                Err(SnapshotError::InvalidGeometry { index: 0, .. })
            ));
            assert!(scene.is_empty());
        }
    }

    #[test]
    fn empty_stroke_and_bad_width_are_rejected() {
        let empty = Snapshot {
            version: SNAPSHOT_VERSION,
            objects: vec![ObjectRecord::Freehand {
                points: Vec::new(),
                color: "#000000".to_string(),
                width: 2.0,
            }],
        };
        assert!(matches!(
            load_snapshot(&mut SceneGraph::new(), &empty),
            Err(SnapshotError::EmptyStroke { index: 0 })
        ));

        let zero_width = Snapshot {
            version: SNAPSHOT_VERSION,
            objects: vec![ObjectRecord::Arrow {
                start: Point::new(0.0, 0.0),
                end: Point::new(50.0, 0.0),
                color: "#000000".to_string(),
                width: 0.0,
            }],
        };
        assert!(matches!(
            load_snapshot(&mut SceneGraph::new(), &zero_width),
            Err(SnapshotError::InvalidGeometry { index: 0, .. })
        ));
    }
}
