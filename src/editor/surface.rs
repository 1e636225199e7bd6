//! The drawing surface: scene ownership, readiness, tool modes and pointer interpretation.
//!
//! Every committed mutation hands back exactly one [`Snapshot`]; that return
//! value is the state-change notification. Previews and in-flight drags
//! return `None`.

use image::imageops::{self, FilterType};
use image::DynamicImage;
use thiserror::Error;

use super::data_url::png_data_url;
use super::render::flatten_scene;
use super::scene::{Background, SceneGraph};
use super::snapshot::{decode_drawables, load_snapshot, serialize_scene, Snapshot, SnapshotError};
use super::tools::{
    arrow_commits, create_arrow, ArrowElement, Color, Drawable, FreehandStroke, Point,
    StrokeStyle, ToolKind,
};
use crate::geometry::{fit_within, Size};
use crate::photo::ImageLoadError;

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("failed to encode flattened image: {0}")]
    Encode(#[from] image::ImageError),
}

#[derive(Debug, Error)]
pub enum SurfaceLoadError {
    #[error("background photo failed to load: {0}")]
    Image(#[from] ImageLoadError),
    #[error("stored annotations could not be restored: {0}")]
    Snapshot(#[from] SnapshotError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceState {
    Loading,
    Ready,
    Failed { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub phase: PointerPhase,
    pub point: Point,
    pub shift: bool,
}

impl PointerEvent {
    pub const fn down(point: Point) -> Self {
        Self {
            phase: PointerPhase::Down,
            point,
            shift: false,
        }
    }

    pub const fn moved(point: Point) -> Self {
        Self {
            phase: PointerPhase::Move,
            point,
            shift: false,
        }
    }

    pub const fn up(point: Point) -> Self {
        Self {
            phase: PointerPhase::Up,
            point,
            shift: false,
        }
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }
}

#[derive(Debug, Clone, Default)]
enum Gesture {
    #[default]
    Idle,
    Dragging {
        origin: Point,
        last: Point,
    },
    Drawing(FreehandStroke),
    Arrow {
        start: Point,
        preview: Option<ArrowElement>,
    },
}

#[derive(Debug)]
pub struct DrawingSurface {
    viewport: Size,
    state: SurfaceState,
    scene: SceneGraph,
    tool: ToolKind,
    style: StrokeStyle,
    gesture: Gesture,
}

impl DrawingSurface {
    pub fn new(viewport: Size) -> Self {
        Self {
            viewport,
            state: SurfaceState::Loading,
            scene: SceneGraph::new(),
            tool: ToolKind::Select,
            style: StrokeStyle::default(),
            gesture: Gesture::Idle,
        }
    }

    /// Finishes the asynchronous photo load.
    ///
    /// A photo error leaves the surface `Failed`. An unreadable initial
    /// snapshot is reported, but the surface still becomes ready with no prior
    /// annotations.
    pub fn install_background(
        &mut self,
        loaded: Result<DynamicImage, ImageLoadError>,
        initial: Option<&Snapshot>,
    ) -> Result<usize, SurfaceLoadError> {
        let photo = match loaded {
            Ok(photo) => photo,
            Err(err) => {
                tracing::warn!(%err, "background photo failed to load");
                self.state = SurfaceState::Failed {
                    reason: err.to_string(),
                };
                return Err(err.into());
            }
        };

        let natural = Size::new(photo.width(), photo.height());
        let (fitted, scale) = fit_within(natural, self.viewport);
        if fitted.is_empty() {
            let reason = format!(
                "photo {}x{} cannot fit viewport {}x{}",
                natural.width, natural.height, self.viewport.width, self.viewport.height
            );
            self.state = SurfaceState::Failed {
                reason: reason.clone(),
            };
            return Err(ImageLoadError::Empty { url: reason }.into());
        }

        let rgba = photo.to_rgba8();
        let image = if fitted == natural {
            rgba
        } else {
            imageops::resize(&rgba, fitted.width, fitted.height, FilterType::Triangle)
        };
        self.scene
            .set_background(Background::new(image, natural, scale));
        tracing::debug!(
            natural_width = natural.width,
            natural_height = natural.height,
            display_width = fitted.width,
            display_height = fitted.height,
            scale,
            "background installed"
        );

        let restored = match initial {
            Some(snapshot) => load_snapshot(&mut self.scene, snapshot),
            None => Ok(0),
        };
        self.scene.set_interactive(self.tool.objects_interactive());
        self.state = SurfaceState::Ready;
        restored.map_err(SurfaceLoadError::from)
    }

    pub fn state(&self) -> &SurfaceState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == SurfaceState::Ready
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    /// Display size of the fitted photo, once loaded.
    pub fn display_size(&self) -> Option<Size> {
        self.scene.background().map(Background::display_size)
    }

    /// Read-only view of the scene graph.
    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn tool(&self) -> ToolKind {
        self.tool
    }

    /// Switching never adds or removes objects. Leaving select mode clears the
    /// selection. A half-finished gesture is abandoned, and a drag in progress
    /// is moved back to where it started.
    pub fn set_tool(&mut self, tool: ToolKind) {
        self.cancel_gesture();
        self.tool = tool;
        self.scene.set_interactive(tool.objects_interactive());
        tracing::debug!(tool = tool.label(), "tool switched");
    }

    pub fn style(&self) -> StrokeStyle {
        self.style
    }

    pub fn set_color(&mut self, color: Color) {
        self.style.set_color(color);
    }

    pub fn set_width(&mut self, width: f64) {
        self.style.set_width(width);
    }

    pub fn arrow_preview(&self) -> Option<&ArrowElement> {
        match &self.gesture {
            Gesture::Arrow { preview, .. } => preview.as_ref(),
            _ => None,
        }
    }

    pub fn pending_stroke(&self) -> Option<&FreehandStroke> {
        match &self.gesture {
            Gesture::Drawing(stroke) => Some(stroke),
            _ => None,
        }
    }

    fn cancel_gesture(&mut self) {
        if let Gesture::Dragging { origin, last } = std::mem::take(&mut self.gesture) {
            self.scene
                .translate_selected(origin.x - last.x, origin.y - last.y);
        }
    }

    pub fn handle_pointer(&mut self, event: PointerEvent) -> Option<Snapshot> {
        if !self.is_ready() {
            return None;
        }
        match self.tool {
            ToolKind::Select => self.handle_select_pointer(event),
            ToolKind::Freehand => self.handle_freehand_pointer(event),
            ToolKind::Arrow => self.handle_arrow_pointer(event),
        }
    }

    fn handle_select_pointer(&mut self, event: PointerEvent) -> Option<Snapshot> {
        let point = event.point;
        match event.phase {
            PointerPhase::Down => {
                self.cancel_gesture();
                let hit = self.scene.hit_test(point);
                match hit {
                    Some(id) if event.shift => {
                        self.scene.toggle_selected(id);
                    }
                    Some(id) if !self.scene.is_selected(id) => {
                        self.scene.select_only(id);
                    }
                    Some(_) => {}
                    None => {
                        if !event.shift {
                            self.scene.clear_selection();
                        }
                    }
                }
                if hit.is_some_and(|id| self.scene.is_selected(id)) {
                    self.gesture = Gesture::Dragging {
                        origin: point,
                        last: point,
                    };
                }
                None
            }
            PointerPhase::Move => {
                if let Gesture::Dragging { last, .. } = &mut self.gesture {
                    let (dx, dy) = (point.x - last.x, point.y - last.y);
                    *last = point;
                    self.scene.translate_selected(dx, dy);
                }
                None
            }
            PointerPhase::Up => {
                let Gesture::Dragging { origin, last } = std::mem::take(&mut self.gesture) else {
                    return None;
                };
                let (dx, dy) = (point.x - last.x, point.y - last.y);
                self.scene.translate_selected(dx, dy);
                if origin == point {
                    return None;
                }
                tracing::debug!(
                    count = self.scene.selection().len(),
                    "selection moved"
                );
                Some(self.to_snapshot())
            }
        }
    }

    fn handle_freehand_pointer(&mut self, event: PointerEvent) -> Option<Snapshot> {
        let point = event.point;
        match event.phase {
            PointerPhase::Down => {
                self.gesture = Gesture::Drawing(FreehandStroke::new(point, self.style));
                None
            }
            PointerPhase::Move => {
                if let Gesture::Drawing(stroke) = &mut self.gesture {
                    stroke.append_point(point);
                }
                None
            }
            PointerPhase::Up => {
                let Gesture::Drawing(mut stroke) = std::mem::take(&mut self.gesture) else {
                    return None;
                };
                stroke.append_point(point);
                if !stroke.is_committable() {
                    return None;
                }
                tracing::debug!(points = stroke.points.len(), "freehand stroke committed");
                self.scene.add(Drawable::Freehand(stroke));
                Some(self.to_snapshot())
            }
        }
    }

    fn handle_arrow_pointer(&mut self, event: PointerEvent) -> Option<Snapshot> {
        let point = event.point;
        match event.phase {
            PointerPhase::Down => {
                self.gesture = Gesture::Arrow {
                    start: point,
                    preview: None,
                };
                None
            }
            PointerPhase::Move => {
                let style = self.style;
                if let Gesture::Arrow { start, preview } = &mut self.gesture {
                    // Always rebuilt from scratch; the old preview is dropped, never edited.
                    *preview = Some(create_arrow(*start, point, style));
                }
                None
            }
            PointerPhase::Up => {
                let Gesture::Arrow { start, .. } = std::mem::take(&mut self.gesture) else {
                    return None;
                };
                if !arrow_commits(start, point) {
                    tracing::debug!(
                        length = start.distance_to(point),
                        "arrow below minimum length discarded"
                    );
                    return None;
                }
                self.scene
                    .add(Drawable::Arrow(create_arrow(start, point, self.style)));
                Some(self.to_snapshot())
            }
        }
    }

    /// Empty document until the surface is ready.
    pub fn to_snapshot(&self) -> Snapshot {
        if !self.is_ready() {
            return Snapshot::empty();
        }
        serialize_scene(&self.scene)
    }

    /// PNG data url of the background plus committed objects, at display
    /// resolution. `None` until the surface is ready.
    pub fn to_flattened_image(&self) -> Result<Option<String>, SurfaceError> {
        if !self.is_ready() {
            return Ok(None);
        }
        let Some(flat) = flatten_scene(&self.scene) else {
            return Ok(None);
        };
        Ok(Some(png_data_url(&flat)?))
    }

    pub fn clear_all(&mut self) -> Option<Snapshot> {
        if !self.is_ready() {
            return None;
        }
        self.gesture = Gesture::Idle;
        let removed = self.scene.clear_objects();
        tracing::debug!(removed, "surface cleared");
        Some(self.to_snapshot())
    }

    pub fn delete_selected(&mut self) -> Option<Snapshot> {
        if !self.is_ready() {
            return None;
        }
        self.cancel_gesture();
        let removed = self.scene.remove_selected();
        if removed == 0 {
            return None;
        }
        tracing::debug!(removed, "selection deleted");
        Some(self.to_snapshot())
    }

    /// Scales the selection about its centre; stroke widths are kept.
    pub fn resize_selected(&mut self, factor: f64) -> Option<Snapshot> {
        if !self.is_ready() || !factor.is_finite() || factor <= 0.0 || factor == 1.0 {
            return None;
        }
        self.cancel_gesture();
        if !self.scene.scale_selected(factor) {
            return None;
        }
        Some(self.to_snapshot())
    }

    /// Replaces every object with the snapshot's contents without emitting a
    /// change. On error the scene is left as it was.
    pub fn restore(&mut self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        let drawables = decode_drawables(snapshot)?;
        self.gesture = Gesture::Idle;
        self.scene.clear_objects();
        for drawable in drawables {
            self.scene.add(drawable);
        }
        Ok(())
    }
}
