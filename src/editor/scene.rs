//! In-memory scene graph: a non-interactive background layer plus ordered annotation objects.

use image::RgbaImage;

use super::tools::{Bounds, Drawable, Point};
use crate::geometry::Size;

/// Extra reach around strokes when hit-testing pointer input.
pub const HIT_TOLERANCE: f64 = 4.0;

/// Stable for one editing session; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    pub const fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    id: ObjectId,
    pub drawable: Drawable,
    selectable: bool,
    evented: bool,
}

impl SceneObject {
    pub const fn id(&self) -> ObjectId {
        self.id
    }

    pub const fn selectable(&self) -> bool {
        self.selectable
    }

    pub const fn evented(&self) -> bool {
        self.evented
    }

    pub fn position(&self) -> Point {
        let bounds = self.drawable.bounds();
        Point::new(bounds.x, bounds.y)
    }

    pub fn size(&self) -> (f64, f64) {
        let bounds = self.drawable.bounds();
        (bounds.width, bounds.height)
    }
}

/// The photo under the annotations, already resampled to display size.
#[derive(Debug, Clone)]
pub struct Background {
    image: RgbaImage,
    natural: Size,
    scale: f64,
}

impl Background {
    pub fn new(image: RgbaImage, natural: Size, scale: f64) -> Self {
        Self {
            image,
            natural,
            scale,
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn display_size(&self) -> Size {
        Size::new(self.image.width(), self.image.height())
    }

    pub fn natural_size(&self) -> Size {
        self.natural
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }
}

#[derive(Debug, Clone)]
pub struct SceneGraph {
    background: Option<Background>,
    objects: Vec<SceneObject>,
    selection: Vec<ObjectId>,
    next_id: u64,
    interactive: bool,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            background: None,
            objects: Vec::new(),
            selection: Vec::new(),
            next_id: 1,
            interactive: true,
        }
    }

    fn allocate_id(&mut self) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    pub fn set_background(&mut self, background: Background) {
        self.background = Some(background);
    }

    pub fn background(&self) -> Option<&Background> {
        self.background.as_ref()
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.iter().find(|object| object.id == id)
    }

    /// Appends on top of the z-order. New objects follow the current interactivity flags.
    pub fn add(&mut self, drawable: Drawable) -> ObjectId {
        let id = self.allocate_id();
        self.objects.push(SceneObject {
            id,
            drawable,
            selectable: self.interactive,
            evented: self.interactive,
        });
        id
    }

    pub fn remove(&mut self, id: ObjectId) -> Option<SceneObject> {
        let index = self.objects.iter().position(|object| object.id == id)?;
        self.selection.retain(|selected| *selected != id);
        Some(self.objects.remove(index))
    }

    /// Drops every annotation object. The background stays.
    pub fn clear_objects(&mut self) -> usize {
        let removed = self.objects.len();
        self.objects.clear();
        self.selection.clear();
        removed
    }

    pub fn set_interactive(&mut self, interactive: bool) {
        self.interactive = interactive;
        for object in &mut self.objects {
            object.selectable = interactive;
            object.evented = interactive;
        }
        if !interactive {
            self.selection.clear();
        }
    }

    pub fn interactive(&self) -> bool {
        self.interactive
    }

    /// Topmost evented object under `point`.
    pub fn hit_test(&self, point: Point) -> Option<ObjectId> {
        self.objects
            .iter()
            .rev()
            .filter(|object| object.evented)
            .find(|object| object.drawable.hit_test(point, HIT_TOLERANCE))
            .map(|object| object.id)
    }

    pub fn selection(&self) -> &[ObjectId] {
        &self.selection
    }

    pub fn select_only(&mut self, id: ObjectId) -> bool {
        if !self.is_selectable(id) {
            return false;
        }
        self.selection.clear();
        self.selection.push(id);
        true
    }

    pub fn toggle_selected(&mut self, id: ObjectId) -> bool {
        if !self.is_selectable(id) {
            return false;
        }
        if let Some(index) = self.selection.iter().position(|selected| *selected == id) {
            self.selection.remove(index);
        } else {
            self.selection.push(id);
        }
        true
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn is_selected(&self, id: ObjectId) -> bool {
        self.selection.contains(&id)
    }

    fn is_selectable(&self, id: ObjectId) -> bool {
        self.object(id).is_some_and(|object| object.selectable)
    }

    /// Removes every selected object and returns how many went away.
    pub fn remove_selected(&mut self) -> usize {
        if self.selection.is_empty() {
            return 0;
        }
        let before = self.objects.len();
        let selection = std::mem::take(&mut self.selection);
        self.objects.retain(|object| !selection.contains(&object.id));
        before - self.objects.len()
    }

    pub fn translate_selected(&mut self, dx: f64, dy: f64) {
        for object in &mut self.objects {
            if self.selection.contains(&object.id) {
                object.drawable.translate(dx, dy);
            }
        }
    }

    pub fn selection_bounds(&self) -> Option<Bounds> {
        self.objects
            .iter()
            .filter(|object| self.selection.contains(&object.id))
            .map(|object| object.drawable.bounds())
            .reduce(|acc, bounds| acc.union(&bounds))
    }

    pub fn scale_selected(&mut self, factor: f64) -> bool {
        let Some(origin) = self.selection_bounds().map(|bounds| bounds.center()) else {
            return false;
        };
        for object in &mut self.objects {
            if self.selection.contains(&object.id) {
                object.drawable.scale_about(origin, factor);
            }
        }
        true
    }

    pub fn drawables(&self) -> impl Iterator<Item = &Drawable> {
        self.objects.iter().map(|object| &object.drawable)
    }
}
