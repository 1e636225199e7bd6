//! Annotation editing session: ties the drawing surface, undo history and
//! persistence together for one photo.
//!
//! The two slow boundaries of a session are modelled as explicit phases so a
//! host can run them on whatever executor it likes:
//!
//! * loading: [`AnnotationEditor::receive_annotation`] and
//!   [`AnnotationEditor::receive_background`] accept the results in either order;
//! * saving: [`AnnotationEditor::begin_save`] captures a consistent request and
//!   [`AnnotationEditor::finish_save`] applies the store's answer, if it still matters.

pub mod data_url;
pub mod history;
pub mod render;
pub mod scene;
pub mod snapshot;
pub mod surface;
pub mod tools;

use image::DynamicImage;

use crate::error::{AppError, AppResult};
use crate::geometry::Size;
use crate::input::{resolve_shortcut, InputContext, ShortcutAction, ShortcutKey, ShortcutModifiers};
use crate::photo::{ImageLoadError, ImageSource, PhotoRef};
use crate::state::{SessionEvent, SessionState, StateMachine};
use crate::storage::{AnnotationStore, PersistedAnnotation, SaveAnnotation, StorageResult};

pub use history::{History, HistoryAction, HistoryStatus};
pub use snapshot::{ObjectRecord, Snapshot, SnapshotError};
pub use surface::{
    DrawingSurface, PointerEvent, PointerPhase, SurfaceError, SurfaceLoadError, SurfaceState,
};
pub use tools::{Color, StrokeStyle, ToolKind};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditorOptions {
    pub viewport: Size,
    pub style: StrokeStyle,
    /// Unbounded when `None`.
    pub history_limit: Option<usize>,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            viewport: Size::new(1200, 800),
            style: StrokeStyle::default(),
            history_limit: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    Closed,
    Saved(PersistedAnnotation),
}

/// One in-flight save. Only the ticket of the latest request is honoured.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveTicket {
    generation: u64,
    pub request: SaveAnnotation,
}

#[derive(Debug)]
pub struct AnnotationEditor {
    photo: PhotoRef,
    surface: Option<DrawingSurface>,
    history: History<Snapshot>,
    lifecycle: StateMachine,
    tool: ToolKind,
    style: StrokeStyle,
    initialized: bool,
    initial: Option<Snapshot>,
    pending_background: Option<Result<DynamicImage, ImageLoadError>>,
    existing: Option<PersistedAnnotation>,
    load_notice: Option<String>,
    save_error: Option<String>,
    generation: u64,
}

impl AnnotationEditor {
    pub fn new(photo: PhotoRef, options: EditorOptions) -> Self {
        let history = match options.history_limit {
            Some(limit) => History::with_limit(limit),
            None => History::new(),
        };
        let mut surface = DrawingSurface::new(options.viewport);
        surface.set_color(options.style.color);
        surface.set_width(options.style.width);
        tracing::debug!(photo_id = %photo.photo_id, "editor session opened");

        Self {
            photo,
            surface: Some(surface),
            history,
            lifecycle: StateMachine::new(),
            tool: ToolKind::default(),
            style: options.style,
            initialized: false,
            initial: None,
            pending_background: None,
            existing: None,
            load_notice: None,
            save_error: None,
            generation: 0,
        }
    }

    /// Loads the stored annotation and the photo back to back.
    pub fn open<S, I>(photo: PhotoRef, options: EditorOptions, store: &S, images: &I) -> Self
    where
        S: AnnotationStore + ?Sized,
        I: ImageSource + ?Sized,
    {
        let mut editor = Self::new(photo, options);
        let existing = store.load_annotation(&editor.photo.photo_id);
        editor.receive_annotation(existing);
        let background = images.fetch(&editor.photo.image_url);
        editor.receive_background(background);
        editor
    }

    /// Absent data, a failed fetch and an unreadable document all leave the
    /// session initialized. Only the failed fetch is reported to the user.
    pub fn receive_annotation(&mut self, loaded: StorageResult<Option<PersistedAnnotation>>) {
        if self.initialized || !self.is_open() {
            tracing::debug!(photo_id = %self.photo.photo_id, "ignoring repeated annotation load");
            return;
        }

        match loaded {
            Ok(Some(record)) => {
                match Snapshot::from_value(&record.annotation_data) {
                    Ok(snapshot) => self.initial = Some(snapshot),
                    Err(err) => {
                        tracing::warn!(
                            photo_id = %self.photo.photo_id,
                            ?err,
                            "stored annotation is unreadable; starting blank"
                        );
                    }
                }
                self.existing = Some(record);
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(photo_id = %self.photo.photo_id, ?err, "failed to load annotation");
                self.load_notice = Some(format!("Could not load existing annotations: {err}"));
            }
        }
        self.initialized = true;

        if let Some(background) = self.pending_background.take() {
            self.install_background(background);
        }
    }

    /// Holds the photo back until the annotation load has settled, so prior
    /// objects are in the scene before it reports ready.
    pub fn receive_background(&mut self, loaded: Result<DynamicImage, ImageLoadError>) {
        let loading = self
            .surface
            .as_ref()
            .is_some_and(|surface| *surface.state() == SurfaceState::Loading);
        if !loading || self.pending_background.is_some() {
            tracing::debug!(photo_id = %self.photo.photo_id, "ignoring stale background");
            return;
        }
        if !self.initialized {
            self.pending_background = Some(loaded);
            return;
        }
        self.install_background(loaded);
    }

    fn install_background(&mut self, loaded: Result<DynamicImage, ImageLoadError>) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        match surface.install_background(loaded, self.initial.as_ref()) {
            Ok(restored) => {
                tracing::debug!(photo_id = %self.photo.photo_id, restored, "surface ready");
            }
            Err(SurfaceLoadError::Snapshot(err)) => {
                tracing::warn!(
                    photo_id = %self.photo.photo_id,
                    ?err,
                    "stored annotation could not be restored; starting blank"
                );
            }
            Err(SurfaceLoadError::Image(err)) => {
                tracing::warn!(photo_id = %self.photo.photo_id, ?err, "photo failed to load");
            }
        }

        let event = if surface.is_ready() {
            surface.set_tool(self.tool);
            self.history.clear();
            self.history.push(surface.to_snapshot());
            SessionEvent::Ready
        } else {
            SessionEvent::Failed
        };
        if let Err(err) = self.lifecycle.transition(event) {
            tracing::warn!(?err, "load finished outside of loading state");
        }
    }

    pub fn photo(&self) -> &PhotoRef {
        &self.photo
    }

    pub fn state(&self) -> SessionState {
        self.lifecycle.state()
    }

    pub fn is_open(&self) -> bool {
        self.lifecycle.state().is_open()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// `None` once the session is closed.
    pub fn surface(&self) -> Option<&DrawingSurface> {
        self.surface.as_ref()
    }

    pub fn history_status(&self) -> HistoryStatus {
        self.history.status()
    }

    pub fn existing_annotation(&self) -> Option<&PersistedAnnotation> {
        self.existing.as_ref()
    }

    pub fn load_notice(&self) -> Option<&str> {
        self.load_notice.as_deref()
    }

    pub fn save_error(&self) -> Option<&str> {
        self.save_error.as_deref()
    }

    pub fn tool(&self) -> ToolKind {
        self.tool
    }

    pub fn style(&self) -> StrokeStyle {
        self.style
    }

    fn editable_surface(&mut self) -> Option<&mut DrawingSurface> {
        if self.lifecycle.state() != SessionState::Editing {
            return None;
        }
        self.surface.as_mut().filter(|surface| surface.is_ready())
    }

    fn record(&mut self, snapshot: Snapshot) {
        self.history.push(snapshot);
        let status = self.history.status();
        tracing::debug!(
            past = status.past_count,
            future = status.future_count,
            "history recorded"
        );
    }

    /// Returns whether the gesture committed a change.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> bool {
        let Some(snapshot) = self
            .editable_surface()
            .and_then(|surface| surface.handle_pointer(event))
        else {
            return false;
        };
        self.record(snapshot);
        true
    }

    pub fn undo(&mut self) -> Option<Snapshot> {
        self.step_history(HistoryAction::Undo)
    }

    pub fn redo(&mut self) -> Option<Snapshot> {
        self.step_history(HistoryAction::Redo)
    }

    fn step_history(&mut self, action: HistoryAction) -> Option<Snapshot> {
        self.editable_surface()?;
        let Some(snapshot) = self.history.peek(action).cloned() else {
            tracing::debug!("{}", action.empty_message());
            return None;
        };
        let surface = self.editable_surface()?;
        if let Err(err) = surface.restore(&snapshot) {
            tracing::warn!(?err, "history snapshot could not be restored");
            return None;
        }
        self.history.apply(action);
        tracing::debug!("{}", action.applied_message());
        Some(snapshot)
    }

    /// Empties the canvas and starts a fresh history from the blank state.
    pub fn clear(&mut self) -> bool {
        let Some(snapshot) = self.editable_surface().and_then(DrawingSurface::clear_all) else {
            return false;
        };
        self.history.clear();
        self.history.push(snapshot);
        true
    }

    pub fn delete_selected(&mut self) -> bool {
        let Some(snapshot) = self
            .editable_surface()
            .and_then(DrawingSurface::delete_selected)
        else {
            return false;
        };
        self.record(snapshot);
        true
    }

    pub fn resize_selected(&mut self, factor: f64) -> bool {
        let Some(snapshot) = self
            .editable_surface()
            .and_then(|surface| surface.resize_selected(factor))
        else {
            return false;
        };
        self.record(snapshot);
        true
    }

    pub fn set_tool(&mut self, tool: ToolKind) {
        self.tool = tool;
        if let Some(surface) = self.surface.as_mut() {
            surface.set_tool(tool);
        }
    }

    pub fn set_color(&mut self, color: Color) {
        self.style.set_color(color);
        if let Some(surface) = self.surface.as_mut() {
            surface.set_color(color);
        }
    }

    pub fn set_width(&mut self, width: f64) {
        self.style.set_width(width);
        let width = self.style.width;
        if let Some(surface) = self.surface.as_mut() {
            surface.set_width(width);
        }
    }

    pub fn handle_key(
        &mut self,
        key: ShortcutKey,
        modifiers: ShortcutModifiers,
        text_input_focused: bool,
    ) -> Option<EditorEvent> {
        let context = InputContext {
            editor_open: self.is_open(),
            text_input_focused,
        };
        match resolve_shortcut(key, modifiers, context)? {
            ShortcutAction::EditorCloseRequested => return Some(self.close()),
            ShortcutAction::EditorUndo => {
                self.undo();
            }
            ShortcutAction::EditorRedo => {
                self.redo();
            }
            ShortcutAction::EditorDeleteSelection => {
                self.delete_selected();
            }
            ShortcutAction::EditorEnterSelect => self.set_tool(ToolKind::Select),
            ShortcutAction::EditorEnterArrow => self.set_tool(ToolKind::Arrow),
            ShortcutAction::EditorEnterFreehand => self.set_tool(ToolKind::Freehand),
        }
        None
    }

    fn capture_save_request(&self) -> AppResult<SaveAnnotation> {
        let surface = self
            .surface
            .as_ref()
            .filter(|surface| surface.is_ready())
            .ok_or(AppError::SurfaceNotReady)?;
        let snapshot = surface.to_snapshot();
        let flattened_image = surface
            .to_flattened_image()?
            .ok_or(AppError::SurfaceNotReady)?;
        Ok(SaveAnnotation {
            photo_id: self.photo.photo_id.clone(),
            project_id: self.photo.project_id.clone(),
            annotation_data: snapshot.to_value(),
            flattened_image,
        })
    }

    /// Takes the snapshot and the flattened export from the same scene state
    /// and marks the session busy. Fails while another save is in flight.
    pub fn begin_save(&mut self) -> AppResult<SaveTicket> {
        self.lifecycle.transition(SessionEvent::SaveRequested)?;
        match self.capture_save_request() {
            Ok(request) => {
                self.generation += 1;
                self.save_error = None;
                tracing::debug!(photo_id = %self.photo.photo_id, generation = self.generation, "save started");
                Ok(SaveTicket {
                    generation: self.generation,
                    request,
                })
            }
            Err(err) => {
                self.save_error = Some(err.to_string());
                self.lifecycle.transition(SessionEvent::SaveFailed)?;
                Err(err)
            }
        }
    }

    /// `Ok(None)` when the result no longer applies: the session closed or a
    /// newer save superseded this ticket. A store failure keeps the session
    /// open with every drawn object intact and is returned as the error.
    pub fn finish_save(
        &mut self,
        ticket: SaveTicket,
        result: StorageResult<PersistedAnnotation>,
    ) -> AppResult<Option<EditorEvent>> {
        if self.lifecycle.state() != SessionState::Saving || ticket.generation != self.generation {
            tracing::warn!(
                photo_id = %self.photo.photo_id,
                ticket = ticket.generation,
                current = self.generation,
                state = ?self.lifecycle.state(),
                "ignoring late save result"
            );
            return Ok(None);
        }
        self.settle_save(result).map(Some)
    }

    fn settle_save(&mut self, result: StorageResult<PersistedAnnotation>) -> AppResult<EditorEvent> {
        match result {
            Ok(record) => {
                self.lifecycle.transition(SessionEvent::SaveSucceeded)?;
                self.existing = Some(record.clone());
                self.surface = None;
                tracing::info!(
                    photo_id = %self.photo.photo_id,
                    annotation_id = %record.id,
                    "annotation saved; editor closed"
                );
                Ok(EditorEvent::Saved(record))
            }
            Err(err) => {
                tracing::warn!(photo_id = %self.photo.photo_id, ?err, "save failed");
                self.save_error = Some(err.to_string());
                self.lifecycle.transition(SessionEvent::SaveFailed)?;
                Err(err.into())
            }
        }
    }

    pub fn save<S>(&mut self, store: &S) -> AppResult<EditorEvent>
    where
        S: AnnotationStore + ?Sized,
    {
        let ticket = self.begin_save()?;
        let result = store.save_annotation(&ticket.request);
        self.settle_save(result)
    }

    /// Drops unsaved work without saving. Safe to call more than once.
    pub fn close(&mut self) -> EditorEvent {
        if self.is_open() {
            if let Err(err) = self.lifecycle.transition(SessionEvent::Close) {
                tracing::warn!(?err, "close rejected by lifecycle");
            }
            self.generation += 1;
            self.surface = None;
            self.pending_background = None;
            tracing::debug!(photo_id = %self.photo.photo_id, "editor session closed");
        }
        EditorEvent::Closed
    }

    pub fn delete_annotation<S>(&mut self, store: &S, annotation_id: &str) -> AppResult<()>
    where
        S: AnnotationStore + ?Sized,
    {
        store.delete_annotation(annotation_id)?;
        if self
            .existing
            .as_ref()
            .is_some_and(|existing| existing.id == annotation_id)
        {
            self.existing = None;
        }
        Ok(())
    }
}
