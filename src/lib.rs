pub mod config;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod input;
pub mod logging;
pub mod photo;
pub mod state;
pub mod storage;
pub use editor::{AnnotationEditor, EditorEvent, EditorOptions};
pub use error::{AppError, AppResult};

/// Entrypoint used by hosts: installs logging, reads the user's editor
/// config and opens a session for `photo`.
pub fn open_editor<S, I>(photo: photo::PhotoRef, store: &S, images: &I) -> AnnotationEditor
where
    S: storage::AnnotationStore + ?Sized,
    I: photo::ImageSource + ?Sized,
{
    logging::init();
    let options = config::load_editor_config().editor_options();
    tracing::info!(photo_id = %photo.photo_id, "opening annotation editor");

    let editor = AnnotationEditor::open(photo, options, store, images);
    tracing::info!("editor ready with state={:?}", editor.state());
    editor
}
