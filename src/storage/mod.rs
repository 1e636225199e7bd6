use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::editor::data_url::{data_url_to_bytes, DecodeError};

const RECORDS_SUBDIR: &str = "records";
const FLATTENED_SUBDIR: &str = "flattened";
const DATA_SUBDIR: &str = ".local/share/photomark";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("missing HOME environment variable")]
    MissingHomeDirectory,
    #[error("invalid {kind}: {value:?}")]
    InvalidId { kind: &'static str, value: String },
    #[error("annotation {annotation_id} not found")]
    NotFound { annotation_id: String },
    #[error("flattened image is not a usable data url: {0}")]
    Decode(#[from] DecodeError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("annotation record is not valid json: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// The single stored annotation of a photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedAnnotation {
    pub id: String,
    pub photo_id: String,
    pub project_id: String,
    pub annotation_data: serde_json::Value,
    pub flattened_path: String,
    pub created_at: u64,
    pub updated_at: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaveAnnotation {
    pub photo_id: String,
    pub project_id: String,
    pub annotation_data: serde_json::Value,
    /// PNG data url of the flattened export.
    pub flattened_image: String,
}

pub trait AnnotationStore {
    /// `Ok(None)` when the photo has never been annotated.
    fn load_annotation(&self, photo_id: &str) -> StorageResult<Option<PersistedAnnotation>>;
    /// Creates or replaces the photo's annotation.
    fn save_annotation(&self, request: &SaveAnnotation) -> StorageResult<PersistedAnnotation>;
    fn delete_annotation(&self, annotation_id: &str) -> StorageResult<()>;
}

/// Keeps one JSON record per photo plus the flattened PNG exports, under a single root.
#[derive(Debug, Clone)]
pub struct FsAnnotationStore {
    root: PathBuf,
}

impl FsAnnotationStore {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn with_default_paths() -> StorageResult<Self> {
        let root = match std::env::var("XDG_DATA_HOME") {
            Ok(data_home) if !data_home.trim().is_empty() => {
                PathBuf::from(data_home).join("photomark")
            }
            _ => {
                let home =
                    std::env::var("HOME").map_err(|_| StorageError::MissingHomeDirectory)?;
                PathBuf::from(home).join(DATA_SUBDIR)
            }
        };
        fs::create_dir_all(root.join(RECORDS_SUBDIR))?;
        fs::create_dir_all(root.join(FLATTENED_SUBDIR))?;
        Ok(Self::with_root(root))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn validate_id(kind: &'static str, value: &str) -> StorageResult<()> {
        let invalid = value.trim().is_empty()
            || value.contains(['/', '\\'])
            || value == "."
            || value == "..";
        if invalid {
            return Err(StorageError::InvalidId {
                kind,
                value: value.to_string(),
            });
        }
        Ok(())
    }

    fn record_path(&self, photo_id: &str) -> PathBuf {
        self.root
            .join(RECORDS_SUBDIR)
            .join(format!("{photo_id}.json"))
    }

    fn allocate_flattened_path(&self, project_id: &str, photo_id: &str) -> PathBuf {
        self.root
            .join(FLATTENED_SUBDIR)
            .join(project_id)
            .join(format!("{photo_id}-{}.png", Uuid::new_v4()))
    }

    fn read_record(path: &Path) -> StorageResult<Option<PersistedAnnotation>> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    fn write_record(&self, record: &PersistedAnnotation) -> StorageResult<()> {
        let path = self.record_path(&record.photo_id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, serde_json::to_vec_pretty(record)?)?;
        fs::rename(&staging, &path)?;
        Ok(())
    }

    fn find_by_annotation_id(
        &self,
        annotation_id: &str,
    ) -> StorageResult<Option<(PathBuf, PersistedAnnotation)>> {
        let records_dir = self.root.join(RECORDS_SUBDIR);
        if !records_dir.exists() {
            return Ok(None);
        }

        for entry in fs::read_dir(&records_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match Self::read_record(&path) {
                Ok(Some(record)) if record.id == annotation_id => return Ok(Some((path, record))),
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(path = %path.display(), ?err, "skipping unreadable annotation record");
                }
            }
        }
        Ok(None)
    }
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

impl AnnotationStore for FsAnnotationStore {
    fn load_annotation(&self, photo_id: &str) -> StorageResult<Option<PersistedAnnotation>> {
        Self::validate_id("photo id", photo_id)?;
        Self::read_record(&self.record_path(photo_id))
    }

    fn save_annotation(&self, request: &SaveAnnotation) -> StorageResult<PersistedAnnotation> {
        Self::validate_id("photo id", &request.photo_id)?;
        Self::validate_id("project id", &request.project_id)?;
        let png = data_url_to_bytes(&request.flattened_image)?;
        let previous = self.load_annotation(&request.photo_id)?;

        let flattened = self.allocate_flattened_path(&request.project_id, &request.photo_id);
        if let Some(parent) = flattened.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&flattened, &png.bytes)?;

        let now = unix_now();
        let record = PersistedAnnotation {
            id: previous
                .as_ref()
                .map(|existing| existing.id.clone())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            photo_id: request.photo_id.clone(),
            project_id: request.project_id.clone(),
            annotation_data: request.annotation_data.clone(),
            flattened_path: flattened.to_string_lossy().into_owned(),
            created_at: previous.as_ref().map_or(now, |existing| existing.created_at),
            updated_at: now,
        };

        if let Err(err) = self.write_record(&record) {
            let _ = remove_if_present(&flattened);
            return Err(err);
        }

        if let Some(previous) = previous {
            if previous.flattened_path != record.flattened_path {
                if let Err(err) = remove_if_present(Path::new(&previous.flattened_path)) {
                    tracing::warn!(
                        path = %previous.flattened_path,
                        ?err,
                        "failed to remove superseded flattened image"
                    );
                }
            }
        }

        tracing::info!(
            annotation_id = %record.id,
            photo_id = %record.photo_id,
            "annotation saved"
        );
        Ok(record)
    }

    fn delete_annotation(&self, annotation_id: &str) -> StorageResult<()> {
        Self::validate_id("annotation id", annotation_id)?;
        let (record_path, record) =
            self.find_by_annotation_id(annotation_id)?
                .ok_or_else(|| StorageError::NotFound {
                    annotation_id: annotation_id.to_string(),
                })?;

        remove_if_present(Path::new(&record.flattened_path))?;
        remove_if_present(&record_path)?;
        tracing::info!(annotation_id, photo_id = %record.photo_id, "annotation deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::data_url::png_data_url;
    use image::RgbaImage;
    use serde_json::json;

    fn scratch_store() -> FsAnnotationStore {
        FsAnnotationStore::with_root(
            std::env::temp_dir().join(format!("photomark-store-{}", Uuid::new_v4())),
        )
    }

    fn request(photo_id: &str, objects: usize) -> SaveAnnotation {
        let objects: Vec<_> = (0..objects)
            .map(|index| {
                json!({
                    "type": "arrow",
                    "start": { "x": 0.0, "y": index as f64 },
                    "end": { "x": 50.0, "y": index as f64 },
                    "color": "#ef4444",
                    "width": 4.0
                })
            })
            .collect();
        SaveAnnotation {
            photo_id: photo_id.to_string(),
            project_id: "project-1".to_string(),
            annotation_data: json!({ "version": 1, "objects": objects }),
            flattened_image: png_data_url(&RgbaImage::new(2, 2)).expect("png should encode"),
        }
    }

    #[test]
    fn load_of_unannotated_photo_is_none() {
        let store = scratch_store();
        assert!(store
            .load_annotation("photo-1")
            .expect("missing record is not an error")
            .is_none());
    }

    #[test]
    fn save_then_load_returns_same_record_and_writes_png() {
        let store = scratch_store();
        let saved = store
            .save_annotation(&request("photo-1", 1))
            .expect("save should work");

        let loaded = store
            .load_annotation("photo-1")
            .expect("load should work")
            .expect("record should exist");
        assert_eq!(loaded, saved);
        assert_eq!(loaded.project_id, "project-1");
        let png = std::fs::read(&saved.flattened_path).expect("png should be on disk");
        assert!(image::load_from_memory(&png).is_ok());

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[test]
    fn resave_keeps_one_record_per_photo_and_drops_old_png() {
        let store = scratch_store();
        let first = store
            .save_annotation(&request("photo-1", 1))
            .expect("first save");
        let second = store
            .save_annotation(&request("photo-1", 2))
            .expect("second save");

        assert_eq!(second.id, first.id);
        assert_eq!(second.created_at, first.created_at);
        assert_ne!(second.flattened_path, first.flattened_path);
        assert!(!Path::new(&first.flattened_path).exists());
        assert!(Path::new(&second.flattened_path).exists());

        let records = std::fs::read_dir(store.root().join(RECORDS_SUBDIR))
            .expect("records dir")
            .count();
        assert_eq!(records, 1);
        let loaded = store
            .load_annotation("photo-1")
            .expect("load")
            .expect("record");
        assert_eq!(loaded.annotation_data["objects"].as_array().map(Vec::len), Some(2));

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[test]
    fn malformed_flattened_image_fails_without_writing_a_record() {
        let store = scratch_store();
        let mut bad = request("photo-1", 1);
        bad.flattened_image = "not a data url".to_string();

        let err = store.save_annotation(&bad).expect_err("save should fail");
        assert!(matches!(err, StorageError::Decode(DecodeError::MissingScheme)));
        assert!(store.load_annotation("photo-1").expect("load").is_none());
    }

    #[test]
    fn ids_with_path_separators_are_rejected() {
        let store = scratch_store();
        assert!(matches!(
            store.load_annotation("../escape"),
            Err(StorageError::InvalidId { kind: "photo id", .. })
        ));

        let mut bad_project = request("photo-1", 1);
        bad_project.project_id = String::new();
        assert!(matches!(
            store.save_annotation(&bad_project),
            Err(StorageError::InvalidId { kind: "project id", .. })
        ));
    }

    #[test]
    fn delete_removes_record_and_png() {
        let store = scratch_store();
        let saved = store
            .save_annotation(&request("photo-1", 1))
            .expect("save should work");

        store
            .delete_annotation(&saved.id)
            .expect("delete should work");
        assert!(store.load_annotation("photo-1").expect("load").is_none());
        assert!(!Path::new(&saved.flattened_path).exists());

        assert!(matches!(
            store.delete_annotation(&saved.id),
            Err(StorageError::NotFound { .. })
        ));

        let _ = std::fs::remove_dir_all(store.root());
    }
}
