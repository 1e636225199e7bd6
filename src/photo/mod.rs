//! The photo being annotated and where its pixels come from.

use std::io;
use std::path::PathBuf;

use image::DynamicImage;
use thiserror::Error;

use crate::editor::data_url::{data_url_to_bytes, DecodeError};

const FILE_URL_SCHEME: &str = "file://";

#[derive(Debug, Error)]
pub enum ImageLoadError {
    #[error("failed to read photo {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to decode photo {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: image::ImageError,
    },
    #[error("photo url {url} is a malformed data url: {source}")]
    DataUrl {
        url: String,
        #[source]
        source: DecodeError,
    },
    #[error("unsupported photo url scheme: {url}")]
    UnsupportedScheme { url: String },
    #[error("photo {url} has zero width or height")]
    Empty { url: String },
}

/// Identifies the photo an editor session annotates. The url is handed over ready to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoRef {
    pub photo_id: String,
    pub project_id: String,
    pub image_url: String,
}

impl PhotoRef {
    pub fn new(
        photo_id: impl Into<String>,
        project_id: impl Into<String>,
        image_url: impl Into<String>,
    ) -> Self {
        Self {
            photo_id: photo_id.into(),
            project_id: project_id.into(),
            image_url: image_url.into(),
        }
    }
}

pub trait ImageSource {
    fn fetch(&self, url: &str) -> Result<DynamicImage, ImageLoadError>;
}

/// Reads `data:` urls, `file://` urls and bare filesystem paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalImageSource;

impl LocalImageSource {
    fn fetch_data_url(url: &str) -> Result<DynamicImage, ImageLoadError> {
        let decoded = data_url_to_bytes(url).map_err(|source| ImageLoadError::DataUrl {
            url: truncate_for_log(url),
            source,
        })?;
        image::load_from_memory(&decoded.bytes).map_err(|source| ImageLoadError::Decode {
            url: truncate_for_log(url),
            source,
        })
    }

    fn fetch_path(url: &str, path: PathBuf) -> Result<DynamicImage, ImageLoadError> {
        let bytes = std::fs::read(&path).map_err(|source| ImageLoadError::Io {
            path: path.clone(),
            source,
        })?;
        image::load_from_memory(&bytes).map_err(|source| ImageLoadError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

impl ImageSource for LocalImageSource {
    fn fetch(&self, url: &str) -> Result<DynamicImage, ImageLoadError> {
        let image = if url.starts_with("data:") {
            Self::fetch_data_url(url)?
        } else if let Some(path) = url.strip_prefix(FILE_URL_SCHEME) {
            Self::fetch_path(url, PathBuf::from(path))?
        } else if url.contains("://") {
            return Err(ImageLoadError::UnsupportedScheme {
                url: url.to_string(),
            });
        } else {
            Self::fetch_path(url, PathBuf::from(url))?
        };

        if image.width() == 0 || image.height() == 0 {
            return Err(ImageLoadError::Empty {
                url: truncate_for_log(url),
            });
        }
        tracing::debug!(
            width = image.width(),
            height = image.height(),
            "photo loaded"
        );
        Ok(image)
    }
}

fn truncate_for_log(url: &str) -> String {
    const MAX: usize = 64;
    match url.char_indices().nth(MAX) {
        Some((index, _)) => format!("{}...", &url[..index]),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::data_url::png_data_url;
    use image::RgbaImage;

    #[test]
    fn fetches_data_url_photo() {
        let url = png_data_url(&RgbaImage::new(4, 3)).expect("png should encode");
        let image = LocalImageSource.fetch(&url).expect("data url should load");
        assert_eq!((image.width(), image.height()), (4, 3));
    }

    #[test]
    fn fetches_file_url_and_plain_path() {
        let path = std::env::temp_dir().join(format!("photomark-{}.png", uuid::Uuid::new_v4()));
        RgbaImage::new(5, 2).save(&path).expect("fixture should save");

        let by_path = LocalImageSource
            .fetch(path.to_str().expect("temp path is utf-8"))
            .expect("plain path should load");
        assert_eq!(by_path.width(), 5);

        let url = format!("file://{}", path.display());
        let by_url = LocalImageSource.fetch(&url).expect("file url should load");
        assert_eq!(by_url.height(), 2);

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn remote_urls_are_unsupported() {
        let err = LocalImageSource
            .fetch("https://example.com/photo.jpg")
            .expect_err("remote url should be rejected");
        assert!(matches!(err, ImageLoadError::UnsupportedScheme { .. }));
    }

    #[test]
    fn missing_file_and_garbage_bytes_are_distinct_errors() {
        let missing = std::env::temp_dir().join("photomark-missing-photo.png");
        let err = LocalImageSource
            .fetch(missing.to_str().expect("temp path is utf-8"))
            .expect_err("missing file should fail");
        assert!(matches!(err, ImageLoadError::Io { .. }));

        let err = LocalImageSource
            .fetch("data:image/png;base64,aGVsbG8=")
            .expect_err("non-image payload should fail");
        assert!(matches!(err, ImageLoadError::Decode { .. }));
    }
}
