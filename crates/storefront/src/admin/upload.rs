//! Validation and naming of product image uploads.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use mime_guess::mime;
use uuid::Uuid;

use techmart_core::ObjectKey;

use super::AdminError;

/// Largest image accepted for upload (5 MiB).
pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

/// Why a file cannot be uploaded as a product image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRejection {
    /// The extension maps to no known media type.
    UnknownType,
    /// The media type is not `image/*`.
    NotAnImage(String),
    /// The file exceeds [`MAX_IMAGE_BYTES`].
    TooLarge(u64),
    /// The path is a directory or other non-file.
    NotAFile,
}

impl fmt::Display for ImageRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownType => write!(f, "cannot tell the file type from its extension"),
            Self::NotAnImage(mime) => write!(f, "{mime} is not an image type"),
            Self::TooLarge(size) => write!(
                f,
                "{size} bytes exceeds the {MAX_IMAGE_BYTES} byte limit"
            ),
            Self::NotAFile => write!(f, "not a regular file"),
        }
    }
}

/// A local image that passed validation, with the name it will be stored under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub path: PathBuf,
    pub key: ObjectKey,
    pub content_type: String,
    pub size: u64,
}

impl ImageUpload {
    /// Check a local file and assign it a unique storage key.
    ///
    /// Only metadata is read; the bytes are read at upload time.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Io` if the file cannot be inspected, or
    /// `AdminError::InvalidImage` if it is not an acceptable image.
    pub async fn inspect(path: &Path) -> Result<Self, AdminError> {
        let metadata = tokio::fs::metadata(path).await.map_err(|source| AdminError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let invalid = |reason| AdminError::InvalidImage {
            path: path.to_path_buf(),
            reason,
        };

        if !metadata.is_file() {
            return Err(invalid(ImageRejection::NotAFile));
        }
        let content_type = check_image(path, metadata.len()).map_err(invalid)?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map_or_else(|| "bin".to_string(), str::to_ascii_lowercase);

        Ok(Self {
            path: path.to_path_buf(),
            key: object_key(&extension, Utc::now()),
            content_type,
            size: metadata.len(),
        })
    }
}

/// Media type of an acceptable image, judged by extension and size.
pub fn check_image(path: &Path, size: u64) -> Result<String, ImageRejection> {
    let guessed = mime_guess::from_path(path)
        .first()
        .ok_or(ImageRejection::UnknownType)?;

    if guessed.type_() != mime::IMAGE {
        return Err(ImageRejection::NotAnImage(guessed.essence_str().to_string()));
    }
    if size > MAX_IMAGE_BYTES {
        return Err(ImageRejection::TooLarge(size));
    }

    Ok(guessed.essence_str().to_string())
}

/// Unique storage key: `<uuid>-<unix-millis>.<ext>`.
pub fn object_key(extension: &str, now: DateTime<Utc>) -> ObjectKey {
    ObjectKey::new(format!(
        "{}-{}.{extension}",
        Uuid::new_v4(),
        now.timestamp_millis()
    ))
}
