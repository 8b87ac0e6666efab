//! Image file resolution.
//!
//! Layout under the images root:
//! - `coffees/<normalized coffee name>.png`
//! - `cups/<hot|cold>/<size>.png`

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

use crate::search::normalize::{normalize_key, normalize_name};
use crate::server::error::AppError;

const IMAGE_EXTENSION: &str = "png";

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageNotFound {
    #[error("Image type not found")]
    UnknownType,

    #[error("Image not found")]
    Missing,
}

/// Closed set of cup image families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CupType {
    Hot,
    Cold,
}

impl CupType {
    pub fn parse(raw: &str) -> Result<Self, ImageNotFound> {
        match normalize_key(raw).as_str() {
            "hot" => Ok(Self::Hot),
            "cold" => Ok(Self::Cold),
            _ => Err(ImageNotFound::UnknownType),
        }
    }

    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Hot => "hot",
            Self::Cold => "cold",
        }
    }
}

pub fn coffee_image_path(images_dir: &Path, coffee_name: &str) -> Result<PathBuf, ImageNotFound> {
    let normalized = normalize_name(coffee_name);
    let stem = checked_identifier(&normalized)?;
    Ok(images_dir
        .join("coffees")
        .join(format!("{stem}.{IMAGE_EXTENSION}")))
}

/// The cup type is checked before the size, so an unknown type always wins.
pub fn cup_image_path(
    images_dir: &Path,
    cup_type: &str,
    size: &str,
) -> Result<PathBuf, ImageNotFound> {
    let cup_type = CupType::parse(cup_type)?;
    let normalized = normalize_key(size);
    let stem = checked_identifier(&normalized)?;
    Ok(images_dir
        .join("cups")
        .join(cup_type.dir_name())
        .join(format!("{stem}.{IMAGE_EXTENSION}")))
}

pub async fn read_image(path: &Path) -> Result<Vec<u8>, AppError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(bytes),
        Err(err) if err.kind() == ErrorKind::NotFound => Err(ImageNotFound::Missing.into()),
        Err(err) => Err(AppError::Internal(
            anyhow::Error::new(err).context(format!("reading image {}", path.display())),
        )),
    }
}

pub fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Reject identifiers that could escape the images root.
fn checked_identifier(raw: &str) -> Result<&str, ImageNotFound> {
    if raw.is_empty() || raw.contains(['/', '\\', '\0']) || has_dot_components(Path::new(raw)) {
        return Err(ImageNotFound::Missing);
    }
    Ok(raw)
}

fn has_dot_components(path: &Path) -> bool {
    path.components()
        .any(|c| matches!(c, Component::CurDir | Component::ParentDir))
}
