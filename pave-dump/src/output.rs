use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::RgbImage;
use pave::OutputImage;

/// How decoded frames are stored on disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputKind {
    Png,
    /// Headerless packed RGB24, `width * 3` bytes per row.
    Raw,
}

impl OutputKind {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Raw => "rgb",
        }
    }
}

pub fn frame_path(dir: &Path, frame_number: u32, kind: OutputKind) -> PathBuf {
    dir.join(format!("frame_{frame_number:06}.{}", kind.extension()))
}

/// Write one decoded frame and return the path it was written to.
pub fn write_frame(
    dir: &Path,
    frame_number: u32,
    image: OutputImage,
    kind: OutputKind,
) -> Result<PathBuf> {
    let path = frame_path(dir, frame_number, kind);

    match kind {
        OutputKind::Raw => {
            std::fs::write(&path, &image.data)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        OutputKind::Png => {
            let (width, height, data) = image.into_parts();
            let buffer = RgbImage::from_raw(width, height, data)
                .context("Decoded image does not match its dimensions")?;
            buffer
                .save(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
    }

    Ok(path)
}
