use std::sync::Once;

use magick_rust::{magick_wand_genesis, MagickWand};
use thiserror::Error;

use crate::constants::{ALLOWED_IMAGE_TYPES, IMAGE_QUALITY, MAX_IMAGE_WIDTH};

static START: Once = Once::new();

pub const SVG_MIME: &str = "image/svg+xml";
pub const WEBP_MIME: &str = "image/webp";

#[derive(Debug, Error)]
#[error("unable to process image: {0}")]
pub struct MediaTranscodeError(pub &'static str);

impl From<magick_rust::MagickError> for MediaTranscodeError {
    fn from(s: magick_rust::MagickError) -> Self {
        Self(s.0)
    }
}

#[derive(Debug)]
pub struct TranscodedImage {
    pub bytes: Vec<u8>,
    pub width: i32,
    pub height: i32,
}

/// Normalizes a declared content type to its mime essence (lowercased, any
/// parameters dropped), or `None` when it does not parse as a mime type.
pub fn mime_essence(content_type: &str) -> Option<String> {
    content_type
        .parse::<mime::Mime>()
        .ok()
        .map(|m| m.essence_str().to_ascii_lowercase())
}

pub fn is_allowed_image_type(essence: &str) -> bool {
    ALLOWED_IMAGE_TYPES.contains(&essence)
}

/// Re-encodes raster image bytes as WebP at the fixed quality factor,
/// shrinking so the width never exceeds the cap. Aspect ratio is preserved
/// and images narrower than the cap are never upscaled. CPU-bound; callers
/// run this off the async runtime.
pub fn transcode(contents: &[u8]) -> Result<TranscodedImage, MediaTranscodeError> {
    START.call_once(|| {
        magick_wand_genesis();
    });

    let mut wand = MagickWand::new();
    wand.read_image_blob(contents)?;

    let width = wand.get_image_width();
    let height = wand.get_image_height();
    if width > MAX_IMAGE_WIDTH {
        wand.fit(MAX_IMAGE_WIDTH, height);
    }

    wand.set_image_compression_quality(IMAGE_QUALITY)?;
    let bytes = wand.write_image_blob("webp")?;

    Ok(TranscodedImage {
        bytes,
        width: wand.get_image_width() as i32,
        height: wand.get_image_height() as i32,
    })
}
