use std::fs;
use std::io;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, Rgba, RgbaImage};
use sha2::{Digest, Sha256};

/// Image payload ready to attach to a vision request.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub data_url: String,
    pub mime: String,
    /// Hex SHA-256 of the file as read from disk.
    pub sha256: String,
}

/// Reads the staged image and encodes it as a `data:` URL.
///
/// Decodable images are flattened onto white, downscaled to fit `max_dim`
/// and re-encoded as JPEG. Anything the decoder rejects is sent as-is with
/// a MIME type guessed from the extension.
pub fn prepare_image_data_url(path: &Path, max_dim: u32) -> io::Result<PreparedImage> {
    let raw = fs::read(path)?;
    let sha256 = hex::encode(Sha256::digest(&raw));
    let (bytes, mime) = match reencode_jpeg(&raw, max_dim) {
        Some(jpeg) => (jpeg, "image/jpeg".to_string()),
        None => {
            tracing::debug!(path = %path.display(), "image not decodable, sending raw bytes");
            (raw, guess_image_mime(path).to_string())
        }
    };
    let encoded = BASE64.encode(bytes);
    Ok(PreparedImage {
        data_url: format!("data:{mime};base64,{encoded}"),
        mime,
        sha256,
    })
}

fn reencode_jpeg(raw: &[u8], max_dim: u32) -> Option<Vec<u8>> {
    let dim = max_dim.max(128);
    let image = image::load_from_memory(raw).ok()?;
    let rgba = image.to_rgba8();
    let mut flattened = RgbaImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = u16::from(pixel[3]);
        let blend = |channel: u8| -> u8 {
            (((u16::from(channel) * alpha) + (255 * (255 - alpha))) / 255) as u8
        };
        flattened.put_pixel(
            x,
            y,
            Rgba([blend(pixel[0]), blend(pixel[1]), blend(pixel[2]), 255]),
        );
    }
    let mut flattened = DynamicImage::ImageRgba8(flattened);
    if flattened.width() > dim || flattened.height() > dim {
        flattened = flattened.resize(dim, dim, FilterType::Triangle);
    }
    let rgb = DynamicImage::ImageRgb8(flattened.to_rgb8());
    let mut bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut bytes, 90);
    encoder.encode_image(&rgb).ok()?;
    Some(bytes)
}

fn guess_image_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "heic" | "heif" => "image/heic",
        _ => "image/png",
    }
}
