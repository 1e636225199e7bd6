use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{ImageFormat, RgbaImage};
use thiserror::Error;

const DATA_URL_SCHEME: &str = "data:";
const BASE64_MARKER: &str = ";base64";
pub const MIME_IMAGE_PNG: &str = "image/png";

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("not a data url: missing `data:` scheme")]
    MissingScheme,
    #[error("data url has no `,` separating header and payload")]
    MissingPayload,
    #[error("data url payload is not base64 encoded")]
    NotBase64Encoded,
    #[error("data url payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedDataUrl {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Decodes `data:<mime>[;params];base64,<payload>` into raw bytes.
pub fn data_url_to_bytes(data_url: &str) -> Result<DecodedDataUrl, DecodeError> {
    let rest = data_url
        .trim()
        .strip_prefix(DATA_URL_SCHEME)
        .ok_or(DecodeError::MissingScheme)?;
    let (header, payload) = rest.split_once(',').ok_or(DecodeError::MissingPayload)?;
    let media = match header.rsplit_once(';') {
        Some((media, encoding)) if encoding.eq_ignore_ascii_case("base64") => media,
        _ => return Err(DecodeError::NotBase64Encoded),
    };

    let mime_type = media
        .split(';')
        .next()
        .filter(|mime| !mime.is_empty())
        .unwrap_or("text/plain")
        .to_ascii_lowercase();
    let bytes = STANDARD.decode(payload.trim())?;

    Ok(DecodedDataUrl { mime_type, bytes })
}

pub fn png_data_url(image: &RgbaImage) -> image::ImageResult<String> {
    let mut png_bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png)?;
    Ok(format!(
        "{DATA_URL_SCHEME}{MIME_IMAGE_PNG}{BASE64_MARKER},{}",
        STANDARD.encode(&png_bytes)
    ))
}
