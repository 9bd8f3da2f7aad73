//! Image decode pipeline: turns a picked file into a data URL for `<img>` display.
//!
//! Decoding is asynchronous relative to form edits. A [`PendingImage`] carries the
//! ticket issued when the file was picked, and the result is handed back to the
//! manager, which applies it only if the ticket is still current.

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use thiserror::Error;

use crate::domain::offer::{ImageFile, ImagePreview};
use crate::editor::PreviewTicket;

pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PreviewError {
    #[error("image `{file_name}` is empty")]
    EmptyFile { file_name: String },
    #[error("image `{file_name}` is {size} bytes, above the {limit} byte limit")]
    TooLarge { file_name: String, size: u64, limit: u64 },
    #[error("image `{file_name}` is not a recognised image type")]
    UnsupportedMediaType { file_name: String },
    #[error("could not read image `{path}`: {message}")]
    Read { path: String, message: String },
}

#[async_trait]
pub trait ImageDecoder: Send + Sync {
    async fn decode(&self, file: &ImageFile) -> Result<ImagePreview, PreviewError>;
}

#[derive(Clone, Copy, Debug)]
pub struct DataUrlDecoder {
    max_bytes: u64,
}

impl Default for DataUrlDecoder {
    fn default() -> Self {
        Self { max_bytes: DEFAULT_MAX_IMAGE_BYTES }
    }
}

impl DataUrlDecoder {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    pub fn encode(&self, file: &ImageFile) -> Result<ImagePreview, PreviewError> {
        if file.bytes.is_empty() {
            return Err(PreviewError::EmptyFile { file_name: file.file_name.clone() });
        }

        let size = file.bytes.len() as u64;
        if size > self.max_bytes {
            return Err(PreviewError::TooLarge {
                file_name: file.file_name.clone(),
                size,
                limit: self.max_bytes,
            });
        }

        let media_type = file
            .media_type
            .as_deref()
            .filter(|declared| declared.starts_with("image/"))
            .or_else(|| sniff_media_type(&file.file_name, &file.bytes))
            .ok_or_else(|| PreviewError::UnsupportedMediaType {
                file_name: file.file_name.clone(),
            })?;

        let payload = general_purpose::STANDARD.encode(&file.bytes);
        Ok(ImagePreview(format!("data:{media_type};base64,{payload}")))
    }
}

#[async_trait]
impl ImageDecoder for DataUrlDecoder {
    async fn decode(&self, file: &ImageFile) -> Result<ImagePreview, PreviewError> {
        self.encode(file)
    }
}

/// Magic bytes first, then the file extension.
pub fn sniff_media_type(file_name: &str, bytes: &[u8]) -> Option<&'static str> {
    const SIGNATURES: [(&[u8], &str); 5] = [
        (b"\x89PNG\r\n\x1a\n", "image/png"),
        (b"\xff\xd8\xff", "image/jpeg"),
        (b"GIF87a", "image/gif"),
        (b"GIF89a", "image/gif"),
        (b"BM", "image/bmp"),
    ];
    if let Some((_, media_type)) =
        SIGNATURES.iter().find(|(signature, _)| bytes.starts_with(signature))
    {
        return Some(*media_type);
    }
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some("image/webp");
    }

    let extension = file_name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase())?;
    match extension.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        "avif" => Some("image/avif"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

#[derive(Clone, Debug)]
pub struct PendingImage {
    pub ticket: PreviewTicket,
    pub file: ImageFile,
}

#[derive(Clone, Debug)]
pub struct CompletedImage {
    pub ticket: PreviewTicket,
    pub file: ImageFile,
    pub result: Result<ImagePreview, PreviewError>,
}

impl PendingImage {
    pub async fn decode<D>(self, decoder: &D) -> CompletedImage
    where
        D: ImageDecoder + ?Sized,
    {
        let result = decoder.decode(&self.file).await;
        CompletedImage { ticket: self.ticket, file: self.file, result }
    }
}
