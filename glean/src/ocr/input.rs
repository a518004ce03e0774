use std::fmt;
use std::sync::{Arc, LazyLock};

use base64::{engine::general_purpose::STANDARD, Engine};
use image::{DynamicImage, GenericImageView, ImageReader, RgbImage};
use regex::Regex;
use serde::{Deserialize, Deserializer};

use crate::error::{GleanError, Result};

static DATA_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^data:image/[^;,]+;base64,(?P<b64>.+)$").expect("valid data URL pattern")
});

/// One image as handed to the pipeline.
#[derive(Clone, PartialEq, Eq)]
pub enum ImageInput {
    RawBytes(Vec<u8>),
    Base64Text(String),
    DataUrlText(String),
    /// Wrapper object whose `content` holds another input; `None` when the
    /// field was null.
    Container {
        mime: Option<String>,
        content: Option<Box<ImageInput>>,
    },
}

impl ImageInput {
    /// Classify a text value as a data URL or plain base64.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        if DATA_URL.is_match(&text) {
            ImageInput::DataUrlText(text)
        } else {
            ImageInput::Base64Text(text)
        }
    }

    pub fn container(content: ImageInput) -> Self {
        ImageInput::Container {
            mime: None,
            content: Some(Box::new(content)),
        }
    }
}

impl From<Vec<u8>> for ImageInput {
    fn from(bytes: Vec<u8>) -> Self {
        ImageInput::RawBytes(bytes)
    }
}

impl From<String> for ImageInput {
    fn from(text: String) -> Self {
        ImageInput::from_text(text)
    }
}

impl From<&str> for ImageInput {
    fn from(text: &str) -> Self {
        ImageInput::from_text(text)
    }
}

impl fmt::Debug for ImageInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageInput::RawBytes(bytes) => write!(f, "RawBytes({} bytes)", bytes.len()),
            ImageInput::Base64Text(text) => write!(f, "Base64Text({} chars)", text.len()),
            ImageInput::DataUrlText(text) => write!(f, "DataUrlText({} chars)", text.len()),
            ImageInput::Container { mime, content } => f
                .debug_struct("Container")
                .field("mime", mime)
                .field("content", content)
                .finish(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireImage {
    Bytes(Vec<u8>),
    Text(String),
    Container {
        #[serde(default)]
        mime: Option<String>,
        content: Option<Box<WireImage>>,
    },
}

impl From<WireImage> for ImageInput {
    fn from(wire: WireImage) -> Self {
        match wire {
            WireImage::Bytes(bytes) => ImageInput::RawBytes(bytes),
            WireImage::Text(text) => ImageInput::from_text(text),
            WireImage::Container { mime, content } => ImageInput::Container {
                mime,
                content: content.map(|inner| Box::new(ImageInput::from(*inner))),
            },
        }
    }
}

/// JSON shape: a string (data URL or base64), an array of byte values, or
/// an object with a `content` field holding any of those.
impl<'de> Deserialize<'de> for ImageInput {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        WireImage::deserialize(deserializer).map(ImageInput::from)
    }
}

/// Parse a JSON array of wire images, dropping entries that match no image
/// shape. Only a malformed document or a non-array top level is an error.
pub fn parse_image_list(json: &str) -> Result<Vec<ImageInput>> {
    let values: Vec<serde_json::Value> = serde_json::from_str(json)?;

    Ok(values
        .into_iter()
        .enumerate()
        .filter_map(|(idx, value)| {
            if value.is_null() {
                return None;
            }
            match serde_json::from_value::<ImageInput>(value) {
                Ok(input) => Some(input),
                Err(e) => {
                    tracing::debug!(entry = idx, "Dropping malformed image entry: {}", e);
                    None
                }
            }
        })
        .collect())
}

/// A decoded RGB raster, cheap to clone.
#[derive(Debug, Clone)]
pub struct CanonicalImage(Arc<RgbImage>);

impl CanonicalImage {
    pub fn new(image: RgbImage) -> Self {
        Self(Arc::new(image))
    }

    pub fn rgb(&self) -> &RgbImage {
        &self.0
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.0.dimensions()
    }
}

/// Turn an input into image file bytes without decoding the image itself.
pub fn to_image_bytes(input: &ImageInput) -> Result<Vec<u8>> {
    match input {
        ImageInput::RawBytes(bytes) => Ok(bytes.clone()),
        ImageInput::DataUrlText(text) | ImageInput::Base64Text(text) => {
            let payload = DATA_URL
                .captures(text)
                .and_then(|caps| caps.name("b64"))
                .map_or(text.as_str(), |m| m.as_str());
            decode_base64(payload)
        }
        ImageInput::Container { content, .. } => match content {
            Some(inner) => to_image_bytes(inner),
            None => Err(GleanError::Decode("container has no content".to_string())),
        },
    }
}

fn decode_base64(payload: &str) -> Result<Vec<u8>> {
    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|e| GleanError::Decode(format!("invalid base64: {e}")))
}

/// Decode image file bytes into an RGB raster no larger than `max_dimension`
/// on either side.
pub fn decode_canonical(bytes: &[u8], max_dimension: u32) -> Result<CanonicalImage> {
    if bytes.is_empty() {
        return Err(GleanError::Decode("empty image data".to_string()));
    }

    let img = ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()?
        .decode()?;
    let img = resize_if_needed(img, max_dimension);

    Ok(CanonicalImage::new(img.to_rgb8()))
}

/// Normalize one input. Every failure is reported as `None`.
pub fn normalize(input: Option<&ImageInput>, max_dimension: u32) -> Option<CanonicalImage> {
    let input = input?;
    let result = to_image_bytes(input).and_then(|bytes| decode_canonical(&bytes, max_dimension));
    match result {
        Ok(image) => Some(image),
        Err(e) => {
            tracing::debug!(input = ?input, "Dropping undecodable image: {}", e);
            None
        }
    }
}

/// Normalize a sequence, keeping surviving images in input order.
pub fn normalize_all<'a, I>(inputs: I, max_dimension: u32) -> Vec<CanonicalImage>
where
    I: IntoIterator<Item = &'a ImageInput>,
{
    inputs
        .into_iter()
        .filter_map(|input| normalize(Some(input), max_dimension))
        .collect()
}

/// Downscale with Lanczos3 when either side exceeds `max_dim`, keeping the
/// aspect ratio. A `max_dim` of zero disables resizing.
fn resize_if_needed(img: DynamicImage, max_dim: u32) -> DynamicImage {
    let (width, height) = img.dimensions();

    if max_dim == 0 || (width <= max_dim && height <= max_dim) {
        return img;
    }

    let ratio = if width > height {
        max_dim as f32 / width as f32
    } else {
        max_dim as f32 / height as f32
    };

    let new_width = ((width as f32 * ratio) as u32).max(1);
    let new_height = ((height as f32 * ratio) as u32).max(1);

    img.resize(new_width, new_height, image::imageops::FilterType::Lanczos3)
}
