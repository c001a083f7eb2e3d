use crate::error::{MarkupError, ResolveError, Result};
use crate::resolve::{Image, ImageRef, ImageResolver};
use base64::Engine;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Decoded image kept as straight (non-premultiplied) RGBA8 rows.
#[derive(Clone)]
pub struct RasterImage {
    name: String,
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RasterImage")
            .field("name", &self.name)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl RasterImage {
    pub fn decode(name: impl Into<String>, data: &[u8], mime: Option<&str>) -> Result<Self> {
        let name = name.into();
        let guessed_format = match mime {
            Some(mime) if mime.contains("png") => Some(image::ImageFormat::Png),
            Some(mime) if mime.contains("jpeg") || mime.contains("jpg") => {
                Some(image::ImageFormat::Jpeg)
            }
            _ => image::guess_format(data).ok(),
        };
        let decoded = match guessed_format {
            Some(format) => image::load_from_memory_with_format(data, format),
            None => image::load_from_memory(data),
        }
        .map_err(|err| MarkupError::Asset(format!("cannot decode image {name}: {err}")))?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Self {
            name,
            width,
            height,
            rgba: rgba.into_raw(),
        })
    }
}

impl Image for RasterImage {
    fn name(&self) -> &str {
        &self.name
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn rgba(&self) -> Option<&[u8]> {
        Some(&self.rgba)
    }
}

/// Named images available to markup `img` elements. `data:` URIs are decoded on
/// demand and need no registration.
#[derive(Debug, Default)]
pub struct ImageRegistry {
    images: HashMap<String, Arc<RasterImage>>,
}

impl ImageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_bytes(&mut self, name: &str, data: &[u8]) -> Result<()> {
        let image = RasterImage::decode(name, data, None)?;
        debug!(image = name, width = image.width, height = image.height, "image registered");
        self.images.insert(name.to_string(), Arc::new(image));
        Ok(())
    }

    pub fn register_file(&mut self, name: &str, path: impl AsRef<std::path::Path>) -> Result<()> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|err| {
            MarkupError::Asset(format!("cannot read image {}: {err}", path.display()))
        })?;
        self.register_bytes(name, &data)
    }

    /// Registered image by name, or a freshly decoded `data:` URI.
    pub fn lookup(&self, name: &str) -> Result<Arc<RasterImage>> {
        if let Some(image) = self.images.get(name) {
            return Ok(Arc::clone(image));
        }
        if let Some((mime, data)) = parse_data_uri(name)? {
            return RasterImage::decode(name, &data, Some(&mime)).map(Arc::new);
        }
        Err(MarkupError::Asset(format!("image `{name}` is not registered")))
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

impl ImageResolver for ImageRegistry {
    fn resolve_image(&self, name: &str) -> std::result::Result<ImageRef, ResolveError> {
        let image = self.lookup(name)?;
        Ok(image as ImageRef)
    }
}

/// Splits a `data:` URI into its media type and payload. Returns `None` for
/// anything that is not a data URI.
pub(crate) fn parse_data_uri(uri: &str) -> Result<Option<(String, Vec<u8>)>> {
    let Some(rest) = uri.strip_prefix("data:") else {
        return Ok(None);
    };
    let Some((header, payload)) = rest.split_once(',') else {
        return Err(MarkupError::Asset("data URI has no payload".to_string()));
    };
    let mime = header
        .split(';')
        .next()
        .filter(|v| !v.is_empty())
        .unwrap_or("application/octet-stream")
        .to_string();
    let data = if header.contains(";base64") {
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|err| MarkupError::Asset(format!("invalid base64 in data URI: {err}")))?
    } else {
        payload.as_bytes().to_vec()
    };
    Ok(Some((mime, data)))
}

#[cfg(test)]
pub(crate) fn png_bytes(width: u32, height: u32, pixel: [u8; 4]) -> Vec<u8> {
    use image::{ImageEncoder, codecs::png::PngEncoder};
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba(pixel));
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgba8)
        .unwrap();
    out
}
