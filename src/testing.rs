//! Deterministic collaborators for unit tests.

use crate::error::ResolveError;
use crate::resolve::{Font, FontRef, FontResolver, Image, ImageRef, ImageResolver};
use crate::types::{Pt, Size};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Every character advances by the same amount, spaces included.
#[derive(Debug)]
pub(crate) struct FixedFont {
    pub name: String,
    pub advance: Pt,
    pub height: Pt,
    pub line_spacing: Pt,
}

impl Font for FixedFont {
    fn name(&self) -> &str {
        &self.name
    }

    fn measure(&self, text: &str) -> Size {
        Size::new(self.advance * (text.chars().count() as i32), self.height)
    }

    fn line_spacing(&self) -> Pt {
        self.line_spacing
    }
}

pub(crate) struct FixedFonts {
    fonts: HashMap<String, FontRef>,
}

impl FixedFonts {
    /// `body`: 6pt advance, 10pt tall, 12pt spacing. `title`: 10pt advance, 20pt tall, 24pt spacing.
    pub(crate) fn standard() -> Self {
        let mut fonts: HashMap<String, FontRef> = HashMap::new();
        for (name, advance, height, spacing) in [("body", 6, 10, 12), ("title", 10, 20, 24)] {
            fonts.insert(
                name.to_string(),
                Arc::new(FixedFont {
                    name: name.to_string(),
                    advance: Pt::from_i32(advance),
                    height: Pt::from_i32(height),
                    line_spacing: Pt::from_i32(spacing),
                }),
            );
        }
        Self { fonts }
    }
}

impl FontResolver for FixedFonts {
    fn resolve_font(&self, name: &str) -> Result<FontRef, ResolveError> {
        self.fonts
            .get(name)
            .cloned()
            .ok_or_else(|| format!("unknown font `{name}`").into())
    }
}

#[derive(Debug)]
pub(crate) struct FixedImage {
    pub name: String,
    pub width: u32,
    pub height: u32,
}

impl Image for FixedImage {
    fn name(&self) -> &str {
        &self.name
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

/// `icon` is 16x16, `banner` is 120x30.
pub(crate) struct FixedImages;

impl ImageResolver for FixedImages {
    fn resolve_image(&self, name: &str) -> Result<ImageRef, ResolveError> {
        let (width, height) = match name {
            "icon" => (16, 16),
            "banner" => (120, 30),
            _ => return Err(format!("unknown image `{name}`").into()),
        };
        Ok(Arc::new(FixedImage {
            name: name.to_string(),
            width,
            height,
        }))
    }
}

/// DejaVu Sans Mono: 2048 units per em, every advance (`.notdef` included) is
/// 1233 units, ascender 1901, descender -483, no line gap.
pub(crate) fn fixture_font_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join("fonts")
        .join("DejaVuSansMono.ttf")
}
