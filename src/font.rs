use crate::error::{MarkupError, ResolveError, Result};
use crate::resolve::{Font, FontRef, FontResolver};
use crate::types::{Pt, Size};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::debug;
use ttf_parser::GlyphId;

const WIDTH_CACHE_ENTRIES: usize = 4_096;

#[derive(Debug)]
struct TextWidthCache {
    map: HashMap<String, Pt>,
    order: VecDeque<String>,
    max_entries: usize,
}

impl TextWidthCache {
    fn new(max_entries: usize) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            max_entries,
        }
    }

    fn get(&self, text: &str) -> Option<Pt> {
        self.map.get(text).copied()
    }

    fn insert(&mut self, text: &str, value: Pt) {
        if self.map.contains_key(text) {
            return;
        }
        self.map.insert(text.to_string(), value);
        self.order.push_back(text.to_string());
        while self.map.len() > self.max_entries {
            if let Some(old) = self.order.pop_front() {
                self.map.remove(&old);
            } else {
                break;
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct FaceMetrics {
    pub(crate) units_per_em: u16,
    pub(crate) ascender: i16,
    pub(crate) descender: i16,
    pub(crate) line_gap: i16,
}

/// TrueType/OpenType font at a fixed point size.
pub struct TtfFont {
    name: String,
    data: Arc<Vec<u8>>,
    size: Pt,
    metrics: FaceMetrics,
    width_cache: Mutex<TextWidthCache>,
}

impl fmt::Debug for TtfFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtfFont")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl TtfFont {
    pub fn from_bytes(name: impl Into<String>, data: Vec<u8>, size: Pt) -> Result<Self> {
        Self::from_shared(name.into(), Arc::new(data), size)
    }

    fn from_shared(name: String, data: Arc<Vec<u8>>, size: Pt) -> Result<Self> {
        let face = ttf_parser::Face::parse(&data, 0)
            .map_err(|err| MarkupError::Asset(format!("invalid font data for {name}: {err}")))?;
        let units_per_em = face.units_per_em();
        if units_per_em == 0 {
            return Err(MarkupError::Asset(format!(
                "font {name} reports zero units per em"
            )));
        }
        let metrics = FaceMetrics {
            units_per_em,
            ascender: face.ascender(),
            descender: face.descender(),
            line_gap: face.line_gap(),
        };
        Ok(Self {
            name,
            data,
            size,
            metrics,
            width_cache: Mutex::new(TextWidthCache::new(WIDTH_CACHE_ENTRIES)),
        })
    }

    /// Same face at another point size; font bytes are shared.
    pub fn with_size(&self, name: impl Into<String>, size: Pt) -> Self {
        Self {
            name: name.into(),
            data: Arc::clone(&self.data),
            size,
            metrics: self.metrics,
            width_cache: Mutex::new(TextWidthCache::new(WIDTH_CACHE_ENTRIES)),
        }
    }

    pub fn size(&self) -> Pt {
        self.size
    }

    pub(crate) fn data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn metrics(&self) -> FaceMetrics {
        self.metrics
    }

    fn font_units(&self, units: i32) -> Pt {
        self.size.mul_ratio(units, self.metrics.units_per_em as i32)
    }

    fn measure_width(&self, text: &str) -> Pt {
        if let Ok(cache) = self.width_cache.lock() {
            if let Some(value) = cache.get(text) {
                return value;
            }
        }
        let Ok(face) = ttf_parser::Face::parse(&self.data, 0) else {
            return Pt::ZERO;
        };
        let units: i32 = text
            .chars()
            .map(|ch| {
                let glyph = face.glyph_index(ch).unwrap_or(GlyphId(0));
                face.glyph_hor_advance(glyph).unwrap_or(0) as i32
            })
            .sum();
        let width = self.font_units(units);
        if let Ok(mut cache) = self.width_cache.lock() {
            cache.insert(text, width);
        }
        width
    }
}

impl Font for TtfFont {
    fn name(&self) -> &str {
        &self.name
    }

    fn measure(&self, text: &str) -> Size {
        let height = self.metrics.ascender as i32 - self.metrics.descender as i32;
        Size::new(self.measure_width(text), self.font_units(height))
    }

    fn line_spacing(&self) -> Pt {
        let m = self.metrics;
        self.font_units(m.ascender as i32 - m.descender as i32 + m.line_gap as i32)
    }
}

/// Named fonts available to markup `font` attributes.
#[derive(Debug, Default)]
pub struct FontRegistry {
    fonts: HashMap<String, Arc<TtfFont>>,
}

impl FontRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `data` under `name` at point size `size`. A later registration
    /// under the same name replaces the earlier one.
    pub fn register_bytes(&mut self, name: &str, data: Vec<u8>, size: Pt) -> Result<()> {
        let font = TtfFont::from_bytes(name, data, size)?;
        self.register(font);
        Ok(())
    }

    pub fn register_file(&mut self, name: &str, path: impl AsRef<std::path::Path>, size: Pt) -> Result<()> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|err| {
            MarkupError::Asset(format!("cannot read font {}: {err}", path.display()))
        })?;
        self.register_bytes(name, data, size)
    }

    /// Registers another size of an already registered face under a new name.
    pub fn register_size(&mut self, base: &str, name: &str, size: Pt) -> Result<()> {
        let Some(font) = self.fonts.get(base) else {
            return Err(MarkupError::Asset(format!("unknown base font {base}")));
        };
        let sized = font.with_size(name, size);
        self.register(sized);
        Ok(())
    }

    pub fn register(&mut self, font: TtfFont) {
        debug!(font = %font.name, size = %font.size, "font registered");
        self.fonts.insert(font.name.clone(), Arc::new(font));
    }

    pub fn get(&self, name: &str) -> Option<&Arc<TtfFont>> {
        self.fonts.get(name)
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}

impl FontResolver for FontRegistry {
    fn resolve_font(&self, name: &str) -> std::result::Result<FontRef, ResolveError> {
        match self.fonts.get(name) {
            Some(font) => Ok(Arc::clone(font) as FontRef),
            None => Err(format!("font `{name}` is not registered").into()),
        }
    }
}
