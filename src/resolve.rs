use crate::error::ResolveError;
use crate::types::{Pt, Size};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Font metrics as seen by layout. Implementations must be deterministic:
/// measuring the same string twice returns the same size.
pub trait Font: fmt::Debug + Send + Sync {
    /// Name the font was resolved from. Drawing contexts use it to find glyph data.
    fn name(&self) -> &str;
    fn measure(&self, text: &str) -> Size;
    /// Vertical advance of an empty line set in this font.
    fn line_spacing(&self) -> Pt;
}

pub trait Image: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    fn size(&self) -> Size {
        Size::new(Pt::from_u32(self.width()), Pt::from_u32(self.height()))
    }

    /// Straight-alpha RGBA8 rows, `width * height * 4` bytes. Raster drawing
    /// contexts paint from these; handles without pixel data return `None`.
    fn rgba(&self) -> Option<&[u8]> {
        None
    }
}

pub type FontRef = Arc<dyn Font>;
pub type ImageRef = Arc<dyn Image>;

pub trait FontResolver: Send + Sync {
    fn resolve_font(&self, name: &str) -> Result<FontRef, ResolveError>;
}

pub trait ImageResolver: Send + Sync {
    fn resolve_image(&self, name: &str) -> Result<ImageRef, ResolveError>;
}

pub trait ConditionResolver: Send + Sync {
    fn resolve_condition(&self, name: &str) -> Result<bool, ResolveError>;
}

impl<F> FontResolver for F
where
    F: Fn(&str) -> Result<FontRef, ResolveError> + Send + Sync,
{
    fn resolve_font(&self, name: &str) -> Result<FontRef, ResolveError> {
        self(name)
    }
}

impl<F> ImageResolver for F
where
    F: Fn(&str) -> Result<ImageRef, ResolveError> + Send + Sync,
{
    fn resolve_image(&self, name: &str) -> Result<ImageRef, ResolveError> {
        self(name)
    }
}

impl<F> ConditionResolver for F
where
    F: Fn(&str) -> Result<bool, ResolveError> + Send + Sync,
{
    fn resolve_condition(&self, name: &str) -> Result<bool, ResolveError> {
        self(name)
    }
}

/// Stand-in used by the builder when no resolver of a kind was configured.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Unconfigured(pub(crate) &'static str);

impl ImageResolver for Unconfigured {
    fn resolve_image(&self, _name: &str) -> Result<ImageRef, ResolveError> {
        Err(format!("no {} resolver configured", self.0).into())
    }
}

impl ConditionResolver for Unconfigured {
    fn resolve_condition(&self, _name: &str) -> Result<bool, ResolveError> {
        Err(format!("no {} resolver configured", self.0).into())
    }
}

/// Fixed set of named conditions.
#[derive(Debug, Clone, Default)]
pub struct ConditionSet {
    values: HashMap<String, bool>,
}

impl ConditionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: bool) -> &mut Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn with(mut self, name: impl Into<String>, value: bool) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<bool> {
        self.values.get(name).copied()
    }
}

impl ConditionResolver for ConditionSet {
    fn resolve_condition(&self, name: &str) -> Result<bool, ResolveError> {
        self.get(name)
            .ok_or_else(|| format!("unknown condition `{name}`").into())
    }
}
