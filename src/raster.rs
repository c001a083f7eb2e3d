use crate::canvas::DrawContext;
use crate::error::{MarkupError, Result};
use crate::font::{FontRegistry, TtfFont};
use crate::resolve::{Image, ImageRef};
use crate::scope::FormatInstruction;
use crate::types::{Color, Point, Size};
use std::sync::Arc;
use tiny_skia::{
    FillRule, FilterQuality, Paint, Path, PathBuilder, Pixmap, PixmapPaint, Transform,
};
use tracing::trace;
use ttf_parser::{GlyphId, OutlineBuilder};

/// Raster drawing context. One pixel per point.
///
/// Text is painted from the glyph outlines of fonts in `fonts`; fonts the
/// registry does not know are skipped. Images are painted from the pixels their
/// handle carries, and handles without pixels are skipped.
pub struct PixmapSurface {
    pixmap: Pixmap,
    fonts: Arc<FontRegistry>,
}

impl PixmapSurface {
    pub fn new(width: u32, height: u32, fonts: Arc<FontRegistry>) -> Result<Self> {
        let pixmap = Pixmap::new(width, height).ok_or_else(|| {
            MarkupError::InvalidConfiguration(format!(
                "invalid surface dimensions {width}x{height}"
            ))
        })?;
        Ok(Self { pixmap, fonts })
    }

    pub fn fill(&mut self, color: Color) {
        self.pixmap.fill(to_sk_color(color));
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn into_pixmap(self) -> Pixmap {
        self.pixmap
    }

    /// Straight-alpha RGBA of one pixel, `None` outside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        let px = self.pixmap.pixel(x, y)?.demultiply();
        Some(Color::rgba(px.red(), px.green(), px.blue(), px.alpha()))
    }

    fn draw_glyphs(&mut self, font: &TtfFont, top_left: (f32, f32), text: &str, color: Color) {
        let Ok(face) = ttf_parser::Face::parse(font.data(), 0) else {
            return;
        };
        let metrics = font.metrics();
        let scale = font.size().to_f32() / metrics.units_per_em as f32;
        let baseline_y = top_left.1 + metrics.ascender as f32 * scale;
        let paint = fill_paint(color);
        let mut pen_x = top_left.0;
        let mut drawn = 0usize;
        for ch in text.chars() {
            let glyph = face.glyph_index(ch).unwrap_or(GlyphId(0));
            let mut builder = GlyphPathBuilder::new(pen_x, baseline_y, scale);
            if face.outline_glyph(glyph, &mut builder).is_some() {
                if let Some(path) = builder.finish() {
                    self.pixmap.fill_path(
                        &path,
                        &paint,
                        FillRule::Winding,
                        Transform::identity(),
                        None,
                    );
                    drawn += 1;
                }
            }
            pen_x += face.glyph_hor_advance(glyph).unwrap_or(0) as f32 * scale;
        }
        trace!(font = font.size().to_f32(), glyphs = drawn, text, "glyphs painted");
    }

    fn draw_raster(&mut self, image: &dyn Image, top_left: (f32, f32), size: Size, tint: Color) {
        let Some(source) = tinted_pixmap(image, tint) else {
            return;
        };
        let src_w = source.width() as f32;
        let src_h = source.height() as f32;
        let sx = size.width.to_f32() / src_w;
        let sy = size.height.to_f32() / src_h;
        let transform = Transform::from_row(sx, 0.0, 0.0, sy, top_left.0, top_left.1);
        let quality = if sx == 1.0 && sy == 1.0 {
            FilterQuality::Nearest
        } else {
            FilterQuality::Bilinear
        };
        let paint = PixmapPaint {
            quality,
            ..PixmapPaint::default()
        };
        self.pixmap
            .draw_pixmap(0, 0, source.as_ref(), &paint, transform, None);
    }
}

impl DrawContext for PixmapSurface {
    fn draw_text(&mut self, position: Point, size: Size, text: &str, format: &FormatInstruction) {
        let fonts = Arc::clone(&self.fonts);
        let Some(font) = fonts.get(format.font().name()) else {
            return;
        };
        let top_left = top_left(position, size);
        self.draw_glyphs(font, top_left, text, format.color());
    }

    fn draw_image(&mut self, position: Point, size: Size, image: &ImageRef, tint: Color) {
        self.draw_raster(&**image, top_left(position, size), size, tint);
    }
}

/// Element anchors sit on the vertical middle of the element box.
fn top_left(position: Point, size: Size) -> (f32, f32) {
    (
        position.x.to_f32(),
        (position.y - size.height / 2).to_f32(),
    )
}

/// Multiplies each channel by the tint and premultiplies for tiny-skia. `None`
/// when the handle has no pixels or their length does not match its size.
fn tinted_pixmap(image: &dyn Image, tint: Color) -> Option<Pixmap> {
    let rgba = image.rgba()?;
    let mut pixmap = Pixmap::new(image.width(), image.height())?;
    if rgba.len() != pixmap.data().len() {
        trace!(image = image.name(), bytes = rgba.len(), "pixel data does not match image size");
        return None;
    }
    let tint = [tint.r, tint.g, tint.b, tint.a];
    for (src_px, dst_px) in rgba
        .chunks_exact(4)
        .zip(pixmap.data_mut().chunks_exact_mut(4))
    {
        let a = mul_u8(src_px[3], tint[3]);
        dst_px[0] = mul_u8(mul_u8(src_px[0], tint[0]), a);
        dst_px[1] = mul_u8(mul_u8(src_px[1], tint[1]), a);
        dst_px[2] = mul_u8(mul_u8(src_px[2], tint[2]), a);
        dst_px[3] = a;
    }
    Some(pixmap)
}

fn mul_u8(channel: u8, factor: u8) -> u8 {
    let prod = (channel as u16) * (factor as u16) + 127;
    ((prod + (prod >> 8)) >> 8) as u8
}

struct GlyphPathBuilder {
    builder: PathBuilder,
    origin_x: f32,
    origin_y: f32,
    scale: f32,
}

impl GlyphPathBuilder {
    fn new(origin_x: f32, origin_y: f32, scale: f32) -> Self {
        Self {
            builder: PathBuilder::new(),
            origin_x,
            origin_y,
            scale,
        }
    }

    fn finish(self) -> Option<Path> {
        self.builder.finish()
    }

    // Font units are y-up; the surface is y-down.
    fn map(&self, x: f32, y: f32) -> (f32, f32) {
        (self.origin_x + x * self.scale, self.origin_y - y * self.scale)
    }
}

impl OutlineBuilder for GlyphPathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x, y) = self.map(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x2, y2) = self.map(x2, y2);
        let (x, y) = self.map(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

fn fill_paint(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(to_sk_color(color));
    paint.anti_alias = true;
    paint
}

fn to_sk_color(color: Color) -> tiny_skia::Color {
    tiny_skia::Color::from_rgba8(color.r, color.g, color.b, color.a)
}
