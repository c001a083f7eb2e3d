use crate::canvas::DrawContext;
use crate::resolve::ImageRef;
use crate::scope::FormatInstruction;
use crate::types::{Color, Point, Size};

/// One whitespace-free word measured with the font in effect when it was placed.
#[derive(Debug, Clone)]
pub struct TextElement {
    text: String,
    position: Point,
    size: Size,
    format: FormatInstruction,
}

impl TextElement {
    pub fn new(text: impl Into<String>, position: Point, size: Size, format: FormatInstruction) -> Self {
        Self {
            text: text.into(),
            position,
            size,
            format,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn format(&self) -> &FormatInstruction {
        &self.format
    }
}

#[derive(Debug, Clone)]
pub struct ImageElement {
    image: ImageRef,
    position: Point,
    size: Size,
    tint: Color,
}

impl ImageElement {
    /// Sized from the image's intrinsic pixel dimensions.
    pub fn new(image: ImageRef, position: Point, tint: Color) -> Self {
        let size = image.size();
        Self {
            image,
            position,
            size,
            tint,
        }
    }

    pub fn image(&self) -> &ImageRef {
        &self.image
    }

    pub fn tint(&self) -> Color {
        self.tint
    }
}

/// A positioned, drawable piece of compiled markup.
///
/// Size is fixed at construction. Position is provisional until the element's
/// line is finalized, at which point layout rewrites it once to center the
/// element vertically on the line.
#[derive(Debug, Clone)]
pub enum Element {
    Text(TextElement),
    Image(ImageElement),
}

impl Element {
    pub fn size(&self) -> Size {
        match self {
            Element::Text(text) => text.size,
            Element::Image(image) => image.size,
        }
    }

    pub fn position(&self) -> Point {
        match self {
            Element::Text(text) => text.position,
            Element::Image(image) => image.position,
        }
    }

    pub fn set_position(&mut self, position: Point) {
        match self {
            Element::Text(text) => text.position = position,
            Element::Image(image) => image.position = position,
        }
    }

    pub fn as_text(&self) -> Option<&TextElement> {
        match self {
            Element::Text(text) => Some(text),
            Element::Image(_) => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImageElement> {
        match self {
            Element::Image(image) => Some(image),
            Element::Text(_) => None,
        }
    }

    pub fn draw<C: DrawContext + ?Sized>(&self, context: &mut C, offset: Point) {
        let position = self.position() + offset;
        match self {
            Element::Text(text) => context.draw_text(position, text.size, &text.text, &text.format),
            Element::Image(image) => context.draw_image(position, image.size, &image.image, image.tint),
        }
    }
}

impl From<TextElement> for Element {
    fn from(value: TextElement) -> Self {
        Element::Text(value)
    }
}

impl From<ImageElement> for Element {
    fn from(value: ImageElement) -> Self {
        Element::Image(value)
    }
}
