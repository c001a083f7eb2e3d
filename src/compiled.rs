use crate::canvas::DrawContext;
use crate::element::Element;
use crate::types::{Point, Size};

/// Laid-out markup, ready to be drawn any number of times.
///
/// Elements are stored in layout order: left to right within a line, lines top
/// to bottom. `size` is the bounding box of all lines (widest line by summed
/// line heights).
#[derive(Debug, Clone, Default)]
pub struct CompiledMarkup {
    elements: Vec<Element>,
    size: Size,
    source: String,
}

impl CompiledMarkup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// Markup text this layout was compiled from. Fragments compiled into the
    /// same accumulator are concatenated in compile order.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Issues one draw call per element, in order, at element position + `offset`.
    pub fn draw<C: DrawContext + ?Sized>(&self, context: &mut C, offset: Point) {
        for element in &self.elements {
            element.draw(context, offset);
        }
    }

    pub(crate) fn append(&mut self, elements: Vec<Element>, size: Size, source: &str) {
        self.elements.extend(elements);
        self.size = self.size.union(size);
        self.source.push_str(source);
    }
}
