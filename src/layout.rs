use crate::element::Element;
use crate::error::Result;
use crate::types::{Point, Pt, Size};
use tracing::trace;

/// Greedy line breaker for a single compile pass.
///
/// Elements are buffered on the pending line until a wrap, an explicit break or
/// the end of input finalizes it. Finalizing computes the line height, centers
/// each element on it and commits the elements to `out` in placement order.
pub(crate) struct LineCursor {
    max_width: Pt,
    pen: Point,
    pending: Vec<Element>,
    widest_line: Pt,
    total_height: Pt,
    lines: usize,
}

impl LineCursor {
    pub(crate) fn new(max_width: Pt) -> Self {
        Self {
            max_width,
            pen: Point::ORIGIN,
            pending: Vec::new(),
            widest_line: Pt::ZERO,
            total_height: Pt::ZERO,
            lines: 0,
        }
    }

    pub(crate) fn pen(&self) -> Point {
        self.pen
    }

    /// Places `element` on the pending line, wrapping first if it would cross the
    /// maximum width. An element wider than the maximum still gets a line of its own.
    /// `trailing_advance` is extra pen travel after the element (the inter-word space).
    pub(crate) fn place(&mut self, mut element: Element, trailing_advance: Pt, out: &mut Vec<Element>) {
        let width = element.size().width;
        if !self.pending.is_empty() && self.pen.x + width > self.max_width {
            self.finish_line(out);
        }
        element.set_position(self.pen);
        self.pending.push(element);
        self.pen.x += width + trailing_advance;
    }

    /// Explicit line break. With content pending the line is finalized; with
    /// nothing pending the pen moves down by `line_spacing` so consecutive breaks
    /// leave blank lines. The spacing is only looked up in the second case.
    pub(crate) fn line_break<F>(&mut self, line_spacing: F, out: &mut Vec<Element>) -> Result<()>
    where
        F: FnOnce() -> Result<Pt>,
    {
        if !self.pending.is_empty() {
            self.finish_line(out);
            return Ok(());
        }
        let spacing = line_spacing()?;
        self.pen.x = Pt::ZERO;
        self.pen.y += spacing;
        self.total_height += spacing;
        Ok(())
    }

    pub(crate) fn finish_line(&mut self, out: &mut Vec<Element>) {
        let height = self
            .pending
            .iter()
            .map(|element| element.size().height)
            .fold(Pt::ZERO, Pt::max);
        let width = self
            .pending
            .iter()
            .map(|element| element.position().x + element.size().width)
            .fold(Pt::ZERO, Pt::max);
        let center_y = self.pen.y + height / 2;
        trace!(
            line = self.lines,
            %width,
            %height,
            elements = self.pending.len(),
            "line finalized"
        );
        for mut element in self.pending.drain(..) {
            let x = element.position().x;
            element.set_position(Point::new(x, center_y));
            out.push(element);
        }
        self.pen.x = Pt::ZERO;
        self.pen.y += height;
        self.widest_line = self.widest_line.max(width);
        self.total_height += height;
        self.lines += 1;
    }

    /// Flushes the pending line and returns the aggregate size of everything placed.
    pub(crate) fn finish(mut self, out: &mut Vec<Element>) -> Size {
        if !self.pending.is_empty() {
            self.finish_line(out);
        }
        Size::new(self.widest_line, self.total_height)
    }
}
