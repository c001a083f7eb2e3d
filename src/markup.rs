use crate::Compiler;
use crate::color::parse_color;
use crate::element::{Element, ImageElement, TextElement};
use crate::error::{MarkupError, ResolverKind, Result};
use crate::layout::LineCursor;
use crate::scope::{ConditionStack, FormatStack};
use crate::types::{Color, Pt, Size};
use roxmltree::Node;
use tracing::debug;

/// Synthetic root wrapped around every fragment so it may hold several
/// top-level scopes.
const FRAGMENT_ROOT: &str = "richmark-fragment";

pub(crate) struct LayoutOutput {
    pub(crate) elements: Vec<Element>,
    pub(crate) size: Size,
}

/// Walks the markup in document order and drives the scope stacks and the
/// line cursor.
pub(crate) fn layout_fragment(compiler: &Compiler, markup: &str, max_width: Pt) -> Result<LayoutOutput> {
    let wrapped = format!("<{FRAGMENT_ROOT}>{markup}</{FRAGMENT_ROOT}>");
    let document = roxmltree::Document::parse(&wrapped)?;
    let mut pass = LayoutPass {
        compiler,
        formats: FormatStack::default(),
        conditions: ConditionStack::default(),
        cursor: LineCursor::new(max_width),
        out: Vec::new(),
    };
    for child in document.root_element().children() {
        pass.visit(child)?;
    }
    Ok(pass.finish())
}

struct LayoutPass<'c> {
    compiler: &'c Compiler,
    formats: FormatStack,
    conditions: ConditionStack,
    cursor: LineCursor,
    out: Vec<Element>,
}

impl LayoutPass<'_> {
    /// Opens `node`, walks its children in document order, then closes it.
    /// Comments and processing instructions are skipped.
    fn visit(&mut self, node: Node<'_, '_>) -> Result<()> {
        if node.is_text() {
            return self.text(node.text().unwrap_or_default());
        }
        if !node.is_element() {
            return Ok(());
        }
        self.open(node)?;
        for child in node.children() {
            self.visit(child)?;
        }
        self.close(node);
        Ok(())
    }

    fn open(&mut self, node: Node<'_, '_>) -> Result<()> {
        match node.tag_name().name() {
            "text" => self.formats.enter(
                node.attribute("font"),
                node.attribute("color"),
                self.compiler.fonts(),
            ),
            "if" => {
                let clause = required(node, "if", "clause")?;
                self.conditions.enter(clause, self.compiler.conditions())
            }
            "br" => {
                let formats = &self.formats;
                self.cursor.line_break(
                    || Ok(formats.current()?.font().line_spacing()),
                    &mut self.out,
                )
            }
            "img" => self.image(node),
            other if self.compiler.strict_elements() => {
                Err(MarkupError::UnsupportedElement(other.to_string()))
            }
            other => {
                debug!(element = other, "unknown element treated as transparent");
                Ok(())
            }
        }
    }

    fn close(&mut self, node: Node<'_, '_>) {
        match node.tag_name().name() {
            "text" => {
                self.formats.pop();
            }
            "if" => {
                self.conditions.pop();
            }
            _ => {}
        }
    }

    fn image(&mut self, node: Node<'_, '_>) -> Result<()> {
        if !self.conditions.is_visible() {
            return Ok(());
        }
        let src = required(node, "img", "src")?;
        let tint = match node.attribute("color") {
            Some(literal) => parse_color(literal)?,
            None => Color::WHITE,
        };
        let image = self
            .compiler
            .images()
            .resolve_image(src)
            .map_err(|err| MarkupError::resolver(ResolverKind::Image, src, err))?;
        let element = ImageElement::new(image, self.cursor.pen(), tint);
        self.cursor.place(element.into(), Pt::ZERO, &mut self.out);
        Ok(())
    }

    fn text(&mut self, content: &str) -> Result<()> {
        if !self.conditions.is_visible() {
            return Ok(());
        }
        let words: Vec<&str> = content.split_whitespace().collect();
        if words.is_empty() {
            return Ok(());
        }
        let format = self.formats.current()?.clone();
        let space = format.font().measure(" ").width;
        let last = words.len() - 1;
        for (index, word) in words.into_iter().enumerate() {
            let size = format.font().measure(word);
            let element = TextElement::new(word, self.cursor.pen(), size, format.clone());
            let advance = if index < last { space } else { Pt::ZERO };
            self.cursor.place(element.into(), advance, &mut self.out);
        }
        Ok(())
    }

    fn finish(mut self) -> LayoutOutput {
        let size = self.cursor.finish(&mut self.out);
        LayoutOutput {
            elements: self.out,
            size,
        }
    }
}

fn required<'a>(node: Node<'a, '_>, element: &'static str, attribute: &'static str) -> Result<&'a str> {
    node.attribute(attribute)
        .ok_or(MarkupError::MissingAttribute { element, attribute })
}
