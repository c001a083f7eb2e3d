use crate::color::parse_color;
use crate::error::{FormatAttribute, MarkupError, ResolverKind, Result};
use crate::resolve::{ConditionResolver, FontRef, FontResolver};
use crate::types::Color;

/// Font and color in effect for a text scope.
#[derive(Debug, Clone)]
pub struct FormatInstruction {
    font: FontRef,
    color: Color,
}

impl FormatInstruction {
    pub fn new(font: FontRef, color: Color) -> Self {
        Self { font, color }
    }

    pub fn font(&self) -> &FontRef {
        &self.font
    }

    pub fn color(&self) -> Color {
        self.color
    }
}

#[derive(Debug, Default)]
pub(crate) struct FormatStack {
    entries: Vec<FormatInstruction>,
}

impl FormatStack {
    pub(crate) fn push(&mut self, instruction: FormatInstruction) {
        self.entries.push(instruction);
    }

    pub(crate) fn pop(&mut self) -> Option<FormatInstruction> {
        self.entries.pop()
    }

    pub(crate) fn peek(&self) -> Option<&FormatInstruction> {
        self.entries.last()
    }

    pub(crate) fn current(&self) -> Result<&FormatInstruction> {
        self.peek()
            .ok_or(MarkupError::MissingFormatContext(FormatAttribute::Font))
    }

    /// Opens a text scope. Explicit attributes win; absent ones inherit from the
    /// enclosing scope.
    pub(crate) fn enter(
        &mut self,
        font: Option<&str>,
        color: Option<&str>,
        fonts: &dyn FontResolver,
    ) -> Result<()> {
        let font = match (font, self.peek()) {
            (Some(name), _) => fonts
                .resolve_font(name)
                .map_err(|err| MarkupError::resolver(ResolverKind::Font, name, err))?,
            (None, Some(parent)) => parent.font.clone(),
            (None, None) => return Err(MarkupError::MissingFormatContext(FormatAttribute::Font)),
        };
        let color = match (color, self.peek()) {
            (Some(literal), _) => parse_color(literal)?,
            (None, Some(parent)) => parent.color,
            (None, None) => {
                return Err(MarkupError::MissingFormatContext(FormatAttribute::Color));
            }
        };
        self.push(FormatInstruction::new(font, color));
        Ok(())
    }
}

/// Visibility scopes opened by `if`. Only the innermost scope is consulted, so
/// a true `if` inside a false one is visible.
#[derive(Debug, Default)]
pub(crate) struct ConditionStack {
    entries: Vec<bool>,
}

impl ConditionStack {
    pub(crate) fn enter(&mut self, clause: &str, conditions: &dyn ConditionResolver) -> Result<()> {
        let visible = conditions
            .resolve_condition(clause)
            .map_err(|err| MarkupError::resolver(ResolverKind::Condition, clause, err))?;
        self.entries.push(visible);
        Ok(())
    }

    pub(crate) fn pop(&mut self) -> Option<bool> {
        self.entries.pop()
    }

    pub(crate) fn is_visible(&self) -> bool {
        self.entries.last().copied().unwrap_or(true)
    }
}
