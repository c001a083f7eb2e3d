use crate::resolve::ImageRef;
use crate::scope::FormatInstruction;
use crate::types::{Color, Point, Pt, Size};

/// Target of [`CompiledMarkup::draw`](crate::CompiledMarkup::draw).
///
/// Positions are element anchors plus the draw offset. Elements are vertically
/// centered on their line, so `position.y` is the middle of the element's box,
/// not its top edge.
pub trait DrawContext {
    fn draw_text(&mut self, position: Point, size: Size, text: &str, format: &FormatInstruction);
    fn draw_image(&mut self, position: Point, size: Size, image: &ImageRef, tint: Color);
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetFillColor(Color),
    SetFontName(String),
    DrawString {
        x: Pt,
        y: Pt,
        width: Pt,
        height: Pt,
        text: String,
    },
    DrawImage {
        x: Pt,
        y: Pt,
        width: Pt,
        height: Pt,
        resource_id: String,
        tint: Color,
    },
}

#[derive(Debug, Clone)]
struct GraphicsState {
    fill_color: Option<Color>,
    font_name: Option<String>,
}

/// Recording context: turns draw calls into a flat command list that a host
/// can replay into its own renderer. Redundant state changes are elided.
#[derive(Debug, Clone)]
pub struct Canvas {
    commands: Vec<Command>,
    state: GraphicsState,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

impl Canvas {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            state: GraphicsState {
                fill_color: None,
                font_name: None,
            },
        }
    }

    pub fn set_fill_color(&mut self, color: Color) {
        if self.state.fill_color == Some(color) {
            return;
        }
        self.state.fill_color = Some(color);
        self.commands.push(Command::SetFillColor(color));
    }

    pub fn set_font_name(&mut self, name: &str) {
        if self.state.font_name.as_deref() == Some(name) {
            return;
        }
        self.state.font_name = Some(name.to_string());
        self.commands.push(Command::SetFontName(name.to_string()));
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Drops recorded commands and forgets the graphics state, ready for the next frame.
    pub fn clear(&mut self) {
        self.commands.clear();
        self.state.fill_color = None;
        self.state.font_name = None;
    }

    pub fn finish(self) -> Vec<Command> {
        self.commands
    }
}

impl DrawContext for Canvas {
    fn draw_text(&mut self, position: Point, size: Size, text: &str, format: &FormatInstruction) {
        self.set_font_name(format.font().name());
        self.set_fill_color(format.color());
        self.commands.push(Command::DrawString {
            x: position.x,
            y: position.y,
            width: size.width,
            height: size.height,
            text: text.to_string(),
        });
    }

    fn draw_image(&mut self, position: Point, size: Size, image: &ImageRef, tint: Color) {
        self.commands.push(Command::DrawImage {
            x: position.x,
            y: position.y,
            width: size.width,
            height: size.height,
            resource_id: image.name().to_string(),
            tint,
        });
    }
}
