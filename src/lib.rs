mod assets;
mod canvas;
mod color;
mod compiled;
mod element;
mod error;
mod font;
mod layout;
mod markup;
mod raster;
mod resolve;
mod scope;
#[cfg(test)]
mod testing;
mod types;

pub use assets::{ImageRegistry, RasterImage};
pub use canvas::{Canvas, Command, DrawContext};
pub use color::parse_color;
pub use compiled::CompiledMarkup;
pub use element::{Element, ImageElement, TextElement};
pub use error::{FormatAttribute, MarkupError, ResolveError, ResolverKind, Result};
pub use font::{FontRegistry, TtfFont};
pub use raster::PixmapSurface;
pub use resolve::{
    ConditionResolver, ConditionSet, Font, FontRef, FontResolver, Image, ImageRef, ImageResolver,
};
pub use scope::FormatInstruction;
pub use types::{Color, Point, Pt, Size};

use rayon::prelude::*;
use resolve::Unconfigured;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, debug_span};

/// Compiles markup into [`CompiledMarkup`] using the configured resolvers.
///
/// A compiler holds no per-compile state, so one instance can serve any number
/// of concurrent compiles.
pub struct Compiler {
    fonts: Arc<dyn FontResolver>,
    images: Arc<dyn ImageResolver>,
    conditions: Arc<dyn ConditionResolver>,
    strict_elements: bool,
}

impl fmt::Debug for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiler")
            .field("strict_elements", &self.strict_elements)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct CompilerBuilder {
    fonts: Option<Arc<dyn FontResolver>>,
    images: Option<Arc<dyn ImageResolver>>,
    conditions: Option<Arc<dyn ConditionResolver>>,
    strict_elements: bool,
}

impl CompilerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fonts(self, resolver: impl FontResolver + 'static) -> Self {
        self.shared_fonts(Arc::new(resolver))
    }

    pub fn shared_fonts(mut self, resolver: Arc<dyn FontResolver>) -> Self {
        self.fonts = Some(resolver);
        self
    }

    pub fn images(self, resolver: impl ImageResolver + 'static) -> Self {
        self.shared_images(Arc::new(resolver))
    }

    pub fn shared_images(mut self, resolver: Arc<dyn ImageResolver>) -> Self {
        self.images = Some(resolver);
        self
    }

    pub fn conditions(self, resolver: impl ConditionResolver + 'static) -> Self {
        self.shared_conditions(Arc::new(resolver))
    }

    pub fn shared_conditions(mut self, resolver: Arc<dyn ConditionResolver>) -> Self {
        self.conditions = Some(resolver);
        self
    }

    /// Reject elements other than `text`, `if`, `br` and `img` instead of
    /// treating them as transparent containers.
    pub fn strict_elements(mut self, enabled: bool) -> Self {
        self.strict_elements = enabled;
        self
    }

    pub fn build(self) -> Result<Compiler> {
        let Some(fonts) = self.fonts else {
            return Err(MarkupError::InvalidConfiguration(
                "a font resolver is required".to_string(),
            ));
        };
        Ok(Compiler {
            fonts,
            images: self
                .images
                .unwrap_or_else(|| Arc::new(Unconfigured("image"))),
            conditions: self
                .conditions
                .unwrap_or_else(|| Arc::new(Unconfigured("condition"))),
            strict_elements: self.strict_elements,
        })
    }
}

impl Compiler {
    pub fn builder() -> CompilerBuilder {
        CompilerBuilder::new()
    }

    /// Lays out `markup` wrapped at `max_width`.
    pub fn compile(&self, markup: &str, max_width: Pt) -> Result<CompiledMarkup> {
        let mut compiled = CompiledMarkup::new();
        self.compile_into(markup, max_width, &mut compiled)?;
        Ok(compiled)
    }

    /// Lays out `markup` from the origin and appends the result to `target`.
    /// On error `target` is left untouched.
    ///
    /// Every fragment starts at the same origin, so fragments compiled into one
    /// target overlap when drawn. The target's size becomes the component-wise
    /// max of its old size and the fragment's size, and the fragment's source is
    /// appended to the target's source.
    pub fn compile_into(
        &self,
        markup: &str,
        max_width: Pt,
        target: &mut CompiledMarkup,
    ) -> Result<()> {
        let span = debug_span!("compile", %max_width, bytes = markup.len());
        let _guard = span.enter();
        let output = markup::layout_fragment(self, markup, max_width)?;
        debug!(
            elements = output.elements.len(),
            width = %output.size.width,
            height = %output.size.height,
            "markup compiled"
        );
        target.append(output.elements, output.size, markup);
        Ok(())
    }

    /// Compiles independent fragments in parallel. Results keep input order.
    pub fn compile_batch(&self, jobs: &[(&str, Pt)]) -> Vec<Result<CompiledMarkup>> {
        jobs.par_iter()
            .map(|(markup, max_width)| self.compile(markup, *max_width))
            .collect()
    }

    pub(crate) fn fonts(&self) -> &dyn FontResolver {
        self.fonts.as_ref()
    }

    pub(crate) fn images(&self) -> &dyn ImageResolver {
        self.images.as_ref()
    }

    pub(crate) fn conditions(&self) -> &dyn ConditionResolver {
        self.conditions.as_ref()
    }

    pub(crate) fn strict_elements(&self) -> bool {
        self.strict_elements
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FixedFonts, FixedImages};
    use pretty_assertions::assert_eq;

    fn compiler() -> Compiler {
        Compiler::builder()
            .fonts(FixedFonts::standard())
            .images(FixedImages)
            .conditions(
                ConditionSet::new()
                    .with("shown", true)
                    .with("hidden", false),
            )
            .build()
            .unwrap()
    }

    fn words(compiled: &CompiledMarkup) -> Vec<&str> {
        compiled
            .elements()
            .iter()
            .filter_map(|e| e.as_text().map(TextElement::text))
            .collect()
    }

    fn layout(compiled: &CompiledMarkup) -> Vec<(f32, f32, f32, f32)> {
        compiled
            .elements()
            .iter()
            .map(|e| {
                let (p, s) = (e.position(), e.size());
                (p.x.to_f32(), p.y.to_f32(), s.width.to_f32(), s.height.to_f32())
            })
            .collect()
    }

    fn pt(value: i32) -> Pt {
        Pt::from_i32(value)
    }

    #[test]
    fn builder_requires_font_resolver() {
        let err = Compiler::builder().images(FixedImages).build().unwrap_err();
        assert!(matches!(err, MarkupError::InvalidConfiguration(_)));
        assert!(err.to_string().contains("font resolver"));
    }

    #[test]
    fn two_words_on_one_line() {
        let markup = r##"<text font="body" color="#FF0000FF">hello world</text>"##;
        let compiled = compiler().compile(markup, pt(200)).unwrap();

        assert_eq!(words(&compiled), vec!["hello", "world"]);
        // body: 6pt per char, 10pt tall; "hello" + " " = 36.
        assert_eq!(layout(&compiled), vec![(0.0, 5.0, 30.0, 10.0), (36.0, 5.0, 30.0, 10.0)]);
        assert_eq!(compiled.size(), Size::from_f32(66.0, 10.0));
        assert_eq!(compiled.source(), markup);
        for element in compiled.elements() {
            let text = element.as_text().unwrap();
            assert_eq!(text.format().color(), Color::rgba(255, 0, 0, 255));
        }
    }

    #[test]
    fn second_word_wraps_to_new_line() {
        // 30 + 6 + 30 = 66 > 50, each word fits alone.
        let markup = r##"<text font="body" color="#000000">hello world</text>"##;
        let compiled = compiler().compile(markup, pt(50)).unwrap();
        assert_eq!(layout(&compiled), vec![(0.0, 5.0, 30.0, 10.0), (0.0, 15.0, 30.0, 10.0)]);
        assert_eq!(compiled.size(), Size::from_f32(30.0, 20.0));
    }

    #[test]
    fn exact_fit_does_not_wrap() {
        let markup = r##"<text font="body" color="#000000">hello world</text>"##;
        let compiled = compiler().compile(markup, pt(66)).unwrap();
        assert_eq!(compiled.size(), Size::from_f32(66.0, 10.0));
    }

    #[test]
    fn overlong_word_exceeds_max_width() {
        let markup = r##"<text font="body" color="#000000">a extraordinarily b</text>"##;
        let compiled = compiler().compile(markup, pt(40)).unwrap();
        assert_eq!(
            layout(&compiled),
            vec![
                (0.0, 5.0, 6.0, 10.0),
                (0.0, 15.0, 90.0, 10.0),
                (0.0, 25.0, 6.0, 10.0),
            ]
        );
        assert!(compiled.size().width > pt(40));
        assert_eq!(compiled.size(), Size::from_f32(90.0, 30.0));
    }

    #[test]
    fn nested_scope_overrides_color_then_reverts() {
        let markup = concat!(
            r##"<text font="title" color="#0000FF">"##,
            r##"a <text color="#00FF00">b</text> c"##,
            r##"</text>"##
        );
        let compiled = compiler().compile(markup, pt(500)).unwrap();
        let formats: Vec<(&str, Color)> = compiled
            .elements()
            .iter()
            .map(|e| {
                let format = e.as_text().unwrap().format();
                (format.font().name(), format.color())
            })
            .collect();
        assert_eq!(
            formats,
            vec![
                ("title", Color::rgb(0, 0, 255)),
                ("title", Color::rgb(0, 255, 0)),
                ("title", Color::rgb(0, 0, 255)),
            ]
        );
        // Runs split by tags are not joined by a space: "a" (10) then "b" at 10.
        assert_eq!(layout(&compiled)[1].0, 10.0);
    }

    #[test]
    fn mixed_fonts_share_line_height() {
        let markup = r##"<text font="body" color="#000000">x <text font="title">Y</text></text>"##;
        let compiled = compiler().compile(markup, pt(500)).unwrap();
        // Line height is the title's 20pt; both centered at 10.
        assert_eq!(layout(&compiled), vec![(0.0, 10.0, 6.0, 10.0), (6.0, 10.0, 10.0, 20.0)]);
        assert_eq!(compiled.size(), Size::from_f32(16.0, 20.0));
    }

    #[test]
    fn false_condition_skips_text_and_images() {
        let markup = concat!(
            r##"<text font="body" color="#000000">"##,
            r##"<if clause="hidden">secret <img src="icon"/></if>"##,
            r##"shown</text>"##
        );
        let compiled = compiler().compile(markup, pt(500)).unwrap();
        assert_eq!(words(&compiled), vec!["shown"]);
        assert_eq!(layout(&compiled), vec![(0.0, 5.0, 30.0, 10.0)]);
    }

    #[test]
    fn inner_true_condition_overrides_outer_false() {
        let markup = concat!(
            r##"<text font="body" color="#000000">"##,
            r##"<if clause="hidden">a<if clause="shown">b</if>c</if>"##,
            r##"</text>"##
        );
        let compiled = compiler().compile(markup, pt(500)).unwrap();
        assert_eq!(words(&compiled), vec!["b"]);
    }

    #[test]
    fn hidden_content_needs_no_format_scope() {
        let compiled = compiler()
            .compile(r#"<if clause="hidden">loose words</if>"#, pt(100))
            .unwrap();
        assert!(compiled.is_empty());
    }

    #[test]
    fn break_on_empty_line_adds_font_line_spacing() {
        let markup = r##"<text font="body" color="#000000"><br/></text>"##;
        let compiled = compiler().compile(markup, pt(100)).unwrap();
        assert!(compiled.is_empty());
        assert_eq!(compiled.size(), Size::from_f32(0.0, 12.0));
    }

    #[test]
    fn break_after_content_starts_new_line() {
        let markup = r##"<text font="body" color="#000000">one<br/><br/>two</text>"##;
        let compiled = compiler().compile(markup, pt(100)).unwrap();
        // line 1 (10) + blank line (12) + line 2 (10)
        assert_eq!(layout(&compiled), vec![(0.0, 5.0, 18.0, 10.0), (0.0, 27.0, 18.0, 10.0)]);
        assert_eq!(compiled.size(), Size::from_f32(18.0, 32.0));
    }

    #[test]
    fn break_is_honored_inside_hidden_condition() {
        let markup = r##"<text font="body" color="#000000"><if clause="hidden"><br/></if>x</text>"##;
        let compiled = compiler().compile(markup, pt(100)).unwrap();
        assert_eq!(layout(&compiled), vec![(0.0, 17.0, 6.0, 10.0)]);
    }

    #[test]
    fn break_without_scope_is_missing_context() {
        let err = compiler().compile("<br/>", pt(100)).unwrap_err();
        assert!(matches!(
            err,
            MarkupError::MissingFormatContext(FormatAttribute::Font)
        ));
    }

    #[test]
    fn image_is_placed_inline_with_default_tint() {
        let markup = r##"<text font="body" color="#000000">go <img src="icon"/> <img src="icon" color="#FF000080"/></text>"##;
        let compiled = compiler().compile(markup, pt(500)).unwrap();
        // "go" = 12 wide, no trailing space (last word of its run); icons 16x16.
        assert_eq!(
            layout(&compiled),
            vec![
                (0.0, 8.0, 12.0, 10.0),
                (12.0, 8.0, 16.0, 16.0),
                (28.0, 8.0, 16.0, 16.0),
            ]
        );
        let tints: Vec<Color> = compiled
            .elements()
            .iter()
            .filter_map(|e| e.as_image().map(ImageElement::tint))
            .collect();
        assert_eq!(tints, vec![Color::WHITE, Color::rgba(255, 0, 0, 128)]);
    }

    #[test]
    fn images_wrap_as_whole_units() {
        let markup = r#"<img src="banner"/><img src="icon"/>"#;
        let compiled = compiler().compile(markup, pt(130)).unwrap();
        assert_eq!(
            layout(&compiled),
            vec![(0.0, 15.0, 120.0, 30.0), (0.0, 38.0, 16.0, 16.0)]
        );
        assert_eq!(compiled.size(), Size::from_f32(120.0, 46.0));
    }

    #[test]
    fn text_without_scope_is_missing_context() {
        let err = compiler().compile("plain words", pt(100)).unwrap_err();
        assert!(matches!(
            err,
            MarkupError::MissingFormatContext(FormatAttribute::Font)
        ));
    }

    #[test]
    fn root_text_scope_without_color_fails() {
        let err = compiler()
            .compile(r#"<text font="body">x</text>"#, pt(100))
            .unwrap_err();
        assert!(matches!(
            err,
            MarkupError::MissingFormatContext(FormatAttribute::Color)
        ));
    }

    #[test]
    fn color_errors_abort_compile() {
        let err = compiler()
            .compile(r##"<text font="body" color="#12345">x</text>"##, pt(100))
            .unwrap_err();
        assert!(matches!(err, MarkupError::InvalidColorFormat { digits: 5, .. }));

        let err = compiler()
            .compile(r##"<img src="icon" color="#XYZXYZ"/>"##, pt(100))
            .unwrap_err();
        assert!(matches!(err, MarkupError::MalformedColorLiteral { .. }));
    }

    #[test]
    fn resolver_failures_are_propagated() {
        let err = compiler()
            .compile(r##"<text font="nope" color="#000000">x</text>"##, pt(100))
            .unwrap_err();
        assert!(matches!(err, MarkupError::Resolver { kind: ResolverKind::Font, ref name, .. } if name == "nope"));

        let err = compiler().compile(r#"<img src="nope"/>"#, pt(100)).unwrap_err();
        assert!(matches!(err, MarkupError::Resolver { kind: ResolverKind::Image, .. }));

        let err = compiler()
            .compile(r#"<if clause="nope"></if>"#, pt(100))
            .unwrap_err();
        assert!(matches!(err, MarkupError::Resolver { kind: ResolverKind::Condition, .. }));
    }

    #[test]
    fn unconfigured_resolvers_fail_on_use() {
        let compiler = Compiler::builder().fonts(FixedFonts::standard()).build().unwrap();
        let err = compiler.compile(r#"<img src="icon"/>"#, pt(100)).unwrap_err();
        assert!(matches!(err, MarkupError::Resolver { kind: ResolverKind::Image, .. }));
        let err = compiler.compile(r#"<if clause="x"/>"#, pt(100)).unwrap_err();
        assert!(matches!(err, MarkupError::Resolver { kind: ResolverKind::Condition, .. }));
    }

    #[test]
    fn missing_required_attributes() {
        let err = compiler().compile("<img/>", pt(100)).unwrap_err();
        assert!(matches!(
            err,
            MarkupError::MissingAttribute { element: "img", attribute: "src" }
        ));
        let err = compiler().compile("<if></if>", pt(100)).unwrap_err();
        assert!(matches!(
            err,
            MarkupError::MissingAttribute { element: "if", attribute: "clause" }
        ));
    }

    #[test]
    fn malformed_markup_is_a_syntax_error() {
        let err = compiler()
            .compile(r##"<text font="body" color="#000000">x"##, pt(100))
            .unwrap_err();
        assert!(matches!(err, MarkupError::Syntax(_)));
    }

    #[test]
    fn unknown_elements_are_transparent_unless_strict() {
        let markup = r##"<text font="body" color="#000000"><b>bold</b></text>"##;
        let compiled = compiler().compile(markup, pt(100)).unwrap();
        assert_eq!(words(&compiled), vec!["bold"]);

        let strict = Compiler::builder()
            .fonts(FixedFonts::standard())
            .strict_elements(true)
            .build()
            .unwrap();
        let err = strict.compile(markup, pt(100)).unwrap_err();
        assert!(matches!(err, MarkupError::UnsupportedElement(ref name) if name == "b"));
    }

    #[test]
    fn entities_are_decoded_in_words() {
        let markup = r##"<text font="body" color="#000000">fish &amp; chips</text>"##;
        let compiled = compiler().compile(markup, pt(500)).unwrap();
        assert_eq!(words(&compiled), vec!["fish", "&", "chips"]);
    }

    #[test]
    fn compiling_twice_is_deterministic() {
        let markup = concat!(
            r##"<text font="body" color="#000000">the quick <text font="title">brown</text> "##,
            r##"fox <img src="icon"/> jumps over<br/>the lazy dog</text>"##
        );
        let compiler = compiler();
        let first = compiler.compile(markup, pt(70)).unwrap();
        let second = compiler.compile(markup, pt(70)).unwrap();
        assert_eq!(layout(&first), layout(&second));
        assert_eq!(first.size(), second.size());
        assert_eq!(words(&first), words(&second));
    }

    #[test]
    fn compile_into_accumulates_fragments() {
        let compiler = compiler();
        let mut compiled = CompiledMarkup::new();
        let first = r##"<text font="body" color="#000000">hello</text>"##;
        let second = r#"<img src="banner"/>"#;
        compiler.compile_into(first, pt(100), &mut compiled).unwrap();
        compiler.compile_into(second, pt(50), &mut compiled).unwrap();

        // Each fragment starts from the origin with its own width limit.
        assert_eq!(layout(&compiled), vec![(0.0, 5.0, 30.0, 10.0), (0.0, 15.0, 120.0, 30.0)]);
        assert_eq!(compiled.size(), Size::from_f32(120.0, 30.0));
        assert_eq!(compiled.source(), format!("{first}{second}"));
    }

    #[test]
    fn failed_compile_into_leaves_target_untouched() {
        let compiler = compiler();
        let mut compiled = compiler
            .compile(r##"<text font="body" color="#000000">kept</text>"##, pt(100))
            .unwrap();
        let before = compiled.source().to_string();
        let err = compiler.compile_into(
            r##"<text font="body" color="#000000">x <img src="nope"/></text>"##,
            pt(100),
            &mut compiled,
        );
        assert!(err.is_err());
        assert_eq!(compiled.len(), 1);
        assert_eq!(compiled.source(), before);
    }

    #[test]
    fn batch_compile_keeps_input_order() {
        let compiler = compiler();
        let jobs = [
            (r##"<text font="body" color="#000000">a</text>"##, pt(100)),
            ("<br/>", pt(100)),
            (r##"<text font="title" color="#000000">bb</text>"##, pt(100)),
        ];
        let results = compiler.compile_batch(&jobs);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().size(), Size::from_f32(6.0, 10.0));
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap().size(), Size::from_f32(20.0, 20.0));
    }

    #[test]
    fn draw_replays_elements_with_offset() {
        let markup = r##"<text font="body" color="#00FF00">hi <img src="icon"/></text>"##;
        let compiled = compiler().compile(markup, pt(100)).unwrap();
        let mut canvas = Canvas::new();
        compiled.draw(&mut canvas, Point::from_f32(10.0, 20.0));

        assert_eq!(
            canvas.finish(),
            vec![
                Command::SetFontName("body".to_string()),
                Command::SetFillColor(Color::rgb(0, 255, 0)),
                Command::DrawString {
                    x: pt(10),
                    y: pt(28),
                    width: pt(12),
                    height: pt(10),
                    text: "hi".to_string(),
                },
                Command::DrawImage {
                    x: pt(22),
                    y: pt(28),
                    width: pt(16),
                    height: pt(16),
                    resource_id: "icon".to_string(),
                    tint: Color::WHITE,
                },
            ]
        );
    }

    #[test]
    fn closure_resolvers_are_accepted() {
        let fonts = FixedFonts::standard();
        let compiler = Compiler::builder()
            .fonts(move |name: &str| -> std::result::Result<FontRef, ResolveError> {
                fonts.resolve_font(name)
            })
            .conditions(|name: &str| -> std::result::Result<bool, ResolveError> {
                Ok(name == "always")
            })
            .build()
            .unwrap();
        let markup = r##"<text font="body" color="#000000"><if clause="always">yes</if><if clause="never">no</if></text>"##;
        let compiled = compiler.compile(markup, pt(100)).unwrap();
        assert_eq!(words(&compiled), vec!["yes"]);
    }
}
