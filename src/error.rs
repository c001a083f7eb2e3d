use std::fmt;
use thiserror::Error;

/// Error returned by a caller-supplied resolver. Kept as the source of
/// [`MarkupError::Resolver`] so callers can downcast to their own type.
pub type ResolveError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T, E = MarkupError> = std::result::Result<T, E>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatAttribute {
    Font,
    Color,
}

impl fmt::Display for FormatAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatAttribute::Font => write!(f, "font"),
            FormatAttribute::Color => write!(f, "color"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverKind {
    Font,
    Image,
    Condition,
}

impl fmt::Display for ResolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolverKind::Font => write!(f, "font"),
            ResolverKind::Image => write!(f, "image"),
            ResolverKind::Condition => write!(f, "condition"),
        }
    }
}

#[derive(Debug, Error)]
pub enum MarkupError {
    #[error("no {0} available: text scope sets none and has no enclosing scope to inherit from")]
    MissingFormatContext(FormatAttribute),
    #[error("invalid color format `{literal}`: expected 6 or 8 hex digits, found {digits}")]
    InvalidColorFormat { literal: String, digits: usize },
    #[error("malformed color literal `{literal}`: not a hexadecimal number")]
    MalformedColorLiteral { literal: String },
    #[error("{kind} resolver failed for `{name}`")]
    Resolver {
        kind: ResolverKind,
        name: String,
        #[source]
        source: ResolveError,
    },
    #[error("markup syntax error: {0}")]
    Syntax(#[from] roxmltree::Error),
    #[error("<{element}> is missing required attribute `{attribute}`")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },
    #[error("unsupported element <{0}>")]
    UnsupportedElement(String),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("asset error: {0}")]
    Asset(String),
}

impl MarkupError {
    pub(crate) fn resolver(kind: ResolverKind, name: &str, source: ResolveError) -> Self {
        MarkupError::Resolver {
            kind,
            name: name.to_string(),
            source,
        }
    }
}
