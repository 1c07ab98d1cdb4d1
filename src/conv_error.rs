//! Errors converting a single CSV field to or from a primitive value
use std::fmt::Display;

use crate::field_plan::FieldKind;

/// Type alias for a `Result` with [`ConvError`] as the error type.
pub type CResult<T> = Result<T, ConvError>;


/// An error converting one text field to or from its primitive type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvError {
    /// Indicates that the text of a field could not be parsed as the given kind.
    ParsingError{ text: String, kind: FieldKind, reason: String },

    /// Indicates that a value could not be written out with the given date layout,
    /// usually because the layout asks for components the value does not have
    /// (e.g. an hour for a plain date).
    FormattingError{ kind: FieldKind, layout: String },
}

impl Display for ConvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConvError::ParsingError { text, kind, reason } => {
                write!(f, "Could not parse '{text}' as {kind}: {reason}")
            },
            ConvError::FormattingError { kind, layout } => {
                write!(f, "Could not format {kind} value with the layout '{layout}'")
            }
        }
    }
}

impl std::error::Error for ConvError {}

impl ConvError {
    pub(crate) fn parsing<E: Display>(text: &str, kind: FieldKind, reason: E) -> Self {
        Self::ParsingError { text: text.to_string(), kind, reason: reason.to_string() }
    }
}
