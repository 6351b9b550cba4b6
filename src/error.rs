//! Error types for gmlschema
//!
//! This module defines every error produced while building schemas,
//! constructing entities, decoding XML and resolving references.
//! Equality, hashing and the debug formatter never fail and have no
//! error type of their own.

use std::fmt;
use thiserror::Error;

/// Result type alias using gmlschema Error
pub type Result<T> = std::result::Result<T, Error>;

/// Line and column of an element in its source document (both 1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    /// Line number
    pub line: u32,
    /// Column number
    pub column: u32,
}

impl Position {
    /// Create a new position
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Main error type for gmlschema operations
#[derive(Error, Debug)]
pub enum Error {
    /// A value does not match the declared type of a field
    #[error("type mismatch on {kind}.{field}: expected {expected}, found {found}")]
    TypeMismatch {
        /// Entity kind
        kind: String,
        /// Field name
        field: String,
        /// Declared type
        expected: String,
        /// Supplied type
        found: String,
    },

    /// Wrong number of occurrences, or conflicting choice-group members
    #[error("cardinality violation on {kind}.{field}: {reason}")]
    CardinalityViolation {
        /// Entity kind
        kind: String,
        /// Field name
        field: String,
        /// What went wrong
        reason: String,
    },

    /// A required field was left absent
    #[error("missing required field {kind}.{field}")]
    MissingRequiredField {
        /// Entity kind
        kind: String,
        /// Field name (or `a|b` for a required choice group)
        field: String,
    },

    /// A child element (or text) not allowed by a closed content model
    #[error("unexpected element {element} in {kind}")]
    UnexpectedElement {
        /// Entity kind being decoded
        kind: String,
        /// Qualified name of the offending element
        element: String,
    },

    /// A weak reference points to an identifier absent from the catalog
    #[error("unresolved reference '{target}' from {kind}.{field}")]
    UnresolvedReference {
        /// Entity kind holding the reference
        kind: String,
        /// Field name holding the reference
        field: String,
        /// The identifier or href that failed to resolve
        target: String,
    },

    /// A lexical value could not be parsed as its primitive type
    #[error("malformed {expected} value {value:?} in {kind}.{field}: {reason}")]
    MalformedPrimitive {
        /// Entity kind
        kind: String,
        /// Field name
        field: String,
        /// Expected primitive type
        expected: String,
        /// Offending lexical value
        value: String,
        /// Parser diagnostic
        reason: String,
    },

    /// Kind name not present in the schema
    #[error("unknown kind: {0}")]
    UnknownKind(String),

    /// Field name not declared for a kind
    #[error("unknown field {kind}.{field}")]
    UnknownField {
        /// Entity kind
        kind: String,
        /// Field name
        field: String,
    },

    /// Abstract kinds cannot be instantiated
    #[error("kind {0} is abstract and cannot be instantiated")]
    AbstractKind(String),

    /// Inconsistent schema table
    #[error("schema error: {0}")]
    Schema(String),

    /// An error annotated with the document position where it occurred
    #[error("{source} (at {position})")]
    Located {
        /// Position of the offending element
        position: Position,
        /// Underlying error
        source: Box<Error>,
    },

    /// XML parsing or writing error
    #[error("XML error: {0}")]
    Xml(String),

    /// Namespace error
    #[error("namespace error: {0}")]
    Namespace(String),

    /// Name error (invalid XML name)
    #[error("name error: {0}")]
    Name(String),

    /// Limit exceeded error
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// Malformed JSON schema description
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn type_mismatch(
        kind: &str,
        field: &str,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Error::TypeMismatch {
            kind: kind.to_string(),
            field: field.to_string(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub(crate) fn cardinality(kind: &str, field: &str, reason: impl Into<String>) -> Self {
        Error::CardinalityViolation {
            kind: kind.to_string(),
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(kind: &str, field: &str) -> Self {
        Error::MissingRequiredField {
            kind: kind.to_string(),
            field: field.to_string(),
        }
    }

    pub(crate) fn unexpected(kind: &str, element: impl fmt::Display) -> Self {
        Error::UnexpectedElement {
            kind: kind.to_string(),
            element: element.to_string(),
        }
    }

    pub(crate) fn unknown_field(kind: &str, field: &str) -> Self {
        Error::UnknownField {
            kind: kind.to_string(),
            field: field.to_string(),
        }
    }

    /// Attach a document position, unless one is already attached
    pub fn at(self, position: Option<Position>) -> Self {
        match (self, position) {
            (err @ Error::Located { .. }, _) => err,
            (err, Some(position)) => Error::Located {
                position,
                source: Box::new(err),
            },
            (err, None) => err,
        }
    }

    /// The error without any position annotation
    pub fn root(&self) -> &Error {
        match self {
            Error::Located { source, .. } => source.root(),
            other => other,
        }
    }

    /// Document position, if known
    pub fn position(&self) -> Option<Position> {
        match self {
            Error::Located { position, .. } => Some(*position),
            _ => None,
        }
    }

    /// Entity kind the error refers to, if any
    pub fn kind_name(&self) -> Option<&str> {
        match self.root() {
            Error::TypeMismatch { kind, .. }
            | Error::CardinalityViolation { kind, .. }
            | Error::MissingRequiredField { kind, .. }
            | Error::UnexpectedElement { kind, .. }
            | Error::UnresolvedReference { kind, .. }
            | Error::MalformedPrimitive { kind, .. }
            | Error::UnknownField { kind, .. } => Some(kind),
            Error::UnknownKind(kind) | Error::AbstractKind(kind) => Some(kind),
            _ => None,
        }
    }

    /// Field name the error refers to, if any
    pub fn field_name(&self) -> Option<&str> {
        match self.root() {
            Error::TypeMismatch { field, .. }
            | Error::CardinalityViolation { field, .. }
            | Error::MissingRequiredField { field, .. }
            | Error::UnresolvedReference { field, .. }
            | Error::MalformedPrimitive { field, .. }
            | Error::UnknownField { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Whether the caller can continue past this error (dangling references)
    pub fn is_recoverable(&self) -> bool {
        matches!(self.root(), Error::UnresolvedReference { .. })
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<roxmltree::Error> for Error {
    fn from(err: roxmltree::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_display() {
        let err = Error::missing("PointType", "pos|coordinates");
        let msg = format!("{}", err);
        assert!(msg.contains("PointType.pos|coordinates"));
        assert_eq!(err.kind_name(), Some("PointType"));
        assert_eq!(err.field_name(), Some("pos|coordinates"));
    }

    #[test]
    fn test_located_error() {
        let err = Error::unexpected("PointType", "{http://www.opengis.net/gml}foo")
            .at(Some(Position::new(3, 7)));
        let msg = format!("{}", err);
        assert!(msg.contains("unexpected element"));
        assert!(msg.contains("3:7"));
        assert_eq!(err.position(), Some(Position::new(3, 7)));
        assert!(matches!(err.root(), Error::UnexpectedElement { .. }));
        assert_eq!(err.kind_name(), Some("PointType"));
    }

    #[test]
    fn test_position_is_not_attached_twice() {
        let err = Error::missing("A", "b")
            .at(Some(Position::new(1, 1)))
            .at(Some(Position::new(9, 9)));
        assert_eq!(err.position(), Some(Position::new(1, 1)));
    }

    #[test]
    fn test_recoverable() {
        let err = Error::UnresolvedReference {
            kind: "CartesianCSType".into(),
            field: "usesAxis".into(),
            target: "#x".into(),
        };
        assert!(err.is_recoverable());
        assert!(!Error::missing("A", "b").is_recoverable());
    }
}
