use std::fmt;

use thiserror::Error;
use tracing::error;

/// Convenience alias for catalog command results.
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Kind of object named in a permission failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectKind {
    /// A schema.
    Schema,
    /// A data type.
    Type,
    /// A function.
    Function,
    /// An operator.
    Operator,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ObjectKind::Schema => "schema",
            ObjectKind::Type => "type",
            ObjectKind::Function => "function",
            ObjectKind::Operator => "operator",
        };
        f.write_str(label)
    }
}

/// Errors raised while defining, altering, or removing operators.
///
/// Several variants share one taxonomy class; [`CatalogError::code`] reports
/// the class so callers can match on it without caring which check fired.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Structurally invalid request.
    #[error("{message}")]
    InvalidDefinition {
        /// Primary message.
        message: String,
        /// Secondary, more actionable detail.
        detail: Option<String>,
    },
    /// A creation-time attribute was targeted by ALTER.
    #[error("operator attribute \"{attr}\" cannot be changed")]
    ImmutableAttribute {
        /// Attribute key as supplied.
        attr: String,
    },
    /// An attribute key is not known at all.
    #[error("operator attribute \"{attr}\" not recognized")]
    UnrecognizedAttribute {
        /// Attribute key as supplied.
        attr: String,
    },
    /// The operator symbol contains illegal characters or sequences.
    #[error("\"{name}\" is not a valid operator name")]
    InvalidName {
        /// Offending symbol.
        name: String,
    },
    /// A named object does not exist.
    #[error("{kind} \"{name}\" does not exist")]
    UndefinedObject {
        /// What was being looked up.
        kind: &'static str,
        /// Name as supplied.
        name: String,
    },
    /// No function matches the requested signature.
    #[error("function {signature} does not exist")]
    UndefinedFunction {
        /// Rendered `name(arg, ...)` signature.
        signature: String,
    },
    /// A join estimator name matches more than one accepted signature.
    #[error("join estimator function {name} has multiple matches")]
    AmbiguousFunction {
        /// Estimator name as supplied.
        name: String,
    },
    /// The acting role lacks a privilege on an object.
    #[error("permission denied for {kind} {name}")]
    PermissionDenied {
        /// Object kind.
        kind: ObjectKind,
        /// Object name.
        name: String,
    },
    /// The acting role does not own the object.
    #[error("must be owner of {kind} {name}")]
    NotOwner {
        /// Object kind.
        kind: ObjectKind,
        /// Object name.
        name: String,
    },
    /// An operator with the same signature already exists.
    #[error("operator {name} already exists")]
    DuplicateObject {
        /// Rendered operator signature.
        name: String,
    },
    /// A lookup that a prior step guaranteed failed anyway.
    #[error("internal inconsistency: {0}")]
    InternalInconsistency(String),
}

impl CatalogError {
    /// Builds an [`CatalogError::InvalidDefinition`] without detail.
    pub fn invalid(message: impl Into<String>) -> Self {
        CatalogError::InvalidDefinition {
            message: message.into(),
            detail: None,
        }
    }

    /// Builds an [`CatalogError::InvalidDefinition`] with a detail line.
    pub fn invalid_with_detail(message: impl Into<String>, detail: impl Into<String>) -> Self {
        CatalogError::InvalidDefinition {
            message: message.into(),
            detail: Some(detail.into()),
        }
    }

    /// Builds an [`CatalogError::UndefinedObject`].
    pub fn undefined(kind: &'static str, name: impl Into<String>) -> Self {
        CatalogError::UndefinedObject {
            kind,
            name: name.into(),
        }
    }

    /// Builds an [`CatalogError::InternalInconsistency`] and logs it; these
    /// indicate a caller bug rather than bad user input.
    pub fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(%message, "catalog.internal_inconsistency");
        CatalogError::InternalInconsistency(message)
    }

    /// Returns the taxonomy class of the error.
    pub fn code(&self) -> &'static str {
        match self {
            CatalogError::InvalidDefinition { .. } => "InvalidDefinition",
            CatalogError::ImmutableAttribute { .. } => "InvalidDefinition",
            CatalogError::UnrecognizedAttribute { .. } => "InvalidDefinition",
            CatalogError::InvalidName { .. } => "InvalidDefinition",
            CatalogError::UndefinedObject { .. } => "UndefinedObject",
            CatalogError::UndefinedFunction { .. } => "UndefinedFunction",
            CatalogError::AmbiguousFunction { .. } => "AmbiguousFunction",
            CatalogError::PermissionDenied { .. } => "PermissionDenied",
            CatalogError::NotOwner { .. } => "PermissionDenied",
            CatalogError::DuplicateObject { .. } => "DuplicateObject",
            CatalogError::InternalInconsistency(_) => "InternalInconsistency",
        }
    }

    /// Secondary detail text, when the error carries one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            CatalogError::InvalidDefinition { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// True for faults that must abort the enclosing transaction outright.
    pub fn is_internal(&self) -> bool {
        matches!(self, CatalogError::InternalInconsistency(_))
    }
}

/// Formats an error together with its class, e.g. `[UndefinedFunction] ...`.
pub struct CatalogErrorWithCode<'a>(pub &'a CatalogError);

impl fmt::Display for CatalogErrorWithCode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.0.code(), self.0)?;
        if let Some(detail) = self.0.detail() {
            write!(f, " ({detail})")?;
        }
        Ok(())
    }
}
