//! Error types for model loading and override parsing.

use crate::types::TypeRef;
use thiserror::Error;

/// Error type for building and annotating a [`TypeModel`](crate::TypeModel).
#[derive(Debug, Error)]
pub enum ModelError {
    /// A referenced type is not defined by its source package.
    #[error("unresolved type '{type_ref}' referenced from {referenced_from}")]
    UnresolvedType {
        /// The type that could not be loaded.
        type_ref: TypeRef,
        /// Where the reference was found (a root, or `Type.Field`).
        referenced_from: String,
    },

    /// A recognized directive carries a malformed value.
    #[error("invalid override '{directive}' on {target}: {reason}")]
    InvalidOverride {
        /// Offending declaration (`pkg.Type` or `pkg.Type.Field`).
        target: String,
        /// Directive key as written.
        directive: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A package was declared twice in the same source.
    #[error("duplicate {kind} definition: '{name}'")]
    DuplicateDefinition {
        /// Kind of definition (package, type).
        kind: String,
        /// Name of the duplicate.
        name: String,
    },

    /// Declaration manifest could not be decoded.
    #[error("manifest error: {0}")]
    Manifest(#[from] serde_json::Error),
}

impl ModelError {
    /// Creates an unresolved type error.
    pub fn unresolved(type_ref: TypeRef, referenced_from: impl Into<String>) -> Self {
        Self::UnresolvedType {
            type_ref,
            referenced_from: referenced_from.into(),
        }
    }

    /// Creates an invalid override error.
    pub fn invalid_override(
        target: impl Into<String>,
        directive: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidOverride {
            target: target.into(),
            directive: directive.into(),
            reason: reason.into(),
        }
    }

    /// Creates a duplicate definition error.
    pub fn duplicate(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::DuplicateDefinition {
            kind: kind.into(),
            name: name.into(),
        }
    }
}

/// Result type alias for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
