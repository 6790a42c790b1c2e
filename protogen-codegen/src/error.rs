//! Error and warning types for code generation.

use protogen_model::{ModelError, TypeRef};
use std::fmt;
use thiserror::Error;

/// Error type for code generation operations.
#[derive(Debug, Error)]
pub enum CodegenError {
    /// Loading or annotating the type model failed.
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// No path suffix yields a unique alias for a package.
    #[error(
        "cannot derive a unique alias for package '{package}': every suffix up to '{candidate}' is taken or empty"
    )]
    AliasExhaustion {
        /// Package that could not be aliased.
        package: String,
        /// Longest candidate tried.
        candidate: String,
        /// Package already holding that candidate, if any.
        conflicting: Option<String>,
    },

    /// A generator setting has an unusable value.
    #[error("invalid configuration '{setting}': {reason}")]
    InvalidConfig {
        /// Setting name.
        setting: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// Collision or unrepresentable construct found while planning output.
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Code generation error.
    #[error("generation error: {message}")]
    Generation {
        /// Error message.
        message: String,
    },
}

impl CodegenError {
    /// Creates a generation error with the given message.
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation {
            message: message.into(),
        }
    }
}

/// Error raised while resolving names, numbers and field types for output.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    /// Two fields of one message resolve to the same number.
    #[error("message '{message}': fields '{first}' and '{second}' both use number {number}")]
    DuplicateNumber {
        /// Message name.
        message: String,
        /// Contested number.
        number: u32,
        /// Earlier field.
        first: String,
        /// Later field.
        second: String,
    },

    /// Two fields of one message resolve to the same name.
    #[error("message '{message}': fields '{first}' and '{second}' both render as '{name}'")]
    DuplicateName {
        /// Message name.
        message: String,
        /// Contested name.
        name: String,
        /// Earlier field.
        first: String,
        /// Later field.
        second: String,
    },

    /// Two messages of one package resolve to the same name.
    #[error("package '{package}': message name '{name}' is used by '{first}' and '{second}'")]
    DuplicateMessage {
        /// Package path.
        package: String,
        /// Contested name.
        name: String,
        /// Earlier type.
        first: TypeRef,
        /// Later type.
        second: TypeRef,
    },

    /// An explicit number lies in the range reserved by Protobuf.
    #[error("field '{field}' uses number {number}, which is reserved (19000-19999)")]
    ReservedNumber {
        /// Field path.
        field: String,
        /// Offending number.
        number: u32,
    },

    /// A field refers to a type excluded with `skip`.
    #[error("field '{field}' references skipped type '{target}'")]
    SkippedReference {
        /// Field path.
        field: String,
        /// Skipped type.
        target: TypeRef,
    },

    /// The field type has no Protobuf rendering.
    #[error("field '{field}' cannot be represented: {reason}")]
    Unrepresentable {
        /// Field path.
        field: String,
        /// Explanation.
        reason: String,
    },

    /// Inline embedding loops back into a struct being flattened.
    #[error("inline embedding cycle in '{message}': {path}")]
    InlineCycle {
        /// Message being flattened.
        message: String,
        /// Embedding chain.
        path: String,
    },

    /// Alias chain never reaches a concrete type.
    #[error("alias cycle through '{type_ref}'")]
    AliasCycle {
        /// Alias where the cycle was detected.
        type_ref: TypeRef,
    },
}

/// Non-fatal condition surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A package path contains a backslash while `/` separates segments; the
    /// derived alias may not be what the author expects.
    AmbiguousSeparator {
        /// Package path.
        package: String,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AmbiguousSeparator { package } => write!(
                f,
                "backslash used in package path '{package}', this is unsupported"
            ),
        }
    }
}
