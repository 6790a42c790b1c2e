//! # protogen
//!
//! Deterministic Protobuf (`proto3`) schema generation from structured type
//! declarations.
//!
//! A loader hands over package declarations (structs with tagged fields,
//! named aliases, pointers, slices and maps). protogen discovers every type
//! reachable from a set of roots, applies the `protobuf:"..."` directives
//! found on declarations, gives each foreign package a short collision-free
//! alias and emits one message per struct in dependency order.
//!
//! ## Features
//!
//! - **Stable output** - identical input always yields byte-identical text
//! - **Override directives** - `name=`, `number=`, `skip`, `inline`
//! - **Package aliases** - shortest free path suffix, reserved words escaped
//! - **Cycles allowed** - mutually referencing types are ordered and reported
//!
//! ## Quick Start
//!
//! ```ignore
//! use protogen::prelude::*;
//!
//! let source = PackageSet::from_json(&json)?;
//! let generated = Generator::new(GeneratorConfig::default())
//!     .generate(&source, [TypeRef::new("geo/metrics", "Shape")])?;
//! println!("{}", generated.text);
//! ```
//!
//! ## Crate Organization
//!
//! - [`model`] - Declarations, type model and directive parsing
//! - [`codegen`] - Alias assignment, ordering, planning and emission

pub mod prelude;

/// Declarations, type model and directive parsing.
pub mod model {
    pub use protogen_model::*;
}

/// Alias assignment, ordering, planning and emission.
pub mod codegen {
    pub use protogen_codegen::*;
}

pub use protogen_codegen::{generate_from_file, generate_from_json};
