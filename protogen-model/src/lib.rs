//! # protogen model
//!
//! Type model and override parsing for the Protobuf schema generator.
//!
//! This crate provides:
//! - The declaration surface an external package loader hands over
//! - The type model: one shared definition per distinct type reference
//! - Override directive parsing from declaration annotations
//! - Identifier helpers shared with the emitter

pub mod decl;
pub mod error;
pub mod model;
pub mod naming;
pub mod tags;
pub mod types;

pub use decl::{DeclKind, DeclRef, DeclSource, FieldDecl, PackageDecl, PackageSet, TypeDecl, TypeExpr};
pub use error::ModelError;
pub use model::TypeModel;
pub use tags::{MAX_FIELD_NUMBER, TagParser};
pub use types::{FieldDef, Override, Primitive, TypeDef, TypeKind, TypeRef};
