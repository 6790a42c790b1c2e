//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and traits.
//!
//! ```ignore
//! use protogen::prelude::*;
//! ```

// Declarations
pub use protogen_model::{
    DeclSource, FieldDecl, PackageDecl, PackageSet, TypeDecl, TypeExpr, TypeRef,
};

// Model
pub use protogen_model::{ModelError, TagParser, TypeModel};

// Generation
pub use protogen_codegen::{
    AliasAssignment, AliasTracker, CodegenError, Generated, Generator, GeneratorConfig,
    RenderError, RenderPlan, Warning,
};
