//! # protogen codegen
//!
//! Protobuf schema generation from a loaded type model.
//!
//! This crate provides:
//! - Collision-free package alias assignment
//! - Deterministic dependency ordering with cycle reporting
//! - Render plan construction (names, numbers, qualified types)
//! - `proto3` text emission
//! - The end-to-end [`Generator`] pipeline

pub mod alias;
pub mod config;
pub mod error;
pub mod generator;
pub mod order;
pub mod plan;
pub mod proto;

pub use alias::{AliasAssignment, AliasTracker};
pub use config::GeneratorConfig;
pub use error::{CodegenError, RenderError, Warning};
pub use generator::{Generated, Generator};
pub use order::{Ordering, order};
pub use plan::{PlannedField, PlannedMessage, RenderPlan};

use protogen_model::{PackageDecl, PackageSet, TypeRef};
use serde::Deserialize;

/// A self-contained generation request: configuration, declarations and
/// roots.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    /// Generator settings.
    #[serde(default)]
    pub config: GeneratorConfig,
    /// Package declarations.
    pub packages: Vec<PackageDecl>,
    /// Types to generate from.
    pub roots: Vec<TypeRef>,
}

/// Generates a schema from a JSON manifest string.
///
/// # Arguments
/// * `json` - Manifest with `config`, `packages` and `roots`
///
/// # Returns
/// The generated schema with warnings and aliases.
///
/// # Errors
/// Returns `CodegenError` if the manifest is malformed or generation fails.
pub fn generate_from_json(json: &str) -> Result<Generated, CodegenError> {
    let manifest: Manifest =
        serde_json::from_str(json).map_err(protogen_model::ModelError::from)?;
    let source = PackageSet::from_packages(manifest.packages)?;
    Generator::new(manifest.config).generate(&source, manifest.roots)
}

/// Generates a schema from a JSON manifest file.
///
/// # Errors
/// Returns `CodegenError` if reading, parsing, or generation fails.
pub fn generate_from_file(path: &std::path::Path) -> Result<Generated, CodegenError> {
    let json = std::fs::read_to_string(path)?;
    generate_from_json(&json)
}
