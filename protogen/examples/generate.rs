//! Generates a Protobuf schema from a JSON manifest.
//!
//! Run with: `cargo run --example generate -- [manifest.json]`
//!
//! Without an argument the bundled `shapes.json` manifest is used. Set
//! `RUST_LOG=debug` to trace each pipeline phase.

use anyhow::Context;
use protogen::codegen::{Generated, generate_from_file, generate_from_json};
use std::path::PathBuf;

const BUNDLED: &str = include_str!("shapes.json");

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let generated: Generated = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => generate_from_file(&path)
            .with_context(|| format!("generating from {}", path.display()))?,
        None => generate_from_json(BUNDLED).context("generating from bundled manifest")?,
    };

    for warning in &generated.warnings {
        tracing::warn!("{warning}");
    }
    for (package, alias) in generated.aliases.iter() {
        tracing::info!(package, alias, "package alias");
    }

    generated
        .write_to(std::io::stdout().lock())
        .context("writing schema")?;
    Ok(())
}
