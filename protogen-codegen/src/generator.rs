//! Generation pipeline.

use crate::alias::{AliasAssignment, AliasTracker};
use crate::config::GeneratorConfig;
use crate::error::{CodegenError, Warning};
use crate::order::order;
use crate::plan::RenderPlan;
use crate::proto::ProtoEmitter;
use protogen_model::{DeclSource, TypeModel, TypeRef};
use std::io::Write;

/// Output of one generation run.
#[derive(Debug, Clone)]
pub struct Generated {
    /// Rendered schema text.
    pub text: String,
    /// Non-fatal conditions found along the way.
    pub warnings: Vec<Warning>,
    /// Package aliases used in the text.
    pub aliases: AliasAssignment,
}

impl Generated {
    /// Writes the schema text to `sink`.
    ///
    /// # Errors
    /// Returns `CodegenError::Io` if writing fails.
    pub fn write_to<W: Write>(&self, mut sink: W) -> Result<(), CodegenError> {
        sink.write_all(self.text.as_bytes())?;
        sink.flush()?;
        Ok(())
    }
}

/// Runs load, annotate, alias assignment, ordering, planning and emission.
///
/// Each run builds its own alias table and plan, so one generator can be
/// reused across runs.
#[derive(Debug, Clone, Default)]
pub struct Generator {
    config: GeneratorConfig,
}

impl Generator {
    /// Creates a new generator.
    #[must_use]
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generates the schema for `roots`.
    ///
    /// # Errors
    /// Fails on the first unresolved type, malformed directive, alias
    /// exhaustion or render collision. No partial output is produced.
    pub fn generate<S, I>(&self, source: &S, roots: I) -> Result<Generated, CodegenError>
    where
        S: DeclSource + ?Sized,
        I: IntoIterator<Item = TypeRef>,
    {
        let span = tracing::debug_span!("generate");
        let _enter = span.enter();

        let model = TypeModel::load(source, roots)?;
        tracing::debug!(types = model.len(), "model loaded");

        let model = self.config.tag_parser().annotate(model)?;
        tracing::debug!(key = %self.config.tag_key, "overrides annotated");

        let (aliases, warnings) = AliasTracker::from_config(&self.config).assign(model.packages())?;
        tracing::debug!(aliases = aliases.len(), warnings = warnings.len(), "aliases assigned");

        let ordering = order(&model);
        tracing::debug!(
            messages = ordering.types.len(),
            cycles = ordering.cycles.len(),
            "types ordered"
        );

        let plan = RenderPlan::build(&model, &ordering, &aliases)?;
        let text = ProtoEmitter::new(&plan)
            .with_banner(self.config.banner)
            .generate();
        tracing::debug!(bytes = text.len(), "schema emitted");

        Ok(Generated {
            text,
            warnings,
            aliases,
        })
    }

    /// Generates the schema for `roots` and writes it to `sink`.
    ///
    /// # Errors
    /// Returns any generation error, or `CodegenError::Io` if writing fails.
    /// Nothing is written when generation fails.
    pub fn write_to<S, I, W>(&self, source: &S, roots: I, sink: W) -> Result<Generated, CodegenError>
    where
        S: DeclSource + ?Sized,
        I: IntoIterator<Item = TypeRef>,
        W: Write,
    {
        let generated = self.generate(source, roots)?;
        generated.write_to(sink)?;
        Ok(generated)
    }
}
