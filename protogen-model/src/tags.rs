//! Override directives embedded in declaration annotations.
//!
//! Annotation text uses struct-tag syntax: space-separated `key:"value"`
//! pairs. The value under the generator key is a comma-separated directive
//! list, e.g. `protobuf:"name=center,number=4"`.
//!
//! Recognized directives:
//! - `name=<identifier>` - emitted name
//! - `number=<n>` - emitted field number (fields only)
//! - `skip` - exclude from output (a bare `-` value means the same)
//! - `inline` - flatten an embedded struct into its parent (fields only)
//!
//! Unknown directive keys are ignored.

use crate::error::{ModelError, Result};
use crate::model::TypeModel;
use crate::naming::is_identifier;
use crate::types::{FieldDef, Override, TypeDef, TypeKind};
use std::collections::BTreeMap;

/// Highest field number Protobuf accepts.
pub const MAX_FIELD_NUMBER: u32 = 536_870_911;

/// Default annotation key read by the parser.
pub const DEFAULT_TAG_KEY: &str = "protobuf";

/// Looks up `key` in struct-tag text.
///
/// Scanning stops silently at the first malformed pair, except when the
/// malformed pair is `key` itself, which is reported as an error message.
pub fn lookup_tag(text: &str, key: &str) -> std::result::Result<Option<String>, String> {
    let mut rest = text;
    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            return Ok(None);
        }

        let Some(colon) = rest.find(':') else {
            return Ok(None);
        };
        let name = &rest[..colon];
        if name.is_empty() || name.contains(|c: char| c.is_whitespace() || c == '"') {
            return Ok(None);
        }

        let after = &rest[colon + 1..];
        if !after.starts_with('"') {
            if name == key {
                return Err("value must be double-quoted".to_string());
            }
            return Ok(None);
        }

        let mut value = String::new();
        let mut escaped = false;
        let mut end = None;
        for (i, c) in after[1..].char_indices() {
            if escaped {
                value.push(c);
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                end = Some(i + 1);
                break;
            } else {
                value.push(c);
            }
        }

        let Some(end) = end else {
            if name == key {
                return Err("unterminated quoted value".to_string());
            }
            return Ok(None);
        };

        if name == key {
            return Ok(Some(value));
        }
        rest = &after[end + 1..];
    }
}

/// Where a directive list is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Type,
    Field,
}

/// Parses a directive list into an [`Override`].
fn parse_directives(value: &str, target: Target, label: &str) -> Result<Override> {
    let mut out = Override::default();
    if value.trim() == "-" {
        out.skip = true;
        return Ok(out);
    }

    for item in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (key, arg) = match item.split_once('=') {
            Some((k, v)) => (k.trim(), Some(v.trim())),
            None => (item, None),
        };

        match key {
            "name" => {
                let arg = arg.ok_or_else(|| {
                    ModelError::invalid_override(label, key, "missing value")
                })?;
                if out.name.is_some() {
                    return Err(ModelError::invalid_override(label, key, "repeated directive"));
                }
                if !is_identifier(arg) {
                    return Err(ModelError::invalid_override(
                        label,
                        key,
                        format!("'{arg}' is not a legal identifier"),
                    ));
                }
                out.name = Some(arg.to_string());
            }
            "number" => {
                if target == Target::Type {
                    return Err(ModelError::invalid_override(
                        label,
                        key,
                        "numbers apply to fields only",
                    ));
                }
                let arg = arg.ok_or_else(|| {
                    ModelError::invalid_override(label, key, "missing value")
                })?;
                if out.number.is_some() {
                    return Err(ModelError::invalid_override(label, key, "repeated directive"));
                }
                let number: u32 = arg.parse().map_err(|_| {
                    ModelError::invalid_override(label, key, format!("'{arg}' is not a number"))
                })?;
                if number == 0 || number > MAX_FIELD_NUMBER {
                    return Err(ModelError::invalid_override(
                        label,
                        key,
                        format!("{number} is outside 1..={MAX_FIELD_NUMBER}"),
                    ));
                }
                out.number = Some(number);
            }
            "skip" | "inline" => {
                if arg.is_some() {
                    return Err(ModelError::invalid_override(label, key, "takes no value"));
                }
                if key == "skip" {
                    out.skip = true;
                } else if target == Target::Type {
                    return Err(ModelError::invalid_override(
                        label,
                        key,
                        "inline applies to embedded fields only",
                    ));
                } else {
                    out.inline = true;
                }
            }
            other => {
                tracing::debug!(target_decl = label, directive = other, "ignoring unknown directive");
            }
        }
    }

    Ok(out)
}

/// Extracts generation directives from annotation text.
#[derive(Debug, Clone)]
pub struct TagParser {
    key: String,
    name_tag: Option<String>,
}

impl Default for TagParser {
    fn default() -> Self {
        Self::new(DEFAULT_TAG_KEY)
    }
}

impl TagParser {
    /// Creates a parser reading directives under `key`.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name_tag: None,
        }
    }

    /// Takes default field names from another tag (e.g. `json`) when no
    /// explicit `name=` is given.
    #[must_use]
    pub fn with_name_tag(mut self, tag: impl Into<String>) -> Self {
        self.name_tag = Some(tag.into());
        self
    }

    /// Returns the directive key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Parses the directives of one annotation.
    fn parse(&self, tags: Option<&str>, target: Target, label: &str) -> Result<Override> {
        let Some(text) = tags else {
            return Ok(Override::default());
        };
        match lookup_tag(text, &self.key) {
            Ok(Some(value)) => parse_directives(&value, target, label),
            Ok(None) => Ok(Override::default()),
            Err(reason) => Err(ModelError::invalid_override(label, &self.key, reason)),
        }
    }

    /// Default name taken from the configured name tag.
    fn tag_name(&self, tags: Option<&str>) -> Option<String> {
        let key = self.name_tag.as_deref()?;
        let value = lookup_tag(tags?, key).ok()??;
        let first = value.split(',').next()?.trim();
        if first.is_empty() || first == "-" {
            return None;
        }
        if !is_identifier(first) {
            tracing::debug!(tag = key, value = first, "name tag is not an identifier, ignored");
            return None;
        }
        Some(first.to_string())
    }

    fn annotate_field(&self, model: &TypeModel, owner: &str, mut field: FieldDef) -> Result<FieldDef> {
        let label = format!("{owner}.{}", field.name);
        let mut overrides = self.parse(field.tags.as_deref(), Target::Field, &label)?;

        if overrides.name.is_none() {
            overrides.name = self.tag_name(field.tags.as_deref());
        }

        if overrides.inline {
            if !field.embedded {
                return Err(ModelError::invalid_override(
                    &label,
                    "inline",
                    "field is not embedded",
                ));
            }
            let is_struct = model.underlying(&field.ty).is_some_and(TypeDef::is_struct);
            if !is_struct {
                return Err(ModelError::invalid_override(
                    &label,
                    "inline",
                    format!("embedded type '{}' is not a struct", field.ty),
                ));
            }
            if overrides.number.is_some() {
                return Err(ModelError::invalid_override(
                    &label,
                    "number",
                    "an inlined field has no number of its own",
                ));
            }
        }

        field.overrides = overrides;
        Ok(field)
    }

    /// Populates the overrides of every type and field in `model`.
    ///
    /// # Errors
    /// Returns `ModelError::InvalidOverride` naming the first declaration with
    /// a malformed directive.
    pub fn annotate(&self, model: TypeModel) -> Result<TypeModel> {
        // Directive checks need read access to the whole model, so overrides
        // are computed first and applied in a second pass.
        let mut annotated = BTreeMap::new();
        for def in model.iter() {
            if def.type_ref.is_unnamed() {
                continue;
            }
            let label = def.type_ref.to_string();
            let type_overrides = self.parse(def.tags.as_deref(), Target::Type, &label)?;
            let fields = match &def.kind {
                TypeKind::Struct(fields) => Some(
                    fields
                        .iter()
                        .cloned()
                        .map(|f| self.annotate_field(&model, &label, f))
                        .collect::<Result<Vec<_>>>()?,
                ),
                _ => None,
            };
            annotated.insert(def.type_ref.clone(), (type_overrides, fields));
        }

        let model = model.try_map(|mut def| {
            if let Some((overrides, fields)) = annotated.remove(&def.type_ref) {
                def.overrides = overrides;
                if let Some(fields) = fields {
                    def.kind = TypeKind::Struct(fields);
                }
            }
            Ok(def)
        })?;

        tracing::debug!(key = %self.key, "annotations parsed");
        Ok(model)
    }
}
