//! Render plan construction.
//!
//! The plan is the fully resolved form of the output: every message with its
//! emitted name, and every field with its emitted name, number and printed
//! type. All collisions are detected here so emission cannot fail.

use crate::alias::AliasAssignment;
use crate::error::{CodegenError, RenderError};
use crate::order::Ordering;
use crate::proto::types::{FieldType, FieldTypeResolver};
use protogen_model::naming::{sanitize_identifier, to_snake_case};
use protogen_model::{FieldDef, MAX_FIELD_NUMBER, TypeDef, TypeModel, TypeRef};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;

/// Field numbers Protobuf reserves for its own implementation.
pub const RESERVED_NUMBERS: RangeInclusive<u32> = 19_000..=19_999;

/// A field ready for emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedField {
    /// Emitted field name.
    pub name: String,
    /// Field number.
    pub number: u32,
    /// Printed type, alias-qualified.
    pub type_expr: String,
    /// Documentation lines.
    pub doc: Vec<String>,
    /// Declaring field as `pkg.Type.Field`.
    pub source: String,
}

/// A message ready for emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMessage {
    /// Type the message renders.
    pub type_ref: TypeRef,
    /// Origin package path.
    pub package: String,
    /// Alias of the origin package, if it has one.
    pub alias: Option<String>,
    /// Emitted message name.
    pub name: String,
    /// Documentation lines.
    pub doc: Vec<String>,
    /// Fields in emission order.
    pub fields: Vec<PlannedField>,
}

impl PlannedMessage {
    /// Looks up a field by emitted name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&PlannedField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Ordered sequence of messages to emit. Never mutated after construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderPlan {
    messages: Vec<PlannedMessage>,
}

/// A field that survived filtering and flattening, before numbering.
struct Candidate<'m> {
    field: &'m FieldDef,
    source: String,
}

impl RenderPlan {
    /// Builds the plan for `ordering` over an annotated model.
    ///
    /// # Errors
    /// Returns `CodegenError::Render` on any name or number collision,
    /// reserved number, skipped-type reference, inline cycle or
    /// unrepresentable field type.
    pub fn build(
        model: &TypeModel,
        ordering: &Ordering,
        aliases: &AliasAssignment,
    ) -> Result<Self, CodegenError> {
        let emitted: Vec<&TypeDef> = ordering
            .types
            .iter()
            .filter_map(|t| model.def(t))
            .filter(|def| def.is_struct() && !def.overrides.skip)
            .collect();

        let names = message_names(&emitted)?;
        let resolver = FieldTypeResolver::new(model);

        let mut messages = Vec::with_capacity(emitted.len());
        for def in &emitted {
            let name = names.get(&def.type_ref).cloned().unwrap_or_default();
            let mut candidates = Vec::new();
            let mut chain = vec![def.type_ref.clone()];
            flatten(model, def, &name, &mut chain, &mut candidates)?;

            let numbers = assign_numbers(&name, &candidates)?;
            let mut fields = Vec::with_capacity(candidates.len());
            let mut seen_names: BTreeMap<String, String> = BTreeMap::new();

            for (candidate, number) in candidates.iter().zip(numbers) {
                let field_name = field_name(candidate.field);
                if let Some(first) = seen_names.get(&field_name) {
                    return Err(RenderError::DuplicateName {
                        message: name.clone(),
                        name: field_name,
                        first: first.clone(),
                        second: candidate.source.clone(),
                    }
                    .into());
                }
                seen_names.insert(field_name.clone(), candidate.source.clone());

                let field_type = resolver.resolve(&candidate.field.ty, &candidate.source)?;
                let type_expr = field_type
                    .render(def.package(), aliases, &names)
                    .ok_or_else(|| missing_alias(&candidate.source, &field_type))?;

                fields.push(PlannedField {
                    name: field_name,
                    number,
                    type_expr,
                    doc: candidate.field.doc.clone(),
                    source: candidate.source.clone(),
                });
            }

            messages.push(PlannedMessage {
                type_ref: def.type_ref.clone(),
                package: def.package().to_string(),
                alias: aliases.alias(def.package()).map(str::to_string),
                name,
                doc: def.doc.clone(),
                fields,
            });
        }

        tracing::debug!(messages = messages.len(), "render plan built");
        Ok(Self { messages })
    }

    /// Messages in emission order.
    #[must_use]
    pub fn messages(&self) -> &[PlannedMessage] {
        &self.messages
    }

    /// Looks up a message by its type.
    #[must_use]
    pub fn message(&self, type_ref: &TypeRef) -> Option<&PlannedMessage> {
        self.messages.iter().find(|m| &m.type_ref == type_ref)
    }

    /// Number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if nothing is emitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Emitted message names, unique per package.
fn message_names(emitted: &[&TypeDef]) -> Result<BTreeMap<TypeRef, String>, RenderError> {
    let mut names = BTreeMap::new();
    let mut owners: BTreeMap<(&str, String), &TypeRef> = BTreeMap::new();

    for def in emitted {
        let name = def
            .overrides
            .name
            .clone()
            .unwrap_or_else(|| sanitize_identifier(def.name()));
        if let Some(first) = owners.get(&(def.package(), name.clone())) {
            return Err(RenderError::DuplicateMessage {
                package: def.package().to_string(),
                name,
                first: (*first).clone(),
                second: def.type_ref.clone(),
            });
        }
        owners.insert((def.package(), name.clone()), &def.type_ref);
        names.insert(def.type_ref.clone(), name);
    }

    Ok(names)
}

/// Collects the rendered fields of `def`, splicing `inline` embeddings.
///
/// `chain` holds the structs currently being flattened.
fn flatten<'m>(
    model: &'m TypeModel,
    def: &'m TypeDef,
    message: &str,
    chain: &mut Vec<TypeRef>,
    out: &mut Vec<Candidate<'m>>,
) -> Result<(), RenderError> {
    let Some(fields) = def.fields() else {
        return Ok(());
    };

    for field in fields {
        if !field.exported || field.overrides.skip {
            continue;
        }
        let source = format!("{}.{}", def.type_ref, field.name);

        if !(field.embedded && field.overrides.inline) {
            out.push(Candidate { field, source });
            continue;
        }

        let target = model
            .underlying(&field.ty)
            .filter(|t| t.is_struct())
            .ok_or_else(|| RenderError::Unrepresentable {
                field: source.clone(),
                reason: "inline target is not a struct".to_string(),
            })?;
        if target.overrides.skip {
            return Err(RenderError::SkippedReference {
                field: source,
                target: target.type_ref.clone(),
            });
        }
        if chain.contains(&target.type_ref) {
            let path = chain
                .iter()
                .chain(std::iter::once(&target.type_ref))
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(RenderError::InlineCycle {
                message: message.to_string(),
                path,
            });
        }

        chain.push(target.type_ref.clone());
        flatten(model, target, message, chain, out)?;
        chain.pop();
    }

    Ok(())
}

/// Resolves field numbers: explicit ones first, then sequential defaults
/// that skip claimed and reserved numbers.
fn assign_numbers(message: &str, candidates: &[Candidate<'_>]) -> Result<Vec<u32>, RenderError> {
    let mut claimed: BTreeMap<u32, &str> = BTreeMap::new();
    for candidate in candidates {
        let Some(number) = candidate.field.overrides.number else {
            continue;
        };
        if RESERVED_NUMBERS.contains(&number) {
            return Err(RenderError::ReservedNumber {
                field: candidate.source.clone(),
                number,
            });
        }
        if let Some(first) = claimed.insert(number, &candidate.source) {
            return Err(RenderError::DuplicateNumber {
                message: message.to_string(),
                number,
                first: first.to_string(),
                second: candidate.source.clone(),
            });
        }
    }

    let taken: BTreeSet<u32> = claimed.keys().copied().collect();
    let mut next = 1u32;
    let mut numbers = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if let Some(number) = candidate.field.overrides.number {
            numbers.push(number);
            continue;
        }
        while taken.contains(&next) || RESERVED_NUMBERS.contains(&next) {
            next += 1;
        }
        if next > MAX_FIELD_NUMBER {
            return Err(RenderError::Unrepresentable {
                field: candidate.source.clone(),
                reason: "no field numbers left".to_string(),
            });
        }
        numbers.push(next);
        next += 1;
    }

    Ok(numbers)
}

/// Emitted name of a field: explicit override, else snake_case of the
/// declared name.
fn field_name(field: &FieldDef) -> String {
    match &field.overrides.name {
        Some(name) => name.clone(),
        None => sanitize_identifier(&to_snake_case(&field.name)),
    }
}

fn missing_alias(field: &str, field_type: &FieldType) -> CodegenError {
    CodegenError::generation(format!(
        "field '{field}' references '{field_type}' whose package has no alias"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::AliasTracker;
    use crate::order::order;
    use protogen_model::{FieldDecl, PackageDecl, PackageSet, TagParser, TypeDecl, TypeExpr};

    fn plan(packages: Vec<PackageDecl>, roots: &[(&str, &str)]) -> Result<RenderPlan, CodegenError> {
        let source = PackageSet::from_packages(packages)?;
        let model = TypeModel::load(&source, roots.iter().map(|(p, n)| TypeRef::new(*p, *n)))?;
        let model = TagParser::default().annotate(model)?;
        let (aliases, _) = AliasTracker::new().assign(model.packages())?;
        RenderPlan::build(&model, &order(&model), &aliases)
    }

    fn single(fields: Vec<FieldDecl>) -> Result<RenderPlan, CodegenError> {
        plan(
            vec![PackageDecl::new("p").with_type(TypeDecl::structure("Msg", fields))],
            &[("p", "Msg")],
        )
    }

    fn numbers(plan: &RenderPlan) -> Vec<(String, u32)> {
        plan.messages()[0]
            .fields
            .iter()
            .map(|f| (f.name.clone(), f.number))
            .collect()
    }

    fn float(name: &str) -> FieldDecl {
        FieldDecl::new(name, TypeExpr::builtin("float64"))
    }

    #[test]
    fn test_sequential_numbers_and_names() {
        let plan = single(vec![float("X"), float("Y"), float("HTTPPort")]).unwrap();
        assert_eq!(
            numbers(&plan),
            vec![
                ("x".to_string(), 1),
                ("y".to_string(), 2),
                ("http_port".to_string(), 3)
            ]
        );
        assert_eq!(plan.messages()[0].fields[0].type_expr, "double");
        assert_eq!(plan.messages()[0].fields[0].source, "p.Msg.X");
    }

    #[test]
    fn test_explicit_number_is_honored_and_skipped_by_defaults() {
        let plan = single(vec![
            float("A"),
            float("B").with_tags(r#"protobuf:"number=2""#),
            float("C"),
            float("D"),
        ])
        .unwrap();
        assert_eq!(
            numbers(&plan),
            vec![
                ("a".to_string(), 1),
                ("b".to_string(), 2),
                ("c".to_string(), 3),
                ("d".to_string(), 4)
            ]
        );

        let plan = single(vec![float("A").with_tags(r#"protobuf:"number=7""#), float("B")]).unwrap();
        assert_eq!(
            numbers(&plan),
            vec![("a".to_string(), 7), ("b".to_string(), 1)]
        );
    }

    #[test]
    fn test_skipped_and_unexported_fields_consume_no_number() {
        let plan = single(vec![
            float("A"),
            float("B").with_tags(r#"protobuf:"skip""#),
            float("hidden"),
            float("C"),
        ])
        .unwrap();
        assert_eq!(
            numbers(&plan),
            vec![("a".to_string(), 1), ("c".to_string(), 2)]
        );
    }

    #[test]
    fn test_duplicate_explicit_numbers() {
        let err = single(vec![
            float("A").with_tags(r#"protobuf:"number=3""#),
            float("B").with_tags(r#"protobuf:"number=3""#),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            CodegenError::Render(RenderError::DuplicateNumber { number: 3, .. })
        ));
    }

    #[test]
    fn test_reserved_number_rejected() {
        let err = single(vec![float("A").with_tags(r#"protobuf:"number=19500""#)]).unwrap_err();
        assert!(matches!(
            err,
            CodegenError::Render(RenderError::ReservedNumber { number: 19500, .. })
        ));
    }

    #[test]
    fn test_duplicate_field_names() {
        let err = single(vec![
            float("Radius"),
            float("Other").with_tags(r#"protobuf:"name=radius""#),
        ])
        .unwrap_err();
        match err {
            CodegenError::Render(RenderError::DuplicateName { name, first, second, .. }) => {
                assert_eq!(name, "radius");
                assert_eq!(first, "p.Msg.Radius");
                assert_eq!(second, "p.Msg.Other");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_message_names() {
        let err = plan(
            vec![
                PackageDecl::new("p")
                    .with_type(TypeDecl::structure("A", vec![]))
                    .with_type(TypeDecl::structure("B", vec![]).with_tags(r#"protobuf:"name=A""#)),
            ],
            &[("p", "A"), ("p", "B")],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CodegenError::Render(RenderError::DuplicateMessage { .. })
        ));
    }

    #[test]
    fn test_skipped_types_not_emitted() {
        let plan = plan(
            vec![
                PackageDecl::new("p")
                    .with_type(TypeDecl::structure("Kept", vec![]))
                    .with_type(TypeDecl::structure("Gone", vec![]).with_tags(r#"protobuf:"-""#)),
            ],
            &[("p", "Kept"), ("p", "Gone")],
        )
        .unwrap();
        assert_eq!(plan.len(), 1);
        assert!(plan.message(&TypeRef::new("p", "Gone")).is_none());
    }

    #[test]
    fn test_embedded_and_inline_fields() {
        let plan = plan(
            vec![
                PackageDecl::new("p")
                    .with_type(TypeDecl::structure(
                        "Msg",
                        vec![
                            FieldDecl::embedded(TypeExpr::named("p", "Meta")),
                            FieldDecl::embedded(TypeExpr::named("p", "Base"))
                                .with_tags(r#"protobuf:"inline""#),
                            float("Z"),
                        ],
                    ))
                    .with_type(TypeDecl::structure("Meta", vec![float("Label")]))
                    .with_type(TypeDecl::structure("Base", vec![float("ID"), float("Rev")])),
            ],
            &[("p", "Msg")],
        )
        .unwrap();

        let msg = plan.message(&TypeRef::new("p", "Msg")).unwrap();
        let fields: Vec<(&str, u32, &str)> = msg
            .fields
            .iter()
            .map(|f| (f.name.as_str(), f.number, f.type_expr.as_str()))
            .collect();
        assert_eq!(
            fields,
            vec![
                ("meta", 1, "Meta"),
                ("id", 2, "double"),
                ("rev", 3, "double"),
                ("z", 4, "double")
            ]
        );
        assert_eq!(msg.field("id").unwrap().source, "p.Base.ID");
    }

    #[test]
    fn test_inline_cycle_detected() {
        let err = plan(
            vec![
                PackageDecl::new("p")
                    .with_type(TypeDecl::structure(
                        "A",
                        vec![FieldDecl::embedded(TypeExpr::named("p", "B"))
                            .with_tags(r#"protobuf:"inline""#)],
                    ))
                    .with_type(TypeDecl::structure(
                        "B",
                        vec![FieldDecl::embedded(TypeExpr::named("p", "A"))
                            .with_tags(r#"protobuf:"inline""#)],
                    )),
            ],
            &[("p", "A")],
        )
        .unwrap_err();
        match err {
            CodegenError::Render(RenderError::InlineCycle { message, path }) => {
                assert_eq!(message, "A");
                assert_eq!(path, "p.A -> p.B -> p.A");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cross_package_and_cyclic_references() {
        let plan = plan(
            vec![
                PackageDecl::new("shapes").with_type(TypeDecl::structure(
                    "Point",
                    vec![float("X"), float("Y")],
                )),
                PackageDecl::new("geo/metrics")
                    .with_type(TypeDecl::structure(
                        "Shape",
                        vec![
                            FieldDecl::new("Center", TypeExpr::named("shapes", "Point")),
                            FieldDecl::new(
                                "Parent",
                                TypeExpr::pointer(TypeExpr::named("geo/metrics", "Group")),
                            ),
                        ],
                    ))
                    .with_type(TypeDecl::structure(
                        "Group",
                        vec![FieldDecl::new(
                            "Members",
                            TypeExpr::slice(TypeExpr::named("geo/metrics", "Shape")),
                        )],
                    )),
            ],
            &[("geo/metrics", "Shape")],
        )
        .unwrap();

        let shape = plan.message(&TypeRef::new("geo/metrics", "Shape")).unwrap();
        assert_eq!(shape.alias.as_deref(), Some("metrics"));
        assert_eq!(shape.field("center").unwrap().type_expr, "shapes.Point");
        assert_eq!(shape.field("parent").unwrap().type_expr, "Group");

        let group = plan.message(&TypeRef::new("geo/metrics", "Group")).unwrap();
        assert_eq!(group.field("members").unwrap().type_expr, "repeated Shape");
    }
}
