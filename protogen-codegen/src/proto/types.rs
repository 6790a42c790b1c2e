//! Field type resolution for Protobuf output.

use crate::alias::AliasAssignment;
use crate::error::RenderError;
use protogen_model::{Primitive, TypeKind, TypeModel, TypeRef};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Protobuf shape of a field type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// Scalar value.
    Scalar(Primitive),
    /// Byte string.
    Bytes,
    /// Scalar or bytes with explicit presence.
    Optional(Box<FieldType>),
    /// Reference to a message.
    Message(TypeRef),
    /// Repeated element.
    Repeated(Box<FieldType>),
    /// Map from a scalar key.
    Map(Primitive, Box<FieldType>),
}

impl FieldType {
    /// Returns the referenced message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&TypeRef> {
        match self {
            Self::Message(t) => Some(t),
            Self::Optional(inner) | Self::Repeated(inner) | Self::Map(_, inner) => inner.message(),
            Self::Scalar(_) | Self::Bytes => None,
        }
    }

    /// Renders the type as written in a field line, qualifying message names
    /// relative to `from_package`.
    ///
    /// `names` maps each emitted message to its emitted name. Returns `None`
    /// if a referenced package has no alias.
    #[must_use]
    pub fn render(
        &self,
        from_package: &str,
        aliases: &AliasAssignment,
        names: &BTreeMap<TypeRef, String>,
    ) -> Option<String> {
        Some(match self {
            Self::Scalar(p) => p.proto_scalar().to_string(),
            Self::Bytes => "bytes".to_string(),
            Self::Optional(inner) => {
                format!("optional {}", inner.render(from_package, aliases, names)?)
            }
            Self::Message(t) => {
                let name = names.get(t).map_or(t.name.as_str(), String::as_str);
                aliases.qualify(from_package, &t.package, name)?
            }
            Self::Repeated(inner) => {
                format!("repeated {}", inner.render(from_package, aliases, names)?)
            }
            Self::Map(key, value) => format!(
                "map<{}, {}>",
                key.proto_scalar(),
                value.render(from_package, aliases, names)?
            ),
        })
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(p) => f.write_str(p.proto_scalar()),
            Self::Bytes => f.write_str("bytes"),
            Self::Optional(inner) => write!(f, "optional {inner}"),
            Self::Message(t) => write!(f, "{t}"),
            Self::Repeated(inner) => write!(f, "repeated {inner}"),
            Self::Map(k, v) => write!(f, "map<{}, {v}>", k.proto_scalar()),
        }
    }
}

/// Where a type appears; pointers only carry presence at field level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Field,
    Element,
}

/// Resolves model types into Protobuf field types.
pub struct FieldTypeResolver<'a> {
    model: &'a TypeModel,
}

impl<'a> FieldTypeResolver<'a> {
    /// Creates a new resolver.
    #[must_use]
    pub fn new(model: &'a TypeModel) -> Self {
        Self { model }
    }

    /// Resolves the type of the field `field` (a `pkg.Type.Field` path used
    /// in errors).
    ///
    /// # Errors
    /// Returns `RenderError` if the type references a skipped type, loops
    /// through aliases, or has no Protobuf rendering.
    pub fn resolve(&self, ty: &TypeRef, field: &str) -> Result<FieldType, RenderError> {
        self.resolve_at(ty, field, Position::Field, &mut BTreeSet::new())
    }

    fn resolve_at(
        &self,
        ty: &TypeRef,
        field: &str,
        position: Position,
        aliases_seen: &mut BTreeSet<TypeRef>,
    ) -> Result<FieldType, RenderError> {
        let def = self
            .model
            .def(ty)
            .ok_or_else(|| unrepresentable(field, format!("type '{ty}' is not in the model")))?;

        if def.overrides.skip {
            return Err(RenderError::SkippedReference {
                field: field.to_string(),
                target: ty.clone(),
            });
        }

        match &def.kind {
            TypeKind::Struct(_) => Ok(FieldType::Message(ty.clone())),
            TypeKind::Primitive(p) => Ok(FieldType::Scalar(*p)),
            TypeKind::Alias(target) => {
                // Only the current alias chain is tracked; sibling branches
                // (map key and value) may pass through the same alias.
                if !aliases_seen.insert(ty.clone()) {
                    return Err(RenderError::AliasCycle {
                        type_ref: ty.clone(),
                    });
                }
                let resolved = self.resolve_at(target, field, position, aliases_seen);
                aliases_seen.remove(ty);
                resolved
            }
            TypeKind::Pointer(target) => {
                let inner = self.resolve_at(target, field, position, aliases_seen)?;
                Ok(match (position, inner) {
                    (Position::Field, inner @ (FieldType::Scalar(_) | FieldType::Bytes)) => {
                        FieldType::Optional(Box::new(inner))
                    }
                    (_, other) => other,
                })
            }
            TypeKind::Sequence(elem) => {
                match self.resolve_at(elem, field, Position::Element, aliases_seen)? {
                    FieldType::Scalar(p) if p.is_byte() => Ok(FieldType::Bytes),
                    FieldType::Repeated(_) => {
                        Err(unrepresentable(field, "sequences of sequences are not supported"))
                    }
                    FieldType::Map(..) => {
                        Err(unrepresentable(field, "sequences of maps are not supported"))
                    }
                    FieldType::Optional(inner) => Ok(FieldType::Repeated(inner)),
                    elem => Ok(FieldType::Repeated(Box::new(elem))),
                }
            }
            TypeKind::Map(key, value) => {
                let key_prim = match self.resolve_at(key, field, Position::Element, aliases_seen)? {
                    FieldType::Scalar(p) if p.is_map_key() => p,
                    other => {
                        return Err(unrepresentable(
                            field,
                            format!("map key type '{other}' is not an integral, bool or string scalar"),
                        ));
                    }
                };
                match self.resolve_at(value, field, Position::Element, aliases_seen)? {
                    FieldType::Repeated(_) => {
                        Err(unrepresentable(field, "map values cannot be sequences"))
                    }
                    FieldType::Map(..) => Err(unrepresentable(field, "map values cannot be maps")),
                    FieldType::Optional(inner) => Ok(FieldType::Map(key_prim, inner)),
                    value => Ok(FieldType::Map(key_prim, Box::new(value))),
                }
            }
        }
    }
}

fn unrepresentable(field: &str, reason: impl Into<String>) -> RenderError {
    RenderError::Unrepresentable {
        field: field.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::AliasTracker;
    use protogen_model::{FieldDecl, PackageDecl, PackageSet, TagParser, TypeDecl, TypeExpr};

    fn model_with(fields: Vec<FieldDecl>, extra: Vec<TypeDecl>) -> TypeModel {
        let mut pkg = PackageDecl::new("p").with_type(TypeDecl::structure("Host", fields));
        for decl in extra {
            pkg = pkg.with_type(decl);
        }
        let source = PackageSet::from_packages(vec![pkg]).expect("valid source");
        let model = TypeModel::load(&source, [TypeRef::new("p", "Host")]).expect("model loads");
        TagParser::default().annotate(model).expect("annotates")
    }

    fn resolve(model: &TypeModel, field: &str) -> Result<FieldType, RenderError> {
        let host = model.def(&TypeRef::new("p", "Host")).expect("host");
        let f = host
            .fields()
            .and_then(|fs| fs.iter().find(|f| f.name == field))
            .expect("field");
        FieldTypeResolver::new(model).resolve(&f.ty, &format!("p.Host.{field}"))
    }

    #[test]
    fn test_resolve_scalars_and_presence() {
        let model = model_with(
            vec![
                FieldDecl::new("Count", TypeExpr::builtin("int")),
                FieldDecl::new("Maybe", TypeExpr::pointer(TypeExpr::builtin("string"))),
                FieldDecl::new("Raw", TypeExpr::slice(TypeExpr::builtin("byte"))),
                FieldDecl::new("Ids", TypeExpr::slice(TypeExpr::pointer(TypeExpr::builtin("uint16")))),
            ],
            vec![],
        );

        assert_eq!(resolve(&model, "Count").unwrap().to_string(), "int64");
        assert_eq!(resolve(&model, "Maybe").unwrap().to_string(), "optional string");
        assert_eq!(resolve(&model, "Raw").unwrap(), FieldType::Bytes);
        assert_eq!(resolve(&model, "Ids").unwrap().to_string(), "repeated uint32");
    }

    #[test]
    fn test_resolve_through_aliases() {
        let model = model_with(
            vec![
                FieldDecl::new("Tags", TypeExpr::named("p", "Labels")),
                FieldDecl::new("Level", TypeExpr::named("p", "Severity")),
            ],
            vec![
                TypeDecl::alias(
                    "Labels",
                    TypeExpr::map(TypeExpr::builtin("string"), TypeExpr::builtin("string")),
                ),
                TypeDecl::alias("Severity", TypeExpr::builtin("int8")),
            ],
        );

        assert_eq!(resolve(&model, "Tags").unwrap().to_string(), "map<string, string>");
        assert_eq!(resolve(&model, "Level").unwrap().to_string(), "int32");
    }

    #[test]
    fn test_resolve_same_alias_twice() {
        let model = model_with(
            vec![
                FieldDecl::new(
                    "Renames",
                    TypeExpr::map(TypeExpr::named("p", "ID"), TypeExpr::named("p", "ID")),
                ),
                FieldDecl::new(
                    "Owners",
                    TypeExpr::map(
                        TypeExpr::named("p", "ID"),
                        TypeExpr::pointer(TypeExpr::named("p", "Ref")),
                    ),
                ),
            ],
            vec![
                TypeDecl::alias("ID", TypeExpr::builtin("string")),
                TypeDecl::alias("Ref", TypeExpr::named("p", "ID")),
            ],
        );

        assert_eq!(resolve(&model, "Renames").unwrap().to_string(), "map<string, string>");
        assert_eq!(resolve(&model, "Owners").unwrap().to_string(), "map<string, string>");
    }

    #[test]
    fn test_resolve_alias_cycle() {
        let model = model_with(
            vec![
                FieldDecl::new("Spin", TypeExpr::named("p", "Loop")),
                FieldDecl::new("Ping", TypeExpr::slice(TypeExpr::named("p", "Ping"))),
            ],
            vec![
                TypeDecl::alias("Loop", TypeExpr::named("p", "Loop")),
                TypeDecl::alias("Ping", TypeExpr::named("p", "Pong")),
                TypeDecl::alias("Pong", TypeExpr::named("p", "Ping")),
            ],
        );

        assert_eq!(
            resolve(&model, "Spin"),
            Err(RenderError::AliasCycle {
                type_ref: TypeRef::new("p", "Loop"),
            })
        );
        assert_eq!(
            resolve(&model, "Ping"),
            Err(RenderError::AliasCycle {
                type_ref: TypeRef::new("p", "Ping"),
            })
        );
    }

    #[test]
    fn test_resolve_messages() {
        let model = model_with(
            vec![
                FieldDecl::new("Next", TypeExpr::pointer(TypeExpr::named("p", "Host"))),
                FieldDecl::new(
                    "ByName",
                    TypeExpr::map(TypeExpr::builtin("string"), TypeExpr::named("p", "Item")),
                ),
            ],
            vec![TypeDecl::structure("Item", vec![])],
        );

        let next = resolve(&model, "Next").unwrap();
        assert_eq!(next, FieldType::Message(TypeRef::new("p", "Host")));
        let by_name = resolve(&model, "ByName").unwrap();
        assert_eq!(by_name.message(), Some(&TypeRef::new("p", "Item")));
    }

    #[test]
    fn test_resolve_unrepresentable() {
        let model = model_with(
            vec![
                FieldDecl::new(
                    "Grid",
                    TypeExpr::slice(TypeExpr::slice(TypeExpr::builtin("int32"))),
                ),
                FieldDecl::new(
                    "Weights",
                    TypeExpr::map(TypeExpr::builtin("float64"), TypeExpr::builtin("string")),
                ),
                FieldDecl::new(
                    "Multi",
                    TypeExpr::map(
                        TypeExpr::builtin("string"),
                        TypeExpr::slice(TypeExpr::builtin("string")),
                    ),
                ),
            ],
            vec![],
        );

        for field in ["Grid", "Weights", "Multi"] {
            assert!(matches!(
                resolve(&model, field),
                Err(RenderError::Unrepresentable { .. })
            ));
        }
    }

    #[test]
    fn test_resolve_skipped_reference() {
        let model = model_with(
            vec![FieldDecl::new("Secret", TypeExpr::named("p", "Hidden"))],
            vec![TypeDecl::structure("Hidden", vec![]).with_tags(r#"protobuf:"skip""#)],
        );

        assert_eq!(
            resolve(&model, "Secret"),
            Err(RenderError::SkippedReference {
                field: "p.Host.Secret".to_string(),
                target: TypeRef::new("p", "Hidden"),
            })
        );
    }

    #[test]
    fn test_render_qualifies_foreign_messages() {
        let (aliases, _) = AliasTracker::new()
            .assign(["shapes", "geo/metrics"])
            .expect("aliases");
        let names = BTreeMap::new();
        let point = FieldType::Repeated(Box::new(FieldType::Message(TypeRef::new(
            "shapes", "Point",
        ))));

        assert_eq!(
            point.render("geo/metrics", &aliases, &names).as_deref(),
            Some("repeated shapes.Point")
        );
        assert_eq!(
            point.render("shapes", &aliases, &names).as_deref(),
            Some("repeated Point")
        );
        let unknown = FieldType::Message(TypeRef::new("other", "Thing"));
        assert_eq!(unknown.render("shapes", &aliases, &names), None);
    }
}
