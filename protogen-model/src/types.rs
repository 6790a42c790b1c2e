//! Type model definitions.
//!
//! This module contains the resolved, loader-independent representation of
//! every type reachable from the generation roots.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a type: origin package plus local name.
///
/// Builtin primitives and anonymous composites (pointers, sequences, maps)
/// live in the empty package.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TypeRef {
    /// Origin package path.
    pub package: String,
    /// Name within the package.
    pub name: String,
}

impl TypeRef {
    /// Creates a type reference.
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            name: name.into(),
        }
    }

    /// Reference to a builtin or anonymous type.
    pub fn unnamed(name: impl Into<String>) -> Self {
        Self::new("", name)
    }

    /// Returns true if the type lives in the empty package.
    #[must_use]
    pub fn is_unnamed(&self) -> bool {
        self.package.is_empty()
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.package.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}.{}", self.package, self.name)
        }
    }
}

/// Builtin primitive types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// Boolean.
    Bool,
    /// UTF-8 string.
    String,
    /// Platform-sized signed integer.
    Int,
    /// Signed 8-bit integer.
    Int8,
    /// Signed 16-bit integer.
    Int16,
    /// Signed 32-bit integer.
    Int32,
    /// Signed 64-bit integer.
    Int64,
    /// Platform-sized unsigned integer.
    Uint,
    /// Unsigned 8-bit integer.
    Uint8,
    /// Unsigned 16-bit integer.
    Uint16,
    /// Unsigned 32-bit integer.
    Uint32,
    /// Unsigned 64-bit integer.
    Uint64,
    /// Byte (alias of uint8).
    Byte,
    /// Unicode code point (alias of int32).
    Rune,
    /// 32-bit floating point.
    Float32,
    /// 64-bit floating point.
    Float64,
}

impl Primitive {
    /// Parses a primitive from its builtin name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "bool" => Some(Self::Bool),
            "string" => Some(Self::String),
            "int" => Some(Self::Int),
            "int8" => Some(Self::Int8),
            "int16" => Some(Self::Int16),
            "int32" => Some(Self::Int32),
            "int64" => Some(Self::Int64),
            "uint" => Some(Self::Uint),
            "uint8" => Some(Self::Uint8),
            "uint16" => Some(Self::Uint16),
            "uint32" => Some(Self::Uint32),
            "uint64" => Some(Self::Uint64),
            "byte" => Some(Self::Byte),
            "rune" => Some(Self::Rune),
            "float32" => Some(Self::Float32),
            "float64" => Some(Self::Float64),
            _ => None,
        }
    }

    /// Returns the builtin name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::String => "string",
            Self::Int => "int",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Uint => "uint",
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Byte => "byte",
            Self::Rune => "rune",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    /// Returns the Protobuf scalar this primitive maps to.
    #[must_use]
    pub const fn proto_scalar(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::String => "string",
            Self::Int | Self::Int64 => "int64",
            Self::Int8 | Self::Int16 | Self::Int32 | Self::Rune => "int32",
            Self::Uint | Self::Uint64 => "uint64",
            Self::Uint8 | Self::Uint16 | Self::Uint32 | Self::Byte => "uint32",
            Self::Float32 => "float",
            Self::Float64 => "double",
        }
    }

    /// Returns true for single-byte element types (sequences of these are `bytes`).
    #[must_use]
    pub const fn is_byte(&self) -> bool {
        matches!(self, Self::Byte | Self::Uint8)
    }

    /// Returns true if the primitive may key a Protobuf map.
    #[must_use]
    pub const fn is_map_key(&self) -> bool {
        !matches!(self, Self::Float32 | Self::Float64)
    }
}

/// User-declared directives attached to a type or field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Override {
    /// Explicit emitted name.
    pub name: Option<String>,
    /// Explicit field number.
    pub number: Option<u32>,
    /// Exclude from output.
    pub skip: bool,
    /// Splice an embedded struct's fields into the parent.
    pub inline: bool,
}

impl Override {
    /// Returns true if no directive is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// A struct field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    /// Declared field name.
    pub name: String,
    /// Field type.
    pub ty: TypeRef,
    /// Raw annotation text.
    pub tags: Option<String>,
    /// Documentation lines.
    pub doc: Vec<String>,
    /// Whether the field embeds its type.
    pub embedded: bool,
    /// Whether the field is visible in the emitted schema.
    pub exported: bool,
    /// Parsed directives (filled by the tag parser).
    pub overrides: Override,
}

/// Kind of a type definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    /// Struct with fields in declaration order.
    Struct(Vec<FieldDef>),
    /// Builtin primitive.
    Primitive(Primitive),
    /// Named type defined over another type.
    Alias(TypeRef),
    /// Pointer to another type.
    Pointer(TypeRef),
    /// Sequence of another type.
    Sequence(TypeRef),
    /// Map from key type to value type.
    Map(TypeRef, TypeRef),
}

impl TypeKind {
    /// Returns a short label for the kind.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Struct(_) => "struct",
            Self::Primitive(_) => "primitive",
            Self::Alias(_) => "alias",
            Self::Pointer(_) => "pointer",
            Self::Sequence(_) => "sequence",
            Self::Map(_, _) => "map",
        }
    }

    /// Returns the type references this kind points at directly.
    #[must_use]
    pub fn references(&self) -> Vec<&TypeRef> {
        match self {
            Self::Struct(fields) => fields.iter().map(|f| &f.ty).collect(),
            Self::Primitive(_) => Vec::new(),
            Self::Alias(t) | Self::Pointer(t) | Self::Sequence(t) => vec![t],
            Self::Map(k, v) => vec![k, v],
        }
    }
}

/// Full definition of a [`TypeRef`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDef {
    /// Identity.
    pub type_ref: TypeRef,
    /// Definition body.
    pub kind: TypeKind,
    /// Raw annotation text.
    pub tags: Option<String>,
    /// Documentation lines.
    pub doc: Vec<String>,
    /// Declaration position within the package (0 for unnamed types).
    pub decl_index: usize,
    /// Parsed directives (filled by the tag parser).
    pub overrides: Override,
}

impl TypeDef {
    /// Creates a definition for an unnamed type.
    #[must_use]
    pub fn unnamed(type_ref: TypeRef, kind: TypeKind) -> Self {
        Self {
            type_ref,
            kind,
            tags: None,
            doc: Vec::new(),
            decl_index: 0,
            overrides: Override::default(),
        }
    }

    /// Returns the local type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.type_ref.name
    }

    /// Returns the origin package.
    #[must_use]
    pub fn package(&self) -> &str {
        &self.type_ref.package
    }

    /// Returns the fields if this is a struct.
    #[must_use]
    pub fn fields(&self) -> Option<&[FieldDef]> {
        match &self.kind {
            TypeKind::Struct(fields) => Some(fields),
            _ => None,
        }
    }

    /// Returns true if this is a struct.
    #[must_use]
    pub const fn is_struct(&self) -> bool {
        matches!(self.kind, TypeKind::Struct(_))
    }
}
