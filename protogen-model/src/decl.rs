//! Input declarations handed over by the package loader.
//!
//! The loader that reads source packages lives outside this crate; it hands
//! over already-parsed declarations in the shape defined here. Every type in
//! this module is serde-friendly so a declaration set can also be supplied as
//! a JSON manifest.

use crate::error::{ModelError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A type expression as written on a field or alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeExpr {
    /// A named type. An empty package refers to a builtin primitive.
    Named {
        /// Origin package path.
        #[serde(default)]
        package: String,
        /// Type name within the package.
        name: String,
    },
    /// Pointer to another type.
    Pointer {
        /// Pointee.
        elem: Box<TypeExpr>,
    },
    /// Ordered sequence of another type.
    Slice {
        /// Element type.
        elem: Box<TypeExpr>,
    },
    /// Map from key type to value type.
    Map {
        /// Key type.
        key: Box<TypeExpr>,
        /// Value type.
        value: Box<TypeExpr>,
    },
}

impl TypeExpr {
    /// Named type in a package.
    pub fn named(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Named {
            package: package.into(),
            name: name.into(),
        }
    }

    /// Builtin primitive (`string`, `int64`, ...).
    pub fn builtin(name: impl Into<String>) -> Self {
        Self::named("", name)
    }

    /// Pointer to `elem`.
    #[must_use]
    pub fn pointer(elem: Self) -> Self {
        Self::Pointer {
            elem: Box::new(elem),
        }
    }

    /// Sequence of `elem`.
    #[must_use]
    pub fn slice(elem: Self) -> Self {
        Self::Slice {
            elem: Box::new(elem),
        }
    }

    /// Map from `key` to `value`.
    #[must_use]
    pub fn map(key: Self, value: Self) -> Self {
        Self::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }
}

/// A field of a struct declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDecl {
    /// Declared field name.
    pub name: String,
    /// Field type.
    #[serde(rename = "type")]
    pub ty: TypeExpr,
    /// Raw annotation text (struct-tag syntax).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    /// Documentation lines.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub doc: Vec<String>,
    /// Whether the field is an embedding of its type.
    #[serde(default)]
    pub embedded: bool,
    /// Explicit visibility; derived from the name when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported: Option<bool>,
}

impl FieldDecl {
    /// Creates a plain field declaration.
    pub fn new(name: impl Into<String>, ty: TypeExpr) -> Self {
        Self {
            name: name.into(),
            ty,
            tags: None,
            doc: Vec::new(),
            embedded: false,
            exported: None,
        }
    }

    /// Creates an embedded field named after its type.
    pub fn embedded(ty: TypeExpr) -> Self {
        let name = match &ty {
            TypeExpr::Named { name, .. } => name.clone(),
            TypeExpr::Pointer { elem } => match elem.as_ref() {
                TypeExpr::Named { name, .. } => name.clone(),
                _ => String::new(),
            },
            _ => String::new(),
        };
        Self {
            embedded: true,
            ..Self::new(name, ty)
        }
    }

    /// Attaches annotation text.
    #[must_use]
    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = Some(tags.into());
        self
    }

    /// Attaches a documentation line.
    #[must_use]
    pub fn with_doc(mut self, line: impl Into<String>) -> Self {
        self.doc.push(line.into());
        self
    }

    /// Overrides the derived visibility.
    #[must_use]
    pub fn with_exported(mut self, exported: bool) -> Self {
        self.exported = Some(exported);
        self
    }

    /// Returns true if the field takes part in the emitted schema.
    ///
    /// Without an explicit flag a field is exported when its name starts with
    /// an uppercase letter.
    #[must_use]
    pub fn is_exported(&self) -> bool {
        self.exported
            .unwrap_or_else(|| self.name.chars().next().is_some_and(char::is_uppercase))
    }
}

/// Body of a type declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeclKind {
    /// Struct with ordered fields.
    Struct {
        /// Fields in declaration order.
        #[serde(default)]
        fields: Vec<FieldDecl>,
    },
    /// Named type defined in terms of another type.
    Alias {
        /// Underlying type.
        target: TypeExpr,
    },
}

/// A type declaration within a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDecl {
    /// Type name.
    pub name: String,
    /// Declaration body.
    #[serde(flatten)]
    pub kind: DeclKind,
    /// Raw annotation text attached to the type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    /// Documentation lines.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub doc: Vec<String>,
}

impl TypeDecl {
    /// Creates a struct declaration.
    pub fn structure(name: impl Into<String>, fields: Vec<FieldDecl>) -> Self {
        Self {
            name: name.into(),
            kind: DeclKind::Struct { fields },
            tags: None,
            doc: Vec::new(),
        }
    }

    /// Creates an alias declaration.
    pub fn alias(name: impl Into<String>, target: TypeExpr) -> Self {
        Self {
            name: name.into(),
            kind: DeclKind::Alias { target },
            tags: None,
            doc: Vec::new(),
        }
    }

    /// Attaches annotation text.
    #[must_use]
    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = Some(tags.into());
        self
    }

    /// Attaches a documentation line.
    #[must_use]
    pub fn with_doc(mut self, line: impl Into<String>) -> Self {
        self.doc.push(line.into());
        self
    }
}

/// All declarations of one package, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDecl {
    /// Package path (opaque, may contain separators).
    pub path: String,
    /// Type declarations in declaration order.
    #[serde(default)]
    pub types: Vec<TypeDecl>,
}

impl PackageDecl {
    /// Creates an empty package.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            types: Vec::new(),
        }
    }

    /// Appends a type declaration.
    #[must_use]
    pub fn with_type(mut self, decl: TypeDecl) -> Self {
        self.types.push(decl);
        self
    }
}

/// A declaration found by a [`DeclSource`].
#[derive(Debug, Clone, Copy)]
pub struct DeclRef<'a> {
    /// The declaration.
    pub decl: &'a TypeDecl,
    /// Position within its package.
    pub index: usize,
}

/// Supplier of type declarations.
///
/// The type model pulls declarations lazily through this trait while it walks
/// the reference graph from the generation roots.
pub trait DeclSource {
    /// Looks up a declaration by package path and type name.
    fn lookup(&self, package: &str, name: &str) -> Option<DeclRef<'_>>;
}

/// In-memory set of package declarations.
#[derive(Debug, Clone, Default)]
pub struct PackageSet {
    packages: Vec<PackageDecl>,
    /// (package, type) -> (package index, type index).
    index: HashMap<(String, String), (usize, usize)>,
}

impl PackageSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from package declarations.
    ///
    /// # Errors
    /// Returns `ModelError::DuplicateDefinition` if a package or a type within
    /// a package is declared twice.
    pub fn from_packages(packages: impl IntoIterator<Item = PackageDecl>) -> Result<Self> {
        let mut set = Self::new();
        for package in packages {
            set.add_package(package)?;
        }
        Ok(set)
    }

    /// Decodes a JSON array of package declarations.
    ///
    /// # Errors
    /// Returns `ModelError::Manifest` for malformed JSON and
    /// `ModelError::DuplicateDefinition` for repeated declarations.
    pub fn from_json(json: &str) -> Result<Self> {
        let packages: Vec<PackageDecl> = serde_json::from_str(json)?;
        Self::from_packages(packages)
    }

    /// Adds a package.
    ///
    /// # Errors
    /// Returns `ModelError::DuplicateDefinition` on a repeated package or type.
    pub fn add_package(&mut self, package: PackageDecl) -> Result<()> {
        if self.packages.iter().any(|p| p.path == package.path) {
            return Err(ModelError::duplicate("package", package.path));
        }

        // Index entries are committed only once the whole package is valid.
        let mut names = HashSet::with_capacity(package.types.len());
        for decl in &package.types {
            if !names.insert(decl.name.as_str()) {
                return Err(ModelError::duplicate(
                    "type",
                    format!("{}.{}", package.path, decl.name),
                ));
            }
        }

        let pkg_idx = self.packages.len();
        for (type_idx, decl) in package.types.iter().enumerate() {
            self.index
                .insert((package.path.clone(), decl.name.clone()), (pkg_idx, type_idx));
        }
        self.packages.push(package);
        Ok(())
    }

    /// Returns the packages in insertion order.
    #[must_use]
    pub fn packages(&self) -> &[PackageDecl] {
        &self.packages
    }
}

impl DeclSource for PackageSet {
    fn lookup(&self, package: &str, name: &str) -> Option<DeclRef<'_>> {
        let &(pkg_idx, type_idx) = self.index.get(&(package.to_string(), name.to_string()))?;
        let decl = self.packages.get(pkg_idx)?.types.get(type_idx)?;
        Some(DeclRef {
            decl,
            index: type_idx,
        })
    }
}
