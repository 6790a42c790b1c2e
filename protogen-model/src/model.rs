//! The type model: one shared definition per distinct [`TypeRef`].
//!
//! Loading walks the reference graph from the generation roots with an
//! explicit work-list, so cyclic and diamond-shaped graphs are discovered
//! exactly once per type.

use crate::decl::{DeclKind, DeclSource, TypeExpr};
use crate::error::{ModelError, Result};
use crate::types::{FieldDef, Override, Primitive, TypeDef, TypeKind, TypeRef};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;

/// Symbol table of every type reachable from the generation roots.
#[derive(Debug, Clone, Default)]
pub struct TypeModel {
    types: BTreeMap<TypeRef, Arc<TypeDef>>,
    roots: Vec<TypeRef>,
}

impl TypeModel {
    /// Loads every type reachable from `roots`.
    ///
    /// # Arguments
    /// * `source` - Supplier of package declarations
    /// * `roots` - Generation roots
    ///
    /// # Errors
    /// Returns `ModelError::UnresolvedType` if any reachable reference is not
    /// defined by the source. Nothing is returned on failure.
    pub fn load<S, I>(source: &S, roots: I) -> Result<Self>
    where
        S: DeclSource + ?Sized,
        I: IntoIterator<Item = TypeRef>,
    {
        let roots: BTreeSet<TypeRef> = roots.into_iter().collect();
        let mut loader = Loader {
            source,
            types: BTreeMap::new(),
            queued: BTreeSet::new(),
            pending: VecDeque::new(),
        };

        for root in &roots {
            let expr = TypeExpr::named(root.package.clone(), root.name.clone());
            loader.intern(&expr, "generation roots")?;
        }
        loader.drain()?;

        tracing::debug!(
            roots = roots.len(),
            types = loader.types.len(),
            "type model loaded"
        );

        Ok(Self {
            types: loader.types,
            roots: roots.into_iter().collect(),
        })
    }

    /// Builds a model from already constructed definitions.
    ///
    /// # Errors
    /// Returns `ModelError::UnresolvedType` if a definition references a type
    /// missing from `defs`, or a root is missing.
    pub fn from_defs(
        defs: impl IntoIterator<Item = TypeDef>,
        roots: impl IntoIterator<Item = TypeRef>,
    ) -> Result<Self> {
        let types: BTreeMap<TypeRef, Arc<TypeDef>> = defs
            .into_iter()
            .map(|def| (def.type_ref.clone(), Arc::new(def)))
            .collect();
        let roots: BTreeSet<TypeRef> = roots.into_iter().collect();
        let model = Self {
            types,
            roots: roots.into_iter().collect(),
        };
        model.check_closed()?;
        Ok(model)
    }

    /// Verifies every reference and root has a definition.
    ///
    /// # Errors
    /// Returns `ModelError::UnresolvedType` naming the first dangling reference.
    pub fn check_closed(&self) -> Result<()> {
        for root in &self.roots {
            if !self.types.contains_key(root) {
                return Err(ModelError::unresolved(root.clone(), "generation roots"));
            }
        }
        for def in self.types.values() {
            if let TypeKind::Struct(fields) = &def.kind {
                for field in fields {
                    if !self.types.contains_key(&field.ty) {
                        return Err(ModelError::unresolved(
                            field.ty.clone(),
                            format!("{}.{}", def.type_ref, field.name),
                        ));
                    }
                }
            } else {
                for target in def.kind.references() {
                    if !self.types.contains_key(target) {
                        return Err(ModelError::unresolved(
                            target.clone(),
                            def.type_ref.to_string(),
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Returns the shared definition of a type.
    #[must_use]
    pub fn get(&self, type_ref: &TypeRef) -> Option<Arc<TypeDef>> {
        self.types.get(type_ref).cloned()
    }

    /// Returns the definition of a type by reference.
    #[must_use]
    pub fn def(&self, type_ref: &TypeRef) -> Option<&TypeDef> {
        self.types.get(type_ref).map(AsRef::as_ref)
    }

    /// Returns the definition of a type or an unresolved error.
    ///
    /// # Errors
    /// Returns `ModelError::UnresolvedType` if the type is not in the model.
    pub fn resolve(&self, type_ref: &TypeRef, referenced_from: &str) -> Result<&TypeDef> {
        self.def(type_ref)
            .ok_or_else(|| ModelError::unresolved(type_ref.clone(), referenced_from))
    }

    /// Returns true if the model defines `type_ref`.
    #[must_use]
    pub fn contains(&self, type_ref: &TypeRef) -> bool {
        self.types.contains_key(type_ref)
    }

    /// Generation roots in sorted order.
    #[must_use]
    pub fn roots(&self) -> &[TypeRef] {
        &self.roots
    }

    /// Iterates over all definitions in `TypeRef` order.
    pub fn iter(&self) -> impl Iterator<Item = &TypeDef> {
        self.types.values().map(AsRef::as_ref)
    }

    /// Iterates over struct definitions in `TypeRef` order.
    pub fn structs(&self) -> impl Iterator<Item = &TypeDef> {
        self.iter().filter(|def| def.is_struct())
    }

    /// Returns the distinct non-empty package paths defined in the model.
    #[must_use]
    pub fn packages(&self) -> BTreeSet<String> {
        self.types
            .keys()
            .filter(|r| !r.is_unnamed())
            .map(|r| r.package.clone())
            .collect()
    }

    /// Number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns true if the model is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Follows alias and pointer links until a struct, primitive, sequence or
    /// map is reached. Returns `None` on a dangling link or an alias cycle.
    #[must_use]
    pub fn underlying(&self, type_ref: &TypeRef) -> Option<&TypeDef> {
        let mut current = self.def(type_ref)?;
        let mut seen = BTreeSet::new();
        loop {
            match &current.kind {
                TypeKind::Alias(next) | TypeKind::Pointer(next) => {
                    if !seen.insert(current.type_ref.clone()) {
                        return None;
                    }
                    current = self.def(next)?;
                }
                _ => return Some(current),
            }
        }
    }

    /// Replaces every definition through `f`, keeping roots.
    ///
    /// Used by the annotation phase; definitions are rebuilt rather than
    /// mutated behind shared pointers.
    ///
    /// # Errors
    /// Propagates the first error returned by `f`.
    pub fn try_map<F>(self, mut f: F) -> Result<Self>
    where
        F: FnMut(TypeDef) -> Result<TypeDef>,
    {
        let mut types = BTreeMap::new();
        for (type_ref, def) in self.types {
            let def = f(Arc::unwrap_or_clone(def))?;
            types.insert(type_ref, Arc::new(def));
        }
        Ok(Self {
            types,
            roots: self.roots,
        })
    }
}

/// Work-list state for [`TypeModel::load`].
struct Loader<'a, S: ?Sized> {
    source: &'a S,
    types: BTreeMap<TypeRef, Arc<TypeDef>>,
    queued: BTreeSet<TypeRef>,
    pending: VecDeque<(TypeRef, String)>,
}

impl<S: DeclSource + ?Sized> Loader<'_, S> {
    /// Returns the reference for `expr`, defining unnamed types immediately and
    /// queueing named ones for discovery.
    fn intern(&mut self, expr: &TypeExpr, from: &str) -> Result<TypeRef> {
        match expr {
            TypeExpr::Named { package, name } if package.is_empty() => {
                let type_ref = TypeRef::unnamed(name.clone());
                if !self.types.contains_key(&type_ref) {
                    let prim = Primitive::from_name(name)
                        .ok_or_else(|| ModelError::unresolved(type_ref.clone(), from))?;
                    self.define(TypeDef::unnamed(type_ref.clone(), TypeKind::Primitive(prim)));
                }
                Ok(type_ref)
            }
            TypeExpr::Named { package, name } => {
                let type_ref = TypeRef::new(package.clone(), name.clone());
                if !self.types.contains_key(&type_ref) && self.queued.insert(type_ref.clone()) {
                    self.pending.push_back((type_ref.clone(), from.to_string()));
                }
                Ok(type_ref)
            }
            TypeExpr::Pointer { elem } => {
                let inner = self.intern(elem, from)?;
                let type_ref = TypeRef::unnamed(format!("*{inner}"));
                Ok(self.define_unnamed(type_ref, || TypeKind::Pointer(inner)))
            }
            TypeExpr::Slice { elem } => {
                let inner = self.intern(elem, from)?;
                let type_ref = TypeRef::unnamed(format!("[]{inner}"));
                Ok(self.define_unnamed(type_ref, || TypeKind::Sequence(inner)))
            }
            TypeExpr::Map { key, value } => {
                let key = self.intern(key, from)?;
                let value = self.intern(value, from)?;
                let type_ref = TypeRef::unnamed(format!("map[{key}]{value}"));
                Ok(self.define_unnamed(type_ref, || TypeKind::Map(key, value)))
            }
        }
    }

    fn define_unnamed(&mut self, type_ref: TypeRef, kind: impl FnOnce() -> TypeKind) -> TypeRef {
        if !self.types.contains_key(&type_ref) {
            self.define(TypeDef::unnamed(type_ref.clone(), kind()));
        }
        type_ref
    }

    fn define(&mut self, def: TypeDef) {
        // First definition wins; later discoveries of the same ref are no-ops.
        self.types
            .entry(def.type_ref.clone())
            .or_insert_with(|| Arc::new(def));
    }

    /// Loads queued named types until the work-list is empty.
    fn drain(&mut self) -> Result<()> {
        while let Some((type_ref, from)) = self.pending.pop_front() {
            if self.types.contains_key(&type_ref) {
                continue;
            }

            let found = self
                .source
                .lookup(&type_ref.package, &type_ref.name)
                .ok_or_else(|| ModelError::unresolved(type_ref.clone(), from))?;
            let decl = found.decl;

            let kind = match &decl.kind {
                DeclKind::Struct { fields } => {
                    let mut defs = Vec::with_capacity(fields.len());
                    for field in fields {
                        let origin = format!("{type_ref}.{}", field.name);
                        let ty = self.intern(&field.ty, &origin)?;
                        defs.push(FieldDef {
                            name: field.name.clone(),
                            ty,
                            tags: field.tags.clone(),
                            doc: field.doc.clone(),
                            embedded: field.embedded,
                            exported: field.is_exported(),
                            overrides: Override::default(),
                        });
                    }
                    TypeKind::Struct(defs)
                }
                DeclKind::Alias { target } => {
                    let origin = type_ref.to_string();
                    TypeKind::Alias(self.intern(target, &origin)?)
                }
            };

            tracing::trace!(type_ref = %type_ref, kind = kind.label(), "discovered type");

            self.define(TypeDef {
                type_ref,
                kind,
                tags: decl.tags.clone(),
                doc: decl.doc.clone(),
                decl_index: found.index,
                overrides: Override::default(),
            });
        }
        Ok(())
    }
}
