//! # protogen bench
//!
//! Synthetic inputs for protogen benchmarks.

use protogen_model::{FieldDecl, PackageDecl, PackageSet, TypeDecl, TypeExpr, TypeRef};

/// Package paths that share trailing segments, so alias derivation has to
/// grow suffixes.
#[must_use]
pub fn package_paths(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("example.com/org{}/svc{}/api/v{}", i % 7, i % 13, i % 3))
        .collect()
}

/// A source of `packages` packages with `types` structs each.
///
/// Struct `T{n}` in package `i` holds scalars, a repeated reference to the
/// previous struct in the same package and a pointer into the previous
/// package, so the graph has cross-package edges and no isolated nodes.
///
/// # Panics
/// Panics if the generated declarations collide, which they never do.
#[must_use]
pub fn synthetic_source(packages: usize, types: usize) -> (PackageSet, Vec<TypeRef>) {
    let paths = package_paths(packages);
    let mut decls = Vec::with_capacity(packages);
    let mut roots = Vec::new();

    for (i, path) in paths.iter().enumerate() {
        let mut pkg = PackageDecl::new(path.clone());
        for n in 0..types {
            let mut fields = vec![
                FieldDecl::new("ID", TypeExpr::builtin("uint64")),
                FieldDecl::new("Name", TypeExpr::builtin("string")),
                FieldDecl::new("Score", TypeExpr::pointer(TypeExpr::builtin("float64")))
                    .with_tags(r#"protobuf:"number=20""#),
            ];
            if n > 0 {
                fields.push(FieldDecl::new(
                    "Children",
                    TypeExpr::slice(TypeExpr::named(path.clone(), format!("T{}", n - 1))),
                ));
            }
            if i > 0 {
                fields.push(FieldDecl::new(
                    "Upstream",
                    TypeExpr::pointer(TypeExpr::named(paths[i - 1].clone(), format!("T{n}"))),
                ));
            }
            pkg = pkg.with_type(TypeDecl::structure(format!("T{n}"), fields));
        }
        roots.push(TypeRef::new(path.clone(), format!("T{}", types.saturating_sub(1))));
        decls.push(pkg);
    }

    let source = PackageSet::from_packages(decls).expect("synthetic declarations are unique");
    (source, roots)
}
