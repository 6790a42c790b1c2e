//! End-to-end generation tests.

use protogen::prelude::*;

fn float(name: &str) -> FieldDecl {
    FieldDecl::new(name, TypeExpr::builtin("float64"))
}

fn shapes_packages() -> Vec<PackageDecl> {
    vec![
        PackageDecl::new("shapes")
            .with_type(TypeDecl::structure("Circle", vec![float("Radius")]))
            .with_type(TypeDecl::structure("Point", vec![float("X"), float("Y")])),
        PackageDecl::new("geo/metrics").with_type(TypeDecl::structure(
            "Shape",
            vec![FieldDecl::new("Center", TypeExpr::named("shapes", "Point"))],
        )),
    ]
}

fn shapes_roots() -> Vec<TypeRef> {
    vec![
        TypeRef::new("shapes", "Circle"),
        TypeRef::new("geo/metrics", "Shape"),
    ]
}

fn generate(packages: Vec<PackageDecl>, roots: Vec<TypeRef>) -> Result<Generated, CodegenError> {
    let source = PackageSet::from_packages(packages)?;
    Generator::default().generate(&source, roots)
}

#[test]
fn test_shapes_scenario() {
    let generated = generate(shapes_packages(), shapes_roots()).unwrap();

    assert_eq!(generated.aliases.alias("shapes"), Some("shapes"));
    assert_eq!(generated.aliases.alias("geo/metrics"), Some("metrics"));

    let expected = "\
// Code generated by protogen. DO NOT EDIT.

syntax = \"proto3\";

// package shapes (alias shapes)

message Circle {
  double radius = 1;
}

message Point {
  double x = 1;
  double y = 2;
}

// package geo/metrics (alias metrics)

message Shape {
  shapes.Point center = 1;
}
";
    assert_eq!(generated.text, expected);
}

#[test]
fn test_output_is_deterministic() {
    let first = generate(shapes_packages(), shapes_roots()).unwrap();
    let second = generate(shapes_packages(), shapes_roots()).unwrap();
    assert_eq!(first.text, second.text);

    // Neither package nor root order affects the output.
    let mut packages = shapes_packages();
    packages.reverse();
    let mut roots = shapes_roots();
    roots.reverse();
    let permuted = generate(packages, roots).unwrap();
    assert_eq!(first.text, permuted.text);
    assert_eq!(first.aliases, permuted.aliases);
}

#[test]
fn test_override_precedence() {
    let generated = generate(
        vec![PackageDecl::new("p").with_type(TypeDecl::structure(
            "Msg",
            vec![
                float("A"),
                float("B"),
                float("C").with_tags(r#"protobuf:"number=7,name=gamma""#),
                float("D"),
                float("E"),
                float("F"),
                float("G"),
                float("H"),
            ],
        ))],
        vec![TypeRef::new("p", "Msg")],
    )
    .unwrap();

    let text = &generated.text;
    assert!(text.contains("  double gamma = 7;\n"));
    assert!(text.contains("  double a = 1;\n"));
    assert!(text.contains("  double f = 5;\n"));
    assert!(text.contains("  double g = 6;\n"));
    // 7 is claimed, so the next default moves past it.
    assert!(text.contains("  double h = 8;\n"));
}

#[test]
fn test_duplicate_explicit_numbers_fail() {
    let err = generate(
        vec![PackageDecl::new("p").with_type(TypeDecl::structure(
            "Msg",
            vec![
                float("A").with_tags(r#"protobuf:"number=7""#),
                float("B").with_tags(r#"protobuf:"number=7""#),
            ],
        ))],
        vec![TypeRef::new("p", "Msg")],
    )
    .unwrap_err();

    assert_eq!(
        err.to_string(),
        "render error: message 'Msg': fields 'p.Msg.A' and 'p.Msg.B' both use number 7"
    );
}

#[test]
fn test_skip_exclusion() {
    let generated = generate(
        vec![PackageDecl::new("p").with_type(TypeDecl::structure(
            "Msg",
            vec![
                float("First"),
                float("Secret").with_tags(r#"protobuf:"skip""#),
                float("Legacy").with_tags(r#"protobuf:"-""#),
                float("Second"),
            ],
        ))],
        vec![TypeRef::new("p", "Msg")],
    )
    .unwrap();

    assert!(!generated.text.contains("secret"));
    assert!(!generated.text.contains("legacy"));
    assert!(generated.text.contains("  double first = 1;\n"));
    assert!(generated.text.contains("  double second = 2;\n"));
}

#[test]
fn test_cycle_survival_across_packages() {
    let generated = generate(
        vec![
            PackageDecl::new("org/team").with_type(TypeDecl::structure(
                "Team",
                vec![FieldDecl::new(
                    "Lead",
                    TypeExpr::pointer(TypeExpr::named("org/people", "Person")),
                )],
            )),
            PackageDecl::new("org/people").with_type(TypeDecl::structure(
                "Person",
                vec![FieldDecl::new("Team", TypeExpr::named("org/team", "Team"))],
            )),
        ],
        vec![TypeRef::new("org/team", "Team")],
    )
    .unwrap();

    let text = &generated.text;
    assert!(text.contains("message Person {\n  team.Team team = 1;\n}\n"));
    assert!(text.contains("message Team {\n  people.Person lead = 1;\n}\n"));
    assert!(text.find("message Person").unwrap() < text.find("message Team").unwrap());
}

#[test]
fn test_reserved_package_alias_is_escaped() {
    let generated = generate(
        vec![
            PackageDecl::new("example.com/pkg/type")
                .with_type(TypeDecl::structure("Kind", vec![])),
            PackageDecl::new("app").with_type(TypeDecl::structure(
                "Holder",
                vec![FieldDecl::new(
                    "Kinds",
                    TypeExpr::slice(TypeExpr::named("example.com/pkg/type", "Kind")),
                )],
            )),
        ],
        vec![TypeRef::new("app", "Holder")],
    )
    .unwrap();

    assert_eq!(generated.aliases.alias("example.com/pkg/type"), Some("_type"));
    assert!(generated.text.contains("  repeated _type.Kind kinds = 1;\n"));
}

#[test]
fn test_alias_exhaustion_is_fatal() {
    let refs = [("ab/c", "X"), ("a/c", "Y"), ("a.bc", "Z")];
    let mut packages: Vec<PackageDecl> = refs
        .iter()
        .map(|(p, n)| PackageDecl::new(*p).with_type(TypeDecl::structure(*n, vec![])))
        .collect();
    packages.push(PackageDecl::new("app").with_type(TypeDecl::structure(
        "Root",
        refs.iter()
            .map(|(p, n)| FieldDecl::new(*n, TypeExpr::named(*p, *n)))
            .collect(),
    )));

    let source = PackageSet::from_packages(packages).unwrap();
    let err = Generator::new(GeneratorConfig::new().local_package("app"))
        .generate(&source, [TypeRef::new("app", "Root")])
        .unwrap_err();

    match err {
        CodegenError::AliasExhaustion {
            package,
            conflicting,
            ..
        } => {
            assert_eq!(package, "ab/c");
            assert_eq!(conflicting.as_deref(), Some("a.bc"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_unresolved_reference_is_fatal() {
    let err = generate(
        vec![PackageDecl::new("p").with_type(TypeDecl::structure(
            "Msg",
            vec![FieldDecl::new("Other", TypeExpr::named("q", "Missing"))],
        ))],
        vec![TypeRef::new("p", "Msg")],
    )
    .unwrap_err();

    match err {
        CodegenError::Model(ModelError::UnresolvedType {
            type_ref,
            referenced_from,
        }) => {
            assert_eq!(type_ref, TypeRef::new("q", "Missing"));
            assert_eq!(referenced_from, "p.Msg.Other");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_malformed_override_names_the_field() {
    let err = generate(
        vec![PackageDecl::new("p").with_type(TypeDecl::structure(
            "Msg",
            vec![float("Bad").with_tags(r#"protobuf:"number=seven""#)],
        ))],
        vec![TypeRef::new("p", "Msg")],
    )
    .unwrap_err();

    match err {
        CodegenError::Model(ModelError::InvalidOverride { target, .. }) => {
            assert_eq!(target, "p.Msg.Bad");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_manifest_round_trip_through_json() {
    let manifest = serde_json::json!({
        "config": { "banner": false, "local_package": "geo/metrics" },
        "packages": shapes_packages(),
        "roots": shapes_roots(),
    });
    let generated = protogen::generate_from_json(&manifest.to_string()).unwrap();

    assert!(generated.text.starts_with("syntax = \"proto3\";\n"));
    assert!(generated.text.contains("// package geo/metrics\n"));
    assert!(generated.text.contains("  shapes.Point center = 1;\n"));
}
