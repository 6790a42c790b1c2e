//! Package alias assignment.
//!
//! Every package referenced by the model (other than the local package) gets
//! a short alias derived from the tail of its path. Paths are processed in
//! lexicographic order, and for each one the candidate grows one segment at a
//! time from the end until it is free:
//!
//! ```text
//! k8s.io/api/apps/v1     -> v1
//! k8s.io/api/core/v1     -> corev1      (v1 taken)
//! example.com/pkg/type   -> _type       (reserved word, escaped)
//! ```
//!
//! The assignment is built once per run and only read afterwards.

use crate::config::GeneratorConfig;
use crate::error::{CodegenError, Warning};
use protogen_model::naming::is_identifier;
use std::collections::{BTreeMap, BTreeSet};

/// Separator between package path segments.
pub const PATH_SEPARATOR: char = '/';

/// Protobuf keywords and scalar type names.
const PROTO_RESERVED: &[&str] = &[
    "syntax", "edition", "import", "weak", "public", "package", "option", "message", "enum",
    "service", "rpc", "returns", "stream", "oneof", "map", "repeated", "optional", "required",
    "reserved", "extensions", "extend", "to", "max", "true", "false", "inf", "nan", "group",
    "double", "float", "int32", "int64", "uint32", "uint64", "sint32", "sint64", "fixed32",
    "fixed64", "sfixed32", "sfixed64", "bool", "string", "bytes",
];

/// Keywords of the host language the declarations come from.
const HOST_RESERVED: &[&str] = &[
    "break", "case", "chan", "const", "continue", "default", "defer", "else", "fallthrough",
    "for", "func", "go", "goto", "if", "import", "interface", "map", "package", "range", "return",
    "select", "struct", "switch", "type", "var",
];

/// Maps package paths to unique aliases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasAssignment {
    by_path: BTreeMap<String, String>,
    by_alias: BTreeMap<String, String>,
    local: Option<String>,
}

impl AliasAssignment {
    /// Returns the alias of a package.
    #[must_use]
    pub fn alias(&self, package: &str) -> Option<&str> {
        self.by_path.get(package).map(String::as_str)
    }

    /// Returns the package holding an alias.
    #[must_use]
    pub fn path_of(&self, alias: &str) -> Option<&str> {
        self.by_alias.get(alias).map(String::as_str)
    }

    /// Returns the local package, if one was configured.
    #[must_use]
    pub fn local_package(&self) -> Option<&str> {
        self.local.as_deref()
    }

    /// Returns how a reference to `name` in `to_package` is printed from
    /// within `from_package`.
    ///
    /// Same-package, local-package and builtin references are bare; anything
    /// else is `alias.name`. Returns `None` if `to_package` has no alias.
    #[must_use]
    pub fn qualify(&self, from_package: &str, to_package: &str, name: &str) -> Option<String> {
        if to_package.is_empty()
            || to_package == from_package
            || self.local.as_deref() == Some(to_package)
        {
            return Some(name.to_string());
        }
        self.alias(to_package).map(|alias| format!("{alias}.{name}"))
    }

    /// Iterates `(package, alias)` pairs in package order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_path.iter().map(|(p, a)| (p.as_str(), a.as_str()))
    }

    /// Number of aliased packages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    /// Returns true if no package is aliased.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }
}

/// Derives collision-free aliases for package paths.
#[derive(Debug, Clone)]
pub struct AliasTracker {
    noise: Vec<char>,
    escape: String,
    reserved: BTreeSet<String>,
    local: Option<String>,
}

impl Default for AliasTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl AliasTracker {
    /// Creates a tracker with the default noise characters, escape prefix and
    /// reserved words.
    #[must_use]
    pub fn new() -> Self {
        Self::from_config(&GeneratorConfig::default())
    }

    /// Creates a tracker from a generator configuration.
    #[must_use]
    pub fn from_config(config: &GeneratorConfig) -> Self {
        let reserved = PROTO_RESERVED
            .iter()
            .chain(HOST_RESERVED)
            .map(|w| (*w).to_string())
            .chain(config.extra_reserved.iter().cloned())
            .collect();
        Self {
            noise: config.noise_chars.chars().collect(),
            escape: config.escape_prefix.clone(),
            reserved,
            local: config.local_package.clone(),
        }
    }

    /// Returns true if `candidate` may not be used as an alias verbatim.
    #[must_use]
    pub fn is_reserved(&self, candidate: &str) -> bool {
        self.reserved.contains(candidate) || candidate.starts_with(|c: char| c.is_ascii_digit())
    }

    /// Strips noise and non-identifier characters from a joined suffix.
    fn sanitize(&self, joined: &str) -> String {
        joined
            .chars()
            .filter(|c| !self.noise.contains(c))
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect()
    }

    /// Assigns an alias to every package in `packages`.
    ///
    /// The input order does not matter: paths are deduplicated and processed
    /// in lexicographic order. Empty paths and the local package receive no
    /// alias.
    ///
    /// # Errors
    /// Returns `CodegenError::InvalidConfig` if the escape prefix is not an
    /// identifier, and `CodegenError::AliasExhaustion` if some package cannot
    /// be told apart from already aliased ones by any suffix of its path.
    pub fn assign<I, S>(&self, packages: I) -> Result<(AliasAssignment, Vec<Warning>), CodegenError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if !is_identifier(&self.escape) {
            return Err(CodegenError::InvalidConfig {
                setting: "escape_prefix".to_string(),
                reason: format!("'{}' is not a valid identifier", self.escape),
            });
        }

        let paths: BTreeSet<String> = packages
            .into_iter()
            .map(|p| p.as_ref().to_string())
            .filter(|p| !p.is_empty() && self.local.as_deref() != Some(p.as_str()))
            .collect();

        let mut assignment = AliasAssignment {
            local: self.local.clone(),
            ..AliasAssignment::default()
        };
        let mut warnings = Vec::new();

        for path in paths {
            if path.contains('\\') {
                let warning = Warning::AmbiguousSeparator {
                    package: path.clone(),
                };
                tracing::warn!("{warning}");
                warnings.push(warning);
            }

            let alias = self.derive(&path, &assignment)?;
            tracing::debug!(package = %path, alias = %alias, "assigned package alias");
            assignment.by_alias.insert(alias.clone(), path.clone());
            assignment.by_path.insert(path, alias);
        }

        Ok((assignment, warnings))
    }

    /// Finds the shortest free suffix alias for `path`.
    fn derive(&self, path: &str, taken: &AliasAssignment) -> Result<String, CodegenError> {
        let segments: Vec<&str> = path.split(PATH_SEPARATOR).collect();
        let mut last = String::new();
        let mut conflicting = None;

        for start in (0..segments.len()).rev() {
            let mut candidate = self.sanitize(&segments[start..].concat());
            if candidate.is_empty() {
                continue;
            }
            last.clone_from(&candidate);

            if self.is_reserved(&candidate) {
                candidate.insert_str(0, &self.escape);
                // A prefix can turn one keyword into another (`s` + `int32`).
                if self.reserved.contains(&candidate) {
                    continue;
                }
            }
            // The escaped form is checked again so it cannot shadow an
            // alias assigned earlier.
            match taken.path_of(&candidate) {
                Some(owner) => conflicting = Some(owner.to_string()),
                None => return Ok(candidate),
            }
        }

        Err(CodegenError::AliasExhaustion {
            package: path.to_string(),
            candidate: last,
            conflicting,
        })
    }
}
