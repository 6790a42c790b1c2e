//! Generator configuration.

use protogen_model::TagParser;
use serde::{Deserialize, Serialize};

/// Settings for one generation run.
///
/// Deserializable so a manifest can carry it; every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Annotation key holding directives.
    pub tag_key: String,
    /// Annotation key to take default field names from (e.g. `json`).
    pub name_tag: Option<String>,
    /// Package printed without qualification and never aliased.
    pub local_package: Option<String>,
    /// Characters stripped from path segments when deriving aliases.
    pub noise_chars: String,
    /// Prefix applied to aliases that are reserved words.
    pub escape_prefix: String,
    /// Additional words aliases must not collide with.
    pub extra_reserved: Vec<String>,
    /// Emit the generated-code banner.
    pub banner: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            tag_key: protogen_model::tags::DEFAULT_TAG_KEY.to_string(),
            name_tag: None,
            local_package: None,
            noise_chars: "_.-".to_string(),
            escape_prefix: "_".to_string(),
            extra_reserved: Vec::new(),
            banner: true,
        }
    }
}

impl GeneratorConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the directive annotation key.
    #[must_use]
    pub fn tag_key(mut self, key: impl Into<String>) -> Self {
        self.tag_key = key.into();
        self
    }

    /// Sets the annotation key default field names come from.
    #[must_use]
    pub fn name_tag(mut self, key: impl Into<String>) -> Self {
        self.name_tag = Some(key.into());
        self
    }

    /// Sets the local package.
    #[must_use]
    pub fn local_package(mut self, package: impl Into<String>) -> Self {
        self.local_package = Some(package.into());
        self
    }

    /// Sets the noise characters.
    #[must_use]
    pub fn noise_chars(mut self, chars: impl Into<String>) -> Self {
        self.noise_chars = chars.into();
        self
    }

    /// Sets the reserved-word escape prefix.
    #[must_use]
    pub fn escape_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.escape_prefix = prefix.into();
        self
    }

    /// Adds a reserved word.
    #[must_use]
    pub fn reserve(mut self, word: impl Into<String>) -> Self {
        self.extra_reserved.push(word.into());
        self
    }

    /// Enables or disables the banner.
    #[must_use]
    pub fn banner(mut self, enabled: bool) -> Self {
        self.banner = enabled;
        self
    }

    /// Builds the tag parser for this configuration.
    #[must_use]
    pub fn tag_parser(&self) -> TagParser {
        let parser = TagParser::new(self.tag_key.clone());
        match &self.name_tag {
            Some(tag) => parser.with_name_tag(tag.clone()),
            None => parser,
        }
    }
}
