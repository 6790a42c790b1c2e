//! Protobuf message emission.

use crate::plan::{PlannedField, PlannedMessage, RenderPlan};

/// Banner marking the output as generated.
pub const BANNER: &str = "// Code generated by protogen. DO NOT EDIT.";

/// Writes a render plan as `proto3` text.
pub struct ProtoEmitter<'a> {
    plan: &'a RenderPlan,
    banner: bool,
}

impl<'a> ProtoEmitter<'a> {
    /// Creates a new emitter.
    #[must_use]
    pub fn new(plan: &'a RenderPlan) -> Self {
        Self { plan, banner: true }
    }

    /// Enables or disables the generated-code banner.
    #[must_use]
    pub fn with_banner(mut self, banner: bool) -> Self {
        self.banner = banner;
        self
    }

    /// Generates the schema text.
    #[must_use]
    pub fn generate(&self) -> String {
        let mut output = String::new();

        if self.banner {
            output.push_str(BANNER);
            output.push_str("\n\n");
        }
        output.push_str("syntax = \"proto3\";\n");

        let mut current: Option<&str> = None;
        for msg in self.plan.messages() {
            if current != Some(msg.package.as_str()) {
                output.push('\n');
                output.push_str(&Self::package_header(msg));
                current = Some(msg.package.as_str());
            }
            output.push('\n');
            output.push_str(&Self::generate_message(msg));
        }

        output
    }

    fn package_header(msg: &PlannedMessage) -> String {
        match &msg.alias {
            Some(alias) => format!("// package {} (alias {})\n", msg.package, alias),
            None => format!("// package {}\n", msg.package),
        }
    }

    fn generate_message(msg: &PlannedMessage) -> String {
        let mut output = String::new();

        for line in &msg.doc {
            output.push_str(&comment("", line));
        }
        output.push_str(&format!("message {} {{\n", msg.name));
        for field in &msg.fields {
            output.push_str(&Self::generate_field(field));
        }
        output.push_str("}\n");

        output
    }

    fn generate_field(field: &PlannedField) -> String {
        let mut output = String::new();
        for line in &field.doc {
            output.push_str(&comment("  ", line));
        }
        output.push_str(&format!(
            "  {} {} = {};\n",
            field.type_expr, field.name, field.number
        ));
        output
    }
}

fn comment(indent: &str, line: &str) -> String {
    if line.is_empty() {
        format!("{indent}//\n")
    } else {
        format!("{indent}// {line}\n")
    }
}
