// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Renders ITD type details as AspectJ source

use super::{ItdField, ItdMethod, ItdTypeDetails};

const INDENT: &str = "    ";

/// First lines of every generated file
pub const HEADER: [&str; 2] = [
    "// WARNING: DO NOT EDIT THIS FILE. THIS FILE IS MANAGED BY METAWEAVE.",
    "// You may push code into the target .java compilation unit if you wish to edit any member(s).",
];

/// Builds the text of one `.aj` file
pub struct ItdSourceFileComposer<'a> {
    details: &'a ItdTypeDetails,
}

impl<'a> ItdSourceFileComposer<'a> {
    /// Composer for one ITD
    #[must_use]
    pub fn new(details: &'a ItdTypeDetails) -> Self {
        Self { details }
    }

    /// Whether there is anything worth writing
    #[must_use]
    pub fn is_content(&self) -> bool {
        !self.details.is_empty()
    }

    /// The rendered file
    #[must_use]
    pub fn output(&self) -> String {
        let d = self.details;
        let governor = d.governor.simple_name();
        let mut out = String::new();

        for line in HEADER {
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');

        let package = d.aspect.package();
        if !package.is_empty() {
            out.push_str(&format!("package {package};\n\n"));
        }

        if !d.imports.is_empty() {
            for import in &d.imports {
                out.push_str(&format!("import {import};\n"));
            }
            out.push('\n');
        }

        let privileged = if d.privileged { "privileged " } else { "" };
        out.push_str(&format!("{privileged}aspect {} {{\n", d.aspect.simple_name()));

        for parent in &d.extends_types {
            out.push_str(&format!("\n{INDENT}declare parents: {governor} extends {parent};\n"));
        }
        for parent in &d.implements_types {
            out.push_str(&format!("\n{INDENT}declare parents: {governor} implements {parent};\n"));
        }
        for annotation in &d.type_annotations {
            out.push_str(&format!("\n{INDENT}declare @type: {governor}: {annotation};\n"));
        }
        for field in &d.fields {
            out.push('\n');
            render_field(&mut out, governor, field);
        }
        for method in &d.methods {
            out.push('\n');
            render_method(&mut out, governor, method);
        }

        out.push_str("\n}\n");
        out
    }
}

fn render_field(out: &mut String, governor: &str, field: &ItdField) {
    for annotation in &field.annotations {
        out.push_str(&format!("{INDENT}{annotation}\n"));
    }
    out.push_str(&format!(
        "{INDENT}{} {} {governor}.{}",
        field.modifiers, field.field_type, field.name
    ));
    if let Some(init) = &field.initializer {
        out.push_str(&format!(" = {init}"));
    }
    out.push_str(";\n");
}

fn render_method(out: &mut String, governor: &str, method: &ItdMethod) {
    for annotation in &method.annotations {
        out.push_str(&format!("{INDENT}{annotation}\n"));
    }
    let params = method
        .parameters
        .iter()
        .map(|(ty, name)| format!("{ty} {name}"))
        .collect::<Vec<_>>()
        .join(", ");
    out.push_str(&format!(
        "{INDENT}{} {} {governor}.{}({params}) {{\n",
        method.modifiers, method.return_type, method.name
    ));
    for line in &method.body {
        out.push_str(&format!("{INDENT}{INDENT}{line}\n"));
    }
    out.push_str(&format!("{INDENT}}}\n"));
}
