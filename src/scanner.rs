// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Governor source scanning
//!
//! A token-level reader for the parts of a Java compilation unit the engine
//! needs: package, imports, type-level annotations, the type's category and
//! its directly declared fields and method signatures. Comments and string
//! literals are skipped; nested types and method bodies are not inspected.

use crate::types::{
    AnnotationMetadata, ClassOrInterfaceTypeDetails, FieldMetadata, JavaType, MethodMetadata,
    PhysicalTypeCategory,
};
use std::collections::BTreeMap;

const MODIFIERS: &[&str] = &[
    "public",
    "protected",
    "private",
    "static",
    "final",
    "abstract",
    "transient",
    "volatile",
    "synchronized",
    "native",
    "strictfp",
    "default",
    "sealed",
];

/// Details of the top-level type named like `expected`, if the source declares it
#[must_use]
pub fn scan_source(expected: &JavaType, source: &str) -> Option<ClassOrInterfaceTypeDetails> {
    scan_types(source)
        .into_iter()
        .find(|details| details.name.simple_name() == expected.simple_name())
}

/// Details of every top-level type in a compilation unit
#[must_use]
pub fn scan_types(source: &str) -> Vec<ClassOrInterfaceTypeDetails> {
    Parser::new(source).compilation_unit()
}

// =========================================================================
// Tokens
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Word,
    Symbol,
    Literal,
}

#[derive(Debug, Clone, Copy)]
struct Token<'a> {
    kind: Kind,
    text: &'a str,
    start: usize,
    end: usize,
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

fn tokenize(source: &str) -> Vec<Token<'_>> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        if c == b'/' && bytes.get(i + 1) == Some(&b'/') {
            while i < bytes.len() && bytes[i] != b'\n' {
                i += 1;
            }
            continue;
        }
        if c == b'/' && bytes.get(i + 1) == Some(&b'*') {
            i += 2;
            while i < bytes.len() && !(bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/')) {
                i += 1;
            }
            i = (i + 2).min(bytes.len());
            continue;
        }

        let start = i;
        let kind = if c == b'"' && bytes[i..].starts_with(b"\"\"\"") {
            i += 3;
            while i < bytes.len() && !bytes[i..].starts_with(b"\"\"\"") {
                i += if bytes[i] == b'\\' { 2 } else { 1 };
            }
            i = (i + 3).min(bytes.len());
            Kind::Literal
        } else if c == b'"' || c == b'\'' {
            i += 1;
            while i < bytes.len() && bytes[i] != c && bytes[i] != b'\n' {
                i += if bytes[i] == b'\\' { 2 } else { 1 };
            }
            i = (i + 1).min(bytes.len());
            Kind::Literal
        } else if is_word_byte(c) {
            while i < bytes.len() && is_word_byte(bytes[i]) {
                i += 1;
            }
            Kind::Word
        } else {
            i += 1;
            Kind::Symbol
        };

        // escapes can step past a multi-byte character; clamp to a boundary
        while !source.is_char_boundary(i) {
            i += 1;
        }
        tokens.push(Token {
            kind,
            text: &source[start..i],
            start,
            end: i,
        });
    }
    tokens
}

// =========================================================================
// Parser
// =========================================================================

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token<'a>>,
    pos: usize,
    package: String,
    imports: Vec<String>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            tokens: tokenize(source),
            pos: 0,
            package: String::new(),
            imports: Vec::new(),
        }
    }

    fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<Token<'a>> {
        self.tokens.get(self.pos + offset).copied()
    }

    fn is_symbol(&self, c: &str) -> bool {
        self.peek().is_some_and(|t| t.kind == Kind::Symbol && t.text == c)
    }

    fn is_word(&self, w: &str) -> bool {
        self.peek().is_some_and(|t| t.kind == Kind::Word && t.text == w)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    /// Source text spanning tokens `from..to`
    fn raw(&self, from: usize, to: usize) -> String {
        if from >= to || to > self.tokens.len() {
            return String::new();
        }
        self.source[self.tokens[from].start..self.tokens[to - 1].end]
            .trim()
            .to_string()
    }

    /// `a.b.c`, optionally ending in `.*`
    fn qualified_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(token) = self.peek() {
            match token.kind {
                Kind::Word => name.push_str(token.text),
                Kind::Symbol if token.text == "." || token.text == "*" => name.push_str(token.text),
                _ => break,
            }
            self.advance();
            // stop after a word unless a dot follows
            if token.kind == Kind::Word && !self.is_symbol(".") {
                break;
            }
        }
        name
    }

    /// Index of the token closing the bracket at the current position
    fn matching_close(&self) -> Option<usize> {
        let mut depth = 0usize;
        for (i, token) in self.tokens.iter().enumerate().skip(self.pos) {
            if token.kind != Kind::Symbol {
                continue;
            }
            match token.text {
                "(" | "{" | "[" => depth += 1,
                ")" | "}" | "]" => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
        }
        None
    }

    fn skip_balanced(&mut self) {
        self.pos = self.matching_close().map_or(self.tokens.len(), |close| close + 1);
    }

    /// Advance to the first of `stops` outside brackets, without consuming it
    fn skip_until(&mut self, stops: &[&str]) {
        while let Some(token) = self.peek() {
            if token.kind == Kind::Symbol {
                if stops.contains(&token.text) {
                    return;
                }
                if matches!(token.text, "(" | "{" | "[") {
                    self.skip_balanced();
                    continue;
                }
                if token.text == "}" {
                    return;
                }
            }
            self.advance();
        }
    }

    fn compilation_unit(mut self) -> Vec<ClassOrInterfaceTypeDetails> {
        let mut types = Vec::new();
        let mut annotations = Vec::new();

        while let Some(token) = self.peek() {
            match (token.kind, token.text) {
                (Kind::Word, "package") => {
                    self.advance();
                    self.package = self.qualified_name();
                    self.skip_until(&[";"]);
                }
                (Kind::Word, "import") => {
                    self.advance();
                    let is_static = self.is_word("static");
                    if is_static {
                        self.advance();
                    }
                    let name = self.qualified_name();
                    self.skip_until(&[";"]);
                    if !is_static && !name.is_empty() {
                        self.imports.push(name);
                    }
                }
                (Kind::Symbol, "@") => {
                    if self.peek_at(1).is_some_and(|t| t.text == "interface") {
                        self.pos += 2;
                        let annotations = std::mem::take(&mut annotations);
                        types.extend(self.type_declaration(PhysicalTypeCategory::Annotation, annotations));
                    } else {
                        annotations.push(self.annotation());
                    }
                    continue;
                }
                (Kind::Word, "class" | "record" | "interface" | "enum") => {
                    let category = match token.text {
                        "interface" => PhysicalTypeCategory::Interface,
                        "enum" => PhysicalTypeCategory::Enumeration,
                        _ => PhysicalTypeCategory::Class,
                    };
                    self.advance();
                    let annotations = std::mem::take(&mut annotations);
                    types.extend(self.type_declaration(category, annotations));
                    continue;
                }
                _ => {}
            }
            self.advance();
        }
        types
    }

    /// An annotation starting at `@`
    fn annotation(&mut self) -> AnnotationMetadata {
        self.advance();
        let name = self.qualified_name();
        let mut attributes = BTreeMap::new();

        if self.is_symbol("(") {
            let open = self.pos;
            let close = self.matching_close().unwrap_or(self.tokens.len());
            for (from, to) in self.top_level_segments(open + 1, close) {
                let named = to - from >= 2
                    && self.tokens[from].kind == Kind::Word
                    && self.tokens[from + 1].text == "=";
                if named {
                    attributes.insert(self.tokens[from].text.to_string(), self.raw(from + 2, to));
                } else {
                    attributes.insert("value".to_string(), self.raw(from, to));
                }
            }
            self.pos = (close + 1).min(self.tokens.len());
        }

        AnnotationMetadata {
            annotation_type: self.resolve(&name),
            attributes,
        }
    }

    /// Comma-separated ranges within `from..to`, ignoring nested commas
    fn top_level_segments(&self, from: usize, to: usize) -> Vec<(usize, usize)> {
        let mut segments = Vec::new();
        let mut depth = 0usize;
        let mut start = from;
        for i in from..to.min(self.tokens.len()) {
            let token = self.tokens[i];
            if token.kind != Kind::Symbol {
                continue;
            }
            match token.text {
                "(" | "{" | "[" | "<" => depth += 1,
                ")" | "}" | "]" | ">" => depth = depth.saturating_sub(1),
                "," if depth == 0 => {
                    if start < i {
                        segments.push((start, i));
                    }
                    start = i + 1;
                }
                _ => {}
            }
        }
        if start < to {
            segments.push((start, to));
        }
        segments
    }

    fn resolve(&self, name: &str) -> JavaType {
        if name.contains('.') {
            return JavaType::new(name);
        }
        let suffix = format!(".{name}");
        self.imports
            .iter()
            .find(|import| import.ends_with(&suffix))
            .map_or_else(|| JavaType::new(name), |import| JavaType::new(import.as_str()))
    }

    /// Everything after the `class`/`interface`/`enum` keyword
    fn type_declaration(
        &mut self,
        category: PhysicalTypeCategory,
        annotations: Vec<AnnotationMetadata>,
    ) -> Option<ClassOrInterfaceTypeDetails> {
        let name = self.peek().filter(|t| t.kind == Kind::Word)?.text.to_string();
        self.advance();

        // generics, record components, extends and implements clauses
        while let Some(token) = self.peek() {
            if token.kind == Kind::Symbol && token.text == "{" {
                break;
            }
            if token.kind == Kind::Symbol && token.text == "(" {
                self.skip_balanced();
                continue;
            }
            self.advance();
        }
        if self.peek().is_none() {
            return None;
        }
        self.advance();

        let qualified = if self.package.is_empty() {
            name.clone()
        } else {
            format!("{}.{name}", self.package)
        };
        let mut details = ClassOrInterfaceTypeDetails {
            name: JavaType::new(qualified),
            category,
            annotations,
            fields: Vec::new(),
            methods: Vec::new(),
            imports: self.imports.clone(),
        };

        if category == PhysicalTypeCategory::Enumeration {
            self.skip_until(&[";"]);
            if self.is_symbol(";") {
                self.advance();
            }
        }
        self.members(&name, &mut details);
        Some(details)
    }

    fn members(&mut self, simple_name: &str, details: &mut ClassOrInterfaceTypeDetails) {
        while let Some(token) = self.peek() {
            match (token.kind, token.text) {
                (Kind::Symbol, "}") => {
                    self.advance();
                    return;
                }
                (Kind::Symbol, ";") => self.advance(),
                (Kind::Symbol, "@") => {
                    if self.peek_at(1).is_some_and(|t| t.text == "interface") {
                        self.skip_nested_type();
                    } else {
                        self.annotation();
                    }
                }
                (Kind::Symbol, "{") => self.skip_balanced(),
                (Kind::Word, "class" | "interface" | "enum" | "record") => self.skip_nested_type(),
                _ => self.member(simple_name, details),
            }
        }
    }

    fn skip_nested_type(&mut self) {
        while let Some(token) = self.peek() {
            if token.kind == Kind::Symbol && token.text == "{" {
                self.skip_balanced();
                return;
            }
            self.advance();
        }
    }

    fn member(&mut self, simple_name: &str, details: &mut ClassOrInterfaceTypeDetails) {
        let mut header = Vec::new();
        let mut angle = 0usize;

        while let Some(token) = self.peek() {
            if token.kind == Kind::Symbol {
                match token.text {
                    "<" => angle += 1,
                    ">" => angle = angle.saturating_sub(1),
                    "@" => {
                        self.annotation();
                        continue;
                    }
                    "(" | ";" | "=" | "{" | "," | "}" if angle == 0 => break,
                    _ => {}
                }
            }
            // nested type declared after modifiers
            if token.kind == Kind::Word && matches!(token.text, "class" | "interface" | "enum" | "record") {
                self.skip_nested_type();
                return;
            }
            header.push(self.pos);
            self.advance();
        }

        let Some(terminator) = self.peek() else {
            return;
        };
        match terminator.text {
            "(" => self.method(&header, simple_name, details),
            "{" => self.skip_balanced(),
            "}" => {}
            _ => self.fields(&header, details),
        }
    }

    fn method(&mut self, header: &[usize], simple_name: &str, details: &mut ClassOrInterfaceTypeDetails) {
        let name = header
            .last()
            .map(|&i| self.tokens[i])
            .filter(|t| t.kind == Kind::Word)
            .map(|t| t.text.to_string());

        let open = self.pos;
        let close = self.matching_close().unwrap_or(self.tokens.len());
        let parameter_types = self
            .top_level_segments(open + 1, close)
            .into_iter()
            .filter_map(|(from, to)| self.parameter_type(from, to))
            .collect();
        self.pos = (close + 1).min(self.tokens.len());

        // throws clause or annotation default, then body or `;`
        self.skip_until(&[";", "{"]);
        if self.is_symbol("{") {
            self.skip_balanced();
        } else if self.is_symbol(";") {
            self.advance();
        }

        match name {
            // a constructor has no return type in its header
            Some(name) if name == simple_name && header.len() <= 1 + self.modifier_count(header) => {}
            Some(name) => details.methods.push(MethodMetadata { name, parameter_types }),
            None => {}
        }
    }

    fn parameter_type(&self, from: usize, to: usize) -> Option<String> {
        let mut first = from;
        while first < to {
            let token = self.tokens[first];
            if token.kind == Kind::Word && token.text == "final" {
                first += 1;
            } else if token.kind == Kind::Symbol && token.text == "@" {
                first += 1;
                while first < to && (self.tokens[first].kind == Kind::Word || self.tokens[first].text == ".") {
                    first += 1;
                }
                if first < to && self.tokens[first].text == "(" {
                    let mut depth = 0usize;
                    while first < to {
                        match self.tokens[first].text {
                            "(" => depth += 1,
                            ")" => {
                                depth = depth.saturating_sub(1);
                                if depth == 0 {
                                    first += 1;
                                    break;
                                }
                            }
                            _ => {}
                        }
                        first += 1;
                    }
                }
            } else {
                break;
            }
        }
        // the last token is the parameter name
        (to > first + 1).then(|| self.raw(first, to - 1))
    }

    fn modifier_count(&self, header: &[usize]) -> usize {
        header
            .iter()
            .take_while(|&&i| MODIFIERS.contains(&self.tokens[i].text))
            .count()
    }

    fn fields(&mut self, header: &[usize], details: &mut ClassOrInterfaceTypeDetails) {
        let modifiers = self.modifier_count(header);
        if header.len() < modifiers + 2 {
            self.skip_until(&[";"]);
            if self.is_symbol(";") {
                self.advance();
            }
            return;
        }
        let type_tokens = &header[modifiers..header.len() - 1];
        let field_type = self.raw(type_tokens[0], type_tokens[type_tokens.len() - 1] + 1);
        let modifier_names: Vec<String> = header[..modifiers]
            .iter()
            .map(|&i| self.tokens[i].text.to_string())
            .collect();

        let mut name = Some(self.tokens[header[header.len() - 1]].text.to_string());
        loop {
            if let Some(name) = name.take() {
                details.fields.push(FieldMetadata {
                    modifiers: modifier_names.clone(),
                    field_type: field_type.clone(),
                    name,
                });
            }
            if self.is_symbol("=") {
                self.advance();
                self.skip_until(&[",", ";"]);
            }
            if self.is_symbol(",") {
                self.advance();
                name = self
                    .peek()
                    .filter(|t| t.kind == Kind::Word)
                    .map(|t| t.text.to_string());
                if name.is_some() {
                    self.advance();
                }
                continue;
            }
            if self.is_symbol(";") {
                self.advance();
            }
            return;
        }
    }
}
