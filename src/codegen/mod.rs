//! The generator framework (component G0): shared rendering helpers used
//! by every emitter (G1–G4).
//!
//! Grounded on `examples/original_source/.../generator/context.h`'s
//! `CGenContext`: `Header` (file banner), `Safeguard` (include guards),
//! `SmartIndent` (reindent verbatim blocks), `ReplaceKeywords` (`%kw%`
//! templating), and `QualifyName`/`GetRelativeScopedName`. Where the
//! original threads these through a base class every generator inherits,
//! this crate exposes them as free functions plus one streaming
//! [`Context`] that owns the output buffer and current indent depth, a
//! small owned struct in place of a trait object where dynamic dispatch
//! isn't needed.

pub mod build_descriptor;
pub mod definition;
pub mod interface_id;
pub mod proxy;
pub mod serdes;
pub mod stub;

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::entity::{EntityArena, EntityHandle};
use crate::scope::{Symbol, SymbolTable};

/// Visibility of a generated member, for languages that distinguish it
/// (kept distinct from [`crate::entity::Direction`], which is unrelated).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

/// Options controlling what G1–G4 emit, derived from CLI flags (§6.3).
#[derive(Debug, Clone)]
pub struct CodegenOptions {
    pub output_dir: std::path::PathBuf,
    pub emit_proxy_stub: bool,
    pub cmake_target: Option<String>,
}

/// A `%keyword%` substitution table, mirroring `CKeywordMap`.
pub type KeywordMap<'a> = HashMap<&'a str, String>;

/// Replaces every `%key%` occurrence in `template` with its mapped value.
/// Unknown keys are left untouched, matching the original's behavior of
/// only replacing what it recognizes.
pub fn replace_keywords(template: &str, keywords: &KeywordMap<'_>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('%') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        if let Some(end) = after.find('%') {
            let key = &after[..end];
            match keywords.get(key) {
                Some(value) => out.push_str(value),
                None => {
                    out.push('%');
                    out.push_str(key);
                    out.push('%');
                }
            }
            rest = &after[end + 1..];
        } else {
            out.push('%');
            rest = after;
        }
    }
    out.push_str(rest);
    out
}

/// Turns a scoped name (`["sdv", "demo", "Foo"]`) into a flat, valid target
/// identifier by replacing `::`-equivalent boundaries with `__`, matching
/// `CGenContext::QualifyName`'s `::` → `__` and `[]` → `_` rules.
pub fn qualify_name(scoped: &[Symbol], symbols: &SymbolTable) -> String {
    scoped
        .iter()
        .map(|s| symbols.resolve(*s).unwrap_or("?"))
        .collect::<Vec<_>>()
        .join("__")
}

/// Renders `handle`'s scoped name relative to `current_scope`, dropping the
/// shared prefix: `CGenContext::GetRelativeScopedName`.
pub fn relative_scoped_name(handle: EntityHandle, current_scope: &[Symbol], arena: &EntityArena, symbols: &SymbolTable) -> String {
    let scoped = &arena.get(handle).scoped_name;
    let shared = scoped.iter().zip(current_scope.iter()).take_while(|(a, b)| a == b).count();
    scoped[shared..]
        .iter()
        .map(|s| symbols.resolve(*s).unwrap_or("?"))
        .collect::<Vec<_>>()
        .join("::")
}

/// Reindents a multi-line verbatim block: strips trailing whitespace from
/// each line and any line-continuation backslash, then applies `indent`
/// spaces of leading indentation to every non-empty line:
/// `CGenContext::SmartIndent`.
pub fn smart_indent(block: &str, indent: usize) -> String {
    let pad = " ".repeat(indent);
    block
        .lines()
        .map(|line| {
            let trimmed = line.trim_end().trim_end_matches('\\').trim_end();
            if trimmed.is_empty() {
                String::new()
            } else {
                format!("{pad}{trimmed}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders a Javadoc-style file header banner naming the source IDL file:
/// `CGenContext::Header`.
pub fn file_header(source_file: &str, generator_name: &str) -> String {
    format!(
        "/**\n * @file\n * Generated by {generator_name} from \"{source_file}\".\n * Do not edit this file manually; regenerate it from the source IDL.\n */\n"
    )
}

/// Opens an include guard for `header_name`, returning the
/// `#ifndef`/`#define` lines: the open half of `CGenContext::Safeguard`.
pub fn include_guard_open(header_name: &str) -> String {
    let macro_name = guard_macro_name(header_name);
    format!("#ifndef {macro_name}\n#define {macro_name}\n")
}

/// Closes an include guard opened by [`include_guard_open`].
pub fn include_guard_close(header_name: &str) -> String {
    format!("#endif // {}\n", guard_macro_name(header_name))
}

fn guard_macro_name(header_name: &str) -> String {
    let mut name = header_name.to_uppercase();
    name = name.replace(['.', '/', '\\', '-'], "_");
    format!("{name}_INCLUDED")
}

/// A streaming output buffer with tracked indentation, shared by every
/// emitter so generated source has consistent whitespace.
pub struct Context {
    buffer: String,
    indent_depth: usize,
    indent_width: usize,
    /// §9 Open Question: kept independent of `enable_newline_after_content`,
    /// not aliased to its getter (see DESIGN.md).
    pub disable_newline_after_content: bool,
    pub enable_newline_after_content: bool,
}

impl Context {
    /// Creates an empty output buffer with the given indent width (spaces
    /// per level).
    pub fn new(indent_width: usize) -> Self {
        Self {
            buffer: String::new(),
            indent_depth: 0,
            indent_width,
            disable_newline_after_content: false,
            enable_newline_after_content: true,
        }
    }

    /// Writes `text` at the current indent, then a newline unless
    /// newline-after-content has been disabled.
    pub fn line(&mut self, text: impl AsRef<str>) {
        let pad = " ".repeat(self.indent_depth * self.indent_width);
        let _ = write!(self.buffer, "{pad}{}", text.as_ref());
        if self.enable_newline_after_content && !self.disable_newline_after_content {
            self.buffer.push('\n');
        }
    }

    /// Writes a blank line.
    pub fn blank(&mut self) {
        self.buffer.push('\n');
    }

    /// Writes `text` at column zero, ignoring the current indent depth.
    /// Used for verbatim passthrough content that must not inherit the
    /// surrounding container's indentation.
    pub fn raw_line(&mut self, text: impl AsRef<str>) {
        self.buffer.push_str(text.as_ref());
        self.buffer.push('\n');
    }

    /// Increases indentation for the scope of the closure.
    pub fn indented(&mut self, f: impl FnOnce(&mut Self)) {
        self.indent_depth += 1;
        f(self);
        self.indent_depth -= 1;
    }

    /// Consumes the context, returning the rendered source.
    pub fn finish(self) -> String {
        self.buffer
    }
}

/// Converts a scoped identifier to `PascalCase` for languages that expect it.
pub fn to_pascal_case(s: &str) -> String {
    s.split(['_', '-'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// Converts a scoped identifier to `snake_case`.
pub fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i != 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_keywords_substitutes_known_keys_and_leaves_unknown() {
        let mut map = KeywordMap::new();
        map.insert("target_lib_name", "demo".to_string());
        let out = replace_keywords("project(%target_lib_name% %other%)", &map);
        assert_eq!(out, "project(demo %other%)");
    }

    #[test]
    fn smart_indent_strips_trailing_backslash_and_whitespace() {
        let out = smart_indent("line one \\\nline two  \n", 4);
        assert_eq!(out, "    line one\n    line two");
    }

    #[test]
    fn include_guard_roundtrips_a_sane_macro_name() {
        let open = include_guard_open("Foo_proxy.h");
        let close = include_guard_close("Foo_proxy.h");
        assert!(open.contains("FOO_PROXY_H_INCLUDED"));
        assert!(close.contains("FOO_PROXY_H_INCLUDED"));
    }

    #[test]
    fn context_indents_nested_lines() {
        let mut ctx = Context::new(4);
        ctx.line("outer");
        ctx.indented(|c| c.line("inner"));
        let rendered = ctx.finish();
        assert_eq!(rendered, "outer\n    inner\n");
    }

    #[test]
    fn pascal_and_snake_case_conversions() {
        assert_eq!(to_pascal_case("my_member_name"), "MyMemberName");
        assert_eq!(to_snake_case("MyMemberName"), "my_member_name");
    }
}
