//! Pipeline orchestration: ties lexing, parsing, and the four generators
//! together into the `compile_file`/`compile_files` entry points the CLI
//! (and any embedder) calls.
//!
//! A thin driver function per stage, composed by one top-level
//! function, with output committed via write-to-temp-then-rename so a
//! failure partway through generation never leaves a half-written file
//! on disk (§7).

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::codegen::{self, definition, interface_id, proxy, serdes, stub, Context};
use crate::diagnostic::CompileError;
use crate::entity::{EntityHandle, EntityKind};
use crate::parser::{self, ParseContext};

/// One fully compiled translation unit's outputs.
pub struct CompileOutput {
    pub definition_header: String,
    pub proxy_header: String,
    pub stub_header: String,
    pub serdes_source: String,
    pub top_level: Vec<EntityHandle>,
}

/// Compiles a single IDL file's *text* (already read into memory),
/// producing rendered source for every output artifact without touching
/// the filesystem. Useful for embedders and for golden-file tests. Does
/// not resolve `#include`: the directive is kept as a passthrough entity
/// and re-emitted as-is (see [`compile_file`] for real file resolution).
pub fn compile_source(source: &str, path: &Path) -> Result<(ParseContext, CompileOutput), Vec<CompileError>> {
    let (ctx, top) = parser::parse_file(source, path)?;
    let output = render(&ctx, &top, path);
    Ok((ctx, output))
}

/// Renders every generator's output for an already-parsed graph. Shared by
/// [`compile_source`] and [`compile_file`], the latter calling it once the
/// including file's `#include`d entities have been merged into `top`.
fn render(ctx: &ParseContext, top: &[EntityHandle], path: &Path) -> CompileOutput {
    let flattened = flatten_modules(top, &ctx.arena);

    let mut def_ctx = Context::new(4);
    def_ctx.line(codegen::file_header(&path.display().to_string(), "idlc"));
    for handle in &flattened {
        definition::emit_definition(&mut def_ctx, *handle, &ctx.arena, &ctx.symbols);
    }

    let mut proxy_ctx = Context::new(4);
    let mut stub_ctx = Context::new(4);
    let mut serdes_ctx = Context::new(4);
    for handle in &flattened {
        if matches!(ctx.arena.get(*handle).kind, EntityKind::Interface { .. }) {
            proxy::emit_proxy(&mut proxy_ctx, *handle, &ctx.arena, &ctx.symbols);
            stub::emit_stub(&mut stub_ctx, *handle, &ctx.arena, &ctx.symbols);
        }
        if matches!(
            ctx.arena.get(*handle).kind,
            EntityKind::Struct { .. } | EntityKind::Union { .. } | EntityKind::Exception { .. }
        ) {
            serdes::emit_serdes(&mut serdes_ctx, serdes::Pass::CalcSize, *handle, &ctx.arena, &ctx.symbols);
            serdes::emit_serdes(&mut serdes_ctx, serdes::Pass::Serialize, *handle, &ctx.arena, &ctx.symbols);
            serdes::emit_serdes(&mut serdes_ctx, serdes::Pass::Deserialize, *handle, &ctx.arena, &ctx.symbols);
        }
    }

    CompileOutput {
        definition_header: def_ctx.finish(),
        proxy_header: proxy_ctx.finish(),
        stub_header: stub_ctx.finish(),
        serdes_source: serdes_ctx.finish(),
        top_level: top.to_vec(),
    }
}

/// Picks a `#include "..."` or `#include <...>` target out of one source
/// line, if it is one. Returns the requested path and whether it was
/// quoted (vs. angle-bracketed).
fn parse_include_target(line: &str) -> Option<(&str, bool)> {
    let rest = line.trim_start().strip_prefix("#include")?.trim_start();
    if let Some(rest) = rest.strip_prefix('"') {
        let end = rest.find('"')?;
        Some((&rest[..end], true))
    } else if let Some(rest) = rest.strip_prefix('<') {
        let end = rest.find('>')?;
        Some((&rest[..end], false))
    } else {
        None
    }
}

/// Resolves one `#include` target to a file on disk. A quoted include
/// searches the including file's own directory first, then falls back to
/// `include_dirs` like an angle include, which only ever searches those.
fn resolve_include_path(requested: &str, quoted: bool, own_dir: &Path, include_dirs: &[PathBuf]) -> Option<PathBuf> {
    if quoted {
        let candidate = own_dir.join(requested);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    include_dirs.iter().map(|dir| dir.join(requested)).find(|candidate| candidate.is_file())
}

/// Recursively resolves and parses every file `source` `#include`s into
/// `ctx`, *before* `source` itself is parsed, so types declared in an
/// included file resolve when `source`'s own declarations reference them.
/// Returns the entity handles the included files produced, in include
/// order. `visited` (canonicalized paths) guards against include cycles:
/// a file already seen is silently skipped rather than re-parsed.
fn resolve_includes(
    path: &Path,
    source: &str,
    include_dirs: &[PathBuf],
    ctx: &mut ParseContext,
    visited: &mut HashSet<PathBuf>,
) -> Result<Vec<EntityHandle>, Vec<CompileError>> {
    let own_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let mut included = Vec::new();
    for line in source.lines() {
        let Some((requested, quoted)) = parse_include_target(line) else {
            continue;
        };
        let Some(resolved) = resolve_include_path(requested, quoted, &own_dir, include_dirs) else {
            return Err(vec![CompileError::Internal(format!("cannot find include '{requested}' from {}", path.display()))]);
        };
        let canonical = resolved.canonicalize().unwrap_or_else(|_| resolved.clone());
        if !visited.insert(canonical) {
            continue;
        }
        let included_source = fs::read_to_string(&resolved).map_err(|e| {
            vec![CompileError::Io {
                path: resolved.clone(),
                source: e,
            }]
        })?;
        included.extend(resolve_includes(&resolved, &included_source, include_dirs, ctx, visited)?);

        let (mut p, lex_errors) = parser::Parser::new(&included_source, resolved.clone(), ctx);
        if !lex_errors.is_empty() {
            return Err(lex_errors);
        }
        let (top, errors) = p.parse_file();
        if !errors.is_empty() {
            return Err(errors);
        }
        included.extend(top);
    }
    Ok(included)
}

/// Compiles one file on disk, resolving its `#include`s against
/// `include_dirs` first, writing its outputs under `output_dir` and
/// merging the proxy/stub build descriptor, then returns the interface IDs
/// assigned to every interface found (for callers that want to log or
/// verify them).
pub fn compile_file(
    input: &Path,
    output_dir: &Path,
    emit_proxy_stub: bool,
    cmake_target: Option<&str>,
    include_dirs: &[PathBuf],
) -> Result<Vec<(String, u64)>, Vec<CompileError>> {
    let source = fs::read_to_string(input).map_err(|e| {
        vec![CompileError::Io {
            path: input.to_path_buf(),
            source: e,
        }]
    })?;

    log::debug!("compiling {}", input.display());

    let mut ctx = ParseContext::new();
    let mut visited = HashSet::new();
    if let Ok(canonical) = input.canonicalize() {
        visited.insert(canonical);
    }
    let mut top_level = resolve_includes(input, &source, include_dirs, &mut ctx, &mut visited)?;

    let (mut p, lex_errors) = parser::Parser::new(&source, input.to_path_buf(), &mut ctx);
    if !lex_errors.is_empty() {
        return Err(lex_errors);
    }
    let (top, errors) = p.parse_file();
    if !errors.is_empty() {
        return Err(errors);
    }
    top_level.extend(top);

    let output = render(&ctx, &top_level, input);

    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("generated");
    write_atomic(&output_dir.join(format!("{stem}_defs.h")), &output.definition_header)
        .map_err(|e| vec![CompileError::Io { path: output_dir.to_path_buf(), source: e }])?;

    if emit_proxy_stub {
        write_atomic(&output_dir.join(format!("{stem}_proxy.h")), &output.proxy_header)
            .map_err(|e| vec![CompileError::Io { path: output_dir.to_path_buf(), source: e }])?;
        write_atomic(&output_dir.join(format!("{stem}_stub.h")), &output.stub_header)
            .map_err(|e| vec![CompileError::Io { path: output_dir.to_path_buf(), source: e }])?;
        write_atomic(&output_dir.join(format!("{stem}_serdes.cpp")), &output.serdes_source)
            .map_err(|e| vec![CompileError::Io { path: output_dir.to_path_buf(), source: e }])?;

        if let Some(target) = cmake_target {
            crate::codegen::build_descriptor::generate(output_dir, target, input)
                .map_err(|e| vec![CompileError::Internal(e.to_string())])?;
        }
    }

    let mut ids = Vec::new();
    for handle in &flatten_modules(&output.top_level, &ctx.arena) {
        if matches!(ctx.arena.get(*handle).kind, EntityKind::Interface { .. }) {
            let name = codegen::qualify_name(&ctx.arena.get(*handle).scoped_name, &ctx.symbols);
            let id = interface_id::interface_id(*handle, &ctx.arena, &ctx.symbols);
            log::trace!("interface {name} id={id:#018x}");
            ids.push((name, id));
        }
    }
    Ok(ids)
}

/// Compiles each of `inputs` in sequence into the same `output_dir`
/// (process-level parallelism across files is the caller's
/// responsibility: see §5).
pub fn compile_files(
    inputs: &[PathBuf],
    output_dir: &Path,
    emit_proxy_stub: bool,
    cmake_target: Option<&str>,
    include_dirs: &[PathBuf],
) -> Vec<(PathBuf, Result<Vec<(String, u64)>, Vec<CompileError>>)> {
    inputs
        .iter()
        .map(|input| (input.clone(), compile_file(input, output_dir, emit_proxy_stub, cmake_target, include_dirs)))
        .collect()
}

/// Expands every `module { ... }` in `handles` into its nested members,
/// recursively, so a flat list passed to a generator reaches everything
/// declared at any nesting depth. Non-module handles pass through unchanged.
fn flatten_modules(handles: &[EntityHandle], arena: &crate::entity::EntityArena) -> Vec<EntityHandle> {
    let mut out = Vec::new();
    for &handle in handles {
        match &arena.get(handle).kind {
            EntityKind::Module { members } => {
                out.push(handle);
                out.extend(flatten_modules(members, arena));
            }
            _ => out.push(handle),
        }
    }
    out
}

fn write_atomic(path: &Path, contents: &str) -> std::io::Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    use std::io::Write as _;
    tmp.write_all(contents.as_bytes())?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
