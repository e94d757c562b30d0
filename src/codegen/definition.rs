//! The definition emitter (G1): renders type-definition headers, the
//! hardest part of which is lowering `union switch(...)` into a concrete
//! class with real per-arm storage, a working constructor/destructor/copy/
//! move set, and accessor bodies.
//!
//! Grounded on `examples/original_source/.../generator/definition_generator.cpp`
//! (read via targeted greps for naming conventions, since the full file
//! wasn't part of the retrieved index): the discriminant of a type-based
//! union is generated as a field literally named `switch_value`; accessors
//! are `switch_to_<member>`/`get_switch_<member>` for variable-based
//! unions and unqualified `switch_to`/`get_switch` for type-based ones;
//! helper functions `construct_<member>`/`destruct_<member>` placement-new
//! and explicitly destroy the active arm; and when the switch variable
//! lives in a different container than the union, that container gets a
//! `friend class <Union>;` line spliced into its own definition (see
//! [`collect_friend_requirements`]).

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::entity::{EntityArena, EntityHandle, EntityKind, PreprocessorDirective, StructMember, SwitchKind, UnionCase};
use crate::scope::SymbolTable;
use crate::value::{ArraySize, ValueNode};

use super::{qualify_name, relative_scoped_name, Context};

/// One union member's generated helper-function names, grouped so the
/// serdes emitter (G3) can reuse them without recomputing the naming rule.
#[derive(Debug, Clone)]
pub struct SwitchGroup {
    /// `switch_to_<member>` (variable-based) or `switch_to` (type-based,
    /// only ever one such name per union).
    pub switch_to: String,
    /// `get_switch_<member>` or `get_switch`.
    pub get_switch: String,
    /// `construct_<member>`.
    pub construct: String,
    /// `destruct_<member>`.
    pub destruct: String,
}

fn member_name(symbols: &SymbolTable, case: &UnionCase) -> String {
    symbols.resolve(case.member).unwrap_or("member").to_string()
}

/// Computes the naming for every case of a union, per the variable-based
/// vs. type-based distinction in `SwitchKind`.
pub fn switch_groups(switch: &SwitchKind, cases: &[UnionCase], arena: &EntityArena, symbols: &SymbolTable) -> Vec<SwitchGroup> {
    let variable_based = matches!(switch, SwitchKind::VariableBased { .. });
    cases
        .iter()
        .map(|case| {
            let name = member_name(symbols, case);
            if variable_based {
                SwitchGroup {
                    switch_to: format!("switch_to_{name}"),
                    get_switch: format!("get_switch_{name}"),
                    construct: format!("construct_{name}"),
                    destruct: format!("destruct_{name}"),
                }
            } else {
                SwitchGroup {
                    switch_to: "switch_to".to_string(),
                    get_switch: "get_switch".to_string(),
                    construct: format!("construct_{name}"),
                    destruct: format!("destruct_{name}"),
                }
            }
        })
        .collect()
}

/// True if the union needs a full constructor/destructor/copy/move set
/// generated, i.e. at least one arm has a non-trivial (complex) type:
/// `SetConstructionNeeded`/`NeedsConstruction` in the original.
pub fn needs_construction(cases: &[UnionCase], arena: &EntityArena) -> bool {
    cases.iter().any(|c| !c.array_dims.is_empty() || is_complex_type(c.member_type, arena))
}

fn is_complex_type(handle: EntityHandle, arena: &EntityArena) -> bool {
    matches!(
        &arena.get(handle).kind,
        EntityKind::Struct { .. } | EntityKind::Union { .. } | EntityKind::Sequence { .. } | EntityKind::Exception { .. }
    )
}

/// Scans every entity in `arena` for variable-based unions whose switch
/// variable lives in a different container, and maps each such container to
/// the qualified names of the union classes it must declare as friends.
///
/// The container holding the switch variable is the one whose private (or
/// protected) member the union's accessors actually reach into, so it's the
/// container's own definition that needs the `friend` line, not the union's.
pub fn collect_friend_requirements(arena: &EntityArena, symbols: &SymbolTable) -> HashMap<EntityHandle, Vec<String>> {
    let mut map: HashMap<EntityHandle, Vec<String>> = HashMap::new();
    for i in 0..arena.len() {
        let handle = EntityHandle::from_raw(i as u32);
        if let EntityKind::Union { switch: SwitchKind::VariableBased { variable }, .. } = &arena.get(handle).kind {
            if let Some(container) = arena.get(*variable).parent {
                let union_name = qualify_name(&arena.get(handle).scoped_name, symbols);
                let names = map.entry(container).or_default();
                if !names.contains(&union_name) {
                    names.push(union_name);
                }
            }
        }
    }
    map
}

/// Emits the C++-shaped definition for one entity into `ctx`. Dispatches
/// by `EntityKind`; unsupported kinds (primitives, modules) are no-ops,
/// since they don't themselves produce a type definition.
pub fn emit_definition(ctx: &mut Context, handle: EntityHandle, arena: &EntityArena, symbols: &SymbolTable) {
    let data = arena.get(handle);
    let name = qualify_name(&data.scoped_name, symbols);
    let scope = data.scoped_name.clone();
    match &data.kind {
        EntityKind::Struct { members } => {
            let friends = collect_friend_requirements(arena, symbols).remove(&handle).unwrap_or_default();
            emit_struct(ctx, &name, members, &friends, &scope, arena, symbols)
        }
        EntityKind::Exception { members, description } => {
            let friends = collect_friend_requirements(arena, symbols).remove(&handle).unwrap_or_default();
            emit_exception(ctx, &name, members, description, &friends, &scope, arena, symbols)
        }
        EntityKind::Enum { enumerators } => emit_enum(ctx, &name, enumerators, symbols),
        EntityKind::Union { switch, cases } => emit_union(ctx, &name, switch, cases, &scope, arena, symbols),
        EntityKind::Typedef { target, array_dims } => emit_typedef(ctx, &name, *target, array_dims, &scope, arena, symbols),
        EntityKind::Verbatim(text) => emit_verbatim(ctx, text),
        EntityKind::Preprocessor(directive) => emit_preprocessor(ctx, directive),
        _ => {}
    }
}

/// Re-indents a `%{ ... %}` passthrough block to column zero and writes
/// it through unmodified otherwise, ignoring the surrounding container's
/// indentation.
fn emit_verbatim(ctx: &mut Context, text: &str) {
    ctx.raw_line(super::smart_indent(text, 0));
}

/// `#include "x.idl"` becomes `#include "x.h"`; `#include <x>`, `#define`
/// and `#undef` pass through unchanged other than the directive keyword.
fn emit_preprocessor(ctx: &mut Context, directive: &PreprocessorDirective) {
    match directive {
        PreprocessorDirective::IncludeLocal(path) => {
            let header = path.strip_suffix(".idl").map(|stem| format!("{stem}.h")).unwrap_or_else(|| path.clone());
            ctx.line(format!("#include \"{header}\""));
        }
        PreprocessorDirective::IncludeSystem(path) => ctx.line(format!("#include <{path}>")),
        PreprocessorDirective::Define(text) => ctx.line(format!("#define {text}")),
        PreprocessorDirective::Undef(text) => ctx.line(format!("#undef {text}")),
    }
}

fn type_name(handle: EntityHandle, current_scope: &[crate::scope::Symbol], arena: &EntityArena, symbols: &SymbolTable) -> String {
    relative_scoped_name(handle, current_scope, arena, symbols)
}

/// Renders a member's array dimensions, outermost first, as a trailing
/// `[n]...` suffix. Only constant-sized dimensions render a literal bound;
/// dynamic or undefined ones are left for the member's type to express.
fn array_suffix(dims: &[ValueNode]) -> String {
    let mut suffix = String::new();
    for dim in dims {
        if let ValueNode::Array(a) = dim {
            match &a.size {
                ArraySize::Fixed(n) => {
                    let _ = write!(suffix, "[{n}]");
                }
                ArraySize::FixedUnbound => suffix.push_str("[]"),
                _ => {}
            }
        }
    }
    suffix
}

/// Renders a member initializer as a brace-enclosed C++ literal, recursing
/// through nested arrays/compounds. Dynamic scalars re-emit their original
/// expression text verbatim.
fn render_initializer(node: &ValueNode) -> String {
    match node {
        ValueNode::Scalar(s) => {
            if let Some(fixed) = &s.fixed {
                fixed.to_string()
            } else {
                s.dynamic_expr.clone().unwrap_or_default()
            }
        }
        ValueNode::Array(a) => {
            let inner: Vec<String> = a.elements.iter().map(render_initializer).collect();
            format!("{{ {} }}", inner.join(", "))
        }
        ValueNode::Compound(c) => {
            let inner: Vec<String> = c.members.iter().map(|(_, v)| render_initializer(v)).collect();
            format!("{{ {} }}", inner.join(", "))
        }
        _ => String::new(),
    }
}

fn emit_member_decl(
    ctx: &mut Context,
    member: &StructMember,
    current_scope: &[crate::scope::Symbol],
    arena: &EntityArena,
    symbols: &SymbolTable,
) {
    let ty = type_name(member.member_type, current_scope, arena, symbols);
    let suffix = array_suffix(&member.array_dims);
    let field = symbols.resolve(member.name).unwrap_or("member");
    match &member.initializer {
        Some(value) => ctx.line(format!("{ty} {field}{suffix} = {};", render_initializer(value))),
        None => ctx.line(format!("{ty} {field}{suffix};")),
    }
}

fn emit_struct(
    ctx: &mut Context,
    name: &str,
    members: &[StructMember],
    friends: &[String],
    current_scope: &[crate::scope::Symbol],
    arena: &EntityArena,
    symbols: &SymbolTable,
) {
    ctx.line(format!("struct {name}"));
    ctx.line("{");
    ctx.indented(|c| {
        for friend in friends {
            c.line(format!("friend class {friend};"));
        }
        for member in members {
            emit_member_decl(c, member, current_scope, arena, symbols);
        }
    });
    ctx.line("};");
}

fn emit_exception(
    ctx: &mut Context,
    name: &str,
    members: &[StructMember],
    description: &str,
    friends: &[String],
    current_scope: &[crate::scope::Symbol],
    arena: &EntityArena,
    symbols: &SymbolTable,
) {
    ctx.line(format!("class {name} : public std::exception"));
    ctx.line("{");
    ctx.line("public:");
    ctx.indented(|c| {
        for friend in friends {
            c.line(format!("friend class {friend};"));
        }
        for member in members {
            emit_member_decl(c, member, current_scope, arena, symbols);
        }
        c.line(format!("const char* what() const noexcept override {{ return \"{description}\"; }}"));
    });
    ctx.line("};");
}

fn emit_enum(ctx: &mut Context, name: &str, enumerators: &[crate::scope::Symbol], symbols: &SymbolTable) {
    ctx.line(format!("enum class {name}"));
    ctx.line("{");
    ctx.indented(|c| {
        for e in enumerators {
            c.line(format!("{},", symbols.resolve(*e).unwrap_or("value")));
        }
    });
    ctx.line("};");
}

fn emit_typedef(
    ctx: &mut Context,
    name: &str,
    target: EntityHandle,
    array_dims: &[crate::value::ValueNode],
    current_scope: &[crate::scope::Symbol],
    arena: &EntityArena,
    symbols: &SymbolTable,
) {
    let suffix = array_suffix(array_dims);
    ctx.line(format!("using {name} = {}{suffix};", type_name(target, current_scope, arena, symbols)));
}

fn arm_type_name(case: &UnionCase, current_scope: &[crate::scope::Symbol], arena: &EntityArena, symbols: &SymbolTable) -> String {
    let mut ty = type_name(case.member_type, current_scope, arena, symbols);
    for dim in case.array_dims.iter().rev() {
        if let ValueNode::Array(a) = dim {
            if let ArraySize::Fixed(n) = a.size {
                ty = format!("std::array<{ty}, {n}>");
            }
        }
    }
    ty
}

fn discriminant_type_name(switch: &SwitchKind, current_scope: &[crate::scope::Symbol], arena: &EntityArena, symbols: &SymbolTable) -> String {
    match switch {
        SwitchKind::TypeBased { discriminant_type } => type_name(*discriminant_type, current_scope, arena, symbols),
        SwitchKind::VariableBased { variable } => match &arena.get(*variable).kind {
            EntityKind::Attribute { attr_type, .. } => type_name(*attr_type, current_scope, arena, symbols),
            _ => type_name(*variable, current_scope, arena, symbols),
        },
    }
}

fn emit_case_labels(ctx: &mut Context, case: &UnionCase) {
    if case.is_default {
        ctx.line("default:");
    } else {
        for label in &case.labels {
            ctx.line(format!("case {label}:"));
        }
    }
}

/// Lowers a `union switch(...)` definition into a concrete class with real
/// per-arm storage and a full set of special members, the way a hand-rolled
/// tagged union is written in C++: an anonymous `Storage` union holds every
/// arm, `construct_<member>`/`destruct_<member>` run the arm's placement-new
/// and explicit destructor call, and `construct_active`/`destruct_active`
/// dispatch those by the live discriminant so the default/copy/move/dtor
/// set never has to repeat the per-case `switch`.
///
/// Type-based unions get one unqualified `switch_to`/`get_switch` pair
/// shared across every case (the discriminant alone says which arm is
/// live); variable-based unions get a `switch_to_<member>`/`get_switch_<member>`
/// pair per case, since the discriminant lives in a sibling container and
/// carries no case labels of its own to switch over. A variable-based
/// union's accessors reach into that sibling container's switch variable,
/// so the container (not the union) needs the `friend class <union>;`
/// declaration; [`collect_friend_requirements`] splices it into the
/// container's own definition.
fn emit_union(
    ctx: &mut Context,
    name: &str,
    switch: &SwitchKind,
    cases: &[UnionCase],
    current_scope: &[crate::scope::Symbol],
    arena: &EntityArena,
    symbols: &SymbolTable,
) {
    let groups = switch_groups(switch, cases, arena, symbols);
    let disc_ty = discriminant_type_name(switch, current_scope, arena, symbols);
    let arm_types: Vec<String> = cases.iter().map(|c| arm_type_name(c, current_scope, arena, symbols)).collect();
    let member_names: Vec<String> = cases.iter().map(|c| member_name(symbols, c)).collect();
    let variable_based = matches!(switch, SwitchKind::VariableBased { .. });

    ctx.line(format!("class {name}"));
    ctx.line("{");
    ctx.line("public:");
    ctx.indented(|c| {
        let default_member = member_names.first().cloned().unwrap_or_default();
        let default_label = cases.first().and_then(|c| c.labels.first()).map(|l| l.to_string()).unwrap_or_else(|| "0".to_string());

        c.line(format!("{name}()"));
        c.line("{");
        c.indented(|c2| {
            c2.line(format!("switch_value = {default_label};"));
            c2.line(format!("construct_{default_member}();"));
        });
        c.line("}");
        c.blank();

        c.line(format!("{name}(const {name}& other)"));
        c.line("{");
        c.indented(|c2| {
            c2.line("switch_value = other.switch_value;");
            c2.line("construct_active_from(other);");
        });
        c.line("}");
        c.blank();

        c.line(format!("{name}({name}&& other) noexcept"));
        c.line("{");
        c.indented(|c2| {
            c2.line("switch_value = other.switch_value;");
            c2.line("construct_active_from(other);");
        });
        c.line("}");
        c.blank();

        c.line(format!("~{name}()"));
        c.line("{");
        c.indented(|c2| c2.line("destruct_active();"));
        c.line("}");
        c.blank();

        c.line(format!("{name}& operator=(const {name}& other)"));
        c.line("{");
        c.indented(|c2| {
            c2.line("if (this != &other)");
            c2.line("{");
            c2.indented(|c3| {
                c3.line("destruct_active();");
                c3.line("switch_value = other.switch_value;");
                c3.line("construct_active_from(other);");
            });
            c2.line("}");
            c2.line("return *this;");
        });
        c.line("}");
        c.blank();

        c.line(format!("{name}& operator=({name}&& other) noexcept"));
        c.line("{");
        c.indented(|c2| {
            c2.line("if (this != &other)");
            c2.line("{");
            c2.indented(|c3| {
                c3.line("destruct_active();");
                c3.line("switch_value = other.switch_value;");
                c3.line("construct_active_from(other);");
            });
            c2.line("}");
            c2.line("return *this;");
        });
        c.line("}");
        c.blank();

        c.line(format!("{disc_ty} switch_value;"));
        c.blank();

        if variable_based {
            for ((case, group), (member, ty)) in cases.iter().zip(&groups).zip(member_names.iter().zip(&arm_types)) {
                let label = case.labels.first().map(|l| l.to_string()).unwrap_or_else(|| "0".to_string());
                c.line(format!("void {}()", group.switch_to));
                c.line("{");
                c.indented(|c2| {
                    c2.line("destruct_active();");
                    c2.line(format!("switch_value = {label};"));
                    c2.line(format!("construct_{member}();"));
                });
                c.line("}");
                c.line(format!("const {ty}& {}() const", group.get_switch));
                c.line("{");
                c.indented(|c2| c2.line(format!("return m_storage.{member};")));
                c.line("}");
                c.line(format!("{ty}& {}()", group.get_switch));
                c.line("{");
                c.indented(|c2| c2.line(format!("return m_storage.{member};")));
                c.line("}");
                c.blank();
            }
        } else {
            c.line(format!("void switch_to({disc_ty} label)"));
            c.line("{");
            c.indented(|c2| {
                c2.line("destruct_active();");
                c2.line("switch_value = label;");
                c2.line("construct_active();");
            });
            c.line("}");
            c.blank();
            c.line("template <typename T>");
            c.line("const T& get_switch() const");
            c.line("{");
            c.indented(|c2| c2.line("return *reinterpret_cast<const T*>(&m_storage);"));
            c.line("}");
            c.line("template <typename T>");
            c.line("T& get_switch()");
            c.line("{");
            c.indented(|c2| c2.line("return *reinterpret_cast<T*>(&m_storage);"));
            c.line("}");
            c.blank();
        }
    });
    ctx.line("");
    ctx.line("private:");
    ctx.indented(|c| {
        c.line("union Storage");
        c.line("{");
        c.indented(|c2| {
            c2.line("Storage() {}");
            c2.line("~Storage() {}");
            for (member, ty) in member_names.iter().zip(&arm_types) {
                c2.line(format!("{ty} {member};"));
            }
        });
        c.line("} m_storage;");
        c.blank();

        for (member, ty) in member_names.iter().zip(&arm_types) {
            c.line(format!("void construct_{member}()"));
            c.line("{");
            c.indented(|c2| c2.line(format!("new (&m_storage.{member}) {ty}();")));
            c.line("}");
            c.line(format!("void construct_{member}(const {ty}& value)"));
            c.line("{");
            c.indented(|c2| c2.line(format!("new (&m_storage.{member}) {ty}(value);")));
            c.line("}");
            c.line(format!("void destruct_{member}()"));
            c.line("{");
            c.indented(|c2| c2.line(format!("m_storage.{member}.~{ty}();")));
            c.line("}");
            c.blank();
        }

        c.line("void construct_active()");
        c.line("{");
        c.indented(|c2| {
            c2.line("switch (switch_value)");
            c2.line("{");
            c2.indented(|c3| {
                for (case, member) in cases.iter().zip(&member_names) {
                    emit_case_labels(c3, case);
                    c3.indented(|c4| {
                        c4.line(format!("construct_{member}();"));
                        c4.line("break;");
                    });
                }
            });
            c2.line("}");
        });
        c.line("}");
        c.blank();

        c.line(format!("void construct_active_from(const {name}& other)"));
        c.line("{");
        c.indented(|c2| {
            c2.line("switch (other.switch_value)");
            c2.line("{");
            c2.indented(|c3| {
                for (case, member) in cases.iter().zip(&member_names) {
                    emit_case_labels(c3, case);
                    c3.indented(|c4| {
                        c4.line(format!("construct_{member}(other.m_storage.{member});"));
                        c4.line("break;");
                    });
                }
            });
            c2.line("}");
        });
        c.line("}");
        c.blank();

        c.line("void destruct_active()");
        c.line("{");
        c.indented(|c2| {
            c2.line("switch (switch_value)");
            c2.line("{");
            c2.indented(|c3| {
                for (case, member) in cases.iter().zip(&member_names) {
                    emit_case_labels(c3, case);
                    c3.indented(|c4| {
                        c4.line(format!("destruct_{member}();"));
                        c4.line("break;");
                    });
                }
            });
            c2.line("}");
        });
        c.line("}");
    });
    ctx.line("};");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_file;
    use std::path::Path;

    fn emit(src: &str) -> String {
        let (ctx, top) = parse_file(src, Path::new("t.idl")).unwrap();
        let mut out = Context::new(4);
        for h in &top {
            emit_definition(&mut out, *h, &ctx.arena, &ctx.symbols);
        }
        out.finish()
    }

    #[test]
    fn emits_struct_members() {
        let rendered = emit("struct Point { long x; long y; };");
        assert!(rendered.contains("struct Point"));
        assert!(rendered.contains("x;"));
        assert!(rendered.contains("y;"));
    }

    #[test]
    fn emits_enum_class() {
        let rendered = emit("enum Color { Red, Green };");
        assert!(rendered.contains("enum class Color"));
        assert!(rendered.contains("Red,"));
    }

    #[test]
    fn type_based_union_gets_inline_switch_value_and_unqualified_accessors() {
        let rendered = emit("union U switch(long) { case 1: long a; default: octet b; };");
        assert!(rendered.contains("switch_value"));
        assert!(rendered.contains("switch_to("));
        assert!(rendered.contains("get_switch("));
        assert!(rendered.contains("construct_a"));
        assert!(rendered.contains("destruct_a"));
    }

    #[test]
    fn variable_based_union_gets_qualified_accessors() {
        let src = "interface I { attribute long count; union U switch(count) { case 1: long a; }; };";
        let (ctx, top) = parse_file(src, Path::new("t.idl")).unwrap();
        let EntityKind::Interface { members, .. } = &ctx.arena.get(top[0]).kind else {
            panic!("expected interface");
        };
        let mut out = Context::new(4);
        emit_definition(&mut out, members[1], &ctx.arena, &ctx.symbols);
        let rendered = out.finish();
        assert!(rendered.contains("switch_to_a"));
        assert!(rendered.contains("get_switch_a"));
    }

    #[test]
    fn variable_based_union_registers_its_container_as_needing_friend_access() {
        let src = "interface I { attribute long count; union U switch(count) { case 1: long a; }; };";
        let (ctx, top) = parse_file(src, Path::new("t.idl")).unwrap();
        let requirements = collect_friend_requirements(&ctx.arena, &ctx.symbols);
        assert_eq!(requirements.get(&top[0]).map(Vec::as_slice), Some(["U".to_string()].as_slice()));
    }

    #[test]
    fn exception_gets_default_description_when_none_supplied() {
        let rendered = emit("exception Oops { long code; };");
        assert!(rendered.contains("Oops exception"));
    }

    #[test]
    fn verbatim_block_is_copied_through_unmodified() {
        let rendered = emit("%{ extern \"C\" void hook(); %}");
        assert!(rendered.contains("extern \"C\" void hook();"));
    }
}
