//! The stub emitter (G2, server side): a dispatch table keyed by operation
//! name that deserializes parameters, invokes the target implementation,
//! catches declared exceptions, and serializes the result.

use crate::entity::{Direction, EntityArena, EntityHandle, EntityKind};
use crate::scope::SymbolTable;

use super::{qualify_name, relative_scoped_name, Context};

/// Emits the stub class for an interface: a `dispatch` method that
/// switches on the incoming operation name.
pub fn emit_stub(ctx: &mut Context, handle: EntityHandle, arena: &EntityArena, symbols: &SymbolTable) {
    let EntityKind::Interface { members, .. } = &arena.get(handle).kind else {
        return;
    };
    let name = qualify_name(&arena.get(handle).scoped_name, symbols);

    ctx.line(format!("class {name}Stub"));
    ctx.line("{");
    ctx.line("public:");
    ctx.indented(|c| {
        c.line(format!("explicit {name}Stub({name}& rTarget) : m_rTarget(rTarget) {{}}"));
        c.blank();
        c.line("void dispatch(const std::string& ssOperation, buffer& rBuf)");
        c.line("{");
        c.indented(|c2| {
            c2.line("if (false) {}");
            for member in members {
                if let EntityKind::Operation { params, raises, .. } = &arena.get(*member).kind {
                    emit_case(c2, *member, params, raises, &arena.get(handle).scoped_name, arena, symbols);
                }
            }
            c2.line("else throw std::runtime_error(\"unknown operation: \" + ssOperation);");
        });
        c.line("}");
    });
    ctx.line("private:");
    ctx.indented(|c| c.line(format!("{name}& m_rTarget;")));
    ctx.line("};");
}

fn emit_case(
    ctx: &mut Context,
    handle: EntityHandle,
    params: &[crate::entity::Param],
    raises: &[EntityHandle],
    current_scope: &[crate::scope::Symbol],
    arena: &EntityArena,
    symbols: &SymbolTable,
) {
    let full = qualify_name(&arena.get(handle).scoped_name, symbols);
    let op_name = full.rsplit("__").next().unwrap_or(&full).to_string();

    ctx.line(format!("else if (ssOperation == \"{op_name}\")"));
    ctx.line("{");
    ctx.indented(|c| {
        for p in params {
            let ty = relative_scoped_name(p.param_type, current_scope, arena, symbols);
            let name = symbols.resolve(p.name).unwrap_or("param");
            c.line(format!("{ty} {name};"));
            if matches!(p.direction, Direction::In | Direction::Inout) {
                c.line(format!("deserialize(rBuf, {name});"));
            }
        }
        if raises.is_empty() {
            emit_invoke(c, &op_name, params, symbols);
        } else {
            c.line("try");
            c.line("{");
            c.indented(|c2| emit_invoke(c2, &op_name, params, symbols));
            c.line("}");
            for exc in raises {
                let exc_name = relative_scoped_name(*exc, current_scope, arena, symbols);
                c.line(format!("catch (const {exc_name}& e) {{ rBuf.set_exception(e); }}"));
            }
        }
        for p in params {
            if matches!(p.direction, Direction::Out | Direction::Inout) {
                c.line(format!("serialize(rBuf, {});", symbols.resolve(p.name).unwrap_or("param")));
            }
        }
    });
    ctx.line("}");
}

fn emit_invoke(ctx: &mut Context, op_name: &str, params: &[crate::entity::Param], symbols: &SymbolTable) {
    let args = params.iter().map(|p| symbols.resolve(p.name).unwrap_or("param").to_string()).collect::<Vec<_>>().join(", ");
    ctx.line(format!("m_rTarget.{op_name}({args});"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_file;
    use std::path::Path;

    #[test]
    fn emits_dispatch_table_with_one_branch_per_operation() {
        let src = "interface Foo { void Bar(in long x); void Baz(); };";
        let (ctx, top) = parse_file(src, Path::new("t.idl")).unwrap();
        let mut out = Context::new(4);
        emit_stub(&mut out, top[0], &ctx.arena, &ctx.symbols);
        let rendered = out.finish();
        assert!(rendered.contains("class FooStub"));
        assert!(rendered.contains("ssOperation == \"Bar\""));
        assert!(rendered.contains("ssOperation == \"Baz\""));
        assert!(rendered.contains("unknown operation"));
    }

    #[test]
    fn operation_with_raises_gets_a_try_catch() {
        let src = "exception Oops { long code; }; interface Foo { void Bar() raises(Oops); };";
        let (ctx, top) = parse_file(src, Path::new("t.idl")).unwrap();
        let mut out = Context::new(4);
        emit_stub(&mut out, top[1], &ctx.arena, &ctx.symbols);
        let rendered = out.finish();
        assert!(rendered.contains("catch (const Oops& e)"));
    }
}
