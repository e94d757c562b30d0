//! The proxy emitter (G2, client side): for each operation, serialize the
//! `in`/`inout` parameters, invoke the transport's `do_call`, then
//! deserialize `out`/`inout` parameters and the return value, rethrowing
//! any exception the stub reported.

use crate::entity::{Direction, EntityArena, EntityHandle, EntityKind};
use crate::scope::SymbolTable;

use super::interface_id::interface_id;
use super::{qualify_name, relative_scoped_name, Context};

/// Emits the proxy class for an interface: one method per operation that
/// marshals parameters, calls through the transport, and unmarshals the
/// result.
pub fn emit_proxy(ctx: &mut Context, handle: EntityHandle, arena: &EntityArena, symbols: &SymbolTable) {
    let EntityKind::Interface { members, .. } = &arena.get(handle).kind else {
        return;
    };
    let name = qualify_name(&arena.get(handle).scoped_name, symbols);
    let id = interface_id(handle, arena, symbols);

    ctx.line(format!("class {name}Proxy : public {name}"));
    ctx.line("{");
    ctx.line("public:");
    ctx.indented(|c| {
        c.line(format!("static constexpr uint64_t kInterfaceId = {id:#018x}ULL;"));
        c.blank();
        for member in members {
            if let EntityKind::Operation { return_type, params, raises } = &arena.get(*member).kind {
                emit_operation(c, *member, *return_type, params, raises, &arena.get(handle).scoped_name, arena, symbols);
            }
        }
    });
    ctx.line("};");
}

fn emit_operation(
    ctx: &mut Context,
    handle: EntityHandle,
    return_type: EntityHandle,
    params: &[crate::entity::Param],
    raises: &[EntityHandle],
    current_scope: &[crate::scope::Symbol],
    arena: &EntityArena,
    symbols: &SymbolTable,
) {
    let op_name = qualify_name(&arena.get(handle).scoped_name, symbols);
    let op_name = op_name.rsplit("__").next().unwrap_or(&op_name).to_string();
    let ret_name = relative_scoped_name(return_type, current_scope, arena, symbols);
    let param_list = params
        .iter()
        .map(|p| {
            let ty = relative_scoped_name(p.param_type, current_scope, arena, symbols);
            let name = symbols.resolve(p.name).unwrap_or("param");
            match p.direction {
                Direction::In => format!("const {ty}& {name}"),
                Direction::Out => format!("{ty}& {name}"),
                Direction::Inout => format!("{ty}& {name}"),
            }
        })
        .collect::<Vec<_>>()
        .join(", ");

    ctx.line(format!("{ret_name} {op_name}({param_list}) override"));
    ctx.line("{");
    ctx.indented(|c| {
        c.line("buffer rBuf;");
        for p in params {
            if matches!(p.direction, Direction::In | Direction::Inout) {
                c.line(format!("serialize(rBuf, {});", symbols.resolve(p.name).unwrap_or("param")));
            }
        }
        c.line(format!("do_call(\"{op_name}\", rBuf);"));
        for p in params {
            if matches!(p.direction, Direction::Out | Direction::Inout) {
                c.line(format!("deserialize(rBuf, {});", symbols.resolve(p.name).unwrap_or("param")));
            }
        }
        if !raises.is_empty() {
            c.line("if (rBuf.has_exception()) rBuf.rethrow();");
        }
        if !matches!(&arena.get(return_type).kind, crate::entity::EntityKind::Primitive(crate::entity::PrimitiveKind::Void)) {
            c.line("return deserialize_return<decltype(auto)>(rBuf);");
        }
    });
    ctx.line("}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_file;
    use std::path::Path;

    #[test]
    fn emits_proxy_class_with_interface_id_constant() {
        let src = "interface Foo { void Bar(in long x, out long y); };";
        let (ctx, top) = parse_file(src, Path::new("t.idl")).unwrap();
        let mut out = Context::new(4);
        emit_proxy(&mut out, top[0], &ctx.arena, &ctx.symbols);
        let rendered = out.finish();
        assert!(rendered.contains("class FooProxy"));
        assert!(rendered.contains("kInterfaceId"));
        assert!(rendered.contains("serialize(rBuf, x)"));
        assert!(rendered.contains("deserialize(rBuf, y)"));
    }
}
