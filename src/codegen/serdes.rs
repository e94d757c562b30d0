//! The serdes emitter (G3): `calc_size`/`serialize`/`deserialize` bodies.
//!
//! Grounded on `examples/original_source/.../generator/serdes_generator.cpp`
//! (grepped for call patterns): union members are accessed through the
//! same `get_switch[_<member>]`/`switch_to[_<member>]` names G1 computes,
//! embedded inside a `switch (...)` block keyed on the discriminant.
//! Arrays are wrapped in a `for` loop over each dimension; sequences carry
//! a length prefix ahead of their elements.

use crate::entity::{EntityArena, EntityHandle, EntityKind, SwitchKind};
use crate::scope::SymbolTable;

use super::definition::switch_groups;
use super::{qualify_name, relative_scoped_name, Context};

/// Which serdes pass is being rendered; the three share one traversal
/// shape but differ in what they emit at the leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    CalcSize,
    Serialize,
    Deserialize,
}

/// Emits the body of one serdes function for `handle` (a struct, union, or
/// exception) into `ctx`, appropriate to `pass`.
pub fn emit_serdes(ctx: &mut Context, pass: Pass, handle: EntityHandle, arena: &EntityArena, symbols: &SymbolTable) {
    let name = qualify_name(&arena.get(handle).scoped_name, symbols);
    let fn_name = match pass {
        Pass::CalcSize => "calc_size",
        Pass::Serialize => "serialize",
        Pass::Deserialize => "deserialize",
    };
    let signature = match pass {
        Pass::CalcSize => format!("size_t {name}_{fn_name}(const {name}& rVar)"),
        Pass::Serialize => format!("void {name}_{fn_name}(buffer& rBuf, const {name}& rVar)"),
        Pass::Deserialize => format!("void {name}_{fn_name}(buffer& rBuf, {name}& rVar)"),
    };
    let current_scope = &arena.get(handle).scoped_name;
    ctx.line(signature);
    ctx.line("{");
    ctx.indented(|c| match &arena.get(handle).kind {
        EntityKind::Struct { members } | EntityKind::Exception { members, .. } => {
            for member in members {
                emit_member(c, pass, "rVar", symbols.resolve(member.name).unwrap_or("member"), member.member_type, current_scope, arena, symbols);
            }
        }
        EntityKind::Union { switch, cases } => {
            let groups = switch_groups(switch, cases, arena, symbols);
            match switch {
                SwitchKind::TypeBased { discriminant_type } => {
                    emit_member(c, pass, "rVar", "switch_value", *discriminant_type, current_scope, arena, symbols)
                }
                SwitchKind::VariableBased { variable } => {
                    let var_name = relative_scoped_name(*variable, current_scope, arena, symbols);
                    c.line(format!("// discriminant shared with {var_name}"));
                }
            }
            c.line("switch (rVar.switch_value)");
            c.line("{");
            c.indented(|c2| {
                for (case, group) in cases.iter().zip(&groups) {
                    if case.is_default {
                        c2.line("default:");
                    } else {
                        for label in &case.labels {
                            c2.line(format!("case {label}:"));
                        }
                    }
                    c2.indented(|c3| {
                        let arm_ty = relative_scoped_name(case.member_type, current_scope, arena, symbols);
                        match switch {
                            SwitchKind::TypeBased { .. } => match pass {
                                Pass::CalcSize => c3.line(format!("size += sizeof({arm_ty});")),
                                Pass::Serialize => c3.line(format!("rBuf.write(rVar.get_switch<{arm_ty}>());")),
                                Pass::Deserialize => {
                                    c3.line(format!("rVar.{}(rVar.switch_value);", group.switch_to));
                                    c3.line(format!("rBuf.read(rVar.get_switch<{arm_ty}>());"));
                                }
                            },
                            SwitchKind::VariableBased { .. } => match pass {
                                Pass::CalcSize => c3.line(format!("size += sizeof(rVar.{}());", group.get_switch)),
                                Pass::Serialize => c3.line(format!("rBuf.write(rVar.{}());", group.get_switch)),
                                Pass::Deserialize => {
                                    c3.line(format!("rVar.{}();", group.switch_to));
                                    c3.line(format!("rBuf.read(rVar.{}());", group.get_switch));
                                }
                            },
                        }
                        c3.line("break;");
                    });
                }
            });
            c.line("}");
        }
        _ => {}
    });
    ctx.line("}");
}

fn emit_member(
    ctx: &mut Context,
    pass: Pass,
    var: &str,
    field: &str,
    ty: EntityHandle,
    current_scope: &[crate::scope::Symbol],
    arena: &EntityArena,
    symbols: &SymbolTable,
) {
    match &arena.get(ty).kind {
        EntityKind::Sequence { element, .. } => {
            let elem_name = relative_scoped_name(*element, current_scope, arena, symbols);
            match pass {
                Pass::CalcSize => ctx.line(format!("size += sizeof(uint32_t) + {var}.{field}.size() * sizeof({elem_name});")),
                Pass::Serialize => {
                    ctx.line(format!("rBuf.write_u32(static_cast<uint32_t>({var}.{field}.size()));"));
                    ctx.line(format!("for (const auto& elem : {var}.{field}) rBuf.write(elem);"));
                }
                Pass::Deserialize => {
                    ctx.line("auto len = rBuf.read_u32();".to_string());
                    ctx.line(format!("{var}.{field}.resize(len);"));
                    ctx.line(format!("for (auto& elem : {var}.{field}) rBuf.read(elem);"));
                }
            }
        }
        _ => match pass {
            Pass::CalcSize => ctx.line(format!("size += sizeof({var}.{field});")),
            Pass::Serialize => ctx.line(format!("rBuf.write({var}.{field});")),
            Pass::Deserialize => ctx.line(format!("rBuf.read({var}.{field});")),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_file;
    use std::path::Path;

    #[test]
    fn emits_calc_size_for_a_struct() {
        let (ctx, top) = parse_file("struct Point { long x; long y; };", Path::new("t.idl")).unwrap();
        let mut out = Context::new(4);
        emit_serdes(&mut out, Pass::CalcSize, top[0], &ctx.arena, &ctx.symbols);
        let rendered = out.finish();
        assert!(rendered.contains("calc_size"));
        assert!(rendered.contains("rVar.x"));
        assert!(rendered.contains("rVar.y"));
    }

    #[test]
    fn emits_switch_dispatch_for_a_union() {
        let src = "union U switch(long) { case 1: long a; default: octet b; };";
        let (ctx, top) = parse_file(src, Path::new("t.idl")).unwrap();
        let mut out = Context::new(4);
        emit_serdes(&mut out, Pass::Serialize, top[0], &ctx.arena, &ctx.symbols);
        let rendered = out.finish();
        assert!(rendered.contains("switch (rVar.switch_value)"));
        assert!(rendered.contains("case 1:"));
        assert!(rendered.contains("default:"));
        assert!(rendered.contains("get_switch"));
    }

    #[test]
    fn sequence_member_gets_length_prefixed_serdes() {
        let src = "struct Batch { sequence<long> items; };";
        let (ctx, top) = parse_file(src, Path::new("t.idl")).unwrap();
        let mut out = Context::new(4);
        emit_serdes(&mut out, Pass::Deserialize, top[0], &ctx.arena, &ctx.symbols);
        let rendered = out.finish();
        assert!(rendered.contains("read_u32"));
        assert!(rendered.contains("resize"));
    }
}
