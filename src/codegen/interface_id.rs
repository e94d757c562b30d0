//! Interface-ID normalization and hashing (§4.9).
//!
//! The wire contract needs a stable 64-bit ID per interface that changes
//! exactly when the interface's observable shape changes: adding/removing
//! an operation, changing a parameter's type/direction/name, changing
//! exceptions, reordering parameters, or reordering operations. The
//! signature string built here is intentionally over-inclusive (it encodes
//! more than strictly required) rather than risk silently colliding two
//! interfaces that differ in a way a consumer cares about: matching the
//! taxonomy exercised by
//! `examples/original_source/tests/unit_tests/idl_compiler/generator_interface_id_test.cpp`.

use std::hash::Hasher;

use crate::entity::{Direction, EntityArena, EntityHandle, EntityKind};
use crate::scope::SymbolTable;

/// Builds the canonical signature string for an interface: its qualified
/// name, each base interface's qualified name (in declaration order), and
/// each operation's full signature (name, parameter list, return type,
/// raises list) in declaration order.
pub fn canonical_signature(handle: EntityHandle, arena: &EntityArena, symbols: &SymbolTable) -> String {
    let mut out = String::new();
    write_entity_name(&mut out, handle, arena, symbols);

    let EntityKind::Interface { bases, members, .. } = &arena.get(handle).kind else {
        return out;
    };

    out.push('|');
    for base in bases {
        write_entity_name(&mut out, *base, arena, symbols);
        out.push(',');
    }

    out.push('|');
    for member in members {
        write_member_signature(&mut out, *member, arena, symbols);
        out.push(';');
    }

    out
}

fn write_entity_name(out: &mut String, handle: EntityHandle, arena: &EntityArena, symbols: &SymbolTable) {
    let scoped = &arena.get(handle).scoped_name;
    for (i, sym) in scoped.iter().enumerate() {
        if i != 0 {
            out.push_str("::");
        }
        out.push_str(symbols.resolve(*sym).unwrap_or("?"));
    }
}

fn write_member_signature(out: &mut String, handle: EntityHandle, arena: &EntityArena, symbols: &SymbolTable) {
    match &arena.get(handle).kind {
        EntityKind::Operation { return_type, params, raises } => {
            write_entity_name(out, *return_type, arena, symbols);
            out.push(' ');
            write_entity_name(out, handle, arena, symbols);
            out.push('(');
            for (i, p) in params.iter().enumerate() {
                if i != 0 {
                    out.push(',');
                }
                out.push_str(match p.direction {
                    Direction::In => "in ",
                    Direction::Out => "out ",
                    Direction::Inout => "inout ",
                });
                write_entity_name(out, p.param_type, arena, symbols);
                out.push(' ');
                out.push_str(symbols.resolve(p.name).unwrap_or("?"));
            }
            out.push(')');
            if !raises.is_empty() {
                out.push_str(" raises(");
                for (i, exc) in raises.iter().enumerate() {
                    if i != 0 {
                        out.push(',');
                    }
                    write_entity_name(out, *exc, arena, symbols);
                }
                out.push(')');
            }
        }
        EntityKind::Attribute { attr_type, readonly } => {
            if *readonly {
                out.push_str("readonly ");
            }
            out.push_str("attribute ");
            write_entity_name(out, *attr_type, arena, symbols);
            out.push(' ');
            write_entity_name(out, handle, arena, symbols);
        }
        _ => write_entity_name(out, handle, arena, symbols),
    }
}

/// A 64-bit FNV-1a hasher, chosen for determinism across platforms/Rust
/// versions (unlike `DefaultHasher`, whose algorithm is unspecified).
struct Fnv1a64(u64);

impl Fnv1a64 {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;

    fn new() -> Self {
        Self(Self::OFFSET_BASIS)
    }
}

impl Hasher for Fnv1a64 {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::PRIME);
        }
    }
}

/// Computes the stable 64-bit interface ID from its canonical signature.
pub fn interface_id(handle: EntityHandle, arena: &EntityArena, symbols: &SymbolTable) -> u64 {
    let sig = canonical_signature(handle, arena, symbols);
    let mut hasher = Fnv1a64::new();
    hasher.write(sig.as_bytes());
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_file;
    use std::path::Path;

    fn id_for(src: &str, iface: &str) -> u64 {
        let (ctx, top) = parse_file(src, Path::new("t.idl")).unwrap();
        let handle = top
            .iter()
            .find(|h| {
                ctx.arena.get(**h).scoped_name.last().and_then(|s| ctx.symbols.resolve(*s)) == Some(iface)
            })
            .copied()
            .unwrap();
        interface_id(handle, &ctx.arena, &ctx.symbols)
    }

    #[test]
    fn identical_empty_interfaces_hash_the_same() {
        let a = id_for("interface Foo {};", "Foo");
        let b = id_for("interface Foo {};", "Foo");
        assert_eq!(a, b);
    }

    #[test]
    fn differently_named_empty_interfaces_hash_differently() {
        let a = id_for("interface Foo {};", "Foo");
        let b = id_for("interface Bar {};", "Bar");
        assert_ne!(a, b);
    }

    #[test]
    fn adding_an_operation_changes_the_hash() {
        let a = id_for("interface Foo {};", "Foo");
        let b = id_for("interface Foo { void Bar(); };", "Foo");
        assert_ne!(a, b);
    }

    #[test]
    fn reordering_operations_changes_the_hash() {
        let a = id_for("interface Foo { void A(); void B(); };", "Foo");
        let b = id_for("interface Foo { void B(); void A(); };", "Foo");
        assert_ne!(a, b);
    }

    #[test]
    fn reordering_parameters_changes_the_hash() {
        let a = id_for("interface Foo { void Op(in long x, in long y); };", "Foo");
        let b = id_for("interface Foo { void Op(in long y, in long x); };", "Foo");
        assert_ne!(a, b);
    }

    #[test]
    fn changing_parameter_direction_changes_the_hash() {
        let a = id_for("interface Foo { void Op(in long x); };", "Foo");
        let b = id_for("interface Foo { void Op(out long x); };", "Foo");
        assert_ne!(a, b);
    }

    #[test]
    fn changing_a_base_interface_changes_the_hash() {
        let a = id_for("interface Base1 {}; interface Foo : Base1 {};", "Foo");
        let b = id_for("interface Base2 {}; interface Foo : Base2 {};", "Foo");
        assert_ne!(a, b);
    }
}
