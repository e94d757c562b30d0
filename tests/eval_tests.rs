//! Scenario 1 (§8): constant expressions fold through arithmetic,
//! bitwise, and comparison operators with C-style promotion, and reject
//! division/modulo by zero.

use idlc::entity::EntityKind;
use idlc::variant::ConstVariant;
use pretty_assertions::assert_eq;
use std::path::Path;

fn const_value(src: &str) -> ConstVariant {
    let (ctx, top) = idlc::parser::parse_file(src, Path::new("t.idl")).unwrap();
    match &ctx.arena.get(top[0]).kind {
        EntityKind::ConstDecl { value, .. } => value.clone(),
        other => panic!("expected a const declaration, got {other:?}"),
    }
}

#[test]
fn folds_mixed_precedence_arithmetic() {
    assert_eq!(const_value("const long k = 1 + 2 * 3 - 4 / 2;"), ConstVariant::I64(5));
}

#[test]
fn folds_bitwise_and_shift_expressions() {
    assert_eq!(const_value("const long k = (1 << 8) | 0xFF;"), ConstVariant::I64(511));
}

#[test]
fn folds_boolean_comparison_chains() {
    assert_eq!(const_value("const boolean k = (3 < 4) && (5 > 2);"), ConstVariant::Bool(true));
}

#[test]
fn const_division_by_zero_is_a_parse_error() {
    let result = idlc::parser::parse_file("const long k = 1 / 0;", Path::new("t.idl"));
    assert!(result.is_err());
}

#[test]
fn const_requiring_an_undefined_identifier_is_an_error() {
    let result = idlc::parser::parse_file("const long k = undefined_name;", Path::new("t.idl"));
    assert!(result.is_err());
}

#[test]
fn one_const_can_reference_another() {
    let src = "const long kBase = 10; const long kDerived = kBase * 2;";
    let (ctx, top) = idlc::parser::parse_file(src, Path::new("t.idl")).unwrap();
    match &ctx.arena.get(top[1]).kind {
        EntityKind::ConstDecl { value, .. } => assert_eq!(*value, ConstVariant::I64(20)),
        other => panic!("expected const, got {other:?}"),
    }
}
