//! Multi-file scenarios: a common definitions file and a dependent file
//! compiled into one shared [`ParseContext`], the way `#include` resolution
//! composes translation units (§5, §9 Supplemented Features).

use idlc::entity::EntityKind;
use idlc::parser::{ParseContext, Parser};
use std::path::PathBuf;

#[test]
fn a_second_file_can_reference_a_type_declared_in_the_first() {
    let mut ctx = ParseContext::new();

    let (mut common, lex_errors) = Parser::new("struct Point { long x; long y; };", PathBuf::from("common.idl"), &mut ctx);
    assert!(lex_errors.is_empty());
    let (_, errors) = common.parse_file();
    assert!(errors.is_empty(), "{errors:?}");

    let (mut dependent, lex_errors) = Parser::new("interface Shapes { void Draw(in Point p); };", PathBuf::from("shapes.idl"), &mut ctx);
    assert!(lex_errors.is_empty());
    let (top, errors) = dependent.parse_file();
    assert!(errors.is_empty(), "{errors:?}");

    let EntityKind::Interface { members, .. } = &ctx.arena.get(top[0]).kind else {
        panic!("expected interface");
    };
    let EntityKind::Operation { params, .. } = &ctx.arena.get(members[0]).kind else {
        panic!("expected operation");
    };
    let resolved_name = ctx.symbols.resolve(*ctx.arena.get(params[0].param_type).scoped_name.last().unwrap()).unwrap();
    assert_eq!(resolved_name, "Point");
}

#[test]
fn referencing_an_undeclared_type_across_files_is_an_error() {
    let mut ctx = ParseContext::new();
    let (mut first, _) = Parser::new("module M {};", PathBuf::from("a.idl"), &mut ctx);
    let (_, errors) = first.parse_file();
    assert!(errors.is_empty());

    let (mut second, _) = Parser::new("interface Shapes { void Draw(in Unknown p); };", PathBuf::from("b.idl"), &mut ctx);
    let (_, errors) = second.parse_file();
    assert!(!errors.is_empty(), "expected an unresolved-type error");
}

#[test]
fn an_included_file_is_resolved_from_disk_and_its_types_are_visible() {
    let dir = tempfile::tempdir().unwrap();
    let common_path = dir.path().join("common.idl");
    std::fs::write(&common_path, "struct Point { long x; long y; };").unwrap();

    let shapes_path = dir.path().join("shapes.idl");
    std::fs::write(
        &shapes_path,
        "#include \"common.idl\"\ninterface Shapes { void Draw(in Point p); };",
    )
    .unwrap();

    let ids = idlc::driver::compile_file(&shapes_path, dir.path(), false, None, &[]).unwrap();
    assert!(ids.iter().any(|(name, _)| name == "Shapes"));

    let rendered = std::fs::read_to_string(dir.path().join("shapes_defs.h")).unwrap();
    assert!(rendered.contains("Point"), "included struct must be visible to the including file's definitions");
}

#[test]
fn an_included_file_is_resolved_from_an_extra_include_directory() {
    let dir = tempfile::tempdir().unwrap();
    let include_dir = dir.path().join("inc");
    std::fs::create_dir(&include_dir).unwrap();
    std::fs::write(include_dir.join("common.idl"), "struct Point { long x; long y; };").unwrap();

    let shapes_path = dir.path().join("shapes.idl");
    std::fs::write(
        &shapes_path,
        "#include <common.idl>\ninterface Shapes { void Draw(in Point p); };",
    )
    .unwrap();

    let ids = idlc::driver::compile_file(&shapes_path, dir.path(), false, None, &[include_dir]).unwrap();
    assert!(ids.iter().any(|(name, _)| name == "Shapes"));
}

#[test]
fn each_file_compiled_independently_gets_its_own_interface_ids() {
    let src_a = "interface A { void Op(); };";
    let src_b = "interface B { void Op(); };";
    let (_, out_a) = idlc::driver::compile_source(src_a, std::path::Path::new("a.idl")).unwrap();
    let (_, out_b) = idlc::driver::compile_source(src_b, std::path::Path::new("b.idl")).unwrap();
    assert!(out_a.definition_header.contains("struct") || out_a.proxy_header.contains("AProxy"));
    assert!(out_b.proxy_header.contains("BProxy"));
}
