//! Scenarios 3 & 4 (§8): union lowering for both type-based and
//! variable-based discriminants, including the generated helper names and
//! the friend-requirement mapping for variable-based unions whose switch
//! variable lives in a different container.

use idlc::codegen::definition::{collect_friend_requirements, emit_definition, needs_construction, switch_groups};
use idlc::codegen::Context;
use idlc::entity::EntityKind;
use idlc::parser::parse_file;
use std::path::Path;

#[test]
fn type_based_union_discriminant_is_named_switch_value() {
    let src = "union U switch(long) { case 1: long a; default: octet b; };";
    let (ctx, top) = parse_file(src, Path::new("t.idl")).unwrap();
    let EntityKind::Union { switch, cases } = &ctx.arena.get(top[0]).kind else {
        panic!("expected union");
    };
    let groups = switch_groups(switch, cases, &ctx.arena, &ctx.symbols);
    assert_eq!(groups[0].switch_to, "switch_to");
    assert_eq!(groups[0].get_switch, "get_switch");
    assert_eq!(groups[0].construct, "construct_a");
    assert_eq!(groups[1].construct, "construct_b");
}

#[test]
fn variable_based_union_accessors_are_qualified_by_member_name() {
    let src = "interface I { attribute long count; union U switch(count) { case 1: long a; case 2: long b; }; };";
    let (ctx, top) = parse_file(src, Path::new("t.idl")).unwrap();
    let EntityKind::Interface { members, .. } = &ctx.arena.get(top[0]).kind else {
        panic!("expected interface");
    };
    let EntityKind::Union { switch, cases } = &ctx.arena.get(members[1]).kind else {
        panic!("expected union");
    };
    let groups = switch_groups(switch, cases, &ctx.arena, &ctx.symbols);
    assert_eq!(groups[0].switch_to, "switch_to_a");
    assert_eq!(groups[1].get_switch, "get_switch_b");
}

#[test]
fn union_with_only_primitive_arms_does_not_need_construction_helpers() {
    let src = "union U switch(long) { case 1: long a; default: octet b; };";
    let (ctx, top) = parse_file(src, Path::new("t.idl")).unwrap();
    let EntityKind::Union { cases, .. } = &ctx.arena.get(top[0]).kind else {
        panic!("expected union");
    };
    assert!(!needs_construction(cases, &ctx.arena));
}

#[test]
fn union_with_a_struct_arm_needs_construction_helpers() {
    let src = "struct Inner { long x; }; union U switch(long) { case 1: Inner a; };";
    let (ctx, top) = parse_file(src, Path::new("t.idl")).unwrap();
    let EntityKind::Union { cases, .. } = &ctx.arena.get(top[1]).kind else {
        panic!("expected union");
    };
    assert!(needs_construction(cases, &ctx.arena));
}

#[test]
fn cross_container_switch_variable_registers_the_container_as_needing_the_union_as_a_friend() {
    let src = "interface I { attribute long count; union U switch(count) { case 1: long a; }; };";
    let (ctx, top) = parse_file(src, Path::new("t.idl")).unwrap();
    let requirements = collect_friend_requirements(&ctx.arena, &ctx.symbols);
    assert_eq!(requirements.get(&top[0]).map(Vec::as_slice), Some(["U".to_string()].as_slice()));
}

#[test]
fn type_based_union_emits_real_storage_special_members_and_dispatchers() {
    let src = "struct Inner { long x; }; union U switch(long) { case 1: Inner a; default: octet b; };";
    let (ctx, top) = parse_file(src, Path::new("t.idl")).unwrap();
    let mut out = Context::new(4);
    emit_definition(&mut out, top[1], &ctx.arena, &ctx.symbols);
    let rendered = out.finish();

    assert!(rendered.contains("union Storage"), "expected a real per-arm storage union, not a stub");
    assert!(rendered.contains("U(const U& other)"), "missing copy constructor");
    assert!(rendered.contains("U(U&& other) noexcept"), "missing move constructor");
    assert!(rendered.contains("~U()"), "missing destructor");
    assert!(rendered.contains("U& operator=(const U& other)"), "missing copy assignment");
    assert!(rendered.contains("U& operator=(U&& other) noexcept"), "missing move assignment");

    assert!(rendered.contains("new (&m_storage.a) Inner();"), "construct_a must placement-new the arm");
    assert!(rendered.contains("new (&m_storage.a) Inner(value);"), "construct_a must also have a copy-construct overload");
    assert!(rendered.contains("m_storage.a.~Inner();"), "destruct_a must explicitly destroy the arm");

    // Exactly one arm is constructed/destroyed per case: each dispatcher
    // has its own per-arm call, so with 2 arms each no-arg call shows up
    // exactly once per dispatcher that performs default construction
    // (construct_active, destruct_active), and the copy dispatcher calls
    // the value-taking overload once per arm instead.
    assert_eq!(rendered.matches("construct_a();").count(), 2, "default ctor and construct_active each construct_a() once");
    assert_eq!(rendered.matches("construct_b();").count(), 1, "only construct_active constructs the default arm");
    assert_eq!(rendered.matches("construct_a(other.m_storage.a);").count(), 1);
    assert_eq!(rendered.matches("construct_b(other.m_storage.b);").count(), 1);
    assert_eq!(rendered.matches("destruct_a();").count(), 1);
    assert_eq!(rendered.matches("destruct_b();").count(), 1);
}

#[test]
fn variable_based_union_switch_to_is_argument_free_and_mutates_its_own_arm() {
    let src = "interface I { attribute long count; union U switch(count) { case 1: long a; case 2: long b; }; };";
    let (ctx, top) = parse_file(src, Path::new("t.idl")).unwrap();
    let EntityKind::Interface { members, .. } = &ctx.arena.get(top[0]).kind else {
        panic!("expected interface");
    };
    let mut out = Context::new(4);
    emit_definition(&mut out, members[1], &ctx.arena, &ctx.symbols);
    let rendered = out.finish();
    assert!(rendered.contains("void switch_to_a()"));
    assert!(rendered.contains("long& get_switch_a()"), "needs a mutable accessor for deserialization to write through");
    assert!(rendered.contains("const long& get_switch_a() const"));

    let requirements = collect_friend_requirements(&ctx.arena, &ctx.symbols);
    assert_eq!(
        requirements.get(&top[0]).map(Vec::as_slice),
        Some(["U".to_string()].as_slice()),
        "the container holding the switch variable must friend the union, not the reverse"
    );
}

#[test]
fn two_unions_sharing_one_switch_variable_must_declare_it_first() {
    // The switch variable (`count`) must be visible from a common ancestor
    // of both unions; declaring it before both and sharing a container is
    // accepted (Open Question resolution in DESIGN.md).
    let src = "interface I { attribute long count; union A switch(count) { case 1: long x; }; union B switch(count) { case 1: long y; }; };";
    let result = parse_file(src, Path::new("t.idl"));
    assert!(result.is_ok());
}
