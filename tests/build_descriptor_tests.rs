//! Scenario 6 (§8): merging generated proxy/stub file names into
//! `ps/CMakeLists.txt` is idempotent and additive across multiple source
//! files, and a full `compile_file` run wires the merge in automatically
//! when a CMake target name is given.

use idlc::codegen::build_descriptor::{generate, BuildDescriptorError};
use std::fs;
use std::path::Path;

#[test]
fn repeated_merges_for_the_same_source_converge() {
    let dir = tempfile::tempdir().unwrap();
    assert!(generate(dir.path(), "rpc_lib", Path::new("widget.idl")).unwrap());
    assert!(!generate(dir.path(), "rpc_lib", Path::new("widget.idl")).unwrap());
    assert!(!generate(dir.path(), "rpc_lib", Path::new("widget.idl")).unwrap());

    let contents = fs::read_to_string(dir.path().join("ps/CMakeLists.txt")).unwrap();
    for name in ["widget_stub.cpp", "widget_stub.h", "widget_proxy.cpp", "widget_proxy.h"] {
        assert_eq!(contents.matches(name).count(), 1, "{name} should appear exactly once");
    }
}

#[test]
fn merges_from_several_idl_files_accumulate_in_one_descriptor() {
    let dir = tempfile::tempdir().unwrap();
    for stem in ["alpha", "beta", "gamma"] {
        generate(dir.path(), "rpc_lib", Path::new(&format!("{stem}.idl"))).unwrap();
    }
    let contents = fs::read_to_string(dir.path().join("ps/CMakeLists.txt")).unwrap();
    for stem in ["alpha", "beta", "gamma"] {
        assert!(contents.contains(&format!("{stem}_stub.cpp")));
    }
    assert!(contents.contains("add_library"));
}

#[test]
fn hand_edited_descriptor_without_add_library_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let ps_dir = dir.path().join("ps");
    fs::create_dir_all(&ps_dir).unwrap();
    fs::write(ps_dir.join("CMakeLists.txt"), "project(broken)\n").unwrap();

    let result = generate(dir.path(), "rpc_lib", Path::new("widget.idl"));
    assert!(matches!(result, Err(BuildDescriptorError::MissingAddLibrary(_))));
}

#[test]
fn compiling_an_interface_with_a_cmake_target_merges_the_descriptor() {
    let dir = tempfile::tempdir().unwrap();
    let idl_path = dir.path().join("widget.idl");
    fs::write(&idl_path, "interface Widget { void Spin(); };").unwrap();

    let outputs = idlc::driver::compile_file(&idl_path, dir.path(), true, Some("rpc_lib"), &[]).unwrap();
    assert!(outputs.iter().any(|(name, _)| name == "Widget"));

    let cmake = fs::read_to_string(dir.path().join("ps/CMakeLists.txt")).unwrap();
    assert!(cmake.contains("widget_stub.cpp"));
    assert!(cmake.contains("widget_proxy.h"));
}
