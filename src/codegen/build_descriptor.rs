//! The build-descriptor emitter (G4): merges the generated proxy/stub
//! sources into a `ps/CMakeLists.txt`, creating it from a template on
//! first use.
//!
//! A direct port of the logic in
//! `examples/original_source/.../generator/cmake_generator.cpp` (read in
//! full): find `add_library(... SHARED ...)`, parse its whitespace-
//! delimited file set case-insensitively, insert whichever of the four
//! `_stub.cpp`/`_stub.h`/`_proxy.cpp`/`_proxy.h` names are missing, and
//! only rewrite the file if something was actually inserted. Concurrent
//! invocations across processes are serialized with an OS-level advisory
//! lock (`fs4`) standing in for the original's named mutex: see
//! `spec.md` §5 and DESIGN.md.
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use fs4::FileExt;

use super::replace_keywords;
use super::KeywordMap;

/// Errors specific to build-descriptor generation.
#[derive(Debug, thiserror::Error)]
pub enum BuildDescriptorError {
    #[error("no target library name was given for the proxy/stub CMake file")]
    MissingTargetName,
    #[error("cannot create proxy/stub directory {0}")]
    CreateDir(PathBuf),
    #[error("missing 'add_library' keyword in {0}")]
    MissingAddLibrary(PathBuf),
    #[error("missing 'SHARED' keyword in {0}")]
    MissingShared(PathBuf),
    #[error("missing ')' closing the 'add_library' statement in {0}")]
    UnclosedAddLibrary(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

const TEMPLATE: &str = r#"# Enforce CMake version 3.20 or newer needed for path function
cmake_minimum_required (VERSION 3.20)

project(%target_lib_name% VERSION 1.0 LANGUAGES CXX)

set(CMAKE_CXX_STANDARD 17)
set(CMAKE_CXX_VISIBILITY_PRESET hidden)
set(TARGET_NAME %target_lib_name%)

add_library(${TARGET_NAME} SHARED)

set_target_properties(${TARGET_NAME} PROPERTIES PREFIX "")
set_target_properties(${TARGET_NAME} PROPERTIES SUFFIX ".sdv")
"#;

/// Case-insensitive substring search, mirroring the original's
/// locale-independent `std::tolower` comparator.
fn find_ci(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let hay_lower = haystack.to_lowercase();
    let needle_lower = needle.to_lowercase();
    hay_lower[from.min(hay_lower.len())..].find(&needle_lower).map(|p| p + from)
}

/// Merges the stub/proxy source file names for `source_file` into the
/// `ps/CMakeLists.txt` underneath `output_dir`, creating the directory and
/// file as needed. Returns `true` if the file was written (i.e. it was
/// newly created or new entries were inserted).
pub fn generate(output_dir: &Path, target_lib_name: &str, source_file: &Path) -> Result<bool, BuildDescriptorError> {
    if target_lib_name.is_empty() {
        return Err(BuildDescriptorError::MissingTargetName);
    }

    let ps_dir = output_dir.join("ps");
    if !ps_dir.exists() {
        fs::create_dir_all(&ps_dir).map_err(|_| BuildDescriptorError::CreateDir(ps_dir.clone()))?;
    }

    let file_path = ps_dir.join("CMakeLists.txt");

    let lock_path = ps_dir.join(".CMakeLists.txt.lock");
    let lock_file = fs::OpenOptions::new().create(true).write(true).open(&lock_path)?;
    lock_file.lock_exclusive()?;
    let result = generate_locked(&file_path, target_lib_name, source_file);
    FileExt::unlock(&lock_file)?;
    result
}

fn generate_locked(file_path: &Path, target_lib_name: &str, source_file: &Path) -> Result<bool, BuildDescriptorError> {
    let mut source = if file_path.exists() {
        fs::read_to_string(file_path)?
    } else {
        let mut keywords = KeywordMap::new();
        keywords.insert("target_lib_name", target_lib_name.to_string());
        replace_keywords(TEMPLATE, &keywords)
    };

    let add_lib_pos = find_ci(&source, "add_library", 0).ok_or_else(|| BuildDescriptorError::MissingAddLibrary(file_path.to_path_buf()))?;
    let shared_pos = find_ci(&source, "shared", add_lib_pos).ok_or_else(|| BuildDescriptorError::MissingShared(file_path.to_path_buf()))? + "shared".len();
    let stop = source[shared_pos..].find(')').map(|p| p + shared_pos).ok_or_else(|| BuildDescriptorError::UnclosedAddLibrary(file_path.to_path_buf()))?;

    let existing: Vec<&str> = source[shared_pos..stop].split_whitespace().collect();

    let base = source_file.file_stem().and_then(|s| s.to_str()).unwrap_or("generated").to_string();
    let wanted = [format!("{base}_stub.cpp"), format!("{base}_stub.h"), format!("{base}_proxy.cpp"), format!("{base}_proxy.h")];

    let original_len = source.len();
    for name in wanted.iter().rev() {
        if !existing.iter().any(|e| *e == name) {
            source.insert_str(stop, &format!("\n    {name}"));
        }
    }

    if source.len() != original_len {
        let mut tmp = tempfile::NamedTempFile::new_in(file_path.parent().unwrap_or(Path::new(".")))?;
        tmp.write_all(source.as_bytes())?;
        tmp.persist(file_path).map_err(|e| BuildDescriptorError::Io(e.error))?;
        Ok(true)
    } else {
        Ok(false)
    }
}
