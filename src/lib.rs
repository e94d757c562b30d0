//! `idlc`: an IDL compiler front-end and code generator for an
//! RPC/component framework.
//!
//! The pipeline runs lexing (L) → tokens (T) → parsing into an entity
//! graph (E, P, with constant-expression folding from V) → four
//! generators (G1 definitions, G2 proxy/stub, G3 serdes, G4 build
//! descriptor). [`driver::compile_file`] and [`driver::compile_source`]
//! are the two entry points embedders need; [`diagnostic::CompileError`]
//! is the one error type every fallible call returns.
//!
//! ```
//! use idlc::driver::compile_source;
//! use std::path::Path;
//!
//! let (_, output) = compile_source(
//!     "interface Greeter { void Hello(in string name); };",
//!     Path::new("greeter.idl"),
//! ).unwrap();
//! assert!(output.proxy_header.contains("GreeterProxy"));
//! ```

pub mod codegen;
pub mod diagnostic;
pub mod driver;
pub mod entity;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod scope;
pub mod stream;
pub mod token;
pub mod value;
pub mod variant;

pub use diagnostic::CompileError;
pub use driver::{compile_file, compile_files, compile_source};
