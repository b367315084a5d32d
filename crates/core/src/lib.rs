#![allow(clippy::result_large_err)]
//! tampio-core: Tampio compiler core library.
//!
//! Compiles Finnish-language Tampio sources to JavaScript. Grammatical case
//! rather than word order decides what each phrase binds to, so the parser
//! consults the morphology of every word while grouping tokens.
//!
//! # Passes
//!
//! 0. [`lexer`]: split text into tokens carrying every morphological reading
//! 1. [`pass1_bundle`]: parse each unit, splice includes, prescan signatures
//! 2. [`pass2_hierarchy`]: register classes, fields, functions and methods
//! 3. [`pass3_infer`]: set-valued type inference over the registry
//! 4. [`pass4_validate`]: resolve every expression, attribute diagnostics
//! 5. [`pass5_codegen`]: emit JavaScript for the declarations that validated
//!
//! [`compile_file()`] and [`compile_with_provider()`] run them in order.

/// Language version the parser accepts.
pub const TAMPIO_VERSION: &str = "1.20";
/// Compiler release (semver).
pub const COMPILER_VERSION: &str = "1.28.0";

pub mod ast;
pub mod compile;
pub mod error;
pub mod highlight;
pub mod lexer;
pub mod mangle;
pub mod morphology;
pub mod parser;
pub mod pass1_bundle;
pub mod pass2_hierarchy;
pub mod pass3_infer;
pub mod pass4_validate;
pub mod pass5_codegen;
pub mod source;

// ── Convenience re-exports: key types ────────────────────────────────

pub use ast::{Decl, DeclKind, Expr, Stmt};
pub use compile::{Compilation, CompileOptions};
pub use error::{CompileError, Diagnostic, DiagnosticKind, Severity};
pub use lexer::{Style, TokenList};
pub use morphology::{Analyzer, Lexicon};
pub use pass1_bundle::Root;
pub use pass2_hierarchy::Hierarchy;
pub use pass3_infer::TypeSet;
pub use source::{FileSystemProvider, InMemoryProvider, SourceProvider, SourceUnit};

// ── Convenience re-exports: pipeline entry points ────────────────────

pub use compile::{compile_file, compile_source, compile_with_provider, load_lexicon};
pub use highlight::{page as html_page, render as render_markup, Format as MarkupFormat};
pub use pass1_bundle::load_bundle;
pub use pass2_hierarchy::build_hierarchy;
pub use pass4_validate::validate;
pub use pass5_codegen::generate;
