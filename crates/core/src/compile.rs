//! Pipeline driver: bundle, hierarchy, validation, code generation.
//!
//! See `lib.rs` for the pass overview. Every pass runs even when an
//! earlier one recorded errors, so one run reports everything it can and
//! still emits the declarations that validated.

use crate::error::{CompileError, Diagnostic};
use crate::lexer::TokenList;
use crate::morphology::Lexicon;
use crate::pass1_bundle::{self, Root};
use crate::pass2_hierarchy;
use crate::pass4_validate;
use crate::pass5_codegen;
use crate::source::{FileSystemProvider, SourceProvider};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Knobs set by the caller rather than by directives in the source.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Compile the standard unit ahead of the program.
    pub include_std: bool,
    /// Extra lexicon files merged over the core lexicon, in order.
    pub lexicons: Vec<PathBuf>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            include_std: true,
            lexicons: Vec::new(),
        }
    }
}

/// Result of one compiler run.
#[derive(Debug)]
pub struct Compilation {
    pub code: String,
    /// All diagnostics, parser ones first, then hierarchy, then validation.
    pub diagnostics: Vec<Diagnostic>,
    /// Source text by file name, for rendering diagnostics.
    pub sources: BTreeMap<String, String>,
    /// Styled tokens of the root unit.
    pub tokens: TokenList,
}

impl Compilation {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    /// Render one diagnostic against the source it points into.
    pub fn render(&self, diagnostic: &Diagnostic) -> String {
        diagnostic.render(self.sources.get(&diagnostic.file).map(String::as_str))
    }
}

/// Build the analyzer: the core lexicon, then each extra file over it.
pub fn load_lexicon(extra: &[PathBuf]) -> Result<Lexicon, CompileError> {
    let mut lexicon = Lexicon::core()?;
    for path in extra {
        let text = std::fs::read_to_string(path).map_err(|source| CompileError::Io {
            path: path.display().to_string(),
            source,
        })?;
        lexicon.merge(Lexicon::from_json(&text, &path.display().to_string())?);
    }
    tracing::debug!(entries = lexicon.len(), files = extra.len(), "lexicon loaded");
    Ok(lexicon)
}

/// Compile a file from disk.
pub fn compile_file(path: &Path, options: &CompileOptions) -> Result<Compilation, CompileError> {
    compile_with_provider(Root::File(path), &FileSystemProvider, options)
}

/// Compile source text. Included files are resolved against the current
/// directory.
pub fn compile_source(
    name: &str,
    source: &str,
    options: &CompileOptions,
) -> Result<Compilation, CompileError> {
    compile_with_provider(Root::Text { name, source }, &FileSystemProvider, options)
}

pub fn compile_with_provider(
    root: Root<'_>,
    provider: &dyn SourceProvider,
    options: &CompileOptions,
) -> Result<Compilation, CompileError> {
    let lexicon = load_lexicon(&options.lexicons)?;

    // Passes 0+1: tokenize and parse every unit
    let bundle = pass1_bundle::load_bundle(root, provider, &lexicon, options.include_std)?;
    let mut diagnostics = bundle.diagnostics;

    // Pass 2: hierarchy registry
    let (hierarchy, hierarchy_diagnostics) = pass2_hierarchy::build_hierarchy(&bundle.decls);
    diagnostics.extend(hierarchy_diagnostics);

    // Passes 3+4: inference and validation
    let validation = pass4_validate::validate(&bundle.decls, &hierarchy);
    diagnostics.extend(validation.diagnostics);

    // Pass 5: code generation, skipping declarations that failed validation
    let code = pass5_codegen::generate(&bundle.decls, &hierarchy, &validation.failed);

    tracing::debug!(
        declarations = bundle.decls.len(),
        skipped = validation.failed.len(),
        diagnostics = diagnostics.len(),
        "compilation finished"
    );
    Ok(Compilation {
        code,
        diagnostics,
        sources: bundle.sources,
        tokens: bundle.tokens,
    })
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
