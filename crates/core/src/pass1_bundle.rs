//! Pass 0+1: Lex, parse, include resolution, cycle detection, bundle assembly.
//!
//! Field-backed functions may be called before they are declared, and
//! whether `Xn F Y:llä` takes an argument depends on F's signature. The
//! bundle is therefore parsed twice: a prescan collects every signature,
//! then the whole bundle is parsed again with them.

use crate::ast::*;
use crate::error::{CompileError, Diagnostic, DiagnosticKind};
use crate::lexer::{tokenize, TokenList};
use crate::morphology::Analyzer;
use crate::parser::{collect_signatures, parse_unit, Signatures};
use crate::source::{SourceProvider, SourceUnit};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// The standard unit compiled ahead of every program.
pub const STD_SOURCE: &str = include_str!("std/std.itp");
pub const STD_NAME: &str = "<std>";

/// Every declaration of a program in emission order.
#[derive(Debug)]
pub struct Bundle {
    pub decls: Vec<Decl>,
    pub diagnostics: Vec<Diagnostic>,
    /// Source text by file name, for rendering diagnostics.
    pub sources: BTreeMap<String, String>,
    /// Styled token stream of the root unit.
    pub tokens: TokenList,
}

/// Where the root unit comes from.
#[derive(Debug, Clone, Copy)]
pub enum Root<'s> {
    File(&'s Path),
    Text { name: &'s str, source: &'s str },
}

/// Load the root unit and everything it includes.
pub fn load_bundle(
    root: Root<'_>,
    provider: &dyn SourceProvider,
    analyzer: &dyn Analyzer,
    include_std: bool,
) -> Result<Bundle, CompileError> {
    let empty = Signatures::new();
    let prescan = Loader::new(provider, analyzer, &empty).run(root, include_std)?;
    let signatures = collect_signatures(&prescan.decls);
    tracing::debug!(signatures = signatures.len(), "signature prescan done");
    if signatures.is_empty() {
        return Ok(prescan);
    }
    Loader::new(provider, analyzer, &signatures).run(root, include_std)
}

struct Loader<'a> {
    provider: &'a dyn SourceProvider,
    analyzer: &'a dyn Analyzer,
    signatures: &'a Signatures,
    visited: HashSet<PathBuf>,
    stack: Vec<PathBuf>,
    decls: Vec<Decl>,
    diagnostics: Vec<Diagnostic>,
    sources: BTreeMap<String, String>,
}

impl<'a> Loader<'a> {
    fn new(
        provider: &'a dyn SourceProvider,
        analyzer: &'a dyn Analyzer,
        signatures: &'a Signatures,
    ) -> Self {
        Loader {
            provider,
            analyzer,
            signatures,
            visited: HashSet::new(),
            stack: Vec::new(),
            decls: Vec::new(),
            diagnostics: Vec::new(),
            sources: BTreeMap::new(),
        }
    }

    fn run(mut self, root: Root<'_>, include_std: bool) -> Result<Bundle, CompileError> {
        if include_std {
            self.load_unit(SourceUnit::standard(), true);
        }
        let tokens = match root {
            Root::File(path) => {
                let mut unit = self
                    .provider
                    .open_unit(Path::new("."), path)
                    .map_err(|source| CompileError::Io {
                        path: path.display().to_string(),
                        source,
                    })?;
                unit.name = path.display().to_string();
                self.load_unit(unit, true)
            }
            Root::Text { name, source } => self.load_unit(SourceUnit::text(name, source), true),
        };
        Ok(Bundle {
            decls: self.decls,
            diagnostics: self.diagnostics,
            sources: self.sources,
            tokens,
        })
    }

    /// Parse one unit, splicing included units in place of their
    /// directives. Returns the unit's styled tokens.
    fn load_unit(&mut self, source: SourceUnit, emit: bool) -> TokenList {
        let name = source.name.as_str();
        let unit = parse_unit(tokenize(&source.text, self.analyzer), name, self.signatures);
        tracing::debug!(unit = name, declarations = unit.decls.len(), emit, "loaded unit");
        self.sources.insert(source.name.clone(), source.text.clone());
        self.diagnostics.extend(unit.diagnostics);
        if let Some(key) = &source.key {
            self.visited.insert(key.clone());
            self.stack.push(key.clone());
        }

        for mut decl in unit.decls {
            decl.emit = emit;
            match &decl.kind {
                DeclKind::Directive(Directive::Include {
                    path,
                    emit: loud,
                }) => {
                    let (path, loud) = (path.clone(), *loud);
                    self.decls.push(decl.clone());
                    self.include(&decl, &source.dir, &path, emit && loud);
                }
                DeclKind::Directive(Directive::SpliceFile(path)) => {
                    let path = path.clone();
                    match self.provider.read_splice(&source.dir, &path) {
                        Ok(code) => {
                            decl.kind = DeclKind::Directive(Directive::SpliceCode(code));
                            self.decls.push(decl);
                        }
                        Err(e) => {
                            let message = format!("cannot read spliced file '{}': {}", path, e);
                            self.diagnostics.push(include_error(&decl, message));
                        }
                    }
                }
                _ => self.decls.push(decl),
            }
        }

        if source.key.is_some() {
            self.stack.pop();
        }
        unit.tokens
    }

    fn include(&mut self, at: &Decl, dir: &Path, path: &str, emit: bool) {
        let unit = match self.provider.open_unit(dir, Path::new(path)) {
            Ok(unit) => unit,
            Err(e) => {
                self.diagnostics.push(include_error(
                    at,
                    format!("cannot read included file '{}': {}", path, e),
                ));
                return;
            }
        };
        let Some(key) = unit.key.clone() else {
            self.load_unit(unit, emit);
            return;
        };

        if self.stack.contains(&key) {
            let mut cycle: Vec<String> = self.stack.iter().map(|p| file_name(p)).collect();
            cycle.push(file_name(&key));
            self.diagnostics.push(include_error(
                at,
                format!("include cycle detected: {}", cycle.join(" \u{2192} ")),
            ));
            return;
        }
        if self.visited.contains(&key) {
            return;
        }
        self.load_unit(unit, emit);
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .into_owned()
}

fn include_error(at: &Decl, message: String) -> Diagnostic {
    Diagnostic::new(
        DiagnosticKind::Include,
        &at.file,
        at.span.line,
        at.span.column,
        at.span.len,
        message,
    )
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::morphology::Lexicon;
    use crate::source::InMemoryProvider;

    fn load(files: &[(&str, &str)], include_std: bool) -> Bundle {
        let provider = InMemoryProvider::from_files(files.iter().copied());
        let lexicon = Lexicon::core().unwrap();
        load_bundle(
            Root::File(Path::new("/p/main.itp")),
            &provider,
            &lexicon,
            include_std,
        )
        .unwrap()
    }

    fn variables(bundle: &Bundle) -> Vec<(String, bool)> {
        bundle
            .decls
            .iter()
            .filter_map(|d| match &d.kind {
                DeclKind::Variable { name, .. } => Some((name.clone(), d.emit)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn std_unit_parses_cleanly() {
        let bundle = load(&[("/p/main.itp", "Olkoon a 1.")], true);
        assert!(bundle.diagnostics.is_empty(), "{:?}", bundle.diagnostics);
        assert!(bundle.decls.iter().any(|d| d.file == STD_NAME));
        assert!(bundle.sources.contains_key(STD_NAME));
    }

    #[test]
    fn includes_are_spliced_in_place() {
        let bundle = load(
            &[
                ("/p/main.itp", "Olkoon a 1.\nSisällytä tiedosto \"lib/b.itp\".\nOlkoon c 3."),
                ("/p/lib/b.itp", "Olkoon b 2."),
            ],
            false,
        );
        assert!(bundle.diagnostics.is_empty(), "{:?}", bundle.diagnostics);
        let names: Vec<String> = variables(&bundle).into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn silent_include_does_not_emit() {
        let bundle = load(
            &[
                ("/p/main.itp", "Sisällytä hiljaa tiedosto \"b.itp\".\nOlkoon a 1."),
                ("/p/b.itp", "Olkoon b 2.\nSisällytä tiedosto \"c.itp\"."),
                ("/p/c.itp", "Olkoon c 3."),
            ],
            false,
        );
        assert_eq!(
            variables(&bundle),
            [("b".to_string(), false), ("c".to_string(), false), ("a".to_string(), true)]
        );
    }

    #[test]
    fn include_cycle_is_reported() {
        let bundle = load(
            &[
                ("/p/main.itp", "Sisällytä tiedosto \"b.itp\"."),
                ("/p/b.itp", "Sisällytä tiedosto \"main.itp\"."),
            ],
            false,
        );
        assert_eq!(bundle.diagnostics.len(), 1);
        assert_eq!(bundle.diagnostics[0].kind, DiagnosticKind::Include);
        assert!(bundle.diagnostics[0].message.contains("main.itp \u{2192} b.itp \u{2192} main.itp"));
    }

    #[test]
    fn unit_reached_by_two_paths_loads_once() {
        let bundle = load(
            &[
                ("/p/main.itp", "Sisällytä tiedosto \"lib/b.itp\".\nSisällytä tiedosto \"a.itp\"."),
                ("/p/lib/b.itp", "Sisällytä tiedosto \"../a.itp\"."),
                ("/p/a.itp", "Olkoon a 1."),
            ],
            false,
        );
        assert!(bundle.diagnostics.is_empty(), "{:?}", bundle.diagnostics);
        assert_eq!(variables(&bundle), [("a".to_string(), true)]);
        assert!(bundle.sources.contains_key("/p/lib/b.itp"));
    }

    #[test]
    fn missing_include_is_a_diagnostic() {
        let bundle = load(&[("/p/main.itp", "Sisällytä tiedosto \"puuttuu.itp\".")], false);
        assert_eq!(bundle.diagnostics.len(), 1);
        assert_eq!(bundle.diagnostics[0].kind, DiagnosticKind::Include);
        assert_eq!(bundle.diagnostics[0].line, 1);
    }

    #[test]
    fn spliced_file_becomes_code() {
        let bundle = load(
            &[
                ("/p/main.itp", "Liitä tiedosto \"apu.js\"."),
                ("/p/apu.js", "console.log(1);"),
            ],
            false,
        );
        assert!(matches!(
            &bundle.decls[0].kind,
            DeclKind::Directive(Directive::SpliceCode(code)) if code == "console.log(1);"
        ));
    }

    #[test]
    fn missing_root_is_fatal() {
        let provider = InMemoryProvider::default();
        let lexicon = Lexicon::core().unwrap();
        let err = load_bundle(Root::File(Path::new("/p/none.itp")), &provider, &lexicon, false)
            .unwrap_err();
        assert!(matches!(err, CompileError::Io { .. }));
    }

    #[test]
    fn signatures_from_included_units_apply_to_the_root() {
        let bundle = load(
            &[
                ("/p/main.itp", "Sisällytä tiedosto \"b.itp\".\nOlkoon a luvun potenssi kahdella."),
                ("/p/b.itp", "luku:n potenssi eksponentti:lla on luku."),
            ],
            false,
        );
        assert!(bundle.diagnostics.is_empty(), "{:?}", bundle.diagnostics);
    }
}
