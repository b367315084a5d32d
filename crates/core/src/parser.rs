//! Case-driven recursive-descent parser.
//!
//! Grammatical case, not word order, decides which slot a nominal phrase
//! fills. Every production consumes from the shared [`TokenList`] and asks
//! the current token for its best reading given what the grammar expects at
//! that point. Speculative productions take a [`ParserMark`] and rewind on
//! failure.
use crate::ast::*;
use crate::error::Diagnostic;
use crate::lexer::{Mark, Style, Token, TokenList};
use crate::morphology::{Analysis, Case};
use std::collections::BTreeSet;

mod conditions;
mod declarations;
mod lists;
mod nominal;
mod sentences;

pub(crate) type PResult<T> = Result<T, Diagnostic>;

/// Known `(field, argument case)` pairs of field-backed functions.
///
/// A projection only takes an argument phrase when the pair is known, so
/// `pisteen x luvulla` reads as a call only if such a function exists.
pub type Signatures = BTreeSet<(String, Case)>;

/// Source-level switches toggled by `Käytä valitsinta "..."`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Options {
    /// `viittaukset`: pronouns refer back to the latest matching phrase.
    pub backreferences: bool,
    /// `muistaminen`: every field-backed function caches its value.
    pub memoize: bool,
    /// `tiukka`: emit strict-mode target code.
    pub strict: bool,
}

impl Options {
    /// Apply a named switch. Returns false for an unknown name.
    pub fn set(&mut self, name: &str, enabled: bool) -> bool {
        match name {
            "viittaukset" => self.backreferences = enabled,
            "muistaminen" => self.memoize = enabled,
            "tiukka" => self.strict = enabled,
            _ => return false,
        }
        true
    }
}

/// Words with a fixed grammatical role. They never start a nominal phrase
/// and are never read as field names.
const RESERVED: &[&str] = &[
    "on",
    "ovat",
    "ole",
    "olkoon",
    "ei",
    "eivät",
    "eikä",
    "ja",
    "tai",
    "sekä",
    "kuin",
    "jos",
    "kun",
    "niin",
    "missä",
    "minkä",
    "joka",
    "jonka",
    "jolla",
    "jossa",
    "jotka",
    "tuloksena",
    "aluksi",
    "pysyvästi",
    "alkaen",
    "vähintään",
    "enintään",
    "jälkeen",
    "hiljaa",
    "mitään",
    "muuta",
];

pub(crate) fn is_reserved(token: &Token) -> bool {
    token.is_word() && RESERVED.contains(&token.text.to_lowercase().as_str())
}

/// A nominal phrase together with the agreement features of its head.
#[derive(Debug, Clone)]
pub(crate) struct Phrase {
    pub expr: Expr,
    pub case: Case,
    pub plural: bool,
    pub head: String,
}

/// Pending loop variable introduced by "jokainen" or "jokin".
#[derive(Debug, Clone)]
struct Quantifier {
    var: String,
    collection: Expr,
    universal: bool,
    span: Span,
}

/// Something a later pronoun may refer back to.
#[derive(Debug, Clone)]
struct Referent {
    name: String,
    plural: bool,
    /// Bound through a hoisted temporary rather than a named variable.
    temporary: bool,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ParserMark {
    tokens: Mark,
    quantifiers: usize,
    referents: usize,
}

// ──────────────────────────────────────────────
// Parser
// ──────────────────────────────────────────────

pub(crate) struct Parser<'a> {
    tokens: TokenList,
    file: String,
    signatures: &'a Signatures,
    options: Options,
    quantifiers: Vec<Quantifier>,
    referents: Vec<Referent>,
    self_var: Option<String>,
    fresh: usize,
    /// Furthest error of a list item abandoned by rewinding.
    abandoned: Option<Diagnostic>,
}

impl<'a> Parser<'a> {
    fn new(tokens: TokenList, file: &str, signatures: &'a Signatures) -> Self {
        Parser {
            tokens,
            file: file.to_owned(),
            signatures,
            options: Options::default(),
            quantifiers: Vec::new(),
            referents: Vec::new(),
            self_var: None,
            fresh: 0,
            abandoned: None,
        }
    }

    fn peek(&self, n: usize) -> Option<&Token> {
        self.tokens.peek(n)
    }

    fn peek_is(&self, n: usize, word: &str) -> bool {
        self.peek(n).is_some_and(|t| t.matches(word))
    }

    fn peek_punct(&self, n: usize, p: &str) -> bool {
        self.peek(n).is_some_and(|t| t.is_punct(p))
    }

    /// Consume the next token with the given style.
    fn advance(&mut self, style: Style) -> Option<Token> {
        let token = self.tokens.next()?.clone();
        self.tokens.set_style(style);
        Some(token)
    }

    fn accept(&mut self, word: &str) -> bool {
        if self.peek_is(1, word) {
            self.advance(Style::Keyword);
            true
        } else {
            false
        }
    }

    fn expect(&mut self, word: &str) -> PResult<()> {
        if self.accept(word) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", word)))
        }
    }

    fn accept_punct(&mut self, p: &str) -> bool {
        if self.peek_punct(1, p) {
            self.advance(Style::Plain);
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, p: &str) -> PResult<()> {
        if self.accept_punct(p) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", p)))
        }
    }

    fn err(&self, msg: impl Into<String>) -> Diagnostic {
        let (line, column, len) = self.tokens.location();
        Diagnostic::syntax(&self.file, line, column, len, msg)
    }

    fn err_at(&self, span: Span, msg: impl Into<String>) -> Diagnostic {
        Diagnostic::syntax(&self.file, span.line, span.column, span.len, msg)
    }

    fn unexpected(&self, expected: &str) -> Diagnostic {
        match self.peek(1) {
            Some(t) => self.err(format!("unexpected '{}', expected {}", t.text, expected)),
            None => self.err(format!("unexpected end of input, expected {}", expected)),
        }
    }

    fn span_here(&self) -> Span {
        let (line, column, len) = self.tokens.location();
        Span { line, column, len }
    }

    fn mark(&self) -> ParserMark {
        ParserMark {
            tokens: self.tokens.mark(),
            quantifiers: self.quantifiers.len(),
            referents: self.referents.len(),
        }
    }

    fn rewind(&mut self, mark: ParserMark) {
        tracing::trace!(file = %self.file, "rewinding speculative parse");
        self.tokens.rewind(mark.tokens);
        self.quantifiers.truncate(mark.quantifiers);
        self.referents.truncate(mark.referents);
    }

    fn abandon(&mut self, error: Diagnostic) {
        if self.abandoned.as_ref().map_or(true, |a| further(&error, a)) {
            self.abandoned = Some(error);
        }
    }

    /// The error to report for a failed declaration: whichever of `error`
    /// and the furthest abandoned item error lies later in the source.
    fn deepest(&mut self, error: Diagnostic) -> Diagnostic {
        match self.abandoned.take() {
            Some(a) if further(&a, &error) => a,
            _ => error,
        }
    }

    fn fresh_name(&mut self, base: &str, tag: &str) -> String {
        self.fresh += 1;
        format!("{}${}{}", base, tag, self.fresh)
    }

    /// First reading of token `n` accepted by `pred`.
    fn reading(&self, n: usize, pred: impl Fn(&Analysis) -> bool) -> Option<Analysis> {
        self.peek(n).and_then(|t| t.find(pred)).cloned()
    }

    /// Run `f` with its own quantifier scope, as for nested statement lists.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        let saved = std::mem::take(&mut self.quantifiers);
        let result = f(self).and_then(|value| self.no_pending_quantifier().map(|()| value));
        self.quantifiers = saved;
        result
    }

    /// A quantifier is unwound only by the call statement or condition
    /// that contains it; any other position leaves it without a loop.
    fn no_pending_quantifier(&self) -> PResult<()> {
        match self.quantifiers.first() {
            Some(q) => {
                let word = if q.universal { "jokainen" } else { "jokin" };
                Err(self.err_at(
                    q.span,
                    format!("'{}' must be inside a statement or condition to loop over", word),
                ))
            }
            None => Ok(()),
        }
    }

    // -- Units ----------------------------------------------------

    /// Parse every declaration, recovering at the next `.` after an error.
    fn parse_all(&mut self) -> (Vec<Decl>, Vec<Diagnostic>) {
        let mut decls = Vec::new();
        let mut errors = Vec::new();
        while !self.tokens.eof() {
            match self.parse_declaration() {
                Ok(d) => decls.push(d),
                Err(e) => {
                    errors.push(self.deepest(e));
                    self.tokens.skip_sentence();
                }
            }
        }
        (decls, errors)
    }
}

fn further(a: &Diagnostic, b: &Diagnostic) -> bool {
    (a.line, a.column) > (b.line, b.column)
}

/// Result of parsing one compilation unit.
#[derive(Debug)]
pub struct ParsedUnit {
    pub decls: Vec<Decl>,
    pub diagnostics: Vec<Diagnostic>,
    /// Token stream with the styles recorded while parsing.
    pub tokens: TokenList,
}

/// Parse a unit, collecting one syntax error per malformed declaration.
pub fn parse_unit(tokens: TokenList, file: &str, signatures: &Signatures) -> ParsedUnit {
    let mut p = Parser::new(tokens, file, signatures);
    let (decls, diagnostics) = p.parse_all();
    tracing::debug!(
        file,
        declarations = decls.len(),
        errors = diagnostics.len(),
        "parsed unit"
    );
    ParsedUnit {
        decls,
        diagnostics,
        tokens: p.tokens,
    }
}

/// Collect the argument signatures of every field-backed function.
pub fn collect_signatures(decls: &[Decl]) -> Signatures {
    decls
        .iter()
        .filter_map(|d| match &d.kind {
            DeclKind::Function {
                field,
                arg: Some(arg),
                ..
            } => Some((field.clone(), arg.case)),
            _ => None,
        })
        .collect()
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::morphology::Lexicon;

    pub(crate) fn parse_with(src: &str, signatures: &Signatures) -> ParsedUnit {
        let lexicon = Lexicon::core().unwrap();
        parse_unit(tokenize(src, &lexicon), "test.itp", signatures)
    }

    pub(crate) fn parse(src: &str) -> ParsedUnit {
        parse_with(src, &Signatures::new())
    }

    pub(crate) fn parse_ok(src: &str) -> Vec<Decl> {
        let unit = parse(src);
        assert!(
            unit.diagnostics.is_empty(),
            "unexpected errors: {:?}",
            unit.diagnostics
        );
        unit.decls
    }

    #[test]
    fn recovers_after_each_malformed_declaration() {
        let src = "Olkoon luku 1.\n\
                   ja ja ja.\n\
                   Olkoon pieni luku 2.\n\
                   on on.\n\
                   piste:llä on x ja y.\n";
        let unit = parse(src);
        assert_eq!(unit.diagnostics.len(), 2, "{:?}", unit.diagnostics);
        assert_eq!(unit.decls.len(), 3);
        assert_eq!(unit.diagnostics[0].line, 2);
        assert_eq!(unit.diagnostics[1].line, 4);
    }

    #[test]
    fn error_points_at_offending_token() {
        let unit = parse("Olkoon luku 1 2.");
        assert_eq!(unit.diagnostics.len(), 1);
        let d = &unit.diagnostics[0];
        assert_eq!(d.column, 15);
        assert!(d.message.contains("'2'"), "{}", d.message);
    }

    #[test]
    fn options_toggle_by_name() {
        let mut o = Options::default();
        assert!(o.set("viittaukset", true));
        assert!(o.backreferences);
        assert!(o.set("viittaukset", false));
        assert!(!o.backreferences);
        assert!(!o.set("tuntematon", true));
    }

    #[test]
    fn signatures_come_from_functions_with_arguments() {
        let decls = parse_ok("luku:n potenssi eksponentti:lla on luku.\nluku:n neliö on luku.");
        let sigs = collect_signatures(&decls);
        assert_eq!(sigs.len(), 1);
        assert!(sigs.contains(&("potenssi".to_string(), Case::Adessive)));
    }
}
