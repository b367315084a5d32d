use crate::morphology::{Analysis, Analyzer, Case, Form, Number, WordClass};
use regex::Regex;
use std::sync::OnceLock;

/// Presentation style recorded per token while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Plain,
    Keyword,
    Function,
    Variable,
    Type,
    Literal,
    Comment,
}

impl Style {
    pub fn class_name(self) -> &'static str {
        match self {
            Style::Plain => "",
            Style::Keyword => "keyword",
            Style::Function => "function",
            Style::Variable => "variable",
            Style::Type => "type",
            Style::Literal => "literal",
            Style::Comment => "comment",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Space,
    /// `.` or `,`
    Punct,
    /// `#` to end of line
    Comment,
    /// Quoted text with an optional `:suffix` case marker
    Str { value: String, case: Case },
    /// A word with every candidate reading, resolved lazily
    Word(Vec<Analysis>),
}

#[derive(Debug, Clone)]
pub struct Token {
    pub text: String,
    pub kind: TokenKind,
    pub line: u32,
    pub column: u32,
}

impl Token {
    pub fn is_separator(&self) -> bool {
        matches!(self.kind, TokenKind::Space | TokenKind::Comment)
    }

    pub fn is_punct(&self, p: &str) -> bool {
        matches!(self.kind, TokenKind::Punct) && self.text == p
    }

    pub fn is_word(&self) -> bool {
        matches!(self.kind, TokenKind::Word(_))
    }

    pub fn analyses(&self) -> &[Analysis] {
        match &self.kind {
            TokenKind::Word(a) => a,
            _ => &[],
        }
    }

    pub fn char_len(&self) -> u32 {
        self.text.chars().count() as u32
    }

    /// True when the surface form or any candidate's base form equals `word`.
    pub fn matches(&self, word: &str) -> bool {
        self.is_word()
            && (self.text.to_lowercase() == word || self.analyses().iter().any(|a| a.base == word))
    }

    /// Pick the candidate satisfying the most expected constraints.
    ///
    /// Ties go to the later candidate. Separators have no word reading.
    pub fn to_word(
        &self,
        classes: &[WordClass],
        forms: &[Form],
        numbers: &[Number],
    ) -> Option<&Analysis> {
        let mut best: Option<(usize, &Analysis)> = None;
        for a in self.analyses() {
            let score = classes.iter().filter(|c| **c == a.class).count()
                + forms.iter().filter(|f| **f == a.form).count()
                + numbers.iter().filter(|n| **n == a.number).count();
            if best.map_or(true, |(s, _)| score >= s) {
                best = Some((score, a));
            }
        }
        best.map(|(_, a)| a)
    }

    /// First candidate accepted by `pred`, for callers that need a
    /// specific reading rather than the best-scoring one.
    pub fn find(&self, pred: impl Fn(&Analysis) -> bool) -> Option<&Analysis> {
        self.analyses().iter().find(|a| pred(a))
    }
}

// ──────────────────────────────────────────────
// Case-marked glosses
// ──────────────────────────────────────────────

const CASE_PATTERNS: &[(&str, Case, Number)] = &[
    ("n", Case::Genitive, Number::Singular),
    ("(aa?|ää?|t[aä])", Case::Partitive, Number::Singular),
    ("n[aä]", Case::Essive, Number::Singular),
    ("ksi", Case::Translative, Number::Singular),
    ("lle", Case::Allative, Number::Singular),
    ("ll[aä]", Case::Adessive, Number::Singular),
    ("lt[aä]", Case::Ablative, Number::Singular),
    (
        "(aan|ään|een|iin|oon|uun|yyn|öön|h[aeiouyäöå]n)",
        Case::Illative,
        Number::Singular,
    ),
    ("ss[aä]", Case::Inessive, Number::Singular),
    ("st[aä]", Case::Elative, Number::Singular),
    ("tt[aä]", Case::Abessive, Number::Singular),
    ("ien", Case::Genitive, Number::Plural),
    ("(ia?|iä?|it[aä])", Case::Partitive, Number::Plural),
    ("in[aä]", Case::Essive, Number::Plural),
    ("iksi", Case::Translative, Number::Plural),
    ("ille", Case::Allative, Number::Plural),
    ("ill[aä]", Case::Adessive, Number::Plural),
    ("ilt[aä]", Case::Ablative, Number::Plural),
    ("(iin|ih[aeiouyäöå]n)", Case::Illative, Number::Plural),
    ("iss[aä]", Case::Inessive, Number::Plural),
    ("ist[aä]", Case::Elative, Number::Plural),
    ("itt[aä]", Case::Abessive, Number::Plural),
    ("in", Case::Instructive, Number::Plural),
    ("ine[^:]*", Case::Comitative, Number::Plural),
    ("sti", Case::Adverbial, Number::None),
];

const ORDINAL_PATTERNS: &[(&str, Case)] = &[
    ("s", Case::Nominative),
    ("nnen", Case::Genitive),
    ("tt[aä]", Case::Partitive),
    ("nnen[aä]", Case::Essive),
    ("nneksi", Case::Translative),
    ("nnelle", Case::Allative),
    ("nnell[aä]", Case::Adessive),
    ("nnelt[aä]", Case::Ablative),
    ("nteen", Case::Illative),
    ("nness[aä]", Case::Inessive),
    ("nnest[aä]", Case::Elative),
];

struct Glosses {
    cases: Vec<(Regex, Case, Number)>,
    ordinals: Vec<(Regex, Case)>,
}

fn glosses() -> &'static Glosses {
    static GLOSSES: OnceLock<Glosses> = OnceLock::new();
    GLOSSES.get_or_init(|| Glosses {
        cases: CASE_PATTERNS
            .iter()
            .filter_map(|(p, c, n)| Regex::new(&format!("^[^:]+:{}$", p)).ok().map(|r| (r, *c, *n)))
            .collect(),
        ordinals: ORDINAL_PATTERNS
            .iter()
            .filter_map(|(p, c)| Regex::new(&format!("^[0-9]+:{}$", p)).ok().map(|r| (r, *c)))
            .collect(),
    })
}

fn gloss_analyses(word: &str) -> Vec<Analysis> {
    let Some((stem, _)) = word.split_once(':') else {
        return Vec::new();
    };
    let stem = stem.to_lowercase();
    let numeric = stem.chars().all(|c| c.is_ascii_digit());
    let g = glosses();
    let ordinals: Vec<Analysis> = g
        .ordinals
        .iter()
        .filter(|(r, _)| r.is_match(word))
        .map(|(_, case)| {
            let mut a = Analysis::new(&stem, WordClass::Numeral, Form::Case(*case), Number::Singular);
            a.ordinal = true;
            a
        })
        .collect();
    if !ordinals.is_empty() {
        return ordinals;
    }
    let class = if numeric {
        WordClass::Numeral
    } else {
        WordClass::Noun
    };
    g.cases
        .iter()
        .filter(|(r, _, _)| r.is_match(word))
        .map(|(_, case, number)| Analysis::new(&stem, class, Form::Case(*case), *number))
        .collect()
}

/// Case of a string literal from its optional `:suffix`.
fn literal_case(suffix: &str) -> Case {
    if suffix.is_empty() {
        return Case::Nominative;
    }
    gloss_analyses(&format!("s:{}", suffix))
        .first()
        .and_then(|a| a.case())
        .unwrap_or(Case::Nominative)
}

fn analyze_word(word: &str, analyzer: &dyn Analyzer) -> Vec<Analysis> {
    if word.contains(':') {
        let glossed = gloss_analyses(word);
        if !glossed.is_empty() {
            return glossed;
        }
    }
    if word.chars().all(|c| c.is_ascii_digit()) {
        return vec![Analysis::new(
            word,
            WordClass::Numeral,
            Form::Case(Case::Nominative),
            Number::Singular,
        )];
    }
    let found = analyzer.analyze(word);
    if found.is_empty() {
        vec![Analysis::unknown(&word.to_lowercase())]
    } else {
        found
    }
}

fn is_word_char(c: char) -> bool {
    !(c.is_whitespace() || matches!(c, '.' | ',' | '"' | '#'))
}

// ──────────────────────────────────────────────
// Tokenizer
// ──────────────────────────────────────────────

pub fn tokenize(src: &str, analyzer: &dyn Analyzer) -> TokenList {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0usize;
    let mut line: u32 = 1;
    let mut column: u32 = 1;

    while pos < chars.len() {
        let start = pos;
        let (tok_line, tok_column) = (line, column);
        let c = chars[pos];

        let kind = if c.is_whitespace() {
            while pos < chars.len() && chars[pos].is_whitespace() {
                pos += 1;
            }
            TokenKind::Space
        } else if c == '.' || c == ',' {
            pos += 1;
            TokenKind::Punct
        } else if c == '#' {
            while pos < chars.len() && chars[pos] != '\n' {
                pos += 1;
            }
            TokenKind::Comment
        } else if c == '"' {
            pos += 1;
            while pos < chars.len() && chars[pos] != '"' && chars[pos] != '\n' {
                pos += 1;
            }
            let value: String = chars[start + 1..pos].iter().collect();
            if pos < chars.len() && chars[pos] == '"' {
                pos += 1;
            }
            let mut suffix = String::new();
            if pos < chars.len() && chars[pos] == ':' {
                pos += 1;
                while pos < chars.len() && is_word_char(chars[pos]) {
                    suffix.push(chars[pos]);
                    pos += 1;
                }
            }
            TokenKind::Str {
                value,
                case: literal_case(&suffix),
            }
        } else {
            while pos < chars.len() && is_word_char(chars[pos]) {
                pos += 1;
            }
            let word: String = chars[start..pos].iter().collect();
            TokenKind::Word(analyze_word(&word, analyzer))
        };

        let text: String = chars[start..pos].iter().collect();
        for ch in text.chars() {
            if ch == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        tokens.push(Token {
            text,
            kind,
            line: tok_line,
            column: tok_column,
        });
    }

    TokenList::new(tokens)
}

// ──────────────────────────────────────────────
// Token list
// ──────────────────────────────────────────────

/// Saved cursor position for speculative parses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark {
    cursor: usize,
    current: Option<usize>,
}

/// Cursor over a token sequence.
///
/// `peek` and `next` skip whitespace and comments. Styles are written for
/// the most recently consumed token and are rolled back by [`rewind`].
///
/// [`rewind`]: TokenList::rewind
#[derive(Debug, Clone)]
pub struct TokenList {
    tokens: Vec<Token>,
    styles: Vec<Style>,
    lexical_styles: Vec<Style>,
    cursor: usize,
    current: Option<usize>,
}

impl TokenList {
    pub fn new(tokens: Vec<Token>) -> Self {
        let lexical_styles: Vec<Style> = tokens
            .iter()
            .map(|t| match t.kind {
                TokenKind::Comment => Style::Comment,
                TokenKind::Str { .. } => Style::Literal,
                _ => Style::Plain,
            })
            .collect();
        TokenList {
            styles: lexical_styles.clone(),
            lexical_styles,
            tokens,
            cursor: 0,
            current: None,
        }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn styles(&self) -> &[Style] {
        &self.styles
    }

    fn peek_index(&self, n: usize) -> Option<usize> {
        if n == 0 {
            return None;
        }
        let mut remaining = n;
        let mut i = self.cursor;
        while i < self.tokens.len() {
            if !self.tokens[i].is_separator() {
                remaining -= 1;
                if remaining == 0 {
                    return Some(i);
                }
            }
            i += 1;
        }
        None
    }

    /// The `n`th upcoming significant token, 1-based.
    pub fn peek(&self, n: usize) -> Option<&Token> {
        self.peek_index(n).map(|i| &self.tokens[i])
    }

    pub fn next(&mut self) -> Option<&Token> {
        let i = self.peek_index(1)?;
        self.cursor = i + 1;
        self.current = Some(i);
        Some(&self.tokens[i])
    }

    pub fn current(&self) -> Option<&Token> {
        self.current.map(|i| &self.tokens[i])
    }

    pub fn eof(&self) -> bool {
        self.peek_index(1).is_none()
    }

    pub fn set_style(&mut self, style: Style) {
        if let Some(i) = self.current {
            self.styles[i] = style;
        }
    }

    pub fn mark(&self) -> Mark {
        Mark {
            cursor: self.cursor,
            current: self.current,
        }
    }

    pub fn rewind(&mut self, mark: Mark) {
        for i in mark.cursor..self.cursor.min(self.tokens.len()) {
            self.styles[i] = self.lexical_styles[i];
        }
        self.cursor = mark.cursor;
        self.current = mark.current;
    }

    /// Consume tokens up to and including the next `.`.
    pub fn skip_sentence(&mut self) {
        while let Some(t) = self.next() {
            if t.is_punct(".") {
                break;
            }
        }
    }

    /// Position of the upcoming token, or of the end of input.
    pub fn location(&self) -> (u32, u32, u32) {
        match self.peek(1).or_else(|| self.tokens.last()) {
            Some(t) => (t.line, t.column, t.char_len().max(1)),
            None => (1, 1, 1),
        }
    }
}
