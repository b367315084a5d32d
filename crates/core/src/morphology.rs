//! Morphological categories and the lexicon-backed analyzer.
//!
//! The compiler never inflects or analyzes words on its own. It asks an
//! [`Analyzer`] for every candidate reading of a surface word and keeps all
//! of them on the token; the parser picks one at the point of use.

use crate::error::CompileError;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

/// Spelled-out cardinal numerals, indexed by value.
pub const CARDINALS: [&str; 11] = [
    "nolla",
    "yksi",
    "kaksi",
    "kolme",
    "neljä",
    "viisi",
    "kuusi",
    "seitsemän",
    "kahdeksan",
    "yhdeksän",
    "kymmenen",
];

/// Spelled-out ordinal numerals, indexed by value minus one.
pub const ORDINALS: [&str; 10] = [
    "ensimmäinen",
    "toinen",
    "kolmas",
    "neljäs",
    "viides",
    "kuudes",
    "seitsemäs",
    "kahdeksas",
    "yhdeksäs",
    "kymmenes",
];

// ──────────────────────────────────────────────
// Categories
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Case {
    Nominative,
    Genitive,
    Partitive,
    Essive,
    Translative,
    Allative,
    Adessive,
    Ablative,
    Illative,
    Inessive,
    Elative,
    Abessive,
    Instructive,
    Comitative,
    Adverbial,
}

impl Case {
    pub const ALL: [Case; 15] = [
        Case::Nominative,
        Case::Genitive,
        Case::Partitive,
        Case::Essive,
        Case::Translative,
        Case::Allative,
        Case::Adessive,
        Case::Ablative,
        Case::Illative,
        Case::Inessive,
        Case::Elative,
        Case::Abessive,
        Case::Instructive,
        Case::Comitative,
        Case::Adverbial,
    ];

    /// Native grammatical tag. Argument lists are ordered by this string.
    pub fn tag(self) -> &'static str {
        match self {
            Case::Nominative => "nimento",
            Case::Genitive => "omanto",
            Case::Partitive => "osanto",
            Case::Essive => "olento",
            Case::Translative => "tulento",
            Case::Allative => "ulkotulento",
            Case::Adessive => "ulkoolento",
            Case::Ablative => "ulkoeronto",
            Case::Illative => "sisatulento",
            Case::Inessive => "sisaolento",
            Case::Elative => "sisaeronto",
            Case::Abessive => "vajanto",
            Case::Instructive => "keinonto",
            Case::Comitative => "seuranto",
            Case::Adverbial => "kerrontosti",
        }
    }

    /// Short code used inside mangled identifiers.
    pub fn abbreviation(self) -> &'static str {
        match self {
            Case::Nominative => "N",
            Case::Genitive => "G",
            Case::Partitive => "P",
            Case::Essive => "E",
            Case::Translative => "T",
            Case::Allative => "Ut",
            Case::Adessive => "Uo",
            Case::Ablative => "Ue",
            Case::Illative => "St",
            Case::Inessive => "So",
            Case::Elative => "Se",
            Case::Abessive => "A",
            Case::Instructive => "I",
            Case::Comitative => "K",
            Case::Adverbial => "D",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Case::Nominative => "nominative",
            Case::Genitive => "genitive",
            Case::Partitive => "partitive",
            Case::Essive => "essive",
            Case::Translative => "translative",
            Case::Allative => "allative",
            Case::Adessive => "adessive",
            Case::Ablative => "ablative",
            Case::Illative => "illative",
            Case::Inessive => "inessive",
            Case::Elative => "elative",
            Case::Abessive => "abessive",
            Case::Instructive => "instructive",
            Case::Comitative => "comitative",
            Case::Adverbial => "adverbial",
        }
    }

    /// Accepts either the English name or the native tag.
    pub fn from_name(s: &str) -> Option<Case> {
        Case::ALL
            .iter()
            .copied()
            .find(|c| c.name() == s || c.tag() == s)
    }
}

impl std::fmt::Display for Case {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordClass {
    #[serde(alias = "nimisana")]
    Noun,
    #[serde(alias = "laatusana", alias = "nimisana_laatusana")]
    Adjective,
    #[serde(alias = "etunimi", alias = "sukunimi")]
    Name,
    #[serde(alias = "asemosana")]
    Pronoun,
    #[serde(alias = "lukusana")]
    Numeral,
    #[serde(alias = "teonsana", alias = "kieltosana")]
    Verb,
    #[serde(alias = "sidesana")]
    Conjunction,
    #[serde(alias = "seikkasana")]
    Adverb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Number {
    Singular,
    Plural,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Degree {
    Positive,
    Comparative,
    Superlative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Form {
    Case(Case),
    Active,
    Passive,
    Imperative,
    Connegative,
    Infinitive,
    None,
}

/// One candidate reading of a surface word.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub base: String,
    pub class: WordClass,
    pub form: Form,
    pub number: Number,
    pub possessive: Option<String>,
    pub degree: Option<Degree>,
    /// Set for ordinal numerals, including `3:s` style glosses.
    pub ordinal: bool,
}

impl Analysis {
    pub fn new(base: impl Into<String>, class: WordClass, form: Form, number: Number) -> Self {
        let base = base.into();
        let mut analysis = Analysis {
            base,
            class,
            form,
            number,
            possessive: None,
            degree: None,
            ordinal: false,
        };
        analysis.classify_numeral();
        analysis
    }

    /// Fallback reading for words the analyzer does not know.
    pub fn unknown(surface: &str) -> Self {
        Analysis::new(
            surface,
            WordClass::Noun,
            Form::Case(Case::Nominative),
            Number::Singular,
        )
    }

    fn classify_numeral(&mut self) {
        if ORDINALS.contains(&self.base.as_str()) {
            self.class = WordClass::Numeral;
            self.ordinal = true;
        } else if CARDINALS.contains(&self.base.as_str()) {
            self.class = WordClass::Numeral;
        }
    }

    pub fn case(&self) -> Option<Case> {
        match self.form {
            Form::Case(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_noun(&self) -> bool {
        self.class == WordClass::Noun || self.class == WordClass::Name
    }

    pub fn is_adjective(&self) -> bool {
        self.class == WordClass::Adjective
    }

    pub fn is_pronoun(&self) -> bool {
        self.class == WordClass::Pronoun
    }

    pub fn is_numeral(&self) -> bool {
        self.class == WordClass::Numeral
    }

    pub fn is_adverb(&self) -> bool {
        self.class == WordClass::Adverb
    }

    pub fn is_finite_verb(&self) -> bool {
        self.class == WordClass::Verb && matches!(self.form, Form::Active | Form::Passive)
    }

    pub fn is_comparative(&self) -> bool {
        self.degree == Some(Degree::Comparative)
    }

    /// Numeric value of a numeral reading: digits or a spelled-out word.
    pub fn numeric_value(&self) -> Option<i64> {
        if !self.is_numeral() {
            return None;
        }
        if let Ok(n) = self.base.parse::<i64>() {
            return Some(n);
        }
        if self.ordinal {
            ORDINALS
                .iter()
                .position(|w| *w == self.base)
                .map(|i| i as i64 + 1)
        } else {
            CARDINALS
                .iter()
                .position(|w| *w == self.base)
                .map(|i| i as i64)
        }
    }
}

/// External morphological analyzer interface.
pub trait Analyzer {
    /// Return every candidate reading of `surface`, possibly none.
    fn analyze(&self, surface: &str) -> Vec<Analysis>;
}

// ──────────────────────────────────────────────
// Lexicon
// ──────────────────────────────────────────────

static CORE_LEXICON: &str = include_str!("lexicon/core.json");

#[derive(Deserialize)]
struct LexiconEntry {
    base: String,
    class: WordClass,
    #[serde(default)]
    forms: BTreeMap<String, String>,
}

/// Table-driven analyzer loaded from JSON word lists.
///
/// Each entry names a base form, a word class and a map from surface forms
/// to a form description such as `"adessive plural"` or `"passive"`.
#[derive(Debug, Default, Clone)]
pub struct Lexicon {
    words: HashMap<String, Vec<Analysis>>,
}

impl Lexicon {
    /// The grammar words, numerals and operator participles every program
    /// relies on.
    pub fn core() -> Result<Lexicon, CompileError> {
        Lexicon::from_json(CORE_LEXICON, "<core lexicon>")
    }

    pub fn from_json(text: &str, origin: &str) -> Result<Lexicon, CompileError> {
        let entries: Vec<LexiconEntry> =
            serde_json::from_str(text).map_err(|e| CompileError::Lexicon {
                origin: origin.to_owned(),
                message: e.to_string(),
            })?;
        let mut lexicon = Lexicon::default();
        for entry in entries {
            if entry.forms.is_empty() {
                let analysis = Analysis::new(&entry.base, entry.class, Form::None, Number::None);
                lexicon.insert(&entry.base, analysis);
                continue;
            }
            for (surface, spec) in &entry.forms {
                let analysis = parse_form_spec(&entry.base, entry.class, spec).map_err(|m| {
                    CompileError::Lexicon {
                        origin: origin.to_owned(),
                        message: format!("form '{}' of '{}': {}", surface, entry.base, m),
                    }
                })?;
                lexicon.insert(surface, analysis);
            }
        }
        Ok(lexicon)
    }

    pub fn insert(&mut self, surface: &str, analysis: Analysis) {
        self.words
            .entry(surface.to_owned())
            .or_default()
            .push(analysis);
    }

    /// Add every reading of `other`; later lexicons extend earlier ones.
    pub fn merge(&mut self, other: Lexicon) {
        for (surface, analyses) in other.words {
            self.words.entry(surface).or_default().extend(analyses);
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl Analyzer for Lexicon {
    fn analyze(&self, surface: &str) -> Vec<Analysis> {
        if let Some(found) = self.words.get(surface) {
            return found.clone();
        }
        self.words
            .get(&surface.to_lowercase())
            .cloned()
            .unwrap_or_default()
    }
}

fn parse_form_spec(base: &str, class: WordClass, spec: &str) -> Result<Analysis, String> {
    let mut form = Form::None;
    let mut number = None;
    let mut analysis = Analysis::new(base, class, Form::None, Number::None);
    for part in spec.split_whitespace() {
        match part {
            "plural" | "monikko" => number = Some(Number::Plural),
            "singular" | "yksikkö" => number = Some(Number::Singular),
            "comparative" => analysis.degree = Some(Degree::Comparative),
            "superlative" => analysis.degree = Some(Degree::Superlative),
            "positive" => analysis.degree = Some(Degree::Positive),
            "active" => form = Form::Active,
            "passive" => form = Form::Passive,
            "imperative" => form = Form::Imperative,
            "connegative" => form = Form::Connegative,
            "infinitive" => form = Form::Infinitive,
            "none" => form = Form::None,
            other => {
                if let Some(p) = other.strip_prefix("possessive:") {
                    analysis.possessive = Some(p.to_owned());
                } else if let Some(c) = Case::from_name(other) {
                    form = Form::Case(c);
                } else {
                    return Err(format!("unknown form tag '{}'", other));
                }
            }
        }
    }
    analysis.form = form;
    analysis.number = number.unwrap_or(match form {
        Form::Case(_) | Form::Active => Number::Singular,
        _ => Number::None,
    });
    Ok(analysis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_lexicon_loads() {
        let lexicon = Lexicon::core().unwrap();
        assert!(!lexicon.is_empty());
        let on = lexicon.analyze("on");
        assert_eq!(on[0].base, "olla");
        assert!(on[0].is_finite_verb());
    }

    #[test]
    fn lookup_falls_back_to_lowercase() {
        let lexicon = Lexicon::core().unwrap();
        let olkoon = lexicon.analyze("Olkoon");
        assert_eq!(olkoon.len(), 1);
        assert_eq!(olkoon[0].form, Form::Imperative);
    }

    #[test]
    fn numerals_are_reclassified() {
        let a = Analysis::new("kolmas", WordClass::Noun, Form::Case(Case::Nominative), Number::Singular);
        assert!(a.is_numeral());
        assert!(a.ordinal);
        assert_eq!(a.numeric_value(), Some(3));

        let b = Analysis::new("nolla", WordClass::Noun, Form::Case(Case::Nominative), Number::Singular);
        assert_eq!(b.numeric_value(), Some(0));
        assert!(!b.ordinal);
    }

    #[test]
    fn form_spec_parses_number_and_degree() {
        let json = r#"[{"base": "hyvä", "class": "laatusana",
                        "forms": {"parempi": "nominative comparative", "hyviä": "partitive plural"}}]"#;
        let lexicon = Lexicon::from_json(json, "test").unwrap();
        let parempi = &lexicon.analyze("parempi")[0];
        assert!(parempi.is_comparative());
        assert_eq!(parempi.class, WordClass::Adjective);
        let hyvia = &lexicon.analyze("hyviä")[0];
        assert_eq!(hyvia.case(), Some(Case::Partitive));
        assert_eq!(hyvia.number, Number::Plural);
    }

    #[test]
    fn bad_form_tag_is_reported() {
        let json = r#"[{"base": "x", "class": "noun", "forms": {"x": "sideways"}}]"#;
        let err = Lexicon::from_json(json, "bad.json").unwrap_err();
        assert!(err.to_string().contains("sideways"), "{}", err);
    }

    #[test]
    fn case_tags_round_trip_through_from_name() {
        for case in Case::ALL {
            assert_eq!(Case::from_name(case.tag()), Some(case));
            assert_eq!(Case::from_name(case.name()), Some(case));
        }
    }
}
