//! Nominal phrases: primaries, genitive projections and essive chains.
use super::*;
use crate::lexer::TokenKind;
use crate::morphology::{Number, WordClass};

/// Adjectives and ordinals that may precede a head noun.
pub(super) fn is_modifier(a: &Analysis) -> bool {
    (a.is_adjective() && !a.is_comparative()) || (a.is_numeral() && a.ordinal)
}

fn arithmetic_op(participle: &str) -> Option<ArithOp> {
    match participle {
        "lisätty" => Some(ArithOp::Add),
        "vähennetty" => Some(ArithOp::Sub),
        "kerrottu" => Some(ArithOp::Mul),
        "jaettu" => Some(ArithOp::Div),
        _ => None,
    }
}

/// A `[adj]* noun` name such as `toinen luku`.
#[derive(Debug, Clone)]
pub(super) struct NameHead {
    /// Modifiers and noun joined with `_`.
    pub name: String,
    /// Base form of the noun, which doubles as the class name.
    pub class: String,
    pub case: Case,
    pub plural: bool,
    pub span: Span,
}

impl<'a> Parser<'a> {
    /// True when token `n` can begin a nominal phrase.
    pub(super) fn starts_phrase(&self, n: usize) -> bool {
        let Some(t) = self.peek(n) else {
            return false;
        };
        match &t.kind {
            TokenKind::Str { .. } => true,
            TokenKind::Word(_) if t.matches("joko") => true,
            TokenKind::Word(_) if is_reserved(t) => false,
            TokenKind::Word(_) => t
                .find(|a| {
                    a.is_noun()
                        || a.is_adjective()
                        || a.is_numeral()
                        || (a.is_pronoun()
                            && matches!(a.base.as_str(), "se" | "ne" | "jokainen" | "jokin"))
                })
                .is_some(),
            _ => false,
        }
    }

    pub(super) fn parse_nominal_phrase(&mut self) -> PResult<Phrase> {
        let phrase = self.parse_operand()?;
        self.parse_essive_chain(phrase)
    }

    /// A primary and its genitive projections, without essive links.
    fn parse_operand(&mut self) -> PResult<Phrase> {
        let phrase = self.parse_primary()?;
        self.parse_projections(phrase, None)
    }

    /// Parse `[adj]* noun`. With `case` set, every word must be in that case;
    /// otherwise the modifiers must agree with whatever case the noun has.
    pub(super) fn parse_variable_name(
        &mut self,
        case: Option<Case>,
        style: Style,
    ) -> PResult<NameHead> {
        let span = self.span_here();
        let mut parts = Vec::new();
        let mut required = case;
        loop {
            let Some(m) = self.reading(1, |a| {
                is_modifier(a) && required.map_or(true, |c| a.case() == Some(c))
            }) else {
                break;
            };
            let followed = self.peek(2).is_some_and(|t| {
                !is_reserved(t)
                    && t.find(|a| (a.is_noun() || is_modifier(a)) && a.case() == m.case())
                        .is_some()
            });
            if !followed || self.peek(1).is_some_and(is_reserved) {
                break;
            }
            self.advance(style);
            required = m.case();
            parts.push(m.base);
        }
        let noun = match self.peek(1) {
            Some(t) if !is_reserved(t) => match required {
                Some(c) => t.find(|a| a.is_noun() && a.case() == Some(c)).cloned(),
                None => t
                    .to_word(&[WordClass::Noun, WordClass::Name], &[], &[])
                    .filter(|a| a.is_noun())
                    .cloned(),
            },
            _ => None,
        };
        let Some(noun) = noun else {
            return Err(self.unexpected("a noun"));
        };
        self.advance(style);
        parts.push(noun.base.clone());
        Ok(NameHead {
            name: parts.join("_"),
            class: noun.base.clone(),
            case: noun.case().unwrap_or(Case::Nominative),
            plural: noun.number == Number::Plural,
            span,
        })
    }

    fn number_value(&self, a: &Analysis, span: Span) -> PResult<i64> {
        a.numeric_value()
            .ok_or_else(|| self.err_at(span, format!("'{}' is not a usable number", a.base)))
    }

    // -- Primaries ------------------------------------------------

    fn parse_primary(&mut self) -> PResult<Phrase> {
        let span = self.span_here();
        let Some(token) = self.peek(1).cloned() else {
            return Err(self.unexpected("a noun phrase"));
        };
        if let TokenKind::Str { value, case } = &token.kind {
            self.advance(Style::Literal);
            return Ok(Phrase {
                expr: Expr::new(ExprKind::Str(value.clone()), span),
                case: *case,
                plural: false,
                head: "merkkijono".into(),
            });
        }
        if !token.is_word() {
            return Err(self.unexpected("a noun phrase"));
        }
        if token.matches("joko") {
            return self.parse_ternary(span);
        }
        if is_reserved(&token) {
            return Err(self.unexpected("a noun phrase"));
        }
        if token.matches("jokainen") || token.matches("jokin") {
            return self.parse_quantified(span);
        }
        if let Some(p) = token.find(|a| a.is_pronoun() && (a.base == "se" || a.base == "ne")) {
            return self.parse_pronoun(p.clone(), span);
        }
        if token.matches("uusi") && self.reading(2, |a| a.is_noun()).is_some() {
            return self.parse_constructor(span);
        }
        if token.matches("tyhjä") && self.peek_is(2, "lista") {
            self.advance(Style::Keyword);
            let case = self.collection_case();
            self.advance(Style::Keyword);
            return Ok(Phrase {
                expr: Expr::new(ExprKind::List(Vec::new()), span),
                case,
                plural: false,
                head: "lista".into(),
            });
        }
        if token.matches("lista") && self.peek_punct(2, ",") && self.peek_is(3, "jonka") {
            return self.parse_list_literal(span);
        }
        if token.matches("toiminto") && self.peek_punct(2, ",") && self.peek_is(3, "jossa") {
            return self.parse_lambda(span);
        }
        if let Some(n) = token.find(|a| a.is_numeral() && !a.ordinal) {
            let value = self.number_value(n, span)?;
            self.advance(Style::Literal);
            return Ok(Phrase {
                expr: Expr::new(ExprKind::Num(value), span),
                case: n.case().unwrap_or(Case::Nominative),
                plural: false,
                head: "luku".into(),
            });
        }
        let head = self.parse_variable_name(None, Style::Variable)?;
        Ok(Phrase {
            expr: Expr::new(
                ExprKind::Var {
                    name: head.name,
                    class: Some(head.class.clone()),
                },
                span,
            ),
            case: head.case,
            plural: head.plural,
            head: head.class,
        })
    }

    /// Case of the upcoming noun token, nominative if it has none.
    fn collection_case(&self) -> Case {
        self.reading(1, |a| a.is_noun())
            .and_then(|a| a.case())
            .unwrap_or(Case::Nominative)
    }

    fn parse_quantified(&mut self, span: Span) -> PResult<Phrase> {
        let Some(token) = self.advance(Style::Keyword) else {
            return Err(self.unexpected("a quantifier"));
        };
        let universal = token.matches("jokainen");
        let q_case = token
            .find(|a| a.is_pronoun())
            .and_then(|a| a.case())
            .unwrap_or(Case::Nominative);
        let inner = self.parse_primary()?;
        let limit = (q_case == Case::Genitive).then_some(1);
        let inner = self.parse_projections(inner, limit)?;
        let case = inner.case;
        let (collection, head) = match inner.expr.kind {
            ExprKind::Field {
                recv,
                field,
                arg: None,
            } if field == "alkio" => (*recv, field),
            kind => (Expr::new(kind, inner.expr.span), inner.head),
        };
        let var = self.fresh_name(&head, "");
        self.quantifiers.push(Quantifier {
            var: var.clone(),
            collection,
            universal,
            span,
        });
        self.referents.push(Referent {
            name: var.clone(),
            plural: false,
            temporary: false,
        });
        Ok(Phrase {
            expr: Expr::new(
                ExprKind::Var {
                    name: var,
                    class: None,
                },
                span,
            ),
            case,
            plural: false,
            head,
        })
    }

    fn parse_ternary(&mut self, span: Span) -> PResult<Phrase> {
        self.advance(Style::Keyword);
        let then = self.parse_nominal_phrase()?;
        self.accept_punct(",");
        self.expect("jos")?;
        let conditions = self.parse_condition_list()?;
        self.accept_punct(",");
        self.expect("tai")?;
        let otherwise = self.parse_nominal_phrase()?;
        Ok(Phrase {
            expr: Expr::new(
                ExprKind::Ternary {
                    conditions,
                    then: Box::new(then.expr),
                    otherwise: Box::new(otherwise.expr),
                },
                span,
            ),
            case: then.case,
            plural: then.plural,
            head: then.head,
        })
    }

    fn parse_pronoun(&mut self, reading: Analysis, span: Span) -> PResult<Phrase> {
        let plural = reading.base == "ne" || reading.number == Number::Plural;
        let referent = if self.options.backreferences {
            self.referents.iter().rev().find(|r| r.plural == plural).cloned()
        } else {
            None
        };
        let kind = match (referent, &self.self_var) {
            (Some(r), _) if r.temporary => ExprKind::BackrefUse { name: r.name },
            (Some(r), _) => ExprKind::Var {
                name: r.name,
                class: None,
            },
            (None, Some(s)) if !plural => ExprKind::Var {
                name: s.clone(),
                class: None,
            },
            _ => {
                return Err(self.err(format!(
                    "'{}' does not refer to anything here",
                    self.peek(1).map(|t| t.text.as_str()).unwrap_or(&reading.base)
                )))
            }
        };
        self.advance(Style::Keyword);
        Ok(Phrase {
            expr: Expr::new(kind, span),
            case: reading.case().unwrap_or(Case::Nominative),
            plural,
            head: reading.base,
        })
    }

    fn parse_constructor(&mut self, span: Span) -> PResult<Phrase> {
        self.advance(Style::Keyword);
        let Some(class) = self.reading(1, |a| a.is_noun()) else {
            return Err(self.unexpected("a class name"));
        };
        self.advance(Style::Type);
        let mut args = Vec::new();
        if self.peek_punct(1, ",") && self.peek_is(2, "jonka") {
            self.advance(Style::Plain);
            self.advance(Style::Keyword);
            loop {
                let field = self
                    .peek(1)
                    .filter(|t| !is_reserved(t))
                    .and_then(|t| t.find(|a| a.is_noun()))
                    .cloned();
                let Some(field) = field else {
                    return Err(self.unexpected("a field name"));
                };
                self.advance(Style::Function);
                self.expect("on")?;
                let value = self.parse_nominal_phrase()?;
                args.push((field.base, value.expr));
                if !self.accept_initializer_separator() {
                    break;
                }
            }
        }
        let mut expr = Expr::new(
            ExprKind::New {
                class: class.base.clone(),
                args,
            },
            span,
        );
        if self.options.backreferences {
            let name = self.fresh_name(&class.base, "r");
            self.referents.push(Referent {
                name: name.clone(),
                plural: false,
                temporary: true,
            });
            expr = Expr::new(
                ExprKind::Bind {
                    name,
                    value: Box::new(expr),
                },
                span,
            );
        }
        Ok(Phrase {
            expr,
            case: class.case().unwrap_or(Case::Nominative),
            plural: false,
            head: class.base,
        })
    }

    /// Consume `ja`, `,` or `, ja` when another `F on V` pair follows.
    fn accept_initializer_separator(&mut self) -> bool {
        let pair_at = |p: &Self, n: usize| {
            p.peek(n).is_some_and(|t| !is_reserved(t) && t.find(|a| a.is_noun()).is_some())
                && p.peek_is(n + 1, "on")
        };
        if self.peek_is(1, "ja") && pair_at(self, 2) {
            self.advance(Style::Keyword);
        } else if self.peek_punct(1, ",") && self.peek_is(2, "ja") && pair_at(self, 3) {
            self.advance(Style::Plain);
            self.advance(Style::Keyword);
        } else if self.peek_punct(1, ",") && pair_at(self, 2) {
            self.advance(Style::Plain);
        } else {
            return false;
        }
        true
    }

    fn parse_list_literal(&mut self, span: Span) -> PResult<Phrase> {
        let case = self.collection_case();
        self.advance(Style::Keyword);
        self.advance(Style::Plain);
        self.advance(Style::Keyword);
        self.expect("alkio")?;
        if !(self.accept("ovat") || self.accept("on")) {
            return Err(self.unexpected("'ovat'"));
        }
        let items = self.parse_list(|p| p.parse_nominal_phrase().map(|ph| ph.expr))?;
        Ok(Phrase {
            expr: Expr::new(ExprKind::List(items), span),
            case,
            plural: false,
            head: "lista".into(),
        })
    }

    fn parse_lambda(&mut self, span: Span) -> PResult<Phrase> {
        let case = self.collection_case();
        self.advance(Style::Keyword);
        self.advance(Style::Plain);
        self.advance(Style::Keyword);
        let body = self.nested(|p| p.parse_statement_list())?;
        Ok(Phrase {
            expr: Expr::new(ExprKind::Lambda(Box::new(Stmt::Block(body))), span),
            case,
            plural: false,
            head: "toiminto".into(),
        })
    }

    // -- Projections and chains -----------------------------------

    /// Follow `Xn F`, `Xn <ordinal> alkio` and `Xn alkiot A:sta B:een` links
    /// while the phrase is genitive, taking at most `limit` links.
    fn parse_projections(&mut self, mut phrase: Phrase, limit: Option<usize>) -> PResult<Phrase> {
        let mut taken = 0;
        while phrase.case == Case::Genitive && limit.map_or(true, |l| taken < l) {
            let Some(token) = self.peek(1).cloned() else {
                break;
            };
            if !token.is_word() || is_reserved(&token) {
                break;
            }
            let span = phrase.expr.span;
            let here = self.span_here();
            if let Some(ordinal) = token.find(|a| a.ordinal) {
                let Some(item) = self.reading(2, |a| a.is_noun() && a.base == "alkio") else {
                    break;
                };
                let index = self.number_value(ordinal, here)?;
                self.advance(Style::Literal);
                self.advance(Style::Function);
                phrase = Phrase {
                    expr: Expr::new(
                        ExprKind::Subscript {
                            recv: Box::new(phrase.expr),
                            index: Box::new(Expr::new(ExprKind::Num(index), here)),
                        },
                        span,
                    ),
                    case: item.case().unwrap_or(Case::Nominative),
                    plural: false,
                    head: item.base,
                };
                taken += 1;
                continue;
            }
            let Some(field) = token.find(|a| a.is_noun()).cloned() else {
                break;
            };
            self.advance(Style::Function);
            let case = field.case().unwrap_or(Case::Nominative);
            if field.base == "alkio" && field.number == Number::Plural {
                if let Some(slice) = self.parse_slice_bounds(phrase.expr.clone(), span)? {
                    phrase = Phrase {
                        expr: slice,
                        case,
                        plural: true,
                        head: field.base,
                    };
                    taken += 1;
                    continue;
                }
            }
            let arg = self.parse_field_argument(&field.base);
            phrase = Phrase {
                expr: Expr::new(
                    ExprKind::Field {
                        recv: Box::new(phrase.expr),
                        field: field.base.clone(),
                        arg,
                    },
                    span,
                ),
                case,
                plural: field.number == Number::Plural,
                head: field.base,
            };
            taken += 1;
        }
        Ok(phrase)
    }

    /// `<elative number> alkaen` or `<elative number> <illative number>`.
    fn parse_slice_bounds(&mut self, recv: Expr, span: Span) -> PResult<Option<Expr>> {
        let here = self.span_here();
        let Some(start) = self.reading(1, |a| a.is_numeral() && a.case() == Some(Case::Elative))
        else {
            return Ok(None);
        };
        let start = self.number_value(&start, here)?;
        self.advance(Style::Literal);
        let end = if self.accept("alkaen") {
            None
        } else {
            let here = self.span_here();
            let Some(end) =
                self.reading(1, |a| a.is_numeral() && a.case() == Some(Case::Illative))
            else {
                return Err(self.unexpected("'alkaen' or an end position"));
            };
            let end = self.number_value(&end, here)?;
            self.advance(Style::Literal);
            Some(Box::new(Expr::new(ExprKind::Num(end), here)))
        };
        Ok(Some(Expr::new(
            ExprKind::Slice {
                recv: Box::new(recv),
                start: Box::new(Expr::new(ExprKind::Num(start), here)),
                end,
            },
            span,
        )))
    }

    /// Argument of a field-backed function, taken only when the field has a
    /// known signature in the argument's case.
    fn parse_field_argument(&mut self, field: &str) -> Option<(Case, Box<Expr>)> {
        if !self.signatures.iter().any(|(f, _)| f == field) || !self.starts_phrase(1) {
            return None;
        }
        let mark = self.mark();
        match self.parse_operand() {
            Ok(arg) if self.signatures.contains(&(field.to_owned(), arg.case)) => {
                Some((arg.case, Box::new(arg.expr)))
            }
            _ => {
                self.rewind(mark);
                None
            }
        }
    }

    /// `X Fna [arg] [ja Gna [arg]]...`, folded left to right.
    fn parse_essive_chain(&mut self, mut phrase: Phrase) -> PResult<Phrase> {
        let mut links = 0;
        loop {
            let mark = self.mark();
            if links > 0 {
                self.accept_punct(",");
                if !self.accept("ja") {
                    self.rewind(mark);
                    break;
                }
            }
            let essive = self
                .peek(1)
                .filter(|t| !is_reserved(t))
                .and_then(|t| {
                    t.find(|a| {
                        a.case() == Some(Case::Essive) && (a.is_noun() || a.is_adjective())
                    })
                })
                .cloned();
            let Some(essive) = essive else {
                self.rewind(mark);
                break;
            };
            let span = phrase.expr.span;
            self.advance(Style::Function);
            let kind = match arithmetic_op(&essive.base) {
                Some(op) => {
                    let operand = self.parse_operand()?;
                    if operand.case != Case::Adessive {
                        return Err(self.err_at(
                            operand.expr.span,
                            format!("the operand of '{}' must be adessive", essive.base),
                        ));
                    }
                    ExprKind::Arithmetic {
                        op,
                        left: Box::new(phrase.expr),
                        right: Box::new(operand.expr),
                    }
                }
                None => {
                    let arg = self.parse_field_argument(&essive.base);
                    ExprKind::Field {
                        recv: Box::new(phrase.expr),
                        field: essive.base,
                        arg,
                    }
                }
            };
            phrase.expr = Expr::new(kind, span);
            links += 1;
        }
        Ok(phrase)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{parse_ok, parse_with};
    use super::*;

    fn value_of(src: &str) -> ExprKind {
        let decls = parse_ok(src);
        match &decls[0].kind {
            DeclKind::Variable { value, .. } => value.kind.clone(),
            other => panic!("expected variable, got {:?}", other),
        }
    }

    fn var(name: &str) -> ExprKind {
        ExprKind::Var {
            name: name.into(),
            class: Some(name.into()),
        }
    }

    #[test]
    fn genitive_chain_nests_fields() {
        let kind = value_of("Olkoon a pisteen x:n y.");
        let ExprKind::Field { recv, field, arg } = kind else {
            panic!("expected field");
        };
        assert_eq!(field, "y");
        assert!(arg.is_none());
        let ExprKind::Field { recv, field, .. } = &recv.kind else {
            panic!("expected inner field");
        };
        assert_eq!(field, "x");
        assert_eq!(recv.kind, var("piste"));
    }

    #[test]
    fn ordinal_alkio_is_subscript() {
        let kind = value_of("Olkoon a listan toinen alkio.");
        let ExprKind::Subscript { recv, index } = kind else {
            panic!("expected subscript");
        };
        assert_eq!(recv.kind, var("lista"));
        assert_eq!(index.kind, ExprKind::Num(2));
    }

    #[test]
    fn slice_with_and_without_end() {
        let kind = value_of("Olkoon a listan alkiot 2:sta 4:ään.");
        let ExprKind::Slice { start, end, .. } = kind else {
            panic!("expected slice");
        };
        assert_eq!(start.kind, ExprKind::Num(2));
        assert_eq!(end.map(|e| e.kind), Some(ExprKind::Num(4)));

        let kind = value_of("Olkoon a listan alkiot kolmannesta alkaen.");
        let ExprKind::Slice { end, .. } = kind else {
            panic!("expected slice");
        };
        assert!(end.is_none());
    }

    #[test]
    fn essive_arithmetic_folds_left() {
        let kind = value_of("Olkoon a luku lisättynä yhdellä ja kerrottuna kahdella.");
        let ExprKind::Arithmetic { op, left, right } = kind else {
            panic!("expected arithmetic");
        };
        assert_eq!(op, ArithOp::Mul);
        assert_eq!(right.kind, ExprKind::Num(2));
        let ExprKind::Arithmetic { op, left, .. } = &left.kind else {
            panic!("expected inner arithmetic");
        };
        assert_eq!(*op, ArithOp::Add);
        assert_eq!(left.kind, var("luku"));
    }

    #[test]
    fn essive_operand_must_be_adessive() {
        let unit = super::super::tests::parse("Olkoon a luku lisättynä kaksi.");
        assert_eq!(unit.diagnostics.len(), 1);
        assert!(unit.diagnostics[0].message.contains("adessive"));
    }

    #[test]
    fn field_argument_needs_known_signature() {
        let src = "Olkoon a luvun potenssi kahdella.";
        let unit = super::super::tests::parse(src);
        assert_eq!(unit.diagnostics.len(), 1, "argument is not taken without a signature");

        let mut sigs = Signatures::new();
        sigs.insert(("potenssi".into(), Case::Adessive));
        let unit = parse_with(src, &sigs);
        assert!(unit.diagnostics.is_empty(), "{:?}", unit.diagnostics);
        let DeclKind::Variable { value, .. } = &unit.decls[0].kind else {
            panic!("expected variable");
        };
        let ExprKind::Field { arg: Some((case, a)), .. } = &value.kind else {
            panic!("expected call with argument");
        };
        assert_eq!(*case, Case::Adessive);
        assert_eq!(a.kind, ExprKind::Num(2));
    }

    #[test]
    fn constructor_with_initializers() {
        let kind = value_of("Olkoon p uusi piste, jonka x on 1 ja y on 2.");
        let ExprKind::New { class, args } = kind else {
            panic!("expected constructor");
        };
        assert_eq!(class, "piste");
        let names: Vec<&str> = args.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["x", "y"]);
    }

    #[test]
    fn list_literal_and_empty_list() {
        let kind = value_of("Olkoon a lista, jonka alkiot ovat 1, 2 ja 3.");
        let ExprKind::List(items) = kind else {
            panic!("expected list");
        };
        assert_eq!(items.len(), 3);
        assert_eq!(value_of("Olkoon b tyhjä lista."), ExprKind::List(vec![]));
    }

    #[test]
    fn ternary_carries_conditions() {
        let kind = value_of("Olkoon a joko 1, jos b on 2, tai 3.");
        let ExprKind::Ternary {
            conditions,
            then,
            otherwise,
        } = kind
        else {
            panic!("expected ternary");
        };
        assert_eq!(conditions.len(), 1);
        assert_eq!(then.kind, ExprKind::Num(1));
        assert_eq!(otherwise.kind, ExprKind::Num(3));
    }

    #[test]
    fn pronoun_without_referent_is_an_error() {
        let unit = super::super::tests::parse("Olkoon a se.");
        assert_eq!(unit.diagnostics.len(), 1);
        assert!(unit.diagnostics[0].message.contains("refer"));
    }

    #[test]
    fn quantifier_outside_a_statement_is_an_error() {
        let unit = super::super::tests::parse("Olkoon l tyhjä lista.\nOlkoon a jokainen l:n alkio.");
        assert_eq!(unit.diagnostics.len(), 1, "{:?}", unit.diagnostics);
        let d = &unit.diagnostics[0];
        assert_eq!((d.line, d.column), (2, 10));
        assert!(d.message.contains("jokainen"), "{}", d.message);
        assert_eq!(unit.decls.len(), 1);

        let unit = super::super::tests::parse("Olkoon c jokaisen b:n arvo.");
        assert_eq!(unit.diagnostics.len(), 1, "{:?}", unit.diagnostics);
        assert_eq!(unit.diagnostics[0].column, 10);
    }

    #[test]
    fn quantifier_in_a_function_body_is_an_error() {
        let unit = super::super::tests::parse("luku:n summa on jokin luvun alkio.");
        assert_eq!(unit.diagnostics.len(), 1, "{:?}", unit.diagnostics);
        assert!(unit.diagnostics[0].message.contains("jokin"));
    }

    #[test]
    fn lambda_body_is_a_statement_list() {
        let kind = value_of("Olkoon f toiminto, jossa tulostetaan 1 ja tulostetaan 2.");
        let ExprKind::Lambda(body) = kind else {
            panic!("expected lambda");
        };
        let Stmt::Block(stmts) = *body else {
            panic!("expected block");
        };
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn modifiers_join_into_the_name() {
        let decls = parse_ok("Olkoon toinen luku 5.");
        let DeclKind::Variable { name, class, .. } = &decls[0].kind else {
            panic!("expected variable");
        };
        assert_eq!(name, "toinen_luku");
        assert_eq!(class, "luku");
    }
}
