//! Statements and the verb-centred sentences they are built from.
use super::*;
use crate::mangle::sort_by_case;
use crate::morphology::Form;

/// A sentence before its phrases are assigned to subject and argument slots.
pub(super) struct Sentence {
    verb: Analysis,
    modifiers: Vec<String>,
    /// Each phrase with whether it came before the verb.
    phrases: Vec<(Phrase, bool)>,
    output: Option<String>,
    span: Span,
}

/// Slot assignment of a sentence: verb name, subject and sorted arguments.
pub(super) struct Slots {
    pub name: String,
    pub subject: Option<(Case, Phrase)>,
    pub args: Vec<(Case, Phrase)>,
}

impl<'a> Parser<'a> {
    pub(super) fn parse_statement_list(&mut self) -> PResult<Vec<Stmt>> {
        self.parse_list(|p| p.parse_statement())
    }

    pub(super) fn parse_statement(&mut self) -> PResult<Stmt> {
        if self.peek_is(1, "jos") {
            self.parse_if()
        } else if self.peek_is(1, "kun") {
            self.parse_method_assign()
        } else {
            self.parse_call_statement()
        }
    }

    /// `jos <conditions>, [niin] <statements>`. The body runs to the end of
    /// the enclosing list.
    fn parse_if(&mut self) -> PResult<Stmt> {
        self.advance(Style::Keyword);
        let conditions = self.parse_condition_list()?;
        self.expect_punct(",")?;
        self.accept("niin");
        let body = self.nested(|p| p.parse_statement_list())?;
        Ok(Stmt::If { conditions, body })
    }

    /// `kun <signature>, <statements>` replaces a method on one object.
    fn parse_method_assign(&mut self) -> PResult<Stmt> {
        let span = self.span_here();
        self.advance(Style::Keyword);
        let sentence = self.parse_sentence(true)?;
        let slots = self.assign_slots(sentence)?;
        let Some((subject_case, subject)) = slots.subject else {
            return Err(self.err_at(span, "a method reassignment needs a subject"));
        };
        let params = slots
            .args
            .into_iter()
            .map(|(case, phrase)| self.phrase_param(case, phrase))
            .collect::<PResult<Vec<_>>>()?;
        self.expect_punct(",")?;
        let saved_self = self.self_var.take();
        let body = self.nested(|p| p.parse_statement_list());
        self.self_var = saved_self;
        Ok(Stmt::MethodAssign {
            subject: subject.expr,
            subject_case,
            name: slots.name,
            params,
            body: body?,
            span,
        })
    }

    fn parse_call_statement(&mut self) -> PResult<Stmt> {
        let before = self.quantifiers.len();
        let sentence = self.parse_sentence(false)?;
        let output = sentence.output.clone();
        let span = sentence.span;
        let slots = self.assign_slots(sentence)?;
        let mut call = Call {
            name: slots.name,
            subject: slots.subject.map(|(c, p)| (c, p.expr)),
            args: slots.args.into_iter().map(|(c, p)| (c, p.expr)).collect(),
            wheres: Vec::new(),
            output,
            span,
        };
        if self.peek_punct(1, ",") && self.peek_is(2, "missä") {
            self.advance(Style::Plain);
            self.advance(Style::Keyword);
            call.wheres = self.parse_where_list()?;
        }
        if let Some(out) = &call.output {
            self.referents.push(Referent {
                name: out.clone(),
                plural: false,
                temporary: false,
            });
        }

        let mut stmt = Stmt::Call(call);
        for q in self.quantifiers.split_off(before).into_iter().rev() {
            if !q.universal {
                return Err(self.err_at(q.span, "'jokin' can only be used in a condition"));
            }
            self.referents.retain(|r| r.name != q.var);
            stmt = Stmt::For {
                var: q.var,
                collection: q.collection,
                body: vec![stmt],
            };
        }
        Ok(stmt)
    }

    pub(super) fn parse_where_list(&mut self) -> PResult<Vec<Where>> {
        self.parse_list(|p| {
            let head = p.parse_variable_name(None, Style::Variable)?;
            p.expect("on")?;
            let value = p.parse_nominal_phrase()?;
            Ok(Where {
                name: head.name,
                value: value.expr,
            })
        })
    }

    /// Nominal phrases in any order around exactly one finite verb.
    ///
    /// In a signature (`signature == true`) output bindings are not allowed.
    pub(super) fn parse_sentence(&mut self, signature: bool) -> PResult<Sentence> {
        let span = self.span_here();
        let mut verb: Option<Analysis> = None;
        let mut modifiers = Vec::new();
        let mut phrases = Vec::new();
        let mut output = None;
        while let Some(token) = self.peek(1).cloned() {
            if !signature && token.matches("tuloksena") {
                self.advance(Style::Keyword);
                output = Some(self.parse_variable_name(None, Style::Variable)?.name);
                continue;
            }
            if is_reserved(&token) {
                break;
            }
            if verb.is_none() {
                if let Some(v) = token.find(|a| a.is_finite_verb()) {
                    verb = Some(v.clone());
                    self.advance(Style::Function);
                    continue;
                }
            }
            if let Some(adverb) = token.find(|a| a.is_adverb()) {
                modifiers.push(adverb.base.clone());
                self.advance(Style::Function);
                continue;
            }
            if self.starts_phrase(1) {
                let phrase = self.parse_nominal_phrase()?;
                phrases.push((phrase, verb.is_none()));
                continue;
            }
            break;
        }
        let Some(verb) = verb else {
            return Err(self.unexpected("a verb"));
        };
        Ok(Sentence {
            verb,
            modifiers,
            phrases,
            output,
            span,
        })
    }

    /// Active verbs take the nominative phrase as subject, passive verbs the
    /// first phrase before the verb. Every other case may appear once.
    pub(super) fn assign_slots(&self, sentence: Sentence) -> PResult<Slots> {
        let passive = sentence.verb.form == Form::Passive;
        let mut name = sentence.verb.base.clone();
        if passive {
            name.push_str("_P");
        }
        for m in &sentence.modifiers {
            name.push('_');
            name.push_str(m);
        }

        let subject_index = if passive {
            sentence.phrases.iter().position(|(_, before)| *before)
        } else {
            let mut nominatives = sentence
                .phrases
                .iter()
                .enumerate()
                .filter(|(_, (p, _))| p.case == Case::Nominative);
            let first = nominatives.next().map(|(i, _)| i);
            if let Some((_, (p, _))) = nominatives.next() {
                return Err(self.err_at(p.expr.span, "a sentence can have only one subject"));
            }
            first
        };

        let mut subject = None;
        let mut args: Vec<(Case, Phrase)> = Vec::new();
        for (i, (phrase, _)) in sentence.phrases.into_iter().enumerate() {
            if Some(i) == subject_index {
                subject = Some((phrase.case, phrase));
            } else if args.iter().any(|(c, _)| *c == phrase.case) {
                return Err(self.err_at(
                    phrase.expr.span,
                    format!("the {} case is used twice in one sentence", phrase.case.name()),
                ));
            } else {
                args.push((phrase.case, phrase));
            }
        }
        sort_by_case(&mut args);
        Ok(Slots {
            name,
            subject,
            args,
        })
    }

    /// Parameter of a signature: a typed name, or `uusi N` for the
    /// post-construction hook.
    pub(super) fn phrase_param(&self, case: Case, phrase: Phrase) -> PResult<Param> {
        let mut expr = &phrase.expr;
        if let ExprKind::Bind { value, .. } = &expr.kind {
            expr = &**value;
        }
        match &expr.kind {
            ExprKind::Var {
                name,
                class: Some(class),
            } => Ok(Param {
                name: name.clone(),
                class: class.clone(),
                case,
            }),
            ExprKind::New { class, args } if args.is_empty() => Ok(Param {
                name: class.clone(),
                class: class.clone(),
                case,
            }),
            _ => Err(self.err_at(expr.span, "a parameter must be a plain name such as 'luku'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{parse, parse_ok};
    use super::*;

    fn body(src: &str) -> Vec<Stmt> {
        match &parse_ok(src)[0].kind {
            DeclKind::Procedure { body, .. } | DeclKind::Method { body, .. } => body.clone(),
            other => panic!("expected a procedure or method, got {:?}", other),
        }
    }

    fn call(stmt: &Stmt) -> &Call {
        match stmt {
            Stmt::Call(c) => c,
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn passive_subject_is_first_phrase_before_verb() {
        let stmts = body("Kun sivu avautuu, pisteen x:ksi asetetaan 5.");
        let c = call(&stmts[0]);
        assert_eq!(c.name, "asettaa_P");
        let (case, subject) = c.subject.as_ref().unwrap();
        assert_eq!(*case, Case::Translative);
        assert!(matches!(&subject.kind, ExprKind::Field { field, .. } if field == "x"));
        assert_eq!(c.args.len(), 1);
        assert_eq!(c.args[0].0, Case::Nominative);
    }

    #[test]
    fn passive_without_leading_phrase_is_a_procedure_call() {
        let stmts = body("Kun sivu avautuu, tulostetaan luku:lle 5.");
        let c = call(&stmts[0]);
        assert!(c.subject.is_none());
        let cases: Vec<Case> = c.args.iter().map(|(c, _)| *c).collect();
        assert_eq!(cases, [Case::Nominative, Case::Allative]);
    }

    #[test]
    fn adverbs_extend_the_verb_name() {
        let stmts = body("Kun sivu avautuu, tulostetaan uudestaan 5.");
        assert_eq!(call(&stmts[0]).name, "tulostaa_P_uudestaan");
    }

    #[test]
    fn duplicate_case_is_an_error() {
        let unit = parse("Kun sivu avautuu, tulostetaan 5 6.");
        assert_eq!(unit.diagnostics.len(), 1);
        assert!(unit.diagnostics[0].message.contains("twice"));
    }

    #[test]
    fn universal_quantifier_becomes_a_loop() {
        let stmts = body("Kun sivu avautuu, tulostetaan jokainen listan alkio.");
        let Stmt::For { var, body, .. } = &stmts[0] else {
            panic!("expected loop, got {:?}", stmts[0]);
        };
        let c = call(&body[0]);
        assert!(matches!(&c.args[0].1.kind, ExprKind::Var { name, .. } if name == var));
    }

    #[test]
    fn existential_quantifier_in_statement_is_an_error() {
        let unit = parse("Kun sivu avautuu, tulostetaan jokin listan alkio.");
        assert_eq!(unit.diagnostics.len(), 1);
        assert!(unit.diagnostics[0].message.contains("jokin"));
    }

    #[test]
    fn if_body_takes_the_rest_of_the_list() {
        let stmts = body("Kun sivu avautuu, jos a on 1, niin tulostetaan 2 ja tulostetaan 3.");
        assert_eq!(stmts.len(), 1);
        let Stmt::If { conditions, body } = &stmts[0] else {
            panic!("expected if");
        };
        assert_eq!(conditions.len(), 1);
        assert_eq!(body.len(), 2);
    }

    #[test]
    fn output_variable_and_where_clause() {
        let stmts = body("Kun sivu avautuu, tuloksena summa tulostetaan a:sta, missä a on 1 ja b on 2.");
        let c = call(&stmts[0]);
        assert_eq!(c.output.as_deref(), Some("summa"));
        assert_eq!(c.wheres.len(), 2);
        assert_eq!(c.wheres[1].name, "b");
    }

    #[test]
    fn method_reassignment() {
        let stmts = body("Kun sivu avautuu, kun nappi painetaan, tulostetaan 1.");
        let Stmt::MethodAssign {
            name,
            subject_case,
            params,
            body,
            ..
        } = &stmts[0]
        else {
            panic!("expected method assignment");
        };
        assert_eq!(name, "painaa_P");
        assert_eq!(*subject_case, Case::Nominative);
        assert!(params.is_empty());
        assert_eq!(body.len(), 1);
    }
}
