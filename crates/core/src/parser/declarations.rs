//! Top-level declarations.
//!
//! Keyword-led forms (`Olkoon`, `Kun`, directives) are recognised by their
//! first word. The remaining forms all start with a noun head and are tried
//! in turn; each attempt rewinds until it reaches its committing `on`.
use super::nominal::NameHead;
use super::*;
use crate::lexer::TokenKind;

impl<'a> Parser<'a> {
    pub(super) fn parse_declaration(&mut self) -> PResult<Decl> {
        self.referents.clear();
        self.quantifiers.clear();
        self.self_var = None;
        self.abandoned = None;
        let span = self.span_here();

        let kind = if self.peek_is(1, "olkoon") {
            self.parse_variable_decl()?
        } else if self.peek_is(1, "kun") {
            self.parse_procedure()?
        } else if self.peek_is(1, "käytä") || (self.peek_is(1, "älä") && self.peek_is(2, "käytä"))
        {
            self.parse_option()?
        } else if self.peek_is(1, "sisällytä") {
            self.parse_include()?
        } else if self.peek_is(1, "liitä") {
            self.parse_splice()?
        } else {
            self.parse_nominal_declaration()?
        };

        let mut additional = Vec::new();
        if self.peek_punct(1, ",") && self.peek_is(2, "minkä") && self.peek_is(3, "jälkeen") {
            self.advance(Style::Plain);
            self.advance(Style::Keyword);
            self.advance(Style::Keyword);
            self.self_var = None;
            self.referents.clear();
            additional = self.nested(|p| p.parse_statement_list())?;
        }
        self.no_pending_quantifier()?;
        self.expect_punct(".")?;

        if let DeclKind::Directive(Directive::Option { name, enabled }) = &kind {
            self.options.set(name, *enabled);
        }
        Ok(Decl {
            kind,
            file: self.file.clone(),
            span,
            additional,
            emit: true,
        })
    }

    fn expect_string(&mut self) -> PResult<String> {
        match self.peek(1).map(|t| t.kind.clone()) {
            Some(TokenKind::Str { value, .. }) => {
                self.advance(Style::Literal);
                Ok(value)
            }
            _ => Err(self.unexpected("a quoted string")),
        }
    }

    // -- Keyword-led ----------------------------------------------

    /// `Olkoon [adj] N <expr>`
    fn parse_variable_decl(&mut self) -> PResult<DeclKind> {
        self.advance(Style::Keyword);
        let head = self.parse_variable_name(None, Style::Variable)?;
        let value = self.parse_nominal_phrase()?;
        Ok(DeclKind::Variable {
            name: head.name,
            class: head.class,
            value: value.expr,
        })
    }

    /// `Kun <signature>, <statements>`
    fn parse_procedure(&mut self) -> PResult<DeclKind> {
        self.advance(Style::Keyword);
        let sentence = self.parse_sentence(true)?;
        let slots = self.assign_slots(sentence)?;
        let subject = slots
            .subject
            .map(|(case, phrase)| self.phrase_param(case, phrase))
            .transpose()?;
        let params = slots
            .args
            .into_iter()
            .map(|(case, phrase)| self.phrase_param(case, phrase))
            .collect::<PResult<Vec<_>>>()?;
        self.expect_punct(",")?;
        self.self_var = subject.as_ref().map(|s| s.name.clone());
        let body = self.nested(|p| p.parse_statement_list())?;
        Ok(match subject {
            Some(subject) => DeclKind::Method {
                name: slots.name,
                subject,
                params,
                body,
            },
            None => DeclKind::Procedure {
                name: slots.name,
                params,
                body,
            },
        })
    }

    /// `[Älä] käytä valitsinta "<name>"`
    fn parse_option(&mut self) -> PResult<DeclKind> {
        let enabled = !self.accept("älä");
        self.expect("käytä")?;
        self.expect("valitsin")?;
        let span = self.span_here();
        let name = self.expect_string()?;
        if !Options::default().set(&name, true) {
            return Err(self.err_at(span, format!("unknown option \"{}\"", name)));
        }
        Ok(DeclKind::Directive(Directive::Option { name, enabled }))
    }

    /// `Sisällytä [hiljaa] tiedosto "<path>"`
    fn parse_include(&mut self) -> PResult<DeclKind> {
        self.advance(Style::Keyword);
        let emit = !self.accept("hiljaa");
        self.expect("tiedosto")?;
        let path = self.expect_string()?;
        Ok(DeclKind::Directive(Directive::Include { path, emit }))
    }

    /// `Liitä koodi "<code>"` or `Liitä tiedosto "<path>"`
    fn parse_splice(&mut self) -> PResult<DeclKind> {
        self.advance(Style::Keyword);
        let directive = if self.accept("koodi") {
            Directive::SpliceCode(self.expect_string()?)
        } else if self.accept("tiedosto") {
            Directive::SpliceFile(self.expect_string()?)
        } else {
            return Err(self.unexpected("'koodi' or 'tiedosto'"));
        };
        Ok(DeclKind::Directive(directive))
    }

    // -- Noun-led -------------------------------------------------

    fn parse_nominal_declaration(&mut self) -> PResult<DeclKind> {
        if let Some(kind) = self.try_class_with_fields()? {
            return Ok(kind);
        }
        if let Some(kind) = self.try_function(Case::Genitive)? {
            return Ok(kind);
        }
        if let Some(kind) = self.try_function(Case::Nominative)? {
            return Ok(kind);
        }
        if let Some(kind) = self.try_nominative_declaration()? {
            return Ok(kind);
        }
        Err(self.unexpected("a declaration"))
    }

    fn try_head(&mut self, case: Case) -> Option<NameHead> {
        let mark = self.mark();
        match self.parse_variable_name(Some(case), Style::Type) {
            Ok(head) => Some(head),
            Err(_) => {
                self.rewind(mark);
                None
            }
        }
    }

    /// An argument parameter `[adj] M` in an oblique case.
    fn try_param(&mut self) -> Option<Param> {
        let mark = self.mark();
        match self.parse_variable_name(None, Style::Variable) {
            Ok(h) if !matches!(h.case, Case::Nominative | Case::Genitive) => Some(Param {
                name: h.name,
                class: h.class,
                case: h.case,
            }),
            _ => {
                self.rewind(mark);
                None
            }
        }
    }

    /// `Nlla on <fields>`
    fn try_class_with_fields(&mut self) -> PResult<Option<DeclKind>> {
        let mark = self.mark();
        let Some(head) = self.try_head(Case::Adessive) else {
            return Ok(None);
        };
        if !self.accept("on") {
            self.rewind(mark);
            return Ok(None);
        }
        let fields = self.parse_field_list()?;
        Ok(Some(DeclKind::Class {
            name: head.class,
            superclass: None,
            fields,
        }))
    }

    /// `Nn F [arg] on ...` with a genitive head, or `N Fna [arg] on ...`
    /// with a nominative head.
    fn try_function(&mut self, head_case: Case) -> PResult<Option<DeclKind>> {
        let mark = self.mark();
        let Some(head) = self.try_head(head_case) else {
            return Ok(None);
        };
        let field = self
            .peek(1)
            .filter(|t| !is_reserved(t))
            .and_then(|t| {
                t.find(|a| match head_case {
                    Case::Genitive => a.is_noun(),
                    _ => a.case() == Some(Case::Essive) && (a.is_noun() || a.is_adjective()),
                })
            })
            .cloned();
        let Some(field) = field else {
            self.rewind(mark);
            return Ok(None);
        };
        self.advance(Style::Function);
        let arg = if self.peek_is(1, "on") {
            None
        } else {
            match self.try_param() {
                Some(p) => Some(p),
                None => {
                    self.rewind(mark);
                    return Ok(None);
                }
            }
        };
        if !self.accept("on") {
            self.rewind(mark);
            return Ok(None);
        }

        let memoize = self.accept("pysyvästi");
        self.self_var = Some(head.name.clone());
        let body = self.parse_nominal_phrase()?.expr;
        let wheres = if self.peek_punct(1, ",") && self.peek_is(2, "missä") {
            self.advance(Style::Plain);
            self.advance(Style::Keyword);
            self.parse_where_list()?
        } else {
            Vec::new()
        };
        Ok(Some(DeclKind::Function {
            class: head.class,
            self_name: head.name,
            field: field.base,
            arg,
            body,
            wheres,
            memoize,
        }))
    }

    /// Forms with a nominative head: alias, binding, comparison, superclass.
    fn try_nominative_declaration(&mut self) -> PResult<Option<DeclKind>> {
        let mark = self.mark();
        let Some(head) = self.try_head(Case::Nominative) else {
            return Ok(None);
        };

        if self.accept("tarkoittaa") {
            self.expect("luokka")?;
            let target = self.expect_string()?;
            return Ok(Some(DeclKind::Directive(Directive::Alias {
                name: head.class,
                target,
            })));
        }
        if !self.accept("on") {
            self.rewind(mark);
            return Ok(None);
        }

        if self.peek_is(1, "valmis") && self.peek_is(2, "luokka") {
            self.advance(Style::Keyword);
            self.advance(Style::Keyword);
            let target = self.expect_string()?;
            let fields = self.parse_optional_fields()?;
            return Ok(Some(DeclKind::Directive(Directive::Binding {
                name: head.class,
                target,
                fields,
            })));
        }

        if let Some(adj) = self.reading(1, |a| a.is_comparative()) {
            self.advance(Style::Keyword);
            self.expect("kuin")?;
            let right = self.parse_variable_name(Some(Case::Nominative), Style::Variable)?;
            self.expect_punct(",")?;
            self.expect("jos")?;
            self.self_var = Some(head.name.clone());
            let conditions = self.parse_condition_list()?;
            return Ok(Some(DeclKind::Comparison {
                class: head.class,
                name: adj.base,
                left: head.name,
                right: Param {
                    name: right.name,
                    class: right.class,
                    case: Case::Nominative,
                },
                conditions,
            }));
        }

        let superclass = self.parse_variable_name(Some(Case::Nominative), Style::Type)?;
        let fields = self.parse_optional_fields()?;
        Ok(Some(DeclKind::Class {
            name: head.class,
            superclass: Some(superclass.class),
            fields,
        }))
    }

    /// `, jolla on <fields>`
    fn parse_optional_fields(&mut self) -> PResult<Vec<FieldDecl>> {
        if self.peek_punct(1, ",") && self.peek_is(2, "jolla") && self.peek_is(3, "on") {
            self.advance(Style::Plain);
            self.advance(Style::Keyword);
            self.advance(Style::Keyword);
            self.parse_field_list()
        } else {
            Ok(Vec::new())
        }
    }

    fn parse_field_list(&mut self) -> PResult<Vec<FieldDecl>> {
        self.parse_list(|p| p.parse_field())
    }

    /// A nominative singular field, a partitive or nominative plural
    /// collection field, with an optional `, joka on aluksi <expr>`.
    fn parse_field(&mut self) -> PResult<FieldDecl> {
        let head = self.parse_variable_name(None, Style::Function)?;
        let plural = match head.case {
            Case::Nominative => head.plural,
            Case::Partitive => true,
            _ => {
                return Err(self.err_at(head.span, "a field must be nominative or partitive"))
            }
        };
        let mut initializer = None;
        if self.peek_punct(1, ",")
            && (self.peek_is(2, "joka") || self.peek_is(2, "jotka"))
            && (self.peek_is(3, "on") || self.peek_is(3, "ovat"))
            && self.peek_is(4, "aluksi")
        {
            self.advance(Style::Plain);
            for _ in 0..3 {
                self.advance(Style::Keyword);
            }
            initializer = Some(self.parse_nominal_phrase()?.expr);
        }
        Ok(FieldDecl {
            name: head.class,
            plural,
            initializer,
        })
    }
}
