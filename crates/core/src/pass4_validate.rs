//! Pass 4: Validation -- visit every expression once, inferring its type,
//! and check that calls, classes and comparison operators resolve.
//!
//! Errors are collected per declaration. A declaration with an error is
//! left out of the generated code; the others are still emitted.

use crate::ast::*;
use crate::error::{Diagnostic, DiagnosticKind};
use crate::mangle::call_name;
use crate::pass2_hierarchy::Hierarchy;
use crate::pass3_infer::{Env, Inferencer, TypeSet};
use std::collections::BTreeSet;

#[derive(Debug, Default)]
pub struct Validation {
    pub diagnostics: Vec<Diagnostic>,
    /// Indices of declarations with at least one error.
    pub failed: BTreeSet<usize>,
}

/// Validate every declaration against the finished hierarchy.
pub fn validate(decls: &[Decl], hierarchy: &Hierarchy) -> Validation {
    let mut v = Validator {
        infer: Inferencer::new(hierarchy, decls),
        hierarchy,
        findings: Vec::new(),
        owner: 0,
    };
    for (i, decl) in decls.iter().enumerate() {
        v.owner = i;
        v.infer.set_owner(i);
        v.declaration(i, decl);
    }

    let mut findings = v.findings;
    findings.extend(v.infer.take_diagnostics());
    findings.sort_by_key(|(i, _)| *i);
    let mut out = Validation::default();
    for (i, d) in findings {
        if d.is_error() {
            out.failed.insert(i);
        }
        out.diagnostics.push(d);
    }
    tracing::debug!(
        diagnostics = out.diagnostics.len(),
        failed = out.failed.len(),
        "validation done"
    );
    out
}

struct Validator<'a> {
    infer: Inferencer<'a>,
    hierarchy: &'a Hierarchy,
    findings: Vec<(usize, Diagnostic)>,
    owner: usize,
}

impl<'a> Validator<'a> {
    fn push(&mut self, kind: DiagnosticKind, env: &Env, span: Span, message: String, warning: bool) {
        let mut d = Diagnostic::new(kind, &env.file, span.line, span.column, span.len, message);
        if warning {
            d = d.warning();
        }
        self.findings.push((self.owner, d));
    }

    fn param_env(&self, file: &str, params: &[&Param]) -> Env {
        let mut env = Env::new(file);
        for p in params {
            env.bind(&p.name, self.hierarchy.class_type(&p.class));
        }
        env
    }

    fn require_class(&mut self, class: &str, env: &Env, span: Span) {
        if !self.hierarchy.is_class(class) {
            self.push(
                DiagnosticKind::UnresolvedClass,
                env,
                span,
                format!("class '{}' is not declared", class),
                false,
            );
        }
    }

    fn declaration(&mut self, index: usize, decl: &Decl) {
        let top = Env::new(&decl.file);
        match &decl.kind {
            DeclKind::Variable { class, value, .. } => {
                let expected = self
                    .hierarchy
                    .is_class(class)
                    .then(|| self.hierarchy.class_type(class));
                self.expr(value, &top, expected.as_ref());
            }
            DeclKind::Procedure { params, body, .. } => {
                let env = self.param_env(&decl.file, &params.iter().collect::<Vec<_>>());
                self.block(body, &env);
            }
            DeclKind::Method {
                subject,
                params,
                body,
                ..
            } => {
                self.require_class(&subject.class, &top, decl.span);
                let mut all: Vec<&Param> = vec![subject];
                all.extend(params.iter());
                let env = self.param_env(&decl.file, &all);
                self.block(body, &env);
            }
            DeclKind::Class { fields, .. }
            | DeclKind::Directive(Directive::Binding { fields, .. }) => {
                for f in fields {
                    if let Some(init) = &f.initializer {
                        self.expr(init, &top, None);
                    }
                }
            }
            DeclKind::Function { body, .. } => {
                let env = self.infer.function_env(index);
                self.infer.function_type(index);
                self.lambdas(body, &env);
            }
            DeclKind::Comparison {
                class,
                left,
                right,
                conditions,
                ..
            } => {
                self.require_class(class, &top, decl.span);
                let mut env = top.clone();
                env.bind(left, self.hierarchy.class_type(class));
                env.bind(&right.name, self.hierarchy.class_type(&right.class));
                for c in conditions {
                    self.condition(c, &env);
                }
            }
            DeclKind::Directive(_) => {}
        }
        self.block(&decl.additional, &top);
    }

    // -- Statements -----------------------------------------------

    /// Statements in order; an output variable is visible to the
    /// statements after it.
    fn block(&mut self, stmts: &[Stmt], env: &Env) {
        let mut env = env.clone();
        for s in stmts {
            if let Some(out) = self.statement(s, &env) {
                env.bind(&out.0, out.1);
            }
        }
    }

    fn statement(&mut self, stmt: &Stmt, env: &Env) -> Option<(String, TypeSet)> {
        match stmt {
            Stmt::Call(call) => return self.call(call, env),
            Stmt::If { conditions, body } => {
                for c in conditions {
                    self.condition(c, env);
                }
                self.block(body, env);
            }
            Stmt::Block(body) => self.block(body, env),
            Stmt::For {
                var,
                collection,
                body,
            } => {
                self.expr(collection, env, None);
                self.block(body, &env.with(var, TypeSet::Any));
            }
            Stmt::MethodAssign {
                subject,
                params,
                body,
                ..
            } => {
                self.expr(subject, env, None);
                let mut inner = env.clone();
                for p in params {
                    inner.bind(&p.name, self.hierarchy.class_type(&p.class));
                }
                self.block(body, &inner);
            }
        }
        None
    }

    fn call(&mut self, call: &Call, env: &Env) -> Option<(String, TypeSet)> {
        let mut env = env.clone();
        for w in &call.wheres {
            let ty = self.expr(&w.value, &env, None);
            env.bind(&w.name, ty);
        }

        let sugar = call.sugar();
        let subject_ty = call
            .subject
            .as_ref()
            .map(|(_, s)| self.expr(s, &env, None));
        let expected = match (sugar, &subject_ty) {
            (Some(Sugar::Assign), Some(t)) if *t != TypeSet::Any => Some(t.clone()),
            _ => None,
        };
        for (_, a) in &call.args {
            self.expr(a, &env, expected.as_ref());
        }

        if sugar.is_none() {
            let mangled = call_name(&call.name, &call.arg_cases(), call.subject.as_ref().map(|(c, _)| *c));
            match &subject_ty {
                Some(ty) => {
                    let known = match ty {
                        TypeSet::Any => self.hierarchy.any_method(&mangled),
                        TypeSet::Classes(classes) => {
                            classes.iter().any(|c| self.hierarchy.find_method(c, &mangled))
                                || self.hierarchy.any_method(&mangled)
                        }
                    };
                    if !known {
                        self.push(
                            DiagnosticKind::UnresolvedMember,
                            &env,
                            call.span,
                            format!("no method '{}' is declared", mangled),
                            true,
                        );
                    }
                }
                None => {
                    if !self.hierarchy.procedures.contains(&mangled) {
                        self.push(
                            DiagnosticKind::UnresolvedSymbol,
                            &env,
                            call.span,
                            format!("no procedure '{}' is declared", mangled),
                            true,
                        );
                    }
                }
            }
        }
        call.output.clone().map(|o| (o, TypeSet::Any))
    }

    fn condition(&mut self, cond: &Cond, env: &Env) {
        self.infer.infer_condition(cond, env);
        self.condition_lambdas(cond, env);
    }

    // -- Expressions ----------------------------------------------

    fn expr(&mut self, expr: &Expr, env: &Env, expected: Option<&TypeSet>) -> TypeSet {
        let ty = self.infer.infer(expr, env, expected);
        self.lambdas(expr, env);
        ty
    }

    /// Validate the bodies of lambdas nested in `expr`; inference does not
    /// enter statements.
    fn lambdas(&mut self, expr: &Expr, env: &Env) {
        match &expr.kind {
            ExprKind::Lambda(body) => {
                if let Some(out) = self.statement(body, env) {
                    tracing::trace!(output = %out.0, "lambda output is not visible outside");
                }
            }
            ExprKind::Ternary { conditions, .. } => {
                for c in conditions {
                    self.condition_lambdas(c, env);
                }
            }
            _ => {}
        }
        for child in expr.children() {
            self.lambdas(child, env);
        }
    }

    fn condition_lambdas(&mut self, cond: &Cond, env: &Env) {
        match cond {
            Cond::Compare { left, right, .. } | Cond::UserCompare { left, right, .. } => {
                self.lambdas(left, env);
                self.lambdas(right, env);
            }
            Cond::ForAll {
                var,
                collection,
                cond,
            }
            | Cond::Exists {
                var,
                collection,
                cond,
            } => {
                self.lambdas(collection, env);
                self.condition_lambdas(cond, &env.with(var, TypeSet::Any));
            }
        }
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pass3_infer::tests::program;

    fn run(src: &str) -> (Vec<Decl>, Validation) {
        let (decls, h) = program(src);
        let v = validate(&decls, &h);
        (decls, v)
    }

    fn kinds(v: &Validation) -> Vec<(DiagnosticKind, bool)> {
        v.diagnostics.iter().map(|d| (d.kind, d.is_error())).collect()
    }

    #[test]
    fn clean_program_has_no_diagnostics() {
        let (_, v) = run(
            "piste:llä on x.\n\
             piste:n tupla on pisteen x kerrottuna kahdella.\n\
             Kun tulostetaan luku, luku palautetaan.\n\
             Kun piste piirretään, pisteen x:ksi asetetaan 0 ja tulostetaan pisteen x.\n",
        );
        assert!(v.diagnostics.is_empty(), "{:?}", v.diagnostics);
    }

    #[test]
    fn unresolved_symbol_fails_its_declaration_only() {
        let (_, v) = run("Olkoon a b.\nOlkoon c 1.");
        assert_eq!(kinds(&v), [(DiagnosticKind::UnresolvedSymbol, true)]);
        assert_eq!(v.failed, BTreeSet::from([0]));
    }

    #[test]
    fn unknown_procedure_is_a_warning() {
        let (_, v) = run("Kun tulostetaan luku, piirretään luku.");
        assert_eq!(kinds(&v), [(DiagnosticKind::UnresolvedSymbol, false)]);
        assert!(v.diagnostics[0].message.contains("piirtää_P_N"));
        assert!(v.failed.is_empty());
    }

    #[test]
    fn unknown_method_is_a_warning() {
        let (_, v) = run("piste:llä on x.\nKun tulostetaan piste, piste piirtää.");
        assert_eq!(kinds(&v), [(DiagnosticKind::UnresolvedMember, false)]);
    }

    #[test]
    fn method_on_undeclared_class_is_an_error() {
        let (_, v) = run("Kun nappi painetaan, tulostetaan 1.\nKun tulostetaan luku, luku palautetaan.");
        assert_eq!(kinds(&v), [(DiagnosticKind::UnresolvedClass, true)]);
        assert_eq!(v.failed, BTreeSet::from([0]));
    }

    #[test]
    fn output_variable_is_visible_to_later_statements() {
        let (_, v) = run(
            "Kun tulostetaan luku, luku palautetaan.\n\
             Kun piirretään luku, tuloksena arvo tulostetaan luku ja tulostetaan arvo.\n",
        );
        assert!(v.diagnostics.is_empty(), "{:?}", v.diagnostics);
    }

    #[test]
    fn loop_variables_and_quantifiers_are_bound() {
        let (_, v) = run(
            "Kun tulostetaan luku, luku palautetaan.\n\
             Kun piirretään lista, tulostetaan jokainen listan alkio.\n",
        );
        assert!(v.diagnostics.is_empty(), "{:?}", v.diagnostics);
    }

    #[test]
    fn errors_inside_function_bodies_belong_to_the_function() {
        let (_, v) = run(
            "piste:llä on x.\n\
             piste:n summa on pisteen x lisättynä tuntematon:lla.\n\
             Olkoon p uusi piste.\n\
             Olkoon a p:n summa.\n",
        );
        assert_eq!(kinds(&v), [(DiagnosticKind::UnresolvedSymbol, true)]);
        assert_eq!(v.failed, BTreeSet::from([1]));
    }

    #[test]
    fn unknown_comparison_operator() {
        let (_, v) = run("Olkoon a joko 1, jos 2 on parempi kuin 3, tai 0.");
        assert_eq!(kinds(&v), [(DiagnosticKind::UnresolvedMember, true)]);
    }

    #[test]
    fn constructor_checks_class_and_fields() {
        let (_, v) = run("piste:llä on x.\nOlkoon a uusi piste, jonka y on 1.\nOlkoon b uusi ympyrä.");
        assert_eq!(
            kinds(&v),
            [
                (DiagnosticKind::UnresolvedMember, true),
                (DiagnosticKind::UnresolvedClass, true)
            ]
        );
        assert_eq!(v.failed, BTreeSet::from([1, 2]));
    }

    #[test]
    fn lambda_bodies_are_validated() {
        let (_, v) = run("Olkoon a toiminto, jossa tulostetaan tuntematon.");
        let errors: Vec<_> = v.diagnostics.iter().filter(|d| d.is_error()).collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, DiagnosticKind::UnresolvedSymbol);
    }
}
