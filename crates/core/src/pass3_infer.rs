//! Pass 3: Type inference -- set-valued nominal types used to decide which
//! overloaded field-backed function a projection calls.
//!
//! A type is the set of classes a value may have. Declared names stand for
//! their class and every subclass; literals and constructors are exact.
//! Function result types are computed lazily and cached. While a function's
//! own body is being inferred its result is the empty set, so recursive
//! uses add no constraint.

use crate::ast::*;
use crate::error::{Diagnostic, DiagnosticKind};
use crate::pass2_hierarchy::Hierarchy;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSet {
    /// No information: every class is possible.
    Any,
    Classes(BTreeSet<String>),
}

impl TypeSet {
    pub fn empty() -> Self {
        TypeSet::Classes(BTreeSet::new())
    }

    /// Exactly one class.
    pub fn of(class: &str) -> Self {
        TypeSet::Classes(BTreeSet::from([class.to_owned()]))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, TypeSet::Classes(s) if s.is_empty())
    }

    pub fn is_exactly(&self, class: &str) -> bool {
        matches!(self, TypeSet::Classes(s) if s.len() == 1 && s.contains(class))
    }

    pub fn union(&self, other: &TypeSet) -> TypeSet {
        match (self, other) {
            (TypeSet::Any, _) | (_, TypeSet::Any) => TypeSet::Any,
            (TypeSet::Classes(a), TypeSet::Classes(b)) => {
                TypeSet::Classes(a.union(b).cloned().collect())
            }
        }
    }

    pub fn intersect(&self, other: &TypeSet) -> TypeSet {
        match (self, other) {
            (TypeSet::Any, t) | (t, TypeSet::Any) => t.clone(),
            (TypeSet::Classes(a), TypeSet::Classes(b)) => {
                TypeSet::Classes(a.intersection(b).cloned().collect())
            }
        }
    }

    pub fn overlaps(&self, other: &TypeSet) -> bool {
        !self.intersect(other).is_empty()
    }
}

impl fmt::Display for TypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSet::Any => write!(f, "any"),
            TypeSet::Classes(s) if s.is_empty() => write!(f, "nothing"),
            TypeSet::Classes(s) => {
                let names: Vec<&str> = s.iter().map(String::as_str).collect();
                write!(f, "{{{}}}", names.join(", "))
            }
        }
    }
}

/// Local names visible to an expression and the file it came from.
#[derive(Debug, Clone)]
pub struct Env {
    pub file: String,
    locals: BTreeMap<String, TypeSet>,
}

impl Env {
    pub fn new(file: &str) -> Self {
        Env {
            file: file.to_owned(),
            locals: BTreeMap::new(),
        }
    }

    pub fn bind(&mut self, name: &str, ty: TypeSet) {
        self.locals.insert(name.to_owned(), ty);
    }

    /// A copy of this environment with one more binding.
    pub fn with(&self, name: &str, ty: TypeSet) -> Env {
        let mut env = self.clone();
        env.bind(name, ty);
        env
    }

    pub fn lookup(&self, name: &str) -> Option<&TypeSet> {
        self.locals.get(name)
    }
}

#[derive(Debug, Clone)]
enum State {
    InProgress,
    Done(TypeSet),
}

// ──────────────────────────────────────────────
// Inferencer
// ──────────────────────────────────────────────

/// Infers expression types against a finished hierarchy.
///
/// Diagnostics are attributed to the declaration whose inference produced
/// them, which is not always the one being validated: a function body is
/// inferred when it is first used.
pub struct Inferencer<'a> {
    hierarchy: &'a Hierarchy,
    decls: &'a [Decl],
    functions: BTreeMap<usize, State>,
    globals: BTreeMap<String, State>,
    owner: usize,
    diagnostics: Vec<(usize, Diagnostic)>,
}

impl<'a> Inferencer<'a> {
    pub fn new(hierarchy: &'a Hierarchy, decls: &'a [Decl]) -> Self {
        Inferencer {
            hierarchy,
            decls,
            functions: BTreeMap::new(),
            globals: BTreeMap::new(),
            owner: 0,
            diagnostics: Vec::new(),
        }
    }

    pub fn hierarchy(&self) -> &'a Hierarchy {
        self.hierarchy
    }

    /// Attribute diagnostics to declaration `index` until the next call.
    pub fn set_owner(&mut self, index: usize) {
        self.owner = index;
    }

    /// Diagnostics so far, each with the index of its declaration.
    pub fn take_diagnostics(&mut self) -> Vec<(usize, Diagnostic)> {
        std::mem::take(&mut self.diagnostics)
    }

    fn report(&mut self, kind: DiagnosticKind, env: &Env, span: Span, message: String) {
        let d = Diagnostic::new(kind, &env.file, span.line, span.column, span.len, message);
        self.diagnostics.push((self.owner, d));
    }

    fn warn(&mut self, kind: DiagnosticKind, env: &Env, span: Span, message: String) {
        let d = Diagnostic::new(kind, &env.file, span.line, span.column, span.len, message);
        self.diagnostics.push((self.owner, d.warning()));
    }

    /// Environment of a field-backed function body: the receiver, the
    /// argument and the `missä` bindings in order.
    pub fn function_env(&mut self, index: usize) -> Env {
        let decls = self.decls;
        let decl = &decls[index];
        let mut env = Env::new(&decl.file);
        if let DeclKind::Function {
            class,
            self_name,
            arg,
            wheres,
            ..
        } = &decl.kind
        {
            env.bind(self_name, self.hierarchy.class_type(class));
            if let Some(a) = arg {
                env.bind(&a.name, self.hierarchy.class_type(&a.class));
            }
            for w in wheres {
                let ty = self.infer(&w.value, &env, None);
                env.bind(&w.name, ty);
            }
        }
        env
    }

    /// Result type of the function declared at `index`.
    pub fn function_type(&mut self, index: usize) -> TypeSet {
        match self.functions.get(&index) {
            Some(State::Done(t)) => return t.clone(),
            Some(State::InProgress) => return TypeSet::empty(),
            None => {}
        }
        self.functions.insert(index, State::InProgress);
        let saved = std::mem::replace(&mut self.owner, index);
        let env = self.function_env(index);
        let decls = self.decls;
        let ty = match &decls[index].kind {
            DeclKind::Function { body, .. } => self.infer(body, &env, None),
            _ => TypeSet::Any,
        };
        self.owner = saved;
        tracing::trace!(function = index, ty = %ty, "inferred function type");
        self.functions.insert(index, State::Done(ty.clone()));
        ty
    }

    /// Type of a global variable: its declared class when that class
    /// exists, otherwise the type of its value.
    pub fn global_type(&mut self, name: &str) -> Option<TypeSet> {
        let (class, index) = self.hierarchy.globals.get(name)?.clone();
        if self.hierarchy.is_class(&class) {
            return Some(self.hierarchy.class_type(&class));
        }
        match self.globals.get(name) {
            Some(State::Done(t)) => return Some(t.clone()),
            Some(State::InProgress) => return Some(TypeSet::Any),
            None => {}
        }
        self.globals.insert(name.to_owned(), State::InProgress);
        let saved = std::mem::replace(&mut self.owner, index);
        let decls = self.decls;
        let decl = &decls[index];
        let ty = match &decl.kind {
            DeclKind::Variable { value, .. } => self.infer(value, &Env::new(&decl.file), None),
            _ => TypeSet::Any,
        };
        self.owner = saved;
        self.globals.insert(name.to_owned(), State::Done(ty.clone()));
        Some(ty)
    }

    /// Infer and cache the type of `expr`. A second call returns the cached
    /// set without reporting anything again.
    pub fn infer(&mut self, expr: &Expr, env: &Env, expected: Option<&TypeSet>) -> TypeSet {
        if let Some(t) = expr.ty.get() {
            return t.clone();
        }
        let ty = self.compute(expr, env, expected);
        let _ = expr.ty.set(ty.clone());
        ty
    }

    fn compute(&mut self, expr: &Expr, env: &Env, expected: Option<&TypeSet>) -> TypeSet {
        match &expr.kind {
            ExprKind::Num(_) => TypeSet::of("luku"),
            ExprKind::Str(_) => TypeSet::of("merkkijono"),
            ExprKind::Var { name, .. } => {
                if let Some(t) = env.lookup(name) {
                    return t.clone();
                }
                if let Some(t) = self.global_type(name) {
                    return t;
                }
                self.report(
                    DiagnosticKind::UnresolvedSymbol,
                    env,
                    expr.span,
                    format!("'{}' is not defined here", name),
                );
                TypeSet::Any
            }
            ExprKind::Bind { value, .. } => self.infer(value, env, expected),
            ExprKind::BackrefUse { .. } => TypeSet::Any,
            ExprKind::Field { recv, field, arg } => {
                let recv_ty = self.infer(recv, env, None);
                if let Some((_, a)) = arg {
                    self.infer(a, env, None);
                }
                self.member_type(expr, env, &recv_ty, field, arg.as_ref().map(|(c, _)| *c), expected)
            }
            ExprKind::Subscript { recv, index } => {
                self.infer(recv, env, None);
                self.infer(index, env, Some(&TypeSet::of("luku")));
                TypeSet::Any
            }
            ExprKind::Slice { recv, start, end } => {
                let ty = self.infer(recv, env, None);
                self.infer(start, env, None);
                if let Some(e) = end {
                    self.infer(e, env, None);
                }
                if ty.is_exactly("merkkijono") {
                    ty
                } else {
                    TypeSet::of("lista")
                }
            }
            ExprKind::List(items) => {
                for item in items {
                    self.infer(item, env, None);
                }
                TypeSet::of("lista")
            }
            ExprKind::New { class, args } => {
                for (_, value) in args {
                    self.infer(value, env, None);
                }
                if !self.hierarchy.is_class(class) {
                    self.report(
                        DiagnosticKind::UnresolvedClass,
                        env,
                        expr.span,
                        format!("class '{}' is not declared", class),
                    );
                    return TypeSet::Any;
                }
                let known = self.hierarchy.all_fields(class);
                for (field, value) in args {
                    if !known.iter().any(|f| &f.name == field) {
                        self.report(
                            DiagnosticKind::UnresolvedMember,
                            env,
                            value.span,
                            format!("class '{}' has no field '{}'", class, field),
                        );
                    }
                }
                TypeSet::of(class)
            }
            ExprKind::Lambda(_) => TypeSet::Any,
            ExprKind::Ternary {
                conditions,
                then,
                otherwise,
            } => {
                for c in conditions {
                    self.infer_condition(c, env);
                }
                let a = self.infer(then, env, expected);
                let b = self.infer(otherwise, env, expected);
                a.union(&b)
            }
            ExprKind::Arithmetic { op, left, right } => {
                let l = self.infer(left, env, None);
                self.infer(right, env, None);
                if *op == ArithOp::Add && l.is_exactly("merkkijono") {
                    TypeSet::of("merkkijono")
                } else {
                    TypeSet::of("luku")
                }
            }
        }
    }

    /// Type of `recv.field(arg)`. A field that may exist on the receiver
    /// wins over functions of the same name and yields `Any`.
    fn member_type(
        &mut self,
        expr: &Expr,
        env: &Env,
        recv_ty: &TypeSet,
        field: &str,
        arg: Option<crate::morphology::Case>,
        expected: Option<&TypeSet>,
    ) -> TypeSet {
        let h = self.hierarchy;
        let candidates = h
            .functions
            .get(&(field.to_owned(), arg))
            .cloned()
            .unwrap_or_default();
        let field_receivers = if arg.is_none() {
            h.field_receivers(field)
        } else {
            TypeSet::empty()
        };

        if candidates.is_empty() && field_receivers.is_empty() {
            let what = match arg {
                Some(c) => format!("no function '{}' taking the {} case", field, c.name()),
                None => format!("no field or function '{}'", field),
            };
            self.report(DiagnosticKind::UnresolvedMember, env, expr.span, what);
            return TypeSet::Any;
        }
        if field_receivers.overlaps(recv_ty) {
            return TypeSet::Any;
        }

        let matching: Vec<_> = candidates
            .iter()
            .filter(|c| h.class_type(&c.class).overlaps(recv_ty))
            .collect();
        if matching.is_empty() {
            let mut wanted = field_receivers;
            for c in &candidates {
                wanted = wanted.union(&h.class_type(&c.class));
            }
            self.report(
                DiagnosticKind::EmptyType,
                env,
                expr.span,
                format!(
                    "'{}' is defined for {} but the receiver is {}",
                    field, wanted, recv_ty
                ),
            );
            return TypeSet::Any;
        }

        let results: Vec<TypeSet> = matching
            .iter()
            .map(|c| self.function_type(c.decl))
            .collect();
        let mut chosen: Vec<&TypeSet> = results.iter().collect();
        if let Some(exp) = expected {
            let pruned: Vec<&TypeSet> = results
                .iter()
                .filter(|t| t.is_empty() || t.overlaps(exp))
                .collect();
            if pruned.is_empty() {
                self.warn(
                    DiagnosticKind::EmptyType,
                    env,
                    expr.span,
                    format!("'{}' is expected to be {} but can only be inferred loosely", field, exp),
                );
            } else {
                chosen = pruned;
            }
        }
        let ty = chosen
            .into_iter()
            .fold(TypeSet::empty(), |acc, t| acc.union(t));
        if ty.is_empty() {
            TypeSet::Any
        } else {
            ty
        }
    }

    /// Infer every expression of a condition. Quantified variables are
    /// visible inside the quantified condition only.
    pub fn infer_condition(&mut self, cond: &Cond, env: &Env) {
        match cond {
            Cond::Compare { left, right, .. } => {
                self.infer(left, env, None);
                self.infer(right, env, None);
            }
            Cond::UserCompare {
                name,
                left,
                right,
                span,
                ..
            } => {
                let left_ty = self.infer(left, env, None);
                self.infer(right, env, None);
                let Some(owners) = self.hierarchy.comparisons.get(name) else {
                    self.report(
                        DiagnosticKind::UnresolvedMember,
                        env,
                        *span,
                        format!("no comparison operator '{}'", name),
                    );
                    return;
                };
                let receivers = owners
                    .iter()
                    .fold(TypeSet::empty(), |acc, c| acc.union(&self.hierarchy.class_type(c)));
                if !receivers.overlaps(&left_ty) {
                    self.report(
                        DiagnosticKind::EmptyType,
                        env,
                        *span,
                        format!(
                            "comparison '{}' is defined for {} but the left side is {}",
                            name, receivers, left_ty
                        ),
                    );
                }
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
                self.infer(collection, env, None);
                let inner = env.with(var, TypeSet::Any);
                self.infer_condition(cond, &inner);
            }
        }
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::morphology::Lexicon;
    use crate::parser::{collect_signatures, parse_unit, Signatures};
    use crate::pass2_hierarchy::build_hierarchy;

    /// Parse with a signature prescan and build the hierarchy.
    pub(crate) fn program(src: &str) -> (Vec<Decl>, Hierarchy) {
        let lexicon = Lexicon::core().unwrap();
        let first = parse_unit(tokenize(src, &lexicon), "test.itp", &Signatures::new());
        let signatures = collect_signatures(&first.decls);
        let unit = parse_unit(tokenize(src, &lexicon), "test.itp", &signatures);
        assert!(unit.diagnostics.is_empty(), "{:?}", unit.diagnostics);
        let (h, diags) = build_hierarchy(&unit.decls);
        assert!(diags.is_empty(), "{:?}", diags);
        (unit.decls, h)
    }

    fn value(decl: &Decl) -> &Expr {
        match &decl.kind {
            DeclKind::Variable { value, .. } => value,
            other => panic!("expected variable, got {:?}", other),
        }
    }

    fn set(names: &[&str]) -> TypeSet {
        TypeSet::Classes(names.iter().map(|s| s.to_string()).collect())
    }

    const POINTS: &str = "piste:llä on x.\n\
                          pallo on piste.\n\
                          piste:n etäisyys on 5.\n";

    #[test]
    fn literals_are_exact() {
        let (decls, h) = program("Olkoon a 5.\nOlkoon b \"teksti\".");
        let mut inf = Inferencer::new(&h, &decls);
        let env = Env::new("test.itp");
        assert_eq!(inf.infer(value(&decls[0]), &env, None), TypeSet::of("luku"));
        assert_eq!(inf.infer(value(&decls[1]), &env, None), TypeSet::of("merkkijono"));
    }

    #[test]
    fn inference_is_idempotent() {
        let (decls, h) = program(&format!("{}Olkoon a 5:n etäisyys.", POINTS));
        let mut inf = Inferencer::new(&h, &decls);
        let env = Env::new("test.itp");
        let first = inf.infer(value(&decls[3]), &env, None);
        let reported = inf.take_diagnostics().len();
        let second = inf.infer(value(&decls[3]), &env, None);
        assert_eq!(first, second);
        assert_eq!(reported, 1);
        assert!(inf.take_diagnostics().is_empty());
    }

    #[test]
    fn function_applies_to_subclass_receivers() {
        let src = format!("{}Olkoon p uusi pallo.\nOlkoon a p:n etäisyys.", POINTS);
        let (decls, h) = program(&src);
        let mut inf = Inferencer::new(&h, &decls);
        let ty = inf.infer(value(&decls[4]), &Env::new("test.itp"), None);
        assert_eq!(ty, TypeSet::of("luku"));
        assert!(inf.take_diagnostics().is_empty());
    }

    #[test]
    fn field_wins_over_function_of_same_name() {
        let src = format!("{}piste:n x on 5.\nOlkoon p uusi piste.\nOlkoon a p:n x.", POINTS);
        let (decls, h) = program(&src);
        let mut inf = Inferencer::new(&h, &decls);
        let ty = inf.infer(value(&decls[5]), &Env::new("test.itp"), None);
        assert_eq!(ty, TypeSet::Any);
    }

    #[test]
    fn receiver_mismatch_is_an_empty_type_error() {
        let (decls, h) = program(&format!("{}Olkoon a 5:n etäisyys.", POINTS));
        let mut inf = Inferencer::new(&h, &decls);
        inf.set_owner(3);
        inf.infer(value(&decls[3]), &Env::new("test.itp"), None);
        let diags = inf.take_diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].0, 3);
        assert_eq!(diags[0].1.kind, DiagnosticKind::EmptyType);
        assert!(diags[0].1.message.contains("{pallo, piste}"), "{}", diags[0].1.message);
        assert!(diags[0].1.message.contains("{luku}"));
    }

    #[test]
    fn unknown_member_and_symbol() {
        let (decls, h) = program("Olkoon a 5:n tuntematon.\nOlkoon b c.");
        let mut inf = Inferencer::new(&h, &decls);
        let env = Env::new("test.itp");
        inf.infer(value(&decls[0]), &env, None);
        inf.infer(value(&decls[1]), &env, None);
        let kinds: Vec<DiagnosticKind> = inf.take_diagnostics().into_iter().map(|(_, d)| d.kind).collect();
        assert_eq!(kinds, [DiagnosticKind::UnresolvedMember, DiagnosticKind::UnresolvedSymbol]);
    }

    #[test]
    fn recursive_function_terminates() {
        let (decls, h) = program("luku:n kertoma on luku:n kertoma.");
        let mut inf = Inferencer::new(&h, &decls);
        assert_eq!(inf.function_type(0), TypeSet::Any);
        assert_eq!(inf.function_type(0), TypeSet::Any);
        assert!(inf.take_diagnostics().is_empty());
    }

    #[test]
    fn expected_type_prunes_overloads() {
        let src = "muoto:lla on nimi.\n\
                   neliö on muoto.\n\
                   ympyrä on muoto.\n\
                   neliö:n ala on 4.\n\
                   ympyrä:n ala on \"pii\".\n\
                   Olkoon a m:n ala.\n\
                   Olkoon b m:n ala.\n\
                   Olkoon c m:n ala.\n";
        let (decls, h) = program(src);
        let mut inf = Inferencer::new(&h, &decls);
        let env = Env::new("test.itp").with("m", h.class_type("muoto"));
        assert_eq!(
            inf.infer(value(&decls[5]), &env, None),
            set(&["luku", "merkkijono"])
        );
        let luku = TypeSet::of("luku");
        assert_eq!(inf.infer(value(&decls[6]), &env, Some(&luku)), luku);
        assert!(inf.take_diagnostics().is_empty());

        let lista = TypeSet::of("lista");
        let loose = inf.infer(value(&decls[7]), &env, Some(&lista));
        assert_eq!(loose, set(&["luku", "merkkijono"]));
        let diags = inf.take_diagnostics();
        assert_eq!(diags.len(), 1);
        assert!(!diags[0].1.is_error());
    }

    #[test]
    fn global_types_follow_declared_class_or_value() {
        let (decls, h) = program("Olkoon pieni luku 2.\nOlkoon a pieni_luku.\nOlkoon b \"x\".\nOlkoon c b.");
        let mut inf = Inferencer::new(&h, &decls);
        assert_eq!(inf.global_type("pieni_luku"), Some(TypeSet::of("luku")));
        assert_eq!(inf.global_type("b"), Some(TypeSet::of("merkkijono")));
        assert_eq!(
            inf.infer(value(&decls[3]), &Env::new("test.itp"), None),
            TypeSet::of("merkkijono")
        );
        assert_eq!(inf.global_type("puuttuu"), None);
    }

    #[test]
    fn string_concatenation_stays_text() {
        let (decls, h) = program("Olkoon a \"x\" lisättynä 1:llä.\nOlkoon b 2 lisättynä 1:llä.");
        let mut inf = Inferencer::new(&h, &decls);
        let env = Env::new("test.itp");
        assert_eq!(inf.infer(value(&decls[0]), &env, None), TypeSet::of("merkkijono"));
        assert_eq!(inf.infer(value(&decls[1]), &env, None), TypeSet::of("luku"));
    }

    #[test]
    fn type_set_algebra() {
        let a = set(&["a", "b"]);
        let b = set(&["b", "c"]);
        assert_eq!(a.intersect(&b), set(&["b"]));
        assert_eq!(a.union(&b), set(&["a", "b", "c"]));
        assert!(a.overlaps(&TypeSet::Any));
        assert!(!a.overlaps(&TypeSet::empty()));
        assert_eq!(TypeSet::Any.intersect(&a), a);
        assert_eq!(format!("{}", a), "{a, b}");
        assert_eq!(format!("{}", TypeSet::empty()), "nothing");
    }
}
