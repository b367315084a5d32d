//! Pass 5: Code generation -- emit target code for every declaration that
//! passed validation.
//!
//! Generation is a pure function of the validated tree, the hierarchy and a
//! [`Frame`] threaded through the recursion. Nested scopes clone the frame,
//! so nothing a body declares leaks into its parent.

use crate::ast::*;
use crate::mangle::{call_name, comparison_name, escape_identifier, function_name, property_key};
use crate::morphology::Case;
use crate::parser::Options;
use crate::pass2_hierarchy::{ClassOrigin, Hierarchy, CONSTRUCTION_HOOK};
use std::collections::{BTreeMap, BTreeSet};

const INDENT: &str = " ";

/// Generate the target program. Declarations in `skip` and declarations
/// not marked for emission are left out.
pub fn generate(decls: &[Decl], hierarchy: &Hierarchy, skip: &BTreeSet<usize>) -> String {
    let mut gen = Generator {
        hierarchy,
        out: Vec::new(),
    };
    let mut options: BTreeMap<&str, Options> = BTreeMap::new();
    let mut strict = false;

    for (i, decl) in decls.iter().enumerate() {
        let current = options.entry(decl.file.as_str()).or_default();
        if let DeclKind::Directive(Directive::Option { name, enabled }) = &decl.kind {
            current.set(name, *enabled);
            strict |= decl.emit && name == "tiukka" && *enabled;
        }
        if !decl.emit || skip.contains(&i) {
            continue;
        }
        let frame = Frame {
            options: *current,
            declared: BTreeSet::new(),
            depth: 0,
        };
        gen.declaration(i, decl, &frame);
    }

    tracing::debug!(chunks = gen.out.len(), strict, "code generated");
    let mut code = String::new();
    if strict {
        code.push_str("\"use strict\";\n");
    }
    code.push_str(&gen.out.join("\n"));
    if !code.is_empty() && !code.ends_with('\n') {
        code.push('\n');
    }
    code
}

/// Context of the scope being generated.
#[derive(Debug, Clone)]
struct Frame {
    options: Options,
    /// Locals already introduced with `var` in this function scope.
    declared: BTreeSet<String>,
    depth: usize,
}

impl Frame {
    fn nested(&self) -> Frame {
        Frame {
            depth: self.depth + 1,
            ..self.clone()
        }
    }

    /// A fresh function scope one level deeper.
    fn function(&self) -> Frame {
        Frame {
            options: self.options,
            declared: BTreeSet::new(),
            depth: self.depth + 1,
        }
    }

    fn pad(&self) -> String {
        INDENT.repeat(self.depth)
    }
}

struct Generator<'a> {
    hierarchy: &'a Hierarchy,
    out: Vec<String>,
}

/// A string literal in the target language.
fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_owned()).to_string()
}

fn ident(name: &str) -> String {
    escape_identifier(name)
}

fn params_list(params: &[Param]) -> String {
    params
        .iter()
        .map(|p| ident(&p.name))
        .collect::<Vec<_>>()
        .join(", ")
}

impl<'a> Generator<'a> {
    // -- Declarations ---------------------------------------------

    fn declaration(&mut self, index: usize, decl: &Decl, frame: &Frame) {
        let mut chunk = String::new();
        match &decl.kind {
            DeclKind::Variable { name, value, .. } => {
                chunk.push_str(&self.hoist_expr(value, frame));
                chunk.push_str(&format!("var {} = {};", ident(name), self.expr(value, frame)));
            }
            DeclKind::Procedure { name, params, body } => {
                let cases: Vec<Case> = params.iter().map(|p| p.case).collect();
                let inner = frame.function();
                chunk.push_str(&format!(
                    "function {}({}) {{\n{}}}",
                    ident(&call_name(name, &cases, None)),
                    params_list(params),
                    self.block(body, &inner)
                ));
            }
            DeclKind::Method {
                name,
                subject,
                params,
                body,
            } => {
                let cases: Vec<Case> = params.iter().map(|p| p.case).collect();
                let inner = frame.function();
                chunk.push_str(&format!(
                    "{}.prototype.{} = function({}) {{\n{}var {} = this;\n{}}};",
                    self.hierarchy.js_name(&subject.class),
                    ident(&call_name(name, &cases, Some(subject.case))),
                    params_list(params),
                    inner.pad(),
                    ident(&subject.name),
                    self.block(body, &inner)
                ));
            }
            DeclKind::Class { name, .. } => {
                // Later declarations of the same class only merge fields.
                let first = self.hierarchy.classes.get(name).is_some_and(|info| {
                    info.origin == ClassOrigin::Declared && info.decl == Some(index)
                });
                if first {
                    chunk.push_str(&self.class(name, frame));
                }
            }
            DeclKind::Function {
                class,
                self_name,
                field,
                arg,
                body,
                wheres,
                memoize,
            } => {
                chunk.push_str(&self.function(
                    class,
                    self_name,
                    field,
                    arg.as_ref(),
                    body,
                    wheres,
                    *memoize || frame.options.memoize,
                    frame,
                ));
            }
            DeclKind::Comparison {
                class,
                name,
                left,
                right,
                conditions,
            } => {
                let inner = frame.function();
                let pad = inner.pad();
                let conds = self.conditions(conditions, &inner);
                chunk.push_str(&format!(
                    "{}.prototype.{} = function({}) {{\n{pad}var {} = this;\n{}{pad}return {};\n}};",
                    self.hierarchy.js_name(class),
                    ident(&comparison_name(name)),
                    ident(&right.name),
                    ident(left),
                    self.hoist_conditions(conditions, &inner),
                    conds,
                ));
            }
            DeclKind::Directive(Directive::SpliceCode(code)) => chunk.push_str(code),
            DeclKind::Directive(Directive::Binding { target, fields, .. }) => {
                chunk.push_str(&self.accessors(target, fields));
            }
            DeclKind::Directive(_) => {}
        }
        if !decl.additional.is_empty() {
            if !chunk.is_empty() {
                chunk.push('\n');
            }
            chunk.push_str(&self.block(&decl.additional, frame));
            if chunk.ends_with('\n') {
                chunk.pop();
            }
        }
        if !chunk.is_empty() {
            self.out.push(chunk);
        }
    }

    /// Constructor, prototype chain, `assign` helper and field accessors.
    fn class(&self, name: &str, frame: &Frame) -> String {
        let h = self.hierarchy;
        let js = h.js_name(name);
        let inner = frame.function();
        let pad = inner.pad();
        let own: &[FieldDecl] = h.classes.get(name).map(|c| c.fields.as_slice()).unwrap_or(&[]);
        let superclass = h
            .classes
            .get(name)
            .and_then(|c| c.superclass.as_ref())
            .and_then(|s| h.classes.get(s));

        let mut out = format!("function {}(vals) {{\n{pad}vals = vals || {{}};\n", js);
        // Runtime constructors cannot initialize a foreign `this`; only the
        // prototype is inherited from them.
        if let Some(s) = superclass.filter(|s| s.origin == ClassOrigin::Declared) {
            out.push_str(&format!("{pad}{}.call(this, vals);\n", s.js_name));
        }
        for f in own {
            if let Some(init) = &f.initializer {
                out.push_str(&self.hoist_expr(init, &inner));
            }
        }
        for f in own {
            let key = js_string(&property_key(&f.name));
            out.push_str(&format!(
                "{pad}this.{} = ({} in vals) ? vals[{}] : {};\n",
                ident(&f.name),
                key,
                key,
                self.field_default(f, &inner)
            ));
        }
        if h.has_construction_hook(name) {
            out.push_str(&format!(
                "{pad}if (this.constructor === {}) this.{}();\n",
                js,
                ident(CONSTRUCTION_HOOK)
            ));
        }
        out.push('}');
        if let Some(s) = superclass {
            let sjs = &s.js_name;
            out.push_str(&format!("\n{js}.prototype = Object.create({sjs}.prototype);"));
            out.push_str(&format!("\n{js}.prototype.constructor = {js};"));
        }
        out.push('\n');
        out.push_str(&self.accessors(&js, own));
        out
    }

    fn field_default(&self, field: &FieldDecl, frame: &Frame) -> String {
        match &field.initializer {
            Some(init) => self.expr(init, frame),
            None if field.plural => "[]".to_owned(),
            None => "undefined".to_owned(),
        }
    }

    fn accessors(&self, js: &str, fields: &[FieldDecl]) -> String {
        let mut lines = vec![format!(
            "{js}.prototype.assign = function(n, v) {{ this[n] = v; }};"
        )];
        for f in fields {
            lines.push(format!(
                "{js}.prototype.{} = function() {{ return this.{}; }};",
                ident(&function_name(&f.name, None)),
                ident(&f.name)
            ));
        }
        lines.join("\n")
    }

    #[allow(clippy::too_many_arguments)]
    fn function(
        &self,
        class: &str,
        self_name: &str,
        field: &str,
        arg: Option<&Param>,
        body: &Expr,
        wheres: &[Where],
        memoize: bool,
        frame: &Frame,
    ) -> String {
        let inner = frame.function();
        let pad = inner.pad();
        let accessor = ident(&function_name(field, arg.map(|a| a.case)));
        let param = arg.map(|a| ident(&a.name)).unwrap_or_default();
        let memo = js_string(&format!("${}", accessor));

        let mut out = format!(
            "{}.prototype.{} = function({}) {{\n",
            self.hierarchy.js_name(class),
            accessor,
            param
        );
        if memoize {
            match arg {
                None => out.push_str(&format!(
                    "{pad}if (this.hasOwnProperty({memo})) return this[{memo}];\n"
                )),
                Some(_) => {
                    out.push_str(&format!(
                        "{pad}if (!this.hasOwnProperty({memo}) && Object(this) === this) \
                         Object.defineProperty(this, {memo}, {{ value: new Map() }});\n"
                    ));
                    out.push_str(&format!("{pad}var $memo = this[{memo}];\n"));
                    out.push_str(&format!(
                        "{pad}if ($memo && $memo.has({param})) return $memo.get({param});\n"
                    ));
                }
            }
        }
        out.push_str(&format!("{pad}var {} = this;\n", ident(self_name)));
        let mut binds = Vec::new();
        for w in wheres {
            collect_binds(&w.value, &mut binds);
        }
        collect_binds(body, &mut binds);
        out.push_str(&hoisted(&binds, &inner));
        for w in wheres {
            out.push_str(&format!(
                "{pad}var {} = {};\n",
                ident(&w.name),
                self.expr(&w.value, &inner)
            ));
        }
        let value = self.expr(body, &inner);
        if memoize {
            out.push_str(&format!("{pad}var $value = {value};\n"));
            match arg {
                None => out.push_str(&format!(
                    "{pad}if (Object(this) === this) Object.defineProperty(this, {memo}, {{ value: $value }});\n"
                )),
                Some(_) => out.push_str(&format!("{pad}if ($memo) $memo.set({param}, $value);\n")),
            }
            out.push_str(&format!("{pad}return $value;\n"));
        } else {
            out.push_str(&format!("{pad}return {value};\n"));
        }
        out.push_str("};");
        out
    }

    // -- Statements -----------------------------------------------

    /// Statements of one block, with its backreference temporaries
    /// declared first.
    fn block(&self, stmts: &[Stmt], frame: &Frame) -> String {
        let mut binds = Vec::new();
        for s in stmts {
            collect_stmt_binds(s, &mut binds);
        }
        let mut frame = frame.clone();
        let mut out = hoisted(&binds, &frame);
        for s in stmts {
            out.push_str(&self.statement(s, &mut frame));
        }
        out
    }

    fn statement(&self, stmt: &Stmt, frame: &mut Frame) -> String {
        let pad = frame.pad();
        match stmt {
            Stmt::Call(call) => self.call(call, frame),
            Stmt::If { conditions, body } => format!(
                "{pad}if ({}) {{\n{}{pad}}}\n",
                self.conditions(conditions, frame),
                self.block(body, &frame.nested())
            ),
            Stmt::Block(stmts) => {
                let mut out = String::new();
                for s in stmts {
                    out.push_str(&self.statement(s, frame));
                }
                out
            }
            Stmt::For {
                var,
                collection,
                body,
            } => format!(
                "{pad}for (const {} of {}) {{\n{}{pad}}}\n",
                ident(var),
                self.expr(collection, frame),
                self.block(body, &frame.nested())
            ),
            Stmt::MethodAssign {
                subject,
                subject_case,
                name,
                params,
                body,
                ..
            } => {
                let cases: Vec<Case> = params.iter().map(|p| p.case).collect();
                format!(
                    "{pad}{}.assign({}, ({}) => {{\n{}{pad}}});\n",
                    self.expr(subject, frame),
                    js_string(&ident(&call_name(name, &cases, Some(*subject_case)))),
                    params_list(params),
                    self.block(body, &frame.function())
                )
            }
        }
    }

    fn call(&self, call: &Call, frame: &mut Frame) -> String {
        let pad = frame.pad();
        let mut out = String::new();
        for w in &call.wheres {
            let keyword = if frame.declared.insert(w.name.clone()) { "var " } else { "" };
            out.push_str(&format!(
                "{pad}{keyword}{} = {};\n",
                ident(&w.name),
                self.expr(&w.value, frame)
            ));
        }

        let args: Vec<String> = call.args.iter().map(|(_, a)| self.expr(a, frame)).collect();
        if let (Some(sugar), Some((_, subject))) = (call.sugar(), &call.subject) {
            let value = args.first().cloned().unwrap_or_default();
            let line = match sugar {
                Sugar::Assign => format!("{} = {}", self.target(subject, frame), value),
                Sugar::AddAssign => format!("{} += {}", self.target(subject, frame), value),
                Sugar::SubAssign => format!("{} -= {}", self.target(subject, frame), value),
                Sugar::Return => format!("return {}", self.expr(subject, frame)),
            };
            out.push_str(&format!("{pad}{line};\n"));
            return out;
        }

        let mangled = ident(&call_name(
            &call.name,
            &call.arg_cases(),
            call.subject.as_ref().map(|(c, _)| *c),
        ));
        let invocation = match &call.subject {
            Some((_, subject)) => format!(
                "{}.{}({})",
                self.expr(subject, frame),
                mangled,
                args.join(", ")
            ),
            None => format!("{}({})", mangled, args.join(", ")),
        };
        let assignment = match &call.output {
            Some(o) if frame.declared.insert(o.clone()) => format!("var {} = ", ident(o)),
            Some(o) => format!("{} = ", ident(o)),
            None => String::new(),
        };
        out.push_str(&format!("{pad}{assignment}{invocation};\n"));
        out
    }

    /// Left-hand side of an assignment: fields are written directly, not
    /// through their accessor.
    fn target(&self, expr: &Expr, frame: &Frame) -> String {
        match &expr.kind {
            ExprKind::Field {
                recv,
                field,
                arg: None,
            } => format!("{}.{}", self.expr(recv, frame), ident(field)),
            _ => self.expr(expr, frame),
        }
    }

    // -- Conditions -----------------------------------------------

    fn conditions(&self, conds: &[Cond], frame: &Frame) -> String {
        let parts: Vec<String> = conds
            .iter()
            .map(|c| format!("({})", self.condition(c, frame)))
            .collect();
        parts.join(" && ")
    }

    fn condition(&self, cond: &Cond, frame: &Frame) -> String {
        match cond {
            Cond::Compare {
                negated,
                op,
                left,
                right,
            } => {
                let text = format!("{} {} {}", self.expr(left, frame), op.js(), self.expr(right, frame));
                if *negated {
                    format!("!({})", text)
                } else {
                    text
                }
            }
            Cond::UserCompare {
                negated,
                name,
                left,
                right,
                ..
            } => {
                let text = format!(
                    "{}.{}({})",
                    self.expr(left, frame),
                    ident(&comparison_name(name)),
                    self.expr(right, frame)
                );
                if *negated {
                    format!("!{}", text)
                } else {
                    text
                }
            }
            Cond::ForAll {
                var,
                collection,
                cond,
            } => format!(
                "{}.every(({}) => {})",
                self.expr(collection, frame),
                ident(var),
                self.condition(cond, frame)
            ),
            Cond::Exists {
                var,
                collection,
                cond,
            } => format!(
                "{}.some(({}) => {})",
                self.expr(collection, frame),
                ident(var),
                self.condition(cond, frame)
            ),
        }
    }

    // -- Expressions ----------------------------------------------

    fn expr(&self, expr: &Expr, frame: &Frame) -> String {
        match &expr.kind {
            ExprKind::Var { name, .. } => ident(name),
            ExprKind::Bind { name, value } => {
                format!("({} = {})", ident(name), self.expr(value, frame))
            }
            ExprKind::BackrefUse { name } => ident(name),
            ExprKind::Field { recv, field, arg } => {
                let recv = self.expr(recv, frame);
                match arg {
                    Some((case, a)) => format!(
                        "{}.{}({})",
                        recv,
                        ident(&function_name(field, Some(*case))),
                        self.expr(a, frame)
                    ),
                    None => format!("{}.{}()", recv, ident(&function_name(field, None))),
                }
            }
            ExprKind::Subscript { recv, index } => format!(
                "{}[{} - 1]",
                self.expr(recv, frame),
                self.expr(index, frame)
            ),
            ExprKind::Slice { recv, start, end } => {
                let mut out = format!("{}.slice({} - 1", self.expr(recv, frame), self.expr(start, frame));
                if let Some(e) = end {
                    out.push_str(&format!(", {}", self.expr(e, frame)));
                }
                out.push(')');
                out
            }
            ExprKind::Num(n) => format!("({})", n),
            ExprKind::Str(s) => js_string(s),
            ExprKind::List(items) => {
                let items: Vec<String> = items.iter().map(|i| self.expr(i, frame)).collect();
                format!("[{}]", items.join(", "))
            }
            ExprKind::New { class, args } => self.constructor(class, args, frame),
            ExprKind::Lambda(body) => {
                let inner = frame.function();
                format!(
                    "() => {{\n{}{}}}",
                    self.block(std::slice::from_ref(&**body), &inner),
                    frame.pad()
                )
            }
            ExprKind::Ternary {
                conditions,
                then,
                otherwise,
            } => format!(
                "(({}) ? {} : {})",
                self.conditions(conditions, frame),
                self.expr(then, frame),
                self.expr(otherwise, frame)
            ),
            ExprKind::Arithmetic { op, left, right } => format!(
                "({} {} {})",
                self.expr(left, frame),
                op.js(),
                self.expr(right, frame)
            ),
        }
    }

    /// `new C({...})` with the supplied fields, then the defaults of the
    /// declared fields that were not supplied.
    fn constructor(&self, class: &str, args: &[(String, Expr)], frame: &Frame) -> String {
        let h = self.hierarchy;
        let js = h.js_name(class);
        let mut entries: Vec<String> = args
            .iter()
            .map(|(f, v)| format!("{}: {}", js_string(&property_key(f)), self.expr(v, frame)))
            .collect();
        let declared = h
            .classes
            .get(class)
            .is_some_and(|c| c.origin == ClassOrigin::Declared);
        if declared {
            for f in h.all_fields(class) {
                if args.iter().any(|(name, _)| *name == f.name) {
                    continue;
                }
                if f.plural || f.initializer.is_some() {
                    entries.push(format!(
                        "{}: {}",
                        js_string(&property_key(&f.name)),
                        self.field_default(&f, frame)
                    ));
                }
            }
        }
        if entries.is_empty() && !declared {
            format!("new {}()", js)
        } else {
            format!("new {}({{{}}})", js, entries.join(", "))
        }
    }

    fn hoist_expr(&self, expr: &Expr, frame: &Frame) -> String {
        let mut binds = Vec::new();
        collect_binds(expr, &mut binds);
        hoisted(&binds, frame)
    }

    fn hoist_conditions(&self, conds: &[Cond], frame: &Frame) -> String {
        let mut binds = Vec::new();
        for c in conds {
            collect_cond_binds(c, &mut binds);
        }
        hoisted(&binds, frame)
    }
}

// ──────────────────────────────────────────────
// Backreference temporaries
// ──────────────────────────────────────────────

fn hoisted(binds: &[String], frame: &Frame) -> String {
    if binds.is_empty() {
        return String::new();
    }
    let names: Vec<String> = binds.iter().map(|b| ident(b)).collect();
    format!("{}var {};\n", frame.pad(), names.join(", "))
}

fn push_unique(out: &mut Vec<String>, name: &str) {
    if !out.iter().any(|n| n == name) {
        out.push(name.to_owned());
    }
}

/// Temporaries bound in `expr`, not looking into lambda bodies, which
/// declare their own.
fn collect_binds(expr: &Expr, out: &mut Vec<String>) {
    match &expr.kind {
        ExprKind::Bind { name, .. } => push_unique(out, name),
        ExprKind::Ternary { conditions, .. } => {
            for c in conditions {
                collect_cond_binds(c, out);
            }
        }
        _ => {}
    }
    for child in expr.children() {
        collect_binds(child, out);
    }
}

fn collect_cond_binds(cond: &Cond, out: &mut Vec<String>) {
    match cond {
        Cond::Compare { left, right, .. } | Cond::UserCompare { left, right, .. } => {
            collect_binds(left, out);
            collect_binds(right, out);
        }
        Cond::ForAll {
            collection, cond, ..
        }
        | Cond::Exists {
            collection, cond, ..
        } => {
            collect_binds(collection, out);
            collect_cond_binds(cond, out);
        }
    }
}

/// Temporaries of a statement that belong to the enclosing block. Bodies
/// of conditionals and loops hoist their own.
fn collect_stmt_binds(stmt: &Stmt, out: &mut Vec<String>) {
    match stmt {
        Stmt::Call(call) => {
            for w in &call.wheres {
                collect_binds(&w.value, out);
            }
            if let Some((_, s)) = &call.subject {
                collect_binds(s, out);
            }
            for (_, a) in &call.args {
                collect_binds(a, out);
            }
        }
        Stmt::If { conditions, .. } => {
            for c in conditions {
                collect_cond_binds(c, out);
            }
        }
        Stmt::Block(stmts) => {
            for s in stmts {
                collect_stmt_binds(s, out);
            }
        }
        Stmt::For { collection, .. } => collect_binds(collection, out),
        Stmt::MethodAssign { subject, .. } => collect_binds(subject, out),
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
