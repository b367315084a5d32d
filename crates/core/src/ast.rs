//! Typed syntax tree produced by the parser.
//!
//! Nodes are immutable after parsing except for the per-expression type
//! cache, which the validation pass fills in.

use crate::morphology::Case;
use crate::pass3_infer::TypeSet;
use std::cell::OnceCell;

/// Source position of a node: 1-based line and column, length in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub line: u32,
    pub column: u32,
    pub len: u32,
}

// ──────────────────────────────────────────────
// Declarations
// ──────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Decl {
    pub kind: DeclKind,
    pub file: String,
    pub span: Span,
    /// Module-level statements introduced with "minkä jälkeen".
    pub additional: Vec<Stmt>,
    /// False for declarations merged from a silent include or the prelude.
    pub emit: bool,
}

/// A named, typed parameter. The case is the slot it fills at call sites.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub class: String,
    pub case: Case,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub plural: bool,
    pub initializer: Option<Expr>,
}

#[derive(Debug, Clone)]
pub enum DeclKind {
    Variable {
        name: String,
        class: String,
        value: Expr,
    },
    Procedure {
        name: String,
        params: Vec<Param>,
        body: Vec<Stmt>,
    },
    Method {
        name: String,
        subject: Param,
        params: Vec<Param>,
        body: Vec<Stmt>,
    },
    Class {
        name: String,
        superclass: Option<String>,
        fields: Vec<FieldDecl>,
    },
    Function {
        class: String,
        self_name: String,
        field: String,
        arg: Option<Param>,
        body: Expr,
        wheres: Vec<Where>,
        memoize: bool,
    },
    Comparison {
        class: String,
        name: String,
        left: String,
        right: Param,
        conditions: Vec<Cond>,
    },
    Directive(Directive),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    Option { name: String, enabled: bool },
    Include { path: String, emit: bool },
    SpliceCode(String),
    SpliceFile(String),
    Binding {
        name: String,
        target: String,
        fields: Vec<FieldDecl>,
    },
    Alias { name: String, target: String },
}

/// Local binding introduced by "missä".
#[derive(Debug, Clone, PartialEq)]
pub struct Where {
    pub name: String,
    pub value: Expr,
}

// ──────────────────────────────────────────────
// Statements
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// Verb base plus passive marker and modifiers, before case suffixes.
    pub name: String,
    pub subject: Option<(Case, Expr)>,
    /// Arguments ordered by case tag.
    pub args: Vec<(Case, Expr)>,
    pub wheres: Vec<Where>,
    pub output: Option<String>,
    pub span: Span,
}

/// Calls that compile to a statement form instead of a method call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sugar {
    /// `x:ksi asetetaan v` -> `x = v`
    Assign,
    /// `x:ää kasvatetaan v:llä` -> `x += v`
    AddAssign,
    /// `x:ää vähennetään v:llä` -> `x -= v`
    SubAssign,
    /// `x palautetaan` -> `return x`
    Return,
}

impl Call {
    pub fn arg_cases(&self) -> Vec<Case> {
        self.args.iter().map(|(c, _)| *c).collect()
    }

    pub fn sugar(&self) -> Option<Sugar> {
        let (subject_case, subject) = self.subject.as_ref()?;
        let assignable = matches!(
            subject.kind,
            ExprKind::Var { .. } | ExprKind::Field { arg: None, .. } | ExprKind::Subscript { .. }
        );
        let cases = self.arg_cases();
        match (self.name.as_str(), subject_case, cases.as_slice()) {
            ("asettaa_P", Case::Translative, [Case::Nominative]) if assignable => Some(Sugar::Assign),
            ("kasvattaa_P", Case::Partitive, [Case::Adessive]) if assignable => {
                Some(Sugar::AddAssign)
            }
            ("vähentää_P", Case::Partitive, [Case::Adessive]) if assignable => {
                Some(Sugar::SubAssign)
            }
            ("palauttaa_P", Case::Nominative, []) => Some(Sugar::Return),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Call(Call),
    If {
        conditions: Vec<Cond>,
        body: Vec<Stmt>,
    },
    Block(Vec<Stmt>),
    For {
        var: String,
        collection: Expr,
        body: Vec<Stmt>,
    },
    MethodAssign {
        subject: Expr,
        subject_case: Case,
        name: String,
        params: Vec<Param>,
        body: Vec<Stmt>,
        span: Span,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Gt,
    Lt,
    Ge,
    Le,
}

impl CmpOp {
    pub fn js(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Gt => ">",
            CmpOp::Lt => "<",
            CmpOp::Ge => ">=",
            CmpOp::Le => "<=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cond {
    Compare {
        negated: bool,
        op: CmpOp,
        left: Expr,
        right: Expr,
    },
    /// A comparison declared in the program, called by its adjective base.
    UserCompare {
        negated: bool,
        name: String,
        left: Expr,
        right: Expr,
        span: Span,
    },
    ForAll {
        var: String,
        collection: Expr,
        cond: Box<Cond>,
    },
    Exists {
        var: String,
        collection: Expr,
        cond: Box<Cond>,
    },
}

// ──────────────────────────────────────────────
// Expressions
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    pub fn js(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    /// Inferred type, filled in at most once by validation.
    pub ty: OnceCell<TypeSet>,
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Var {
        name: String,
        class: Option<String>,
    },
    /// Value captured into a temporary that later pronouns can refer to.
    Bind {
        name: String,
        value: Box<Expr>,
    },
    BackrefUse {
        name: String,
    },
    Field {
        recv: Box<Expr>,
        field: String,
        arg: Option<(Case, Box<Expr>)>,
    },
    Subscript {
        recv: Box<Expr>,
        index: Box<Expr>,
    },
    Slice {
        recv: Box<Expr>,
        start: Box<Expr>,
        end: Option<Box<Expr>>,
    },
    Num(i64),
    Str(String),
    List(Vec<Expr>),
    New {
        class: String,
        args: Vec<(String, Expr)>,
    },
    Lambda(Box<Stmt>),
    Ternary {
        conditions: Vec<Cond>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Arithmetic {
        op: ArithOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr {
            kind,
            span,
            ty: OnceCell::new(),
        }
    }

    /// Direct sub-expressions, not descending into lambda bodies or
    /// ternary conditions.
    pub fn children(&self) -> Vec<&Expr> {
        match &self.kind {
            ExprKind::Var { .. } | ExprKind::BackrefUse { .. } => vec![],
            ExprKind::Num(_) | ExprKind::Str(_) | ExprKind::Lambda(_) => vec![],
            ExprKind::Bind { value, .. } => vec![&**value],
            ExprKind::Field { recv, arg, .. } => {
                let mut v = vec![&**recv];
                if let Some((_, a)) = arg {
                    v.push(&**a);
                }
                v
            }
            ExprKind::Subscript { recv, index } => vec![&**recv, &**index],
            ExprKind::Slice { recv, start, end } => {
                let mut v = vec![&**recv, &**start];
                if let Some(e) = end {
                    v.push(&**e);
                }
                v
            }
            ExprKind::List(items) => items.iter().collect(),
            ExprKind::New { args, .. } => args.iter().map(|(_, e)| e).collect(),
            ExprKind::Ternary {
                then, otherwise, ..
            } => vec![&**then, &**otherwise],
            ExprKind::Arithmetic { left, right, .. } => vec![&**left, &**right],
        }
    }
}
