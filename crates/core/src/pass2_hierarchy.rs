//! Pass 2: Class hierarchy -- register classes, fields, functions, methods,
//! comparison operators and globals, link superclasses and back-propagate
//! subclass sets.
//!
//! The registry is complete before any expression is typed, so a
//! declaration may refer to classes and functions declared after it.

use crate::ast::*;
use crate::error::{Diagnostic, DiagnosticKind};
use crate::mangle::{call_name, escape_identifier};
use crate::morphology::Case;
use crate::pass3_infer::TypeSet;
use std::collections::{BTreeMap, BTreeSet};

/// Classes that exist without a declaration, with their target names.
pub const BUILTIN_CLASSES: &[(&str, &str)] = &[
    ("luku", "Number"),
    ("merkkijono", "String"),
    ("lista", "Array"),
];

/// Name of the method called at the end of a constructor when present.
pub const CONSTRUCTION_HOOK: &str = "luoda_P__N";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassOrigin {
    Builtin,
    /// `N on valmis luokka "T"`: existing target class, accessors generated.
    Binding,
    /// `N tarkoittaa luokkaa "T"`: existing target class, name only.
    Alias,
    Declared,
}

#[derive(Debug, Clone)]
pub struct ClassInfo {
    pub name: String,
    /// Constructor name in generated code.
    pub js_name: String,
    pub origin: ClassOrigin,
    pub superclass: Option<String>,
    pub fields: Vec<FieldDecl>,
    /// Transitive subclasses.
    pub subclasses: BTreeSet<String>,
    /// Index of the first declaration of this class.
    pub decl: Option<usize>,
    /// Index of the declaration that named the superclass.
    pub extends_at: Option<usize>,
}

/// A field-backed function registered under `(field, argument case)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionEntry {
    pub class: String,
    pub decl: usize,
}

/// Key of the function table: field name and argument case, if any.
pub type FunctionKey = (String, Option<Case>);

#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    pub classes: BTreeMap<String, ClassInfo>,
    pub functions: BTreeMap<FunctionKey, Vec<FunctionEntry>>,
    /// Field name to the classes declaring it.
    pub fields: BTreeMap<String, BTreeSet<String>>,
    /// Class to mangled method names.
    pub methods: BTreeMap<String, BTreeSet<String>>,
    /// Mangled procedure names.
    pub procedures: BTreeSet<String>,
    /// Comparison adjective to the classes declaring it.
    pub comparisons: BTreeMap<String, BTreeSet<String>>,
    /// Global variable to its declared class and declaration index.
    pub globals: BTreeMap<String, (String, usize)>,
}

impl Hierarchy {
    pub fn is_class(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Every class a value declared as `name` may have at run time.
    pub fn class_type(&self, name: &str) -> TypeSet {
        let mut set = BTreeSet::new();
        set.insert(name.to_owned());
        if let Some(info) = self.classes.get(name) {
            set.extend(info.subclasses.iter().cloned());
        }
        TypeSet::Classes(set)
    }

    /// `name` followed by its superclasses, nearest first.
    pub fn ancestors(&self, name: &str) -> Vec<String> {
        let mut chain = vec![name.to_owned()];
        let mut current = self.classes.get(name).and_then(|c| c.superclass.clone());
        while let Some(next) = current {
            if chain.contains(&next) {
                break;
            }
            current = self.classes.get(&next).and_then(|c| c.superclass.clone());
            chain.push(next);
        }
        chain
    }

    pub fn js_name(&self, name: &str) -> String {
        match self.classes.get(name) {
            Some(info) => info.js_name.clone(),
            None => escape_identifier(name),
        }
    }

    /// Whether `mangled` is a method of `class` or one of its ancestors.
    pub fn find_method(&self, class: &str, mangled: &str) -> bool {
        self.ancestors(class).iter().any(|c| {
            self.methods
                .get(c)
                .is_some_and(|names| names.contains(mangled))
        })
    }

    /// Whether any class defines a method with this mangled name.
    pub fn any_method(&self, mangled: &str) -> bool {
        self.methods.values().any(|names| names.contains(mangled))
    }

    /// Union of the receiver types of every class declaring `field`.
    pub fn field_receivers(&self, field: &str) -> TypeSet {
        let mut ty = TypeSet::empty();
        for owner in self.fields.get(field).into_iter().flatten() {
            ty = ty.union(&self.class_type(owner));
        }
        ty
    }

    /// Fields of `class` including inherited ones, ancestors first.
    pub fn all_fields(&self, class: &str) -> Vec<FieldDecl> {
        let mut out: Vec<FieldDecl> = Vec::new();
        for c in self.ancestors(class).iter().rev() {
            for f in self.classes.get(c).map(|i| i.fields.as_slice()).unwrap_or(&[]) {
                out.retain(|existing| existing.name != f.name);
                out.push(f.clone());
            }
        }
        out
    }

    pub fn has_construction_hook(&self, class: &str) -> bool {
        self.find_method(class, CONSTRUCTION_HOOK)
    }

    fn register(&mut self, name: &str, js_name: String, origin: ClassOrigin, decl: Option<usize>) {
        self.classes.insert(
            name.to_owned(),
            ClassInfo {
                name: name.to_owned(),
                js_name,
                origin,
                superclass: None,
                fields: Vec::new(),
                subclasses: BTreeSet::new(),
                decl,
                extends_at: None,
            },
        );
    }

    fn add_fields(&mut self, class: &str, fields: &[FieldDecl]) {
        for f in fields {
            self.fields
                .entry(f.name.clone())
                .or_default()
                .insert(class.to_owned());
        }
        if let Some(info) = self.classes.get_mut(class) {
            for f in fields {
                info.fields.retain(|existing| existing.name != f.name);
                info.fields.push(f.clone());
            }
        }
    }
}

fn semantic(kind: DiagnosticKind, decl: &Decl, message: String) -> Diagnostic {
    Diagnostic::new(
        kind,
        &decl.file,
        decl.span.line,
        decl.span.column,
        decl.span.len,
        message,
    )
}

/// Register every class, member and global of the bundle.
pub fn build_hierarchy(decls: &[Decl]) -> (Hierarchy, Vec<Diagnostic>) {
    let mut h = Hierarchy::default();
    let mut diagnostics = Vec::new();

    for (name, js) in BUILTIN_CLASSES {
        h.register(name, (*js).to_owned(), ClassOrigin::Builtin, None);
    }

    // Classes first, so members below can be checked against them.
    for (i, d) in decls.iter().enumerate() {
        match &d.kind {
            DeclKind::Class {
                name,
                superclass,
                fields,
            } => {
                match h.classes.get(name).map(|c| c.origin.clone()) {
                    Some(ClassOrigin::Declared) => diagnostics.push(
                        semantic(
                            DiagnosticKind::DuplicateClass,
                            d,
                            format!("class '{}' is declared more than once; fields are merged", name),
                        )
                        .warning(),
                    ),
                    Some(_) if superclass.is_some() => {
                        diagnostics.push(semantic(
                            DiagnosticKind::DuplicateClass,
                            d,
                            format!("runtime class '{}' cannot be redeclared with a superclass", name),
                        ));
                        h.add_fields(name, fields);
                        continue;
                    }
                    Some(_) => {}
                    None => h.register(name, escape_identifier(name), ClassOrigin::Declared, Some(i)),
                }
                if let Some(s) = superclass {
                    if let Some(info) = h.classes.get_mut(name) {
                        if info.superclass.is_none() {
                            info.superclass = Some(s.clone());
                            info.extends_at = Some(i);
                        }
                    }
                }
                h.add_fields(name, fields);
            }
            DeclKind::Directive(Directive::Binding {
                name,
                target,
                fields,
            }) => {
                h.register(name, target.clone(), ClassOrigin::Binding, Some(i));
                h.add_fields(name, fields);
            }
            DeclKind::Directive(Directive::Alias { name, target }) => {
                h.register(name, target.clone(), ClassOrigin::Alias, Some(i));
            }
            _ => {}
        }
    }

    link_superclasses(&mut h, decls, &mut diagnostics);

    for (i, d) in decls.iter().enumerate() {
        match &d.kind {
            DeclKind::Function {
                class, field, arg, ..
            } => {
                if !h.is_class(class) {
                    diagnostics.push(semantic(
                        DiagnosticKind::UnresolvedClass,
                        d,
                        format!("class '{}' of function '{}' is not declared", class, field),
                    ));
                    continue;
                }
                h.functions
                    .entry((field.clone(), arg.as_ref().map(|a| a.case)))
                    .or_default()
                    .push(FunctionEntry {
                        class: class.clone(),
                        decl: i,
                    });
            }
            DeclKind::Method {
                name,
                subject,
                params,
                ..
            } => {
                let cases: Vec<Case> = params.iter().map(|p| p.case).collect();
                h.methods
                    .entry(subject.class.clone())
                    .or_default()
                    .insert(call_name(name, &cases, Some(subject.case)));
            }
            DeclKind::Procedure { name, params, .. } => {
                let cases: Vec<Case> = params.iter().map(|p| p.case).collect();
                h.procedures.insert(call_name(name, &cases, None));
            }
            DeclKind::Comparison { class, name, .. } => {
                h.comparisons
                    .entry(name.clone())
                    .or_default()
                    .insert(class.clone());
            }
            DeclKind::Variable { name, class, .. } => {
                h.globals.insert(name.clone(), (class.clone(), i));
            }
            _ => {}
        }
    }

    tracing::debug!(
        classes = h.classes.len(),
        functions = h.functions.len(),
        procedures = h.procedures.len(),
        "hierarchy built"
    );
    (h, diagnostics)
}

/// Check superclass links, break cycles and fill the subclass sets.
fn link_superclasses(h: &mut Hierarchy, decls: &[Decl], diagnostics: &mut Vec<Diagnostic>) {
    let names: Vec<String> = h.classes.keys().cloned().collect();
    for name in &names {
        let Some(info) = h.classes.get(name) else {
            continue;
        };
        let Some(sup) = info.superclass.clone() else {
            continue;
        };
        let decl = info.extends_at.or(info.decl).and_then(|i| decls.get(i));
        let problem = if !h.classes.contains_key(&sup) {
            Some(format!("superclass '{}' of '{}' is not declared", sup, name))
        } else if h.ancestors(&sup).contains(name) {
            Some(format!("class '{}' inherits from itself through '{}'", name, sup))
        } else {
            None
        };
        if let Some(message) = problem {
            if let Some(d) = decl {
                diagnostics.push(semantic(DiagnosticKind::UnresolvedClass, d, message));
            }
            if let Some(info) = h.classes.get_mut(name) {
                info.superclass = None;
            }
        }
    }

    for name in &names {
        let chain = h.ancestors(name);
        for ancestor in chain.iter().skip(1) {
            if let Some(info) = h.classes.get_mut(ancestor) {
                info.subclasses.insert(name.clone());
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
    use crate::lexer::tokenize;
    use crate::morphology::Lexicon;
    use crate::parser::{parse_unit, Signatures};

    fn hierarchy(src: &str) -> (Hierarchy, Vec<Diagnostic>) {
        let lexicon = Lexicon::core().unwrap();
        let unit = parse_unit(tokenize(src, &lexicon), "test.itp", &Signatures::new());
        assert!(unit.diagnostics.is_empty(), "{:?}", unit.diagnostics);
        build_hierarchy(&unit.decls)
    }

    fn set(names: &[&str]) -> TypeSet {
        TypeSet::Classes(names.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn builtins_are_always_registered() {
        let (h, diags) = hierarchy("");
        assert!(diags.is_empty());
        assert_eq!(h.js_name("luku"), "Number");
        assert_eq!(h.js_name("merkkijono"), "String");
        assert_eq!(h.js_name("lista"), "Array");
    }

    #[test]
    fn subclasses_propagate_up_the_chain() {
        let (h, diags) = hierarchy(
            "eläin:lla on nimi.\n\
             koira on eläin.\n\
             mäyräkoira on koira.\n",
        );
        assert!(diags.is_empty(), "{:?}", diags);
        assert_eq!(h.class_type("eläin"), set(&["eläin", "koira", "mäyräkoira"]));
        assert_eq!(h.class_type("koira"), set(&["koira", "mäyräkoira"]));
        assert_eq!(h.ancestors("mäyräkoira"), ["mäyräkoira", "koira", "eläin"]);
    }

    #[test]
    fn superclass_fields_are_visible_on_subclasses() {
        let (h, _) = hierarchy("eläin:lla on nimi.\nkoira on eläin, jolla on häntä.\n");
        let receivers = h.field_receivers("nimi");
        assert!(receivers.overlaps(&set(&["koira"])));
        let names: Vec<String> = h.all_fields("koira").into_iter().map(|f| f.name).collect();
        assert_eq!(names, ["nimi", "häntä"]);
    }

    #[test]
    fn unknown_superclass_is_an_error() {
        let (h, diags) = hierarchy("koira on eläin.\n");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::UnresolvedClass);
        assert!(h.classes["koira"].superclass.is_none());
    }

    #[test]
    fn inheritance_cycle_is_broken() {
        let (h, diags) = hierarchy("a on b.\nb on a.\n");
        assert!(!diags.is_empty());
        assert!(diags.iter().all(|d| d.kind == DiagnosticKind::UnresolvedClass));
        assert!(h.ancestors("a").len() <= 2);
    }

    #[test]
    fn duplicate_class_merges_fields_with_warning() {
        let (h, diags) = hierarchy("piste:llä on x.\npiste:llä on y.\n");
        assert_eq!(diags.len(), 1);
        assert!(!diags[0].is_error());
        assert_eq!(h.classes["piste"].fields.len(), 2);
    }

    #[test]
    fn duplicate_class_has_its_own_kind() {
        let (_, diags) = hierarchy("piste:llä on x.\npiste:llä on y.\n");
        assert_eq!(diags[0].kind, DiagnosticKind::DuplicateClass);
        assert_eq!(diags[0].line, 2);
    }

    #[test]
    fn runtime_class_cannot_take_a_superclass() {
        let (h, diags) = hierarchy(
            "sivu on valmis luokka \"HTMLDocument\".\n\
             Olkoon a 1.\n\
             sivu on dokumentti.\n",
        );
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::DuplicateClass);
        assert!(diags[0].is_error());
        assert_eq!(diags[0].line, 3);
        assert!(h.classes["sivu"].superclass.is_none());
        assert_eq!(h.classes["sivu"].origin, ClassOrigin::Binding);
    }

    #[test]
    fn unknown_superclass_is_reported_where_it_is_named() {
        let (_, diags) = hierarchy("koira:lla on nimi.\nOlkoon a 1.\nkoira on eläin.\n");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::UnresolvedClass);
        assert_eq!(diags[0].line, 3);
    }

    #[test]
    fn functions_keyed_by_field_and_case() {
        let (h, _) = hierarchy(
            "luku:n potenssi eksponentti:lla on luku.\n\
             luku:n neliö on luku.\n",
        );
        let key = ("potenssi".to_string(), Some(Case::Adessive));
        assert_eq!(h.functions[&key][0].class, "luku");
        assert!(h.functions.contains_key(&("neliö".to_string(), None)));
    }

    #[test]
    fn methods_procedures_and_hook() {
        let (h, _) = hierarchy(
            "piste:llä on x.\n\
             Kun uusi piste luodaan, tulostetaan 1.\n\
             Kun tulostetaan luku, tulostetaan 2.\n\
             Kun sivu avautuu, tulostetaan 3.\n\
             pallo on piste.\n",
        );
        assert!(h.has_construction_hook("piste"));
        assert!(h.has_construction_hook("pallo"));
        assert!(h.procedures.contains("tulostaa_P_N"));
        assert!(h.find_method("sivu", "avautua__N"));
    }

    #[test]
    fn bindings_and_aliases_use_target_names() {
        let (h, _) = hierarchy(
            "ajankohta on valmis luokka \"Date\", jolla on vuosi.\n\
             totuusarvo tarkoittaa luokkaa \"Boolean\".\n",
        );
        assert_eq!(h.js_name("ajankohta"), "Date");
        assert_eq!(h.classes["ajankohta"].origin, ClassOrigin::Binding);
        assert_eq!(h.classes["totuusarvo"].origin, ClassOrigin::Alias);
        assert!(h.fields["vuosi"].contains("ajankohta"));
    }

    #[test]
    fn globals_record_declared_class() {
        let (h, _) = hierarchy("Olkoon pieni luku 2.\n");
        assert_eq!(h.globals["pieni_luku"].0, "luku");
    }
}
