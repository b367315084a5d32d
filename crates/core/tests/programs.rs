//! End-to-end compilation of whole programs through the in-memory provider.

use std::path::Path;
use tampio_core::morphology::Case;
use tampio_core::pass3_infer::{Env, Inferencer};
use tampio_core::{
    build_hierarchy, compile_with_provider, mangle, CompileOptions, Compilation, DeclKind,
    DiagnosticKind, InMemoryProvider, Lexicon, Root, TypeSet,
};

fn compile_files(files: &[(&str, &str)]) -> Compilation {
    let provider = InMemoryProvider::from_files(files.iter().copied());
    let options = CompileOptions {
        include_std: false,
        ..CompileOptions::default()
    };
    compile_with_provider(Root::File(Path::new("/p/main.itp")), &provider, &options)
        .expect("root file is present")
}

fn compile(src: &str) -> Compilation {
    compile_files(&[("/p/main.itp", src)])
}

#[test]
fn field_round_trip() {
    let c = compile(
        "piste:llä on x.\n\
         piste:n arvo on pisteen x.\n\
         Olkoon p uusi piste, jonka x on 7.\n\
         Olkoon a p:n arvo.\n",
    );
    assert!(!c.has_errors(), "{:?}", c.diagnostics);
    assert!(c.code.contains(" this.x = (\"x\" in vals) ? vals[\"x\"] : undefined;\n"), "{}", c.code);
    assert!(c.code.contains("piste.prototype.f_x = function() { return this.x; };"));
    assert!(c.code.contains("return piste.f_x();"), "{}", c.code);
    assert!(c.code.contains("var p = new piste({\"x\": (7)});"), "{}", c.code);
    assert!(c.code.contains("var a = p.f_arvo();"), "{}", c.code);
}

#[test]
fn memoized_function_caches_on_receiver() {
    let c = compile(
        "piste:llä on x.\n\
         piste:n summa on pysyvästi pisteen x lisättynä 1:llä.\n",
    );
    assert!(!c.has_errors(), "{:?}", c.diagnostics);
    let guard = c
        .code
        .find("if (this.hasOwnProperty(\"$f_summa\")) return this[\"$f_summa\"];")
        .expect("cache guard");
    let body = c.code.find("var $value = (piste.f_x() + (1));").expect("body");
    assert!(guard < body, "the guard runs before the body is evaluated");
}

#[test]
fn every_independent_syntax_error_is_reported() {
    let c = compile(
        "Olkoon a 1.\n\
         ja ja ja.\n\
         Olkoon b 2.\n\
         on on.\n\
         Olkoon c 3.\n",
    );
    let syntax: Vec<u32> = c
        .errors()
        .filter(|d| d.kind == DiagnosticKind::Syntax)
        .map(|d| d.line)
        .collect();
    assert_eq!(syntax, [2, 4]);
    assert_eq!(c.code, "var a = (1);\nvar b = (2);\nvar c = (3);\n");
}

#[test]
fn superclass_members_accept_subclass_receivers() {
    let c = compile(
        "piste:llä on x.\n\
         pallo on piste, jolla on koko.\n\
         Olkoon b uusi pallo.\n\
         Olkoon c b:n x.\n",
    );
    assert!(!c.has_errors(), "{:?}", c.diagnostics);
    assert!(c.code.contains("var c = b.f_x();"), "{}", c.code);

    let lexicon = Lexicon::core().unwrap();
    let provider = InMemoryProvider::from_files([("/p/main.itp", "piste:llä on x.\npallo on piste.")]);
    let bundle = tampio_core::load_bundle(
        Root::File(Path::new("/p/main.itp")),
        &provider,
        &lexicon,
        false,
    )
    .unwrap();
    let (h, diagnostics) = build_hierarchy(&bundle.decls);
    assert!(diagnostics.is_empty());
    assert!(h.field_receivers("x").overlaps(&TypeSet::of("pallo")));
    assert_eq!(h.ancestors("pallo"), ["pallo", "piste"]);
}

#[test]
fn literals_infer_exact_builtin_classes() {
    let lexicon = Lexicon::core().unwrap();
    let provider =
        InMemoryProvider::from_files([("/p/main.itp", "Olkoon a 5.\nOlkoon b \"teksti\".")]);
    let bundle = tampio_core::load_bundle(
        Root::File(Path::new("/p/main.itp")),
        &provider,
        &lexicon,
        false,
    )
    .unwrap();
    let (h, _) = build_hierarchy(&bundle.decls);
    let mut infer = Inferencer::new(&h, &bundle.decls);
    let env = Env::new("/p/main.itp");

    let values: Vec<_> = bundle
        .decls
        .iter()
        .filter_map(|d| match &d.kind {
            DeclKind::Variable { value, .. } => Some(value),
            _ => None,
        })
        .collect();
    let number = infer.infer(values[0], &env, None);
    assert!(number.is_exactly("luku"), "{}", number);
    assert_eq!(infer.infer(values[0], &env, None), number);
    assert!(infer.infer(values[1], &env, None).is_exactly("merkkijono"));
}

#[test]
fn mangled_names_depend_on_the_case_set_only() {
    assert_eq!(
        mangle::call_name("piirtää", &[Case::Nominative, Case::Adessive], None),
        mangle::call_name("piirtää", &[Case::Adessive, Case::Nominative], None),
    );
    assert_ne!(
        mangle::call_name("piirtää", &[Case::Nominative], None),
        mangle::call_name("piirtää", &[Case::Adessive], None),
    );

    let c = compile(
        "piste:llä on x.\n\
         Olkoon p uusi piste.\n\
         Kun tulostetaan luku, luku palautetaan.\n\
         Kun piirretään luku piste:llä, tulostetaan luku.\n\
         Kun näytetään luku, piirretään 1 p:llä ja piirretään p:llä 1.\n",
    );
    assert!(!c.has_errors(), "{:?}", c.diagnostics);
    assert!(c.code.contains("function piirt\\u00e4\\u00e4_P_NUo(luku, piste) {"), "{}", c.code);
    assert_eq!(c.code.matches("piirt\\u00e4\\u00e4_P_NUo((1), p);").count(), 2, "{}", c.code);
}

#[test]
fn silent_includes_register_without_emitting() {
    let c = compile_files(&[
        ("/p/main.itp", "Sisällytä hiljaa tiedosto \"lib/piste.itp\".\nOlkoon p uusi piste."),
        ("/p/lib/piste.itp", "piste:llä on x."),
    ]);
    assert!(!c.has_errors(), "{:?}", c.diagnostics);
    assert!(!c.code.contains("function piste("), "{}", c.code);
    assert!(c.code.contains("var p = new piste({});"), "{}", c.code);
}

#[test]
fn include_cycle_is_a_diagnostic_not_a_failure() {
    let c = compile_files(&[
        ("/p/main.itp", "Sisällytä tiedosto \"b.itp\".\nOlkoon a 1."),
        ("/p/b.itp", "Sisällytä tiedosto \"main.itp\"."),
    ]);
    assert_eq!(c.errors().count(), 1);
    assert_eq!(c.diagnostics[0].kind, DiagnosticKind::Include);
    assert!(c.code.contains("var a = (1);"));
}

#[test]
fn subclass_of_std_runtime_class_chains_to_its_constructor() {
    let provider = InMemoryProvider::from_files([("/p/main.itp", "nappi on sivu, jolla on koko.\n")]);
    let c = compile_with_provider(
        Root::File(Path::new("/p/main.itp")),
        &provider,
        &CompileOptions::default(),
    )
    .expect("root file is present");
    assert!(!c.has_errors(), "{:?}", c.diagnostics);
    assert!(c.code.contains("nappi.prototype = Object.create(HTMLDocument.prototype);"), "{}", c.code);
}

#[test]
fn redeclaring_a_std_class_is_reported_in_the_program() {
    let c = compile_with_provider(
        Root::File(Path::new("/p/main.itp")),
        &InMemoryProvider::from_files([("/p/main.itp", "Olkoon a 1.\nsivu on dokumentti.\n")]),
        &CompileOptions::default(),
    )
    .expect("root file is present");
    let errors: Vec<_> = c.errors().collect();
    assert_eq!(errors.len(), 1, "{:?}", c.diagnostics);
    assert_eq!(errors[0].kind, DiagnosticKind::DuplicateClass);
    assert_eq!(errors[0].file, "/p/main.itp");
    assert_eq!(errors[0].line, 2);
}

#[test]
fn stray_quantifier_is_a_syntax_error_only() {
    let c = compile("Olkoon l tyhjä lista.\nOlkoon a jokainen l:n alkio.\n");
    let kinds: Vec<DiagnosticKind> = c.diagnostics.iter().map(|d| d.kind).collect();
    assert_eq!(kinds, [DiagnosticKind::Syntax]);
    assert_eq!(c.code, "var l = [];\n");
}
