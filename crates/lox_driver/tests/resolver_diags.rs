use lox_driver::Driver;
use lox_syntax::render_diagnostic;

fn resolve_errors(input: &str) -> Vec<String> {
    let mut driver = Driver::new();
    let parsed = driver.parse_text("test.lox", input);
    parsed
        .diagnostics
        .iter()
        .map(|d| render_diagnostic(&parsed.source, d))
        .collect()
}

#[test]
fn clean_programs_resolve_without_diagnostics() {
    assert!(resolve_errors("var a = 1; { var b = a; print b; }").is_empty());
    assert!(resolve_errors("fun f() { return 1; } print f();").is_empty());
    assert!(resolve_errors("class C < D { m() { return super.m(); } }").is_empty());
}

#[test]
fn self_read_in_initializer() {
    assert_eq!(
        resolve_errors("var x = \"hi\"; { var x = x; print x; }"),
        vec!["[line 1] Error at 'x': Can't read local variable in its own initializer."]
    );
}

#[test]
fn duplicate_declaration_in_scope() {
    assert_eq!(
        resolve_errors("{ var a = 1; var a = 2; }"),
        vec!["[line 1] Error at 'a': Already a variable with this name in this scope."]
    );
    // Globals may redeclare freely.
    assert!(resolve_errors("var a = 1; var a = 2;").is_empty());
}

#[test]
fn duplicate_parameter_names() {
    assert_eq!(
        resolve_errors("fun f(a, a) {}"),
        vec!["[line 1] Error at 'a': Already a variable with this name in this scope."]
    );
}

#[test]
fn return_outside_function() {
    assert_eq!(
        resolve_errors("return;"),
        vec!["[line 1] Error at 'return': Can't return from top-level code."]
    );
}

#[test]
fn value_return_from_initializer() {
    assert_eq!(
        resolve_errors("class C { init() { return 1; } }"),
        vec!["[line 1] Error at 'return': Can't return a value from a class initializer."]
    );
    // A bare return in an initializer is allowed.
    assert!(resolve_errors("class C { init() { return; } }").is_empty());
}

#[test]
fn this_and_super_misuse() {
    assert_eq!(
        resolve_errors("print this;"),
        vec!["[line 1] Error at 'this': Can't use 'this' outside of a class."]
    );
    assert_eq!(
        resolve_errors("fun f() { return super.m(); }"),
        vec!["[line 1] Error at 'super': Can't use 'super' outside of a class."]
    );
    assert_eq!(
        resolve_errors("class C { m() { return super.m(); } }"),
        vec!["[line 1] Error at 'super': Can't use 'super' in a class with no superclass."]
    );
}

#[test]
fn self_inheritance() {
    assert_eq!(
        resolve_errors("class A < A {}"),
        vec!["[line 1] Error at 'A': A class cannot inherit from itself."]
    );
}

#[test]
fn resolution_distances_bind_to_declaration_site() {
    let mut driver = Driver::new();
    let parsed = driver.parse_text(
        "test.lox",
        "var a = 1; { fun show() { print a; } show(); var a = 2; show(); }",
    );
    assert!(parsed.diagnostics.is_empty());
    // The `a` inside show() must stay unresolved (global), not bind to the
    // later block-local `a`.
    // One resolution exists for each of: the two `show` call references.
    assert!(parsed.resolutions.len() >= 2);
}
