use lox_ir::ast::{BinaryOp, Expr, Literal, Stmt};
use lox_lexer::Lexer;
use lox_parser::{ParseResult, Parser};
use lox_syntax::SourceFile;

fn parse(input: &str) -> ParseResult {
    let source = SourceFile::new("test.lox", input.to_string());
    let tokens = Lexer::new(source.text.as_str()).lex().tokens;
    Parser::new(&source, &tokens, 0).parse()
}

#[test]
fn precedence_nests_factor_under_term() {
    let result = parse("print 1 + 2 * 3;");
    assert!(result.diagnostics.is_empty());
    let Stmt::Print(Expr::Binary { op, rhs, .. }) = &result.program.stmts[0] else {
        panic!("expected print of binary");
    };
    assert_eq!(*op, BinaryOp::Add);
    assert!(matches!(**rhs, Expr::Binary { op: BinaryOp::Mul, .. }));
}

#[test]
fn assignment_is_right_associative() {
    let result = parse("a = b = 1;");
    assert!(result.diagnostics.is_empty());
    let Stmt::Expr(Expr::Assign { value, .. }) = &result.program.stmts[0] else {
        panic!("expected assignment");
    };
    assert!(matches!(**value, Expr::Assign { .. }));
}

#[test]
fn invalid_assignment_target_is_reported() {
    let result = parse("a + b = 1;");
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].message, "Invalid assignment target.");
}

#[test]
fn for_desugars_to_while_in_block() {
    let result = parse("for (var i = 0; i < 3; i = i + 1) print i;");
    assert!(result.diagnostics.is_empty());
    let Stmt::Block(outer) = &result.program.stmts[0] else {
        panic!("expected block");
    };
    assert!(matches!(outer[0], Stmt::Var { .. }));
    let Stmt::While { body, .. } = &outer[1] else {
        panic!("expected while");
    };
    // Body is the original statement plus the step expression.
    let Stmt::Block(inner) = &**body else {
        panic!("expected body block");
    };
    assert!(matches!(inner[0], Stmt::Print(_)));
    assert!(matches!(inner[1], Stmt::Expr(Expr::Assign { .. })));
}

#[test]
fn for_without_condition_loops_on_true() {
    let result = parse("for (;;) print 1;");
    assert!(result.diagnostics.is_empty());
    let Stmt::While { cond, .. } = &result.program.stmts[0] else {
        panic!("expected bare while");
    };
    assert!(matches!(
        cond,
        Expr::Literal {
            value: Literal::Bool(true),
            ..
        }
    ));
}

#[test]
fn class_with_superclass_and_methods() {
    let result = parse("class B < A { m() { return 1; } init(x) { this.x = x; } }");
    assert!(result.diagnostics.is_empty());
    let Stmt::Class(class) = &result.program.stmts[0] else {
        panic!("expected class");
    };
    assert_eq!(&*class.name, "B");
    assert_eq!(&*class.superclass.as_ref().unwrap().name, "A");
    assert_eq!(class.methods.len(), 2);
    assert_eq!(&*class.methods[1].name, "init");
    assert_eq!(class.methods[1].params.len(), 1);
}

#[test]
fn error_recovers_at_statement_boundary() {
    let result = parse("var = 1; print 2;");
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].message, "Expect variable name.");
    // The second statement still parses.
    assert!(result
        .program
        .stmts
        .iter()
        .any(|s| matches!(s, Stmt::Print(_))));
}

#[test]
fn multiple_errors_one_per_statement() {
    let result = parse("var = 1; var = 2; var ok = 3;");
    assert_eq!(result.diagnostics.len(), 2);
    assert!(result
        .program
        .stmts
        .iter()
        .any(|s| matches!(s, Stmt::Var { .. })));
}

#[test]
fn missing_semicolon_reports_at_end() {
    let result = parse("print 1");
    assert_eq!(result.diagnostics.len(), 1);
    assert!(result.diagnostics[0].at_end);
}

#[test]
fn expr_ids_are_unique_and_continue_across_lines() {
    let first = parse("print a + b;");
    let source = SourceFile::new("repl".to_string(), "print c;".to_string());
    let tokens = Lexer::new(source.text.as_str()).lex().tokens;
    let second = Parser::new(&source, &tokens, first.next_expr_id).parse();
    assert!(second.next_expr_id > first.next_expr_id);
    assert!(first.next_expr_id >= 2);
}

#[test]
fn super_requires_method_name() {
    let result = parse("print super;");
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].message, "Expect '.' after 'super'.");
}
