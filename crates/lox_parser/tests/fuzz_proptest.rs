use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;
use lox_lexer::Lexer;
use lox_parser::Parser;
use lox_syntax::SourceFile;

fn any_lox_like() -> impl Strategy<Value = String> {
    let frag = prop_oneof![
        Just("var x = 1;".to_string()),
        Just("fun f(a, b) { return a + b; }".to_string()),
        Just("class C < D { m() { return super.m(); } }".to_string()),
        Just("for (var i = 0; i < 3; i = i + 1) print i;".to_string()),
        Just("if (x and y or z) { print \"ok\"; } else print 2;".to_string()),
        Just("( } ) = ;".to_string()),
        Just("= + - ..".to_string()),
        Just("\"unterminated".to_string()),
        proptest::collection::vec(any::<char>().prop_filter("ascii", |c| c.is_ascii()), 0..30)
            .prop_map(|v| v.into_iter().collect::<String>()),
    ];
    proptest::collection::vec(frag, 0..6).prop_map(|v| v.join("\n"))
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64, max_shrink_iters: 200, .. ProptestConfig::default()
    })]
    #[test]
    fn parse_random_input_should_not_panic(s in any_lox_like()) {
        let source = SourceFile::new("fuzz.lox", s);
        let lex = Lexer::new(source.text.as_str()).lex();
        let result = Parser::new(&source, &lex.tokens, 0).parse();
        // Either a program or diagnostics; never a crash or hang.
        let _ = (result.program.stmts.len(), result.diagnostics.len());
    }
}
