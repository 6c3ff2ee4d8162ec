use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;
use lox_lexer::Lexer;
use lox_syntax::TokenKind;

fn any_lox_like() -> impl Strategy<Value = String> {
    let ascii =
        proptest::collection::vec(any::<char>().prop_filter("ascii", |c| c.is_ascii()), 0..40)
            .prop_map(|v| v.into_iter().collect::<String>());
    let unicode = proptest::collection::vec(any::<char>(), 0..20)
        .prop_map(|v| v.into_iter().collect::<String>());
    let sym = "(){},.-+;/* ! != = == < <= > >= \"\\ \n // and class else false for fun if nil or print return super this true var while 12.5"
        .to_string();
    (ascii, unicode, any::<bool>()).prop_map(move |(a, b, f)| {
        let mut s = String::new();
        s.push_str(&a);
        s.push_str(&b);
        if f {
            s.push_str(&sym);
        }
        s.chars().take(200).collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64, max_shrink_iters: 200, .. ProptestConfig::default()
    })]
    #[test]
    fn lex_random_input_should_not_panic(s in any_lox_like()) {
        let result = Lexer::new(&s).lex();
        // Must end with EOF.
        assert!(matches!(result.tokens.last().map(|t| t.kind), Some(TokenKind::Eof)));
        // Diagnostics are allowed; this only checks robustness (no panic).
        assert!(!result.tokens.is_empty());
    }

    #[test]
    fn token_spans_are_ordered_and_in_bounds(s in any_lox_like()) {
        let len = s.len() as u32;
        let result = Lexer::new(&s).lex();
        let mut prev_end = 0u32;
        for t in &result.tokens {
            assert!(t.span.start.0 <= t.span.end.0);
            assert!(t.span.end.0 <= len);
            assert!(t.span.start.0 >= prev_end || t.kind == TokenKind::Eof);
            prev_end = t.span.end.0;
        }
    }
}
