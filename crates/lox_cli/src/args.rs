#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum EngineKind {
    /// Bytecode compiler + virtual machine (default).
    Vm,
    /// Tree-walking interpreter.
    Ast,
}

#[derive(Debug)]
pub(crate) struct CliArgs {
    pub engine: EngineKind,
    pub stress_gc: bool,
    pub trace: bool,
    pub dump_tokens: bool,
    pub dump_ast: bool,
    pub dump_bytecode: bool,
    pub positional: Vec<String>,
}

pub(crate) fn usage() -> &'static str {
    "Usage: lox [--engine vm|ast] [--stress-gc] [--trace] [--dump-tokens] [--dump-ast] [--dump-bytecode] [script]"
}

pub(crate) fn parse_args() -> Result<CliArgs, String> {
    parse_argv(std::env::args().skip(1).collect())
}

pub(crate) fn parse_argv(argv: Vec<String>) -> Result<CliArgs, String> {
    let mut engine = EngineKind::Vm;
    let mut stress_gc = false;
    let mut trace = false;
    let mut dump_tokens = false;
    let mut dump_ast = false;
    let mut dump_bytecode = false;
    let mut positional: Vec<String> = Vec::new();

    let mut i = 0;
    while i < argv.len() {
        let a = &argv[i];
        match a.as_str() {
            // `--engine` consumes the next token as its value.
            "--engine" => {
                i += 1;
                engine = match argv.get(i).map(|v| v.as_str()) {
                    Some("vm") => EngineKind::Vm,
                    Some("ast") => EngineKind::Ast,
                    Some(other) => return Err(format!("Unknown engine: {}", other)),
                    None => return Err("Missing value for '--engine'".to_string()),
                };
            }
            "--stress-gc" => stress_gc = true,
            "--trace" => trace = true,
            "--dump-tokens" => dump_tokens = true,
            "--dump-ast" => dump_ast = true,
            "--dump-bytecode" => dump_bytecode = true,
            _ if a.starts_with("--") => return Err(format!("Unknown option: {}", a)),
            _ => positional.push(a.clone()),
        }
        i += 1;
    }

    Ok(CliArgs {
        engine,
        stress_gc,
        trace,
        dump_tokens,
        dump_ast,
        dump_bytecode,
        positional,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn defaults_to_vm_with_no_flags() {
        let args = parse_argv(argv(&["script.lox"])).unwrap();
        assert_eq!(args.engine, EngineKind::Vm);
        assert!(!args.stress_gc);
        assert!(!args.trace);
        assert_eq!(args.positional, vec!["script.lox".to_string()]);
    }

    #[test]
    fn engine_takes_the_following_token() {
        let args = parse_argv(argv(&["--engine", "ast", "script.lox"])).unwrap();
        assert_eq!(args.engine, EngineKind::Ast);
        assert_eq!(args.positional, vec!["script.lox".to_string()]);

        let args = parse_argv(argv(&["--engine", "vm"])).unwrap();
        assert_eq!(args.engine, EngineKind::Vm);
        assert!(args.positional.is_empty());
    }

    #[test]
    fn engine_value_is_not_positional() {
        // The whole point: `lox --engine vm script.lox` is one script, not two.
        let args = parse_argv(argv(&["--engine", "vm", "script.lox"])).unwrap();
        assert_eq!(args.positional.len(), 1);
    }

    #[test]
    fn engine_flag_position_does_not_matter() {
        let args = parse_argv(argv(&["script.lox", "--engine", "ast"])).unwrap();
        assert_eq!(args.engine, EngineKind::Ast);
        assert_eq!(args.positional, vec!["script.lox".to_string()]);
    }

    #[test]
    fn missing_engine_value_is_an_error() {
        let err = parse_argv(argv(&["--engine"])).unwrap_err();
        assert_eq!(err, "Missing value for '--engine'");
    }

    #[test]
    fn unknown_engine_value_is_an_error() {
        let err = parse_argv(argv(&["--engine", "jit"])).unwrap_err();
        assert_eq!(err, "Unknown engine: jit");
    }

    #[test]
    fn unknown_option_is_an_error() {
        let err = parse_argv(argv(&["--bogus"])).unwrap_err();
        assert_eq!(err, "Unknown option: --bogus");
    }

    #[test]
    fn debug_flags_parse() {
        let args = parse_argv(argv(&[
            "--stress-gc",
            "--trace",
            "--dump-tokens",
            "--dump-ast",
            "--dump-bytecode",
        ]))
        .unwrap();
        assert!(args.stress_gc);
        assert!(args.trace);
        assert!(args.dump_tokens);
        assert!(args.dump_ast);
        assert!(args.dump_bytecode);
        assert!(args.positional.is_empty());
    }

    #[test]
    fn multiple_positionals_are_collected_for_main_to_reject() {
        let args = parse_argv(argv(&["a.lox", "b.lox"])).unwrap();
        assert_eq!(args.positional.len(), 2);
    }
}
