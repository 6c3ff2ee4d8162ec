use std::io::{self, BufRead, Write};
use std::process::exit;

use lox_driver::Driver;
use lox_runtime::{Interpreter, InterpreterConfig, Vm, VmConfig};
use lox_syntax::render_diagnostic;

mod args;

use args::{parse_args, usage, CliArgs, EngineKind};

// sysexits.h conventions.
const EX_USAGE: i32 = 64;
const EX_DATAERR: i32 = 65;
const EX_SOFTWARE: i32 = 70;
const EX_IOERR: i32 = 74;

fn main() {
    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}", message);
            eprintln!("{}", usage());
            exit(EX_USAGE);
        }
    };

    match args.positional.len() {
        0 => repl(&args),
        1 => run_file(&args),
        _ => {
            eprintln!("{}", usage());
            exit(EX_USAGE);
        }
    }
}

fn run_file(args: &CliArgs) {
    let path = args.positional[0].as_str();
    match args.engine {
        EngineKind::Vm => {
            let driver = Driver::new();
            let mut vm = Vm::with_config(VmConfig {
                stress_gc: args.stress_gc,
                trace_execution: args.trace,
            });
            let input = read_file_or_exit(path);
            let status = run_vm_source(&driver, &mut vm, args, path, &input);
            if status != 0 {
                exit(status);
            }
        }
        EngineKind::Ast => {
            let mut driver = Driver::new();
            let mut interpreter = Interpreter::with_config(InterpreterConfig {
                stress_gc: args.stress_gc,
            });
            let input = read_file_or_exit(path);
            let status = run_ast_source(&mut driver, &mut interpreter, args, path, &input);
            if status != 0 {
                exit(status);
            }
        }
    }
}

fn repl(args: &CliArgs) {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    match args.engine {
        EngineKind::Vm => {
            let driver = Driver::new();
            let mut vm = Vm::with_config(VmConfig {
                stress_gc: args.stress_gc,
                trace_execution: args.trace,
            });
            loop {
                let Some(line) = prompt_line(&mut lines) else {
                    break;
                };
                // Errors are reported but never end the session.
                run_vm_source(&driver, &mut vm, args, "repl", &line);
            }
        }
        EngineKind::Ast => {
            let mut driver = Driver::new();
            let mut interpreter = Interpreter::with_config(InterpreterConfig {
                stress_gc: args.stress_gc,
            });
            loop {
                let Some(line) = prompt_line(&mut lines) else {
                    break;
                };
                run_ast_source(&mut driver, &mut interpreter, args, "repl", &line);
            }
        }
    }
}

fn prompt_line(lines: &mut impl Iterator<Item = io::Result<String>>) -> Option<String> {
    print!("> ");
    let _ = io::stdout().flush();
    match lines.next() {
        Some(Ok(line)) => Some(line),
        _ => None,
    }
}

fn read_file_or_exit(path: &str) -> String {
    match std::fs::read_to_string(path) {
        Ok(input) => input,
        Err(e) => {
            eprintln!("Could not read file \"{}\": {}.", path, e);
            exit(EX_IOERR);
        }
    }
}

/// Compile and run on the VM; returns the exit status (0 on success).
fn run_vm_source(driver: &Driver, vm: &mut Vm, args: &CliArgs, name: &str, input: &str) -> i32 {
    if args.dump_tokens {
        dump_tokens(driver, name, input);
    }
    let compiled = driver.compile_text(name, input);
    for diagnostic in &compiled.diagnostics {
        eprintln!("{}", render_diagnostic(&compiled.source, diagnostic));
    }
    let Some(script) = compiled.script else {
        return EX_DATAERR;
    };
    if args.dump_bytecode {
        eprint!("{}", lox_ir::disassemble(&script.chunk, "script"));
    }
    let result = vm.interpret(script);
    print!("{}", vm.take_output());
    let _ = io::stdout().flush();
    match result {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{}", err);
            EX_SOFTWARE
        }
    }
}

/// Parse, resolve and run on the tree-walker; returns the exit status.
fn run_ast_source(
    driver: &mut Driver,
    interpreter: &mut Interpreter,
    args: &CliArgs,
    name: &str,
    input: &str,
) -> i32 {
    if args.dump_tokens {
        dump_tokens(driver, name, input);
    }
    let parsed = driver.parse_text(name, input);
    for diagnostic in &parsed.diagnostics {
        eprintln!("{}", render_diagnostic(&parsed.source, diagnostic));
    }
    if !parsed.diagnostics.is_empty() {
        return EX_DATAERR;
    }
    if args.dump_ast {
        eprintln!("{:#?}", parsed.program);
    }
    let result = interpreter.interpret(&parsed.program, parsed.resolutions);
    print!("{}", interpreter.take_output());
    let _ = io::stdout().flush();
    match result {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{}", err);
            EX_SOFTWARE
        }
    }
}

fn dump_tokens(driver: &Driver, name: &str, input: &str) {
    let (source, tokens, _) = driver.lex_text(name, input);
    for token in &tokens {
        eprintln!(
            "{:?}\t{:?}\t{}",
            token.kind,
            token.span,
            source.text.slice(token.span)
        );
    }
}
