use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

fn write_temp_lox(name: &str, content: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    let unique = format!(
        "lox_cli_test_{}_{}_{}.lox",
        name,
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    );
    path.push(unique);
    std::fs::write(&path, content).unwrap();
    path
}

fn run_lox(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_lox"))
        .args(args)
        .output()
        .unwrap()
}

/// Start a REPL session, feed it `input` on stdin, and collect the output.
fn run_repl(args: &[&str], input: &str) -> std::process::Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_lox"))
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

fn run_script(args: &[&str], name: &str, content: &str) -> std::process::Output {
    let path = write_temp_lox(name, content);
    let path_str = path.to_string_lossy().to_string();
    let mut full: Vec<&str> = args.to_vec();
    full.push(&path_str);
    let out = run_lox(&full);
    let _ = std::fs::remove_file(&path);
    out
}

// Flag parsing and usage errors (exit 64)

#[test]
fn two_scripts_is_a_usage_error() {
    let out = run_lox(&["a.lox", "b.lox"]);
    assert_eq!(out.status.code(), Some(64));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Usage: lox"), "{stderr}");
}

#[test]
fn unknown_option_is_a_usage_error() {
    let out = run_lox(&["--bogus"]);
    assert_eq!(out.status.code(), Some(64));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Unknown option: --bogus"), "{stderr}");
    assert!(stderr.contains("Usage: lox"), "{stderr}");
}

#[test]
fn engine_flag_requires_a_value() {
    let out = run_lox(&["--engine"]);
    assert_eq!(out.status.code(), Some(64));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Missing value for '--engine'"), "{stderr}");
}

#[test]
fn engine_flag_rejects_unknown_engines() {
    let out = run_lox(&["--engine", "jit"]);
    assert_eq!(out.status.code(), Some(64));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Unknown engine: jit"), "{stderr}");
}

// File execution and exit codes

#[test]
fn run_file_prints_to_stdout() {
    let out = run_script(&[], "run_file_prints", "print 1 + 2;");
    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout), "3\n");
    assert!(out.stderr.is_empty());
}

#[test]
fn engine_value_does_not_eat_the_script_argument() {
    // `--engine vm script.lox` is one engine flag plus one script.
    let out = run_script(&["--engine", "vm"], "engine_vm_run", "print 1 + 2;");
    assert!(
        out.status.success(),
        "stderr={}",
        String::from_utf8_lossy(&out.stderr)
    );
    assert_eq!(String::from_utf8_lossy(&out.stdout), "3\n");
}

#[test]
fn both_engines_run_the_same_script() {
    let source = "fun twice(n) { return n + n; } print twice(21);";
    let vm = run_script(&["--engine", "vm"], "engines_vm", source);
    let ast = run_script(&["--engine", "ast"], "engines_ast", source);
    assert!(vm.status.success());
    assert!(ast.status.success());
    assert_eq!(String::from_utf8_lossy(&vm.stdout), "42\n");
    assert_eq!(vm.stdout, ast.stdout);
}

#[test]
fn compile_error_exits_65() {
    for engine in [&["--engine", "vm"][..], &["--engine", "ast"][..]] {
        let out = run_script(engine, "compile_error", "var = 1;");
        assert_eq!(out.status.code(), Some(65));
        let stderr = String::from_utf8_lossy(&out.stderr);
        assert!(
            stderr.contains("[line 1] Error at '=': Expect variable name."),
            "{stderr}"
        );
    }
}

#[test]
fn runtime_error_exits_70() {
    for engine in [&["--engine", "vm"][..], &["--engine", "ast"][..]] {
        let out = run_script(engine, "runtime_error", "print \"before\";\nprint missing;");
        assert_eq!(out.status.code(), Some(70));
        // Output up to the error still reaches stdout.
        assert_eq!(String::from_utf8_lossy(&out.stdout), "before\n");
        let stderr = String::from_utf8_lossy(&out.stderr);
        assert!(stderr.contains("Undefined variable 'missing'."), "{stderr}");
        assert!(stderr.contains("[line 2] in script"), "{stderr}");
    }
}

#[test]
fn unreadable_file_exits_74() {
    let out = run_lox(&["definitely/not/a/real/file.lox"]);
    assert_eq!(out.status.code(), Some(74));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Could not read file"), "{stderr}");
}

// Debug surfaces

#[test]
fn stress_gc_does_not_change_output() {
    let source = "var s = \"\"; for (var i = 0; i < 10; i = i + 1) s = s + \"x\"; print s;";
    let plain = run_script(&[], "stress_plain", source);
    let stressed = run_script(&["--stress-gc"], "stress_on", source);
    assert!(plain.status.success());
    assert!(stressed.status.success());
    assert_eq!(plain.stdout, stressed.stdout);
}

#[test]
fn dump_bytecode_goes_to_stderr_and_still_runs() {
    let out = run_script(&["--dump-bytecode"], "dump_bytecode", "print 1 + 2;");
    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout), "3\n");
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("== script =="), "{stderr}");
    assert!(stderr.contains("CONSTANT"), "{stderr}");
}

#[test]
fn dump_tokens_goes_to_stderr() {
    let out = run_script(&["--dump-tokens"], "dump_tokens", "print 1;");
    assert!(out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("KwPrint"), "{stderr}");
    assert!(stderr.contains("Eof"), "{stderr}");
}

// REPL dispatch

#[test]
fn no_arguments_starts_a_repl_that_exits_on_eof() {
    let out = run_repl(&[], "print 1 + 2;\n");
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("> "), "{stdout}");
    assert!(stdout.contains("3\n"), "{stdout}");
}

#[test]
fn repl_globals_persist_between_lines() {
    let out = run_repl(&[], "var x = 40;\nprint x + 2;\n");
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("42\n"), "{stdout}");
}

#[test]
fn repl_survives_errors_on_earlier_lines() {
    let out = run_repl(&[], "print missing;\nvar = 1;\nprint \"still here\";\n");
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("still here\n"), "{stdout}");
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Undefined variable 'missing'."), "{stderr}");
    assert!(stderr.contains("Expect variable name."), "{stderr}");
}

#[test]
fn repl_runs_on_the_ast_engine_too() {
    let out = run_repl(
        &["--engine", "ast"],
        "fun greet() { return \"hi\"; }\nprint greet();\n",
    );
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("hi\n"), "{stdout}");
}
