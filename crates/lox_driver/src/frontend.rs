//! Pipeline orchestration.
//!
//! `Driver` wires lexer, parsers, resolver and bytecode compiler together and
//! merges their diagnostics. File entry points map I/O failures to a plain
//! error string for the CLI to report (exit 74).

use std::fs;
use std::rc::Rc;

use lox_ir::ast::{Program, Resolutions};
use lox_ir::FunctionProto;
use lox_lexer::Lexer;
use lox_parser::Parser;
use lox_syntax::{Diagnostic, SourceFile, Token};

/// A parsed and resolved program for the tree-walking evaluator.
pub struct ParsedProgram {
    pub source: SourceFile,
    pub program: Program,
    pub resolutions: Resolutions,
    pub diagnostics: Vec<Diagnostic>,
}

/// A compiled script for the VM.
pub struct CompiledScript {
    pub source: SourceFile,
    pub script: Option<Rc<FunctionProto>>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Session-level front end. Keeps the expression-id counter so successive
/// REPL lines resolve against distinct ids.
pub struct Driver {
    next_expr_id: u32,
}

impl Driver {
    pub fn new() -> Self {
        Self { next_expr_id: 0 }
    }

    pub fn lex_text(&self, name: &str, input: &str) -> (SourceFile, Vec<Token>, Vec<Diagnostic>) {
        let source = SourceFile::new(name, input.to_string());
        let lex = Lexer::new(source.text.as_str()).lex();
        (source, lex.tokens, lex.diagnostics)
    }

    /// Front end for the tree-walker: lex, parse, resolve.
    pub fn parse_text(&mut self, name: &str, input: &str) -> ParsedProgram {
        let (source, tokens, mut diagnostics) = self.lex_text(name, input);
        let parse = Parser::new(&source, &tokens, self.next_expr_id).parse();
        self.next_expr_id = parse.next_expr_id;
        diagnostics.extend(parse.diagnostics);
        let resolved = crate::resolver::resolve(&parse.program);
        diagnostics.extend(resolved.diagnostics);
        ParsedProgram {
            source,
            program: parse.program,
            resolutions: resolved.resolutions,
            diagnostics,
        }
    }

    /// Front end for the VM: lex, compile to bytecode.
    pub fn compile_text(&self, name: &str, input: &str) -> CompiledScript {
        let (source, tokens, mut diagnostics) = self.lex_text(name, input);
        let script = match crate::compiler::compile(&source, &tokens) {
            Ok(script) => Some(script),
            Err(compile_diags) => {
                diagnostics.extend(compile_diags);
                None
            }
        };
        // Scanner errors also refuse execution.
        let script = if diagnostics.is_empty() { script } else { None };
        CompiledScript {
            source,
            script,
            diagnostics,
        }
    }

    pub fn parse_file(&mut self, path: &str) -> Result<ParsedProgram, String> {
        let input = read_source(path)?;
        Ok(self.parse_text(path, &input))
    }

    pub fn compile_file(&self, path: &str) -> Result<CompiledScript, String> {
        let input = read_source(path)?;
        Ok(self.compile_text(path, &input))
    }
}

impl Default for Driver {
    fn default() -> Self {
        Self::new()
    }
}

fn read_source(path: &str) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("Could not read file \"{}\": {}.", path, e))
}
