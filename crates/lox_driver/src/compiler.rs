//! Single-pass bytecode compiler.
//!
//! A precedence-climbing parser that emits into the chunk of the function
//! being compiled; there is no AST. Function declarations push a nested
//! compiler state that owns its own chunk, locals and upvalue descriptors,
//! then collapse into a function constant wrapped by a CLOSURE instruction.

use std::rc::Rc;

use lox_ir::{Chunk, Constant, FunctionProto, Opcode};
use lox_syntax::{Diagnostic, SourceFile, Token, TokenKind};

/// Compile a token stream into the implicit top-level script function.
pub fn compile(
    source: &SourceFile,
    tokens: &[Token],
) -> Result<Rc<FunctionProto>, Vec<Diagnostic>> {
    let mut compiler = Compiler {
        source,
        tokens,
        i: 0,
        panic_mode: false,
        had_error: false,
        diagnostics: Vec::new(),
        func: Box::new(FuncState::new(FunctionKind::Script, None)),
        class: None,
    };
    while !compiler.at(TokenKind::Eof) {
        compiler.declaration();
    }
    compiler.emit_return();
    if compiler.had_error {
        Err(compiler.diagnostics)
    } else {
        let func = *compiler.func;
        Ok(Rc::new(func.into_proto()))
    }
}

#[derive(Clone, Copy, PartialEq, PartialOrd)]
enum Precedence {
    None,
    Assignment,
    Or,
    And,
    Equality,
    Comparison,
    Term,
    Factor,
    Unary,
    Call,
    Primary,
}

impl Precedence {
    fn next(self) -> Self {
        match self {
            Precedence::None => Precedence::Assignment,
            Precedence::Assignment => Precedence::Or,
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Equality,
            Precedence::Equality => Precedence::Comparison,
            Precedence::Comparison => Precedence::Term,
            Precedence::Term => Precedence::Factor,
            Precedence::Factor => Precedence::Unary,
            Precedence::Unary => Precedence::Call,
            Precedence::Call | Precedence::Primary => Precedence::Primary,
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum FunctionKind {
    Script,
    Function,
    Method,
    Initializer,
}

struct Local {
    name: Rc<str>,
    /// -1 while declared but not yet initialized.
    depth: i32,
    is_captured: bool,
}

struct UpvalueDesc {
    is_local: bool,
    index: u8,
}

const MAX_LOCALS: usize = u8::MAX as usize + 1;
const MAX_UPVALUES: usize = u8::MAX as usize + 1;

struct FuncState {
    enclosing: Option<Box<FuncState>>,
    kind: FunctionKind,
    name: Option<Rc<str>>,
    chunk: Chunk,
    arity: u8,
    locals: Vec<Local>,
    upvalues: Vec<UpvalueDesc>,
    scope_depth: i32,
}

impl FuncState {
    fn new(kind: FunctionKind, name: Option<Rc<str>>) -> Self {
        // Slot 0 belongs to the callee; methods use it for `this`.
        let slot_zero = match kind {
            FunctionKind::Method | FunctionKind::Initializer => "this",
            _ => "",
        };
        Self {
            enclosing: None,
            kind,
            name,
            chunk: Chunk::new(),
            arity: 0,
            locals: vec![Local {
                name: slot_zero.into(),
                depth: 0,
                is_captured: false,
            }],
            upvalues: Vec::new(),
            scope_depth: 0,
        }
    }

    fn into_proto(self) -> FunctionProto {
        FunctionProto {
            name: self.name,
            arity: self.arity,
            upvalue_count: self.upvalues.len() as u8,
            chunk: self.chunk,
        }
    }
}

enum ResolveError {
    OwnInitializer,
    TooManyUpvalues,
}

/// Find `name` among the function's locals; innermost declaration wins.
fn resolve_local(func: &FuncState, name: &str) -> Result<Option<u8>, ResolveError> {
    for (idx, local) in func.locals.iter().enumerate().rev() {
        if &*local.name == name {
            if local.depth == -1 {
                return Err(ResolveError::OwnInitializer);
            }
            return Ok(Some(idx as u8));
        }
    }
    Ok(None)
}

/// Find or create an upvalue for `name`, recursing through the enclosing
/// compiler states and marking captured locals.
fn resolve_upvalue(func: &mut FuncState, name: &str) -> Result<Option<u8>, ResolveError> {
    let Some(enclosing) = func.enclosing.as_deref_mut() else {
        return Ok(None);
    };
    if let Some(local) = resolve_local(enclosing, name)? {
        enclosing.locals[local as usize].is_captured = true;
        return add_upvalue(func, true, local).map(Some);
    }
    if let Some(upvalue) = resolve_upvalue(enclosing, name)? {
        return add_upvalue(func, false, upvalue).map(Some);
    }
    Ok(None)
}

fn add_upvalue(func: &mut FuncState, is_local: bool, index: u8) -> Result<u8, ResolveError> {
    for (i, upvalue) in func.upvalues.iter().enumerate() {
        if upvalue.is_local == is_local && upvalue.index == index {
            return Ok(i as u8);
        }
    }
    if func.upvalues.len() >= MAX_UPVALUES {
        return Err(ResolveError::TooManyUpvalues);
    }
    func.upvalues.push(UpvalueDesc { is_local, index });
    Ok((func.upvalues.len() - 1) as u8)
}

struct ClassState {
    enclosing: Option<Box<ClassState>>,
    has_superclass: bool,
}

type ParseFn = for<'b> fn(&mut Compiler<'b>, bool);

struct Compiler<'a> {
    source: &'a SourceFile,
    tokens: &'a [Token],
    i: usize,
    panic_mode: bool,
    had_error: bool,
    diagnostics: Vec<Diagnostic>,
    func: Box<FuncState>,
    class: Option<Box<ClassState>>,
}

impl<'a> Compiler<'a> {
    // Token plumbing

    fn current(&self) -> Token {
        self.tokens[self.i.min(self.tokens.len() - 1)]
    }

    fn previous(&self) -> Token {
        self.tokens[self.i.saturating_sub(1).min(self.tokens.len() - 1)]
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn advance(&mut self) {
        // Advancing past the end leaves both cursors on Eof.
        if self.i < self.tokens.len() {
            self.i += 1;
        }
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.at(kind) {
            self.advance();
        } else {
            self.error_at_current(message);
        }
    }

    fn lexeme(&self, token: Token) -> &'a str {
        self.source.text.slice(token.span)
    }

    fn line(&self, token: Token) -> u32 {
        self.source.text.line(token.span.start.0)
    }

    // Diagnostics

    fn error(&mut self, message: &str) {
        self.error_at(self.previous(), message);
    }

    fn error_at_current(&mut self, message: &str) {
        self.error_at(self.current(), message);
    }

    fn error_at(&mut self, token: Token, message: &str) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        self.had_error = true;
        if token.kind == TokenKind::Eof {
            self.diagnostics
                .push(Diagnostic::error_at_end(message, token.span));
        } else {
            self.diagnostics
                .push(Diagnostic::error(message, Some(token.span)));
        }
    }

    fn synchronize(&mut self) {
        self.panic_mode = false;
        while !self.at(TokenKind::Eof) {
            if self.previous().kind == TokenKind::Semicolon {
                return;
            }
            match self.current().kind {
                TokenKind::KwClass
                | TokenKind::KwFun
                | TokenKind::KwVar
                | TokenKind::KwFor
                | TokenKind::KwIf
                | TokenKind::KwWhile
                | TokenKind::KwPrint
                | TokenKind::KwReturn => return,
                _ => self.advance(),
            }
        }
    }

    // Emission

    fn emit_byte(&mut self, byte: u8) {
        let line = self.line(self.previous());
        self.func.chunk.write_byte(byte, line);
    }

    fn emit_op(&mut self, op: Opcode) {
        self.emit_byte(op.into());
    }

    fn emit_ops(&mut self, a: Opcode, b: Opcode) {
        self.emit_op(a);
        self.emit_op(b);
    }

    fn emit_op_byte(&mut self, op: Opcode, byte: u8) {
        self.emit_op(op);
        self.emit_byte(byte);
    }

    fn emit_return(&mut self) {
        if self.func.kind == FunctionKind::Initializer {
            // Initializers yield the receiver in slot 0.
            self.emit_op_byte(Opcode::GetLocal, 0);
        } else {
            self.emit_op(Opcode::Nil);
        }
        self.emit_op(Opcode::Return);
    }

    fn make_constant(&mut self, constant: Constant) -> u8 {
        match self.func.chunk.add_constant(constant) {
            Some(idx) => idx,
            None => {
                self.error("Maximum number of constant values in chunk exceeded.");
                0
            }
        }
    }

    fn emit_constant(&mut self, constant: Constant) {
        let idx = self.make_constant(constant);
        self.emit_op_byte(Opcode::Constant, idx);
    }

    fn identifier_constant(&mut self, name: &str) -> u8 {
        self.make_constant(Constant::Str(name.into()))
    }

    /// Emit a forward jump and return the operand offset for patching.
    fn emit_jump(&mut self, op: Opcode) -> usize {
        self.emit_op(op);
        self.emit_byte(0xff);
        self.emit_byte(0xff);
        self.func.chunk.code.len() - 2
    }

    fn patch_jump(&mut self, offset: usize) {
        let jump = self.func.chunk.code.len() - offset - 2;
        if jump > u16::MAX as usize {
            self.error("Too much code to jump over.");
        }
        let bytes = (jump as u16).to_be_bytes();
        self.func.chunk.code[offset] = bytes[0];
        self.func.chunk.code[offset + 1] = bytes[1];
    }

    fn emit_loop(&mut self, loop_start: usize) {
        self.emit_op(Opcode::Loop);
        let offset = self.func.chunk.code.len() - loop_start + 2;
        if offset > u16::MAX as usize {
            self.error("Loop body too large.");
        }
        let bytes = (offset as u16).to_be_bytes();
        self.emit_byte(bytes[0]);
        self.emit_byte(bytes[1]);
    }

    // Declarations

    fn declaration(&mut self) {
        if self.eat(TokenKind::KwClass) {
            self.class_declaration();
        } else if self.eat(TokenKind::KwFun) {
            self.fun_declaration();
        } else if self.eat(TokenKind::KwVar) {
            self.var_declaration();
        } else {
            self.statement();
        }
        if self.panic_mode {
            self.synchronize();
        }
    }

    fn var_declaration(&mut self) {
        let global = self.parse_variable("Expect variable name.");
        if self.eat(TokenKind::Eq) {
            self.expression();
        } else {
            self.emit_op(Opcode::Nil);
        }
        self.consume(
            TokenKind::Semicolon,
            "Expect ';' after variable declaration.",
        );
        self.define_variable(global);
    }

    fn fun_declaration(&mut self) {
        let global = self.parse_variable("Expect function name.");
        // The name is usable inside the body, for recursion.
        self.mark_initialized();
        self.function(FunctionKind::Function);
        self.define_variable(global);
    }

    fn function(&mut self, kind: FunctionKind) {
        let name: Rc<str> = self.lexeme(self.previous()).into();
        let state = FuncState::new(kind, Some(name));
        let enclosing = std::mem::replace(&mut self.func, Box::new(state));
        self.func.enclosing = Some(enclosing);
        self.begin_scope();

        self.consume(TokenKind::LParen, "Expect '(' after function name.");
        if !self.at(TokenKind::RParen) {
            loop {
                if self.func.arity == u8::MAX {
                    self.error_at_current("Can't have more than 255 parameters.");
                }
                self.func.arity = self.func.arity.wrapping_add(1);
                let param = self.parse_variable("Expect parameter name.");
                self.define_variable(param);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RParen, "Expect ')' after parameters.");
        self.consume(TokenKind::LBrace, "Expect '{' before function body.");
        self.block();
        self.emit_return();

        // Collapse the nested state into a function constant plus CLOSURE.
        let enclosing = self
            .func
            .enclosing
            .take()
            .expect("function state has an enclosing compiler");
        let state = std::mem::replace(&mut self.func, enclosing);
        let upvalues = state.upvalues.iter().map(|u| (u.is_local, u.index)).collect::<Vec<_>>();
        let proto = Rc::new(state.into_proto());
        let idx = self.make_constant(Constant::Function(proto));
        self.emit_op_byte(Opcode::Closure, idx);
        for (is_local, index) in upvalues {
            self.emit_byte(is_local as u8);
            self.emit_byte(index);
        }
    }

    fn class_declaration(&mut self) {
        self.consume(TokenKind::Ident, "Expect class name.");
        let name_token = self.previous();
        let class_name: Rc<str> = self.lexeme(name_token).into();
        let name_constant = self.identifier_constant(&class_name);
        self.declare_variable();
        self.emit_op_byte(Opcode::Class, name_constant);
        self.define_variable(name_constant);

        let class_state = ClassState {
            enclosing: self.class.take(),
            has_superclass: false,
        };
        self.class = Some(Box::new(class_state));

        if self.eat(TokenKind::Lt) {
            self.consume(TokenKind::Ident, "Expect superclass name.");
            let superclass = self.lexeme(self.previous());
            if superclass == &*class_name {
                self.error("A class cannot inherit from itself.");
            }
            self.named_variable(superclass, false);

            // Implicit scope holding `super` for the method bodies.
            self.begin_scope();
            self.add_local("super".into());
            self.mark_initialized();

            self.named_variable(&class_name, false);
            self.emit_op(Opcode::Inherit);
            if let Some(class) = self.class.as_mut() {
                class.has_superclass = true;
            }
        }

        self.named_variable(&class_name, false);
        self.consume(TokenKind::LBrace, "Expect '{' before class body.");
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            self.method();
        }
        self.consume(TokenKind::RBrace, "Expect '}' after class body.");
        self.emit_op(Opcode::Pop);

        let has_superclass = self
            .class
            .as_ref()
            .is_some_and(|class| class.has_superclass);
        if has_superclass {
            self.end_scope();
        }
        self.class = self.class.take().and_then(|class| class.enclosing);
    }

    fn method(&mut self) {
        self.consume(TokenKind::Ident, "Expect method name.");
        let name = self.lexeme(self.previous());
        let constant = self.identifier_constant(name);
        let kind = if name == "init" {
            FunctionKind::Initializer
        } else {
            FunctionKind::Method
        };
        self.function(kind);
        self.emit_op_byte(Opcode::Method, constant);
    }

    // Statements

    fn statement(&mut self) {
        if self.eat(TokenKind::KwPrint) {
            self.print_statement();
        } else if self.eat(TokenKind::KwIf) {
            self.if_statement();
        } else if self.eat(TokenKind::KwReturn) {
            self.return_statement();
        } else if self.eat(TokenKind::KwWhile) {
            self.while_statement();
        } else if self.eat(TokenKind::KwFor) {
            self.for_statement();
        } else if self.eat(TokenKind::LBrace) {
            self.begin_scope();
            self.block();
            self.end_scope();
        } else {
            self.expression_statement();
        }
    }

    fn print_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after value.");
        self.emit_op(Opcode::Print);
    }

    fn expression_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after expression.");
        self.emit_op(Opcode::Pop);
    }

    fn if_statement(&mut self) {
        self.consume(TokenKind::LParen, "Expect '(' after 'if'.");
        self.expression();
        self.consume(TokenKind::RParen, "Expect ')' after condition.");

        let then_jump = self.emit_jump(Opcode::JumpIfFalse);
        self.emit_op(Opcode::Pop);
        self.statement();
        let else_jump = self.emit_jump(Opcode::Jump);
        self.patch_jump(then_jump);
        self.emit_op(Opcode::Pop);
        if self.eat(TokenKind::KwElse) {
            self.statement();
        }
        self.patch_jump(else_jump);
    }

    fn while_statement(&mut self) {
        let loop_start = self.func.chunk.code.len();
        self.consume(TokenKind::LParen, "Expect '(' after 'while'.");
        self.expression();
        self.consume(TokenKind::RParen, "Expect ')' after condition.");

        let exit_jump = self.emit_jump(Opcode::JumpIfFalse);
        self.emit_op(Opcode::Pop);
        self.statement();
        self.emit_loop(loop_start);
        self.patch_jump(exit_jump);
        self.emit_op(Opcode::Pop);
    }

    /// `for` compiles as the equivalent while loop inside a synthetic scope
    /// holding the initializer; the step runs after the body, before the
    /// jump back to the condition.
    fn for_statement(&mut self) {
        self.begin_scope();
        self.consume(TokenKind::LParen, "Expect '(' after 'for'.");
        if self.eat(TokenKind::Semicolon) {
            // No initializer.
        } else if self.eat(TokenKind::KwVar) {
            self.var_declaration();
        } else {
            self.expression_statement();
        }

        let mut loop_start = self.func.chunk.code.len();
        let mut exit_jump = None;
        if !self.eat(TokenKind::Semicolon) {
            self.expression();
            self.consume(TokenKind::Semicolon, "Expect ';' after loop condition.");
            exit_jump = Some(self.emit_jump(Opcode::JumpIfFalse));
            self.emit_op(Opcode::Pop);
        }

        if !self.eat(TokenKind::RParen) {
            let body_jump = self.emit_jump(Opcode::Jump);
            let increment_start = self.func.chunk.code.len();
            self.expression();
            self.emit_op(Opcode::Pop);
            self.consume(TokenKind::RParen, "Expect ')' after for clauses.");
            self.emit_loop(loop_start);
            loop_start = increment_start;
            self.patch_jump(body_jump);
        }

        self.statement();
        self.emit_loop(loop_start);
        if let Some(exit_jump) = exit_jump {
            self.patch_jump(exit_jump);
            self.emit_op(Opcode::Pop);
        }
        self.end_scope();
    }

    fn return_statement(&mut self) {
        if self.func.kind == FunctionKind::Script {
            self.error("Can't return from top-level code.");
        }
        if self.eat(TokenKind::Semicolon) {
            self.emit_return();
        } else {
            if self.func.kind == FunctionKind::Initializer {
                self.error("Can't return a value from a class initializer.");
            }
            self.expression();
            self.consume(TokenKind::Semicolon, "Expect ';' after return value.");
            self.emit_op(Opcode::Return);
        }
    }

    fn block(&mut self) {
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            self.declaration();
        }
        self.consume(TokenKind::RBrace, "Expect '}' after block.");
    }

    // Scopes and variables

    fn begin_scope(&mut self) {
        self.func.scope_depth += 1;
    }

    fn end_scope(&mut self) {
        self.func.scope_depth -= 1;
        loop {
            let captured = match self.func.locals.last() {
                Some(local) if local.depth > self.func.scope_depth => local.is_captured,
                _ => break,
            };
            if captured {
                self.emit_op(Opcode::CloseUpvalue);
            } else {
                self.emit_op(Opcode::Pop);
            }
            self.func.locals.pop();
        }
    }

    /// Consume an identifier; returns its constant index for globals, 0 for
    /// locals (which live on the stack, not in the constant pool).
    fn parse_variable(&mut self, message: &str) -> u8 {
        self.consume(TokenKind::Ident, message);
        self.declare_variable();
        if self.func.scope_depth > 0 {
            return 0;
        }
        let name = self.lexeme(self.previous());
        self.identifier_constant(name)
    }

    fn declare_variable(&mut self) {
        if self.func.scope_depth == 0 {
            return;
        }
        let name: Rc<str> = self.lexeme(self.previous()).into();
        let mut duplicate = false;
        for local in self.func.locals.iter().rev() {
            if local.depth != -1 && local.depth < self.func.scope_depth {
                break;
            }
            if local.name == name {
                duplicate = true;
                break;
            }
        }
        if duplicate {
            self.error("Already a variable with this name in this scope.");
        }
        self.add_local(name);
    }

    fn add_local(&mut self, name: Rc<str>) {
        if self.func.locals.len() >= MAX_LOCALS {
            self.error("Too many local variables in function.");
            return;
        }
        self.func.locals.push(Local {
            name,
            depth: -1,
            is_captured: false,
        });
    }

    fn mark_initialized(&mut self) {
        if self.func.scope_depth == 0 {
            return;
        }
        if let Some(local) = self.func.locals.last_mut() {
            local.depth = self.func.scope_depth;
        }
    }

    fn define_variable(&mut self, global: u8) {
        if self.func.scope_depth > 0 {
            self.mark_initialized();
            return;
        }
        self.emit_op_byte(Opcode::DefineGlobal, global);
    }

    /// Compile a read or (when allowed and followed by `=`) a write of a
    /// named variable: local, upvalue or global.
    fn named_variable(&mut self, name: &str, can_assign: bool) {
        let (get_op, set_op, arg) = match resolve_local(&self.func, name) {
            Err(ResolveError::OwnInitializer) => {
                self.error("Can't read local variable in its own initializer.");
                return;
            }
            Err(ResolveError::TooManyUpvalues) => unreachable!(),
            Ok(Some(local)) => (Opcode::GetLocal, Opcode::SetLocal, local),
            Ok(None) => match resolve_upvalue(&mut self.func, name) {
                Err(ResolveError::OwnInitializer) => {
                    self.error("Can't read local variable in its own initializer.");
                    return;
                }
                Err(ResolveError::TooManyUpvalues) => {
                    self.error("Too many closure variables in function.");
                    return;
                }
                Ok(Some(upvalue)) => (Opcode::GetUpvalue, Opcode::SetUpvalue, upvalue),
                Ok(None) => {
                    let idx = self.identifier_constant(name);
                    (Opcode::GetGlobal, Opcode::SetGlobal, idx)
                }
            },
        };
        if can_assign && self.eat(TokenKind::Eq) {
            self.expression();
            self.emit_op_byte(set_op, arg);
        } else {
            self.emit_op_byte(get_op, arg);
        }
    }

    // Expressions

    fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    fn parse_precedence(&mut self, precedence: Precedence) {
        self.advance();
        let Some(prefix) = prefix_rule(self.previous().kind) else {
            self.error("Expected expression.");
            return;
        };
        let can_assign = precedence <= Precedence::Assignment;
        prefix(self, can_assign);

        while precedence <= infix_precedence(self.current().kind) {
            self.advance();
            let infix = infix_rule(self.previous().kind)
                .expect("token with an infix precedence has an infix rule");
            infix(self, can_assign);
        }

        if can_assign && self.eat(TokenKind::Eq) {
            self.error("Invalid assignment target.");
        }
    }

    fn argument_list(&mut self) -> u8 {
        let mut argc: u8 = 0;
        if !self.at(TokenKind::RParen) {
            loop {
                if argc == u8::MAX {
                    self.error("Can't have more than 255 arguments.");
                }
                argc = argc.wrapping_add(1);
                self.expression();
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RParen, "Expect ')' after arguments.");
        argc
    }
}

// Parse rules

fn prefix_rule(kind: TokenKind) -> Option<ParseFn> {
    let rule: ParseFn = match kind {
        TokenKind::LParen => grouping,
        TokenKind::Minus | TokenKind::Bang => unary,
        TokenKind::Number => number,
        TokenKind::Str => string,
        TokenKind::KwNil | TokenKind::KwTrue | TokenKind::KwFalse => literal,
        TokenKind::Ident => variable,
        TokenKind::KwThis => this_,
        TokenKind::KwSuper => super_,
        _ => return None,
    };
    Some(rule)
}

fn infix_rule(kind: TokenKind) -> Option<ParseFn> {
    let rule: ParseFn = match kind {
        TokenKind::LParen => call,
        TokenKind::Dot => dot,
        TokenKind::Minus
        | TokenKind::Plus
        | TokenKind::Slash
        | TokenKind::Star
        | TokenKind::BangEq
        | TokenKind::EqEq
        | TokenKind::Gt
        | TokenKind::Ge
        | TokenKind::Lt
        | TokenKind::Le => binary,
        TokenKind::KwAnd => and_,
        TokenKind::KwOr => or_,
        _ => return None,
    };
    Some(rule)
}

fn infix_precedence(kind: TokenKind) -> Precedence {
    match kind {
        TokenKind::LParen | TokenKind::Dot => Precedence::Call,
        TokenKind::Minus | TokenKind::Plus => Precedence::Term,
        TokenKind::Slash | TokenKind::Star => Precedence::Factor,
        TokenKind::BangEq | TokenKind::EqEq => Precedence::Equality,
        TokenKind::Gt | TokenKind::Ge | TokenKind::Lt | TokenKind::Le => Precedence::Comparison,
        TokenKind::KwAnd => Precedence::And,
        TokenKind::KwOr => Precedence::Or,
        _ => Precedence::None,
    }
}

fn grouping(c: &mut Compiler<'_>, _can_assign: bool) {
    c.expression();
    c.consume(TokenKind::RParen, "Expect ')' after expression.");
}

fn number(c: &mut Compiler<'_>, _can_assign: bool) {
    let value = c
        .lexeme(c.previous())
        .parse::<f64>()
        .unwrap_or_default();
    c.emit_constant(Constant::Number(value));
}

fn string(c: &mut Compiler<'_>, _can_assign: bool) {
    let lexeme = c.lexeme(c.previous());
    let content = &lexeme[1..lexeme.len() - 1];
    c.emit_constant(Constant::Str(content.into()));
}

fn literal(c: &mut Compiler<'_>, _can_assign: bool) {
    match c.previous().kind {
        TokenKind::KwNil => c.emit_op(Opcode::Nil),
        TokenKind::KwTrue => c.emit_op(Opcode::True),
        TokenKind::KwFalse => c.emit_op(Opcode::False),
        _ => unreachable!(),
    }
}

fn variable(c: &mut Compiler<'_>, can_assign: bool) {
    let name = c.lexeme(c.previous());
    c.named_variable(name, can_assign);
}

fn unary(c: &mut Compiler<'_>, _can_assign: bool) {
    let op = c.previous().kind;
    c.parse_precedence(Precedence::Unary);
    match op {
        TokenKind::Minus => c.emit_op(Opcode::Negate),
        TokenKind::Bang => c.emit_op(Opcode::Not),
        _ => unreachable!(),
    }
}

fn binary(c: &mut Compiler<'_>, _can_assign: bool) {
    let op = c.previous().kind;
    c.parse_precedence(infix_precedence(op).next());
    match op {
        TokenKind::Plus => c.emit_op(Opcode::Add),
        TokenKind::Minus => c.emit_op(Opcode::Subtract),
        TokenKind::Star => c.emit_op(Opcode::Multiply),
        TokenKind::Slash => c.emit_op(Opcode::Divide),
        TokenKind::EqEq => c.emit_op(Opcode::Equal),
        TokenKind::BangEq => c.emit_ops(Opcode::Equal, Opcode::Not),
        TokenKind::Gt => c.emit_op(Opcode::Greater),
        TokenKind::Ge => c.emit_ops(Opcode::Less, Opcode::Not),
        TokenKind::Lt => c.emit_op(Opcode::Less),
        TokenKind::Le => c.emit_ops(Opcode::Greater, Opcode::Not),
        _ => unreachable!(),
    }
}

fn and_(c: &mut Compiler<'_>, _can_assign: bool) {
    let end_jump = c.emit_jump(Opcode::JumpIfFalse);
    c.emit_op(Opcode::Pop);
    c.parse_precedence(Precedence::And);
    c.patch_jump(end_jump);
}

fn or_(c: &mut Compiler<'_>, _can_assign: bool) {
    let else_jump = c.emit_jump(Opcode::JumpIfFalse);
    let end_jump = c.emit_jump(Opcode::Jump);
    c.patch_jump(else_jump);
    c.emit_op(Opcode::Pop);
    c.parse_precedence(Precedence::Or);
    c.patch_jump(end_jump);
}

fn call(c: &mut Compiler<'_>, _can_assign: bool) {
    let argc = c.argument_list();
    c.emit_op_byte(Opcode::Call, argc);
}

fn dot(c: &mut Compiler<'_>, can_assign: bool) {
    c.consume(TokenKind::Ident, "Expect property name after '.'.");
    let name = c.lexeme(c.previous());
    let constant = c.identifier_constant(name);
    if can_assign && c.eat(TokenKind::Eq) {
        c.expression();
        c.emit_op_byte(Opcode::SetProperty, constant);
    } else if c.eat(TokenKind::LParen) {
        let argc = c.argument_list();
        c.emit_op_byte(Opcode::Invoke, constant);
        c.emit_byte(argc);
    } else {
        c.emit_op_byte(Opcode::GetProperty, constant);
    }
}

fn this_(c: &mut Compiler<'_>, _can_assign: bool) {
    if c.class.is_none() {
        c.error("Can't use 'this' outside of a class.");
        return;
    }
    c.named_variable("this", false);
}

fn super_(c: &mut Compiler<'_>, _can_assign: bool) {
    match c.class.as_ref() {
        None => {
            c.error("Can't use 'super' outside of a class.");
        }
        Some(class) if !class.has_superclass => {
            c.error("Can't use 'super' in a class with no superclass.");
        }
        Some(_) => {}
    }
    c.consume(TokenKind::Dot, "Expect '.' after 'super'.");
    c.consume(TokenKind::Ident, "Expect superclass method name.");
    let name = c.lexeme(c.previous());
    let constant = c.identifier_constant(name);

    c.named_variable("this", false);
    if c.eat(TokenKind::LParen) {
        let argc = c.argument_list();
        c.named_variable("super", false);
        c.emit_op_byte(Opcode::SuperInvoke, constant);
        c.emit_byte(argc);
    } else {
        c.named_variable("super", false);
        c.emit_op_byte(Opcode::GetSuper, constant);
    }
}
