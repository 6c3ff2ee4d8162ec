//! Parser.
//!
//! Converts lexer tokens into a syntax tree (Program/Stmt/Expr) and collects
//! diagnostics. Statements are parsed by recursive descent; expressions by
//! precedence climbing (see `expr.rs`). On an error the parser records a
//! diagnostic and re-synchronizes at the next statement boundary, so one
//! malformed statement does not cascade.
use std::rc::Rc;

use lox_ir::ast::{ClassDecl, Expr, ExprId, FunctionDecl, Param, Program, Stmt, VarExpr};
use lox_syntax::{Diagnostic, SourceFile, Span, Token, TokenKind};

/// Parse result.
pub struct ParseResult {
    pub program: Program,
    pub diagnostics: Vec<Diagnostic>,
    /// First unused [`ExprId`]; feed back in for the next REPL line.
    pub next_expr_id: u32,
}

/// Lox parser.
pub struct Parser<'a> {
    pub(crate) source: &'a SourceFile,
    pub(crate) tokens: &'a [Token],
    pub(crate) i: usize,
    pub(crate) diagnostics: Vec<Diagnostic>,
    pub(crate) panicking: bool,
    next_expr_id: u32,
}

impl<'a> Parser<'a> {
    /// Create a new parser. `expr_id_start` keeps ids unique across REPL
    /// lines; pass 0 for a standalone program.
    pub fn new(source: &'a SourceFile, tokens: &'a [Token], expr_id_start: u32) -> Self {
        Self {
            source,
            tokens,
            i: 0,
            diagnostics: Vec::new(),
            panicking: false,
            next_expr_id: expr_id_start,
        }
    }

    /// Parse the full input and return a program plus diagnostics.
    pub fn parse(mut self) -> ParseResult {
        let mut stmts = Vec::new();
        while !self.at(TokenKind::Eof) {
            match self.declaration() {
                Some(stmt) => stmts.push(stmt),
                None => self.synchronize(),
            }
        }
        ParseResult {
            program: Program { stmts },
            diagnostics: self.diagnostics,
            next_expr_id: self.next_expr_id,
        }
    }

    // Declarations

    fn declaration(&mut self) -> Option<Stmt> {
        if self.eat(TokenKind::KwClass) {
            self.class_declaration()
        } else if self.eat(TokenKind::KwFun) {
            self.function("function").map(Stmt::Function)
        } else if self.eat(TokenKind::KwVar) {
            self.var_declaration()
        } else {
            self.statement()
        }
    }

    fn class_declaration(&mut self) -> Option<Stmt> {
        let name_token = self.consume(TokenKind::Ident, "Expect class name.")?;
        let superclass = if self.eat(TokenKind::Lt) {
            let super_token = self.consume(TokenKind::Ident, "Expect superclass name.")?;
            Some(VarExpr {
                name: self.lexeme(super_token).into(),
                id: self.fresh_id(),
                span: super_token.span,
                line: self.line_of(super_token),
            })
        } else {
            None
        };
        self.consume(TokenKind::LBrace, "Expect '{' before class body.")?;
        let mut methods = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            methods.push(self.function("method")?);
        }
        self.consume(TokenKind::RBrace, "Expect '}' after class body.")?;
        Some(Stmt::Class(ClassDecl {
            name: self.lexeme(name_token).into(),
            name_span: name_token.span,
            superclass,
            methods,
            line: self.line_of(name_token),
        }))
    }

    fn function(&mut self, kind: &str) -> Option<Rc<FunctionDecl>> {
        let name_token = self.consume(TokenKind::Ident, &format!("Expect {} name.", kind))?;
        self.consume(TokenKind::LParen, &format!("Expect '(' after {} name.", kind))?;
        let mut params = Vec::new();
        if !self.at(TokenKind::RParen) {
            loop {
                if params.len() >= 255 {
                    let span = self.current_span();
                    self.report(span, "Can't have more than 255 parameters.");
                }
                let param = self.consume(TokenKind::Ident, "Expect parameter name.")?;
                params.push(Param {
                    name: self.lexeme(param).into(),
                    span: param.span,
                });
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RParen, "Expect ')' after parameters.")?;
        self.consume(TokenKind::LBrace, &format!("Expect '{{' before {} body.", kind))?;
        let body = self.block_stmts()?;
        Some(Rc::new(FunctionDecl {
            name: self.lexeme(name_token).into(),
            name_span: name_token.span,
            params,
            body,
            line: self.line_of(name_token),
        }))
    }

    fn var_declaration(&mut self) -> Option<Stmt> {
        let name_token = self.consume(TokenKind::Ident, "Expect variable name.")?;
        let init = if self.eat(TokenKind::Eq) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::Semicolon, "Expect ';' after variable declaration.")?;
        Some(Stmt::Var {
            name: self.lexeme(name_token).into(),
            name_span: name_token.span,
            init,
            line: self.line_of(name_token),
        })
    }

    // Statements

    fn statement(&mut self) -> Option<Stmt> {
        if self.eat(TokenKind::KwPrint) {
            self.print_statement()
        } else if self.eat(TokenKind::KwReturn) {
            self.return_statement()
        } else if self.eat(TokenKind::KwIf) {
            self.if_statement()
        } else if self.eat(TokenKind::KwWhile) {
            self.while_statement()
        } else if self.eat(TokenKind::KwFor) {
            self.for_statement()
        } else if self.eat(TokenKind::LBrace) {
            Some(Stmt::Block(self.block_stmts()?))
        } else {
            self.expression_statement()
        }
    }

    fn print_statement(&mut self) -> Option<Stmt> {
        let value = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expect ';' after value.")?;
        Some(Stmt::Print(value))
    }

    fn return_statement(&mut self) -> Option<Stmt> {
        let keyword = self.previous();
        let value = if self.at(TokenKind::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenKind::Semicolon, "Expect ';' after return value.")?;
        Some(Stmt::Return {
            value,
            keyword_span: keyword.span,
            line: self.line_of(keyword),
        })
    }

    fn if_statement(&mut self) -> Option<Stmt> {
        self.consume(TokenKind::LParen, "Expect '(' after 'if'.")?;
        let cond = self.expression()?;
        self.consume(TokenKind::RParen, "Expect ')' after condition.")?;
        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.eat(TokenKind::KwElse) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Some(Stmt::If {
            cond,
            then_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> Option<Stmt> {
        self.consume(TokenKind::LParen, "Expect '(' after 'while'.")?;
        let cond = self.expression()?;
        self.consume(TokenKind::RParen, "Expect ')' after condition.")?;
        let body = Box::new(self.statement()?);
        Some(Stmt::While { cond, body })
    }

    /// `for` desugars to a block holding the initializer and a `while` whose
    /// body runs the original body then the step.
    fn for_statement(&mut self) -> Option<Stmt> {
        self.consume(TokenKind::LParen, "Expect '(' after 'for'.")?;
        let line = self.previous_line();

        let init = if self.eat(TokenKind::Semicolon) {
            None
        } else if self.eat(TokenKind::KwVar) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let cond = if self.at(TokenKind::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenKind::Semicolon, "Expect ';' after loop condition.")?;

        let step = if self.at(TokenKind::RParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenKind::RParen, "Expect ')' after for clauses.")?;

        let mut body = self.statement()?;
        if let Some(step) = step {
            body = Stmt::Block(vec![body, Stmt::Expr(step)]);
        }
        let cond = cond.unwrap_or(Expr::Literal {
            value: lox_ir::ast::Literal::Bool(true),
            line,
        });
        body = Stmt::While {
            cond,
            body: Box::new(body),
        };
        if let Some(init) = init {
            body = Stmt::Block(vec![init, body]);
        }
        Some(body)
    }

    fn expression_statement(&mut self) -> Option<Stmt> {
        let expr = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expect ';' after expression.")?;
        Some(Stmt::Expr(expr))
    }

    fn block_stmts(&mut self) -> Option<Vec<Stmt>> {
        let mut stmts = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            match self.declaration() {
                Some(stmt) => stmts.push(stmt),
                None => self.synchronize(),
            }
        }
        self.consume(TokenKind::RBrace, "Expect '}' after block.")?;
        Some(stmts)
    }

    // Token plumbing

    pub(crate) fn at(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    pub(crate) fn current(&self) -> Token {
        self.tokens[self.i.min(self.tokens.len() - 1)]
    }

    pub(crate) fn previous(&self) -> Token {
        self.tokens[self.i.saturating_sub(1).min(self.tokens.len() - 1)]
    }

    pub(crate) fn advance(&mut self) -> Token {
        let token = self.current();
        if self.i < self.tokens.len() - 1 {
            self.i += 1;
        }
        token
    }

    pub(crate) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn consume(&mut self, kind: TokenKind, message: &str) -> Option<Token> {
        if self.at(kind) {
            Some(self.advance())
        } else {
            let span = self.current_span();
            self.error_at(span, message);
            None
        }
    }

    pub(crate) fn lexeme(&self, token: Token) -> &'a str {
        self.source.text.slice(token.span)
    }

    pub(crate) fn line_of(&self, token: Token) -> u32 {
        self.source.text.line(token.span.start.0)
    }

    pub(crate) fn previous_line(&self) -> u32 {
        self.line_of(self.previous())
    }

    pub(crate) fn current_span(&self) -> Span {
        self.current().span
    }

    pub(crate) fn fresh_id(&mut self) -> ExprId {
        let id = ExprId(self.next_expr_id);
        self.next_expr_id += 1;
        id
    }

    /// Record an error without entering panic mode. Used for problems that
    /// do not invalidate the surrounding parse (bad assignment target,
    /// argument-count overflow).
    pub(crate) fn report(&mut self, span: Span, message: &str) {
        if self.panicking {
            return;
        }
        self.diagnostics.push(Diagnostic::error(message, Some(span)));
    }

    /// Record an error at the given span unless already panicking.
    pub(crate) fn error_at(&mut self, span: Span, message: &str) {
        if self.panicking {
            return;
        }
        self.panicking = true;
        if self.at(TokenKind::Eof) && span == self.current().span {
            self.diagnostics.push(Diagnostic::error_at_end(message, span));
        } else {
            self.diagnostics.push(Diagnostic::error(message, Some(span)));
        }
    }

    /// Skip forward to the next statement boundary after an error.
    fn synchronize(&mut self) {
        self.panicking = false;
        self.advance();
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
                _ => {
                    self.advance();
                }
            }
        }
    }
}
