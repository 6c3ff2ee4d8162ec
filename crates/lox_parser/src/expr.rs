//! Expression parsing, layered by precedence: assignment, or, and, equality,
//! comparison, term, factor, unary, call, primary.

use lox_ir::ast::{BinaryOp, Expr, Literal, LogicalOp, UnaryOp, VarExpr};
use lox_syntax::TokenKind;

use crate::Parser;

impl<'a> Parser<'a> {
    pub(crate) fn expression(&mut self) -> Option<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> Option<Expr> {
        let expr = self.logic_or()?;
        if self.eat(TokenKind::Eq) {
            let eq_span = self.previous().span;
            let value = Box::new(self.assignment()?);
            return Some(match expr {
                Expr::Variable(target) => Expr::Assign { target, value },
                Expr::Get { object, name, line } => Expr::Set {
                    object,
                    name,
                    value,
                    line,
                },
                other => {
                    // Report but keep parsing; the expression itself is fine.
                    self.report(eq_span, "Invalid assignment target.");
                    other
                }
            });
        }
        Some(expr)
    }

    fn logic_or(&mut self) -> Option<Expr> {
        let mut expr = self.logic_and()?;
        while self.eat(TokenKind::KwOr) {
            let rhs = self.logic_and()?;
            expr = Expr::Logical {
                lhs: Box::new(expr),
                op: LogicalOp::Or,
                rhs: Box::new(rhs),
            };
        }
        Some(expr)
    }

    fn logic_and(&mut self) -> Option<Expr> {
        let mut expr = self.equality()?;
        while self.eat(TokenKind::KwAnd) {
            let rhs = self.equality()?;
            expr = Expr::Logical {
                lhs: Box::new(expr),
                op: LogicalOp::And,
                rhs: Box::new(rhs),
            };
        }
        Some(expr)
    }

    fn equality(&mut self) -> Option<Expr> {
        let mut expr = self.comparison()?;
        loop {
            let op = if self.eat(TokenKind::EqEq) {
                BinaryOp::Equal
            } else if self.eat(TokenKind::BangEq) {
                BinaryOp::NotEqual
            } else {
                break;
            };
            let line = self.previous_line();
            let rhs = self.comparison()?;
            expr = Expr::Binary {
                lhs: Box::new(expr),
                op,
                rhs: Box::new(rhs),
                line,
            };
        }
        Some(expr)
    }

    fn comparison(&mut self) -> Option<Expr> {
        let mut expr = self.term()?;
        loop {
            let op = if self.eat(TokenKind::Gt) {
                BinaryOp::Greater
            } else if self.eat(TokenKind::Ge) {
                BinaryOp::GreaterEqual
            } else if self.eat(TokenKind::Lt) {
                BinaryOp::Less
            } else if self.eat(TokenKind::Le) {
                BinaryOp::LessEqual
            } else {
                break;
            };
            let line = self.previous_line();
            let rhs = self.term()?;
            expr = Expr::Binary {
                lhs: Box::new(expr),
                op,
                rhs: Box::new(rhs),
                line,
            };
        }
        Some(expr)
    }

    fn term(&mut self) -> Option<Expr> {
        let mut expr = self.factor()?;
        loop {
            let op = if self.eat(TokenKind::Plus) {
                BinaryOp::Add
            } else if self.eat(TokenKind::Minus) {
                BinaryOp::Sub
            } else {
                break;
            };
            let line = self.previous_line();
            let rhs = self.factor()?;
            expr = Expr::Binary {
                lhs: Box::new(expr),
                op,
                rhs: Box::new(rhs),
                line,
            };
        }
        Some(expr)
    }

    fn factor(&mut self) -> Option<Expr> {
        let mut expr = self.unary()?;
        loop {
            let op = if self.eat(TokenKind::Star) {
                BinaryOp::Mul
            } else if self.eat(TokenKind::Slash) {
                BinaryOp::Div
            } else {
                break;
            };
            let line = self.previous_line();
            let rhs = self.unary()?;
            expr = Expr::Binary {
                lhs: Box::new(expr),
                op,
                rhs: Box::new(rhs),
                line,
            };
        }
        Some(expr)
    }

    fn unary(&mut self) -> Option<Expr> {
        let op = if self.eat(TokenKind::Bang) {
            Some(UnaryOp::Not)
        } else if self.eat(TokenKind::Minus) {
            Some(UnaryOp::Negate)
        } else {
            None
        };
        if let Some(op) = op {
            let line = self.previous_line();
            let rhs = Box::new(self.unary()?);
            return Some(Expr::Unary { op, rhs, line });
        }
        self.call()
    }

    fn call(&mut self) -> Option<Expr> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(TokenKind::LParen) {
                expr = self.finish_call(expr)?;
            } else if self.eat(TokenKind::Dot) {
                let token = self.consume(TokenKind::Ident, "Expect property name after '.'.")?;
                let line = self.line_of(token);
                expr = Expr::Get {
                    object: Box::new(expr),
                    name: self.lexeme(token).into(),
                    line,
                };
            } else {
                break;
            }
        }
        Some(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Option<Expr> {
        let line = self.previous_line();
        let mut args = Vec::new();
        if !self.at(TokenKind::RParen) {
            loop {
                if args.len() >= 255 {
                    let span = self.current_span();
                    self.report(span, "Can't have more than 255 arguments.");
                }
                args.push(self.expression()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RParen, "Expect ')' after arguments.")?;
        Some(Expr::Call {
            callee: Box::new(callee),
            args,
            line,
        })
    }

    fn primary(&mut self) -> Option<Expr> {
        let token = self.current();
        let line = self.line_of(token);
        let expr = match token.kind {
            TokenKind::KwNil => {
                self.advance();
                Expr::Literal {
                    value: Literal::Nil,
                    line,
                }
            }
            TokenKind::KwTrue => {
                self.advance();
                Expr::Literal {
                    value: Literal::Bool(true),
                    line,
                }
            }
            TokenKind::KwFalse => {
                self.advance();
                Expr::Literal {
                    value: Literal::Bool(false),
                    line,
                }
            }
            TokenKind::Number => {
                self.advance();
                let value = self.lexeme(token).parse::<f64>().unwrap_or_default();
                Expr::Literal {
                    value: Literal::Number(value),
                    line,
                }
            }
            TokenKind::Str => {
                self.advance();
                let lexeme = self.lexeme(token);
                let content = &lexeme[1..lexeme.len() - 1];
                Expr::Literal {
                    value: Literal::Str(content.into()),
                    line,
                }
            }
            TokenKind::Ident => {
                self.advance();
                Expr::Variable(VarExpr {
                    name: self.lexeme(token).into(),
                    id: self.fresh_id(),
                    span: token.span,
                    line,
                })
            }
            TokenKind::KwThis => {
                self.advance();
                Expr::This {
                    id: self.fresh_id(),
                    span: token.span,
                    line,
                }
            }
            TokenKind::KwSuper => {
                self.advance();
                self.consume(TokenKind::Dot, "Expect '.' after 'super'.")?;
                let method = self.consume(TokenKind::Ident, "Expect superclass method name.")?;
                Expr::Super {
                    method: self.lexeme(method).into(),
                    id: self.fresh_id(),
                    span: token.span,
                    line,
                }
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.expression()?;
                self.consume(TokenKind::RParen, "Expect ')' after expression.")?;
                Expr::Grouping(Box::new(inner))
            }
            _ => {
                self.error_at(token.span, "Expected expression.");
                return None;
            }
        };
        Some(expr)
    }
}
