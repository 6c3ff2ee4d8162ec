//! Static resolution pass for the tree-walking evaluator.
//!
//! Walks the AST with a stack of scopes, records the hop distance of every
//! local variable access, and rejects the semantic errors that must be caught
//! before execution: self-reads in initializers, duplicate declarations,
//! top-level returns, value returns from `init`, and `this`/`super` misuse.

use std::rc::Rc;

use ahash::RandomState;
use hashbrown::HashMap;

use lox_ir::ast::{ClassDecl, Expr, ExprId, FunctionDecl, Program, Resolutions, Stmt, VarExpr};
use lox_syntax::{Diagnostic, Span};

type Scope = HashMap<Rc<str>, bool, RandomState>;

#[derive(Clone, Copy, PartialEq)]
enum FunctionKind {
    None,
    Function,
    Initializer,
    Method,
}

#[derive(Clone, Copy, PartialEq)]
enum ClassKind {
    None,
    Class,
    Subclass,
}

pub struct ResolveResult {
    pub resolutions: Resolutions,
    pub diagnostics: Vec<Diagnostic>,
}

/// Resolve a program. The result's resolutions merge into the interpreter's
/// session table.
pub fn resolve(program: &Program) -> ResolveResult {
    let mut resolver = Resolver {
        scopes: Vec::new(),
        resolutions: HashMap::with_hasher(RandomState::with_seeds(0, 0, 0, 0)),
        diagnostics: Vec::new(),
        current_function: FunctionKind::None,
        current_class: ClassKind::None,
    };
    for stmt in &program.stmts {
        resolver.resolve_stmt(stmt);
    }
    ResolveResult {
        resolutions: resolver.resolutions,
        diagnostics: resolver.diagnostics,
    }
}

struct Resolver {
    scopes: Vec<Scope>,
    resolutions: Resolutions,
    diagnostics: Vec<Diagnostic>,
    current_function: FunctionKind,
    current_class: ClassKind,
}

impl Resolver {
    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expr(expr) | Stmt::Print(expr) => self.resolve_expr(expr),
            Stmt::Var {
                name,
                name_span,
                init,
                ..
            } => {
                self.declare(name, *name_span);
                if let Some(init) = init {
                    self.resolve_expr(init);
                }
                self.define(name);
            }
            Stmt::Block(stmts) => {
                self.begin_scope();
                for stmt in stmts {
                    self.resolve_stmt(stmt);
                }
                self.end_scope();
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(cond);
                self.resolve_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch);
                }
            }
            Stmt::While { cond, body } => {
                self.resolve_expr(cond);
                self.resolve_stmt(body);
            }
            Stmt::Function(decl) => {
                self.declare(&decl.name, decl.name_span);
                self.define(&decl.name);
                self.resolve_function(decl, FunctionKind::Function);
            }
            Stmt::Return {
                value,
                keyword_span,
                ..
            } => {
                if self.current_function == FunctionKind::None {
                    self.error(*keyword_span, "Can't return from top-level code.");
                }
                if let Some(value) = value {
                    if self.current_function == FunctionKind::Initializer {
                        self.error(
                            *keyword_span,
                            "Can't return a value from a class initializer.",
                        );
                    }
                    self.resolve_expr(value);
                }
            }
            Stmt::Class(decl) => self.resolve_class(decl),
        }
    }

    fn resolve_class(&mut self, decl: &ClassDecl) {
        let enclosing_class = self.current_class;
        self.current_class = ClassKind::Class;

        self.declare(&decl.name, decl.name_span);
        self.define(&decl.name);

        if let Some(superclass) = &decl.superclass {
            if superclass.name == decl.name {
                self.error(superclass.span, "A class cannot inherit from itself.");
            }
            self.current_class = ClassKind::Subclass;
            self.resolve_var(superclass);
            self.begin_scope();
            self.scope_define("super");
        }

        self.begin_scope();
        self.scope_define("this");
        for method in &decl.methods {
            let kind = if &*method.name == "init" {
                FunctionKind::Initializer
            } else {
                FunctionKind::Method
            };
            self.resolve_function(method, kind);
        }
        self.end_scope();

        if decl.superclass.is_some() {
            self.end_scope();
        }
        self.current_class = enclosing_class;
    }

    fn resolve_function(&mut self, decl: &Rc<FunctionDecl>, kind: FunctionKind) {
        let enclosing = self.current_function;
        self.current_function = kind;
        self.begin_scope();
        for param in &decl.params {
            self.declare(&param.name, param.span);
            self.define(&param.name);
        }
        for stmt in &decl.body {
            self.resolve_stmt(stmt);
        }
        self.end_scope();
        self.current_function = enclosing;
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal { .. } => {}
            Expr::Grouping(inner) => self.resolve_expr(inner),
            Expr::Unary { rhs, .. } => self.resolve_expr(rhs),
            Expr::Binary { lhs, rhs, .. } | Expr::Logical { lhs, rhs, .. } => {
                self.resolve_expr(lhs);
                self.resolve_expr(rhs);
            }
            Expr::Variable(var) => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&*var.name) == Some(&false) {
                        self.error(
                            var.span,
                            "Can't read local variable in its own initializer.",
                        );
                    }
                }
                self.resolve_var(var);
            }
            Expr::Assign { target, value } => {
                self.resolve_expr(value);
                self.resolve_var(target);
            }
            Expr::Call { callee, args, .. } => {
                self.resolve_expr(callee);
                for arg in args {
                    self.resolve_expr(arg);
                }
            }
            Expr::Get { object, .. } => self.resolve_expr(object),
            Expr::Set { object, value, .. } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }
            Expr::This { id, span, .. } => {
                if self.current_class == ClassKind::None {
                    self.error(*span, "Can't use 'this' outside of a class.");
                    return;
                }
                self.resolve_local(*id, "this");
            }
            Expr::Super { id, span, .. } => {
                match self.current_class {
                    ClassKind::None => {
                        self.error(*span, "Can't use 'super' outside of a class.");
                        return;
                    }
                    ClassKind::Class => {
                        self.error(*span, "Can't use 'super' in a class with no superclass.");
                        return;
                    }
                    ClassKind::Subclass => {}
                }
                self.resolve_local(*id, "super");
            }
        }
    }

    fn resolve_var(&mut self, var: &VarExpr) {
        self.resolve_local(var.id, &var.name);
    }

    /// Record the hop distance of the innermost scope containing `name`;
    /// unresolved names are globals, looked up by name at runtime.
    fn resolve_local(&mut self, id: ExprId, name: &str) {
        for (distance, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(name) {
                self.resolutions.insert(id, distance);
                return;
            }
        }
    }

    fn begin_scope(&mut self) {
        self.scopes
            .push(HashMap::with_hasher(RandomState::with_seeds(0, 0, 0, 0)));
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Rc<str>, span: Span) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };
        if scope.contains_key(name) {
            self.error(span, "Already a variable with this name in this scope.");
            return;
        }
        scope.insert(name.clone(), false);
    }

    fn define(&mut self, name: &Rc<str>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.clone(), true);
        }
    }

    /// Define a synthetic binding (`this`, `super`) in the current scope.
    fn scope_define(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.into(), true);
        }
    }

    fn error(&mut self, span: Span, message: &str) {
        self.diagnostics.push(Diagnostic::error(message, Some(span)));
    }
}
