//! Statement execution.

use lox_ir::ast::Stmt;

use crate::ast_exec::{Flow, Interpreter};
use crate::core::env::{EnvRef, Environment};
use crate::core::heap::{HeapObject, ObjAstFunction, ObjClass};
use crate::core::value::{fast_map_new, Value};
use crate::error::RuntimeError;

impl Interpreter {
    pub(crate) fn execute(&mut self, stmt: &Stmt) -> Result<Flow, RuntimeError> {
        match stmt {
            Stmt::Expr(expr) => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }
            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                let text = self.heap.format_value(value);
                self.output.push_str(&text);
                self.output.push('\n');
                Ok(Flow::Normal)
            }
            Stmt::Var { name, init, .. } => {
                let value = match init {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::NIL,
                };
                self.env.borrow_mut().define(name.clone(), value);
                Ok(Flow::Normal)
            }
            Stmt::Block(stmts) => {
                let env = Environment::with_enclosing(self.env.clone());
                self.execute_block(stmts, env)
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                if !self.evaluate(cond)?.is_falsey() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::While { cond, body } => {
                loop {
                    self.maybe_gc();
                    if self.evaluate(cond)?.is_falsey() {
                        break;
                    }
                    if let Flow::Return(value) = self.execute(body)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Function(decl) => {
                let function = self.heap.alloc(HeapObject::AstFunction(ObjAstFunction {
                    decl: decl.clone(),
                    closure: self.env.clone(),
                    is_initializer: false,
                }));
                self.env
                    .borrow_mut()
                    .define(decl.name.clone(), Value::ast_function(function));
                Ok(Flow::Normal)
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::NIL,
                };
                Ok(Flow::Return(value))
            }
            Stmt::Class(decl) => {
                let superclass = match &decl.superclass {
                    Some(var) => {
                        let value = self.lookup_variable(var)?;
                        if !value.is_class() {
                            return Err(
                                self.runtime_error(var.line, "Superclass must be a class.")
                            );
                        }
                        Some(value)
                    }
                    None => None,
                };

                self.env.borrow_mut().define(decl.name.clone(), Value::NIL);

                // Methods close over an extra scope holding `super`.
                let method_env = match superclass {
                    Some(superclass) => {
                        let env = Environment::with_enclosing(self.env.clone());
                        env.borrow_mut().define("super".into(), superclass);
                        env
                    }
                    None => self.env.clone(),
                };

                // Copy-down inheritance; the subclass's own methods override.
                let mut methods = match superclass {
                    Some(superclass) => {
                        self.heap.class(superclass.as_obj_id()).methods.clone()
                    }
                    None => fast_map_new(),
                };
                for method in &decl.methods {
                    let is_initializer = &*method.name == "init";
                    let function = self.heap.alloc(HeapObject::AstFunction(ObjAstFunction {
                        decl: method.clone(),
                        closure: method_env.clone(),
                        is_initializer,
                    }));
                    let name_id = self.strings.intern(&mut self.heap, &method.name);
                    methods.insert(name_id, Value::ast_function(function));
                }

                let class = self.heap.alloc(HeapObject::Class(ObjClass {
                    name: decl.name.clone(),
                    methods,
                    superclass,
                }));
                let defined = self
                    .env
                    .borrow_mut()
                    .values
                    .insert(decl.name.clone(), Value::class(class));
                debug_assert!(defined.is_some());
                Ok(Flow::Normal)
            }
        }
    }

    /// Run statements in a fresh environment, restoring the previous one on
    /// every exit path.
    pub(crate) fn execute_block(
        &mut self,
        stmts: &[Stmt],
        env: EnvRef,
    ) -> Result<Flow, RuntimeError> {
        let prev = std::mem::replace(&mut self.env, env);
        let result = self.block_body(stmts);
        self.env = prev;
        result
    }

    pub(crate) fn block_body(&mut self, stmts: &[Stmt]) -> Result<Flow, RuntimeError> {
        for stmt in stmts {
            self.maybe_gc();
            if let Flow::Return(value) = self.execute(stmt)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }
}
