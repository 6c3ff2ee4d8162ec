//! Expression evaluation.

use lox_ir::ast::{BinaryOp, Expr, Literal, LogicalOp, UnaryOp, VarExpr};

use crate::ast_exec::Interpreter;
use crate::core::env::{assign_at, get_at};
use crate::core::heap::HeapObject;
use crate::core::value::Value;
use crate::error::RuntimeError;

impl Interpreter {
    pub(crate) fn evaluate(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal { value, .. } => Ok(match value {
                Literal::Nil => Value::NIL,
                Literal::Bool(b) => Value::bool(*b),
                Literal::Number(n) => Value::number(*n),
                Literal::Str(s) => {
                    let id = self.strings.intern(&mut self.heap, s);
                    Value::str(id)
                }
            }),
            Expr::Grouping(inner) => self.evaluate(inner),
            Expr::Unary { op, rhs, line } => {
                let value = self.evaluate(rhs)?;
                match op {
                    UnaryOp::Not => Ok(Value::bool(value.is_falsey())),
                    UnaryOp::Negate => {
                        if !value.is_number() {
                            return Err(
                                self.runtime_error(*line, "Operand to '-' must be a number.")
                            );
                        }
                        Ok(Value::number(-value.as_number()))
                    }
                }
            }
            Expr::Binary { lhs, op, rhs, line } => {
                let a = self.evaluate(lhs)?;
                // Root the left operand: the right side may call user code.
                self.temp_roots.push(a);
                let b = self.evaluate(rhs);
                let a = self.temp_roots.pop().expect("temp root underflow");
                let b = b?;
                self.binary(a, *op, b, *line)
            }
            Expr::Logical { lhs, op, rhs } => {
                let a = self.evaluate(lhs)?;
                match op {
                    LogicalOp::Or if !a.is_falsey() => Ok(a),
                    LogicalOp::And if a.is_falsey() => Ok(a),
                    _ => self.evaluate(rhs),
                }
            }
            Expr::Variable(var) => self.lookup_variable(var),
            Expr::Assign { target, value } => {
                let value = self.evaluate(value)?;
                self.assign_variable(target, value)?;
                Ok(value)
            }
            Expr::Call { callee, args, line } => self.call_expr(callee, args, *line),
            Expr::Get { object, name, line } => {
                let receiver = self.evaluate(object)?;
                if !receiver.is_instance() {
                    return Err(self.runtime_error(*line, "Only instances have properties."));
                }
                let instance = receiver.as_obj_id();
                let name_id = self.strings.intern(&mut self.heap, name);
                if let Some(&field) = self.heap.instance(instance).fields.get(&name_id) {
                    return Ok(field);
                }
                let class = self.heap.instance(instance).class;
                match self.heap.class(class).methods.get(&name_id) {
                    Some(&method) => Ok(self.bind_method(method, receiver)),
                    None => Err(self.runtime_error(
                        *line,
                        format!("Undefined property '{}'.", name),
                    )),
                }
            }
            Expr::Set {
                object,
                name,
                value,
                line,
            } => {
                let receiver = self.evaluate(object)?;
                if !receiver.is_instance() {
                    return Err(self.runtime_error(*line, "Only instances have fields."));
                }
                // Root the receiver: the value expression may call user code.
                self.temp_roots.push(receiver);
                let value = self.evaluate(value);
                self.temp_roots.pop().expect("temp root underflow");
                let value = value?;
                let name_id = self.strings.intern(&mut self.heap, name);
                self.heap
                    .instance_mut(receiver.as_obj_id())
                    .fields
                    .insert(name_id, value);
                Ok(value)
            }
            Expr::This { id, line, .. } => match self.locals.get(id) {
                Some(&distance) => get_at(&self.env, distance, "this").ok_or_else(|| {
                    self.runtime_error(*line, "Undefined variable 'this'.")
                }),
                None => Err(self.runtime_error(*line, "Undefined variable 'this'.")),
            },
            Expr::Super { method, id, line, .. } => {
                let distance = match self.locals.get(id) {
                    Some(&distance) => distance,
                    None => {
                        return Err(self.runtime_error(*line, "Undefined variable 'super'."))
                    }
                };
                let superclass = get_at(&self.env, distance, "super").ok_or_else(|| {
                    self.runtime_error(*line, "Undefined variable 'super'.")
                })?;
                // `this` lives one scope inside the `super` scope.
                let receiver = get_at(&self.env, distance - 1, "this").ok_or_else(|| {
                    self.runtime_error(*line, "Undefined variable 'this'.")
                })?;
                let name_id = self.strings.intern(&mut self.heap, method);
                match self.heap.class(superclass.as_obj_id()).methods.get(&name_id) {
                    Some(&found) => Ok(self.bind_method(found, receiver)),
                    None => Err(self.runtime_error(
                        *line,
                        format!("Undefined property '{}'.", method),
                    )),
                }
            }
        }
    }

    fn binary(
        &mut self,
        a: Value,
        op: BinaryOp,
        b: Value,
        line: u32,
    ) -> Result<Value, RuntimeError> {
        match op {
            BinaryOp::Equal => return Ok(Value::bool(a.lox_eq(b))),
            BinaryOp::NotEqual => return Ok(Value::bool(!a.lox_eq(b))),
            BinaryOp::Add => {
                if a.is_number() && b.is_number() {
                    return Ok(Value::number(a.as_number() + b.as_number()));
                }
                if a.is_str() && b.is_str() {
                    let id = self
                        .strings
                        .concat(&mut self.heap, a.as_obj_id(), b.as_obj_id());
                    return Ok(Value::str(id));
                }
                return Err(
                    self.runtime_error(line, "Operands for operator '+' not supported.")
                );
            }
            _ => {}
        }
        if !a.is_number() || !b.is_number() {
            return Err(
                self.runtime_error(line, "Operands to binary operator must be numbers.")
            );
        }
        let (a, b) = (a.as_number(), b.as_number());
        Ok(match op {
            BinaryOp::Sub => Value::number(a - b),
            BinaryOp::Mul => Value::number(a * b),
            BinaryOp::Div => Value::number(a / b),
            BinaryOp::Greater => Value::bool(a > b),
            BinaryOp::GreaterEqual => Value::bool(a >= b),
            BinaryOp::Less => Value::bool(a < b),
            BinaryOp::LessEqual => Value::bool(a <= b),
            BinaryOp::Equal | BinaryOp::NotEqual | BinaryOp::Add => unreachable!(),
        })
    }

    pub(crate) fn lookup_variable(&mut self, var: &VarExpr) -> Result<Value, RuntimeError> {
        match self.locals.get(&var.id) {
            Some(&distance) => get_at(&self.env, distance, &var.name).ok_or_else(|| {
                self.runtime_error(var.line, format!("Undefined variable '{}'.", var.name))
            }),
            None => self
                .globals
                .borrow()
                .values
                .get(&*var.name)
                .copied()
                .ok_or_else(|| {
                    self.runtime_error(var.line, format!("Undefined variable '{}'.", var.name))
                }),
        }
    }

    fn assign_variable(&mut self, var: &VarExpr, value: Value) -> Result<(), RuntimeError> {
        let assigned = match self.locals.get(&var.id) {
            Some(&distance) => assign_at(&self.env, distance, &var.name, value),
            None => {
                let mut globals = self.globals.borrow_mut();
                match globals.values.get_mut(&*var.name) {
                    Some(slot) => {
                        *slot = value;
                        true
                    }
                    None => false,
                }
            }
        };
        if assigned {
            Ok(())
        } else {
            Err(self.runtime_error(var.line, format!("Undefined variable '{}'.", var.name)))
        }
    }

    /// A method accessed through an instance: a fresh function whose closure
    /// binds `this` to the receiver at access time.
    pub(crate) fn bind_method(&mut self, method: Value, receiver: Value) -> Value {
        let (decl, closure, is_initializer) = match self.heap.get(method.as_obj_id()) {
            HeapObject::AstFunction(f) => (f.decl.clone(), f.closure.clone(), f.is_initializer),
            _ => unreachable!("method table holds non-function"),
        };
        let env = crate::core::env::Environment::with_enclosing(closure);
        env.borrow_mut().define("this".into(), receiver);
        let bound = self.heap.alloc(HeapObject::AstFunction(
            crate::core::heap::ObjAstFunction {
                decl,
                closure: env,
                is_initializer,
            },
        ));
        Value::ast_function(bound)
    }
}
