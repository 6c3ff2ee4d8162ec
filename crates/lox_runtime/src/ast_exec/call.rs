//! Call dispatch for the tree-walker.

use lox_ir::ast::Expr;

use crate::ast_exec::{Flow, FrameInfo, Interpreter};
use crate::core::env::{get_at, Environment};
use crate::core::heap::{HeapObject, ObjInstance, ObjectId};
use crate::core::value::{fast_map_new, Value};
use crate::error::RuntimeError;

const FRAMES_MAX: usize = 64;

impl Interpreter {
    pub(crate) fn call_expr(
        &mut self,
        callee: &Expr,
        args: &[Expr],
        line: u32,
    ) -> Result<Value, RuntimeError> {
        let temps_before = self.temp_roots.len();
        let result = (|| {
            let callee_value = self.evaluate(callee)?;
            // Root callee and evaluated arguments while later arguments run.
            self.temp_roots.push(callee_value);
            let mut arg_values = Vec::with_capacity(args.len());
            for arg in args {
                let value = self.evaluate(arg)?;
                self.temp_roots.push(value);
                arg_values.push(value);
            }
            self.call_value(callee_value, &arg_values, line)
        })();
        self.temp_roots.truncate(temps_before);
        result
    }

    pub(crate) fn call_value(
        &mut self,
        callee: Value,
        args: &[Value],
        line: u32,
    ) -> Result<Value, RuntimeError> {
        if callee.is_obj() {
            let id = callee.as_obj_id();
            match self.heap.get(id) {
                HeapObject::AstFunction(_) => return self.call_function(id, args, line),
                HeapObject::Native(native) => {
                    if args.len() != native.arity as usize {
                        return Err(self.runtime_error(
                            line,
                            format!(
                                "Expected {} arguments but got {}.",
                                native.arity,
                                args.len()
                            ),
                        ));
                    }
                    let func = native.func;
                    return func(args).map_err(|message| self.runtime_error(line, message));
                }
                HeapObject::Class(_) => return self.instantiate(id, args, line),
                _ => {}
            }
        }
        Err(self.runtime_error(line, "Can only call functions and classes."))
    }

    pub(crate) fn call_function(
        &mut self,
        function: ObjectId,
        args: &[Value],
        call_line: u32,
    ) -> Result<Value, RuntimeError> {
        if self.frames.len() >= FRAMES_MAX {
            return Err(self.runtime_error(call_line, "Stack overflow."));
        }
        let (decl, closure, is_initializer) = {
            let f = self.heap.ast_function(function);
            (f.decl.clone(), f.closure.clone(), f.is_initializer)
        };
        if args.len() != decl.params.len() {
            return Err(self.runtime_error(
                call_line,
                format!(
                    "Expected {} arguments but got {}.",
                    decl.params.len(),
                    args.len()
                ),
            ));
        }

        let env = Environment::with_enclosing(closure.clone());
        {
            let mut env = env.borrow_mut();
            for (param, value) in decl.params.iter().zip(args) {
                env.define(param.name.clone(), *value);
            }
        }

        // The caller's environment stays rooted for the duration of the call.
        self.call_envs.push(self.env.clone());
        self.frames.push(FrameInfo {
            name: decl.name.clone(),
            call_line,
        });
        let prev = std::mem::replace(&mut self.env, env);
        let flow = self.block_body(&decl.body);
        self.env = prev;
        self.frames.pop();
        self.call_envs.pop();

        let flow = flow?;
        if is_initializer {
            // Initializers always yield the receiver, even on a bare return.
            return get_at(&closure, 0, "this").ok_or_else(|| {
                self.runtime_error(call_line, "Undefined variable 'this'.")
            });
        }
        Ok(match flow {
            Flow::Return(value) => value,
            Flow::Normal => Value::NIL,
        })
    }

    fn instantiate(
        &mut self,
        class: ObjectId,
        args: &[Value],
        line: u32,
    ) -> Result<Value, RuntimeError> {
        let instance = self.heap.alloc(HeapObject::Instance(ObjInstance {
            class,
            fields: fast_map_new(),
        }));
        let receiver = Value::instance(instance);
        let init_name = self.strings.intern(&mut self.heap, "init");
        let init = self.heap.class(class).methods.get(&init_name).copied();
        match init {
            Some(init) => {
                // Root the instance across the initializer call.
                self.temp_roots.push(receiver);
                let bound = self.bind_method(init, receiver);
                let result = self.call_value(bound, args, line);
                self.temp_roots.pop().expect("temp root underflow");
                result?;
            }
            None => {
                if !args.is_empty() {
                    return Err(self.runtime_error(
                        line,
                        format!("Expected 0 arguments but got {}.", args.len()),
                    ));
                }
            }
        }
        Ok(receiver)
    }
}
