//! Tree-walking evaluator.
//!
//! Executes the AST directly against the shared object model. Variable
//! accesses use the resolver's hop distances; only globals fall back to name
//! lookup. Early returns travel as a [`Flow`] value, not an unwind.

mod call;
mod expr;
mod stmt;

use std::rc::Rc;

use lox_ir::ast::Program;
pub use lox_ir::ast::Resolutions;

use crate::builtins;
use crate::core::env::{EnvRef, Environment};
use crate::core::heap::{Heap, HeapObject, ObjNative};
use crate::core::strings::Strings;
use crate::core::value::Value;
use crate::error::RuntimeError;

#[derive(Clone, Copy, Debug, Default)]
pub struct InterpreterConfig {
    /// Collect at every safe point.
    pub stress_gc: bool,
}

/// Result of executing a statement.
pub(crate) enum Flow {
    Normal,
    Return(Value),
}

pub(crate) struct FrameInfo {
    pub(crate) name: Rc<str>,
    /// Line of the call expression in the caller, for backtraces.
    pub(crate) call_line: u32,
}

pub struct Interpreter {
    pub(crate) heap: Heap,
    pub(crate) strings: Strings,
    pub(crate) globals: EnvRef,
    pub(crate) env: EnvRef,
    pub(crate) locals: Resolutions,
    /// Environments of enclosing active calls; GC roots while a call is on
    /// the Rust stack.
    pub(crate) call_envs: Vec<EnvRef>,
    pub(crate) frames: Vec<FrameInfo>,
    /// Values held in Rust locals across re-entrant evaluation; GC roots.
    pub(crate) temp_roots: Vec<Value>,
    pub(crate) output: String,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_config(InterpreterConfig::default())
    }

    pub fn with_config(config: InterpreterConfig) -> Self {
        let mut heap = Heap::new();
        heap.set_stress(config.stress_gc);
        let globals = Environment::global();
        for (name, arity, func) in builtins::natives() {
            let native_id = heap.alloc(HeapObject::Native(ObjNative {
                name,
                arity: *arity,
                func: *func,
            }));
            globals
                .borrow_mut()
                .define((*name).into(), Value::native(native_id));
        }
        Self {
            heap,
            strings: Strings::new(),
            env: globals.clone(),
            globals,
            locals: crate::core::value::fast_map_new(),
            call_envs: Vec::new(),
            frames: Vec::new(),
            temp_roots: Vec::new(),
            output: String::new(),
        }
    }

    /// Execute a program. Resolutions merge into the session, so REPL lines
    /// can keep referring to earlier closures.
    pub fn interpret(
        &mut self,
        program: &Program,
        resolutions: Resolutions,
    ) -> Result<(), RuntimeError> {
        self.locals.extend(resolutions);
        let result = (|| {
            for stmt in &program.stmts {
                self.maybe_gc();
                self.execute(stmt)?;
            }
            Ok(())
        })();
        if result.is_err() {
            self.env = self.globals.clone();
            self.call_envs.clear();
            self.frames.clear();
            self.temp_roots.clear();
        }
        result
    }

    /// Drain accumulated `print` output.
    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }

    /// Number of live heap objects, for GC tests.
    pub fn live_objects(&self) -> usize {
        self.heap.live_objects()
    }

    pub(crate) fn runtime_error(&self, line: u32, message: impl Into<String>) -> RuntimeError {
        let mut err = RuntimeError::new(message);
        let mut line = line;
        for frame in self.frames.iter().rev() {
            err.trace.push((line, format!("{}()", frame.name)));
            line = frame.call_line;
        }
        err.trace.push((line, "script".to_string()));
        err
    }

    /// Collect garbage if allocation pressure (or stress mode) asks for it.
    /// Called only at safe points: between statements and loop iterations,
    /// where every live value is rooted.
    pub(crate) fn maybe_gc(&mut self) {
        if !self.heap.should_gc() {
            return;
        }
        self.heap.mark_env(&self.globals);
        self.heap.mark_env(&self.env);
        for env in &self.call_envs {
            self.heap.mark_env(env);
        }
        for value in &self.temp_roots {
            self.heap.mark_value(*value);
        }
        self.heap.trace();
        self.strings.remove_dead(&self.heap);
        self.heap.sweep();
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}
