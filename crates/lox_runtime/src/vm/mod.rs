//! Bytecode virtual machine.
//!
//! The `Vm` owns the whole runtime: value stack, call frames, globals,
//! interned strings, the open-upvalue list and GC accounting. It stays alive
//! across `interpret` calls so REPL lines share globals; dropping it releases
//! everything.

mod call;
mod dispatch;

use std::rc::Rc;

use lox_ir::FunctionProto;

use crate::builtins;
use crate::core::heap::{Heap, HeapObject, ObjClosure, ObjNative, ObjectId};
use crate::core::strings::Strings;
use crate::core::value::{fast_map_new, FastHashMap, Value};
use crate::error::RuntimeError;

pub(crate) const FRAMES_MAX: usize = 64;

#[derive(Clone, Copy, Debug, Default)]
pub struct VmConfig {
    /// Collect at every safe point.
    pub stress_gc: bool,
    /// Disassemble each instruction to stderr as it executes.
    pub trace_execution: bool,
}

pub(crate) struct CallFrame {
    pub(crate) closure: ObjectId,
    /// Cached from the closure so the dispatch loop never re-borrows the heap.
    pub(crate) proto: Rc<FunctionProto>,
    pub(crate) ip: usize,
    pub(crate) base: usize,
}

pub struct Vm {
    pub(crate) heap: Heap,
    pub(crate) strings: Strings,
    pub(crate) globals: FastHashMap<ObjectId, Value>,
    pub(crate) frames: Vec<CallFrame>,
    pub(crate) stack: Vec<Value>,
    pub(crate) open_upvalues: Option<ObjectId>,
    pub(crate) init_string: ObjectId,
    pub(crate) output: String,
    pub(crate) config: VmConfig,
}

impl Vm {
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        let mut heap = Heap::new();
        heap.set_stress(config.stress_gc);
        let mut strings = Strings::new();
        let mut globals = fast_map_new();
        for (name, arity, func) in builtins::natives() {
            let name_id = strings.intern(&mut heap, name);
            let native_id = heap.alloc(HeapObject::Native(ObjNative {
                name,
                arity: *arity,
                func: *func,
            }));
            globals.insert(name_id, Value::native(native_id));
        }
        let init_string = strings.intern(&mut heap, "init");
        Self {
            heap,
            strings,
            globals,
            frames: Vec::with_capacity(FRAMES_MAX),
            stack: Vec::with_capacity(256),
            open_upvalues: None,
            init_string,
            output: String::new(),
            config,
        }
    }

    /// Execute a compiled script. Globals persist between calls.
    pub fn interpret(&mut self, script: Rc<FunctionProto>) -> Result<(), RuntimeError> {
        self.stack.clear();
        self.frames.clear();
        self.open_upvalues = None;

        let closure = self.heap.alloc(HeapObject::Closure(ObjClosure {
            proto: script,
            upvalues: Default::default(),
        }));
        self.stack.push(Value::closure(closure));
        self.call_closure(closure, 0)
            .and_then(|()| self.run())
            .map_err(|err| {
                let err = self.with_trace(err);
                self.stack.clear();
                self.frames.clear();
                self.open_upvalues = None;
                err
            })
    }

    /// Drain accumulated `print` output.
    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }

    /// Number of live heap objects, for GC tests.
    pub fn live_objects(&self) -> usize {
        self.heap.live_objects()
    }

    // Stack helpers

    #[inline(always)]
    pub(crate) fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    #[inline(always)]
    pub(crate) fn pop(&mut self) -> Value {
        self.stack.pop().expect("value stack underflow")
    }

    #[inline(always)]
    pub(crate) fn peek(&self, distance: usize) -> Value {
        self.stack[self.stack.len() - 1 - distance]
    }

    pub(crate) fn error(&self, message: impl Into<String>) -> RuntimeError {
        RuntimeError::new(message)
    }

    /// Attach the current call-frame backtrace to an error.
    fn with_trace(&self, mut err: RuntimeError) -> RuntimeError {
        if !err.trace.is_empty() {
            return err;
        }
        for frame in self.frames.iter().rev() {
            // ip already advanced past the failing instruction.
            let offset = frame.ip.saturating_sub(1);
            let line = frame.proto.chunk.line_at(offset);
            err.trace.push((line, frame.proto.describe()));
        }
        err
    }

    /// Mark every root, trace, drop dead intern entries, sweep.
    pub(crate) fn collect(&mut self) {
        for i in 0..self.stack.len() {
            self.heap.mark_value(self.stack[i]);
        }
        for i in 0..self.frames.len() {
            let closure = self.frames[i].closure;
            self.heap.mark_object(closure);
        }
        let mut upvalue = self.open_upvalues;
        while let Some(id) = upvalue {
            self.heap.mark_object(id);
            upvalue = self.heap.upvalue(id).next;
        }
        for (name, value) in &self.globals {
            let (name, value) = (*name, *value);
            // Globals are a FastHashMap; marking does not touch the map.
            self.heap.mark_object(name);
            self.heap.mark_value(value);
        }
        self.heap.mark_object(self.init_string);
        self.heap.trace();
        self.strings.remove_dead(&self.heap);
        self.heap.sweep();
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}
