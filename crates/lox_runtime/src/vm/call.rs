//! Call dispatch, method binding and the upvalue machinery.

use lox_ir::Constant;

use crate::core::heap::{
    HeapObject, ObjBoundMethod, ObjClosure, ObjInstance, ObjUpvalue, ObjectId, UpvalueState,
};
use crate::core::value::{fast_map_new, Value};
use crate::error::RuntimeError;
use crate::vm::{CallFrame, FRAMES_MAX};
use crate::Vm;

impl Vm {
    /// Invoke the callable `argc` slots below the stack top.
    pub(crate) fn call_value(&mut self, callee: Value, argc: usize) -> Result<(), RuntimeError> {
        if callee.is_obj() {
            let id = callee.as_obj_id();
            match self.heap.get(id) {
                HeapObject::Closure(_) => return self.call_closure(id, argc),
                HeapObject::Native(native) => {
                    if argc != native.arity as usize {
                        return Err(self.error(format!(
                            "Expected {} arguments but got {}.",
                            native.arity, argc
                        )));
                    }
                    let func = native.func;
                    let args_start = self.stack.len() - argc;
                    let result = func(&self.stack[args_start..]).map_err(RuntimeError::new)?;
                    self.stack.truncate(args_start - 1);
                    self.push(result);
                    return Ok(());
                }
                HeapObject::Class(_) => {
                    let instance = self.heap.alloc(HeapObject::Instance(ObjInstance {
                        class: id,
                        fields: fast_map_new(),
                    }));
                    let slot = self.stack.len() - argc - 1;
                    self.stack[slot] = Value::instance(instance);
                    if let Some(&init) = self.heap.class(id).methods.get(&self.init_string) {
                        return self.call_closure(init.as_obj_id(), argc);
                    }
                    if argc != 0 {
                        return Err(
                            self.error(format!("Expected 0 arguments but got {}.", argc))
                        );
                    }
                    return Ok(());
                }
                HeapObject::BoundMethod(bound) => {
                    let receiver = bound.receiver;
                    let method = bound.method.as_obj_id();
                    let slot = self.stack.len() - argc - 1;
                    self.stack[slot] = receiver;
                    return self.call_closure(method, argc);
                }
                _ => {}
            }
        }
        Err(self.error("Can only call functions and classes."))
    }

    /// Push a frame for a closure call. Slot 0 of the frame holds the callee
    /// (or the receiver for methods).
    pub(crate) fn call_closure(&mut self, closure: ObjectId, argc: usize) -> Result<(), RuntimeError> {
        let proto = self.heap.closure(closure).proto.clone();
        if argc != proto.arity as usize {
            return Err(self.error(format!(
                "Expected {} arguments but got {}.",
                proto.arity, argc
            )));
        }
        if self.frames.len() >= FRAMES_MAX {
            return Err(self.error("Stack overflow."));
        }
        self.frames.push(CallFrame {
            closure,
            base: self.stack.len() - argc - 1,
            proto,
            ip: 0,
        });
        Ok(())
    }

    /// Fused property-get-then-call on the receiver `argc` slots down.
    pub(crate) fn invoke(&mut self, name: ObjectId, argc: usize) -> Result<(), RuntimeError> {
        let receiver = self.peek(argc);
        if !receiver.is_instance() {
            return Err(self.error("Only instances have methods."));
        }
        let instance = receiver.as_obj_id();
        // A field shadowing a method is an ordinary call.
        if let Some(&field) = self.heap.instance(instance).fields.get(&name) {
            let slot = self.stack.len() - argc - 1;
            self.stack[slot] = field;
            return self.call_value(field, argc);
        }
        let class = self.heap.instance(instance).class;
        self.invoke_from_class(class, name, argc)
    }

    pub(crate) fn invoke_from_class(
        &mut self,
        class: ObjectId,
        name: ObjectId,
        argc: usize,
    ) -> Result<(), RuntimeError> {
        match self.heap.class(class).methods.get(&name) {
            Some(&method) => self.call_closure(method.as_obj_id(), argc),
            None => Err(self.undefined_property(name)),
        }
    }

    /// Replace the receiver at stack top with a BoundMethod for `name`.
    pub(crate) fn bind_method(&mut self, class: ObjectId, name: ObjectId) -> Result<(), RuntimeError> {
        let Some(&method) = self.heap.class(class).methods.get(&name) else {
            return Err(self.undefined_property(name));
        };
        let receiver = self.peek(0);
        let bound = self.heap.alloc(HeapObject::BoundMethod(ObjBoundMethod {
            receiver,
            method,
        }));
        self.pop();
        self.push(Value::bound_method(bound));
        Ok(())
    }

    fn undefined_property(&self, name: ObjectId) -> RuntimeError {
        let text = self.heap.str_text(name).clone();
        self.error(format!("Undefined property '{}'.", text))
    }

    /// Execute a CLOSURE instruction: wrap the function constant and capture
    /// its upvalues from the surrounding frame.
    pub(crate) fn make_closure(&mut self) -> Result<(), RuntimeError> {
        let proto = match self.read_constant() {
            Constant::Function(proto) => proto,
            _ => return Err(self.error("Expected function constant.")),
        };
        let upvalue_count = proto.upvalue_count as usize;
        let closure = self.heap.alloc(HeapObject::Closure(ObjClosure {
            proto,
            upvalues: Default::default(),
        }));
        self.push(Value::closure(closure));
        for _ in 0..upvalue_count {
            let is_local = self.read_byte() == 1;
            let index = self.read_byte() as usize;
            let upvalue = if is_local {
                let base = self.frame().base;
                self.capture_upvalue(base + index)
            } else {
                let enclosing = self.frame().closure;
                self.heap.closure(enclosing).upvalues[index]
            };
            match self.heap.get_mut(closure) {
                HeapObject::Closure(c) => c.upvalues.push(upvalue),
                _ => unreachable!(),
            }
        }
        Ok(())
    }

    /// Find or create the open upvalue for an absolute stack slot. The open
    /// list is kept sorted by descending slot so closing can stop early.
    pub(crate) fn capture_upvalue(&mut self, slot: usize) -> ObjectId {
        let mut prev: Option<ObjectId> = None;
        let mut current = self.open_upvalues;
        while let Some(id) = current {
            let upvalue = self.heap.upvalue(id);
            match upvalue.state {
                UpvalueState::Open(existing) if existing > slot => {
                    prev = Some(id);
                    current = upvalue.next;
                }
                UpvalueState::Open(existing) if existing == slot => return id,
                _ => break,
            }
        }

        let created = self.heap.alloc(HeapObject::Upvalue(ObjUpvalue {
            state: UpvalueState::Open(slot),
            next: current,
        }));
        match prev {
            Some(prev) => self.heap.upvalue_mut(prev).next = Some(created),
            None => self.open_upvalues = Some(created),
        }
        created
    }

    /// Close every open upvalue at or above `from_slot`, moving the stack
    /// value into the upvalue itself.
    pub(crate) fn close_upvalues(&mut self, from_slot: usize) {
        while let Some(id) = self.open_upvalues {
            let slot = match self.heap.upvalue(id).state {
                UpvalueState::Open(slot) => slot,
                UpvalueState::Closed(_) => unreachable!("closed upvalue on open list"),
            };
            if slot < from_slot {
                break;
            }
            let value = self.stack[slot];
            let upvalue = self.heap.upvalue_mut(id);
            self.open_upvalues = upvalue.next;
            upvalue.next = None;
            upvalue.state = UpvalueState::Closed(value);
        }
    }
}
