//! The instruction dispatch loop.

use lox_ir::{disassemble_instruction, Constant, Opcode};

use crate::core::heap::{HeapObject, UpvalueState};
use crate::core::value::Value;
use crate::error::RuntimeError;
use crate::Vm;

/// Type-checked numeric binary operator.
macro_rules! binary_op {
    ($vm:ident, $op:tt, $wrap:path) => {{
        let b = $vm.peek(0);
        let a = $vm.peek(1);
        if !a.is_number() || !b.is_number() {
            return Err($vm.error("Operands to binary operator must be numbers."));
        }
        $vm.pop();
        $vm.pop();
        $vm.push($wrap(a.as_number() $op b.as_number()));
    }};
}

impl Vm {
    pub(crate) fn run(&mut self) -> Result<(), RuntimeError> {
        loop {
            // Safe point: every live temporary is on the value stack here.
            if self.heap.should_gc() {
                self.collect();
            }
            if self.config.trace_execution {
                self.trace_instruction();
            }
            let op = self.read_op()?;
            match op {
                Opcode::Constant => {
                    let constant = self.read_constant();
                    let value = match constant {
                        Constant::Number(n) => Value::number(n),
                        Constant::Str(s) => {
                            let id = self.strings.intern(&mut self.heap, &s);
                            Value::str(id)
                        }
                        Constant::Function(_) => {
                            return Err(self.error("Unexpected function constant."))
                        }
                    };
                    self.push(value);
                }
                Opcode::Nil => self.push(Value::NIL),
                Opcode::True => self.push(Value::TRUE),
                Opcode::False => self.push(Value::FALSE),
                Opcode::Pop => {
                    self.pop();
                }
                Opcode::GetLocal => {
                    let slot = self.read_byte() as usize;
                    let base = self.frame().base;
                    let value = self.stack[base + slot];
                    self.push(value);
                }
                Opcode::SetLocal => {
                    let slot = self.read_byte() as usize;
                    let base = self.frame().base;
                    self.stack[base + slot] = self.peek(0);
                }
                Opcode::GetGlobal => {
                    let name = self.read_name();
                    match self.globals.get(&name) {
                        Some(&value) => self.push(value),
                        None => {
                            return Err(self.undefined_variable(name));
                        }
                    }
                }
                Opcode::DefineGlobal => {
                    let name = self.read_name();
                    let value = self.pop();
                    self.globals.insert(name, value);
                }
                Opcode::SetGlobal => {
                    let name = self.read_name();
                    if !self.globals.contains_key(&name) {
                        return Err(self.undefined_variable(name));
                    }
                    let value = self.peek(0);
                    self.globals.insert(name, value);
                }
                Opcode::GetUpvalue => {
                    let idx = self.read_byte() as usize;
                    let upvalue = self.heap.closure(self.frame().closure).upvalues[idx];
                    let value = match self.heap.upvalue(upvalue).state {
                        UpvalueState::Open(slot) => self.stack[slot],
                        UpvalueState::Closed(value) => value,
                    };
                    self.push(value);
                }
                Opcode::SetUpvalue => {
                    let idx = self.read_byte() as usize;
                    let upvalue = self.heap.closure(self.frame().closure).upvalues[idx];
                    let value = self.peek(0);
                    match &mut self.heap.upvalue_mut(upvalue).state {
                        UpvalueState::Open(slot) => self.stack[*slot] = value,
                        UpvalueState::Closed(closed) => *closed = value,
                    }
                }
                Opcode::GetProperty => {
                    let name = self.read_name();
                    let receiver = self.peek(0);
                    if !receiver.is_instance() {
                        return Err(self.error("Only instances have properties."));
                    }
                    let instance = receiver.as_obj_id();
                    if let Some(&field) = self.heap.instance(instance).fields.get(&name) {
                        self.pop();
                        self.push(field);
                    } else {
                        let class = self.heap.instance(instance).class;
                        self.bind_method(class, name)?;
                    }
                }
                Opcode::SetProperty => {
                    let name = self.read_name();
                    let receiver = self.peek(1);
                    if !receiver.is_instance() {
                        return Err(self.error("Only instances have fields."));
                    }
                    let value = self.pop();
                    let instance = self.pop().as_obj_id();
                    self.heap
                        .instance_mut(instance)
                        .fields
                        .insert(name, value);
                    self.push(value);
                }
                Opcode::GetSuper => {
                    let name = self.read_name();
                    let superclass = self.pop().as_obj_id();
                    self.bind_method(superclass, name)?;
                }
                Opcode::Equal => {
                    let b = self.pop();
                    let a = self.pop();
                    self.push(Value::bool(a.lox_eq(b)));
                }
                Opcode::Greater => binary_op!(self, >, Value::bool),
                Opcode::Less => binary_op!(self, <, Value::bool),
                Opcode::Add => {
                    let b = self.peek(0);
                    let a = self.peek(1);
                    if a.is_number() && b.is_number() {
                        self.pop();
                        self.pop();
                        self.push(Value::number(a.as_number() + b.as_number()));
                    } else if a.is_str() && b.is_str() {
                        self.pop();
                        self.pop();
                        let id = self.strings.concat(
                            &mut self.heap,
                            a.as_obj_id(),
                            b.as_obj_id(),
                        );
                        self.push(Value::str(id));
                    } else {
                        return Err(self.error("Operands for operator '+' not supported."));
                    }
                }
                Opcode::Subtract => binary_op!(self, -, Value::number),
                Opcode::Multiply => binary_op!(self, *, Value::number),
                Opcode::Divide => binary_op!(self, /, Value::number),
                Opcode::Not => {
                    let value = self.pop();
                    self.push(Value::bool(value.is_falsey()));
                }
                Opcode::Negate => {
                    if !self.peek(0).is_number() {
                        return Err(self.error("Operand to '-' must be a number."));
                    }
                    let value = self.pop();
                    self.push(Value::number(-value.as_number()));
                }
                Opcode::Print => {
                    let value = self.pop();
                    let text = self.heap.format_value(value);
                    self.output.push_str(&text);
                    self.output.push('\n');
                }
                Opcode::Jump => {
                    let offset = self.read_u16() as usize;
                    self.frame_mut().ip += offset;
                }
                Opcode::JumpIfFalse => {
                    let offset = self.read_u16() as usize;
                    if self.peek(0).is_falsey() {
                        self.frame_mut().ip += offset;
                    }
                }
                Opcode::Loop => {
                    let offset = self.read_u16() as usize;
                    self.frame_mut().ip -= offset;
                }
                Opcode::Call => {
                    let argc = self.read_byte() as usize;
                    let callee = self.peek(argc);
                    self.call_value(callee, argc)?;
                }
                Opcode::Invoke => {
                    let name = self.read_name();
                    let argc = self.read_byte() as usize;
                    self.invoke(name, argc)?;
                }
                Opcode::SuperInvoke => {
                    let name = self.read_name();
                    let argc = self.read_byte() as usize;
                    let superclass = self.pop().as_obj_id();
                    self.invoke_from_class(superclass, name, argc)?;
                }
                Opcode::Closure => {
                    self.make_closure()?;
                }
                Opcode::CloseUpvalue => {
                    self.close_upvalues(self.stack.len() - 1);
                    self.pop();
                }
                Opcode::Return => {
                    let result = self.pop();
                    let frame = self.frames.pop().expect("call frame underflow");
                    self.close_upvalues(frame.base);
                    if self.frames.is_empty() {
                        // The script closure itself.
                        self.stack.truncate(0);
                        return Ok(());
                    }
                    self.stack.truncate(frame.base);
                    self.push(result);
                }
                Opcode::Class => {
                    let name = self.read_constant_str()?;
                    let class = self.heap.alloc(HeapObject::Class(
                        crate::core::heap::ObjClass {
                            name,
                            methods: crate::core::value::fast_map_new(),
                            superclass: None,
                        },
                    ));
                    self.push(Value::class(class));
                }
                Opcode::Inherit => {
                    let superclass = self.peek(1);
                    if !superclass.is_class() {
                        return Err(self.error("Superclass must be a class."));
                    }
                    let subclass = self.peek(0).as_obj_id();
                    let methods = self.heap.class(superclass.as_obj_id()).methods.clone();
                    let sub = self.heap.class_mut(subclass);
                    sub.methods = methods;
                    sub.superclass = Some(superclass);
                    self.pop();
                }
                Opcode::Method => {
                    let name = self.read_name();
                    let method = self.peek(0);
                    let class = self.peek(1).as_obj_id();
                    self.heap.class_mut(class).methods.insert(name, method);
                    self.pop();
                }
            }
        }
    }

    // Operand readers

    #[inline(always)]
    pub(crate) fn frame(&self) -> &crate::vm::CallFrame {
        self.frames.last().expect("no active call frame")
    }

    #[inline(always)]
    pub(crate) fn frame_mut(&mut self) -> &mut crate::vm::CallFrame {
        self.frames.last_mut().expect("no active call frame")
    }

    #[inline(always)]
    pub(crate) fn read_byte(&mut self) -> u8 {
        let frame = self.frame_mut();
        let byte = frame.proto.chunk.code[frame.ip];
        frame.ip += 1;
        byte
    }

    fn read_op(&mut self) -> Result<Opcode, RuntimeError> {
        let byte = self.read_byte();
        Opcode::try_from(byte).map_err(|b| self.error(format!("Unknown opcode {}.", b)))
    }

    #[inline(always)]
    fn read_u16(&mut self) -> u16 {
        let frame = self.frame_mut();
        let value = frame.proto.chunk.read_u16(frame.ip);
        frame.ip += 2;
        value
    }

    /// Read a constant-pool operand and clone the constant out.
    pub(crate) fn read_constant(&mut self) -> Constant {
        let idx = self.read_byte() as usize;
        self.frame().proto.chunk.constants[idx].clone()
    }

    /// Read a string constant operand and intern it.
    pub(crate) fn read_name(&mut self) -> crate::core::heap::ObjectId {
        let idx = self.read_byte() as usize;
        let frame = self.frames.last().expect("no active call frame");
        match &frame.proto.chunk.constants[idx] {
            Constant::Str(s) => {
                let s = s.clone();
                self.strings.intern(&mut self.heap, &s)
            }
            _ => panic!("expected string constant"),
        }
    }

    fn read_constant_str(&mut self) -> Result<std::rc::Rc<str>, RuntimeError> {
        match self.read_constant() {
            Constant::Str(s) => Ok(s),
            _ => Err(self.error("Expected string constant.")),
        }
    }

    pub(crate) fn undefined_variable(&self, name: crate::core::heap::ObjectId) -> RuntimeError {
        let text = self.heap.str_text(name).clone();
        self.error(format!("Undefined variable '{}'.", text))
    }

    fn trace_instruction(&self) {
        let mut line = String::from("          ");
        for value in &self.stack {
            line.push_str(&format!("[ {} ]", self.heap.format_value(*value)));
        }
        eprintln!("{}", line);
        let frame = self.frame();
        let (text, _) = disassemble_instruction(&frame.proto.chunk, frame.ip);
        eprintln!("{}", text);
    }
}
