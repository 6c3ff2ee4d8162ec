//! Debug rendering of chunks and instructions.

use std::fmt::Write;

use crate::{Chunk, Constant, Opcode};

/// Render a whole chunk, recursing into function constants.
pub fn disassemble(chunk: &Chunk, name: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {} ==", name);
    let mut offset = 0;
    while offset < chunk.code.len() {
        let (text, next) = disassemble_instruction(chunk, offset);
        let _ = writeln!(out, "{}", text);
        offset = next;
    }
    for constant in &chunk.constants {
        if let Constant::Function(proto) = constant {
            out.push_str(&disassemble(&proto.chunk, &proto.describe()));
        }
    }
    out
}

/// Render one instruction; returns the text and the offset of the next
/// instruction.
pub fn disassemble_instruction(chunk: &Chunk, offset: usize) -> (String, usize) {
    let mut text = format!("{:04} ", offset);
    if offset > 0 && chunk.line_at(offset) == chunk.line_at(offset - 1) {
        text.push_str("   | ");
    } else {
        let _ = write!(text, "{:4} ", chunk.line_at(offset));
    }

    let Ok(op) = Opcode::try_from(chunk.code[offset]) else {
        let _ = write!(text, "Unknown opcode {}", chunk.code[offset]);
        return (text, offset + 1);
    };

    match op {
        Opcode::Constant
        | Opcode::GetGlobal
        | Opcode::DefineGlobal
        | Opcode::SetGlobal
        | Opcode::GetProperty
        | Opcode::SetProperty
        | Opcode::GetSuper
        | Opcode::Class
        | Opcode::Method => {
            let idx = chunk.code[offset + 1];
            let _ = write!(
                text,
                "{:<16} {:4} '{}'",
                op.name(),
                idx,
                render_constant(chunk, idx)
            );
            (text, offset + 2)
        }
        Opcode::GetLocal | Opcode::SetLocal | Opcode::GetUpvalue | Opcode::SetUpvalue
        | Opcode::Call => {
            let operand = chunk.code[offset + 1];
            let _ = write!(text, "{:<16} {:4}", op.name(), operand);
            (text, offset + 2)
        }
        Opcode::Jump | Opcode::JumpIfFalse => {
            let jump = chunk.read_u16(offset + 1) as usize;
            let _ = write!(
                text,
                "{:<16} {:4} -> {}",
                op.name(),
                offset,
                offset + 3 + jump
            );
            (text, offset + 3)
        }
        Opcode::Loop => {
            let jump = chunk.read_u16(offset + 1) as usize;
            let _ = write!(
                text,
                "{:<16} {:4} -> {}",
                op.name(),
                offset,
                offset + 3 - jump
            );
            (text, offset + 3)
        }
        Opcode::Invoke | Opcode::SuperInvoke => {
            let idx = chunk.code[offset + 1];
            let argc = chunk.code[offset + 2];
            let _ = write!(
                text,
                "{:<16} ({} args) {:4} '{}'",
                op.name(),
                argc,
                idx,
                render_constant(chunk, idx)
            );
            (text, offset + 3)
        }
        Opcode::Closure => {
            let idx = chunk.code[offset + 1];
            let _ = write!(
                text,
                "{:<16} {:4} {}",
                op.name(),
                idx,
                render_constant(chunk, idx)
            );
            let upvalue_count = match chunk.constants.get(idx as usize) {
                Some(Constant::Function(proto)) => proto.upvalue_count as usize,
                _ => 0,
            };
            let mut next = offset + 2;
            for _ in 0..upvalue_count {
                let is_local = chunk.code[next];
                let index = chunk.code[next + 1];
                let _ = write!(
                    text,
                    "\n{:04}    |                     {} {}",
                    next,
                    if is_local == 1 { "local" } else { "upvalue" },
                    index
                );
                next += 2;
            }
            (text, next)
        }
        _ => {
            text.push_str(op.name());
            (text, offset + 1)
        }
    }
}

fn render_constant(chunk: &Chunk, idx: u8) -> String {
    match chunk.constants.get(idx as usize) {
        Some(Constant::Number(n)) => format!("{}", n),
        Some(Constant::Str(s)) => s.to_string(),
        Some(Constant::Function(proto)) => format!("<fn {}>", proto.describe()),
        None => "<bad constant>".to_string(),
    }
}
