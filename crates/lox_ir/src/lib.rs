//! Intermediate representations: the AST consumed by the tree-walking
//! evaluator and the bytecode chunks consumed by the virtual machine.

pub mod ast;
mod chunk;
mod dump;

pub use chunk::{Chunk, Constant, FunctionProto, Opcode};
pub use dump::{disassemble, disassemble_instruction};
