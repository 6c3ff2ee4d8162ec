//! Front-end pipeline: lexing, parsing and resolution for the tree-walking
//! evaluator, and single-pass compilation to bytecode for the VM.

mod compiler;
mod frontend;
mod resolver;

pub use compiler::compile;
pub use frontend::{CompiledScript, Driver, ParsedProgram};
pub use resolver::{resolve, ResolveResult};
