//! In-memory SPIR-V instruction graph.
//!
//! The graph is what a shader front-end lowers into and what the binary
//! serializer reads back out: typed instructions grouped into basic blocks
//! and functions, plus the module-scope sections (capabilities, extensions,
//! types, globals and decorations). Building the graph and serializing it
//! live elsewhere; this crate only defines its shape and the lookups passes
//! need over it.

pub mod modules;
pub mod spirv;
#[cfg(any(test, feature = "test-utils"))]
pub mod tests_utils;
pub mod types;
pub mod utils;

pub use modules::{
    BasicBlock, Function, Module,
    decoration::{Decoration, DecorationIndex, DecorationStore, DecorationTarget},
    index::{Definition, IdIndex},
    instruction::Instruction,
    operand::{Id, Operand},
};
pub use utils::Error;
