//! Instruction model and assembler
//!
//! Method bodies are built as an [`InstructionSequence`], laid out (offsets assigned, sizes
//! resolved), and then encoded by [`assemble`] against the owning class's constant pool.

mod assemble;
mod instruction;
mod opcode;

pub use assemble::*;
pub use instruction::*;
pub use opcode::*;
