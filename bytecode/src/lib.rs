mod code;
mod decoder;
mod instruction;
mod op;

pub use code::Code;
pub use decoder::BytecodeDecoder;
pub use instruction::Instruction;
pub use op::Op;
