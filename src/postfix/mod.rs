pub mod compose;
pub mod compose_error;
pub mod disasm;
pub mod ir;
pub mod op;

pub use compose::{compose, compose_expression};
pub use ir::Program;
pub use op::Op;
