pub mod compile;
pub mod compile_error;
pub mod disasm;
pub mod ir;
pub mod op;
pub mod verify;

pub use compile::{CodeGenerator, compile_program};
pub use compile_error::CompileError;
pub use ir::FrameTemplate;
pub use op::{Instr, Op, UNPATCHED};
pub use verify::{VerifyError, verify_template};
