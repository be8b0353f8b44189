pub mod frame;
pub mod heap;
pub mod runtime_error;
pub mod vm;

pub use runtime_error::{RuntimeError, RuntimeErrorKind};
pub use vm::{Vm, VmConfig};
