use std::rc::Rc;

use crate::{
    bytecode::ir::FrameTemplate, lang::value::Value, runtime::runtime_error::RuntimeErrorKind,
};

/// One activation of a [`FrameTemplate`].
#[derive(Debug, Clone)]
pub struct CallFrame {
    pub template: Rc<FrameTemplate>,
    pub slots: Vec<Value>,
    /// Index of the next instruction to execute.
    pub pc: usize,
}

impl CallFrame {
    pub fn new(template: Rc<FrameTemplate>) -> Self {
        CallFrame {
            template,
            slots: Vec::new(),
            pc: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.template.name
    }

    pub fn load(&self, slot: usize) -> Result<Value, RuntimeErrorKind> {
        self.slots
            .get(slot)
            .cloned()
            .ok_or(RuntimeErrorKind::UninitializedSlot(slot))
    }

    /// Slots past the end are filled with null up to `slot`.
    pub fn store(&mut self, slot: usize, value: Value) {
        if slot >= self.slots.len() {
            self.slots.resize(slot + 1, Value::Null);
        }
        self.slots[slot] = value;
    }
}
