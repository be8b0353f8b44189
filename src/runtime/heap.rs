use std::collections::HashMap;

use crate::{
    lang::value::{Oid, Value},
    runtime::runtime_error::RuntimeErrorKind,
};

pub type StructObject = HashMap<String, Value>;

/// Struct and array storage for one VM.
///
/// Both heaps draw ids from a single counter, so an oid names at most one
/// object across them. Objects are never freed and ids never reused.
#[derive(Debug)]
pub struct Heap {
    structs: HashMap<Oid, StructObject>,
    arrays: HashMap<Oid, Vec<Value>>,
    next_oid: u32,
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl Heap {
    pub fn new() -> Self {
        Heap {
            structs: HashMap::new(),
            arrays: HashMap::new(),
            next_oid: 1,
        }
    }

    fn fresh_oid(&mut self) -> Oid {
        let oid = Oid(self.next_oid);
        self.next_oid += 1;
        oid
    }

    /// Allocate a struct with no fields set.
    pub fn alloc_struct(&mut self) -> Oid {
        let oid = self.fresh_oid();
        self.structs.insert(oid, StructObject::new());
        oid
    }

    /// Allocate an array of `len` nulls, failing instead of aborting when
    /// the memory is not available.
    pub fn alloc_array(&mut self, len: usize) -> Result<Oid, RuntimeErrorKind> {
        let mut cells = Vec::new();
        cells
            .try_reserve_exact(len)
            .map_err(|_| RuntimeErrorKind::OutOfMemory(len))?;
        cells.resize(len, Value::Null);

        let oid = self.fresh_oid();
        self.arrays.insert(oid, cells);
        Ok(oid)
    }

    pub fn get_struct(&self, oid: Oid) -> Result<&StructObject, RuntimeErrorKind> {
        self.structs.get(&oid).ok_or(RuntimeErrorKind::InvalidObject {
            heap: "struct",
            oid,
        })
    }

    pub fn struct_mut(&mut self, oid: Oid) -> Result<&mut StructObject, RuntimeErrorKind> {
        self.structs.get_mut(&oid).ok_or(RuntimeErrorKind::InvalidObject {
            heap: "struct",
            oid,
        })
    }

    pub fn array(&self, oid: Oid) -> Result<&[Value], RuntimeErrorKind> {
        self.arrays
            .get(&oid)
            .map(Vec::as_slice)
            .ok_or(RuntimeErrorKind::InvalidObject {
                heap: "array",
                oid,
            })
    }

    pub fn array_mut(&mut self, oid: Oid) -> Result<&mut [Value], RuntimeErrorKind> {
        self.arrays
            .get_mut(&oid)
            .map(Vec::as_mut_slice)
            .ok_or(RuntimeErrorKind::InvalidObject {
                heap: "array",
                oid,
            })
    }

    pub fn struct_count(&self) -> usize {
        self.structs.len()
    }

    pub fn array_count(&self) -> usize {
        self.arrays.len()
    }
}
