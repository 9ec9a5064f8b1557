//! Virtual-table slot resolution.
//!
//! Slots resolve lazily: the first access reads the table, optionally
//! verifies the function's first bytes against a signature to catch layout
//! drift, and memoizes the address for the resolver's lifetime. The vtable
//! pointer itself is assumed stable for that lifetime, and the slot index
//! is a documented caller contract, not a checked bound.

use std::cell::OnceCell;
use std::marker::PhantomData;

use crate::binding::FuncPtr;
use crate::error::{Error, Result};
use crate::memory::ReadMemory;
use crate::signature::Signature;

const SLOT_SIZE: u64 = size_of::<u64>() as u64;

/// Raw slot indexer over a vtable base pointer.
#[derive(Debug, Clone, Copy)]
pub struct VirtualTable {
    base: u64,
}

impl VirtualTable {
    pub fn new(base: u64) -> Self {
        Self { base }
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    /// Function pointer stored in slot `index`.
    pub fn slot<M: ReadMemory>(&self, memory: &M, index: usize) -> Result<u64> {
        memory.read_u64(self.base + index as u64 * SLOT_SIZE)
    }
}

/// One virtual method, typed by its call signature.
pub struct VirtualFunction<F> {
    vtable: VirtualTable,
    index: usize,
    verify: Option<Signature>,
    resolved: OnceCell<u64>,
    _marker: PhantomData<F>,
}

impl<F: Copy + 'static> VirtualFunction<F> {
    pub fn new(vtable: u64, index: usize) -> Self {
        Self {
            vtable: VirtualTable::new(vtable),
            index,
            verify: None,
            resolved: OnceCell::new(),
            _marker: PhantomData,
        }
    }

    /// Require the resolved address to match `signature` at its first
    /// byte. A mismatch is a resolution failure, not a silent wrong bind.
    pub fn with_signature(vtable: u64, index: usize, signature: Signature) -> Self {
        Self {
            vtable: VirtualTable::new(vtable),
            index,
            verify: Some(signature),
            resolved: OnceCell::new(),
            _marker: PhantomData,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// The memoized address, if the slot resolved before.
    pub fn address(&self) -> Option<u64> {
        self.resolved.get().copied()
    }

    pub fn resolve<M: ReadMemory>(&self, memory: &M) -> Result<FuncPtr<F>> {
        if let Some(&address) = self.resolved.get() {
            return Ok(FuncPtr::new(address));
        }

        let address = self.vtable.slot(memory, self.index)?;
        if let Some(signature) = &self.verify {
            let window = memory.read_bytes(address, signature.len())?;
            if !signature.matches(&window) {
                return Err(Error::PatternNotFound(signature.text().to_string()));
            }
        }

        let _ = self.resolved.set(address);
        Ok(FuncPtr::new(address))
    }
}
