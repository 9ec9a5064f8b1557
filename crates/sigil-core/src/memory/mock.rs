//! Test fixtures: an in-memory module with a plausible section layout, plus
//! a read-counting wrapper for cache behavior tests.

use std::cell::Cell;

use crate::error::Result;
use crate::memory::{ImageBuffer, MemoryRegion, ModuleSections, ReadMemory, WriteMemory};

const PAGE: usize = 0x1000;

fn page_round(len: usize) -> usize {
    len.max(1).div_ceil(PAGE) * PAGE
}

/// Builds an [`ImageBuffer`] laid out like a loaded module: a header page at
/// the base, then `.text`, `.rdata`, and `.data` on page boundaries.
pub struct MockModuleBuilder {
    base: u64,
    text: Vec<u8>,
    rdata: Vec<u8>,
    data: Vec<u8>,
}

impl MockModuleBuilder {
    pub fn new() -> Self {
        Self {
            base: 0x1400_0000,
            text: Vec::new(),
            rdata: Vec::new(),
            data: Vec::new(),
        }
    }

    pub fn base(mut self, base: u64) -> Self {
        self.base = base;
        self
    }

    pub fn text(mut self, bytes: &[u8]) -> Self {
        self.text = bytes.to_vec();
        self
    }

    pub fn rdata(mut self, bytes: &[u8]) -> Self {
        self.rdata = bytes.to_vec();
        self
    }

    pub fn data(mut self, bytes: &[u8]) -> Self {
        self.data = bytes.to_vec();
        self
    }

    pub fn build(self) -> (ImageBuffer, ModuleSections) {
        let text_size = page_round(self.text.len());
        let rdata_size = page_round(self.rdata.len());
        let data_size = page_round(self.data.len());

        let text_off = PAGE;
        let rdata_off = text_off + text_size;
        let data_off = rdata_off + rdata_size;
        let image_size = data_off + data_size;

        let mut bytes = vec![0u8; image_size];
        bytes[text_off..text_off + self.text.len()].copy_from_slice(&self.text);
        bytes[rdata_off..rdata_off + self.rdata.len()].copy_from_slice(&self.rdata);
        bytes[data_off..data_off + self.data.len()].copy_from_slice(&self.data);

        let sections = ModuleSections::new(
            self.base,
            MemoryRegion::new(self.base + text_off as u64, text_size),
            MemoryRegion::new(self.base + data_off as u64, data_size),
            MemoryRegion::new(self.base + rdata_off as u64, rdata_size),
            MemoryRegion::new(self.base, image_size),
        );
        (ImageBuffer::new(self.base, bytes), sections)
    }
}

impl Default for MockModuleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Counts `read_bytes` calls so tests can prove a lookup did (or did not)
/// rescan the underlying memory.
pub struct CountingReader<M> {
    inner: M,
    reads: Cell<usize>,
}

impl<M> CountingReader<M> {
    pub fn new(inner: M) -> Self {
        Self {
            inner,
            reads: Cell::new(0),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.get()
    }
}

impl<M: ReadMemory> ReadMemory for CountingReader<M> {
    fn base_address(&self) -> u64 {
        self.inner.base_address()
    }

    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        self.reads.set(self.reads.get() + 1);
        self.inner.read_bytes(address, size)
    }
}

impl<M: WriteMemory> WriteMemory for CountingReader<M> {
    fn write_bytes(&mut self, address: u64, bytes: &[u8]) -> Result<()> {
        self.inner.write_bytes(address, bytes)
    }
}
