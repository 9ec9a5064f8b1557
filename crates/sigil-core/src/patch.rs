//! Reversible byte patches.
//!
//! A patch captures the bytes at its address exactly once, at construction.
//! The replacement buffer is computed at the same time: literal bytes from
//! the byte spec, original bytes wherever it says "keep" (`??`). Enable and
//! disable are idempotent toggles between the two buffers; dispose restores
//! the originals no matter the current state.

use tracing::warn;

use crate::error::{Error, Result};
use crate::memory::{ReadMemory, WriteMemory};
use crate::signature::Signature;

/// Handle to a constructed patch. Only valid for the session that minted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatchId(pub(crate) usize);

/// Where a patch goes: a pre-resolved address, or a signature resolved
/// through the session's cached module scan.
#[derive(Debug, Clone)]
pub enum PatchTarget {
    Address(u64),
    Signature(Signature),
}

#[derive(Debug)]
pub struct PatchRecord {
    address: u64,
    signature: Option<String>,
    original: Vec<u8>,
    replacement: Vec<u8>,
    enabled: bool,
    disposed: bool,
}

impl PatchRecord {
    pub fn address(&self) -> u64 {
        self.address
    }

    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    pub fn original_bytes(&self) -> &[u8] {
        &self.original
    }

    pub fn replacement_bytes(&self) -> &[u8] {
        &self.replacement
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

#[derive(Default)]
pub struct PatchRegistry {
    records: Vec<PatchRecord>,
}

impl PatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture originals and compute the replacement buffer.
    ///
    /// Leading "keep" positions are trimmed and the address advanced past
    /// them, so a spec copied with its context bytes patches only the span
    /// it actually changes.
    pub fn create<M: ReadMemory>(
        &mut self,
        memory: &M,
        address: u64,
        spec: &[Option<u8>],
        signature: Option<String>,
    ) -> Result<PatchId> {
        if address == 0 {
            return Err(Error::PatchConstructionFailed(
                "address is unresolved".to_string(),
            ));
        }

        let skip = spec.iter().take_while(|b| b.is_none()).count();
        let spec = &spec[skip..];
        if spec.is_empty() {
            return Err(Error::PatchConstructionFailed(
                "patch spec contains no literal bytes".to_string(),
            ));
        }
        let address = address + skip as u64;

        let original = memory.read_bytes(address, spec.len())?;
        let replacement: Vec<u8> = spec
            .iter()
            .zip(&original)
            .map(|(byte, old)| byte.unwrap_or(*old))
            .collect();

        let id = PatchId(self.records.len());
        self.records.push(PatchRecord {
            address,
            signature,
            original,
            replacement,
            enabled: false,
            disposed: false,
        });
        Ok(id)
    }

    /// Write the replacement buffer. No-op if already enabled or disposed.
    pub fn enable<M: WriteMemory>(&mut self, memory: &mut M, id: PatchId) -> Result<()> {
        let record = &self.records[id.0];
        if record.enabled || record.disposed {
            return Ok(());
        }
        memory.write_bytes(record.address, &record.replacement)?;
        self.records[id.0].enabled = true;
        Ok(())
    }

    /// Write back the captured originals. No-op if already disabled.
    pub fn disable<M: WriteMemory>(&mut self, memory: &mut M, id: PatchId) -> Result<()> {
        let record = &self.records[id.0];
        if !record.enabled {
            return Ok(());
        }
        memory.write_bytes(record.address, &record.original)?;
        self.records[id.0].enabled = false;
        Ok(())
    }

    /// Restore originals and retire the record.
    pub fn dispose<M: WriteMemory>(&mut self, memory: &mut M, id: PatchId) -> Result<()> {
        if self.records[id.0].disposed {
            return Ok(());
        }
        self.disable(memory, id)?;
        self.records[id.0].disposed = true;
        Ok(())
    }

    /// Restore every patch. Safe to call with records already disposed.
    pub fn dispose_all<M: WriteMemory>(&mut self, memory: &mut M) {
        for index in 0..self.records.len() {
            if let Err(e) = self.dispose(memory, PatchId(index)) {
                warn!(
                    "failed to restore patch at {:#x}: {}",
                    self.records[index].address, e
                );
            }
        }
    }

    pub fn record(&self, id: PatchId) -> &PatchRecord {
        &self.records[id.0]
    }

    pub fn records(&self) -> &[PatchRecord] {
        &self.records
    }
}
