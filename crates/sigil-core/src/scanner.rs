//! Pattern scanning over bounded memory regions.
//!
//! A scan is a single left-to-right pass: fixed bytes must match exactly,
//! wildcard positions always match, and the first hit wins. Regions are
//! read in chunks with a pattern-length overlap so matches spanning a chunk
//! boundary are not lost.

use tracing::debug;

use crate::error::{Error, Result};
use crate::memory::{MemoryRegion, ModuleSections, ReadMemory};
use crate::signature::Signature;

/// Single-byte filler emitted between functions (`int3`). Function entries
/// are recognized by following one of these.
const FUNCTION_FILL: u8 = 0xCC;

/// Chunk size for region reads during a scan.
const SCAN_CHUNK_SIZE: usize = 256 * 1024;

pub struct PatternScanner<'a, M: ReadMemory> {
    memory: &'a M,
    sections: &'a ModuleSections,
}

impl<'a, M: ReadMemory> PatternScanner<'a, M> {
    pub fn new(memory: &'a M, sections: &'a ModuleSections) -> Self {
        Self { memory, sections }
    }

    /// Find the first match of `signature` inside `region`.
    pub fn scan(&self, region: MemoryRegion, signature: &Signature) -> Result<u64> {
        if signature.is_empty() || region.len < signature.len() {
            return Err(Error::PatternNotFound(signature.text().to_string()));
        }

        let mut tail: Vec<u8> = Vec::new();
        let mut offset = 0usize;
        while offset < region.len {
            let read_size = (region.len - offset).min(SCAN_CHUNK_SIZE);
            let address = region.start + offset as u64;

            let chunk = match self.memory.read_bytes(address, read_size) {
                Ok(bytes) => bytes,
                Err(e) if offset == 0 => return Err(e),
                Err(e) => {
                    debug!(
                        "scan stopped at {:#x} after {:#x} bytes: {}",
                        address, offset, e
                    );
                    break;
                }
            };

            let mut data = Vec::with_capacity(tail.len() + chunk.len());
            data.extend_from_slice(&tail);
            data.extend_from_slice(&chunk);
            let data_base = address - tail.len() as u64;

            if let Some(pos) = find_first(&data, signature) {
                return Ok(data_base + pos as u64);
            }

            let keep = signature.len() - 1;
            if keep == 0 {
                tail.clear();
            } else if data.len() >= keep {
                tail = data[data.len() - keep..].to_vec();
            } else {
                tail = data;
            }
            offset += read_size;
        }

        Err(Error::PatternNotFound(signature.text().to_string()))
    }

    pub fn scan_text(&self, signature: &Signature) -> Result<u64> {
        self.scan(self.sections.text(), signature)
    }

    pub fn scan_data(&self, signature: &Signature) -> Result<u64> {
        self.scan(self.sections.data(), signature)
    }

    pub fn scan_rdata(&self, signature: &Signature) -> Result<u64> {
        self.scan(self.sections.rdata(), signature)
    }

    pub fn scan_module(&self, signature: &Signature) -> Result<u64> {
        self.scan(self.sections.module_region(), signature)
    }

    /// Scan the code section and assert the match is a function entry, the
    /// policy applied before installing an inline hook.
    pub fn scan_hook_target(&self, signature: &Signature) -> Result<u64> {
        let address = self.scan_text(signature)?;
        self.check_hook_target(address)?;
        Ok(address)
    }

    /// A valid hook target is the start of the code section, or an address
    /// inside it that directly follows an `int3` filler byte without being
    /// one itself.
    pub fn is_function_entry(&self, address: u64) -> bool {
        let text = self.sections.text();
        if address == text.start {
            return true;
        }
        if address <= text.start || address >= self.sections.rdata().start {
            return false;
        }
        let here = self.memory.read_u8(address);
        let before = self.memory.read_u8(address - 1);
        matches!((here, before), (Ok(b), Ok(p)) if b != FUNCTION_FILL && p == FUNCTION_FILL)
    }

    pub fn check_hook_target(&self, address: u64) -> Result<()> {
        if self.is_function_entry(address) {
            Ok(())
        } else {
            Err(Error::InvalidHookTarget(address))
        }
    }

    /// Resolve the static address referenced by a RIP-relative instruction.
    ///
    /// Reads the 32-bit displacement `operand_offset` bytes into the match
    /// and adds it to the address of the byte following the displacement
    /// field. Fails if the field does not fit inside the module image.
    pub fn resolve_static(&self, match_address: u64, operand_offset: i64) -> Result<u64> {
        let disp_address = match_address.wrapping_add_signed(operand_offset);
        if !self.sections.module_region().contains_range(disp_address, 4) {
            return Err(Error::StaticResolutionFailed {
                address: match_address,
                message: "displacement field outside module image".to_string(),
            });
        }

        let disp = self.memory.read_i32(disp_address)?;
        Ok((disp_address + 4).wrapping_add_signed(disp as i64))
    }
}

/// First offset in `buffer` where the pattern matches.
fn find_first(buffer: &[u8], signature: &Signature) -> Option<usize> {
    let pattern = signature.bytes();
    if pattern.is_empty() || buffer.len() < pattern.len() {
        return None;
    }
    let last = buffer.len() - pattern.len();

    // Anchor candidate positions on the first fixed byte.
    let Some((anchor_index, anchor)) = pattern
        .iter()
        .enumerate()
        .find_map(|(i, b)| b.map(|value| (i, value)))
    else {
        return Some(0);
    };

    for found in memchr::memchr_iter(anchor, &buffer[anchor_index..]) {
        if found > last {
            break;
        }
        if signature.matches(&buffer[found..]) {
            return Some(found);
        }
    }
    None
}
