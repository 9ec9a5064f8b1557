use goblin::pe::PE;

use crate::error::{Error, Result};
use crate::memory::{ReadMemory, WriteMemory};

/// An owned module image held at a fixed base address.
///
/// This is the offline counterpart of a loaded module: scans, patches, and
/// static resolution all work against it exactly as they would in-process.
/// Produced either directly from raw bytes or by mapping a PE file's
/// sections to their virtual addresses with [`ImageBuffer::map_pe`].
#[derive(Debug, Clone)]
pub struct ImageBuffer {
    base: u64,
    bytes: Vec<u8>,
}

impl ImageBuffer {
    pub fn new(base: u64, bytes: Vec<u8>) -> Self {
        Self { base, bytes }
    }

    /// Map a PE file into its in-memory layout: headers at the image base,
    /// each section copied to its virtual address. The result reads like the
    /// module would once loaded (minus relocations, which signature scanning
    /// does not depend on).
    pub fn map_pe(file: &[u8]) -> Result<Self> {
        let pe = PE::parse(file).map_err(|e| Error::ModuleParse(e.to_string()))?;
        let optional = pe
            .header
            .optional_header
            .ok_or_else(|| Error::ModuleParse("missing optional header".to_string()))?;

        let image_size = optional.windows_fields.size_of_image as usize;
        let header_size = (optional.windows_fields.size_of_headers as usize)
            .min(file.len())
            .min(image_size);
        let mut bytes = vec![0u8; image_size];
        bytes[..header_size].copy_from_slice(&file[..header_size]);

        for section in &pe.sections {
            let va = section.virtual_address as usize;
            let raw_start = section.pointer_to_raw_data as usize;
            let raw_len = (section.size_of_raw_data as usize)
                .min(file.len().saturating_sub(raw_start))
                .min(image_size.saturating_sub(va));
            if raw_len == 0 {
                continue;
            }
            bytes[va..va + raw_len].copy_from_slice(&file[raw_start..raw_start + raw_len]);
        }

        Ok(Self {
            base: pe.image_base as u64,
            bytes,
        })
    }

    /// Relocate the image to a different base address. Only the addressing
    /// changes; the bytes are left as-is.
    pub fn with_base(mut self, base: u64) -> Self {
        self.base = base;
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn offset_of(&self, address: u64, size: usize) -> Result<usize> {
        if address < self.base {
            return Err(Error::MemoryReadFailed {
                address,
                message: "address below image base".to_string(),
            });
        }
        let offset = (address - self.base) as usize;
        if offset + size > self.bytes.len() {
            return Err(Error::MemoryReadFailed {
                address,
                message: "read past end of image".to_string(),
            });
        }
        Ok(offset)
    }
}

impl ReadMemory for ImageBuffer {
    fn base_address(&self) -> u64 {
        self.base
    }

    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        let offset = self.offset_of(address, size)?;
        Ok(self.bytes[offset..offset + size].to_vec())
    }
}

impl WriteMemory for ImageBuffer {
    fn write_bytes(&mut self, address: u64, bytes: &[u8]) -> Result<()> {
        let offset = self
            .offset_of(address, bytes.len())
            .map_err(|_| Error::MemoryWriteFailed {
                address,
                message: "write outside image bounds".to_string(),
            })?;
        self.bytes[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_within_bounds() {
        let image = ImageBuffer::new(0x1000, vec![0xAA, 0xBB, 0xCC, 0xDD]);
        assert_eq!(image.read_u8(0x1000).unwrap(), 0xAA);
        assert_eq!(image.read_u16(0x1002).unwrap(), 0xDDCC);
        assert!(image.read_bytes(0x1003, 2).is_err());
        assert!(image.read_u8(0xFFF).is_err());
    }

    #[test]
    fn test_write_roundtrip() {
        let mut image = ImageBuffer::new(0x1000, vec![0; 8]);
        image.write_bytes(0x1002, &[1, 2, 3]).unwrap();
        assert_eq!(image.read_bytes(0x1000, 8).unwrap(), vec![0, 0, 1, 2, 3, 0, 0, 0]);
        assert!(image.write_bytes(0x1006, &[1, 2, 3]).is_err());
    }

    #[test]
    fn test_rebase() {
        let image = ImageBuffer::new(0x1000, vec![0x42]).with_base(0x4000_0000);
        assert_eq!(image.base_address(), 0x4000_0000);
        assert_eq!(image.read_u8(0x4000_0000).unwrap(), 0x42);
    }
}
