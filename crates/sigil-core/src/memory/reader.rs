use crate::error::Result;

/// Read access to a target address space.
///
/// Everything above this trait works in absolute addresses; implementations
/// decide what those mean (an owned image buffer, the current process, a
/// remote process handle).
pub trait ReadMemory {
    /// Preferred base address of the module being inspected.
    fn base_address(&self) -> u64;

    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>>;

    fn read_u8(&self, address: u64) -> Result<u8> {
        Ok(self.read_bytes(address, 1)?[0])
    }

    fn read_u16(&self, address: u64) -> Result<u16> {
        let bytes = self.read_bytes(address, 2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn read_u32(&self, address: u64) -> Result<u32> {
        let bytes = self.read_bytes(address, 4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_u64(&self, address: u64) -> Result<u64> {
        let bytes = self.read_bytes(address, 8)?;
        Ok(u64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]))
    }

    fn read_i32(&self, address: u64) -> Result<i32> {
        Ok(self.read_u32(address)? as i32)
    }

    fn read_i64(&self, address: u64) -> Result<i64> {
        Ok(self.read_u64(address)? as i64)
    }
}

/// Write access to a target address space. Patches and hook backends need
/// this; pure scanning sessions do not.
pub trait WriteMemory {
    fn write_bytes(&mut self, address: u64, bytes: &[u8]) -> Result<()>;
}

impl<R: ReadMemory + ?Sized> ReadMemory for &R {
    fn base_address(&self) -> u64 {
        (**self).base_address()
    }

    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        (**self).read_bytes(address, size)
    }
}

impl<R: ReadMemory + ?Sized> ReadMemory for &mut R {
    fn base_address(&self) -> u64 {
        (**self).base_address()
    }

    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        (**self).read_bytes(address, size)
    }
}

impl<W: WriteMemory + ?Sized> WriteMemory for &mut W {
    fn write_bytes(&mut self, address: u64, bytes: &[u8]) -> Result<()> {
        (**self).write_bytes(address, bytes)
    }
}
