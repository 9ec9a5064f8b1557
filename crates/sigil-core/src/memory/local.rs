//! In-process access to the host module, for sessions running inside the
//! target (injected or loaded as a plugin). Reads go straight through raw
//! pointers; writes are wrapped in a VirtualProtect guard so code sections
//! can be patched.

use std::ffi::c_void;

use windows::Win32::System::Diagnostics::Debug::FlushInstructionCache;
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::System::Memory::{PAGE_EXECUTE_READWRITE, PAGE_PROTECTION_FLAGS, VirtualProtect};
use windows::Win32::System::ProcessStatus::{GetModuleInformation, MODULEINFO};
use windows::Win32::System::Threading::GetCurrentProcess;
use windows::core::PCWSTR;

use crate::error::{Error, Result};
use crate::memory::{MemoryRegion, ModuleSections, ReadMemory, WriteMemory};

/// The main module of the current process.
pub struct LocalModule {
    base: u64,
    size: usize,
}

impl LocalModule {
    pub fn current() -> Result<Self> {
        unsafe {
            let module = GetModuleHandleW(PCWSTR::null())
                .map_err(|e| Error::ModuleParse(format!("GetModuleHandleW failed: {e}")))?;
            let mut info = MODULEINFO::default();
            GetModuleInformation(
                GetCurrentProcess(),
                module,
                &mut info,
                size_of::<MODULEINFO>() as u32,
            )
            .map_err(|e| Error::ModuleParse(format!("GetModuleInformation failed: {e}")))?;

            Ok(Self {
                base: info.lpBaseOfDll as u64,
                size: info.SizeOfImage as usize,
            })
        }
    }

    /// Walk the in-memory NT headers and resolve the section table.
    pub fn sections(&self) -> Result<ModuleSections> {
        let e_lfanew = self.read_u32(self.base + 0x3C)? as u64;
        let nt = self.base + e_lfanew;
        if self.read_u32(nt)? != 0x0000_4550 {
            return Err(Error::ModuleParse("missing PE signature".to_string()));
        }

        let section_count = self.read_u16(nt + 6)? as u64;
        let optional_size = self.read_u16(nt + 20)? as u64;
        let section_table = nt + 24 + optional_size;

        let mut text = None;
        let mut data = None;
        let mut rdata = None;
        for i in 0..section_count {
            let entry = section_table + i * 40;
            let name_bytes = self.read_bytes(entry, 8)?;
            let name_len = name_bytes.iter().position(|&b| b == 0).unwrap_or(8);
            let virtual_size = self.read_u32(entry + 8)? as usize;
            let virtual_address = self.read_u32(entry + 12)? as u64;
            let region = MemoryRegion::new(self.base + virtual_address, virtual_size);
            match &name_bytes[..name_len] {
                b".text" => text = Some(region),
                b".data" => data = Some(region),
                b".rdata" => rdata = Some(region),
                _ => {}
            }
        }

        let missing = |name: &str| Error::ModuleParse(format!("section {name} not found"));
        Ok(ModuleSections::new(
            self.base,
            text.ok_or_else(|| missing(".text"))?,
            data.ok_or_else(|| missing(".data"))?,
            rdata.ok_or_else(|| missing(".rdata"))?,
            MemoryRegion::new(self.base, self.size),
        ))
    }

    fn check_bounds(&self, address: u64, size: usize) -> bool {
        address >= self.base && address + size as u64 <= self.base + self.size as u64
    }
}

impl ReadMemory for LocalModule {
    fn base_address(&self) -> u64 {
        self.base
    }

    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        if !self.check_bounds(address, size) {
            return Err(Error::MemoryReadFailed {
                address,
                message: "address outside module bounds".to_string(),
            });
        }
        let mut buffer = vec![0u8; size];
        unsafe {
            std::ptr::copy_nonoverlapping(address as *const u8, buffer.as_mut_ptr(), size);
        }
        Ok(buffer)
    }
}

impl WriteMemory for LocalModule {
    fn write_bytes(&mut self, address: u64, bytes: &[u8]) -> Result<()> {
        if !self.check_bounds(address, bytes.len()) {
            return Err(Error::MemoryWriteFailed {
                address,
                message: "address outside module bounds".to_string(),
            });
        }

        let target = address as *mut c_void;
        let mut previous = PAGE_PROTECTION_FLAGS::default();
        unsafe {
            VirtualProtect(target, bytes.len(), PAGE_EXECUTE_READWRITE, &mut previous).map_err(
                |e| Error::MemoryWriteFailed {
                    address,
                    message: format!("VirtualProtect failed: {e}"),
                },
            )?;
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), address as *mut u8, bytes.len());
            let mut restored = PAGE_PROTECTION_FLAGS::default();
            let _ = VirtualProtect(target, bytes.len(), previous, &mut restored);
            let _ = FlushInstructionCache(
                GetCurrentProcess(),
                Some(target as *const c_void),
                bytes.len(),
            );
        }
        Ok(())
    }
}
