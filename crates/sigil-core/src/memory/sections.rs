use goblin::pe::PE;

use crate::error::{Error, Result};
use crate::memory::MemoryRegion;

/// A named scan target: one of the standard sections or the whole image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(ascii_case_insensitive)]
pub enum SectionKind {
    Text,
    Data,
    RData,
    Module,
}

/// Resolved section boundaries of a loaded module.
///
/// Scans are always bounded: either by one of these sections or by an
/// explicit caller-supplied region. Nothing here infers a section from an
/// address.
#[derive(Debug, Clone)]
pub struct ModuleSections {
    base: u64,
    text: MemoryRegion,
    data: MemoryRegion,
    rdata: MemoryRegion,
    module: MemoryRegion,
}

impl ModuleSections {
    pub fn new(
        base: u64,
        text: MemoryRegion,
        data: MemoryRegion,
        rdata: MemoryRegion,
        module: MemoryRegion,
    ) -> Self {
        Self {
            base,
            text,
            data,
            rdata,
            module,
        }
    }

    /// Resolve `.text`/`.data`/`.rdata` boundaries from a PE file's section
    /// table. `base` addressing matches [`ImageBuffer::map_pe`].
    ///
    /// [`ImageBuffer::map_pe`]: crate::memory::ImageBuffer::map_pe
    pub fn from_pe(file: &[u8]) -> Result<Self> {
        let pe = PE::parse(file).map_err(|e| Error::ModuleParse(e.to_string()))?;
        let optional = pe
            .header
            .optional_header
            .ok_or_else(|| Error::ModuleParse("missing optional header".to_string()))?;
        let base = pe.image_base as u64;

        let mut text = None;
        let mut data = None;
        let mut rdata = None;
        for section in &pe.sections {
            let name = section.name().unwrap_or("");
            let region = MemoryRegion::new(
                base + section.virtual_address as u64,
                section.virtual_size as usize,
            );
            match name {
                ".text" => text = Some(region),
                ".data" => data = Some(region),
                ".rdata" => rdata = Some(region),
                _ => {}
            }
        }

        let missing = |name: &str| Error::ModuleParse(format!("section {name} not found"));
        Ok(Self {
            base,
            text: text.ok_or_else(|| missing(".text"))?,
            data: data.ok_or_else(|| missing(".data"))?,
            rdata: rdata.ok_or_else(|| missing(".rdata"))?,
            module: MemoryRegion::new(base, optional.windows_fields.size_of_image as usize),
        })
    }

    /// Shift every region to a new module base.
    pub fn rebase(self, base: u64) -> Self {
        let shift = |region: MemoryRegion| {
            MemoryRegion::new(base + (region.start - self.base), region.len)
        };
        Self {
            base,
            text: shift(self.text),
            data: shift(self.data),
            rdata: shift(self.rdata),
            module: shift(self.module),
        }
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn text(&self) -> MemoryRegion {
        self.text
    }

    pub fn data(&self) -> MemoryRegion {
        self.data
    }

    pub fn rdata(&self) -> MemoryRegion {
        self.rdata
    }

    /// The whole mapped image, headers included.
    pub fn module_region(&self) -> MemoryRegion {
        self.module
    }

    pub fn region_of(&self, kind: SectionKind) -> MemoryRegion {
        match kind {
            SectionKind::Text => self.text,
            SectionKind::Data => self.data,
            SectionKind::RData => self.rdata,
            SectionKind::Module => self.module,
        }
    }
}
