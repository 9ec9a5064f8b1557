//! CLI command implementations.

pub mod resolve;
pub mod scan;
pub mod sections;
pub mod static_addr;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use sigil_core::{ImageBuffer, ModuleSections, ScanSession};

/// Map a PE image file and open an offline session over it.
pub fn open_session(path: &Path) -> Result<ScanSession<ImageBuffer>> {
    let file = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let sections = ModuleSections::from_pe(&file)?;
    let image = ImageBuffer::map_pe(&file)?;
    Ok(ScanSession::offline(image, sections))
}
