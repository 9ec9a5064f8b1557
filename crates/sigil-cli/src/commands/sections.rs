use std::path::Path;

use anyhow::Result;
use sigil_core::SectionKind;

pub fn run(image: &Path) -> Result<()> {
    let session = super::open_session(image)?;
    let sections = session.sections();

    println!("Base: 0x{:X}", sections.base());
    for kind in [
        SectionKind::Text,
        SectionKind::RData,
        SectionKind::Data,
        SectionKind::Module,
    ] {
        let region = sections.region_of(kind);
        println!(
            "{:<8} 0x{:X} - 0x{:X}  ({} bytes)",
            kind.to_string().to_lowercase(),
            region.start,
            region.end(),
            region.len
        );
    }
    Ok(())
}
