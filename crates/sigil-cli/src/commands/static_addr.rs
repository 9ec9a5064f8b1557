use std::path::Path;

use anyhow::Result;
use owo_colors::OwoColorize;
use sigil_core::Signature;

pub fn run(image: &Path, signature: &str, operand_offset: i64, addend: i64) -> Result<()> {
    let mut session = super::open_session(image)?;
    let signature = Signature::parse(signature)?;

    let address = session
        .resolve_static_sig(&signature, operand_offset)?
        .wrapping_add_signed(addend);
    println!("{} 0x{:X}", "resolved".green(), address);
    Ok(())
}
