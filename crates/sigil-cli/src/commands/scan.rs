use std::path::Path;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use owo_colors::OwoColorize;
use sigil_core::{SectionKind, Signature};

pub fn run(
    image: &Path,
    signature: &str,
    section: &str,
    offset: i64,
    hook_check: bool,
) -> Result<()> {
    let mut session = super::open_session(image)?;
    let kind = SectionKind::from_str(section)
        .map_err(|_| anyhow!("unknown section '{section}' (expected text, data, rdata, or module)"))?;
    let signature = Signature::parse(signature)?;

    let address = session
        .scan_section(kind, &signature)?
        .wrapping_add_signed(offset);
    println!("{} 0x{:X}", "found".green(), address);

    if hook_check {
        if session.is_function_entry(address) {
            println!("hook target: {}", "valid".green());
        } else {
            println!("hook target: {}", "invalid".red());
        }
    }
    Ok(())
}
