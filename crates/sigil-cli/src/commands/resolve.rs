use std::path::Path;

use anyhow::{Result, bail};
use owo_colors::OwoColorize;
use sigil_core::SignatureSet;
use tracing::info;

pub fn run(image: &Path, sigset: &Path, dump: Option<&Path>) -> Result<()> {
    let mut session = super::open_session(image)?;
    let set = SignatureSet::load(sigset)?;
    info!("Loaded signature set version: {}", set.version);

    let results = set.resolve_all(&mut session);
    let mut required_missing = 0usize;
    for result in &results {
        match result.address {
            Some(address) => {
                println!("{:<24} {} 0x{:X}", result.name, "ok".green(), address);
            }
            None => {
                let reason = result.error.as_deref().unwrap_or("unresolved");
                if result.required {
                    required_missing += 1;
                    println!("{:<24} {} {}", result.name, "required".red(), reason);
                } else {
                    println!("{:<24} {} {}", result.name, "optional".yellow(), reason);
                }
            }
        }
    }

    if let Some(path) = dump {
        session.diagnostics().save(path)?;
        info!("Wrote diagnostics dump to {}", path.display());
    }

    if required_missing > 0 {
        bail!("{required_missing} required signature(s) unresolved");
    }
    Ok(())
}
