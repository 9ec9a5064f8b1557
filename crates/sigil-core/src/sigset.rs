//! Declarative signature sets.
//!
//! A signature set is the file-backed form of the binding surface for
//! address-only consumers: named entries resolved in bulk, saved and loaded
//! as JSON so they can ship separately from the binary that uses them.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::binding::ScanMethod;
use crate::error::Result;
use crate::memory::{ReadMemory, WriteMemory};
use crate::session::ScanSession;
use crate::signature::Signature;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigSetEntry {
    pub name: String,
    pub signature: String,
    /// Resolve as a RIP-relative static address instead of a plain match.
    #[serde(rename = "static", default)]
    pub static_scan: bool,
    /// Post-scan offset, or the operand offset for static entries.
    #[serde(default)]
    pub offset: i64,
    /// Dereference the resolved address once.
    #[serde(default)]
    pub deref: bool,
    /// Final adjustment added after any dereference.
    #[serde(default)]
    pub addend: i64,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureSet {
    pub version: String,
    pub entries: Vec<SigSetEntry>,
}

/// Outcome of resolving one entry.
#[derive(Debug, Clone, Serialize)]
pub struct SigSetResolution {
    pub name: String,
    pub required: bool,
    pub address: Option<u64>,
    pub error: Option<String>,
}

impl SigSetResolution {
    pub fn is_resolved(&self) -> bool {
        self.address.is_some()
    }
}

impl SignatureSet {
    pub fn entry(&self, name: &str) -> Option<&SigSetEntry> {
        self.entries
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Resolve every entry through the session's cache. Failures are
    /// reported per entry; the caller decides whether a required miss is
    /// fatal.
    pub fn resolve_all<M: ReadMemory + WriteMemory>(
        &self,
        session: &mut ScanSession<M>,
    ) -> Vec<SigSetResolution> {
        self.entries
            .iter()
            .map(|entry| {
                let result = resolve_entry(session, entry);
                match &result {
                    Ok(address) => debug!("{}: {:#x}", entry.name, address),
                    Err(e) => debug!("{}: {}", entry.name, e),
                }
                SigSetResolution {
                    name: entry.name.clone(),
                    required: entry.required,
                    address: result.as_ref().ok().copied(),
                    error: result.err().map(|e| e.to_string()),
                }
            })
            .collect()
    }
}

fn resolve_entry<M: ReadMemory + WriteMemory>(
    session: &mut ScanSession<M>,
    entry: &SigSetEntry,
) -> Result<u64> {
    let signature = Signature::parse(&entry.signature)?;
    let method = if entry.static_scan {
        ScanMethod::Static
    } else {
        ScanMethod::Text
    };

    let mut address = session.resolve(&signature, entry.offset, method)?;
    if entry.deref {
        address = session.memory().read_u64(address)?;
    }
    if entry.addend != 0 {
        address = address.wrapping_add_signed(entry.addend);
    }
    Ok(address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MockModuleBuilder;

    fn entry(name: &str, signature: &str) -> SigSetEntry {
        SigSetEntry {
            name: name.to_string(),
            signature: signature.to_string(),
            static_scan: false,
            offset: 0,
            deref: false,
            addend: 0,
            required: false,
        }
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let set = SignatureSet {
            version: "1.2.3".to_string(),
            entries: vec![
                SigSetEntry {
                    static_scan: true,
                    offset: 3,
                    required: true,
                    ..entry("frame_base", "48 8B 0D ?? ?? ?? ??")
                },
                entry("tick", "40 57"),
            ],
        };
        set.save(file.path()).unwrap();

        let loaded = SignatureSet::load(file.path()).unwrap();
        assert_eq!(loaded.version, "1.2.3");
        assert_eq!(loaded.entries.len(), 2);
        let frame = loaded.entry("Frame_Base").unwrap();
        assert!(frame.static_scan);
        assert_eq!(frame.offset, 3);
        assert!(frame.required);
    }

    #[test]
    fn test_resolve_all_mixed_results() {
        let mut text = vec![0x55, 0x8B, 0xEC, 0xC3, 0xCC];
        text.extend_from_slice(&[0x48, 0x8B, 0x0D]);
        text.extend_from_slice(&0x40i32.to_le_bytes());
        let (image, sections) = MockModuleBuilder::new().text(&text).build();
        let text_start = sections.text().start;
        let mut session = ScanSession::offline(image, sections);

        let set = SignatureSet {
            version: "test".to_string(),
            entries: vec![
                entry("prologue", "55 8B EC"),
                SigSetEntry {
                    static_scan: true,
                    offset: 3,
                    addend: 8,
                    ..entry("counter", "48 8B 0D ?? ?? ?? ??")
                },
                SigSetEntry {
                    required: true,
                    ..entry("absent", "DE AD BE EF")
                },
            ],
        };

        let results = set.resolve_all(&mut session);
        assert_eq!(results[0].address, Some(text_start));
        assert_eq!(results[1].address, Some(text_start + 5 + 7 + 0x40 + 8));
        assert!(results[2].address.is_none());
        assert!(results[2].required);
        assert!(results[2].error.as_deref().unwrap().contains("DE AD BE EF"));
    }
}
