//! Inspection surface for external tooling.
//!
//! Everything resolved through a session — signatures, bindings, hooks,
//! patches — stays enumerable after the fact, without re-triggering any
//! scan. The report serializes to JSON for out-of-process debug queries.

use std::fs;
use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use crate::binding::BindingReport;
use crate::hooks::HookRecord;
use crate::patch::PatchRecord;

/// How a signature was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
pub enum SigKind {
    /// Plain scan; the match address is the result.
    Text,
    /// RIP-relative static resolution from the match.
    Static,
}

/// One signature resolution, recorded when the scan actually ran (cache
/// hits do not add entries).
#[derive(Debug, Clone, Serialize)]
pub struct SigInfo {
    pub signature: String,
    pub offset: i64,
    pub address: u64,
    pub kind: SigKind,
    pub found: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignatureEntry {
    pub signature: String,
    pub offset: i64,
    pub address: String,
    pub kind: String,
    pub found: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HookEntry {
    pub address: String,
    pub detour: String,
    pub trampoline: String,
    pub enabled: bool,
    pub disposed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatchEntry {
    pub address: String,
    pub signature: Option<String>,
    pub original: String,
    pub replacement: String,
    pub enabled: bool,
    pub disposed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticsReport {
    pub base_address: String,
    pub signatures: Vec<SignatureEntry>,
    pub bindings: Vec<BindingReport>,
    pub hooks: Vec<HookEntry>,
    pub patches: Vec<PatchEntry>,
}

fn hex_address(address: u64) -> String {
    format!("0x{address:X}")
}

fn hex_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

impl DiagnosticsReport {
    pub(crate) fn collect(
        base_address: u64,
        sig_infos: &[SigInfo],
        bindings: &[BindingReport],
        hooks: &[HookRecord],
        patches: &[PatchRecord],
    ) -> Self {
        Self {
            base_address: hex_address(base_address),
            signatures: sig_infos
                .iter()
                .map(|info| SignatureEntry {
                    signature: info.signature.clone(),
                    offset: info.offset,
                    address: hex_address(info.address),
                    kind: info.kind.to_string(),
                    found: info.found,
                })
                .collect(),
            bindings: bindings.to_vec(),
            hooks: hooks
                .iter()
                .map(|record| HookEntry {
                    address: hex_address(record.address()),
                    detour: record.detour_name().to_string(),
                    trampoline: hex_address(record.trampoline()),
                    enabled: record.is_enabled(),
                    disposed: record.is_disposed(),
                })
                .collect(),
            patches: patches
                .iter()
                .map(|record| PatchEntry {
                    address: hex_address(record.address()),
                    signature: record.signature().map(str::to_string),
                    original: hex_bytes(record.original_bytes()),
                    replacement: hex_bytes(record.replacement_bytes()),
                    enabled: record.is_enabled(),
                    disposed: record.is_disposed(),
                })
                .collect(),
        }
    }

    /// Save the report as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_rendering() {
        assert_eq!(hex_address(0x1400_0000), "0x14000000");
        assert_eq!(hex_bytes(&[0xDE, 0xAD, 0x01]), "DE AD 01");
        assert_eq!(hex_bytes(&[]), "");
    }
}
