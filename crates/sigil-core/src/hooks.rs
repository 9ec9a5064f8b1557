//! Hook lifecycle management.
//!
//! The actual inline trampoline work (prologue relocation, jump writing,
//! thread safety of in-flight calls) belongs to a [`HookBackend`]
//! implementation wrapping whatever hooking primitive the host uses. This
//! module owns everything around it: one record per address, enable and
//! disable toggles, disposal, and bulk teardown at session end.

use std::collections::HashMap;

use tracing::warn;

use crate::error::{Error, Result};

/// The underlying inline-hook primitive.
///
/// `attach` must install the detour in a disabled state and return the
/// trampoline address through which the original function stays callable.
/// Implementations are responsible for not corrupting calls already inside
/// the original when a hook is disabled or detached.
pub trait HookBackend {
    fn attach(&mut self, target: u64, detour: u64) -> Result<u64>;
    fn enable(&mut self, target: u64) -> Result<()>;
    fn disable(&mut self, target: u64) -> Result<()>;
    fn detach(&mut self, target: u64) -> Result<()>;
}

/// Backend that records nothing and writes nothing. The trampoline is the
/// target itself. Used for offline analysis sessions where hooks are
/// declared but never armed.
#[derive(Debug, Default)]
pub struct NoopHookBackend;

impl HookBackend for NoopHookBackend {
    fn attach(&mut self, target: u64, _detour: u64) -> Result<u64> {
        Ok(target)
    }

    fn enable(&mut self, _target: u64) -> Result<()> {
        Ok(())
    }

    fn disable(&mut self, _target: u64) -> Result<()> {
        Ok(())
    }

    fn detach(&mut self, _target: u64) -> Result<()> {
        Ok(())
    }
}

/// Handle to an installed hook. Only valid for the session that minted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(pub(crate) usize);

#[derive(Debug, Clone, Copy)]
pub struct HookOptions {
    /// Arm the hook immediately after installation.
    pub enable: bool,
    /// Include the hook in [`HookManager::dispose_all`]. Hooks installed
    /// with `false` are only reclaimed by the session's final teardown.
    pub auto_dispose: bool,
}

impl Default for HookOptions {
    fn default() -> Self {
        Self {
            enable: true,
            auto_dispose: true,
        }
    }
}

#[derive(Debug)]
pub struct HookRecord {
    address: u64,
    detour: u64,
    detour_name: String,
    trampoline: u64,
    enabled: bool,
    auto_dispose: bool,
    disposed: bool,
}

impl HookRecord {
    pub fn address(&self) -> u64 {
        self.address
    }

    pub fn detour(&self) -> u64 {
        self.detour
    }

    pub fn detour_name(&self) -> &str {
        &self.detour_name
    }

    pub fn trampoline(&self) -> u64 {
        self.trampoline
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

pub struct HookManager {
    backend: Box<dyn HookBackend>,
    records: Vec<HookRecord>,
    by_address: HashMap<u64, HookId>,
}

impl HookManager {
    pub fn new(backend: Box<dyn HookBackend>) -> Self {
        Self {
            backend,
            records: Vec::new(),
            by_address: HashMap::new(),
        }
    }

    /// Install a hook at `address`. At most one live record may exist per
    /// address; a second install is rejected without touching the first.
    pub fn install(
        &mut self,
        address: u64,
        detour: u64,
        detour_name: &str,
        options: HookOptions,
    ) -> Result<HookId> {
        if self.by_address.contains_key(&address) {
            return Err(Error::DuplicateHook(address));
        }

        let trampoline = self.backend.attach(address, detour)?;
        if options.enable {
            self.backend.enable(address)?;
        }

        let id = HookId(self.records.len());
        self.records.push(HookRecord {
            address,
            detour,
            detour_name: detour_name.to_string(),
            trampoline,
            enabled: options.enable,
            auto_dispose: options.auto_dispose,
            disposed: false,
        });
        self.by_address.insert(address, id);
        Ok(id)
    }

    pub fn enable(&mut self, id: HookId) -> Result<()> {
        let record = &self.records[id.0];
        if record.disposed {
            return Err(Error::HookDisposed(record.address));
        }
        if record.enabled {
            return Ok(());
        }
        self.backend.enable(record.address)?;
        self.records[id.0].enabled = true;
        Ok(())
    }

    pub fn disable(&mut self, id: HookId) -> Result<()> {
        let record = &self.records[id.0];
        if record.disposed {
            return Err(Error::HookDisposed(record.address));
        }
        if !record.enabled {
            return Ok(());
        }
        self.backend.disable(record.address)?;
        self.records[id.0].enabled = false;
        Ok(())
    }

    /// Remove interception and forget the record. The address becomes
    /// hookable again. Disposing twice is a no-op.
    pub fn dispose(&mut self, id: HookId) -> Result<()> {
        let record = &self.records[id.0];
        if record.disposed {
            return Ok(());
        }
        let address = record.address;
        self.backend.detach(address)?;
        let record = &mut self.records[id.0];
        record.disposed = true;
        record.enabled = false;
        self.by_address.remove(&address);
        Ok(())
    }

    /// Bulk teardown of every auto-dispose hook. Safe to call repeatedly
    /// and with records already disposed.
    pub fn dispose_all(&mut self) {
        for index in 0..self.records.len() {
            if self.records[index].disposed || !self.records[index].auto_dispose {
                continue;
            }
            if let Err(e) = self.dispose(HookId(index)) {
                warn!("failed to dispose hook at {:#x}: {}", self.records[index].address, e);
            }
        }
    }

    /// Final teardown: detach everything still installed, including hooks
    /// that opted out of auto-dispose. No hook outlives the session.
    pub(crate) fn dispose_remaining(&mut self) {
        for index in 0..self.records.len() {
            if self.records[index].disposed {
                continue;
            }
            if let Err(e) = self.dispose(HookId(index)) {
                warn!("failed to dispose hook at {:#x}: {}", self.records[index].address, e);
            }
        }
    }

    /// Trampoline for invoking the original function, while the hook is
    /// alive.
    pub fn original(&self, id: HookId) -> Option<u64> {
        let record = &self.records[id.0];
        (!record.disposed).then_some(record.trampoline)
    }

    pub fn record(&self, id: HookId) -> &HookRecord {
        &self.records[id.0]
    }

    pub fn records(&self) -> &[HookRecord] {
        &self.records
    }

    pub fn is_hooked(&self, address: u64) -> bool {
        self.by_address.contains_key(&address)
    }
}
