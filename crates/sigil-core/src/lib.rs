//! # sigil-core
//!
//! Runtime binary-introspection and patching engine.
//!
//! This crate provides:
//! - Wildcard signature scanning over the sections of a module image
//! - Cached address resolution, including RIP-relative static addresses
//! - A declarative binding pass that wires resolved addresses onto typed
//!   struct members (pointers, function pointers, primitives, hooks)
//! - Hook lifecycle management over a pluggable inline-hook backend
//! - Reversible byte patches with capture-once originals
//! - Lazy, verified virtual-table slot resolution
//!
//! Everything with lifecycle hangs off a [`ScanSession`]: construct one per
//! loaded module, bind your types against it, and drop it to detach every
//! hook and restore every patch.
//!
//! The session is not synchronized; drive all management calls from one
//! thread. Installed detours may still be invoked from any thread of the
//! host process — their bodies must handle that themselves.

pub mod binding;
pub mod cache;
pub mod diagnostics;
pub mod error;
pub mod hooks;
pub mod memory;
pub mod patch;
pub mod scanner;
pub mod session;
pub mod signature;
pub mod sigset;
pub mod vtable;

pub use binding::{
    BindKind, Bindable, BindingReport, BindingSet, DetourFn, DetourSpec, ExternalRefProvider,
    FuncPtr, NoExternalRefs, PrimitiveValue, PrimitiveWidth, ResolvedBinding, ScanMethod,
};
pub use cache::AddressCache;
pub use diagnostics::{DiagnosticsReport, SigInfo, SigKind};
pub use error::{Error, Result};
pub use hooks::{HookBackend, HookId, HookManager, HookOptions, HookRecord, NoopHookBackend};
pub use memory::{
    ImageBuffer, MemoryRegion, ModuleSections, ReadMemory, SectionKind, WriteMemory,
};
#[cfg(target_os = "windows")]
pub use memory::LocalModule;
pub use patch::{PatchId, PatchRecord, PatchTarget};
pub use scanner::PatternScanner;
pub use session::ScanSession;
pub use signature::Signature;
pub use sigset::{SigSetEntry, SigSetResolution, SignatureSet};
pub use vtable::{VirtualFunction, VirtualTable};
