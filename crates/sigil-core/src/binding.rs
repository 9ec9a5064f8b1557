//! Declarative bindings.
//!
//! A bindable type registers a table of descriptors: for each member, where
//! its value comes from (a signature scan or an external provider) and how
//! it is assigned (raw pointer, typed function pointer, primitive snapshot,
//! or an installed hook). [`ScanSession::bind`] walks the table, resolves
//! each descriptor, and assigns the target. Required descriptors abort the
//! pass on failure; optional ones log a warning and leave the member unset.
//!
//! [`ScanSession::bind`]: crate::session::ScanSession::bind

use std::any::TypeId;
use std::marker::PhantomData;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::hooks::{HookId, HookOptions};

/// How a scanned signature resolves to an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ScanMethod {
    /// Match in the code section; the match address is the result.
    Text,
    /// Match in the code section, then decode the RIP-relative operand at
    /// the descriptor's offset.
    Static,
}

/// Where a binding's address comes from.
#[derive(Debug, Clone)]
pub enum BindingSource {
    Scan {
        signature: String,
        method: ScanMethod,
    },
    /// Supplied by an [`ExternalRefProvider`], keyed by (owner, member).
    External,
}

/// Pre-resolved addresses owned by another subsystem.
pub trait ExternalRefProvider {
    fn resolve(&self, owner: &'static str, member: &'static str) -> Option<u64>;
}

/// Provider with no entries, for targets that only use scans.
pub struct NoExternalRefs;

impl ExternalRefProvider for NoExternalRefs {
    fn resolve(&self, _owner: &'static str, _member: &'static str) -> Option<u64> {
        None
    }
}

/// A registered detour: a raw function pointer plus the fn-pointer type it
/// was declared with. Build one with [`detour!`](crate::detour!) so the
/// declared type is checked against the function at compile time.
#[derive(Debug, Clone, Copy)]
pub struct DetourFn {
    name: &'static str,
    ptr: u64,
    shape: TypeId,
}

impl DetourFn {
    pub fn new(name: &'static str, ptr: u64, shape: TypeId) -> Self {
        Self { name, ptr, shape }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn ptr(&self) -> u64 {
        self.ptr
    }

    pub fn shape(&self) -> TypeId {
        self.shape
    }
}

/// Build a [`DetourFn`] from a function item and its fn-pointer type. The
/// `as` coercion fails to compile if the function does not have exactly
/// that shape.
#[macro_export]
macro_rules! detour {
    ($func:ident : $ty:ty) => {
        $crate::binding::DetourFn::new(
            stringify!($func),
            $func as $ty as usize as u64,
            ::std::any::TypeId::of::<$ty>(),
        )
    };
}

/// How a hook descriptor finds its detour.
#[derive(Debug, Clone, Copy)]
pub enum DetourSpec {
    /// Direct reference; the primary path.
    Explicit(DetourFn),
    /// Look up a registered detour by name.
    Named(&'static str),
    /// `member_hook` → `member_detour`, falling back to the unique
    /// shape-compatible candidate in the detour table.
    Convention,
}

/// A typed wrapper over a resolved function address.
pub struct FuncPtr<F> {
    address: u64,
    _marker: PhantomData<F>,
}

impl<F> FuncPtr<F> {
    pub fn new(address: u64) -> Self {
        Self {
            address,
            _marker: PhantomData,
        }
    }

    pub fn address(&self) -> u64 {
        self.address
    }

    pub fn is_null(&self) -> bool {
        self.address == 0
    }

    /// Reinterpret the address as `F`.
    ///
    /// # Safety
    ///
    /// The address must point at a function whose real signature and ABI
    /// match `F`, and the containing module must remain loaded while the
    /// pointer is used.
    pub unsafe fn get(&self) -> F
    where
        F: Copy,
    {
        debug_assert_eq!(size_of::<F>(), size_of::<u64>());
        unsafe { std::mem::transmute_copy(&self.address) }
    }
}

impl<F> Clone for FuncPtr<F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<F> Copy for FuncPtr<F> {}

impl<F> std::fmt::Debug for FuncPtr<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FuncPtr({:#x})", self.address)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
pub enum PrimitiveWidth {
    U8,
    U16,
    U32,
    U64,
}

impl PrimitiveWidth {
    pub fn size(self) -> usize {
        match self {
            PrimitiveWidth::U8 => 1,
            PrimitiveWidth::U16 => 2,
            PrimitiveWidth::U32 => 4,
            PrimitiveWidth::U64 => 8,
        }
    }
}

/// A by-value snapshot read at bind time. Never a live view of memory.
#[derive(Debug, Clone, Copy)]
pub struct PrimitiveValue {
    raw: u64,
    width: PrimitiveWidth,
}

impl PrimitiveValue {
    pub(crate) fn from_le_bytes(bytes: &[u8], width: PrimitiveWidth) -> Self {
        let mut raw = [0u8; 8];
        raw[..bytes.len()].copy_from_slice(bytes);
        Self {
            raw: u64::from_le_bytes(raw),
            width,
        }
    }

    pub fn width(&self) -> PrimitiveWidth {
        self.width
    }

    pub fn as_u8(&self) -> u8 {
        self.raw as u8
    }

    pub fn as_u16(&self) -> u16 {
        self.raw as u16
    }

    pub fn as_u32(&self) -> u32 {
        self.raw as u32
    }

    pub fn as_u64(&self) -> u64 {
        self.raw
    }

    pub fn as_i32(&self) -> i32 {
        self.raw as u32 as i32
    }

    pub fn as_i64(&self) -> i64 {
        self.raw as i64
    }

    pub fn as_f32(&self) -> f32 {
        f32::from_bits(self.as_u32())
    }

    pub fn as_f64(&self) -> f64 {
        f64::from_bits(self.raw)
    }
}

/// Label used in reports and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
pub enum BindKind {
    Pointer,
    Function,
    Primitive,
    Hook,
}

pub(crate) enum BindingKind<T> {
    Pointer {
        assign: Box<dyn Fn(&mut T, u64)>,
    },
    Function {
        assign: Box<dyn Fn(&mut T, u64)>,
    },
    Primitive {
        width: PrimitiveWidth,
        assign: Box<dyn Fn(&mut T, PrimitiveValue)>,
    },
    Hook {
        shape: TypeId,
        detour: DetourSpec,
        options: HookOptions,
        assign: Box<dyn Fn(&mut T, HookId)>,
    },
}

impl<T> BindingKind<T> {
    pub(crate) fn label(&self) -> BindKind {
        match self {
            BindingKind::Pointer { .. } => BindKind::Pointer,
            BindingKind::Function { .. } => BindKind::Function,
            BindingKind::Primitive { .. } => BindKind::Primitive,
            BindingKind::Hook { .. } => BindKind::Hook,
        }
    }
}

/// One member's binding declaration. Immutable once built.
pub struct BindingDescriptor<T> {
    pub(crate) member: &'static str,
    pub(crate) source: BindingSource,
    pub(crate) offset: i64,
    pub(crate) required: bool,
    pub(crate) kind: BindingKind<T>,
}

impl<T> BindingDescriptor<T> {
    pub fn member(&self) -> &'static str {
        self.member
    }

    pub fn required(&self) -> bool {
        self.required
    }

    pub fn signature_text(&self) -> Option<&str> {
        match &self.source {
            BindingSource::Scan { signature, .. } => Some(signature),
            BindingSource::External => None,
        }
    }
}

/// Builder for a type's binding table. Descriptor constructors append;
/// modifiers adjust the most recently added descriptor.
pub struct BindingSet<T> {
    descriptors: Vec<BindingDescriptor<T>>,
}

impl<T: 'static> BindingSet<T> {
    pub fn new() -> Self {
        Self {
            descriptors: Vec::new(),
        }
    }

    fn push(mut self, member: &'static str, source: BindingSource, kind: BindingKind<T>) -> Self {
        self.descriptors.push(BindingDescriptor {
            member,
            source,
            offset: 0,
            required: false,
            kind,
        });
        self
    }

    fn scan_source(signature: &str) -> BindingSource {
        BindingSource::Scan {
            signature: signature.to_string(),
            method: ScanMethod::Text,
        }
    }

    /// Raw address member.
    pub fn pointer(self, member: &'static str, signature: &str, assign: fn(&mut T, u64)) -> Self {
        self.push(member, Self::scan_source(signature), BindingKind::Pointer {
            assign: Box::new(assign),
        })
    }

    /// Callable member: the resolved address is wrapped as a typed function
    /// pointer before assignment.
    pub fn function<F: Copy + 'static>(
        self,
        member: &'static str,
        signature: &str,
        assign: fn(&mut T, FuncPtr<F>),
    ) -> Self {
        self.push(member, Self::scan_source(signature), BindingKind::Function {
            assign: Box::new(move |target, address| assign(target, FuncPtr::new(address))),
        })
    }

    /// By-value snapshot member.
    pub fn primitive(
        self,
        member: &'static str,
        signature: &str,
        width: PrimitiveWidth,
        assign: fn(&mut T, PrimitiveValue),
    ) -> Self {
        self.push(member, Self::scan_source(signature), BindingKind::Primitive {
            width,
            assign: Box::new(assign),
        })
    }

    /// Hooked member: the resolved address is handed to the hook manager
    /// and the record's id assigned.
    pub fn hook<F: Copy + 'static>(
        self,
        member: &'static str,
        signature: &str,
        assign: fn(&mut T, HookId),
    ) -> Self {
        self.push(member, Self::scan_source(signature), BindingKind::Hook {
            shape: TypeId::of::<F>(),
            detour: DetourSpec::Convention,
            options: HookOptions::default(),
            assign: Box::new(assign),
        })
    }

    pub fn external_pointer(self, member: &'static str, assign: fn(&mut T, u64)) -> Self {
        self.push(member, BindingSource::External, BindingKind::Pointer {
            assign: Box::new(assign),
        })
    }

    pub fn external_function<F: Copy + 'static>(
        self,
        member: &'static str,
        assign: fn(&mut T, FuncPtr<F>),
    ) -> Self {
        self.push(member, BindingSource::External, BindingKind::Function {
            assign: Box::new(move |target, address| assign(target, FuncPtr::new(address))),
        })
    }

    pub fn external_primitive(
        self,
        member: &'static str,
        width: PrimitiveWidth,
        assign: fn(&mut T, PrimitiveValue),
    ) -> Self {
        self.push(member, BindingSource::External, BindingKind::Primitive {
            width,
            assign: Box::new(assign),
        })
    }

    pub fn external_hook<F: Copy + 'static>(
        self,
        member: &'static str,
        assign: fn(&mut T, HookId),
    ) -> Self {
        self.push(member, BindingSource::External, BindingKind::Hook {
            shape: TypeId::of::<F>(),
            detour: DetourSpec::Convention,
            options: HookOptions::default(),
            assign: Box::new(assign),
        })
    }

    fn last(&mut self) -> &mut BindingDescriptor<T> {
        self.descriptors
            .last_mut()
            .expect("modifier called on an empty binding set")
    }

    /// Failure of the last descriptor aborts the whole binding pass.
    pub fn required(mut self) -> Self {
        self.last().required = true;
        self
    }

    /// Byte offset added after a text scan, or the RIP-relative operand
    /// offset for a static scan.
    pub fn offset(mut self, offset: i64) -> Self {
        self.last().offset = offset;
        self
    }

    /// Resolve the last descriptor's signature as a static-address scan.
    pub fn static_scan(mut self) -> Self {
        if let BindingSource::Scan { method, .. } = &mut self.last().source {
            *method = ScanMethod::Static;
        }
        self
    }

    /// Set how the last hook descriptor locates its detour.
    pub fn with_detour(mut self, spec: DetourSpec) -> Self {
        if let BindingKind::Hook { detour, .. } = &mut self.last().kind {
            *detour = spec;
        }
        self
    }

    /// Install the last hook without arming it.
    pub fn start_disabled(mut self) -> Self {
        if let BindingKind::Hook { options, .. } = &mut self.last().kind {
            options.enable = false;
        }
        self
    }

    /// Exclude the last hook from bulk auto-disposal.
    pub fn manual_dispose(mut self) -> Self {
        if let BindingKind::Hook { options, .. } = &mut self.last().kind {
            options.auto_dispose = false;
        }
        self
    }

    pub(crate) fn into_descriptors(self) -> Vec<BindingDescriptor<T>> {
        self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl<T: 'static> Default for BindingSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A type whose members are wired up by a binding pass.
pub trait Bindable: Sized + 'static {
    /// Owner key for external references and diagnostics.
    const NAME: &'static str;

    fn bindings() -> BindingSet<Self>;

    /// Detour table searched by named and convention-based hooks.
    fn detours() -> Vec<DetourFn> {
        Vec::new()
    }
}

/// Pick the detour for a hook descriptor.
///
/// Explicit references and name lookups must match the declared shape
/// exactly. The convention path tries `member_hook` → `member_detour`
/// first, then falls back to the unique shape-compatible candidate;
/// anything other than exactly one candidate is ambiguous.
pub(crate) fn resolve_detour(
    member: &'static str,
    spec: &DetourSpec,
    shape: TypeId,
    table: &[DetourFn],
) -> Result<DetourFn> {
    match spec {
        DetourSpec::Explicit(detour) => {
            if detour.shape != shape {
                return Err(Error::DetourIncompatible {
                    name: detour.name.to_string(),
                });
            }
            Ok(*detour)
        }
        DetourSpec::Named(name) => {
            let detour = table
                .iter()
                .find(|d| d.name == *name)
                .ok_or_else(|| Error::DetourIncompatible {
                    name: name.to_string(),
                })?;
            if detour.shape != shape {
                return Err(Error::DetourIncompatible {
                    name: name.to_string(),
                });
            }
            Ok(*detour)
        }
        DetourSpec::Convention => {
            if let Some(stem) = member.strip_suffix("_hook") {
                let conventional = format!("{stem}_detour");
                if let Some(detour) = table.iter().find(|d| d.name == conventional) {
                    if detour.shape == shape {
                        return Ok(*detour);
                    }
                    debug!(
                        "conventional detour {} has the wrong shape, trying unique match",
                        conventional
                    );
                }
            }

            let mut candidates = table.iter().filter(|d| d.shape == shape);
            match (candidates.next(), candidates.next()) {
                (Some(only), None) => Ok(*only),
                (first, _) => Err(Error::DetourAmbiguous {
                    member,
                    candidates: if first.is_none() {
                        0
                    } else {
                        table.iter().filter(|d| d.shape == shape).count()
                    },
                }),
            }
        }
    }
}

/// Outcome of one descriptor during a binding pass.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedBinding {
    pub member: &'static str,
    pub signature: Option<String>,
    pub offset: i64,
    pub kind: BindKind,
    pub required: bool,
    pub address: Option<u64>,
    pub success: bool,
}

/// Everything a binding pass did to one target, retained for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct BindingReport {
    pub owner: &'static str,
    pub entries: Vec<ResolvedBinding>,
}

impl BindingReport {
    /// Structural validation: a target is usable only if every declared
    /// function-pointer and hook member resolved.
    pub fn validate(&self) -> Result<()> {
        let usable = self
            .entries
            .iter()
            .filter(|entry| matches!(entry.kind, BindKind::Function | BindKind::Hook))
            .all(|entry| entry.success);
        if usable {
            Ok(())
        } else {
            Err(Error::StructuralValidationFailed(self.owner))
        }
    }

    pub fn is_fully_bound(&self) -> bool {
        self.entries.iter().all(|entry| entry.success)
    }
}

pub(crate) fn report_entry<T>(
    descriptor: &BindingDescriptor<T>,
    address: Option<u64>,
    success: bool,
) -> ResolvedBinding {
    ResolvedBinding {
        member: descriptor.member,
        signature: descriptor.signature_text().map(str::to_string),
        offset: descriptor.offset,
        kind: descriptor.kind.label(),
        required: descriptor.required,
        address,
        success,
    }
}

pub(crate) fn warn_optional(owner: &str, member: &str, error: &Error) {
    warn!("optional binding {owner}.{member} failed: {error}");
}
