//! The scanner session.
//!
//! One session owns everything with lifecycle: the address cache, the hook
//! records, the patch records, and the diagnostics trail. Construct it at
//! load, pass it to the modules that declare bindings, and drop it (or call
//! [`ScanSession::dispose_all`]) at unload — every hook is detached and
//! every patch restored together.
//!
//! All management operations (bind, install, enable, disable, dispose) are
//! expected on a single thread; nothing here is synchronized. Detours
//! themselves may run on any thread of the host process.

use tracing::debug;

use crate::binding::{
    self, Bindable, BindingDescriptor, BindingKind, BindingReport, BindingSource, DetourFn,
    ExternalRefProvider, PrimitiveValue, ScanMethod,
};
use crate::cache::{AddressCache, CacheBucket, NOT_FOUND};
use crate::diagnostics::{DiagnosticsReport, SigInfo, SigKind};
use crate::error::{Error, Result};
use crate::hooks::{HookBackend, HookId, HookManager, HookOptions, NoopHookBackend};
use crate::memory::{ModuleSections, ReadMemory, SectionKind, WriteMemory};
use crate::patch::{PatchId, PatchRegistry, PatchTarget};
use crate::scanner::PatternScanner;
use crate::signature::{Signature, parse_pattern};

pub struct ScanSession<M: ReadMemory + WriteMemory> {
    memory: M,
    sections: ModuleSections,
    cache: AddressCache,
    hooks: HookManager,
    patches: PatchRegistry,
    sig_infos: Vec<SigInfo>,
    reports: Vec<BindingReport>,
}

impl<M: ReadMemory + WriteMemory> ScanSession<M> {
    pub fn new(memory: M, sections: ModuleSections, backend: Box<dyn HookBackend>) -> Self {
        Self {
            memory,
            sections,
            cache: AddressCache::new(),
            hooks: HookManager::new(backend),
            patches: PatchRegistry::new(),
            sig_infos: Vec::new(),
            reports: Vec::new(),
        }
    }

    /// Session that declares hooks without arming them; for offline
    /// analysis of an image file.
    pub fn offline(memory: M, sections: ModuleSections) -> Self {
        Self::new(memory, sections, Box::new(NoopHookBackend))
    }

    pub fn base_address(&self) -> u64 {
        self.sections.base()
    }

    pub fn sections(&self) -> &ModuleSections {
        &self.sections
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut M {
        &mut self.memory
    }

    fn scanner(&self) -> PatternScanner<'_, M> {
        PatternScanner::new(&self.memory, &self.sections)
    }

    // ---- cached resolution -------------------------------------------------

    fn decode_cached(signature: &Signature, cached: u64) -> Result<u64> {
        if cached == NOT_FOUND {
            Err(Error::PatternNotFound(signature.text().to_string()))
        } else {
            Ok(cached)
        }
    }

    fn finish_resolution(
        &mut self,
        bucket: CacheBucket,
        signature: &Signature,
        offset: i64,
        kind: SigKind,
        result: Result<u64>,
    ) -> Result<u64> {
        match &result {
            Ok(address) => {
                self.cache.store(bucket, signature, offset, *address);
                self.sig_infos.push(SigInfo {
                    signature: signature.text().to_string(),
                    offset,
                    address: *address,
                    kind,
                    found: true,
                });
            }
            Err(Error::PatternNotFound(_)) | Err(Error::StaticResolutionFailed { .. }) => {
                self.cache.store(bucket, signature, offset, NOT_FOUND);
                self.sig_infos.push(SigInfo {
                    signature: signature.text().to_string(),
                    offset,
                    address: NOT_FOUND,
                    kind,
                    found: false,
                });
            }
            Err(_) => {}
        }
        result
    }

    /// Scan a section through the cache. All plain scans share one cache
    /// bucket, keyed by signature text alone.
    pub fn scan_section(&mut self, kind: SectionKind, signature: &Signature) -> Result<u64> {
        if let Some(cached) = self.cache.lookup(CacheBucket::Scan, signature, 0) {
            debug!("cache hit for {} -> {:#x}", signature.text(), cached);
            return Self::decode_cached(signature, cached);
        }
        let region = self.sections.region_of(kind);
        let result = self.scanner().scan(region, signature);
        self.finish_resolution(CacheBucket::Scan, signature, 0, SigKind::Text, result)
    }

    pub fn scan_text(&mut self, signature: &Signature) -> Result<u64> {
        self.scan_section(SectionKind::Text, signature)
    }

    pub fn scan_data(&mut self, signature: &Signature) -> Result<u64> {
        self.scan_section(SectionKind::Data, signature)
    }

    pub fn scan_rdata(&mut self, signature: &Signature) -> Result<u64> {
        self.scan_section(SectionKind::RData, signature)
    }

    pub fn scan_module(&mut self, signature: &Signature) -> Result<u64> {
        self.scan_section(SectionKind::Module, signature)
    }

    /// Resolve a signature the way the binding surface does.
    ///
    /// `Text` scans the code section and adds `offset` to the match;
    /// `Static` decodes the RIP-relative operand `offset` bytes into the
    /// match. Only offset-0 results are cached; a non-zero offset always
    /// rescans.
    pub fn resolve(&mut self, signature: &Signature, offset: i64, method: ScanMethod) -> Result<u64> {
        let (bucket, kind) = match method {
            ScanMethod::Text => (CacheBucket::Scan, SigKind::Text),
            ScanMethod::Static => (CacheBucket::Static, SigKind::Static),
        };
        if let Some(cached) = self.cache.lookup(bucket, signature, offset) {
            return Self::decode_cached(signature, cached);
        }

        let scanner = self.scanner();
        let result = match method {
            ScanMethod::Text => scanner
                .scan_text(signature)
                .map(|address| address.wrapping_add_signed(offset)),
            ScanMethod::Static => scanner
                .scan_text(signature)
                .and_then(|m| scanner.resolve_static(m, offset)),
        };
        self.finish_resolution(bucket, signature, offset, kind, result)
    }

    pub fn resolve_static_sig(&mut self, signature: &Signature, operand_offset: i64) -> Result<u64> {
        self.resolve(signature, operand_offset, ScanMethod::Static)
    }

    /// Cached text scan with the function-entry assertion applied to the
    /// match.
    pub fn scan_hook_target(&mut self, signature: &Signature) -> Result<u64> {
        let address = self.scan_text(signature)?;
        self.scanner().check_hook_target(address)?;
        Ok(address)
    }

    pub fn is_function_entry(&self, address: u64) -> bool {
        self.scanner().is_function_entry(address)
    }

    // ---- hooks -------------------------------------------------------------

    /// Install a hook at a resolved address. The address must pass the
    /// function-entry check; at most one live hook may exist per address.
    pub fn install_hook(
        &mut self,
        address: u64,
        detour: DetourFn,
        options: HookOptions,
    ) -> Result<HookId> {
        self.scanner().check_hook_target(address)?;
        self.hooks.install(address, detour.ptr(), detour.name(), options)
    }

    /// Resolve a signature and hook the match.
    pub fn install_hook_sig(
        &mut self,
        signature: &Signature,
        detour: DetourFn,
        options: HookOptions,
    ) -> Result<HookId> {
        let address = self.scan_text(signature)?;
        self.install_hook(address, detour, options)
    }

    pub fn enable_hook(&mut self, id: HookId) -> Result<()> {
        self.hooks.enable(id)
    }

    pub fn disable_hook(&mut self, id: HookId) -> Result<()> {
        self.hooks.disable(id)
    }

    pub fn dispose_hook(&mut self, id: HookId) -> Result<()> {
        self.hooks.dispose(id)
    }

    /// Trampoline address for calling the original of a live hook.
    pub fn hook_original(&self, id: HookId) -> Option<u64> {
        self.hooks.original(id)
    }

    /// Dispose every auto-dispose hook.
    pub fn dispose_all_hooks(&mut self) {
        self.hooks.dispose_all();
    }

    pub fn hooks(&self) -> &HookManager {
        &self.hooks
    }

    // ---- patches -----------------------------------------------------------

    /// Construct a patch from an address or a signature resolved through
    /// the cached module scan. The byte spec uses `??` for "keep original".
    pub fn create_patch(&mut self, target: PatchTarget, spec: &str) -> Result<PatchId> {
        let bytes = parse_pattern(spec)?;
        let (address, signature_text) = match target {
            PatchTarget::Address(address) => (address, None),
            PatchTarget::Signature(signature) => {
                let address = self.scan_module(&signature).map_err(|e| {
                    Error::PatchConstructionFailed(format!(
                        "signature {} unresolved: {e}",
                        signature.text()
                    ))
                })?;
                (address, Some(signature.text().to_string()))
            }
        };
        self.patches
            .create(&self.memory, address, &bytes, signature_text)
    }

    pub fn enable_patch(&mut self, id: PatchId) -> Result<()> {
        self.patches.enable(&mut self.memory, id)
    }

    pub fn disable_patch(&mut self, id: PatchId) -> Result<()> {
        self.patches.disable(&mut self.memory, id)
    }

    pub fn dispose_patch(&mut self, id: PatchId) -> Result<()> {
        self.patches.dispose(&mut self.memory, id)
    }

    pub fn dispose_all_patches(&mut self) {
        self.patches.dispose_all(&mut self.memory);
    }

    pub fn patches(&self) -> &PatchRegistry {
        &self.patches
    }

    // ---- binding -----------------------------------------------------------

    /// Run the binding pass for `target`.
    ///
    /// Every descriptor is resolved and assigned in declaration order. A
    /// required failure (or any hook/patch precondition violation) aborts
    /// the pass and leaves the target partially bound; optional misses are
    /// logged and skipped. The pass is meant to run once per target.
    pub fn bind<T: Bindable>(
        &mut self,
        target: &mut T,
        externals: &dyn ExternalRefProvider,
    ) -> Result<BindingReport> {
        let descriptors = T::bindings().into_descriptors();
        let detour_table = T::detours();
        let mut entries = Vec::with_capacity(descriptors.len());

        for descriptor in &descriptors {
            let address = match self.resolve_binding_source::<T>(descriptor, externals) {
                Ok(address) => address,
                Err(e) => {
                    entries.push(binding::report_entry(descriptor, None, false));
                    if descriptor.required || !e.is_soft() {
                        self.retain_report(BindingReport {
                            owner: T::NAME,
                            entries,
                        });
                        return Err(e);
                    }
                    binding::warn_optional(T::NAME, descriptor.member, &e);
                    continue;
                }
            };

            match self.apply_binding(target, descriptor, address, &detour_table) {
                Ok(()) => entries.push(binding::report_entry(descriptor, Some(address), true)),
                Err(e) => {
                    entries.push(binding::report_entry(descriptor, Some(address), false));
                    if descriptor.required || !e.is_soft() {
                        self.retain_report(BindingReport {
                            owner: T::NAME,
                            entries,
                        });
                        return Err(e);
                    }
                    binding::warn_optional(T::NAME, descriptor.member, &e);
                }
            }
        }

        let report = BindingReport {
            owner: T::NAME,
            entries,
        };
        self.retain_report(report.clone());
        Ok(report)
    }

    fn resolve_binding_source<T: Bindable>(
        &mut self,
        descriptor: &BindingDescriptor<T>,
        externals: &dyn ExternalRefProvider,
    ) -> Result<u64> {
        match &descriptor.source {
            BindingSource::Scan { signature, method } => {
                let signature = Signature::parse(signature)?;
                self.resolve(&signature, descriptor.offset, *method)
            }
            BindingSource::External => {
                let address = externals.resolve(T::NAME, descriptor.member).ok_or(
                    Error::ExternalReferenceMissing {
                        owner: T::NAME,
                        member: descriptor.member,
                    },
                )?;
                Ok(address.wrapping_add_signed(descriptor.offset))
            }
        }
    }

    fn apply_binding<T: Bindable>(
        &mut self,
        target: &mut T,
        descriptor: &BindingDescriptor<T>,
        address: u64,
        detour_table: &[DetourFn],
    ) -> Result<()> {
        match &descriptor.kind {
            BindingKind::Pointer { assign } | BindingKind::Function { assign } => {
                assign(target, address);
                Ok(())
            }
            BindingKind::Primitive { width, assign } => {
                let bytes = self.memory.read_bytes(address, width.size())?;
                assign(target, PrimitiveValue::from_le_bytes(&bytes, *width));
                Ok(())
            }
            BindingKind::Hook {
                shape,
                detour,
                options,
                assign,
            } => {
                let resolved =
                    binding::resolve_detour(descriptor.member, detour, *shape, detour_table)?;
                let id = self.install_hook(address, resolved, *options)?;
                assign(target, id);
                Ok(())
            }
        }
    }

    fn retain_report(&mut self, report: BindingReport) {
        self.reports.retain(|r| r.owner != report.owner);
        self.reports.push(report);
    }

    /// Report of the last binding pass for `owner`, if any.
    pub fn binding_report(&self, owner: &str) -> Option<&BindingReport> {
        self.reports.iter().find(|r| r.owner == owner)
    }

    /// Structural validation of a bound type: usable only if every declared
    /// function-pointer and hook member resolved.
    pub fn validate<T: Bindable>(&self) -> Result<()> {
        match self.binding_report(T::NAME) {
            Some(report) => report.validate(),
            None => Err(Error::StructuralValidationFailed(T::NAME)),
        }
    }

    // ---- teardown and diagnostics -----------------------------------------

    /// Arena teardown: restore every patch and detach every hook, including
    /// those that opted out of auto-disposal. Also runs on drop.
    pub fn dispose_all(&mut self) {
        self.patches.dispose_all(&mut self.memory);
        self.hooks.dispose_remaining();
    }

    /// Snapshot of everything this session resolved, installed, and
    /// patched. Never re-triggers a scan.
    pub fn diagnostics(&self) -> DiagnosticsReport {
        DiagnosticsReport::collect(
            self.sections.base(),
            &self.sig_infos,
            &self.reports,
            self.hooks.records(),
            self.patches.records(),
        )
    }
}

impl<M: ReadMemory + WriteMemory> Drop for ScanSession<M> {
    fn drop(&mut self) {
        self.dispose_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{BindingSet, DetourSpec, FuncPtr, NoExternalRefs, PrimitiveWidth};
    use crate::detour;
    use crate::memory::{CountingReader, ImageBuffer, MockModuleBuilder};

    type GetActorFn = unsafe extern "C" fn(u64) -> u64;
    type TickFn = unsafe extern "C" fn() -> u32;

    unsafe extern "C" fn tick_detour() -> u32 {
        7
    }

    /// Test image layout (offsets into .text):
    ///   0:  55 8B EC C3           function at section start
    ///   4:  CC
    ///   5:  48 8B 0D 00 01 00 00  RIP-relative load, disp 0x100 at +3
    ///   12: C3
    ///   13: CC
    ///   14: 40 57                 function entry (tick)
    ///   16: 01 00 00 00           u32 snapshot source
    fn build_module() -> (ImageBuffer, ModuleSections) {
        let mut text = vec![0x55, 0x8B, 0xEC, 0xC3, 0xCC];
        text.extend_from_slice(&[0x48, 0x8B, 0x0D]);
        text.extend_from_slice(&0x100i32.to_le_bytes());
        text.extend_from_slice(&[0xC3, 0xCC, 0x40, 0x57]);
        text.extend_from_slice(&60u32.to_le_bytes());
        MockModuleBuilder::new().text(&text).build()
    }

    fn sig(text: &str) -> Signature {
        Signature::parse(text).unwrap()
    }

    #[test]
    fn test_cache_scans_exactly_once() {
        let (image, sections) = build_module();
        let memory = CountingReader::new(image);
        let mut session = ScanSession::offline(memory, sections);

        let first = session.scan_text(&sig("55 8B EC")).unwrap();
        let reads = session.memory().reads();
        let second = session.scan_text(&sig("55 8B EC")).unwrap();
        assert_eq!(first, second);
        assert_eq!(session.memory().reads(), reads);
    }

    #[test]
    fn test_cache_remembers_not_found() {
        let (image, sections) = build_module();
        let memory = CountingReader::new(image);
        let mut session = ScanSession::offline(memory, sections);

        assert!(session.scan_text(&sig("DE AD 99 77")).is_err());
        let reads = session.memory().reads();
        assert!(matches!(
            session.scan_text(&sig("DE AD 99 77")),
            Err(Error::PatternNotFound(_))
        ));
        assert_eq!(session.memory().reads(), reads);
    }

    #[test]
    fn test_nonzero_offset_always_rescans() {
        let (image, sections) = build_module();
        let memory = CountingReader::new(image);
        let mut session = ScanSession::offline(memory, sections);

        let first = session
            .resolve(&sig("55 8B EC"), 2, ScanMethod::Text)
            .unwrap();
        let reads = session.memory().reads();
        let second = session
            .resolve(&sig("55 8B EC"), 2, ScanMethod::Text)
            .unwrap();
        assert_eq!(first, second);
        assert!(session.memory().reads() > reads);
    }

    #[test]
    fn test_static_resolution_through_session() {
        let (image, sections) = build_module();
        let mut session = ScanSession::offline(image, sections.clone());

        let resolved = session
            .resolve_static_sig(&sig("48 8B 0D ?? ?? ?? ??"), 3)
            .unwrap();
        // Displacement field at match+3, next instruction at match+7.
        assert_eq!(resolved, sections.text().start + 5 + 7 + 0x100);
    }

    #[test]
    fn test_text_offset_applied_after_scan() {
        let (image, sections) = build_module();
        let mut session = ScanSession::offline(image, sections.clone());
        let address = session
            .resolve(&sig("40 57"), 2, ScanMethod::Text)
            .unwrap();
        assert_eq!(address, sections.text().start + 16);
    }

    #[test]
    fn test_install_hook_rejects_misaligned_target() {
        let (image, sections) = build_module();
        let mut session = ScanSession::offline(image, sections.clone());
        let d = detour!(tick_detour: TickFn);

        // Mid-function address.
        let err = session
            .install_hook(sections.text().start + 1, d, HookOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidHookTarget(_)));

        // Proper entry.
        let id = session
            .install_hook_sig(&sig("40 57"), d, HookOptions::default())
            .unwrap();
        assert!(session.hook_original(id).is_some());

        // Same address again.
        assert!(matches!(
            session.install_hook(sections.text().start + 14, d, HookOptions::default()),
            Err(Error::DuplicateHook(_))
        ));
    }

    #[test]
    fn test_patch_by_signature_roundtrip() {
        let (image, sections) = build_module();
        let text_start = sections.text().start;
        let mut session = ScanSession::offline(image, sections);

        let id = session
            .create_patch(PatchTarget::Signature(sig("8B EC C3")), "90 ?? 90")
            .unwrap();
        session.enable_patch(id).unwrap();
        assert_eq!(
            session.memory().read_bytes(text_start, 4).unwrap(),
            vec![0x55, 0x90, 0xEC, 0x90]
        );
        session.disable_patch(id).unwrap();
        assert_eq!(
            session.memory().read_bytes(text_start, 4).unwrap(),
            vec![0x55, 0x8B, 0xEC, 0xC3]
        );
    }

    #[test]
    fn test_patch_unknown_signature_fails_construction() {
        let (image, sections) = build_module();
        let mut session = ScanSession::offline(image, sections);
        assert!(matches!(
            session.create_patch(PatchTarget::Signature(sig("11 22 33 44 55 66")), "90"),
            Err(Error::PatchConstructionFailed(_))
        ));
    }

    #[test]
    fn test_drop_restores_patches() {
        let (mut image, sections) = build_module();
        let text_start = sections.text().start;
        let before = image.read_bytes(text_start, 4).unwrap();
        {
            let mut session = ScanSession::offline(&mut image, sections);
            let id = session
                .create_patch(PatchTarget::Address(text_start), "90 90 90 90")
                .unwrap();
            session.enable_patch(id).unwrap();
        }
        assert_eq!(image.read_bytes(text_start, 4).unwrap(), before);
    }

    // ---- binding pass ------------------------------------------------------

    #[derive(Default)]
    struct GameApi {
        get_actor: Option<FuncPtr<GetActorFn>>,
        frame_base: u64,
        tick_hook: Option<HookId>,
        tick_rate: Option<u32>,
        ui_module: u64,
    }

    impl Bindable for GameApi {
        const NAME: &'static str = "GameApi";

        fn bindings() -> BindingSet<Self> {
            BindingSet::new()
                .function::<GetActorFn>("get_actor", "55 8B EC", |t: &mut GameApi, f| t.get_actor = Some(f))
                .required()
                .pointer("frame_base", "48 8B 0D ?? ?? ?? ??", |t, a| t.frame_base = a)
                .static_scan()
                .offset(3)
                .hook::<TickFn>("tick_hook", "40 57", |t, id| t.tick_hook = Some(id))
                .required()
                .primitive("tick_rate", "40 57", PrimitiveWidth::U32, |t, v| {
                    t.tick_rate = Some(v.as_u32())
                })
                .offset(2)
                .external_pointer("ui_module", |t, a| t.ui_module = a)
        }

        fn detours() -> Vec<DetourFn> {
            vec![detour!(tick_detour: TickFn)]
        }
    }

    struct UiRefs;

    impl ExternalRefProvider for UiRefs {
        fn resolve(&self, owner: &'static str, member: &'static str) -> Option<u64> {
            (owner == "GameApi" && member == "ui_module").then_some(0x7FF6_0000_1234)
        }
    }

    #[test]
    fn test_bind_assigns_all_kinds() {
        let (image, sections) = build_module();
        let text = sections.text().start;
        let mut session = ScanSession::offline(image, sections);
        let mut api = GameApi::default();

        let report = session.bind(&mut api, &UiRefs).unwrap();
        assert!(report.is_fully_bound());

        assert_eq!(api.get_actor.unwrap().address(), text);
        assert_eq!(api.frame_base, text + 5 + 7 + 0x100);
        assert!(api.tick_hook.is_some());
        assert_eq!(api.tick_rate, Some(60));
        assert_eq!(api.ui_module, 0x7FF6_0000_1234);

        assert!(session.validate::<GameApi>().is_ok());
        let hook = session.hooks().record(api.tick_hook.unwrap());
        assert_eq!(hook.address(), text + 14);
        assert_eq!(hook.detour_name(), "tick_detour");
        assert!(hook.is_enabled());
    }

    #[derive(Default)]
    struct MixedTarget {
        present: u64,
        missing: u64,
    }

    impl Bindable for MixedTarget {
        const NAME: &'static str = "MixedTarget";

        fn bindings() -> BindingSet<Self> {
            BindingSet::new()
                .pointer("present", "55 8B EC", |t: &mut MixedTarget, a| t.present = a)
                .required()
                .pointer("missing", "AA BB CC DD", |t, a| t.missing = a)
        }
    }

    #[test]
    fn test_optional_failure_leaves_member_unset() {
        let (image, sections) = build_module();
        let text = sections.text().start;
        let mut session = ScanSession::offline(image, sections);
        let mut target = MixedTarget::default();

        let report = session.bind(&mut target, &NoExternalRefs).unwrap();
        assert_eq!(target.present, text);
        assert_eq!(target.missing, 0);
        assert!(!report.is_fully_bound());

        let entry = report
            .entries
            .iter()
            .find(|e| e.member == "missing")
            .unwrap();
        assert!(!entry.success);
        assert!(entry.address.is_none());
    }

    #[derive(Default)]
    struct BrokenTarget {
        optional_first: u64,
        required_missing: u64,
    }

    impl Bindable for BrokenTarget {
        const NAME: &'static str = "BrokenTarget";

        fn bindings() -> BindingSet<Self> {
            BindingSet::new()
                .pointer("optional_first", "55 8B EC", |t: &mut BrokenTarget, a| t.optional_first = a)
                .pointer("required_missing", "AA BB CC DD", |t, a| t.required_missing = a)
                .required()
        }
    }

    #[test]
    fn test_required_failure_aborts_pass() {
        let (image, sections) = build_module();
        let text = sections.text().start;
        let mut session = ScanSession::offline(image, sections);
        let mut target = BrokenTarget::default();

        let err = session.bind(&mut target, &NoExternalRefs).unwrap_err();
        assert!(matches!(err, Error::PatternNotFound(_)));

        // Partially bound: members assigned before the failure keep their
        // values; the report is retained for diagnostics.
        assert_eq!(target.optional_first, text);
        assert_eq!(target.required_missing, 0);
        let report = session.binding_report("BrokenTarget").unwrap();
        assert_eq!(report.entries.len(), 2);
        assert!(!report.entries[1].success);
    }

    #[derive(Default)]
    struct OptionalFns {
        draw: Option<FuncPtr<GetActorFn>>,
    }

    impl Bindable for OptionalFns {
        const NAME: &'static str = "OptionalFns";

        fn bindings() -> BindingSet<Self> {
            BindingSet::new().function::<GetActorFn>("draw", "AA BB CC DD", |t, f| {
                t.draw = Some(f)
            })
        }
    }

    #[test]
    fn test_unresolved_function_fails_validation() {
        let (image, sections) = build_module();
        let mut session = ScanSession::offline(image, sections);
        let mut target = OptionalFns::default();

        session.bind(&mut target, &NoExternalRefs).unwrap();
        assert!(target.draw.is_none());
        assert!(matches!(
            session.validate::<OptionalFns>(),
            Err(Error::StructuralValidationFailed("OptionalFns"))
        ));
    }

    #[derive(Default)]
    struct ExplicitHookTarget {
        tick_hook: Option<HookId>,
    }

    impl Bindable for ExplicitHookTarget {
        const NAME: &'static str = "ExplicitHookTarget";

        fn bindings() -> BindingSet<Self> {
            BindingSet::new()
                .hook::<TickFn>("tick_hook", "40 57", |t: &mut ExplicitHookTarget, id| t.tick_hook = Some(id))
                .with_detour(DetourSpec::Explicit(detour!(tick_detour: TickFn)))
                .start_disabled()
                .required()
        }
    }

    #[test]
    fn test_explicit_detour_and_disabled_start() {
        let (image, sections) = build_module();
        let mut session = ScanSession::offline(image, sections);
        let mut target = ExplicitHookTarget::default();

        session.bind(&mut target, &NoExternalRefs).unwrap();
        let id = target.tick_hook.unwrap();
        assert!(!session.hooks().record(id).is_enabled());
        session.enable_hook(id).unwrap();
        assert!(session.hooks().record(id).is_enabled());
    }

    #[test]
    fn test_diagnostics_enumerable_without_rescan() {
        let (image, sections) = build_module();
        let memory = CountingReader::new(image);
        let mut session = ScanSession::offline(memory, sections);
        let mut api = GameApi::default();
        session.bind(&mut api, &UiRefs).unwrap();

        let reads = session.memory().reads();
        let report = session.diagnostics();
        assert_eq!(session.memory().reads(), reads);

        assert!(!report.signatures.is_empty());
        assert_eq!(report.bindings.len(), 1);
        assert_eq!(report.bindings[0].owner, "GameApi");
        assert_eq!(report.hooks.len(), 1);
        assert!(report.hooks[0].enabled);
    }
}
