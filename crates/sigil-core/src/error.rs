use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Pattern not found: {0}")]
    PatternNotFound(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Address {0:#x} is not a valid hook target")]
    InvalidHookTarget(u64),

    #[error("Address {0:#x} is already hooked")]
    DuplicateHook(u64),

    #[error("Hook at {0:#x} was already disposed")]
    HookDisposed(u64),

    #[error("Detour resolution for {member}: found {candidates} compatible candidates")]
    DetourAmbiguous {
        member: &'static str,
        candidates: usize,
    },

    #[error("Detour \"{name}\" does not match the declared hook signature")]
    DetourIncompatible { name: String },

    #[error("Structure {0} has unresolved function bindings")]
    StructuralValidationFailed(&'static str),

    #[error("Patch construction failed: {0}")]
    PatchConstructionFailed(String),

    #[error("Static address resolution failed at {address:#x}: {message}")]
    StaticResolutionFailed { address: u64, message: String },

    #[error("No external reference registered for {owner}.{member}")]
    ExternalReferenceMissing {
        owner: &'static str,
        member: &'static str,
    },

    #[error("Failed to read memory at address {address:#x}: {message}")]
    MemoryReadFailed { address: u64, message: String },

    #[error("Failed to write memory at address {address:#x}: {message}")]
    MemoryWriteFailed { address: u64, message: String },

    #[error("Failed to parse module image: {0}")]
    ModuleParse(String),

    #[error("Hook backend error: {0}")]
    HookBackend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether a binding pass may downgrade this failure to a warning when
    /// the descriptor is not `required`. Hook and patch construction errors
    /// never qualify; they indicate a violated precondition.
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            Error::PatternNotFound(_)
                | Error::StaticResolutionFailed { .. }
                | Error::ExternalReferenceMissing { .. }
        )
    }
}
