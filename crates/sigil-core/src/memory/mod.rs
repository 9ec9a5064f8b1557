pub mod image;
#[cfg(target_os = "windows")]
pub mod local;
mod reader;
mod region;
mod sections;

#[cfg(test)]
pub mod mock;

pub use image::ImageBuffer;
#[cfg(target_os = "windows")]
pub use local::LocalModule;
pub use reader::{ReadMemory, WriteMemory};
pub use region::MemoryRegion;
pub use sections::{ModuleSections, SectionKind};

#[cfg(test)]
pub use mock::{CountingReader, MockModuleBuilder};
