//! Build-context archive construction
//!
//! [ArchiveAssembly] accumulates included files, permission overrides and
//! exclusions; a chain of [Customizer]s transforms it in registration order;
//! [create_archive] streams the result as a (optionally compressed) tar.

mod customizer;
mod tar_builder;

pub use customizer::{apply_customizers, ArchiveAssembly, Customizer};
pub use tar_builder::{create_archive, write_archive};
