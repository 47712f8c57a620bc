//! buildctx
//! ========
//!
//! Assembles a container build context from a declarative configuration:
//! staged file sets, a generated or verified Dockerfile, and a deterministic
//! tar (optionally gzip/bzip2) archive ready for submission to a build daemon.

pub mod archive;
pub mod config;
pub mod dockerfile;
pub mod error;
pub mod pipeline;
pub mod stage;

mod build_dirs;
mod image_name;
mod path;
mod permission;

pub use build_dirs::BuildDirectories;
pub use image_name::ImageName;
pub use permission::normalize;
