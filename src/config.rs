//! Declarative build and assembly configuration
//!
//! These types are owned by the calling build-tool integration and treated as
//! immutable inputs for the duration of one archive build. They can be
//! deserialized from TOML or constructed directly.

use crate::error::*;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

/// Staging subdirectory name used when none is configured.
pub const DEFAULT_ASSEMBLY_NAME: &str = "maven";

/// How staged file permissions are carried into the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionMode {
    /// Keep the modes found on disk (or configured per file set) untouched.
    Keep,
    /// Ignore the on-disk modes and normalize to container-runtime defaults.
    Ignore,
}

impl Default for PermissionMode {
    fn default() -> Self {
        PermissionMode::Keep
    }
}

/// Compression applied to the final build-context archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
}

impl Default for Compression {
    fn default() -> Self {
        Compression::None
    }
}

impl Compression {
    /// File extension of the produced archive, including the `tar` part.
    pub fn extension(&self) -> &'static str {
        match self {
            Compression::None => "tar",
            Compression::Gzip => "tar.gz",
            Compression::Bzip2 => "tar.bz2",
        }
    }
}

/// A directory of files to stage into the assembly.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSet {
    /// Source directory, absolute or relative to the project base directory.
    pub directory: PathBuf,
    /// Include patterns, resolved as literal relative paths with wildcard
    /// characters trimmed.
    pub includes: Vec<String>,
    /// File names excluded from the final archive, matched by base name.
    pub excludes: Vec<String>,
    /// Subdirectory below the assembly name; `.` means none.
    pub output_directory: Option<PathBuf>,
    /// Octal mode string applied to every staged file of this set.
    pub file_mode: Option<String>,
}

/// A single explicitly listed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyFile {
    /// Source file, absolute or relative to the project base directory.
    pub source: PathBuf,
    /// Name under the assembly directory; defaults to the source base name.
    #[serde(default)]
    pub dest_name: Option<String>,
    /// Octal mode string.
    #[serde(default)]
    pub mode: Option<String>,
}

/// The set of files staged into the image, with a name, target in-image
/// directory, and owning user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyConfiguration {
    /// Staging subdirectory under the build directory.
    pub name: String,
    /// Absolute in-image path the assembly is copied to; defaults to `/<name>`.
    pub target_dir: Option<String>,
    /// In-image owner of the assembly; defaults to `root`.
    pub user: Option<String>,
    pub mode: PermissionMode,
    pub filesets: Vec<FileSet>,
    pub files: Vec<AssemblyFile>,
}

impl Default for AssemblyConfiguration {
    fn default() -> Self {
        AssemblyConfiguration {
            name: DEFAULT_ASSEMBLY_NAME.to_string(),
            target_dir: None,
            user: None,
            mode: PermissionMode::default(),
            filesets: Vec::new(),
            files: Vec::new(),
        }
    }
}

impl AssemblyConfiguration {
    /// In-image destination directory after defaulting.
    pub fn target_dir(&self) -> String {
        match &self.target_dir {
            Some(dir) if !dir.is_empty() => dir.clone(),
            _ => format!("/{}", self.name),
        }
    }

    pub fn user(&self) -> &str {
        self.user.as_deref().unwrap_or("root")
    }

    /// `name` and `target_dir` must not both be blank after defaulting.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() && self.target_dir().trim_matches('/').is_empty() {
            return Err(Error::MissingAssemblyName);
        }
        Ok(())
    }
}

/// Argument list for ENTRYPOINT/CMD/HEALTHCHECK, in shell or exec form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Arguments {
    Shell(String),
    Exec(Vec<String>),
}

impl Arguments {
    /// Docker-instruction rendering: exec form as a JSON-style array, shell
    /// form verbatim.
    pub fn render(&self) -> String {
        match self {
            Arguments::Shell(cmd) => cmd.clone(),
            Arguments::Exec(args) => {
                let quoted: Vec<String> = args
                    .iter()
                    .map(|a| {
                        format!("\"{}\"", a.replace('\\', "\\\\").replace('"', "\\\""))
                    })
                    .collect();
                format!("[{}]", quoted.join(","))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthCheck {
    /// `HEALTHCHECK NONE` disables any check inherited from the base image.
    pub none: bool,
    pub interval: Option<String>,
    pub timeout: Option<String>,
    pub start_period: Option<String>,
    pub retries: Option<u32>,
    pub cmd: Option<Arguments>,
}

/// Everything needed to synthesize a Dockerfile and archive the build context.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfiguration {
    /// Base image reference.
    pub from: String,
    /// User-supplied Dockerfile; when set, generation is skipped and the file
    /// is verified and interpolated instead.
    pub dockerfile: Option<PathBuf>,
    pub maintainer: Option<String>,
    pub workdir: Option<String>,
    pub env: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
    pub ports: Vec<String>,
    pub volumes: Vec<String>,
    pub run: Vec<String>,
    pub user: Option<String>,
    pub entrypoint: Option<Arguments>,
    pub cmd: Option<Arguments>,
    pub healthcheck: Option<HealthCheck>,
    pub compression: Compression,
    /// Coalesce consecutive RUN instructions into one to reduce layer count.
    pub optimise: bool,
    pub assembly: Option<AssemblyConfiguration>,
}

impl BuildConfiguration {
    pub fn from_toml(input: &str) -> Result<Self> {
        Ok(toml::from_str(input)?)
    }
}

/// Descriptor of the surrounding build-tool project.
#[derive(Debug, Clone, Default)]
pub struct Project {
    /// Project base directory; relative configuration paths resolve here.
    pub base_dir: PathBuf,
    /// Build output root, absolute or relative to `base_dir`.
    pub output_dir: PathBuf,
    /// Packaged application artifact included under the assembly name.
    pub artifact: Option<PathBuf>,
    /// Build-time properties interpolated into user-supplied Dockerfiles.
    pub properties: BTreeMap<String, String>,
}

impl Project {
    pub fn new(base_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Project {
            base_dir: base_dir.into(),
            output_dir: output_dir.into(),
            artifact: None,
            properties: BTreeMap::new(),
        }
    }

    /// Absolute build output root.
    pub fn output_root(&self) -> PathBuf {
        crate::path::absolutize(&self.base_dir, &self.output_dir)
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        crate::path::absolutize(&self.base_dir, path)
    }
}
