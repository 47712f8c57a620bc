use crate::{error::*, path, ImageName};
use std::{fs, path::{Path, PathBuf}};

/// Working directories for one image build, derived deterministically from the
/// image name and the project output root:
/// `<root>/docker/<image-with-colon-replaced-by-slash>/{build,work,tmp}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildDirectories {
    build: PathBuf,
    work: PathBuf,
    tmp: PathBuf,
}

impl BuildDirectories {
    pub fn resolve(image: &ImageName, output_root: &Path, base_dir: &Path) -> Self {
        let root = path::absolutize(base_dir, output_root)
            .join("docker")
            .join(image.path_segment());
        BuildDirectories {
            build: root.join("build"),
            work: root.join("work"),
            tmp: root.join("tmp"),
        }
    }

    /// Staged assembly tree and generated Dockerfile live here.
    pub fn build_dir(&self) -> &Path {
        &self.build
    }

    pub fn work_dir(&self) -> &Path {
        &self.work
    }

    /// Final archive and changed-files staging live here.
    pub fn tmp_dir(&self) -> &Path {
        &self.tmp
    }

    /// Create all three directories. Must succeed before any staging IO;
    /// a failure is fatal and never retried.
    pub fn ensure_created(self) -> Result<Self> {
        for dir in [&self.build, &self.work, &self.tmp].iter().copied() {
            fs::create_dir_all(dir).map_err(|_| Error::DirectoryCreation(dir.clone()))?;
        }
        Ok(self)
    }
}
