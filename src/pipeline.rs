//! Orchestration of the assembly-to-archive pipeline
//!
//! One [BuildContextPipeline::create_archive] call resolves the build
//! directories, stages the assembly, generates or verifies the Dockerfile,
//! folds the customizer chain and hands off to the tar builder. All IO
//! failures in that sequence surface as a single
//! [Error::ArchiveConstruction](crate::error::Error::ArchiveConstruction)
//! naming the Dockerfile and build directory involved.

use crate::{
    archive::{self, apply_customizers, ArchiveAssembly, Customizer},
    config::{BuildConfiguration, Compression, PermissionMode, Project},
    dockerfile,
    error::*,
    path,
    stage::{self, StagedAssembly, StagedEntry},
    BuildDirectories, ImageName,
};
use std::{
    fs,
    path::{Path, PathBuf},
};

pub struct BuildContextPipeline<'a> {
    project: &'a Project,
}

impl<'a> BuildContextPipeline<'a> {
    pub fn new(project: &'a Project) -> Self {
        BuildContextPipeline { project }
    }

    /// Build the complete build-context archive for `image`.
    ///
    /// Returns the path of `<tmpDir>/docker-build.{tar|tar.gz|tar.bz2}`.
    pub fn create_archive<'c>(
        &self,
        image: &ImageName,
        build: &BuildConfiguration,
        final_customizer: Option<Customizer<'c>>,
    ) -> Result<PathBuf> {
        let dirs = BuildDirectories::resolve(image, &self.project.output_dir, &self.project.base_dir)
            .ensure_created()?;
        self.run(&dirs, build, final_customizer)
            .map_err(|e| wrap_io(e, dockerfile_name(build), dirs.build_dir()))
    }

    fn run<'c>(
        &self,
        dirs: &BuildDirectories,
        build: &BuildConfiguration,
        final_customizer: Option<Customizer<'c>>,
    ) -> Result<PathBuf> {
        let staged = match &build.assembly {
            Some(assembly) => stage::stage(self.project, assembly, dirs)?,
            None => StagedAssembly::default(),
        };

        let dockerfile_path = dirs.build_dir().join("Dockerfile");
        match &build.dockerfile {
            Some(user_dockerfile) => {
                let source = self.project.resolve(user_dockerfile);
                if !source.is_file() {
                    return Err(Error::MissingDockerfile(source));
                }
                if let Some(assembly) = &build.assembly {
                    dockerfile::verify(&source, &assembly.name)?;
                }
                let content = fs::read_to_string(&source)?;
                fs::write(
                    &dockerfile_path,
                    dockerfile::interpolate(&content, &self.project.properties),
                )?;
            }
            None => {
                fs::write(&dockerfile_path, dockerfile::generate(build))?;
            }
        }

        let mut customizers: Vec<Customizer> = Vec::new();
        customizers.push(Box::new(move |a| {
            Ok(a.include_file(&dockerfile_path, "Dockerfile"))
        }));
        if let Some(customizer) = final_customizer {
            customizers.push(customizer);
        }
        if let Some(assembly) = &build.assembly {
            if let Some(artifact) = &self.project.artifact {
                let source = self.project.resolve(artifact);
                if source.is_file() {
                    let destination = Path::new(&assembly.name)
                        .join(source.file_name().expect("is_file implies a file name"));
                    customizers.push(Box::new(move |a| {
                        Ok(a.include_file(&source, &destination))
                    }));
                } else {
                    log::debug!("No build artifact at {}, skipping", source.display());
                }
            }
        }
        // Exclusions and configured permissions go last so they always win
        // over earlier-added content.
        let excludes = staged.excludes.clone();
        let permissions = staged_permissions(&staged, dirs.build_dir());
        customizers.push(Box::new(move |mut a| {
            for name in &excludes {
                a = a.exclude_file(name.clone());
            }
            for (archive_path, mode) in &permissions {
                a = a.set_permissions(archive_path.clone(), mode.clone());
            }
            Ok(a)
        }));

        let assembly_acc = apply_customizers(ArchiveAssembly::new(), &customizers)?;
        let policy = build
            .assembly
            .as_ref()
            .map(|a| a.mode)
            .unwrap_or_default();
        archive::create_archive(dirs.build_dir(), dirs, build.compression, &assembly_acc, policy)
    }

    /// Stage the assembly and return the source→destination pairs for
    /// watch-mode change detection.
    pub fn assembly_files(
        &self,
        image: &ImageName,
        build: &BuildConfiguration,
    ) -> Result<Vec<StagedEntry>> {
        let dirs = BuildDirectories::resolve(image, &self.project.output_dir, &self.project.base_dir)
            .ensure_created()?;
        match &build.assembly {
            Some(assembly) => Ok(stage::stage(self.project, assembly, &dirs)?.entries),
            None => Ok(Vec::new()),
        }
    }

    /// Archive only the given changed entries for an incremental rebuild.
    ///
    /// Entries are re-rooted relative to `assembly_dir` into a dedicated
    /// `changed-files` staging directory which is recreated on every call.
    /// The result is always an uncompressed `changed-files.tar`.
    pub fn create_changed_files_archive(
        &self,
        entries: &[StagedEntry],
        assembly_dir: &Path,
        image: &ImageName,
    ) -> Result<PathBuf> {
        let dirs = BuildDirectories::resolve(image, &self.project.output_dir, &self.project.base_dir)
            .ensure_created()?;
        let changed_dir = dirs.tmp_dir().join("changed-files");
        if changed_dir.exists() {
            fs::remove_dir_all(&changed_dir)?;
        }
        fs::create_dir_all(&changed_dir)
            .map_err(|_| Error::DirectoryCreation(changed_dir.clone()))?;

        for entry in entries {
            let relative = match path::relative_to(assembly_dir, &entry.destination) {
                Some(relative) => relative,
                None => {
                    log::warn!(
                        "Changed file {} is not below {}, skipping",
                        entry.destination.display(),
                        assembly_dir.display()
                    );
                    continue;
                }
            };
            let target = changed_dir.join(relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .map_err(|_| Error::DirectoryCreation(parent.to_path_buf()))?;
            }
            fs::copy(&entry.source, &target).map_err(|e| Error::Copy {
                from: entry.source.clone(),
                to: target,
                source: e,
            })?;
        }

        let archive_path = dirs.tmp_dir().join("changed-files.tar");
        archive::write_archive(
            &changed_dir,
            &archive_path,
            Compression::None,
            &ArchiveAssembly::new(),
            PermissionMode::Keep,
        )?;
        Ok(archive_path)
    }
}

fn dockerfile_name(build: &BuildConfiguration) -> String {
    build
        .dockerfile
        .as_ref()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Dockerfile".to_string())
}

/// Configured staged permissions keyed by archive-relative POSIX path.
fn staged_permissions(staged: &StagedAssembly, build_dir: &Path) -> Vec<(String, String)> {
    staged
        .permissions
        .iter()
        .filter_map(|(destination, mode)| {
            let relative = path::relative_to(build_dir, destination)?;
            let mode = mode.as_ref()?;
            Some((path::to_posix(&relative), mode.clone()))
        })
        .collect()
}

fn wrap_io(error: Error, dockerfile: String, build_dir: &Path) -> Error {
    match error {
        e @ Error::UnknownIo(_) | e @ Error::Copy { .. } | e @ Error::DirectoryCreation(_) => {
            Error::ArchiveConstruction {
                dockerfile,
                dir: build_dir.to_path_buf(),
                source: Box::new(e),
            }
        }
        other => other,
    }
}
