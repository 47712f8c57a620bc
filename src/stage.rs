//! Staging of configured file sets into the build directory tree
//!
//! Materializes every configured file set and single file under
//! `<buildDir>/<assemblyName>/...` and records the configured permission for
//! each staged destination. The result also carries the source→destination
//! pairs consumed by watch-mode change detection.

use crate::{
    config::{AssemblyConfiguration, Project},
    error::*,
    BuildDirectories,
};
use std::{
    collections::{BTreeMap, HashSet},
    fs,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

/// One materialized file, source and staged destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedEntry {
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// Result of staging one assembly configuration.
#[derive(Debug, Default)]
pub struct StagedAssembly {
    /// Source→destination pairs for every materialized file (watch mode record).
    pub entries: Vec<StagedEntry>,
    /// Staged destination → configured octal mode string. `None` entries are
    /// legal and mean "use the default permission policy".
    pub permissions: BTreeMap<PathBuf, Option<String>>,
    /// Accumulated exclude patterns of all file sets, matched downstream by
    /// base file name.
    pub excludes: Vec<String>,
}

/// Materialize the assembly into `<buildDir>/<assemblyName>`.
///
/// Missing file-set sources are skipped, not errors. Within one invocation the
/// first copy to a destination wins; re-invocation overwrites.
pub fn stage(
    project: &Project,
    assembly: &AssemblyConfiguration,
    dirs: &BuildDirectories,
) -> Result<StagedAssembly> {
    assembly.validate()?;
    let staging_root = dirs.build_dir().join(&assembly.name);
    let mut staged = StagedAssembly::default();
    let mut written = HashSet::new();

    for fileset in &assembly.filesets {
        let source_dir = project.resolve(&fileset.directory);
        let dest_parent = match &fileset.output_directory {
            Some(sub) if sub != Path::new(".") => staging_root.join(sub),
            _ => staging_root.clone(),
        };
        fs::create_dir_all(&dest_parent)
            .map_err(|_| Error::DirectoryCreation(dest_parent.clone()))?;

        for include in &fileset.includes {
            // Includes resolve as literal relative paths with wildcard
            // characters trimmed, not as glob patterns.
            let literal = include.trim_matches(|c| c == '*' || c == '?');
            let source = source_dir.join(literal);
            if !source.exists() {
                log::debug!("Skipping non-existing file set source {}", source.display());
                continue;
            }
            let base_name = match source.file_name() {
                Some(name) => name.to_os_string(),
                None => continue,
            };
            let destination = dest_parent.join(base_name);
            if source.is_dir() {
                copy_dir(&source, &destination, &mut written, &mut staged.entries)?;
            } else {
                copy_file(&source, &destination, &mut written)?;
                staged.entries.push(StagedEntry {
                    source: source.clone(),
                    destination: destination.clone(),
                });
            }
            staged
                .permissions
                .insert(destination, fileset.file_mode.clone());
        }
        staged.excludes.extend(fileset.excludes.iter().cloned());
    }

    for file in &assembly.files {
        let source = project.resolve(&file.source);
        if !source.exists() {
            log::debug!("Skipping non-existing assembly file {}", source.display());
            continue;
        }
        let dest_name = match &file.dest_name {
            Some(name) => PathBuf::from(name),
            None => match source.file_name() {
                Some(name) => PathBuf::from(name),
                None => continue,
            },
        };
        let destination = staging_root.join(dest_name);
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|_| Error::DirectoryCreation(parent.to_path_buf()))?;
        }
        copy_file(&source, &destination, &mut written)?;
        staged.entries.push(StagedEntry {
            source,
            destination: destination.clone(),
        });
        staged.permissions.insert(destination, file.mode.clone());
    }

    Ok(staged)
}

/// Copy a single file unless this build already wrote the destination.
fn copy_file(source: &Path, destination: &Path, written: &mut HashSet<PathBuf>) -> Result<()> {
    if !written.insert(destination.to_path_buf()) {
        log::debug!(
            "Destination {} already staged in this build, keeping first copy",
            destination.display()
        );
        return Ok(());
    }
    fs::copy(source, destination).map_err(|e| Error::Copy {
        from: source.to_path_buf(),
        to: destination.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

fn copy_dir(
    source: &Path,
    destination: &Path,
    written: &mut HashSet<PathBuf>,
    entries: &mut Vec<StagedEntry>,
) -> Result<()> {
    for entry in WalkDir::new(source).sort_by(|a, b| a.file_name().cmp(b.file_name())) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .expect("walkdir yields paths under its root");
        let target = destination.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|_| Error::DirectoryCreation(target.clone()))?;
        } else {
            copy_file(entry.path(), &target, written)?;
            entries.push(StagedEntry {
                source: entry.path().to_path_buf(),
                destination: target,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::FileSet, ImageName};

    fn fixture() -> (tempfile::TempDir, Project, BuildDirectories) {
        let tmp = tempfile::tempdir().unwrap();
        let project = Project::new(tmp.path(), "target");
        let image = ImageName::parse("app:1").unwrap();
        let dirs = BuildDirectories::resolve(&image, Path::new("target"), tmp.path())
            .ensure_created()
            .unwrap();
        (tmp, project, dirs)
    }

    #[test]
    fn stages_single_include_and_records_mode() {
        let (tmp, project, dirs) = fixture();
        fs::create_dir(tmp.path().join("src")).unwrap();
        fs::write(tmp.path().join("src/app.jar"), b"jar").unwrap();

        let assembly = AssemblyConfiguration {
            filesets: vec![FileSet {
                directory: PathBuf::from("src"),
                includes: vec!["app.jar".to_string()],
                file_mode: Some("0755".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        };
        let staged = stage(&project, &assembly, &dirs).unwrap();

        let dest = dirs.build_dir().join("maven/app.jar");
        assert!(dest.is_file());
        assert_eq!(staged.permissions.get(&dest).unwrap().as_deref(), Some("0755"));
        assert_eq!(staged.entries.len(), 1);
        assert_eq!(staged.entries[0].destination, dest);
    }

    #[test]
    fn include_patterns_are_literal_paths() {
        let (tmp, project, dirs) = fixture();
        fs::create_dir(tmp.path().join("src")).unwrap();
        fs::write(tmp.path().join("src/app.jar"), b"jar").unwrap();

        // Wildcard characters are trimmed, the remainder is a literal path;
        // "*.jar" therefore looks for a file named ".jar" and finds nothing.
        let assembly = AssemblyConfiguration {
            filesets: vec![FileSet {
                directory: PathBuf::from("src"),
                includes: vec!["*.jar".to_string(), "app.jar*".to_string()],
                ..Default::default()
            }],
            ..Default::default()
        };
        let staged = stage(&project, &assembly, &dirs).unwrap();
        assert_eq!(staged.entries.len(), 1);
        assert!(dirs.build_dir().join("maven/app.jar").is_file());
    }

    #[test]
    fn missing_source_is_skipped() {
        let (_tmp, project, dirs) = fixture();
        let assembly = AssemblyConfiguration {
            filesets: vec![FileSet {
                directory: PathBuf::from("no-such-dir"),
                includes: vec!["app.jar".to_string()],
                ..Default::default()
            }],
            ..Default::default()
        };
        let staged = stage(&project, &assembly, &dirs).unwrap();
        assert!(staged.entries.is_empty());
        // The configured mode of a skipped entry is not recorded either
        assert!(staged.permissions.is_empty());
    }

    #[test]
    fn missing_single_file_is_skipped() {
        let (_tmp, project, dirs) = fixture();
        let assembly = AssemblyConfiguration {
            files: vec![crate::config::AssemblyFile {
                source: PathBuf::from("no-such.jar"),
                dest_name: None,
                mode: None,
            }],
            ..Default::default()
        };
        let staged = stage(&project, &assembly, &dirs).unwrap();
        assert!(staged.entries.is_empty());
        assert!(staged.permissions.is_empty());
    }

    #[test]
    fn first_copy_wins_within_one_build() {
        let (tmp, project, dirs) = fixture();
        fs::create_dir(tmp.path().join("a")).unwrap();
        fs::create_dir(tmp.path().join("b")).unwrap();
        fs::write(tmp.path().join("a/same.txt"), b"first").unwrap();
        fs::write(tmp.path().join("b/same.txt"), b"second").unwrap();

        let fileset = |dir: &str, mode: &str| FileSet {
            directory: PathBuf::from(dir),
            includes: vec!["same.txt".to_string()],
            file_mode: Some(mode.to_string()),
            ..Default::default()
        };
        let assembly = AssemblyConfiguration {
            filesets: vec![fileset("a", "0644"), fileset("b", "0755")],
            ..Default::default()
        };
        let staged = stage(&project, &assembly, &dirs).unwrap();

        let dest = dirs.build_dir().join("maven/same.txt");
        assert_eq!(fs::read(&dest).unwrap(), b"first");
        // Last-recorded permission wins in the map even though the file
        // content was not re-copied
        assert_eq!(staged.permissions.get(&dest).unwrap().as_deref(), Some("0755"));
    }

    #[test]
    fn directory_sources_are_copied_recursively() {
        let (tmp, project, dirs) = fixture();
        fs::create_dir_all(tmp.path().join("classes/com/example")).unwrap();
        fs::write(tmp.path().join("classes/com/example/Main.class"), b"clazz").unwrap();

        let assembly = AssemblyConfiguration {
            filesets: vec![FileSet {
                directory: PathBuf::from("."),
                includes: vec!["classes".to_string()],
                output_directory: Some(PathBuf::from("app")),
                ..Default::default()
            }],
            ..Default::default()
        };
        let staged = stage(&project, &assembly, &dirs).unwrap();
        assert!(dirs
            .build_dir()
            .join("maven/app/classes/com/example/Main.class")
            .is_file());
        assert_eq!(staged.entries.len(), 1);
    }

    #[test]
    fn dot_output_directory_is_elided() {
        let (tmp, project, dirs) = fixture();
        fs::write(tmp.path().join("run.sh"), b"#!/bin/sh").unwrap();
        let assembly = AssemblyConfiguration {
            filesets: vec![FileSet {
                directory: PathBuf::from("."),
                includes: vec!["run.sh".to_string()],
                output_directory: Some(PathBuf::from(".")),
                ..Default::default()
            }],
            ..Default::default()
        };
        stage(&project, &assembly, &dirs).unwrap();
        assert!(dirs.build_dir().join("maven/run.sh").is_file());
    }

    #[test]
    fn single_files_honor_dest_name() {
        let (tmp, project, dirs) = fixture();
        fs::write(tmp.path().join("artifact-1.0.jar"), b"jar").unwrap();
        let assembly = AssemblyConfiguration {
            files: vec![crate::config::AssemblyFile {
                source: PathBuf::from("artifact-1.0.jar"),
                dest_name: Some("app.jar".to_string()),
                mode: Some("0644".to_string()),
            }],
            ..Default::default()
        };
        let staged = stage(&project, &assembly, &dirs).unwrap();
        let dest = dirs.build_dir().join("maven/app.jar");
        assert!(dest.is_file());
        assert_eq!(staged.permissions.get(&dest).unwrap().as_deref(), Some("0644"));
    }

    #[test]
    fn excludes_are_accumulated_in_order() {
        let (tmp, project, dirs) = fixture();
        fs::create_dir(tmp.path().join("src")).unwrap();
        fs::write(tmp.path().join("src/app.jar"), b"jar").unwrap();
        let fileset = |excludes: &[&str]| FileSet {
            directory: PathBuf::from("src"),
            includes: vec!["app.jar".to_string()],
            excludes: excludes.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        };
        let assembly = AssemblyConfiguration {
            filesets: vec![fileset(&["a.txt"]), fileset(&["b.txt"])],
            ..Default::default()
        };
        let staged = stage(&project, &assembly, &dirs).unwrap();
        assert_eq!(staged.excludes, vec!["a.txt".to_string(), "b.txt".to_string()]);
    }
}
