use super::ArchiveAssembly;
use crate::{
    config::{Compression, PermissionMode},
    error::*,
    path, permission, BuildDirectories,
};
use bzip2::write::BzEncoder;
use flate2::write::GzEncoder;
use std::{
    fs, io,
    path::{Path, PathBuf},
    time::SystemTime,
};
use walkdir::WalkDir;

/// One flattened, permission-resolved archive entry. Built fresh per build,
/// never persisted.
#[derive(Debug)]
struct TarEntryPlan {
    source: PathBuf,
    archive_path: String,
    mode: u32,
    size: u64,
    mtime: u64,
}

/// Serialize `input_dir` plus the customizer-contributed content into
/// `<tmpDir>/docker-build.<ext>`.
///
/// On a write failure the partially written archive stays on disk; treating
/// or removing it is the caller's responsibility.
pub fn create_archive(
    input_dir: &Path,
    dirs: &BuildDirectories,
    compression: Compression,
    assembly: &ArchiveAssembly,
    policy: PermissionMode,
) -> Result<PathBuf> {
    let archive_path = dirs
        .tmp_dir()
        .join(format!("docker-build.{}", compression.extension()));
    write_archive(input_dir, &archive_path, compression, assembly, policy)?;
    Ok(archive_path)
}

/// Serialize `input_dir` into an archive at an explicit output path.
pub fn write_archive(
    input_dir: &Path,
    archive_path: &Path,
    compression: Compression,
    assembly: &ArchiveAssembly,
    policy: PermissionMode,
) -> Result<()> {
    if !input_dir.is_dir() {
        return Err(Error::NotADirectory(input_dir.to_path_buf()));
    }
    materialize_includes(input_dir, assembly)?;
    let plans = plan_entries(input_dir, assembly, policy)?;

    let file = fs::File::create(archive_path)?;
    match compression {
        Compression::None => {
            write_entries(file, &plans)?;
        }
        Compression::Gzip => {
            let encoder = GzEncoder::new(file, flate2::Compression::default());
            write_entries(encoder, &plans)?.finish()?;
        }
        Compression::Bzip2 => {
            let encoder = BzEncoder::new(file, bzip2::Compression::default());
            write_entries(encoder, &plans)?.finish()?;
        }
    }
    log::debug!("Created archive {}", archive_path.display());
    Ok(())
}

/// Copy customizer-included files into the tree. A destination that already
/// exists is never overwritten, so re-running the chain is a no-op.
fn materialize_includes(input_dir: &Path, assembly: &ArchiveAssembly) -> Result<()> {
    for (source, destination) in assembly.includes() {
        let target = input_dir.join(destination);
        if target.exists() {
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .map_err(|_| Error::DirectoryCreation(parent.to_path_buf()))?;
        }
        fs::copy(source, &target).map_err(|e| Error::Copy {
            from: source.clone(),
            to: target,
            source: e,
        })?;
    }
    Ok(())
}

fn plan_entries(
    input_dir: &Path,
    assembly: &ArchiveAssembly,
    policy: PermissionMode,
) -> Result<Vec<TarEntryPlan>> {
    let mut plans = Vec::new();
    let walk = WalkDir::new(input_dir).sort_by(|a, b| a.file_name().cmp(b.file_name()));
    for entry in walk {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if assembly.is_excluded(entry.path()) {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(input_dir)
            .expect("walkdir yields paths under its root");
        let archive_path = path::to_posix(relative);
        let metadata = entry.metadata()?;
        let mode = match assembly.permission_for(&archive_path) {
            Some(octal) => permission::parse_mode(octal)?,
            None => file_mode(&metadata),
        };
        plans.push(TarEntryPlan {
            source: entry.path().to_path_buf(),
            archive_path,
            mode: permission::apply(relative, mode, policy),
            size: metadata.len(),
            mtime: mtime_secs(&metadata),
        });
    }
    Ok(plans)
}

#[cfg(unix)]
fn file_mode(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn file_mode(_metadata: &fs::Metadata) -> u32 {
    0o644
}

fn mtime_secs(metadata: &fs::Metadata) -> u64 {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn write_entries<W: io::Write>(writer: W, plans: &[TarEntryPlan]) -> Result<W> {
    let mut builder = tar::Builder::new(writer);
    for plan in plans {
        let mut header = tar::Header::new_gnu();
        header.set_size(plan.size);
        header.set_mode(plan.mode);
        header.set_mtime(plan.mtime);
        header.set_cksum();
        let file = fs::File::open(&plan.source)?;
        // append_data falls back to long-name extension records for paths
        // exceeding the header field
        builder.append_data(&mut header, &plan.archive_path, file)?;
    }
    Ok(builder.into_inner()?)
}
