//! Unix permission normalization for archive entries
//!
//! Container runtimes expect build-context contents to be readable and
//! traversable by any user, so the default policy rewrites modes to at least
//! `r-x` for group and other while stripping world-write and the
//! setuid/setgid/sticky bits.

use crate::{config::PermissionMode, error::*};
use std::path::Path;

/// Normalize a raw Unix mode: mask to `0o755`, then force the execute bit.
///
/// Pure; idempotent by construction.
pub fn normalize(mode: u32) -> u32 {
    (mode & 0o755) | 0o111
}

/// Apply the configured permission policy to a file's mode.
///
/// Under [PermissionMode::Keep] the mode passes through untouched. Under
/// [PermissionMode::Ignore] the mode is normalized, with a diagnostic when the
/// value actually changed.
pub fn apply(path: &Path, mode: u32, policy: PermissionMode) -> u32 {
    match policy {
        PermissionMode::Keep => mode,
        PermissionMode::Ignore => {
            let normalized = normalize(mode);
            if normalized != mode {
                log::debug!(
                    "Rewriting permissions of {} from {:o} to {:o}",
                    path.display(),
                    mode,
                    normalized
                );
            }
            normalized
        }
    }
}

/// Parse an octal mode string, e.g. `"0755"`.
///
/// Octal strings are the interchange type for file modes everywhere in this
/// crate; symbolic notation is never accepted.
pub fn parse_mode(mode: &str) -> Result<u32> {
    u32::from_str_radix(mode, 8).map_err(|_| Error::InvalidFileMode(mode.to_string()))
}
