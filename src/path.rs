//! Path rules shared by staging and archiving
//!
//! Archive entry names are always POSIX style (`/` separated) regardless of
//! the platform the build runs on.

use std::path::{Component, Path, PathBuf};

/// Render a relative path with `/` separators for use as a tar entry name.
pub fn to_posix(path: &Path) -> String {
    let mut out = String::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => {
                if !out.is_empty() {
                    out.push('/');
                }
                out.push_str(&part.to_string_lossy());
            }
            Component::CurDir => {}
            _ => {
                if !out.is_empty() {
                    out.push('/');
                }
                out.push_str(&component.as_os_str().to_string_lossy());
            }
        }
    }
    out
}

/// Path of `target` relative to `base`, or `None` if `target` is not under `base`.
pub fn relative_to(base: &Path, target: &Path) -> Option<PathBuf> {
    target.strip_prefix(base).ok().map(|p| p.to_path_buf())
}

/// Resolve a possibly relative path against a base directory.
pub fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
