use crate::error::*;
use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
};

/// Accumulator for archive customization, passed by value through the
/// customizer chain.
///
/// Collaborators may add files under a destination name, override an entry's
/// permission, or exclude files by base name, without touching the tree-walk
/// and serialization logic.
#[derive(Debug, Clone, Default)]
pub struct ArchiveAssembly {
    includes: Vec<(PathBuf, PathBuf)>,
    permissions: BTreeMap<String, String>,
    excludes: BTreeSet<String>,
}

impl ArchiveAssembly {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `source` to the archive under the archive-relative `destination`.
    ///
    /// Safe to apply repeatedly: a destination that was already registered, or
    /// that already exists in the staged tree, is never written twice.
    pub fn include_file(mut self, source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        let pair = (source.into(), destination.into());
        if !self.includes.contains(&pair) {
            self.includes.push(pair);
        }
        self
    }

    /// Override the mode of the entry at the archive-relative `path` with an
    /// octal string such as `"0755"`. Later settings win.
    pub fn set_permissions(mut self, path: impl Into<String>, mode: impl Into<String>) -> Self {
        self.permissions.insert(path.into(), mode.into());
        self
    }

    /// Exclude files whose base name equals `name`.
    pub fn exclude_file(mut self, name: impl Into<String>) -> Self {
        self.excludes.insert(name.into());
        self
    }

    pub(crate) fn includes(&self) -> &[(PathBuf, PathBuf)] {
        &self.includes
    }

    pub(crate) fn permission_for(&self, archive_path: &str) -> Option<&str> {
        self.permissions.get(archive_path).map(|s| s.as_str())
    }

    pub(crate) fn is_excluded(&self, path: &Path) -> bool {
        match path.file_name() {
            Some(name) => self.excludes.contains(&name.to_string_lossy().into_owned()),
            None => false,
        }
    }
}

/// A composable archive transform, applied in registration order.
///
/// Each customizer receives the accumulated value and returns the next one;
/// the chain is a plain left fold. Customizers must stay safe under
/// re-application because an IO retry may run the chain again.
pub type Customizer<'a> = Box<dyn Fn(ArchiveAssembly) -> Result<ArchiveAssembly> + 'a>;

/// Fold the customizer chain over an initial accumulator.
pub fn apply_customizers<'a>(
    initial: ArchiveAssembly,
    customizers: &[Customizer<'a>],
) -> Result<ArchiveAssembly> {
    let mut assembly = initial;
    for customizer in customizers {
        assembly = customizer(assembly)?;
    }
    Ok(assembly)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_applies_in_registration_order() {
        let customizers: Vec<Customizer> = vec![
            Box::new(|a| Ok(a.set_permissions("maven/app.jar", "0644"))),
            // Registered last, wins
            Box::new(|a| Ok(a.set_permissions("maven/app.jar", "0755"))),
            Box::new(|a| Ok(a.exclude_file(".git"))),
        ];
        let assembly = apply_customizers(ArchiveAssembly::new(), &customizers).unwrap();
        assert_eq!(assembly.permission_for("maven/app.jar"), Some("0755"));
        assert!(assembly.is_excluded(Path::new("some/dir/.git")));
        assert!(!assembly.is_excluded(Path::new("maven/app.jar")));
    }

    #[test]
    fn include_registration_is_idempotent() {
        let customizer: Customizer =
            Box::new(|a| Ok(a.include_file("/out/Dockerfile", "Dockerfile")));
        let assembly = customizer(ArchiveAssembly::new()).unwrap();
        let assembly = customizer(assembly).unwrap();
        assert_eq!(assembly.includes().len(), 1);
    }

    #[test]
    fn customizer_may_fail_the_chain() {
        let customizers: Vec<Customizer> = vec![Box::new(|_| {
            Err(Error::MissingDockerfile(PathBuf::from("Dockerfile")))
        })];
        assert!(apply_customizers(ArchiveAssembly::new(), &customizers).is_err());
    }
}
