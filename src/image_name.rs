use crate::error::*;
use std::path::PathBuf;

/// Name of the image being built, e.g. `registry.example.com/group/app:1.0`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageName {
    pub repository: String,
    pub tag: Option<String>,
}

impl ImageName {
    pub fn parse(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::InvalidImageName(name.to_string()));
        }
        // A ':' in the last path segment separates the tag; earlier ones
        // belong to a registry port.
        let (repository, tag) = match name.rsplit_once(':') {
            Some((repo, tag)) if !tag.contains('/') => (repo, Some(tag)),
            _ => (name, None),
        };
        if repository.is_empty() || tag.as_deref() == Some("") {
            return Err(Error::InvalidImageName(name.to_string()));
        }
        Ok(ImageName {
            repository: repository.to_string(),
            tag: tag.map(|t| t.to_string()),
        })
    }

    /// Filesystem path segment for this image's build directories.
    ///
    /// The `:` tag separator is illegal in paths on some platforms, so every
    /// occurrence becomes a `/` and the tag turns into a subdirectory.
    pub fn path_segment(&self) -> PathBuf {
        match &self.tag {
            Some(tag) => PathBuf::from(self.repository.replace(':', "/")).join(tag),
            None => PathBuf::from(self.repository.replace(':', "/")),
        }
    }
}

impl std::fmt::Display for ImageName {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &self.tag {
            Some(tag) => write!(f, "{}:{}", self.repository, tag),
            None => write!(f, "{}", self.repository),
        }
    }
}
