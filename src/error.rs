use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    //
    // Invalid configuration
    //
    #[error("Assembly has neither a name nor a target directory")]
    MissingAssemblyName,
    #[error("Invalid image name: {0}")]
    InvalidImageName(String),
    #[error("Invalid octal file mode: {0}")]
    InvalidFileMode(String),
    #[error("Dockerfile does not exist: {0}")]
    MissingDockerfile(PathBuf),
    #[error(transparent)]
    InvalidToml(#[from] toml::de::Error),

    //
    // Filesystem
    //
    #[error("Cannot create directory: {0}")]
    DirectoryCreation(PathBuf),
    #[error("Cannot copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
    #[error("Not a directory, or not exist: {0}")]
    NotADirectory(PathBuf),

    //
    // Archive construction
    //
    #[error("Cannot create archive for {dockerfile} in {dir}: {source}")]
    ArchiveConstruction {
        dockerfile: String,
        dir: PathBuf,
        source: Box<Error>,
    },

    //
    // System error
    //
    #[error(transparent)]
    UnknownIo(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<walkdir::Error> for Error {
    fn from(e: walkdir::Error) -> Self {
        Self::UnknownIo(e.into())
    }
}
