use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("source path does not exist: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to {operation} {}", path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The same relative path is a directory in one source and not in another.
    #[error("cannot merge {}: directory and non-directory at the same path", path.display())]
    Conflict { path: PathBuf },

    #[error("{name} not found: {hint}")]
    DependencyMissing { name: String, hint: String },
}

impl Error {
    pub(crate) fn io(
        operation: &'static str,
        path: impl Into<PathBuf>,
    ) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io {
            operation,
            path,
            source,
        }
    }
}
