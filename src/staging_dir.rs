use std::{
    fs,
    io::ErrorKind,
    os::unix::fs::{MetadataExt as _, symlink},
    path::{Path, PathBuf},
};

use tempfile::TempDir;
use tracing::{debug, warn};
use walkdir::{DirEntry, DirEntryExt as _, WalkDir};

use crate::error::{Error, Result};

/// How regular files are placed into the staging directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Placement {
    /// Hard link, copying instead where linking fails (e.g. across filesystems).
    #[default]
    Link,
    Copy,
}

#[derive(Debug, Clone)]
pub struct Builder {
    prefix: String,
    parent: Option<PathBuf>,
    placement: Placement,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            prefix: "deploy-".to_string(),
            parent: None,
            placement: Placement::default(),
        }
    }
}

impl Builder {
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Create the staging directory under `parent` instead of the platform temp dir.
    pub fn tempdir_in(mut self, parent: impl Into<PathBuf>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    /// Creates a fresh directory and stages `sources` into it, in order.
    ///
    /// Files land at the root under their base name. Directories have their
    /// contents merged into the root. Later sources win at colliding paths.
    pub fn acquire<P: AsRef<Path>>(
        &self,
        sources: impl IntoIterator<Item = P>,
    ) -> Result<StagingDir> {
        let sources: Vec<PathBuf> = sources
            .into_iter()
            .map(|source| source.as_ref().to_path_buf())
            .collect();

        if let Some(missing) = sources.iter().find(|source| !source.exists()) {
            return Err(Error::NotFound {
                path: missing.clone(),
            });
        }

        let mut builder = tempfile::Builder::new();
        builder.prefix(&self.prefix);

        let dir = match &self.parent {
            Some(parent) => builder
                .tempdir_in(parent)
                .map_err(Error::io("create staging directory in", parent))?,
            None => builder
                .tempdir()
                .map_err(Error::io("create staging directory in", std::env::temp_dir()))?,
        };

        let root = std::path::absolute(dir.path()).map_err(Error::io("resolve", dir.path()))?;

        let canonical_root = fs::canonicalize(&root).map_err(Error::io("resolve", &root))?;

        let root_ino = fs::metadata(&canonical_root)
            .map_err(Error::io("read metadata of", &canonical_root))?
            .ino();

        let stager = Stager {
            root: &root,
            canonical_root: &canonical_root,
            root_ino,
            placement: self.placement,
        };

        // `dir` is removed on drop if any source fails to stage
        for source in &sources {
            debug!("staging {source:?}");
            stager.stage(source)?;
        }

        debug!("staging directory populated: {root:?}");

        Ok(StagingDir {
            root,
            dir: Some(dir),
        })
    }
}

/// A populated temporary directory, removed when dropped.
#[derive(Debug, derive_more::Deref)]
pub struct StagingDir {
    #[deref]
    root: PathBuf,
    dir: Option<TempDir>,
}

impl StagingDir {
    pub fn builder() -> Builder {
        Builder::default()
    }

    pub fn acquire<P: AsRef<Path>>(sources: impl IntoIterator<Item = P>) -> Result<Self> {
        Self::builder().acquire(sources)
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Removes the directory now, reporting failure instead of logging it.
    pub fn close(mut self) -> Result<()> {
        self.remove()
    }

    fn remove(&mut self) -> Result<()> {
        let Some(dir) = self.dir.take() else {
            return Ok(());
        };

        match dir.close() {
            Ok(()) => {
                debug!("staging directory removed: {:?}", self.root);
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Error::io("remove staging directory", &self.root)(err)),
        }
    }
}

impl AsRef<Path> for StagingDir {
    fn as_ref(&self) -> &Path {
        self.path()
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if let Err(err) = self.remove() {
            let source = std::error::Error::source(&err)
                .map(ToString::to_string)
                .unwrap_or_default();
            warn!("{err}: {source}");
        }
    }
}

struct Stager<'a> {
    root: &'a Path,
    canonical_root: &'a Path,
    root_ino: u64,
    placement: Placement,
}

impl Stager<'_> {
    fn stage(&self, source: &Path) -> Result<()> {
        let metadata = fs::metadata(source).map_err(|err| match err.kind() {
            ErrorKind::NotFound => Error::NotFound {
                path: source.to_path_buf(),
            },
            _ => Error::io("read metadata of", source)(err),
        })?;

        if metadata.is_dir() {
            return self.merge_dir(source);
        }

        let name = source.file_name().ok_or_else(|| {
            Error::io("take base name of", source)(ErrorKind::InvalidInput.into())
        })?;

        // link the target, not a top-level symlink itself
        let target = fs::canonicalize(source).map_err(Error::io("resolve", source))?;
        self.place_file(&target, Path::new(name))
    }

    fn merge_dir(&self, source: &Path) -> Result<()> {
        let entries = WalkDir::new(source)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            // a source may contain the temp area, and so the staging directory
            .filter_entry(|entry| !self.is_root(entry));

        for entry in entries {
            let entry = entry.map_err(|err| {
                let path = err.path().unwrap_or(source).to_path_buf();
                Error::Io {
                    operation: "walk",
                    path,
                    source: err.into(),
                }
            })?;

            let relative = entry.path().strip_prefix(source).map_err(|_| {
                Error::io("relativize", entry.path())(ErrorKind::InvalidInput.into())
            })?;

            let file_type = entry.file_type();

            if file_type.is_dir() {
                self.ensure_dir(relative)?;
            } else if file_type.is_symlink() {
                let target =
                    fs::read_link(entry.path()).map_err(Error::io("read link", entry.path()))?;
                let destination = self.clear_slot(relative)?;
                symlink(&target, &destination).map_err(Error::io("symlink", &destination))?;
            } else if file_type.is_file() {
                self.place_file(entry.path(), relative)?;
            } else {
                debug!("skipping special file {:?}", entry.path());
            }
        }

        Ok(())
    }

    fn is_root(&self, entry: &DirEntry) -> bool {
        entry.file_type().is_dir()
            && entry.ino() == self.root_ino
            && fs::canonicalize(entry.path()).is_ok_and(|path| path == self.canonical_root)
    }

    fn ensure_dir(&self, relative: &Path) -> Result<()> {
        let destination = self.root.join(relative);

        match fs::symlink_metadata(&destination) {
            Ok(metadata) if metadata.is_dir() => Ok(()),
            Ok(_) => Err(Error::Conflict {
                path: relative.to_path_buf(),
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                fs::create_dir(&destination).map_err(Error::io("create directory", &destination))
            }
            Err(err) => Err(Error::io("read metadata of", &destination)(err)),
        }
    }

    /// Frees `relative` for a new non-directory entry, returning its absolute path.
    fn clear_slot(&self, relative: &Path) -> Result<PathBuf> {
        let destination = self.root.join(relative);

        match fs::symlink_metadata(&destination) {
            Ok(metadata) if metadata.is_dir() => Err(Error::Conflict {
                path: relative.to_path_buf(),
            }),
            Ok(_) => {
                debug!("overwriting {relative:?}");
                fs::remove_file(&destination).map_err(Error::io("remove", &destination))?;
                Ok(destination)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(destination),
            Err(err) => Err(Error::io("read metadata of", &destination)(err)),
        }
    }

    fn place_file(&self, source: &Path, relative: &Path) -> Result<()> {
        let destination = self.clear_slot(relative)?;

        if self.placement == Placement::Link {
            match fs::hard_link(source, &destination) {
                Ok(()) => return Ok(()),
                Err(err) => debug!("hard link {source:?} failed ({err}), copying instead"),
            }
        }

        fs::copy(source, &destination)
            .map(drop)
            .map_err(Error::io("copy", source))
    }
}
