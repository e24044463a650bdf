use crate::backup::archive::TMP_FILE_EXT;
use crate::backup::file_ext::BACKUP_FILE_EXTS;
use crate::backup::function_path;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::{WithDebugObjectAndFnName, WithMsg};
use crate::backup::status_log::{LOG_FILE_NAME, ROTATED_LOG_FILE_NAME};
use dyn_iter::{DynIter, IntoDynIterator};
use function_name::named;
use getset::Getters;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Name used for the archive root when the source path has no final component (`/`).
static FALLBACK_ROOT_NAME: &str = "root";

/// The directory being backed up
///
/// Every archive member is stored under `root_name`, so unpacking an artifact
/// recreates the directory under its own name.
#[derive(Clone, Debug, Getters)]
pub struct SourceTree {
    #[getset(get = "pub")]
    dir: PathBuf,
    #[getset(get = "pub")]
    root_name: PathBuf,
    excluded: Option<Excluded>,
}

/// Part of the source that belongs to the backup destination
#[derive(Clone, Debug)]
enum Excluded {
    /// Destination nested below the source, skipped whole
    Dir(PathBuf),
    /// Destination is the source itself, only artifacts and logs at its top are skipped
    TopLevel(GlobSet),
}

impl Excluded {
    fn matches(&self, de: &DirEntry) -> bool {
        match self {
            Excluded::Dir(dir) => de.path() == dir,
            Excluded::TopLevel(globset) => de.depth() == 1 && globset.is_match(de.file_name()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceEntryKind {
    Dir,
    File,
    /// Stored as a link to the contained target, never followed
    Symlink(PathBuf),
}

/// One directory, regular file or symlink found under the source tree
#[derive(Debug)]
pub struct SourceEntry {
    pub src: PathBuf,
    pub dst: PathBuf,
    pub kind: SourceEntryKind,
    pub metadata: Metadata,
}

impl SourceTree {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let canonical = std::fs::canonicalize(dir)
            .map_err(Error::from)
            .with_msg(format!("Cannot resolve source directory {:?}", dir))?;
        let root_name = canonical
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(FALLBACK_ROOT_NAME));

        Ok(Self {
            dir: canonical,
            root_name,
            excluded: None,
        })
    }

    /// Leaves the backup destination out of the walk when it lives inside the source
    ///
    /// A destination elsewhere changes nothing.
    pub fn excluding<P: AsRef<Path>>(mut self, dest_dir: P) -> Result<Self> {
        let dest_dir = dest_dir.as_ref();
        let canonical = std::fs::canonicalize(dest_dir)
            .map_err(Error::from)
            .with_msg(format!("Cannot resolve destination directory {:?}", dest_dir))?;

        if canonical == self.dir {
            self.excluded = Some(Excluded::TopLevel(destination_globset()?));
        } else if canonical.starts_with(&self.dir) {
            tracing::info!("Destination {:?} is inside the source, skipping it", canonical);
            self.excluded = Some(Excluded::Dir(canonical));
        }
        Ok(self)
    }

    /// Name of the archive root as a plain string, used to build the artifact name
    pub fn base_name(&self) -> String {
        self.root_name.to_string_lossy().into_owned()
    }

    /// Walks the tree in file name order, parents before children
    ///
    /// Symlinks are reported as such and never followed, so dangling links and
    /// links to an ancestor are archived like any other entry. Anything else
    /// that is neither a directory nor a regular file (sockets, fifos) is skipped.
    #[named]
    pub fn entries<'a>(&self) -> DynIter<'a, Result<SourceEntry>> {
        let dir = self.dir.clone();
        let root_name = self.root_name.clone();
        let dir_debug = self.dir.clone();
        let excluded = self.excluded.clone();

        WalkDir::new(&self.dir)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |de| !excluded.as_ref().is_some_and(|ex| ex.matches(de)))
            .filter_map(move |res| match res {
                Ok(de) => process_dir_entry(de, &dir, &root_name).transpose(),
                Err(e) => Some(Err(e.into())),
            })
            .map(move |res| {
                res.map_err(|e| {
                    e.with_debug_object_and_fn_name(dir_debug.clone(), function_path!())
                })
            })
            .into_dyn_iter()
    }

    /// Total size in bytes of the regular files under the tree
    pub fn total_size(&self) -> Result<u64> {
        self.entries()
            .filter_map(|res| match res {
                Ok(entry) if entry.kind == SourceEntryKind::File => Some(Ok(entry.metadata.len())),
                Ok(_) => None,
                Err(e) => Some(Err(e)),
            })
            .sum()
    }
}

/// Artifacts, their in-progress `.tmp` files and the status logs
fn destination_globset() -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for ext in BACKUP_FILE_EXTS {
        builder.add(Glob::new(&format!("*.{ext}"))?);
        builder.add(Glob::new(&format!("*.{ext}.{TMP_FILE_EXT}"))?);
    }
    builder.add(Glob::new(LOG_FILE_NAME)?);
    builder.add(Glob::new(ROTATED_LOG_FILE_NAME)?);
    Ok(builder.build()?)
}

fn process_dir_entry(
    de: DirEntry,
    base_src_dir: &Path,
    root_name: &Path,
) -> Result<Option<SourceEntry>> {
    let file_type = de.file_type();
    let kind = if file_type.is_symlink() {
        SourceEntryKind::Symlink(std::fs::read_link(de.path())?)
    } else if file_type.is_dir() {
        SourceEntryKind::Dir
    } else if file_type.is_file() {
        SourceEntryKind::File
    } else {
        tracing::trace!("Skipping {:?}, not a file, directory or symlink", de.path());
        return Ok(None);
    };

    let metadata = de.metadata()?;
    let src = de.into_path();
    let dst = root_name.join(src.strip_prefix(base_src_dir)?);
    tracing::trace!("Including {:?} -> {:?}", src, dst);

    Ok(Some(SourceEntry {
        src,
        dst,
        kind,
        metadata,
    }))
}
