use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// A regular file of the input tree.
#[derive(Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Relative to the collected root, `/`-separated.
    pub path: String,
    pub content: Vec<u8>,
}

impl FileEntry {
    /// The final path segment.
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    pub fn depth(&self) -> usize {
        self.path.split('/').count()
    }
}

impl core::fmt::Debug for FileEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "FileEntry({:?}, {} bytes)", self.path, self.content.len())
    }
}

/// Reads every regular file below `root`, at most `concurrency` at a time.
///
/// Symlinks are followed; a symlink cycle is reported as an error. The result
/// is sorted by path.
pub async fn collect_files(root: &Path, concurrency: usize) -> Result<Vec<FileEntry>> {
    let walk_root = root.to_path_buf();
    let paths = tokio::task::spawn_blocking(move || list_files(&walk_root))
        .await
        .map_err(|err| Error::WorkerPool(err.to_string()))??;
    tracing::debug!(root = %root.display(), files = paths.len(), "listed input tree");

    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut joinset = JoinSet::new();
    for (path, absolute) in paths {
        let permit = Arc::clone(&semaphore)
            .acquire_owned()
            .await
            .map_err(|err| Error::WorkerPool(err.to_string()))?;
        joinset.spawn(async move {
            let content = tokio::fs::read(&absolute)
                .await
                .map_err(|err| Error::io(absolute, err))?;
            drop(permit);
            Ok::<_, Error>(FileEntry { path, content })
        });
    }

    let mut entries = Vec::with_capacity(joinset.len());
    while let Some(entry) = joinset.join_next().await {
        let entry = entry.map_err(|err| Error::WorkerPool(err.to_string()))??;
        tracing::trace!(path = %entry.path, len = entry.content.len(), "read file");
        entries.push(entry);
    }
    entries.sort_by(|a, b| a.path.cmp(&b.path));

    Ok(entries)
}

/// Lists `(relative, absolute)` paths of all regular files below `root`.
fn list_files(root: &Path) -> Result<Vec<(String, PathBuf)>> {
    let meta = std::fs::metadata(root).map_err(|err| Error::io(root, err))?;
    if !meta.is_dir() {
        return Err(Error::io(
            root,
            io::Error::new(io::ErrorKind::NotADirectory, "not a directory"),
        ));
    }

    let mut files = vec![];
    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|err| {
            let path = err.path().unwrap_or(root).to_path_buf();
            let message = err.to_string();
            let source = err
                .into_io_error()
                .unwrap_or_else(|| io::Error::other(message));
            Error::io(path, source)
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|err| Error::io(entry.path(), io::Error::other(err)))?;
        files.push((relative_path(relative)?, entry.into_path()));
    }
    Ok(files)
}

fn relative_path(relative: &Path) -> Result<String> {
    let segments = relative
        .components()
        .map(|component| match component {
            Component::Normal(segment) => segment.to_str().ok_or_else(|| {
                Error::io(
                    relative,
                    io::Error::new(io::ErrorKind::InvalidData, "file name is not valid UTF-8"),
                )
            }),
            _ => Err(Error::io(
                relative,
                io::Error::new(io::ErrorKind::InvalidInput, "unexpected path component"),
            )),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(segments.join("/"))
}
