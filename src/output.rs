use std::io::{self, Write};
use std::path::{Path, PathBuf, MAIN_SEPARATOR};

use cid::Cid;

use crate::error::{Error, Result};

pub const CAR_EXTENSION: &str = "car";

/// Where the archive of one run is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Write `<root>.car` into this directory.
    Directory(PathBuf),
    /// Write exactly this file.
    File(PathBuf),
}

impl Destination {
    /// A path with a `.car` extension names the archive itself, whatever
    /// currently exists there. Anything else, including a `.car` path spelled
    /// with a trailing separator, is a directory to write `<root>.car` into.
    pub fn resolve(path: &Path) -> Self {
        let spelled_as_dir = path
            .to_str()
            .is_some_and(|p| p.ends_with('/') || p.ends_with(MAIN_SEPARATOR));
        let is_archive = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(CAR_EXTENSION));
        if is_archive && !spelled_as_dir {
            Self::File(path.to_path_buf())
        } else {
            Self::Directory(path.to_path_buf())
        }
    }

    pub fn archive_path(&self, root: &Cid) -> PathBuf {
        match self {
            Self::Directory(dir) => dir.join(archive_file_name(root)),
            Self::File(path) => path.clone(),
        }
    }
}

pub fn archive_file_name(root: &Cid) -> String {
    format!("{root}.{CAR_EXTENSION}")
}

/// Replaces whatever is at `path` with `archive`.
///
/// A stale file or directory is removed first. The new bytes go through a
/// temporary file in the same directory that is renamed into place, so a
/// failed write never leaves a truncated archive behind.
pub async fn write_archive(path: PathBuf, archive: Vec<u8>) -> Result<PathBuf> {
    tokio::task::spawn_blocking(move || {
        replace_with(&path, |file| file.write_all(&archive))?;
        tracing::info!(path = %path.display(), len = archive.len(), "wrote archive");
        Ok::<_, Error>(path)
    })
    .await
    .map_err(|err| Error::WorkerPool(err.to_string()))?
}

/// Removes anything at `path`, then lets `fill` write the replacement into a
/// temporary file that is renamed over `path` once complete.
fn replace_with<F>(path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut tempfile::NamedTempFile) -> io::Result<()>,
{
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(|err| Error::io(&parent, err))?;

    remove_stale(path)?;

    let mut file = tempfile::NamedTempFile::new_in(&parent).map_err(|err| Error::io(&parent, err))?;
    fill(&mut file)
        .and_then(|()| file.as_file().sync_all())
        .map_err(|err| Error::io(path, err))?;
    file.persist(path).map_err(|err| Error::io(path, err.error))?;
    Ok(())
}

fn remove_stale(path: &Path) -> Result<()> {
    let removed = match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(path),
        Ok(_) => std::fs::remove_file(path),
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => Err(err),
    };
    removed.map_err(|err| Error::io(path, err))?;
    tracing::debug!(path = %path.display(), "removed stale output");
    Ok(())
}
