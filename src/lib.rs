//! Packs a static website directory into a single content-addressed CAR
//! archive.
//!
//! The pipeline runs in one direction: [`collector`] reads the tree,
//! [`validate`] gates it, [`builder`] turns it into a UnixFS DAG, and [`car`]
//! serializes every reachable block behind a header naming the root CID.
//! Identical trees always produce byte-identical archives.

use std::path::{Path, PathBuf};

use cid::Cid;

pub mod block;
pub mod blockstore;
pub mod builder;
pub mod car;
pub mod chunker;
pub mod collector;
pub mod config;
pub mod error;
pub mod output;
pub mod unixfs;
pub mod validate;

pub use config::Config;
pub use error::{Error, Result};

use crate::blockstore::MemoryBlockStore;
use crate::builder::DagBuilder;
use crate::output::Destination;

/// The outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    pub root: Cid,
    pub path: PathBuf,
    /// Set when the destination was a directory.
    pub file_name: Option<String>,
}

/// Builds the archive of `source` and writes it to `destination`.
///
/// Nothing is written unless every earlier stage succeeded.
pub async fn generate(source: &Path, destination: &Path, config: &Config) -> Result<Generated> {
    let files = collector::collect_files(source, config.concurrency).await?;
    tracing::info!(source = %source.display(), files = files.len(), "collected input");

    validate::validate(&files, &config.entry_point)?;

    let (root, archive) = pack(&files, config).await?;

    let destination = Destination::resolve(destination);
    let path = output::write_archive(destination.archive_path(&root), archive).await?;
    let file_name = match destination {
        Destination::Directory(_) => Some(output::archive_file_name(&root)),
        Destination::File(_) => None,
    };

    Ok(Generated {
        root,
        path,
        file_name,
    })
}

/// Builds the DAG of `files` and serializes it, returning the root CID and
/// the archive bytes. The block store lives only for this call.
pub async fn pack(files: &[collector::FileEntry], config: &Config) -> Result<(Cid, Vec<u8>)> {
    let store = MemoryBlockStore::new();
    let root = DagBuilder::new(&store, config).build(files).await?;
    let archive = car::export(&store, root.cid).await?;
    Ok((root.cid, archive))
}
