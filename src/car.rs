//! CARv1 archive writing.
//!
//! An archive is a varint-framed DAG-CBOR header naming the root, followed by
//! one varint-framed `(cid, payload)` record per block.
//! See <https://ipld.io/specs/transport/car/carv1/>.

use std::collections::HashSet;
use std::io::{self, Write};

use cid::Cid;
use serde::{Deserialize, Serialize};

use crate::block::Block;
use crate::blockstore::BlockStore;
use crate::error::{Error, Result};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CarHeader {
    pub roots: Vec<Cid>,
    pub version: u64,
}

/// Writes length-prefixed frames of a CARv1 archive to `W`.
pub struct CarWriter<W> {
    inner: W,
    blocks: usize,
}

impl<W: Write> CarWriter<W> {
    /// Writes the header naming `root` and returns a writer for the blocks.
    pub fn new(root: Cid, mut inner: W) -> io::Result<Self> {
        let header = CarHeader {
            roots: vec![root],
            version: 1,
        };
        let header = serde_ipld_dagcbor::to_vec(&header)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err.to_string()))?;

        write_varint(&mut inner, header.len())?;
        inner.write_all(&header)?;
        Ok(Self { inner, blocks: 0 })
    }

    pub fn write_block(&mut self, block: &Block) -> io::Result<()> {
        let cid = block.cid.to_bytes();
        write_varint(&mut self.inner, cid.len() + block.data.len())?;
        self.inner.write_all(&cid)?;
        self.inner.write_all(&block.data)?;
        self.blocks += 1;
        Ok(())
    }

    pub fn blocks_written(&self) -> usize {
        self.blocks
    }

    pub fn finish(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

fn write_varint(writer: &mut impl Write, n: usize) -> io::Result<()> {
    let mut buf = unsigned_varint::encode::usize_buffer();
    writer.write_all(unsigned_varint::encode::usize(n, &mut buf))
}

/// Serializes every block reachable from `root` into an in-memory archive.
///
/// Blocks are emitted depth-first in link order, root first, each CID once.
pub async fn export<S: BlockStore + Sync>(store: &S, root: Cid) -> Result<Vec<u8>> {
    let mut writer = CarWriter::new(root, Vec::new()).map_err(encoding_error)?;

    let mut seen = HashSet::new();
    let mut stack = vec![root];
    while let Some(cid) = stack.pop() {
        if !seen.insert(cid) {
            continue;
        }
        let block = store
            .get_block(&cid)
            .await
            .map_err(|err| Error::BlockStore(Box::new(err)))?
            .ok_or(Error::IncompleteDag(cid))?;

        stack.extend(block.links()?.into_iter().rev());
        writer.write_block(&block).map_err(encoding_error)?;
        tracing::trace!(%cid, len = block.data.len(), "exported block");
    }

    tracing::info!(%root, blocks = writer.blocks_written(), "exported archive");
    writer.finish().map_err(encoding_error)
}

fn encoding_error(err: io::Error) -> Error {
    Error::Encoding(err.to_string())
}
