use std::collections::BTreeMap;
use std::pin::pin;

use cid::Cid;
use futures_util::{stream, StreamExt, TryStreamExt};

use crate::block::{Block, DAG_PB, RAW};
use crate::blockstore::BlockStore;
use crate::chunker::chunk_stream;
use crate::collector::FileEntry;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::unixfs::{PbLink, PbNode, UnixFsData};

/// A node of the DAG as seen from its parent link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DagNode {
    pub cid: Cid,
    /// Bytes of the block plus everything below it.
    pub tsize: u64,
    /// Bytes of file content it represents.
    pub content_size: u64,
}

impl DagNode {
    fn link(&self, name: &str) -> PbLink {
        PbLink {
            hash: self.cid,
            name: Some(name.into()),
            tsize: Some(self.tsize),
        }
    }
}

enum TreeEntry {
    File(DagNode),
    Directory(BTreeMap<String, TreeEntry>),
}

/// Turns a set of files into a UnixFS DAG inside `store`.
#[derive(Debug)]
pub struct DagBuilder<'a, S> {
    store: &'a S,
    config: &'a Config,
}

impl<'a, S: BlockStore + Sync> DagBuilder<'a, S> {
    pub fn new(store: &'a S, config: &'a Config) -> Self {
        Self { store, config }
    }

    /// Imports all `files` and returns the root directory node.
    ///
    /// The result depends only on paths and contents, not on the order of
    /// `files`.
    pub async fn build(&self, files: &[FileEntry]) -> Result<DagNode> {
        self.config.chunking.check().map_err(Error::InvalidConfig)?;
        if files.is_empty() {
            return Err(Error::EmptyInput);
        }

        let imported: Vec<(&str, DagNode)> = stream::iter(files)
            .map(|file| async move {
                let node = self.import_file(file).await?;
                Ok::<_, Error>((file.path.as_str(), node))
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .try_collect()
            .await?;

        let mut root = BTreeMap::new();
        for (path, node) in imported {
            insert_path(&mut root, path, node)?;
        }

        let mut blocks = vec![];
        let root = self.encode_directory("", root, &mut blocks)?;
        self.put_blocks(blocks).await?;

        tracing::info!(root = %root.cid, size = root.tsize, "built DAG");
        Ok(root)
    }

    /// Chunks one file into raw leaves and links them into a balanced tree.
    pub async fn import_file(&self, file: &FileEntry) -> Result<DagNode> {
        let mut chunks = pin!(chunk_stream(self.config.chunking, file.content.as_slice()));

        let mut leaves = vec![];
        let mut blocks = vec![];
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(|err| Error::io(&file.path, err))?;
            let len = chunk.len() as u64;

            let block = Block::new(RAW, chunk, self.config.hash)?;
            leaves.push(DagNode {
                cid: block.cid,
                tsize: len,
                content_size: len,
            });
            blocks.push(block);
        }

        let node = self.layout(leaves, &mut blocks)?;
        self.put_blocks(blocks).await?;

        tracing::debug!(path = %file.path, cid = %node.cid, size = node.content_size, "imported file");
        Ok(node)
    }

    /// Groups `leaves` into file nodes of at most `max_children` links, level
    /// by level, until a single node remains. A lone leaf stands for itself.
    fn layout(&self, leaves: Vec<DagNode>, blocks: &mut Vec<Block>) -> Result<DagNode> {
        let max_children = self.config.max_children.max(2);

        let mut level = leaves;
        match level.as_slice() {
            [] => return Err(Error::EmptyInput),
            [leaf] => return Ok(*leaf),
            _ => {}
        }
        loop {
            let parents = level
                .chunks(max_children)
                .map(|children| self.encode_file_node(children, blocks))
                .collect::<Result<Vec<_>>>()?;
            match parents.as_slice() {
                [root] => return Ok(*root),
                _ => level = parents,
            }
        }
    }

    fn encode_file_node(&self, children: &[DagNode], blocks: &mut Vec<Block>) -> Result<DagNode> {
        let data = UnixFsData::file(children.iter().map(|c| c.content_size).collect());
        let content_size = data.filesize.unwrap_or_default();
        let node = PbNode {
            links: children.iter().map(|c| c.link("")).collect(),
            data: Some(encode(data.encode())?),
        };
        self.push_node(node, content_size, blocks)
    }

    /// Encodes a directory after all of its children, innermost first.
    fn encode_directory(
        &self,
        path: &str,
        entries: BTreeMap<String, TreeEntry>,
        blocks: &mut Vec<Block>,
    ) -> Result<DagNode> {
        let mut links = Vec::with_capacity(entries.len());
        let mut content_size = 0;
        for (name, entry) in entries {
            let child = match entry {
                TreeEntry::File(node) => node,
                TreeEntry::Directory(children) => {
                    let child_path = if path.is_empty() {
                        name.clone()
                    } else {
                        format!("{path}/{name}")
                    };
                    self.encode_directory(&child_path, children, blocks)?
                }
            };
            content_size += child.content_size;
            links.push(child.link(&name));
        }

        let node = PbNode {
            links,
            data: Some(encode(UnixFsData::directory().encode())?),
        };
        let node = self.push_node(node, content_size, blocks)?;
        tracing::debug!(path = %path, cid = %node.cid, "built directory");
        Ok(node)
    }

    fn push_node(&self, node: PbNode, content_size: u64, blocks: &mut Vec<Block>) -> Result<DagNode> {
        let links_tsize = node.links_tsize();
        let block = Block::new(DAG_PB, encode(node.encode())?, self.config.hash)?;
        let dag_node = DagNode {
            cid: block.cid,
            tsize: block.data.len() as u64 + links_tsize,
            content_size,
        };
        blocks.push(block);
        Ok(dag_node)
    }

    async fn put_blocks(&self, blocks: Vec<Block>) -> Result<()> {
        for block in blocks {
            let cid = block.cid;
            let inserted = self
                .store
                .put_block(block)
                .await
                .map_err(|err| Error::BlockStore(Box::new(err)))?;
            if !inserted {
                tracing::trace!(%cid, "deduplicated block");
            }
        }
        Ok(())
    }
}

fn encode(result: quick_protobuf::Result<Vec<u8>>) -> Result<Vec<u8>> {
    result.map_err(|err| Error::Encoding(err.to_string()))
}

fn insert_path(root: &mut BTreeMap<String, TreeEntry>, path: &str, node: DagNode) -> Result<()> {
    let conflict = || Error::Encoding(format!("conflicting entries at {path}"));

    let mut segments = path.split('/').peekable();
    let mut dir = root;
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            if dir.insert(segment.into(), TreeEntry::File(node)).is_some() {
                return Err(conflict());
            }
            return Ok(());
        }
        let entry = dir
            .entry(segment.into())
            .or_insert_with(|| TreeEntry::Directory(BTreeMap::new()));
        dir = match entry {
            TreeEntry::Directory(children) => children,
            TreeEntry::File(_) => return Err(conflict()),
        };
    }
    Ok(())
}
