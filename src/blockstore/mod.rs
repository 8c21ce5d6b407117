use cid::Cid;

use crate::block::Block;

pub mod mem_impl;

pub use mem_impl::MemoryBlockStore;

/// Where the DAG builder puts blocks and the archive serializer finds them.
#[async_trait::async_trait]
pub trait BlockStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Stores `block`, returning `false` if a block with the same CID was
    /// already present.
    async fn put_block(&self, block: Block) -> Result<bool, Self::Error>;

    async fn get_block(&self, cid: &Cid) -> Result<Option<Block>, Self::Error>;

    async fn len(&self) -> Result<usize, Self::Error>;
}
