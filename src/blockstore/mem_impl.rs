use core::fmt;
use std::collections::HashMap;
use std::convert::Infallible;

use cid::Cid;
use tokio::sync::RwLock;

use super::BlockStore;
use crate::block::Block;

/// A block store living for the duration of a single generation run.
#[derive(Default)]
pub struct MemoryBlockStore {
    blocks: RwLock<HashMap<Cid, Vec<u8>>>,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl fmt::Debug for MemoryBlockStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.blocks.try_read() {
            Ok(blocks) => write!(f, "MemoryBlockStore({} blocks)", blocks.len()),
            Err(_) => f.write_str("MemoryBlockStore(<locked>)"),
        }
    }
}

#[async_trait::async_trait]
impl BlockStore for MemoryBlockStore {
    type Error = Infallible;

    async fn put_block(&self, block: Block) -> Result<bool, Infallible> {
        let mut blocks = self.blocks.write().await;
        if blocks.contains_key(&block.cid) {
            return Ok(false);
        }
        blocks.insert(block.cid, block.data);
        Ok(true)
    }

    async fn get_block(&self, cid: &Cid) -> Result<Option<Block>, Infallible> {
        let blocks = self.blocks.read().await;
        Ok(blocks.get(cid).map(|data| Block {
            cid: *cid,
            data: data.clone(),
        }))
    }

    async fn len(&self) -> Result<usize, Infallible> {
        Ok(self.blocks.read().await.len())
    }
}
