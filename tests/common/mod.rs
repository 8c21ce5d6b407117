#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;

use cid::Cid;
use sitecar::block::Block;
use sitecar::car::CarHeader;

/// A parsed archive, in file order.
pub struct Archive {
    pub header: CarHeader,
    pub blocks: Vec<Block>,
}

impl Archive {
    pub fn parse(mut bytes: &[u8]) -> Self {
        let mut frames = vec![];
        while !bytes.is_empty() {
            let (len, rest) = unsigned_varint::decode::usize(bytes).unwrap();
            frames.push(&rest[..len]);
            bytes = &rest[len..];
        }
        let header = serde_ipld_dagcbor::from_slice(frames[0]).unwrap();
        let blocks = frames[1..]
            .iter()
            .map(|frame| {
                let mut reader = *frame;
                let cid = Cid::read_bytes(&mut reader).unwrap();
                Block {
                    cid,
                    data: reader.to_vec(),
                }
            })
            .collect();
        Self { header, blocks }
    }

    pub fn read(path: &Path) -> Self {
        Self::parse(&std::fs::read(path).unwrap())
    }

    pub fn by_cid(&self) -> HashMap<Cid, &Block> {
        self.blocks.iter().map(|b| (b.cid, b)).collect()
    }
}

pub fn write_tree(root: &Path, files: &[(&str, &[u8])]) {
    for (path, content) in files {
        let path = root.join(path);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }
}
