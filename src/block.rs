use core::fmt;
use std::str::FromStr;

use cid::multihash::Multihash;
use cid::Cid;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::unixfs::PbNode;

/// Multicodec of leaf blocks holding file bytes.
pub const RAW: u64 = 0x55;
/// Multicodec of protobuf link blocks.
pub const DAG_PB: u64 = 0x70;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    #[default]
    Sha2_256,
    Blake3,
}

impl HashAlgorithm {
    /// The multihash code of this algorithm.
    pub const fn code(self) -> u64 {
        match self {
            Self::Sha2_256 => 0x12,
            Self::Blake3 => 0x1e,
        }
    }

    pub fn digest(self, data: &[u8]) -> Result<Multihash<64>> {
        let wrapped = match self {
            Self::Sha2_256 => Multihash::wrap(self.code(), Sha256::digest(data).as_slice()),
            Self::Blake3 => Multihash::wrap(self.code(), blake3::hash(data).as_bytes()),
        };
        wrapped.map_err(|err| Error::Encoding(err.to_string()))
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha2_256 => f.write_str("sha2-256"),
            Self::Blake3 => f.write_str("blake3"),
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha2-256" => Ok(Self::Sha2_256),
            "blake3" => Ok(Self::Blake3),
            _ => Err(format!(
                "unknown hash `{s}`, expected `sha2-256` or `blake3`"
            )),
        }
    }
}

/// An immutable, content-addressed unit of the DAG.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Block {
    pub cid: Cid,
    pub data: Vec<u8>,
}

impl Block {
    /// Addresses `data` under `codec`, hashing with `hash`.
    pub fn new(codec: u64, data: Vec<u8>, hash: HashAlgorithm) -> Result<Self> {
        let cid = Cid::new_v1(codec, hash.digest(&data)?);
        Ok(Self { cid, data })
    }

    /// CIDs this block links to, in link order. Raw blocks have none.
    pub fn links(&self) -> Result<Vec<Cid>> {
        match self.cid.codec() {
            RAW => Ok(vec![]),
            DAG_PB => {
                let node = PbNode::decode(&self.data).map_err(|err| Error::MalformedBlock {
                    cid: self.cid,
                    reason: err.to_string(),
                })?;
                Ok(node.links.into_iter().map(|link| link.hash).collect())
            }
            codec => Err(Error::MalformedBlock {
                cid: self.cid,
                reason: format!("unsupported codec 0x{codec:x}"),
            }),
        }
    }

    /// Re-hashes the payload and checks it against the CID.
    pub fn validate(&self) -> Result<()> {
        let hash = match self.cid.hash().code() {
            0x12 => HashAlgorithm::Sha2_256,
            0x1e => HashAlgorithm::Blake3,
            code => {
                return Err(Error::MalformedBlock {
                    cid: self.cid,
                    reason: format!("unsupported multihash 0x{code:x}"),
                })
            }
        };
        let actual = Cid::new_v1(self.cid.codec(), hash.digest(&self.data)?);
        if actual != self.cid {
            return Err(Error::MalformedBlock {
                cid: self.cid,
                reason: format!("payload hashes to {actual}"),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let len = self.data.len().min(32);
        write!(
            f,
            "Block({}, {} bytes, {:x}{})",
            self.cid,
            self.data.len(),
            base16ct::HexDisplay(&self.data[..len]),
            if len < self.data.len() { "…" } else { "" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_cids() {
        let empty = Block::new(RAW, vec![], HashAlgorithm::Sha2_256).unwrap();
        assert_eq!(
            empty.cid.to_string(),
            "bafkreihdwdcefgh4dqkjv67uzcmw7ojee6xedzdetojuzjevtenxquvyku"
        );

        let hello = Block::new(RAW, b"hello world".to_vec(), HashAlgorithm::Sha2_256).unwrap();
        assert_eq!(
            hello.cid.to_string(),
            "bafkreifzjut3te2nhyekklss27nh3k72ysco7y32koao5eei66wof36n5e"
        );
        assert!(hello.links().unwrap().is_empty());
    }

    #[test]
    fn test_hash_algorithm_changes_cid() {
        let sha = Block::new(RAW, b"body{}".to_vec(), HashAlgorithm::Sha2_256).unwrap();
        let blake = Block::new(RAW, b"body{}".to_vec(), HashAlgorithm::Blake3).unwrap();

        assert_ne!(sha.cid, blake.cid);
        assert_eq!(blake.cid.hash().code(), 0x1e);
        assert_eq!(blake.cid.hash().digest(), blake3::hash(b"body{}").as_bytes());
        sha.validate().unwrap();
        blake.validate().unwrap();
    }

    #[test]
    fn test_validate_detects_tampering() {
        let mut block = Block::new(RAW, b"<html></html>".to_vec(), HashAlgorithm::Sha2_256).unwrap();
        block.data.push(b'\n');
        assert!(matches!(
            block.validate(),
            Err(Error::MalformedBlock { .. })
        ));
    }

    #[test]
    fn test_debug_truncates() {
        let block = Block::new(RAW, vec![0xab; 40], HashAlgorithm::Sha2_256).unwrap();
        let printed = format!("{block:?}");
        assert!(printed.contains("40 bytes"));
        assert!(printed.ends_with("…)"));
    }

    #[test]
    fn test_parse_hash() {
        assert_eq!("blake3".parse(), Ok(HashAlgorithm::Blake3));
        assert_eq!(HashAlgorithm::Sha2_256.to_string(), "sha2-256");
        assert!("md5".parse::<HashAlgorithm>().is_err());
    }
}
