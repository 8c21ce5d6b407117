//! dag-pb nodes and the UnixFS `Data` message they carry.
//!
//! Encoding is canonical: within a `PbNode` the links are written before the
//! data, and every message writes its fields in field-number order. The
//! hand-written message impls follow the shape `pb-rs` generates.

use cid::Cid;
use quick_protobuf::sizeofs::{sizeof_len, sizeof_varint};
use quick_protobuf::{BytesReader, MessageRead, MessageWrite, Writer, WriterBackend};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DataType {
    Raw = 0,
    Directory = 1,
    File = 2,
    Metadata = 3,
    Symlink = 4,
    HamtShard = 5,
}

impl TryFrom<u64> for DataType {
    type Error = quick_protobuf::Error;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Raw,
            1 => Self::Directory,
            2 => Self::File,
            3 => Self::Metadata,
            4 => Self::Symlink,
            5 => Self::HamtShard,
            _ => return Err(quick_protobuf::Error::Message(format!(
                "unknown unixfs type {value}"
            ))),
        })
    }
}

/// The UnixFS metadata stored in the `Data` field of a dag-pb node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnixFsData {
    pub data_type: DataType,
    pub data: Option<Vec<u8>>,
    pub filesize: Option<u64>,
    pub blocksizes: Vec<u64>,
}

impl UnixFsData {
    pub fn directory() -> Self {
        Self {
            data_type: DataType::Directory,
            data: None,
            filesize: None,
            blocksizes: vec![],
        }
    }

    /// An intermediate file node whose content lives in its children.
    pub fn file(blocksizes: Vec<u64>) -> Self {
        Self {
            data_type: DataType::File,
            data: None,
            filesize: Some(blocksizes.iter().sum()),
            blocksizes,
        }
    }

    pub fn encode(&self) -> quick_protobuf::Result<Vec<u8>> {
        encode_message(self)
    }

    pub fn decode(bytes: &[u8]) -> quick_protobuf::Result<Self> {
        let mut reader = BytesReader::from_bytes(bytes);
        Self::from_reader(&mut reader, bytes)
    }
}

impl MessageWrite for UnixFsData {
    fn get_size(&self) -> usize {
        1 + sizeof_varint(self.data_type as u64)
            + self.data.as_ref().map_or(0, |d| 1 + sizeof_len(d.len()))
            + self.filesize.map_or(0, |s| 1 + sizeof_varint(s))
            + self
                .blocksizes
                .iter()
                .map(|s| 1 + sizeof_varint(*s))
                .sum::<usize>()
    }

    fn write_message<W: WriterBackend>(&self, w: &mut Writer<W>) -> quick_protobuf::Result<()> {
        w.write_with_tag(8, |w| w.write_uint64(self.data_type as u64))?;
        if let Some(data) = &self.data {
            w.write_with_tag(18, |w| w.write_bytes(data))?;
        }
        if let Some(filesize) = self.filesize {
            w.write_with_tag(24, |w| w.write_uint64(filesize))?;
        }
        // proto2 repeated fields are not packed
        for size in &self.blocksizes {
            w.write_with_tag(32, |w| w.write_uint64(*size))?;
        }
        Ok(())
    }
}

impl<'a> MessageRead<'a> for UnixFsData {
    fn from_reader(r: &mut BytesReader, bytes: &'a [u8]) -> quick_protobuf::Result<Self> {
        let mut data_type = None;
        let mut msg = Self::directory();
        while !r.is_eof() {
            match r.next_tag(bytes)? {
                8 => data_type = Some(DataType::try_from(r.read_uint64(bytes)?)?),
                18 => msg.data = Some(r.read_bytes(bytes)?.to_owned()),
                24 => msg.filesize = Some(r.read_uint64(bytes)?),
                32 => msg.blocksizes.push(r.read_uint64(bytes)?),
                34 => msg.blocksizes.extend(r.read_packed(bytes, |r, bytes| r.read_uint64(bytes))?),
                t => r.read_unknown(bytes, t)?,
            }
        }
        msg.data_type = data_type
            .ok_or_else(|| quick_protobuf::Error::Message("unixfs data without type".into()))?;
        Ok(msg)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PbLink {
    pub hash: Cid,
    pub name: Option<String>,
    /// Cumulative size of the target block and everything below it.
    pub tsize: Option<u64>,
}

impl MessageWrite for PbLink {
    fn get_size(&self) -> usize {
        1 + sizeof_len(self.hash.encoded_len())
            + self.name.as_ref().map_or(0, |n| 1 + sizeof_len(n.len()))
            + self.tsize.map_or(0, |t| 1 + sizeof_varint(t))
    }

    fn write_message<W: WriterBackend>(&self, w: &mut Writer<W>) -> quick_protobuf::Result<()> {
        w.write_with_tag(10, |w| w.write_bytes(&self.hash.to_bytes()))?;
        if let Some(name) = &self.name {
            w.write_with_tag(18, |w| w.write_string(name))?;
        }
        if let Some(tsize) = self.tsize {
            w.write_with_tag(24, |w| w.write_uint64(tsize))?;
        }
        Ok(())
    }
}

impl<'a> MessageRead<'a> for PbLink {
    fn from_reader(r: &mut BytesReader, bytes: &'a [u8]) -> quick_protobuf::Result<Self> {
        let mut hash = None;
        let mut name = None;
        let mut tsize = None;
        while !r.is_eof() {
            match r.next_tag(bytes)? {
                10 => {
                    let raw = r.read_bytes(bytes)?;
                    hash = Some(
                        Cid::try_from(raw)
                            .map_err(|err| quick_protobuf::Error::Message(err.to_string()))?,
                    );
                }
                18 => name = Some(r.read_string(bytes)?.to_owned()),
                24 => tsize = Some(r.read_uint64(bytes)?),
                t => r.read_unknown(bytes, t)?,
            }
        }
        let hash =
            hash.ok_or_else(|| quick_protobuf::Error::Message("dag-pb link without hash".into()))?;
        Ok(Self { hash, name, tsize })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PbNode {
    pub links: Vec<PbLink>,
    pub data: Option<Vec<u8>>,
}

impl PbNode {
    pub fn encode(&self) -> quick_protobuf::Result<Vec<u8>> {
        encode_message(self)
    }

    pub fn decode(bytes: &[u8]) -> quick_protobuf::Result<Self> {
        let mut reader = BytesReader::from_bytes(bytes);
        Self::from_reader(&mut reader, bytes)
    }

    /// Sum of the `Tsize` of every link.
    pub fn links_tsize(&self) -> u64 {
        self.links.iter().filter_map(|link| link.tsize).sum()
    }
}

impl MessageWrite for PbNode {
    fn get_size(&self) -> usize {
        self.links
            .iter()
            .map(|l| 1 + sizeof_len(l.get_size()))
            .sum::<usize>()
            + self.data.as_ref().map_or(0, |d| 1 + sizeof_len(d.len()))
    }

    fn write_message<W: WriterBackend>(&self, w: &mut Writer<W>) -> quick_protobuf::Result<()> {
        for link in &self.links {
            w.write_with_tag(18, |w| w.write_message(link))?;
        }
        if let Some(data) = &self.data {
            w.write_with_tag(10, |w| w.write_bytes(data))?;
        }
        Ok(())
    }
}

impl<'a> MessageRead<'a> for PbNode {
    fn from_reader(r: &mut BytesReader, bytes: &'a [u8]) -> quick_protobuf::Result<Self> {
        let mut msg = Self::default();
        while !r.is_eof() {
            match r.next_tag(bytes)? {
                10 => msg.data = Some(r.read_bytes(bytes)?.to_owned()),
                18 => msg.links.push(r.read_message::<PbLink>(bytes)?),
                t => r.read_unknown(bytes, t)?,
            }
        }
        Ok(msg)
    }
}

/// Writes `message` without the outer length prefix.
fn encode_message(message: &impl MessageWrite) -> quick_protobuf::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(message.get_size());
    let mut writer = Writer::new(&mut buf);
    message.write_message(&mut writer)?;
    Ok(buf)
}
