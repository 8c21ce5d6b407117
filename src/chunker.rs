use std::fmt;
use std::io;
use std::pin::pin;
use std::str::FromStr;

use fastcdc::v2020::AsyncStreamCDC;
use futures_util::{Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncReadExt};

/// How file contents are split into leaf blocks.
///
/// All strategies are deterministic: the same bytes always produce the same
/// chunk boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkingStrategy {
    None,
    Fixed(u32),
    Cdc(u32, u32, u32),
}

pub const DEFAULT_CHUNK_SIZE: u32 = 256 * 1024;

const KIB: u32 = 1024;
const MIN_CHUNK: u32 = 64 * KIB;
const AVG_CHUNK: u32 = 256 * KIB;
const MAX_CHUNK: u32 = 1024 * KIB;
const READ_BUFFER: u32 = 8 * KIB;

impl Default for ChunkingStrategy {
    fn default() -> Self {
        Self::Fixed(DEFAULT_CHUNK_SIZE)
    }
}

impl fmt::Display for ChunkingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Fixed(size) => write!(f, "size-{size}"),
            Self::Cdc(min, avg, max) => write!(f, "cdc-{min}-{avg}-{max}"),
        }
    }
}

impl FromStr for ChunkingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |n: &str| {
            n.parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| format!("invalid chunk size `{n}` in `{s}`"))
        };

        match s.split('-').collect::<Vec<_>>().as_slice() {
            ["none"] => Ok(Self::None),
            ["size", size] => Ok(Self::Fixed(parse(size)?)),
            ["cdc"] => Ok(Self::Cdc(MIN_CHUNK, AVG_CHUNK, MAX_CHUNK)),
            ["cdc", min, avg, max] => {
                let strategy = Self::Cdc(parse(min)?, parse(avg)?, parse(max)?);
                strategy.check()?;
                Ok(strategy)
            }
            _ => Err(format!(
                "unknown chunker `{s}`, expected `none`, `size-<n>`, `cdc` or `cdc-<min>-<avg>-<max>`"
            )),
        }
    }
}

impl ChunkingStrategy {
    /// Rejects sizes no chunker can work with: a zero fixed size, or
    /// content-defined bounds outside what fastcdc accepts.
    pub fn check(&self) -> Result<(), String> {
        use fastcdc::v2020::{
            AVERAGE_MAX, AVERAGE_MIN, MAXIMUM_MAX, MAXIMUM_MIN, MINIMUM_MAX, MINIMUM_MIN,
        };

        match *self {
            Self::None => Ok(()),
            Self::Fixed(0) => Err(format!("chunk size of `{self}` must be positive")),
            Self::Fixed(_) => Ok(()),
            Self::Cdc(min, avg, max) => {
                if !(MINIMUM_MIN..=MINIMUM_MAX).contains(&min)
                    || !(AVERAGE_MIN..=AVERAGE_MAX).contains(&avg)
                    || !(MAXIMUM_MIN..=MAXIMUM_MAX).contains(&max)
                    || !(min <= avg && avg <= max)
                {
                    return Err(format!("chunk sizes out of range in `{self}`"));
                }
                Ok(())
            }
        }
    }
}

/// Splits `stream` into chunks according to `strategy`.
///
/// Always yields at least one chunk, so empty input produces a single empty
/// chunk. An invalid strategy yields a single `InvalidInput` error.
pub fn chunk_stream(
    strategy: ChunkingStrategy,
    mut stream: impl AsyncRead + Unpin,
) -> impl Stream<Item = io::Result<Vec<u8>>> {
    async_stream::try_stream! {
        strategy
            .check()
            .map_err(|msg| io::Error::new(io::ErrorKind::InvalidInput, msg))?;

        match strategy {
            ChunkingStrategy::None => {
                let mut data = vec![];
                stream.read_to_end(&mut data).await?;
                yield data;
            }
            ChunkingStrategy::Fixed(chunk_size) => {
                let mut emitted = false;
                loop {
                    let mut data = Vec::with_capacity(chunk_size.min(READ_BUFFER) as usize);
                    let chunk_len = (&mut stream)
                        .take(chunk_size as u64)
                        .read_to_end(&mut data)
                        .await?;
                    data.shrink_to_fit();

                    if chunk_len == 0 && emitted {
                        break;
                    }
                    emitted = true;
                    yield data;

                    if chunk_len < chunk_size as usize {
                        break;
                    }
                }
            }
            ChunkingStrategy::Cdc(min_size, avg_size, max_size) => {
                let mut chunks = AsyncStreamCDC::new(stream, min_size, avg_size, max_size);
                let mut chunks = pin!(chunks.as_stream());

                let mut emitted = false;
                while let Some(chunk) = chunks.next().await {
                    let chunk = chunk.map_err(io::Error::other)?;
                    emitted = true;
                    yield chunk.data;
                }
                if !emitted {
                    yield vec![];
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use futures_util::TryStreamExt;
    use pretty_assertions::assert_eq;
    use quickcheck_macros::quickcheck;

    use super::*;

    async fn chunks_of(strategy: ChunkingStrategy, data: &[u8]) -> Vec<Vec<u8>> {
        chunk_stream(strategy, data).try_collect().await.unwrap()
    }

    #[tokio::test]
    async fn test_fixed_boundaries() {
        let chunks = chunks_of(ChunkingStrategy::Fixed(4), b"0123456789").await;
        assert_eq!(
            chunks,
            vec![b"0123".to_vec(), b"4567".to_vec(), b"89".to_vec()]
        );

        // an exact multiple does not produce a trailing empty chunk
        let chunks = chunks_of(ChunkingStrategy::Fixed(5), b"0123456789").await;
        assert_eq!(chunks, vec![b"01234".to_vec(), b"56789".to_vec()]);
    }

    #[tokio::test]
    async fn test_empty_input_yields_one_chunk() {
        for strategy in [
            ChunkingStrategy::None,
            ChunkingStrategy::Fixed(16),
            ChunkingStrategy::Cdc(MIN_CHUNK, AVG_CHUNK, MAX_CHUNK),
        ] {
            assert_eq!(chunks_of(strategy, b"").await, vec![Vec::<u8>::new()]);
        }
    }

    #[tokio::test]
    async fn test_cdc_is_deterministic() {
        let data: Vec<u8> = (0..3_000_000u32).map(|i| (i * 7 % 251) as u8).collect();
        let strategy = ChunkingStrategy::Cdc(MIN_CHUNK, AVG_CHUNK, MAX_CHUNK);

        let first = chunks_of(strategy, &data).await;
        let second = chunks_of(strategy, &data).await;

        assert!(first.len() > 1);
        assert!(first.iter().all(|c| c.len() <= MAX_CHUNK as usize));
        assert_eq!(first.concat(), data);
        assert_eq!(first, second);
    }

    #[test]
    fn test_parse_strategy() {
        assert_eq!("none".parse(), Ok(ChunkingStrategy::None));
        assert_eq!("size-1024".parse(), Ok(ChunkingStrategy::Fixed(1024)));
        assert_eq!(
            "cdc".parse(),
            Ok(ChunkingStrategy::Cdc(MIN_CHUNK, AVG_CHUNK, MAX_CHUNK))
        );
        assert!("size-0".parse::<ChunkingStrategy>().is_err());
        assert!("cdc-1-2-3".parse::<ChunkingStrategy>().is_err());
        assert!("rabin".parse::<ChunkingStrategy>().is_err());

        let strategy = ChunkingStrategy::default();
        assert_eq!(strategy.to_string().parse(), Ok(strategy));
    }

    #[tokio::test]
    async fn test_invalid_strategy_is_an_error() {
        for strategy in [ChunkingStrategy::Fixed(0), ChunkingStrategy::Cdc(1, 2, 3)] {
            assert!(strategy.check().is_err());
            let err = chunk_stream(strategy, &b"data"[..])
                .try_collect::<Vec<_>>()
                .await
                .unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        }
    }

    #[tokio::test]
    async fn test_small_chunks_do_not_keep_chunk_sized_buffers() {
        let chunks = chunks_of(ChunkingStrategy::default(), b"<html></html>").await;
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].capacity() < READ_BUFFER as usize);
    }

    #[quickcheck]
    fn fixed_chunks_reassemble(data: Vec<u8>, size: u8) -> bool {
        let size = u32::from(size.max(1));
        let rt = tokio::runtime::Runtime::new().unwrap();
        let chunks = rt.block_on(chunks_of(ChunkingStrategy::Fixed(size), &data));

        let (last, full) = chunks.split_last().unwrap();
        chunks.concat() == data
            && full.iter().all(|c| c.len() == size as usize)
            && last.len() <= size as usize
    }
}
