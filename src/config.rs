use crate::block::HashAlgorithm;
use crate::chunker::ChunkingStrategy;

/// Largest number of links in a single file node of the balanced layout.
pub const DEFAULT_MAX_CHILDREN: usize = 174;
pub const DEFAULT_ENTRY_POINT: &str = "index.html";
pub const DEFAULT_CONCURRENCY: usize = 64;

/// Knobs of one generation run.
///
/// Changing `chunking`, `hash` or `max_children` changes the resulting CIDs.
#[derive(Debug, Clone)]
pub struct Config {
    pub chunking: ChunkingStrategy,
    pub hash: HashAlgorithm,
    pub max_children: usize,
    pub entry_point: String,
    /// Upper bound on concurrently read and imported files.
    pub concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunking: ChunkingStrategy::default(),
            hash: HashAlgorithm::default(),
            max_children: DEFAULT_MAX_CHILDREN,
            entry_point: DEFAULT_ENTRY_POINT.into(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl Config {
    pub fn with_chunking(mut self, chunking: ChunkingStrategy) -> Self {
        self.chunking = chunking;
        self
    }

    pub fn with_hash(mut self, hash: HashAlgorithm) -> Self {
        self.hash = hash;
        self
    }

    pub fn with_max_children(mut self, max_children: usize) -> Self {
        self.max_children = max_children.max(2);
        self
    }

    pub fn with_entry_point(mut self, entry_point: impl Into<String>) -> Self {
        self.entry_point = entry_point.into();
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders_clamp() {
        let config = Config::default()
            .with_max_children(0)
            .with_concurrency(0)
            .with_entry_point("main.html");

        assert_eq!(config.max_children, 2);
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.entry_point, "main.html");
        assert_eq!(config.hash, HashAlgorithm::Sha2_256);
    }
}
