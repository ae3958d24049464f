use crate::WORD_SIZE_BYTES;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("cache size ({cache_size}) must be a non-zero multiple of block size ({block_size})")]
    CacheSizeNotMultipleOfBlockSize { cache_size: u32, block_size: u32 },

    #[error("number of cache lines ({num_blocks}) must be a multiple of associativity ({associativity})")]
    BlocksNotMultipleOfAssociativity { num_blocks: u32, associativity: u32 },

    #[error("associativity must be non-zero")]
    ZeroAssociativity,

    #[error("block size ({0}) must be a power of two")]
    BlockSizeNotPowerOfTwo(u32),

    #[error("block size ({block_size}) must be a multiple of the word size ({word_size})")]
    BlockSizeNotMultipleOfWordSize { block_size: u32, word_size: u32 },

    #[error("number of sets ({0}) must be a power of two")]
    NumSetsNotPowerOfTwo(u32),
}

/// Coherence protocol selected for a run.
///
/// Command-line names are case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
pub enum Protocol {
    #[strum(serialize = "MESI")]
    Mesi,
    #[strum(serialize = "DRAGON")]
    Dragon,
    #[strum(serialize = "MOESI")]
    Moesi,
}

/// Cache geometry, fixed for a run.
///
/// All derived quantities are computed once at construction; the
/// constructor rejects geometries the address decoder cannot slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    cache_size_bytes: u32,
    associativity: u32,
    block_size_bytes: u32,
    num_blocks: u32,
    num_sets: u32,
    words_per_block: u32,
}

impl Geometry {
    pub fn new(
        cache_size_bytes: u32,
        associativity: u32,
        block_size_bytes: u32,
    ) -> Result<Self, Error> {
        if !block_size_bytes.is_power_of_two() {
            return Err(Error::BlockSizeNotPowerOfTwo(block_size_bytes));
        }
        if block_size_bytes % WORD_SIZE_BYTES != 0 {
            return Err(Error::BlockSizeNotMultipleOfWordSize {
                block_size: block_size_bytes,
                word_size: WORD_SIZE_BYTES,
            });
        }
        if associativity == 0 {
            return Err(Error::ZeroAssociativity);
        }
        if cache_size_bytes == 0 || cache_size_bytes % block_size_bytes != 0 {
            return Err(Error::CacheSizeNotMultipleOfBlockSize {
                cache_size: cache_size_bytes,
                block_size: block_size_bytes,
            });
        }
        let num_blocks = cache_size_bytes / block_size_bytes;
        if num_blocks % associativity != 0 {
            return Err(Error::BlocksNotMultipleOfAssociativity {
                num_blocks,
                associativity,
            });
        }
        let num_sets = num_blocks / associativity;
        if !num_sets.is_power_of_two() {
            return Err(Error::NumSetsNotPowerOfTwo(num_sets));
        }
        Ok(Self {
            cache_size_bytes,
            associativity,
            block_size_bytes,
            num_blocks,
            num_sets,
            words_per_block: block_size_bytes / WORD_SIZE_BYTES,
        })
    }

    #[must_use]
    pub fn cache_size_bytes(&self) -> u32 {
        self.cache_size_bytes
    }

    #[must_use]
    pub fn associativity(&self) -> u32 {
        self.associativity
    }

    #[must_use]
    pub fn block_size_bytes(&self) -> u32 {
        self.block_size_bytes
    }

    #[must_use]
    pub fn num_blocks(&self) -> u32 {
        self.num_blocks
    }

    #[must_use]
    pub fn num_sets(&self) -> u32 {
        self.num_sets
    }

    #[must_use]
    pub fn words_per_block(&self) -> u32 {
        self.words_per_block
    }

    #[must_use]
    pub fn offset_bits(&self) -> u32 {
        self.block_size_bytes.ilog2()
    }

    #[must_use]
    pub fn index_bits(&self) -> u32 {
        self.num_sets.ilog2()
    }
}

impl std::fmt::Display for Geometry {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} bytes ({} sets, {}-way, {} byte blocks)",
            self.cache_size_bytes, self.num_sets, self.associativity, self.block_size_bytes
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, Geometry, Protocol};
    use std::str::FromStr;

    #[test]
    fn protocol_names_are_case_sensitive() {
        assert_eq!(Protocol::from_str("MESI"), Ok(Protocol::Mesi));
        assert_eq!(Protocol::from_str("DRAGON"), Ok(Protocol::Dragon));
        assert_eq!(Protocol::from_str("MOESI"), Ok(Protocol::Moesi));
        assert!(Protocol::from_str("mesi").is_err());
        assert!(Protocol::from_str("Dragon").is_err());
    }

    #[test]
    fn derived_quantities() -> Result<(), Error> {
        let geometry = Geometry::new(1024, 2, 32)?;
        assert_eq!(geometry.num_blocks(), 32);
        assert_eq!(geometry.num_sets(), 16);
        assert_eq!(geometry.words_per_block(), 8);
        assert_eq!(geometry.offset_bits(), 5);
        assert_eq!(geometry.index_bits(), 4);
        Ok(())
    }

    #[test]
    fn single_set_geometry() -> Result<(), Error> {
        let geometry = Geometry::new(64, 2, 32)?;
        assert_eq!(geometry.num_sets(), 1);
        assert_eq!(geometry.index_bits(), 0);
        Ok(())
    }

    #[test]
    fn rejects_unsliceable_geometries() {
        assert_eq!(
            Geometry::new(1000, 2, 32),
            Err(Error::CacheSizeNotMultipleOfBlockSize {
                cache_size: 1000,
                block_size: 32,
            })
        );
        assert_eq!(
            Geometry::new(1024, 3, 32),
            Err(Error::BlocksNotMultipleOfAssociativity {
                num_blocks: 32,
                associativity: 3,
            })
        );
        assert_eq!(Geometry::new(1024, 2, 24), Err(Error::BlockSizeNotPowerOfTwo(24)));
        assert_eq!(Geometry::new(1024, 0, 32), Err(Error::ZeroAssociativity));
        assert_eq!(Geometry::new(192, 2, 32), Err(Error::NumSetsNotPowerOfTwo(3)));
        assert!(matches!(
            Geometry::new(0, 2, 32),
            Err(Error::CacheSizeNotMultipleOfBlockSize { .. })
        ));
    }
}
