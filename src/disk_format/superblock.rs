use std::mem::size_of;

use serde::{Deserialize, Serialize};

use crate::error::{FsError, Result};

/// The number of bytes occupied by the superblock at the start of the
/// container.
pub const SUPERBLOCK_SIZE: usize = 12;
const_assert!(size_of::<Superblock>() == SUPERBLOCK_SIZE);

/// The container superblock. Written once at format time; every other
/// region's size and offset derives from these three fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(C)]
pub struct Superblock {
    /// Bytes per data block.
    pub block_size: u32,
    /// The number of data blocks.
    pub num_blocks: u32,
    /// The number of inode slots.
    pub num_inodes: u32,
}

impl Superblock {
    pub fn new(block_size: u32, num_blocks: u32, num_inodes: u32) -> Result<Self> {
        let superblock = Superblock {
            block_size,
            num_blocks,
            num_inodes,
        };
        superblock.validate()?;

        Ok(superblock)
    }

    /// All three fields must be positive for the derived layout to make
    /// sense.
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(FsError::Corrupt("block size is zero".to_string()));
        }

        if self.num_blocks == 0 {
            return Err(FsError::Corrupt("block count is zero".to_string()));
        }

        if self.num_inodes == 0 {
            return Err(FsError::Corrupt("inode count is zero".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_size() {
        let superblock = Superblock::new(64, 128, 16).unwrap();
        let serialized = bincode::serialize(&superblock).unwrap();

        assert_eq!(serialized.len(), SUPERBLOCK_SIZE);
    }

    #[test]
    fn test_fields_are_little_endian() {
        let superblock = Superblock::new(0x0102, 0x0304, 0x0506).unwrap();
        let serialized = bincode::serialize(&superblock).unwrap();

        assert_eq!(serialized[0..4], [0x02, 0x01, 0x00, 0x00]);
        assert_eq!(serialized[4..8], [0x04, 0x03, 0x00, 0x00]);
        assert_eq!(serialized[8..12], [0x06, 0x05, 0x00, 0x00]);
    }

    #[test]
    fn test_rejects_zero_fields() {
        assert!(Superblock::new(0, 8, 4).is_err());
        assert!(Superblock::new(16, 0, 4).is_err());
        assert!(Superblock::new(16, 8, 0).is_err());
    }
}
