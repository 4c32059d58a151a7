use crate::error::{FsError, Result};

use super::inode::{BlockIndex, InodeIndex, INODE_SIZE};
use super::superblock::{Superblock, SUPERBLOCK_SIZE};

/// Byte offsets of every container region, derived from the superblock.
///
/// The container stores, in order: superblock, block bitmap, inode bitmap,
/// inode table, data blocks. A `Layout` is computed fresh from a freshly
/// read superblock on every operation; nothing caches one across calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Layout {
    block_size: u32,
    num_blocks: u32,
    num_inodes: u32,
    /// Offset of the block bitmap.
    pub block_bitmap_offset: u64,
    /// Offset of the inode bitmap.
    pub inode_bitmap_offset: u64,
    /// Offset of the inode table.
    pub inode_table_offset: u64,
    /// Offset of the first data block.
    pub data_blocks_offset: u64,
}

impl Layout {
    pub fn of(superblock: &Superblock) -> Layout {
        let block_bitmap_offset = SUPERBLOCK_SIZE as u64;
        let block_bitmap_len = bitmap_len(superblock.num_blocks);
        let inode_bitmap_offset = block_bitmap_offset + block_bitmap_len as u64;
        let inode_bitmap_len = bitmap_len(superblock.num_inodes);
        let inode_table_offset = inode_bitmap_offset + inode_bitmap_len as u64;
        let data_blocks_offset =
            inode_table_offset + superblock.num_inodes as u64 * INODE_SIZE as u64;

        Layout {
            block_size: superblock.block_size,
            num_blocks: superblock.num_blocks,
            num_inodes: superblock.num_inodes,
            block_bitmap_offset,
            inode_bitmap_offset,
            inode_table_offset,
            data_blocks_offset,
        }
    }

    /// The block bitmap's length in bytes.
    pub fn block_bitmap_len(&self) -> usize {
        bitmap_len(self.num_blocks)
    }

    /// The inode bitmap's length in bytes.
    pub fn inode_bitmap_len(&self) -> usize {
        bitmap_len(self.num_inodes)
    }

    /// Offset of an inode record. An out-of-range index is a layout
    /// violation: indices only enter the system from bitmaps and directory
    /// entries that are bounded by the superblock.
    pub fn inode_offset(&self, index: InodeIndex) -> Result<u64> {
        if index >= self.num_inodes {
            return Err(FsError::Corrupt(format!(
                "inode index {index} out of range ({} slots)",
                self.num_inodes
            )));
        }

        Ok(self.inode_table_offset + index as u64 * INODE_SIZE as u64)
    }

    /// Offset of a data block. An out-of-range index is a layout violation.
    pub fn block_offset(&self, index: BlockIndex) -> Result<u64> {
        if index >= self.num_blocks {
            return Err(FsError::Corrupt(format!(
                "block index {index} out of range ({} blocks)",
                self.num_blocks
            )));
        }

        Ok(self.data_blocks_offset + index as u64 * self.block_size as u64)
    }

    /// The container's total length in bytes.
    pub fn container_len(&self) -> u64 {
        self.data_blocks_offset + self.num_blocks as u64 * self.block_size as u64
    }
}

fn bitmap_len(bits: u32) -> usize {
    (bits as usize).div_ceil(8)
}
