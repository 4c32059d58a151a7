use std::fmt::{self, Debug};
use std::mem::size_of;

use serde::{Deserialize, Serialize};

// Inode and block indices are 4-byte fields on disk. We keep them as `u32`
// in memory and cast at the bitmap boundary.
pub type InodeIndex = u32;
pub type BlockIndex = u32;

/// The number of bytes occupied by one inode record.
pub const INODE_SIZE: usize = 28;
const_assert!(size_of::<Inode>() == INODE_SIZE);

/// The number of direct block pointers per inode. There is no indirection;
/// this bounds file size at `NUM_DIRECT * block_size`.
pub const NUM_DIRECT: usize = 3;

/// The maximum stored length of an inode name. Longer names are silently
/// truncated on store.
pub const MAX_NAME_LEN: usize = 10;

/// The root directory always occupies inode slot 0.
pub const ROOT_INODE: InodeIndex = 0;

/// Data block 0 belongs to the root directory's entry list. A `0` in a
/// direct slot otherwise means "unset", so block 0 is never handed out as
/// a normal data block.
pub const ROOT_DIRECTORY_BLOCK: BlockIndex = 0;

/// A free inode slot. `used == false` implies every other field is zeroed.
pub const FREE_INODE: Inode = Inode {
    used: false,
    is_directory: false,
    name: InodeName(*b"\0\0\0\0\0\0\0\0\0\0"),
    size: 0,
    direct: [0; NUM_DIRECT],
};

/// One fixed-width inode record describing a file or directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(C)]
pub struct Inode {
    /// Whether this slot is in use.
    pub used: bool,
    /// Whether this inode describes a directory.
    pub is_directory: bool,
    /// The entry name, zero-padded.
    pub name: InodeName,
    /// Content length in bytes for a file; entry-count×4 for a directory.
    pub size: u32,
    /// Data block indices, in content order.
    pub direct: [BlockIndex; NUM_DIRECT],
}

impl Inode {
    pub fn new_file(name: InodeName, size: u32) -> Self {
        Inode {
            used: true,
            is_directory: false,
            name,
            size,
            direct: [0; NUM_DIRECT],
        }
    }

    pub fn new_directory(name: InodeName) -> Self {
        Inode {
            used: true,
            is_directory: true,
            name,
            size: 0,
            direct: [0; NUM_DIRECT],
        }
    }

    /// The number of direct slots this inode occupies.
    ///
    /// Occupancy is derived from `size`, never from scanning for the `0`
    /// sentinel: the root's entry list legitimately lives in block 0.
    pub fn occupied_block_count(&self, block_size: u32) -> usize {
        (self.size as usize).div_ceil(block_size as usize)
    }

    /// The data blocks this inode occupies, in content order.
    pub fn occupied_blocks(&self, block_size: u32) -> &[BlockIndex] {
        &self.direct[..self.occupied_block_count(block_size)]
    }
}

/// A bounded inode name.
///
/// Stored as exactly [`MAX_NAME_LEN`] bytes with unused bytes zero. Names
/// longer than that are truncated on store, a documented legacy behavior.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct InodeName([u8; MAX_NAME_LEN]);

impl InodeName {
    /// The root directory's name.
    pub const ROOT: InodeName = InodeName(*b"/\0\0\0\0\0\0\0\0\0");

    /// Builds a name from a path component, silently truncating to
    /// [`MAX_NAME_LEN`] bytes.
    pub fn truncate_from(component: &str) -> Self {
        let bytes = component.as_bytes();
        let len = bytes.len().min(MAX_NAME_LEN);

        let mut stored = [0; MAX_NAME_LEN];
        stored[..len].copy_from_slice(&bytes[..len]);

        InodeName(stored)
    }

    /// The stored bytes, without zero padding.
    pub fn as_bytes(&self) -> &[u8] {
        let end = self
            .0
            .iter()
            .position(|byte| *byte == 0)
            .unwrap_or(MAX_NAME_LEN);

        &self.0[..end]
    }

    /// Whether a path component exactly matches the stored name.
    ///
    /// The component is compared untruncated, so a name that was truncated
    /// on store only matches its truncated form.
    pub fn matches(&self, component: &str) -> bool {
        self.as_bytes() == component.as_bytes()
    }
}

impl fmt::Display for InodeName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.as_bytes()))
    }
}

impl Debug for InodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("InodeName")
            .field(&String::from_utf8_lossy(self.as_bytes()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_size() {
        let serialized = bincode::serialize(&FREE_INODE).unwrap();
        assert_eq!(serialized.len(), INODE_SIZE);
    }

    #[test]
    fn test_free_inode_is_all_zeroes() {
        let serialized = bincode::serialize(&FREE_INODE).unwrap();
        assert!(serialized.iter().all(|byte| *byte == 0));
    }

    #[test]
    fn test_roundtrip() {
        let mut inode = Inode::new_file(InodeName::truncate_from("a.txt"), 5);
        inode.direct[0] = 2;

        let serialized = bincode::serialize(&inode).unwrap();
        let deserialized: Inode = bincode::deserialize(&serialized).unwrap();

        assert_eq!(deserialized, inode);
    }

    #[test]
    fn test_name_truncates_silently() {
        let name = InodeName::truncate_from("longfilename.txt");
        assert_eq!(name.as_bytes(), b"longfilena");
    }

    #[test]
    fn test_name_matches_exactly() {
        let name = InodeName::truncate_from("a.txt");

        assert!(name.matches("a.txt"));
        assert!(!name.matches("a.tx"));
        assert!(!name.matches("a.txt2"));
    }

    #[test]
    fn test_truncated_name_matches_truncated_form_only() {
        let name = InodeName::truncate_from("longfilename.txt");

        assert!(name.matches("longfilena"));
        assert!(!name.matches("longfilename.txt"));
    }

    #[test]
    fn test_occupied_block_count_is_size_driven() {
        let mut root = Inode::new_directory(InodeName::ROOT);
        root.size = 8;
        assert_eq!(root.occupied_block_count(16), 1);
        assert_eq!(root.occupied_blocks(16), &[ROOT_DIRECTORY_BLOCK]);

        let empty = Inode::new_file(InodeName::truncate_from("empty"), 0);
        assert_eq!(empty.occupied_block_count(16), 0);

        let mut file = Inode::new_file(InodeName::truncate_from("f"), 33);
        file.direct = [4, 5, 6];
        assert_eq!(file.occupied_block_count(16), 3);
        assert_eq!(file.occupied_blocks(16), &[4, 5, 6]);
    }
}
