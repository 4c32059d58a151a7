/// Perform a const assertion.
macro_rules! const_assert {
    ($($tt:tt)*) => {
        const _: () = assert!($($tt)*);
    }
}

/// Directory entry lists.
pub mod directory;
/// Inodes and inode names.
pub mod inode;
/// Region offsets derived from the superblock.
pub mod layout;
/// The container superblock.
pub mod superblock;
