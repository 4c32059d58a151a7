use crate::error::{FsError, Result};

use super::inode::InodeIndex;

/// The number of bytes occupied by one directory entry: a single inode
/// index. Entry names live in the child inode itself.
pub const ENTRY_SIZE: usize = 4;

/// The number of entries a directory can hold. A directory owns exactly one
/// data block; this is a hard ceiling, not dynamically extensible.
pub fn entries_per_block(block_size: u32) -> usize {
    block_size as usize / ENTRY_SIZE
}

/// Decodes the first `size` bytes of a directory's block into its entry
/// list.
pub fn decode_entries(block: &[u8], size: u32) -> Result<Vec<InodeIndex>> {
    let size = size as usize;

    if size % ENTRY_SIZE != 0 {
        return Err(FsError::Corrupt(format!(
            "directory size {size} is not a multiple of {ENTRY_SIZE}"
        )));
    }

    if size > block.len() {
        return Err(FsError::Corrupt(format!(
            "directory size {size} exceeds its block ({} bytes)",
            block.len()
        )));
    }

    Ok(block[..size]
        .chunks_exact(ENTRY_SIZE)
        .map(|chunk| InodeIndex::from_le_bytes(chunk.try_into().expect("chunks are 4 bytes")))
        .collect())
}

/// Encodes an entry list into a full block image: packed indices followed
/// by zero padding, so stale bytes are never interpreted as entries.
pub fn encode_entries(entries: &[InodeIndex], block_size: u32) -> Result<Vec<u8>> {
    if entries.len() > entries_per_block(block_size) {
        return Err(FsError::ResourceExhausted("directory entries"));
    }

    let mut block = vec![0; block_size as usize];
    for (chunk, entry) in block.chunks_exact_mut(ENTRY_SIZE).zip(entries) {
        chunk.copy_from_slice(&entry.to_le_bytes());
    }

    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_empty() {
        let block = [0xfe; 16];
        assert_eq!(decode_entries(&block, 0).unwrap(), Vec::<InodeIndex>::new());
    }

    #[test]
    fn test_roundtrip_pads_with_zeroes() {
        let encoded = encode_entries(&[1, 1, 3], 16).unwrap();

        assert_eq!(encoded.len(), 16);
        assert_eq!(encoded[12..], [0; 4]);
        assert_eq!(decode_entries(&encoded, 12).unwrap(), vec![1, 1, 3]);
    }

    #[test]
    fn test_decode_rejects_ragged_size() {
        let block = [0; 16];
        assert!(matches!(
            decode_entries(&block, 6),
            Err(FsError::Corrupt(_))
        ));
    }

    #[test]
    fn test_decode_rejects_oversized_list() {
        let block = [0; 16];
        assert!(matches!(
            decode_entries(&block, 20),
            Err(FsError::Corrupt(_))
        ));
    }

    #[test]
    fn test_encode_rejects_full_directory() {
        let entries = [7; 5];
        assert!(matches!(
            encode_entries(&entries, 16),
            Err(FsError::ResourceExhausted("directory entries"))
        ));
    }
}
