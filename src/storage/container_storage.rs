use crate::error::Result;

/// Positioned access to a container.
///
/// Regions of the container (bitmaps, inode table) are not block-aligned,
/// so the seam works in byte offsets rather than whole blocks. Reads and
/// writes are exact: a short transfer is an error, never a partial success.
pub trait ContainerStorage {
    /// Fills `buf` from the container starting at `offset`.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()>;

    /// Writes `data` to the container starting at `offset`.
    fn write_at(&self, offset: u64, data: &[u8]) -> Result<()>;

    /// Resizes the container, zero-filling any added tail.
    fn set_len(&self, len: u64) -> Result<()>;
}
