use bitvec::order::Lsb0;
use bitvec::vec::BitVec;

use crate::error::{FsError, Result};
use crate::storage::ContainerStorage;

/// An allocation bitmap tied to its region of the container.
///
/// One bit per resource slot (data block or inode), LSB-first within each
/// byte, `1` = allocated. Loaded from the container at the start of an
/// operation and flushed back after the operation's checks have passed.
pub struct Bitmap {
    bits: BitVec<u8, Lsb0>,
    offset: u64,
}

impl Bitmap {
    /// Reads `len_bits` allocation bits from the container at `offset`.
    pub fn load<S: ContainerStorage>(storage: &S, offset: u64, len_bits: usize) -> Result<Self> {
        let mut bytes = vec![0; len_bits.div_ceil(8)];
        storage.read_at(offset, &mut bytes)?;

        let mut bits = BitVec::from_vec(bytes);
        bits.truncate(len_bits);

        Ok(Bitmap { bits, offset })
    }

    /// Writes the bitmap back to its container region.
    pub fn flush<S: ContainerStorage>(&self, storage: &S) -> Result<()> {
        storage.write_at(self.offset, self.bits.as_raw_slice())
    }

    pub fn get(&self, index: usize) -> bool {
        self.bits.get(index).map(|bit| *bit).unwrap_or(false)
    }

    /// Sets or clears one allocation bit. Idempotent. An out-of-range index
    /// is a layout violation: indices only enter the system from records
    /// bounded by the superblock.
    pub fn set(&mut self, index: usize, allocated: bool) -> Result<()> {
        if index >= self.bits.len() {
            return Err(FsError::Corrupt(format!(
                "bitmap index {index} out of range ({} bits)",
                self.bits.len()
            )));
        }

        self.bits.set(index, allocated);

        Ok(())
    }

    /// The lowest free index, if any.
    pub fn first_zero(&self) -> Option<usize> {
        self.bits.first_zero()
    }

    /// The `n` lowest free indices in ascending order. All-or-nothing:
    /// fewer than `n` free slots yields no allocation at all.
    pub fn first_zeros(&self, n: usize) -> Option<Vec<usize>> {
        let free: Vec<usize> = self.bits.iter_zeros().take(n).collect();

        (free.len() == n).then_some(free)
    }

    pub fn count_ones(&self) -> usize {
        self.bits.count_ones()
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }
}
