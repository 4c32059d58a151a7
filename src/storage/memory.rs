use std::cell::RefCell;
use std::io;
use std::rc::Rc;

use crate::error::{FsError, Result};

use super::container_storage::ContainerStorage;

/// A container held entirely in memory. Used by tests in place of a real
/// file. Clones share the same buffer, which lets a test reopen the
/// "container" it just wrote.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    data: Rc<RefCell<Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_range(&self, offset: u64, len: usize) -> Result<usize> {
        let offset = offset as usize;
        let end = offset
            .checked_add(len)
            .ok_or_else(|| out_of_range(offset, len))?;

        if end > self.data.borrow().len() {
            return Err(out_of_range(offset, len));
        }

        Ok(offset)
    }
}

fn out_of_range(offset: usize, len: usize) -> FsError {
    FsError::Io(io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!("{len} bytes at offset {offset} is past the end of the container"),
    ))
}

impl ContainerStorage for MemoryStorage {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let offset = self.check_range(offset, buf.len())?;
        buf.copy_from_slice(&self.data.borrow()[offset..offset + buf.len()]);

        Ok(())
    }

    fn write_at(&self, offset: u64, data: &[u8]) -> Result<()> {
        let offset = self.check_range(offset, data.len())?;
        self.data.borrow_mut()[offset..offset + data.len()].copy_from_slice(data);

        Ok(())
    }

    fn set_len(&self, len: u64) -> Result<()> {
        self.data.borrow_mut().resize(len as usize, 0);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let storage = MemoryStorage::new();
        storage.set_len(8).unwrap();
        storage.write_at(2, &[0xab, 0xcd]).unwrap();

        let mut buf = [0; 4];
        storage.read_at(1, &mut buf).unwrap();
        assert_eq!(buf, [0x00, 0xab, 0xcd, 0x00]);
    }

    #[test]
    fn test_out_of_range_access_fails() {
        let storage = MemoryStorage::new();
        storage.set_len(8).unwrap();

        let mut buf = [0; 4];
        assert!(storage.read_at(6, &mut buf).is_err());
        assert!(storage.write_at(6, &buf).is_err());
    }

    #[test]
    fn test_set_len_zero_fills() {
        let storage = MemoryStorage::new();
        storage.set_len(4).unwrap();

        let mut buf = [0xff; 4];
        storage.read_at(0, &mut buf).unwrap();
        assert_eq!(buf, [0; 4]);
    }
}
