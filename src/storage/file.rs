use std::fs::File;
use std::os::unix::prelude::FileExt;

use crate::error::Result;

use super::container_storage::ContainerStorage;

/// A container backed by a file on the local filesystem.
pub struct FileBackedStorage(File);

impl FileBackedStorage {
    pub fn new(file: File) -> Self {
        FileBackedStorage(file)
    }
}

impl ContainerStorage for FileBackedStorage {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.0.read_exact_at(buf, offset)?;

        Ok(())
    }

    fn write_at(&self, offset: u64, data: &[u8]) -> Result<()> {
        self.0.write_all_at(data, offset)?;

        Ok(())
    }

    fn set_len(&self, len: u64) -> Result<()> {
        self.0.set_len(len)?;

        Ok(())
    }
}
