pub mod bitmap;
pub mod checksum;
pub mod disk_format;
mod error;
pub mod fs;
pub mod path;
pub mod storage;

pub use error::{FsError, Result};
pub use fs::{add_dir, add_file, check, format, read_file, remove, rename, Fs};
