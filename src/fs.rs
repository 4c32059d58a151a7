use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

use log::{info, warn};

use crate::bitmap::Bitmap;
use crate::disk_format::directory::{self, entries_per_block, ENTRY_SIZE};
use crate::disk_format::inode::{
    BlockIndex, Inode, InodeIndex, InodeName, FREE_INODE, INODE_SIZE, NUM_DIRECT,
    ROOT_DIRECTORY_BLOCK, ROOT_INODE,
};
use crate::disk_format::layout::Layout;
use crate::disk_format::superblock::{Superblock, SUPERBLOCK_SIZE};
use crate::error::{FsError, Result};
use crate::path;
use crate::storage::{ContainerStorage, FileBackedStorage};

/// A formatted container and the operations on it.
///
/// Holds nothing but the storage seam and the superblock read at open
/// time; bitmaps, inodes, and blocks are re-read by every operation and
/// written back before it returns. The container file is the sole
/// persistent state.
pub struct Fs<S: ContainerStorage> {
    storage: S,
    superblock: Superblock,
}

impl<S: ContainerStorage> Fs<S> {
    /// Formats `storage` as an empty filesystem: superblock, zeroed
    /// bitmaps and inode table, zeroed data blocks, and a root directory
    /// at inode 0 whose `.`/`..` entries point at itself in data block 0.
    pub fn format(storage: S, block_size: u32, num_blocks: u32, num_inodes: u32) -> Result<Self> {
        let superblock = Superblock::new(block_size, num_blocks, num_inodes)?;
        let layout = Layout::of(&superblock);

        // drop any previous contents, then zero-fill the whole layout
        storage.set_len(0)?;
        storage.set_len(layout.container_len())?;

        storage.write_at(0, &bincode::serialize(&superblock)?)?;

        let fs = Fs {
            storage,
            superblock,
        };

        let mut block_bitmap = fs.load_block_bitmap()?;
        block_bitmap.set(ROOT_DIRECTORY_BLOCK as usize, true)?;
        block_bitmap.flush(&fs.storage)?;

        let mut inode_bitmap = fs.load_inode_bitmap()?;
        inode_bitmap.set(ROOT_INODE as usize, true)?;
        inode_bitmap.flush(&fs.storage)?;

        let mut root = Inode::new_directory(InodeName::ROOT);
        root.direct[0] = ROOT_DIRECTORY_BLOCK;

        let entries = [ROOT_INODE, ROOT_INODE];
        fs.write_block(
            ROOT_DIRECTORY_BLOCK,
            &directory::encode_entries(&entries, block_size)?,
        )?;
        root.size = (entries.len() * ENTRY_SIZE) as u32;
        fs.write_inode(ROOT_INODE, &root)?;

        info!("formatted container: {num_blocks} blocks of {block_size} bytes, {num_inodes} inodes");

        Ok(fs)
    }

    /// Opens a formatted container, validating its superblock and probing
    /// that the storage spans the derived layout.
    pub fn open(storage: S) -> Result<Self> {
        let mut buf = [0; SUPERBLOCK_SIZE];
        storage.read_at(0, &mut buf)?;

        let superblock: Superblock = bincode::deserialize(&buf)?;
        superblock.validate()?;

        let layout = Layout::of(&superblock);
        let mut probe = [0; 1];
        storage.read_at(layout.container_len() - 1, &mut probe)?;

        Ok(Fs {
            storage,
            superblock,
        })
    }

    pub fn superblock(&self) -> &Superblock {
        &self.superblock
    }

    /// The region offsets for this container, derived fresh from the
    /// superblock.
    pub fn layout(&self) -> Layout {
        Layout::of(&self.superblock)
    }

    fn load_block_bitmap(&self) -> Result<Bitmap> {
        Bitmap::load(
            &self.storage,
            self.layout().block_bitmap_offset,
            self.superblock.num_blocks as usize,
        )
    }

    fn load_inode_bitmap(&self) -> Result<Bitmap> {
        Bitmap::load(
            &self.storage,
            self.layout().inode_bitmap_offset,
            self.superblock.num_inodes as usize,
        )
    }

    /// Reads one inode record from its table slot.
    pub fn read_inode(&self, index: InodeIndex) -> Result<Inode> {
        let offset = self.layout().inode_offset(index)?;

        let mut buf = [0; INODE_SIZE];
        self.storage.read_at(offset, &mut buf)?;

        Ok(bincode::deserialize(&buf)?)
    }

    /// Writes one inode record to its table slot.
    pub fn write_inode(&self, index: InodeIndex, inode: &Inode) -> Result<()> {
        let offset = self.layout().inode_offset(index)?;
        self.storage.write_at(offset, &bincode::serialize(inode)?)
    }

    fn read_block(&self, index: BlockIndex) -> Result<Vec<u8>> {
        let offset = self.layout().block_offset(index)?;

        let mut buf = vec![0; self.superblock.block_size as usize];
        self.storage.read_at(offset, &mut buf)?;

        Ok(buf)
    }

    fn write_block(&self, index: BlockIndex, data: &[u8]) -> Result<()> {
        let offset = self.layout().block_offset(index)?;
        self.storage.write_at(offset, data)
    }

    /// Reads a directory's entry list from its single data block.
    pub fn read_entries(&self, inode: &Inode) -> Result<Vec<InodeIndex>> {
        if inode.size == 0 {
            return Ok(vec![]);
        }

        let block = self.read_block(inode.direct[0])?;
        directory::decode_entries(&block, inode.size)
    }

    /// Rewrites a directory's entry list, allocating its block on first
    /// use, and keeps `size` equal to `entries.len() * 4`.
    fn write_entries(
        &self,
        dir_index: InodeIndex,
        dir: &mut Inode,
        entries: &[InodeIndex],
        block_bitmap: &mut Bitmap,
    ) -> Result<()> {
        if entries.is_empty() {
            dir.size = 0;
            return self.write_inode(dir_index, dir);
        }

        let encoded = directory::encode_entries(entries, self.superblock.block_size)?;

        self.reserve_directory_block(dir, block_bitmap)?;
        self.write_block(dir.direct[0], &encoded)?;

        dir.size = (entries.len() * ENTRY_SIZE) as u32;
        self.write_inode(dir_index, dir)
    }

    /// Ensures a directory owns its entry block. Idempotent.
    fn reserve_directory_block(&self, dir: &mut Inode, block_bitmap: &mut Bitmap) -> Result<()> {
        if dir.size == 0 && dir.direct[0] == 0 {
            let block = block_bitmap
                .first_zero()
                .ok_or(FsError::ResourceExhausted("blocks"))?;
            block_bitmap.set(block, true)?;
            dir.direct[0] = block as BlockIndex;
        }

        Ok(())
    }

    /// Resolves a path to an inode index by walking directory entries from
    /// the root.
    pub fn resolve(&self, target: &str) -> Result<InodeIndex> {
        self.resolve_components(&path::components(target))
    }

    fn resolve_components(&self, parts: &[&str]) -> Result<InodeIndex> {
        let mut current = ROOT_INODE;
        for part in parts {
            current = self.lookup_child(current, part)?;
        }

        Ok(current)
    }

    /// Finds `name` among a directory's entries. The first match in stored
    /// entry order wins; duplicate names are not prevented.
    fn lookup_child(&self, dir_index: InodeIndex, name: &str) -> Result<InodeIndex> {
        let dir = self.read_inode(dir_index)?;
        if !dir.is_directory {
            return Err(FsError::NotADirectory(dir.name.to_string()));
        }

        for entry in self.read_entries(&dir)? {
            let inode = self.read_inode(entry)?;
            if inode.used && inode.name.matches(name) {
                return Ok(entry);
            }
        }

        Err(FsError::NotFound(name.to_string()))
    }

    /// Creates a file at `file_path` holding `content`.
    ///
    /// The final path component becomes the file's name, silently
    /// truncated to 10 bytes. Content is limited to 3 direct blocks. All
    /// exhaustion and capacity checks pass before anything is written.
    pub fn add_file(&mut self, file_path: &str, content: &[u8]) -> Result<()> {
        let (parent_parts, name) = path::split_parent(file_path)?;
        let parent_index = self.resolve_components(&parent_parts)?;
        let mut parent = self.read_inode(parent_index)?;
        if !parent.is_directory {
            return Err(FsError::NotADirectory(parent.name.to_string()));
        }

        let mut inode_bitmap = self.load_inode_bitmap()?;
        let mut block_bitmap = self.load_block_bitmap()?;

        let index = inode_bitmap
            .first_zero()
            .ok_or(FsError::ResourceExhausted("inodes"))? as InodeIndex;

        let block_size = self.superblock.block_size;
        let blocks_needed = content.len().div_ceil(block_size as usize);
        if blocks_needed > NUM_DIRECT {
            return Err(FsError::CapacityExceeded {
                needed: blocks_needed,
                limit: NUM_DIRECT,
            });
        }

        let blocks = block_bitmap
            .first_zeros(blocks_needed)
            .ok_or(FsError::ResourceExhausted("blocks"))?;

        let mut entries = self.read_entries(&parent)?;
        if entries.len() + 1 > entries_per_block(block_size) {
            return Err(FsError::ResourceExhausted("directory entries"));
        }

        inode_bitmap.set(index as usize, true)?;
        for block in &blocks {
            block_bitmap.set(*block, true)?;
        }
        // the parent's own entry block, if it doesn't have one yet
        self.reserve_directory_block(&mut parent, &mut block_bitmap)?;

        for (i, block) in blocks.iter().enumerate() {
            let start = i * block_size as usize;
            let end = (start + block_size as usize).min(content.len());

            // zero-pad the tail of the final occupied block
            let mut data = vec![0; block_size as usize];
            data[..end - start].copy_from_slice(&content[start..end]);
            self.write_block(*block as BlockIndex, &data)?;
        }

        let mut inode = Inode::new_file(InodeName::truncate_from(name), content.len() as u32);
        for (slot, block) in inode.direct.iter_mut().zip(&blocks) {
            *slot = *block as BlockIndex;
        }
        self.write_inode(index, &inode)?;

        entries.push(index);
        self.write_entries(parent_index, &mut parent, &entries, &mut block_bitmap)?;

        inode_bitmap.flush(&self.storage)?;
        block_bitmap.flush(&self.storage)?;

        info!(
            "added file {file_path:?} as inode {index} ({} bytes in {blocks_needed} blocks)",
            content.len()
        );

        Ok(())
    }

    /// Creates a directory at `dir_path` with its `.`/`..` self entries.
    pub fn add_dir(&mut self, dir_path: &str) -> Result<()> {
        let (parent_parts, name) = path::split_parent(dir_path)?;
        let parent_index = self.resolve_components(&parent_parts)?;
        let mut parent = self.read_inode(parent_index)?;
        if !parent.is_directory {
            return Err(FsError::NotADirectory(parent.name.to_string()));
        }

        let mut inode_bitmap = self.load_inode_bitmap()?;
        let mut block_bitmap = self.load_block_bitmap()?;

        let index = inode_bitmap
            .first_zero()
            .ok_or(FsError::ResourceExhausted("inodes"))? as InodeIndex;
        let block = block_bitmap
            .first_zero()
            .ok_or(FsError::ResourceExhausted("blocks"))? as BlockIndex;

        let mut entries = self.read_entries(&parent)?;
        if entries.len() + 1 > entries_per_block(self.superblock.block_size) {
            return Err(FsError::ResourceExhausted("directory entries"));
        }

        inode_bitmap.set(index as usize, true)?;
        block_bitmap.set(block as usize, true)?;
        self.reserve_directory_block(&mut parent, &mut block_bitmap)?;

        let mut inode = Inode::new_directory(InodeName::truncate_from(name));
        inode.direct[0] = block;

        // a fresh directory's `.` and `..` both reference itself
        let self_entries = [index, index];
        self.write_entries(index, &mut inode, &self_entries, &mut block_bitmap)?;

        entries.push(index);
        self.write_entries(parent_index, &mut parent, &entries, &mut block_bitmap)?;

        inode_bitmap.flush(&self.storage)?;
        block_bitmap.flush(&self.storage)?;

        info!("added directory {dir_path:?} as inode {index} with entry block {block}");

        Ok(())
    }

    /// Removes the entry at `target_path`, recursively for directories,
    /// and compacts the parent's entry list.
    pub fn remove(&mut self, target_path: &str) -> Result<()> {
        let (parent_parts, name) = path::split_parent(target_path)?;
        let parent_index = self.resolve_components(&parent_parts)?;
        let mut parent = self.read_inode(parent_index)?;
        if !parent.is_directory {
            return Err(FsError::NotADirectory(parent.name.to_string()));
        }

        let target = self.lookup_child(parent_index, name)?;

        let mut inode_bitmap = self.load_inode_bitmap()?;
        let mut block_bitmap = self.load_block_bitmap()?;

        self.remove_subtree(target, &mut inode_bitmap, &mut block_bitmap)?;

        // compact the parent's list; the vacated slot never stays as a hole
        let entries: Vec<InodeIndex> = self
            .read_entries(&parent)?
            .into_iter()
            .filter(|entry| *entry != target)
            .collect();
        self.write_entries(parent_index, &mut parent, &entries, &mut block_bitmap)?;

        inode_bitmap.flush(&self.storage)?;
        block_bitmap.flush(&self.storage)?;

        info!("removed {target_path:?} (inode {target})");

        Ok(())
    }

    /// Post-order removal of an inode and everything beneath it: children
    /// first, then the inode's blocks, then the record itself.
    fn remove_subtree(
        &self,
        index: InodeIndex,
        inode_bitmap: &mut Bitmap,
        block_bitmap: &mut Bitmap,
    ) -> Result<()> {
        let inode = self.read_inode(index)?;

        if inode.is_directory {
            for entry in self.read_entries(&inode)? {
                // `.` and `..` are stored as self-references; descending
                // into them would never terminate
                if entry == index {
                    continue;
                }

                self.remove_subtree(entry, inode_bitmap, block_bitmap)?;
            }
        }

        for block in inode.occupied_blocks(self.superblock.block_size) {
            block_bitmap.set(*block as usize, false)?;
        }

        inode_bitmap.set(index as usize, false)?;
        self.write_inode(index, &FREE_INODE)
    }

    /// Moves or renames the entry at `old_path` to `new_path`.
    ///
    /// The inode keeps its contents; its name becomes the new final
    /// component (silently truncated) and its index migrates between the
    /// parents' entry lists.
    pub fn rename(&mut self, old_path: &str, new_path: &str) -> Result<()> {
        let (old_parent_parts, old_name) = path::split_parent(old_path)?;
        let (new_parent_parts, new_name) = path::split_parent(new_path)?;

        let old_parent_index = self.resolve_components(&old_parent_parts)?;
        let source = self.lookup_child(old_parent_index, old_name)?;

        let new_parent_index = self.resolve_components(&new_parent_parts)?;
        let mut new_parent = self.read_inode(new_parent_index)?;
        if !new_parent.is_directory {
            return Err(FsError::NotADirectory(new_parent.name.to_string()));
        }

        let mut inode = self.read_inode(source)?;
        inode.name = InodeName::truncate_from(new_name);

        if old_parent_index == new_parent_index {
            // pure rename; the entry list is untouched
            self.write_inode(source, &inode)?;
            info!("renamed {old_path:?} to {new_path:?} (inode {source})");
            return Ok(());
        }

        if inode.is_directory && self.subtree_contains(source, new_parent_index)? {
            return Err(FsError::InvalidPath(format!(
                "{new_path:?} is inside {old_path:?}"
            )));
        }

        let mut new_entries = self.read_entries(&new_parent)?;
        if new_entries.len() + 1 > entries_per_block(self.superblock.block_size) {
            return Err(FsError::ResourceExhausted("directory entries"));
        }

        let mut block_bitmap = self.load_block_bitmap()?;
        // the destination's entry block, if it doesn't have one yet
        self.reserve_directory_block(&mut new_parent, &mut block_bitmap)?;

        let mut old_parent = self.read_inode(old_parent_index)?;
        let old_entries: Vec<InodeIndex> = self
            .read_entries(&old_parent)?
            .into_iter()
            .filter(|entry| *entry != source)
            .collect();

        self.write_inode(source, &inode)?;
        self.write_entries(old_parent_index, &mut old_parent, &old_entries, &mut block_bitmap)?;

        new_entries.push(source);
        self.write_entries(new_parent_index, &mut new_parent, &new_entries, &mut block_bitmap)?;

        block_bitmap.flush(&self.storage)?;

        info!("moved {old_path:?} to {new_path:?} (inode {source})");

        Ok(())
    }

    /// Whether `needle` lies in the subtree rooted at `index`.
    fn subtree_contains(&self, index: InodeIndex, needle: InodeIndex) -> Result<bool> {
        if index == needle {
            return Ok(true);
        }

        let inode = self.read_inode(index)?;
        if !inode.is_directory {
            return Ok(false);
        }

        for entry in self.read_entries(&inode)? {
            if entry != index && self.subtree_contains(entry, needle)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Reads a file's content back out of the container.
    pub fn read_file(&self, file_path: &str) -> Result<Vec<u8>> {
        let index = self.resolve(file_path)?;
        let inode = self.read_inode(index)?;
        if inode.is_directory {
            return Err(FsError::InvalidPath(format!(
                "{file_path:?} is a directory"
            )));
        }

        let block_size = self.superblock.block_size;
        let mut data = Vec::with_capacity(inode.size as usize);
        for block in inode.occupied_blocks(block_size) {
            let bytes = self.read_block(*block)?;
            let remaining = inode.size as usize - data.len();
            data.extend_from_slice(&bytes[..remaining.min(block_size as usize)]);
        }

        Ok(data)
    }

    /// Checks the container for consistency: the directory tree is a tree
    /// of used inodes rooted at `/`, sizes agree with occupancy, and both
    /// bitmaps agree with reachability in both directions.
    pub fn check(&self) -> Result<()> {
        let block_size = self.superblock.block_size;
        let block_bitmap = self.load_block_bitmap()?;
        let inode_bitmap = self.load_inode_bitmap()?;

        let root = self.read_inode(ROOT_INODE)?;
        if !root.used || !root.is_directory {
            return Err(FsError::Corrupt(
                "root inode is not a used directory".to_string(),
            ));
        }
        if !root.name.matches("/") {
            return Err(FsError::Corrupt("root inode is not named \"/\"".to_string()));
        }

        let mut queue = vec![ROOT_INODE];
        let mut reachable = HashSet::from([ROOT_INODE]);
        let mut referenced_blocks = HashSet::new();

        while let Some(index) = queue.pop() {
            let inode = self.read_inode(index)?;
            if !inode.used {
                return Err(FsError::Corrupt(format!(
                    "directory tree includes free inode {index}"
                )));
            }

            if inode.occupied_block_count(block_size) > NUM_DIRECT {
                return Err(FsError::Corrupt(format!(
                    "inode {index} is larger than its direct blocks can hold"
                )));
            }

            for block in inode.occupied_blocks(block_size) {
                if *block >= self.superblock.num_blocks {
                    return Err(FsError::Corrupt(format!(
                        "inode {index} references invalid block {block}"
                    )));
                }

                if !block_bitmap.get(*block as usize) {
                    return Err(FsError::Corrupt(format!(
                        "block {block} is referenced but not allocated"
                    )));
                }

                if !referenced_blocks.insert(*block) {
                    return Err(FsError::Corrupt(format!(
                        "block {block} is referenced twice"
                    )));
                }
            }

            if inode.is_directory {
                let entries = self.read_entries(&inode)?;

                if entries.is_empty() {
                    warn!("directory inode {index} has no entries");
                } else if entries.len() < 2 || entries[0] != index || entries[1] != index {
                    return Err(FsError::Corrupt(format!(
                        "directory inode {index} is missing its self entries"
                    )));
                }

                for entry in entries {
                    if entry == index {
                        continue;
                    }

                    if !reachable.insert(entry) {
                        return Err(FsError::Corrupt(format!(
                            "inode {entry} is referenced from more than one directory"
                        )));
                    }

                    queue.push(entry);
                }
            }
        }

        if !block_bitmap.get(ROOT_DIRECTORY_BLOCK as usize) {
            return Err(FsError::Corrupt(
                "reserved root block is not allocated".to_string(),
            ));
        }

        for block in 0..self.superblock.num_blocks {
            if block_bitmap.get(block as usize) && !referenced_blocks.contains(&block) {
                return Err(FsError::Corrupt(format!(
                    "block {block} is allocated but referenced by no inode"
                )));
            }
        }

        for index in 0..self.superblock.num_inodes {
            let inode = self.read_inode(index)?;

            if inode.used != inode_bitmap.get(index as usize) {
                return Err(FsError::Corrupt(format!(
                    "inode {index}'s used flag disagrees with the inode bitmap"
                )));
            }

            if inode.used && !reachable.contains(&index) {
                return Err(FsError::Corrupt(format!(
                    "inode {index} is allocated but unreachable from the root"
                )));
            }

            if !inode.used && inode != FREE_INODE {
                return Err(FsError::Corrupt(format!("free inode {index} is not zeroed")));
            }
        }

        info!(
            "container is consistent: {} used inodes, {} used blocks",
            reachable.len(),
            referenced_blocks.len()
        );

        Ok(())
    }
}

/// Creates (or truncates) and formats a container file.
pub fn format(container: &Path, block_size: u32, num_blocks: u32, num_inodes: u32) -> Result<()> {
    let file = File::options()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(container)?;
    Fs::format(FileBackedStorage::new(file), block_size, num_blocks, num_inodes)?;

    Ok(())
}

/// Adds a file holding `content` at `path` inside the container.
pub fn add_file(container: &Path, path: &str, content: &[u8]) -> Result<()> {
    open_container(container)?.add_file(path, content)
}

/// Adds a directory at `path` inside the container.
pub fn add_dir(container: &Path, path: &str) -> Result<()> {
    open_container(container)?.add_dir(path)
}

/// Removes the file or directory subtree at `path` inside the container.
pub fn remove(container: &Path, path: &str) -> Result<()> {
    open_container(container)?.remove(path)
}

/// Moves or renames an entry inside the container.
pub fn rename(container: &Path, old_path: &str, new_path: &str) -> Result<()> {
    open_container(container)?.rename(old_path, new_path)
}

/// Reads a file's content out of the container.
pub fn read_file(container: &Path, path: &str) -> Result<Vec<u8>> {
    open_container(container)?.read_file(path)
}

/// Checks the container for consistency.
pub fn check(container: &Path) -> Result<()> {
    open_container(container)?.check()
}

fn open_container(container: &Path) -> Result<Fs<FileBackedStorage>> {
    let file = File::options().read(true).write(true).open(container)?;
    Fs::open(FileBackedStorage::new(file))
}
