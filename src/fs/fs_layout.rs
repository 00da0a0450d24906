//! what the mounted filesystem looks like in memory
//!
//! All metadata (superblock, both bitmaps, the inode table) is loaded at
//! mount and mutated in place; every mutating operation writes the touched
//! metadata blocks straight back to the image.
use std::path::Path;

use log::{debug, info};

use super::{
    bitmap::Bitmap,
    device::BlockDevice,
    directory::{DirBlock, DirEntry},
    error::{FsError, Result},
    inode::{InodeKind, InodeTable},
    superblock::SuperBlock,
    BLOCK_SIZE, DIRECT_POINTERS, MAX_FILE_SIZE, ROOT_INODE,
};

/// a mounted SFS image
#[derive(Debug)]
pub struct Sfs {
    device: BlockDevice,
    superblock: SuperBlock,
    block_bitmap: Bitmap,
    inode_bitmap: Bitmap,
    inodes: InodeTable,
    /// inode-table slot of the current directory
    cwd_inode: usize,
    /// name shown in the prompt for the current directory
    cwd_name: String,
}

/// where a new directory entry will go
enum InsertAt {
    /// a free entry inside an already-allocated entry block
    Existing { slot: usize, entry: usize },
    /// a pointer slot not yet backed by a block
    NewBlock { slot: usize },
}

/// a located directory entry: the target inode plus the coordinates of
/// the entry itself
struct FoundEntry {
    inode: usize,
    block_slot: usize,
    entry_index: usize,
}

impl Sfs {
    /// mount a disk image: read the superblock, both bitmaps and the
    /// inode table, and start navigation at the root directory
    pub fn mount<P>(image_path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let mut device = BlockDevice::open(image_path);
        let superblock = SuperBlock::load(&mut device)?;
        let block_bitmap = Bitmap::block_bitmap(&mut device, superblock.block_count)?;
        let inode_bitmap = Bitmap::inode_bitmap(&mut device, superblock.inode_count)?;
        let inodes = InodeTable::load(&mut device, superblock.inode_count)?;
        let fs = Sfs {
            device,
            superblock,
            block_bitmap,
            inode_bitmap,
            inodes,
            cwd_inode: ROOT_INODE,
            cwd_name: "/".to_string(),
        };
        // slot 0 must hold the root directory
        fs.dir_blocks(ROOT_INODE)?;
        info!(
            "mounted image: {} blocks, {} inode slots",
            fs.superblock.block_count, fs.superblock.inode_count
        );
        Ok(fs)
    }

    pub fn superblock(&self) -> &SuperBlock {
        &self.superblock
    }
}

/// navigation state
impl Sfs {
    /// the directory name the prompt displays
    pub fn cwd_name(&self) -> &str {
        &self.cwd_name
    }

    /// make the root directory the current directory
    pub fn reset_to_root(&mut self) {
        self.cwd_inode = ROOT_INODE;
        self.cwd_name = "/".to_string();
    }

    /// move into a sub-directory of the current directory
    pub fn change_dir(&mut self, name: &str) -> Result<()> {
        match self.scan_dir(self.cwd_inode, name, true)? {
            Some(found) => {
                self.cwd_inode = found.inode;
                // the prompt shows the bare target name, not an
                // accumulated path
                self.cwd_name = name.to_string();
                Ok(())
            }
            None => Err(FsError::NotFound(name.to_string())),
        }
    }
}

/// directory scanning
impl Sfs {
    /// the entry-block pointers of a directory inode
    ///
    /// Navigation must always point at a directory; anything else means
    /// the metadata is corrupted and the process has to stop.
    fn dir_blocks(&self, dir_inode: usize) -> Result<[u8; DIRECT_POINTERS]> {
        let record = self.inodes.get(dir_inode)?;
        if !record.is_dir() {
            return Err(FsError::Corrupted(format!(
                "inode {dir_inode} is not a directory"
            )));
        }
        Ok(record.blocks)
    }

    /// all used entries of the current directory with their target kinds,
    /// in block-slot order then in-block order
    pub fn list(&mut self) -> Result<Vec<(String, InodeKind)>> {
        let blocks = self.dir_blocks(self.cwd_inode)?;
        let mut listing = Vec::new();
        for &block in blocks.iter() {
            if block == 0 {
                continue;
            }
            let dir_block = DirBlock::decode(&self.device.read(block as usize)?);
            for entry in dir_block.entries.iter().filter(|e| e.used) {
                // entries referencing an unset inode are skipped, like the
                // original shell's listing did
                if let Some(kind) = self.inodes.get(entry.inode)?.kind {
                    listing.push((entry.name.clone(), kind));
                }
            }
        }
        Ok(listing)
    }

    /// find a used entry by name; `directories_only` skips file entries
    /// during the scan, so a file can never be changed into
    fn scan_dir(
        &mut self,
        dir_inode: usize,
        name: &str,
        directories_only: bool,
    ) -> Result<Option<FoundEntry>> {
        let blocks = self.dir_blocks(dir_inode)?;
        for (block_slot, &block) in blocks.iter().enumerate() {
            if block == 0 {
                continue;
            }
            let dir_block = DirBlock::decode(&self.device.read(block as usize)?);
            for (entry_index, entry) in dir_block.entries.iter().enumerate() {
                if !entry.used {
                    continue;
                }
                if directories_only && !self.inodes.get(entry.inode)?.is_dir() {
                    continue;
                }
                if entry.name == name {
                    return Ok(Some(FoundEntry {
                        inode: entry.inode,
                        block_slot,
                        entry_index,
                    }));
                }
            }
        }
        Ok(None)
    }

    /// single pass that rejects a name collision of any kind while
    /// recording the best place for a new entry: a free entry inside an
    /// allocated block wins over allocating a fresh block
    fn find_insert_slot(&mut self, dir_inode: usize, name: &str) -> Result<InsertAt> {
        let blocks = self.dir_blocks(dir_inode)?;
        let mut free_entry = None;
        let mut absent_slot = None;
        for (slot, &block) in blocks.iter().enumerate() {
            if block == 0 {
                if absent_slot.is_none() {
                    absent_slot = Some(slot);
                }
                continue;
            }
            let dir_block = DirBlock::decode(&self.device.read(block as usize)?);
            for (entry_index, entry) in dir_block.entries.iter().enumerate() {
                if !entry.used {
                    if free_entry.is_none() {
                        free_entry = Some((slot, entry_index));
                    }
                    continue;
                }
                if entry.name == name {
                    return Err(FsError::AlreadyExists(name.to_string()));
                }
            }
        }
        if let Some((slot, entry)) = free_entry {
            Ok(InsertAt::Existing { slot, entry })
        } else if let Some(slot) = absent_slot {
            Ok(InsertAt::NewBlock { slot })
        } else {
            Err(FsError::DirectoryFull)
        }
    }

    /// turn an insertion decision into concrete (entry block, entry index)
    /// coordinates, allocating and binding a fresh entry block if needed
    fn prepare_slot(&mut self, dir_inode: usize, at: InsertAt) -> Result<(usize, usize)> {
        match at {
            InsertAt::Existing { slot, entry } => {
                let block = self.dir_blocks(dir_inode)?[slot] as usize;
                Ok((block, entry))
            }
            InsertAt::NewBlock { slot } => {
                let block = self
                    .block_bitmap
                    .allocate(&mut self.device)
                    .map_err(surface_as_disk_full)?;
                // junk from past use must not read as live entries
                self.device.write(block, None)?;
                self.inodes.set_block(dir_inode, slot, block as u8)?;
                Ok((block, 0))
            }
        }
    }
}

/// creating directories and files
impl Sfs {
    /// create an empty sub-directory in the current directory
    pub fn make_dir(&mut self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(FsError::InvalidName);
        }
        if self.inode_bitmap.free_count() == 0 {
            return Err(FsError::InodeTableFull);
        }
        let at = self.find_insert_slot(self.cwd_inode, name)?;
        let (block, entry_index) = self.prepare_slot(self.cwd_inode, at)?;
        let child = self
            .inode_bitmap
            .allocate(&mut self.device)
            .map_err(surface_as_inode_table_full)?;

        let mut dir_block = DirBlock::decode(&self.device.read(block)?);
        dir_block.entries[entry_index] = DirEntry::new(name, child);
        self.device.write(block, Some(dir_block.encode().as_slice()))?;

        // the new directory owns no blocks yet
        self.inodes.clear(child)?;
        self.inodes.set_kind(child, Some(InodeKind::Directory))?;
        self.inodes.persist(&mut self.device)?;
        info!("created directory {name} at inode {child}");
        Ok(())
    }

    /// create a file in the current directory with the given content
    ///
    /// Content is truncated to [MAX_FILE_SIZE]; callers must not assume
    /// lossless storage beyond that bound. Empty content owns no blocks.
    pub fn create_file(&mut self, name: &str, content: &[u8]) -> Result<()> {
        if name.is_empty() {
            return Err(FsError::InvalidName);
        }
        if self.inode_bitmap.free_count() == 0 {
            return Err(FsError::InodeTableFull);
        }
        let at = self.find_insert_slot(self.cwd_inode, name)?;
        let (block, entry_index) = self.prepare_slot(self.cwd_inode, at)?;
        let child = self
            .inode_bitmap
            .allocate(&mut self.device)
            .map_err(surface_as_inode_table_full)?;

        let mut dir_block = DirBlock::decode(&self.device.read(block)?);
        dir_block.entries[entry_index] = DirEntry::new(name, child);
        self.device.write(block, Some(dir_block.encode().as_slice()))?;

        let content = &content[..content.len().min(MAX_FILE_SIZE)];
        self.inodes.clear(child)?;
        self.inodes.set_kind(child, Some(InodeKind::File))?;
        for (slot, chunk) in content.chunks(BLOCK_SIZE).enumerate() {
            let data_block = self
                .block_bitmap
                .allocate(&mut self.device)
                .map_err(surface_as_disk_full)?;
            self.device.write(data_block, Some(chunk))?;
            self.inodes.set_block(child, slot, data_block as u8)?;
        }
        self.inodes.persist(&mut self.device)?;
        info!(
            "created file {name} ({} bytes) at inode {child}",
            content.len()
        );
        Ok(())
    }
}

/// reading files
impl Sfs {
    /// the content of a file in the current directory
    ///
    /// Directories with the same name are not matched. Trailing zero
    /// padding from the final data block is trimmed off.
    pub fn read_file(&mut self, name: &str) -> Result<Vec<u8>> {
        let found = self
            .scan_dir(self.cwd_inode, name, false)?
            .ok_or_else(|| FsError::NotFound(name.to_string()))?;
        let record = self.inodes.get(found.inode)?;
        if !record.is_file() {
            return Err(FsError::NotFound(name.to_string()));
        }
        let blocks = record.present_blocks();
        let mut content = Vec::with_capacity(blocks.len() * BLOCK_SIZE);
        for block in blocks {
            content.extend_from_slice(&self.device.read(block as usize)?);
        }
        while content.last() == Some(&0) {
            content.pop();
        }
        Ok(content)
    }
}

/// removing entries
impl Sfs {
    /// remove a file or (recursively) a directory from the current
    /// directory
    pub fn remove_entry(&mut self, name: &str) -> Result<()> {
        self.remove_from(self.cwd_inode, name)
    }

    /// structural recursion on the child inode index; navigation state is
    /// never touched, so there is nothing to save and restore around the
    /// descent
    fn remove_from(&mut self, dir_inode: usize, name: &str) -> Result<()> {
        let found = self
            .scan_dir(dir_inode, name, false)?
            .ok_or_else(|| FsError::NotFound(name.to_string()))?;
        match self.inodes.get(found.inode)?.kind {
            Some(InodeKind::File) => self.release_file_inode(found.inode)?,
            Some(InodeKind::Directory) => {
                for child_name in self.child_names(found.inode)? {
                    self.remove_from(found.inode, &child_name)?;
                }
                // the children's removal already compacted all of its
                // entry blocks away
                self.inodes.clear(found.inode)?;
                self.inodes.persist(&mut self.device)?;
                self.inode_bitmap.release(&mut self.device, found.inode)?;
            }
            None => {
                return Err(FsError::Corrupted(format!(
                    "directory entry {name} references unset inode {}",
                    found.inode
                )))
            }
        }

        // clear the entry itself, then release any entry block of the
        // parent that just became empty
        let block = self.dir_blocks(dir_inode)?[found.block_slot] as usize;
        let mut dir_block = DirBlock::decode(&self.device.read(block)?);
        dir_block.entries[found.entry_index].used = false;
        self.device.write(block, Some(dir_block.encode().as_slice()))?;
        self.compact(dir_inode)?;
        debug!("removed {name} from inode {dir_inode}");
        Ok(())
    }

    fn release_file_inode(&mut self, inode: usize) -> Result<()> {
        for block in self.inodes.get(inode)?.present_blocks() {
            self.block_bitmap.release(&mut self.device, block as usize)?;
        }
        self.inodes.clear(inode)?;
        self.inodes.persist(&mut self.device)?;
        self.inode_bitmap.release(&mut self.device, inode)?;
        Ok(())
    }

    fn child_names(&mut self, dir_inode: usize) -> Result<Vec<String>> {
        let blocks = self.dir_blocks(dir_inode)?;
        let mut names = Vec::new();
        for &block in blocks.iter() {
            if block == 0 {
                continue;
            }
            let dir_block = DirBlock::decode(&self.device.read(block as usize)?);
            for entry in dir_block.entries.iter().filter(|e| e.used) {
                names.push(entry.name.clone());
            }
        }
        Ok(names)
    }

    /// release every entry block of a directory whose four entries are all
    /// unused and clear the matching inode pointer
    fn compact(&mut self, dir_inode: usize) -> Result<()> {
        let blocks = self.dir_blocks(dir_inode)?;
        for (slot, &block) in blocks.iter().enumerate() {
            if block == 0 {
                continue;
            }
            let dir_block = DirBlock::decode(&self.device.read(block as usize)?);
            if dir_block.is_empty() {
                self.block_bitmap.release(&mut self.device, block as usize)?;
                self.inodes.set_block(dir_inode, slot, 0)?;
            }
        }
        self.inodes.persist(&mut self.device)
    }
}

/// usage statistics
impl Sfs {
    /// free block and inode counts, recounted from the bitmaps
    pub fn stat(&self) -> (usize, usize) {
        (
            self.block_bitmap.recount_free(),
            self.inode_bitmap.recount_free(),
        )
    }
}

fn surface_as_disk_full(error: FsError) -> FsError {
    match error {
        FsError::ResourceExhausted => FsError::DiskFull,
        other => other,
    }
}

fn surface_as_inode_table_full(error: FsError) -> FsError {
    match error {
        FsError::ResourceExhausted => FsError::InodeTableFull,
        other => other,
    }
}
