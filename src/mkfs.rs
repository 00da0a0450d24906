//! create and format a new disk image
use crate::fs::{
    Inode, InodeKind, SuperBlock, BLOCK_BITMAP_BLOCK, BLOCK_COUNT, BLOCK_SIZE, DISK_SIZE,
    FILL_BYTE, INODE_BITMAP_BLOCK, INODE_COUNT, INODE_RECORD_SIZE, INODE_TABLE_BLOCK,
    RESERVED_BLOCKS, ROOT_INODE, SUPERBLOCK_BLOCK,
};
use byte_unit::Byte;
use log::info;
use memmap2::MmapMut;
use std::{fs::OpenOptions, path::Path};

/// create a new disk image, given the path of the image file
///
/// Writes the superblock, a block bitmap with the four metadata blocks
/// marked used, an inode bitmap with the root slot marked used, and an
/// inode table whose slot 0 is an empty root directory. Fails if the
/// image file already exists.
/// # Return
/// an [anyhow::Result] type to indicate whether the operation is successful
pub fn mkfs<P>(image_file_path: P) -> anyhow::Result<()>
where
    P: AsRef<Path>,
{
    let image_file_path = image_file_path.as_ref();
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create_new(true)
        .open(image_file_path)?;
    file.set_len(DISK_SIZE as u64)?;

    // Safety
    // This method returns an error when the underlying system call fails,
    // which can happen for a variety of reasons,
    // such as when the file is not open with read and write permissions.
    // from https://docs.rs/memmap2/0.5.10/memmap2/struct.MmapMut.html
    let mut map = unsafe { MmapMut::map_mut(&file)? };

    // a cleared block reads as all-free bitmaps, all-unset inode records
    // and all-unused directory entries alike
    map.fill(FILL_BYTE);

    // superblock: the two format-time capacities
    let superblock = SuperBlock::new(BLOCK_COUNT, INODE_COUNT);
    map[SUPERBLOCK_BLOCK * BLOCK_SIZE..][..BLOCK_SIZE].copy_from_slice(&superblock.encode());

    // the metadata blocks never enter the free pool
    for block in 0..RESERVED_BLOCKS {
        map[BLOCK_BITMAP_BLOCK * BLOCK_SIZE + block] = b'1';
    }

    // slot 0 is the root directory
    map[INODE_BITMAP_BLOCK * BLOCK_SIZE + ROOT_INODE] = b'1';
    let root = Inode::new(InodeKind::Directory);
    root.encode(
        &mut map[INODE_TABLE_BLOCK * BLOCK_SIZE + ROOT_INODE * INODE_RECORD_SIZE..]
            [..INODE_RECORD_SIZE],
    );

    map.flush()?;
    info!(
        "formatted {} image at {}",
        Byte::from_bytes(DISK_SIZE as u128).get_appropriate_unit(true),
        image_file_path.display()
    );
    Ok(())
}
