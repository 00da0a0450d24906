//! the SFS storage engine
pub mod bitmap;
pub mod device;
pub mod error;
pub mod fs_layout;
pub mod inode;
pub mod superblock;
mod directory;
pub use bitmap::*;
pub use device::*;
pub use error::*;
pub use fs_layout::*;
pub use inode::*;
pub(crate) use directory::*;
pub use superblock::*;

/// size of one block in bytes
pub const BLOCK_SIZE: usize = 1024;
/// number of blocks on the device
pub const BLOCK_COUNT: usize = 100;
/// number of records in the inode table
pub const INODE_COUNT: usize = 127;
/// total image size in bytes
pub const DISK_SIZE: usize = BLOCK_COUNT * BLOCK_SIZE;

/// block number of the superblock
pub const SUPERBLOCK_BLOCK: usize = 0;
/// block number of the block bitmap
pub const BLOCK_BITMAP_BLOCK: usize = 1;
/// block number of the inode bitmap
pub const INODE_BITMAP_BLOCK: usize = 2;
/// block number of the inode table
pub const INODE_TABLE_BLOCK: usize = 3;
/// blocks 0 through 3 are metadata and never enter the free pool
pub const RESERVED_BLOCKS: usize = 4;

/// block pointers per inode
pub const DIRECT_POINTERS: usize = 3;
/// directory entries per directory-entry block
pub const ENTRIES_PER_BLOCK: usize = 4;
/// a directory spans at most three entry blocks of four entries each
pub const DIR_CAPACITY: usize = DIRECT_POINTERS * ENTRIES_PER_BLOCK;
/// bytes of the name field inside a directory entry, terminator included
pub const NAME_FIELD_SIZE: usize = 252;
/// largest usable name length
pub const MAX_NAME_LEN: usize = NAME_FIELD_SIZE - 1;
/// a file spans at most three data blocks
pub const MAX_FILE_SIZE: usize = DIRECT_POINTERS * BLOCK_SIZE;

/// inode-table slot of the root directory
pub const ROOT_INODE: usize = 0;

/// clearing a block writes this byte everywhere; the bitmap digit and
/// directory used-flag encodings both read it as "unused"
pub const FILL_BYTE: u8 = b'0';
