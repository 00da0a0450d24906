//! block 0: the format-time capacities of the image
use crate::utils::fixed;

use super::{
    device::BlockDevice, error::FsError, error::Result, BLOCK_COUNT, BLOCK_SIZE, FILL_BYTE,
    INODE_COUNT, RESERVED_BLOCKS, SUPERBLOCK_BLOCK,
};

/// the superblock of this filesystem
///
/// Two fixed-width decimal fields, read once at mount and immutable for
/// the process lifetime. The rest of block 0 is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuperBlock {
    /// total number of blocks on the device
    pub block_count: usize,
    /// total number of inode-table slots
    pub inode_count: usize,
}

impl SuperBlock {
    pub fn new(block_count: usize, inode_count: usize) -> Self {
        SuperBlock {
            block_count,
            inode_count,
        }
    }

    /// read and validate block 0
    pub fn load(device: &mut BlockDevice) -> Result<Self> {
        let raw = device.read(SUPERBLOCK_BLOCK)?;
        Self::decode(&raw)
    }

    pub(crate) fn decode(raw: &[u8]) -> Result<Self> {
        let block_count = fixed::parse(&raw[0..3])
            .ok_or_else(|| FsError::BadSuperblock("block count field is not decimal".into()))?;
        let inode_count = fixed::parse(&raw[3..6])
            .ok_or_else(|| FsError::BadSuperblock("inode count field is not decimal".into()))?;
        if block_count <= RESERVED_BLOCKS || block_count > BLOCK_COUNT {
            return Err(FsError::BadSuperblock(format!(
                "block count {block_count} outside ({RESERVED_BLOCKS}, {BLOCK_COUNT}]"
            )));
        }
        if inode_count == 0 || inode_count > INODE_COUNT {
            return Err(FsError::BadSuperblock(format!(
                "inode count {inode_count} outside (0, {INODE_COUNT}]"
            )));
        }
        Ok(SuperBlock {
            block_count,
            inode_count,
        })
    }

    pub(crate) fn encode(&self) -> [u8; BLOCK_SIZE] {
        let mut raw = [FILL_BYTE; BLOCK_SIZE];
        fixed::format(&mut raw[0..3], self.block_count);
        fixed::format(&mut raw[3..6], self.inode_count);
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_round_trip() {
        let superblock = SuperBlock::new(BLOCK_COUNT, INODE_COUNT);
        let raw = superblock.encode();
        assert_eq!(&raw[..6], b"100127");
        assert_eq!(SuperBlock::decode(&raw).unwrap(), superblock);
    }

    #[test]
    fn test_malformed_fields_are_rejected() {
        let mut raw = SuperBlock::new(BLOCK_COUNT, INODE_COUNT).encode();
        raw[1] = b'x';
        assert!(matches!(
            SuperBlock::decode(&raw),
            Err(FsError::BadSuperblock(_))
        ));
    }

    #[test]
    fn test_out_of_range_capacities_are_rejected() {
        // more blocks than the device has
        let mut raw = [FILL_BYTE; BLOCK_SIZE];
        raw[..6].copy_from_slice(b"999127");
        assert!(matches!(
            SuperBlock::decode(&raw),
            Err(FsError::BadSuperblock(_))
        ));

        // an image with only reserved blocks is useless
        raw[..6].copy_from_slice(b"004127");
        assert!(matches!(
            SuperBlock::decode(&raw),
            Err(FsError::BadSuperblock(_))
        ));

        // zero inode slots leaves no room for the root directory
        raw[..6].copy_from_slice(b"100000");
        assert!(matches!(
            SuperBlock::decode(&raw),
            Err(FsError::BadSuperblock(_))
        ));
    }
}
