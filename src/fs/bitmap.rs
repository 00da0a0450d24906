//! free-space tracking for the block and inode pools
use bitvec::prelude::*;
use log::debug;

use super::{
    device::BlockDevice, error::FsError, error::Result, BLOCK_BITMAP_BLOCK, BLOCK_SIZE, FILL_BYTE,
    INODE_BITMAP_BLOCK, RESERVED_BLOCKS, ROOT_INODE,
};

/// one fixed-capacity used/free pool, persisted as one metadata block of
/// ASCII digits
///
/// Two instances share this type: the block bitmap (block 1, indices 0-3
/// reserved) and the inode bitmap (block 2, index 0 reserved for the root
/// directory). A running free count gives allocation a fast exhausted path
/// without scanning.
#[derive(Debug)]
pub struct Bitmap {
    bits: BitVec<u8, Lsb0>,
    free: usize,
    /// indices below this are never released back to the pool
    reserved: usize,
    /// block number this bitmap persists to
    meta_block: usize,
}

impl Bitmap {
    /// load the block bitmap from block 1
    pub fn block_bitmap(device: &mut BlockDevice, capacity: usize) -> Result<Self> {
        Self::load(device, BLOCK_BITMAP_BLOCK, capacity, RESERVED_BLOCKS)
    }

    /// load the inode bitmap from block 2
    pub fn inode_bitmap(device: &mut BlockDevice, capacity: usize) -> Result<Self> {
        Self::load(device, INODE_BITMAP_BLOCK, capacity, ROOT_INODE + 1)
    }

    fn load(
        device: &mut BlockDevice,
        meta_block: usize,
        capacity: usize,
        reserved: usize,
    ) -> Result<Self> {
        let raw = device.read(meta_block)?;
        let mut bits = BitVec::with_capacity(capacity);
        for (index, &digit) in raw[..capacity].iter().enumerate() {
            match digit {
                b'0' => bits.push(false),
                b'1' => bits.push(true),
                other => {
                    return Err(FsError::Corrupted(format!(
                        "bitmap block {meta_block} has byte {other:#x} at index {index}"
                    )))
                }
            }
        }
        let free = bits.count_zeros();
        Ok(Bitmap {
            bits,
            free,
            reserved,
            meta_block,
        })
    }

    /// mark the lowest free index used and persist the bitmap
    ///
    /// Allocation order is deterministic: always the lowest free index.
    pub fn allocate(&mut self, device: &mut BlockDevice) -> Result<usize> {
        if self.free == 0 {
            return Err(FsError::ResourceExhausted);
        }
        let index = self.bits.first_zero().ok_or(FsError::ResourceExhausted)?;
        self.bits.set(index, true);
        self.free -= 1;
        self.persist(device)?;
        debug!("bitmap block {} allocated index {index}", self.meta_block);
        Ok(index)
    }

    /// mark an index free again and persist the bitmap
    ///
    /// Reserved and out-of-range indices are silently ignored. Releasing an
    /// index twice is a caller bug.
    pub fn release(&mut self, device: &mut BlockDevice, index: usize) -> Result<()> {
        if index < self.reserved || index >= self.bits.len() {
            return Ok(());
        }
        self.bits.set(index, false);
        self.free += 1;
        self.persist(device)?;
        debug!("bitmap block {} released index {index}", self.meta_block);
        Ok(())
    }

    /// the running free count
    pub fn free_count(&self) -> usize {
        self.free
    }

    /// free count recounted from the bits, for `stat`
    pub fn recount_free(&self) -> usize {
        self.bits.count_zeros()
    }

    fn persist(&self, device: &mut BlockDevice) -> Result<()> {
        let mut raw = [FILL_BYTE; BLOCK_SIZE];
        for (digit, bit) in raw.iter_mut().zip(self.bits.iter()) {
            *digit = if *bit { b'1' } else { b'0' };
        }
        device.write(self.meta_block, Some(raw.as_slice()))
    }
}
