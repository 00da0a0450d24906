//! block 3: the inode table
use smallvec::SmallVec;

use crate::utils::fixed;

use super::{
    device::BlockDevice, error::FsError, error::Result, BLOCK_SIZE, DIRECT_POINTERS, FILL_BYTE,
    INODE_TABLE_BLOCK,
};

/// bytes one inode record occupies on disk: a two-byte kind tag plus
/// three two-digit block pointers
pub const INODE_RECORD_SIZE: usize = 8;

const DIRECTORY_TAG: &[u8; 2] = b"DI";
const FILE_TAG: &[u8; 2] = b"FI";

/// an enum to describe the kind of an inode
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InodeKind {
    /// a directory, pointing at up to three directory-entry blocks
    Directory,
    /// a regular file, pointing at up to three data blocks
    File,
}

/// one inode record: a kind tag and three block pointers, 0 meaning
/// "not pointing at a block"
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Inode {
    pub kind: Option<InodeKind>,
    pub blocks: [u8; DIRECT_POINTERS],
}

impl Inode {
    pub fn new(kind: InodeKind) -> Self {
        Inode {
            kind: Some(kind),
            blocks: [0; DIRECT_POINTERS],
        }
    }

    pub(crate) fn decode(raw: &[u8]) -> Self {
        let kind = match &raw[0..2] {
            b"DI" => Some(InodeKind::Directory),
            b"FI" => Some(InodeKind::File),
            _ => None,
        };
        let mut blocks = [0u8; DIRECT_POINTERS];
        for (slot, block) in blocks.iter_mut().enumerate() {
            let field = &raw[2 + slot * 2..4 + slot * 2];
            *block = fixed::parse(field).unwrap_or(0) as u8;
        }
        Inode { kind, blocks }
    }

    pub(crate) fn encode(&self, out: &mut [u8]) {
        out[0..2].copy_from_slice(match self.kind {
            Some(InodeKind::Directory) => DIRECTORY_TAG,
            Some(InodeKind::File) => FILE_TAG,
            None => b"00",
        });
        for (slot, &block) in self.blocks.iter().enumerate() {
            fixed::format(&mut out[2 + slot * 2..4 + slot * 2], block as usize);
        }
    }

    /// the block pointers that actually point somewhere, in slot order
    pub fn present_blocks(&self) -> SmallVec<[u8; DIRECT_POINTERS]> {
        self.blocks.iter().copied().filter(|&b| b != 0).collect()
    }

    /// the first pointer slot not pointing at a block
    pub fn first_free_slot(&self) -> Option<usize> {
        self.blocks.iter().position(|&b| b == 0)
    }

    pub fn is_dir(&self) -> bool {
        self.kind == Some(InodeKind::Directory)
    }

    pub fn is_file(&self) -> bool {
        self.kind == Some(InodeKind::File)
    }
}

/// all inode records, loaded fully at mount and written back as one block
///
/// There is no partial-record write: any mutation must be followed by
/// [persist](InodeTable::persist).
#[derive(Debug)]
pub struct InodeTable {
    records: Vec<Inode>,
}

impl InodeTable {
    /// read block 3 into memory
    pub fn load(device: &mut BlockDevice, inode_count: usize) -> Result<Self> {
        let raw = device.read(INODE_TABLE_BLOCK)?;
        let records = raw[..inode_count * INODE_RECORD_SIZE]
            .chunks_exact(INODE_RECORD_SIZE)
            .map(Inode::decode)
            .collect();
        Ok(InodeTable { records })
    }

    /// write the whole table back to block 3
    pub fn persist(&self, device: &mut BlockDevice) -> Result<()> {
        let mut raw = [FILL_BYTE; BLOCK_SIZE];
        for (index, record) in self.records.iter().enumerate() {
            record.encode(&mut raw[index * INODE_RECORD_SIZE..][..INODE_RECORD_SIZE]);
        }
        device.write(INODE_TABLE_BLOCK, Some(raw.as_slice()))
    }

    pub fn get(&self, index: usize) -> Result<&Inode> {
        self.records
            .get(index)
            .ok_or_else(|| FsError::Corrupted(format!("inode index {index} out of table bounds")))
    }

    pub fn set_kind(&mut self, index: usize, kind: Option<InodeKind>) -> Result<()> {
        self.record_mut(index)?.kind = kind;
        Ok(())
    }

    pub fn set_block(&mut self, index: usize, slot: usize, block: u8) -> Result<()> {
        self.record_mut(index)?.blocks[slot] = block;
        Ok(())
    }

    /// unset the kind tag and drop all block pointers
    pub fn clear(&mut self, index: usize) -> Result<()> {
        *self.record_mut(index)? = Inode::default();
        Ok(())
    }

    fn record_mut(&mut self, index: usize) -> Result<&mut Inode> {
        self.records
            .get_mut(index)
            .ok_or_else(|| FsError::Corrupted(format!("inode index {index} out of table bounds")))
    }
}
