//! directory-entry blocks: four fixed-size (flag, name, inode) records
use crate::utils::fixed;

use super::{BLOCK_SIZE, ENTRIES_PER_BLOCK, MAX_NAME_LEN, NAME_FIELD_SIZE};

/// bytes one directory entry occupies: used flag, name field, inode index
pub(crate) const ENTRY_SIZE: usize = 256;

/// one directory entry
///
/// The name field is null terminated on disk; names longer than
/// [MAX_NAME_LEN] are truncated when encoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct DirEntry {
    pub used: bool,
    pub name: String,
    pub inode: usize,
}

impl DirEntry {
    pub fn new(name: &str, inode: usize) -> Self {
        DirEntry {
            used: true,
            name: name.to_string(),
            inode,
        }
    }

    fn decode(raw: &[u8]) -> Self {
        let used = raw[0] == b'1';
        let name_field = &raw[1..1 + NAME_FIELD_SIZE];
        let name_len = name_field
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(NAME_FIELD_SIZE);
        let name = String::from_utf8_lossy(&name_field[..name_len]).into_owned();
        let inode = fixed::parse(&raw[1 + NAME_FIELD_SIZE..ENTRY_SIZE]).unwrap_or(0);
        DirEntry { used, name, inode }
    }

    fn encode(&self, out: &mut [u8]) {
        out.fill(0);
        out[0] = if self.used { b'1' } else { b'0' };
        let name = self.name.as_bytes();
        let len = name.len().min(MAX_NAME_LEN);
        out[1..1 + len].copy_from_slice(&name[..len]);
        fixed::format(&mut out[1 + NAME_FIELD_SIZE..ENTRY_SIZE], self.inode);
    }
}

/// one block's worth of directory entries
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct DirBlock {
    pub entries: [DirEntry; ENTRIES_PER_BLOCK],
}

impl DirBlock {
    pub fn decode(raw: &[u8]) -> Self {
        let entries =
            core::array::from_fn(|slot| DirEntry::decode(&raw[slot * ENTRY_SIZE..][..ENTRY_SIZE]));
        DirBlock { entries }
    }

    pub fn encode(&self) -> [u8; BLOCK_SIZE] {
        let mut raw = [0u8; BLOCK_SIZE];
        for (slot, entry) in self.entries.iter().enumerate() {
            entry.encode(&mut raw[slot * ENTRY_SIZE..][..ENTRY_SIZE]);
        }
        raw
    }

    /// a block whose four entries are all unused is ready to be released
    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|entry| !entry.used)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::FILL_BYTE;

    #[test]
    fn test_entry_block_round_trip() {
        let mut block = DirBlock::default();
        block.entries[0] = DirEntry::new("readme.txt", 12);
        block.entries[3] = DirEntry::new("src", 5);
        let raw = block.encode();
        assert_eq!(DirBlock::decode(&raw), block);
        assert!(!block.is_empty());
    }

    #[test]
    fn test_freshly_cleared_block_decodes_empty() {
        // clearing writes ASCII zeros, which read back as four unused entries
        let raw = [FILL_BYTE; BLOCK_SIZE];
        let block = DirBlock::decode(&raw);
        assert!(block.is_empty());
    }

    #[test]
    fn test_over_long_names_are_truncated() {
        let long = "n".repeat(MAX_NAME_LEN + 40);
        let mut block = DirBlock::default();
        block.entries[0] = DirEntry::new(&long, 1);
        let decoded = DirBlock::decode(&block.encode());
        assert_eq!(decoded.entries[0].name.len(), MAX_NAME_LEN);
        assert_eq!(decoded.entries[0].inode, 1);
    }
}
