//! raw fixed-size block access to the backing image file
use std::{
    fs::OpenOptions,
    path::{Path, PathBuf},
};

use log::{debug, info};
use memmap2::MmapMut;

use super::{error::FsError, error::Result, BLOCK_COUNT, BLOCK_SIZE, DISK_SIZE, FILL_BYTE};

/// the virtual block device over one disk image file
///
/// The image is mapped lazily: the first read or write opens and maps it,
/// so constructing a device never touches the filesystem. Every write is
/// flushed straight back to the file (write-through).
#[derive(Debug)]
pub struct BlockDevice {
    image_path: PathBuf,
    map: Option<MmapMut>,
}

impl BlockDevice {
    /// wrap an image file without opening it yet
    pub fn open<P>(image_path: P) -> Self
    where
        P: AsRef<Path>,
    {
        BlockDevice {
            image_path: image_path.as_ref().to_path_buf(),
            map: None,
        }
    }

    /// map the image file on first access
    fn mapped(&mut self) -> Result<&mut MmapMut> {
        if self.map.is_none() {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .open(&self.image_path)?;

            // Safety
            // This method returns an error when the underlying system call fails,
            // which can happen for a variety of reasons,
            // such as when the file is not open with read and write permissions.
            // from https://docs.rs/memmap2/0.5.10/memmap2/struct.MmapMut.html
            let map = unsafe { MmapMut::map_mut(&file)? };
            if map.len() < DISK_SIZE {
                return Err(FsError::Corrupted(format!(
                    "image {} is {} bytes, expected at least {DISK_SIZE}",
                    self.image_path.display(),
                    map.len()
                )));
            }
            info!("mapped image {}", self.image_path.display());
            self.map = Some(map);
        }
        Ok(self.map.as_mut().unwrap())
    }

    /// read one block
    ///
    /// Out-of-range block numbers are a not-applied result, not a panic.
    pub fn read(&mut self, block_number: usize) -> Result<[u8; BLOCK_SIZE]> {
        if block_number >= BLOCK_COUNT {
            return Err(FsError::OutOfRange(block_number));
        }
        let map = self.mapped()?;
        let mut buffer = [0u8; BLOCK_SIZE];
        buffer.copy_from_slice(&map[block_number * BLOCK_SIZE..][..BLOCK_SIZE]);
        Ok(buffer)
    }

    /// write one block and flush it to the image
    ///
    /// `None` clears the block with [FILL_BYTE]; a short buffer is padded
    /// with zero bytes up to the block size.
    pub fn write(&mut self, block_number: usize, data: Option<&[u8]>) -> Result<()> {
        if block_number >= BLOCK_COUNT {
            return Err(FsError::OutOfRange(block_number));
        }
        let offset = block_number * BLOCK_SIZE;
        let map = self.mapped()?;
        let target = &mut map[offset..offset + BLOCK_SIZE];
        match data {
            None => target.fill(FILL_BYTE),
            Some(data) => {
                let len = data.len().min(BLOCK_SIZE);
                target[..len].copy_from_slice(&data[..len]);
                target[len..].fill(0);
            }
        }
        debug!("wrote block {block_number}");
        map.flush_range(offset, BLOCK_SIZE)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn scratch_image(path: &Path) {
        if path.exists() {
            std::fs::remove_file(path).unwrap();
        }
        crate::mkfs::mkfs(path).unwrap();
    }

    #[test]
    fn test_out_of_range_access_is_not_applied() {
        let path = Path::new("/tmp/sfs_device_range.img");
        scratch_image(path);
        let mut device = BlockDevice::open(path);
        assert!(matches!(
            device.read(BLOCK_COUNT),
            Err(FsError::OutOfRange(_))
        ));
        assert!(matches!(
            device.write(BLOCK_COUNT, None),
            Err(FsError::OutOfRange(_))
        ));
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let path = Path::new("/tmp/sfs_device_rw.img");
        scratch_image(path);
        let mut device = BlockDevice::open(path);
        let payload = [b'x'; BLOCK_SIZE];
        device.write(7, Some(&payload)).unwrap();
        assert_eq!(device.read(7).unwrap(), payload);

        // a short buffer is zero padded
        device.write(7, Some(b"abc")).unwrap();
        let block = device.read(7).unwrap();
        assert_eq!(&block[..3], b"abc");
        assert!(block[3..].iter().all(|&b| b == 0));

        // clearing fills with the ASCII zero digit
        device.write(7, None).unwrap();
        assert!(device.read(7).unwrap().iter().all(|&b| b == FILL_BYTE));
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_write_through_persists_across_devices() {
        let path = Path::new("/tmp/sfs_device_persist.img");
        scratch_image(path);
        {
            let mut device = BlockDevice::open(path);
            device.write(9, Some(b"persisted")).unwrap();
        }
        let mut reopened = BlockDevice::open(path);
        assert_eq!(&reopened.read(9).unwrap()[..9], b"persisted");
        std::fs::remove_file(path).unwrap();
    }
}
