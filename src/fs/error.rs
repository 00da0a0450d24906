use thiserror::Error;

/// every way an engine operation can fail
///
/// `Corrupted` and `Io` are fatal to the process; everything else is
/// reported to the user and control returns to the command loop.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FsError {
    /// name lookup miss
    #[error("{0}: No such file or directory.")]
    NotFound(String),
    /// name collision on create, files and directories share one namespace
    #[error("{0}: Already exists.")]
    AlreadyExists(String),
    /// all three entry blocks allocated and all twelve entries used
    #[error("Error: Maximum directory entries reached.")]
    DirectoryFull,
    /// block bitmap has nothing free
    #[error("Error: Disk is full.")]
    DiskFull,
    /// inode bitmap has nothing free
    #[error("Error: Inode table is full.")]
    InodeTableFull,
    /// a bitmap allocator ran dry; callers surface this as
    /// [DiskFull](FsError::DiskFull) or [InodeTableFull](FsError::InodeTableFull)
    #[error("resource pool exhausted")]
    ResourceExhausted,
    /// empty or otherwise unusable name
    #[error("invalid name")]
    InvalidName,
    /// block number outside the device; the access is not applied
    #[error("block number {0} out of range")]
    OutOfRange(usize),
    /// on-disk metadata violates an invariant the engine cannot repair
    #[error("Fatal Error! {0}")]
    Corrupted(String),
    /// malformed superblock fields at mount time
    #[error("malformed superblock: {0}")]
    BadSuperblock(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FsError>;

impl FsError {
    /// fatal errors terminate the process, the engine has no self-healing path
    pub fn is_fatal(&self) -> bool {
        matches!(self, FsError::Corrupted(_) | FsError::Io(_))
    }
}
