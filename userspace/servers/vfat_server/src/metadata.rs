use time::OffsetDateTime;
use vfat_api_types::FileMode;

/// Owner reported for every inode of the mount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Owner {
    pub uid: u32,
    pub gid: u32,
}

/// Attributes of a file or directory, the `stat` view handed to the host layer.
///
/// `ino` is the starting cluster of the entry; it doubles as the inode number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub ino:      u32,
    pub mode:     FileMode,
    pub nlink:    u32,
    pub uid:      u32,
    pub gid:      u32,
    pub size:     u64,
    pub accessed: OffsetDateTime,
    pub modified: OffsetDateTime,
    pub created:  OffsetDateTime,
}

impl Metadata {
    /// Synthesised attributes for `/`.
    pub fn root(root_cluster: u32, owner: Owner, mount_time: OffsetDateTime) -> Self {
        Self {
            ino: root_cluster,
            mode: FileMode::directory(),
            nlink: 1,
            uid: owner.uid,
            gid: owner.gid,
            size: 0,
            accessed: mount_time,
            modified: mount_time,
            created: mount_time,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.mode.is_dir()
    }

    pub fn first_cluster(&self) -> u32 {
        self.ino
    }
}
