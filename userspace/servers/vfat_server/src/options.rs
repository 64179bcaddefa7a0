use time::OffsetDateTime;

use crate::metadata::Owner;

/// Mount-time configuration, in the builder style of `fatfs::FsOptions`.
#[derive(Debug, Clone)]
pub struct MountOptions {
    pub(crate) owner:         Owner,
    pub(crate) mount_time:    Option<OffsetDateTime>,
    pub(crate) max_chain_len: usize,
}

impl MountOptions {
    pub fn new() -> Self {
        Self { owner: Owner::default(), mount_time: None, max_chain_len: usize::MAX }
    }

    /// uid/gid reported for every file and directory.
    pub fn owner(mut self, uid: u32, gid: u32) -> Self {
        self.owner = Owner { uid, gid };
        self
    }

    /// Timestamp used for all three times of `/`. Defaults to the moment of mounting.
    pub fn mount_time(mut self, mount_time: OffsetDateTime) -> Self {
        self.mount_time = Some(mount_time);
        self
    }

    /// Upper bound on links followed in one cluster chain.
    /// The volume's cluster count always caps it as well.
    pub fn max_chain_len(mut self, max_chain_len: usize) -> Self {
        self.max_chain_len = max_chain_len.max(1);
        self
    }
}

impl Default for MountOptions {
    fn default() -> Self {
        Self::new()
    }
}
