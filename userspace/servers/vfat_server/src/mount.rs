use std::fs::File;
use std::path::Path;

use crate::device::BlockDev;
use crate::error::Result;
use crate::fat::Chain;
use crate::metadata::{Metadata, Owner};
use crate::options::MountOptions;
use crate::volume::VolumeInfo;

/// Everything one mount needs: the device, its validated geometry and FAT.
///
/// Built once by [`MountContext::mount`] and only borrowed immutably afterwards,
/// so requests never see shared mutable state.
pub struct MountContext<D> {
    dev:     D,
    info:    VolumeInfo,
    options: MountOptions,
}

impl MountContext<File> {
    /// Open the device or image at `path` read-only and mount it.
    pub fn open(path: impl AsRef<Path>, options: MountOptions) -> Result<Self> {
        let dev = File::open(path)?;
        Self::mount(dev, options)
    }
}

impl<D: BlockDev> MountContext<D> {
    pub fn mount(dev: D, options: MountOptions) -> Result<Self> {
        let info = VolumeInfo::load(&dev, &options)?;
        Ok(Self { dev, info, options })
    }

    pub fn info(&self) -> &VolumeInfo {
        &self.info
    }

    pub fn root(&self) -> &Metadata {
        &self.info.root_inode
    }

    pub fn owner(&self) -> Owner {
        self.options.owner
    }

    pub(crate) fn dev(&self) -> &D {
        &self.dev
    }

    /// Cluster chain starting at `start`, bounded by the mount's chain limit.
    pub fn chain(&self, start: u32) -> Chain<'_> {
        self.info.fat.chain(start, self.options.max_chain_len)
    }

    /// Unmount, handing the device back.
    pub fn into_inner(self) -> D {
        self.dev
    }
}
