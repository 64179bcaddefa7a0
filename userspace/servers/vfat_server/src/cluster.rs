//! Scoped, read-only access to the raw bytes of one data cluster.

use std::io;
use std::ops::Deref;

use log::trace;

use crate::device::BlockDev;
use crate::error::Result;
use crate::mount::MountContext;

/// Granularity the device window is aligned to.
pub const PAGE_SIZE: u64 = 4096;

/// One cluster's bytes, read through a page-aligned window of the device.
///
/// Dereferences to exactly `cluster_size_bytes` bytes. Dropping the map
/// releases the window; nothing is cached between calls.
pub struct ClusterMap {
    cluster: u32,
    window:  Vec<u8>,
    start:   usize,
}

impl Deref for ClusterMap {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.window[self.start..]
    }
}

impl Drop for ClusterMap {
    fn drop(&mut self) {
        trace!("vfat: unmap cluster {}", self.cluster);
    }
}

impl<D: BlockDev> MountContext<D> {
    /// Map cluster `cluster` (numbered from 2) for reading.
    pub fn map_cluster(&self, cluster: u32) -> Result<ClusterMap> {
        let info = self.info();
        if !info.fat.is_data_cluster(cluster) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("cluster {cluster} is outside the data region"),
            )
            .into());
        }
        let offset  = info.cluster_offset(cluster);
        let aligned = offset & !(PAGE_SIZE - 1);
        let start   = (offset - aligned) as usize;

        let mut window = vec![0u8; start + info.cluster_size_bytes as usize];
        self.dev().read_at(aligned, &mut window)?;
        trace!("vfat: map cluster {} at {:#x} (window {:#x})", cluster, offset, aligned);
        Ok(ClusterMap { cluster, window, start })
    }

    /// Run `f` over the bytes of `cluster`; the mapping is released when `f`
    /// returns, on every path.
    pub fn with_cluster<R>(&self, cluster: u32, f: impl FnOnce(&[u8]) -> R) -> Result<R> {
        let map = self.map_cluster(cluster)?;
        Ok(f(&map))
    }
}

#[cfg(test)]
mod tests {
    use crate::test_util::{disk_with_file, make_disk};
    use crate::{MountContext, MountOptions, VfatError};

    #[test]
    fn cluster_bytes_match_device_region() {
        let disk = make_disk();
        let image = disk.0.clone();
        let fs = MountContext::mount(disk, MountOptions::new()).unwrap();
        let info = fs.info();
        let size = info.cluster_size_bytes as usize;
        let last = info.cluster_count + 1;
        for c in [2, 3, 17, 1000, last / 2, last] {
            let off = info.cluster_offset(c) as usize;
            let bytes = fs.with_cluster(c, |b| b.to_vec()).unwrap();
            assert_eq!(bytes.len(), size, "cluster {c}");
            assert_eq!(&bytes[..], &image[off..off + size], "cluster {c}");
        }
    }

    #[test]
    fn file_data_is_in_its_first_cluster() {
        let disk = disk_with_file("DATA.BIN", b"cluster contents");
        let fs = MountContext::mount(disk, MountOptions::new()).unwrap();
        let entry = fs.get_attributes("/DATA.BIN").unwrap();
        let head = fs.with_cluster(entry.first_cluster(), |b| b[..16].to_vec()).unwrap();
        assert_eq!(&head, b"cluster contents");
    }

    #[test]
    fn map_covers_one_cluster() {
        let fs = MountContext::mount(make_disk(), MountOptions::new()).unwrap();
        let map = fs.map_cluster(5).unwrap();
        assert_eq!(map.len(), fs.info().cluster_size_bytes as usize);
    }

    #[test]
    fn reserved_cluster_numbers_are_refused() {
        let fs = MountContext::mount(make_disk(), MountOptions::new()).unwrap();
        assert!(matches!(fs.with_cluster(0, |_| ()), Err(VfatError::Io(_))));
        assert!(matches!(fs.with_cluster(1, |_| ()), Err(VfatError::Io(_))));
        let past_end = fs.info().cluster_count + 2;
        assert!(matches!(fs.with_cluster(past_end, |_| ()), Err(VfatError::Io(_))));
    }
}
