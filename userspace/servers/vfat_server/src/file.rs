use log::debug;

use crate::device::BlockDev;
use crate::error::Result;
use crate::metadata::Metadata;
use crate::mount::MountContext;

impl<D: BlockDev> MountContext<D> {
    /// Copy bytes of the file described by `meta`, starting at `offset`, into `buf`.
    ///
    /// Returns the number of bytes copied, which is short when the request runs
    /// past the recorded size and 0 at or beyond it.
    pub fn read_at(&self, meta: &Metadata, offset: u64, buf: &mut [u8]) -> Result<usize> {
        if offset >= meta.size || buf.is_empty() {
            return Ok(0);
        }
        let want = (meta.size - offset).min(buf.len() as u64) as usize;
        let cluster_size = self.info().cluster_size_bytes as u64;

        // Clusters wholly before `offset` are walked but not mapped.
        let mut chain = self.chain(meta.first_cluster());
        for _ in 0..offset / cluster_size {
            if chain.next().transpose()?.is_none() {
                return Ok(0);
            }
        }
        let mut in_cluster = (offset % cluster_size) as usize;
        let mut copied = 0;

        for cluster in chain {
            let n = self.with_cluster(cluster?, |bytes| {
                let n = (bytes.len() - in_cluster).min(want - copied);
                buf[copied..copied + n].copy_from_slice(&bytes[in_cluster..in_cluster + n]);
                n
            })?;
            copied += n;
            in_cluster = 0;
            if copied == want {
                break;
            }
        }
        Ok(copied)
    }

    /// Read up to `len` bytes at `offset` into a fresh buffer.
    pub fn read(&self, meta: &Metadata, offset: u64, len: usize) -> Result<Vec<u8>> {
        let cap = meta.size.saturating_sub(offset).min(len as u64) as usize;
        let mut buf = vec![0u8; cap];
        let n = self.read_at(meta, offset, &mut buf)?;
        buf.truncate(n);
        debug!("vfat: read ino {} [{}..+{}] -> {} bytes", meta.ino, offset, len, n);
        Ok(buf)
    }
}
