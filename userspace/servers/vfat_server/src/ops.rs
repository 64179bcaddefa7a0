//! The four operations served to the VFS host layer.

use core::ops::ControlFlow;

use log::debug;
use vfat_api_types::DEBUG_CLUSTER_XATTR;

use crate::device::BlockDev;
use crate::dir::DirEntry;
use crate::error::{Result, VfatError};
use crate::metadata::Metadata;
use crate::mount::MountContext;

impl<D: BlockDev> MountContext<D> {
    pub fn get_attributes(&self, path: &str) -> Result<Metadata> {
        self.resolve(path)
    }

    /// Every live entry of the directory at `path`, in on-disk order.
    pub fn list_directory(&self, path: &str) -> Result<Vec<DirEntry>> {
        let dir = self.resolve(path)?;
        if !dir.is_dir() {
            return Err(VfatError::NotADirectory { path: path.to_string() });
        }
        let mut entries = Vec::new();
        self.walk_dir(dir.first_cluster(), |entry| -> ControlFlow<()> {
            entries.push(entry);
            ControlFlow::Continue(())
        })?;
        debug!("vfat: readdir {:?} -> {} entries", path, entries.len());
        Ok(entries)
    }

    /// Up to `length` bytes of the file at `path` starting at `offset`.
    pub fn read_file(&self, path: &str, offset: u64, length: usize) -> Result<Vec<u8>> {
        let meta = self.resolve(path)?;
        self.read(&meta, offset, length)
    }

    /// Value of extended attribute `name` on `path`.
    ///
    /// Only `debug.cluster` exists: the entry's first cluster in decimal.
    pub fn get_extended_attribute(&self, path: &str, name: &str) -> Result<String> {
        let meta = self.resolve(path)?;
        if name != DEBUG_CLUSTER_XATTR {
            return Err(VfatError::OutOfRange { attribute: name.to_string() });
        }
        Ok(meta.ino.to_string())
    }

    /// `getxattr(2)`-shaped variant of [`Self::get_extended_attribute`].
    ///
    /// With no buffer, returns the size to allocate (value length plus a NUL).
    /// Otherwise copies the value and returns its length.
    pub fn getxattr_into(&self, path: &str, name: &str, buf: Option<&mut [u8]>) -> Result<usize> {
        let value = self.get_extended_attribute(path, name)?;
        let Some(buf) = buf else {
            return Ok(value.len() + 1);
        };
        if buf.len() < value.len() {
            return Err(VfatError::BufferTooSmall { needed: value.len() });
        }
        buf[..value.len()].copy_from_slice(value.as_bytes());
        Ok(value.len())
    }
}
