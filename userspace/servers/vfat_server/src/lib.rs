//! Read-only FAT32 volume reader.
//!
//! A volume is mounted once into a [`MountContext`], which owns the backing
//! device, the validated [`VolumeInfo`] and the in-memory FAT. Every request
//! (`get_attributes`, `list_directory`, `read_file`, `get_extended_attribute`)
//! borrows the context immutably and runs to completion against the device.

pub mod cluster;
pub mod datetime;
pub mod device;
pub mod dir;
pub mod error;
pub mod fat;
pub mod file;
pub mod metadata;
pub mod mount;
pub mod ops;
pub mod options;
pub mod path;
pub mod server;
pub mod volume;

#[cfg(test)]
pub(crate) mod test_util;

pub use device::BlockDev;
pub use dir::DirEntry;
pub use error::{Result, VfatError};
pub use fat::{ClusterKind, ClusterLink};
pub use metadata::{Metadata, Owner};
pub use mount::MountContext;
pub use options::MountOptions;
pub use volume::VolumeInfo;
