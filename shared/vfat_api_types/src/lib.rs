#![no_std]

#[cfg(test)]
extern crate std;

pub mod fs;

pub use fs::{DEBUG_CLUSTER_XATTR, Errno, FileMode, FsOp};
