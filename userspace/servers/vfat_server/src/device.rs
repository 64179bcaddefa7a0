//! Byte-addressed, read-only access to the backing device or image.
//!
//! Assumes the FAT32 volume starts at byte 0 (raw image, no MBR).
//! All disk I/O goes through `BlockDev`, so every module is unit-testable
//! with an in-memory disk.

use std::fs::File;
use std::io;
use std::os::unix::fs::FileExt;

pub trait BlockDev {
    /// Fill `buf` with the bytes starting at `offset`.
    /// A read that runs past the end of the device is an error, never a short fill.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()>;
}

impl BlockDev for File {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        self.read_exact_at(buf, offset)
    }
}
