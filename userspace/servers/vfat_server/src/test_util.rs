//! In-memory disks and raw-slot builders shared by the unit tests.

use std::io::{self, Cursor, Write};

use crate::device::BlockDev;

// ─── Mock block device backed by Vec<u8> ───────────────────────────────────────

pub struct MemDisk(pub Vec<u8>);

impl BlockDev for MemDisk {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let start = offset as usize;
        let src = start
            .checked_add(buf.len())
            .and_then(|end| self.0.get(start..end))
            .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))?;
        buf.copy_from_slice(src);
        Ok(())
    }
}

// ─── fatfs-built images ────────────────────────────────────────────────────────

/// Create an in-memory FAT32 image using the `fatfs` std crate.
///
/// With the `Fat32` type hint `fatfs` picks 512 bytes/cluster; FAT32 needs
/// at least 65 525 data clusters, so 40 MB is comfortably large enough.
pub fn make_disk() -> MemDisk {
    const SIZE: usize = 40 * 1024 * 1024;
    let mut cursor = Cursor::new(vec![0u8; SIZE]);
    fatfs::format_volume(
        &mut cursor,
        fatfs::FormatVolumeOptions::new().fat_type(fatfs::FatType::Fat32),
    )
    .expect("format_volume failed");
    MemDisk(cursor.into_inner())
}

/// Build an image with the given directories and files, created through
/// `fatfs` in order. Paths use `/` and are relative to the root.
pub fn disk_with(dirs: &[&str], files: &[(&str, &[u8])]) -> MemDisk {
    let mut disk = make_disk();
    {
        let mut cursor = Cursor::new(&mut disk.0);
        let fs = fatfs::FileSystem::new(&mut cursor, fatfs::FsOptions::new())
            .expect("FileSystem::new failed");
        let root = fs.root_dir();
        for dir in dirs {
            root.create_dir(dir).expect("create_dir failed");
        }
        for (name, content) in files {
            let mut f = root.create_file(name).expect("create_file failed");
            f.truncate().unwrap();
            f.write_all(content).unwrap();
        }
    }
    disk
}

/// Write one file to the root via `fatfs` and return the disk.
pub fn disk_with_file(name: &str, content: &[u8]) -> MemDisk {
    disk_with(&[], &[(name, content)])
}

// ─── Raw patching ──────────────────────────────────────────────────────────────

pub fn patch_u8(disk: &mut MemDisk, offset: usize, value: u8) {
    disk.0[offset] = value;
}

pub fn patch_u16(disk: &mut MemDisk, offset: usize, value: u16) {
    disk.0[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

pub fn patch_u32(disk: &mut MemDisk, offset: usize, value: u32) {
    disk.0[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Geometry read straight from the boot sector bytes.
pub struct Layout {
    pub bytes_per_sector:    usize,
    pub sectors_per_cluster: usize,
    pub reserved_sectors:    usize,
    pub fat_count:           usize,
    pub sectors_per_fat:     usize,
}

impl Layout {
    pub fn of(disk: &MemDisk) -> Self {
        let b = &disk.0;
        let u16_at = |off: usize| u16::from_le_bytes([b[off], b[off + 1]]) as usize;
        Self {
            bytes_per_sector:    u16_at(11),
            sectors_per_cluster: b[13] as usize,
            reserved_sectors:    u16_at(14),
            fat_count:           b[16] as usize,
            sectors_per_fat:     u32::from_le_bytes([b[36], b[37], b[38], b[39]]) as usize,
        }
    }

    pub fn cluster_size(&self) -> usize {
        self.bytes_per_sector * self.sectors_per_cluster
    }

    pub fn cluster_offset(&self, cluster: u32) -> usize {
        let first_data = self.reserved_sectors + self.fat_count * self.sectors_per_fat;
        (first_data + (cluster as usize - 2) * self.sectors_per_cluster) * self.bytes_per_sector
    }

    fn fat_entry_offset(&self, copy: usize, cluster: u32) -> usize {
        (self.reserved_sectors + copy * self.sectors_per_fat) * self.bytes_per_sector
            + cluster as usize * 4
    }
}

/// Set the FAT entry of `cluster` in every FAT copy.
pub fn set_fat(disk: &mut MemDisk, cluster: u32, value: u32) {
    let layout = Layout::of(disk);
    for copy in 0..layout.fat_count {
        let off = layout.fat_entry_offset(copy, cluster);
        patch_u32(disk, off, value);
    }
}

/// Replace the whole of `cluster` with `bytes`, zero-padded.
pub fn write_cluster(disk: &mut MemDisk, cluster: u32, bytes: &[u8]) {
    let layout = Layout::of(disk);
    let size = layout.cluster_size();
    assert!(bytes.len() <= size, "{} bytes do not fit one cluster", bytes.len());
    let off = layout.cluster_offset(cluster);
    disk.0[off..off + size].fill(0);
    disk.0[off..off + bytes.len()].copy_from_slice(bytes);
}

/// Replace the directory cluster `cluster` with `slots`; the rest reads as end-of-directory.
pub fn write_slots(disk: &mut MemDisk, cluster: u32, slots: &[[u8; 32]]) {
    write_cluster(disk, cluster, &slots.concat());
}

// ─── Directory slot builders ───────────────────────────────────────────────────

/// Short (8.3) entry; `name` is the padded on-disk form, e.g. `b"HELLO   TXT"`.
pub fn short_slot(name: &[u8; 11], attr: u8, cluster: u32, size: u32) -> [u8; 32] {
    let mut s = [0u8; 32];
    s[0..11].copy_from_slice(name);
    s[11] = attr;
    s[20..22].copy_from_slice(&((cluster >> 16) as u16).to_le_bytes());
    s[26..28].copy_from_slice(&(cluster as u16).to_le_bytes());
    s[28..32].copy_from_slice(&size.to_le_bytes());
    s
}

pub fn lfn_checksum(name: &[u8; 11]) -> u8 {
    name.iter().fold(0u8, |sum, &b| sum.rotate_right(1).wrapping_add(b))
}

/// Long-name fragments for `name` tied to the 8.3 name `short`, in on-disk
/// order (last fragment first).
pub fn lfn_slots(name: &str, short: &[u8; 11]) -> Vec<[u8; 32]> {
    let checksum = lfn_checksum(short);
    let mut units: Vec<u16> = name.encode_utf16().collect();
    let count = units.len().div_ceil(13).max(1);
    if units.len() < count * 13 {
        units.push(0x0000);
        units.resize(count * 13, 0xFFFF);
    }

    (1..=count)
        .rev()
        .map(|seq| {
            let chunk = &units[(seq - 1) * 13..seq * 13];
            let mut s = [0u8; 32];
            s[0] = seq as u8 | if seq == count { 0x40 } else { 0 };
            s[11] = 0x0F;
            s[13] = checksum;
            let offsets = (1..11).step_by(2).chain((14..26).step_by(2)).chain((28..32).step_by(2));
            for (unit, off) in chunk.iter().zip(offsets) {
                s[off..off + 2].copy_from_slice(&unit.to_le_bytes());
            }
            s
        })
        .collect()
}
