//! Boot sector parsing, FAT32 validation and derived volume geometry.

use log::info;

use crate::device::BlockDev;
use crate::error::{Result, VfatError};
use crate::fat::FatTable;
use crate::metadata::Metadata;
use crate::options::MountOptions;

pub const BOOT_SECTOR_SIZE: usize = 512;
pub const DIR_ENTRY_SIZE:   u32   = 32;

/// FAT32 volumes have at least this many data clusters; fewer means FAT12/16.
pub const MIN_FAT32_CLUSTERS: u32 = 65525;

// ─── Boot sector (BPB + FAT32 extension) ───────────────────────────────────────

/// Raw fields of the boot sector, decoded from their little-endian offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootSector {
    pub oem_name:            [u8; 8],
    pub bytes_per_sector:    u16,
    pub sectors_per_cluster: u8,
    pub reserved_sectors:    u16,
    pub fat_count:           u8,
    pub root_entry_count:    u16,
    pub total_sectors_16:    u16,
    pub media:               u8,
    pub fat_size_16:         u16,
    pub hidden_sectors:      u32,
    pub total_sectors_32:    u32,
    // FAT32 extension
    pub fat_size_32:         u32,
    pub ext_flags:           u16,
    pub fs_version:          u16,
    pub root_cluster:        u32,
    pub fs_info_sector:      u16,
    pub backup_boot_sector:  u16,
    pub drive_number:        u8,
    pub boot_signature:      u8,
    pub volume_id:           u32,
    pub volume_label:        [u8; 11],
    pub fs_type:             [u8; 8],
    pub signature:           [u8; 2],
}

fn le16(b: &[u8; BOOT_SECTOR_SIZE], off: usize) -> u16 {
    u16::from_le_bytes([b[off], b[off + 1]])
}

fn le32(b: &[u8; BOOT_SECTOR_SIZE], off: usize) -> u32 {
    u32::from_le_bytes([b[off], b[off + 1], b[off + 2], b[off + 3]])
}

fn array<const N: usize>(b: &[u8; BOOT_SECTOR_SIZE], off: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&b[off..off + N]);
    out
}

impl BootSector {
    pub fn parse(b: &[u8; BOOT_SECTOR_SIZE]) -> Self {
        Self {
            oem_name:            array(b, 3),
            bytes_per_sector:    le16(b, 11),
            sectors_per_cluster: b[13],
            reserved_sectors:    le16(b, 14),
            fat_count:           b[16],
            root_entry_count:    le16(b, 17),
            total_sectors_16:    le16(b, 19),
            media:               b[21],
            fat_size_16:         le16(b, 22),
            hidden_sectors:      le32(b, 28),
            total_sectors_32:    le32(b, 32),
            fat_size_32:         le32(b, 36),
            ext_flags:           le16(b, 40),
            fs_version:          le16(b, 42),
            root_cluster:        le32(b, 44),
            fs_info_sector:      le16(b, 48),
            backup_boot_sector:  le16(b, 50),
            drive_number:        b[64],
            boot_signature:      b[66],
            volume_id:           le32(b, 67),
            volume_label:        array(b, 71),
            fs_type:             array(b, 82),
            signature:           array(b, 510),
        }
    }

    pub fn read<D: BlockDev>(dev: &D) -> Result<Self> {
        let mut sec = [0u8; BOOT_SECTOR_SIZE];
        dev.read_at(0, &mut sec)?;
        Ok(Self::parse(&sec))
    }

    /// Field checks that do not need derived geometry, in on-disk order.
    fn check_fields(&self) -> Result<()> {
        if !matches!(self.bytes_per_sector, 512 | 1024 | 2048 | 4096) {
            return Err(VfatError::invalid(
                "bytes_per_sector", self.bytes_per_sector, "must be 512, 1024, 2048 or 4096",
            ));
        }
        if !self.sectors_per_cluster.is_power_of_two() || self.sectors_per_cluster > 128 {
            return Err(VfatError::invalid(
                "sectors_per_cluster", self.sectors_per_cluster, "must be 1, 2, 4, 8, 16, 32, 64 or 128",
            ));
        }
        if self.fat_count != 2 {
            return Err(VfatError::invalid("fat_count", self.fat_count, "must be 2"));
        }
        if self.root_entry_count != 0 {
            return Err(VfatError::invalid("root_entry_count", self.root_entry_count, "must be 0"));
        }
        if self.total_sectors_16 != 0 {
            return Err(VfatError::invalid("total_sectors_16", self.total_sectors_16, "must be 0"));
        }
        if self.fat_size_16 != 0 {
            return Err(VfatError::invalid("fat_size_16", self.fat_size_16, "must be 0"));
        }
        if self.signature != [0x55, 0xAA] {
            return Err(VfatError::invalid(
                "signature", u16::from_be_bytes(self.signature), "must be 55AA",
            ));
        }
        if self.fat_size_32 == 0 {
            return Err(VfatError::invalid("sectors_per_fat", self.fat_size_32, "must be non-zero"));
        }
        if self.root_cluster < 2 {
            return Err(VfatError::invalid("root_cluster", self.root_cluster, "must be >= 2"));
        }
        Ok(())
    }
}

// ─── Volume info ───────────────────────────────────────────────────────────────

/// Validated geometry of a mounted volume plus its FAT. Immutable after mount.
#[derive(Debug, Clone)]
pub struct VolumeInfo {
    pub bytes_per_sector:       u32,
    pub sectors_per_cluster:    u32,
    pub reserved_sectors:       u32,
    pub fat_count:              u32,
    pub sectors_per_fat:        u32,
    pub root_cluster:           u32,
    pub total_sectors:          u32,
    pub volume_id:              u32,
    pub volume_label:           String,

    pub first_data_sector:      u32,
    pub data_sector_count:      u32,
    pub cluster_count:          u32,
    pub cluster_size_bytes:     u32,
    pub fat_table_byte_size:    u32,
    pub direntries_per_cluster: u32,

    pub fat:        FatTable,
    pub root_inode: Metadata,
}

impl VolumeInfo {
    /// Read the boot sector, validate it as FAT32 and load the first FAT.
    /// Either everything checks out or nothing is returned.
    pub fn load<D: BlockDev>(dev: &D, options: &MountOptions) -> Result<Self> {
        let bs = BootSector::read(dev)?;
        bs.check_fields()?;

        let bytes_per_sector    = bs.bytes_per_sector as u32;
        let sectors_per_cluster = bs.sectors_per_cluster as u32;
        let reserved_sectors    = bs.reserved_sectors as u32;
        let fat_count           = bs.fat_count as u32;
        let sectors_per_fat     = bs.fat_size_32;
        let total_sectors       = bs.total_sectors_32;

        // No root directory region on FAT32.
        let first_data_sector = fat_count
            .checked_mul(sectors_per_fat)
            .and_then(|fat_sectors| fat_sectors.checked_add(reserved_sectors))
            .filter(|&first| first <= total_sectors)
            .ok_or_else(|| VfatError::invalid(
                "total_sectors", total_sectors, "must cover reserved and FAT regions",
            ))?;
        let data_sector_count = total_sectors - first_data_sector;
        let cluster_count     = data_sector_count / sectors_per_cluster;
        if cluster_count < MIN_FAT32_CLUSTERS {
            return Err(VfatError::invalid("cluster_count", cluster_count, "must be >= 65525"));
        }

        let cluster_size_bytes  = bytes_per_sector * sectors_per_cluster;
        let fat_table_byte_size = sectors_per_fat
            .checked_mul(bytes_per_sector)
            .ok_or_else(|| VfatError::invalid("sectors_per_fat", sectors_per_fat, "FAT too large"))?;

        let fat_offset = reserved_sectors as u64 * bytes_per_sector as u64;
        let fat = FatTable::load(dev, fat_offset, fat_table_byte_size as usize, cluster_count)?;

        let mount_time = options.mount_time.unwrap_or_else(time::OffsetDateTime::now_utc);
        let root_inode = Metadata::root(bs.root_cluster, options.owner, mount_time);

        let info = Self {
            bytes_per_sector,
            sectors_per_cluster,
            reserved_sectors,
            fat_count,
            sectors_per_fat,
            root_cluster: bs.root_cluster,
            total_sectors,
            volume_id: bs.volume_id,
            volume_label: String::from_utf8_lossy(&bs.volume_label).trim_end().to_string(),
            first_data_sector,
            data_sector_count,
            cluster_count,
            cluster_size_bytes,
            fat_table_byte_size,
            direntries_per_cluster: cluster_size_bytes / DIR_ENTRY_SIZE,
            fat,
            root_inode,
        };
        info!(
            "vfat: mounted {:?} ({:08X}): {} clusters of {} bytes, root at cluster {}",
            info.volume_label, info.volume_id, info.cluster_count, info.cluster_size_bytes,
            info.root_cluster,
        );
        Ok(info)
    }

    /// First sector of data cluster `cluster` (numbered from 2).
    pub fn first_sector_of_cluster(&self, cluster: u32) -> u64 {
        self.first_data_sector as u64
            + (cluster as u64 - 2) * self.sectors_per_cluster as u64
    }

    /// Absolute byte offset of data cluster `cluster` on the device.
    pub fn cluster_offset(&self, cluster: u32) -> u64 {
        self.first_sector_of_cluster(cluster) * self.bytes_per_sector as u64
    }
}

// ─── Unit tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{make_disk, patch_u16, patch_u8, MemDisk};

    fn load(disk: &MemDisk) -> Result<VolumeInfo> {
        VolumeInfo::load(disk, &MountOptions::new())
    }

    fn invalid_field(err: VfatError) -> &'static str {
        match err {
            VfatError::InvalidVolume { field, .. } => field,
            other => panic!("expected InvalidVolume, got {other:?}"),
        }
    }

    #[test]
    fn load_valid_fat32() {
        let disk = make_disk();
        let info = load(&disk).unwrap();
        assert_eq!(info.bytes_per_sector, 512);
        assert_eq!(info.root_cluster, 2);
        assert_eq!(info.fat_count, 2);
        assert!(info.cluster_count >= MIN_FAT32_CLUSTERS);
        assert_eq!(info.cluster_size_bytes, info.bytes_per_sector * info.sectors_per_cluster);
        assert_eq!(info.direntries_per_cluster, info.cluster_size_bytes / 32);
        assert_eq!(info.fat.len() as u32, info.fat_table_byte_size / 4);
    }

    #[test]
    fn derived_geometry_is_consistent() {
        let disk = make_disk();
        let info = load(&disk).unwrap();
        assert_eq!(
            info.first_data_sector,
            info.reserved_sectors + info.fat_count * info.sectors_per_fat
        );
        assert_eq!(info.data_sector_count, info.total_sectors - info.first_data_sector);
        assert_eq!(info.cluster_count, info.data_sector_count / info.sectors_per_cluster);
        assert_eq!(
            info.cluster_offset(2),
            info.first_data_sector as u64 * info.bytes_per_sector as u64
        );
    }

    #[test]
    fn root_inode_uses_mount_time_and_owner() {
        let disk = make_disk();
        let when = time::OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let info = VolumeInfo::load(&disk, &MountOptions::new().owner(1000, 100).mount_time(when)).unwrap();
        let root = &info.root_inode;
        assert_eq!(root.ino, 2);
        assert!(root.is_dir());
        assert_eq!((root.uid, root.gid), (1000, 100));
        assert_eq!(root.accessed, when);
        assert_eq!(root.modified, when);
        assert_eq!(root.created, when);
    }

    #[test]
    fn bytes_per_sector_256_is_rejected() {
        let mut disk = make_disk();
        patch_u16(&mut disk, 11, 256);
        assert_eq!(invalid_field(load(&disk).unwrap_err()), "bytes_per_sector");
    }

    #[test]
    fn sectors_per_cluster_not_power_of_two_is_rejected() {
        let mut disk = make_disk();
        patch_u8(&mut disk, 13, 3);
        assert_eq!(invalid_field(load(&disk).unwrap_err()), "sectors_per_cluster");
        patch_u8(&mut disk, 13, 0);
        assert_eq!(invalid_field(load(&disk).unwrap_err()), "sectors_per_cluster");
    }

    #[test]
    fn single_fat_is_rejected() {
        let mut disk = make_disk();
        patch_u8(&mut disk, 16, 1);
        assert_eq!(invalid_field(load(&disk).unwrap_err()), "fat_count");
    }

    #[test]
    fn fat16_style_fields_are_rejected() {
        let mut disk = make_disk();
        patch_u16(&mut disk, 17, 512);
        assert_eq!(invalid_field(load(&disk).unwrap_err()), "root_entry_count");

        let mut disk = make_disk();
        patch_u16(&mut disk, 19, 1000);
        assert_eq!(invalid_field(load(&disk).unwrap_err()), "total_sectors_16");

        let mut disk = make_disk();
        patch_u16(&mut disk, 22, 9);
        assert_eq!(invalid_field(load(&disk).unwrap_err()), "fat_size_16");
    }

    #[test]
    fn missing_signature_is_rejected() {
        let mut disk = make_disk();
        patch_u8(&mut disk, 510, 0);
        assert_eq!(invalid_field(load(&disk).unwrap_err()), "signature");
    }

    #[test]
    fn too_few_clusters_is_rejected() {
        let mut disk = make_disk();
        // Eight sectors per cluster leaves ~10k clusters on a 40 MB image.
        patch_u8(&mut disk, 13, 8);
        assert_eq!(invalid_field(load(&disk).unwrap_err()), "cluster_count");
    }

    #[test]
    fn blank_disk_is_rejected() {
        let disk = MemDisk(vec![0u8; 4 * 1024 * 1024]);
        assert!(matches!(load(&disk), Err(VfatError::InvalidVolume { .. })));
    }

    #[test]
    fn short_device_is_io_error() {
        let disk = MemDisk(vec![0u8; 100]);
        assert!(matches!(load(&disk), Err(VfatError::Io(_))));
    }
}
