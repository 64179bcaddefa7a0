//! File Allocation Table: link lookup, sentinel classification and chain walking.

use log::warn;

use crate::device::BlockDev;
use crate::error::{Result, VfatError};

// ─── Constants ─────────────────────────────────────────────────────────────────

/// Only the low 28 bits of a FAT32 entry are significant.
pub const FAT_ENTRY_MASK: u32 = 0x0FFF_FFFF;
/// First of the sentinel values; everything from here to the mask ends a chain.
pub const FAT32_EOC_MIN:  u32 = 0x0FFF_FFF0;
pub const FAT32_BAD:      u32 = 0x0FFF_FFF7;
/// Data clusters are numbered from 2.
pub const FIRST_DATA_CLUSTER: u32 = 2;

// ─── Classification ────────────────────────────────────────────────────────────

/// What a raw FAT entry says about the cluster it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterKind {
    Free,
    /// Cluster 1's marker, or a link pointing past the last data cluster.
    Reserved,
    Bad,
    EndOfChain,
    /// Link to the next cluster of the chain.
    Data(u32),
}

impl ClusterKind {
    pub fn classify(raw: u32, cluster_count: u32) -> Self {
        let value = raw & FAT_ENTRY_MASK;
        match value {
            0 => ClusterKind::Free,
            1 => ClusterKind::Reserved,
            FAT32_BAD => ClusterKind::Bad,
            v if v >= FAT32_EOC_MIN => ClusterKind::EndOfChain,
            v if v >= cluster_count.saturating_add(FIRST_DATA_CLUSTER) => ClusterKind::Reserved,
            v => ClusterKind::Data(v),
        }
    }
}

/// Result of following one link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterLink {
    Continue(u32),
    EndOfChain,
    Invalid,
}

impl From<ClusterKind> for ClusterLink {
    fn from(kind: ClusterKind) -> Self {
        match kind {
            ClusterKind::Data(next) => ClusterLink::Continue(next),
            // The whole sentinel range, bad-cluster marker included, terminates a chain.
            ClusterKind::EndOfChain | ClusterKind::Bad => ClusterLink::EndOfChain,
            ClusterKind::Free | ClusterKind::Reserved => ClusterLink::Invalid,
        }
    }
}

// ─── Table ─────────────────────────────────────────────────────────────────────

/// The first FAT copy, read once at mount and never written.
#[derive(Debug, Clone)]
pub struct FatTable {
    entries:       Vec<u32>,
    cluster_count: u32,
}

impl FatTable {
    /// Read `byte_size` bytes of FAT starting at `offset` on the device.
    pub fn load<D: BlockDev>(dev: &D, offset: u64, byte_size: usize, cluster_count: u32) -> Result<Self> {
        let mut raw = vec![0u8; byte_size];
        dev.read_at(offset, &mut raw)?;
        let entries = raw
            .chunks_exact(4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        Ok(Self { entries, cluster_count })
    }

    pub(crate) fn from_entries(entries: Vec<u32>, cluster_count: u32) -> Self {
        Self { entries, cluster_count }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cluster_count(&self) -> u32 {
        self.cluster_count
    }

    /// Raw entry for `cluster`, masked to 28 bits.
    pub fn entry(&self, cluster: u32) -> Option<u32> {
        self.entries.get(cluster as usize).map(|&raw| raw & FAT_ENTRY_MASK)
    }

    /// True when `cluster` names a data cluster that exists on this volume.
    pub fn is_data_cluster(&self, cluster: u32) -> bool {
        cluster >= FIRST_DATA_CLUSTER
            && cluster < self.cluster_count.saturating_add(FIRST_DATA_CLUSTER)
            && (cluster as usize) < self.entries.len()
    }

    pub fn next(&self, cluster: u32) -> ClusterLink {
        if !self.is_data_cluster(cluster) {
            return ClusterLink::Invalid;
        }
        match self.entry(cluster) {
            Some(raw) => ClusterKind::classify(raw, self.cluster_count).into(),
            None => ClusterLink::Invalid,
        }
    }

    /// Lazily walk the chain starting at `start`, following at most `limit` links.
    /// A start below 2 (empty file) yields nothing.
    pub fn chain(&self, start: u32, limit: usize) -> Chain<'_> {
        Chain {
            fat: self,
            start,
            next: self.is_data_cluster(start).then_some(start),
            visited: 0,
            limit: limit.min(self.cluster_count as usize).max(1),
        }
    }
}

// ─── Chain iterator ────────────────────────────────────────────────────────────

/// Cluster numbers of one chain in order.
///
/// Yields `Err(CorruptChain)` once and stops if the chain is longer than its
/// bound, which only happens when the FAT links a chain back onto itself.
pub struct Chain<'a> {
    fat:     &'a FatTable,
    start:   u32,
    next:    Option<u32>,
    visited: usize,
    limit:   usize,
}

impl Iterator for Chain<'_> {
    type Item = Result<u32>;

    fn next(&mut self) -> Option<Self::Item> {
        let cluster = self.next.take()?;
        if self.visited >= self.limit {
            warn!("fat: chain at {} cut after {} links", self.start, self.limit);
            return Some(Err(VfatError::CorruptChain { start: self.start, limit: self.limit }));
        }
        self.visited += 1;
        self.next = match self.fat.next(cluster) {
            ClusterLink::Continue(next) => Some(next),
            ClusterLink::EndOfChain => None,
            ClusterLink::Invalid => {
                warn!(
                    "fat: cluster {} links to invalid entry {:#x}",
                    cluster,
                    self.fat.entry(cluster).unwrap_or(0)
                );
                None
            }
        };
        Some(Ok(cluster))
    }
}

// ─── Unit tests ────────────────────────────────────────────────────────────────
