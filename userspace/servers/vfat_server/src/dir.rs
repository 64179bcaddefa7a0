//! Directory decoding: 32-byte slots → (name, metadata) pairs.
//!
//! Every slot is classified first and only then decoded through named
//! fields, so the short-entry and long-name layouts never alias each other.

use bitflags::bitflags;
use vfat_api_types::FileMode;

use crate::datetime::{decode_creation, decode_date, decode_timestamp, FAT_EPOCH};
use crate::metadata::{Metadata, Owner};
use crate::volume::DIR_ENTRY_SIZE;

// ─── Constants ─────────────────────────────────────────────────────────────────

const SLOT_SIZE: usize = DIR_ENTRY_SIZE as usize;

const END_MARKER:     u8 = 0x00;
const DELETED_MARKER: u8 = 0xE5;
/// A real leading 0xE5 (Kanji lead byte) is stored as 0x05.
const KANJI_ESCAPE:   u8 = 0x05;

/// UTF-16 units carried by one long-name fragment.
pub const LFN_UNITS: usize = 13;
const LFN_LAST_FLAG: u8 = 0x40;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Attributes: u8 {
        const READ_ONLY = 0x01;
        const HIDDEN    = 0x02;
        const SYSTEM    = 0x04;
        const VOLUME_ID = 0x08;
        const DIRECTORY = 0x10;
        const ARCHIVE   = 0x20;
        const LONG_NAME = Self::READ_ONLY.bits() | Self::HIDDEN.bits()
            | Self::SYSTEM.bits() | Self::VOLUME_ID.bits();

        // The source may set any bits
        const _ = !0;
    }
}

// ─── Slot views ────────────────────────────────────────────────────────────────

/// One 32-byte directory slot after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirSlot {
    /// Deleted / never-used slot that is not the terminator.
    Free,
    /// First byte 0x00: no later slot of the directory is in use.
    End,
    LongName(LongNameFragment),
    VolumeLabel,
    Short(ShortEntry),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LongNameFragment {
    pub order:    u8,
    pub checksum: u8,
    pub units:    [u16; LFN_UNITS],
}

impl LongNameFragment {
    fn parse(b: &[u8; SLOT_SIZE]) -> Self {
        // name1: 1..11, name2: 14..26, name3: 28..32
        let mut units = [0u16; LFN_UNITS];
        let offsets = (1..11).step_by(2).chain((14..26).step_by(2)).chain((28..32).step_by(2));
        for (unit, off) in units.iter_mut().zip(offsets) {
            *unit = le16(b, off);
        }
        Self { order: b[0], checksum: b[13], units }
    }

    /// Sequence number without the "last fragment" flag.
    pub fn sequence(&self) -> u8 {
        self.order & !LFN_LAST_FLAG
    }

    pub fn is_last(&self) -> bool {
        self.order & LFN_LAST_FLAG != 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortEntry {
    pub name:            [u8; 8],
    pub ext:             [u8; 3],
    pub attr:            Attributes,
    pub create_tenths:   u8,
    pub create_time:     u16,
    pub create_date:     u16,
    pub access_date:     u16,
    pub cluster_hi:      u16,
    pub modify_time:     u16,
    pub modify_date:     u16,
    pub cluster_lo:      u16,
    pub size:            u32,
}

fn le16(b: &[u8; SLOT_SIZE], off: usize) -> u16 {
    u16::from_le_bytes([b[off], b[off + 1]])
}

fn trim_padding(field: &[u8]) -> &[u8] {
    let end = field.iter().rposition(|&b| b != b' ').map_or(0, |i| i + 1);
    &field[..end]
}

impl ShortEntry {
    fn parse(b: &[u8; SLOT_SIZE]) -> Self {
        let mut name = [0u8; 8];
        let mut ext = [0u8; 3];
        name.copy_from_slice(&b[0..8]);
        ext.copy_from_slice(&b[8..11]);
        Self {
            name,
            ext,
            attr:          Attributes::from_bits_retain(b[11]),
            create_tenths: b[13],
            create_time:   le16(b, 14),
            create_date:   le16(b, 16),
            access_date:   le16(b, 18),
            cluster_hi:    le16(b, 20),
            modify_time:   le16(b, 22),
            modify_date:   le16(b, 24),
            cluster_lo:    le16(b, 26),
            size:          u32::from_le_bytes([b[28], b[29], b[30], b[31]]),
        }
    }

    pub fn cluster(&self) -> u32 {
        ((self.cluster_hi as u32) << 16) | self.cluster_lo as u32
    }

    pub fn is_dir(&self) -> bool {
        self.attr.contains(Attributes::DIRECTORY)
    }

    /// Extension without padding, if any.
    pub fn extension(&self) -> Option<String> {
        let ext = trim_padding(&self.ext);
        (!ext.is_empty()).then(|| ext.iter().map(|&b| b as char).collect())
    }

    /// `NAME.EXT` rendering of the 8.3 fields, e.g. `"HELLO   TXT"` → `"HELLO.TXT"`.
    pub fn short_name(&self) -> String {
        let mut base = [0u8; 8];
        base.copy_from_slice(&self.name);
        if base[0] == KANJI_ESCAPE {
            base[0] = DELETED_MARKER;
        }
        let mut name: String = trim_padding(&base).iter().map(|&b| b as char).collect();
        if let Some(ext) = self.extension() {
            name.push('.');
            name.push_str(&ext);
        }
        name
    }

    /// Checksum of the 8.3 name that long-name fragments carry.
    pub fn checksum(&self) -> u8 {
        self.name
            .iter()
            .chain(self.ext.iter())
            .fold(0u8, |sum, &b| sum.rotate_right(1).wrapping_add(b))
    }

    pub fn metadata(&self, owner: Owner) -> Metadata {
        let mode = if self.is_dir() { FileMode::directory() } else { FileMode::regular() };
        Metadata {
            ino: self.cluster(),
            mode,
            nlink: 1,
            uid: owner.uid,
            gid: owner.gid,
            size: self.size as u64,
            accessed: decode_date(self.access_date)
                .map_or(FAT_EPOCH, |d| d.midnight().assume_utc()),
            modified: decode_timestamp(self.modify_date, self.modify_time),
            created:  decode_creation(self.create_date, self.create_time, self.create_tenths),
        }
    }
}

impl DirSlot {
    pub fn classify(b: &[u8; SLOT_SIZE]) -> Self {
        let attr = Attributes::from_bits_retain(b[11]);
        match b[0] {
            DELETED_MARKER => DirSlot::Free,
            END_MARKER => DirSlot::End,
            _ if attr.contains(Attributes::LONG_NAME) => {
                DirSlot::LongName(LongNameFragment::parse(b))
            }
            _ if attr.contains(Attributes::VOLUME_ID) => DirSlot::VolumeLabel,
            _ => DirSlot::Short(ShortEntry::parse(b)),
        }
    }
}

// ─── Long-name accumulator ─────────────────────────────────────────────────────

/// Fragments seen since the last standard entry, in physical order.
///
/// The fragment written last on disk holds the start of the name, so the
/// sequence is reversed once when the name is taken. A run must start with
/// the "last" flag, count down to 1 and carry a single checksum; anything
/// else drops what was collected.
#[derive(Debug, Default)]
pub struct LongName {
    fragments: Vec<[u16; LFN_UNITS]>,
    checksum:  u8,
    next_seq:  u8,
}

impl LongName {
    pub fn push(&mut self, fragment: &LongNameFragment) {
        if fragment.is_last() {
            self.clear();
            self.checksum = fragment.checksum;
            self.next_seq = fragment.sequence();
        }
        if self.next_seq == 0
            || fragment.sequence() != self.next_seq
            || fragment.checksum != self.checksum
        {
            self.clear();
            return;
        }
        self.fragments.push(fragment.units);
        self.next_seq -= 1;
    }

    pub fn clear(&mut self) {
        self.fragments.clear();
        self.next_seq = 0;
    }

    /// UTF-16 units of the pending name, cut at the first NUL (or 0xFFFF pad).
    ///
    /// `None` unless every fragment down to sequence 1 was seen and they
    /// belong to the 8.3 name with checksum `short_checksum`. Leaves the
    /// accumulator empty either way.
    pub fn take(&mut self, short_checksum: u8) -> Option<Vec<u16>> {
        let complete = !self.fragments.is_empty()
            && self.next_seq == 0
            && self.checksum == short_checksum;
        let fragments = core::mem::take(&mut self.fragments);
        self.clear();
        if !complete {
            return None;
        }
        let units: Vec<u16> = fragments
            .into_iter()
            .rev()
            .flatten()
            .take_while(|&u| u != 0x0000 && u != 0xFFFF)
            .collect();
        (!units.is_empty()).then_some(units)
    }
}

// ─── Entries ───────────────────────────────────────────────────────────────────

/// A reconstructed directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name:     String,
    pub metadata: Metadata,
}

impl DirEntry {
    fn from_short(entry: &ShortEntry, long: Option<Vec<u16>>, owner: Owner) -> Option<Self> {
        // Stale or half-overwritten slot.
        if entry.name[0] == DELETED_MARKER {
            return None;
        }
        let name = match long {
            Some(units) => {
                if units.contains(&u16::from(DELETED_MARKER)) {
                    return None;
                }
                let mut name = String::from_utf16_lossy(&units);
                // Fragments normally hold the whole name; only add the 8.3
                // extension when they carry none.
                if let Some(ext) = entry.extension() {
                    if !name.contains('.') {
                        name.push('.');
                        name.push_str(&ext);
                    }
                }
                name
            }
            None => entry.short_name(),
        };
        Some(Self { name, metadata: entry.metadata(owner) })
    }
}

/// One-shot decoder over the slots of a single cluster.
///
/// A pending long name can be carried in from the previous cluster of the
/// same directory with [`DirDecoder::resume`] and handed on with
/// [`DirDecoder::into_pending`].
pub struct DirDecoder<'a> {
    slots:   core::slice::ChunksExact<'a, u8>,
    owner:   Owner,
    pending: LongName,
    ended:   bool,
}

impl<'a> DirDecoder<'a> {
    pub fn new(cluster: &'a [u8], owner: Owner) -> Self {
        Self::resume(cluster, owner, LongName::default())
    }

    pub fn resume(cluster: &'a [u8], owner: Owner, pending: LongName) -> Self {
        Self { slots: cluster.chunks_exact(SLOT_SIZE), owner, pending, ended: false }
    }

    /// True once the end-of-directory slot was seen.
    pub fn reached_end(&self) -> bool {
        self.ended
    }

    pub fn into_pending(self) -> LongName {
        self.pending
    }
}

impl Iterator for DirDecoder<'_> {
    type Item = DirEntry;

    fn next(&mut self) -> Option<DirEntry> {
        while !self.ended {
            let slot: &[u8; SLOT_SIZE] = self.slots.next()?.try_into().ok()?;
            match DirSlot::classify(slot) {
                DirSlot::End => {
                    self.ended = true;
                    self.pending.clear();
                }
                // Fragments only belong to an immediately following standard entry.
                DirSlot::Free | DirSlot::VolumeLabel => self.pending.clear(),
                DirSlot::LongName(fragment) => self.pending.push(&fragment),
                DirSlot::Short(entry) => {
                    let long = self.pending.take(entry.checksum());
                    if let Some(e) = DirEntry::from_short(&entry, long, self.owner) {
                        return Some(e);
                    }
                }
            }
        }
        None
    }
}

/// Decode every entry of one directory cluster.
pub fn decode(cluster: &[u8], owner: Owner) -> Vec<DirEntry> {
    DirDecoder::new(cluster, owner).collect()
}

// ─── Unit tests ────────────────────────────────────────────────────────────────
