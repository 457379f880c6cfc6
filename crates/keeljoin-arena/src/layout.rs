//! Byte layout shared by the owning arena and imported views.
//!
//! ```text
//!  control block (ArenaHeader)     slot array (2 x u64 per slot)
//! ┌──────────────────────────┐    ┌──────────────┬──────────────┐
//! │ magic, capacity,         │    │ head offset  │ tail offset  │ slot 0
//! │ max_bytes, cursor,       │    ├──────────────┼──────────────┤
//! │ num_entries, key_size,   │    │ ...          │ ...          │
//! │ slot_width, key_tag      │    └──────┬───────┴──────────────┘
//! └──────────────────────────┘           │
//!                                        ▼
//!  overflow region, entries packed in insertion order, 8-byte aligned
//! ┌──────┬──────┬─────────┬─────────────┬─────┬─────────┬─────┐
//! │ next │ hash │ key_len │ payload_len │ key │ payload │ pad │ ...
//! │ u64  │ u64  │ u32     │ u32         │     │         │     │
//! └──────┴──────┴─────────┴─────────────┴─────┴─────────┴─────┘
//! ```
//!
//! Offsets are byte positions in the overflow region; [`EMPTY`] ends a chain.
//! A link always points past the entry holding it.
//! All multi-byte integers in the overflow region are little-endian.

use bytemuck::{Pod, Zeroable};

use crate::error::ArenaError;

pub const EMPTY: u64 = u64::MAX;
pub const UNCONSTRAINED_KEY_SIZE: u64 = u64::MAX;
pub const SLOT_WORDS: usize = 2;
pub const SLOT_WIDTH: usize = SLOT_WORDS * std::mem::size_of::<u64>();
pub const ENTRY_HEADER_LEN: usize = 24;
pub const ENTRY_ALIGN: usize = 8;
pub const ARENA_MAGIC: u64 = u64::from_le_bytes(*b"KEELHASH");
pub const UNTAGGED: u64 = 0;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaHeader {
    pub magic: u64,
    pub capacity: u64,
    pub max_bytes: u64,
    pub cursor: u64,
    pub num_entries: u64,
    pub key_size: u64,
    pub slot_width: u64,
    /// Identifies how keys were encoded. [`UNTAGGED`] for raw arenas.
    pub key_tag: u64,
}

// SAFETY: `ArenaHeader` is `repr(C)` and made only of `u64` fields, so it has
// no padding and every bit pattern is a valid value.
unsafe impl Zeroable for ArenaHeader {}
// SAFETY: see the `Zeroable` impl above.
unsafe impl Pod for ArenaHeader {}

impl ArenaHeader {
    pub fn new(capacity: usize, max_bytes: usize, key_size: Option<usize>) -> Self {
        Self {
            magic: ARENA_MAGIC,
            capacity: capacity as u64,
            max_bytes: max_bytes as u64,
            cursor: 0,
            num_entries: 0,
            key_size: key_size.map_or(UNCONSTRAINED_KEY_SIZE, |k| k as u64),
            slot_width: SLOT_WIDTH as u64,
            key_tag: UNTAGGED,
        }
    }

    #[inline]
    pub fn key_size(&self) -> Option<usize> {
        (self.key_size != UNCONSTRAINED_KEY_SIZE).then_some(self.key_size as usize)
    }

    #[inline]
    pub fn mask(&self) -> u64 {
        self.capacity - 1
    }

    pub fn slot_bytes(&self) -> usize {
        self.capacity as usize * SLOT_WIDTH
    }

    /// Checks the invariants a foreign control block must satisfy before its
    /// slot array and overflow region can be trusted.
    pub fn check(&self) -> Result<(), ArenaError> {
        if self.magic != ARENA_MAGIC {
            return Err(ArenaError::LayoutMismatch(format!(
                "bad magic {:#018x}",
                self.magic
            )));
        }
        if self.slot_width != SLOT_WIDTH as u64 {
            return Err(ArenaError::LayoutMismatch(format!(
                "slot width {} (expected {})",
                self.slot_width, SLOT_WIDTH
            )));
        }
        if self.capacity == 0 || !self.capacity.is_power_of_two() {
            return Err(ArenaError::LayoutMismatch(format!(
                "capacity {} is not a power of two",
                self.capacity
            )));
        }
        if self.cursor > self.max_bytes {
            return Err(ArenaError::LayoutMismatch(format!(
                "cursor {} beyond byte budget {}",
                self.cursor, self.max_bytes
            )));
        }
        Ok(())
    }
}

#[inline]
pub fn align_up(len: usize) -> usize {
    (len + ENTRY_ALIGN - 1) & !(ENTRY_ALIGN - 1)
}

#[inline]
pub fn entry_len(key_len: usize, payload_len: usize) -> usize {
    align_up(ENTRY_HEADER_LEN + key_len + payload_len)
}

#[inline]
pub fn read_u64(bytes: &[u8], at: usize) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(word)
}

#[inline]
pub fn read_u32(bytes: &[u8], at: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[at..at + 4]);
    u32::from_le_bytes(word)
}

#[inline]
pub fn write_u64(bytes: &mut [u8], at: usize, value: u64) {
    bytes[at..at + 8].copy_from_slice(&value.to_le_bytes());
}

#[inline]
pub fn write_u32(bytes: &mut [u8], at: usize, value: u32) {
    bytes[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

/// A decoded chain entry borrowed from the overflow region.
#[derive(Debug, Clone, Copy)]
pub struct Entry<'a> {
    pub next: u64,
    pub hash: u64,
    pub key: &'a [u8],
    pub payload: &'a [u8],
}

impl<'a> Entry<'a> {
    #[inline]
    pub fn decode(bytes: &'a [u8], offset: usize) -> Self {
        let next = read_u64(bytes, offset);
        let hash = read_u64(bytes, offset + 8);
        let key_len = read_u32(bytes, offset + 16) as usize;
        let payload_len = read_u32(bytes, offset + 20) as usize;
        let key_start = offset + ENTRY_HEADER_LEN;
        let payload_start = key_start + key_len;
        Self {
            next,
            hash,
            key: &bytes[key_start..payload_start],
            payload: &bytes[payload_start..payload_start + payload_len],
        }
    }

    /// Like [`decode`](Self::decode), but `None` unless the whole entry lies
    /// inside `bytes`.
    pub fn try_decode(bytes: &'a [u8], offset: usize) -> Option<Self> {
        let key_start = offset.checked_add(ENTRY_HEADER_LEN)?;
        if key_start > bytes.len() {
            return None;
        }
        let key_len = read_u32(bytes, offset + 16) as usize;
        let payload_len = read_u32(bytes, offset + 20) as usize;
        let payload_start = key_start.checked_add(key_len)?;
        let end = payload_start.checked_add(payload_len)?;
        if end > bytes.len() {
            return None;
        }
        Some(Self {
            next: read_u64(bytes, offset),
            hash: read_u64(bytes, offset + 8),
            key: &bytes[key_start..payload_start],
            payload: &bytes[payload_start..end],
        })
    }

    pub fn encoded_len(&self) -> usize {
        entry_len(self.key.len(), self.payload.len())
    }
}

/// Writes an unlinked entry at `offset`. The caller has already made sure the
/// region holds `entry_len(key.len(), payload.len())` bytes there.
pub fn write_entry(bytes: &mut [u8], offset: usize, hash: u64, key: &[u8], payload: &[u8]) {
    write_u64(bytes, offset, EMPTY);
    write_u64(bytes, offset + 8, hash);
    write_u32(bytes, offset + 16, key.len() as u32);
    write_u32(bytes, offset + 20, payload.len() as u32);
    let key_start = offset + ENTRY_HEADER_LEN;
    bytes[key_start..key_start + key.len()].copy_from_slice(key);
    let payload_start = key_start + key.len();
    bytes[payload_start..payload_start + payload.len()].copy_from_slice(payload);
}

/// Appends the entry at `offset` to the tail of its bucket's chain.
#[inline]
pub fn link_entry(slots: &mut [u64], bytes: &mut [u8], mask: u64, hash: u64, offset: u64) {
    let slot = ((hash & mask) as usize) * SLOT_WORDS;
    let tail = slots[slot + 1];
    if tail == EMPTY {
        slots[slot] = offset;
    } else {
        write_u64(bytes, tail as usize, offset);
    }
    slots[slot + 1] = offset;
}
