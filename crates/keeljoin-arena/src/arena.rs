use std::fmt;

use aligned_vec::{AVec, ConstAlign};
use keeljoin_common::{HashRelationConfig, MemoryHandle, RowLocation};
use tracing::{debug, warn};

use crate::error::ArenaError;
use crate::layout::{
    ArenaHeader, EMPTY, Entry, SLOT_WORDS, entry_len, link_entry, write_entry, write_u64,
};
use crate::view::{ArenaStats, ArenaView, Matches};

pub type A64 = ConstAlign<64>;

const ALIGN: usize = 64;

/// Growable open-chained hash table over two byte regions.
///
/// The slot array holds, per bucket, the offsets of the first and last entry
/// of its chain. Entries are appended to the overflow region in insertion
/// order and linked at the tail of their bucket, so every chain (and every
/// run of duplicate keys) reads back in insertion order.
///
/// The arena is append-only. Lookups go through [`ArenaView`], which is also
/// what a receiver gets back from exported handles.
pub struct RawHashArena {
    // Boxed so the exported control block address survives moves of the arena.
    header: Box<ArenaHeader>,
    slots: AVec<u64, A64>,
    bytes: AVec<u8, A64>,
    load_factor: f64,
}

impl RawHashArena {
    pub fn new(config: &HashRelationConfig) -> Result<Self, ArenaError> {
        config
            .validate()
            .map_err(|e| ArenaError::InvalidConfig(e.to_string()))?;

        let capacity = config
            .initial_capacity
            .checked_next_power_of_two()
            .ok_or(ArenaError::CapacityOverflow {
                capacity: config.initial_capacity,
            })?;
        let initial_bytes = config.initial_bytes.min(config.max_bytes);

        debug!(
            capacity,
            max_bytes = config.max_bytes,
            key_size = ?config.key_size,
            "Creating hash arena"
        );

        Ok(Self {
            header: Box::new(ArenaHeader::new(capacity, config.max_bytes, config.key_size)),
            slots: empty_slots(capacity),
            bytes: AVec::from_iter(ALIGN, std::iter::repeat_n(0u8, initial_bytes)),
            load_factor: config.load_factor,
        })
    }

    /// Allocates an arena with `initial_capacity` slots and an overflow budget
    /// of `max_bytes`, leaving the remaining settings at their defaults.
    pub fn create(
        initial_capacity: usize,
        max_bytes: usize,
        key_size: Option<usize>,
    ) -> Result<Self, ArenaError> {
        let defaults = HashRelationConfig::default();
        let config = HashRelationConfig {
            initial_capacity,
            max_bytes,
            initial_bytes: defaults.initial_bytes.min(max_bytes),
            key_size,
            load_factor: defaults.load_factor,
        };
        Self::new(&config)
    }

    pub fn view(&self) -> ArenaView<'_> {
        let used = self.header.cursor as usize;
        ArenaView::new(&self.header, &self.slots, &self.bytes[..used])
    }

    pub fn capacity(&self) -> usize {
        self.header.capacity as usize
    }

    pub fn num_entries(&self) -> usize {
        self.header.num_entries as usize
    }

    pub fn bytes_used(&self) -> usize {
        self.header.cursor as usize
    }

    pub fn max_bytes(&self) -> usize {
        self.header.max_bytes as usize
    }

    pub fn key_size(&self) -> Option<usize> {
        self.header.key_size()
    }

    pub fn stats(&self) -> ArenaStats {
        self.view().stats()
    }

    /// Tags the arena with the encoding of its keys. Importers compare the
    /// tag before trusting the entries.
    pub fn with_key_tag(mut self, key_tag: u64) -> Self {
        self.header.key_tag = key_tag;
        self
    }

    pub fn key_tag(&self) -> u64 {
        self.header.key_tag
    }

    /// Bytes an entry with a key of `key_len` and a payload of `payload_len`
    /// takes in the overflow region, or the error `insert` would fail with.
    pub fn entry_bytes(&self, key_len: usize, payload_len: usize) -> Result<usize, ArenaError> {
        if let Some(expected) = self.key_size().filter(|&size| size != key_len) {
            return Err(ArenaError::KeySizeMismatch {
                expected,
                actual: key_len,
            });
        }
        if key_len > u32::MAX as usize || payload_len > u32::MAX as usize {
            return Err(ArenaError::EntryTooLarge(key_len.saturating_add(payload_len)));
        }
        Ok(entry_len(key_len, payload_len))
    }

    /// Checks that `entries` more entries taking `bytes` overflow bytes in
    /// total can be inserted. Inserting them afterwards cannot fail on
    /// capacity.
    pub fn ensure_room(&self, entries: usize, bytes: usize) -> Result<(), ArenaError> {
        let end = self.bytes_used().saturating_add(bytes);
        if end > self.max_bytes() {
            warn!(
                requested = end,
                max_bytes = self.max_bytes(),
                entries = self.num_entries(),
                "Hash arena byte budget exhausted"
            );
            return Err(ArenaError::Capacity {
                requested: end,
                max_bytes: self.max_bytes(),
            });
        }

        let wanted = self.num_entries().saturating_add(entries);
        let mut capacity = self.capacity();
        while growth_threshold(capacity, self.load_factor) < wanted {
            capacity = doubled(capacity)?;
        }
        Ok(())
    }

    /// Chains a new entry under `key`. Duplicate keys are kept, each as its
    /// own entry.
    ///
    /// Nothing is mutated when this fails, so every earlier entry stays
    /// retrievable after a capacity error.
    pub fn insert(&mut self, hash: u64, key: &[u8], payload: &[u8]) -> Result<(), ArenaError> {
        let len = self.entry_bytes(key.len(), payload.len())?;
        self.ensure_room(1, len)?;

        let offset = self.bytes_used();
        let end = offset + len;
        if end > self.bytes.len() {
            self.grow_region(end);
        }
        if self.num_entries() + 1 > growth_threshold(self.capacity(), self.load_factor) {
            self.grow()?;
        }

        write_entry(&mut self.bytes, offset, hash, key, payload);
        let mask = self.header.mask();
        link_entry(&mut self.slots, &mut self.bytes, mask, hash, offset as u64);
        self.header.cursor = end as u64;
        self.header.num_entries += 1;
        Ok(())
    }

    pub fn insert_location(
        &mut self,
        hash: u64,
        key: &[u8],
        location: RowLocation,
    ) -> Result<(), ArenaError> {
        self.insert(hash, key, &location.to_le_bytes())
    }

    pub fn matches<'k>(&self, hash: u64, key: &'k [u8]) -> Matches<'_, 'k> {
        self.view().matches(hash, key)
    }

    pub fn lookup(&self, hash: u64, key: &[u8], out: &mut Vec<RowLocation>) -> bool {
        self.view().lookup(hash, key, out)
    }

    pub fn exists(&self, hash: u64, key: &[u8]) -> bool {
        self.view().exists(hash, key)
    }

    /// Doubles the slot array and relinks every entry.
    ///
    /// Entries are walked in overflow-region order, which is insertion order,
    /// and appended at chain tails, so chain order is unchanged.
    pub fn grow(&mut self) -> Result<(), ArenaError> {
        let old_capacity = self.capacity();
        let new_capacity = doubled(old_capacity)?;

        let mut slots = empty_slots(new_capacity);
        let mask = (new_capacity - 1) as u64;
        let used = self.bytes_used();
        let mut offset = 0;
        while offset < used {
            let (hash, len) = {
                let entry = Entry::decode(&self.bytes, offset);
                (entry.hash, entry.encoded_len())
            };
            write_u64(&mut self.bytes, offset, EMPTY);
            link_entry(&mut slots, &mut self.bytes, mask, hash, offset as u64);
            offset += len;
        }

        self.slots = slots;
        self.header.capacity = new_capacity as u64;
        debug!(
            old_capacity,
            new_capacity,
            entries = self.num_entries(),
            "Grew hash arena slot array"
        );
        Ok(())
    }

    /// Handles for the control block, the slot array and the used overflow
    /// bytes. They stay valid until the arena is mutated or dropped.
    pub fn export_handles(&self) -> [MemoryHandle; 3] {
        self.view().export_handles()
    }

    /// Releases both regions.
    pub fn destroy(self) {
        debug!(
            capacity = self.capacity(),
            entries = self.num_entries(),
            bytes_used = self.bytes_used(),
            "Destroying hash arena"
        );
    }

    fn grow_region(&mut self, needed: usize) {
        let used = self.bytes_used();
        let new_len = needed
            .max(self.bytes.len().saturating_mul(2))
            .min(self.max_bytes());
        let grown = AVec::from_iter(
            ALIGN,
            self.bytes[..used]
                .iter()
                .copied()
                .chain(std::iter::repeat_n(0u8, new_len - used)),
        );
        debug!(
            old_len = self.bytes.len(),
            new_len, "Grew hash arena overflow region"
        );
        self.bytes = grown;
    }
}

fn growth_threshold(capacity: usize, load_factor: f64) -> usize {
    ((capacity as f64 * load_factor) as usize).max(1)
}

fn doubled(capacity: usize) -> Result<usize, ArenaError> {
    capacity
        .checked_mul(2)
        .filter(|c| c.checked_mul(SLOT_WORDS).is_some())
        .ok_or(ArenaError::CapacityOverflow { capacity })
}

fn empty_slots(capacity: usize) -> AVec<u64, A64> {
    AVec::from_iter(ALIGN, std::iter::repeat_n(EMPTY, capacity * SLOT_WORDS))
}

impl fmt::Debug for RawHashArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawHashArena")
            .field("capacity", &self.capacity())
            .field("num_entries", &self.num_entries())
            .field("bytes_used", &self.bytes_used())
            .field("region_len", &self.bytes.len())
            .field("max_bytes", &self.max_bytes())
            .field("key_size", &self.key_size())
            .field("key_tag", &self.key_tag())
            .finish()
    }
}
