use keeljoin_common::{MemoryHandle, RowLocation};

use crate::error::ArenaError;
use crate::layout::{ArenaHeader, EMPTY, Entry, SLOT_WORDS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaStats {
    pub capacity: usize,
    pub num_entries: usize,
    pub bytes_used: usize,
    pub max_bytes: usize,
}

/// Read-only access to a built arena.
///
/// A view either borrows an owning [`RawHashArena`](crate::RawHashArena) or
/// points at memory that another builder exported with
/// [`export_handles`](Self::export_handles). Views never free anything.
#[derive(Debug, Clone, Copy)]
pub struct ArenaView<'a> {
    header: &'a ArenaHeader,
    slots: &'a [u64],
    bytes: &'a [u8],
}

impl<'a> ArenaView<'a> {
    pub(crate) fn new(header: &'a ArenaHeader, slots: &'a [u64], bytes: &'a [u8]) -> Self {
        Self {
            header,
            slots,
            bytes,
        }
    }

    /// Reattaches to an arena from the three handles produced by
    /// [`export_handles`](Self::export_handles): control block, slot array,
    /// and the used part of the overflow region, in that order.
    ///
    /// # Safety
    ///
    /// Every handle must describe readable memory of at least `size` bytes
    /// that stays valid and unmodified for `'a`. The exporting arena must
    /// therefore outlive the view and must not insert or grow while the view
    /// is alive.
    pub unsafe fn from_handles(handles: &[MemoryHandle]) -> Result<Self, ArenaError> {
        let [header_handle, slots_handle, bytes_handle] = handles else {
            return Err(ArenaError::InvalidHandles(format!(
                "expected 3 handles, got {}",
                handles.len()
            )));
        };
        if header_handle.is_null() || slots_handle.is_null() {
            return Err(ArenaError::InvalidHandles(
                "control block and slot array addresses must be non-null".to_string(),
            ));
        }
        if header_handle.size != std::mem::size_of::<ArenaHeader>() {
            return Err(ArenaError::LayoutMismatch(format!(
                "control block is {} bytes (expected {})",
                header_handle.size,
                std::mem::size_of::<ArenaHeader>()
            )));
        }

        // SAFETY: the caller guarantees the handle covers `size` readable bytes
        // for `'a`; the address was checked to be non-null above.
        let header_bytes: &'a [u8] = unsafe {
            std::slice::from_raw_parts(header_handle.address as *const u8, header_handle.size)
        };
        let header: &'a ArenaHeader = bytemuck::try_from_bytes(header_bytes)
            .map_err(|e| ArenaError::LayoutMismatch(format!("control block: {:?}", e)))?;
        header.check()?;

        if slots_handle.size != header.slot_bytes() {
            return Err(ArenaError::LayoutMismatch(format!(
                "slot array is {} bytes but capacity {} needs {}",
                slots_handle.size,
                header.capacity,
                header.slot_bytes()
            )));
        }
        // SAFETY: as above, for the slot array handle.
        let slot_bytes: &'a [u8] = unsafe {
            std::slice::from_raw_parts(slots_handle.address as *const u8, slots_handle.size)
        };
        let slots: &'a [u64] = bytemuck::try_cast_slice(slot_bytes)
            .map_err(|e| ArenaError::LayoutMismatch(format!("slot array: {:?}", e)))?;

        if bytes_handle.size as u64 != header.cursor {
            return Err(ArenaError::LayoutMismatch(format!(
                "overflow region is {} bytes but the cursor is at {}",
                bytes_handle.size, header.cursor
            )));
        }
        let bytes: &'a [u8] = if bytes_handle.size == 0 {
            &[]
        } else {
            if bytes_handle.is_null() {
                return Err(ArenaError::InvalidHandles(
                    "overflow region address must be non-null".to_string(),
                ));
            }
            // SAFETY: as above, for the overflow region handle.
            unsafe {
                std::slice::from_raw_parts(bytes_handle.address as *const u8, bytes_handle.size)
            }
        };

        Ok(Self::new(header, slots, bytes))
    }

    /// Control block, slot array and used overflow bytes, in handoff order.
    pub fn export_handles(&self) -> [MemoryHandle; 3] {
        [
            MemoryHandle::new(
                self.header as *const ArenaHeader as usize,
                std::mem::size_of::<ArenaHeader>(),
            ),
            MemoryHandle::from_slice(self.slots),
            MemoryHandle::from_slice(self.bytes),
        ]
    }

    pub fn header(&self) -> &'a ArenaHeader {
        self.header
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

    pub fn key_tag(&self) -> u64 {
        self.header.key_tag
    }

    pub fn stats(&self) -> ArenaStats {
        ArenaStats {
            capacity: self.capacity(),
            num_entries: self.num_entries(),
            bytes_used: self.bytes_used(),
            max_bytes: self.max_bytes(),
        }
    }

    /// Payloads of every entry stored under `key`, in insertion order.
    pub fn matches<'k>(&self, hash: u64, key: &'k [u8]) -> Matches<'a, 'k> {
        let next = if self.key_size().is_some_and(|size| size != key.len()) {
            EMPTY
        } else {
            self.slots[((hash & self.header.mask()) as usize) * SLOT_WORDS]
        };
        Matches {
            bytes: self.bytes,
            hash,
            key,
            next,
        }
    }

    /// Appends the location of every entry stored under `key` to `out`.
    /// Returns whether anything matched; `out` is untouched on a miss.
    pub fn lookup(&self, hash: u64, key: &[u8], out: &mut Vec<RowLocation>) -> bool {
        let before = out.len();
        out.extend(
            self.matches(hash, key)
                .filter_map(RowLocation::from_le_bytes),
        );
        out.len() > before
    }

    pub fn exists(&self, hash: u64, key: &[u8]) -> bool {
        self.matches(hash, key).next().is_some()
    }
}

/// Iterator over the payloads chained under one key.
#[derive(Debug, Clone)]
pub struct Matches<'a, 'k> {
    bytes: &'a [u8],
    hash: u64,
    key: &'k [u8],
    next: u64,
}

impl<'a> Iterator for Matches<'a, '_> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        while self.next != EMPTY {
            let offset = self.next;
            let Some(entry) = usize::try_from(offset)
                .ok()
                .and_then(|at| Entry::try_decode(self.bytes, at))
            else {
                self.next = EMPTY;
                return None;
            };
            // A link that does not move forward can only come from corrupt
            // memory; end the chain there.
            self.next = if entry.next > offset { entry.next } else { EMPTY };
            if entry.hash == self.hash && entry.key == self.key {
                return Some(entry.payload);
            }
        }
        None
    }
}
