use std::fmt;

/// Identifies one build-side row: the chunk it arrived in and its offset
/// within that chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct RowLocation {
    pub array_id: u32,
    pub id: u32,
}

impl RowLocation {
    pub const ENCODED_LEN: usize = 8;

    pub const fn new(array_id: u32, id: u32) -> Self {
        Self { array_id, id }
    }

    pub fn to_le_bytes(self) -> [u8; Self::ENCODED_LEN] {
        let mut out = [0u8; Self::ENCODED_LEN];
        out[..4].copy_from_slice(&self.array_id.to_le_bytes());
        out[4..].copy_from_slice(&self.id.to_le_bytes());
        out
    }

    /// Returns `None` unless `bytes` is exactly one encoded location.
    pub fn from_le_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::ENCODED_LEN {
            return None;
        }
        let mut array_id = [0u8; 4];
        let mut id = [0u8; 4];
        array_id.copy_from_slice(&bytes[..4]);
        id.copy_from_slice(&bytes[4..]);
        Some(Self {
            array_id: u32::from_le_bytes(array_id),
            id: u32::from_le_bytes(id),
        })
    }

    pub fn as_interleave_index(self) -> (usize, usize) {
        (self.array_id as usize, self.id as usize)
    }
}

impl fmt::Display for RowLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.array_id, self.id)
    }
}

/// Address and byte extent of one memory region of an exported arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryHandle {
    pub address: usize,
    pub size: usize,
}

impl MemoryHandle {
    pub const fn new(address: usize, size: usize) -> Self {
        Self { address, size }
    }

    pub fn from_slice<T>(slice: &[T]) -> Self {
        Self {
            address: slice.as_ptr() as usize,
            size: std::mem::size_of_val(slice),
        }
    }

    pub fn is_null(&self) -> bool {
        self.address == 0
    }
}
