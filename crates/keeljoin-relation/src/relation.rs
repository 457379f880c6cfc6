use std::fmt;

use arrow::array::{Array, ArrayRef};
use arrow::compute::interleave;
use keeljoin_arena::{ArenaStats, ArenaView, RawHashArena};
use keeljoin_common::{Error, HashRelationConfig, MemoryHandle, Result, RowLocation};
use tracing::{debug, instrument, warn};

use crate::column::HashRelationColumn;
use crate::key::{JoinKey, KeyBytes, KeyDomain, KeyKind, KeyType, visit_keys};
use crate::row::{RowEncoder, UnsafeRow};

/// Arena behind a relation: either built here or reattached from handles
/// exported by another relation.
enum HashTable {
    Owned(RawHashArena),
    Imported(ArenaView<'static>),
}

impl HashTable {
    fn view(&self) -> ArenaView<'_> {
        match self {
            HashTable::Owned(arena) => arena.view(),
            HashTable::Imported(view) => *view,
        }
    }
}

/// Build/probe side of an equality join.
///
/// Build appends key chunks (and payload chunks) in chunk order. Every
/// non-null key is chained in the arena under its [`RowLocation`]; null keys
/// are only counted. A key chunk is appended whole or not at all. Once built
/// the relation is read-only, and any number of threads may probe it
/// concurrently, each with its own output vector.
///
/// A relation that imported another relation's handles never frees the
/// underlying memory. The exporting relation must outlive it.
pub struct HashRelation {
    key_type: KeyType,
    key_kind: KeyKind,
    key_domain: KeyDomain,
    config: HashRelationConfig,
    table: Option<HashTable>,
    columns: Vec<HashRelationColumn>,
    num_arrays: u32,
    null_index_set: bool,
    null_index_list: Vec<RowLocation>,
    row_buffer: UnsafeRow,
}

impl HashRelation {
    /// Creates a relation and its arena.
    ///
    /// Composite keys are pinned to `config.key_size` or, failing that, to
    /// the fixed encoded width of the key columns when they have one. Single
    /// keys are never pinned.
    pub fn new(
        key_type: KeyType,
        columns: Vec<HashRelationColumn>,
        config: &HashRelationConfig,
    ) -> Result<Self> {
        let mut relation = Self::detached(key_type, columns)?;
        relation.config = relation.resolve_config(config);
        let arena =
            RawHashArena::new(&relation.config)?.with_key_tag(relation.key_type.layout_tag());
        relation.table = Some(HashTable::Owned(arena));
        Ok(relation)
    }

    /// A relation without an arena. It can take payload chunks and import
    /// handles, but key insertion and probing fail until it has one.
    pub fn detached(key_type: KeyType, columns: Vec<HashRelationColumn>) -> Result<Self> {
        let key_kind = key_type.kind()?;
        let key_domain = key_type.domain().ok_or_else(|| {
            Error::unsupported_type(format!("{:?} has no key domain", key_type))
        })?;
        let row_buffer = UnsafeRow::new(match key_kind {
            KeyKind::Composite => key_type.num_columns(),
            KeyKind::Numeric | KeyKind::StringLike => 0,
        });
        let mut relation = Self {
            key_type,
            key_kind,
            key_domain,
            config: HashRelationConfig::default(),
            table: None,
            columns,
            num_arrays: 0,
            null_index_set: false,
            null_index_list: Vec::new(),
            row_buffer,
        };
        relation.config = relation.resolve_config(&HashRelationConfig::default());
        Ok(relation)
    }

    fn resolve_config(&self, config: &HashRelationConfig) -> HashRelationConfig {
        let key_size = match (&self.key_type, config.key_size) {
            (KeyType::Composite(_), Some(size)) => Some(size),
            (KeyType::Composite(components), None) => UnsafeRow::fixed_size_for(components),
            (KeyType::Single(data_type), Some(size)) => {
                warn!(
                    %data_type,
                    key_size = size,
                    "Ignoring fixed key size for a single-column key"
                );
                None
            }
            (KeyType::Single(_), None) => None,
        };
        config.clone().with_key_size(key_size)
    }

    pub fn key_type(&self) -> &KeyType {
        &self.key_type
    }

    pub fn key_kind(&self) -> KeyKind {
        self.key_kind
    }

    pub fn key_domain(&self) -> KeyDomain {
        self.key_domain
    }

    pub fn config(&self) -> &HashRelationConfig {
        &self.config
    }

    /// Number of key chunks appended so far; also the index the next one gets.
    pub fn num_arrays(&self) -> u32 {
        self.num_arrays
    }

    pub fn has_table(&self) -> bool {
        self.table.is_some()
    }

    pub fn is_imported(&self) -> bool {
        matches!(self.table, Some(HashTable::Imported(_)))
    }

    fn view(&self) -> Result<ArenaView<'_>> {
        self.table.as_ref().map(HashTable::view).ok_or_else(|| {
            Error::contract_violation("hash relation probed before its hash table was created")
        })
    }

    /// Appends one chunk of a single-column key. Keys are hashed internally.
    #[instrument(skip_all, fields(rows = keys.len()))]
    pub fn append_key_column(&mut self, keys: &ArrayRef) -> Result<()> {
        self.build_single(keys, None)
    }

    /// Appends one chunk of a single-column key with caller-computed hashes.
    /// A relation built this way must be probed with `*_with_hash`.
    #[instrument(skip_all, fields(rows = keys.len()))]
    pub fn append_key_column_with_hashes(
        &mut self,
        hashes: &[u64],
        keys: &ArrayRef,
    ) -> Result<()> {
        check_hashes(hashes, keys.len())?;
        self.build_single(keys, Some(hashes))
    }

    /// Appends one chunk of a composite key, one array per key column.
    #[instrument(skip_all, fields(columns = keys.len()))]
    pub fn append_key_columns(&mut self, keys: &[ArrayRef]) -> Result<()> {
        self.build_composite(keys, None)
    }

    #[instrument(skip_all, fields(columns = keys.len()))]
    pub fn append_key_columns_with_hashes(
        &mut self,
        hashes: &[u64],
        keys: &[ArrayRef],
    ) -> Result<()> {
        check_hashes(hashes, keys.first().map_or(0, |k| k.len()))?;
        self.build_composite(keys, Some(hashes))
    }

    fn build_single(&mut self, keys: &ArrayRef, hashes: Option<&[u64]>) -> Result<()> {
        let KeyType::Single(expected) = &self.key_type else {
            return Err(Error::contract_violation(
                "composite-key relation needs append_key_columns",
            ));
        };
        if keys.data_type() != expected {
            return Err(Error::invalid_argument(format!(
                "key chunk is {} but the relation is keyed by {}",
                keys.data_type(),
                expected
            )));
        }

        let array_id = self.num_arrays;
        let arena = owned_arena(&mut self.table)?;

        let (entries, needed) = if self.key_kind == KeyKind::Numeric {
            let entries = keys.len() - keys.null_count();
            let per_entry =
                arena.entry_bytes(std::mem::size_of::<u64>(), RowLocation::ENCODED_LEN)?;
            (entries, entries.saturating_mul(per_entry))
        } else {
            let mut entries = 0usize;
            let mut needed = 0usize;
            visit_keys(keys.as_ref(), |_, key| {
                if let Some(key) = key {
                    let len =
                        arena.entry_bytes(key.as_bytes().len(), RowLocation::ENCODED_LEN)?;
                    entries += 1;
                    needed = needed.saturating_add(len);
                }
                Ok(())
            })?;
            (entries, needed)
        };
        arena.ensure_room(entries, needed)?;

        let null_index_set = &mut self.null_index_set;
        let null_index_list = &mut self.null_index_list;
        visit_keys(keys.as_ref(), |row, key| {
            let location = RowLocation::new(array_id, row as u32);
            match key {
                None => {
                    *null_index_set = true;
                    null_index_list.push(location);
                    Ok(())
                }
                Some(key) => {
                    let hash = hashes.map_or_else(|| key.default_hash(), |h| h[row]);
                    arena
                        .insert_location(hash, key.as_bytes(), location)
                        .map_err(Error::from)
                }
            }
        })?;

        self.finish_chunk(keys.len());
        Ok(())
    }

    fn build_composite(&mut self, keys: &[ArrayRef], hashes: Option<&[u64]>) -> Result<()> {
        let KeyType::Composite(expected) = &self.key_type else {
            return Err(Error::contract_violation(
                "single-key relation needs append_key_column",
            ));
        };
        if keys.len() != expected.len()
            || keys.iter().zip(expected).any(|(k, t)| k.data_type() != t)
        {
            let actual: Vec<String> = keys.iter().map(|k| k.data_type().to_string()).collect();
            return Err(Error::invalid_argument(format!(
                "key chunk columns [{}] do not match the relation key {:?}",
                actual.join(", "),
                expected
            )));
        }

        let encoder = RowEncoder::new(keys)?;
        let array_id = self.num_arrays;
        let arena = owned_arena(&mut self.table)?;
        let row_buffer = &mut self.row_buffer;

        let mut entries = 0usize;
        let mut needed = 0usize;
        for row in 0..encoder.num_rows() {
            if encoder.has_null(row) {
                continue;
            }
            encoder.encode(row, row_buffer)?;
            let len = arena.entry_bytes(row_buffer.as_bytes().len(), RowLocation::ENCODED_LEN)?;
            entries += 1;
            needed = needed.saturating_add(len);
        }
        arena.ensure_room(entries, needed)?;

        for row in 0..encoder.num_rows() {
            let location = RowLocation::new(array_id, row as u32);
            if encoder.has_null(row) {
                self.null_index_set = true;
                self.null_index_list.push(location);
                continue;
            }
            encoder.encode(row, row_buffer)?;
            let bytes = row_buffer.as_bytes();
            let hash = match hashes {
                Some(hashes) => hashes[row],
                None => KeyBytes::Slice(bytes).default_hash(),
            };
            arena.insert_location(hash, bytes, location)?;
        }

        self.finish_chunk(encoder.num_rows());
        Ok(())
    }

    fn finish_chunk(&mut self, rows: usize) {
        debug!(
            array_id = self.num_arrays,
            rows,
            null_rows = self.null_index_list.len(),
            "Appended key chunk"
        );
        self.num_arrays += 1;
    }

    /// Turns a probe key into arena bytes. `None` means the key is null and
    /// cannot match.
    fn probe_bytes<'k, K: JoinKey + ?Sized>(&self, key: &'k K) -> Result<Option<KeyBytes<'k>>> {
        if K::DOMAIN != self.key_domain {
            return Err(Error::contract_violation(format!(
                "{:?} probe key for a relation keyed by {:?}",
                K::DOMAIN,
                self.key_type
            )));
        }
        Ok(key.key_bytes())
    }

    /// Appends the location of every row stored under `key` to `out`, in
    /// insertion order. Returns `false` on a miss, leaving `out` unchanged.
    /// A null key always misses.
    pub fn get<K: JoinKey + ?Sized>(&self, key: &K, out: &mut Vec<RowLocation>) -> Result<bool> {
        let view = self.view()?;
        Ok(match self.probe_bytes(key)? {
            Some(bytes) => view.lookup(bytes.default_hash(), bytes.as_bytes(), out),
            None => false,
        })
    }

    pub fn get_with_hash<K: JoinKey + ?Sized>(
        &self,
        hash: u64,
        key: &K,
        out: &mut Vec<RowLocation>,
    ) -> Result<bool> {
        let view = self.view()?;
        Ok(match self.probe_bytes(key)? {
            Some(bytes) => view.lookup(hash, bytes.as_bytes(), out),
            None => false,
        })
    }

    /// Whether any row is stored under `key`, without collecting locations.
    pub fn if_exists<K: JoinKey + ?Sized>(&self, key: &K) -> Result<bool> {
        let view = self.view()?;
        Ok(match self.probe_bytes(key)? {
            Some(bytes) => view.exists(bytes.default_hash(), bytes.as_bytes()),
            None => false,
        })
    }

    pub fn if_exists_with_hash<K: JoinKey + ?Sized>(&self, hash: u64, key: &K) -> Result<bool> {
        let view = self.view()?;
        Ok(match self.probe_bytes(key)? {
            Some(bytes) => view.exists(hash, bytes.as_bytes()),
            None => false,
        })
    }

    /// Whether any appended row had a null key. Null rows form one group and
    /// are not enumerated.
    pub fn get_null(&self) -> bool {
        self.null_index_set
    }

    pub fn null_row_count(&self) -> usize {
        self.null_index_list.len()
    }

    pub fn num_payload_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, idx: usize) -> Option<&HashRelationColumn> {
        self.columns.get(idx)
    }

    fn payload_column(&self, idx: usize) -> Result<&HashRelationColumn> {
        self.columns.get(idx).ok_or_else(|| {
            Error::invalid_argument(format!(
                "payload column {} out of range for {} columns",
                idx,
                self.columns.len()
            ))
        })
    }

    pub fn append_payload_column(&mut self, idx: usize, chunk: &ArrayRef) -> Result<()> {
        let num_columns = self.columns.len();
        let column = self.columns.get_mut(idx).ok_or_else(|| {
            Error::invalid_argument(format!(
                "payload column {} out of range for {} columns",
                idx, num_columns
            ))
        })?;
        column.append_column(chunk)
    }

    pub fn get_array_vector(&self, idx: usize) -> Result<Vec<ArrayRef>> {
        self.payload_column(idx)?.get_array_vector()
    }

    /// Gathers payload column `idx` at `locations` into one array, in the
    /// order given.
    pub fn materialize(&self, idx: usize, locations: &[RowLocation]) -> Result<ArrayRef> {
        let chunks = self.get_array_vector(idx)?;
        let mut indices = Vec::with_capacity(locations.len());
        for location in locations {
            let (array_id, id) = location.as_interleave_index();
            match chunks.get(array_id) {
                Some(chunk) if id < chunk.len() => indices.push((array_id, id)),
                Some(_) | None => {
                    return Err(Error::invalid_argument(format!(
                        "row location {} out of range for payload column {}",
                        location, idx
                    )));
                }
            }
        }
        let arrays: Vec<&dyn Array> = chunks.iter().map(|c| c.as_ref()).collect();
        interleave(&arrays, &indices).map_err(|e| Error::arrow(e.to_string()))
    }

    /// Resets `row` and writes every payload column's value at `location`.
    pub fn encode_payload_row(&self, location: RowLocation, row: &mut UnsafeRow) -> Result<()> {
        if row.num_fields() != self.columns.len() {
            return Err(Error::invalid_argument(format!(
                "row has {} fields but the relation has {} payload columns",
                row.num_fields(),
                self.columns.len()
            )));
        }
        row.reset();
        for column in &self.columns {
            if !column.contains(location) {
                return Err(Error::invalid_argument(format!(
                    "row location {} out of range",
                    location
                )));
            }
            column.append_to_row(location, row)?;
        }
        Ok(())
    }

    pub fn stats(&self) -> Result<ArenaStats> {
        Ok(self.view()?.stats())
    }

    /// Doubles the slot array and rehashes every entry.
    pub fn grow_table(&mut self) -> Result<()> {
        owned_arena(&mut self.table)?.grow().map_err(Error::from)
    }

    /// The three handles describing the arena: control block, slot array,
    /// used overflow bytes.
    pub fn export_handles(&self) -> Result<[MemoryHandle; 3]> {
        let view = self.table.as_ref().map(HashTable::view).ok_or_else(|| {
            Error::invalid_state("cannot export handles: hash relation has no hash table")
        })?;
        let handles = view.export_handles();
        debug!(
            capacity = view.capacity(),
            entries = view.num_entries(),
            bytes_used = view.bytes_used(),
            "Exported hash relation handles"
        );
        Ok(handles)
    }

    /// Reattaches this relation to an arena exported by another relation.
    /// Any arena this relation owned is released first.
    ///
    /// # Safety
    ///
    /// The handles must come from [`export_handles`](Self::export_handles) on
    /// a relation that stays alive and unmodified for as long as this one
    /// uses them.
    pub unsafe fn import_handles(&mut self, handles: &[MemoryHandle]) -> Result<()> {
        // SAFETY: forwarded from this function's contract.
        let view: ArenaView<'static> = unsafe { ArenaView::from_handles(handles) }?;

        let expected_tag = self.key_type.layout_tag();
        if view.key_tag() != expected_tag {
            return Err(Error::contract_violation(format!(
                "imported arena key tag {:#x} does not match {:?} (tag {:#x})",
                view.key_tag(),
                self.key_type,
                expected_tag
            )));
        }
        let expected = self.config.key_size;
        if view.key_size() != expected {
            return Err(Error::contract_violation(format!(
                "imported arena key size {:?} does not match the relation's {:?}",
                view.key_size(),
                expected
            )));
        }

        self.release();
        self.config = self
            .config
            .clone()
            .with_initial_capacity(view.capacity())
            .with_max_bytes(view.max_bytes())
            .with_key_size(view.key_size());
        self.table = Some(HashTable::Imported(view));
        debug!(
            capacity = view.capacity(),
            entries = view.num_entries(),
            "Imported hash relation handles"
        );
        Ok(())
    }

    /// Drops the arena. An imported arena is only detached; its memory stays
    /// with the exporter.
    pub fn release(&mut self) {
        match self.table.take() {
            Some(HashTable::Owned(arena)) => arena.destroy(),
            Some(HashTable::Imported(view)) => {
                debug!(
                    entries = view.num_entries(),
                    "Detached from imported hash table"
                );
            }
            None => {}
        }
    }
}

fn owned_arena(table: &mut Option<HashTable>) -> Result<&mut RawHashArena> {
    match table {
        Some(HashTable::Owned(arena)) => Ok(arena),
        Some(HashTable::Imported(_)) => Err(Error::contract_violation(
            "cannot modify an imported hash table",
        )),
        None => Err(Error::contract_violation(
            "hash relation built before its hash table was created",
        )),
    }
}

fn check_hashes(hashes: &[u64], rows: usize) -> Result<()> {
    if hashes.len() != rows {
        return Err(Error::invalid_argument(format!(
            "{} hashes for {} key rows",
            hashes.len(),
            rows
        )));
    }
    Ok(())
}

impl fmt::Debug for HashRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashRelation")
            .field("key_type", &self.key_type)
            .field("num_arrays", &self.num_arrays)
            .field("payload_columns", &self.columns.len())
            .field("null_rows", &self.null_index_list.len())
            .field("imported", &self.is_imported())
            .field("stats", &self.table.as_ref().map(|t| t.view().stats()))
            .finish()
    }
}
