use arrow::array::{Array, ArrayRef};
use arrow::datatypes::DataType;
use keeljoin_common::{Error, Result, RowLocation};

use crate::column::HashRelationColumn;
use crate::key::{JoinKey, KeyBytes, KeyDomain, KeyKind};
use crate::registry::make_hash_relation_column;

const FIXED_FIELD_LEN: usize = 8;
const LENGTH_PREFIX_LEN: usize = 4;

/// A reusable byte buffer holding one encoded row of several columns.
///
/// ```text
/// ┌───────────────────┬─────────┬──────────────────────┬─────
/// │ null bits         │ field 0 │ field 1              │ ...
/// │ ceil(fields/8) B  │ 8 B     │ u32 len │ bytes      │
/// └───────────────────┴─────────┴──────────────────────┴─────
/// ```
///
/// Numeric fields take their canonical 8-byte key form, variable-length
/// fields a little-endian `u32` length followed by their bytes. A null field
/// sets its bit and writes nothing. Rows with equal values in the same column
/// order encode to identical bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UnsafeRow {
    num_fields: usize,
    written: usize,
    data: Vec<u8>,
}

impl UnsafeRow {
    pub fn new(num_fields: usize) -> Self {
        Self {
            num_fields,
            written: 0,
            data: vec![0; Self::null_bits_len(num_fields)],
        }
    }

    #[inline]
    pub fn null_bits_len(num_fields: usize) -> usize {
        num_fields.div_ceil(8)
    }

    /// Encoded width of a row whose fields have the given types, or `None`
    /// when any field is variable-length or cannot be encoded.
    pub fn fixed_size_for(data_types: &[DataType]) -> Option<usize> {
        let mut size = Self::null_bits_len(data_types.len());
        for data_type in data_types {
            match KeyKind::of(data_type)? {
                KeyKind::Numeric => size += FIXED_FIELD_LEN,
                KeyKind::StringLike | KeyKind::Composite => return None,
            }
        }
        Some(size)
    }

    /// Clears every field but keeps the allocation.
    pub fn reset(&mut self) {
        let bits = Self::null_bits_len(self.num_fields);
        self.data.truncate(bits);
        self.data.fill(0);
        self.written = 0;
    }

    pub fn num_fields(&self) -> usize {
        self.num_fields
    }

    /// Number of fields appended since the last reset.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn is_complete(&self) -> bool {
        self.written == self.num_fields
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_null_at(&self, field: usize) -> bool {
        field < self.num_fields && self.data[field / 8] & (1 << (field % 8)) != 0
    }

    pub fn has_null(&self) -> bool {
        self.data[..Self::null_bits_len(self.num_fields)]
            .iter()
            .any(|b| *b != 0)
    }

    pub fn append_null(&mut self) -> Result<()> {
        let field = self.next_field()?;
        self.data[field / 8] |= 1 << (field % 8);
        Ok(())
    }

    /// Appends the next field. A null key becomes a null field.
    pub fn append<K: JoinKey + ?Sized>(&mut self, value: &K) -> Result<()> {
        match value.key_bytes() {
            None => self.append_null(),
            Some(KeyBytes::Scalar(word)) => {
                self.next_field()?;
                self.data.extend_from_slice(&word);
                Ok(())
            }
            Some(KeyBytes::Slice(bytes)) => {
                let len = u32::try_from(bytes.len()).map_err(|_| {
                    Error::invalid_argument(format!(
                        "row field of {} bytes is too long",
                        bytes.len()
                    ))
                })?;
                self.next_field()?;
                self.data.extend_from_slice(&len.to_le_bytes());
                self.data.extend_from_slice(bytes);
                Ok(())
            }
        }
    }

    fn next_field(&mut self) -> Result<usize> {
        if self.written >= self.num_fields {
            return Err(Error::invalid_argument(format!(
                "row already holds all {} fields",
                self.num_fields
            )));
        }
        let field = self.written;
        self.written += 1;
        Ok(field)
    }
}

/// A row with any null field is a null key.
impl JoinKey for UnsafeRow {
    const DOMAIN: KeyDomain = KeyDomain::Row;

    fn key_bytes(&self) -> Option<KeyBytes<'_>> {
        (!self.has_null()).then(|| KeyBytes::Slice(self.as_bytes()))
    }
}

/// Encodes rows of a fixed set of columns into an [`UnsafeRow`].
///
/// Column accessors are resolved once, when the encoder is built.
#[derive(Debug)]
pub struct RowEncoder {
    columns: Vec<HashRelationColumn>,
    num_rows: usize,
}

impl RowEncoder {
    pub fn new(arrays: &[ArrayRef]) -> Result<Self> {
        let num_rows = arrays.first().map_or(0, |a| a.len());
        let mut columns = Vec::with_capacity(arrays.len());
        for array in arrays {
            if array.len() != num_rows {
                return Err(Error::invalid_argument(format!(
                    "row columns differ in length: {} vs {}",
                    array.len(),
                    num_rows
                )));
            }
            let mut column = make_hash_relation_column(array.data_type())?;
            column.append_column(array)?;
            columns.push(column);
        }
        Ok(Self { columns, num_rows })
    }

    pub fn num_fields(&self) -> usize {
        self.columns.len()
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn new_row(&self) -> UnsafeRow {
        UnsafeRow::new(self.columns.len())
    }

    pub fn has_null(&self, row: usize) -> bool {
        let location = RowLocation::new(0, row as u32);
        self.columns.iter().any(|c| c.is_null(location))
    }

    /// Resets `out` and writes every column's value at `row` into it.
    pub fn encode(&self, row: usize, out: &mut UnsafeRow) -> Result<()> {
        if out.num_fields() != self.columns.len() {
            return Err(Error::invalid_argument(format!(
                "row has {} fields but the encoder has {} columns",
                out.num_fields(),
                self.columns.len()
            )));
        }
        if row >= self.num_rows {
            return Err(Error::invalid_argument(format!(
                "row {} out of range for {} rows",
                row, self.num_rows
            )));
        }
        out.reset();
        let location = RowLocation::new(0, row as u32);
        for column in &self.columns {
            column.append_to_row(location, out)?;
        }
        Ok(())
    }
}
