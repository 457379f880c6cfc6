use std::fmt;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray, GenericByteArray, PrimitiveArray};
use arrow::datatypes::{ArrowPrimitiveType, ByteArrayType, DataType};
use keeljoin_common::{Error, Result, RowLocation};

use crate::key::JoinKey;
use crate::row::UnsafeRow;

fn no_chunks(data_type: &DataType) -> Error {
    Error::invalid_state(format!("{} column has no chunks yet", data_type))
}

fn wrong_chunk(expected: &DataType, actual: &DataType) -> Error {
    Error::invalid_argument(format!(
        "cannot append a {} chunk to a {} column",
        actual, expected
    ))
}

/// Fixed-width values spread over an append-only list of Arrow chunks.
///
/// Row accessors index chunks directly and panic on a location that was not
/// produced by this column.
pub struct PrimitiveColumn<T: ArrowPrimitiveType> {
    chunks: Vec<PrimitiveArray<T>>,
}

impl<T: ArrowPrimitiveType> Clone for PrimitiveColumn<T> {
    fn clone(&self) -> Self {
        Self {
            chunks: self.chunks.clone(),
        }
    }
}

impl<T: ArrowPrimitiveType> fmt::Debug for PrimitiveColumn<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrimitiveColumn")
            .field("data_type", &T::DATA_TYPE)
            .field("num_chunks", &self.chunks.len())
            .finish()
    }
}

impl<T: ArrowPrimitiveType> Default for PrimitiveColumn<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ArrowPrimitiveType> PrimitiveColumn<T> {
    pub fn new() -> Self {
        Self { chunks: Vec::new() }
    }

    pub fn data_type(&self) -> DataType {
        T::DATA_TYPE
    }

    pub fn num_chunks(&self) -> usize {
        self.chunks.len()
    }

    pub fn append_column(&mut self, chunk: &ArrayRef) -> Result<()> {
        let typed = chunk
            .as_primitive_opt::<T>()
            .ok_or_else(|| wrong_chunk(&T::DATA_TYPE, chunk.data_type()))?;
        self.chunks.push(typed.clone());
        Ok(())
    }

    pub fn chunk(&self, array_id: usize) -> Option<&PrimitiveArray<T>> {
        self.chunks.get(array_id)
    }

    pub fn contains(&self, location: RowLocation) -> bool {
        self.chunks
            .get(location.array_id as usize)
            .is_some_and(|c| (location.id as usize) < c.len())
    }

    #[inline]
    pub fn is_null(&self, location: RowLocation) -> bool {
        self.chunks[location.array_id as usize].is_null(location.id as usize)
    }

    #[inline]
    pub fn value(&self, location: RowLocation) -> T::Native {
        self.chunks[location.array_id as usize].value(location.id as usize)
    }

    pub fn get_array_vector(&self) -> Result<Vec<ArrayRef>> {
        if self.chunks.is_empty() {
            return Err(no_chunks(&T::DATA_TYPE));
        }
        Ok(self
            .chunks
            .iter()
            .map(|c| Arc::new(c.clone()) as ArrayRef)
            .collect())
    }
}

impl<T: ArrowPrimitiveType> PrimitiveColumn<T>
where
    T::Native: JoinKey,
{
    pub fn append_to_row(&self, location: RowLocation, row: &mut UnsafeRow) -> Result<()> {
        if self.is_null(location) {
            row.append_null()
        } else {
            row.append(&self.value(location))
        }
    }
}

/// Variable-length values spread over an append-only list of Arrow chunks.
pub struct ByteColumn<T: ByteArrayType> {
    chunks: Vec<GenericByteArray<T>>,
}

impl<T: ByteArrayType> Clone for ByteColumn<T> {
    fn clone(&self) -> Self {
        Self {
            chunks: self.chunks.clone(),
        }
    }
}

impl<T: ByteArrayType> fmt::Debug for ByteColumn<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteColumn")
            .field("data_type", &T::DATA_TYPE)
            .field("num_chunks", &self.chunks.len())
            .finish()
    }
}

impl<T: ByteArrayType> Default for ByteColumn<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ByteArrayType> ByteColumn<T> {
    pub fn new() -> Self {
        Self { chunks: Vec::new() }
    }

    pub fn data_type(&self) -> DataType {
        T::DATA_TYPE
    }

    pub fn num_chunks(&self) -> usize {
        self.chunks.len()
    }

    pub fn append_column(&mut self, chunk: &ArrayRef) -> Result<()> {
        let typed = chunk
            .as_bytes_opt::<T>()
            .ok_or_else(|| wrong_chunk(&T::DATA_TYPE, chunk.data_type()))?;
        self.chunks.push(typed.clone());
        Ok(())
    }

    pub fn chunk(&self, array_id: usize) -> Option<&GenericByteArray<T>> {
        self.chunks.get(array_id)
    }

    pub fn contains(&self, location: RowLocation) -> bool {
        self.chunks
            .get(location.array_id as usize)
            .is_some_and(|c| (location.id as usize) < c.len())
    }

    #[inline]
    pub fn is_null(&self, location: RowLocation) -> bool {
        self.chunks[location.array_id as usize].is_null(location.id as usize)
    }

    #[inline]
    pub fn value(&self, location: RowLocation) -> &T::Native {
        self.chunks[location.array_id as usize].value(location.id as usize)
    }

    pub fn get_array_vector(&self) -> Result<Vec<ArrayRef>> {
        if self.chunks.is_empty() {
            return Err(no_chunks(&T::DATA_TYPE));
        }
        Ok(self
            .chunks
            .iter()
            .map(|c| Arc::new(c.clone()) as ArrayRef)
            .collect())
    }
}

impl<T: ByteArrayType> ByteColumn<T>
where
    T::Native: JoinKey,
{
    pub fn append_to_row(&self, location: RowLocation, row: &mut UnsafeRow) -> Result<()> {
        if self.is_null(location) {
            row.append_null()
        } else {
            row.append(self.value(location))
        }
    }
}
