#[macro_use]
mod macros;

mod typed;

use std::any::Any;

use arrow::array::ArrayRef;
use arrow::datatypes::{
    ArrowPrimitiveType, BinaryType, ByteArrayType, DataType, Date32Type, Date64Type, Float32Type,
    Float64Type, Int8Type, Int16Type, Int32Type, Int64Type, LargeBinaryType, LargeUtf8Type,
    UInt8Type, UInt16Type, UInt32Type, UInt64Type, Utf8Type,
};
use keeljoin_common::{Error, Result, RowLocation};

use crate::row::UnsafeRow;
pub use self::typed::{ByteColumn, PrimitiveColumn};

#[derive(Debug, Clone)]
pub enum NumericColumn {
    Int8(PrimitiveColumn<Int8Type>),
    Int16(PrimitiveColumn<Int16Type>),
    Int32(PrimitiveColumn<Int32Type>),
    Int64(PrimitiveColumn<Int64Type>),
    UInt8(PrimitiveColumn<UInt8Type>),
    UInt16(PrimitiveColumn<UInt16Type>),
    UInt32(PrimitiveColumn<UInt32Type>),
    UInt64(PrimitiveColumn<UInt64Type>),
    Float32(PrimitiveColumn<Float32Type>),
    Float64(PrimitiveColumn<Float64Type>),
    Date32(PrimitiveColumn<Date32Type>),
    Date64(PrimitiveColumn<Date64Type>),
}

#[derive(Debug, Clone)]
pub enum StringLikeColumn {
    Utf8(ByteColumn<Utf8Type>),
    LargeUtf8(ByteColumn<LargeUtf8Type>),
    Binary(ByteColumn<BinaryType>),
    LargeBinary(ByteColumn<LargeBinaryType>),
}

/// Payload accessor of a hash relation: one column's chunks in arrival order.
///
/// The variant is picked once from the column's Arrow type; every later call
/// dispatches on the variant instead of inspecting the chunks again.
#[derive(Debug, Clone)]
pub enum HashRelationColumn {
    Numeric(NumericColumn),
    StringLike(StringLikeColumn),
}

impl HashRelationColumn {
    pub fn for_data_type(data_type: &DataType) -> Result<Self> {
        use HashRelationColumn::{Numeric, StringLike};

        Ok(match data_type {
            DataType::Int8 => Numeric(NumericColumn::Int8(PrimitiveColumn::new())),
            DataType::Int16 => Numeric(NumericColumn::Int16(PrimitiveColumn::new())),
            DataType::Int32 => Numeric(NumericColumn::Int32(PrimitiveColumn::new())),
            DataType::Int64 => Numeric(NumericColumn::Int64(PrimitiveColumn::new())),
            DataType::UInt8 => Numeric(NumericColumn::UInt8(PrimitiveColumn::new())),
            DataType::UInt16 => Numeric(NumericColumn::UInt16(PrimitiveColumn::new())),
            DataType::UInt32 => Numeric(NumericColumn::UInt32(PrimitiveColumn::new())),
            DataType::UInt64 => Numeric(NumericColumn::UInt64(PrimitiveColumn::new())),
            DataType::Float32 => Numeric(NumericColumn::Float32(PrimitiveColumn::new())),
            DataType::Float64 => Numeric(NumericColumn::Float64(PrimitiveColumn::new())),
            DataType::Date32 => Numeric(NumericColumn::Date32(PrimitiveColumn::new())),
            DataType::Date64 => Numeric(NumericColumn::Date64(PrimitiveColumn::new())),
            DataType::Utf8 => StringLike(StringLikeColumn::Utf8(ByteColumn::new())),
            DataType::LargeUtf8 => StringLike(StringLikeColumn::LargeUtf8(ByteColumn::new())),
            DataType::Binary => StringLike(StringLikeColumn::Binary(ByteColumn::new())),
            DataType::LargeBinary => StringLike(StringLikeColumn::LargeBinary(ByteColumn::new())),
            other => {
                return Err(Error::unsupported_type(format!(
                    "no hash relation column for {}",
                    other
                )));
            }
        })
    }

    pub fn data_type(&self) -> DataType {
        for_each_variant!(self, |c| c.data_type())
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, HashRelationColumn::Numeric(_))
    }

    pub fn num_chunks(&self) -> usize {
        for_each_variant!(self, |c| c.num_chunks())
    }

    /// Stores `chunk` under the next chunk index.
    pub fn append_column(&mut self, chunk: &ArrayRef) -> Result<()> {
        for_each_variant!(self, |c| c.append_column(chunk))
    }

    /// Whether `location` points at a stored row.
    pub fn contains(&self, location: RowLocation) -> bool {
        for_each_variant!(self, |c| c.contains(location))
    }

    #[inline]
    pub fn is_null(&self, location: RowLocation) -> bool {
        for_each_variant!(self, |c| c.is_null(location))
    }

    /// All stored chunks, oldest first. Fails until a chunk has been appended.
    pub fn get_array_vector(&self) -> Result<Vec<ArrayRef>> {
        for_each_variant!(self, |c| c.get_array_vector())
    }

    pub fn append_to_row(&self, location: RowLocation, row: &mut UnsafeRow) -> Result<()> {
        for_each_variant!(self, |c| c.append_to_row(location, row))
    }

    pub fn as_primitive<T: ArrowPrimitiveType>(&self) -> Option<&PrimitiveColumn<T>> {
        match self {
            HashRelationColumn::Numeric(numeric) => {
                for_each_numeric!(numeric, |c| (c as &dyn Any).downcast_ref())
            }
            HashRelationColumn::StringLike(_) => None,
        }
    }

    pub fn as_bytes<T: ByteArrayType>(&self) -> Option<&ByteColumn<T>> {
        match self {
            HashRelationColumn::StringLike(bytes) => {
                for_each_string_like!(bytes, |c| (c as &dyn Any).downcast_ref())
            }
            HashRelationColumn::Numeric(_) => None,
        }
    }
}
