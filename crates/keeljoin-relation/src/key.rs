use arrow::array::{Array, AsArray};
use arrow::datatypes::{
    BinaryType, DataType, Date32Type, Date64Type, Float32Type, Float64Type, Int8Type, Int16Type,
    Int32Type, Int64Type, LargeBinaryType, LargeUtf8Type, UInt8Type, UInt16Type, UInt32Type,
    UInt64Type, Utf8Type,
};
use keeljoin_arena::{hash_bytes, hash_scalar};
use keeljoin_common::{Error, Result};

/// The byte form a key takes inside the arena.
///
/// Numeric keys are widened to a canonical 8-byte scalar so that every
/// integer width hashes and compares by value. String-like and composite keys
/// are compared by content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyBytes<'a> {
    Scalar([u8; 8]),
    Slice(&'a [u8]),
}

impl KeyBytes<'_> {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            KeyBytes::Scalar(word) => word.as_slice(),
            KeyBytes::Slice(bytes) => bytes,
        }
    }

    /// Hash used when the caller does not supply one.
    pub fn default_hash(&self) -> u64 {
        match self {
            KeyBytes::Scalar(word) => hash_scalar(u64::from_le_bytes(*word)),
            KeyBytes::Slice(bytes) => hash_bytes(bytes),
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, KeyBytes::Scalar(_))
    }
}

/// Value domain of a key. A relation only accepts probe keys of its own
/// domain, so equal bytes from different domains never match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyDomain {
    Signed,
    Unsigned,
    Float,
    Bytes,
    Row,
}

impl KeyDomain {
    /// Domain of a single key column of `data_type`. Dates are signed day or
    /// millisecond counts.
    pub fn of(data_type: &DataType) -> Option<KeyDomain> {
        match data_type {
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::Date32
            | DataType::Date64 => Some(KeyDomain::Signed),
            DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => {
                Some(KeyDomain::Unsigned)
            }
            DataType::Float32 | DataType::Float64 => Some(KeyDomain::Float),
            DataType::Utf8 | DataType::LargeUtf8 | DataType::Binary | DataType::LargeBinary => {
                Some(KeyDomain::Bytes)
            }
            _ => None,
        }
    }
}

/// A value that can be used to build or probe a hash relation.
///
/// `None` marks a null key. Null keys never match anything.
pub trait JoinKey {
    const DOMAIN: KeyDomain;

    fn key_bytes(&self) -> Option<KeyBytes<'_>>;
}

macro_rules! impl_signed_key {
    ($($t:ty),*) => {
        $(impl JoinKey for $t {
            const DOMAIN: KeyDomain = KeyDomain::Signed;

            #[inline]
            fn key_bytes(&self) -> Option<KeyBytes<'_>> {
                Some(KeyBytes::Scalar((*self as i64).to_le_bytes()))
            }
        })*
    };
}

macro_rules! impl_unsigned_key {
    ($($t:ty),*) => {
        $(impl JoinKey for $t {
            const DOMAIN: KeyDomain = KeyDomain::Unsigned;

            #[inline]
            fn key_bytes(&self) -> Option<KeyBytes<'_>> {
                Some(KeyBytes::Scalar((*self as u64).to_le_bytes()))
            }
        })*
    };
}

impl_signed_key!(i8, i16, i32, i64);
impl_unsigned_key!(u8, u16, u32, u64);

/// Bit pattern of `value` with `-0.0` folded into `0.0` and every NaN folded
/// into one.
#[inline]
pub fn canonical_f64_bits(value: f64) -> u64 {
    if value.is_nan() {
        f64::NAN.to_bits()
    } else if value == 0.0 {
        0
    } else {
        value.to_bits()
    }
}

impl JoinKey for f64 {
    const DOMAIN: KeyDomain = KeyDomain::Float;

    #[inline]
    fn key_bytes(&self) -> Option<KeyBytes<'_>> {
        Some(KeyBytes::Scalar(canonical_f64_bits(*self).to_le_bytes()))
    }
}

impl JoinKey for f32 {
    const DOMAIN: KeyDomain = KeyDomain::Float;

    #[inline]
    fn key_bytes(&self) -> Option<KeyBytes<'_>> {
        Some(KeyBytes::Scalar(
            canonical_f64_bits(f64::from(*self)).to_le_bytes(),
        ))
    }
}

impl JoinKey for str {
    const DOMAIN: KeyDomain = KeyDomain::Bytes;

    #[inline]
    fn key_bytes(&self) -> Option<KeyBytes<'_>> {
        Some(KeyBytes::Slice(self.as_bytes()))
    }
}

impl JoinKey for [u8] {
    const DOMAIN: KeyDomain = KeyDomain::Bytes;

    #[inline]
    fn key_bytes(&self) -> Option<KeyBytes<'_>> {
        Some(KeyBytes::Slice(self))
    }
}

impl JoinKey for String {
    const DOMAIN: KeyDomain = KeyDomain::Bytes;

    fn key_bytes(&self) -> Option<KeyBytes<'_>> {
        self.as_str().key_bytes()
    }
}

impl JoinKey for Vec<u8> {
    const DOMAIN: KeyDomain = KeyDomain::Bytes;

    fn key_bytes(&self) -> Option<KeyBytes<'_>> {
        self.as_slice().key_bytes()
    }
}

impl<T: JoinKey> JoinKey for Option<T> {
    const DOMAIN: KeyDomain = T::DOMAIN;

    fn key_bytes(&self) -> Option<KeyBytes<'_>> {
        self.as_ref().and_then(JoinKey::key_bytes)
    }
}

impl<T: JoinKey + ?Sized> JoinKey for &T {
    const DOMAIN: KeyDomain = T::DOMAIN;

    fn key_bytes(&self) -> Option<KeyBytes<'_>> {
        (**self).key_bytes()
    }
}

/// How keys of a relation are turned into bytes. Fixed for the lifetime of a
/// relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    Numeric,
    StringLike,
    Composite,
}

impl KeyKind {
    /// Kind of a single key column of `data_type`, if it can be a key at all.
    pub fn of(data_type: &DataType) -> Option<KeyKind> {
        match data_type {
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
            | DataType::Date32
            | DataType::Date64 => Some(KeyKind::Numeric),
            DataType::Utf8 | DataType::LargeUtf8 | DataType::Binary | DataType::LargeBinary => {
                Some(KeyKind::StringLike)
            }
            _ => None,
        }
    }
}

/// Runtime type tag of a relation's join key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyType {
    Single(DataType),
    Composite(Vec<DataType>),
}

impl KeyType {
    pub fn kind(&self) -> Result<KeyKind> {
        match self {
            KeyType::Single(data_type) => KeyKind::of(data_type).ok_or_else(|| {
                Error::unsupported_type(format!("{} cannot be a join key", data_type))
            }),
            KeyType::Composite(components) => {
                if components.is_empty() {
                    return Err(Error::invalid_argument(
                        "composite key needs at least one column",
                    ));
                }
                for data_type in components {
                    if KeyKind::of(data_type).is_none() {
                        return Err(Error::unsupported_type(format!(
                            "{} cannot be part of a composite join key",
                            data_type
                        )));
                    }
                }
                Ok(KeyKind::Composite)
            }
        }
    }

    /// Domain probe keys of a relation with this key type must belong to.
    pub fn domain(&self) -> Option<KeyDomain> {
        match self {
            KeyType::Single(data_type) => KeyDomain::of(data_type),
            KeyType::Composite(_) => Some(KeyDomain::Row),
        }
    }

    /// Tag stored in the arena control block, so that handles are only
    /// imported by relations whose keys were encoded the same way.
    ///
    /// Single keys of one domain share a tag except dates, whose units
    /// differ. Composite tags depend on every column, in order.
    pub fn layout_tag(&self) -> u64 {
        match self {
            KeyType::Single(data_type) => u64::from(type_tag(data_type)),
            KeyType::Composite(components) => {
                let tags: Vec<u8> = components.iter().map(type_tag).collect();
                hash_bytes(&tags) | COMPOSITE_TAG_BIT
            }
        }
    }

    pub fn num_columns(&self) -> usize {
        match self {
            KeyType::Single(_) => 1,
            KeyType::Composite(components) => components.len(),
        }
    }
}

const COMPOSITE_TAG_BIT: u64 = 1 << 63;

fn type_tag(data_type: &DataType) -> u8 {
    match data_type {
        DataType::Date32 => 4,
        DataType::Date64 => 5,
        DataType::Utf8 | DataType::LargeUtf8 => 6,
        DataType::Binary | DataType::LargeBinary => 7,
        other => match KeyDomain::of(other) {
            Some(KeyDomain::Signed) => 1,
            Some(KeyDomain::Unsigned) => 2,
            Some(KeyDomain::Float) => 3,
            Some(KeyDomain::Bytes | KeyDomain::Row) | None => 0,
        },
    }
}

/// Calls `visit` with the key of every row of a single key column, in row
/// order. Null rows are passed as `None`.
pub(crate) fn visit_keys<F>(array: &dyn Array, mut visit: F) -> Result<()>
where
    F: FnMut(usize, Option<KeyBytes<'_>>) -> Result<()>,
{
    macro_rules! visit_typed {
        ($downcast:ident, $t:ty) => {{
            let typed = array.$downcast::<$t>().ok_or_else(|| {
                Error::internal(format!("key chunk is not a {}", array.data_type()))
            })?;
            for row in 0..typed.len() {
                if typed.is_null(row) {
                    visit(row, None)?;
                } else {
                    visit(row, typed.value(row).key_bytes())?;
                }
            }
            Ok(())
        }};
    }

    match array.data_type() {
        DataType::Int8 => visit_typed!(as_primitive_opt, Int8Type),
        DataType::Int16 => visit_typed!(as_primitive_opt, Int16Type),
        DataType::Int32 => visit_typed!(as_primitive_opt, Int32Type),
        DataType::Int64 => visit_typed!(as_primitive_opt, Int64Type),
        DataType::UInt8 => visit_typed!(as_primitive_opt, UInt8Type),
        DataType::UInt16 => visit_typed!(as_primitive_opt, UInt16Type),
        DataType::UInt32 => visit_typed!(as_primitive_opt, UInt32Type),
        DataType::UInt64 => visit_typed!(as_primitive_opt, UInt64Type),
        DataType::Float32 => visit_typed!(as_primitive_opt, Float32Type),
        DataType::Float64 => visit_typed!(as_primitive_opt, Float64Type),
        DataType::Date32 => visit_typed!(as_primitive_opt, Date32Type),
        DataType::Date64 => visit_typed!(as_primitive_opt, Date64Type),
        DataType::Utf8 => visit_typed!(as_bytes_opt, Utf8Type),
        DataType::LargeUtf8 => visit_typed!(as_bytes_opt, LargeUtf8Type),
        DataType::Binary => visit_typed!(as_bytes_opt, BinaryType),
        DataType::LargeBinary => visit_typed!(as_bytes_opt, LargeBinaryType),
        other => Err(Error::unsupported_type(format!(
            "{} cannot be a join key",
            other
        ))),
    }
}
