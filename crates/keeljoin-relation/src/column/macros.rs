macro_rules! for_each_numeric {
    ($col:expr, | $inner:ident | $body:expr) => {
        match $col {
            NumericColumn::Int8($inner) => $body,
            NumericColumn::Int16($inner) => $body,
            NumericColumn::Int32($inner) => $body,
            NumericColumn::Int64($inner) => $body,
            NumericColumn::UInt8($inner) => $body,
            NumericColumn::UInt16($inner) => $body,
            NumericColumn::UInt32($inner) => $body,
            NumericColumn::UInt64($inner) => $body,
            NumericColumn::Float32($inner) => $body,
            NumericColumn::Float64($inner) => $body,
            NumericColumn::Date32($inner) => $body,
            NumericColumn::Date64($inner) => $body,
        }
    };
}

macro_rules! for_each_string_like {
    ($col:expr, | $inner:ident | $body:expr) => {
        match $col {
            StringLikeColumn::Utf8($inner) => $body,
            StringLikeColumn::LargeUtf8($inner) => $body,
            StringLikeColumn::Binary($inner) => $body,
            StringLikeColumn::LargeBinary($inner) => $body,
        }
    };
}

macro_rules! for_each_variant {
    ($col:expr, | $inner:ident | $body:expr) => {
        match $col {
            HashRelationColumn::Numeric(numeric) => for_each_numeric!(numeric, |$inner| $body),
            HashRelationColumn::StringLike(bytes) => for_each_string_like!(bytes, |$inner| $body),
        }
    };
}
