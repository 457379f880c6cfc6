//! Type-tag driven construction of column accessors and hash relations.
//!
//! Both registries map an Arrow [`DataType`] to a constructor. The process
//! wide defaults cover every numeric and string-like type; callers that need
//! other types build their own registry and [`register`](ColumnRegistry::register)
//! extra constructors.

use arrow::datatypes::DataType;
use hashbrown::HashMap;
use keeljoin_common::{Error, HashRelationConfig, Result};
use lazy_static::lazy_static;

use crate::column::HashRelationColumn;
use crate::key::{KeyKind, KeyType};
use crate::relation::HashRelation;

pub type ColumnFactory = fn(&DataType) -> Result<HashRelationColumn>;

pub type RelationFactory =
    fn(KeyType, Vec<HashRelationColumn>, &HashRelationConfig) -> Result<HashRelation>;

const DEFAULT_TYPES: [DataType; 16] = [
    DataType::Int8,
    DataType::Int16,
    DataType::Int32,
    DataType::Int64,
    DataType::UInt8,
    DataType::UInt16,
    DataType::UInt32,
    DataType::UInt64,
    DataType::Float32,
    DataType::Float64,
    DataType::Date32,
    DataType::Date64,
    DataType::Utf8,
    DataType::LargeUtf8,
    DataType::Binary,
    DataType::LargeBinary,
];

#[derive(Debug, Clone, Default)]
pub struct ColumnRegistry {
    factories: HashMap<DataType, ColumnFactory>,
}

impl ColumnRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for data_type in DEFAULT_TYPES {
            registry.register(data_type, HashRelationColumn::for_data_type);
        }
        registry
    }

    /// Returns the constructor previously registered for `data_type`, if any.
    pub fn register(
        &mut self,
        data_type: DataType,
        factory: ColumnFactory,
    ) -> Option<ColumnFactory> {
        self.factories.insert(data_type, factory)
    }

    pub fn supports(&self, data_type: &DataType) -> bool {
        self.factories.contains_key(data_type)
    }

    pub fn make_column(&self, data_type: &DataType) -> Result<HashRelationColumn> {
        let factory = self.factories.get(data_type).ok_or_else(|| {
            Error::unsupported_type(format!("no hash relation column for {}", data_type))
        })?;
        factory(data_type)
    }

    pub fn make_columns(&self, data_types: &[DataType]) -> Result<Vec<HashRelationColumn>> {
        data_types.iter().map(|t| self.make_column(t)).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RelationRegistry {
    factories: HashMap<DataType, RelationFactory>,
}

impl RelationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for data_type in DEFAULT_TYPES {
            registry.register(data_type, HashRelation::new);
        }
        registry
    }

    pub fn register(
        &mut self,
        data_type: DataType,
        factory: RelationFactory,
    ) -> Option<RelationFactory> {
        self.factories.insert(data_type, factory)
    }

    pub fn supports(&self, data_type: &DataType) -> bool {
        self.factories.contains_key(data_type)
    }

    /// Builds a relation for `key_type`.
    ///
    /// Single keys go through the constructor registered for their type.
    /// Composite keys are encoded row by row, so every component only needs a
    /// registered column accessor.
    pub fn make_relation(
        &self,
        key_type: KeyType,
        columns: Vec<HashRelationColumn>,
        config: &HashRelationConfig,
    ) -> Result<HashRelation> {
        match &key_type {
            KeyType::Single(data_type) => {
                let factory = self.factories.get(data_type).ok_or_else(|| {
                    Error::unsupported_type(format!("no hash relation for {} keys", data_type))
                })?;
                factory(key_type, columns, config)
            }
            KeyType::Composite(components) => {
                let unsupported = components.iter().find(|t| !DEFAULT_COLUMNS.supports(t));
                if let Some(unsupported) = unsupported {
                    return Err(Error::unsupported_type(format!(
                        "no hash relation column for composite key component {}",
                        unsupported
                    )));
                }
                HashRelation::new(key_type, columns, config)
            }
        }
    }
}

lazy_static! {
    static ref DEFAULT_COLUMNS: ColumnRegistry = ColumnRegistry::with_defaults();
    static ref DEFAULT_RELATIONS: RelationRegistry = RelationRegistry::with_defaults();
}

/// Payload accessor for `data_type` from the default registry.
pub fn make_hash_relation_column(data_type: &DataType) -> Result<HashRelationColumn> {
    DEFAULT_COLUMNS.make_column(data_type)
}

pub fn make_hash_relation_columns(data_types: &[DataType]) -> Result<Vec<HashRelationColumn>> {
    DEFAULT_COLUMNS.make_columns(data_types)
}

/// Hash relation for `key_type` from the default registry.
pub fn make_hash_relation(
    key_type: KeyType,
    columns: Vec<HashRelationColumn>,
    config: &HashRelationConfig,
) -> Result<HashRelation> {
    DEFAULT_RELATIONS.make_relation(key_type, columns, config)
}

/// Whether `data_type` can key a relation built by [`make_hash_relation`].
pub fn is_supported_key(data_type: &DataType) -> bool {
    KeyKind::of(data_type).is_some() && DEFAULT_RELATIONS.supports(data_type)
}
