use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_INITIAL_CAPACITY: usize = 1024 * 1024;
pub const DEFAULT_MAX_BYTES: usize = 256 * 1024 * 1024;
pub const DEFAULT_INITIAL_BYTES: usize = 1024 * 1024;
pub const DEFAULT_LOAD_FACTOR: f64 = 0.5;

/// Sizing of the hash arena behind a relation.
///
/// `initial_capacity` counts slots and is rounded up to a power of two.
/// `max_bytes` bounds the overflow region that stores keys and payloads;
/// slots are not charged against it. `key_size` pins every key to a fixed
/// byte width, which only makes sense for composite keys.
///
/// ```toml
/// initial_capacity = 4096
/// max_bytes = 67108864
/// key_size = 16
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashRelationConfig {
    pub initial_capacity: usize,
    pub max_bytes: usize,
    pub initial_bytes: usize,
    pub key_size: Option<usize>,
    pub load_factor: f64,
}

impl Default for HashRelationConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            max_bytes: DEFAULT_MAX_BYTES,
            initial_bytes: DEFAULT_INITIAL_BYTES,
            key_size: None,
            load_factor: DEFAULT_LOAD_FACTOR,
        }
    }
}

impl HashRelationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)
            .map_err(|e| Error::config(format!("failed to parse hash relation config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn with_initial_bytes(mut self, initial_bytes: usize) -> Self {
        self.initial_bytes = initial_bytes;
        self
    }

    pub fn with_key_size(mut self, key_size: Option<usize>) -> Self {
        self.key_size = key_size;
        self
    }

    pub fn with_load_factor(mut self, load_factor: f64) -> Self {
        self.load_factor = load_factor;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.initial_capacity == 0 {
            return Err(Error::config("initial_capacity must be greater than zero"));
        }
        if self.max_bytes == 0 {
            return Err(Error::config("max_bytes must be greater than zero"));
        }
        if self.initial_bytes == 0 {
            return Err(Error::config("initial_bytes must be greater than zero"));
        }
        if self.initial_bytes > self.max_bytes {
            return Err(Error::config(format!(
                "initial_bytes ({}) exceeds max_bytes ({})",
                self.initial_bytes, self.max_bytes
            )));
        }
        if !(self.load_factor > 0.0 && self.load_factor <= 1.0) {
            return Err(Error::config(format!(
                "load_factor must be in (0, 1], got {}",
                self.load_factor
            )));
        }
        if self.key_size == Some(0) {
            return Err(Error::config("key_size must be greater than zero when set"));
        }
        Ok(())
    }
}
