//! Logical (extension) types layered over a storage type.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::KnimeType;
use crate::error::{Error, Result};
use crate::registry::{Converter, ValueType};

/// A semantic tag on top of a physical storage type.
///
/// Equality and hashing only consider the identifier and the storage type;
/// whether a converter is attached does not matter.
#[derive(Clone)]
pub struct LogicalType {
    logical_type: Arc<str>,
    storage: Box<KnimeType>,
    converter: Option<Arc<Converter>>,
}

impl LogicalType {
    pub(crate) fn new(
        logical_type: &str,
        storage: KnimeType,
        converter: Option<Arc<Converter>>,
    ) -> Result<Self> {
        if storage.is_logical() {
            return Err(Error::construction(format!(
                "logical type '{logical_type}' cannot wrap another logical type ({storage})"
            )));
        }
        Ok(Self {
            logical_type: Arc::from(logical_type),
            storage: Box::new(storage),
            converter,
        })
    }

    /// The opaque identifier, usually a JSON-embedded value factory name.
    pub fn logical_type(&self) -> &str {
        &self.logical_type
    }

    /// The physical type backing this logical type.
    pub fn storage_type(&self) -> &KnimeType {
        &self.storage
    }

    /// The registered converter, if any.
    pub fn converter(&self) -> Option<&Arc<Converter>> {
        self.converter.as_ref()
    }

    /// The value type the converter decodes into.
    ///
    /// Fails if no converter is registered for this identifier.
    pub fn value_type(&self) -> Result<ValueType> {
        self.converter
            .as_ref()
            .map(|c| c.value_type())
            .ok_or_else(|| {
                Error::registry(format!(
                    "no converter registered for logical type {}",
                    self.logical_type
                ))
            })
    }
}

impl PartialEq for LogicalType {
    fn eq(&self, other: &Self) -> bool {
        self.logical_type == other.logical_type && self.storage == other.storage
    }
}

impl Eq for LogicalType {}

impl Hash for LogicalType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.logical_type.hash(state);
        self.storage.hash(state);
    }
}

impl fmt::Debug for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogicalType")
            .field("logical_type", &self.logical_type)
            .field("storage", &self.storage)
            .field("has_converter", &self.converter.is_some())
            .finish()
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "extension<logical={}, storage={}>",
            self.logical_type, self.storage
        )
    }
}
