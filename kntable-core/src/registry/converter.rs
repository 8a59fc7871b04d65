//! Converters between storage values and rich value types.

use std::any::{Any, TypeId};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::KnimeType;
use crate::value::StorageValue;

/// Maps one value type to its storage representation and back.
///
/// Implementations are registered with an
/// [`ExtensionRegistry`](super::ExtensionRegistry), which derives the logical
/// identifier and storage type from the registration specs.
pub trait ValueFactory: Send + Sync + 'static {
    /// The rich value type this factory produces.
    type Value: Send + Sync + 'static;

    /// Convert a value into its storage representation.
    fn encode(&self, value: &Self::Value) -> Result<StorageValue>;

    /// Convert a storage representation back into a value.
    fn decode(&self, storage: &StorageValue) -> Result<Self::Value>;
}

/// Object-safe view of a [`ValueFactory`].
trait ErasedFactory: Send + Sync {
    fn encode_any(&self, value: &dyn Any) -> Result<StorageValue>;
    fn decode_any(&self, storage: &StorageValue) -> Result<Box<dyn Any + Send + Sync>>;
}

impl<F: ValueFactory> ErasedFactory for F {
    fn encode_any(&self, value: &dyn Any) -> Result<StorageValue> {
        let value = value.downcast_ref::<F::Value>().ok_or_else(|| {
            Error::conversion(format!(
                "expected a value of type {}",
                std::any::type_name::<F::Value>()
            ))
        })?;
        self.encode(value)
    }

    fn decode_any(&self, storage: &StorageValue) -> Result<Box<dyn Any + Send + Sync>> {
        Ok(Box::new(self.decode(storage)?))
    }
}

/// Runtime descriptor of a converter's value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueType {
    id: TypeId,
    name: &'static str,
}

impl ValueType {
    pub fn of<V: 'static>() -> Self {
        Self {
            id: TypeId::of::<V>(),
            name: std::any::type_name::<V>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name, e.g. `chrono::naive::date::NaiveDate`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name with module paths removed, e.g. `NaiveDate` or
    /// `DateTime<FixedOffset>`.
    pub fn short_name(&self) -> String {
        let mut out = String::with_capacity(self.name.len());
        let mut segment = String::new();
        for c in self.name.chars() {
            match c {
                '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | ';' | '&' => {
                    out.push_str(last_segment(&segment));
                    segment.clear();
                    out.push(c);
                }
                _ => segment.push(c),
            }
        }
        out.push_str(last_segment(&segment));
        out
    }

    pub fn is<V: 'static>(&self) -> bool {
        self.id == TypeId::of::<V>()
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Key width of a struct-dict-encoded logical column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DictKeyType {
    ByteKey,
    IntKey,
    LongKey,
}

impl DictKeyType {
    /// Trait value as written to the wire schema.
    pub fn as_trait(&self) -> &'static str {
        match self {
            DictKeyType::ByteKey => "BYTE_KEY",
            DictKeyType::IntKey => "INT_KEY",
            DictKeyType::LongKey => "LONG_KEY",
        }
    }

    pub fn from_trait(value: &str) -> Option<Self> {
        match value {
            "BYTE_KEY" => Some(DictKeyType::ByteKey),
            "INT_KEY" => Some(DictKeyType::IntKey),
            "LONG_KEY" => Some(DictKeyType::LongKey),
            _ => None,
        }
    }

    /// Largest key representable with this width.
    pub fn max_key(&self) -> u64 {
        match self {
            DictKeyType::ByteKey => u8::MAX as u64,
            DictKeyType::IntKey => u32::MAX as u64,
            DictKeyType::LongKey => u64::MAX,
        }
    }
}

/// A registered converter: identifier, storage type and the type-erased
/// factory that maps between storage values and the value type.
pub struct Converter {
    logical_type: String,
    value_type: ValueType,
    storage_type: KnimeType,
    dict_encoding: Option<DictKeyType>,
    factory: Box<dyn ErasedFactory>,
}

impl Converter {
    pub(crate) fn new<F: ValueFactory>(
        logical_type: String,
        storage_type: KnimeType,
        dict_encoding: Option<DictKeyType>,
        factory: F,
    ) -> Self {
        Self {
            logical_type,
            value_type: ValueType::of::<F::Value>(),
            storage_type,
            dict_encoding,
            factory: Box::new(factory),
        }
    }

    pub fn logical_type(&self) -> &str {
        &self.logical_type
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn storage_type(&self) -> &KnimeType {
        &self.storage_type
    }

    pub fn dict_encoding(&self) -> Option<DictKeyType> {
        self.dict_encoding
    }

    /// Encode a value; fails if `V` is not this converter's value type or
    /// the factory output does not fit the storage type.
    pub fn encode<V: 'static>(&self, value: &V) -> Result<StorageValue> {
        self.check_value_type::<V>()?;
        self.encode_any(value)
    }

    pub fn encode_any(&self, value: &dyn Any) -> Result<StorageValue> {
        let storage = self.factory.encode_any(value)?;
        if !storage.conforms_to(&self.storage_type) {
            return Err(Error::conversion(format!(
                "{} encoded a {} value that does not fit storage type {}",
                self.value_type,
                storage.kind_name(),
                self.storage_type
            )));
        }
        Ok(storage)
    }

    /// Decode a storage value into `V`.
    pub fn decode<V: 'static>(&self, storage: &StorageValue) -> Result<V> {
        self.check_value_type::<V>()?;
        self.decode_any(storage)?
            .downcast::<V>()
            .map(|v| *v)
            .map_err(|_| Error::conversion(format!("factory did not produce a {}", self.value_type)))
    }

    pub fn decode_any(&self, storage: &StorageValue) -> Result<Box<dyn Any + Send + Sync>> {
        self.factory.decode_any(storage)
    }

    fn check_value_type<V: 'static>(&self) -> Result<()> {
        if self.value_type.is::<V>() {
            Ok(())
        } else {
            Err(Error::conversion(format!(
                "converter for {} handles {}, not {}",
                self.logical_type,
                self.value_type,
                std::any::type_name::<V>()
            )))
        }
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("logical_type", &self.logical_type)
            .field("value_type", &self.value_type.name)
            .field("storage_type", &self.storage_type)
            .field("dict_encoding", &self.dict_encoding)
            .finish()
    }
}
