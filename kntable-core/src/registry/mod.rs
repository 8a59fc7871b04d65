//! Extension registry mapping logical identifiers and value types to
//! converters.
//!
//! A registry is populated once at startup, either explicitly and handed to
//! conversions by reference, or installed as the process-wide registry with
//! [`install_global`]. Installation is one-shot: afterwards the registry is
//! immutable and can be read from any thread.
//!
//! ```rust
//! use chrono::NaiveDate;
//! use kntable_core::registry::{register_builtin_factories, ExtensionRegistry};
//!
//! let mut registry = ExtensionRegistry::new();
//! register_builtin_factories(&mut registry).unwrap();
//!
//! let date = registry.logical_for::<NaiveDate>().unwrap();
//! assert!(date.is_logical());
//! ```

mod builtin;
mod converter;

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use tracing::{debug, trace};

pub use builtin::{
    register_builtin_factories, DurationFactory, FsLocation, FsLocationFactory, LocalDateFactory,
    LocalDateTimeFactory, LocalTimeFactory, ZonedDateTimeFactory,
};
pub use converter::{Converter, DictKeyType, ValueFactory, ValueType};

use crate::error::{Error, Result};
use crate::types::{KnimeType, LogicalType};
use crate::wire::{decode_storage, DataSpec, DataTraits};

/// Registry of logical types and their converters.
#[derive(Debug, Default)]
pub struct ExtensionRegistry {
    by_id: HashMap<String, Arc<Converter>>,
    by_value: HashMap<TypeId, String>,
    order: Vec<String>,
}

impl ExtensionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in time and file-location factories.
    pub fn with_builtins() -> Result<Self> {
        let mut registry = Self::new();
        register_builtin_factories(&mut registry)?;
        Ok(registry)
    }

    /// Register a value factory from its wire specs.
    ///
    /// `storage_spec` is the JSON physical shape (e.g. `"int64"` or
    /// `{"type":"struct","inner_types":["int64","int64"]}`), `traits_spec`
    /// the matching JSON traits tree. The identifier is the traits'
    /// `logical_type` if set, otherwise
    /// `{"value_factory_class":"<module>.<factory_name>"}`.
    pub fn register<F: ValueFactory>(
        &mut self,
        module: &str,
        factory_name: &str,
        storage_spec: &str,
        traits_spec: &str,
        factory: F,
    ) -> Result<Arc<Converter>> {
        let spec: DataSpec = serde_json::from_str(storage_spec).map_err(|e| {
            Error::registry(format!("invalid storage spec for {factory_name}: {e}"))
        })?;
        let traits: DataTraits = serde_json::from_str(traits_spec).map_err(|e| {
            Error::registry(format!("invalid traits spec for {factory_name}: {e}"))
        })?;
        let (storage, top) = decode_storage(&spec, &traits, self)
            .map_err(|e| Error::registry(format!("cannot register {factory_name}: {e}")))?;

        let logical_type = match &top.logical_type {
            Some(id) => id.clone(),
            None => value_factory_id(&format!("{module}.{factory_name}")),
        };
        self.register_type(&logical_type, storage, top.dict_encoding, factory)
    }

    /// Register a value factory under an explicit identifier and storage type.
    pub fn register_type<F: ValueFactory>(
        &mut self,
        logical_type: &str,
        storage: KnimeType,
        dict_encoding: Option<DictKeyType>,
        factory: F,
    ) -> Result<Arc<Converter>> {
        if storage.is_logical() {
            return Err(Error::registry(format!(
                "storage type of {logical_type} must not be logical"
            )));
        }
        let value_type = ValueType::of::<F::Value>();

        if let Some(existing) = self.by_id.get(logical_type) {
            if existing.storage_type() == &storage
                && existing.value_type() == value_type
                && existing.dict_encoding() == dict_encoding
            {
                trace!(logical_type, "already registered");
                return Ok(Arc::clone(existing));
            }
            return Err(Error::registry(format!(
                "{logical_type} is already registered for {} with storage {}",
                existing.value_type(),
                existing.storage_type()
            )));
        }

        let converter = Arc::new(Converter::new(
            logical_type.to_string(),
            storage,
            dict_encoding,
            factory,
        ));
        self.by_value
            .entry(value_type.id())
            .or_insert_with(|| logical_type.to_string());
        self.by_id
            .insert(logical_type.to_string(), Arc::clone(&converter));
        self.order.push(logical_type.to_string());

        debug!(
            logical_type,
            value_type = value_type.name(),
            storage = %converter.storage_type(),
            "registered value factory"
        );
        Ok(converter)
    }

    /// Converter registered under an identifier.
    pub fn by_identifier(&self, logical_type: &str) -> Option<&Arc<Converter>> {
        self.by_id.get(logical_type)
    }

    /// Converter for a value type: the first one registered for it.
    pub fn converter_for<V: 'static>(&self) -> Result<&Arc<Converter>> {
        self.by_value
            .get(&TypeId::of::<V>())
            .and_then(|id| self.by_id.get(id))
            .ok_or_else(|| {
                Error::registry(format!(
                    "no logical type registered for value type {}",
                    std::any::type_name::<V>()
                ))
            })
    }

    /// Logical type for a value type, with its converter attached.
    pub fn logical_for<V: 'static>(&self) -> Result<KnimeType> {
        Self::logical_from(self.converter_for::<V>()?)
    }

    /// Logical type registered under an identifier.
    pub fn logical_by_identifier(&self, logical_type: &str) -> Result<KnimeType> {
        let converter = self.by_identifier(logical_type).ok_or_else(|| {
            Error::registry(format!("logical type {logical_type} is not registered"))
        })?;
        Self::logical_from(converter)
    }

    /// Logical type for a value type name, either fully qualified or short
    /// (`NaiveDate`).
    pub fn logical_by_type_name(&self, name: &str) -> Result<KnimeType> {
        self.order
            .iter()
            .filter_map(|id| self.by_id.get(id))
            .find(|c| {
                let vt = c.value_type();
                vt.name() == name || vt.short_name() == name
            })
            .ok_or_else(|| {
                Error::registry(format!("no logical type registered for value type {name}"))
            })
            .and_then(Self::logical_from)
    }

    fn logical_from(converter: &Arc<Converter>) -> Result<KnimeType> {
        Ok(KnimeType::Logical(LogicalType::new(
            converter.logical_type(),
            converter.storage_type().clone(),
            Some(Arc::clone(converter)),
        )?))
    }

    /// Registered converters in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Converter>> {
        self.order.iter().filter_map(|id| self.by_id.get(id))
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// JSON identifier of a host value factory class.
pub fn value_factory_id(class: &str) -> String {
    serde_json::json!({ "value_factory_class": class }).to_string()
}

static GLOBAL: OnceLock<ExtensionRegistry> = OnceLock::new();
static EMPTY: OnceLock<ExtensionRegistry> = OnceLock::new();

/// Install the process-wide registry. Fails if one is already installed.
pub fn install_global(registry: ExtensionRegistry) -> Result<&'static ExtensionRegistry> {
    let count = registry.len();
    GLOBAL
        .set(registry)
        .map_err(|_| Error::registry("global extension registry is already installed"))?;
    debug!(converters = count, "installed global extension registry");
    Ok(global())
}

/// The installed process-wide registry, or an empty one.
pub fn global() -> &'static ExtensionRegistry {
    GLOBAL
        .get()
        .unwrap_or_else(|| EMPTY.get_or_init(ExtensionRegistry::new))
}

/// Logical type for `V` from the process-wide registry.
pub fn logical<V: 'static>() -> Result<KnimeType> {
    global().logical_for::<V>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{int64, string};
    use crate::value::StorageValue;

    #[derive(Debug, PartialEq)]
    struct Tag(String);

    struct TagFactory;

    impl ValueFactory for TagFactory {
        type Value = Tag;

        fn encode(&self, value: &Tag) -> Result<StorageValue> {
            Ok(StorageValue::String(value.0.clone()))
        }

        fn decode(&self, storage: &StorageValue) -> Result<Tag> {
            storage
                .as_str()
                .map(|s| Tag(s.to_string()))
                .ok_or_else(|| Error::conversion("expected string"))
        }
    }

    struct OtherTagFactory;

    impl ValueFactory for OtherTagFactory {
        type Value = i64;

        fn encode(&self, value: &i64) -> Result<StorageValue> {
            Ok(StorageValue::String(value.to_string()))
        }

        fn decode(&self, storage: &StorageValue) -> Result<i64> {
            storage
                .as_str()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| Error::conversion("expected numeric string"))
        }
    }

    fn tag_registry() -> ExtensionRegistry {
        let mut registry = ExtensionRegistry::new();
        registry
            .register(
                "my.module",
                "TagFactory",
                "\"string\"",
                r#"{"type":"simple","traits":{}}"#,
                TagFactory,
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_identifier_derived_from_factory_name() {
        let registry = tag_registry();
        let t = registry.logical_for::<Tag>().unwrap();
        let l = t.as_logical().unwrap();
        assert_eq!(
            l.logical_type(),
            r#"{"value_factory_class":"my.module.TagFactory"}"#
        );
        assert_eq!(l.storage_type(), &string());
        assert!(l.value_type().unwrap().is::<Tag>());
    }

    #[test]
    fn test_identifier_from_traits() {
        let mut registry = ExtensionRegistry::new();
        registry
            .register(
                "my.module",
                "TagFactory",
                "\"string\"",
                r#"{"type":"simple","traits":{"logical_type":"tag-id"}}"#,
                TagFactory,
            )
            .unwrap();
        assert!(registry.by_identifier("tag-id").is_some());
    }

    #[test]
    fn test_registration_is_idempotent() {
        let mut registry = tag_registry();
        registry
            .register(
                "my.module",
                "TagFactory",
                "\"string\"",
                r#"{"type":"simple","traits":{}}"#,
                TagFactory,
            )
            .unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_conflicting_registration_fails() {
        let mut registry = tag_registry();
        let id = value_factory_id("my.module.TagFactory");
        assert!(matches!(
            registry.register_type(&id, int64(), None, TagFactory),
            Err(Error::Registry(_))
        ));
        assert!(matches!(
            registry.register_type(&id, string(), None, OtherTagFactory),
            Err(Error::Registry(_))
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_first_identifier_wins_for_value_type() {
        let mut registry = tag_registry();
        registry
            .register_type("second", string(), None, TagFactory)
            .unwrap();
        let t = registry.logical_for::<Tag>().unwrap();
        assert_eq!(
            t.as_logical().unwrap().logical_type(),
            value_factory_id("my.module.TagFactory")
        );
        assert!(registry.logical_by_identifier("second").is_ok());
    }

    #[test]
    fn test_unregistered_value_type_fails() {
        let registry = tag_registry();
        assert!(matches!(
            registry.logical_for::<u8>(),
            Err(Error::Registry(_))
        ));
        assert!(matches!(
            registry.logical_by_type_name("NoSuchType"),
            Err(Error::Registry(_))
        ));
    }

    #[test]
    fn test_lookup_by_type_name() {
        let registry = tag_registry();
        let short = registry.logical_by_type_name("Tag").unwrap();
        let full = registry
            .logical_by_type_name(std::any::type_name::<Tag>())
            .unwrap();
        assert_eq!(short, full);
    }

    #[test]
    fn test_invalid_specs_fail() {
        let mut registry = ExtensionRegistry::new();
        let bad_storage = registry.register("m", "F", "{", "{}", TagFactory);
        assert!(matches!(bad_storage, Err(Error::Registry(_))));
        let mismatched = registry.register(
            "m",
            "F",
            "\"string\"",
            r#"{"type":"list","traits":{},"inner":{"type":"simple","traits":{}}}"#,
            TagFactory,
        );
        assert!(matches!(mismatched, Err(Error::Registry(_))));
    }

    #[test]
    fn test_dict_encoding_recorded() {
        let mut registry = ExtensionRegistry::new();
        let converter = registry
            .register(
                "m",
                "F",
                "\"string\"",
                r#"{"type":"simple","traits":{"dict_encoding":"BYTE_KEY"}}"#,
                TagFactory,
            )
            .unwrap();
        assert_eq!(converter.dict_encoding(), Some(DictKeyType::ByteKey));
    }
}
