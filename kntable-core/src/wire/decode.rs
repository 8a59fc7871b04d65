//! Wire -> schema import.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, trace};

use super::spec::{DataSpec, DataTraits, NestedSpec, TraitMap, WireSchema};
use super::ROW_KEY_LOGICAL_TYPE;
use crate::error::{Error, Result};
use crate::registry::ExtensionRegistry;
use crate::schema::{Column, Schema};
use crate::types::{KnimeType, LogicalType, PrimitiveId};

const HOST_VALUE_PACKAGE: &str = "org.knime.core.data.v2.value.";

/// Import a schema from its wire form.
///
/// Every logical identifier must be registered in `registry`, except the
/// reserved row-key and list identifiers and the host's primitive value
/// factories, which are unwrapped.
pub fn from_knime_dict(wire: &WireSchema, registry: &ExtensionRegistry) -> Result<Schema> {
    let specs = &wire.schema.specs;
    let traits = &wire.schema.traits;
    let n = specs.len();
    if traits.len() != n || wire.column_names.len() != n || wire.column_meta_data.len() != n {
        return Err(Error::serialization(format!(
            "mismatched lengths: {} specs, {} traits, {} names, {} metadata entries",
            n,
            traits.len(),
            wire.column_names.len(),
            wire.column_meta_data.len()
        )));
    }

    let mut columns = Vec::with_capacity(n);
    for (i, (spec, traits)) in specs.iter().zip(traits).enumerate() {
        let name = &wire.column_names[i];
        let ktype = decode_column(i, spec, traits, registry)
            .map_err(|e| Error::serialization(format!("column {i} ('{name}'): {e}")))?;
        let column = Column::new(ktype, name.clone(), wire.column_meta_data[i].clone())
            .map_err(|e| Error::serialization(e.to_string()))?;
        columns.push(column);
    }

    debug!(columns = n, "imported wire schema");
    Ok(Schema::from_columns(columns))
}

fn decode_column(
    index: usize,
    spec: &DataSpec,
    traits: &DataTraits,
    registry: &ExtensionRegistry,
) -> Result<KnimeType> {
    let (storage, top) = decode_storage(spec, traits, registry)?;
    match top.logical_type.as_deref() {
        Some(ROW_KEY_LOGICAL_TYPE) if index == 0 => {
            apply_logical(storage, top.inner_logical_type.as_deref(), registry)
        }
        id => apply_logical(storage, id, registry),
    }
}

/// Rebuild the storage shape of one node, resolving logical types of all
/// descendants. The node's own traits are returned unapplied.
pub(crate) fn decode_storage<'t>(
    spec: &DataSpec,
    traits: &'t DataTraits,
    registry: &ExtensionRegistry,
) -> Result<(KnimeType, &'t TraitMap)> {
    let storage = match (spec, traits) {
        (DataSpec::Leaf(tag), DataTraits::Simple { .. }) => {
            let id = PrimitiveId::from_spec(tag)
                .ok_or_else(|| Error::serialization(format!("unknown type '{tag}'")))?;
            KnimeType::primitive(id)
        }
        (DataSpec::Nested(NestedSpec::List { inner_type }), DataTraits::List { inner, .. }) => {
            KnimeType::list(decode_type(inner_type, inner, registry)?)
        }
        (
            DataSpec::Nested(NestedSpec::Struct { inner_types }),
            DataTraits::Struct { inner, .. },
        ) => {
            if inner_types.len() != inner.len() {
                return Err(Error::serialization(format!(
                    "struct spec has {} inner types but traits have {}",
                    inner_types.len(),
                    inner.len()
                )));
            }
            let inner = inner_types
                .iter()
                .zip(inner)
                .map(|(s, t)| decode_type(s, t, registry))
                .collect::<Result<Vec<_>>>()?;
            KnimeType::struct_(inner).map_err(|e| Error::serialization(e.to_string()))?
        }
        (spec, traits) => {
            return Err(Error::serialization(format!(
                "spec {} does not match {} traits",
                spec_kind(spec),
                traits.kind()
            )));
        }
    };
    Ok((storage, traits.traits()))
}

fn decode_type(
    spec: &DataSpec,
    traits: &DataTraits,
    registry: &ExtensionRegistry,
) -> Result<KnimeType> {
    let (storage, top) = decode_storage(spec, traits, registry)?;
    apply_logical(storage, top.logical_type.as_deref(), registry)
}

fn apply_logical(
    storage: KnimeType,
    logical_type: Option<&str>,
    registry: &ExtensionRegistry,
) -> Result<KnimeType> {
    let Some(id) = logical_type else {
        return Ok(storage);
    };
    if is_host_wrapper(id, &storage) {
        trace!(logical_type = id, "unwrapped host value factory");
        return Ok(storage);
    }

    let converter = registry
        .by_identifier(id)
        .ok_or_else(|| Error::serialization(format!("unregistered logical type {id}")))?;
    if converter.storage_type().storage_type() != storage.storage_type() {
        return Err(Error::serialization(format!(
            "logical type {id} is registered with storage {} but the schema declares {}",
            converter.storage_type(),
            storage
        )));
    }
    Ok(KnimeType::Logical(LogicalType::new(
        id,
        storage,
        Some(Arc::clone(converter)),
    )?))
}

#[derive(Deserialize)]
struct FactoryId {
    value_factory_class: String,
}

/// Whether `id` names one of the host's value factories for plain
/// primitives or lists, matching `storage`.
pub fn is_host_wrapper(id: &str, storage: &KnimeType) -> bool {
    let Ok(FactoryId { value_factory_class }) = serde_json::from_str::<FactoryId>(id) else {
        return false;
    };
    let Some(name) = value_factory_class.strip_prefix(HOST_VALUE_PACKAGE) else {
        return false;
    };
    match storage {
        KnimeType::Primitive(p) => {
            name.strip_suffix("ValueFactory").and_then(host_primitive) == Some(p.id())
        }
        KnimeType::List(inner) => match name.strip_suffix("ListValueFactory") {
            Some("") => true,
            Some(prefix) => {
                host_primitive(prefix).is_some()
                    && host_primitive(prefix) == inner.as_primitive().map(|p| p.id())
            }
            None => false,
        },
        _ => false,
    }
}

fn host_primitive(name: &str) -> Option<PrimitiveId> {
    match name {
        "Int" => Some(PrimitiveId::Int),
        "Long" => Some(PrimitiveId::Long),
        "Double" => Some(PrimitiveId::Double),
        "String" => Some(PrimitiveId::String),
        "Boolean" => Some(PrimitiveId::Bool),
        _ => None,
    }
}

fn spec_kind(spec: &DataSpec) -> &'static str {
    match spec {
        DataSpec::Leaf(_) => "leaf",
        DataSpec::Nested(NestedSpec::List { .. }) => "list",
        DataSpec::Nested(NestedSpec::Struct { .. }) => "struct",
    }
}
