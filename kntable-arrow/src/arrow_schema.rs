//! Map logical schemas to Arrow schemas and back.
//!
//! Logical types are carried as Arrow extension metadata on the field that
//! holds their storage. Nested logical types tag the nested child field, so
//! the whole tree survives a round trip through an Arrow IPC file.

use std::collections::HashMap;
use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Fields, Schema as ArrowSchema};
use kntable_core::registry::{DictKeyType, ExtensionRegistry};
use kntable_core::schema::{Column, Schema};
use kntable_core::types::{KnimeType, PrimitiveId};
use kntable_core::wire::{is_host_wrapper, LIST_LOGICAL_TYPE, ROW_KEY_LOGICAL_TYPE};
use tracing::{debug, warn};

use crate::error::{BridgeError, Result};

/// Field metadata key naming the extension type.
pub const EXTENSION_NAME_KEY: &str = "ARROW:extension:name";
/// Field metadata key holding the extension payload (the logical identifier).
pub const EXTENSION_METADATA_KEY: &str = "ARROW:extension:metadata";
/// Extension name of plain logical columns.
pub const LOGICAL_TYPE_EXTENSION: &str = "knime.logical_type";
/// Extension name of struct-dict-encoded logical columns.
pub const DICT_LOGICAL_TYPE_EXTENSION: &str = "knime.struct_dict_encoded_logical_type";
/// Field metadata key holding a column's free-form metadata.
pub const COLUMN_METADATA_KEY: &str = "kntable:column_metadata";
/// Schema metadata key holding the writer's chunk size.
pub const CHUNK_SIZE_KEY: &str = "KNIME:basic:chunkSize";
/// Schema metadata key holding per-column factory versions.
pub const FACTORY_VERSIONS_KEY: &str = "KNIME:basic:factoryVersions";

/// Name of the child field of every list type.
pub const LIST_ITEM_NAME: &str = "item";

/// Arrow type of the plain storage of `ktype`.
///
/// Nested logical types keep their identifier on the nested field.
pub fn to_arrow_type(ktype: &KnimeType) -> DataType {
    match ktype {
        KnimeType::Primitive(p) => match p.id() {
            PrimitiveId::Int => DataType::Int32,
            PrimitiveId::Long => DataType::Int64,
            PrimitiveId::Double => DataType::Float64,
            PrimitiveId::String => DataType::Utf8,
            PrimitiveId::Bool => DataType::Boolean,
            PrimitiveId::Blob => DataType::LargeBinary,
        },
        KnimeType::List(inner) => DataType::LargeList(Arc::new(nested_field(LIST_ITEM_NAME, inner))),
        KnimeType::Struct(s) => DataType::Struct(
            s.inner_types()
                .iter()
                .enumerate()
                .map(|(i, t)| nested_field(&i.to_string(), t))
                .collect::<Fields>(),
        ),
        KnimeType::Logical(l) => to_arrow_type(l.storage_type()),
    }
}

/// Arrow type of a struct-dict-encoded column: `{"0": key, "1": value}`.
pub fn dict_struct_type(key_type: DictKeyType, value_type: DataType) -> DataType {
    DataType::Struct(dict_fields(key_type, value_type))
}

/// Children of a struct-dict-encoded column.
pub fn dict_fields(key_type: DictKeyType, value_type: DataType) -> Fields {
    Fields::from(vec![
        Field::new("0", dict_key_type(key_type), true),
        Field::new("1", value_type, true),
    ])
}

/// Arrow type of dictionary keys.
pub fn dict_key_type(key_type: DictKeyType) -> DataType {
    match key_type {
        DictKeyType::ByteKey => DataType::UInt8,
        DictKeyType::IntKey => DataType::UInt32,
        DictKeyType::LongKey => DataType::UInt64,
    }
}

fn nested_field(name: &str, ktype: &KnimeType) -> Field {
    let field = Field::new(name, to_arrow_type(ktype), true);
    match ktype.as_logical() {
        Some(l) => field.with_metadata(extension(LOGICAL_TYPE_EXTENSION, l.logical_type())),
        None => field,
    }
}

fn extension(name: &str, logical_type: &str) -> HashMap<String, String> {
    HashMap::from([
        (EXTENSION_NAME_KEY.to_string(), name.to_string()),
        (EXTENSION_METADATA_KEY.to_string(), logical_type.to_string()),
    ])
}

/// Dictionary encoding applied to a top-level column, if any.
pub fn column_dict_encoding(ktype: &KnimeType, registry: &ExtensionRegistry) -> Option<DictKeyType> {
    let logical = ktype.as_logical()?;
    logical
        .converter()
        .or_else(|| registry.by_identifier(logical.logical_type()))
        .and_then(|c| c.dict_encoding())
}

/// Arrow field of a top-level column.
///
/// Dict-encoded logical columns use the struct dictionary layout; a plain
/// column 0 is tagged as the row key.
pub fn to_arrow_field(column: &Column, index: usize, registry: &ExtensionRegistry) -> Field {
    let ktype = column.ktype();
    let (data_type, mut metadata) = match (ktype.as_logical(), column_dict_encoding(ktype, registry)) {
        (Some(l), Some(key)) => (
            dict_struct_type(key, to_arrow_type(l.storage_type())),
            extension(DICT_LOGICAL_TYPE_EXTENSION, l.logical_type()),
        ),
        (Some(l), None) => (
            to_arrow_type(ktype),
            extension(LOGICAL_TYPE_EXTENSION, l.logical_type()),
        ),
        (None, _) if index == 0 => (
            to_arrow_type(ktype),
            extension(LOGICAL_TYPE_EXTENSION, ROW_KEY_LOGICAL_TYPE),
        ),
        (None, _) => (to_arrow_type(ktype), HashMap::new()),
    };
    if let Some(meta) = column.metadata() {
        metadata.insert(COLUMN_METADATA_KEY.to_string(), meta.to_string());
    }
    Field::new(column.name(), data_type, true).with_metadata(metadata)
}

/// Arrow schema of a logical schema, with chunk size and factory versions
/// in the schema metadata.
pub fn to_arrow_schema(
    schema: &Schema,
    registry: &ExtensionRegistry,
    chunk_size: usize,
) -> ArrowSchema {
    let fields: Vec<Field> = schema
        .iter()
        .enumerate()
        .map(|(i, c)| to_arrow_field(c, i, registry))
        .collect();
    let versions = factory_versions(&fields);
    ArrowSchema::new(fields).with_metadata(HashMap::from([
        (CHUNK_SIZE_KEY.to_string(), chunk_size.to_string()),
        (FACTORY_VERSIONS_KEY.to_string(), versions),
    ]))
}

/// Comma-separated factory versions, one entry per field.
///
/// Every factory is at version `0`; nested types list their children in
/// brackets, each followed by `;`.
pub fn factory_versions(fields: &[Field]) -> String {
    fields
        .iter()
        .map(|f| factory_version(f.data_type()))
        .collect::<Vec<_>>()
        .join(",")
}

fn factory_version(data_type: &DataType) -> String {
    match data_type {
        DataType::Struct(fields) => {
            let children: String = fields
                .iter()
                .map(|f| format!("{};", factory_version(f.data_type())))
                .collect();
            format!("0[{children}]")
        }
        DataType::List(item) | DataType::LargeList(item) => {
            format!("0[{};]", factory_version(item.data_type()))
        }
        _ => "0".to_string(),
    }
}

/// Chunk size recorded in an Arrow schema, if present and numeric.
pub fn chunk_size(schema: &ArrowSchema) -> Option<usize> {
    schema.metadata().get(CHUNK_SIZE_KEY)?.parse().ok()
}

/// Recover the logical schema of an Arrow schema.
///
/// Registered identifiers get their converter attached. Unregistered
/// identifiers are kept as bare logical types so that files written by
/// other plugins can still be inspected.
pub fn from_arrow_schema(schema: &ArrowSchema, registry: &ExtensionRegistry) -> Result<Schema> {
    let mut columns = Vec::with_capacity(schema.fields().len());
    for (i, field) in schema.fields().iter().enumerate() {
        let mut ktype = from_arrow_field(field, registry)
            .map_err(|e| BridgeError::schema(format!("field {i} ('{}'): {e}", field.name())))?;
        if i == 0 {
            ktype = strip_row_key(ktype);
        }
        let metadata = field.metadata().get(COLUMN_METADATA_KEY).cloned();
        columns.push(Column::new(ktype, field.name().clone(), metadata)?);
    }
    debug!(columns = columns.len(), "recovered logical schema from arrow");
    Ok(Schema::from_columns(columns))
}

fn strip_row_key(ktype: KnimeType) -> KnimeType {
    match ktype {
        KnimeType::Logical(l) if l.logical_type() == ROW_KEY_LOGICAL_TYPE => l.storage_type().clone(),
        other => other,
    }
}

/// Recover the logical type of one Arrow field.
pub fn from_arrow_field(field: &Field, registry: &ExtensionRegistry) -> Result<KnimeType> {
    let metadata = field.metadata();
    let extension_name = metadata.get(EXTENSION_NAME_KEY).map(String::as_str);
    let logical_type = metadata.get(EXTENSION_METADATA_KEY).map(String::as_str);

    match (extension_name, logical_type) {
        (Some(DICT_LOGICAL_TYPE_EXTENSION), Some(id)) => {
            let (_, value) = dict_layout(field.data_type())?;
            let storage = from_arrow_field(value, registry)?;
            apply_logical(storage, id, registry)
        }
        (Some(LOGICAL_TYPE_EXTENSION), Some(id)) => {
            let storage = storage_from_arrow(field.data_type(), registry)?;
            apply_logical(storage, id, registry)
        }
        _ => storage_from_arrow(field.data_type(), registry),
    }
}

/// Key type and value field of a struct-dict-encoded column.
pub fn dict_layout(data_type: &DataType) -> Result<(DictKeyType, &Field)> {
    let DataType::Struct(fields) = data_type else {
        return Err(BridgeError::schema(format!(
            "dict-encoded column must be a struct, got {data_type}"
        )));
    };
    if fields.len() != 2 {
        return Err(BridgeError::schema(format!(
            "dict-encoded struct must have 2 children, got {}",
            fields.len()
        )));
    }
    let key = match fields[0].data_type() {
        DataType::UInt8 => DictKeyType::ByteKey,
        DataType::UInt32 => DictKeyType::IntKey,
        DataType::UInt64 => DictKeyType::LongKey,
        other => {
            return Err(BridgeError::schema(format!("unsupported dictionary key type {other}")));
        }
    };
    Ok((key, fields[1].as_ref()))
}

/// Whether arrays of type `actual` hold the storage of `expected`.
///
/// Child names, nullability and field metadata are ignored. Strings,
/// binaries and lists may use either offset width.
pub fn same_storage_layout(actual: &DataType, expected: &DataType) -> bool {
    match (actual, expected) {
        (DataType::Utf8 | DataType::LargeUtf8, DataType::Utf8 | DataType::LargeUtf8) => true,
        (DataType::Binary | DataType::LargeBinary, DataType::Binary | DataType::LargeBinary) => {
            true
        }
        (
            DataType::List(a) | DataType::LargeList(a),
            DataType::List(b) | DataType::LargeList(b),
        ) => same_storage_layout(a.data_type(), b.data_type()),
        (DataType::Struct(a), DataType::Struct(b)) => {
            a.len() == b.len()
                && a
                    .iter()
                    .zip(b.iter())
                    .all(|(a, b)| same_storage_layout(a.data_type(), b.data_type()))
        }
        _ => actual == expected,
    }
}

fn storage_from_arrow(data_type: &DataType, registry: &ExtensionRegistry) -> Result<KnimeType> {
    let ktype = match data_type {
        DataType::Int32 => KnimeType::primitive(PrimitiveId::Int),
        DataType::Int64 => KnimeType::primitive(PrimitiveId::Long),
        DataType::Float64 => KnimeType::primitive(PrimitiveId::Double),
        DataType::Utf8 | DataType::LargeUtf8 => KnimeType::primitive(PrimitiveId::String),
        DataType::Boolean => KnimeType::primitive(PrimitiveId::Bool),
        DataType::Binary | DataType::LargeBinary => KnimeType::primitive(PrimitiveId::Blob),
        DataType::List(item) | DataType::LargeList(item) => {
            KnimeType::list(from_arrow_field(item, registry)?)
        }
        DataType::Struct(fields) => KnimeType::struct_(
            fields
                .iter()
                .map(|f| from_arrow_field(f, registry))
                .collect::<Result<Vec<_>>>()?,
        )?,
        other => {
            return Err(BridgeError::schema(format!("no storage type for arrow type {other}")));
        }
    };
    Ok(ktype)
}

fn apply_logical(storage: KnimeType, id: &str, registry: &ExtensionRegistry) -> Result<KnimeType> {
    // Row keys are only stripped on column 0; keep the tag elsewhere.
    if id == ROW_KEY_LOGICAL_TYPE {
        return Ok(KnimeType::logical(id, storage)?);
    }
    if id == LIST_LOGICAL_TYPE || is_host_wrapper(id, &storage) {
        return Ok(storage);
    }
    match registry.by_identifier(id) {
        Some(converter) => {
            if converter.storage_type().storage_type() != storage.storage_type() {
                return Err(BridgeError::schema(format!(
                    "logical type {id} is registered with storage {} but the field stores {}",
                    converter.storage_type(),
                    storage
                )));
            }
            Ok(registry.logical_by_identifier(id)?)
        }
        None => {
            warn!(logical_type = id, "unregistered logical type, keeping it without converter");
            Ok(KnimeType::logical(id, storage)?)
        }
    }
}
