//! Schema -> wire export.

use std::collections::HashSet;

use tracing::debug;

use super::spec::{DataSpec, DataTraits, TraitMap, WireSchema, WireTypes};
use super::{LIST_LOGICAL_TYPE, ROW_KEY_LOGICAL_TYPE};
use crate::error::{Error, Result};
use crate::registry::{DictKeyType, ExtensionRegistry};
use crate::schema::Schema;
use crate::types::{KnimeType, LogicalType};

/// Export a schema to its wire form.
///
/// Fails if two column names are equal after trimming.
pub fn to_knime_dict(schema: &Schema, registry: &ExtensionRegistry) -> Result<WireSchema> {
    let mut seen = HashSet::with_capacity(schema.num_columns());
    for column in schema {
        if !seen.insert(column.name().trim()) {
            return Err(Error::serialization(format!(
                "duplicate column name '{}'",
                column.name().trim()
            )));
        }
    }

    let mut specs = Vec::with_capacity(schema.num_columns());
    let mut traits = Vec::with_capacity(schema.num_columns());
    for (i, column) in schema.iter().enumerate() {
        let ktype = column.ktype();
        specs.push(data_spec(ktype));
        let mut t = data_traits(ktype, registry);
        if i == 0 {
            tag_row_key(&mut t, ktype);
        }
        traits.push(t);
    }

    debug!(columns = schema.num_columns(), "exported wire schema");
    Ok(WireSchema {
        schema: WireTypes { specs, traits },
        column_names: schema.iter().map(|c| c.name().to_string()).collect(),
        column_meta_data: schema
            .iter()
            .map(|c| c.metadata().map(str::to_string))
            .collect(),
    })
}

/// Physical shape of a type.
pub(crate) fn data_spec(ktype: &KnimeType) -> DataSpec {
    match ktype {
        KnimeType::Primitive(p) => DataSpec::leaf(p.spec_tag()),
        KnimeType::List(inner) => DataSpec::list(data_spec(inner)),
        KnimeType::Struct(s) => DataSpec::struct_(s.inner_types().iter().map(data_spec).collect()),
        KnimeType::Logical(l) => data_spec(l.storage_type()),
    }
}

/// Traits tree of a type.
pub(crate) fn data_traits(ktype: &KnimeType, registry: &ExtensionRegistry) -> DataTraits {
    match ktype {
        KnimeType::Primitive(_) => DataTraits::Simple {
            traits: TraitMap::default(),
        },
        KnimeType::List(inner) => DataTraits::List {
            traits: if inner.is_logical() {
                TraitMap::logical(LIST_LOGICAL_TYPE)
            } else {
                TraitMap::default()
            },
            inner: Box::new(data_traits(inner, registry)),
        },
        KnimeType::Struct(s) => DataTraits::Struct {
            traits: TraitMap::default(),
            inner: s
                .inner_types()
                .iter()
                .map(|t| data_traits(t, registry))
                .collect(),
        },
        KnimeType::Logical(l) => {
            let mut t = data_traits(l.storage_type(), registry);
            let map = t.traits_mut();
            map.logical_type = Some(l.logical_type().to_string());
            map.dict_encoding = dict_encoding(l, registry);
            t
        }
    }
}

fn dict_encoding(logical: &LogicalType, registry: &ExtensionRegistry) -> Option<DictKeyType> {
    logical
        .converter()
        .or_else(|| registry.by_identifier(logical.logical_type()))
        .and_then(|c| c.dict_encoding())
}

fn tag_row_key(traits: &mut DataTraits, ktype: &KnimeType) {
    let map = traits.traits_mut();
    map.inner_logical_type = ktype.as_logical().map(|l| l.logical_type().to_string());
    map.logical_type = Some(ROW_KEY_LOGICAL_TYPE.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{int32, int64, list, string, struct_};
    use serde_json::json;

    #[test]
    fn test_row_key_and_leaf_tags() {
        let registry = ExtensionRegistry::new();
        let schema = Schema::from_types([int32(), string()], ["A", "B"]).unwrap();
        let wire = to_knime_dict(&schema, &registry).unwrap();
        let value = serde_json::to_value(&wire).unwrap();
        assert_eq!(
            value,
            json!({
                "schema": {
                    "specs": ["int32", "string"],
                    "traits": [
                        {"type": "simple", "traits": {"logical_type": ROW_KEY_LOGICAL_TYPE}},
                        {"type": "simple", "traits": {}}
                    ]
                },
                "columnNames": ["A", "B"],
                "columnMetaData": [null, null]
            })
        );
    }

    #[test]
    fn test_duplicate_names_fail() {
        let registry = ExtensionRegistry::new();
        let schema =
            Schema::from_types([int32(), int32(), int32()], ["k", "Ints", " Ints "]).unwrap();
        assert!(matches!(
            to_knime_dict(&schema, &registry),
            Err(Error::Serialization(_))
        ));
    }

    #[test]
    fn test_list_of_logical_gets_list_id() {
        let registry = ExtensionRegistry::new();
        let date = KnimeType::logical("date-id", int64()).unwrap();
        let t = data_traits(&list(date), &registry);
        let value = serde_json::to_value(&t).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "list",
                "traits": {"logical_type": LIST_LOGICAL_TYPE},
                "inner": {"type": "simple", "traits": {"logical_type": "date-id"}}
            })
        );
    }

    #[test]
    fn test_nested_spec() {
        let t = struct_([int64(), list(string())]).unwrap();
        let value = serde_json::to_value(data_spec(&t)).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "struct",
                "inner_types": ["int64", {"type": "list", "inner_type": "string"}]
            })
        );
    }

    #[test]
    fn test_logical_row_key_keeps_own_id() {
        let registry = ExtensionRegistry::new();
        let key = KnimeType::logical("custom-key", string()).unwrap();
        let schema = Schema::from_types([key], ["k"]).unwrap();
        let wire = to_knime_dict(&schema, &registry).unwrap();
        let traits = wire.schema.traits[0].traits();
        assert_eq!(traits.logical_type.as_deref(), Some(ROW_KEY_LOGICAL_TYPE));
        assert_eq!(traits.inner_logical_type.as_deref(), Some("custom-key"));
    }
}
