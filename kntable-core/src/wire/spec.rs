//! Typed serde model of the wire schema.
//!
//! ```json
//! {
//!   "schema": {
//!     "specs": ["string", {"type": "list", "inner_type": "int64"}],
//!     "traits": [
//!       {"type": "simple", "traits": {"logical_type": "..."}},
//!       {"type": "list", "traits": {}, "inner": {"type": "simple", "traits": {}}}
//!     ]
//!   },
//!   "columnNames": ["<RowID>", "values"],
//!   "columnMetaData": [null, null]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::registry::DictKeyType;

/// Complete wire representation of a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireSchema {
    pub schema: WireTypes,
    #[serde(rename = "columnNames")]
    pub column_names: Vec<String>,
    #[serde(rename = "columnMetaData")]
    pub column_meta_data: Vec<Option<String>>,
}

/// Parallel physical shapes and traits, one entry per column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireTypes {
    pub specs: Vec<DataSpec>,
    pub traits: Vec<DataTraits>,
}

/// Physical shape of a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataSpec {
    /// Primitive leaf tag such as `int64` or `variable_width_binary`
    Leaf(String),
    Nested(NestedSpec),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NestedSpec {
    List { inner_type: Box<DataSpec> },
    Struct { inner_types: Vec<DataSpec> },
}

impl DataSpec {
    pub fn leaf(tag: &str) -> Self {
        DataSpec::Leaf(tag.to_string())
    }

    pub fn list(inner: DataSpec) -> Self {
        DataSpec::Nested(NestedSpec::List {
            inner_type: Box::new(inner),
        })
    }

    pub fn struct_(inner: Vec<DataSpec>) -> Self {
        DataSpec::Nested(NestedSpec::Struct { inner_types: inner })
    }
}

/// Traits tree mirroring a [`DataSpec`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DataTraits {
    Simple {
        #[serde(default)]
        traits: TraitMap,
    },
    List {
        #[serde(default)]
        traits: TraitMap,
        inner: Box<DataTraits>,
    },
    Struct {
        #[serde(default)]
        traits: TraitMap,
        #[serde(alias = "inner_types")]
        inner: Vec<DataTraits>,
    },
}

impl DataTraits {
    pub fn traits(&self) -> &TraitMap {
        match self {
            DataTraits::Simple { traits }
            | DataTraits::List { traits, .. }
            | DataTraits::Struct { traits, .. } => traits,
        }
    }

    pub fn traits_mut(&mut self) -> &mut TraitMap {
        match self {
            DataTraits::Simple { traits }
            | DataTraits::List { traits, .. }
            | DataTraits::Struct { traits, .. } => traits,
        }
    }

    /// Node kind as written in the `type` field.
    pub fn kind(&self) -> &'static str {
        match self {
            DataTraits::Simple { .. } => "simple",
            DataTraits::List { .. } => "list",
            DataTraits::Struct { .. } => "struct",
        }
    }
}

/// Per-node traits. Unknown keys are ignored on import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraitMap {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner_logical_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dict_encoding: Option<DictKeyType>,
}

impl TraitMap {
    pub fn logical(logical_type: &str) -> Self {
        Self {
            logical_type: Some(logical_type.to_string()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.logical_type.is_none()
            && self.inner_logical_type.is_none()
            && self.dict_encoding.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_spec_shapes() {
        let spec: DataSpec = serde_json::from_value(json!({
            "type": "struct",
            "inner_types": ["int64", {"type": "list", "inner_type": "string"}]
        }))
        .unwrap();
        assert_eq!(
            spec,
            DataSpec::struct_(vec![
                DataSpec::leaf("int64"),
                DataSpec::list(DataSpec::leaf("string"))
            ])
        );
    }

    #[test]
    fn test_traits_serialize_empty_map() {
        let t = DataTraits::Simple {
            traits: TraitMap::default(),
        };
        assert_eq!(
            serde_json::to_value(&t).unwrap(),
            json!({"type": "simple", "traits": {}})
        );
    }

    #[test]
    fn test_struct_traits_accept_inner_types_alias() {
        let t: DataTraits = serde_json::from_value(json!({
            "type": "struct",
            "traits": {},
            "inner_types": [{"type": "simple", "traits": {}}]
        }))
        .unwrap();
        match t {
            DataTraits::Struct { inner, .. } => assert_eq!(inner.len(), 1),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_dict_encoding_trait() {
        let t: DataTraits = serde_json::from_value(json!({
            "type": "simple",
            "traits": {"logical_type": "x", "dict_encoding": "INT_KEY", "other": 1}
        }))
        .unwrap();
        assert_eq!(t.traits().dict_encoding, Some(DictKeyType::IntKey));
        assert_eq!(t.traits().logical_type.as_deref(), Some("x"));
    }

    #[test]
    fn test_unknown_trait_type_fails() {
        let r: Result<DataTraits, _> =
            serde_json::from_value(json!({"type": "map", "traits": {}}));
        assert!(r.is_err());
    }
}
