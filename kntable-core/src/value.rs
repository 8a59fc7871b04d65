//! Dynamically typed storage values.
//!
//! [`StorageValue`] is the representation converters encode logical values
//! into and decode them from. Its shape mirrors the physical type algebra:
//! one variant per primitive plus `List` and `Struct`, and `Null` for
//! missing values at any nesting level.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::types::{KnimeType, PrimitiveId};

/// A value in storage representation.
#[derive(Debug, Clone)]
pub enum StorageValue {
    Null,
    Int(i32),
    Long(i64),
    Double(f64),
    Bool(bool),
    String(String),
    Blob(Vec<u8>),
    List(Vec<StorageValue>),
    Struct(Vec<StorageValue>),
}

impl StorageValue {
    pub fn is_null(&self) -> bool {
        matches!(self, StorageValue::Null)
    }

    /// Variant name, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            StorageValue::Null => "null",
            StorageValue::Int(_) => "int32",
            StorageValue::Long(_) => "int64",
            StorageValue::Double(_) => "double",
            StorageValue::Bool(_) => "bool",
            StorageValue::String(_) => "string",
            StorageValue::Blob(_) => "blob",
            StorageValue::List(_) => "list",
            StorageValue::Struct(_) => "struct",
        }
    }

    /// Whether this value can be stored in a column of type `ktype`.
    ///
    /// Nulls conform to every type; logical types are checked against their
    /// storage type.
    pub fn conforms_to(&self, ktype: &KnimeType) -> bool {
        match (self, ktype) {
            (StorageValue::Null, _) => true,
            (_, KnimeType::Logical(l)) => self.conforms_to(l.storage_type()),
            (StorageValue::Int(_), KnimeType::Primitive(p)) => p.id() == PrimitiveId::Int,
            (StorageValue::Long(_), KnimeType::Primitive(p)) => p.id() == PrimitiveId::Long,
            (StorageValue::Double(_), KnimeType::Primitive(p)) => p.id() == PrimitiveId::Double,
            (StorageValue::Bool(_), KnimeType::Primitive(p)) => p.id() == PrimitiveId::Bool,
            (StorageValue::String(_), KnimeType::Primitive(p)) => p.id() == PrimitiveId::String,
            (StorageValue::Blob(_), KnimeType::Primitive(p)) => p.id() == PrimitiveId::Blob,
            (StorageValue::List(items), KnimeType::List(inner)) => {
                items.iter().all(|v| v.conforms_to(inner))
            }
            (StorageValue::Struct(fields), KnimeType::Struct(s)) => {
                fields.len() == s.arity()
                    && fields
                        .iter()
                        .zip(s.inner_types())
                        .all(|(v, t)| v.conforms_to(t))
            }
            _ => false,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            StorageValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            StorageValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            StorageValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            StorageValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StorageValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            StorageValue::Blob(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[StorageValue]> {
        match self {
            StorageValue::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&[StorageValue]> {
        match self {
            StorageValue::Struct(v) => Some(v),
            _ => None,
        }
    }
}

// Doubles compare by bit pattern so values can be used as dictionary keys.
impl PartialEq for StorageValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (StorageValue::Null, StorageValue::Null) => true,
            (StorageValue::Int(a), StorageValue::Int(b)) => a == b,
            (StorageValue::Long(a), StorageValue::Long(b)) => a == b,
            (StorageValue::Double(a), StorageValue::Double(b)) => a.to_bits() == b.to_bits(),
            (StorageValue::Bool(a), StorageValue::Bool(b)) => a == b,
            (StorageValue::String(a), StorageValue::String(b)) => a == b,
            (StorageValue::Blob(a), StorageValue::Blob(b)) => a == b,
            (StorageValue::List(a), StorageValue::List(b)) => a == b,
            (StorageValue::Struct(a), StorageValue::Struct(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for StorageValue {}

impl Hash for StorageValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            StorageValue::Null => {}
            StorageValue::Int(v) => v.hash(state),
            StorageValue::Long(v) => v.hash(state),
            StorageValue::Double(v) => v.to_bits().hash(state),
            StorageValue::Bool(v) => v.hash(state),
            StorageValue::String(v) => v.hash(state),
            StorageValue::Blob(v) => v.hash(state),
            StorageValue::List(v) | StorageValue::Struct(v) => v.hash(state),
        }
    }
}

impl fmt::Display for StorageValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageValue::Null => f.write_str("null"),
            StorageValue::Int(v) => write!(f, "{v}"),
            StorageValue::Long(v) => write!(f, "{v}"),
            StorageValue::Double(v) => write!(f, "{v}"),
            StorageValue::Bool(v) => write!(f, "{v}"),
            StorageValue::String(v) => write!(f, "{v:?}"),
            StorageValue::Blob(v) => write!(f, "<{} bytes>", v.len()),
            StorageValue::List(items) | StorageValue::Struct(items) => {
                let (open, close) = if matches!(self, StorageValue::List(_)) {
                    ('[', ']')
                } else {
                    ('{', '}')
                };
                write!(f, "{open}")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "{close}")
            }
        }
    }
}

impl From<i32> for StorageValue {
    fn from(v: i32) -> Self {
        StorageValue::Int(v)
    }
}

impl From<i64> for StorageValue {
    fn from(v: i64) -> Self {
        StorageValue::Long(v)
    }
}

impl From<f64> for StorageValue {
    fn from(v: f64) -> Self {
        StorageValue::Double(v)
    }
}

impl From<bool> for StorageValue {
    fn from(v: bool) -> Self {
        StorageValue::Bool(v)
    }
}

impl From<&str> for StorageValue {
    fn from(v: &str) -> Self {
        StorageValue::String(v.to_string())
    }
}

impl From<String> for StorageValue {
    fn from(v: String) -> Self {
        StorageValue::String(v)
    }
}

impl From<Vec<u8>> for StorageValue {
    fn from(v: Vec<u8>) -> Self {
        StorageValue::Blob(v)
    }
}

impl<T: Into<StorageValue>> From<Option<T>> for StorageValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(StorageValue::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{int32, int64, list, string, struct_};
    use std::collections::HashSet;

    #[test]
    fn test_conforms_to_primitives() {
        assert!(StorageValue::Int(1).conforms_to(&int32()));
        assert!(!StorageValue::Int(1).conforms_to(&int64()));
        assert!(StorageValue::Null.conforms_to(&string()));
    }

    #[test]
    fn test_conforms_to_nested() {
        let t = struct_([int64(), list(string())]).unwrap();
        let ok = StorageValue::Struct(vec![
            StorageValue::Long(3),
            StorageValue::List(vec!["a".into(), StorageValue::Null]),
        ]);
        let wrong_arity = StorageValue::Struct(vec![StorageValue::Long(3)]);
        assert!(ok.conforms_to(&t));
        assert!(!wrong_arity.conforms_to(&t));
    }

    #[test]
    fn test_conforms_to_logical_checks_storage() {
        let date = crate::types::KnimeType::logical("date", int64()).unwrap();
        assert!(StorageValue::Long(19000).conforms_to(&date));
        assert!(!StorageValue::Int(19000).conforms_to(&date));
    }

    #[test]
    fn test_hash_eq_for_dedup() {
        let mut set = HashSet::new();
        set.insert(StorageValue::Double(1.5));
        set.insert(StorageValue::Double(1.5));
        set.insert(StorageValue::Double(f64::NAN));
        set.insert(StorageValue::Double(f64::NAN));
        set.insert(StorageValue::String("x".into()));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_display() {
        let v = StorageValue::Struct(vec![1i64.into(), "a".into(), StorageValue::Null]);
        assert_eq!(v.to_string(), "{1, \"a\", null}");
        assert_eq!(StorageValue::Blob(vec![0; 4]).to_string(), "<4 bytes>");
    }
}
