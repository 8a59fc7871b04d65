//! The recursive type algebra.
//!
//! A [`KnimeType`] is one of four shapes:
//!
//! - a primitive storage type (interned, see [`PrimitiveType`]),
//! - a list of exactly one inner type,
//! - a struct of one or more inner types,
//! - a logical type wrapping a storage type with an opaque identifier.
//!
//! # Example
//!
//! ```rust
//! use kntable_core::types::{int32, int64, list, string, struct_};
//!
//! let t = struct_([int64(), list(string())]).unwrap();
//! assert_eq!(t.to_string(), "struct<int64, list<string>>");
//! assert_eq!(int32(), int32());
//! ```

mod logical;
mod primitive;

use std::fmt;
use std::hash::{Hash, Hasher};

pub use logical::LogicalType;
pub use primitive::{PrimitiveId, PrimitiveType};

use crate::error::{Error, Result};

/// Value type of a table column.
#[derive(Debug, Clone)]
pub enum KnimeType {
    /// Interned primitive storage type
    Primitive(&'static PrimitiveType),

    /// Variable-length list of elements of the same type
    List(Box<KnimeType>),

    /// Fixed sequence of inner types
    Struct(StructType),

    /// Semantic tag over a storage type
    Logical(LogicalType),
}

/// Inner types of a struct; never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructType {
    inner: Vec<KnimeType>,
}

impl StructType {
    pub fn inner_types(&self) -> &[KnimeType] {
        &self.inner
    }

    pub fn arity(&self) -> usize {
        self.inner.len()
    }
}

impl KnimeType {
    /// Primitive type for a tag.
    pub fn primitive(id: PrimitiveId) -> Self {
        KnimeType::Primitive(id.get())
    }

    /// List type with the given element type.
    pub fn list(inner: KnimeType) -> Self {
        KnimeType::List(Box::new(inner))
    }

    /// Struct type; fails if `inner` is empty.
    pub fn struct_(inner: Vec<KnimeType>) -> Result<Self> {
        if inner.is_empty() {
            return Err(Error::construction("struct type needs at least one inner type"));
        }
        Ok(KnimeType::Struct(StructType { inner }))
    }

    /// Logical type without a converter.
    ///
    /// Use [`crate::registry::ExtensionRegistry::logical_for`] to obtain a
    /// logical type with its registered converter attached.
    pub fn logical(logical_type: &str, storage: KnimeType) -> Result<Self> {
        Ok(KnimeType::Logical(LogicalType::new(
            logical_type,
            storage,
            None,
        )?))
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, KnimeType::Primitive(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self, KnimeType::List(_))
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, KnimeType::Struct(_))
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, KnimeType::Logical(_))
    }

    /// The interned primitive, if this is a primitive type.
    pub fn as_primitive(&self) -> Option<&'static PrimitiveType> {
        match self {
            KnimeType::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    /// The logical wrapper, if this is a logical type.
    pub fn as_logical(&self) -> Option<&LogicalType> {
        match self {
            KnimeType::Logical(l) => Some(l),
            _ => None,
        }
    }

    /// Get the inner type for List, or None if not a List.
    pub fn list_inner(&self) -> Option<&KnimeType> {
        match self {
            KnimeType::List(inner) => Some(inner),
            _ => None,
        }
    }

    /// Get the inner types for Struct, or None if not a Struct.
    pub fn struct_inner(&self) -> Option<&[KnimeType]> {
        match self {
            KnimeType::Struct(s) => Some(s.inner_types()),
            _ => None,
        }
    }

    /// Purely physical shape: every logical wrapper is replaced by its
    /// storage type, recursively.
    pub fn storage_type(&self) -> KnimeType {
        match self {
            KnimeType::Primitive(_) => self.clone(),
            KnimeType::List(inner) => KnimeType::list(inner.storage_type()),
            KnimeType::Struct(s) => KnimeType::Struct(StructType {
                inner: s.inner.iter().map(KnimeType::storage_type).collect(),
            }),
            KnimeType::Logical(l) => l.storage_type().storage_type(),
        }
    }

    /// Whether a logical type occurs anywhere in this type.
    pub fn contains_logical(&self) -> bool {
        match self {
            KnimeType::Primitive(_) => false,
            KnimeType::List(inner) => inner.contains_logical(),
            KnimeType::Struct(s) => s.inner.iter().any(KnimeType::contains_logical),
            KnimeType::Logical(_) => true,
        }
    }

    /// Nesting depth; primitives have depth 1.
    pub fn depth(&self) -> usize {
        match self {
            KnimeType::Primitive(_) => 1,
            KnimeType::List(inner) => 1 + inner.depth(),
            KnimeType::Struct(s) => 1 + s.inner.iter().map(KnimeType::depth).max().unwrap_or(0),
            KnimeType::Logical(l) => 1 + l.storage_type().depth(),
        }
    }
}

impl PartialEq for KnimeType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (KnimeType::Primitive(a), KnimeType::Primitive(b)) => std::ptr::eq(*a, *b),
            (KnimeType::List(a), KnimeType::List(b)) => a == b,
            (KnimeType::Struct(a), KnimeType::Struct(b)) => a == b,
            (KnimeType::Logical(a), KnimeType::Logical(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for KnimeType {}

impl Hash for KnimeType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            KnimeType::Primitive(p) => p.id().hash(state),
            KnimeType::List(inner) => inner.hash(state),
            KnimeType::Struct(s) => s.hash(state),
            KnimeType::Logical(l) => l.hash(state),
        }
    }
}

impl fmt::Display for KnimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KnimeType::Primitive(p) => write!(f, "{p}"),
            KnimeType::List(inner) => write!(f, "list<{inner}>"),
            KnimeType::Struct(s) => {
                f.write_str("struct<")?;
                for (i, t) in s.inner.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{t}")?;
                }
                f.write_str(">")
            }
            KnimeType::Logical(l) => write!(f, "{l}"),
        }
    }
}

/// 32-bit integer type.
pub fn int32() -> KnimeType {
    KnimeType::primitive(PrimitiveId::Int)
}

/// 64-bit integer type.
pub fn int64() -> KnimeType {
    KnimeType::primitive(PrimitiveId::Long)
}

/// 64-bit floating point type.
pub fn double() -> KnimeType {
    KnimeType::primitive(PrimitiveId::Double)
}

/// UTF-8 string type.
pub fn string() -> KnimeType {
    KnimeType::primitive(PrimitiveId::String)
}

/// Boolean type.
pub fn bool_() -> KnimeType {
    KnimeType::primitive(PrimitiveId::Bool)
}

/// Variable-width binary type.
pub fn blob() -> KnimeType {
    KnimeType::primitive(PrimitiveId::Blob)
}

/// List type.
pub fn list(inner: KnimeType) -> KnimeType {
    KnimeType::list(inner)
}

/// Struct type; fails for an empty sequence.
pub fn struct_(inner: impl IntoIterator<Item = KnimeType>) -> Result<KnimeType> {
    KnimeType::struct_(inner.into_iter().collect())
}
