//! Interned primitive storage types.

use std::fmt;

/// Tag of a primitive storage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveId {
    /// 32-bit signed integer
    Int,
    /// 64-bit signed integer
    Long,
    /// 64-bit floating point
    Double,
    /// UTF-8 string
    String,
    /// Boolean (true/false)
    Bool,
    /// Variable-length binary data
    Blob,
}

/// A primitive storage type.
///
/// There is exactly one instance per [`PrimitiveId`] for the lifetime of the
/// process. Constructors in [`crate::types`] hand out references to these
/// statics, so two `int32()` calls yield pointer-equal values.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct PrimitiveType {
    id: PrimitiveId,
    name: &'static str,
    spec: &'static str,
}

static INT: PrimitiveType = PrimitiveType {
    id: PrimitiveId::Int,
    name: "int32",
    spec: "int32",
};

static LONG: PrimitiveType = PrimitiveType {
    id: PrimitiveId::Long,
    name: "int64",
    spec: "int64",
};

static DOUBLE: PrimitiveType = PrimitiveType {
    id: PrimitiveId::Double,
    name: "double",
    spec: "double",
};

static STRING: PrimitiveType = PrimitiveType {
    id: PrimitiveId::String,
    name: "string",
    spec: "string",
};

static BOOL: PrimitiveType = PrimitiveType {
    id: PrimitiveId::Bool,
    name: "bool",
    spec: "boolean",
};

static BLOB: PrimitiveType = PrimitiveType {
    id: PrimitiveId::Blob,
    name: "blob",
    spec: "variable_width_binary",
};

impl PrimitiveId {
    /// All primitive tags, in declaration order.
    pub const ALL: [PrimitiveId; 6] = [
        PrimitiveId::Int,
        PrimitiveId::Long,
        PrimitiveId::Double,
        PrimitiveId::String,
        PrimitiveId::Bool,
        PrimitiveId::Blob,
    ];

    /// The interned type instance for this tag.
    pub fn get(self) -> &'static PrimitiveType {
        match self {
            PrimitiveId::Int => &INT,
            PrimitiveId::Long => &LONG,
            PrimitiveId::Double => &DOUBLE,
            PrimitiveId::String => &STRING,
            PrimitiveId::Bool => &BOOL,
            PrimitiveId::Blob => &BLOB,
        }
    }

    /// Resolve a wire leaf tag. Accepts the host aliases `int` and `long`.
    pub fn from_spec(tag: &str) -> Option<Self> {
        match tag {
            "int32" | "int" => Some(PrimitiveId::Int),
            "int64" | "long" => Some(PrimitiveId::Long),
            "double" => Some(PrimitiveId::Double),
            "string" => Some(PrimitiveId::String),
            "boolean" => Some(PrimitiveId::Bool),
            "variable_width_binary" => Some(PrimitiveId::Blob),
            _ => None,
        }
    }
}

impl PrimitiveType {
    /// Tag of this primitive.
    pub fn id(&self) -> PrimitiveId {
        self.id
    }

    /// Human-readable type name for display.
    pub fn type_name(&self) -> &'static str {
        self.name
    }

    /// Leaf tag used in wire specs.
    pub fn spec_tag(&self) -> &'static str {
        self.spec
    }

    /// Size in bytes for fixed-width types, None for variable-width.
    pub fn fixed_size(&self) -> Option<usize> {
        match self.id {
            PrimitiveId::Int => Some(4),
            PrimitiveId::Long | PrimitiveId::Double => Some(8),
            PrimitiveId::Bool => Some(1),
            PrimitiveId::String | PrimitiveId::Blob => None,
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
