//! A named, typed column.

use std::fmt;

use crate::error::{Error, Result};
use crate::types::KnimeType;

/// Column of a [`Schema`](super::Schema): type, name and optional metadata.
///
/// Names must not be blank. Uniqueness is only checked when a schema is
/// exported to the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Column {
    ktype: KnimeType,
    name: String,
    metadata: Option<String>,
}

impl Column {
    pub fn new(ktype: KnimeType, name: impl Into<String>, metadata: Option<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::construction(format!(
                "column name must not be blank (type {ktype})"
            )));
        }
        Ok(Self {
            ktype,
            name,
            metadata,
        })
    }

    pub fn ktype(&self) -> &KnimeType {
        &self.ktype
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metadata(&self) -> Option<&str> {
        self.metadata.as_deref()
    }

    /// Copy of this column with a different name.
    pub fn with_name(&self, name: impl Into<String>) -> Result<Self> {
        Self::new(self.ktype.clone(), name, self.metadata.clone())
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Column<'{}', {}", self.name, self.ktype)?;
        if let Some(meta) = &self.metadata {
            write!(f, ", {meta}")?;
        }
        f.write_str(">")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{int32, list, string};

    #[test]
    fn test_blank_name_fails() {
        assert!(matches!(
            Column::new(int32(), "  ", None),
            Err(Error::Construction(_))
        ));
        assert!(Column::new(int32(), "", None).is_err());
    }

    #[test]
    fn test_display() {
        let c = Column::new(list(string()), "tags", None).unwrap();
        assert_eq!(c.to_string(), "Column<'tags', list<string>>");
        let c = Column::new(int32(), "n", Some("unit=s".into())).unwrap();
        assert_eq!(c.to_string(), "Column<'n', int32, unit=s>");
    }

    #[test]
    fn test_equality_includes_metadata() {
        let a = Column::new(int32(), "n", None).unwrap();
        let b = Column::new(int32(), "n", Some("m".into())).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, a.with_name("n").unwrap());
    }
}
