//! Table schemas: ordered sequences of named, typed columns.
//!
//! ```rust
//! use kntable_core::schema::Schema;
//! use kntable_core::types::{int32, string};
//!
//! let schema = Schema::from_types([int32(), string()], ["A", "B"]).unwrap();
//! assert_eq!(schema.column(-1).unwrap().name(), "B");
//! assert_eq!(schema.select(["B", "A"]).unwrap().column_names(), ["B", "A"]);
//! ```
//!
//! All structural operations return a new schema except [`Schema::remove`],
//! which mutates in place.

mod column;

use std::fmt;
use std::ops::{Bound, Index, RangeBounds};

pub use column::Column;

use crate::error::{Error, Result};
use crate::types::KnimeType;

/// Reference to a column by position or by name.
///
/// Negative positions count from the end. A name refers to the first column
/// with that name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRef<'a> {
    Index(isize),
    Name(&'a str),
}

impl From<isize> for ColumnRef<'_> {
    fn from(i: isize) -> Self {
        ColumnRef::Index(i)
    }
}

impl From<i32> for ColumnRef<'_> {
    fn from(i: i32) -> Self {
        ColumnRef::Index(i as isize)
    }
}

impl From<usize> for ColumnRef<'_> {
    fn from(i: usize) -> Self {
        ColumnRef::Index(isize::try_from(i).unwrap_or(isize::MAX))
    }
}

impl<'a> From<&'a str> for ColumnRef<'a> {
    fn from(name: &'a str) -> Self {
        ColumnRef::Name(name)
    }
}

impl<'a> From<&'a String> for ColumnRef<'a> {
    fn from(name: &'a String) -> Self {
        ColumnRef::Name(name)
    }
}

/// What to remove from a schema: the first column with a name, or the first
/// column structurally equal to a given one.
#[derive(Debug, Clone, Copy)]
pub enum RemoveKey<'a> {
    Name(&'a str),
    Column(&'a Column),
}

impl<'a> From<&'a str> for RemoveKey<'a> {
    fn from(name: &'a str) -> Self {
        RemoveKey::Name(name)
    }
}

impl<'a> From<&'a Column> for RemoveKey<'a> {
    fn from(column: &'a Column) -> Self {
        RemoveKey::Column(column)
    }
}

/// Ordered sequence of columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_columns(columns: impl IntoIterator<Item = Column>) -> Self {
        Self {
            columns: columns.into_iter().collect(),
        }
    }

    /// Schema from parallel type and name sequences.
    pub fn from_types<N: Into<String>>(
        types: impl IntoIterator<Item = KnimeType>,
        names: impl IntoIterator<Item = N>,
    ) -> Result<Self> {
        Self::build(types, names, None)
    }

    /// Schema from parallel type, name and metadata sequences.
    pub fn from_types_with_metadata<N: Into<String>>(
        types: impl IntoIterator<Item = KnimeType>,
        names: impl IntoIterator<Item = N>,
        metadata: impl IntoIterator<Item = Option<String>>,
    ) -> Result<Self> {
        Self::build(types, names, Some(metadata.into_iter().collect()))
    }

    fn build<N: Into<String>>(
        types: impl IntoIterator<Item = KnimeType>,
        names: impl IntoIterator<Item = N>,
        metadata: Option<Vec<Option<String>>>,
    ) -> Result<Self> {
        let types: Vec<KnimeType> = types.into_iter().collect();
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if types.len() != names.len() {
            return Err(Error::construction(format!(
                "got {} types but {} names",
                types.len(),
                names.len()
            )));
        }
        let metadata = match metadata {
            Some(m) if m.len() != types.len() => {
                return Err(Error::construction(format!(
                    "got {} types but {} metadata entries",
                    types.len(),
                    m.len()
                )));
            }
            Some(m) => m,
            None => vec![None; types.len()],
        };

        let columns = types
            .into_iter()
            .zip(names)
            .zip(metadata)
            .map(|((t, n), m)| Column::new(t, n, m))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { columns })
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Column> {
        self.columns.iter()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn types(&self) -> impl Iterator<Item = &KnimeType> {
        self.columns.iter().map(Column::ktype)
    }

    /// Column at `index`; negative indices count from the end.
    pub fn column(&self, index: isize) -> Result<&Column> {
        let len = self.columns.len() as isize;
        let pos = if index < 0 { index + len } else { index };
        if pos < 0 || pos >= len {
            return Err(Error::lookup(format!(
                "column index {index} out of range for {len} columns"
            )));
        }
        Ok(&self.columns[pos as usize])
    }

    /// First column named `name`.
    pub fn column_by_name(&self, name: &str) -> Result<&Column> {
        self.position(name)
            .map(|i| &self.columns[i])
            .ok_or_else(|| Error::lookup(format!("no column named '{name}'")))
    }

    /// Position of the first column named `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    /// Position of the referenced column.
    pub fn index_of<'a>(&self, key: impl Into<ColumnRef<'a>>) -> Result<usize> {
        match key.into() {
            ColumnRef::Index(i) => {
                self.column(i)?;
                let len = self.columns.len() as isize;
                Ok(if i < 0 { i + len } else { i } as usize)
            }
            ColumnRef::Name(n) => self
                .position(n)
                .ok_or_else(|| Error::lookup(format!("no column named '{n}'"))),
        }
    }

    pub fn get<'a>(&self, key: impl Into<ColumnRef<'a>>) -> Result<&Column> {
        match key.into() {
            ColumnRef::Index(i) => self.column(i),
            ColumnRef::Name(n) => self.column_by_name(n),
        }
    }

    /// New schema with the referenced columns, in the requested order.
    pub fn select<'a, R: Into<ColumnRef<'a>>>(
        &self,
        keys: impl IntoIterator<Item = R>,
    ) -> Result<Schema> {
        let columns = keys
            .into_iter()
            .map(|k| self.get(k).cloned())
            .collect::<Result<Vec<_>>>()?;
        Ok(Schema { columns })
    }

    /// New schema with a contiguous range of columns. Bounds past the end
    /// are clamped.
    pub fn slice(&self, range: impl RangeBounds<usize>) -> Schema {
        let len = self.columns.len();
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s.saturating_add(1),
            Bound::Unbounded => 0,
        }
        .min(len);
        let end = match range.end_bound() {
            Bound::Included(&e) => e.saturating_add(1),
            Bound::Excluded(&e) => e,
            Bound::Unbounded => len,
        }
        .min(len);
        Schema {
            columns: self.columns[start..end.max(start)].to_vec(),
        }
    }

    /// Concatenation of `self` and `other`.
    pub fn append(&self, other: &Schema) -> Schema {
        let mut columns = Vec::with_capacity(self.columns.len() + other.columns.len());
        columns.extend_from_slice(&self.columns);
        columns.extend_from_slice(&other.columns);
        Schema { columns }
    }

    /// New schema with all columns of `other` inserted before position `at`.
    pub fn insert(&self, other: &Schema, at: usize) -> Result<Schema> {
        if at > self.columns.len() {
            return Err(Error::lookup(format!(
                "insert position {at} out of range for {} columns",
                self.columns.len()
            )));
        }
        let mut columns = Vec::with_capacity(self.columns.len() + other.columns.len());
        columns.extend_from_slice(&self.columns[..at]);
        columns.extend_from_slice(&other.columns);
        columns.extend_from_slice(&self.columns[at..]);
        Ok(Schema { columns })
    }

    /// Remove the first matching column in place and return it.
    pub fn remove<'a>(&mut self, key: impl Into<RemoveKey<'a>>) -> Result<Column> {
        let pos = match key.into() {
            RemoveKey::Name(name) => self
                .position(name)
                .ok_or_else(|| Error::lookup(format!("no column named '{name}'")))?,
            RemoveKey::Column(column) => self
                .columns
                .iter()
                .position(|c| c == column)
                .ok_or_else(|| Error::lookup(format!("{column} is not in the schema")))?,
        };
        Ok(self.columns.remove(pos))
    }
}

impl Index<usize> for Schema {
    type Output = Column;

    fn index(&self, index: usize) -> &Column {
        &self.columns[index]
    }
}

impl<'a> IntoIterator for &'a Schema {
    type Item = &'a Column;
    type IntoIter = std::slice::Iter<'a, Column>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}

impl FromIterator<Column> for Schema {
    fn from_iter<I: IntoIterator<Item = Column>>(iter: I) -> Self {
        Self::from_columns(iter)
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Schema<\n")?;
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                f.write_str(",\n")?;
            }
            write!(f, "\t{column}")?;
        }
        f.write_str(">")
    }
}
