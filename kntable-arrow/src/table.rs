//! Tables of Arrow record batches with a logical schema.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use kntable_core::registry::ExtensionRegistry;
use kntable_core::schema::{ColumnRef, Schema};
use kntable_core::{Error as CoreError, StorageValue};
use tracing::debug;

use crate::arrow_schema::{
    from_arrow_schema, to_arrow_schema, DICT_LOGICAL_TYPE_EXTENSION, EXTENSION_NAME_KEY,
};
use crate::dict::DictChunk;
use crate::error::{BridgeError, Result};
use crate::sentinel::{insert_sentinels, sentinels_to_missing, Sentinel};
use crate::storage::storage_value_at;
use crate::view::LogicalColumn;

/// Rows per batch when none is given.
pub const DEFAULT_CHUNK_SIZE: usize = 1 << 16;

/// How tables are written and read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeOptions {
    /// Rows per chunk for builders; recorded in the Arrow schema.
    pub chunk_size: usize,
    /// Integer sentinel policy; `None` keeps missing integers as nulls.
    pub sentinel: Option<Sentinel>,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            sentinel: None,
        }
    }
}

impl BridgeOptions {
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_sentinel(mut self, sentinel: Sentinel) -> Self {
        self.sentinel = Some(sentinel);
        self
    }
}

/// Record batches together with the logical schema they store.
///
/// Column 0 holds the row keys.
#[derive(Debug, Clone)]
pub struct KnimeTable {
    schema: Schema,
    arrow_schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

impl KnimeTable {
    /// Assemble a table from per-column chunks.
    ///
    /// Every column must be cut into chunks of the same lengths; chunk `i`
    /// of every column forms batch `i`. With a sentinel policy, missing
    /// integers are replaced by the sentinel.
    pub fn from_columns(
        schema: Schema,
        columns: Vec<Vec<ArrayRef>>,
        registry: &ExtensionRegistry,
        options: &BridgeOptions,
    ) -> Result<Self> {
        if columns.len() != schema.num_columns() {
            return Err(BridgeError::conversion(format!(
                "schema has {} columns but {} were given",
                schema.num_columns(),
                columns.len()
            )));
        }
        let arrow_schema = Arc::new(to_arrow_schema(&schema, registry, options.chunk_size));
        let num_batches = columns.first().map_or(0, Vec::len);
        if let Some((i, c)) = columns.iter().enumerate().find(|(_, c)| c.len() != num_batches) {
            return Err(BridgeError::conversion(format!(
                "column {i} has {} chunks, expected {num_batches}",
                c.len()
            )));
        }

        let mut batches = Vec::with_capacity(num_batches);
        for b in 0..num_batches {
            let arrays: Vec<ArrayRef> = columns.iter().map(|c| Arc::clone(&c[b])).collect();
            let batch = RecordBatch::try_new(Arc::clone(&arrow_schema), arrays)?;
            batches.push(match options.sentinel {
                Some(sentinel) => insert_sentinels(&batch, sentinel)?,
                None => batch,
            });
        }
        debug!(
            columns = schema.num_columns(),
            batches = batches.len(),
            "assembled table"
        );
        Ok(Self {
            schema,
            arrow_schema,
            batches,
        })
    }

    /// Wrap batches read from Arrow, recovering the logical schema from the
    /// field metadata. With a sentinel policy, sentinels become nulls again.
    pub fn from_batches(
        arrow_schema: SchemaRef,
        batches: Vec<RecordBatch>,
        registry: &ExtensionRegistry,
        options: &BridgeOptions,
    ) -> Result<Self> {
        let schema = from_arrow_schema(&arrow_schema, registry)?;
        let batches = batches
            .into_iter()
            .map(|batch| {
                if batch.num_columns() != schema.num_columns() {
                    return Err(BridgeError::schema(format!(
                        "batch has {} columns but the schema has {}",
                        batch.num_columns(),
                        schema.num_columns()
                    )));
                }
                match options.sentinel {
                    Some(sentinel) => sentinels_to_missing(&batch, sentinel),
                    None => Ok(batch),
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            schema,
            arrow_schema,
            batches,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn arrow_schema(&self) -> &SchemaRef {
        &self.arrow_schema
    }

    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    pub fn num_batches(&self) -> usize {
        self.batches.len()
    }

    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }

    /// The chunks of one column, one per batch.
    pub fn column_chunks<'a>(&self, key: impl Into<ColumnRef<'a>>) -> Result<Vec<ArrayRef>> {
        let index = self.schema.index_of(key)?;
        Ok(self
            .batches
            .iter()
            .map(|b| Arc::clone(b.column(index)))
            .collect())
    }

    /// Typed view of a logical column.
    pub fn logical_column<'a, T: 'static>(
        &self,
        key: impl Into<ColumnRef<'a>>,
    ) -> Result<LogicalColumn<T>> {
        let index = self.schema.index_of(key)?;
        LogicalColumn::try_new(self.schema[index].ktype(), self.column_chunks(index)?)
    }

    /// Storage values of one column, dict-encoded columns expanded.
    pub fn storage_values<'a>(&self, key: impl Into<ColumnRef<'a>>) -> Result<Vec<StorageValue>> {
        let index = self.schema.index_of(key)?;
        let dict_encoded = self
            .arrow_schema
            .field(index)
            .metadata()
            .get(EXTENSION_NAME_KEY)
            .is_some_and(|name| name == DICT_LOGICAL_TYPE_EXTENSION);

        let mut values = Vec::with_capacity(self.num_rows());
        for batch in &self.batches {
            let array = batch.column(index);
            if dict_encoded {
                let chunk = DictChunk::new(array.as_ref())?;
                for row in 0..chunk.len() {
                    values.push(chunk.storage_value(row)?);
                }
            } else {
                for row in 0..array.len() {
                    values.push(storage_value_at(array.as_ref(), row)?);
                }
            }
        }
        Ok(values)
    }

    /// Row keys from column 0.
    pub fn row_keys(&self) -> Result<Vec<StorageValue>> {
        if self.schema.is_empty() {
            return Err(CoreError::lookup("table has no row key column").into());
        }
        self.storage_values(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::AsArray;
    use arrow::datatypes::Int32Type;
    use kntable_core::types::{int32, string};

    use crate::storage::build_storage_array;

    fn sample(options: &BridgeOptions) -> KnimeTable {
        let registry = ExtensionRegistry::new();
        let schema = Schema::from_types([string(), int32()], ["<RowID>", "n"]).unwrap();
        let keys = |k: &[&str]| {
            let values: Vec<StorageValue> = k.iter().map(|s| StorageValue::from(*s)).collect();
            build_storage_array(&string(), &values).unwrap()
        };
        let ints = |v: &[Option<i32>]| {
            let values: Vec<StorageValue> = v.iter().map(|i| StorageValue::from(*i)).collect();
            build_storage_array(&int32(), &values).unwrap()
        };
        KnimeTable::from_columns(
            schema,
            vec![
                vec![keys(&["r0", "r1"]), keys(&["r2"])],
                vec![ints(&[Some(1), None]), ints(&[Some(3)])],
            ],
            &registry,
            options,
        )
        .unwrap()
    }

    #[test]
    fn test_from_columns() {
        let table = sample(&BridgeOptions::default());
        assert_eq!(table.num_batches(), 2);
        assert_eq!(table.num_rows(), 3);
        assert_eq!(
            table.row_keys().unwrap(),
            vec![StorageValue::from("r0"), "r1".into(), "r2".into()]
        );
        assert_eq!(
            table.storage_values("n").unwrap(),
            vec![StorageValue::Int(1), StorageValue::Null, StorageValue::Int(3)]
        );
    }

    #[test]
    fn test_sentinels_round_trip_through_batches() {
        let options = BridgeOptions::default().with_sentinel(Sentinel::Max);
        let written = sample(&options);
        let n = written.batches()[0].column(1).as_primitive::<Int32Type>();
        assert_eq!(n.null_count(), 0);
        assert_eq!(n.value(1), i32::MAX);

        let read = KnimeTable::from_batches(
            Arc::clone(written.arrow_schema()),
            written.batches().to_vec(),
            &ExtensionRegistry::new(),
            &options,
        )
        .unwrap();
        assert_eq!(read.schema(), written.schema());
        assert_eq!(read.storage_values(1).unwrap()[1], StorageValue::Null);
    }

    #[test]
    fn test_ragged_columns_fail() {
        let registry = ExtensionRegistry::new();
        let schema = Schema::from_types([int32(), int32()], ["a", "b"]).unwrap();
        let chunk = build_storage_array(&int32(), &[StorageValue::Int(1)]).unwrap();
        let r = KnimeTable::from_columns(
            schema,
            vec![vec![Arc::clone(&chunk)], vec![]],
            &registry,
            &BridgeOptions::default(),
        );
        assert!(matches!(r, Err(BridgeError::Conversion(_))));
    }

    #[test]
    fn test_unknown_column() {
        let table = sample(&BridgeOptions::default());
        assert!(matches!(
            table.column_chunks("missing"),
            Err(BridgeError::Core(CoreError::Lookup(_)))
        ));
    }
}
