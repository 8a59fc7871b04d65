//! Struct dictionary encoding.
//!
//! A dict-encoded chunk is a struct array `{"0": key, "1": value}`. The
//! first occurrence of a value in a chunk stores both key and value; later
//! occurrences store only the key. Keys come from a generator shared across
//! the chunks of one column, so every chunk can be decoded on its own.

use std::collections::HashMap;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray, StructArray, UInt32Array, UInt64Array, UInt8Array};
use arrow::datatypes::{DataType, UInt32Type, UInt64Type, UInt8Type};
use kntable_core::registry::DictKeyType;
use kntable_core::StorageValue;
use tracing::trace;

use crate::arrow_schema::{dict_fields, dict_layout};
use crate::error::{BridgeError, Result};
use crate::storage::{build_array, nulls, storage_value_at};

static NULL: StorageValue = StorageValue::Null;

/// Hands out increasing dictionary keys.
#[derive(Debug, Clone)]
pub struct DictKeyGenerator {
    key_type: DictKeyType,
    next: u64,
}

impl DictKeyGenerator {
    pub fn new(key_type: DictKeyType) -> Self {
        Self { key_type, next: 0 }
    }

    pub fn key_type(&self) -> DictKeyType {
        self.key_type
    }

    /// Next unused key; fails once the key type is exhausted.
    pub fn next_key(&mut self) -> Result<u64> {
        if self.next > self.key_type.max_key() {
            return Err(BridgeError::conversion(format!(
                "dictionary keys exhausted for {}",
                self.key_type.as_trait()
            )));
        }
        let key = self.next;
        self.next += 1;
        Ok(key)
    }
}

/// Encode one chunk of storage values whose plain layout is `value_type`.
pub fn dict_encode(
    values: &[StorageValue],
    value_type: &DataType,
    keys: &mut DictKeyGenerator,
) -> Result<ArrayRef> {
    let mut seen: HashMap<&StorageValue, u64> = HashMap::new();
    let mut key_column: Vec<Option<u64>> = Vec::with_capacity(values.len());
    let mut value_column: Vec<&StorageValue> = Vec::with_capacity(values.len());
    let mut validity = Vec::with_capacity(values.len());

    for value in values {
        if value.is_null() {
            key_column.push(None);
            value_column.push(&NULL);
            validity.push(false);
            continue;
        }
        let key = match seen.get(value) {
            Some(&key) => {
                value_column.push(&NULL);
                key
            }
            None => {
                let key = keys.next_key()?;
                seen.insert(value, key);
                value_column.push(value);
                key
            }
        };
        key_column.push(Some(key));
        validity.push(true);
    }
    trace!(rows = values.len(), distinct = seen.len(), "dict-encoded chunk");

    let key_array: ArrayRef = match keys.key_type() {
        DictKeyType::ByteKey => Arc::new(
            key_column
                .iter()
                .map(|k| k.map(|k| k as u8))
                .collect::<UInt8Array>(),
        ),
        DictKeyType::IntKey => Arc::new(
            key_column
                .iter()
                .map(|k| k.map(|k| k as u32))
                .collect::<UInt32Array>(),
        ),
        DictKeyType::LongKey => Arc::new(UInt64Array::from(key_column)),
    };
    let value_array = build_array(value_type, &value_column)?;

    Ok(Arc::new(StructArray::try_new(
        dict_fields(keys.key_type(), value_type.clone()),
        vec![key_array, value_array],
        nulls(validity),
    )?))
}

/// A decoded view of one dict-encoded chunk.
#[derive(Debug, Clone)]
pub struct DictChunk {
    array: StructArray,
    /// Position of the stored value for each row; `None` for missing rows.
    positions: Vec<Option<usize>>,
}

impl DictChunk {
    /// Index a dict-encoded chunk.
    ///
    /// Fails if the layout is wrong or a key is used before its value.
    pub fn new(array: &dyn Array) -> Result<Self> {
        dict_layout(array.data_type())?;
        let array = array.as_struct().clone();
        let keys = key_values(array.column(0).as_ref())?;

        let mut first: HashMap<u64, usize> = HashMap::new();
        let mut positions = Vec::with_capacity(array.len());
        for (row, key) in keys.into_iter().enumerate() {
            if array.is_null(row) {
                positions.push(None);
                continue;
            }
            let key = key.ok_or_else(|| {
                BridgeError::conversion(format!("dict-encoded row {row} has no key"))
            })?;
            let position = *first.entry(key).or_insert(row);
            if position == row && array.column(1).is_null(row) {
                return Err(BridgeError::conversion(format!(
                    "dictionary key {key} first used at row {row} without a value"
                )));
            }
            positions.push(Some(position));
        }
        Ok(Self { array, positions })
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn is_null(&self, row: usize) -> bool {
        matches!(self.positions.get(row), Some(None))
    }

    /// Plain storage value of `row`.
    pub fn storage_value(&self, row: usize) -> Result<StorageValue> {
        match self.positions.get(row) {
            None => Err(BridgeError::conversion(format!(
                "row {row} out of bounds for dict chunk of length {}",
                self.len()
            ))),
            Some(None) => Ok(StorageValue::Null),
            Some(Some(position)) => storage_value_at(self.array.column(1).as_ref(), *position),
        }
    }

    /// Number of distinct values stored in this chunk.
    pub fn num_distinct(&self) -> usize {
        let mut distinct: Vec<usize> = self.positions.iter().flatten().copied().collect();
        distinct.sort_unstable();
        distinct.dedup();
        distinct.len()
    }
}

fn key_values(keys: &dyn Array) -> Result<Vec<Option<u64>>> {
    let keys = match keys.data_type() {
        DataType::UInt8 => keys
            .as_primitive::<UInt8Type>()
            .iter()
            .map(|k| k.map(u64::from))
            .collect(),
        DataType::UInt32 => keys
            .as_primitive::<UInt32Type>()
            .iter()
            .map(|k| k.map(u64::from))
            .collect(),
        DataType::UInt64 => keys.as_primitive::<UInt64Type>().iter().collect(),
        other => {
            return Err(BridgeError::conversion(format!(
                "unsupported dictionary key type {other}"
            )));
        }
    };
    Ok(keys)
}
