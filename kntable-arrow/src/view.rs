//! Logical-value views over chunked storage columns.
//!
//! [`LogicalColumn`] decodes elements on access through the registered
//! converter; nothing is materialized up front. [`LogicalColumnBuilder`]
//! encodes each appended value into storage and cuts chunks of a fixed size.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef};
use arrow::datatypes::DataType;
use kntable_core::registry::Converter;
use kntable_core::types::{KnimeType, LogicalType};
use kntable_core::{Error as CoreError, StorageValue};
use tracing::debug;

use crate::arrow_schema::{dict_struct_type, same_storage_layout, to_arrow_type};
use crate::dict::{dict_encode, DictChunk, DictKeyGenerator};
use crate::error::{BridgeError, Result};
use crate::storage::{build_storage_array, storage_value_at};

/// One physical chunk, plain or dict-encoded.
#[derive(Debug, Clone)]
enum Chunk {
    Plain(ArrayRef),
    Dict(ArrayRef, DictChunk),
}

impl Chunk {
    fn array(&self) -> &ArrayRef {
        match self {
            Chunk::Plain(array) | Chunk::Dict(array, _) => array,
        }
    }

    fn storage_value(&self, row: usize) -> Result<StorageValue> {
        match self {
            Chunk::Plain(array) => storage_value_at(array.as_ref(), row),
            Chunk::Dict(_, dict) => dict.storage_value(row),
        }
    }

    fn is_null(&self, row: usize) -> bool {
        match self {
            Chunk::Plain(array) => array.is_null(row),
            Chunk::Dict(_, dict) => dict.is_null(row),
        }
    }
}

/// The converter behind a logical column type.
fn converter_of<T: 'static>(ktype: &KnimeType) -> Result<(LogicalType, Arc<Converter>)> {
    let logical = ktype
        .as_logical()
        .ok_or_else(|| BridgeError::conversion(format!("{ktype} is not a logical type")))?;
    let converter = logical.converter().ok_or_else(|| {
        CoreError::registry(format!(
            "no converter registered for {}",
            logical.logical_type()
        ))
    })?;
    if !converter.value_type().is::<T>() {
        return Err(BridgeError::conversion(format!(
            "column holds {} values, not {}",
            converter.value_type(),
            std::any::type_name::<T>()
        )));
    }
    Ok((logical.clone(), Arc::clone(converter)))
}

/// A chunked column of logical values of type `T`.
pub struct LogicalColumn<T> {
    logical: LogicalType,
    converter: Arc<Converter>,
    chunks: Vec<Chunk>,
    /// Start row of each chunk, plus the total length at the end.
    offsets: Vec<usize>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: 'static> LogicalColumn<T> {
    /// View `chunks` as values of the logical type `ktype`.
    ///
    /// Each chunk must be in the plain storage layout of `ktype` or in the
    /// struct dictionary layout over it.
    pub fn try_new(ktype: &KnimeType, chunks: Vec<ArrayRef>) -> Result<Self> {
        let (logical, converter) = converter_of::<T>(ktype)?;
        let plain = to_arrow_type(logical.storage_type());

        let mut offsets = Vec::with_capacity(chunks.len() + 1);
        offsets.push(0);
        let mut indexed = Vec::with_capacity(chunks.len());
        for (i, array) in chunks.into_iter().enumerate() {
            let chunk = if same_storage_layout(array.data_type(), &plain) {
                Chunk::Plain(array)
            } else if is_dict_over(array.data_type(), &plain) {
                let dict = DictChunk::new(array.as_ref())?;
                Chunk::Dict(array, dict)
            } else {
                return Err(BridgeError::conversion(format!(
                    "chunk {i} of {} has arrow type {}, expected {plain}",
                    logical.logical_type(),
                    array.data_type()
                )));
            };
            offsets.push(offsets[i] + chunk.array().len());
            indexed.push(chunk);
        }

        Ok(Self {
            logical,
            converter,
            chunks: indexed,
            offsets,
            _marker: PhantomData,
        })
    }

    pub fn logical_type(&self) -> &LogicalType {
        &self.logical
    }

    pub fn len(&self) -> usize {
        self.offsets.last().copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn num_chunks(&self) -> usize {
        self.chunks.len()
    }

    /// The underlying arrays, in order.
    pub fn chunks(&self) -> impl Iterator<Item = &ArrayRef> + '_ {
        self.chunks.iter().map(Chunk::array)
    }

    fn locate(&self, index: usize) -> Result<(&Chunk, usize)> {
        if index >= self.len() {
            return Err(BridgeError::conversion(format!(
                "index {index} out of bounds for column of length {}",
                self.len()
            )));
        }
        let chunk = self.offsets[..self.chunks.len()].partition_point(|&start| start <= index) - 1;
        Ok((&self.chunks[chunk], index - self.offsets[chunk]))
    }

    pub fn is_null(&self, index: usize) -> Result<bool> {
        let (chunk, row) = self.locate(index)?;
        Ok(chunk.is_null(row))
    }

    /// Storage value at `index`, without decoding.
    pub fn storage_value(&self, index: usize) -> Result<StorageValue> {
        let (chunk, row) = self.locate(index)?;
        chunk.storage_value(row)
    }

    /// Decode the element at `index`; `None` if it is missing.
    pub fn get(&self, index: usize) -> Result<Option<T>> {
        let storage = self.storage_value(index)?;
        if storage.is_null() {
            return Ok(None);
        }
        Ok(Some(self.converter.decode::<T>(&storage)?))
    }

    /// Decode elements one at a time.
    pub fn iter(&self) -> impl Iterator<Item = Result<Option<T>>> + '_ {
        (0..self.len()).map(move |i| self.get(i))
    }

    /// Decode the whole column.
    pub fn decode_all(&self) -> Result<Vec<Option<T>>> {
        let mut values = Vec::with_capacity(self.len());
        for chunk in &self.chunks {
            for row in 0..chunk.array().len() {
                let storage = chunk.storage_value(row)?;
                values.push(if storage.is_null() {
                    None
                } else {
                    Some(self.converter.decode::<T>(&storage)?)
                });
            }
        }
        debug!(
            logical_type = self.logical.logical_type(),
            rows = values.len(),
            "decoded logical column"
        );
        Ok(values)
    }

    /// Append the chunks of `other` without decoding them.
    pub fn concat(&self, other: &LogicalColumn<T>) -> Result<Self> {
        if self.logical != other.logical {
            return Err(BridgeError::conversion(format!(
                "cannot concatenate {} and {}",
                self.logical.logical_type(),
                other.logical.logical_type()
            )));
        }
        let mut chunks = self.chunks.clone();
        let mut offsets = self.offsets.clone();
        for chunk in &other.chunks {
            let end = offsets.last().copied().unwrap_or(0);
            offsets.push(end + chunk.array().len());
            chunks.push(chunk.clone());
        }
        Ok(Self {
            logical: self.logical.clone(),
            converter: Arc::clone(&self.converter),
            chunks,
            offsets,
            _marker: PhantomData,
        })
    }
}

impl<T> fmt::Debug for LogicalColumn<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogicalColumn")
            .field("logical_type", &self.logical.logical_type())
            .field("chunks", &self.chunks.len())
            .field("len", &self.offsets.last())
            .finish()
    }
}

fn is_dict_over(data_type: &DataType, plain: &DataType) -> bool {
    crate::arrow_schema::dict_layout(data_type)
        .map(|(_, value)| same_storage_layout(value.data_type(), plain))
        .unwrap_or(false)
}

/// Builds a chunked logical column by encoding values one at a time.
pub struct LogicalColumnBuilder<T> {
    logical: LogicalType,
    converter: Arc<Converter>,
    storage_type: KnimeType,
    chunk_size: usize,
    pending: Vec<StorageValue>,
    chunks: Vec<ArrayRef>,
    keys: Option<DictKeyGenerator>,
    _marker: PhantomData<fn(&T)>,
}

impl<T: 'static> LogicalColumnBuilder<T> {
    /// Builder for values of `ktype`, cutting a chunk every `chunk_size`
    /// values. Dict-encoded converters produce dict-encoded chunks.
    pub fn try_new(ktype: &KnimeType, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(BridgeError::conversion("chunk size must be positive"));
        }
        let (logical, converter) = converter_of::<T>(ktype)?;
        let keys = converter.dict_encoding().map(DictKeyGenerator::new);
        Ok(Self {
            storage_type: logical.storage_type().clone(),
            logical,
            converter,
            chunk_size,
            pending: Vec::with_capacity(chunk_size),
            chunks: Vec::new(),
            keys,
            _marker: PhantomData,
        })
    }

    /// Arrow type of the chunks this builder produces.
    pub fn data_type(&self) -> DataType {
        let plain = to_arrow_type(&self.storage_type);
        match &self.keys {
            Some(keys) => dict_struct_type(keys.key_type(), plain),
            None => plain,
        }
    }

    /// Encode and append one value; `None` appends a missing value.
    pub fn append(&mut self, value: Option<&T>) -> Result<()> {
        let storage = match value {
            Some(v) => self.converter.encode(v)?,
            None => StorageValue::Null,
        };
        self.pending.push(storage);
        if self.pending.len() == self.chunk_size {
            self.flush()?;
        }
        Ok(())
    }

    pub fn append_null(&mut self) -> Result<()> {
        self.append(None)
    }

    pub fn extend<'a>(&mut self, values: impl IntoIterator<Item = Option<&'a T>>) -> Result<()>
    where
        T: 'a,
    {
        values.into_iter().try_for_each(|v| self.append(v))
    }

    fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let array = match &mut self.keys {
            Some(keys) => dict_encode(&self.pending, &to_arrow_type(&self.storage_type), keys)?,
            None => build_storage_array(&self.storage_type, &self.pending)?,
        };
        self.chunks.push(array);
        self.pending.clear();
        Ok(())
    }

    /// Finish the column and return its chunks.
    pub fn finish(mut self) -> Result<Vec<ArrayRef>> {
        self.flush()?;
        debug!(
            logical_type = self.logical.logical_type(),
            chunks = self.chunks.len(),
            "built logical column"
        );
        Ok(self.chunks)
    }

    /// Finish the column as a view over its own chunks.
    pub fn finish_column(self) -> Result<LogicalColumn<T>> {
        let ktype = KnimeType::Logical(self.logical.clone());
        LogicalColumn::try_new(&ktype, self.finish()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use kntable_core::registry::ExtensionRegistry;

    fn dates() -> Vec<Option<NaiveDate>> {
        vec![
            NaiveDate::from_ymd_opt(2024, 1, 1),
            None,
            NaiveDate::from_ymd_opt(1969, 12, 31),
            NaiveDate::from_ymd_opt(2000, 2, 29),
            None,
        ]
    }

    #[test]
    fn test_chunks_from_other_writers_are_accepted() {
        use arrow::array::{Int32Array, Int64Array, StructArray};
        use arrow::datatypes::Field;
        use chrono::NaiveDateTime;

        let registry = ExtensionRegistry::with_builtins().unwrap();
        let ktype = registry.logical_for::<NaiveDateTime>().unwrap();
        let day: ArrayRef = Arc::new(Int64Array::from(vec![0, 1]));
        let nanos: ArrayRef = Arc::new(Int64Array::from(vec![0, 3_600_000_000_000]));
        let chunk: ArrayRef = Arc::new(StructArray::from(vec![
            (Arc::new(Field::new("day", DataType::Int64, false)), day),
            (Arc::new(Field::new("nanos", DataType::Int64, false)), Arc::clone(&nanos)),
        ]));

        let column = LogicalColumn::<NaiveDateTime>::try_new(&ktype, vec![chunk]).unwrap();
        let expected = NaiveDate::from_ymd_opt(1970, 1, 2)
            .unwrap()
            .and_hms_opt(1, 0, 0)
            .unwrap();
        assert_eq!(column.get(1).unwrap(), Some(expected));

        let narrow: ArrayRef = Arc::new(StructArray::from(vec![
            (
                Arc::new(Field::new("0", DataType::Int32, true)),
                Arc::new(Int32Array::from(vec![0, 1])) as ArrayRef,
            ),
            (Arc::new(Field::new("1", DataType::Int64, true)), nanos),
        ]));
        assert!(matches!(
            LogicalColumn::<NaiveDateTime>::try_new(&ktype, vec![narrow]),
            Err(BridgeError::Conversion(_))
        ));
    }

    #[test]
    fn test_build_and_read_back() {
        let registry = ExtensionRegistry::with_builtins().unwrap();
        let ktype = registry.logical_for::<NaiveDate>().unwrap();
        let mut builder = LogicalColumnBuilder::<NaiveDate>::try_new(&ktype, 2).unwrap();
        let values = dates();
        builder.extend(values.iter().map(Option::as_ref)).unwrap();
        let column = builder.finish_column().unwrap();

        assert_eq!(column.num_chunks(), 3);
        assert_eq!(column.len(), 5);
        assert_eq!(column.decode_all().unwrap(), values);
        assert_eq!(column.get(2).unwrap(), values[2]);
        assert!(column.is_null(4).unwrap());
        assert!(column.get(5).is_err());
        let iterated: Vec<_> = column.iter().collect::<Result<_>>().unwrap();
        assert_eq!(iterated, values);
    }

    #[test]
    fn test_wrong_value_type_fails() {
        let registry = ExtensionRegistry::with_builtins().unwrap();
        let ktype = registry.logical_for::<NaiveDate>().unwrap();
        assert!(LogicalColumn::<String>::try_new(&ktype, vec![]).is_err());
    }

    #[test]
    fn test_wrong_chunk_type_fails() {
        let registry = ExtensionRegistry::with_builtins().unwrap();
        let ktype = registry.logical_for::<NaiveDate>().unwrap();
        let chunk: ArrayRef = Arc::new(arrow::array::StringArray::from(vec!["x"]));
        assert!(matches!(
            LogicalColumn::<NaiveDate>::try_new(&ktype, vec![chunk]),
            Err(BridgeError::Conversion(_))
        ));
    }

    #[test]
    fn test_concat_keeps_chunks() {
        let registry = ExtensionRegistry::with_builtins().unwrap();
        let ktype = registry.logical_for::<NaiveDate>().unwrap();
        let build = |values: &[Option<NaiveDate>]| {
            let mut b = LogicalColumnBuilder::<NaiveDate>::try_new(&ktype, 8).unwrap();
            b.extend(values.iter().map(Option::as_ref)).unwrap();
            b.finish_column().unwrap()
        };
        let values = dates();
        let left = build(&values[..2]);
        let right = build(&values[2..]);
        let both = left.concat(&right).unwrap();

        assert_eq!(both.num_chunks(), 2);
        assert!(Arc::ptr_eq(
            both.chunks().nth(1).unwrap(),
            right.chunks().next().unwrap()
        ));
        assert_eq!(both.decode_all().unwrap(), values);
    }

    #[test]
    fn test_zero_chunk_size_fails() {
        let registry = ExtensionRegistry::with_builtins().unwrap();
        let ktype = registry.logical_for::<NaiveDate>().unwrap();
        assert!(LogicalColumnBuilder::<NaiveDate>::try_new(&ktype, 0).is_err());
    }
}
