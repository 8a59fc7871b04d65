//! Storage values in and out of Arrow arrays.

use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, AsArray, BinaryArray, BooleanArray, Float64Array, Int32Array, Int64Array,
    LargeBinaryArray, LargeListArray, LargeStringArray, StringArray, StructArray,
};
use arrow::buffer::{NullBuffer, OffsetBuffer, ScalarBuffer};
use arrow::datatypes::{DataType, Float64Type, Int32Type, Int64Type};
use kntable_core::types::KnimeType;
use kntable_core::StorageValue;

use crate::arrow_schema::to_arrow_type;
use crate::error::{BridgeError, Result};

static NULL: StorageValue = StorageValue::Null;

/// Read the storage value at `index`.
pub fn storage_value_at(array: &dyn Array, index: usize) -> Result<StorageValue> {
    if index >= array.len() {
        return Err(BridgeError::conversion(format!(
            "index {index} out of bounds for array of length {}",
            array.len()
        )));
    }
    if array.is_null(index) {
        return Ok(StorageValue::Null);
    }
    let value = match array.data_type() {
        DataType::Int32 => StorageValue::Int(array.as_primitive::<Int32Type>().value(index)),
        DataType::Int64 => StorageValue::Long(array.as_primitive::<Int64Type>().value(index)),
        DataType::Float64 => StorageValue::Double(array.as_primitive::<Float64Type>().value(index)),
        DataType::Boolean => StorageValue::Bool(array.as_boolean().value(index)),
        DataType::Utf8 => StorageValue::String(array.as_string::<i32>().value(index).to_string()),
        DataType::LargeUtf8 => {
            StorageValue::String(array.as_string::<i64>().value(index).to_string())
        }
        DataType::Binary => StorageValue::Blob(array.as_binary::<i32>().value(index).to_vec()),
        DataType::LargeBinary => {
            StorageValue::Blob(array.as_binary::<i64>().value(index).to_vec())
        }
        DataType::List(_) => list_values(array.as_list::<i32>().value(index).as_ref())?,
        DataType::LargeList(_) => list_values(array.as_list::<i64>().value(index).as_ref())?,
        DataType::Struct(_) => {
            let s = array.as_struct();
            StorageValue::Struct(
                s.columns()
                    .iter()
                    .map(|c| storage_value_at(c.as_ref(), index))
                    .collect::<Result<_>>()?,
            )
        }
        other => {
            return Err(BridgeError::conversion(format!(
                "no storage value for arrow type {other}"
            )));
        }
    };
    Ok(value)
}

fn list_values(items: &dyn Array) -> Result<StorageValue> {
    let values = (0..items.len())
        .map(|i| storage_value_at(items, i))
        .collect::<Result<_>>()?;
    Ok(StorageValue::List(values))
}

/// Build an array holding `values` in the storage layout of `ktype`.
///
/// Fails if a value does not fit the storage type.
pub fn build_storage_array(ktype: &KnimeType, values: &[StorageValue]) -> Result<ArrayRef> {
    let refs: Vec<&StorageValue> = values.iter().collect();
    build_array(&to_arrow_type(ktype), &refs)
}

pub(crate) fn build_array(data_type: &DataType, values: &[&StorageValue]) -> Result<ArrayRef> {
    let array: ArrayRef = match data_type {
        DataType::Int32 => Arc::new(Int32Array::from(leaf_values(
            values,
            "int32",
            StorageValue::as_int,
        )?)),
        DataType::Int64 => Arc::new(Int64Array::from(leaf_values(
            values,
            "int64",
            StorageValue::as_long,
        )?)),
        DataType::Float64 => Arc::new(Float64Array::from(leaf_values(
            values,
            "double",
            StorageValue::as_double,
        )?)),
        DataType::Boolean => Arc::new(BooleanArray::from(leaf_values(
            values,
            "boolean",
            StorageValue::as_bool,
        )?)),
        DataType::Utf8 => Arc::new(StringArray::from(leaf_values(
            values,
            "string",
            StorageValue::as_str,
        )?)),
        DataType::LargeUtf8 => Arc::new(LargeStringArray::from(leaf_values(
            values,
            "string",
            StorageValue::as_str,
        )?)),
        DataType::Binary => Arc::new(BinaryArray::from(leaf_values(
            values,
            "blob",
            StorageValue::as_bytes,
        )?)),
        DataType::LargeBinary => Arc::new(LargeBinaryArray::from(leaf_values(
            values,
            "blob",
            StorageValue::as_bytes,
        )?)),
        DataType::LargeList(item) => {
            let mut offsets = Vec::with_capacity(values.len() + 1);
            offsets.push(0i64);
            let mut validity = Vec::with_capacity(values.len());
            let mut children: Vec<&StorageValue> = Vec::new();
            for value in values {
                match value {
                    StorageValue::Null => validity.push(false),
                    StorageValue::List(items) => {
                        children.extend(items.iter());
                        validity.push(true);
                    }
                    other => return Err(mismatch("list", other)),
                }
                offsets.push(children.len() as i64);
            }
            let child = build_array(item.data_type(), &children)?;
            Arc::new(LargeListArray::try_new(
                Arc::clone(item),
                OffsetBuffer::new(ScalarBuffer::from(offsets)),
                child,
                nulls(validity),
            )?)
        }
        DataType::Struct(fields) => {
            let mut columns: Vec<Vec<&StorageValue>> =
                vec![Vec::with_capacity(values.len()); fields.len()];
            let mut validity = Vec::with_capacity(values.len());
            for value in values {
                match value {
                    StorageValue::Null => {
                        columns.iter_mut().for_each(|c| c.push(&NULL));
                        validity.push(false);
                    }
                    StorageValue::Struct(items) if items.len() == fields.len() => {
                        columns.iter_mut().zip(items).for_each(|(c, v)| c.push(v));
                        validity.push(true);
                    }
                    other => return Err(mismatch(&format!("struct of {}", fields.len()), other)),
                }
            }
            let arrays = fields
                .iter()
                .zip(&columns)
                .map(|(f, c)| build_array(f.data_type(), c))
                .collect::<Result<Vec<_>>>()?;
            Arc::new(StructArray::try_new(fields.clone(), arrays, nulls(validity))?)
        }
        other => {
            return Err(BridgeError::conversion(format!(
                "cannot build storage array of arrow type {other}"
            )));
        }
    };
    Ok(array)
}

fn leaf_values<'a, T>(
    values: &[&'a StorageValue],
    expected: &str,
    get: fn(&'a StorageValue) -> Option<T>,
) -> Result<Vec<Option<T>>> {
    values
        .iter()
        .map(|&v| {
            if v.is_null() {
                Ok(None)
            } else {
                get(v).map(Some).ok_or_else(|| mismatch(expected, v))
            }
        })
        .collect()
}

fn mismatch(expected: &str, got: &StorageValue) -> BridgeError {
    BridgeError::conversion(format!("expected {expected} value, got {}", got.kind_name()))
}

/// Validity bitmap, omitted when every slot is valid.
pub(crate) fn nulls(validity: Vec<bool>) -> Option<NullBuffer> {
    if validity.iter().all(|v| *v) {
        None
    } else {
        Some(NullBuffer::from(validity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kntable_core::types::{blob, int32, list, string, struct_};

    fn read_all(array: &dyn Array) -> Vec<StorageValue> {
        (0..array.len())
            .map(|i| storage_value_at(array, i).unwrap())
            .collect()
    }

    #[test]
    fn test_primitive_round_trip() {
        let values = vec![StorageValue::Int(1), StorageValue::Null, StorageValue::Int(-3)];
        let array = build_storage_array(&int32(), &values).unwrap();
        assert_eq!(array.null_count(), 1);
        assert_eq!(read_all(array.as_ref()), values);
    }

    #[test]
    fn test_nested_round_trip() {
        let ktype = list(struct_([string(), blob()]).unwrap());
        let values = vec![
            StorageValue::List(vec![
                StorageValue::Struct(vec!["a".into(), StorageValue::Blob(vec![1, 2])]),
                StorageValue::Null,
            ]),
            StorageValue::Null,
            StorageValue::List(vec![]),
        ];
        let array = build_storage_array(&ktype, &values).unwrap();
        assert_eq!(array.data_type(), &to_arrow_type(&ktype));
        assert_eq!(read_all(array.as_ref()), values);
    }

    #[test]
    fn test_mismatched_value_fails() {
        let values = vec![StorageValue::String("x".into())];
        assert!(matches!(
            build_storage_array(&int32(), &values),
            Err(BridgeError::Conversion(_))
        ));
    }

    #[test]
    fn test_out_of_bounds() {
        let array = build_storage_array(&int32(), &[StorageValue::Int(1)]).unwrap();
        assert!(storage_value_at(array.as_ref(), 1).is_err());
    }
}
