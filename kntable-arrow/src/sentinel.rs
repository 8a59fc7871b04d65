//! Missing-value sentinels for integer columns.
//!
//! Consumers that cannot represent missing integers get a sentinel value
//! in their place. Only top-level `Int32` and `Int64` columns are touched.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray, Int32Array, Int64Array};
use arrow::datatypes::{DataType, Int32Type, Int64Type};
use arrow::record_batch::RecordBatch;
use tracing::trace;

use crate::error::{BridgeError, Result};

/// The value standing in for a missing integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentinel {
    /// The smallest value of the column's type.
    Min,
    /// The largest value of the column's type.
    Max,
    /// An explicit value; must fit the column's type.
    Value(i64),
}

impl Sentinel {
    fn for_int32(self) -> Result<i32> {
        match self {
            Sentinel::Min => Ok(i32::MIN),
            Sentinel::Max => Ok(i32::MAX),
            Sentinel::Value(v) => i32::try_from(v)
                .map_err(|_| BridgeError::conversion(format!("sentinel {v} does not fit int32"))),
        }
    }

    fn for_int64(self) -> i64 {
        match self {
            Sentinel::Min => i64::MIN,
            Sentinel::Max => i64::MAX,
            Sentinel::Value(v) => v,
        }
    }
}

impl FromStr for Sentinel {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "min" => Ok(Sentinel::Min),
            "max" => Ok(Sentinel::Max),
            other => other.parse().map(Sentinel::Value).map_err(|_| {
                BridgeError::conversion(format!(
                    "sentinel must be 'min', 'max' or an integer, got '{other}'"
                ))
            }),
        }
    }
}

impl fmt::Display for Sentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sentinel::Min => write!(f, "min"),
            Sentinel::Max => write!(f, "max"),
            Sentinel::Value(v) => write!(f, "{v}"),
        }
    }
}

/// Replace missing integers with the sentinel.
pub fn insert_sentinels(batch: &RecordBatch, sentinel: Sentinel) -> Result<RecordBatch> {
    map_integer_columns(batch, |column| match column.data_type() {
        DataType::Int32 => {
            let s = sentinel.for_int32()?;
            let filled: Int32Array = column
                .as_primitive::<Int32Type>()
                .iter()
                .map(|v| Some(v.unwrap_or(s)))
                .collect();
            Ok(Arc::new(filled) as ArrayRef)
        }
        _ => {
            let s = sentinel.for_int64();
            let filled: Int64Array = column
                .as_primitive::<Int64Type>()
                .iter()
                .map(|v| Some(v.unwrap_or(s)))
                .collect();
            Ok(Arc::new(filled) as ArrayRef)
        }
    })
}

/// Turn sentinel values back into missing integers.
pub fn sentinels_to_missing(batch: &RecordBatch, sentinel: Sentinel) -> Result<RecordBatch> {
    map_integer_columns(batch, |column| match column.data_type() {
        DataType::Int32 => {
            let s = sentinel.for_int32()?;
            let masked: Int32Array = column
                .as_primitive::<Int32Type>()
                .iter()
                .map(|v| v.filter(|v| *v != s))
                .collect();
            Ok(Arc::new(masked) as ArrayRef)
        }
        _ => {
            let s = sentinel.for_int64();
            let masked: Int64Array = column
                .as_primitive::<Int64Type>()
                .iter()
                .map(|v| v.filter(|v| *v != s))
                .collect();
            Ok(Arc::new(masked) as ArrayRef)
        }
    })
}

fn map_integer_columns(
    batch: &RecordBatch,
    f: impl Fn(&ArrayRef) -> Result<ArrayRef>,
) -> Result<RecordBatch> {
    let mut touched = 0usize;
    let columns = batch
        .columns()
        .iter()
        .map(|column| match column.data_type() {
            DataType::Int32 | DataType::Int64 => {
                touched += 1;
                f(column)
            }
            _ => Ok(Arc::clone(column)),
        })
        .collect::<Result<Vec<_>>>()?;
    trace!(columns = touched, rows = batch.num_rows(), "mapped integer sentinels");
    Ok(RecordBatch::try_new(batch.schema(), columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::StringArray;
    use arrow::datatypes::{Field, Schema};

    fn batch() -> RecordBatch {
        let schema = Schema::new(vec![
            Field::new("i", DataType::Int32, true),
            Field::new("l", DataType::Int64, true),
            Field::new("s", DataType::Utf8, true),
        ]);
        RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(Int32Array::from(vec![Some(1), None])),
                Arc::new(Int64Array::from(vec![None, Some(2)])),
                Arc::new(StringArray::from(vec![None, Some("x")])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_parse() {
        assert_eq!("min".parse::<Sentinel>().unwrap(), Sentinel::Min);
        assert_eq!(" max ".parse::<Sentinel>().unwrap(), Sentinel::Max);
        assert_eq!("-7".parse::<Sentinel>().unwrap(), Sentinel::Value(-7));
        assert!("nope".parse::<Sentinel>().is_err());
    }

    #[test]
    fn test_min_round_trip() {
        let original = batch();
        let filled = insert_sentinels(&original, Sentinel::Min).unwrap();
        let ints = filled.column(0).as_primitive::<Int32Type>();
        assert_eq!(ints.value(1), i32::MIN);
        assert_eq!(filled.column(1).as_primitive::<Int64Type>().value(0), i64::MIN);
        assert_eq!(filled.column(2).null_count(), 1);

        let back = sentinels_to_missing(&filled, Sentinel::Min).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn test_explicit_value_must_fit_int32() {
        let err = insert_sentinels(&batch(), Sentinel::Value(i64::from(i32::MAX) + 1));
        assert!(matches!(err, Err(BridgeError::Conversion(_))));
    }
}
