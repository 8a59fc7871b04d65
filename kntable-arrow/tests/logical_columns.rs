//! Logical columns through builders, dictionary encoding and Arrow IPC.

use std::io::Cursor;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::DataType;
use arrow::ipc::reader::FileReader;
use arrow::ipc::writer::FileWriter;
use chrono::NaiveDate;
use kntable_arrow::arrow_schema::{chunk_size, DICT_LOGICAL_TYPE_EXTENSION, EXTENSION_NAME_KEY};
use kntable_arrow::{
    build_storage_array, BridgeOptions, KnimeTable, LogicalColumn, LogicalColumnBuilder,
};
use kntable_core::prelude::*;

/// A short label, stored dictionary-encoded.
#[derive(Debug, Clone, PartialEq)]
struct Label(String);

struct LabelFactory;

impl ValueFactory for LabelFactory {
    type Value = Label;

    fn encode(&self, value: &Label) -> kntable_core::Result<StorageValue> {
        Ok(StorageValue::String(value.0.clone()))
    }

    fn decode(&self, storage: &StorageValue) -> kntable_core::Result<Label> {
        storage
            .as_str()
            .map(|s| Label(s.to_string()))
            .ok_or_else(|| Error::conversion("label expects string storage"))
    }
}

fn registry() -> ExtensionRegistry {
    let mut registry = ExtensionRegistry::with_builtins().unwrap();
    registry
        .register(
            module_path!(),
            "LabelFactory",
            r#""string""#,
            r#"{"type": "simple", "traits": {"dict_encoding": "INT_KEY"}}"#,
            LabelFactory,
        )
        .unwrap();
    registry
}

fn labels() -> Vec<Option<Label>> {
    ["red", "green", "red", "", "red", "blue", "green", "red", "blue"]
        .iter()
        .map(|s| (!s.is_empty()).then(|| Label(s.to_string())))
        .collect()
}

fn build_labels(ktype: &KnimeType, values: &[Option<Label>], chunk_size: usize) -> Vec<ArrayRef> {
    let mut builder = LogicalColumnBuilder::<Label>::try_new(ktype, chunk_size).unwrap();
    builder.extend(values.iter().map(Option::as_ref)).unwrap();
    builder.finish().unwrap()
}

#[test]
fn test_dict_encoded_column_round_trip() {
    let registry = registry();
    let ktype = registry.logical_for::<Label>().unwrap();
    let values = labels();

    let chunks = build_labels(&ktype, &values, 4);
    assert_eq!(chunks.len(), 3);
    for chunk in &chunks {
        assert!(matches!(chunk.data_type(), DataType::Struct(f) if f.len() == 2));
    }
    // First chunk: red, green, red, missing -> two stored values.
    let first = chunks[0].as_struct();
    assert_eq!(first.column(1).len() - first.column(1).null_count(), 2);

    let column = LogicalColumn::<Label>::try_new(&ktype, chunks).unwrap();
    assert_eq!(column.decode_all().unwrap(), values);
    assert_eq!(column.get(7).unwrap(), Some(Label("red".to_string())));
    assert!(column.is_null(3).unwrap());
}

#[test]
fn test_independent_dict_arrays_read_the_same() {
    let registry = registry();
    let ktype = registry.logical_for::<Label>().unwrap();
    let values = labels();

    let a = LogicalColumn::<Label>::try_new(&ktype, build_labels(&ktype, &values, 2)).unwrap();
    let b = LogicalColumn::<Label>::try_new(&ktype, build_labels(&ktype, &values, 5)).unwrap();
    assert_eq!(a.decode_all().unwrap(), b.decode_all().unwrap());
    assert_ne!(a.num_chunks(), b.num_chunks());
}

#[test]
fn test_plain_chunks_are_accepted_for_dict_types() {
    let registry = registry();
    let ktype = registry.logical_for::<Label>().unwrap();
    let plain = build_storage_array(&string(), &["x".into(), StorageValue::Null]).unwrap();
    let column = LogicalColumn::<Label>::try_new(&ktype, vec![plain]).unwrap();
    assert_eq!(
        column.decode_all().unwrap(),
        vec![Some(Label("x".to_string())), None]
    );
}

#[test]
fn test_table_survives_ipc() {
    let registry = registry();
    let date = registry.logical_for::<NaiveDate>().unwrap();
    let label = registry.logical_for::<Label>().unwrap();
    let schema = Schema::from_types(
        [string(), date.clone(), label.clone()],
        ["<RowID>", "day", "label"],
    )
    .unwrap();
    let options = BridgeOptions::default().with_chunk_size(3);

    let days: Vec<Option<NaiveDate>> = (0..9)
        .map(|i| (i % 4 != 1).then(|| NaiveDate::from_ymd_opt(2020, 1, 1 + i).unwrap()))
        .collect();
    let keys: Vec<StorageValue> = (0..9).map(|i| format!("Row{i}").into()).collect();

    let key_chunks = keys
        .chunks(options.chunk_size)
        .map(|c| build_storage_array(&string(), c).unwrap())
        .collect();
    let mut day_builder =
        LogicalColumnBuilder::<NaiveDate>::try_new(&date, options.chunk_size).unwrap();
    day_builder.extend(days.iter().map(Option::as_ref)).unwrap();
    let label_chunks = build_labels(&label, &labels(), options.chunk_size);

    let table = KnimeTable::from_columns(
        schema.clone(),
        vec![key_chunks, day_builder.finish().unwrap(), label_chunks],
        &registry,
        &options,
    )
    .unwrap();
    assert_eq!(table.num_batches(), 3);
    assert_eq!(
        table.arrow_schema().field(2).metadata()[EXTENSION_NAME_KEY],
        DICT_LOGICAL_TYPE_EXTENSION
    );

    let mut writer = FileWriter::try_new(Vec::new(), table.arrow_schema()).unwrap();
    for batch in table.batches() {
        writer.write(batch).unwrap();
    }
    writer.finish().unwrap();
    let bytes = writer.into_inner().unwrap();

    let reader = FileReader::try_new(Cursor::new(bytes), None).unwrap();
    let arrow_schema = reader.schema();
    assert_eq!(chunk_size(&arrow_schema), Some(3));
    let batches = reader.collect::<std::result::Result<Vec<_>, _>>().unwrap();

    let read = KnimeTable::from_batches(arrow_schema, batches, &registry, &options).unwrap();
    assert_eq!(read.schema(), &schema);
    assert_eq!(read.row_keys().unwrap(), keys);
    assert_eq!(
        read.logical_column::<NaiveDate>("day")
            .unwrap()
            .decode_all()
            .unwrap(),
        days
    );
    assert_eq!(
        read.logical_column::<Label>(2).unwrap().decode_all().unwrap(),
        labels()
    );
    assert_eq!(
        read.storage_values("label").unwrap()[0],
        StorageValue::from("red")
    );
}
