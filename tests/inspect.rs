//! Loading schema documents and Arrow files from disk.

use std::fs::{self, File};
use std::io::Write;

use arrow::array::ArrayRef;
use arrow::ipc::writer::{FileWriter, StreamWriter};
use kntable::cli::{OutputFormat, OutputFormatter};
use kntable::inspect::{default_registry, read_arrow_file, read_schema_file};
use kntable_arrow::geo::{GeoColumn, GeoValue};
use kntable_arrow::{build_storage_array, BridgeOptions, KnimeTable, Sentinel};
use kntable_core::prelude::*;
use tempfile::TempDir;

fn geo_table(options: &BridgeOptions) -> KnimeTable {
    let registry = default_registry().unwrap();
    let geo = registry.logical_for::<GeoValue>().unwrap();
    let schema =
        Schema::from_types([string(), int64(), geo.clone()], ["<RowID>", "n", "where"]).unwrap();

    let keys: Vec<StorageValue> = (0..4).map(|i| format!("Row{i}").into()).collect();
    let ns = [Some(1i64), None, Some(3), None].map(StorageValue::from);
    let places: Vec<Option<GeoValue>> = vec![
        Some(GeoValue::from_wkt("POINT(1 2)", "EPSG:4326").unwrap()),
        None,
        Some(GeoValue::from_wkt("POINT(3 4)", "EPSG:4326").unwrap()),
        Some(GeoValue::from_wkt("POINT(5 6)", "").unwrap()),
    ];

    let chunked = |ktype: &KnimeType, values: &[StorageValue]| -> Vec<ArrayRef> {
        values
            .chunks(options.chunk_size)
            .map(|c| build_storage_array(ktype, c).unwrap())
            .collect()
    };
    let geo_chunks = GeoColumn::from_values(&geo, &places, options.chunk_size)
        .unwrap()
        .chunks()
        .cloned()
        .collect();

    KnimeTable::from_columns(
        schema,
        vec![chunked(&string(), &keys), chunked(&int64(), &ns), geo_chunks],
        &registry,
        options,
    )
    .unwrap()
}

#[test]
fn test_read_schema_document() {
    let dir = TempDir::new().unwrap();
    let registry = default_registry().unwrap();
    let date = registry.logical_for::<chrono::NaiveDate>().unwrap();
    let schema = Schema::from_types([string(), date, list(double())], ["<RowID>", "day", "xs"])
        .unwrap();

    let path = dir.path().join("schema.json");
    fs::write(&path, schema_to_json(&schema, &registry).unwrap()).unwrap();

    assert_eq!(read_schema_file(&path, &registry).unwrap(), schema);
}

#[test]
fn test_read_hand_written_schema_document() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("schema.json");
    fs::write(
        &path,
        r#"{
            "schema": {
                "specs": ["string", "int"],
                "traits": [
                    {"type": "simple", "traits": {}},
                    {"type": "simple", "traits": {}}
                ]
            },
            "columnNames": ["<RowID>", "count"],
            "columnMetaData": [null, null]
        }"#,
    )
    .unwrap();

    let schema = read_schema_file(&path, &default_registry().unwrap()).unwrap();
    assert_eq!(schema.num_columns(), 2);
    assert_eq!(schema[1].ktype(), &int32());
}

#[test]
fn test_missing_schema_file() {
    let dir = TempDir::new().unwrap();
    let r = read_schema_file(dir.path().join("nope.json"), &default_registry().unwrap());
    assert!(matches!(r, Err(kntable::Error::Io(_))));
}

#[test]
fn test_read_finished_arrow_file() {
    let dir = TempDir::new().unwrap();
    let options = BridgeOptions::default()
        .with_chunk_size(3)
        .with_sentinel(Sentinel::Min);
    let table = geo_table(&options);

    let path = dir.path().join("table.arrow");
    let mut writer = FileWriter::try_new(File::create(&path).unwrap(), table.arrow_schema()).unwrap();
    for batch in table.batches() {
        writer.write(batch).unwrap();
    }
    writer.finish().unwrap();

    let registry = default_registry().unwrap();
    let read = read_arrow_file(&path, true, &registry, &options).unwrap();
    assert_eq!(read.schema(), table.schema());
    assert_eq!(read.num_batches(), 2);
    assert_eq!(read.num_rows(), 4);
    assert_eq!(read.storage_values("n").unwrap()[1], StorageValue::Null);

    let places = GeoColumn::try_new(read.schema()[2].ktype(), read.column_chunks("where").unwrap())
        .unwrap();
    assert_eq!(places.get(1).unwrap(), None);
    assert_eq!(places.get(3).unwrap().unwrap().to_wkt(), "POINT(5 6)");

    let mut out = Vec::new();
    OutputFormatter::new(OutputFormat::Text, &registry)
        .write_table(&read, &mut out)
        .unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.ends_with("batches: 2\nrows: 4\n"));
}

#[test]
fn test_read_unfinished_arrow_file() {
    let dir = TempDir::new().unwrap();
    let options = BridgeOptions::default().with_chunk_size(2);
    let table = geo_table(&options);

    // Leading magic followed by stream messages and no footer.
    let path = dir.path().join("partial.arrow");
    let mut file = File::create(&path).unwrap();
    file.write_all(b"ARROW1\0\0").unwrap();
    let mut writer = StreamWriter::try_new(&mut file, table.arrow_schema()).unwrap();
    writer.write(&table.batches()[0]).unwrap();
    writer.finish().unwrap();
    drop(writer);
    file.flush().unwrap();

    let registry = default_registry().unwrap();
    assert!(read_arrow_file(&path, true, &registry, &options).is_err());

    let read = read_arrow_file(&path, false, &registry, &options).unwrap();
    assert_eq!(read.schema(), table.schema());
    assert_eq!(read.num_rows(), 2);
    assert_eq!(read.row_keys().unwrap(), vec![StorageValue::from("Row0"), "Row1".into()]);
}
