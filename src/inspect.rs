//! Loading schemas and tables from files.

use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::Path;

use arrow::ipc::reader::{FileReader, StreamReader};
use kntable_arrow::geo::register_geo_factories;
use kntable_arrow::source::{schema_footer_required, DataSource, FileSource};
use kntable_arrow::{BridgeError, BridgeOptions, KnimeTable};
use kntable_core::wire::schema_from_json;
use kntable_core::{ExtensionRegistry, Schema};
use tracing::{debug, info, warn};

use crate::error::Result;

/// `ARROW1` plus padding ahead of the first IPC message.
const FILE_MAGIC_LEN: usize = 8;

/// Registry with the built-in time, file-location and geometry types.
pub fn default_registry() -> Result<ExtensionRegistry> {
    let mut registry = ExtensionRegistry::with_builtins()?;
    register_geo_factories(&mut registry)?;
    debug!(converters = registry.len(), "default registry ready");
    Ok(registry)
}

/// Parse a wire schema document.
pub fn read_schema_file(path: impl AsRef<Path>, registry: &ExtensionRegistry) -> Result<Schema> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let schema = schema_from_json(&text, registry)?;
    info!(path = %path.display(), columns = schema.num_columns(), "read wire schema");
    Ok(schema)
}

/// Read every batch of an Arrow IPC file into a table.
pub fn read_arrow_file(
    path: impl AsRef<Path>,
    footer_written: bool,
    registry: &ExtensionRegistry,
    options: &BridgeOptions,
) -> Result<KnimeTable> {
    let source = FileSource::new(path.as_ref()).with_footer_written(footer_written);
    read_arrow_source(&source, registry, options)
}

/// Read a table from a data source.
///
/// A finished file is read through its footer. A file still being written
/// is read as the stream following the leading magic, keeping every batch
/// that was completely written.
pub fn read_arrow_source(
    source: &dyn DataSource,
    registry: &ExtensionRegistry,
    options: &BridgeOptions,
) -> Result<KnimeTable> {
    let path = source.absolute_path();
    let mut file = BufReader::new(File::open(path)?);

    let (arrow_schema, batches) = if schema_footer_required(source) {
        let reader = FileReader::try_new(file, None)?;
        let arrow_schema = reader.schema();
        let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
        (arrow_schema, batches)
    } else {
        let mut magic = [0u8; FILE_MAGIC_LEN];
        file.read_exact(&mut magic)?;
        if !magic.starts_with(b"ARROW1") {
            return Err(BridgeError::schema(format!(
                "{} is not an Arrow IPC file",
                path.display()
            ))
            .into());
        }
        let reader = StreamReader::try_new(file, None)?;
        let arrow_schema = reader.schema();
        let mut batches = Vec::new();
        for batch in reader {
            match batch {
                Ok(batch) => batches.push(batch),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "stopping at incomplete batch");
                    break;
                }
            }
        }
        (arrow_schema, batches)
    };

    if !source.has_column_names() {
        debug!(path = %path.display(), "column names are positional");
    }
    debug!(path = %path.display(), batches = batches.len(), "read arrow file");
    Ok(KnimeTable::from_batches(
        arrow_schema,
        batches,
        registry,
        options,
    )?)
}
